use crate::error::ConfigError;
use std::str::FromStr;

/// The request location a session identifier is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// A cookie. The only source that is also written back to the client.
    Cookie,
    /// A request header. Read-only; nothing is echoed back on save.
    Header,
    /// A query parameter. Read-only; nothing is echoed back on save.
    Query,
}

/// Where to find the session identifier on a request.
///
/// Parsed from the `source:name` form used in
/// [`Config::key_lookup`](crate::Config::key_lookup), e.g.
/// `"cookie:session_id"` or `"header:x-session-id"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLookup {
    /// The request location to read from.
    pub source: KeySource,
    /// The cookie, header or query parameter name.
    pub name: String,
}

impl FromStr for KeyLookup {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let malformed = || ConfigError {
            lookup: value.to_string(),
        };
        let (source, name) = value.split_once(':').ok_or_else(malformed)?;
        let source = match source {
            "cookie" => KeySource::Cookie,
            "header" => KeySource::Header,
            "query" => KeySource::Query,
            _ => return Err(malformed()),
        };
        if name.is_empty() {
            return Err(malformed());
        }
        Ok(Self {
            source,
            name: name.to_string(),
        })
    }
}

/// Read-only accessors over the caller's request type.
///
/// The surrounding framework implements this for whatever request
/// representation it uses; the crate itself never parses headers or URLs.
/// All three accessors return the field value as the client presented it.
pub trait RequestContext {
    /// The value of the named cookie, if present.
    fn cookie(&self, name: &str) -> Option<&str>;

    /// The value of the named request header, if present.
    fn header(&self, name: &str) -> Option<&str>;

    /// The value of the named query parameter, if present.
    fn query(&self, name: &str) -> Option<&str>;
}

/// Look up the raw identifier named by `lookup`.
///
/// A missing or empty field is absent.
pub(crate) fn extract(request: &dyn RequestContext, lookup: &KeyLookup) -> Option<String> {
    let raw = match lookup.source {
        KeySource::Cookie => request.cookie(&lookup.name),
        KeySource::Header => request.header(&lookup.name),
        KeySource::Query => request.query(&lookup.name),
    }?;
    if raw.is_empty() {
        return None;
    }
    Some(raw.to_string())
}
