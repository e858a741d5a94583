use crate::error::Error;
use crate::key_generator::{KeyGenerator, RandomKeyGenerator};
use crate::lookup::{extract, KeyLookup, RequestContext};
use crate::memory_storage::MemoryStorage;
use crate::session::Session;
use crate::signer::Signer;
use crate::value::Value;
use crate::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

/// The pluggable key-value backend contract.
///
/// Each backend is a plain byte-oriented store with TTL support; the core
/// never depends on a concrete implementation. A single `set` is atomic from
/// the backend's point of view, and expiration is enforced by the backend on
/// its own schedule. There is no compare-and-swap: concurrent writes to the
/// same key are last-write-wins.
///
/// Errors are backend-specific and cross this boundary as [`anyhow::Error`];
/// the core wraps them into [`Error::Storage`](crate::Error::Storage).
#[async_trait]
pub trait Storage: Debug + Send + Sync {
    /// Fetch the payload stored under `key`, or `None` if there is no entry
    /// (including entries the backend already expired).
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous entry, and expire
    /// it after `ttl`. A zero `ttl` means the entry is kept until deleted.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> anyhow::Result<()>;

    /// Remove the entry under `key`. A missing entry is not an error.
    async fn delete(&self, key: &str) -> anyhow::Result<()>;

    /// Remove every entry in the backend.
    async fn reset(&self) -> anyhow::Result<()>;
}

/// The `SameSite` attribute emitted on session cookies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    /// The cookie is sent on same-site requests and top-level navigations.
    #[default]
    Lax,
    /// The cookie is sent on same-site requests only.
    Strict,
    /// The cookie is sent on all requests.
    None,
}

impl Display for SameSite {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Lax => "Lax",
            Self::Strict => "Strict",
            Self::None => "None",
        })
    }
}

/// Instruction to the transport layer, returned by
/// [`Session::save`](crate::Session::save) and
/// [`Session::destroy`](crate::Session::destroy).
///
/// The core never writes an HTTP response itself; the caller applies the
/// command to whatever response type it owns. Commands carry the full cookie
/// attribute set so the transport needs no access to the store
/// configuration. Only cookie-sourced lookups produce commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieCommand {
    /// Set the identifier cookie on the outgoing response.
    Set {
        /// The cookie name.
        name: String,
        /// The cookie value: the identifier, signed if a signer is
        /// configured.
        value: String,
        /// The cookie lifetime, matching the record's effective TTL.
        max_age: Duration,
        /// The `Domain` attribute, if configured.
        domain: Option<String>,
        /// The `Path` attribute, if configured.
        path: Option<String>,
        /// Whether to set the `Secure` attribute.
        secure: bool,
        /// Whether to set the `HttpOnly` attribute.
        http_only: bool,
        /// The `SameSite` attribute.
        same_site: SameSite,
    },
    /// Remove the identifier cookie from the client.
    Delete {
        /// The cookie name.
        name: String,
        /// The `Domain` attribute, if configured.
        domain: Option<String>,
        /// The `Path` attribute, if configured.
        path: Option<String>,
    },
}

/// Configuration for a [`SessionStore`]. Every field has a default, so
/// `Config::default()` yields a working in-process setup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default TTL for new records. Defaults to 24 hours.
    pub expiration: Duration,
    /// The storage backend. Defaults to a fresh in-process
    /// [`MemoryStorage`], owned by this store alone.
    pub storage: Option<Arc<dyn Storage>>,
    /// Identifier lookup in `source:name` form, with source one of `cookie`,
    /// `header` or `query`. Defaults to `"cookie:session_id"`.
    pub key_lookup: String,
    /// The `Domain` attribute for emitted cookies. Unset by default.
    pub cookie_domain: Option<String>,
    /// The `Path` attribute for emitted cookies. Unset by default.
    pub cookie_path: Option<String>,
    /// Whether emitted cookies carry the `Secure` attribute.
    pub cookie_secure: bool,
    /// Whether emitted cookies carry the `HttpOnly` attribute.
    pub cookie_http_only: bool,
    /// The `SameSite` attribute for emitted cookies. Defaults to `Lax`.
    pub cookie_same_site: SameSite,
    /// Generator for new identifiers. Defaults to [`RandomKeyGenerator`].
    pub key_generator: Option<Arc<dyn KeyGenerator>>,
    /// Identifier signing strategy. Identifiers travel as-is when unset.
    pub signer: Option<Arc<dyn Signer>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            expiration: Duration::from_secs(24 * 60 * 60),
            storage: None,
            key_lookup: "cookie:session_id".to_string(),
            cookie_domain: None,
            cookie_path: None,
            cookie_secure: false,
            cookie_http_only: false,
            cookie_same_site: SameSite::Lax,
            key_generator: None,
            signer: None,
        }
    }
}

#[derive(Debug)]
pub(crate) struct StoreInner {
    pub(crate) storage: Arc<dyn Storage>,
    pub(crate) lookup: KeyLookup,
    pub(crate) expiration: Duration,
    pub(crate) cookie_domain: Option<String>,
    pub(crate) cookie_path: Option<String>,
    pub(crate) cookie_secure: bool,
    pub(crate) cookie_http_only: bool,
    pub(crate) cookie_same_site: SameSite,
    pub(crate) key_generator: Arc<dyn KeyGenerator>,
    pub(crate) signer: Option<Arc<dyn Signer>>,
}

/// The entry point producing [`Session`] handles.
///
/// A store holds nothing but immutable configuration, so it is cheap to
/// clone and safe to share across concurrently running request handlers
/// without internal locking.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

impl SessionStore {
    /// Create a store from `config`, binding a fresh [`MemoryStorage`] when
    /// no backend is configured.
    ///
    /// # Panics
    ///
    /// Panics if [`Config::key_lookup`] is malformed. A bad lookup is a
    /// programmer error, not a runtime condition, so construction fails
    /// fast instead of returning a [`ConfigError`](crate::ConfigError).
    pub fn new(config: Config) -> Self {
        let lookup = match config.key_lookup.parse::<KeyLookup>() {
            Ok(lookup) => lookup,
            Err(error) => panic!("invalid session store configuration: {error}"),
        };
        Self {
            inner: Arc::new(StoreInner {
                storage: config
                    .storage
                    .unwrap_or_else(|| Arc::new(MemoryStorage::new())),
                lookup,
                expiration: config.expiration,
                cookie_domain: config.cookie_domain,
                cookie_path: config.cookie_path,
                cookie_secure: config.cookie_secure,
                cookie_http_only: config.cookie_http_only,
                cookie_same_site: config.cookie_same_site,
                key_generator: config
                    .key_generator
                    .unwrap_or_else(|| Arc::new(RandomKeyGenerator)),
                signer: config.signer,
            }),
        }
    }

    /// Resolve the session for `request`: load the existing record, or
    /// create a fresh empty one when the request carries no usable
    /// identifier or the identifier has no stored entry.
    ///
    /// An identifier that fails signature verification counts as absent and
    /// silently yields a fresh session; a client-supplied bad token must
    /// never surface as an error. A well-formed identifier with no backend
    /// entry is reused for the fresh record. Backend read failures surface
    /// as [`Error::Storage`], undecodable payloads as
    /// [`Error::CorruptSession`].
    pub async fn get(&self, request: &impl RequestContext) -> Result<Session> {
        let inner = &self.inner;
        let presented = extract(request, &inner.lookup).and_then(|raw| match &inner.signer {
            Some(signer) => {
                let key = signer.unsign(&raw);
                if key.is_none() {
                    log::warn!("discarding session identifier that failed signature verification");
                }
                key
            }
            None => Some(raw),
        });

        let Some(id) = presented else {
            let id = inner.key_generator.generate();
            log::debug!("request carries no usable session identifier, minting a fresh session");
            return Ok(Session::new_fresh(Arc::clone(inner), id));
        };

        match inner.storage.get(&id).await.map_err(Error::Storage)? {
            None => {
                log::debug!("presented identifier has no stored record, minting a fresh session");
                Ok(Session::new_fresh(Arc::clone(inner), id))
            }
            Some(payload) => {
                let data: BTreeMap<String, Value> = serde_json::from_slice(&payload)
                    .map_err(|source| Error::CorruptSession {
                        id: id.clone(),
                        source,
                    })?;
                log::debug!("loaded session record holding {} keys", data.len());
                Ok(Session::new_loaded(Arc::clone(inner), id, data))
            }
        }
    }

    /// Clear the entire backend, removing every session of the application.
    ///
    /// Administrative flush; backend errors propagate.
    pub async fn reset(&self) -> Result {
        self.inner.storage.reset().await.map_err(Error::Storage)
    }
}
