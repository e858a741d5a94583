use crate::error::Error;
use crate::lookup::KeySource;
use crate::store::{CookieCommand, StoreInner};
use crate::value::Value;
use crate::Result;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Where a handle is in its lifecycle. `save` and `destroy` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandleState {
    Active,
    Saved,
    Destroyed,
}

/// The caller-facing session handle, bound to one record for one request.
///
/// A handle exclusively owns its in-memory record: two simultaneous requests
/// bearing the same identifier each load an independent copy, and whichever
/// saves last wins. It is marked `#[must_use]`, as dropping it without
/// calling [`Session::save`] discards any mutations.
///
/// Changes are tracked: [`Session::save`] on a handle whose data was never
/// mutated skips the backend write entirely.
///
/// After `save` or `destroy` the handle is terminal. The read-only accessors
/// ([`Session::id`], [`Session::fresh`], [`Session::get`],
/// [`Session::keys`]) keep working, mutators and further `save`/`destroy`/
/// `regenerate` calls are defined no-ops.
#[derive(Debug)]
#[must_use]
pub struct Session {
    inner: Arc<StoreInner>,
    id: String,
    data: BTreeMap<String, Value>,
    fresh: bool,
    dirty: bool,
    expiration: Option<Duration>,
    state: HandleState,
}

impl Session {
    /// A record that had no backend entry at load time. The identifier is
    /// either freshly minted or reused from the request.
    pub(crate) fn new_fresh(inner: Arc<StoreInner>, id: String) -> Self {
        Self {
            inner,
            id,
            data: BTreeMap::new(),
            fresh: true,
            dirty: false,
            expiration: None,
            state: HandleState::Active,
        }
    }

    /// A record deserialized from an existing backend entry.
    pub(crate) fn new_loaded(inner: Arc<StoreInner>, id: String, data: BTreeMap<String, Value>) -> Self {
        Self {
            inner,
            id,
            data,
            fresh: false,
            dirty: false,
            expiration: None,
            state: HandleState::Active,
        }
    }

    /// The stored value under `key`, or `None`. A missing key is not
    /// exceptional.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Insert or overwrite the value under `key`. Nothing is persisted
    /// until [`Session::save`].
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        if self.state != HandleState::Active {
            return;
        }
        self.data.insert(key.into(), value.into());
        self.dirty = true;
    }

    /// Remove the value under `key` if present, a no-op otherwise.
    pub fn delete(&mut self, key: &str) {
        if self.state != HandleState::Active {
            return;
        }
        if self.data.remove(key).is_some() {
            self.dirty = true;
        }
    }

    /// Snapshot of the currently set keys, in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }

    /// True iff the record had no backend entry at load time.
    pub fn fresh(&self) -> bool {
        self.fresh
    }

    /// The current identifier. Reflects the new identifier after
    /// [`Session::regenerate`].
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Override the TTL used by the next [`Session::save`]. An already
    /// persisted TTL is unaffected until then. A zero duration means the
    /// record is kept until deleted.
    pub fn set_expiry(&mut self, expiration: Duration) {
        if self.state != HandleState::Active {
            return;
        }
        self.expiration = Some(expiration);
        self.dirty = true;
    }

    /// Swap the session's identity: delete the old backend entry, assign a
    /// newly generated identifier, keep the in-memory data intact. The next
    /// [`Session::save`] persists under the new identifier and schedules it
    /// to be sent to the client.
    ///
    /// If deleting the old entry fails, the error propagates and the record
    /// (including its identifier) is left unchanged, so the caller may
    /// retry. The identifier only changes after a successful delete; no
    /// stale entry can leak.
    pub async fn regenerate(&mut self) -> Result {
        if self.state != HandleState::Active {
            return Ok(());
        }
        if !self.fresh {
            self.inner
                .storage
                .delete(&self.id)
                .await
                .map_err(Error::Storage)?;
        }
        self.id = self.inner.key_generator.generate();
        self.dirty = true;
        log::trace!("regenerated session identifier");
        Ok(())
    }

    /// Serialize the record and write it to the backend under the current
    /// identifier with the effective TTL (the [`Session::set_expiry`]
    /// override, or the store default).
    ///
    /// Returns the instruction for the transport layer:
    /// `Some(`[`CookieCommand::Set`]`)` for cookie-sourced lookups, `None`
    /// for header and query lookups (which have no response-side transport)
    /// and for handles that had nothing to persist. On failure the
    /// in-memory record is left unchanged so the caller may retry.
    pub async fn save(&mut self) -> Result<Option<CookieCommand>> {
        if self.state != HandleState::Active {
            return Ok(None);
        }
        if !self.dirty {
            // Nothing was mutated since load; the stored record, if any,
            // is already current.
            self.state = HandleState::Saved;
            return Ok(None);
        }
        let ttl = self.expiration.unwrap_or(self.inner.expiration);
        let payload = serde_json::to_vec(&self.data).map_err(Error::Serialize)?;
        self.inner
            .storage
            .set(&self.id, payload, ttl)
            .await
            .map_err(Error::Storage)?;
        self.state = HandleState::Saved;
        log::trace!("saved session record holding {} keys", self.data.len());
        Ok(self.set_cookie_command(ttl))
    }

    /// Delete the backend entry for the current identifier and clear the
    /// in-memory data. Idempotent: destroying twice is not an error, the
    /// second call is a no-op.
    ///
    /// Returns `Some(`[`CookieCommand::Delete`]`)` for cookie-sourced
    /// lookups so the transport can remove the cookie from the client.
    pub async fn destroy(&mut self) -> Result<Option<CookieCommand>> {
        if self.state != HandleState::Active {
            return Ok(None);
        }
        if !self.fresh {
            self.inner
                .storage
                .delete(&self.id)
                .await
                .map_err(Error::Storage)?;
        }
        self.data.clear();
        self.dirty = false;
        self.state = HandleState::Destroyed;
        log::trace!("destroyed session record");
        Ok(self.delete_cookie_command())
    }

    fn set_cookie_command(&self, ttl: Duration) -> Option<CookieCommand> {
        let inner = &self.inner;
        if inner.lookup.source != KeySource::Cookie {
            return None;
        }
        let value = match &inner.signer {
            Some(signer) => signer.sign(&self.id),
            None => self.id.clone(),
        };
        Some(CookieCommand::Set {
            name: inner.lookup.name.clone(),
            value,
            max_age: ttl,
            domain: inner.cookie_domain.clone(),
            path: inner.cookie_path.clone(),
            secure: inner.cookie_secure,
            http_only: inner.cookie_http_only,
            same_site: inner.cookie_same_site,
        })
    }

    fn delete_cookie_command(&self) -> Option<CookieCommand> {
        let inner = &self.inner;
        if inner.lookup.source != KeySource::Cookie {
            return None;
        }
        Some(CookieCommand::Delete {
            name: inner.lookup.name.clone(),
            domain: inner.cookie_domain.clone(),
            path: inner.cookie_path.clone(),
        })
    }
}
