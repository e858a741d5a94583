//! Server-side HTTP sessions.
//!
//! This crate provides the session lifecycle engine between a
//! client-presented identifier and a pluggable storage backend: it resolves
//! the identifier from a request, loads or creates the associated key/value
//! record, lets the handler read and mutate that record through a
//! [`Session`] handle, and persists changes with a configurable expiration.
//! The HTTP server itself, concrete backends beyond the bundled
//! [`MemoryStorage`], and cookie header mechanics stay outside: the caller
//! provides request accessors via [`RequestContext`] and applies the
//! [`CookieCommand`] returned by [`Session::save`] to its own response type.
//!
//! # Change tracking
//!
//! Changes are tracked automatically. Whenever a session's data or expiry is
//! mutated, the handle is marked as changed, and [`Session::save`] only
//! writes to the backend when a change has happened.
//!
//! # Concurrency
//!
//! A [`SessionStore`] holds nothing but immutable configuration and is safe
//! to share across request handlers. Two simultaneous requests bearing the
//! same identifier each load an independent copy of the record; whichever
//! saves last overwrites the other's changes entirely. There is no merge and
//! no compare-and-swap, which mirrors standard cookie-based sessions and
//! keeps the backend contract a plain get/set/delete with TTL.
//!
//! # Security
//!
//! Identifiers are minted with ≥ 190 bits of randomness by default. To
//! detect client-side tampering, configure a [`Signer`] such as
//! [`KeyedSigner`]; a token that fails verification is treated exactly like
//! an absent identifier and yields a fresh session, never an error.
//!
//! # Example
//!
//! ```
//! use http_session::{Config, CookieCommand, RequestContext, SessionStore, Value};
//!
//! # struct Request {
//! #     cookie: Option<String>,
//! # }
//! # impl RequestContext for Request {
//! #     fn cookie(&self, _name: &str) -> Option<&str> {
//! #         self.cookie.as_deref()
//! #     }
//! #     fn header(&self, _name: &str) -> Option<&str> {
//! #         None
//! #     }
//! #     fn query(&self, _name: &str) -> Option<&str> {
//! #         None
//! #     }
//! # }
//! # fn main() -> http_session::Result {
//! # async_std::task::block_on(async {
//! let store = SessionStore::new(Config::default());
//!
//! // First request: no cookie yet, so a fresh session is minted.
//! let request = Request { cookie: None };
//! let mut session = store.get(&request).await?;
//! assert!(session.fresh());
//! session.set("name", "john");
//! let command = session.save().await?.expect("changed cookie sessions emit a command");
//!
//! // The command tells the transport which cookie to set. Present it back:
//! let CookieCommand::Set { value, .. } = command else { unreachable!() };
//! let request = Request { cookie: Some(value) };
//! let session = store.get(&request).await?;
//! assert!(!session.fresh());
//! assert_eq!(session.get("name"), Some(&Value::String("john".into())));
//! #
//! # Ok(()) }) }
//! ```

#![forbid(unsafe_code)]
#![deny(
    future_incompatible,
    missing_debug_implementations,
    nonstandard_style,
    missing_docs,
    unreachable_pub,
    missing_copy_implementations,
    unused_qualifications
)]

mod error;
mod key_generator;
mod lookup;
mod memory_storage;
mod session;
mod signer;
mod store;
mod value;

pub use error::{ConfigError, Error};
pub use key_generator::{KeyGenerator, RandomKeyGenerator, SequentialKeyGenerator};
pub use lookup::{KeyLookup, KeySource, RequestContext};
pub use memory_storage::MemoryStorage;
pub use session::Session;
pub use signer::{KeyedSigner, Signer};
pub use store::{Config, CookieCommand, SameSite, SessionStore, Storage};
pub use value::Value;

/// A result with this crate's [`Error`] and a default return type of `()`.
pub type Result<T = ()> = std::result::Result<T, Error>;
