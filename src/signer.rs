use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use std::fmt::{Debug, Formatter};

/// Strategy for wrapping session identifiers in a tamper-evident envelope.
///
/// The signing secret and algorithm are deployment-specific, so the store
/// takes an implementation of this trait rather than hardcoding one. When no
/// signer is configured, identifiers travel as-is.
pub trait Signer: Debug + Send + Sync {
    /// Wrap a raw identifier for transport to the client.
    fn sign(&self, key: &str) -> String;

    /// Reverse [`Signer::sign`], recovering the raw identifier.
    ///
    /// Returns `None` on any structural mismatch, decode failure or
    /// signature verification failure. Callers treat `None` exactly like an
    /// absent identifier; it is never an error, since the token is
    /// client-supplied.
    fn unsign(&self, token: &str) -> Option<String>;
}

// Key derivation context, per the blake3 convention of
// "[application] [commissioning date] [purpose]".
const KEY_CONTEXT: &str = "http-session 2025-11-02 identifier signing";

/// Signs identifiers with a keyed blake3 hash.
///
/// The token format is `<identifier>.<mac>` with the MAC in URL-safe base64,
/// so signed tokens remain valid cookie values. Verification recomputes the
/// MAC and compares in constant time.
#[allow(missing_copy_implementations)]
pub struct KeyedSigner {
    key: [u8; blake3::KEY_LEN],
}

impl KeyedSigner {
    /// Derive the signing key from an arbitrary-length secret.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: blake3::derive_key(KEY_CONTEXT, secret),
        }
    }
}

impl Signer for KeyedSigner {
    fn sign(&self, key: &str) -> String {
        let mac = blake3::keyed_hash(&self.key, key.as_bytes());
        format!("{key}.{}", URL_SAFE_NO_PAD.encode(mac.as_bytes()))
    }

    fn unsign(&self, token: &str) -> Option<String> {
        let (key, mac) = token.rsplit_once('.')?;
        let mac: [u8; blake3::OUT_LEN] = URL_SAFE_NO_PAD.decode(mac).ok()?.try_into().ok()?;
        // blake3::Hash equality is constant-time.
        let expected = blake3::keyed_hash(&self.key, key.as_bytes());
        (expected == blake3::Hash::from(mac)).then(|| key.to_string())
    }
}

impl Debug for KeyedSigner {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedSigner").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_an_identifier() {
        let signer = KeyedSigner::new(b"test secret");
        let token = signer.sign("abc123");
        assert_ne!(token, "abc123");
        assert_eq!(signer.unsign(&token), Some("abc123".to_string()));
    }

    #[test]
    fn rejects_a_flipped_byte() {
        let signer = KeyedSigner::new(b"test secret");
        let token = signer.sign("abc123");
        let mut tampered = token.into_bytes();
        let last = tampered.last_mut().unwrap();
        *last = if *last == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(tampered).unwrap();
        assert_eq!(signer.unsign(&tampered), None);
    }

    #[test]
    fn rejects_a_token_signed_with_another_secret() {
        let token = KeyedSigner::new(b"one secret").sign("abc123");
        assert_eq!(KeyedSigner::new(b"another secret").unsign(&token), None);
    }

    #[test]
    fn rejects_structural_garbage() {
        let signer = KeyedSigner::new(b"test secret");
        assert_eq!(signer.unsign("no-separator"), None);
        assert_eq!(signer.unsign("id.not!base64!"), None);
        assert_eq!(signer.unsign("id.dG9vc2hvcnQ"), None);
        assert_eq!(signer.unsign(""), None);
    }
}
