use rand::distributions::{Alphanumeric, DistString};
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};

/// Length of generated identifiers, in characters.
const KEY_LENGTH: usize = 32;

/// A type with the ability to mint new session identifiers.
///
/// Generators are shared by every request handler going through a store, so
/// they take `&self` and must be safe for concurrent use.
pub trait KeyGenerator: Debug + Send + Sync {
    /// Produce a new identifier.
    fn generate(&self) -> String;
}

/// The default generator with focus on security.
/// It uses [`rand::thread_rng`] as a random source and the [`Alphanumeric`]
/// distribution to generate identifiers.
/// This gives `log_2(26+26+10) ≥ 5.95` bits of entropy per character, well
/// beyond UUID-class uniqueness at 32 characters.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomKeyGenerator;

impl KeyGenerator for RandomKeyGenerator {
    fn generate(&self) -> String {
        Alphanumeric.sample_string(&mut rand::thread_rng(), KEY_LENGTH)
    }
}

/// A debug generator that produces an ascending sequence of integers,
/// formatted as strings padded with zeroes. Useful in tests that need
/// predictable identifiers.
#[derive(Debug, Default)]
pub struct SequentialKeyGenerator {
    next_index: AtomicU64,
}

impl KeyGenerator for SequentialKeyGenerator {
    fn generate(&self) -> String {
        let index = self.next_index.fetch_add(1, Ordering::Relaxed);
        format!("{index:0width$}", width = KEY_LENGTH)
    }
}
