//! Random identifiers for scratch tables, keys and values.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Symbols identifiers are drawn from (62 symbols)
pub const ALPHABET: &[u8] = b"1234567890abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Build an identifier of `len` symbols drawn uniformly from [`ALPHABET`].
pub fn random_identifier<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Source of scratch identifiers. Injected into the probe so tests can pin them.
pub trait IdSource: Send + Sync {
    fn identifier(&self, len: usize) -> String;
}

/// Thread-local RNG; the production source.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngIds;

impl IdSource for ThreadRngIds {
    fn identifier(&self, len: usize) -> String {
        random_identifier(&mut rand::thread_rng(), len)
    }
}

/// Deterministic source for replaying a probe.
#[derive(Debug)]
pub struct SeededIds {
    rng: Mutex<StdRng>,
}

impl SeededIds {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl IdSource for SeededIds {
    fn identifier(&self, len: usize) -> String {
        // A poisoned lock still holds a usable RNG
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        random_identifier(&mut *rng, len)
    }
}

/// Hands out a fixed sequence of identifiers, cycling when exhausted.
#[derive(Debug)]
pub struct FixedIds {
    ids: Vec<String>,
    next: Mutex<usize>,
}

impl FixedIds {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
            next: Mutex::new(0),
        }
    }
}

impl IdSource for FixedIds {
    fn identifier(&self, _len: usize) -> String {
        if self.ids.is_empty() {
            return String::new();
        }
        let mut next = self.next.lock().unwrap_or_else(|e| e.into_inner());
        let id = self.ids[*next % self.ids.len()].clone();
        *next += 1;
        id
    }
}
