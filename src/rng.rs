use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::{Arc, OnceLock};

static GLOBAL: OnceLock<SharedRng> = OnceLock::new();

/// Cloneable handle to a pseudo-random generator shared between threads.
///
/// Used for ping tokens, DNS transaction ids and weighted SRV selection.
/// Clones share the same underlying generator.
#[derive(Clone)]
pub struct SharedRng(Arc<Mutex<StdRng>>);

impl SharedRng {
    /// The process-wide generator, seeded from OS entropy on first use.
    pub fn global() -> Self {
        GLOBAL.get_or_init(Self::from_entropy).clone()
    }

    pub fn from_entropy() -> Self {
        Self(Arc::new(Mutex::new(StdRng::from_entropy())))
    }

    /// A deterministic generator, for tests.
    pub fn seeded(seed: u64) -> Self {
        Self(Arc::new(Mutex::new(StdRng::seed_from_u64(seed))))
    }

    pub fn next_u64(&self) -> u64 {
        self.0.lock().next_u64()
    }

    pub fn next_u16(&self) -> u16 {
        self.0.lock().gen()
    }

    pub fn gen_range(&self, range: RangeInclusive<u32>) -> u32 {
        self.0.lock().gen_range(range)
    }
}

impl Default for SharedRng {
    fn default() -> Self {
        Self::global()
    }
}

impl fmt::Debug for SharedRng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedRng").finish_non_exhaustive()
    }
}
