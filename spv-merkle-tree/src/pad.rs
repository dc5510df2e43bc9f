use std::time::{SystemTime, UNIX_EPOCH};

use rand::{rngs::StdRng, RngCore, SeedableRng};

use crate::{Digest, PathEntry, HASH_LENGTH};

/// Source of random pad digests for odd tree levels.
///
/// Every pad handed out through [`generate_and_record`](Self::generate_and_record)
/// is appended to an export ledger. A verifier cannot derive these pads, so
/// the ledger has to reach it together with any proof that depends on them.
#[derive(Debug, Clone)]
pub struct RandomPadGenerator {
    rng: StdRng,
    ledger: Vec<PathEntry>,
}

impl Default for RandomPadGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomPadGenerator {
    /// Seed once from the system clock.
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or_default();
        Self::from_seed(seed)
    }

    /// Deterministic generator, for reproducible padding.
    pub fn from_seed(seed: u64) -> Self {
        RandomPadGenerator {
            rng: StdRng::seed_from_u64(seed),
            ledger: Vec::new(),
        }
    }

    /// A fresh uniformly random digest.
    pub fn generate(&mut self) -> Digest {
        let mut digest = [0u8; HASH_LENGTH];
        self.rng.fill_bytes(&mut digest);
        digest
    }

    /// Generate a pad for the slot at `position` on `level` and record it.
    pub fn generate_and_record(&mut self, level: u32, position: usize) -> Digest {
        let digest = self.generate();
        self.record(PathEntry::new(digest, level, position));
        digest
    }

    /// Append a pad that came from elsewhere (a replayed ledger).
    pub fn record(&mut self, entry: PathEntry) {
        self.ledger.push(entry);
    }

    /// Pads recorded since the last construction run started.
    pub fn ledger(&self) -> &[PathEntry] {
        &self.ledger
    }

    /// Move the ledger out, leaving it empty.
    pub fn take_ledger(&mut self) -> Vec<PathEntry> {
        std::mem::take(&mut self.ledger)
    }

    pub(crate) fn clear_ledger(&mut self) {
        self.ledger.clear();
    }
}
