use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};

/// Version passed to the untimed warm-up call.
pub const WARMUP_VERSION: u64 = 1;

/// Inclusive range the timed-call versions are drawn from.
pub const VERSION_MIN: u64 = 2;
pub const VERSION_MAX: u64 = 10_000_000;

const QUICK_SIZES: [u64; 4] = [4096, 65536, 1048576, 4194304];

const FULL_SIZES: [u64; 9] = [
    4096, 65536, 1048576, 4194304, 8388608, 16777216, 33554432, 67108864, 134217728,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Profile {
    Quick,
    Full,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Quick => "quick",
            Profile::Full => "full",
        }
    }

    pub fn plan(&self) -> BenchmarkPlan {
        match self {
            Profile::Quick => BenchmarkPlan {
                sizes: QUICK_SIZES.to_vec(),
                reps: 3,
                iters: 10,
                warmup: true,
            },
            Profile::Full => BenchmarkPlan {
                sizes: FULL_SIZES.to_vec(),
                reps: 3,
                iters: 50,
                warmup: true,
            },
        }
    }
}

/// What to measure. Sizes are swept in the given order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkPlan {
    pub sizes: Vec<u64>,
    pub reps: u32,
    pub iters: u32,
    pub warmup: bool,
}

/// Partial plan read from a JSON file; missing fields keep the profile's value.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanOverrides {
    pub sizes: Option<Vec<u64>>,
    pub reps: Option<u32>,
    pub iters: Option<u32>,
    pub warmup: Option<bool>,
}

impl PlanOverrides {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| BenchError::Plan(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| BenchError::Plan(format!("{}: {e}", path.display())))
    }

    /// Later overrides win over earlier ones.
    pub fn merge(self, later: PlanOverrides) -> PlanOverrides {
        PlanOverrides {
            sizes: later.sizes.or(self.sizes),
            reps: later.reps.or(self.reps),
            iters: later.iters.or(self.iters),
            warmup: later.warmup.or(self.warmup),
        }
    }
}

impl BenchmarkPlan {
    pub fn with_overrides(mut self, o: PlanOverrides) -> Self {
        if let Some(sizes) = o.sizes {
            self.sizes = sizes;
        }
        if let Some(reps) = o.reps {
            self.reps = reps;
        }
        if let Some(iters) = o.iters {
            self.iters = iters;
        }
        if let Some(warmup) = o.warmup {
            self.warmup = warmup;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.sizes.is_empty() {
            return Err(BenchError::Plan("no payload sizes".into()));
        }
        if self.sizes.contains(&0) {
            return Err(BenchError::Plan("payload sizes must be positive".into()));
        }
        let distinct: BTreeSet<u64> = self.sizes.iter().copied().collect();
        if distinct.len() != self.sizes.len() {
            return Err(BenchError::Plan("duplicate payload size".into()));
        }
        if self.reps == 0 {
            return Err(BenchError::Plan("reps must be at least 1".into()));
        }
        if self.iters == 0 {
            return Err(BenchError::Plan("iters must be at least 1".into()));
        }
        Ok(())
    }
}

/// Seeded source of signer versions and payload bytes.
#[derive(Clone, Debug)]
pub struct BenchRng {
    seed: u64,
    rng: ChaCha8Rng,
}

impl BenchRng {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Seeds from the thread RNG; the chosen seed is still reported by `seed()`.
    pub fn from_thread_rng() -> Self {
        Self::new(rand::thread_rng().gen())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Independent uniform draws from `VERSION_MIN..=VERSION_MAX`.
    pub fn versions(&mut self, n: u32) -> Vec<u64> {
        (0..n)
            .map(|_| self.rng.gen_range(VERSION_MIN..=VERSION_MAX))
            .collect()
    }

    /// Byte stream for the payload of one size class, independent of run order.
    pub fn payload_stream(&self, size_bytes: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(per_size_seed(self.seed, size_bytes))
    }
}

fn per_size_seed(master_seed: u64, size_bytes: u64) -> u64 {
    master_seed
        .wrapping_add(size_bytes)
        .wrapping_mul(0x517cc1b727220a95)
}

#[derive(Clone, Debug)]
pub struct Measured {
    pub iters: u32,
    pub total: Duration,
    pub seconds_per_iter: f64,
}

/// Times `iters` sequential calls of `f`, stopping at the first error.
///
/// `f` receives the zero-based iteration index.
pub fn measure_fn<E>(
    iters: u32,
    mut f: impl FnMut(usize) -> Result<(), E>,
) -> Result<Measured, E> {
    let start = Instant::now();
    for i in 0..iters as usize {
        f(i)?;
    }
    let total = start.elapsed();

    let denom = iters.max(1) as f64;
    let seconds_per_iter = total.as_secs_f64() / denom;

    Ok(Measured {
        iters,
        total,
        seconds_per_iter,
    })
}
