use serde::{Deserialize, Serialize};

use crate::harness::BenchmarkPlan;

pub const BYTES_PER_MIB: f64 = 1_048_576.0;

/// One timed run: `iters` sequential signing calls at a fixed payload size.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub size_bytes: u64,
    /// 1-based.
    pub run: u32,
    pub iters: u32,
    pub seconds_total: f64,
    pub seconds_per_sign: f64,
}

impl Sample {
    pub fn new(size_bytes: u64, run: u32, iters: u32, seconds_total: f64) -> Self {
        Self {
            size_bytes,
            run,
            iters,
            seconds_total,
            seconds_per_sign: seconds_total / iters.max(1) as f64,
        }
    }
}

/// Aggregate statistics for one payload size.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub size_bytes: u64,
    pub samples: usize,
    pub mean_seconds_per_sign: f64,
    /// Population standard deviation.
    pub stdev_seconds_per_sign: f64,
    pub throughput_mb_per_s: f64,
}

impl SummaryRow {
    pub fn size_mib(&self) -> f64 {
        self.size_bytes as f64 / BYTES_PER_MIB
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMeta {
    pub signer: String,
    pub keygen: String,
    pub arg_style: String,
    pub public_key_sha256: String,
}

/// Written next to the raw dataset at the start of each timing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub schema_version: u32,
    pub bench_version: String,
    pub profile: String,
    pub seed: u64,
    pub timestamp_utc: String,
    pub git_sha: Option<String>,
    pub plan: BenchmarkPlan,
    pub tools: Option<ToolMeta>,
}
