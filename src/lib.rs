pub mod aggregate;
pub mod dataset;
pub mod error;
pub mod fixture;
pub mod harness;
pub mod pipeline;
pub mod plot;
pub mod schema;
pub mod signer;

pub use error::{BenchError, Result, ToolError};
pub use harness::{BenchmarkPlan, Profile};
pub use signer::{ArgStyle, ExternalSigner, KeyGenerator};
