//! Error taxonomy for the benchmark pipeline.
//!
//! Every variant is fatal: the pipeline never retries and never skips a size
//! class. The binary maps each class to its own exit code.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Failure of an external tool (key generator or signer).
#[derive(Error, Debug)]
pub enum ToolError {
    /// The program could not be started at all.
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The program ran but did not exit successfully.
    #[error("{program} failed ({status})")]
    Exit { program: PathBuf, status: ExitStatus },

    /// An in-process signer reported a failure.
    #[error("{0}")]
    Other(String),
}

/// Top-level error for every pipeline stage.
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("invalid plan: {0}")]
    Plan(String),

    #[error("fixture {path}: {reason}")]
    Fixture { path: PathBuf, reason: String },

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("{path}: {reason}")]
    DataFormat { path: PathBuf, reason: String },

    #[error("writing {path}: {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("rendering {path}: {reason}")]
    Plot { path: PathBuf, reason: String },
}

impl BenchError {
    pub fn fixture(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        BenchError::Fixture {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn data_format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        BenchError::DataFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn store(path: impl Into<PathBuf>, source: io::Error) -> Self {
        BenchError::Store {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this error class.
    pub fn exit_code(&self) -> u8 {
        match self {
            BenchError::Plan(_) => 2,
            BenchError::Fixture { .. } => 3,
            BenchError::Tool(_) => 4,
            BenchError::DataFormat { .. } => 5,
            BenchError::Store { .. } => 6,
            BenchError::Plot { .. } => 7,
        }
    }
}

pub type Result<T, E = BenchError> = std::result::Result<T, E>;
