// This module defines the error types for delaygen using the thiserror crate. CatalogError
// covers everything that can go wrong while loading or querying an instruction catalog:
// malformed rows (reported with their line number), a missing BEGIN marker, a catalog with no
// instructions, a template lookup miss and I/O failures. SynthError is the error type of the
// synthesis engine. It wraps catalog errors (a lookup miss for a scaffold instruction means
// the catalog is incompatible with the target and is fatal), rejects malformed requests, and
// reports the search step ceiling and internal timing violations. An infeasible request is
// deliberately NOT an error: the builder returns Ok(None) for it.

//! Error types for catalog loading and delay synthesis.

use thiserror::Error;

/// Errors raised while loading or querying an instruction catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Malformed catalog row at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("Catalog has no BEGIN marker")]
    MissingBegin,

    #[error("Catalog contains no instructions")]
    Empty,

    #[error("Instruction not found in catalog: {template}")]
    NotFound { template: String },

    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
}

/// Main error type for delay synthesis.
#[derive(Error, Debug)]
pub enum SynthError {
    #[error("Catalog is incompatible with the target: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Invalid cycle window [{min}, {max}]")]
    InvalidWindow { min: i64, max: i64 },

    #[error("Unknown target architecture: {id}")]
    UnknownTarget { id: String },

    #[error("Search step limit of {limit} exceeded")]
    SearchLimit { limit: u64 },

    #[error("Synthesized routine lasts {actual} cycles, outside [{min}, {max}]")]
    TimingMismatch { actual: u64, min: i64, max: i64 },
}

/// Result type alias for synthesis operations.
pub type SynthResult<T> = Result<T, SynthError>;
