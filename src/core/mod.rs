// This module serves as the hub for delaygen's shared infrastructure: the error types, the
// resource model (hardware elements and the resource-set bitmask used for every
// admissibility test), the per-request synthesis session with its statistics, step ceiling
// and reachability memo, and the target abstraction through which architecture specific
// knowledge reaches the engine.

//! Core infrastructure
//!
//! # Key Components
//!
//! ## Resources (`resource`)
//! - Registers, memory cells and the stack a routine may touch
//! - Bitmask summary with a single AND admissibility test
//!
//! ## Session Management (`session`)
//! - Synthesis statistics and the search step ceiling
//! - Reachability memo keyed by resource set and budget
//!
//! ## Targets (`target`)
//! - Counter register policy and scaffold templates per architecture
//! - Registry keyed by architecture identifier

pub mod error;
pub mod resource;
pub mod session;
pub mod target;

pub use error::{CatalogError, SynthError, SynthResult};

pub use resource::{Resource, ResourceKind, ResourceSet};

pub use session::{SynthesisConfig, SynthesisSession, SynthesisStats};

pub use target::{LoopKind, Target, TargetRegistry};
