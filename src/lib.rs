//! delaygen - cycle-exact delay routine synthesis.
//!
//! Given a window of clock cycles, the hardware a routine may touch and an
//! instruction budget, delaygen searches for straight-line code or nested
//! counter loops whose duration falls inside the window.
//!
//! # Primary Usage
//!
//! ```no_run
//! use delaygen::{DelayFunctionBuilder, DelayRequest, InstructionCatalog, Resource, TargetRegistry};
//!
//! let registry = TargetRegistry::with_builtin();
//! let target = registry.get("8085")?;
//! let catalog = InstructionCatalog::parse(target.bundled_catalog())?;
//! let builder = DelayFunctionBuilder::new(&catalog, target);
//!
//! let resources = vec![Resource::register("B"), Resource::register("C")];
//! let request = DelayRequest::new(10_000, 10_010, resources, 10);
//! if let Some(routine) = builder.build(&request)? {
//!     print!("{}", routine);
//! }
//! # Ok::<(), delaygen::SynthError>(())
//! ```
//!
//! # Architecture
//!
//! - [`core`] - Shared infrastructure (errors, resources, session, targets)
//! - [`catalog`] - Instruction catalog and its text format
//! - [`codegen`] - Reachability, loop synthesis, spilling and the builder
//! - [`i8085`] - Intel 8085 target

pub mod catalog;
pub mod codegen;
pub mod core;
pub mod i8085;

pub use crate::catalog::{InstructionCatalog, InstructionSpec, Placeholder};
pub use crate::codegen::{
    DelayFunction, DelayFunctionBuilder, DelayRequest, Executable, Group, Instruction, Loop,
};
pub use crate::core::{
    CatalogError, Resource, ResourceKind, ResourceSet, SynthError, SynthResult, SynthesisConfig,
    SynthesisStats, Target, TargetRegistry,
};
