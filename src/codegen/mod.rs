// This module groups the synthesis engine. executable holds the value types of generated
// code, scaffold resolves the loop and spill instructions against the catalog,
// reachability precomputes straight-line durations, loops builds (nested) counter loops,
// spill frees registers through memory or the stack, and builder orchestrates a request.

//! Delay routine synthesis.

pub mod builder;
pub mod executable;
pub mod loops;
pub mod reachability;
pub mod scaffold;
pub mod spill;

pub use builder::{DelayFunctionBuilder, DelayRequest};
pub use executable::{
    count_instruction_lines, DelayFunction, Executable, Group, Instruction, Loop, Operand,
};
pub use loops::{LoopSynthesizer, Window};
pub use reachability::ReachabilityTable;
pub use scaffold::{LoopOverhead, Scaffold};
pub use spill::{SpillOutcome, Spiller};
