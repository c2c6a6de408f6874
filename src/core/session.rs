// This module provides per-request synthesis session management. A SynthesisSession lives
// for exactly one top-level build request and owns everything the search mutates: the step
// counter enforcing the configured ceiling, the statistics block, and a memo of reachability
// tables keyed by (granted resource set, instruction budget, granted memory addresses). A
// table depends only on those inputs and the catalog the session borrows, so a memo hit can
// never return stale data; narrowing the resource set at a new nesting level or after a
// spill simply produces a different key. Interior mutability (Cell/RefCell) lets the
// recursive loop synthesizer share one session by reference. SynthesisConfig carries the
// tunables the builder and spiller read.

//! Per-request synthesis session.
//!
//! All search state is confined to one session, so independent requests never
//! observe each other and the catalog can be shared immutably between them.

use hashbrown::HashMap;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::error::{SynthError, SynthResult};
use super::resource::ResourceSet;
use super::target::LoopKind;
use crate::catalog::InstructionCatalog;
use crate::codegen::reachability::ReachabilityTable;

/// Tunables of the synthesis engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisConfig {
    /// Estimated number of flat instructions above which a register is spilled.
    pub spill_threshold: u64,
    /// How many times the instruction budget is incremented before giving up.
    pub budget_retries: u32,
    /// Ceiling on search steps per request.
    pub step_limit: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            spill_threshold: 30,
            budget_retries: 16,
            step_limit: 2_000_000,
        }
    }
}

type TableKey = (ResourceSet, u32, Vec<String>);

/// State of one synthesis request.
pub struct SynthesisSession<'c> {
    catalog: &'c InstructionCatalog,

    config: SynthesisConfig,

    /// Steps consumed so far.
    steps: Cell<u64>,

    stats: RefCell<SynthesisStats>,

    /// Reachability tables computed during this request.
    tables: RefCell<HashMap<TableKey, Rc<ReachabilityTable>>>,
}

impl<'c> SynthesisSession<'c> {
    pub fn new(catalog: &'c InstructionCatalog, config: SynthesisConfig) -> Self {
        Self {
            catalog,
            config,
            steps: Cell::new(0),
            stats: RefCell::new(SynthesisStats::default()),
            tables: RefCell::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &'c InstructionCatalog {
        self.catalog
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Consume `count` search steps, failing once the ceiling is crossed.
    pub fn charge(&self, count: u64) -> SynthResult<()> {
        let used = self.steps.get().saturating_add(count);
        self.steps.set(used);
        if used > self.config.step_limit {
            return Err(SynthError::SearchLimit {
                limit: self.config.step_limit,
            });
        }
        Ok(())
    }

    pub fn steps(&self) -> u64 {
        self.steps.get()
    }

    /// Reachability table for `granted` and `budget`, computed on first use.
    pub fn reachability(
        &self,
        granted: ResourceSet,
        budget: u32,
        memory: &[String],
    ) -> SynthResult<Rc<ReachabilityTable>> {
        let key = (granted, budget, memory.to_vec());
        if let Some(table) = self.tables.borrow().get(&key) {
            self.stats.borrow_mut().memo_hits += 1;
            return Ok(Rc::clone(table));
        }

        let available = self.catalog.filter_available(granted);
        let table = Rc::new(ReachabilityTable::compute(
            &available, budget, memory, self,
        )?);
        self.stats.borrow_mut().tables_computed += 1;
        log::trace!(
            "Reachability for {} budget {}: max {}",
            granted,
            budget,
            table.max_reachable()
        );
        self.tables.borrow_mut().insert(key, Rc::clone(&table));
        Ok(table)
    }

    pub fn record_loop_attempt(&self, kind: LoopKind) {
        let mut stats = self.stats.borrow_mut();
        match kind {
            LoopKind::Wide => stats.wide_loops_attempted += 1,
            LoopKind::Narrow => stats.narrow_loops_attempted += 1,
        }
    }

    pub fn record_iteration_candidate(&self) {
        self.stats.borrow_mut().iteration_candidates += 1;
    }

    pub fn record_nested_loop(&self) {
        self.stats.borrow_mut().nested_loops += 1;
    }

    pub fn record_memory_spill(&self) {
        self.stats.borrow_mut().memory_spills += 1;
    }

    pub fn record_stack_spill(&self) {
        self.stats.borrow_mut().stack_spills += 1;
    }

    pub fn record_budget_retry(&self) {
        self.stats.borrow_mut().budget_retries += 1;
    }

    /// Snapshot of the statistics, step count included.
    pub fn stats(&self) -> SynthesisStats {
        let mut stats = self.stats.borrow().clone();
        stats.steps = self.steps.get();
        stats
    }
}

/// Synthesis session statistics.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SynthesisStats {
    /// Reachability tables computed.
    pub tables_computed: usize,

    /// Reachability lookups answered from the memo.
    pub memo_hits: usize,

    pub wide_loops_attempted: usize,

    pub narrow_loops_attempted: usize,

    /// Iteration counts examined across all loop attempts.
    pub iteration_candidates: usize,

    /// Loops built as the body of another loop.
    pub nested_loops: usize,

    pub memory_spills: usize,

    pub stack_spills: usize,

    /// Budget increments after a failed attempt.
    pub budget_retries: usize,

    /// Search steps consumed.
    pub steps: u64,
}

impl fmt::Display for SynthesisStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Synthesis Statistics:")?;
        writeln!(f, "  Reachability tables computed: {}", self.tables_computed)?;
        writeln!(f, "  Reachability memo hits: {}", self.memo_hits)?;
        writeln!(
            f,
            "  Loops attempted: {} wide, {} narrow",
            self.wide_loops_attempted, self.narrow_loops_attempted
        )?;
        writeln!(f, "  Iteration counts examined: {}", self.iteration_candidates)?;
        writeln!(f, "  Nested loops built: {}", self.nested_loops)?;

        if self.memory_spills + self.stack_spills > 0 {
            writeln!(
                f,
                "  Registers spilled: {} to memory, {} to stack",
                self.memory_spills, self.stack_spills
            )?;
        }

        writeln!(f, "  Budget retries: {}", self.budget_retries)?;
        writeln!(f, "  Search steps: {}", self.steps)?;
        Ok(())
    }
}
