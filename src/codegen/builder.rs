// This module implements the delay-function builder, the entry point of synthesis. A build
// validates the requested window, reserves the return instruction, lets the spiller free
// registers while its estimate says the granted ones are too few, and charges the spill
// code against the window and the instruction budget. The main body is then a flat group
// from the reachability table when the window's lower bound is reachable without a loop,
// or a loop from the loop synthesizer otherwise. A failed attempt is retried with one more
// instruction of budget, a bounded number of times. Each build runs in a fresh
// SynthesisSession, so no search state leaks between requests. Infeasibility and an
// exhausted step ceiling are reported as Ok(None); a finished routine whose duration falls
// outside the requested window is an internal error.

//! Delay-function builder.

use crate::catalog::InstructionCatalog;
use crate::codegen::executable::{DelayFunction, Executable, Group};
use crate::codegen::loops::{LoopSynthesizer, Window};
use crate::codegen::scaffold::Scaffold;
use crate::codegen::spill::{SpillOutcome, Spiller};
use crate::core::error::{SynthError, SynthResult};
use crate::core::resource::{Resource, ResourceKind, ResourceSet};
use crate::core::session::{SynthesisConfig, SynthesisSession, SynthesisStats};
use crate::core::target::Target;

/// A synthesis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelayRequest {
    /// Shortest acceptable duration in cycles.
    pub min: i64,
    /// Longest acceptable duration in cycles.
    pub max: i64,
    /// Hardware the routine may touch.
    pub resources: Vec<Resource>,
    /// Instruction budget, the return instruction included.
    pub budget: u32,
    /// Whether the routine ends with a return instruction.
    pub include_return: bool,
}

impl DelayRequest {
    pub fn new(min: i64, max: i64, resources: Vec<Resource>, budget: u32) -> Self {
        Self {
            min,
            max,
            resources,
            budget,
            include_return: true,
        }
    }

    /// Request for an inline routine without a return instruction.
    pub fn without_return(mut self) -> Self {
        self.include_return = false;
        self
    }
}

/// Builds delay functions for one catalog and target.
pub struct DelayFunctionBuilder<'c> {
    catalog: &'c InstructionCatalog,
    target: &'c dyn Target,
    config: SynthesisConfig,
}

impl<'c> DelayFunctionBuilder<'c> {
    pub fn new(catalog: &'c InstructionCatalog, target: &'c dyn Target) -> Self {
        Self {
            catalog,
            target,
            config: SynthesisConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SynthesisConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Synthesize a routine for `request`, or `None` if none exists within the budget.
    pub fn build(&self, request: &DelayRequest) -> SynthResult<Option<DelayFunction>> {
        Ok(self.build_with_stats(request)?.0)
    }

    /// Like [`build`](Self::build), also returning the session statistics.
    pub fn build_with_stats(
        &self,
        request: &DelayRequest,
    ) -> SynthResult<(Option<DelayFunction>, SynthesisStats)> {
        if request.min > request.max || request.max < 0 {
            return Err(SynthError::InvalidWindow {
                min: request.min,
                max: request.max,
            });
        }

        let session = SynthesisSession::new(self.catalog, self.config.clone());
        let result = match self.run(&session, request) {
            Err(SynthError::SearchLimit { limit }) => {
                log::warn!(
                    "Search for [{}, {}] stopped after {} steps",
                    request.min,
                    request.max,
                    limit
                );
                None
            }
            other => other?,
        };

        if let Some(function) = &result {
            let actual = function.duration();
            if !Window::new(request.min, request.max).contains(actual) {
                return Err(SynthError::TimingMismatch {
                    actual,
                    min: request.min,
                    max: request.max,
                });
            }
        }
        Ok((result, session.stats()))
    }

    fn run(
        &self,
        session: &SynthesisSession<'c>,
        request: &DelayRequest,
    ) -> SynthResult<Option<DelayFunction>> {
        let scaffold = Scaffold::new(self.catalog, self.target);

        let ret = if request.include_return {
            Some(scaffold.ret()?)
        } else {
            None
        };
        let ret_cycles = ret.as_ref().map_or(0, |r| r.duration());
        let window = Window::new(request.min, request.max).minus(ret_cycles);
        let budget = request
            .budget
            .saturating_sub(u32::from(ret.is_some()));

        let mut resources = request.resources.clone();
        let mut init = Group::new();
        let mut finalize = Group::new();
        let spiller = Spiller::new(session, scaffold);
        loop {
            let granted = ResourceSet::from_resources(&resources);
            let main_window = window.minus(init.duration() + finalize.duration());
            if !spiller.needs_spill(main_window.min, granted)? {
                break;
            }
            match spiller.spill(&mut resources, &mut init, &mut finalize)? {
                SpillOutcome::Memory(_) | SpillOutcome::Stack(_) => {}
                SpillOutcome::NothingToFree => break,
                SpillOutcome::Infeasible => {
                    log::debug!("No memory or stack left to free a register");
                    return Ok(None);
                }
            }
        }

        let granted = ResourceSet::from_resources(&resources);
        let memory: Vec<String> = resources
            .iter()
            .filter(|r| r.is_available(ResourceKind::Memory))
            .map(|r| r.identifier.clone())
            .collect();
        let window = window.minus(init.duration() + finalize.duration());
        let spill_length = (init.length() + finalize.length()) as u32;
        let budget = budget.saturating_sub(spill_length);
        log::debug!(
            "Synthesizing main body for [{}, {}] with {} and budget {}",
            window.min,
            window.max,
            granted,
            budget
        );

        let mut main = None;
        for attempt in 0..=self.config.budget_retries {
            if attempt > 0 {
                session.record_budget_retry();
                log::trace!("Retrying with budget {}", budget.saturating_add(attempt));
            }
            main = self.synthesize_main(
                session,
                scaffold,
                window,
                granted,
                &memory,
                budget.saturating_add(attempt),
            )?;
            if main.is_some() {
                break;
            }
        }

        let Some(main) = main else {
            log::debug!("No routine found for [{}, {}]", request.min, request.max);
            return Ok(None);
        };
        Ok(Some(DelayFunction {
            init,
            main,
            finalize,
            ret,
        }))
    }

    /// Flat group if the window is reachable without a loop, otherwise a loop.
    fn synthesize_main(
        &self,
        session: &SynthesisSession<'c>,
        scaffold: Scaffold<'c>,
        window: Window,
        granted: ResourceSet,
        memory: &[String],
        budget: u32,
    ) -> SynthResult<Option<Executable>> {
        if window.max < 0 {
            return Ok(None);
        }

        let table = session.reachability(granted, budget, memory)?;
        if window.min <= table.max_reachable() {
            if let Some(group) = table.lookup_window(window.min, window.max) {
                return Ok(Some(group.into()));
            }
        }

        let synthesizer = LoopSynthesizer::new(session, scaffold, memory);
        Ok(synthesizer
            .synthesize(window, granted, budget, 0)?
            .map(Executable::from))
    }
}
