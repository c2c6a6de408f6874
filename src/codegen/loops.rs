// This module implements the loop synthesizer. It builds a counter loop, possibly nested,
// whose total duration falls inside a cycle window. Two archetypes exist: a wide loop
// counting in a register pair and a narrow loop counting in one register; wide is tried
// first and narrow only when wide finds nothing. For an archetype the counter is taken out
// of the resource set handed to the body, three instruction slots are reserved for the
// init/decrement/branch triad, and iteration counts are tried from the largest feasible one
// down to 2. Each count yields a window for the body; a body whose lower bound exceeds what
// straight-line code can reach becomes a nested loop one level deeper, otherwise the
// reachability table supplies it. The first count with a body wins.

//! Counter loop synthesis.

use crate::codegen::executable::{Executable, Loop};
use crate::codegen::scaffold::Scaffold;
use crate::core::error::SynthResult;
use crate::core::resource::{register_name, ResourceSet};
use crate::core::session::SynthesisSession;
use crate::core::target::LoopKind;

/// Inclusive cycle window; bounds may be negative after overhead is subtracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub min: i64,
    pub max: i64,
}

impl Window {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// Window shrunk by a fixed cost.
    pub fn minus(self, cycles: u64) -> Self {
        let cycles = cycles as i64;
        Self {
            min: self.min - cycles,
            max: self.max - cycles,
        }
    }

    pub fn contains(self, duration: u64) -> bool {
        let duration = duration as i64;
        self.min <= duration && duration <= self.max
    }
}

/// Instruction slots taken by the loop control triad.
const CONTROL_INSTRUCTIONS: u32 = 3;

pub struct LoopSynthesizer<'s, 'c> {
    session: &'s SynthesisSession<'c>,
    scaffold: Scaffold<'c>,
    /// Granted memory addresses, used for filler operands.
    memory: &'s [String],
}

impl<'s, 'c> LoopSynthesizer<'s, 'c> {
    pub fn new(
        session: &'s SynthesisSession<'c>,
        scaffold: Scaffold<'c>,
        memory: &'s [String],
    ) -> Self {
        Self {
            session,
            scaffold,
            memory,
        }
    }

    /// Build a loop lasting between `window.min` and `window.max` cycles.
    ///
    /// `depth` is the nesting level of the loop being built and names its label.
    pub fn synthesize(
        &self,
        window: Window,
        granted: ResourceSet,
        budget: u32,
        depth: u32,
    ) -> SynthResult<Option<Loop>> {
        if let Some(found) = self.try_archetype(LoopKind::Wide, window, granted, budget, depth)? {
            return Ok(Some(found));
        }
        self.try_archetype(LoopKind::Narrow, window, granted, budget, depth)
    }

    /// Counter for `kind` and the resource set left for the body.
    fn pick_counter(&self, kind: LoopKind, granted: ResourceSet) -> Option<(usize, ResourceSet)> {
        let target = self.scaffold.target();
        match kind {
            LoopKind::Wide => target
                .wide_counters()
                .iter()
                .find(|&&(high, low)| granted.has_register(high) && granted.has_register(low))
                .map(|&(high, low)| {
                    (high, granted.without_register(high).without_register(low))
                }),
            LoopKind::Narrow => target
                .narrow_counters()
                .iter()
                .find(|&&reg| granted.has_register(reg))
                .map(|&reg| (reg, granted.without_register(reg))),
        }
    }

    fn try_archetype(
        &self,
        kind: LoopKind,
        window: Window,
        granted: ResourceSet,
        budget: u32,
        depth: u32,
    ) -> SynthResult<Option<Loop>> {
        let Some(body_budget) = budget.checked_sub(CONTROL_INSTRUCTIONS) else {
            return Ok(None);
        };
        let Some((counter, body_granted)) = self.pick_counter(kind, granted) else {
            return Ok(None);
        };
        self.session.record_loop_attempt(kind);

        let overhead = self.scaffold.overhead(kind, counter)?;
        let window = window.minus(overhead.init);
        let per_iteration = overhead.per_iteration as i64;
        if window.max < 0 || per_iteration == 0 {
            return Ok(None);
        }

        let max_iterations = self
            .scaffold
            .target()
            .max_iterations(kind)
            .min((window.max / per_iteration).min(u32::MAX as i64) as u32);
        log::trace!(
            "Trying {} loop at depth {} on {}, window [{}, {}], up to {} iterations",
            kind.name(),
            depth,
            register_name(counter).unwrap_or("?"),
            window.min,
            window.max,
            max_iterations
        );

        for iterations in (2..=max_iterations).rev() {
            self.session.charge(1)?;
            self.session.record_iteration_candidate();

            let n = i64::from(iterations);
            let body_min = div_ceil(window.min, n) - per_iteration;
            let body_max = window.max.div_euclid(n) - per_iteration;
            if body_min > body_max || body_max < 0 {
                continue;
            }

            let table = self
                .session
                .reachability(body_granted, body_budget, self.memory)?;
            let body: Option<Executable> = if body_min > table.max_reachable() {
                self.synthesize(Window::new(body_min, body_max), body_granted, body_budget, depth + 1)?
                    .map(|inner| {
                        self.session.record_nested_loop();
                        inner.into()
                    })
            } else {
                table.lookup_window(body_min, body_max).map(Executable::from)
            };

            if let Some(body) = body {
                let label = self.scaffold.target().loop_label(depth);
                log::debug!(
                    "Built {} loop '{}' with {} iterations, body {} cycles",
                    kind.name(),
                    label,
                    iterations,
                    body.duration()
                );
                return Ok(Some(Loop {
                    init: self.scaffold.loop_init(kind, counter, iterations)?,
                    body,
                    decrement: self.scaffold.decrement(kind, counter)?,
                    condition: self.scaffold.branch(&label)?,
                    label,
                    iterations,
                }));
            }
        }
        Ok(None)
    }
}

/// Ceiling division for a positive divisor.
fn div_ceil(value: i64, divisor: i64) -> i64 {
    -((-value).div_euclid(divisor))
}
