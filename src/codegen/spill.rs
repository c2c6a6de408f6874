// This module implements the resource spiller. When the granted registers are too few for
// the requested window, the builder asks the spiller to free one more: the first register
// the caller did not grant is saved in the routine's init part and restored at the front of
// its finalize part, then offered to the synthesizer as an ordinary register. A free memory
// location is preferred; the register travels through the primary register (MOV A,r; STA
// addr and LDA addr; MOV r,A) and the location is consumed. Otherwise the register's stack
// unit is pushed and popped, once per unit. Without memory or stack the request is
// infeasible. The trigger is a closed-form estimate of how many flat instructions would
// remain if every granted register counted a maximal narrow loop.

//! Register spilling.

use crate::codegen::executable::{Executable, Group};
use crate::codegen::scaffold::Scaffold;
use crate::core::error::SynthResult;
use crate::core::resource::{Resource, ResourceKind, ResourceSet, REGISTER_NAMES};
use crate::core::session::SynthesisSession;
use crate::core::target::LoopKind;

/// Result of one spill attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpillOutcome {
    /// A register was freed through memory.
    Memory(usize),
    /// A register was freed through the stack.
    Stack(usize),
    /// Every register is already granted.
    NothingToFree,
    /// No memory location or stack to save a register in.
    Infeasible,
}

pub struct Spiller<'s, 'c> {
    session: &'s SynthesisSession<'c>,
    scaffold: Scaffold<'c>,
}

impl<'s, 'c> Spiller<'s, 'c> {
    pub fn new(session: &'s SynthesisSession<'c>, scaffold: Scaffold<'c>) -> Self {
        Self { session, scaffold }
    }

    /// Estimated flat instruction count left over when every granted register
    /// counts a maximal narrow loop.
    pub fn estimate(&self, window_min: i64, granted: ResourceSet) -> SynthResult<f64> {
        let Some(shortest) = self
            .session
            .catalog()
            .filter_available(granted)
            .iter()
            .map(|spec| spec.duration())
            .min()
        else {
            return Ok(f64::INFINITY);
        };

        let target = self.scaffold.target();
        let counter = target
            .narrow_counters()
            .first()
            .copied()
            .unwrap_or_else(|| target.primary_register());
        let per_iteration = self.scaffold.overhead(LoopKind::Narrow, counter)?.per_iteration;

        let n = 256f64.powi(granted.register_count() as i32);
        let k = per_iteration as f64 * n;
        Ok((window_min as f64 - k) / (n * shortest as f64))
    }

    pub fn needs_spill(&self, window_min: i64, granted: ResourceSet) -> SynthResult<bool> {
        let estimate = self.estimate(window_min, granted)?;
        let threshold = self.session.config().spill_threshold as f64;
        log::trace!("Spill estimate {:.1} for {} (threshold {})", estimate, granted, threshold);
        Ok(estimate > threshold)
    }

    /// Free one register, recording its save in `init` and restore in `finalize`.
    pub fn spill(
        &self,
        resources: &mut Vec<Resource>,
        init: &mut Group,
        finalize: &mut Group,
    ) -> SynthResult<SpillOutcome> {
        let granted = ResourceSet::from_resources(resources);
        let Some((register, &name)) = REGISTER_NAMES
            .iter()
            .enumerate()
            .find(|&(r, _)| !granted.has_register(r))
        else {
            return Ok(SpillOutcome::NothingToFree);
        };

        if let Some(slot) = resources
            .iter()
            .position(|r| r.is_available(ResourceKind::Memory))
        {
            let address = resources[slot].identifier.clone();
            let primary = self.scaffold.target().primary_register();
            if register != primary {
                init.append(self.scaffold.move_register(primary, register)?);
            }
            init.append(self.scaffold.store(&address)?);
            if register != primary {
                finalize.insert(self.scaffold.move_register(register, primary)?);
            }
            finalize.insert(self.scaffold.load(&address)?);

            resources[slot] = Resource::register(name);
            self.session.record_memory_spill();
            log::debug!("Spilled register {} to memory at {}", name, address);
            return Ok(SpillOutcome::Memory(register));
        }

        if resources.iter().any(|r| r.is_available(ResourceKind::Stack)) {
            let (Some(push), Some(pop)) = (
                self.scaffold.push(register)?,
                self.scaffold.pop(register)?,
            ) else {
                return Ok(SpillOutcome::Infeasible);
            };
            let push: Executable = push.into();
            if !init.contains(&push) {
                init.append(push);
            }
            let pop: Executable = pop.into();
            if !finalize.contains(&pop) {
                finalize.insert(pop);
            }

            resources.push(Resource::register(name));
            self.session.record_stack_spill();
            log::debug!("Spilled register {} to the stack", name);
            return Ok(SpillOutcome::Stack(register));
        }

        Ok(SpillOutcome::Infeasible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InstructionCatalog;
    use crate::core::session::SynthesisConfig;
    use crate::core::target::Target;
    use crate::i8085::I8085;

    fn catalog() -> InstructionCatalog {
        InstructionCatalog::parse(I8085.bundled_catalog()).unwrap()
    }

    #[test]
    fn test_memory_spill_goes_through_accumulator() {
        let catalog = catalog();
        let session = SynthesisSession::new(&catalog, SynthesisConfig::default());
        let spiller = Spiller::new(&session, Scaffold::new(&catalog, &I8085));
        let mut resources = vec![Resource::register("A"), Resource::memory("2000H")];
        let mut init = Group::new();
        let mut finalize = Group::new();

        let outcome = spiller.spill(&mut resources, &mut init, &mut finalize).unwrap();
        assert_eq!(outcome, SpillOutcome::Memory(1));
        assert_eq!(
            Executable::from(init.clone()).render(),
            "\tMOV A,B\n\tSTA 2000H\n"
        );
        assert_eq!(
            Executable::from(finalize.clone()).render(),
            "\tLDA 2000H\n\tMOV B,A\n"
        );
        assert_eq!(resources[1], Resource::register("B"));
        assert_eq!(session.stats().memory_spills, 1);
    }

    #[test]
    fn test_accumulator_spill_skips_move() {
        let catalog = catalog();
        let session = SynthesisSession::new(&catalog, SynthesisConfig::default());
        let spiller = Spiller::new(&session, Scaffold::new(&catalog, &I8085));
        let mut resources = vec![Resource::memory("10")];
        let mut init = Group::new();
        let mut finalize = Group::new();

        let outcome = spiller.spill(&mut resources, &mut init, &mut finalize).unwrap();
        assert_eq!(outcome, SpillOutcome::Memory(0));
        assert_eq!(init.length(), 1);
        assert_eq!(finalize.length(), 1);
        assert_eq!(init.duration() + finalize.duration(), 26);
    }

    #[test]
    fn test_stack_spill_pairs_are_deduplicated() {
        let catalog = catalog();
        let session = SynthesisSession::new(&catalog, SynthesisConfig::default());
        let spiller = Spiller::new(&session, Scaffold::new(&catalog, &I8085));
        let mut resources = vec![Resource::register("A"), Resource::stack()];
        let mut init = Group::new();
        let mut finalize = Group::new();

        assert_eq!(
            spiller.spill(&mut resources, &mut init, &mut finalize).unwrap(),
            SpillOutcome::Stack(1)
        );
        assert_eq!(
            spiller.spill(&mut resources, &mut init, &mut finalize).unwrap(),
            SpillOutcome::Stack(2)
        );
        assert_eq!(
            spiller.spill(&mut resources, &mut init, &mut finalize).unwrap(),
            SpillOutcome::Stack(3)
        );
        let pushes: Vec<String> = init.items().iter().map(|e| e.render()).collect();
        assert_eq!(pushes, vec!["\tPUSH B\n", "\tPUSH D\n"]);
        let pops: Vec<String> = finalize.items().iter().map(|e| e.render()).collect();
        assert_eq!(pops, vec!["\tPOP D\n", "\tPOP B\n"]);
        assert!(ResourceSet::from_resources(&resources).has_register(3));
    }

    #[test]
    fn test_all_registers_granted_frees_nothing() {
        let catalog = catalog();
        let session = SynthesisSession::new(&catalog, SynthesisConfig::default());
        let spiller = Spiller::new(&session, Scaffold::new(&catalog, &I8085));
        let mut resources: Vec<Resource> =
            REGISTER_NAMES.iter().map(|&r| Resource::register(r)).collect();
        resources.push(Resource::stack());
        let mut init = Group::new();
        let mut finalize = Group::new();
        assert_eq!(
            spiller.spill(&mut resources, &mut init, &mut finalize).unwrap(),
            SpillOutcome::NothingToFree
        );
        assert_eq!(resources.len(), REGISTER_NAMES.len() + 1);
    }

    #[test]
    fn test_no_memory_no_stack_is_infeasible() {
        let catalog = catalog();
        let session = SynthesisSession::new(&catalog, SynthesisConfig::default());
        let spiller = Spiller::new(&session, Scaffold::new(&catalog, &I8085));
        let mut resources = vec![Resource::register("A")];
        let mut init = Group::new();
        let mut finalize = Group::new();
        assert_eq!(
            spiller.spill(&mut resources, &mut init, &mut finalize).unwrap(),
            SpillOutcome::Infeasible
        );
        assert!(init.is_empty());
    }

    #[test]
    fn test_estimate_triggers_on_long_windows() {
        let catalog = catalog();
        let session = SynthesisSession::new(&catalog, SynthesisConfig::default());
        let spiller = Spiller::new(&session, Scaffold::new(&catalog, &I8085));
        let only_a = ResourceSet::encode("A", "0", "0").unwrap();
        assert!(spiller.needs_spill(100_000_000, only_a).unwrap());
        assert!(!spiller.needs_spill(1_000, only_a).unwrap());
        let three = ResourceSet::encode("ABC", "0", "0").unwrap();
        assert!(!spiller.needs_spill(100_000_000, three).unwrap());
        assert_eq!(I8085.primary_register(), 0);
    }
}
