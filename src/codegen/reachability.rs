// This module implements the duration reachability table. Given the filtered instruction
// list for one resource set and an instruction budget B, it marks every cycle count that a
// straight-line sequence of at most B instructions can reach, together with one sequence
// reaching it. The table is filled in B rounds; each round scans the marked durations from
// the highest down and extends them by every available instruction. Scanning downward means
// a duration marked in the current round sits above the scan position and cannot be
// extended again before the next round, so an entry first marked in round r holds at most r
// instructions. Entries are stored as back pointers (previous duration, instruction) rather
// than copied sequences; walking the chain from an entry yields its instructions.

//! Duration reachability table.

use crate::catalog::InstructionSpec;
use crate::codegen::executable::{Executable, Group, Instruction};
use crate::core::error::SynthResult;
use crate::core::session::SynthesisSession;

/// How a duration was first reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Step {
    prev: usize,
    instruction: usize,
}

/// Reachable durations of straight-line code under one resource set and budget.
#[derive(Debug, Clone)]
pub struct ReachabilityTable {
    instructions: Vec<Instruction>,
    /// `entries[0]` is the empty sequence; `None` marks an unreachable duration.
    entries: Vec<Option<Step>>,
    reached: Vec<bool>,
    budget: u32,
    max_reachable: usize,
}

impl ReachabilityTable {
    /// Fill the table for `available` instructions and at most `budget` of them.
    ///
    /// `memory` holds the granted memory addresses used as filler operands.
    /// Allocating the table charges one search step of `session` per entry, and
    /// every round charges one per duration it scans.
    pub fn compute(
        available: &[&InstructionSpec],
        budget: u32,
        memory: &[String],
        session: &SynthesisSession<'_>,
    ) -> SynthResult<Self> {
        let instructions: Vec<Instruction> =
            available.iter().map(|spec| spec.filler(memory)).collect();
        let max_duration = instructions
            .iter()
            .map(|i| i.duration() as usize)
            .max()
            .unwrap_or(0);
        let bound = u64::from(budget)
            .saturating_mul(max_duration as u64)
            .saturating_add(1);
        session.charge(bound)?;
        let bound = bound as usize;

        let mut table = Self {
            instructions,
            entries: vec![None; bound],
            reached: vec![false; bound],
            budget,
            max_reachable: 0,
        };
        table.reached[0] = true;

        for _ in 0..budget {
            session.charge(table.max_reachable as u64 + 1)?;
            if !table.extend_round() {
                break;
            }
        }
        Ok(table)
    }

    /// One round of extension; returns whether anything new was marked.
    fn extend_round(&mut self) -> bool {
        let mut changed = false;
        for i in (0..=self.max_reachable).rev() {
            if !self.reached[i] {
                continue;
            }
            for (index, instruction) in self.instructions.iter().enumerate() {
                // At most `budget` instructions of at most the longest duration.
                let next = i + instruction.duration() as usize;
                debug_assert!(next < self.reached.len());
                if !self.reached[next] {
                    self.reached[next] = true;
                    self.entries[next] = Some(Step {
                        prev: i,
                        instruction: index,
                    });
                    changed = true;
                }
            }
        }
        if let Some(highest) = self.reached.iter().rposition(|&r| r) {
            self.max_reachable = highest;
        }
        changed
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    /// Size of the table, one past the highest representable duration.
    pub fn bound(&self) -> usize {
        self.reached.len()
    }

    /// Highest reachable duration.
    pub fn max_reachable(&self) -> i64 {
        self.max_reachable as i64
    }

    pub fn is_reachable(&self, duration: i64) -> bool {
        usize::try_from(duration)
            .ok()
            .and_then(|d| self.reached.get(d).copied())
            .unwrap_or(false)
    }

    /// Instructions of the sequence reaching `duration`.
    pub fn sequence(&self, duration: i64) -> Option<Vec<Instruction>> {
        if !self.is_reachable(duration) {
            return None;
        }
        let mut at = duration as usize;
        let mut sequence = Vec::new();
        while let Some(step) = self.entries[at] {
            sequence.push(self.instructions[step.instruction].clone());
            at = step.prev;
        }
        sequence.reverse();
        Some(sequence)
    }

    /// Sequence for the smallest reachable duration in `[max(min, 0), max]`.
    pub fn lookup_window(&self, min: i64, max: i64) -> Option<Group> {
        let low = min.max(0);
        if max < low {
            return None;
        }
        let high = max.min(self.max_reachable as i64);
        let duration = (low..=high).find(|&d| self.is_reachable(d))?;
        let items = self.sequence(duration)?;
        Some(Group::unordered(
            items.into_iter().map(Executable::from).collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InstructionCatalog;
    use crate::core::error::SynthError;
    use crate::core::resource::ResourceSet;
    use crate::core::session::SynthesisConfig;

    const SAMPLE: &str = "\
BEGIN
NOP;4;1;-;0;0;+
MVI B,8b;7;2;B;0;0;+
LXI B,16b;10;3;BC;0;0;+
LDA 16b;13;3;A;1;0;+
END
";

    fn table(granted: ResourceSet, budget: u32, memory: &[String]) -> ReachabilityTable {
        let catalog = InstructionCatalog::parse(SAMPLE).unwrap();
        let session = SynthesisSession::new(&catalog, SynthesisConfig::default());
        let available = catalog.filter_available(granted);
        ReachabilityTable::compute(&available, budget, memory, &session).unwrap()
    }

    #[test]
    fn test_zero_budget_reaches_only_zero() {
        let t = table(ResourceSet::EMPTY, 0, &[]);
        assert_eq!(t.max_reachable(), 0);
        assert_eq!(t.bound(), 1);
        let group = t.lookup_window(-5, 3).unwrap();
        assert!(group.is_empty());
        assert!(t.lookup_window(1, 3).is_none());
    }

    #[test]
    fn test_budget_bounds_instruction_count() {
        let t = table(ResourceSet::EMPTY, 3, &[]);
        assert_eq!(t.max_reachable(), 12);
        assert!(t.is_reachable(8));
        assert!(!t.is_reachable(10));
        assert_eq!(t.sequence(12).unwrap().len(), 3);
    }

    #[test]
    fn test_entries_sum_to_their_duration() {
        let t = table(ResourceSet::encode("BC", "0", "0").unwrap(), 4, &[]);
        for d in 0..t.bound() as i64 {
            if let Some(seq) = t.sequence(d) {
                assert_eq!(seq.iter().map(Instruction::duration).sum::<u64>() as i64, d);
                assert!(seq.len() <= 4);
            }
        }
        assert_eq!(t.max_reachable(), 40);
    }

    #[test]
    fn test_lookup_picks_smallest_in_window() {
        let t = table(ResourceSet::encode("B", "0", "0").unwrap(), 2, &[]);
        // reachable: 0 4 7 8 11 14
        let group = t.lookup_window(9, 14).unwrap();
        assert_eq!(group.duration(), 11);
        assert!(t.lookup_window(12, 13).is_none());
    }

    #[test]
    fn test_work_is_charged_per_duration() {
        let catalog = InstructionCatalog::parse(SAMPLE).unwrap();
        let session = SynthesisSession::new(&catalog, SynthesisConfig::default());
        let available = catalog.filter_available(ResourceSet::EMPTY);
        ReachabilityTable::compute(&available, 3, &[], &session).unwrap();
        // 13 entries, then rounds scanning durations 0, 0..=4 and 0..=8
        assert_eq!(session.steps(), 13 + 1 + 5 + 9);
    }

    #[test]
    fn test_huge_budget_stops_before_allocating() {
        let catalog = InstructionCatalog::parse(SAMPLE).unwrap();
        let config = SynthesisConfig {
            step_limit: 10_000,
            ..SynthesisConfig::default()
        };
        let session = SynthesisSession::new(&catalog, config);
        let available = catalog.filter_available(ResourceSet::EMPTY);
        let result = ReachabilityTable::compute(&available, u32::MAX, &[], &session);
        assert!(matches!(
            result,
            Err(SynthError::SearchLimit { limit: 10_000 })
        ));
    }

    #[test]
    fn test_memory_filler_uses_granted_address() {
        let memory = vec!["3000H".to_string()];
        let t = table(ResourceSet::encode("A", "1", "0").unwrap(), 1, &memory);
        let group = t.lookup_window(13, 13).unwrap();
        assert_eq!(Executable::from(group).render(), "\tLDA 3000H\n");
    }
}
