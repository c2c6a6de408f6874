//! Target machine abstraction.
//!
//! Everything the synthesizer needs to know about a processor beyond its
//! instruction catalog lives behind the [`Target`] trait: which registers can
//! count loops and in what order of preference, the templates of the scaffold
//! instructions, and how a register is saved to the stack. Targets are looked
//! up by identifier in a [`TargetRegistry`], so adding a processor means
//! registering one more implementation.

use super::error::{SynthError, SynthResult};

/// Loop archetype, named after the width of its counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopKind {
    /// 16-bit register pair counter.
    Wide,
    /// 8-bit register counter.
    Narrow,
}

impl LoopKind {
    pub fn name(self) -> &'static str {
        match self {
            LoopKind::Wide => "wide",
            LoopKind::Narrow => "narrow",
        }
    }
}

/// Architecture specific knowledge used by the synthesizer.
///
/// Register arguments are bit indices of [`crate::core::resource::ResourceSet`].
pub trait Target: Send + Sync {
    /// Identifier used to select the target.
    fn id(&self) -> &'static str;

    /// Alternative identifiers accepted by the registry.
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    /// Catalog text shipped with the target.
    fn bundled_catalog(&self) -> &'static str;

    /// Register pairs usable as wide counters as (high, low), most preferred first.
    fn wide_counters(&self) -> &'static [(usize, usize)];

    /// Registers usable as narrow counters, most preferred first.
    fn narrow_counters(&self) -> &'static [usize];

    /// Largest iteration count a counter of this kind can hold.
    fn max_iterations(&self, kind: LoopKind) -> u32;

    /// Register through which memory loads and stores go.
    fn primary_register(&self) -> usize;

    /// Counter initialisation; `counter` is the register (or high register of the pair).
    fn init_template(&self, kind: LoopKind, counter: usize) -> String;

    fn decrement_template(&self, kind: LoopKind, counter: usize) -> String;

    /// Conditional branch taken while the counter is non-zero.
    fn branch_template(&self) -> &'static str;

    fn return_template(&self) -> &'static str;

    fn move_template(&self, dest: usize, src: usize) -> String;

    /// Push saving `register`, or `None` if it cannot be pushed.
    fn push_template(&self, register: usize) -> Option<String>;

    fn pop_template(&self, register: usize) -> Option<String>;

    /// Load of the primary register from an address.
    fn load_template(&self) -> &'static str;

    /// Store of the primary register to an address.
    fn store_template(&self) -> &'static str;

    /// Label of a loop at nesting depth `depth`.
    fn loop_label(&self, depth: u32) -> String {
        format!("loop{}", depth)
    }
}

/// Targets keyed by identifier.
pub struct TargetRegistry {
    targets: Vec<Box<dyn Target>>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self {
            targets: Vec::new(),
        }
    }

    /// Registry with every target shipped in this crate.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(crate::i8085::I8085));
        registry
    }

    pub fn register(&mut self, target: Box<dyn Target>) {
        self.targets.push(target);
    }

    pub fn get(&self, id: &str) -> SynthResult<&dyn Target> {
        let wanted = id.trim().to_ascii_lowercase();
        self.targets
            .iter()
            .find(|t| t.id() == wanted || t.aliases().iter().any(|a| *a == wanted))
            .map(|t| t.as_ref())
            .ok_or_else(|| SynthError::UnknownTarget { id: id.to_string() })
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.targets.iter().map(|t| t.id()).collect()
    }
}

impl Default for TargetRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let registry = TargetRegistry::with_builtin();
        assert_eq!(registry.get("8085").unwrap().id(), "8085");
        assert_eq!(registry.get("i8085").unwrap().id(), "8085");
        assert_eq!(registry.ids(), vec!["8085"]);
    }

    #[test]
    fn test_unknown_target() {
        let registry = TargetRegistry::with_builtin();
        assert!(matches!(
            registry.get("z80"),
            Err(SynthError::UnknownTarget { .. })
        ));
    }

    #[test]
    fn test_empty_registry() {
        let registry = TargetRegistry::new();
        assert!(registry.get("8085").is_err());
    }
}
