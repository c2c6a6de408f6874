//! Scaffold instructions.
//!
//! Loops and spills need a fixed set of instructions regardless of what the
//! resource budget allows as filler: counter initialisation, decrement,
//! conditional branch, return, register move, push, pop, load and store. The
//! target names their templates and the catalog supplies their durations.
//! Operands are bound when the instruction is requested, never cached.

use crate::catalog::{InstructionCatalog, InstructionSpec};
use crate::codegen::executable::{Instruction, Operand};
use crate::core::error::CatalogError;
use crate::core::target::{LoopKind, Target};

/// Catalog-backed accessors for scaffold instructions.
#[derive(Clone, Copy)]
pub struct Scaffold<'a> {
    catalog: &'a InstructionCatalog,
    target: &'a dyn Target,
}

/// Cycle costs of one loop archetype on one counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopOverhead {
    pub init: u64,
    /// Decrement plus branch, paid on every iteration.
    pub per_iteration: u64,
}

impl<'a> Scaffold<'a> {
    pub fn new(catalog: &'a InstructionCatalog, target: &'a dyn Target) -> Self {
        Self { catalog, target }
    }

    pub fn target(&self) -> &'a dyn Target {
        self.target
    }

    fn spec(&self, template: &str) -> Result<&'a InstructionSpec, CatalogError> {
        self.catalog.lookup(template)
    }

    pub fn overhead(&self, kind: LoopKind, counter: usize) -> Result<LoopOverhead, CatalogError> {
        let init = self.spec(&self.target.init_template(kind, counter))?;
        let decrement = self.spec(&self.target.decrement_template(kind, counter))?;
        let branch = self.spec(self.target.branch_template())?;
        Ok(LoopOverhead {
            init: init.duration(),
            per_iteration: decrement.duration() + branch.duration(),
        })
    }

    /// Counter initialisation loading `iterations`.
    pub fn loop_init(
        &self,
        kind: LoopKind,
        counter: usize,
        iterations: u32,
    ) -> Result<Instruction, CatalogError> {
        let operand = match kind {
            LoopKind::Wide => Operand::Word(iterations as u16),
            LoopKind::Narrow => Operand::Byte(iterations as u8),
        };
        Ok(self
            .spec(&self.target.init_template(kind, counter))?
            .instantiate(operand))
    }

    pub fn decrement(&self, kind: LoopKind, counter: usize) -> Result<Instruction, CatalogError> {
        Ok(self
            .spec(&self.target.decrement_template(kind, counter))?
            .instantiate(Operand::None))
    }

    pub fn branch(&self, label: &str) -> Result<Instruction, CatalogError> {
        Ok(self
            .spec(self.target.branch_template())?
            .instantiate(Operand::Label(label.to_string())))
    }

    pub fn ret(&self) -> Result<Instruction, CatalogError> {
        Ok(self
            .spec(self.target.return_template())?
            .instantiate(Operand::None))
    }

    pub fn move_register(&self, dest: usize, src: usize) -> Result<Instruction, CatalogError> {
        Ok(self
            .spec(&self.target.move_template(dest, src))?
            .instantiate(Operand::None))
    }

    /// Push saving `register`; `None` when the target cannot push it.
    pub fn push(&self, register: usize) -> Result<Option<Instruction>, CatalogError> {
        match self.target.push_template(register) {
            Some(template) => Ok(Some(self.spec(&template)?.instantiate(Operand::None))),
            None => Ok(None),
        }
    }

    pub fn pop(&self, register: usize) -> Result<Option<Instruction>, CatalogError> {
        match self.target.pop_template(register) {
            Some(template) => Ok(Some(self.spec(&template)?.instantiate(Operand::None))),
            None => Ok(None),
        }
    }

    pub fn load(&self, address: &str) -> Result<Instruction, CatalogError> {
        Ok(self
            .spec(self.target.load_template())?
            .instantiate(Operand::Address(address.to_string())))
    }

    pub fn store(&self, address: &str) -> Result<Instruction, CatalogError> {
        Ok(self
            .spec(self.target.store_template())?
            .instantiate(Operand::Address(address.to_string())))
    }
}
