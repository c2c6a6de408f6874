// This module implements the Intel 8085 target. It ships the bundled instruction catalog
// (data/i8085.txt) and encodes the processor's loop and spill conventions: register pairs
// BC, DE and HL can count up to 65535 iterations with LXI/DCX, single registers up to 255
// with MVI/DCR, and both loops close with JNZ back to the loop label. The accumulator A is
// the only register LDA/STA can move to and from memory, so spilling another register to
// memory goes through A. Stack spills push whole pairs (B, D, H) or PSW for A.

//! Intel 8085 target.

use crate::core::resource::register_name;
use crate::core::target::{LoopKind, Target};

const A: usize = 0;
const B: usize = 1;
const C: usize = 2;
const D: usize = 3;
const E: usize = 4;
const H: usize = 5;
const L: usize = 6;

static CATALOG: &str = include_str!("../../data/i8085.txt");

static WIDE_COUNTERS: [(usize, usize); 3] = [(B, C), (D, E), (H, L)];

static NARROW_COUNTERS: [usize; 7] = [B, C, D, E, A, H, L];

/// The Intel 8085.
#[derive(Debug, Clone, Copy, Default)]
pub struct I8085;

impl I8085 {
    fn name(register: usize) -> &'static str {
        register_name(register).unwrap_or("?")
    }

    /// Operand naming the push/pop unit holding `register`.
    fn stack_unit(register: usize) -> Option<&'static str> {
        match register {
            A => Some("PSW"),
            B | C => Some("B"),
            D | E => Some("D"),
            H | L => Some("H"),
            _ => None,
        }
    }
}

impl Target for I8085 {
    fn id(&self) -> &'static str {
        "8085"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["i8085", "intel8085"]
    }

    fn bundled_catalog(&self) -> &'static str {
        CATALOG
    }

    fn wide_counters(&self) -> &'static [(usize, usize)] {
        &WIDE_COUNTERS
    }

    fn narrow_counters(&self) -> &'static [usize] {
        &NARROW_COUNTERS
    }

    fn max_iterations(&self, kind: LoopKind) -> u32 {
        match kind {
            LoopKind::Wide => u32::from(u16::MAX),
            LoopKind::Narrow => u32::from(u8::MAX),
        }
    }

    fn primary_register(&self) -> usize {
        A
    }

    fn init_template(&self, kind: LoopKind, counter: usize) -> String {
        match kind {
            LoopKind::Wide => format!("LXI {},16b", Self::name(counter)),
            LoopKind::Narrow => format!("MVI {},8b", Self::name(counter)),
        }
    }

    fn decrement_template(&self, kind: LoopKind, counter: usize) -> String {
        match kind {
            LoopKind::Wide => format!("DCX {}", Self::name(counter)),
            LoopKind::Narrow => format!("DCR {}", Self::name(counter)),
        }
    }

    fn branch_template(&self) -> &'static str {
        "JNZ 16b"
    }

    fn return_template(&self) -> &'static str {
        "RET"
    }

    fn move_template(&self, dest: usize, src: usize) -> String {
        format!("MOV {},{}", Self::name(dest), Self::name(src))
    }

    fn push_template(&self, register: usize) -> Option<String> {
        Self::stack_unit(register).map(|unit| format!("PUSH {}", unit))
    }

    fn pop_template(&self, register: usize) -> Option<String> {
        Self::stack_unit(register).map(|unit| format!("POP {}", unit))
    }

    fn load_template(&self) -> &'static str {
        "LDA 16b"
    }

    fn store_template(&self) -> &'static str {
        "STA 16b"
    }
}
