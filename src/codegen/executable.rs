// This module defines the value types for generated code. Executable is a closed tagged
// variant over a single Instruction, a Group of executables, a counter Loop and a whole
// DelayFunction. Every variant reports its cycle duration and instruction count, computed
// recursively from its parts, and renders as an assembler listing: one instruction per
// tab-indented line, loop labels left-justified on their own line right before the first
// body instruction. Instructions carry a typed operand that fills the template's
// placeholder when rendered, so an immediate is never baked into the template text.

//! Generated code: instructions, groups, loops and delay functions.

use std::fmt;

use crate::catalog::Placeholder;

/// Value bound to an instruction's placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    None,
    Byte(u8),
    Word(u16),
    /// Memory address as given by the caller.
    Address(String),
    /// Jump target.
    Label(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => Ok(()),
            Operand::Byte(v) => write!(f, "{}", v),
            Operand::Word(v) => write!(f, "{}", v),
            Operand::Address(a) => f.write_str(a),
            Operand::Label(l) => f.write_str(l),
        }
    }
}

/// A single machine instruction with its fixed duration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instruction {
    template: String,
    placeholder: Placeholder,
    operand: Operand,
    duration: u64,
}

impl Instruction {
    pub fn new(template: String, placeholder: Placeholder, operand: Operand, duration: u64) -> Self {
        Self {
            template,
            placeholder,
            operand,
            duration,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn operand(&self) -> &Operand {
        &self.operand
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    /// Assembler text with the placeholder replaced by the operand.
    pub fn render(&self) -> String {
        match (self.placeholder.token(), &self.operand) {
            (Some(token), operand) if *operand != Operand::None => {
                substitute_token(&self.template, token, &operand.to_string())
            }
            _ => self.template.clone(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Replace the first whole-token occurrence of `token` in `template`.
fn substitute_token(template: &str, token: &str, value: &str) -> String {
    let mut out = String::with_capacity(template.len() + value.len());
    let mut word = String::new();
    let mut replaced = false;

    let mut flush = |word: &mut String, out: &mut String| {
        if !replaced && word.as_str() == token {
            out.push_str(value);
            replaced = true;
        } else {
            out.push_str(word);
        }
        word.clear();
    };

    for c in template.chars() {
        if c.is_ascii_alphanumeric() {
            word.push(c);
        } else {
            flush(&mut word, &mut out);
            out.push(c);
        }
    }
    flush(&mut word, &mut out);
    out
}

/// A sequence of executables.
///
/// Unordered groups come out of the reachability table, where only the
/// multiset of instructions matters; they still render in stored order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    items: Vec<Executable>,
    ordered: bool,
}

impl Group {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            ordered: true,
        }
    }

    pub fn unordered(items: Vec<Executable>) -> Self {
        Self {
            items,
            ordered: false,
        }
    }

    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    pub fn append(&mut self, item: impl Into<Executable>) {
        self.items.push(item.into());
    }

    pub fn insert(&mut self, item: impl Into<Executable>) {
        self.items.insert(0, item.into());
    }

    pub fn contains(&self, item: &Executable) -> bool {
        self.items.iter().any(|e| e == item)
    }

    pub fn items(&self) -> &[Executable] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn duration(&self) -> u64 {
        self.items.iter().map(Executable::duration).sum()
    }

    pub fn length(&self) -> usize {
        self.items.iter().map(Executable::length).sum()
    }

    fn render_into(&self, out: &mut String) {
        for item in &self.items {
            item.render_into(out);
        }
    }
}

impl Default for Group {
    fn default() -> Self {
        Self::new()
    }
}

/// A counter loop.
///
/// ```text
///         init            ; load counter with `iterations`
/// label:  body
///         decrement
///         condition       ; branch to label while counter != 0
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loop {
    pub init: Instruction,
    pub body: Executable,
    pub decrement: Instruction,
    pub condition: Instruction,
    pub label: String,
    pub iterations: u32,
}

impl Loop {
    /// Cycles spent per iteration, control instructions included.
    pub fn iteration_duration(&self) -> u64 {
        self.body.duration() + self.decrement.duration() + self.condition.duration()
    }

    pub fn duration(&self) -> u64 {
        self.init.duration() + u64::from(self.iterations) * self.iteration_duration()
    }

    pub fn length(&self) -> usize {
        3 + self.body.length()
    }

    fn render_into(&self, out: &mut String) {
        push_instruction(out, &self.init);
        out.push_str(&self.label);
        out.push_str(":\n");
        self.body.render_into(out);
        push_instruction(out, &self.decrement);
        push_instruction(out, &self.condition);
    }
}

/// A complete delay routine: save, delay, restore, return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelayFunction {
    pub init: Group,
    pub main: Executable,
    pub finalize: Group,
    pub ret: Option<Instruction>,
}

impl DelayFunction {
    pub fn duration(&self) -> u64 {
        self.init.duration()
            + self.main.duration()
            + self.finalize.duration()
            + self.ret.as_ref().map_or(0, Instruction::duration)
    }

    pub fn length(&self) -> usize {
        self.init.length()
            + self.main.length()
            + self.finalize.length()
            + usize::from(self.ret.is_some())
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        self.init.render_into(out);
        self.main.render_into(out);
        self.finalize.render_into(out);
        if let Some(ret) = &self.ret {
            push_instruction(out, ret);
        }
    }
}

impl fmt::Display for DelayFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Any piece of generated code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Executable {
    Instruction(Instruction),
    Group(Group),
    Loop(Box<Loop>),
    Function(Box<DelayFunction>),
}

impl Executable {
    /// Total cycles, computed from the parts.
    pub fn duration(&self) -> u64 {
        match self {
            Executable::Instruction(i) => i.duration(),
            Executable::Group(g) => g.duration(),
            Executable::Loop(l) => l.duration(),
            Executable::Function(f) => f.duration(),
        }
    }

    /// Number of instructions.
    pub fn length(&self) -> usize {
        match self {
            Executable::Instruction(_) => 1,
            Executable::Group(g) => g.length(),
            Executable::Loop(l) => l.length(),
            Executable::Function(f) => f.length(),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        match self {
            Executable::Instruction(i) => push_instruction(out, i),
            Executable::Group(g) => g.render_into(out),
            Executable::Loop(l) => l.render_into(out),
            Executable::Function(f) => f.render_into(out),
        }
    }
}

impl fmt::Display for Executable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<Instruction> for Executable {
    fn from(i: Instruction) -> Self {
        Executable::Instruction(i)
    }
}

impl From<Group> for Executable {
    fn from(g: Group) -> Self {
        Executable::Group(g)
    }
}

impl From<Loop> for Executable {
    fn from(l: Loop) -> Self {
        Executable::Loop(Box::new(l))
    }
}

impl From<DelayFunction> for Executable {
    fn from(f: DelayFunction) -> Self {
        Executable::Function(Box::new(f))
    }
}

fn push_instruction(out: &mut String, instruction: &Instruction) {
    out.push('\t');
    out.push_str(&instruction.render());
    out.push('\n');
}

/// Count listing lines that hold an instruction (everything but labels).
pub fn count_instruction_lines(listing: &str) -> usize {
    listing
        .lines()
        .filter(|line| !line.is_empty() && !line.trim_end().ends_with(':'))
        .count()
}
