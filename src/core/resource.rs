//! Hardware resources and resource-set bitmasks.
//!
//! A [`Resource`] is one element of the target machine the caller lets a delay
//! routine touch: a register, a memory cell or the stack. A [`ResourceSet`] packs
//! what a piece of code needs (or what a budget grants) into a single bitmask so
//! admissibility is one AND test.
//!
//! Bit layout:
//!
//! ```text
//! bit 0..6  registers A B C D E H L (set when the register's value changes)
//! bit 7     at least one memory location accessed
//! bit 8     at least two memory locations accessed
//! bit 9     stack pointer or stack contents read/written
//! ```

use std::fmt;

/// Number of general purpose registers tracked in a resource set.
pub const NUM_REGISTERS: usize = 7;

/// Register names in bit order.
pub const REGISTER_NAMES: [&str; NUM_REGISTERS] = ["A", "B", "C", "D", "E", "H", "L"];

/// Maximum number of memory locations a resource set can count.
pub const MAX_MEMORY_LOCATIONS: usize = 2;

const MEMORY_SHIFT: u16 = NUM_REGISTERS as u16;
const REGISTER_MASK: u16 = (1 << NUM_REGISTERS) - 1;
const STACK_BIT: u16 = 1 << (MEMORY_SHIFT + MAX_MEMORY_LOCATIONS as u16);

/// Kind of hardware element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Register,
    Memory,
    Stack,
}

/// A hardware element offered to (or withheld from) the synthesizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub kind: ResourceKind,
    /// Register letter, memory address, or empty for the stack.
    pub identifier: String,
    pub available: bool,
}

impl Resource {
    pub fn register(name: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Register,
            identifier: name.into(),
            available: true,
        }
    }

    pub fn memory(address: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Memory,
            identifier: address.into(),
            available: true,
        }
    }

    pub fn stack() -> Self {
        Self {
            kind: ResourceKind::Stack,
            identifier: String::new(),
            available: true,
        }
    }

    /// Same resource, marked unavailable.
    pub fn withheld(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn is_available(&self, kind: ResourceKind) -> bool {
        self.available && self.kind == kind
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.available { "" } else { " (withheld)" };
        match self.kind {
            ResourceKind::Register => write!(f, "register {}{}", self.identifier, state),
            ResourceKind::Memory => write!(f, "memory {}{}", self.identifier, state),
            ResourceKind::Stack => write!(f, "stack{}", state),
        }
    }
}

/// Bitmask summary of registers, memory locations and stack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ResourceSet(u16);

impl ResourceSet {
    pub const EMPTY: ResourceSet = ResourceSet(0);

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Encode the resource columns of a catalog row.
    ///
    /// Register letters outside the alphabet (flags, `-` placeholders) are ignored.
    /// Returns `None` when the memory count or stack flag is not a valid number
    /// or the memory count exceeds [`MAX_MEMORY_LOCATIONS`].
    pub fn encode(registers: &str, memory_count: &str, stack: &str) -> Option<Self> {
        let mut set = Self::EMPTY;
        for c in registers.chars() {
            if let Some(index) = register_index(&c.to_string()) {
                set = set.with_register(index);
            }
        }

        let memory: usize = memory_count.trim().parse().ok()?;
        if memory > MAX_MEMORY_LOCATIONS {
            return None;
        }
        set = set.with_memory_count(memory);

        match stack.trim() {
            "0" => {}
            "1" => set.0 |= STACK_BIT,
            _ => return None,
        }
        Some(set)
    }

    /// Encode what a caller-supplied resource list makes available.
    ///
    /// A two-location instruction touches `a` and `a+1`, so the second memory
    /// bit is only granted when two granted addresses are adjacent.
    pub fn from_resources(resources: &[Resource]) -> Self {
        let mut set = Self::EMPTY;
        let mut addresses = Vec::new();
        for resource in resources.iter().filter(|r| r.available) {
            match resource.kind {
                ResourceKind::Register => {
                    if let Some(index) = register_index(&resource.identifier) {
                        set = set.with_register(index);
                    }
                }
                ResourceKind::Memory => addresses.push(resource.identifier.as_str()),
                ResourceKind::Stack => set.0 |= STACK_BIT,
            }
        }
        let memory = if adjacent_pair(&addresses).is_some() {
            MAX_MEMORY_LOCATIONS
        } else {
            addresses.len().min(1)
        };
        set.with_memory_count(memory)
    }

    /// `true` when every requirement in `required` is granted by `self`.
    pub fn covers(self, required: ResourceSet) -> bool {
        (self.0 & required.0) == required.0
    }

    pub fn has_register(self, index: usize) -> bool {
        index < NUM_REGISTERS && self.0 & (1 << index) != 0
    }

    pub fn with_register(self, index: usize) -> Self {
        if index < NUM_REGISTERS {
            Self(self.0 | (1 << index))
        } else {
            self
        }
    }

    pub fn without_register(self, index: usize) -> Self {
        if index < NUM_REGISTERS {
            Self(self.0 & !(1 << index))
        } else {
            self
        }
    }

    /// Indices of the registers in the set, lowest first.
    pub fn registers(self) -> impl Iterator<Item = usize> {
        (0..NUM_REGISTERS).filter(move |&i| self.has_register(i))
    }

    pub fn register_count(self) -> u32 {
        (self.0 & REGISTER_MASK).count_ones()
    }

    pub fn memory_count(self) -> usize {
        ((self.0 >> MEMORY_SHIFT) & 0b11).count_ones() as usize
    }

    pub fn has_stack(self) -> bool {
        self.0 & STACK_BIT != 0
    }

    fn with_memory_count(mut self, count: usize) -> Self {
        for slot in 0..count.min(MAX_MEMORY_LOCATIONS) {
            self.0 |= 1 << (MEMORY_SHIFT + slot as u16);
        }
        self
    }
}

impl fmt::Display for ResourceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let regs: String = self.registers().map(|i| REGISTER_NAMES[i]).collect();
        write!(
            f,
            "regs={} mem={}",
            if regs.is_empty() { "-" } else { &regs },
            self.memory_count()
        )?;
        if self.has_stack() {
            write!(f, " stack")?;
        }
        Ok(())
    }
}

/// Register letter for a bit index.
pub fn register_name(index: usize) -> Option<&'static str> {
    REGISTER_NAMES.get(index).copied()
}

/// Bit index for a register letter.
pub fn register_index(name: &str) -> Option<usize> {
    REGISTER_NAMES.iter().position(|&r| r == name)
}

/// Numeric value of a memory address, `2000H`/`0x2000` hex or plain decimal.
pub fn parse_address(text: &str) -> Option<u32> {
    let text = text.trim();
    if let Some(hex) = text.strip_suffix(['H', 'h']) {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else {
        text.parse().ok()
    }
}

/// Lower address of the first granted pair `a`, `a+1`, as written by the caller.
pub fn adjacent_pair<S: AsRef<str>>(addresses: &[S]) -> Option<&str> {
    let values: Vec<Option<u32>> = addresses
        .iter()
        .map(|a| parse_address(a.as_ref()))
        .collect();
    addresses
        .iter()
        .zip(&values)
        .find(|&(_, &value)| {
            value
                .and_then(|v| v.checked_add(1))
                .is_some_and(|next| values.contains(&Some(next)))
        })
        .map(|(address, _)| address.as_ref())
}
