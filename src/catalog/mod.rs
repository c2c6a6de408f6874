//! Instruction catalog.
//!
//! The catalog is the full instruction table of one target machine: template,
//! cycle duration, byte size, required resources and whether the synthesizer
//! may pick the instruction as filler. It is loaded once and then only read,
//! so a single catalog can be shared by reference across requests.
//!
//! Templates may carry one immediate placeholder token, `8b` or `16b`
//! (`MVI B,8b`, `JNZ 16b`). The placeholder is never substituted inside the
//! catalog; [`InstructionSpec::instantiate`] produces an [`Instruction`] whose
//! operand is filled in when it is rendered.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

use crate::codegen::executable::{Instruction, Operand};
use crate::core::error::CatalogError;
use crate::core::resource::{adjacent_pair, ResourceSet};

pub mod parser;

pub use parser::parse_catalog;

/// Immediate placeholder carried by a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    None,
    /// `8b`
    Byte,
    /// `16b`
    Word,
}

impl Placeholder {
    pub fn token(self) -> Option<&'static str> {
        match self {
            Placeholder::None => None,
            Placeholder::Byte => Some("8b"),
            Placeholder::Word => Some("16b"),
        }
    }

    /// Detect the placeholder as a whole token of `template`.
    pub fn detect(template: &str) -> Self {
        let mut found = Placeholder::None;
        for token in template.split(|c: char| !c.is_ascii_alphanumeric()) {
            match token {
                "16b" => return Placeholder::Word,
                "8b" => found = Placeholder::Byte,
                _ => {}
            }
        }
        found
    }
}

/// One row of the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionSpec {
    template: String,
    duration: u64,
    size: u32,
    requires: ResourceSet,
    usable: bool,
    placeholder: Placeholder,
}

impl InstructionSpec {
    pub fn new(
        template: impl Into<String>,
        duration: u64,
        size: u32,
        requires: ResourceSet,
        usable: bool,
    ) -> Self {
        let template = template.into();
        let placeholder = Placeholder::detect(&template);
        Self {
            template,
            duration,
            size,
            requires,
            usable,
            placeholder,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn requires(&self) -> ResourceSet {
        self.requires
    }

    pub fn usable(&self) -> bool {
        self.usable
    }

    pub fn placeholder(&self) -> Placeholder {
        self.placeholder
    }

    /// Create an instruction with the given operand in the placeholder slot.
    pub fn instantiate(&self, operand: Operand) -> Instruction {
        let operand = match self.placeholder {
            Placeholder::None => Operand::None,
            _ => operand,
        };
        Instruction::new(self.template.clone(), self.placeholder, operand, self.duration)
    }

    /// Create a filler instruction, used when only the duration matters.
    ///
    /// Immediates are zero, except that a 16-bit operand of a memory-accessing
    /// instruction is bound to a granted address: the first one, or the lower
    /// address of an adjacent pair when the instruction touches two locations.
    pub fn filler(&self, memory: &[String]) -> Instruction {
        let address = match self.requires.memory_count() {
            0 => None,
            1 => memory.first().map(String::as_str),
            _ => adjacent_pair(memory),
        };
        let operand = match (self.placeholder, address) {
            (Placeholder::None, _) => Operand::None,
            (Placeholder::Byte, _) => Operand::Byte(0),
            (Placeholder::Word, Some(address)) => Operand::Address(address.to_string()),
            (Placeholder::Word, None) => Operand::Word(0),
        };
        self.instantiate(operand)
    }
}

/// In-memory instruction table of one target machine.
#[derive(Debug, Clone)]
pub struct InstructionCatalog {
    specs: Vec<InstructionSpec>,
    index: HashMap<String, usize>,
}

impl InstructionCatalog {
    /// Build a catalog from already parsed rows. The first row wins on duplicate templates.
    pub fn from_specs(specs: Vec<InstructionSpec>) -> Self {
        let mut index = HashMap::with_capacity(specs.len());
        for (i, spec) in specs.iter().enumerate() {
            index.entry(spec.template.clone()).or_insert(i);
        }
        Self { specs, index }
    }

    /// Parse a catalog from its text form.
    pub fn parse(text: &str) -> Result<Self, CatalogError> {
        Ok(Self::from_specs(parse_catalog(text)?))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Find the row whose template is exactly `template`, placeholder tokens included.
    pub fn lookup(&self, template: &str) -> Result<&InstructionSpec, CatalogError> {
        self.index
            .get(template)
            .map(|&i| &self.specs[i])
            .ok_or_else(|| CatalogError::NotFound {
                template: template.to_string(),
            })
    }

    /// Usable instructions admissible under `granted`, one per distinct duration.
    ///
    /// The engine only needs one way to spend each duration, so for every
    /// duration the first admissible row in catalog order is kept. Catalog order
    /// therefore decides which literal instruction text appears in the output;
    /// it never changes the achievable timing.
    pub fn filter_available(&self, granted: ResourceSet) -> Vec<&InstructionSpec> {
        let mut seen = Vec::new();
        let mut result = Vec::new();
        for spec in &self.specs {
            if spec.usable && granted.covers(spec.requires) && !seen.contains(&spec.duration) {
                seen.push(spec.duration);
                result.push(spec);
            }
        }
        result
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstructionSpec> {
        self.specs.iter()
    }

    /// One line per instruction, for debugging catalogs.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for spec in &self.specs {
            let _ = writeln!(
                out,
                "{:<12} {:>3}T {}B {}{}",
                spec.template,
                spec.duration,
                spec.size,
                spec.requires,
                if spec.usable { "" } else { " (scaffold only)" }
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resource::Resource;

    const SAMPLE: &str = "\
BEGIN
NOP;4;1;-;0;0;+
MOV A,B;4;1;A;0;0;+
MVI B,8b;7;2;B;0;0;+
CPI 8b;7;2;-;0;0;+
LDA 16b;13;3;A;1;0;+
JNZ 16b;10;3;-;0;0;-
END
";

    const PAIR_SAMPLE: &str = "\
BEGIN
NOP;4;1;-;0;0;+
STA 16b;13;3;-;1;0;+
SHLD 16b;16;3;-;2;0;+
END
";

    #[test]
    fn test_placeholder_detection() {
        assert_eq!(Placeholder::detect("MVI B,8b"), Placeholder::Byte);
        assert_eq!(Placeholder::detect("LXI B,16b"), Placeholder::Word);
        assert_eq!(Placeholder::detect("NOP"), Placeholder::None);
        assert_eq!(Placeholder::detect("MOV B,C"), Placeholder::None);
    }

    #[test]
    fn test_lookup_exact_template() {
        let catalog = InstructionCatalog::parse(SAMPLE).unwrap();
        assert_eq!(catalog.lookup("JNZ 16b").unwrap().duration(), 10);
        assert!(matches!(
            catalog.lookup("JNZ loop0"),
            Err(CatalogError::NotFound { .. })
        ));
    }

    #[test]
    fn test_filter_keeps_first_per_duration() {
        let catalog = InstructionCatalog::parse(SAMPLE).unwrap();
        let granted = ResourceSet::encode("AB", "0", "0").unwrap();
        let templates: Vec<&str> = catalog
            .filter_available(granted)
            .iter()
            .map(|s| s.template())
            .collect();
        assert_eq!(templates, vec!["NOP", "MVI B,8b"]);
    }

    #[test]
    fn test_filter_respects_requirements_and_usability() {
        let catalog = InstructionCatalog::parse(SAMPLE).unwrap();
        let none = catalog.filter_available(ResourceSet::EMPTY);
        let templates: Vec<&str> = none.iter().map(|s| s.template()).collect();
        assert_eq!(templates, vec!["NOP", "CPI 8b"]);

        let with_memory = ResourceSet::encode("A", "1", "0").unwrap();
        assert!(catalog
            .filter_available(with_memory)
            .iter()
            .any(|s| s.template() == "LDA 16b"));
        assert!(catalog
            .filter_available(with_memory)
            .iter()
            .all(|s| s.template() != "JNZ 16b"));
    }

    #[test]
    fn test_filler_operands() {
        let catalog = InstructionCatalog::parse(SAMPLE).unwrap();
        let memory = vec!["2000H".to_string()];
        let lda = catalog.lookup("LDA 16b").unwrap().filler(&memory);
        assert_eq!(lda.render(), "LDA 2000H");
        let cpi = catalog.lookup("CPI 8b").unwrap().filler(&memory);
        assert_eq!(cpi.render(), "CPI 0");
    }

    #[test]
    fn test_two_location_filler_binds_adjacent_pair() {
        let catalog = InstructionCatalog::parse(PAIR_SAMPLE).unwrap();
        let memory = vec!["3000H".to_string(), "2001H".to_string(), "2000H".to_string()];
        let shld = catalog.lookup("SHLD 16b").unwrap().filler(&memory);
        assert_eq!(shld.render(), "SHLD 2000H");
        let sta = catalog.lookup("STA 16b").unwrap().filler(&memory);
        assert_eq!(sta.render(), "STA 3000H");
    }

    #[test]
    fn test_two_location_row_needs_adjacent_grant() {
        let catalog = InstructionCatalog::parse(PAIR_SAMPLE).unwrap();
        let templates = |resources: &[Resource]| -> Vec<String> {
            catalog
                .filter_available(ResourceSet::from_resources(resources))
                .iter()
                .map(|s| s.template().to_string())
                .collect()
        };
        let distant = [Resource::memory("2000H"), Resource::memory("3000H")];
        assert_eq!(templates(&distant), vec!["NOP", "STA 16b"]);
        let adjacent = [Resource::memory("2001H"), Resource::memory("2000H")];
        assert_eq!(templates(&adjacent), vec!["NOP", "STA 16b", "SHLD 16b"]);
    }

    #[test]
    fn test_describe_lists_every_row() {
        let catalog = InstructionCatalog::parse(SAMPLE).unwrap();
        let text = catalog.describe();
        assert_eq!(text.lines().count(), catalog.len());
        assert!(text.contains("scaffold only"));
    }
}
