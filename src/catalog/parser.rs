//! Catalog text parser.
//!
//! The catalog is free text until a line reading `BEGIN`; every line up to `END`
//! is one instruction with seven `;`-separated fields:
//!
//! ```text
//! template ; duration ; size ; registers ; memory count ; stack ; usability
//! MVI B,8b ; 7        ; 2    ; B         ; 0            ; 0     ; +
//! ```
//!
//! Lines shorter than four characters and lines starting with `#` are skipped.
//! Any malformed row fails the whole load.

use super::InstructionSpec;
use crate::core::error::CatalogError;
use crate::core::resource::ResourceSet;

const FIELD_COUNT: usize = 7;

pub fn parse_catalog(text: &str) -> Result<Vec<InstructionSpec>, CatalogError> {
    let parser = Parser::new(text);
    parser.parse()
}

struct Parser<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    specs: Vec<InstructionSpec>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate(),
            specs: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<Vec<InstructionSpec>, CatalogError> {
        self.skip_header()?;

        while let Some((index, line)) = self.lines.next() {
            let line = line.trim_end();
            if line.trim() == "END" {
                break;
            }
            if line.len() < 4 || line.trim_start().starts_with('#') {
                continue;
            }
            let spec = parse_row(line).map_err(|reason| CatalogError::Parse {
                line: index + 1,
                reason,
            })?;
            self.specs.push(spec);
        }

        if self.specs.is_empty() {
            return Err(CatalogError::Empty);
        }
        log::debug!("Parsed {} catalog rows", self.specs.len());
        Ok(self.specs)
    }

    fn skip_header(&mut self) -> Result<(), CatalogError> {
        for (_, line) in self.lines.by_ref() {
            if line.trim() == "BEGIN" {
                return Ok(());
            }
        }
        Err(CatalogError::MissingBegin)
    }
}

fn parse_row(line: &str) -> Result<InstructionSpec, String> {
    let fields: Vec<&str> = line.split(';').map(str::trim).collect();
    if fields.len() != FIELD_COUNT {
        return Err(format!(
            "expected {} fields but found {}",
            FIELD_COUNT,
            fields.len()
        ));
    }

    let template = fields[0];
    if template.is_empty() {
        return Err("empty instruction template".to_string());
    }

    let duration: u64 = fields[1]
        .parse()
        .map_err(|_| format!("invalid duration '{}'", fields[1]))?;
    if duration == 0 {
        return Err(format!("instruction '{}' has zero duration", template));
    }

    let size: u32 = fields[2]
        .parse()
        .map_err(|_| format!("invalid size '{}'", fields[2]))?;

    let requires = ResourceSet::encode(fields[3], fields[4], fields[5]).ok_or_else(|| {
        format!(
            "invalid resource columns (memory '{}', stack '{}')",
            fields[4], fields[5]
        )
    })?;

    let usable = fields[6] != "-";

    Ok(InstructionSpec::new(template, duration, size, requires, usable))
}
