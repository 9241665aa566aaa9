//! The March program library: a named collection of March program texts,
//! loaded from a JSON document and lazily parsed on selection.
//!
//! Deferring the per-program parse to selection time means a malformed,
//! unselected entry elsewhere in a large library does not abort loading
//! the library itself.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::MarchProgram;

/// A library of named March program texts, not yet parsed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Library(BTreeMap<String, String>);

impl Library {
    /// The program names, in a stable (alphabetical) order suitable for a
    /// numbered selection prompt.
    pub fn names(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    /// Parses and returns the named program.
    pub fn get(&self, name: &str) -> Result<MarchProgram> {
        let text = self.0.get(name).ok_or_else(|| Error::Program {
            reason: format!("no such March program in library: {name:?}"),
        })?;
        MarchProgram::parse(text)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Loads a library from a JSON file: `{ "name": "a(w0);...", ... }`.
pub fn load(path: impl AsRef<Path>) -> Result<Library> {
    let text = std::fs::read_to_string(path)?;
    parse(&text)
}

/// Parses a library document already read into memory.
pub fn parse(text: &str) -> Result<Library> {
    let map: BTreeMap<String, String> = serde_json::from_str(text)?;
    Ok(Library(map))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_and_selects_by_name() {
        let json = r#"{"march-c-": "a(w0);a(r0,w1);a(r1,w0);d(r0,w1);d(r1,w0);a(r0)"}"#;
        let lib = parse(json).unwrap();
        assert_eq!(lib.names(), vec!["march-c-"]);
        let program = lib.get("march-c-").unwrap();
        assert_eq!(program.elements.len(), 6);
    }

    #[test]
    fn unknown_program_name_is_an_error() {
        let json = r#"{"foo": "a(w0)"}"#;
        let lib = parse(json).unwrap();
        assert!(lib.get("bar").is_err());
    }

    #[test]
    fn malformed_entry_does_not_abort_loading_other_entries() {
        let json = r#"{"good": "a(w0)", "bad": "z(w0)"}"#;
        let lib = parse(json).unwrap();
        assert_eq!(lib.len(), 2);
        assert!(lib.get("good").is_ok());
        assert!(lib.get("bad").is_err());
    }
}
