//! Immutable value types shared by every other module: operations, March
//! elements, March programs, and the operation identifiers used as keys in
//! detection syndromes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A memory address, row-major within the configured `rows x cols` grid.
pub type Address = usize;

/// The kind of a single memory operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    Read,
    Write,
}

impl OpKind {
    pub fn letter(self) -> char {
        match self {
            OpKind::Read => 'r',
            OpKind::Write => 'w',
        }
    }
}

/// A single READ or WRITE with a binary value (0 or 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OpKind,
    pub value: u8,
}

impl Operation {
    pub fn new(kind: OpKind, value: u8) -> Result<Self> {
        if value > 1 {
            return Err(Error::Catalogue {
                reason: format!("operation value must be 0 or 1, got {value}"),
            });
        }
        Ok(Self { kind, value })
    }

    pub fn read(value: u8) -> Self {
        Self { kind: OpKind::Read, value }
    }

    pub fn write(value: u8) -> Self {
        Self { kind: OpKind::Write, value }
    }

    /// Returns a copy with the value flipped (0<->1), kind unchanged.
    pub fn flipped(self) -> Self {
        Self { kind: self.kind, value: 1 - self.value }
    }

    /// Parses a token of the form `r0`, `r1`, `w0`, or `w1`.
    pub fn parse_token(token: &str) -> Result<Self> {
        let token = token.trim();
        let mut chars = token.chars();
        let kind = match chars.next() {
            Some('r') | Some('R') => OpKind::Read,
            Some('w') | Some('W') => OpKind::Write,
            _ => {
                return Err(Error::Program {
                    reason: format!("invalid operation token: {token:?}"),
                })
            }
        };
        let value = match chars.next() {
            Some('0') => 0,
            Some('1') => 1,
            _ => {
                return Err(Error::Program {
                    reason: format!("invalid operation token: {token:?}"),
                })
            }
        };
        if chars.next().is_some() {
            return Err(Error::Program {
                reason: format!("invalid operation token: {token:?}"),
            });
        }
        Ok(Self { kind, value })
    }

    pub fn token(&self) -> String {
        format!("{}{}", self.kind.letter(), self.value)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Identifies a single operation inside a March program: the element it
/// belongs to and its position within that element's operation list.
///
/// Used as the key of a detection syndrome. Note that the *same* id can be
/// observed at more than one address during a single engine run (the
/// element is applied once per address the engine owns) — the detection
/// record merges those observations by OR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OperationId {
    pub element_index: usize,
    pub op_index: usize,
}

impl OperationId {
    pub fn new(element_index: usize, op_index: usize) -> Self {
        Self { element_index, op_index }
    }
}

/// The address order a March element is applied in. `Any` is executed
/// identically to `Ascending` but preserved distinctly for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressOrder {
    Ascending,
    Descending,
    Any,
}

impl AddressOrder {
    pub fn letter(self) -> char {
        match self {
            AddressOrder::Ascending => 'a',
            AddressOrder::Descending => 'd',
            AddressOrder::Any => 'b',
        }
    }

    fn from_letter(c: char) -> Result<Self> {
        match c {
            'a' | 'A' => Ok(AddressOrder::Ascending),
            'd' | 'D' => Ok(AddressOrder::Descending),
            'b' | 'B' => Ok(AddressOrder::Any),
            other => Err(Error::Program {
                reason: format!("invalid address order tag: {other:?}"),
            }),
        }
    }
}

/// An ordered sequence of operations applied, in `order`, to every address
/// the engine owns before the next element begins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarchElement {
    pub order: AddressOrder,
    pub ops: Vec<Operation>,
}

impl MarchElement {
    pub fn new(order: AddressOrder, ops: Vec<Operation>) -> Self {
        Self { order, ops }
    }
}

impl fmt::Display for MarchElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.order.letter())?;
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{op}")?;
        }
        write!(f, ")")
    }
}

/// An ordered sequence of March elements. Must contain at least one element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarchProgram {
    pub elements: Vec<MarchElement>,
}

impl MarchProgram {
    pub fn new(elements: Vec<MarchElement>) -> Result<Self> {
        if elements.is_empty() {
            return Err(Error::Program {
                reason: "a March program must contain at least one element".into(),
            });
        }
        Ok(Self { elements })
    }

    /// An empty program, used as the generator's "no candidate found" result.
    pub fn empty() -> Self {
        Self { elements: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Parses the library grammar: `elem;elem;...` where each `elem` is
    /// `<a|d|b>(op,op,...)`.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Program { reason: "empty program text".into() });
        }
        let mut elements = Vec::new();
        for raw in text.split(';') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            elements.push(parse_element(raw)?);
        }
        MarchProgram::new(elements)
    }
}

fn parse_element(raw: &str) -> Result<MarchElement> {
    let mut chars = raw.chars();
    let order_char = chars.next().ok_or_else(|| Error::Program {
        reason: format!("empty March element: {raw:?}"),
    })?;
    let order = AddressOrder::from_letter(order_char)?;
    let rest = chars.as_str();
    let body = rest
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| Error::Program {
            reason: format!("malformed March element (missing parens): {raw:?}"),
        })?;
    let ops = body
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Operation::parse_token)
        .collect::<Result<Vec<_>>>()?;
    if ops.is_empty() {
        return Err(Error::Program {
            reason: format!("March element has no operations: {raw:?}"),
        });
    }
    Ok(MarchElement::new(order, ops))
}

impl fmt::Display for MarchProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                write!(f, ";")?;
            }
            write!(f, "{element}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_program() {
        let p = MarchProgram::parse("a(w0);d(r0,w1);b(r1)").unwrap();
        assert_eq!(p.elements.len(), 3);
        assert_eq!(p.elements[0].order, AddressOrder::Ascending);
        assert_eq!(p.elements[1].order, AddressOrder::Descending);
        assert_eq!(p.elements[2].order, AddressOrder::Any);
        assert_eq!(p.elements[1].ops, vec![Operation::read(0), Operation::write(1)]);
    }

    #[test]
    fn round_trips_through_display() {
        let text = "a(w0);d(r0,w1);b(r1)";
        let p = MarchProgram::parse(text).unwrap();
        assert_eq!(p.to_string(), text);
    }

    #[test]
    fn rejects_empty_program() {
        assert!(MarchProgram::parse("").is_err());
    }

    #[test]
    fn rejects_bad_token() {
        assert!(MarchProgram::parse("a(x2)").is_err());
    }

    #[test]
    fn operation_id_orders_by_element_then_op() {
        let mut ids = vec![OperationId::new(1, 0), OperationId::new(0, 5), OperationId::new(0, 1)];
        ids.sort();
        assert_eq!(ids, vec![OperationId::new(0, 1), OperationId::new(0, 5), OperationId::new(1, 0)]);
    }
}
