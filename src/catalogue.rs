//! The fault catalogue: named fault primitives, each with an ordered list
//! of subcases, loaded from a JSON document.
//!
//! The outer document shape is ordinary JSON handled by `serde_json`; the
//! inner per-subcase grammar is a flat comma-separated tuple (`spec.md`
//! §6), parsed directly rather than through a parsing dependency — it has
//! no recursion or nesting, so a combinator library would be overhead
//! without payoff.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::allocator::PositionCode;
use crate::error::{Error, Result};
use crate::model::{OpKind, Operation};

/// Either half of a two-cell subcase's trigger: the aggressor-driven `Saa`
/// form or the victim-driven `Svv` form. Exactly one is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CouplingTrigger {
    Saa(Vec<Operation>),
    Svv(Vec<Operation>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleCellSubcase {
    pub vi: u8,
    pub seq_v: Vec<Operation>,
    /// Informational `D` field; preserved for round-tripping but unused by
    /// the core engine.
    pub d: String,
    pub final_f: u8,
    pub final_r: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwoCellSubcase {
    pub position: PositionCode,
    pub ai: u8,
    pub vi: u8,
    pub trigger: CouplingTrigger,
    pub d: String,
    pub final_f: u8,
    pub final_r: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subcase {
    Single(SingleCellSubcase),
    Two(TwoCellSubcase),
}

/// A bare `0`/`1` field (VI, AI, A) and an operation token (`r0`, `w1`, ...)
/// are lexically disjoint, which is what makes the variable-length sequence
/// fields separable from the fixed bit fields below without a recursive-
/// descent grammar: scanning for the run of bare-bit tokens at the front,
/// and the `-` anchor at whichever end the empty sequence sits, is enough.
fn is_bare_bit(token: &str) -> bool {
    token == "0" || token == "1"
}

impl Subcase {
    /// Parses one comma-separated subcase tuple (`spec.md` §6). The last
    /// three fields are always `D, finalF, finalR`; what precedes them is
    /// either `VI, seqV...` (single-cell) or `A, AI, VI, seqA..., seqV...`
    /// (coupling), distinguished by counting the leading run of bare bit
    /// tokens (1 for single-cell, 3 for coupling).
    pub fn parse(text: &str) -> Result<Self> {
        let fields: Vec<&str> = text.split(',').map(str::trim).collect();
        if fields.len() < 5 {
            return Err(Error::Catalogue {
                reason: format!("subcase tuple too short: {text:?}"),
            });
        }
        let (prefix, suffix) = fields.split_at(fields.len() - 3);
        let leading_bits = prefix.iter().take_while(|t| is_bare_bit(t)).count();
        match leading_bits {
            1 => Self::parse_single(prefix, suffix),
            3 => Self::parse_two_cell(prefix, suffix),
            n => Err(Error::Catalogue {
                reason: format!(
                    "expected 1 leading bit field (single-cell) or 3 (coupling), got {n}: {text:?}"
                ),
            }),
        }
    }

    fn parse_single(prefix: &[&str], suffix: &[&str]) -> Result<Self> {
        let vi = parse_bit(prefix[0])?;
        let seq_v = parse_sequence_tokens(&prefix[1..])?;
        let d = suffix[0].to_string();
        let final_f = parse_bit(suffix[1])?;
        let final_r = parse_maybe_bit(suffix[2])?;
        Ok(Subcase::Single(SingleCellSubcase { vi, seq_v, d, final_f, final_r }))
    }

    fn parse_two_cell(prefix: &[&str], suffix: &[&str]) -> Result<Self> {
        let position = match prefix[0] {
            "0" => PositionCode::AggBeforeVic,
            "1" => PositionCode::AggAfterVic,
            other => {
                return Err(Error::Catalogue {
                    reason: format!("invalid position code A: {other:?}"),
                })
            }
        };
        let ai = parse_bit(prefix[1])?;
        let vi = parse_bit(prefix[2])?;
        let (seq_a, seq_v) = split_coupling_sequences(&prefix[3..])?;
        let d = suffix[0].to_string();
        let final_f = parse_bit(suffix[1])?;
        let final_r = parse_maybe_bit(suffix[2])?;

        let trigger = match (seq_a.is_empty(), seq_v.is_empty()) {
            (false, false) => {
                return Err(Error::Catalogue {
                    reason: "coupling subcase cannot specify both seqA and seqV".into(),
                })
            }
            (false, true) => CouplingTrigger::Saa(seq_a),
            (true, false) => CouplingTrigger::Svv(seq_v),
            (true, true) => CouplingTrigger::Saa(seq_a),
        };

        Ok(Subcase::Two(TwoCellSubcase { position, ai, vi, trigger, d, final_f, final_r }))
    }

    /// Renders this subcase back to the exact canonical tuple string it
    /// would have been parsed from.
    pub fn to_canonical_string(&self) -> String {
        self.to_string()
    }

    /// Renders the human-readable trigger-info label used in reports:
    /// `< beforeValue OpOp... / finalF / finalR >`, with the coupling tag
    /// (`Saa`/`Svv`) folded in as `seq ; coupleValue` or `coupleValue ; seq`.
    pub fn trigger_info(&self) -> String {
        match self {
            Subcase::Single(s) => format!(
                "< {} / {} / {} >",
                trigger_sequence_label(s.vi, &s.seq_v),
                s.final_f,
                render_maybe_bit(s.final_r)
            ),
            Subcase::Two(t) => {
                let inner = match &t.trigger {
                    CouplingTrigger::Saa(seq) => {
                        format!("{} ; {}", trigger_sequence_label(t.ai, seq), t.vi)
                    }
                    CouplingTrigger::Svv(seq) => {
                        format!("{} ; {}", t.ai, trigger_sequence_label(t.vi, seq))
                    }
                };
                format!("< {} / {} / {} >", inner, t.final_f, render_maybe_bit(t.final_r))
            }
        }
    }
}

/// `beforeValue` followed by each op's kind letter (`R`/`W`) and value,
/// concatenated with no separator, e.g. `VI=1, seqV=[W1,R0]` -> `"1W1R0"`.
fn trigger_sequence_label(initial: u8, sequence: &[Operation]) -> String {
    let mut label = initial.to_string();
    for op in sequence {
        label.push(match op.kind {
            OpKind::Read => 'R',
            OpKind::Write => 'W',
        });
        label.push_str(&op.value.to_string());
    }
    label
}

impl fmt::Display for Subcase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subcase::Single(s) => write!(
                f,
                "{},{},{},{},{}",
                s.vi,
                render_sequence(&s.seq_v),
                s.d,
                s.final_f,
                render_maybe_bit(s.final_r)
            ),
            Subcase::Two(t) => {
                let position = match t.position {
                    PositionCode::AggBeforeVic => "0",
                    PositionCode::AggAfterVic => "1",
                };
                let (seq_a, seq_v) = match &t.trigger {
                    CouplingTrigger::Saa(seq) => (render_sequence(seq), "-".to_string()),
                    CouplingTrigger::Svv(seq) => ("-".to_string(), render_sequence(seq)),
                };
                write!(
                    f,
                    "{},{},{},{},{},{},{},{}",
                    position,
                    t.ai,
                    t.vi,
                    seq_a,
                    seq_v,
                    t.d,
                    t.final_f,
                    render_maybe_bit(t.final_r)
                )
            }
        }
    }
}

fn parse_bit(token: &str) -> Result<u8> {
    match token {
        "0" => Ok(0),
        "1" => Ok(1),
        other => Err(Error::Catalogue { reason: format!("expected 0 or 1, got {other:?}") }),
    }
}

fn parse_maybe_bit(token: &str) -> Result<Option<u8>> {
    match token {
        "-" => Ok(None),
        other => Ok(Some(parse_bit(other)?)),
    }
}

/// Parses an already-split run of tokens as a sequence field: either
/// exactly `["-"]` (empty sequence) or one or more operation tokens.
fn parse_sequence_tokens(tokens: &[&str]) -> Result<Vec<Operation>> {
    if tokens == ["-"] {
        return Ok(Vec::new());
    }
    tokens
        .iter()
        .map(|t| Operation::parse_token(t))
        .collect::<Result<Vec<_>>>()
        .map_err(|e| Error::Catalogue {
            reason: format!("invalid operation sequence {tokens:?}: {e}"),
        })
}

/// Splits the tokens following a coupling subcase's `A, AI, VI` prefix into
/// `(seqA, seqV)`. Exactly one side is empty (a lone `-`); the `-` anchor at
/// whichever end marks the empty side, since op tokens are never `-`.
fn split_coupling_sequences(tokens: &[&str]) -> Result<(Vec<Operation>, Vec<Operation>)> {
    if tokens.is_empty() {
        return Err(Error::Catalogue {
            reason: "coupling subcase is missing seqA/seqV fields".into(),
        });
    }
    if tokens.len() == 2 && tokens[0] == "-" && tokens[1] == "-" {
        return Ok((Vec::new(), Vec::new()));
    }
    if tokens[0] == "-" {
        return Ok((Vec::new(), parse_sequence_tokens(&tokens[1..])?));
    }
    if tokens[tokens.len() - 1] == "-" {
        return Ok((parse_sequence_tokens(&tokens[..tokens.len() - 1])?, Vec::new()));
    }
    Err(Error::Catalogue {
        reason: "coupling subcase cannot specify both seqA and seqV".into(),
    })
}

fn render_sequence(ops: &[Operation]) -> String {
    if ops.is_empty() {
        return "-".to_string();
    }
    ops.iter().map(Operation::token).collect::<Vec<_>>().join(",")
}

fn render_maybe_bit(bit: Option<u8>) -> String {
    match bit {
        Some(b) => b.to_string(),
        None => "-".to_string(),
    }
}

/// A named fault primitive and its ordered subcases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultPrimitive {
    pub name: String,
    pub subcases: Vec<Subcase>,
}

/// The full fault catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Catalogue {
    pub faults: Vec<FaultPrimitive>,
}

#[derive(Debug, Deserialize)]
struct RawPrimitive {
    name: String,
    subcases: Vec<String>,
}

/// Loads a catalogue from a JSON file: an array of `{name, subcases}`
/// objects, each subcase a comma-separated tuple string.
pub fn load(path: impl AsRef<Path>) -> Result<Catalogue> {
    let text = std::fs::read_to_string(path)?;
    parse(&text)
}

/// Parses a catalogue document already read into memory.
pub fn parse(text: &str) -> Result<Catalogue> {
    let raw: Vec<RawPrimitive> = serde_json::from_str(text)?;
    let faults = raw
        .into_iter()
        .map(|p| {
            let subcases =
                p.subcases.iter().map(|s| Subcase::parse(s)).collect::<Result<Vec<_>>>()?;
            Ok(FaultPrimitive { name: p.name, subcases })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Catalogue { faults })
}
