//! Error types for the simulator core.
//!
//! Mirrors the flat-enum, one-message-per-variant shape the rest of the
//! corpus uses for its library-level errors: `#[from]` for wrapped causes,
//! named fields for everything else.

use thiserror::Error;

/// Simulator core errors.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error reading a catalogue, library, or writing a report.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON document did not match the expected catalogue/library shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed fault catalogue: bad field count, bad token, or a subcase
    /// missing a `finalR` where the engine requires one.
    #[error("malformed fault catalogue: {reason}")]
    Catalogue { reason: String },

    /// Malformed March program or library entry.
    #[error("malformed March program: {reason}")]
    Program { reason: String },

    /// Illegal engine invocation: an address the engine does not own, or a
    /// trigger configured without an initial value. These are program
    /// defects — they must never be reachable from a catalogue that passed
    /// `catalogue` loading and a correct executor.
    #[error("fault engine invariant violated: {reason}")]
    Engine { reason: String },
}

/// Result type used throughout the simulator core.
pub type Result<T> = std::result::Result<T, Error>;
