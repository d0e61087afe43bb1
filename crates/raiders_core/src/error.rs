//! Error types for the unit simulation.
//!
//! The tick loop itself never fails: missing data falls back to a safe
//! default. These errors only surface at the edges, when loading catalog
//! data or mutating the roster by id.

use thiserror::Error;

/// Result type alias using [`SimError`].
pub type Result<T> = std::result::Result<T, SimError>;

/// Top-level error type for the simulation core.
#[derive(Debug, Error)]
pub enum SimError {
    /// Catalog data file could not be parsed.
    #[error("Failed to parse catalog '{path}': {message}")]
    CatalogParse {
        /// Path (or `<inline>`) of the document that failed to parse.
        path: String,
        /// Parser error message.
        message: String,
    },

    /// Failed to read a data file from disk.
    #[error("Failed to read data file: {0}")]
    Io(#[from] std::io::Error),

    /// No unit definition is registered under this key.
    #[error("Unknown unit definition: {0}")]
    UnknownUnitDef(String),

    /// A unit stat block breaks a catalog rule.
    #[error("Invalid stats for '{id}': {reason}")]
    InvalidStats {
        /// Catalog key of the offending definition.
        id: String,
        /// Which rule was broken.
        reason: String,
    },

    /// No guild member with this id.
    #[error("Guild member not found: {0}")]
    MemberNotFound(String),

    /// No party with this id.
    #[error("Party not found: {0}")]
    PartyNotFound(String),
}
