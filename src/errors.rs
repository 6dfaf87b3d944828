//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
///
/// Protocol outcomes such as a pending or blocked completion decision are
/// *not* errors; they are ordinary [`crate::models::decision::Decision`]
/// values. Errors here mean the request itself was malformed or a
/// dependency failed.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Malformed input: missing identifiers, out-of-range progress, or an
    /// operation that conflicts with a terminal record. No state was
    /// mutated.
    Validation(String),
    /// Storage dependency failure. Fatal for the current operation; the
    /// caller must fail closed and treat completion as not granted.
    Unavailable(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Validation(msg) => write!(f, "validation: {msg}"),
            Self::Unavailable(msg) => write!(f, "system unavailable: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}
