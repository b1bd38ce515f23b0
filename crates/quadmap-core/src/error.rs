use thiserror::Error;

/// Error taxonomy shared by every quadmap crate.
///
/// Encoding and resolution failures are reported synchronously and never
/// retried; callers either get a complete result or one of these.
#[derive(Error, Debug)]
pub enum MapperError {
    #[error("Schema mismatch on field {field}: {reason}")]
    SchemaMismatch { field: String, reason: String },

    #[error("Empty identity: {0}")]
    EmptyIdentity(String),

    #[error("Type mismatch on predicate {predicate}: declared {expected}, found {found}")]
    TypeMismatch {
        predicate: String,
        expected: String,
        found: String,
    },

    #[error("Unsupported scalar kind: {0}")]
    UnsupportedScalarKind(String),

    #[error("Encoding failure on predicate {predicate}: {reason}")]
    EncodingFailure { predicate: String, reason: String },

    #[error("No mutations have been set")]
    NoOperation,

    #[error("Mutation assigned no ids and touched no predicates")]
    NothingChanged,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MapperError {
    pub fn schema_mismatch(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn encoding(predicate: impl Into<String>, reason: impl ToString) -> Self {
        Self::EncodingFailure {
            predicate: predicate.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MapperError>;
