//! Domain error model.

use thiserror::Error;

/// Result type used across the ledger and lifecycle layers.
pub type StockResult<T> = Result<T, StockError>;

/// Typed failure of a catalog, ledger, or document operation.
///
/// Every mutating operation returns one of these synchronously; a storage
/// failure is surfaced here only after the enclosing transaction has been
/// rolled back in full, so callers never observe partial ledger effects.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StockError {
    /// A referenced entity is absent.
    #[error("{0} not found")]
    NotFound(String),

    /// A unique constraint (description, note number, template name) was violated.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// A delete was blocked by a referencing row.
    #[error("dependency exists: {0}")]
    DependencyExists(String),

    /// A lifecycle transition was attempted from a state that does not permit it.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Finalize attempted on a document with zero lines.
    #[error("document has no lines")]
    EmptyDocument,

    /// Instantiation attempted from a template with zero lines.
    #[error("production line template has no lines")]
    EmptyTemplate,

    /// A BOM line is self-referential or names an item of the wrong kind.
    #[error("invalid bill-of-materials line: {0}")]
    InvalidBomLine(String),

    /// An input value failed a guard that protects ledger invariants.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The storage collaborator failed; the transaction was rolled back.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl StockError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn duplicate_key(msg: impl Into<String>) -> Self {
        Self::DuplicateKey(msg.into())
    }

    pub fn dependency(msg: impl Into<String>) -> Self {
        Self::DependencyExists(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn invalid_bom_line(msg: impl Into<String>) -> Self {
        Self::InvalidBomLine(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}
