use crate::types::{RowKey, TableKind};
use thiserror::Error;

/// Errors that abort the extraction of a document.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The layout engine could not produce the fragments of a page.
    #[error("layout engine failed on page {page}: {reason}")]
    Upstream { page: usize, reason: String },

    /// The input could not be read as a document at all.
    #[error("unreadable document: {0}")]
    Document(String),

    #[error(transparent)]
    Profile(#[from] ProfileError),
}

/// Problems found while validating a layout profile.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("table '{kind}' binds unknown field '{field}'")]
    UnknownField { kind: TableKind, field: String },

    #[error("company field '{field}' (label '{label}') is not part of the company record")]
    UnknownCompanyField { label: String, field: String },

    #[error("table '{kind}' has no row stages")]
    NoStages { kind: TableKind },

    #[error("table '{kind}' stage {stage} accepts no row shape")]
    NoShapes { kind: TableKind, stage: usize },

    #[error("table '{kind}': {what} offset must be positive")]
    NonPositiveOffset { kind: TableKind, what: String },

    #[error("table '{kind}' cannot continue records across pages")]
    ContinuationUnsupported { kind: TableKind },

    #[error("table '{kind}' is configured more than once")]
    DuplicateTable { kind: TableKind },

    #[error("unknown profile '{0}'")]
    UnknownProfile(String),
}

/// Why an offset walk stopped. Every variant is recovered locally: it ends
/// the table, or parks the record in progress until the next page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkStop {
    MissingRow { key: RowKey },
    StructuralMismatch { key: RowKey, found: usize },
    FieldOutOfRange { key: RowKey, index: usize, len: usize },
}
