//! Error types.

/// Fatal configuration and input errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// None of the candidate column names is present in the input.
    #[error("unable to find a column for {what} (tried {candidates:?}), available columns: {available:?}")]
    ColumnNotFound {
        what: String,
        candidates: Vec<String>,
        available: Vec<String>,
    },
    /// The file type could not be derived from the path.
    #[error("unrecognized file format for {path}, expected .csv or .tsv (optionally .gz)")]
    UnrecognizedFileFormat { path: String },
    /// No annotation snapshot is configured for the species.
    #[error("no annotation snapshots configured for species {species}")]
    NoSnapshots { species: String },
    /// Two snapshots share the same release.
    #[error("annotation release {release} configured more than once")]
    DuplicateRelease { release: u32 },
    /// Category set normalization failed in strict mode.
    #[error("unresolved identifiers in gene sets:\n{details}")]
    UnresolvedGeneSets { details: String },
    /// The abundance offset is negative or not finite.
    #[error("TPM offset must be a finite, non-negative number, got {offset}")]
    InvalidTpmOffset { offset: String },
    /// Internal invariant of batch resolution violated.
    #[error("resolved {actual} identifiers for {expected} input tokens")]
    LengthMismatch { expected: usize, actual: usize },
}
