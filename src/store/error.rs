//! Store Error Taxonomy
//!
//! Every operation returns its error to the immediate caller; the store
//! never logs, retries, or suppresses an error internally. All four
//! kinds are non-fatal, and no operation leaves a partial mutation
//! behind when it fails.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// The operation required an existing key and none was present
    #[error("key not found")]
    KeyNotFound,

    /// The value stored under the key, or the value being stored, does
    /// not match the kind required by the operation
    #[error("wrong data type")]
    WrongDataType,

    /// A flattened (field, value) argument list had odd length
    #[error("wrong argument count")]
    WrongArgumentCount,

    /// A requested list sub-range exceeds the list's current bounds
    #[error("index out of range")]
    IndexOutOfRange,
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
