use thiserror::Error;

/// Errors that can arise while interacting with the world state and its storage layer.
#[derive(Debug, Error)]
pub enum WorldError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// A stored id points at a record that no longer exists.
    #[error("dangling reference: {0}")]
    Integrity(String),

    /// Permission denied (ownership or wizard check failed)
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Password or recovery code hashing failed
    #[error("password hashing error: {0}")]
    Hash(String),

    /// Internal error (invalid helper parameters, unexpected conditions)
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<password_hash::Error> for WorldError {
    fn from(err: password_hash::Error) -> Self {
        WorldError::Hash(err.to_string())
    }
}
