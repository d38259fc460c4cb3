use thiserror::Error;

/// Errors that can arise while running the world, loading templates or persisting players.
#[derive(Debug, Error)]
pub enum GameError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Zone template files that fail to parse.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Wrapper around IO errors (directory creation, template reads, sockets).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when a template, room, living or item is not present.
    #[error("not found: {0}")]
    NotFound(String),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// World graph bookkeeping that does not line up (dangling ids, bad exits).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A script that failed to parse or evaluate.
    #[error("script error: {0}")]
    Script(String),
}
