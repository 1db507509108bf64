use crate::types::Status;

/// Rejections from the engine and the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("game not found: {id}")]
    NotFound { id: String },

    #[error("game is not active (status: {status})")]
    InactiveGame { status: Status },

    #[error("invalid move at ({row}, {col})")]
    InvalidMove { row: i32, col: i32 },

    #[error("game has already been started")]
    AlreadyStarted,

    #[error("invalid game setup: {0}")]
    InvalidSetup(String),

    #[error("internal fault: {0}")]
    InternalFault(String),
}

impl GameError {
    /// Stable reason code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            GameError::NotFound { .. } => "NotFound",
            GameError::InactiveGame { .. } => "InactiveGame",
            GameError::InvalidMove { .. } => "InvalidMove",
            GameError::AlreadyStarted => "AlreadyStarted",
            GameError::InvalidSetup(_) => "InvalidSetup",
            GameError::InternalFault(_) => "InternalFault",
        }
    }
}

/// Errors from decoding a game snapshot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    #[error("invalid snapshot magic (expected OTHS)")]
    BadMagic,

    #[error("unsupported snapshot version: expected {expected}, got {actual}")]
    UnsupportedVersion { expected: u32, actual: u32 },

    #[error("CRC32 mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("unexpected EOF while reading {0}")]
    UnexpectedEof(&'static str),

    #[error("snapshot payload has trailing bytes")]
    TrailingBytes,

    #[error("invalid snapshot: {0}")]
    Invalid(String),
}

impl From<SnapshotError> for GameError {
    fn from(err: SnapshotError) -> Self {
        GameError::InvalidSetup(err.to_string())
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}
