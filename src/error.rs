//! Error types for membership-registry

use thiserror::Error;

use crate::models::MemberId;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {caller} does not own member {member_id}")]
    Forbidden { member_id: MemberId, caller: String },

    #[error("Unauthorized: {caller} may not read member {member_id}")]
    Unauthorized { member_id: MemberId, caller: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Member already exists: {0}")]
    DuplicateMember(MemberId),

    #[error("Database error: {0}")]
    Database(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse failure classes reported to callers of a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Unauthorized,
    InvalidInput,
    DuplicateMember,
    /// Storage, serialization or configuration failure outside the registry's rules
    Internal,
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::DuplicateMember(_) => ErrorKind::DuplicateMember,
            Self::Database(_) | Self::Json(_) | Self::Io(_) | Self::Config(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub(crate) fn member_not_found(member_id: MemberId) -> Self {
        Self::NotFound(format!("member {}", member_id))
    }
}

impl From<rusqlite::Error> for RegistryError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}
