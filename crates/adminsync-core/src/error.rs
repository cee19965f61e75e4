//! Error types for admin role reconciliation

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdminSyncError {
    #[error("Invalid configuration: {message}")]
    ConfigurationInvalid { message: String },

    #[error("Directory unavailable: {message}")]
    DirectoryUnavailable { message: String },

    #[error("Directory rejected request (HTTP {status}): {message}")]
    DirectoryRejected { status: u16, message: String },

    #[error("Unknown role type: {value}")]
    UnknownRoleType { value: String },

    #[error("Cancelled: {message}")]
    Cancelled { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AdminSyncError {
    pub fn configuration_invalid(message: impl Into<String>) -> Self {
        Self::ConfigurationInvalid {
            message: message.into(),
        }
    }

    pub fn directory_unavailable(message: impl Into<String>) -> Self {
        Self::DirectoryUnavailable {
            message: message.into(),
        }
    }

    pub fn directory_rejected(status: u16, message: impl Into<String>) -> Self {
        Self::DirectoryRejected {
            status,
            message: message.into(),
        }
    }

    pub fn unknown_role_type(value: impl Into<String>) -> Self {
        Self::UnknownRoleType {
            value: value.into(),
        }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::Cancelled {
            message: message.into(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error came from a directory call (as opposed to local
    /// configuration or parsing).
    pub fn is_directory_error(&self) -> bool {
        matches!(
            self,
            Self::DirectoryUnavailable { .. } | Self::DirectoryRejected { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AdminSyncError>;
