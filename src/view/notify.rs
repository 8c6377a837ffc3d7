use std::fmt;

use serde::Serialize;

use crate::api::{ApiError, FailureKind};

pub const LOAD_FAILED: &str = "Erro ao carregar dados";
pub const LOAD_CONNECTION_FAILED: &str = "Erro de conexão ao carregar dados";
pub const DETAIL_FAILED: &str = "Erro ao carregar detalhes do registro";
pub const CONNECTION_FAILED: &str = "Erro de conexão";
pub const NOTHING_TO_DO: &str = "Nada a fazer";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationLevel::Info => "info",
            NotificationLevel::Success => "success",
            NotificationLevel::Warning => "warning",
            NotificationLevel::Error => "error",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, message)
    }

    /// Error notification for a failed table load. The server's message is
    /// used when it sent one.
    pub fn load_failure(err: &ApiError) -> Self {
        Self::from_failure(err, LOAD_FAILED, LOAD_CONNECTION_FAILED)
    }

    pub fn detail_failure(err: &ApiError) -> Self {
        Self::from_failure(err, DETAIL_FAILED, CONNECTION_FAILED)
    }

    fn from_failure(err: &ApiError, application: &str, network: &str) -> Self {
        let message = match err.kind() {
            FailureKind::Network => network.to_string(),
            FailureKind::Application => err.user_message().unwrap_or(application).to_string(),
        };
        Self::error(message)
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
