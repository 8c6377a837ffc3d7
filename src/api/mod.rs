pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filters::FilterSet;
use crate::records::{Record, RecordDetail};

pub use http::{HttpRecordsApi, HttpOptions};

pub const DEFAULT_PER_PAGE: u32 = 50;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiError {
    /// The request never produced a usable response (connect, timeout, body
    /// that is not the expected JSON).
    #[error("request failed: {message}")]
    Network { message: String, timed_out: bool },

    #[error("server rejected request: {}", .message.as_deref().unwrap_or("no message"))]
    Application { message: Option<String> },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    Network,
    Application,
}

impl ApiError {
    pub fn network(message: impl Into<String>) -> Self {
        ApiError::Network {
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn application(message: Option<String>) -> Self {
        ApiError::Application {
            message: message.filter(|m| !m.trim().is_empty()),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ApiError::Network { .. } => FailureKind::Network,
            ApiError::Application { .. } | ApiError::InvalidInput(_) => FailureKind::Application,
        }
    }

    pub fn user_message(&self) -> Option<&str> {
        match self {
            ApiError::Network { .. } => None,
            ApiError::Application { message } => message.as_deref(),
            ApiError::InvalidInput(message) => Some(message.as_str()),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Network {
            message: e.to_string(),
            timed_out: e.is_timeout(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PaginationMeta {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_records: u64,
    pub per_page: u32,
    #[serde(default)]
    pub has_prev: bool,
    #[serde(default)]
    pub has_next: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PageQuery {
    pub page: u32,
    pub per_page: u32,
    pub filters: FilterSet,
}

impl PageQuery {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("per_page", self.per_page.to_string()),
        ];
        pairs.extend(self.filters.to_query());
        pairs
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordPage {
    pub records: Vec<Record>,
    pub pagination: PaginationMeta,
}

/// `{success, data?, pagination?, error?, message?}` wrapper shared by the
/// JSON endpoints.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub pagination: Option<PaginationMeta>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn into_data(self) -> Result<T, ApiError> {
        if !self.success {
            return Err(ApiError::application(self.error));
        }
        self.data
            .ok_or_else(|| ApiError::network("response is missing the data field"))
    }
}

impl Envelope<Vec<Record>> {
    pub fn into_page(self) -> Result<RecordPage, ApiError> {
        if !self.success {
            return Err(ApiError::application(self.error));
        }
        let pagination = self
            .pagination
            .ok_or_else(|| ApiError::network("response is missing pagination"))?;
        Ok(RecordPage {
            records: self.data.unwrap_or_default(),
            pagination,
        })
    }
}

#[async_trait]
pub trait RecordsApi: Send + Sync {
    async fn fetch_page(&self, query: &PageQuery) -> Result<RecordPage, ApiError>;

    async fn fetch_record(&self, id: i64) -> Result<RecordDetail, ApiError>;
}
