use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils;

pub const MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpreadsheetKind {
    Xlsx,
    Xls,
}

impl SpreadsheetKind {
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" => Some(SpreadsheetKind::Xlsx),
            "xls" => Some(SpreadsheetKind::Xls),
            _ => None,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            SpreadsheetKind::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            SpreadsheetKind::Xls => "application/vnd.ms-excel",
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum UploadError {
    #[error("file not found: {path}")]
    NotFound { path: String },

    #[error("failed to inspect {path}: {message}")]
    Inspect { path: String, message: String },

    #[error("Formato de arquivo inválido. Use apenas .xlsx ou .xls")]
    InvalidFormat,

    #[error("Arquivo muito grande. Máximo 16MB ({size})")]
    TooLarge { size: String },

    #[error("Arquivo vazio")]
    Empty,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UploadFile {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
    pub kind: SpreadsheetKind,
}

impl UploadFile {
    pub async fn inspect(path: impl AsRef<Path>) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let meta = tokio::fs::metadata(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                UploadError::NotFound {
                    path: path.display().to_string(),
                }
            } else {
                UploadError::Inspect {
                    path: path.display().to_string(),
                    message: e.to_string(),
                }
            }
        })?;
        if !meta.is_file() {
            return Err(UploadError::NotFound {
                path: path.display().to_string(),
            });
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let kind = validate(&file_name, meta.len())?;
        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            size: meta.len(),
            kind,
        })
    }

    pub fn size_display(&self) -> String {
        utils::format_file_size(self.size)
    }
}

pub fn validate(file_name: &str, size: u64) -> Result<SpreadsheetKind, UploadError> {
    let kind = SpreadsheetKind::from_file_name(file_name).ok_or(UploadError::InvalidFormat)?;
    if size == 0 {
        return Err(UploadError::Empty);
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge {
            size: utils::format_file_size(size),
        });
    }
    Ok(kind)
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadSummary {
    pub total_received: Option<u64>,
    pub valid_records: Option<u64>,
    pub duplicates_found: Option<u64>,
    pub duplicate_keys: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UploadReport {
    pub message: Option<String>,
    pub summary: UploadSummary,
}

impl UploadReport {
    pub fn has_duplicates(&self) -> bool {
        self.summary.duplicates_found.unwrap_or(0) > 0
    }
}
