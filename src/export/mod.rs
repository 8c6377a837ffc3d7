use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::api::ApiError;
use crate::utils;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Excel,
    Csv,
}

impl ExportFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "excel" | "xlsx" => Some(Self::Excel),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Excel => "excel",
            Self::Csv => "csv",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomExportType {
    #[default]
    All,
    Remessa,
    Date,
}

impl CustomExportType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "all" | "todos" => Some(Self::All),
            "remessa" => Some(Self::Remessa),
            "date" | "data" => Some(Self::Date),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Remessa => "remessa",
            Self::Date => "date",
        }
    }
}

/// Body of `POST export-custom`. Unused fields are sent as empty strings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CustomExportRequest {
    pub export_type: CustomExportType,
    pub remessa: String,
    pub data_inicio: String,
    pub data_fim: String,
}

impl CustomExportRequest {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_remessa(remessa: impl Into<String>) -> Self {
        Self {
            export_type: CustomExportType::Remessa,
            remessa: remessa.into().trim().to_string(),
            ..Self::default()
        }
    }

    pub fn by_date(data_inicio: Option<&str>, data_fim: Option<&str>) -> Self {
        Self {
            export_type: CustomExportType::Date,
            data_inicio: data_inicio.unwrap_or_default().trim().to_string(),
            data_fim: data_fim.unwrap_or_default().trim().to_string(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self.export_type {
            CustomExportType::All => Ok(()),
            CustomExportType::Remessa if self.remessa.trim().is_empty() => {
                Err("Remessa é obrigatória para este tipo de exportação".to_string())
            }
            CustomExportType::Remessa => Ok(()),
            CustomExportType::Date => {
                if self.data_inicio.is_empty() && self.data_fim.is_empty() {
                    return Err("Pelo menos uma data deve ser informada".to_string());
                }
                for (name, value) in [("data_inicio", &self.data_inicio), ("data_fim", &self.data_fim)] {
                    if !value.is_empty() {
                        utils::parse_iso_date(value).map_err(|e| format!("invalid {name}: {e}"))?;
                    }
                }
                if let (Ok(start), Ok(end)) = (
                    utils::parse_iso_date(&self.data_inicio),
                    utils::parse_iso_date(&self.data_fim),
                ) {
                    if start > end {
                        return Err("data_inicio must not be after data_fim".to_string());
                    }
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExportResponse {
    pub success: bool,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub total_records: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ExportResponse {
    pub fn into_result(self) -> Result<ExportResult, ApiError> {
        if !self.success {
            return Err(ApiError::application(self.error));
        }
        let download_url = self
            .download_url
            .ok_or_else(|| ApiError::network("export response is missing download_url"))?;
        let filename = self
            .filename
            .or_else(|| download_url.rsplit('/').next().map(str::to_string))
            .unwrap_or_else(|| "embalagem_export".to_string());
        Ok(ExportResult {
            download_url,
            filename,
            total_records: self.total_records.unwrap_or(0),
            message: self.message,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportResult {
    pub download_url: String,
    pub filename: String,
    pub total_records: u64,
    pub message: Option<String>,
}

impl ExportResult {
    pub fn notification_text(&self) -> String {
        match self.message.as_deref() {
            Some(m) if !m.trim().is_empty() => m.to_string(),
            _ => format!("Exportação concluída: {} registros", self.total_records),
        }
    }
}

/// Writes a downloaded export into `dir`, keeping only the final path
/// component of the server-provided name.
pub async fn save_download(dir: &Path, filename: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    let name = Path::new(filename)
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "embalagem_export".into());
    tokio::fs::create_dir_all(dir).await?;
    let target = dir.join(name);
    tokio::fs::write(&target, bytes).await?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remessa_export_requires_remessa() {
        assert!(CustomExportRequest::by_remessa("  ").validate().is_err());
        assert!(CustomExportRequest::by_remessa("4500012").validate().is_ok());
    }

    #[test]
    fn date_export_requires_one_valid_date() {
        assert!(CustomExportRequest::by_date(None, None).validate().is_err());
        assert!(CustomExportRequest::by_date(Some("2024-03-01"), None)
            .validate()
            .is_ok());
        assert!(CustomExportRequest::by_date(None, Some("03/01/2024"))
            .validate()
            .is_err());
        assert!(CustomExportRequest::by_date(Some("2024-03-02"), Some("2024-03-01"))
            .validate()
            .is_err());
    }

    #[test]
    fn all_export_serializes_empty_fields() {
        let body = serde_json::to_value(CustomExportRequest::all()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"export_type": "all", "remessa": "", "data_inicio": "", "data_fim": ""})
        );
    }

    #[test]
    fn response_without_filename_uses_link_tail() {
        let resp: ExportResponse = serde_json::from_str(
            r#"{"success": true, "download_url": "/static/exports/x.csv", "total_records": 3}"#,
        )
        .unwrap();
        let result = resp.into_result().unwrap();
        assert_eq!(result.filename, "x.csv");
        assert_eq!(result.notification_text(), "Exportação concluída: 3 registros");
    }

    #[test]
    fn failed_export_surfaces_server_error() {
        let resp: ExportResponse = serde_json::from_str(
            r#"{"success": false, "error": "Nenhum registro encontrado para os filtros especificados"}"#,
        )
        .unwrap();
        let err = resp.into_result().unwrap_err();
        assert_eq!(
            err.user_message(),
            Some("Nenhum registro encontrado para os filtros especificados")
        );
    }

    #[tokio::test]
    async fn download_is_saved_under_plain_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_download(dir.path(), "../../etc/embalagem.xlsx", b"PK")
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("embalagem.xlsx"));
        assert_eq!(std::fs::read(path).unwrap(), b"PK");
    }
}
