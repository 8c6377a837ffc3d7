use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;

use crate::api::{ApiError, Envelope, PageQuery, RecordPage, RecordsApi};
use crate::export::{CustomExportRequest, ExportFormat, ExportResponse, ExportResult};
use crate::filters::FilterSet;
use crate::records::{DashboardStats, RecordDetail};
use crate::upload::{UploadFile, UploadReport, UploadSummary};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000/api/embalagem";

#[derive(Clone, Debug)]
pub struct HttpOptions {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub proxy: Option<String>,
    pub insecure: bool,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: 10,
            proxy: None,
            insecure: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    #[error("invalid base URL '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },

    #[error("failed to setup proxy: {proxy}: {source}")]
    ProxySetup {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Clone, Debug)]
pub struct HttpRecordsApi {
    client: reqwest::Client,
    base: Url,
}

impl HttpRecordsApi {
    pub fn new(options: &HttpOptions) -> Result<Self, ClientBuildError> {
        let base = parse_base_url(&options.base_url)?;
        let client = build_client(
            options.proxy.as_deref(),
            options.timeout_seconds,
            options.insecure,
        )?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|e| ApiError::InvalidInput(format!("invalid endpoint '{path}': {e}")))
    }

    pub fn page_url(&self, query: &PageQuery) -> Result<Url, ApiError> {
        let mut url = self.endpoint("data")?;
        url.query_pairs_mut().extend_pairs(query.to_query());
        Ok(url)
    }

    pub fn export_url(&self, filters: &FilterSet, format: ExportFormat) -> Result<Url, ApiError> {
        let mut url = self.endpoint("export")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("format", format.as_str());
            pairs.extend_pairs(filters.to_query());
        }
        Ok(url)
    }

    /// Resolves a server-provided download link. Absolute paths are taken
    /// relative to the server origin.
    pub fn resolve_download_url(&self, link: &str) -> Result<Url, ApiError> {
        self.base
            .join(link)
            .map_err(|e| ApiError::InvalidInput(format!("invalid download link '{link}': {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        tracing::debug!(%url, "GET");
        let resp = self.client.get(url).send().await.map_err(|e| {
            tracing::warn!(error = %e, "request failed");
            ApiError::from(e)
        })?;
        decode(resp).await
    }

    pub async fn fetch_stats(&self) -> Result<DashboardStats, ApiError> {
        let url = self.endpoint("stats")?;
        self.get_json::<Envelope<DashboardStats>>(url)
            .await?
            .into_data()
    }

    pub async fn upload(&self, file: &UploadFile) -> Result<UploadReport, ApiError> {
        let url = self.endpoint("upload")?;
        let bytes = tokio::fs::read(&file.path).await.map_err(|e| {
            ApiError::InvalidInput(format!("failed to read {}: {e}", file.path.display()))
        })?;
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file.file_name.clone())
            .mime_str(file.kind.mime_type())
            .map_err(ApiError::from)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        tracing::debug!(%url, file = %file.file_name, size = file.size, "POST upload");
        let resp = self.client.post(url).multipart(form).send().await?;
        let env: Envelope<UploadSummary> = decode(resp).await?;
        if !env.success {
            if let Some(summary) = env.data.as_ref() {
                tracing::warn!(?summary, "upload rejected");
            }
            return Err(ApiError::application(env.error));
        }
        Ok(UploadReport {
            message: env.message,
            summary: env.data.unwrap_or_default(),
        })
    }

    pub async fn export(
        &self,
        filters: &FilterSet,
        format: ExportFormat,
    ) -> Result<ExportResult, ApiError> {
        let url = self.export_url(filters, format)?;
        self.get_json::<ExportResponse>(url).await?.into_result()
    }

    pub async fn export_custom(
        &self,
        request: &CustomExportRequest,
    ) -> Result<ExportResult, ApiError> {
        request.validate().map_err(ApiError::InvalidInput)?;
        let url = self.endpoint("export-custom")?;
        tracing::debug!(%url, export_type = request.export_type.as_str(), "POST export-custom");
        let resp = self.client.post(url).json(request).send().await?;
        decode::<ExportResponse>(resp).await?.into_result()
    }

    pub async fn download(&self, link: &str) -> Result<Vec<u8>, ApiError> {
        let url = self.resolve_download_url(link)?;
        tracing::debug!(%url, "GET download");
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::application(Some(format!(
                "download failed with HTTP {status}"
            ))));
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

#[async_trait]
impl RecordsApi for HttpRecordsApi {
    async fn fetch_page(&self, query: &PageQuery) -> Result<RecordPage, ApiError> {
        let url = self.page_url(query)?;
        self.get_json::<Envelope<Vec<crate::records::Record>>>(url)
            .await?
            .into_page()
    }

    async fn fetch_record(&self, id: i64) -> Result<RecordDetail, ApiError> {
        let url = self.endpoint(&format!("record/{id}"))?;
        self.get_json::<Envelope<RecordDetail>>(url)
            .await?
            .into_data()
    }
}

/// Error statuses still carry the `{success: false, error}` body, so the body
/// is decoded first and the status only matters when it is not JSON.
async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    let status = resp.status();
    let body = resp.bytes().await?;
    serde_json::from_slice::<T>(&body).map_err(|e| {
        if status.is_success() {
            ApiError::network(format!("invalid response body: {e}"))
        } else {
            ApiError::network(format!("HTTP {status}"))
        }
    })
}

fn parse_base_url(raw: &str) -> Result<Url, ClientBuildError> {
    let mut normalized = raw.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    Url::parse(&normalized).map_err(|e| ClientBuildError::InvalidBaseUrl {
        url: raw.to_string(),
        message: e.to_string(),
    })
}

fn build_client(
    proxy: Option<&str>,
    timeout_seconds: u64,
    insecure: bool,
) -> Result<reqwest::Client, ClientBuildError> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_static(concat!(
            "embalagem/",
            env!("CARGO_PKG_VERSION")
        )),
    );
    headers.insert(
        reqwest::header::ACCEPT,
        reqwest::header::HeaderValue::from_static("application/json"),
    );

    let timeout = Duration::from_secs(if timeout_seconds == 0 { 10 } else { timeout_seconds });
    let mut builder = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout);
    if insecure {
        builder = builder
            .danger_accept_invalid_hostnames(true)
            .danger_accept_invalid_certs(true);
    }

    if let Some(proxy) = proxy.filter(|p| !p.trim().is_empty()) {
        let proxy = reqwest::Proxy::all(proxy).map_err(|e| ClientBuildError::ProxySetup {
            proxy: proxy.to_string(),
            source: e,
        })?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| ClientBuildError::HttpClientBuild { source: e })
}
