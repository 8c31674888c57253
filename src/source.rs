use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::types::{RawRow, ServiceKey};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Response body of the tabular endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct SheetValues {
    #[serde(default)]
    pub values: Vec<RawRow>,
}

/// Anything that can hand back the raw rows of one service sheet.
#[async_trait]
pub trait SheetSource: Send + Sync {
    async fn fetch_rows(&self, service: ServiceKey) -> Result<Vec<RawRow>>;
}

pub struct HttpSheetSource {
    client: reqwest::Client,
    base_url: Url,
    resource_id: String,
    sheets: BTreeMap<ServiceKey, String>,
    token: String,
}

impl HttpSheetSource {
    pub fn from_config(config: &Config) -> Result<Self> {
        let token = config.token()?;
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| PipelineError::Config(format!("invalid base_url '{}': {}", config.base_url, e)))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        let sheets = ServiceKey::ALL.into_iter().map(|s| (s, config.sheet_name(s))).collect();
        Ok(HttpSheetSource {
            client,
            base_url,
            resource_id: config.resource_id.clone(),
            sheets,
            token,
        })
    }

    /// `{base}/{resource_id}/values/{sheet}`, with every segment percent-encoded.
    pub fn sheet_url(&self, service: ServiceKey) -> Result<Url> {
        let sheet = self
            .sheets
            .get(&service)
            .map(String::as_str)
            .unwrap_or_else(|| service.default_sheet());
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PipelineError::Config(format!("base_url '{}' cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend([self.resource_id.as_str(), "values", sheet]);
        Ok(url)
    }
}

#[async_trait]
impl SheetSource for HttpSheetSource {
    #[instrument(skip_all, fields(service = %service))]
    async fn fetch_rows(&self, service: ServiceKey) -> Result<Vec<RawRow>> {
        let url = self.sheet_url(service)?;
        debug!(%url, "requesting sheet");
        let response = self.client.get(url).bearer_auth(&self.token).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Status { service, status: status.as_u16() });
        }
        let body: SheetValues = response.json().await?;
        info!(rows = body.values.len(), "fetched sheet");
        Ok(body.values)
    }
}

/// Reads `<dir>/<CODE>.json` files holding the same `{ "values": [...] }` body.
pub struct FileSheetSource {
    dir: PathBuf,
}

impl FileSheetSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileSheetSource { dir: dir.into() }
    }

    pub fn path_for(&self, service: ServiceKey) -> PathBuf {
        self.dir.join(format!("{}.json", service.code()))
    }
}

#[async_trait]
impl SheetSource for FileSheetSource {
    async fn fetch_rows(&self, service: ServiceKey) -> Result<Vec<RawRow>> {
        let path = self.path_for(service);
        let content = tokio::fs::read_to_string(&path).await?;
        let body: SheetValues = serde_json::from_str(&content)?;
        debug!(service = %service, path = %path.display(), rows = body.values.len(), "read sheet file");
        Ok(body.values)
    }
}
