use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::{Dataset, DatasetName, SheetValues};
use crate::error::DashError;

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Fetches one named table. Implementations return data rows only and do not
/// retry; retry policy belongs to the sync layer.
pub trait RemoteSource: Send + Sync + 'static {
    fn fetch(
        &self,
        name: &DatasetName,
    ) -> impl Future<Output = Result<Dataset, DashError>> + Send;
}

impl<T: RemoteSource> RemoteSource for Arc<T> {
    fn fetch(
        &self,
        name: &DatasetName,
    ) -> impl Future<Output = Result<Dataset, DashError>> + Send {
        (**self).fetch(name)
    }
}

#[derive(Clone)]
pub struct SheetsHttpClient {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
    api_key: Option<String>,
}

impl SheetsHttpClient {
    pub fn new(
        base_url: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, DashError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("bizdash/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| DashError::Network(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| DashError::Network(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            api_key,
        })
    }

    pub fn values_url(&self, name: &DatasetName) -> String {
        let mut url = format!(
            "{}/{}/values/{}?valueRenderOption=FORMATTED_VALUE",
            self.base_url,
            self.spreadsheet_id,
            name.as_str()
        );
        if let Some(key) = &self.api_key {
            url.push_str("&key=");
            url.push_str(key);
        }
        url
    }

    async fn handle_status(response: reqwest::Response) -> Result<reqwest::Response, DashError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "spreadsheet request failed".to_string());
        Err(DashError::RemoteStatus { status, message })
    }
}

impl RemoteSource for SheetsHttpClient {
    async fn fetch(&self, name: &DatasetName) -> Result<Dataset, DashError> {
        let url = self.values_url(name);
        let start = std::time::Instant::now();
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| DashError::Network(err.to_string()))?;
        let response = Self::handle_status(response).await?;
        let body = response
            .bytes()
            .await
            .map_err(|err| DashError::Network(err.to_string()))?;
        tracing::debug!(
            dataset = %name,
            latency_ms = start.elapsed().as_millis() as u64,
            bytes = body.len(),
            "sheets.response"
        );
        parse_values(name, &body)
    }
}

/// Parses a values reply and strips its header row.
pub fn parse_values(name: &DatasetName, body: &[u8]) -> Result<Dataset, DashError> {
    let raw: SheetValues =
        serde_json::from_slice(body).map_err(|err| DashError::Format(err.to_string()))?;
    Ok(raw.into_dataset(name.clone()))
}
