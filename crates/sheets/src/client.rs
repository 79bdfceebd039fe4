use std::time::Duration;

use engine::{
    GridStore, StoreError,
    grid::{CellValue, GridRange, Values},
};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;

use crate::{
    credentials::{Credentials, TokenSource},
    values::{ValueRangeBody, ValueRangeResponse},
};

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum SheetsError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{status}: {message}")]
    Server { status: StatusCode, message: String },
    #[error("token refresh failed, {status}: {message}")]
    Token { status: StatusCode, message: String },
    #[error("cannot sign token request: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
    #[error("missing {0}")]
    Missing(&'static str),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// [`GridStore`] backed by one Google spreadsheet.
#[derive(Debug)]
pub struct SheetsClient {
    client: Client,
    base_url: Url,
    spreadsheet_id: String,
    tokens: TokenSource,
}

impl SheetsClient {
    pub fn builder() -> SheetsClientBuilder {
        SheetsClientBuilder::default()
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// `{base}/spreadsheets/{id}/values/{range}[:{action}]`
    fn values_url(&self, range: &GridRange, action: Option<&str>) -> Result<Url, SheetsError> {
        let mut last = range.to_string();
        if let Some(action) = action {
            last.push(':');
            last.push_str(action);
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| SheetsError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["spreadsheets", self.spreadsheet_id.as_str(), "values", &last]);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, SheetsError> {
        let token = self.tokens.token(&self.client).await?;
        let resp = request.bearer_auth(token).send().await?;
        let status = resp.status();
        if status == StatusCode::OK {
            return Ok(resp);
        }

        let message = match resp.json::<ErrorBody>().await {
            Ok(body) => body.error.message,
            Err(_) => "server error".to_string(),
        };
        Err(SheetsError::Server { status, message })
    }

    async fn write(
        &self,
        request: impl FnOnce(Url) -> RequestBuilder,
        range: &GridRange,
        action: Option<&str>,
    ) -> Result<(), SheetsError> {
        let url = self.values_url(range, action)?;
        self.send(request(url)).await?;
        Ok(())
    }
}

fn read_failed(range: &GridRange, err: SheetsError) -> StoreError {
    tracing::warn!(%range, %err, "sheets read failed");
    StoreError::RemoteReadFailed(err.to_string())
}

fn write_failed(range: &GridRange, err: SheetsError) -> StoreError {
    tracing::warn!(%range, %err, "sheets write failed");
    StoreError::RemoteWriteFailed(err.to_string())
}

impl GridStore for SheetsClient {
    async fn append(&self, range: &GridRange, row: &[CellValue]) -> Result<(), StoreError> {
        let body = ValueRangeBody::single_row(range.to_string(), row);
        self.write(
            |url| {
                self.client
                    .post(url)
                    .query(&[
                        ("valueInputOption", "USER_ENTERED"),
                        ("insertDataOption", "INSERT_ROWS"),
                    ])
                    .json(&body)
            },
            range,
            Some("append"),
        )
        .await
        .map_err(|err| write_failed(range, err))?;

        tracing::debug!(%range, "appended row");
        Ok(())
    }

    async fn overwrite(&self, range: &GridRange, row: &[CellValue]) -> Result<(), StoreError> {
        let body = ValueRangeBody::single_row(range.to_string(), row);
        self.write(
            |url| {
                self.client
                    .put(url)
                    .query(&[("valueInputOption", "USER_ENTERED")])
                    .json(&body)
            },
            range,
            None,
        )
        .await
        .map_err(|err| write_failed(range, err))?;

        tracing::debug!(%range, "overwrote row");
        Ok(())
    }

    async fn clear(&self, range: &GridRange) -> Result<(), StoreError> {
        self.write(
            |url| self.client.post(url).json(&serde_json::json!({})),
            range,
            Some("clear"),
        )
        .await
        .map_err(|err| write_failed(range, err))?;

        tracing::debug!(%range, "cleared range");
        Ok(())
    }

    async fn fetch_values(&self, range: &GridRange) -> Result<Values, StoreError> {
        let url = self
            .values_url(range, None)
            .map_err(|err| read_failed(range, err))?;
        let request = self.client.get(url).query(&[
            ("valueRenderOption", "UNFORMATTED_VALUE"),
            ("majorDimension", "ROWS"),
        ]);

        let resp = self
            .send(request)
            .await
            .map_err(|err| read_failed(range, err))?;
        let body: ValueRangeResponse = resp
            .json()
            .await
            .map_err(|err| read_failed(range, err.into()))?;

        tracing::debug!(%range, rows = body.values.len(), "fetched values");
        Ok(body.into_values())
    }
}

#[derive(Debug, Default)]
pub struct SheetsClientBuilder {
    spreadsheet_id: Option<String>,
    credentials: Option<Credentials>,
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl SheetsClientBuilder {
    pub fn spreadsheet_id(mut self, spreadsheet_id: &str) -> SheetsClientBuilder {
        self.spreadsheet_id = Some(spreadsheet_id.to_string());
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> SheetsClientBuilder {
        self.credentials = Some(credentials);
        self
    }

    /// Defaults to [`DEFAULT_BASE_URL`].
    pub fn base_url(mut self, base_url: &str) -> SheetsClientBuilder {
        self.base_url = Some(base_url.to_string());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> SheetsClientBuilder {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<SheetsClient, SheetsError> {
        let spreadsheet_id = self
            .spreadsheet_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(SheetsError::Missing("spreadsheet id"))?;
        let credentials = self.credentials.ok_or(SheetsError::Missing("credentials"))?;

        let base_url = self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let base_url =
            Url::parse(base_url).map_err(|err| SheetsError::InvalidBaseUrl(err.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(SheetsError::InvalidBaseUrl(base_url.to_string()));
        }

        let client = Client::builder()
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()?;

        tracing::info!(%spreadsheet_id, %base_url, "sheets client ready");
        Ok(SheetsClient {
            client,
            base_url,
            spreadsheet_id,
            tokens: TokenSource::new(credentials),
        })
    }
}
