/// Google Sheets v4 client (raw HTTP via reqwest)
///
/// API Documentation: https://developers.google.com/sheets/api/reference/rest
///
/// Endpoints:
/// - GET  https://sheets.googleapis.com/v4/spreadsheets/{id}?fields=sheets.properties.title
/// - GET  https://sheets.googleapis.com/v4/spreadsheets/{id}/values/{range}
/// - POST https://sheets.googleapis.com/v4/spreadsheets/{id}/values:batchUpdate
///
/// Authentication: OAuth2 bearer tokens for a service account (gcp_auth),
/// refreshed by the provider as they expire.
pub mod types;

pub use self::types::{
    ApiErrorEnvelope, BatchUpdateRequest, BatchUpdateResponse, SpreadsheetMetadata, ValueRange,
};

use super::client::HttpClient;
use crate::config::{normalize_credentials_json, RateLimitConfig, RetryConfig, SheetsConfig};
use crate::errors::SheetsError;
use crate::logger::{self, LogTag};
use crate::retry::{self, RetryPolicy};
use crate::throttle::RateLimiter;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

// ============================================================================
// API CONFIGURATION
// ============================================================================

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SCOPES: &[&str] = &["https://www.googleapis.com/auth/spreadsheets"];

// ============================================================================
// CLIENT IMPLEMENTATION
// ============================================================================

pub struct SheetsClient {
    http: HttpClient,
    spreadsheet_id: String,
    auth: Arc<dyn TokenProvider>,
    limiter: RateLimiter,
    policy: RetryPolicy,
}

impl SheetsClient {
    /// Build a client from configuration, loading service account credentials
    pub fn new(
        config: &SheetsConfig,
        rate_limit: &RateLimitConfig,
        retry: &RetryConfig,
    ) -> Result<Self, SheetsError> {
        let account = load_service_account(config)?;
        logger::info(
            LogTag::Sheets,
            &format!("🔐 Service account loaded for spreadsheet {}", config.sheet_id),
        );

        Self::with_provider(config, rate_limit, retry, Arc::new(account))
    }

    /// Build a client around an existing token provider
    pub fn with_provider(
        config: &SheetsConfig,
        rate_limit: &RateLimitConfig,
        retry: &RetryConfig,
        auth: Arc<dyn TokenProvider>,
    ) -> Result<Self, SheetsError> {
        Ok(Self {
            http: HttpClient::new(config.request_timeout_secs).map_err(SheetsError::Network)?,
            spreadsheet_id: config.sheet_id.trim().to_string(),
            auth,
            limiter: RateLimiter::new(
                "sheets",
                config.max_requests_per_window,
                Duration::from_secs(config.window_secs),
                Duration::from_secs(rate_limit.error_delay_secs),
                Duration::from_secs(rate_limit.max_backoff_secs),
            ),
            policy: RetryPolicy::from_config(retry),
        })
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// Titles of every worksheet; fails when the spreadsheet is unreachable
    pub async fn worksheet_titles(&self) -> Result<Vec<String>, SheetsError> {
        retry::drive(
            &self.policy,
            &self.limiter,
            LogTag::Sheets,
            "[SHEETS] get metadata",
            || self.metadata_once(),
        )
        .await
        .map(|metadata| {
            metadata
                .sheets
                .into_iter()
                .map(|sheet| sheet.properties.title)
                .collect()
        })
        .map_err(|failure| failure.error)
    }

    /// All rows of `range` as formatted strings
    pub async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, SheetsError> {
        let label = format!("[SHEETS] get {}", range);
        retry::drive(&self.policy, &self.limiter, LogTag::Sheets, &label, || {
            self.get_values_once(range)
        })
        .await
        .map(|value_range| value_range.values)
        .map_err(|failure| failure.error)
    }

    /// Apply every range in `data` in a single request
    pub async fn batch_update(
        &self,
        data: Vec<ValueRange>,
    ) -> Result<BatchUpdateResponse, SheetsError> {
        let body = BatchUpdateRequest {
            value_input_option: "RAW".to_string(),
            data,
        };
        let label = format!("[SHEETS] batchUpdate {} range(s)", body.data.len());
        retry::drive(&self.policy, &self.limiter, LogTag::Sheets, &label, || {
            self.batch_update_once(&body)
        })
        .await
        .map_err(|failure| failure.error)
    }

    async fn metadata_once(&self) -> Result<SpreadsheetMetadata, SheetsError> {
        let url = self.url(&[])?;
        let token = self.token().await?;

        let response = self
            .http
            .client()
            .get(url)
            .bearer_auth(token)
            .query(&[("fields", "spreadsheetId,sheets.properties.title")])
            .send()
            .await
            .map_err(|e| SheetsError::Network(format!("Request failed: {}", e)))?;

        parse_response(response).await
    }

    async fn get_values_once(&self, range: &str) -> Result<ValueRange, SheetsError> {
        let url = self.url(&["values", range])?;
        let token = self.token().await?;

        let response = self
            .http
            .client()
            .get(url)
            .bearer_auth(token)
            .query(&[("majorDimension", "ROWS")])
            .send()
            .await
            .map_err(|e| SheetsError::Network(format!("Request failed: {}", e)))?;

        parse_response(response).await
    }

    async fn batch_update_once(
        &self,
        body: &BatchUpdateRequest,
    ) -> Result<BatchUpdateResponse, SheetsError> {
        let url = self.url(&["values:batchUpdate"])?;
        let token = self.token().await?;

        let response = self
            .http
            .client()
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| SheetsError::Network(format!("Request failed: {}", e)))?;

        let updated: BatchUpdateResponse = parse_response(response).await?;
        logger::debug(
            LogTag::Sheets,
            &format!(
                "[SHEETS] Updated {} cell(s)",
                updated.total_updated_cells.unwrap_or(0)
            ),
        );
        Ok(updated)
    }

    async fn token(&self) -> Result<String, SheetsError> {
        let token = self
            .auth
            .token(SCOPES)
            .await
            .map_err(|e| SheetsError::Auth(format!("Failed to obtain access token: {}", e)))?;
        Ok(token.as_str().to_string())
    }

    fn url(&self, segments: &[&str]) -> Result<Url, SheetsError> {
        spreadsheet_url(&self.spreadsheet_id, segments)
    }
}

fn spreadsheet_url(spreadsheet_id: &str, segments: &[&str]) -> Result<Url, SheetsError> {
    let mut url = Url::parse(SHEETS_BASE_URL)
        .map_err(|e| SheetsError::Network(format!("Invalid base URL: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| SheetsError::Network("Base URL cannot carry a path".to_string()))?
        .push(spreadsheet_id)
        .extend(segments);
    Ok(url)
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, SheetsError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
            .map(|envelope| envelope.error.message)
            .unwrap_or(body);
        return Err(SheetsError::from_status(status.as_u16(), message));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| SheetsError::Parse(format!("Failed to parse response: {}", e)))
}

/// Service account from inline JSON (preferred) or a key file
fn load_service_account(config: &SheetsConfig) -> Result<CustomServiceAccount, SheetsError> {
    if let Some(raw) = &config.credentials_json {
        let json = normalize_credentials_json(raw).ok_or_else(|| {
            SheetsError::Auth("No JSON object found in inline credentials".to_string())
        })?;
        return CustomServiceAccount::from_json(&json)
            .map_err(|e| SheetsError::Auth(format!("Invalid service account JSON: {}", e)));
    }

    if let Some(path) = &config.credentials_file {
        return CustomServiceAccount::from_file(path).map_err(|e| {
            SheetsError::Auth(format!("Invalid service account file '{}': {}", path, e))
        });
    }

    Err(SheetsError::Auth(
        "No Google credentials configured".to_string(),
    ))
}

/// Worksheet name quoted for A1 notation (`'It''s'`)
pub fn quote_worksheet(worksheet: &str) -> String {
    format!("'{}'", worksheet.replace('\'', "''"))
}

// ============================================================================
// TESTS
// ============================================================================
