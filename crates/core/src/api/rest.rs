//! REST API v2 client
//!
//! Implements `MetadataApi` over HTTP with reqwest.
//!
//! # Example
//!
//! ```rust,no_run
//! use tsarc_core::api::{MetadataApi, RestApiClient, TOKEN_VALIDITY_SECS};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = RestApiClient::new("https://my.thoughtspot.cloud")?.with_timeout(30)?;
//! client.authenticate("alice", "secret", TOKEN_VALIDITY_SECS).await?;
//! let page = client.search_models(0, 100_000).await?;
//! println!("{} models", page.models.len());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::client::MetadataApi;
use super::error::{ApiError, ApiResult};
use super::types::{
    MetadataSearchItem, MetadataSearchRequest, MetadataSelector, PermissionsRequest,
    SearchDataRequest, SearchDataResponse, TmlExportItem, TmlExportRequest, TokenRequest,
    TokenResponse,
};
use crate::metadata::{Dependent, ExportOptions, LogicalTable, ModelPage, TmlExport};
use crate::usage::{impressions_query, parse_impression_count};

/// Path prefix of the v2 API
const API_PREFIX: &str = "/api/rest/2.0";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Longest response body echoed into error messages
const MAX_ERROR_BODY: usize = 500;

/// HTTP client for the platform REST API
pub struct RestApiClient {
    /// Server URL without trailing slash
    base_url: String,
    /// Bearer token from `authenticate`
    token: Option<String>,
    /// Request timeout in seconds
    timeout_seconds: u64,
    client: reqwest::Client,
}

impl RestApiClient {
    /// Create a client for the given server URL
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = build_http_client(DEFAULT_TIMEOUT_SECS, &base_url)?;
        Ok(Self {
            base_url,
            token: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            client,
        })
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> ApiResult<Self> {
        self.client = build_http_client(seconds, &self.base_url)?;
        self.timeout_seconds = seconds;
        Ok(self)
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, endpoint)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> ApiResult<reqwest::RequestBuilder> {
        let token = self.token.as_ref().ok_or(ApiError::NotAuthenticated)?;
        Ok(request
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json"))
    }

    async fn post_json<B, R>(&self, endpoint: &str, body: &B) -> ApiResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!(endpoint, "POST");
        let request = self.authorized(self.client.post(self.url(endpoint)).json(body))?;
        let response = request
            .send()
            .await
            .map_err(|e| self.send_error(endpoint, e))?;
        decode(endpoint, response).await
    }

    async fn get_json<R: DeserializeOwned>(&self, endpoint: &str) -> ApiResult<R> {
        debug!(endpoint, "GET");
        let request = self.authorized(self.client.get(self.url(endpoint)))?;
        let response = request
            .send()
            .await
            .map_err(|e| self.send_error(endpoint, e))?;
        decode(endpoint, response).await
    }

    fn send_error(&self, endpoint: &str, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout {
                endpoint: endpoint.to_string(),
                seconds: self.timeout_seconds,
            }
        } else {
            ApiError::Network {
                url: self.url(endpoint),
                message: e.to_string(),
            }
        }
    }
}

fn build_http_client(timeout_seconds: u64, base_url: &str) -> ApiResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
        .map_err(|e| ApiError::Network {
            url: base_url.to_string(),
            message: format!("Failed to build HTTP client: {}", e),
        })
}

async fn decode<R: DeserializeOwned>(endpoint: &str, response: reqwest::Response) -> ApiResult<R> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Http {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body: truncate(&body),
        });
    }

    let bytes = response.bytes().await.map_err(|e| ApiError::Decode {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

fn truncate(body: &str) -> String {
    let body = body.trim();
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[async_trait]
impl MetadataApi for RestApiClient {
    async fn authenticate(
        &mut self,
        username: &str,
        password: &str,
        validity_secs: u64,
    ) -> ApiResult<()> {
        let endpoint = "/auth/token/full";
        let body = TokenRequest {
            username,
            password,
            validity_time_in_sec: validity_secs,
        };

        debug!(server = %self.base_url, username, "Requesting full access token");
        let response = self
            .client
            .post(self.url(endpoint))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.send_error(endpoint, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Authentication(format!(
                "HTTP {}: {}",
                status.as_u16(),
                truncate(&body)
            )));
        }

        let token: TokenResponse = decode(endpoint, response).await?;
        self.token = Some(token.token);
        Ok(())
    }

    async fn search_models(
        &self,
        record_offset: u32,
        record_size: u32,
    ) -> ApiResult<ModelPage> {
        let items: Vec<MetadataSearchItem> = self
            .post_json(
                "/metadata/search",
                &MetadataSearchRequest::models(record_offset, record_size),
            )
            .await?;
        let fetched = items.len();
        let models: Vec<LogicalTable> = items
            .into_iter()
            .filter_map(MetadataSearchItem::into_logical_table)
            .collect();
        if models.len() < fetched {
            warn!(
                skipped = fetched - models.len(),
                "Skipped search results without a model id"
            );
        }
        Ok(ModelPage { models, fetched })
    }

    async fn fetch_dependents(&self, model_id: &str) -> ApiResult<Vec<Dependent>> {
        let items: Vec<MetadataSearchItem> = self
            .post_json(
                "/metadata/search",
                &MetadataSearchRequest::dependents_of(model_id),
            )
            .await?;
        // An unknown model comes back as an empty list, not as an error status
        let item = items
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::NotFound(format!("model {}", model_id)))?;
        Ok(item.dependents_of(model_id))
    }

    async fn count_impressions(
        &self,
        logical_table_id: &str,
        object_id: &str,
        lookback_days: u32,
    ) -> ApiResult<u64> {
        let request = SearchDataRequest {
            query_string: impressions_query(object_id, lookback_days),
            logical_table_identifier: logical_table_id,
            data_format: "COMPACT",
            record_offset: 0,
            record_size: 1,
        };
        let endpoint = "/searchdata";
        let response: SearchDataResponse = self.post_json(endpoint, &request).await?;
        parse_impression_count(&response).map_err(|message| ApiError::Decode {
            endpoint: endpoint.to_string(),
            message,
        })
    }

    async fn export_tml(&self, guid: &str, options: ExportOptions) -> ApiResult<Vec<TmlExport>> {
        let items: Vec<TmlExportItem> = self
            .post_json("/metadata/tml/export", &TmlExportRequest::new(guid, options))
            .await?;
        Ok(items.into_iter().map(TmlExport::from).collect())
    }

    async fn fetch_permissions(&self, guid: &str) -> ApiResult<serde_json::Value> {
        let request = PermissionsRequest {
            metadata: vec![MetadataSelector::identifier(guid)],
        };
        self.post_json("/security/metadata/fetch-permissions", &request)
            .await
    }

    async fn session_user(&self) -> ApiResult<serde_json::Value> {
        self.get_json("/auth/session/user").await
    }
}
