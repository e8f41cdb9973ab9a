//! Nimbus API client
//!
//! The REST surface the provisioning controller consumes: order submission,
//! order status, listings, and reads by identity. The controller only sees
//! the `ApplianceApi` trait; `NimbusClient` is the HTTP implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::appliance::DeviceClass;
use crate::order::{OrderId, OrderRequest, ProgressStatus};

/// Errors from the backend API client
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request never produced a usable response
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Backend answered with a non-success status and no structured error
    #[error("backend returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Backend rejected the request with a structured error (validation,
    /// auth, quota)
    #[error("backend rejected the request: {code}: {message}")]
    Rejected { code: String, message: String },
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Client configuration, passed in explicitly per controller
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the Nimbus API (e.g., "https://api.nimbus.example/v1")
    pub endpoint: String,
    pub api_key: String,
    /// Tenant the operations run against
    pub tenant: String,
    /// Locale forwarded to the backend for generated names and messages
    pub locale: String,
}

/// One entry in a backend listing
///
/// The correlation key is the backend-generated, hostname-like identifier.
/// It appears only in listings and reads, never in the creation response,
/// which is why created resources are identified by snapshot diffing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplianceDescriptor {
    #[serde(rename = "device_name")]
    pub correlation_key: String,
    /// Consumer-specific field bag
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// Point-in-time listing of all appliances of one class
pub type Snapshot = Vec<ApplianceDescriptor>;

/// Backend operations the provisioning controller depends on
#[async_trait]
pub trait ApplianceApi: Send + Sync {
    /// Submit an order
    ///
    /// Returns only the opaque order handle; the created resource's
    /// correlation key is never part of the response.
    async fn submit_order(&self, request: &OrderRequest) -> ApiResult<OrderId>;

    /// Fetch the current status of an order. Idempotent, side-effect-free.
    async fn order_status(
        &self,
        order_id: &OrderId,
        class: DeviceClass,
    ) -> ApiResult<ProgressStatus>;

    /// List every appliance of one class
    ///
    /// Idempotent and unfiltered; the full current set, no pagination.
    async fn list_appliances(&self, class: DeviceClass) -> ApiResult<Snapshot>;

    /// Fetch one appliance by its correlation key
    async fn read_appliance(
        &self,
        class: DeviceClass,
        key: &str,
    ) -> ApiResult<Option<ApplianceDescriptor>>;
}

#[derive(Deserialize)]
struct OrderResponse {
    order_id: String,
}

#[derive(Deserialize)]
struct ListResponse {
    devices: Vec<ApplianceDescriptor>,
}

#[derive(Deserialize)]
struct FailureResponse {
    error: FailureDetail,
}

#[derive(Deserialize)]
struct FailureDetail {
    code: String,
    message: String,
}

/// HTTP client for the Nimbus appliance API
pub struct NimbusClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl NimbusClient {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    fn scope(&self) -> [(&'static str, &str); 2] {
        [
            ("tenant", self.config.tenant.as_str()),
            ("locale", self.config.locale.as_str()),
        ]
    }

    /// Map non-success responses to a structured rejection when the
    /// backend sent one, or a bare HTTP error otherwise
    async fn check(response: reqwest::Response) -> ApiResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if let Ok(failure) = serde_json::from_str::<FailureResponse>(&body) {
            return Err(ApiError::Rejected {
                code: failure.error.code,
                message: failure.error.message,
            });
        }
        Err(ApiError::Http {
            status: status.as_u16(),
            message: body,
        })
    }
}

#[async_trait]
impl ApplianceApi for NimbusClient {
    async fn submit_order(&self, request: &OrderRequest) -> ApiResult<OrderId> {
        let response = self
            .http
            .post(self.url(&format!("{}/orders", request.class().path())))
            .bearer_auth(&self.config.api_key)
            .query(&self.scope())
            .json(&request.body())
            .send()
            .await?;

        let body: OrderResponse = Self::check(response).await?.json().await?;
        Ok(OrderId::new(body.order_id))
    }

    async fn order_status(
        &self,
        order_id: &OrderId,
        class: DeviceClass,
    ) -> ApiResult<ProgressStatus> {
        let response = self
            .http
            .get(self.url(&format!("{}/orders/{}/status", class.path(), order_id)))
            .bearer_auth(&self.config.api_key)
            .query(&self.scope())
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }

    async fn list_appliances(&self, class: DeviceClass) -> ApiResult<Snapshot> {
        let response = self
            .http
            .get(self.url(class.path()))
            .bearer_auth(&self.config.api_key)
            .query(&self.scope())
            .send()
            .await?;

        let body: ListResponse = Self::check(response).await?.json().await?;
        Ok(body.devices)
    }

    async fn read_appliance(
        &self,
        class: DeviceClass,
        key: &str,
    ) -> ApiResult<Option<ApplianceDescriptor>> {
        let response = self
            .http
            .get(self.url(&format!("{}/{}", class.path(), key)))
            .bearer_auth(&self.config.api_key)
            .query(&self.scope())
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(Self::check(response).await?.json().await?))
    }
}
