//! Order - one backend-tracked long-running operation
//!
//! Every mutation against the Nimbus backend is an order: the submit call
//! returns an opaque handle, and the order's progress is observed through
//! the status endpoint until it reaches a terminal state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::appliance::DeviceClass;

/// Status label for an order that is still running
pub const STATUS_PROCESSING: &str = "processing";
/// Status label for an order that completed successfully
pub const STATUS_SUCCEEDED: &str = "succeeded";

/// Opaque order handle assigned by the backend on submission
///
/// Unpredictable and non-reusable; never derived from locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operation an order performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    Create,
    Update,
    Delete,
}

/// One in-flight backend operation
///
/// Created at submission time, consumed by the poller, discarded once a
/// terminal state is reached. Never persisted.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub kind: OrderKind,
    pub submitted_at: DateTime<Utc>,
}

impl Order {
    /// Record a successful submission
    pub fn submitted(id: OrderId, kind: OrderKind) -> Self {
        Self {
            id,
            kind,
            submitted_at: Utc::now(),
        }
    }
}

/// Payload for one order submission
#[derive(Debug, Clone, PartialEq)]
pub enum OrderRequest {
    Create {
        class: DeviceClass,
        parameters: serde_json::Value,
    },
    Update {
        class: DeviceClass,
        target: String,
        parameters: serde_json::Value,
    },
    Delete {
        class: DeviceClass,
        target: String,
    },
}

impl OrderRequest {
    pub fn kind(&self) -> OrderKind {
        match self {
            Self::Create { .. } => OrderKind::Create,
            Self::Update { .. } => OrderKind::Update,
            Self::Delete { .. } => OrderKind::Delete,
        }
    }

    pub fn class(&self) -> DeviceClass {
        match self {
            Self::Create { class, .. } => *class,
            Self::Update { class, .. } => *class,
            Self::Delete { class, .. } => *class,
        }
    }

    /// Wire body for the submit call
    pub fn body(&self) -> serde_json::Value {
        match self {
            Self::Create { parameters, .. } => json!({
                "operation": "create",
                "parameters": parameters,
            }),
            Self::Update {
                target, parameters, ..
            } => json!({
                "operation": "update",
                "target": target,
                "parameters": parameters,
            }),
            Self::Delete { target, .. } => json!({
                "operation": "delete",
                "target": target,
            }),
        }
    }
}

/// Result of one status poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressStatus {
    /// 0-100 completion indicator; 100 is the only success terminal value
    pub progress_rate: i64,
    /// Backend status code, surfaced for diagnostics only
    #[serde(rename = "status_code")]
    pub raw_code: String,
}

impl ProgressStatus {
    /// Normalize to the controller's status vocabulary
    ///
    /// Values outside [0, 100] fall through to the raw code, which no
    /// vocabulary lists, so the poller treats them as fatal.
    pub fn label(&self) -> &str {
        match self.progress_rate {
            100 => STATUS_SUCCEEDED,
            0..=99 => STATUS_PROCESSING,
            _ => self.raw_code.as_str(),
        }
    }
}
