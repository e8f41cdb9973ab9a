//! Error taxonomy for provisioning operations
//!
//! Nothing here is retried or swallowed; every failure carries the device
//! class and, where one exists, the order id, and is returned to the
//! caller as-is.

use std::time::Duration;

use thiserror::Error;

use crate::api::ApiError;
use crate::appliance::DeviceClass;
use crate::order::OrderId;
use crate::poller::PollError;
use crate::resolver::ResolveError;

#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The backend rejected the order request outright (validation, auth,
    /// quota)
    #[error("{class} order submission rejected: {source}")]
    Submission {
        class: DeviceClass,
        #[source]
        source: ApiError,
    },

    /// The deadline passed while the order was still pending. The
    /// backend-side work may still complete on its own; the outcome is
    /// ambiguous from the caller's point of view.
    #[error("{class} order {order_id} still pending after {waited:?}")]
    PollTimeout {
        class: DeviceClass,
        order_id: OrderId,
        waited: Duration,
        last_rate: Option<i64>,
    },

    /// The backend reported a status outside the configured vocabulary -
    /// a contract mismatch between controller and backend version
    #[error("{class} order {order_id} reported unrecognized status {label:?} (code {raw_code:?})")]
    UnknownStatus {
        class: DeviceClass,
        order_id: OrderId,
        label: String,
        raw_code: String,
    },

    /// A create order completed but the post-order listing shows nothing
    /// new. Whatever the backend created, if anything, is orphaned.
    #[error("{class} order {order_id} completed but resolved no new resource: {source}")]
    IdentityResolution {
        class: DeviceClass,
        order_id: OrderId,
        #[source]
        source: ResolveError,
    },

    /// The final read failed after a successful order. The identity in
    /// `local_id` is valid; the host should still record or retain it.
    #[error("{class} {local_id} could not be read back after provisioning")]
    ReadAfterProvision {
        class: DeviceClass,
        local_id: String,
        #[source]
        source: Option<ApiError>,
    },

    /// A status, listing, or read request failed in transit
    #[error("{class} {operation} request failed: {source}")]
    Backend {
        class: DeviceClass,
        operation: &'static str,
        #[source]
        source: ApiError,
    },
}

impl ProvisionError {
    pub(crate) fn from_poll(class: DeviceClass, order_id: OrderId, err: PollError) -> Self {
        match err {
            PollError::Timeout { waited, last_rate } => Self::PollTimeout {
                class,
                order_id,
                waited,
                last_rate,
            },
            PollError::UnexpectedStatus { label, raw_code } => Self::UnknownStatus {
                class,
                order_id,
                label,
                raw_code,
            },
            PollError::Refresh(source) => Self::Backend {
                class,
                operation: "order status",
                source,
            },
        }
    }

    /// True when the backend may have changed state despite the error
    pub fn is_ambiguous(&self) -> bool {
        matches!(
            self,
            Self::PollTimeout { .. } | Self::ReadAfterProvision { .. }
        )
    }
}
