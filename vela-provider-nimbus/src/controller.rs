//! Provisioning controller - submit, poll, and reconcile appliance orders
//!
//! The backend tracks every mutation as an order. Creation is the awkward
//! case: the submit response carries only the order handle, so the
//! controller snapshots the class listing before and after the order and
//! diffs the two to learn the new appliance's correlation key. That key
//! becomes the local identity the host persists.
//!
//! Each operation runs to completion (or deadline) on the calling task;
//! there is no background work and no shared state across operations.

use std::time::Duration;

use crate::api::{ApplianceApi, ApplianceDescriptor, Snapshot};
use crate::appliance::{ApplianceSpec, DeviceClass};
use crate::error::ProvisionError;
use crate::order::{
    Order, OrderRequest, ProgressStatus, STATUS_PROCESSING, STATUS_SUCCEEDED,
};
use crate::poller::{PollConfig, Poller};
use crate::resolver::resolve_created_key;

/// Orchestrates appliance lifecycle operations against one backend tenant
pub struct ApplianceController<A> {
    api: A,
}

impl<A: ApplianceApi> ApplianceController<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// Provision a new appliance and resolve its identity
    ///
    /// Returns the correlation key the host must persist, plus the freshly
    /// read descriptor. The before/after diff is only correct if no other
    /// actor creates or deletes a same-class appliance between the two
    /// snapshots; nothing here locks the tenant.
    pub async fn create(
        &self,
        spec: &ApplianceSpec,
        timeout: Duration,
    ) -> Result<(String, ApplianceDescriptor), ProvisionError> {
        let class = spec.class();
        let before = self.snapshot(class, "pre-order listing").await?;

        let request = OrderRequest::Create {
            class,
            parameters: spec.parameters(),
        };
        let order = self.submit(&request).await?;
        self.wait(class, &order, timeout).await?;

        let after = self.snapshot(class, "post-order listing").await?;
        let local_id =
            resolve_created_key(&before, &after).map_err(|source| {
                ProvisionError::IdentityResolution {
                    class,
                    order_id: order.id.clone(),
                    source,
                }
            })?;
        log::info!("created {} {}", class, local_id);

        let observed = self.read_back(class, &local_id).await?;
        Ok((local_id, observed))
    }

    /// Fetch one appliance by its persisted identity
    pub async fn read(
        &self,
        class: DeviceClass,
        local_id: &str,
    ) -> Result<Option<ApplianceDescriptor>, ProvisionError> {
        self.api
            .read_appliance(class, local_id)
            .await
            .map_err(|source| ProvisionError::Backend {
                class,
                operation: "read",
                source,
            })
    }

    /// Reconfigure an existing appliance
    ///
    /// Identity is already known, so no snapshots are taken.
    pub async fn update(
        &self,
        class: DeviceClass,
        local_id: &str,
        parameters: serde_json::Value,
        timeout: Duration,
    ) -> Result<ApplianceDescriptor, ProvisionError> {
        let request = OrderRequest::Update {
            class,
            target: local_id.to_string(),
            parameters,
        };
        let order = self.submit(&request).await?;
        self.wait(class, &order, timeout).await?;

        self.read_back(class, local_id).await
    }

    /// Decommission an appliance
    ///
    /// On any failure the appliance is assumed to still exist and the host
    /// keeps its identity; there is no partial success.
    pub async fn delete(
        &self,
        class: DeviceClass,
        local_id: &str,
        timeout: Duration,
    ) -> Result<(), ProvisionError> {
        let request = OrderRequest::Delete {
            class,
            target: local_id.to_string(),
        };
        let order = self.submit(&request).await?;
        self.wait(class, &order, timeout).await?;
        log::info!("deleted {} {}", class, local_id);

        Ok(())
    }

    async fn snapshot(
        &self,
        class: DeviceClass,
        operation: &'static str,
    ) -> Result<Snapshot, ProvisionError> {
        self.api
            .list_appliances(class)
            .await
            .map_err(|source| ProvisionError::Backend {
                class,
                operation,
                source,
            })
    }

    async fn submit(&self, request: &OrderRequest) -> Result<Order, ProvisionError> {
        let class = request.class();
        let order_id = self
            .api
            .submit_order(request)
            .await
            .map_err(|source| ProvisionError::Submission { class, source })?;
        log::debug!("submitted {} order {}", class, order_id);

        Ok(Order::submitted(order_id, request.kind()))
    }

    async fn wait(
        &self,
        class: DeviceClass,
        order: &Order,
        timeout: Duration,
    ) -> Result<ProgressStatus, ProvisionError> {
        let poller = Poller::new(&[STATUS_PROCESSING], &[STATUS_SUCCEEDED])
            .with_config(PollConfig::with_timeout(timeout));

        let api = &self.api;
        let order_id = &order.id;
        poller
            .wait(order, move || api.order_status(order_id, class))
            .await
            .map_err(|err| ProvisionError::from_poll(class, order.id.clone(), err))
    }

    async fn read_back(
        &self,
        class: DeviceClass,
        local_id: &str,
    ) -> Result<ApplianceDescriptor, ProvisionError> {
        match self.api.read_appliance(class, local_id).await {
            Ok(Some(descriptor)) => Ok(descriptor),
            Ok(None) => Err(ProvisionError::ReadAfterProvision {
                class,
                local_id: local_id.to_string(),
                source: None,
            }),
            Err(source) => Err(ProvisionError::ReadAfterProvision {
                class,
                local_id: local_id.to_string(),
                source: Some(source),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::api::{ApiError, ApiResult};
    use crate::appliance::SecurityAppliancePlan;
    use crate::order::{OrderId, OrderKind};

    fn descriptor(key: &str) -> ApplianceDescriptor {
        ApplianceDescriptor {
            correlation_key: key.to_string(),
            attributes: serde_json::Map::new(),
        }
    }

    fn status(rate: i64) -> ProgressStatus {
        ProgressStatus {
            progress_rate: rate,
            raw_code: "OK".to_string(),
        }
    }

    fn appliance_spec() -> ApplianceSpec {
        ApplianceSpec::SecurityAppliance(SecurityAppliancePlan {
            zone: "east-1".to_string(),
            instance_type: "medium".to_string(),
            rule_set: None,
        })
    }

    /// Scripted backend: statuses and listings are consumed in order;
    /// when the status queue runs dry the steady status repeats forever.
    #[derive(Default)]
    struct MockApi {
        reject_submit: bool,
        statuses: Mutex<VecDeque<ProgressStatus>>,
        steady_status: Option<ProgressStatus>,
        listings: Mutex<VecDeque<Snapshot>>,
        read_result: Option<ApplianceDescriptor>,
        fail_read: bool,
        submits: Mutex<Vec<OrderRequest>>,
        status_calls: Mutex<usize>,
        list_calls: Mutex<usize>,
        reads: Mutex<Vec<String>>,
    }

    impl MockApi {
        fn with_statuses(rates: &[i64]) -> Self {
            Self {
                statuses: Mutex::new(rates.iter().map(|r| status(*r)).collect()),
                ..Self::default()
            }
        }

        fn forever_pending(rate: i64) -> Self {
            Self {
                steady_status: Some(status(rate)),
                ..Self::default()
            }
        }

        fn listings(mut self, listings: &[&[&str]]) -> Self {
            self.listings = Mutex::new(
                listings
                    .iter()
                    .map(|keys| keys.iter().map(|k| descriptor(k)).collect())
                    .collect(),
            );
            self
        }

        fn reads_back(mut self, key: &str) -> Self {
            self.read_result = Some(descriptor(key));
            self
        }
    }

    #[async_trait]
    impl ApplianceApi for MockApi {
        async fn submit_order(&self, request: &OrderRequest) -> ApiResult<OrderId> {
            if self.reject_submit {
                return Err(ApiError::Rejected {
                    code: "QuotaExceeded".to_string(),
                    message: "too many devices".to_string(),
                });
            }
            let mut submits = self.submits.lock().unwrap();
            submits.push(request.clone());
            Ok(OrderId::new(format!("ord-{}", submits.len())))
        }

        async fn order_status(
            &self,
            _order_id: &OrderId,
            _class: DeviceClass,
        ) -> ApiResult<ProgressStatus> {
            *self.status_calls.lock().unwrap() += 1;
            if let Some(next) = self.statuses.lock().unwrap().pop_front() {
                return Ok(next);
            }
            match &self.steady_status {
                Some(steady) => Ok(steady.clone()),
                None => panic!("status polled past the scripted sequence"),
            }
        }

        async fn list_appliances(&self, _class: DeviceClass) -> ApiResult<Snapshot> {
            *self.list_calls.lock().unwrap() += 1;
            Ok(self.listings.lock().unwrap().pop_front().unwrap_or_default())
        }

        async fn read_appliance(
            &self,
            _class: DeviceClass,
            key: &str,
        ) -> ApiResult<Option<ApplianceDescriptor>> {
            self.reads.lock().unwrap().push(key.to_string());
            if self.fail_read {
                return Err(ApiError::Http {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            Ok(self.read_result.clone())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn create_resolves_identity_and_reads_it_back() {
        let api = MockApi::with_statuses(&[0, 45, 80, 100])
            .listings(&[&["host-a"], &["host-a", "host-b"]])
            .reads_back("host-b");
        let controller = ApplianceController::new(api);

        let (local_id, observed) = controller
            .create(&appliance_spec(), Duration::from_secs(600))
            .await
            .unwrap();

        assert_eq!(local_id, "host-b");
        assert_eq!(observed.correlation_key, "host-b");

        let api = &controller.api;
        assert_eq!(*api.status_calls.lock().unwrap(), 4);
        assert_eq!(*api.list_calls.lock().unwrap(), 2);
        assert_eq!(*api.reads.lock().unwrap(), vec!["host-b".to_string()]);

        let submits = api.submits.lock().unwrap();
        assert_eq!(submits.len(), 1);
        assert_eq!(submits[0].kind(), OrderKind::Create);
        assert_eq!(submits[0].class(), DeviceClass::SecurityAppliance);
    }

    #[tokio::test(start_paused = true)]
    async fn create_fails_when_listing_shows_nothing_new() {
        let api = MockApi::with_statuses(&[100]).listings(&[&["host-a"], &["host-a"]]);
        let controller = ApplianceController::new(api);

        let err = controller
            .create(&appliance_spec(), Duration::from_secs(600))
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::IdentityResolution { .. }));
        // the orphaned backend resource is never read
        assert!(controller.api.reads.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn create_read_back_failure_still_carries_identity() {
        let mut api =
            MockApi::with_statuses(&[100]).listings(&[&["host-a"], &["host-a", "host-b"]]);
        api.fail_read = true;
        let controller = ApplianceController::new(api);

        let err = controller
            .create(&appliance_spec(), Duration::from_secs(600))
            .await
            .unwrap_err();

        match err {
            ProvisionError::ReadAfterProvision { local_id, .. } => {
                assert_eq!(local_id, "host-b");
            }
            other => panic!("expected read-after-provision, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn submission_rejection_surfaces_before_any_poll() {
        let api = MockApi {
            reject_submit: true,
            ..MockApi::default()
        };
        let controller = ApplianceController::new(api);

        let err = controller
            .delete(DeviceClass::SecurityDevice, "host-b", Duration::from_secs(60))
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::Submission { .. }));
        assert_eq!(*controller.api.status_calls.lock().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_timeout_leaves_identity_with_the_host() {
        let api = MockApi::forever_pending(10);
        let controller = ApplianceController::new(api);

        let err = controller
            .delete(DeviceClass::SecurityDevice, "host-b", Duration::from_secs(60))
            .await
            .unwrap_err();

        match &err {
            ProvisionError::PollTimeout { waited, .. } => {
                assert!(*waited >= Duration::from_secs(60));
            }
            other => panic!("expected poll timeout, got {other:?}"),
        }
        // ambiguous outcome: the host must not clear its local identity
        assert!(err.is_ambiguous());

        let submits = controller.api.submits.lock().unwrap();
        assert_eq!(submits.len(), 1);
        assert_eq!(submits[0].kind(), OrderKind::Delete);
    }

    #[tokio::test(start_paused = true)]
    async fn update_takes_no_snapshots() {
        let api = MockApi::with_statuses(&[100]).reads_back("host-b");
        let controller = ApplianceController::new(api);

        let observed = controller
            .update(
                DeviceClass::VirtualNetworkAppliance,
                "host-b",
                serde_json::json!({"instance_type": "large"}),
                Duration::from_secs(600),
            )
            .await
            .unwrap();

        assert_eq!(observed.correlation_key, "host-b");
        assert_eq!(*controller.api.list_calls.lock().unwrap(), 0);

        let submits = controller.api.submits.lock().unwrap();
        assert_eq!(submits.len(), 1);
        assert_eq!(submits[0].kind(), OrderKind::Update);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_status_aborts_with_order_context() {
        let api = MockApi {
            statuses: Mutex::new(VecDeque::from([ProgressStatus {
                progress_rate: 999,
                raw_code: "ERR-42".to_string(),
            }])),
            ..MockApi::default()
        };
        let controller = ApplianceController::new(api);

        let err = controller
            .delete(DeviceClass::SecurityAppliance, "host-b", Duration::from_secs(60))
            .await
            .unwrap_err();

        match err {
            ProvisionError::UnknownStatus {
                order_id,
                label,
                raw_code,
                ..
            } => {
                assert_eq!(order_id, OrderId::new("ord-1"));
                assert_eq!(label, "ERR-42");
                assert_eq!(raw_code, "ERR-42");
            }
            other => panic!("expected unknown status, got {other:?}"),
        }
    }
}
