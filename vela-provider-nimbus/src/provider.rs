//! Nimbus provider - the host-facing surface
//!
//! Implements the vela-core Provider trait by converting declarative
//! attribute bags into typed appliance payloads and delegating to the
//! provisioning controller.

use std::collections::HashMap;
use std::time::Duration;

use vela_core::provider::{BoxFuture, Provider, ProviderError, ProviderResult};
use vela_core::resource::{ResourceId, ResourceSpec, ResourceState, Value};

use crate::api::{ApiConfig, ApplianceApi, ApplianceDescriptor, NimbusClient};
use crate::appliance::{
    ApplianceSpec, DeviceClass, Redundancy, SecurityAppliancePlan, SecurityDevicePlan,
    VirtualNetworkAppliancePlan,
};
use crate::controller::ApplianceController;
use crate::error::ProvisionError;

/// Resource types this provider handles
pub const RESOURCE_TYPES: &[&str] = &[
    "security_appliance",
    "virtual_network_appliance",
    "security_device",
    "security_device_ha",
];

/// Nimbus Provider
pub struct NimbusProvider<A> {
    controller: ApplianceController<A>,
}

impl NimbusProvider<NimbusClient> {
    /// Build a provider over the REST client for one tenant
    pub fn from_config(config: ApiConfig) -> Self {
        Self::new(NimbusClient::new(config))
    }
}

impl<A: ApplianceApi> NimbusProvider<A> {
    /// Create with a specific client (for testing)
    pub fn new(api: A) -> Self {
        Self {
            controller: ApplianceController::new(api),
        }
    }
}

/// Wire classification for a host-level resource type
fn device_class(id: &ResourceId) -> ProviderResult<DeviceClass> {
    match id.resource_type.as_str() {
        "security_appliance" => Ok(DeviceClass::SecurityAppliance),
        "virtual_network_appliance" => Ok(DeviceClass::VirtualNetworkAppliance),
        "security_device" => Ok(DeviceClass::SecurityDevice),
        "security_device_ha" => Ok(DeviceClass::SecurityDeviceHa),
        other => Err(ProviderError::new(format!("Unknown resource type: {}", other))
            .for_resource(id.clone())),
    }
}

fn require_string(spec: &ResourceSpec, key: &str) -> ProviderResult<String> {
    match spec.attributes.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        _ => Err(ProviderError::new(format!("{} is required", key))
            .for_resource(spec.id.clone())),
    }
}

fn optional_string(spec: &ResourceSpec, key: &str) -> Option<String> {
    match spec.attributes.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

/// Map a declarative spec to a typed appliance payload
fn appliance_spec(spec: &ResourceSpec) -> ProviderResult<ApplianceSpec> {
    match spec.id.resource_type.as_str() {
        "security_appliance" => Ok(ApplianceSpec::SecurityAppliance(SecurityAppliancePlan {
            zone: require_string(spec, "zone")?,
            instance_type: require_string(spec, "instance_type")?,
            rule_set: optional_string(spec, "rule_set"),
        })),
        "virtual_network_appliance" => Ok(ApplianceSpec::VirtualNetworkAppliance(
            VirtualNetworkAppliancePlan {
                zone: require_string(spec, "zone")?,
                instance_type: require_string(spec, "instance_type")?,
                network_id: optional_string(spec, "network_id"),
            },
        )),
        "security_device" | "security_device_ha" => {
            let redundancy = if spec.id.resource_type == "security_device_ha" {
                Redundancy::Ha
            } else {
                Redundancy::Single
            };
            Ok(ApplianceSpec::SecurityDevice(SecurityDevicePlan {
                zone: require_string(spec, "zone")?,
                instance_type: require_string(spec, "instance_type")?,
                redundancy,
                firmware: optional_string(spec, "firmware"),
            }))
        }
        other => Err(ProviderError::new(format!("Unknown resource type: {}", other))
            .for_resource(spec.id.clone())),
    }
}

/// Convert a descriptor's JSON field bag into host attribute values
fn json_to_value(value: &serde_json::Value) -> Option<Value> {
    match value {
        serde_json::Value::String(s) => Some(Value::String(s.clone())),
        serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Value::Int(i))
            } else {
                n.as_f64().map(|f| Value::Int(f as i64))
            }
        }
        serde_json::Value::Array(arr) => {
            let items: Vec<Value> = arr.iter().filter_map(json_to_value).collect();
            Some(Value::List(items))
        }
        _ => None,
    }
}

fn observed_state(id: &ResourceId, descriptor: ApplianceDescriptor) -> ResourceState {
    let mut attributes = HashMap::new();
    for (key, value) in &descriptor.attributes {
        if let Some(v) = json_to_value(value) {
            attributes.insert(key.clone(), v);
        }
    }
    ResourceState::existing(id.clone(), attributes).with_local_id(descriptor.correlation_key)
}

fn provider_error(id: &ResourceId, err: ProvisionError) -> ProviderError {
    ProviderError::new(err.to_string())
        .for_resource(id.clone())
        .with_cause(err)
}

impl<A: ApplianceApi> Provider for NimbusProvider<A> {
    fn name(&self) -> &'static str {
        "nimbus"
    }

    fn resource_types(&self) -> &'static [&'static str] {
        RESOURCE_TYPES
    }

    fn create(
        &self,
        spec: &ResourceSpec,
        timeout: Duration,
    ) -> BoxFuture<'_, ProviderResult<ResourceState>> {
        let spec = spec.clone();
        Box::pin(async move {
            let appliance = appliance_spec(&spec)?;
            let (_, observed) = self
                .controller
                .create(&appliance, timeout)
                .await
                .map_err(|e| provider_error(&spec.id, e))?;
            Ok(observed_state(&spec.id, observed))
        })
    }

    fn read(&self, id: &ResourceId, local_id: &str) -> BoxFuture<'_, ProviderResult<ResourceState>> {
        let id = id.clone();
        let local_id = local_id.to_string();
        Box::pin(async move {
            let class = device_class(&id)?;
            match self
                .controller
                .read(class, &local_id)
                .await
                .map_err(|e| provider_error(&id, e))?
            {
                Some(descriptor) => Ok(observed_state(&id, descriptor)),
                None => Ok(ResourceState::not_found(id)),
            }
        })
    }

    fn update(
        &self,
        id: &ResourceId,
        local_id: &str,
        spec: &ResourceSpec,
        timeout: Duration,
    ) -> BoxFuture<'_, ProviderResult<ResourceState>> {
        let id = id.clone();
        let local_id = local_id.to_string();
        let spec = spec.clone();
        Box::pin(async move {
            let class = device_class(&id)?;
            let appliance = appliance_spec(&spec)?;
            let observed = self
                .controller
                .update(class, &local_id, appliance.parameters(), timeout)
                .await
                .map_err(|e| provider_error(&id, e))?;
            Ok(observed_state(&id, observed))
        })
    }

    fn delete(
        &self,
        id: &ResourceId,
        local_id: &str,
        timeout: Duration,
    ) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let local_id = local_id.to_string();
        Box::pin(async move {
            let class = device_class(&id)?;
            self.controller
                .delete(class, &local_id, timeout)
                .await
                .map_err(|e| provider_error(&id, e))
        })
    }
}
