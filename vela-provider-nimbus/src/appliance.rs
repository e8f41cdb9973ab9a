//! Appliance kinds and their order payloads
//!
//! Every appliance the provider manages is one of a small set of kinds,
//! modeled as a tagged variant so each kind carries its own payload type
//! instead of being dispatched by string.

use serde::{Deserialize, Serialize};

/// Wire-level classification of an appliance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    SecurityAppliance,
    VirtualNetworkAppliance,
    SecurityDevice,
    SecurityDeviceHa,
}

impl DeviceClass {
    /// Path segment used by the REST API
    pub fn path(&self) -> &'static str {
        match self {
            Self::SecurityAppliance => "security_appliances",
            Self::VirtualNetworkAppliance => "virtual_network_appliances",
            Self::SecurityDevice => "security_devices",
            Self::SecurityDeviceHa => "security_devices/ha",
        }
    }
}

impl std::fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::SecurityAppliance => "security_appliance",
            Self::VirtualNetworkAppliance => "virtual_network_appliance",
            Self::SecurityDevice => "security_device",
            Self::SecurityDeviceHa => "security_device_ha",
        };
        write!(f, "{}", name)
    }
}

/// Redundancy mode of a security device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Redundancy {
    Single,
    Ha,
}

/// Order parameters for a security appliance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityAppliancePlan {
    pub zone: String,
    pub instance_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_set: Option<String>,
}

/// Order parameters for a virtual network appliance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualNetworkAppliancePlan {
    pub zone: String,
    pub instance_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_id: Option<String>,
}

/// Order parameters for a single or HA security device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityDevicePlan {
    pub zone: String,
    pub instance_type: String,
    pub redundancy: Redundancy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firmware: Option<String>,
}

/// Desired appliance, tagged by kind with its own payload type
#[derive(Debug, Clone, PartialEq)]
pub enum ApplianceSpec {
    SecurityAppliance(SecurityAppliancePlan),
    VirtualNetworkAppliance(VirtualNetworkAppliancePlan),
    SecurityDevice(SecurityDevicePlan),
}

impl ApplianceSpec {
    /// Wire classification for this spec
    pub fn class(&self) -> DeviceClass {
        match self {
            Self::SecurityAppliance(_) => DeviceClass::SecurityAppliance,
            Self::VirtualNetworkAppliance(_) => DeviceClass::VirtualNetworkAppliance,
            Self::SecurityDevice(plan) => match plan.redundancy {
                Redundancy::Single => DeviceClass::SecurityDevice,
                Redundancy::Ha => DeviceClass::SecurityDeviceHa,
            },
        }
    }

    /// Order parameters for the submit call
    pub fn parameters(&self) -> serde_json::Value {
        match self {
            Self::SecurityAppliance(plan) => serde_json::to_value(plan).unwrap_or_default(),
            Self::VirtualNetworkAppliance(plan) => serde_json::to_value(plan).unwrap_or_default(),
            Self::SecurityDevice(plan) => serde_json::to_value(plan).unwrap_or_default(),
        }
    }
}
