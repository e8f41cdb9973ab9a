//! Resource - Resources as seen across the provider boundary

use std::collections::HashMap;

/// Unique identifier for a resource declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    /// Resource type (e.g., "security_appliance")
    pub resource_type: String,
    /// Resource name (identifier chosen in configuration)
    pub name: String,
}

impl ResourceId {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }
}

/// Attribute value of a resource
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
}

/// Desired state supplied by the declarative host
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSpec {
    pub id: ResourceId,
    pub attributes: HashMap<String, Value>,
}

impl ResourceSpec {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(resource_type, name),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// Observed state fetched from the backend
///
/// `local_id` is the durable identity the host persists across restarts.
/// For freshly created resources it is only known once the provider has
/// reconciled it, which is why it is optional here.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceState {
    pub id: ResourceId,
    /// Backend identity of the resource (e.g., a generated hostname)
    pub local_id: Option<String>,
    pub attributes: HashMap<String, Value>,
    /// Whether the resource exists on the backend
    pub exists: bool,
}

impl ResourceState {
    pub fn not_found(id: ResourceId) -> Self {
        Self {
            id,
            local_id: None,
            attributes: HashMap::new(),
            exists: false,
        }
    }

    pub fn existing(id: ResourceId, attributes: HashMap<String, Value>) -> Self {
        Self {
            id,
            local_id: None,
            attributes,
            exists: true,
        }
    }

    pub fn with_local_id(mut self, local_id: impl Into<String>) -> Self {
        self.local_id = Some(local_id.into());
        self
    }
}
