//! Provider - Trait abstracting provisioning operations
//!
//! A Provider translates declarative resource specs into backend API calls.
//! The host supplies desired attribute bags and a per-operation timeout; it
//! owns persistence of each resource's local identity across restarts.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::resource::{ResourceId, ResourceSpec, ResourceState};

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub message: String,
    pub resource_id: Option<ResourceId>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref id) = self.resource_id {
            write!(f, "[{}.{}] {}", id.resource_type, id.name, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            resource_id: None,
            cause: None,
        }
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Main Provider trait
///
/// Each backend plugin implements this trait. All operations are async and
/// involve side effects; mutating operations block until the backend has
/// finished (or the supplied timeout passes), there is no background work
/// left running from the host's perspective.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "nimbus")
    fn name(&self) -> &'static str;

    /// Resource types this Provider can handle
    fn resource_types(&self) -> &'static [&'static str];

    /// Create a resource and resolve its backend identity
    ///
    /// Returns state with `local_id` set; the host must persist it.
    fn create(
        &self,
        spec: &ResourceSpec,
        timeout: Duration,
    ) -> BoxFuture<'_, ProviderResult<ResourceState>>;

    /// Get the current state of a resource by its persisted identity
    ///
    /// Returns `ResourceState::not_found()` if the resource no longer
    /// exists on the backend.
    fn read(&self, id: &ResourceId, local_id: &str) -> BoxFuture<'_, ProviderResult<ResourceState>>;

    /// Update a resource in place
    fn update(
        &self,
        id: &ResourceId,
        local_id: &str,
        spec: &ResourceSpec,
        timeout: Duration,
    ) -> BoxFuture<'_, ProviderResult<ResourceState>>;

    /// Delete a resource
    ///
    /// On error the host must keep `local_id`: the resource is assumed to
    /// still exist.
    fn delete(
        &self,
        id: &ResourceId,
        local_id: &str,
        timeout: Duration,
    ) -> BoxFuture<'_, ProviderResult<()>>;
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resource_types(&self) -> &'static [&'static str] {
        (**self).resource_types()
    }

    fn create(
        &self,
        spec: &ResourceSpec,
        timeout: Duration,
    ) -> BoxFuture<'_, ProviderResult<ResourceState>> {
        (**self).create(spec, timeout)
    }

    fn read(&self, id: &ResourceId, local_id: &str) -> BoxFuture<'_, ProviderResult<ResourceState>> {
        (**self).read(id, local_id)
    }

    fn update(
        &self,
        id: &ResourceId,
        local_id: &str,
        spec: &ResourceSpec,
        timeout: Duration,
    ) -> BoxFuture<'_, ProviderResult<ResourceState>> {
        (**self).update(id, local_id, spec, timeout)
    }

    fn delete(
        &self,
        id: &ResourceId,
        local_id: &str,
        timeout: Duration,
    ) -> BoxFuture<'_, ProviderResult<()>> {
        (**self).delete(id, local_id, timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Mock Provider for testing
    struct MockProvider;

    impl Provider for MockProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn resource_types(&self) -> &'static [&'static str] {
            &["mock_appliance"]
        }

        fn create(
            &self,
            spec: &ResourceSpec,
            _timeout: Duration,
        ) -> BoxFuture<'_, ProviderResult<ResourceState>> {
            let state = ResourceState::existing(spec.id.clone(), spec.attributes.clone())
                .with_local_id("mock-host-1");
            Box::pin(async move { Ok(state) })
        }

        fn read(
            &self,
            id: &ResourceId,
            _local_id: &str,
        ) -> BoxFuture<'_, ProviderResult<ResourceState>> {
            let id = id.clone();
            Box::pin(async move { Ok(ResourceState::not_found(id)) })
        }

        fn update(
            &self,
            id: &ResourceId,
            local_id: &str,
            spec: &ResourceSpec,
            _timeout: Duration,
        ) -> BoxFuture<'_, ProviderResult<ResourceState>> {
            let state = ResourceState::existing(id.clone(), spec.attributes.clone())
                .with_local_id(local_id);
            Box::pin(async move { Ok(state) })
        }

        fn delete(
            &self,
            _id: &ResourceId,
            _local_id: &str,
            _timeout: Duration,
        ) -> BoxFuture<'_, ProviderResult<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn mock_provider_create_sets_local_id() {
        let provider = MockProvider;
        let spec = ResourceSpec::new("mock_appliance", "example");
        let state = provider
            .create(&spec, Duration::from_secs(60))
            .await
            .unwrap();
        assert!(state.exists);
        assert_eq!(state.local_id, Some("mock-host-1".to_string()));
    }

    #[tokio::test]
    async fn mock_provider_read_returns_not_found() {
        let provider = MockProvider;
        let id = ResourceId::new("mock_appliance", "example");
        let state = provider.read(&id, "mock-host-1").await.unwrap();
        assert!(!state.exists);
        assert_eq!(state.local_id, None);
    }

    #[test]
    fn provider_error_display_includes_resource() {
        let err = ProviderError::new("boom").for_resource(ResourceId::new("appliance", "web"));
        assert_eq!(err.to_string(), "[appliance.web] boom");
    }
}
