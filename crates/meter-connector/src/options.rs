//! Endpoint configuration built before the endpoint starts.
//!
//! ```
//! use std::sync::Arc;
//! use meter_connector::options::OptionsBuilder;
//! use meter_connector::resource::StaticResource;
//!
//! let model = StaticResource::new("3/0/1".parse().unwrap(), "Model", "K64F");
//!
//! let options = OptionsBuilder::new()
//!     .endpoint_nodename("meter-01")
//!     .domain("parking")
//!     .endpoint_type("parking-meter")
//!     .add_resource(Arc::new(model))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(options.node_name(), "meter-01");
//! assert_eq!(options.resources().len(), 1);
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use meter_core::constants::{DEFAULT_DEVICE_TYPE, DEFAULT_LIFETIME_SECS};
use tracing::debug;

use crate::error::{ConnectorError, Result};
use crate::resource::DynamicResource;

/// A resource together with its observation setting.
#[derive(Clone)]
pub struct RegisteredResource {
    pub resource: Arc<dyn DynamicResource>,
    pub observable: bool,
}

impl fmt::Debug for RegisteredResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredResource")
            .field("path", self.resource.path())
            .field("resource_type", &self.resource.resource_type())
            .field("observable", &self.observable)
            .finish()
    }
}

/// Provisioning credentials. Kept as opaque bytes; this crate does no TLS.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub server_certificate: Vec<u8>,
    pub client_certificate: Vec<u8>,
    pub client_key: Vec<u8>,
}

impl Credentials {
    pub fn is_provisioned(&self) -> bool {
        !self.server_certificate.is_empty()
            && !self.client_certificate.is_empty()
            && !self.client_key.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("server_certificate", &self.server_certificate.len())
            .field("client_certificate", &self.client_certificate.len())
            .field("client_key", &"***")
            .finish()
    }
}

/// Finalized endpoint options.
#[derive(Debug, Clone)]
pub struct Options {
    node_name: String,
    domain: String,
    endpoint_type: String,
    lifetime: Duration,
    credentials: Credentials,
    resources: Vec<RegisteredResource>,
}

impl Options {
    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn endpoint_type(&self) -> &str {
        &self.endpoint_type
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn resources(&self) -> &[RegisteredResource] {
        &self.resources
    }
}

/// Fluent builder for [`Options`].
#[derive(Debug)]
pub struct OptionsBuilder {
    node_name: String,
    domain: String,
    endpoint_type: String,
    lifetime: Duration,
    credentials: Credentials,
    resources: Vec<RegisteredResource>,
}

impl Default for OptionsBuilder {
    fn default() -> Self {
        Self {
            node_name: String::new(),
            domain: String::new(),
            endpoint_type: DEFAULT_DEVICE_TYPE.to_string(),
            lifetime: Duration::from_secs(DEFAULT_LIFETIME_SECS),
            credentials: Credentials::default(),
            resources: Vec::new(),
        }
    }
}

impl OptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn endpoint_nodename(mut self, name: impl Into<String>) -> Self {
        self.node_name = name.into();
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn endpoint_type(mut self, endpoint_type: impl Into<String>) -> Self {
        self.endpoint_type = endpoint_type.into();
        self
    }

    pub fn lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn server_certificate(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.credentials.server_certificate = pem.into();
        self
    }

    pub fn client_certificate(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.credentials.client_certificate = pem.into();
        self
    }

    pub fn client_key(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.credentials.client_key = pem.into();
        self
    }

    /// Add a resource using its own observation setting.
    pub fn add_resource(self, resource: Arc<dyn DynamicResource>) -> Self {
        let observable = resource.observable();
        self.add_resource_with_observation(resource, observable)
    }

    /// Add a resource, overriding whether it is observed.
    pub fn add_resource_with_observation(
        mut self,
        resource: Arc<dyn DynamicResource>,
        observable: bool,
    ) -> Self {
        debug!(
            path = %resource.path(),
            resource_type = resource.resource_type(),
            observable,
            "Adding resource"
        );
        self.resources.push(RegisteredResource {
            resource,
            observable,
        });
        self
    }

    /// Add several resources using their own observation settings.
    pub fn add_resources(
        self,
        resources: impl IntoIterator<Item = Arc<dyn DynamicResource>>,
    ) -> Self {
        resources
            .into_iter()
            .fold(self, |builder, resource| builder.add_resource(resource))
    }

    /// Finalize the options.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOptions` if the node name or domain is empty, and
    /// `DuplicateResource` if two resources share a path.
    pub fn build(self) -> Result<Options> {
        if self.node_name.trim().is_empty() {
            return Err(ConnectorError::InvalidOptions(
                "endpoint node name is required".into(),
            ));
        }
        if self.domain.trim().is_empty() {
            return Err(ConnectorError::InvalidOptions("domain is required".into()));
        }

        let mut seen = HashSet::new();
        for registered in &self.resources {
            if !seen.insert(registered.resource.path().clone()) {
                return Err(ConnectorError::DuplicateResource(
                    registered.resource.path().clone(),
                ));
            }
        }

        Ok(Options {
            node_name: self.node_name,
            domain: self.domain,
            endpoint_type: self.endpoint_type,
            lifetime: self.lifetime,
            credentials: self.credentials,
            resources: self.resources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::StaticResource;

    fn resource(path: &str) -> Arc<dyn DynamicResource> {
        Arc::new(StaticResource::new(path.parse().unwrap(), "Test", "value"))
    }

    fn builder() -> OptionsBuilder {
        OptionsBuilder::new()
            .endpoint_nodename("meter-01")
            .domain("parking")
    }

    #[test]
    fn test_build_defaults() {
        let options = builder().build().unwrap();
        assert_eq!(options.endpoint_type(), "parking-meter");
        assert_eq!(options.lifetime(), Duration::from_secs(3600));
        assert!(!options.credentials().is_provisioned());
        assert!(options.resources().is_empty());
    }

    #[test]
    fn test_build_with_credentials() {
        let options = builder()
            .server_certificate(b"server".to_vec())
            .client_certificate(b"cert".to_vec())
            .client_key(b"key".to_vec())
            .build()
            .unwrap();

        assert!(options.credentials().is_provisioned());
        assert!(format!("{:?}", options.credentials()).contains("***"));
    }

    #[test]
    fn test_observation_override() {
        let options = builder()
            .add_resource(resource("312/0/1"))
            .add_resource_with_observation(resource("100/0/1"), true)
            .build()
            .unwrap();

        assert!(!options.resources()[0].observable);
        assert!(options.resources()[1].observable);
    }

    #[test]
    fn test_missing_node_name() {
        let result = OptionsBuilder::new().domain("parking").build();
        assert!(matches!(result, Err(ConnectorError::InvalidOptions(_))));
    }

    #[test]
    fn test_missing_domain() {
        let result = OptionsBuilder::new().endpoint_nodename("meter").build();
        assert!(matches!(result, Err(ConnectorError::InvalidOptions(_))));
    }

    #[test]
    fn test_duplicate_resource() {
        let result = builder()
            .add_resources([resource("200/0/1"), resource("200/0/1")])
            .build();
        assert!(matches!(result, Err(ConnectorError::DuplicateResource(_))));
    }
}
