//! The endpoint: resource table, request dispatch, observation and the
//! registration lifecycle.
//!
//! ```
//! use std::sync::Arc;
//! use meter_connector::{Endpoint, OptionsBuilder, StaticResource};
//!
//! let options = OptionsBuilder::new()
//!     .endpoint_nodename("meter-01")
//!     .domain("parking")
//!     .add_resource(Arc::new(StaticResource::new(
//!         "3/0/0".parse().unwrap(),
//!         "Manufacturer",
//!         "NXP",
//!     )))
//!     .build()
//!     .unwrap();
//!
//! let endpoint = Endpoint::new(options).unwrap();
//! assert_eq!(endpoint.get(&"3/0/0".parse().unwrap()).unwrap(), "NXP");
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use meter_core::ResourcePath;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::connection::{ConnectionStatus, RegistrationState};
use crate::device_manager::DeviceManager;
use crate::error::{ConnectorError, Result};
use crate::options::{Options, RegisteredResource};
use crate::resource::{Operation, ResourceDescriptor};
use crate::server::{ConsoleServer, ConsoleServerConfig};

/// Capacity of the notification channel. Slow observers lag beyond this.
const NOTIFICATION_CAPACITY: usize = 64;

/// Value change of an observed resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub path: ResourcePath,
    pub value: String,
}

/// Registered device endpoint.
pub struct Endpoint {
    options: Options,
    resources: BTreeMap<ResourcePath, RegisteredResource>,
    device_manager: Option<Arc<DeviceManager>>,
    connection_status: Option<Arc<dyn ConnectionStatus>>,
    notifications: broadcast::Sender<Notification>,
    last_values: Mutex<HashMap<ResourcePath, String>>,
    state: Mutex<RegistrationState>,
}

impl Endpoint {
    /// Create an endpoint serving the resources in `options`.
    pub fn new(options: Options) -> Result<Self> {
        let mut resources = BTreeMap::new();
        for registered in options.resources() {
            let path = registered.resource.path().clone();
            if resources.insert(path.clone(), registered.clone()).is_some() {
                return Err(ConnectorError::DuplicateResource(path));
            }
        }

        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        Ok(Self {
            options,
            resources,
            device_manager: None,
            connection_status: None,
            notifications,
            last_values: Mutex::new(HashMap::new()),
            state: Mutex::new(RegistrationState::Unregistered),
        })
    }

    /// Attach a device manager and serve its device and firmware objects.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateResource` if one of its paths is already taken.
    pub fn with_device_manager(mut self, manager: Arc<DeviceManager>) -> Result<Self> {
        for resource in manager.resources()? {
            let path = resource.path().clone();
            if self.resources.contains_key(&path) {
                return Err(ConnectorError::DuplicateResource(path));
            }
            let observable = resource.observable();
            self.resources.insert(
                path,
                RegisteredResource {
                    resource,
                    observable,
                },
            );
        }
        self.device_manager = Some(manager);
        Ok(self)
    }

    pub fn with_connection_status(mut self, handler: Arc<dyn ConnectionStatus>) -> Self {
        self.connection_status = Some(handler);
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn device_manager(&self) -> Option<&Arc<DeviceManager>> {
        self.device_manager.as_ref()
    }

    pub fn state(&self) -> RegistrationState {
        *lock(&self.state)
    }

    fn lookup(&self, path: &ResourcePath, operation: Operation) -> Result<&RegisteredResource> {
        let registered = self
            .resources
            .get(path)
            .ok_or_else(|| ConnectorError::NotFound(path.clone()))?;

        if !registered.resource.operations().allows(operation) {
            return Err(ConnectorError::MethodNotAllowed {
                path: path.clone(),
                operation,
            });
        }
        Ok(registered)
    }

    /// Read a resource value.
    pub fn get(&self, path: &ResourcePath) -> Result<String> {
        let registered = self.lookup(path, Operation::Get)?;
        let value = registered.resource.get()?;
        debug!(%path, %value, "GET");
        Ok(value)
    }

    /// Write a resource value. Observers of the resource are notified with
    /// its value after the write.
    pub fn put(&self, path: &ResourcePath, value: &str) -> Result<()> {
        let registered = self.lookup(path, Operation::Put)?;
        debug!(%path, %value, "PUT");
        registered.resource.put(value)?;

        if registered.observable {
            match registered.resource.get() {
                Ok(current) => {
                    self.publish(path, current, true);
                }
                Err(e) => warn!(%path, error = %e, "Failed to read value after PUT"),
            }
        }
        Ok(())
    }

    /// Trigger a resource action.
    pub fn execute(&self, path: &ResourcePath, args: &str) -> Result<()> {
        let registered = self.lookup(path, Operation::Execute)?;
        debug!(%path, "EXECUTE");
        registered.resource.execute(args)
    }

    /// Receive value changes of observed resources.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Poll observed resources and notify those whose value changed since
    /// the last notification. Returns the number of notifications sent.
    pub fn notify_changed(&self) -> usize {
        let mut sent = 0;
        for (path, registered) in self.resources.iter().filter(|(_, r)| r.observable) {
            let current = match registered.resource.get() {
                Ok(value) => value,
                Err(e) => {
                    warn!(%path, error = %e, "Failed to poll observed resource");
                    continue;
                }
            };

            if self.publish(path, current, false) {
                sent += 1;
            }
        }
        sent
    }

    /// Record the value and broadcast it. Unless `force` is set, an unchanged
    /// value is not sent and `false` is returned.
    fn publish(&self, path: &ResourcePath, value: String, force: bool) -> bool {
        {
            let mut last = lock(&self.last_values);
            if !force && last.get(path) == Some(&value) {
                return false;
            }
            last.insert(path.clone(), value.clone());
        }

        let receivers = self
            .notifications
            .send(Notification {
                path: path.clone(),
                value,
            })
            .unwrap_or(0);
        debug!(%path, receivers, "Notified observers");
        true
    }

    /// Descriptors of every served resource, ordered by path.
    pub fn resources(&self) -> Vec<ResourceDescriptor> {
        self.resources
            .values()
            .map(|registered| ResourceDescriptor {
                path: registered.resource.path().clone(),
                resource_type: registered.resource.resource_type().to_string(),
                operations: registered.resource.operations().to_vec(),
                observable: registered.observable,
            })
            .collect()
    }

    /// Mark the endpoint registered, seed the observed values and run the
    /// device manager's initialize handler.
    pub fn register(&self) {
        let previous = std::mem::replace(&mut *lock(&self.state), RegistrationState::Registered);
        let node = self.options.node_name();

        {
            let mut last = lock(&self.last_values);
            for (path, registered) in self.resources.iter().filter(|(_, r)| r.observable) {
                if let Ok(value) = registered.resource.get() {
                    last.insert(path.clone(), value);
                }
            }
        }

        if previous == RegistrationState::Registered {
            info!(node, "Endpoint re-registered");
            if let Some(handler) = &self.connection_status {
                handler.re_registered(node);
            }
            return;
        }

        info!(
            node,
            domain = self.options.domain(),
            endpoint_type = self.options.endpoint_type(),
            resources = self.resources.len(),
            "Endpoint registered"
        );
        if let Some(manager) = &self.device_manager {
            manager.initialize();
        }
        if let Some(handler) = &self.connection_status {
            handler.registered(node);
        }
    }

    /// Mark the endpoint deregistered.
    pub fn deregister(&self) {
        let previous =
            std::mem::replace(&mut *lock(&self.state), RegistrationState::Deregistered);
        if previous != RegistrationState::Registered {
            return;
        }

        let node = self.options.node_name();
        info!(node, "Endpoint deregistered");
        if let Some(handler) = &self.connection_status {
            handler.deregistered(node);
        }
    }

    /// Register, serve the console until `shutdown` fires, then deregister.
    ///
    /// # Errors
    ///
    /// Returns `BindFailed` if the console cannot listen; the connection
    /// status handler is told the registration failed.
    pub async fn start(
        self: Arc<Self>,
        config: ConsoleServerConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let server = match ConsoleServer::bind(config, Arc::clone(&self)).await {
            Ok(server) => server,
            Err(e) => {
                if let Some(handler) = &self.connection_status {
                    handler.registration_failed(self.options.node_name(), &e.to_string());
                }
                return Err(e);
            }
        };

        self.register();
        let result = server.run(shutdown).await;
        self.deregister();
        result
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("node_name", &self.options.node_name())
            .field("resources", &self.resources.len())
            .field("device_manager", &self.device_manager.is_some())
            .field("state", &self.state())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
