//! Registration lifecycle callbacks.

use serde::{Deserialize, Serialize};

/// Registration state of the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationState {
    Unregistered,
    Registered,
    Deregistered,
}

/// Receives registration lifecycle events from the endpoint.
///
/// All methods default to doing nothing, so implementors only override the
/// transitions they care about.
pub trait ConnectionStatus: Send + Sync {
    /// The endpoint registered with the service.
    fn registered(&self, _node_name: &str) {}

    /// The endpoint refreshed an existing registration.
    fn re_registered(&self, _node_name: &str) {}

    /// The endpoint removed its registration.
    fn deregistered(&self, _node_name: &str) {}

    /// Registration could not be completed.
    fn registration_failed(&self, _node_name: &str, _reason: &str) {}
}
