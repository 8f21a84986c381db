//! Errors raised while dispatching requests to endpoint resources.
//!
//! Every error maps onto a CoAP-style [`ResponseCode`] so the console can
//! answer with the same status a device-management service would see.

use std::net::SocketAddr;

use meter_core::ResourcePath;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resource::Operation;

/// Result type alias for connector operations.
pub type Result<T> = std::result::Result<T, ConnectorError>;

#[derive(Debug, Error)]
pub enum ConnectorError {
    /// No resource is registered under the path
    #[error("Resource {0} not found")]
    NotFound(ResourcePath),

    /// The resource does not support the requested operation
    #[error("{operation} not allowed on {path}")]
    MethodNotAllowed {
        path: ResourcePath,
        operation: Operation,
    },

    /// Request payload could not be interpreted
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Device management credential rejected
    #[error("Unauthorized")]
    Unauthorized,

    /// No responder handler installed for the action
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Action not valid in the current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Resource failed while serving the request (e.g. peripheral error)
    #[error("Resource failure: {0}")]
    Resource(String),

    /// Endpoint options rejected by the builder
    #[error("Invalid endpoint options: {0}")]
    InvalidOptions(String),

    /// Two resources registered under the same path
    #[error("Duplicate resource {0}")]
    DuplicateResource(ResourcePath),

    /// Failed to bind the console listener
    #[error("Failed to bind to {0}")]
    BindFailed(SocketAddr),

    /// Error from shared core types
    #[error(transparent)]
    Core(#[from] meter_core::Error),

    /// Low-level I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Codec error during line framing
    #[error("Codec error: {0}")]
    Codec(String),
}

impl ConnectorError {
    /// Create a resource failure error.
    pub fn resource(message: impl Into<String>) -> Self {
        Self::Resource(message.into())
    }

    /// Create a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Response code reported for this error.
    pub fn code(&self) -> ResponseCode {
        match self {
            Self::NotFound(_) => ResponseCode::NotFound,
            Self::MethodNotAllowed { .. } => ResponseCode::MethodNotAllowed,
            Self::BadRequest(_) | Self::InvalidState(_) | Self::Core(_) => {
                ResponseCode::BadRequest
            }
            Self::Unauthorized => ResponseCode::Unauthorized,
            Self::NotImplemented(_) => ResponseCode::NotImplemented,
            _ => ResponseCode::InternalServerError,
        }
    }
}

/// CoAP-style response codes used by the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseCode {
    #[serde(rename = "2.04")]
    Changed,
    #[serde(rename = "2.05")]
    Content,
    #[serde(rename = "4.00")]
    BadRequest,
    #[serde(rename = "4.01")]
    Unauthorized,
    #[serde(rename = "4.04")]
    NotFound,
    #[serde(rename = "4.05")]
    MethodNotAllowed,
    #[serde(rename = "5.00")]
    InternalServerError,
    #[serde(rename = "5.01")]
    NotImplemented,
    #[serde(rename = "5.03")]
    ServiceUnavailable,
    /// Unsolicited value change of an observed resource
    #[serde(rename = "notify")]
    Notify,
}

impl ResponseCode {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Changed | Self::Content | Self::Notify)
    }
}
