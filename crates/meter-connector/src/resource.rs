//! Dynamic resources exposed by the endpoint.
//!
//! A resource is a single value addressed by `object/instance/resource` that
//! the device-management service can read (GET), write (PUT) or trigger
//! (EXECUTE). Implementations own their state behind interior mutability so
//! the endpoint can share them between the console connections and the
//! background tasks that update them.
//!
//! # Examples
//!
//! ```
//! use std::sync::Mutex;
//! use meter_connector::resource::{DynamicResource, Operations};
//! use meter_connector::Result;
//! use meter_core::ResourcePath;
//!
//! struct Counter {
//!     path: ResourcePath,
//!     value: Mutex<u32>,
//! }
//!
//! impl DynamicResource for Counter {
//!     fn path(&self) -> &ResourcePath { &self.path }
//!     fn resource_type(&self) -> &str { "Counter" }
//!     fn operations(&self) -> Operations { Operations::GET_PUT }
//!
//!     fn get(&self) -> Result<String> {
//!         Ok(self.value.lock().unwrap().to_string())
//!     }
//!
//!     fn put(&self, value: &str) -> Result<()> {
//!         *self.value.lock().unwrap() = value.parse().unwrap_or(0);
//!         Ok(())
//!     }
//! }
//! ```

use std::fmt;
use std::ops::BitOr;

use meter_core::ResourcePath;
use serde::{Deserialize, Serialize};

use crate::error::{ConnectorError, Result};

/// A single request operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Get,
    Put,
    Execute,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Put => write!(f, "PUT"),
            Self::Execute => write!(f, "EXECUTE"),
        }
    }
}

/// Set of operations a resource allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Operations(u8);

impl Operations {
    pub const NONE: Self = Self(0);
    pub const GET: Self = Self(1);
    pub const PUT: Self = Self(1 << 1);
    pub const EXECUTE: Self = Self(1 << 2);
    pub const GET_PUT: Self = Self(Self::GET.0 | Self::PUT.0);

    /// Check whether `operation` is part of this set.
    pub fn allows(&self, operation: Operation) -> bool {
        let bit = match operation {
            Operation::Get => Self::GET,
            Operation::Put => Self::PUT,
            Operation::Execute => Self::EXECUTE,
        };
        self.0 & bit.0 != 0
    }

    /// Allowed operations in GET, PUT, EXECUTE order.
    pub fn to_vec(&self) -> Vec<Operation> {
        [Operation::Get, Operation::Put, Operation::Execute]
            .into_iter()
            .filter(|op| self.allows(*op))
            .collect()
    }
}

impl BitOr for Operations {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Value exposed to the device-management service.
///
/// Only [`path`], [`resource_type`], [`operations`] and [`get`] are required.
/// [`put`] and [`execute`] default to rejecting the request, which matches a
/// resource whose [`operations`] do not include them.
///
/// [`path`]: DynamicResource::path
/// [`resource_type`]: DynamicResource::resource_type
/// [`operations`]: DynamicResource::operations
/// [`get`]: DynamicResource::get
/// [`put`]: DynamicResource::put
/// [`execute`]: DynamicResource::execute
pub trait DynamicResource: Send + Sync {
    /// Address of the resource.
    fn path(&self) -> &ResourcePath;

    /// Resource type reported in the registration (e.g. "C12832 LCD").
    fn resource_type(&self) -> &str;

    /// Operations the resource allows.
    fn operations(&self) -> Operations;

    /// Whether value changes should be pushed to observers by default.
    fn observable(&self) -> bool {
        false
    }

    /// Current value of the resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be read.
    fn get(&self) -> Result<String>;

    /// Write a new value.
    ///
    /// # Errors
    ///
    /// Returns `MethodNotAllowed` unless overridden.
    fn put(&self, _value: &str) -> Result<()> {
        Err(ConnectorError::MethodNotAllowed {
            path: self.path().clone(),
            operation: Operation::Put,
        })
    }

    /// Trigger the resource's action.
    ///
    /// # Errors
    ///
    /// Returns `MethodNotAllowed` unless overridden.
    fn execute(&self, _args: &str) -> Result<()> {
        Err(ConnectorError::MethodNotAllowed {
            path: self.path().clone(),
            operation: Operation::Execute,
        })
    }
}

/// Read-only resource with a fixed value.
#[derive(Debug, Clone)]
pub struct StaticResource {
    path: ResourcePath,
    resource_type: String,
    value: String,
}

impl StaticResource {
    pub fn new(path: ResourcePath, resource_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            path,
            resource_type: resource_type.into(),
            value: value.into(),
        }
    }
}

impl DynamicResource for StaticResource {
    fn path(&self) -> &ResourcePath {
        &self.path
    }

    fn resource_type(&self) -> &str {
        &self.resource_type
    }

    fn operations(&self) -> Operations {
        Operations::GET
    }

    fn get(&self) -> Result<String> {
        Ok(self.value.clone())
    }
}

/// Snapshot describing a registered resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub path: ResourcePath,
    pub resource_type: String,
    pub operations: Vec<Operation>,
    pub observable: bool,
}
