use crate::{
    Result,
    constants::{
        DEFAULT_DEVICE_TYPE, DEFAULT_FIRMWARE_VERSION, DEFAULT_HARDWARE_VERSION, DEFAULT_INSTANCE,
        DEFAULT_MANUFACTURER, DEFAULT_MODEL, DEFAULT_SERIAL, DEFAULT_SOFTWARE_VERSION,
    },
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// Address of a resource on the endpoint: `object/instance/resource`.
///
/// Paths are written without a leading slash (`312/0/1`) but a leading slash
/// is accepted when parsing. Every segment must be a non-empty decimal number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourcePath {
    object: String,
    instance: String,
    resource: String,
}

impl ResourcePath {
    /// Create a path from its three segments.
    ///
    /// # Errors
    /// Returns `Error::InvalidPath` if any segment is empty or not numeric.
    pub fn new(object: &str, instance: &str, resource: &str) -> Result<Self> {
        for segment in [object, instance, resource] {
            if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Error::InvalidPath(format!(
                    "{object}/{instance}/{resource}"
                )));
            }
        }

        Ok(Self {
            object: object.to_string(),
            instance: instance.to_string(),
            resource: resource.to_string(),
        })
    }

    /// Create a path on the default instance (`0`).
    ///
    /// # Errors
    /// Returns `Error::InvalidPath` if a name is empty or not numeric.
    pub fn with_default_instance(object: &str, resource: &str) -> Result<Self> {
        Self::new(object, DEFAULT_INSTANCE, resource)
    }

    #[must_use]
    pub fn object(&self) -> &str {
        &self.object
    }

    #[must_use]
    pub fn instance(&self) -> &str {
        &self.instance
    }

    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}/{}", self.object, self.instance, self.resource)
    }
}

impl std::str::FromStr for ResourcePath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_start_matches('/');
        let parts: Vec<&str> = trimmed.split('/').collect();
        match parts.as_slice() {
            [object, instance, resource] => Self::new(object, instance, resource),
            _ => Err(Error::InvalidPath(s.to_string())),
        }
    }
}

impl TryFrom<String> for ResourcePath {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ResourcePath> for String {
    fn from(path: ResourcePath) -> Self {
        path.to_string()
    }
}

/// Identity the endpoint reports through the device object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceIdentity {
    pub manufacturer: String,
    pub device_type: String,
    pub model: String,
    pub serial_number: String,
    pub firmware_version: String,
    pub hardware_version: String,
    pub software_version: String,
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            manufacturer: DEFAULT_MANUFACTURER.to_string(),
            device_type: DEFAULT_DEVICE_TYPE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            serial_number: DEFAULT_SERIAL.to_string(),
            firmware_version: DEFAULT_FIRMWARE_VERSION.to_string(),
            hardware_version: DEFAULT_HARDWARE_VERSION.to_string(),
            software_version: DEFAULT_SOFTWARE_VERSION.to_string(),
        }
    }
}

/// Device management passphrase.
///
/// # Security
/// Comparison is constant-time and the `Debug` output never contains the
/// secret.
#[derive(Clone, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Passphrase(String);

impl Passphrase {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compare against a candidate credential in constant time.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        self.0.as_bytes().ct_eq(candidate.as_bytes()).into()
    }
}

impl PartialEq for Passphrase {
    fn eq(&self, other: &Self) -> bool {
        self.matches(&other.0)
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Passphrase(***)")
    }
}

/// What the beacon state means for the parker, as shown on the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BeaconStatus {
    /// Beacon disabled by the operator: parking is free.
    Free = 0,
    /// Beacon advertising: parking must be paid for.
    Paid = 1,
    /// Beacon hardware switched off.
    Off = 2,
}

impl BeaconStatus {
    /// Text written to the LCD status line for this status.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::Free => "FREE PARKING",
            Self::Paid => "PAID-FOR PARKING",
            Self::Off => "BEACON-OFF",
        }
    }
}

impl From<bool> for BeaconStatus {
    fn from(enabled: bool) -> Self {
        if enabled { Self::Paid } else { Self::Free }
    }
}

impl TryFrom<u8> for BeaconStatus {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Free),
            1 => Ok(Self::Paid),
            2 => Ok(Self::Off),
            other => Err(Error::UnknownBeaconStatus(other)),
        }
    }
}

impl fmt::Display for BeaconStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.message())
    }
}
