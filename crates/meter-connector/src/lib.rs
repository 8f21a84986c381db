//! Device-management endpoint for the parking meter.
//!
//! This crate hosts the resources the meter exposes to a device-management
//! service and everything needed to serve them on a host build:
//!
//! - [`resource`]: the [`DynamicResource`] trait and its operation flags
//! - [`options`]: [`OptionsBuilder`] for node name, domain, credentials and
//!   the resource list
//! - [`endpoint`]: request dispatch, observation and registration
//! - [`device_manager`]: passphrase authentication, reboot/reset/FOTA
//!   responders and the standard device and firmware objects
//! - [`connection`]: registration lifecycle callbacks
//! - [`server`]: the JSON-lines TCP console
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐     ┌──────────┐     ┌─────────────────────────┐
//! │ ConsoleServer │────▶│ Endpoint │────▶│ DynamicResource (LCD,   │
//! │ (JSON lines)  │◀────│          │     │ HourGlass, Beacon, 3/0, │
//! └───────────────┘     └────┬─────┘     │ 5/0 ...)                │
//!        ▲                   │           └─────────────────────────┘
//!        └── notifications ──┘
//! ```

pub mod connection;
pub mod device_manager;
pub mod endpoint;
pub mod error;
pub mod options;
pub mod resource;
pub mod server;

pub use connection::{ConnectionStatus, RegistrationState};
pub use device_manager::{
    Authenticator, DeviceManagementResponder, DeviceManager, FirmwareState, FirmwareStatus,
    PassphraseAuthenticator, UpdateResult,
};
pub use endpoint::{Endpoint, Notification};
pub use error::{ConnectorError, ResponseCode, Result};
pub use options::{Credentials, Options, OptionsBuilder, RegisteredResource};
pub use resource::{DynamicResource, Operation, Operations, ResourceDescriptor, StaticResource};
pub use server::{ConsoleServer, ConsoleServerConfig, Request, RequestOp, Response};
