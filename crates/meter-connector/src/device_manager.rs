//! Device management: authentication, responder handlers and the standard
//! device (`3/0`) and firmware (`5/0`) objects.
//!
//! The [`DeviceManager`] exposes its objects as ordinary [`DynamicResource`]s
//! so the endpoint dispatches them like any other resource. Actions that
//! change the device (reboot, factory reset, firmware update) are executed
//! with the passphrase as argument and are rejected unless the configured
//! [`Authenticator`] accepts it.
//!
//! # Firmware update flow
//!
//! ```text
//! Idle(0) ──PUT 5/0/0 image──▶ Downloaded(2) ──EXECUTE 5/0/2──▶ Updating(3)
//!   ▲                                                            │
//!   └──────────────── result 1 (success) or 8 (failed) ◀─────────┘
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use meter_core::constants::{DEVICE_OBJECT, FIRMWARE_OBJECT};
use meter_core::{DeviceIdentity, Passphrase, ResourcePath};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ConnectorError, Result};
use crate::resource::{DynamicResource, Operation, Operations};

/// Decides whether a device-management credential is accepted.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, credential: &str) -> bool;
}

/// Accepts exactly one passphrase, compared in constant time.
#[derive(Debug, Clone)]
pub struct PassphraseAuthenticator {
    passphrase: Passphrase,
}

impl PassphraseAuthenticator {
    pub fn new(passphrase: Passphrase) -> Self {
        Self { passphrase }
    }
}

impl Authenticator for PassphraseAuthenticator {
    fn authenticate(&self, credential: &str) -> bool {
        !self.passphrase.is_empty() && self.passphrase.matches(credential)
    }
}

type InitializeHandler = Box<dyn Fn(&DeviceIdentity) + Send + Sync>;
type ActionHandler = Box<dyn Fn() -> Result<()> + Send + Sync>;
type ManifestHandler = Box<dyn Fn(&str) -> Result<()> + Send + Sync>;
type ImageHandler = Box<dyn Fn(&[u8]) -> Result<()> + Send + Sync>;

/// Authenticator plus the application callbacks for device-management
/// actions.
///
/// Every handler is optional. Requests for an action without a handler fail
/// with [`ConnectorError::NotImplemented`].
pub struct DeviceManagementResponder {
    authenticator: Box<dyn Authenticator>,
    initialize: Option<InitializeHandler>,
    reboot: Option<ActionHandler>,
    reset: Option<ActionHandler>,
    fota_manifest: Option<ManifestHandler>,
    fota_image: Option<ImageHandler>,
    fota_invocation: Option<ActionHandler>,
}

impl DeviceManagementResponder {
    pub fn new(authenticator: impl Authenticator + 'static) -> Self {
        Self {
            authenticator: Box::new(authenticator),
            initialize: None,
            reboot: None,
            reset: None,
            fota_manifest: None,
            fota_image: None,
            fota_invocation: None,
        }
    }

    pub fn set_initialize_handler(
        &mut self,
        handler: impl Fn(&DeviceIdentity) + Send + Sync + 'static,
    ) {
        self.initialize = Some(Box::new(handler));
    }

    pub fn set_reboot_responder_handler(
        &mut self,
        handler: impl Fn() -> Result<()> + Send + Sync + 'static,
    ) {
        self.reboot = Some(Box::new(handler));
    }

    pub fn set_reset_responder_handler(
        &mut self,
        handler: impl Fn() -> Result<()> + Send + Sync + 'static,
    ) {
        self.reset = Some(Box::new(handler));
    }

    pub fn set_fota_manifest_handler(
        &mut self,
        handler: impl Fn(&str) -> Result<()> + Send + Sync + 'static,
    ) {
        self.fota_manifest = Some(Box::new(handler));
    }

    pub fn set_fota_image_handler(
        &mut self,
        handler: impl Fn(&[u8]) -> Result<()> + Send + Sync + 'static,
    ) {
        self.fota_image = Some(Box::new(handler));
    }

    pub fn set_fota_invocation_handler(
        &mut self,
        handler: impl Fn() -> Result<()> + Send + Sync + 'static,
    ) {
        self.fota_invocation = Some(Box::new(handler));
    }

    /// Check a credential.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` if the authenticator rejects it.
    pub fn authenticate(&self, credential: &str) -> Result<()> {
        if self.authenticator.authenticate(credential) {
            Ok(())
        } else {
            warn!("Device management credential rejected");
            Err(ConnectorError::Unauthorized)
        }
    }

    fn initialize(&self, identity: &DeviceIdentity) {
        if let Some(handler) = &self.initialize {
            handler(identity);
        }
    }

    fn run_action(&self, name: &str, handler: Option<&ActionHandler>, credential: &str) -> Result<()> {
        self.authenticate(credential)?;
        let handler = handler.ok_or_else(|| ConnectorError::NotImplemented(name.to_string()))?;
        info!(action = name, "Running device management action");
        handler()
    }
}

impl fmt::Debug for DeviceManagementResponder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceManagementResponder")
            .field("initialize", &self.initialize.is_some())
            .field("reboot", &self.reboot.is_some())
            .field("reset", &self.reset.is_some())
            .field("fota_manifest", &self.fota_manifest.is_some())
            .field("fota_image", &self.fota_image.is_some())
            .field("fota_invocation", &self.fota_invocation.is_some())
            .finish()
    }
}

/// Firmware object state (`5/0/3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FirmwareState {
    Idle = 0,
    Downloaded = 2,
    Updating = 3,
}

/// Firmware update result (`5/0/5`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateResult {
    Initial = 0,
    Success = 1,
    Failed = 8,
}

/// Snapshot of the firmware object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FirmwareStatus {
    pub state: FirmwareState,
    pub result: UpdateResult,
    pub package_uri: Option<String>,
    pub image_size: usize,
    pub last_update: Option<DateTime<Utc>>,
}

impl Default for FirmwareStatus {
    fn default() -> Self {
        Self {
            state: FirmwareState::Idle,
            result: UpdateResult::Initial,
            package_uri: None,
            image_size: 0,
            last_update: None,
        }
    }
}

/// Device identity, responder and firmware update state.
#[derive(Debug)]
pub struct DeviceManager {
    identity: DeviceIdentity,
    responder: DeviceManagementResponder,
    firmware: Mutex<FirmwareStatus>,
}

impl DeviceManager {
    pub fn new(identity: DeviceIdentity, responder: DeviceManagementResponder) -> Self {
        Self {
            identity,
            responder,
            firmware: Mutex::new(FirmwareStatus::default()),
        }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// Run the initialize handler. Called when the endpoint registers.
    pub fn initialize(&self) {
        debug!(serial = %self.identity.serial_number, "Initializing device manager");
        self.responder.initialize(&self.identity);
    }

    /// Authenticated reboot request.
    pub fn reboot(&self, credential: &str) -> Result<()> {
        self.responder
            .run_action("reboot", self.responder.reboot.as_ref(), credential)
    }

    /// Authenticated factory reset request.
    pub fn reset(&self, credential: &str) -> Result<()> {
        self.responder
            .run_action("reset", self.responder.reset.as_ref(), credential)
    }

    /// Accept a firmware manifest (package URI).
    pub fn set_manifest(&self, manifest: &str) -> Result<()> {
        let handler = self
            .responder
            .fota_manifest
            .as_ref()
            .ok_or_else(|| ConnectorError::NotImplemented("fota manifest".into()))?;
        handler(manifest)?;

        let mut firmware = self.firmware();
        firmware.package_uri = Some(manifest.to_string());
        info!(manifest, "Firmware manifest accepted");
        Ok(())
    }

    /// Accept a firmware image. An empty image clears a pending update.
    pub fn set_image(&self, image: &[u8]) -> Result<()> {
        if image.is_empty() {
            *self.firmware() = FirmwareStatus::default();
            info!("Pending firmware image cleared");
            return Ok(());
        }

        let handler = self
            .responder
            .fota_image
            .as_ref()
            .ok_or_else(|| ConnectorError::NotImplemented("fota image".into()))?;
        handler(image)?;

        let mut firmware = self.firmware();
        firmware.state = FirmwareState::Downloaded;
        firmware.result = UpdateResult::Initial;
        firmware.image_size = image.len();
        info!(size = image.len(), "Firmware image downloaded");
        Ok(())
    }

    /// Authenticated firmware update of a downloaded image.
    ///
    /// # Errors
    ///
    /// `Unauthorized` for a bad credential, `NotImplemented` without an
    /// invocation handler, `InvalidState` when no image is downloaded, or the
    /// handler's own error (the update result is then `Failed`).
    pub fn invoke_fota(&self, credential: &str) -> Result<()> {
        self.responder.authenticate(credential)?;
        let handler = self
            .responder
            .fota_invocation
            .as_ref()
            .ok_or_else(|| ConnectorError::NotImplemented("fota invocation".into()))?;

        {
            let mut firmware = self.firmware();
            if firmware.state != FirmwareState::Downloaded {
                return Err(ConnectorError::InvalidState(
                    "no firmware image downloaded".into(),
                ));
            }
            firmware.state = FirmwareState::Updating;
        }

        info!("Firmware update started");
        let outcome = handler();

        let mut firmware = self.firmware();
        firmware.state = FirmwareState::Idle;
        firmware.last_update = Some(Utc::now());
        firmware.result = match &outcome {
            Ok(()) => {
                info!("Firmware update succeeded");
                UpdateResult::Success
            }
            Err(e) => {
                warn!(error = %e, "Firmware update failed");
                UpdateResult::Failed
            }
        };
        outcome
    }

    pub fn firmware_status(&self) -> FirmwareStatus {
        self.firmware().clone()
    }

    fn firmware(&self) -> std::sync::MutexGuard<'_, FirmwareStatus> {
        self.firmware.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Device (`3/0/*`) and firmware (`5/0/*`) resources backed by this
    /// manager.
    pub fn resources(self: &Arc<Self>) -> Result<Vec<Arc<dyn DynamicResource>>> {
        use ManagedKind::*;

        let entries = [
            (DEVICE_OBJECT, "0", "Manufacturer", Manufacturer),
            (DEVICE_OBJECT, "1", "Model Number", Model),
            (DEVICE_OBJECT, "2", "Serial Number", SerialNumber),
            (DEVICE_OBJECT, "3", "Firmware Version", FirmwareVersion),
            (DEVICE_OBJECT, "4", "Reboot", Reboot),
            (DEVICE_OBJECT, "5", "Factory Reset", FactoryReset),
            (DEVICE_OBJECT, "17", "Device Type", DeviceType),
            (DEVICE_OBJECT, "18", "Hardware Version", HardwareVersion),
            (DEVICE_OBJECT, "19", "Software Version", SoftwareVersion),
            (FIRMWARE_OBJECT, "0", "Package", Package),
            (FIRMWARE_OBJECT, "1", "Package URI", PackageUri),
            (FIRMWARE_OBJECT, "2", "Update", Update),
            (FIRMWARE_OBJECT, "3", "State", UpdateState),
            (FIRMWARE_OBJECT, "5", "Update Result", UpdateOutcome),
        ];

        entries
            .into_iter()
            .map(|(object, resource, resource_type, kind)| {
                let path = ResourcePath::with_default_instance(object, resource)?;
                Ok(Arc::new(ManagedResource {
                    path,
                    resource_type,
                    kind,
                    manager: Arc::clone(self),
                }) as Arc<dyn DynamicResource>)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ManagedKind {
    Manufacturer,
    Model,
    SerialNumber,
    FirmwareVersion,
    Reboot,
    FactoryReset,
    DeviceType,
    HardwareVersion,
    SoftwareVersion,
    Package,
    PackageUri,
    Update,
    UpdateState,
    UpdateOutcome,
}

struct ManagedResource {
    path: ResourcePath,
    resource_type: &'static str,
    kind: ManagedKind,
    manager: Arc<DeviceManager>,
}

impl DynamicResource for ManagedResource {
    fn path(&self) -> &ResourcePath {
        &self.path
    }

    fn resource_type(&self) -> &str {
        self.resource_type
    }

    fn operations(&self) -> Operations {
        match self.kind {
            ManagedKind::Reboot | ManagedKind::FactoryReset | ManagedKind::Update => {
                Operations::EXECUTE
            }
            ManagedKind::Package => Operations::PUT,
            ManagedKind::PackageUri => Operations::GET_PUT,
            _ => Operations::GET,
        }
    }

    fn get(&self) -> Result<String> {
        let identity = self.manager.identity();
        let value = match self.kind {
            ManagedKind::Manufacturer => identity.manufacturer.clone(),
            ManagedKind::Model => identity.model.clone(),
            ManagedKind::SerialNumber => identity.serial_number.clone(),
            ManagedKind::FirmwareVersion => identity.firmware_version.clone(),
            ManagedKind::DeviceType => identity.device_type.clone(),
            ManagedKind::HardwareVersion => identity.hardware_version.clone(),
            ManagedKind::SoftwareVersion => identity.software_version.clone(),
            ManagedKind::PackageUri => self
                .manager
                .firmware_status()
                .package_uri
                .unwrap_or_default(),
            ManagedKind::UpdateState => (self.manager.firmware_status().state as u8).to_string(),
            ManagedKind::UpdateOutcome => (self.manager.firmware_status().result as u8).to_string(),
            ManagedKind::Reboot
            | ManagedKind::FactoryReset
            | ManagedKind::Update
            | ManagedKind::Package => {
                return Err(ConnectorError::MethodNotAllowed {
                    path: self.path.clone(),
                    operation: Operation::Get,
                });
            }
        };
        Ok(value)
    }

    fn put(&self, value: &str) -> Result<()> {
        match self.kind {
            ManagedKind::Package => self.manager.set_image(value.as_bytes()),
            ManagedKind::PackageUri => self.manager.set_manifest(value.trim()),
            _ => Err(ConnectorError::MethodNotAllowed {
                path: self.path.clone(),
                operation: Operation::Put,
            }),
        }
    }

    fn execute(&self, args: &str) -> Result<()> {
        let credential = args.trim();
        match self.kind {
            ManagedKind::Reboot => self.manager.reboot(credential),
            ManagedKind::FactoryReset => self.manager.reset(credential),
            ManagedKind::Update => self.manager.invoke_fota(credential),
            _ => Err(ConnectorError::MethodNotAllowed {
                path: self.path.clone(),
                operation: Operation::Execute,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PASS: &str = "arm1234";

    fn responder() -> DeviceManagementResponder {
        DeviceManagementResponder::new(PassphraseAuthenticator::new(Passphrase::new(PASS)))
    }

    fn full_manager(fota_ok: bool) -> (Arc<DeviceManager>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut responder = responder();

        let c = Arc::clone(&calls);
        responder.set_reboot_responder_handler(move || {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        responder.set_reset_responder_handler(|| Ok(()));
        responder.set_fota_manifest_handler(|_| Ok(()));
        responder.set_fota_image_handler(|_| Ok(()));
        responder.set_fota_invocation_handler(move || {
            if fota_ok {
                Ok(())
            } else {
                Err(ConnectorError::resource("flash write failed"))
            }
        });

        let manager = Arc::new(DeviceManager::new(DeviceIdentity::default(), responder));
        (manager, calls)
    }

    #[test]
    fn test_passphrase_authenticator() {
        let auth = PassphraseAuthenticator::new(Passphrase::new(PASS));
        assert!(auth.authenticate(PASS));
        assert!(!auth.authenticate("arm12345"));
        assert!(!auth.authenticate(""));
    }

    #[test]
    fn test_empty_passphrase_rejects_everything() {
        let auth = PassphraseAuthenticator::new(Passphrase::new(""));
        assert!(!auth.authenticate(""));
    }

    #[test]
    fn test_reboot_requires_credential() {
        let (manager, calls) = full_manager(true);

        assert!(matches!(manager.reboot("wrong"), Err(ConnectorError::Unauthorized)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        manager.reboot(PASS).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_handler_not_implemented() {
        let manager = DeviceManager::new(DeviceIdentity::default(), responder());
        assert!(matches!(manager.reset(PASS), Err(ConnectorError::NotImplemented(_))));
        assert!(matches!(
            manager.set_image(b"image"),
            Err(ConnectorError::NotImplemented(_))
        ));
    }

    #[test]
    fn test_fota_without_image_is_invalid() {
        let (manager, _) = full_manager(true);
        assert!(matches!(
            manager.invoke_fota(PASS),
            Err(ConnectorError::InvalidState(_))
        ));
        assert_eq!(manager.firmware_status().state, FirmwareState::Idle);
    }

    #[test]
    fn test_fota_success() {
        let (manager, _) = full_manager(true);
        manager.set_manifest("coap://updates/meter.bin").unwrap();
        manager.set_image(b"\x7fELF").unwrap();
        assert_eq!(manager.firmware_status().state, FirmwareState::Downloaded);

        manager.invoke_fota(PASS).unwrap();

        let status = manager.firmware_status();
        assert_eq!(status.state, FirmwareState::Idle);
        assert_eq!(status.result, UpdateResult::Success);
        assert_eq!(status.package_uri.as_deref(), Some("coap://updates/meter.bin"));
        assert!(status.last_update.is_some());
    }

    #[test]
    fn test_fota_failure_records_result() {
        let (manager, _) = full_manager(false);
        manager.set_image(b"image").unwrap();

        assert!(manager.invoke_fota(PASS).is_err());
        let status = manager.firmware_status();
        assert_eq!(status.state, FirmwareState::Idle);
        assert_eq!(status.result, UpdateResult::Failed);
    }

    #[test]
    fn test_empty_image_clears_download() {
        let (manager, _) = full_manager(true);
        manager.set_image(b"image").unwrap();
        manager.set_image(b"").unwrap();
        assert_eq!(manager.firmware_status(), FirmwareStatus::default());
    }

    #[test]
    fn test_initialize_handler_receives_identity() {
        let seen = Arc::new(Mutex::new(String::new()));
        let mut responder = responder();
        let s = Arc::clone(&seen);
        responder.set_initialize_handler(move |identity| {
            *s.lock().unwrap() = identity.manufacturer.clone();
        });

        DeviceManager::new(DeviceIdentity::default(), responder).initialize();
        assert_eq!(*seen.lock().unwrap(), "NXP");
    }

    #[test]
    fn test_managed_resources() {
        let (manager, calls) = full_manager(true);
        let resources = manager.resources().unwrap();
        assert_eq!(resources.len(), 14);

        let find = |path: &str| {
            resources
                .iter()
                .find(|r| r.path().to_string() == path)
                .cloned()
                .unwrap()
        };

        assert_eq!(find("3/0/0").get().unwrap(), "NXP");
        assert_eq!(find("3/0/1").get().unwrap(), "K64F");
        assert_eq!(find("3/0/17").get().unwrap(), "parking-meter");
        assert_eq!(find("5/0/3").get().unwrap(), "0");

        find("3/0/4").execute(" arm1234 ").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        find("5/0/0").put("image-bytes").unwrap();
        assert_eq!(find("5/0/3").get().unwrap(), "2");
        find("5/0/2").execute(PASS).unwrap();
        assert_eq!(find("5/0/3").get().unwrap(), "0");
        assert_eq!(find("5/0/5").get().unwrap(), "1");

        assert!(find("5/0/0").get().is_err());
        assert!(find("3/0/0").put("ARM").is_err());
    }
}
