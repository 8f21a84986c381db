//! Default device-management responders.
//!
//! The emulated board cannot really reboot or flash itself, so reboot and
//! factory reset stop the process through the shutdown channel and the FOTA
//! handlers only log what they receive.

use std::sync::Arc;

use meter_connector::{DeviceManagementResponder, Result};
use tokio::sync::watch;
use tracing::{info, warn};

/// Install the default handlers on `responder`.
pub fn install(responder: &mut DeviceManagementResponder, shutdown: Arc<watch::Sender<bool>>) {
    responder.set_initialize_handler(|identity| {
        info!(
            manufacturer = %identity.manufacturer,
            model = %identity.model,
            serial = %identity.serial_number,
            firmware = %identity.firmware_version,
            "DM: device initialized"
        );
    });

    let reboot = Arc::clone(&shutdown);
    responder.set_reboot_responder_handler(move || {
        warn!("DM: reboot requested, stopping endpoint");
        reboot.send_replace(true);
        Ok(())
    });

    responder.set_reset_responder_handler(move || {
        warn!("DM: factory reset requested, stopping endpoint");
        shutdown.send_replace(true);
        Ok(())
    });

    responder.set_fota_manifest_handler(|manifest| {
        info!(manifest, "DM: FOTA manifest received");
        Ok(())
    });

    responder.set_fota_image_handler(|image| {
        info!(size = image.len(), "DM: FOTA image received");
        Ok(())
    });

    responder.set_fota_invocation_handler(invoke_fota);
}

fn invoke_fota() -> Result<()> {
    info!("DM: FOTA invoked, image accepted");
    Ok(())
}
