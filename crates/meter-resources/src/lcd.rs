//! LCD resource: reads the status line and accepts display/LED commands.
//!
//! PUT payload: `{"cmd":"lcd|led","value":"text|red|yellow|green|blue","state":0|1}`.

use meter_connector::{ConnectorError, DynamicResource, Operations, Result};
use meter_core::ResourcePath;
use meter_hardware::LedColor;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::hardware_failure;
use crate::meter::{SharedMeter, lock_meter};

pub const RESOURCE_TYPE: &str = "C12832 LCD";

#[derive(Debug, Deserialize)]
struct LcdCommand {
    cmd: String,
    #[serde(default)]
    value: String,
    #[serde(default)]
    state: i64,
}

/// Status line of the C12832 panel plus the status LED.
pub struct LcdResource {
    path: ResourcePath,
    meter: SharedMeter,
}

impl LcdResource {
    pub fn new(path: ResourcePath, meter: SharedMeter) -> Self {
        Self { path, meter }
    }
}

impl DynamicResource for LcdResource {
    fn path(&self) -> &ResourcePath {
        &self.path
    }

    fn resource_type(&self) -> &str {
        RESOURCE_TYPE
    }

    fn operations(&self) -> Operations {
        Operations::GET_PUT
    }

    fn get(&self) -> Result<String> {
        let status = lock_meter(&self.meter).status().to_string();
        debug!(status = %status, "C12832 LCD: GET");
        Ok(status)
    }

    fn put(&self, value: &str) -> Result<()> {
        let command: LcdCommand = serde_json::from_str(value)
            .map_err(|e| ConnectorError::bad_request(format!("invalid LCD command: {e}")))?;

        match command.cmd.as_str() {
            "lcd" => {
                info!(text = %command.value, "C12832 LCD: PUT");
                lock_meter(&self.meter)
                    .log_status(&command.value)
                    .map_err(hardware_failure)
            }
            "led" => {
                let Ok(color) = command.value.parse::<LedColor>() else {
                    warn!(color = %command.value, "Ignoring unknown LED color");
                    return Ok(());
                };
                let on = command.state != 0;
                info!(%color, on, "Status LED: PUT");
                lock_meter(&self.meter)
                    .set_led(color, on)
                    .map_err(hardware_failure)
            }
            other => {
                warn!(cmd = other, "Ignoring unknown LCD command");
                Ok(())
            }
        }
    }
}
