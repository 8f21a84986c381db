//! BeaconSwitch resource: powers the BLE beacon on or off.
//!
//! The switch line drives the beacon's reset pin and the confirmation LED is
//! lit (low) while the beacon runs. A PUT of `"0"` turns the beacon off and
//! marks the bay as free parking; any other value turns it back on.

use std::sync::{Mutex, MutexGuard, PoisonError};

use meter_connector::{DynamicResource, Operations, Result};
use meter_core::{BeaconStatus, ResourcePath};
use meter_hardware::DigitalOutput;
use tracing::info;

use crate::hardware_failure;
use crate::meter::{SharedMeter, lock_meter};

pub const RESOURCE_TYPE: &str = "BeaconSwitch";

const OFF: &str = "0";
const ON: &str = "1";

struct Lines {
    switch: Box<dyn DigitalOutput>,
    led: Box<dyn DigitalOutput>,
}

pub struct BeaconSwitchResource {
    path: ResourcePath,
    meter: SharedMeter,
    lines: Mutex<Lines>,
}

impl BeaconSwitchResource {
    /// Create the resource with the beacon switched on.
    pub fn new(
        path: ResourcePath,
        switch: Box<dyn DigitalOutput>,
        led: Box<dyn DigitalOutput>,
        meter: SharedMeter,
    ) -> meter_hardware::Result<Self> {
        let resource = Self {
            path,
            meter,
            lines: Mutex::new(Lines { switch, led }),
        };
        resource.apply(true)?;
        Ok(resource)
    }

    fn lines(&self) -> MutexGuard<'_, Lines> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_on(&self) -> bool {
        self.lines().switch.read()
    }

    /// Drive the switch and LED, then show the new status.
    ///
    /// Once the switch has moved the status line follows it, even when the
    /// LED write fails afterwards.
    fn apply(&self, on: bool) -> meter_hardware::Result<()> {
        let led = {
            let mut lines = self.lines();
            lines.switch.write(on)?;
            lines.led.write(!on)
        };
        lock_meter(&self.meter).beacon_status(BeaconStatus::from(on))?;
        led
    }
}

impl DynamicResource for BeaconSwitchResource {
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
        Ok(if self.is_on() { ON } else { OFF }.to_string())
    }

    fn put(&self, value: &str) -> Result<()> {
        let on = value.trim() != OFF;
        info!(on, "BeaconSwitch: PUT");
        self.apply(on).map_err(hardware_failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meter::ParkingMeter;
    use meter_connector::ConnectorError;
    use meter_hardware::LoggingStatusLed;
    use meter_hardware::mock::{MockLcd, MockPin, MockPinHandle};
    use rstest::rstest;

    fn beacon() -> (BeaconSwitchResource, MockPinHandle, MockPinHandle, SharedMeter) {
        let (lcd, _) = MockLcd::new();
        let meter = ParkingMeter::new(Box::new(lcd), Box::new(LoggingStatusLed::new())).shared();
        let (switch, switch_handle) = MockPin::new("D0");
        let (led, led_handle) = MockPin::new("LED3");
        let resource = BeaconSwitchResource::new(
            "200/0/1".parse().unwrap(),
            Box::new(switch),
            Box::new(led),
            meter.clone(),
        )
        .unwrap();
        (resource, switch_handle, led_handle, meter)
    }

    #[test]
    fn test_starts_on() {
        let (beacon, switch, led, meter) = beacon();
        assert!(switch.is_high());
        assert!(!led.is_high());
        assert_eq!(beacon.get().unwrap(), "1");
        assert_eq!(lock_meter(&meter).status().trim_end(), "PAID-FOR PARKING");
    }

    #[rstest]
    #[case("0")]
    #[case(" 0\n")]
    fn test_put_off(#[case] payload: &str) {
        let (beacon, switch, led, meter) = beacon();
        beacon.put(payload).unwrap();

        assert!(!switch.is_high());
        assert!(led.is_high());
        assert_eq!(beacon.get().unwrap(), "0");
        assert_eq!(lock_meter(&meter).status().trim_end(), "FREE PARKING");
    }

    #[rstest]
    #[case("1")]
    #[case("on")]
    #[case("")]
    fn test_put_anything_else_is_on(#[case] payload: &str) {
        let (beacon, switch, led, meter) = beacon();
        beacon.put("0").unwrap();
        beacon.put(payload).unwrap();

        assert!(switch.is_high());
        assert!(!led.is_high());
        assert_eq!(lock_meter(&meter).status().trim_end(), "PAID-FOR PARKING");
    }

    #[test]
    fn test_switch_failure() {
        let (beacon, switch, _, _) = beacon();
        switch.set_connected(false);
        assert!(matches!(beacon.put("0"), Err(ConnectorError::Resource(_))));
    }

    #[test]
    fn test_led_failure_keeps_status_in_step_with_switch() {
        let (beacon, switch, led, meter) = beacon();
        led.set_connected(false);

        assert!(matches!(beacon.put("0"), Err(ConnectorError::Resource(_))));
        assert!(!switch.is_high());
        assert_eq!(beacon.get().unwrap(), "0");
        assert_eq!(lock_meter(&meter).status().trim_end(), "FREE PARKING");
    }
}
