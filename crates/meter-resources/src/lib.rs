//! Parking meter resources.
//!
//! Three resources share one [`ParkingMeter`] (LCD plus status LED):
//!
//! | Path      | Type           | Resource                 |
//! |-----------|----------------|--------------------------|
//! | `312/0/1` | `C12832 LCD`   | [`LcdResource`]          |
//! | `100/0/1` | `HourGlass`    | [`HourGlassResource`]    |
//! | `200/0/1` | `BeaconSwitch` | [`BeaconSwitchResource`] |
//!
//! ```
//! use meter_connector::DynamicResource;
//! use meter_hardware::LoggingStatusLed;
//! use meter_hardware::mock::MockLcd;
//! use meter_resources::{HourGlassResource, ParkingMeter};
//!
//! let (lcd, screen) = MockLcd::new();
//! let meter = ParkingMeter::new(Box::new(lcd), Box::new(LoggingStatusLed::new())).shared();
//! let hourglass = HourGlassResource::new("100/0/1".parse().unwrap(), meter, 0);
//!
//! hourglass.put("120").unwrap();
//! assert!(screen.row(20).starts_with("Rem: 120sec / 120sec"));
//! ```

pub mod beacon;
pub mod hourglass;
pub mod lcd;
pub mod meter;

pub use beacon::BeaconSwitchResource;
pub use hourglass::HourGlassResource;
pub use lcd::LcdResource;
pub use meter::{ParkingMeter, SharedMeter, percent_remaining, time_remaining_bar};

use meter_connector::ConnectorError;
use meter_hardware::HardwareError;

/// Report a peripheral failure as a resource error.
pub(crate) fn hardware_failure(error: HardwareError) -> ConnectorError {
    ConnectorError::resource(error.to_string())
}
