//! Emulated application shield.
//!
//! Pin names follow the K64F shield: D5/D9 for the red and green LED
//! channels, D0 for the beacon switch and LED3 for the confirmation LED.

use meter_core::config::LedMode;
use meter_hardware::mock::{MockLcd, MockLcdHandle, MockPin, MockPwm};
use meter_hardware::{DigitalOutput, LoggingStatusLed, PwmStatusLed, StatusLed};
use meter_resources::{ParkingMeter, SharedMeter};
use tracing::debug;

pub struct Board {
    pub meter: SharedMeter,
    /// Emulated panel contents.
    pub screen: MockLcdHandle,
    pub beacon_switch: Box<dyn DigitalOutput>,
    pub beacon_led: Box<dyn DigitalOutput>,
}

impl Board {
    pub fn emulated(led_mode: LedMode) -> Self {
        let (lcd, screen) = MockLcd::new();

        let led: Box<dyn StatusLed> = match led_mode {
            LedMode::Pwm => {
                let (red, _) = MockPwm::new("D5");
                let (green, _) = MockPwm::new("D9");
                Box::new(PwmStatusLed::new(Box::new(red), Box::new(green)))
            }
            LedMode::Log => Box::new(LoggingStatusLed::new()),
        };
        debug!(led = ?led.info(), "Status LED ready");

        let (beacon_switch, _) = MockPin::new("D0");
        let (beacon_led, _) = MockPin::new("LED3");

        Self {
            meter: ParkingMeter::new(Box::new(lcd), led).shared(),
            screen,
            beacon_switch: Box::new(beacon_switch),
            beacon_led: Box::new(beacon_led),
        }
    }
}
