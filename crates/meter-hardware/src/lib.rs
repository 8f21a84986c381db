//! Peripheral abstraction layer for the parking meter.
//!
//! This crate provides trait-based abstractions for the peripherals on the
//! demo board: the C12832 LCD, digital output lines and the PWM-driven RGB
//! status LED. The traits allow the meter logic to run unchanged against the
//! real board drivers or against the mocks used for host emulation and tests.
//!
//! # Device Traits
//!
//! - [`TextDisplay`]: pixel-addressed character display (`locate` + `print`)
//! - [`DigitalOutput`]: a single output line (beacon switch, confirmation LED)
//! - [`PwmOutput`]: one PWM channel
//! - [`StatusLed`]: the parking status LED, built on PWM channels by
//!   [`PwmStatusLed`] or logged by [`LoggingStatusLed`]
//!
//! ```
//! use meter_hardware::mock::MockLcd;
//! use meter_hardware::traits::TextDisplay;
//!
//! let (mut lcd, handle) = MockLcd::new();
//! lcd.locate(0, 10).unwrap();
//! lcd.print("Time: EXPIRED").unwrap();
//!
//! assert!(handle.row(10).starts_with("Time: EXPIRED"));
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T>`][error::Result] with the
//! [`HardwareError`] type.
//!
//! [`TextDisplay`]: traits::TextDisplay
//! [`DigitalOutput`]: traits::DigitalOutput
//! [`PwmOutput`]: traits::PwmOutput
//! [`StatusLed`]: traits::StatusLed
//! [`PwmStatusLed`]: led::PwmStatusLed
//! [`LoggingStatusLed`]: led::LoggingStatusLed

pub mod error;
pub mod led;
pub mod mock;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{HardwareError, Result};
pub use led::{LoggingStatusLed, PwmStatusLed};
pub use traits::{DigitalOutput, PwmOutput, StatusLed, TextDisplay};
pub use types::{DeviceInfo, LedColor};
