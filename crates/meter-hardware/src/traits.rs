//! Peripheral trait definitions.
//!
//! These traits are the contract between the parking meter logic and the
//! board peripherals: the C12832 LCD, plain digital outputs (the beacon
//! switch line and its confirmation LED) and PWM outputs (the RGB status LED).
//!
//! Unlike network I/O, every operation here is a register write that
//! completes immediately, so the traits are synchronous. They are
//! object-safe and `Send + Sync`, which lets the meter hold them as
//! `Box<dyn Trait>` behind a mutex shared with the async endpoint tasks.
//!
//! # Examples
//!
//! ```
//! use meter_hardware::traits::TextDisplay;
//! use meter_hardware::error::Result;
//!
//! fn write_banner(lcd: &mut dyn TextDisplay, version: &str) -> Result<()> {
//!     lcd.locate(0, 0)?;
//!     lcd.print(&format!("Parking Meter FW_v{version}"))
//! }
//! ```

use crate::error::Result;
use crate::types::{DeviceInfo, LedColor};

/// Character display addressed by pixel coordinates.
///
/// Models the C12832 driver API: the cursor is placed with [`locate`] and
/// text is rendered from the cursor with [`print`], overwriting whatever was
/// there before.
///
/// [`locate`]: TextDisplay::locate
/// [`print`]: TextDisplay::print
pub trait TextDisplay: Send + Sync {
    /// Clear the whole panel and move the cursor home.
    ///
    /// # Errors
    ///
    /// Returns an error if the display is disconnected.
    fn cls(&mut self) -> Result<()>;

    /// Move the cursor to pixel position (`x`, `y`).
    ///
    /// # Errors
    ///
    /// Returns an error if the position lies outside the panel.
    fn locate(&mut self, x: u8, y: u8) -> Result<()>;

    /// Render `text` from the cursor position.
    ///
    /// Text that runs past the right edge of the panel is clipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the display is disconnected.
    fn print(&mut self, text: &str) -> Result<()>;

    /// Get device information.
    fn info(&self) -> DeviceInfo;
}

/// Single digital output line.
pub trait DigitalOutput: Send + Sync {
    /// Drive the line high (`true`) or low (`false`).
    ///
    /// # Errors
    ///
    /// Returns an error if the pin is disconnected.
    fn write(&mut self, high: bool) -> Result<()>;

    /// Read back the level last driven on the line.
    fn read(&self) -> bool;
}

/// PWM output channel.
///
/// Duty cycles are expressed as a fraction in `0.0..=1.0`; values outside the
/// range are clamped by implementations.
pub trait PwmOutput: Send + Sync {
    /// Set the duty cycle.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is disconnected.
    fn write(&mut self, duty: f32) -> Result<()>;

    /// Read back the current duty cycle.
    fn read(&self) -> f32;
}

/// Parking status LED.
pub trait StatusLed: Send + Sync {
    /// Switch the LED to `color`, or switch it off when `on` is false.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying outputs fail.
    fn set(&mut self, color: LedColor, on: bool) -> Result<()>;

    /// Get device information.
    fn info(&self) -> DeviceInfo;
}

/// Clamp a duty cycle into the valid PWM range. `NaN` maps to `0.0`.
pub fn clamp_duty(duty: f32) -> f32 {
    if duty.is_nan() {
        0.0
    } else {
        duty.clamp(0.0, 1.0)
    }
}
