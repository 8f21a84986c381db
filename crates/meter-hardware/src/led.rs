//! Status LED drivers.
//!
//! The application shield carries an active-low RGB LED: a PWM duty of `1.0`
//! keeps a channel dark and lower duties light it. Only the red (D5) and green
//! (D9) channels are normally fitted because the blue channel (D8) doubles as
//! the debug line. Boards without the RGB LED use [`LoggingStatusLed`].

use tracing::{debug, info};

use crate::{
    Result,
    traits::{PwmOutput, StatusLed},
    types::{DeviceInfo, LedColor},
};

/// Duty that keeps an active-low channel dark.
pub const DUTY_OFF: f32 = 1.0;

/// Per-channel duties `(red, green, blue)` for a lit color.
pub fn color_duties(color: LedColor) -> (f32, f32, f32) {
    match color {
        LedColor::Red => (0.5, DUTY_OFF, DUTY_OFF),
        LedColor::Yellow => (0.3, 0.3, DUTY_OFF),
        LedColor::Green => (DUTY_OFF, 0.5, DUTY_OFF),
        LedColor::Blue => (DUTY_OFF, DUTY_OFF, 0.5),
    }
}

/// RGB status LED on PWM channels.
///
/// # Examples
///
/// ```
/// use meter_hardware::led::PwmStatusLed;
/// use meter_hardware::mock::MockPwm;
/// use meter_hardware::traits::StatusLed;
/// use meter_hardware::types::LedColor;
///
/// let (red, red_handle) = MockPwm::new("D5");
/// let (green, green_handle) = MockPwm::new("D9");
/// let mut led = PwmStatusLed::new(Box::new(red), Box::new(green));
///
/// led.set(LedColor::Yellow, true).unwrap();
/// assert_eq!(red_handle.duty(), 0.3);
/// assert_eq!(green_handle.duty(), 0.3);
/// ```
pub struct PwmStatusLed {
    red: Box<dyn PwmOutput>,
    green: Box<dyn PwmOutput>,
    blue: Option<Box<dyn PwmOutput>>,
}

impl PwmStatusLed {
    /// Create an LED with only the red and green channels fitted.
    pub fn new(red: Box<dyn PwmOutput>, green: Box<dyn PwmOutput>) -> Self {
        Self {
            red,
            green,
            blue: None,
        }
    }

    /// Attach the blue channel.
    pub fn with_blue(mut self, blue: Box<dyn PwmOutput>) -> Self {
        self.blue = Some(blue);
        self
    }

    fn write(&mut self, (r, g, b): (f32, f32, f32)) -> Result<()> {
        self.red.write(r)?;
        self.green.write(g)?;
        if let Some(blue) = self.blue.as_mut() {
            blue.write(b)?;
        }
        Ok(())
    }
}

impl StatusLed for PwmStatusLed {
    fn set(&mut self, color: LedColor, on: bool) -> Result<()> {
        debug!(%color, on, "Setting status LED");

        if on {
            self.write(color_duties(color))
        } else {
            self.write((DUTY_OFF, DUTY_OFF, DUTY_OFF))
        }
    }

    fn info(&self) -> DeviceInfo {
        let model = if self.blue.is_some() {
            "RGB PWM LED"
        } else {
            "RG PWM LED"
        };
        DeviceInfo::new("Status LED", model)
    }
}

/// Status LED stand-in for boards without the RGB LED.
///
/// Every change is logged as `"<COLOR> LED ON"` or `"<COLOR> LED OFF"`.
#[derive(Debug, Default)]
pub struct LoggingStatusLed {
    last: Option<(LedColor, bool)>,
}

impl LoggingStatusLed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last color change applied.
    pub fn last(&self) -> Option<(LedColor, bool)> {
        self.last
    }
}

/// Log line for an LED change, e.g. `"RED LED ON"`.
pub fn led_message(color: LedColor, on: bool) -> String {
    let state = if on { "ON" } else { "OFF" };
    format!("{} LED {}", color.name().to_ascii_uppercase(), state)
}

impl StatusLed for LoggingStatusLed {
    fn set(&mut self, color: LedColor, on: bool) -> Result<()> {
        info!("{}", led_message(color, on));
        self.last = Some((color, on));
        Ok(())
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo::new("Status LED", "Log")
    }
}
