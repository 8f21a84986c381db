//! Parking meter display state.
//!
//! The C12832 panel is split in three rows: the title at `y = 0`, the time
//! bar at `y = 10` and the 24-character status line at `y = 20`. The status
//! LED mirrors how much paid time is left.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use meter_core::BeaconStatus;
use meter_core::constants::{
    LCD_BUFFER_LENGTH, LOW_TIME_PERCENT, NUM_SLOTS, STATUS_ROW, TIME_ROW, TITLE_ROW,
};
use meter_hardware::{LedColor, Result, StatusLed, TextDisplay};
use tracing::{debug, trace};

const EXPIRED_LINE: &str = "Time: EXPIRED           ";
const EXPIRED_STATUS: &str = "Remain: NONE            ";

/// Meter shared between the resources and the countdown task.
pub type SharedMeter = Arc<Mutex<ParkingMeter>>;

/// Lock a shared meter, recovering the state if a holder panicked.
pub fn lock_meter(meter: &SharedMeter) -> MutexGuard<'_, ParkingMeter> {
    meter.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Percentage of the paid time still left.
///
/// A non-positive `fill_value` (nothing was paid) yields `0.0`.
pub fn percent_remaining(value: i32, fill_value: i32) -> f64 {
    if fill_value <= 0 {
        return 0.0;
    }
    f64::from(value) * 100.0 / f64::from(fill_value)
}

/// Bar of [`NUM_SLOTS`] characters, `*` for the remaining share and spaces
/// for the rest.
///
/// ```
/// use meter_resources::meter::time_remaining_bar;
///
/// assert_eq!(time_remaining_bar(30, 60), "**********          ");
/// ```
pub fn time_remaining_bar(value: i32, fill_value: i32) -> String {
    let remaining = percent_remaining(value, fill_value);
    let stars = ((remaining / 100.0) * NUM_SLOTS as f64).clamp(0.0, NUM_SLOTS as f64) as usize;
    format!("{}{}", "*".repeat(stars), " ".repeat(NUM_SLOTS - stars))
}

/// LCD and status LED of the meter plus the status line buffer.
pub struct ParkingMeter {
    lcd: Box<dyn TextDisplay>,
    led: Box<dyn StatusLed>,
    status: String,
}

impl ParkingMeter {
    pub fn new(lcd: Box<dyn TextDisplay>, led: Box<dyn StatusLed>) -> Self {
        Self {
            lcd,
            led,
            status: " ".repeat(LCD_BUFFER_LENGTH),
        }
    }

    /// Wrap the meter for sharing.
    pub fn shared(self) -> SharedMeter {
        Arc::new(Mutex::new(self))
    }

    /// Write `"Parking Meter FW_v{fw}"` on the title row.
    pub fn write_title(&mut self, fw: &str) -> Result<()> {
        self.lcd.locate(0, TITLE_ROW)?;
        self.lcd.print(&format!("Parking Meter FW_v{fw}"))
    }

    /// Show `text` on the status line.
    ///
    /// Empty text leaves the line untouched. Longer text is cut to
    /// [`LCD_BUFFER_LENGTH`] characters and shorter text is padded with
    /// spaces so that the previous status is fully overwritten.
    pub fn log_status(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }

        let mut line: String = text.chars().take(LCD_BUFFER_LENGTH).collect();
        let width = line.chars().count();
        line.extend(std::iter::repeat_n(' ', LCD_BUFFER_LENGTH - width));

        trace!(status = %line.trim_end(), "Status line");
        self.status = line;
        self.lcd.locate(0, STATUS_ROW)?;
        self.lcd.print(&self.status)
    }

    /// Current status line, always [`LCD_BUFFER_LENGTH`] characters.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Render the remaining parking time.
    pub fn update_stats(&mut self, value: i32, fill_value: i32) -> Result<()> {
        self.lcd.locate(0, TIME_ROW)?;

        if value <= 0 {
            debug!("Parking time expired");
            self.lcd.print(EXPIRED_LINE)?;
            self.log_status(EXPIRED_STATUS)?;
            return self.led.set(LedColor::Red, true);
        }

        self.lcd
            .print(&format!("Time: {}", time_remaining_bar(value, fill_value)))?;
        self.log_status(&format!("Rem: {value}sec / {fill_value}sec"))?;

        if percent_remaining(value, fill_value) <= LOW_TIME_PERCENT {
            self.led.set(LedColor::Yellow, true)
        } else {
            self.led.set(LedColor::Green, true)
        }
    }

    /// Show the beacon state on the status line.
    pub fn beacon_status(&mut self, status: BeaconStatus) -> Result<()> {
        self.log_status(status.message())
    }

    pub fn set_led(&mut self, color: LedColor, on: bool) -> Result<()> {
        self.led.set(color, on)
    }
}
