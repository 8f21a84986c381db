//! Mock C12832 LCD for host emulation and tests.
//!
//! The panel is modelled as rows of character cells. A row is addressed by
//! the pixel `y` passed to `locate()`, and the column of a glyph is the pixel
//! `x` divided by the glyph width. Text is ASCII only; other characters are
//! rendered as `?`, which is what the panel font does with glyphs it lacks.
//!
//! # Examples
//!
//! ```
//! use meter_hardware::mock::MockLcd;
//! use meter_hardware::traits::TextDisplay;
//!
//! let (mut lcd, handle) = MockLcd::new();
//! lcd.locate(0, 20).unwrap();
//! lcd.print("FREE PARKING").unwrap();
//!
//! assert_eq!(handle.row(20).trim_end(), "FREE PARKING");
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use meter_core::constants::{LCD_GLYPH_WIDTH_PX, LCD_HEIGHT_PX, LCD_WIDTH_PX};

use crate::{HardwareError, Result, traits::TextDisplay, types::DeviceInfo};

/// Panel state shared between the display and its handle.
#[derive(Debug)]
struct Panel {
    columns: usize,
    rows: BTreeMap<u8, Vec<char>>,
    cursor: (u8, u8),
    connected: bool,
    prints: usize,
}

impl Panel {
    fn new(columns: usize) -> Self {
        Self {
            columns,
            rows: BTreeMap::new(),
            cursor: (0, 0),
            connected: true,
            prints: 0,
        }
    }

    fn row_text(&self, y: u8) -> String {
        match self.rows.get(&y) {
            Some(cells) => cells.iter().collect(),
            None => " ".repeat(self.columns),
        }
    }
}

/// Mock LCD device.
///
/// Writes go to an in-memory panel that can be inspected through the
/// [`MockLcdHandle`] returned by [`MockLcd::new`].
#[derive(Debug)]
pub struct MockLcd {
    panel: Arc<Mutex<Panel>>,
    name: String,
}

impl MockLcd {
    /// Create a 128x32 mock panel.
    pub fn new() -> (Self, MockLcdHandle) {
        Self::with_name("C12832".to_string())
    }

    /// Create a mock panel with a custom name.
    pub fn with_name(name: String) -> (Self, MockLcdHandle) {
        let columns = usize::from(LCD_WIDTH_PX / LCD_GLYPH_WIDTH_PX);
        let panel = Arc::new(Mutex::new(Panel::new(columns)));

        let lcd = Self {
            panel: Arc::clone(&panel),
            name,
        };

        (lcd, MockLcdHandle { panel })
    }

    fn panel(&self) -> Result<MutexGuard<'_, Panel>> {
        let panel = self.panel.lock().unwrap_or_else(PoisonError::into_inner);
        if !panel.connected {
            return Err(HardwareError::disconnected(self.name.clone()));
        }
        Ok(panel)
    }
}

impl TextDisplay for MockLcd {
    fn cls(&mut self) -> Result<()> {
        let mut panel = self.panel()?;
        panel.rows.clear();
        panel.cursor = (0, 0);
        Ok(())
    }

    fn locate(&mut self, x: u8, y: u8) -> Result<()> {
        if x >= LCD_WIDTH_PX || y >= LCD_HEIGHT_PX {
            return Err(HardwareError::invalid_data(format!(
                "Position ({x}, {y}) outside {LCD_WIDTH_PX}x{LCD_HEIGHT_PX} panel"
            )));
        }

        self.panel()?.cursor = (x, y);
        Ok(())
    }

    fn print(&mut self, text: &str) -> Result<()> {
        let mut panel = self.panel()?;
        let (x, y) = panel.cursor;
        let columns = panel.columns;
        let start = usize::from(x / LCD_GLYPH_WIDTH_PX);

        let row = panel
            .rows
            .entry(y)
            .or_insert_with(|| vec![' '; columns]);

        let mut written = 0;
        for (cell, ch) in row.iter_mut().skip(start).zip(text.chars()) {
            *cell = if ch.is_ascii() && !ch.is_ascii_control() {
                ch
            } else {
                '?'
            };
            written += 1;
        }

        let advance = u8::try_from(written * usize::from(LCD_GLYPH_WIDTH_PX)).unwrap_or(u8::MAX);
        panel.cursor = (x.saturating_add(advance).min(LCD_WIDTH_PX - 1), y);
        panel.prints += 1;
        Ok(())
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo::new(self.name.clone(), "Mock 128x32 LCD").with_firmware_version("1.0.0")
    }
}

/// Handle for inspecting and controlling a mock LCD.
///
/// It can be cloned and shared across tasks.
#[derive(Debug, Clone)]
pub struct MockLcdHandle {
    panel: Arc<Mutex<Panel>>,
}

impl MockLcdHandle {
    fn panel(&self) -> MutexGuard<'_, Panel> {
        self.panel.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Text of the row at pixel `y`, padded to the panel width.
    pub fn row(&self, y: u8) -> String {
        self.panel().row_text(y)
    }

    /// All rows that have been written, ordered by pixel `y`.
    pub fn rows(&self) -> Vec<(u8, String)> {
        let panel = self.panel();
        panel
            .rows
            .keys()
            .map(|&y| (y, panel.row_text(y)))
            .collect()
    }

    /// Current cursor position in pixels.
    pub fn cursor(&self) -> (u8, u8) {
        self.panel().cursor
    }

    /// Number of `print` calls since creation.
    pub fn print_count(&self) -> usize {
        self.panel().prints
    }

    /// Simulate the panel being unplugged (or plugged back in).
    pub fn set_connected(&self, connected: bool) {
        self.panel().connected = connected;
    }
}
