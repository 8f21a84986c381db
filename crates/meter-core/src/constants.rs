//! Board and endpoint constants for the parking meter.
//!
//! Everything here describes the physical demo board (an NXP K64F with the
//! mbed application shield) or the identity the endpoint presents to the
//! device-management service. Values are grouped by concern:
//!
//! ```
//! use meter_core::constants::*;
//!
//! // LCD geometry
//! assert_eq!(LCD_BUFFER_LENGTH, 24);
//! assert_eq!(NUM_SLOTS, 20);
//!
//! // Resource identities
//! assert_eq!(LCD_OBJECT, "312");
//! assert_eq!(HOURGLASS_OBJECT, "100");
//! ```

// ============================================================================
// LCD Layout
// ============================================================================

/// Width of the LCD status line buffer (characters).
///
/// Text written to the status line is truncated to this width and padded with
/// spaces, so a GET on the LCD resource always returns exactly this many
/// characters.
///
/// # Value: 24 characters
pub const LCD_BUFFER_LENGTH: usize = 24;

/// Number of slots in the time remaining bar.
///
/// # Value: 20 slots
///
/// # Examples
///
/// ```
/// use meter_core::constants::NUM_SLOTS;
///
/// // 50% remaining fills half the bar
/// let stars = ((50.0_f64 / 100.0) * NUM_SLOTS as f64) as usize;
/// assert_eq!(stars, 10);
/// ```
pub const NUM_SLOTS: usize = 20;

/// Percentage at or below which the remaining time is considered low.
///
/// The status LED turns yellow once the remaining time drops to this share
/// of the purchased time.
pub const LOW_TIME_PERCENT: f64 = 25.0;

/// Pixel row of the title line.
pub const TITLE_ROW: u8 = 0;

/// Pixel row of the time remaining bar.
pub const TIME_ROW: u8 = 10;

/// Pixel row of the status (log) line.
pub const STATUS_ROW: u8 = 20;

/// C12832 panel width in pixels.
pub const LCD_WIDTH_PX: u8 = 128;

/// C12832 panel height in pixels.
pub const LCD_HEIGHT_PX: u8 = 32;

/// Width of one glyph cell of the LCD font (pixels).
///
/// With a 128 pixel panel this gives 25 character cells per row, enough for
/// the 24 character status line.
pub const LCD_GLYPH_WIDTH_PX: u8 = 5;

// ============================================================================
// Resource Identities
// ============================================================================

/// Instance used for every resource exposed by this endpoint.
pub const DEFAULT_INSTANCE: &str = "0";

/// Object ID of the LCD resource.
pub const LCD_OBJECT: &str = "312";

/// Resource ID of the LCD resource.
pub const LCD_RESOURCE: &str = "1";

/// Object ID of the hourglass (parking time) resource.
pub const HOURGLASS_OBJECT: &str = "100";

/// Resource ID of the hourglass resource.
pub const HOURGLASS_RESOURCE: &str = "1";

/// Object ID of the beacon switch resource.
pub const BEACON_OBJECT: &str = "200";

/// Resource ID of the beacon switch resource.
pub const BEACON_RESOURCE: &str = "1";

/// Object ID of the standard device object.
pub const DEVICE_OBJECT: &str = "3";

/// Object ID of the standard firmware update object.
pub const FIRMWARE_OBJECT: &str = "5";

// ============================================================================
// Device Identity Defaults
// ============================================================================

/// Default device manufacturer.
pub const DEFAULT_MANUFACTURER: &str = "NXP";

/// Default device type, also used as the endpoint type.
pub const DEFAULT_DEVICE_TYPE: &str = "parking-meter";

/// Default device model.
pub const DEFAULT_MODEL: &str = "K64F";

/// Default device serial number.
pub const DEFAULT_SERIAL: &str = "0123456789";

/// Default firmware version.
pub const DEFAULT_FIRMWARE_VERSION: &str = "1.0.0";

/// Default hardware version.
pub const DEFAULT_HARDWARE_VERSION: &str = "1.0.0";

/// Default software version.
pub const DEFAULT_SOFTWARE_VERSION: &str = "1.0.0";

/// Default passphrase for device management authentication.
pub const DEFAULT_DM_PASSPHRASE: &str = "arm1234";

/// Default endpoint node name.
pub const DEFAULT_NODE_NAME: &str = "parking-meter-01";

/// Default endpoint domain.
pub const DEFAULT_DOMAIN: &str = "domain";

/// Default registration lifetime (seconds).
pub const DEFAULT_LIFETIME_SECS: u64 = 3600;

// ============================================================================
// Host Emulation
// ============================================================================

/// Serial console baud rate of the board.
pub const SERIAL_BAUD_RATE: u32 = 115_200;

/// Default bind address of the local JSON console.
pub const DEFAULT_CONSOLE_BIND: &str = "127.0.0.1:5683";

/// Default maximum number of simultaneous console connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 8;

/// Default hourglass tick period (milliseconds).
pub const DEFAULT_TICK_MS: u64 = 1000;
