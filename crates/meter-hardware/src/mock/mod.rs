//! Mock peripheral implementations for host emulation and testing.
//!
//! Each mock comes with a cloneable handle that observes (and can disturb)
//! the simulated hardware without going through the peripheral trait.

pub mod lcd;
pub mod pin;
pub mod pwm;

// Re-export commonly used types
pub use lcd::{MockLcd, MockLcdHandle};
pub use pin::{MockPin, MockPinHandle};
pub use pwm::{MockPwm, MockPwmHandle};
