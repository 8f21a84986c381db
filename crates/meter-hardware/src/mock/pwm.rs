//! Mock PWM output channel.

use std::sync::{Arc, Mutex, PoisonError};

use crate::{
    HardwareError, Result,
    traits::{PwmOutput, clamp_duty},
};

#[derive(Debug)]
struct PwmState {
    duty: f32,
    connected: bool,
}

/// Mock PWM channel.
///
/// # Examples
///
/// ```
/// use meter_hardware::mock::MockPwm;
/// use meter_hardware::traits::PwmOutput;
///
/// let (mut red, handle) = MockPwm::new("D5");
/// red.write(0.5).unwrap();
/// assert_eq!(handle.duty(), 0.5);
/// ```
#[derive(Debug)]
pub struct MockPwm {
    state: Arc<Mutex<PwmState>>,
    name: String,
}

impl MockPwm {
    /// Create a channel that starts at 100% duty (off for active-low LEDs).
    pub fn new(name: impl Into<String>) -> (Self, MockPwmHandle) {
        let state = Arc::new(Mutex::new(PwmState {
            duty: 1.0,
            connected: true,
        }));
        let name = name.into();

        let pwm = Self {
            state: Arc::clone(&state),
            name: name.clone(),
        };

        (pwm, MockPwmHandle { state, name })
    }
}

impl PwmOutput for MockPwm {
    fn write(&mut self, duty: f32) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.connected {
            return Err(HardwareError::disconnected(self.name.clone()));
        }
        state.duty = clamp_duty(duty);
        Ok(())
    }

    fn read(&self) -> f32 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .duty
    }
}

/// Handle for observing a mock PWM channel.
#[derive(Debug, Clone)]
pub struct MockPwmHandle {
    state: Arc<Mutex<PwmState>>,
    name: String,
}

impl MockPwmHandle {
    /// Channel name (e.g., "D5").
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current duty cycle.
    pub fn duty(&self) -> f32 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .duty
    }

    /// Simulate a broken connection; writes fail until reconnected.
    pub fn set_connected(&self, connected: bool) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .connected = connected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pwm_starts_off() {
        let (pwm, handle) = MockPwm::new("D9");
        assert_eq!(pwm.read(), 1.0);
        assert_eq!(handle.name(), "D9");
    }

    #[test]
    fn test_pwm_write_clamps() {
        let (mut pwm, handle) = MockPwm::new("D5");
        pwm.write(2.0).unwrap();
        assert_eq!(handle.duty(), 1.0);
        pwm.write(-0.5).unwrap();
        assert_eq!(handle.duty(), 0.0);
    }

    #[test]
    fn test_pwm_disconnected() {
        let (mut pwm, handle) = MockPwm::new("D5");
        handle.set_connected(false);
        assert!(pwm.write(0.3).is_err());
        assert_eq!(handle.duty(), 1.0);
    }
}
