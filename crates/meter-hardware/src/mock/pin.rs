//! Mock digital output pin.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use crate::{HardwareError, Result, traits::DigitalOutput};

#[derive(Debug, Default)]
struct PinState {
    level: AtomicBool,
    writes: AtomicUsize,
    disconnected: AtomicBool,
}

/// Mock digital output.
///
/// # Examples
///
/// ```
/// use meter_hardware::mock::MockPin;
/// use meter_hardware::traits::DigitalOutput;
///
/// let (mut switch, handle) = MockPin::new("D0");
/// switch.write(true).unwrap();
/// assert!(handle.is_high());
/// ```
#[derive(Debug)]
pub struct MockPin {
    state: Arc<PinState>,
    name: String,
}

impl MockPin {
    /// Create a pin that starts low.
    pub fn new(name: impl Into<String>) -> (Self, MockPinHandle) {
        let state = Arc::new(PinState::default());
        let name = name.into();

        let pin = Self {
            state: Arc::clone(&state),
            name: name.clone(),
        };

        (pin, MockPinHandle { state, name })
    }
}

impl DigitalOutput for MockPin {
    fn write(&mut self, high: bool) -> Result<()> {
        if self.state.disconnected.load(Ordering::Acquire) {
            return Err(HardwareError::disconnected(self.name.clone()));
        }
        self.state.level.store(high, Ordering::Release);
        self.state.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn read(&self) -> bool {
        self.state.level.load(Ordering::Acquire)
    }
}

/// Handle for observing a mock pin.
#[derive(Debug, Clone)]
pub struct MockPinHandle {
    state: Arc<PinState>,
    name: String,
}

impl MockPinHandle {
    /// Pin name (e.g., "D0", "LED3").
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Level currently driven on the pin.
    pub fn is_high(&self) -> bool {
        self.state.level.load(Ordering::Acquire)
    }

    /// Number of writes since creation.
    pub fn write_count(&self) -> usize {
        self.state.writes.load(Ordering::Relaxed)
    }

    /// Simulate a broken connection; writes fail until reconnected.
    pub fn set_connected(&self, connected: bool) {
        self.state.disconnected.store(!connected, Ordering::Release);
    }
}
