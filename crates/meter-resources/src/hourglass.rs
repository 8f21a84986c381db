//! HourGlass resource: the paid parking countdown.
//!
//! A PUT of `N` starts a new countdown of `N` seconds. The countdown task
//! calls [`HourGlassResource::tick`] once per period; every tick redraws the
//! time bar, the remaining-time status line and the status LED.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use meter_connector::{ConnectorError, DynamicResource, Endpoint, Operations, Result};
use meter_core::ResourcePath;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::hardware_failure;
use crate::meter::{SharedMeter, lock_meter};

pub const RESOURCE_TYPE: &str = "HourGlass";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Countdown {
    value: i32,
    fill_value: i32,
    expiry_shown: bool,
}

impl Countdown {
    fn filled(seconds: i32) -> Self {
        let seconds = seconds.max(0);
        Self {
            value: seconds,
            fill_value: seconds,
            expiry_shown: false,
        }
    }
}

/// Countdown of the paid parking time.
pub struct HourGlassResource {
    path: ResourcePath,
    meter: SharedMeter,
    countdown: Mutex<Countdown>,
}

impl HourGlassResource {
    /// Create an hourglass holding `initial_seconds` of paid time. Nothing is
    /// drawn until [`render`](Self::render) or the first tick.
    pub fn new(path: ResourcePath, meter: SharedMeter, initial_seconds: i32) -> Self {
        Self {
            path,
            meter,
            countdown: Mutex::new(Countdown::filled(initial_seconds)),
        }
    }

    fn countdown(&self) -> MutexGuard<'_, Countdown> {
        self.countdown.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seconds left.
    pub fn remaining(&self) -> i32 {
        self.countdown().value
    }

    /// Seconds paid for by the last PUT.
    pub fn fill_value(&self) -> i32 {
        self.countdown().fill_value
    }

    /// Draw the current countdown.
    pub fn render(&self) -> meter_hardware::Result<()> {
        let mut countdown = self.countdown();
        lock_meter(&self.meter).update_stats(countdown.value, countdown.fill_value)?;
        countdown.expiry_shown = countdown.value <= 0;
        Ok(())
    }

    /// Advance the countdown by one second.
    ///
    /// While time remains the display is redrawn on every tick. Once expired
    /// the expiry screen is drawn a single time and later ticks do nothing.
    /// Returns whether the display was redrawn.
    pub fn tick(&self) -> meter_hardware::Result<bool> {
        let mut countdown = self.countdown();

        if countdown.value > 0 {
            countdown.value -= 1;
        } else if countdown.expiry_shown {
            return Ok(false);
        }

        lock_meter(&self.meter).update_stats(countdown.value, countdown.fill_value)?;
        if countdown.value <= 0 {
            info!("Parking time expired");
            countdown.expiry_shown = true;
        }
        Ok(true)
    }

    /// Tick every `period` until `shutdown` becomes `true`. When an endpoint
    /// is given, observers are notified of the new value after each tick.
    pub async fn run_countdown(
        self: Arc<Self>,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
        endpoint: Option<Arc<Endpoint>>,
    ) {
        info!(period_ms = period.as_millis() as u64, "Countdown started");

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        while !*shutdown.borrow() {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick() {
                        warn!(error = %e, "Failed to update parking meter display");
                    }
                    if let Some(endpoint) = &endpoint {
                        let sent = endpoint.notify_changed();
                        if sent > 0 {
                            debug!(sent, "Observers notified");
                        }
                    }
                }
            }
        }

        info!("Countdown stopped");
    }
}

impl DynamicResource for HourGlassResource {
    fn path(&self) -> &ResourcePath {
        &self.path
    }

    fn resource_type(&self) -> &str {
        RESOURCE_TYPE
    }

    fn operations(&self) -> Operations {
        Operations::GET_PUT
    }

    fn observable(&self) -> bool {
        true
    }

    fn get(&self) -> Result<String> {
        Ok(self.remaining().to_string())
    }

    fn put(&self, value: &str) -> Result<()> {
        let seconds: i32 = value
            .trim()
            .parse()
            .map_err(|_| ConnectorError::bad_request(format!("invalid seconds: {value:?}")))?;

        info!(seconds, "HourGlass: PUT");
        *self.countdown() = Countdown::filled(seconds);
        self.render().map_err(hardware_failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meter::ParkingMeter;
    use meter_hardware::mock::{MockLcd, MockLcdHandle, MockPwm, MockPwmHandle};
    use meter_hardware::PwmStatusLed;
    use rstest::rstest;

    fn hourglass(seconds: i32) -> (HourGlassResource, MockLcdHandle, MockPwmHandle) {
        let (lcd, screen) = MockLcd::new();
        let (red, r) = MockPwm::new("D5");
        let (green, _) = MockPwm::new("D9");
        let led = PwmStatusLed::new(Box::new(red), Box::new(green));
        let meter = ParkingMeter::new(Box::new(lcd), Box::new(led)).shared();
        (
            HourGlassResource::new("100/0/1".parse().unwrap(), meter, seconds),
            screen,
            r,
        )
    }

    #[rstest]
    #[case("60", 60)]
    #[case(" 30\n", 30)]
    #[case("-5", 0)]
    #[case("0", 0)]
    fn test_put_sets_value_and_fill(#[case] payload: &str, #[case] seconds: i32) {
        let (hourglass, _, _) = hourglass(0);
        hourglass.put(payload).unwrap();
        assert_eq!(hourglass.remaining(), seconds);
        assert_eq!(hourglass.fill_value(), seconds);
        assert_eq!(hourglass.get().unwrap(), seconds.to_string());
    }

    #[rstest]
    #[case("")]
    #[case("ten")]
    #[case("1.5")]
    fn test_put_rejects_non_integer(#[case] payload: &str) {
        let (hourglass, _, _) = hourglass(10);
        assert!(matches!(hourglass.put(payload), Err(ConnectorError::BadRequest(_))));
        assert_eq!(hourglass.remaining(), 10);
    }

    #[test]
    fn test_put_renders() {
        let (hourglass, screen, _) = hourglass(0);
        hourglass.put("40").unwrap();
        // The last slot falls off the 25-column panel
        assert_eq!(screen.row(10).matches('*').count(), 19);
        assert!(screen.row(20).starts_with("Rem: 40sec / 40sec"));
    }

    #[test]
    fn test_tick_counts_down_to_expiry() {
        let (hourglass, screen, red) = hourglass(2);

        assert!(hourglass.tick().unwrap());
        assert_eq!(hourglass.remaining(), 1);
        assert!(screen.row(20).starts_with("Rem: 1sec / 2sec"));

        assert!(hourglass.tick().unwrap());
        assert_eq!(hourglass.remaining(), 0);
        assert!(screen.row(10).starts_with("Time: EXPIRED"));
        assert_eq!(red.duty(), 0.5);

        let prints = screen.print_count();
        assert!(!hourglass.tick().unwrap());
        assert_eq!(screen.print_count(), prints);
        assert_eq!(hourglass.remaining(), 0);
    }

    #[test]
    fn test_expired_at_start_renders_once() {
        let (hourglass, screen, _) = hourglass(0);
        assert!(hourglass.tick().unwrap());
        assert!(screen.row(10).starts_with("Time: EXPIRED"));
        assert!(!hourglass.tick().unwrap());
    }

    #[test]
    fn test_put_restarts_after_expiry() {
        let (hourglass, _, _) = hourglass(1);
        hourglass.tick().unwrap();
        hourglass.put("5").unwrap();
        assert!(hourglass.tick().unwrap());
        assert_eq!(hourglass.remaining(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_countdown_stops_on_shutdown() {
        let (hourglass, _, _) = hourglass(10);
        let hourglass = Arc::new(hourglass);
        let (tx, rx) = watch::channel(false);

        let task = tokio::spawn(Arc::clone(&hourglass).run_countdown(
            Duration::from_secs(1),
            rx,
            None,
        ));

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(hourglass.remaining(), 7);

        tx.send(true).unwrap();
        task.await.unwrap();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(hourglass.remaining(), 7);
    }
}
