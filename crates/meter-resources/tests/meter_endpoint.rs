//! Integration tests wiring the meter resources into an endpoint
//!
//! These tests exercise the LCD, HourGlass and BeaconSwitch resources through
//! endpoint dispatch the way the device-management service reaches them, with
//! mock peripherals standing in for the board.

use std::sync::Arc;
use std::time::Duration;

use meter_connector::{ConnectorError, Endpoint, OptionsBuilder, ResponseCode};
use meter_core::ResourcePath;
use meter_hardware::PwmStatusLed;
use meter_hardware::mock::{MockLcd, MockLcdHandle, MockPin, MockPinHandle, MockPwm, MockPwmHandle};
use meter_resources::{BeaconSwitchResource, HourGlassResource, LcdResource, ParkingMeter};
use tokio::sync::watch;

struct Board {
    screen: MockLcdHandle,
    red: MockPwmHandle,
    green: MockPwmHandle,
    switch: MockPinHandle,
    hourglass: Arc<HourGlassResource>,
    endpoint: Arc<Endpoint>,
}

fn path(s: &str) -> ResourcePath {
    s.parse().unwrap()
}

fn board(initial_seconds: i32, observe_hourglass: bool) -> Board {
    let (lcd, screen) = MockLcd::new();
    let (red_pwm, red) = MockPwm::new("D5");
    let (green_pwm, green) = MockPwm::new("D9");
    let (switch_pin, switch) = MockPin::new("D0");
    let (led_pin, _) = MockPin::new("LED3");

    let led = PwmStatusLed::new(Box::new(red_pwm), Box::new(green_pwm));
    let meter = ParkingMeter::new(Box::new(lcd), Box::new(led)).shared();

    let lcd = Arc::new(LcdResource::new(path("312/0/1"), meter.clone()));
    let hourglass = Arc::new(HourGlassResource::new(
        path("100/0/1"),
        meter.clone(),
        initial_seconds,
    ));
    let beacon = Arc::new(
        BeaconSwitchResource::new(
            path("200/0/1"),
            Box::new(switch_pin),
            Box::new(led_pin),
            meter,
        )
        .unwrap(),
    );

    let options = OptionsBuilder::new()
        .endpoint_nodename("parking-meter-01")
        .domain("domain")
        .add_resource(lcd)
        .add_resource_with_observation(hourglass.clone(), observe_hourglass)
        .add_resource(beacon)
        .build()
        .unwrap();
    let endpoint = Arc::new(Endpoint::new(options).unwrap());
    endpoint.register();

    Board {
        screen,
        red,
        green,
        switch,
        hourglass,
        endpoint,
    }
}

#[test]
fn test_resource_listing() {
    let board = board(0, false);
    let listing = board.endpoint.resources();

    let types: Vec<(String, String)> = listing
        .iter()
        .map(|d| (d.path.to_string(), d.resource_type.clone()))
        .collect();
    assert_eq!(
        types,
        vec![
            ("100/0/1".to_string(), "HourGlass".to_string()),
            ("200/0/1".to_string(), "BeaconSwitch".to_string()),
            ("312/0/1".to_string(), "C12832 LCD".to_string()),
        ]
    );
    assert!(listing.iter().all(|d| !d.observable));
}

#[test]
fn test_beacon_status_shows_on_lcd() {
    let board = board(0, false);
    let lcd = path("312/0/1");
    let beacon = path("200/0/1");

    assert_eq!(board.endpoint.get(&lcd).unwrap().trim_end(), "PAID-FOR PARKING");

    board.endpoint.put(&beacon, "0").unwrap();
    assert_eq!(board.endpoint.get(&beacon).unwrap(), "0");
    assert!(!board.switch.is_high());
    assert_eq!(board.endpoint.get(&lcd).unwrap().trim_end(), "FREE PARKING");
    assert!(board.screen.row(20).starts_with("FREE PARKING"));
}

#[test]
fn test_paid_session_lifecycle() {
    let board = board(0, false);
    let hourglass = path("100/0/1");

    board.endpoint.put(&hourglass, "8").unwrap();
    assert_eq!(board.endpoint.get(&hourglass).unwrap(), "8");
    assert_eq!((board.red.duty(), board.green.duty()), (1.0, 0.5));

    // 2 of 8 seconds left is 25%: running low
    for _ in 0..6 {
        board.hourglass.tick().unwrap();
    }
    assert_eq!(board.endpoint.get(&hourglass).unwrap(), "2");
    assert_eq!((board.red.duty(), board.green.duty()), (0.3, 0.3));
    assert!(board.screen.row(10).starts_with("Time: *****     "));

    board.hourglass.tick().unwrap();
    board.hourglass.tick().unwrap();
    assert_eq!(board.endpoint.get(&hourglass).unwrap(), "0");
    assert!(board.screen.row(10).starts_with("Time: EXPIRED"));
    assert!(board.screen.row(20).starts_with("Remain: NONE"));
    assert_eq!((board.red.duty(), board.green.duty()), (0.5, 1.0));
}

#[test]
fn test_lcd_commands_through_endpoint() {
    let board = board(0, false);
    let lcd = path("312/0/1");

    board
        .endpoint
        .put(&lcd, r#"{"cmd":"led","value":"green","state":1}"#)
        .unwrap();
    assert_eq!((board.red.duty(), board.green.duty()), (1.0, 0.5));

    board
        .endpoint
        .put(&lcd, r#"{"cmd":"lcd","value":"Bay 7 reserved"}"#)
        .unwrap();
    assert_eq!(board.endpoint.get(&lcd).unwrap().trim_end(), "Bay 7 reserved");

    let error = board.endpoint.put(&lcd, "{").unwrap_err();
    assert!(matches!(error, ConnectorError::BadRequest(_)));
    assert_eq!(error.code(), ResponseCode::BadRequest);
}

#[tokio::test(start_paused = true)]
async fn test_countdown_notifies_observers() {
    let board = board(5, true);
    let mut notifications = board.endpoint.subscribe();
    let (shutdown, rx) = watch::channel(false);

    let task = tokio::spawn(Arc::clone(&board.hourglass).run_countdown(
        Duration::from_secs(1),
        rx,
        Some(Arc::clone(&board.endpoint)),
    ));

    for expected in ["4", "3", "2"] {
        let notification = notifications.recv().await.unwrap();
        assert_eq!(notification.path, path("100/0/1"));
        assert_eq!(notification.value, expected);
    }

    shutdown.send(true).unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_countdown_without_observation_is_silent() {
    let board = board(5, false);
    let mut notifications = board.endpoint.subscribe();
    let (shutdown, rx) = watch::channel(false);

    let task = tokio::spawn(Arc::clone(&board.hourglass).run_countdown(
        Duration::from_secs(1),
        rx,
        Some(Arc::clone(&board.endpoint)),
    ));

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(board.hourglass.remaining(), 3);
    assert!(notifications.try_recv().is_err());

    shutdown.send(true).unwrap();
    task.await.unwrap();
}
