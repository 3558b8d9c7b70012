//! End-to-end controller tests against the scripted mock device

use dishkit_communication::{DishController, MockDevice, MockOpener};
use dishkit_core::{
    Axis, ConnectionState, DishEvent, DishListener, Error, MotorState, MotorStatus,
    OvercurrentLimits, StopReason, UsageError,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

fn controller(device: &MockDevice) -> DishController {
    DishController::new(
        Arc::new(MockOpener::new(device.clone())),
        OvercurrentLimits::default(),
    )
}

/// Apply worker events until none arrive for a while
async fn settle(controller: &mut DishController) {
    while controller.wait_event(Duration::from_millis(200)).await {}
}

fn drain(rx: &mut broadcast::Receiver<DishEvent>) -> Vec<DishEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn connection_changes(events: &[DishEvent]) -> Vec<(ConnectionState, bool, String)> {
    events
        .iter()
        .filter_map(|e| match e {
            DishEvent::ConnectionChanged { status, reason } => {
                Some((status.state(), status.is_inconsistent(), reason.clone()))
            }
            _ => None,
        })
        .collect()
}

async fn connected(device: &MockDevice) -> DishController {
    let mut controller = controller(device);
    controller.connect("/dev/ttyUSB0").unwrap();
    settle(&mut controller).await;
    assert_eq!(controller.connection_status().state(), ConnectionState::Connected);
    device.clear_written();
    controller
}

#[tokio::test]
async fn test_connect_runs_init_sequence() {
    let device = MockDevice::new();
    let mut controller = controller(&device);
    let mut rx = controller.subscribe();

    controller.connect("/dev/ttyUSB0").unwrap();
    assert_eq!(controller.connection_status().state(), ConnectionState::Connecting);
    assert!(controller.connection_status().is_inconsistent());

    settle(&mut controller).await;

    assert_eq!(
        connection_changes(&drain(&mut rx)),
        vec![
            (ConnectionState::Connecting, true, "Connecting...".to_string()),
            (ConnectionState::Connected, false, "Connected".to_string()),
        ]
    );
    assert_eq!(
        device.written(),
        vec![
            "REPORT ON".to_string(),
            "OVERCURRENT AZ 1.5".to_string(),
            "OVERCURRENT EL 1.5".to_string(),
        ]
    );
    assert_eq!(device.opened(), vec!["/dev/ttyUSB0".to_string()]);
    assert!(controller.motor(Axis::Az).is_fault());
    assert!(controller.motor(Axis::El).is_fault());

    controller.shutdown();
}

#[tokio::test]
async fn test_report_updates_motor() {
    let device = MockDevice::new();
    let mut controller = connected(&device).await;
    let mut rx = controller.subscribe();

    device.push_line("I:REPORT[AZ]:12.5:1.2:2:0");
    settle(&mut controller).await;

    let az = controller.motor(Axis::Az);
    assert_eq!(az.angle(), 12.5);
    assert!((az.current() - 0.12).abs() < 1e-9);
    assert_eq!(az.status(), MotorStatus::Running);
    assert_eq!(az.reason(), StopReason::Ok);
    assert!(!az.is_fault());
    assert!(controller.motor(Axis::El).is_fault());

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0],
        DishEvent::MotorChanged {
            axis: Axis::Az,
            first_report: true,
            ..
        }
    ));

    device.push_line("I:REPORT[AZ]:13:1.2:2:0");
    settle(&mut controller).await;
    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0],
        DishEvent::MotorChanged {
            first_report: false,
            ..
        }
    ));

    controller.shutdown();
}

#[tokio::test]
async fn test_device_error_is_diagnostic() {
    let device = MockDevice::new();
    let mut controller = connected(&device).await;
    let mut rx = controller.subscribe();
    let before = (controller.motor(Axis::Az), controller.connection_status());

    device.push_line("E:bad checksum");
    settle(&mut controller).await;

    assert_eq!(
        drain(&mut rx),
        vec![DishEvent::Diagnostic("bad checksum".to_string())]
    );
    assert_eq!(
        (controller.motor(Axis::Az), controller.connection_status()),
        before
    );

    controller.shutdown();
}

#[tokio::test]
async fn test_bad_reports_are_diagnostics() {
    let device = MockDevice::new();
    let mut controller = connected(&device).await;
    let mut rx = controller.subscribe();

    device.push_line("I:REPORT[EL]:abc:0.1:0:0");
    device.push_line("I:REPORT[EL]:10:0.1:9:0");
    device.push_line("I:REPORT[EL]:10:0.1");
    device.push_line("garbage");
    device.push_line("X:REPORT[EL]:10:0.1:0:0");
    settle(&mut controller).await;

    let events = drain(&mut rx);
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| matches!(e, DishEvent::Diagnostic(_))));
    assert_eq!(controller.motor(Axis::El), MotorState::new());

    controller.shutdown();
}

#[tokio::test]
async fn test_non_finite_report_leaves_tracker_usable() {
    let device = MockDevice::new();
    let mut controller = connected(&device).await;
    let mut rx = controller.subscribe();

    device.push_line("I:REPORT[AZ]:10:1.0:0:0");
    settle(&mut controller).await;
    let before = controller.motor(Axis::Az);

    device.push_line("I:REPORT[AZ]:inf:nan:0:0");
    settle(&mut controller).await;
    assert_eq!(controller.motor(Axis::Az), before);

    for _ in 0..50 {
        device.push_line("I:REPORT[AZ]:10:1.0:0:0");
    }
    settle(&mut controller).await;

    let az = controller.motor(Axis::Az);
    assert!(az.current().is_finite());
    assert!((az.current() - 1.0).abs() < 0.01);
    assert!(!az.is_fault());

    let events = drain(&mut rx);
    let diagnostics = events
        .iter()
        .filter(|e| matches!(e, DishEvent::Diagnostic(_)))
        .count();
    let motor_changes = events
        .iter()
        .filter(|e| matches!(e, DishEvent::MotorChanged { .. }))
        .count();
    assert_eq!(diagnostics, 1);
    assert_eq!(motor_changes, 51);

    controller.shutdown();
}

#[tokio::test]
async fn test_reconnect_seeds_first_report_again() {
    let device = MockDevice::new();
    let mut controller = connected(&device).await;

    device.push_line("I:REPORT[EL]:45:0.5:3:0");
    device.push_line("I:REPORT[EL]:45:0.5:3:0");
    settle(&mut controller).await;
    assert!(controller.motor(Axis::El).first_report_seen());

    controller.disconnect().unwrap();
    settle(&mut controller).await;
    assert_eq!(controller.connection_status().state(), ConnectionState::Disconnected);

    controller.connect("/dev/ttyUSB0").unwrap();
    settle(&mut controller).await;
    assert_eq!(controller.connection_status().state(), ConnectionState::Connected);
    let el = controller.motor(Axis::El);
    assert!(!el.first_report_seen());
    assert!(el.is_fault());
    assert_eq!(el.angle(), 45.0);

    let mut rx = controller.subscribe();
    device.push_line("I:REPORT[EL]:46:0.5:2:0");
    device.push_line("I:REPORT[EL]:47:0.5:2:0");
    settle(&mut controller).await;

    let seeds: Vec<bool> = drain(&mut rx)
        .iter()
        .filter_map(|e| match e {
            DishEvent::MotorChanged {
                axis: Axis::El,
                first_report,
                ..
            } => Some(*first_report),
            _ => None,
        })
        .collect();
    assert_eq!(seeds, vec![true, false]);
    assert!((controller.motor(Axis::El).current() - 0.095).abs() < 1e-9);

    controller.shutdown();
}

#[tokio::test]
async fn test_open_failure_reports_reason() {
    let device = MockDevice::new();
    device.fail_next_open("No such file or directory");
    let mut controller = controller(&device);
    let mut rx = controller.subscribe();

    controller.connect("/dev/ttyUSB7").unwrap();
    settle(&mut controller).await;

    let changes = connection_changes(&drain(&mut rx));
    assert_eq!(changes.len(), 2);
    assert_eq!(
        changes[1],
        (
            ConnectionState::Disconnected,
            false,
            "Failed to connect to /dev/ttyUSB7: No such file or directory".to_string()
        )
    );
    assert!(device.written().is_empty());

    // The controller can try again afterwards.
    controller.connect("/dev/ttyUSB7").unwrap();
    settle(&mut controller).await;
    assert!(controller.connection_status().is_connected());
    controller.shutdown();
}

#[tokio::test]
async fn test_hangup_notifies_once() {
    let device = MockDevice::new();
    let mut controller = connected(&device).await;
    let mut rx = controller.subscribe();

    device.hang_up();
    settle(&mut controller).await;

    assert_eq!(
        connection_changes(&drain(&mut rx)),
        vec![(
            ConnectionState::Disconnected,
            false,
            "Connection lost".to_string()
        )]
    );
    assert_eq!(device.close_count(), 1);

    controller.shutdown();
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_hangup_while_disconnecting_notifies_once() {
    let device = MockDevice::new();
    let mut controller = connected(&device).await;
    let mut rx = controller.subscribe();

    controller.disconnect().unwrap();
    device.hang_up();
    settle(&mut controller).await;

    let changes = connection_changes(&drain(&mut rx));
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0].0, ConnectionState::Disconnecting);
    assert_eq!(changes[1].0, ConnectionState::Disconnected);
    assert!(!changes[1].1);
    assert_eq!(device.close_count(), 1);
}

#[tokio::test]
async fn test_disconnect_sends_report_off() {
    let device = MockDevice::new();
    let mut controller = connected(&device).await;

    controller.disconnect().unwrap();
    settle(&mut controller).await;

    assert_eq!(device.written(), vec!["REPORT OFF".to_string()]);
    assert_eq!(controller.connection_status().state(), ConnectionState::Disconnected);
    assert_eq!(controller.endpoint(), None);
}

#[tokio::test]
async fn test_advance_matches_goto() {
    let device = MockDevice::new();
    let mut controller = connected(&device).await;

    device.push_line("I:REPORT[AZ]:10:0:0:0");
    device.push_line("I:REPORT[EL]:20:0:0:0");
    settle(&mut controller).await;

    controller.advance(1.5, -2.0).unwrap();
    controller.goto(11.5, 18.0).unwrap();
    settle(&mut controller).await;

    let written = device.written();
    assert_eq!(written.len(), 2);
    assert_eq!(written[0], written[1]);
    assert_eq!(written[0], "GOTO 11.5 18");

    controller.shutdown();
}

#[tokio::test]
async fn test_motion_commands() {
    let device = MockDevice::new();
    let mut controller = connected(&device).await;

    controller.set_velocity(-0.5, 2.0).unwrap();
    controller.abort().unwrap();
    controller.set_overcurrent_limits(2.0, 0.75).unwrap();
    settle(&mut controller).await;

    assert_eq!(
        device.written(),
        vec![
            "VH -0.5 2".to_string(),
            "ABORT".to_string(),
            "OVERCURRENT AZ 2".to_string(),
            "OVERCURRENT EL 0.75".to_string(),
        ]
    );
    assert_eq!(controller.overcurrent_limits(), OvercurrentLimits::new(2.0, 0.75));

    controller.shutdown();
}

#[tokio::test]
async fn test_usage_errors() {
    let device = MockDevice::new();
    let mut controller = controller(&device);
    let mut rx = controller.subscribe();

    assert!(matches!(
        controller.goto(1.0, 2.0),
        Err(Error::Usage(UsageError::NotConnected))
    ));
    assert!(matches!(
        controller.abort(),
        Err(Error::Usage(UsageError::NotConnected))
    ));
    assert!(matches!(
        controller.disconnect(),
        Err(Error::Usage(UsageError::AlreadyDisconnected))
    ));

    // Limits are stored even while disconnected.
    controller.set_overcurrent_limits(1.0, 1.0).unwrap();
    assert!(drain(&mut rx).is_empty());

    controller.connect("dev0").unwrap();
    drain(&mut rx);
    assert!(matches!(
        controller.connect("dev0"),
        Err(Error::Usage(UsageError::RequestPending { .. }))
    ));
    assert!(matches!(
        controller.set_velocity(1.0, 1.0),
        Err(Error::Usage(UsageError::NotConnected))
    ));
    assert!(drain(&mut rx).is_empty());

    settle(&mut controller).await;
    assert!(matches!(
        controller.connect("dev0"),
        Err(Error::Usage(UsageError::AlreadyConnected))
    ));
    assert_eq!(
        device.written()[1..].to_vec(),
        vec!["OVERCURRENT AZ 1".to_string(), "OVERCURRENT EL 1".to_string()]
    );

    controller.shutdown();
}

#[tokio::test]
async fn test_non_finite_arguments_rejected() {
    let device = MockDevice::new();
    let mut controller = connected(&device).await;
    let mut rx = controller.subscribe();

    let invalid = |result: dishkit_core::Result<()>| {
        matches!(result, Err(Error::Usage(UsageError::InvalidValue { .. })))
    };
    assert!(invalid(controller.goto(f64::INFINITY, 10.0)));
    assert!(invalid(controller.goto(10.0, f64::NAN)));
    assert!(invalid(controller.advance(f64::NAN, 0.0)));
    assert!(invalid(controller.advance(0.0, f64::NEG_INFINITY)));
    assert!(invalid(controller.set_velocity(f64::NAN, 1.0)));
    assert!(invalid(controller.set_velocity(1.0, f64::INFINITY)));
    assert!(invalid(controller.set_overcurrent_limits(f64::NAN, 1.0)));
    assert!(invalid(controller.set_overcurrent_limits(1.0, 0.0)));
    assert!(invalid(controller.set_overcurrent_limits(-2.0, 1.0)));
    settle(&mut controller).await;

    assert!(device.written().is_empty());
    assert!(drain(&mut rx).is_empty());
    assert_eq!(controller.overcurrent_limits(), OvercurrentLimits::default());

    controller.goto(10.0, 20.0).unwrap();
    settle(&mut controller).await;
    assert_eq!(device.written(), vec!["GOTO 10 20".to_string()]);

    controller.shutdown();
}

#[tokio::test]
async fn test_write_failure_is_diagnostic() {
    let device = MockDevice::new();
    let mut controller = connected(&device).await;
    let mut rx = controller.subscribe();

    device.fail_writes(Some("unplugged".to_string()));
    controller.abort().unwrap();
    settle(&mut controller).await;

    assert_eq!(
        drain(&mut rx),
        vec![DishEvent::Diagnostic("Write failed: unplugged".to_string())]
    );
    assert!(controller.connection_status().is_connected());

    device.fail_writes(None);
    controller.shutdown();
}

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<String>>,
}

impl DishListener for Recorder {
    fn on_connection_changed(&self, status: dishkit_core::ConnectionStatus, reason: &str) {
        self.calls.lock().push(format!("{}: {}", status, reason));
    }

    fn on_motor_changed(&self, axis: Axis, state: &MotorState, first_report: bool) {
        self.calls
            .lock()
            .push(format!("{} {} {}", axis, state.angle(), first_report));
    }
}

#[tokio::test]
async fn test_listeners_called_in_order() {
    let device = MockDevice::new();
    let mut controller = controller(&device);
    let recorder = Arc::new(Recorder::default());
    let handle = controller.register_listener(recorder.clone());

    controller.connect("dev0").unwrap();
    settle(&mut controller).await;
    device.push_line("I:REPORT[EL]:45:0.3:3:0");
    settle(&mut controller).await;

    controller.unregister_listener(&handle);
    controller.shutdown();

    assert_eq!(
        *recorder.calls.lock(),
        vec![
            "Connecting: Connecting...".to_string(),
            "Connected: Connected".to_string(),
            "EL 45 true".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_shutdown_sends_report_off() {
    let device = MockDevice::new();
    let mut controller = connected(&device).await;
    let mut rx = controller.subscribe();

    controller.shutdown();

    assert_eq!(device.written(), vec!["REPORT OFF".to_string()]);
    assert_eq!(device.close_count(), 1);
    assert_eq!(
        connection_changes(&drain(&mut rx)),
        vec![
            (ConnectionState::Disconnecting, true, "Disconnecting...".to_string()),
            (
                ConnectionState::Disconnected,
                false,
                "Disconnected by user".to_string()
            ),
        ]
    );
}
