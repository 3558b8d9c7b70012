//! Dish Controller
//!
//! Owns the two motor trackers, the connection state machine and the serial
//! worker. All state lives on the thread that drives the controller; the
//! worker only hands over [`WorkerEvent`]s through an unbounded channel,
//! which are applied by [`DishController::process_pending`],
//! [`DishController::next_event`] or [`DishController::wait_event`].

pub mod connection;

use crate::communication::worker::{SerialWorker, WorkerEvent};
use crate::communication::TransportOpener;
use crate::protocol::{decode, Command, Message};
use connection::{ConnectionMachine, Transition};
use dishkit_core::{
    Axis, ConnectionState, ConnectionStatus, DeviceError, DishEvent, DishListener,
    DishListenerHandle, EventDispatcher, ListenerRegistry, MotorState, OvercurrentLimits, Result,
    UsageError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

/// Controller for one two-axis rotor
pub struct DishController {
    /// Creates the transport for each connection attempt
    opener: Arc<dyn TransportOpener>,
    /// Azimuth tracker
    az: MotorState,
    /// Elevation tracker
    el: MotorState,
    /// Connection lifecycle
    connection: ConnectionMachine,
    /// Overcurrent thresholds sent during the init sequence
    limits: OvercurrentLimits,
    /// Worker for the current connection, if any
    worker: Option<SerialWorker>,
    events_tx: mpsc::UnboundedSender<WorkerEvent>,
    events_rx: mpsc::UnboundedReceiver<WorkerEvent>,
    /// Broadcast fan-out of notifications
    dispatcher: EventDispatcher,
    /// Synchronous listeners, called in registration order
    listeners: ListenerRegistry,
}

impl DishController {
    /// Create a disconnected controller
    pub fn new(opener: Arc<dyn TransportOpener>, limits: OvercurrentLimits) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            opener,
            az: MotorState::new(),
            el: MotorState::new(),
            connection: ConnectionMachine::new(),
            limits,
            worker: None,
            events_tx,
            events_rx,
            dispatcher: EventDispatcher::default(),
            listeners: ListenerRegistry::new(),
        }
    }

    /// Snapshot of one axis
    pub fn motor(&self, axis: Axis) -> MotorState {
        match axis {
            Axis::Az => self.az,
            Axis::El => self.el,
        }
    }

    /// Current connection status
    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    /// Endpoint of the current or pending connection
    pub fn endpoint(&self) -> Option<&str> {
        self.connection.endpoint()
    }

    /// Stored overcurrent limits
    pub fn overcurrent_limits(&self) -> OvercurrentLimits {
        self.limits
    }

    /// Subscribe to notifications through the broadcast dispatcher
    pub fn subscribe(&self) -> broadcast::Receiver<DishEvent> {
        self.dispatcher.subscribe()
    }

    /// Register a synchronous listener
    pub fn register_listener(&self, listener: Arc<dyn DishListener>) -> DishListenerHandle {
        self.listeners.register(listener)
    }

    /// Remove a listener
    pub fn unregister_listener(&self, handle: &DishListenerHandle) {
        self.listeners.unregister(handle);
    }

    /// Open `endpoint`
    ///
    /// Returns once the request is accepted. The outcome arrives later as a
    /// `ConnectionChanged` notification.
    pub fn connect(&mut self, endpoint: &str) -> Result<()> {
        let transition = self.connection.request_connect(endpoint)?;
        tracing::info!("Connecting to {}", endpoint);
        self.emit_transition(transition);

        match SerialWorker::spawn(self.opener.clone(), endpoint, self.events_tx.clone()) {
            Ok(worker) => self.worker = Some(worker),
            Err(err) => {
                tracing::error!("Failed to start serial worker: {}", err);
                if let Some(transition) = self.connection.on_connect_failed(err.to_string()) {
                    self.emit_transition(transition);
                }
            }
        }
        Ok(())
    }

    /// Close the link
    ///
    /// Sends `REPORT OFF`, then asks the worker to close. Completion arrives
    /// later as a `ConnectionChanged` notification.
    pub fn disconnect(&mut self) -> Result<()> {
        let transition = self.connection.request_disconnect()?;
        tracing::info!("Disconnecting");
        self.emit_transition(transition);

        if let Err(err) = self.send(Command::ReportOff) {
            tracing::warn!("Failed to send REPORT OFF: {}", err);
        }
        if let Some(worker) = &self.worker {
            worker.close();
        }
        Ok(())
    }

    /// Stop any motion in progress
    pub fn abort(&mut self) -> Result<()> {
        self.require_connected()?;
        self.send(Command::Abort)
    }

    /// Move to absolute angles
    pub fn goto(&mut self, az: f64, el: f64) -> Result<()> {
        let az = finite("azimuth", az)?;
        let el = finite("elevation", el)?;
        self.require_connected()?;
        self.send(Command::Goto { az, el })
    }

    /// Move relative to the last reported angles
    pub fn advance(&mut self, delta_az: f64, delta_el: f64) -> Result<()> {
        finite("azimuth offset", delta_az)?;
        finite("elevation offset", delta_el)?;
        self.require_connected()?;
        self.goto(self.az.angle() + delta_az, self.el.angle() + delta_el)
    }

    /// Move both axes at constant rates
    pub fn set_velocity(&mut self, az_rate: f64, el_rate: f64) -> Result<()> {
        let az_rate = finite("azimuth rate", az_rate)?;
        let el_rate = finite("elevation rate", el_rate)?;
        self.require_connected()?;
        self.send(Command::Velocity {
            az: az_rate,
            el: el_rate,
        })
    }

    /// Store new overcurrent limits, sending them now when connected
    ///
    /// Both limits must be finite and greater than zero.
    pub fn set_overcurrent_limits(&mut self, az: f64, el: f64) -> Result<()> {
        let az = positive("azimuth limit", az)?;
        let el = positive("elevation limit", el)?;
        self.limits = OvercurrentLimits::new(az, el);
        if self.connection.status().is_connected() {
            self.send_limits()?;
        }
        Ok(())
    }

    /// Decode and apply one raw line from the device
    pub fn on_raw_line(&mut self, raw: &[u8]) {
        match decode(raw) {
            Message::Report(report) => {
                let motor = match report.axis {
                    Axis::Az => &mut self.az,
                    Axis::El => &mut self.el,
                };
                let first_report = !motor.first_report_seen();
                match motor.apply_report(report.angle, report.current, report.status, report.reason)
                {
                    Ok(()) => {
                        let state = *motor;
                        self.emit(DishEvent::MotorChanged {
                            axis: report.axis,
                            state,
                            first_report,
                        });
                    }
                    Err(err) => {
                        tracing::warn!("Dropping {} report: {}", report.axis, err);
                        self.emit(DishEvent::Diagnostic(err.to_string()));
                    }
                }
            }
            Message::ErrorReport(text) => {
                let err = DeviceError(text);
                tracing::warn!("Device error: {}", err);
                self.emit(DishEvent::Diagnostic(err.0));
            }
            Message::Invalid(err) => {
                tracing::warn!("Invalid message: {}", err);
                self.emit(DishEvent::Diagnostic(err.to_string()));
            }
            Message::Info { subcommand, .. } => {
                tracing::debug!("Ignoring info message {}", subcommand);
            }
            Message::Discard => {
                tracing::debug!("Ignoring line: {}", String::from_utf8_lossy(raw));
            }
        }
    }

    /// Apply one worker event
    pub fn handle_worker_event(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Connected { endpoint } => {
                if let Some(transition) = self.connection.on_connected() {
                    tracing::info!("Connected to {}", endpoint);
                    self.emit_transition(transition);
                    self.run_init_sequence();
                }
            }
            WorkerEvent::ConnectFailed(err) => {
                if let Some(transition) = self.connection.on_connect_failed(err.to_string()) {
                    self.emit_transition(transition);
                }
                self.join_worker();
            }
            WorkerEvent::Line(line) => self.on_raw_line(&line),
            WorkerEvent::WriteFailed(err) => {
                self.emit(DishEvent::Diagnostic(err.to_string()));
            }
            WorkerEvent::Disconnected(reason) => {
                if let Some(transition) = self.connection.on_transport_closed(reason) {
                    tracing::info!("Disconnected: {}", transition.reason);
                    self.emit_transition(transition);
                }
                self.join_worker();
            }
        }
    }

    /// Wait for the next worker event without applying it
    ///
    /// Cancel safe, so it can sit in a `tokio::select!` next to other inputs.
    pub async fn recv_worker_event(&mut self) -> Option<WorkerEvent> {
        self.events_rx.recv().await
    }

    /// Wait for and apply the next worker event
    pub async fn next_event(&mut self) {
        if let Some(event) = self.events_rx.recv().await {
            self.handle_worker_event(event);
        }
    }

    /// Apply the next worker event if one arrives within `timeout`
    pub async fn wait_event(&mut self, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, self.events_rx.recv()).await {
            Ok(Some(event)) => {
                self.handle_worker_event(event);
                true
            }
            _ => false,
        }
    }

    /// Apply every worker event already queued, returning how many ran
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_worker_event(event);
            handled += 1;
        }
        handled
    }

    /// Stop reporting, close the worker and wait for it
    pub fn shutdown(&mut self) {
        match self.connection.status().state() {
            ConnectionState::Connected => {
                if let Err(err) = self.disconnect() {
                    tracing::warn!("Disconnect during shutdown failed: {}", err);
                }
            }
            ConnectionState::Connecting | ConnectionState::Disconnecting => {
                if let Some(worker) = &self.worker {
                    worker.close();
                }
            }
            ConnectionState::Disconnected => {}
        }

        if let Some(worker) = self.worker.as_mut() {
            worker.join();
        }
        self.process_pending();
        self.worker = None;
        tracing::info!("Dish controller shut down");
    }

    fn run_init_sequence(&mut self) {
        if let Err(err) = self.send(Command::ReportOn) {
            tracing::warn!("Failed to send REPORT ON: {}", err);
        }
        if let Err(err) = self.send_limits() {
            tracing::warn!("Failed to send overcurrent limits: {}", err);
        }
        self.az.reset();
        self.el.reset();
    }

    fn send_limits(&self) -> Result<()> {
        for axis in Axis::ALL {
            self.send(Command::Overcurrent {
                axis,
                limit: self.limits.for_axis(axis),
            })?;
        }
        Ok(())
    }

    fn send(&self, command: Command) -> Result<()> {
        let worker = self.worker.as_ref().ok_or(UsageError::NotConnected)?;
        tracing::debug!("Sending {}", command);
        worker.write(command.encode())?;
        Ok(())
    }

    fn require_connected(&self) -> Result<()> {
        if !self.connection.status().is_connected() {
            return Err(UsageError::NotConnected.into());
        }
        Ok(())
    }

    fn join_worker(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.join();
        }
    }

    fn emit_transition(&self, transition: Transition) {
        self.emit(DishEvent::ConnectionChanged {
            status: transition.status,
            reason: transition.reason,
        });
    }

    fn emit(&self, event: DishEvent) {
        self.listeners.notify(&event);
        self.dispatcher.publish(event);
    }
}

fn finite(name: &'static str, value: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(invalid(name, value));
    }
    Ok(value)
}

fn positive(name: &'static str, value: f64) -> Result<f64> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(name, value));
    }
    Ok(value)
}

fn invalid(name: &'static str, value: f64) -> dishkit_core::Error {
    UsageError::InvalidValue {
        name,
        value: value.to_string(),
    }
    .into()
}
