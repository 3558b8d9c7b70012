//! Serial worker thread
//!
//! One worker thread exists per connection attempt. It opens the transport,
//! then alternates between servicing write/close requests and bounded reads.
//! Every received line is forwarded as a [`WorkerEvent::Line`] in arrival
//! order. When the link ends for any reason the worker closes the transport
//! and sends exactly one [`WorkerEvent::Disconnected`].

use super::{CancelToken, ReadOutcome, Transport, TransportOpener};
use dishkit_core::ConnectionError;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::{self, error::TryRecvError};

/// Reason reported when the user asked for the disconnect
pub const REASON_USER: &str = "Disconnected by user";

/// Reason reported when the peer went away
pub const REASON_LOST: &str = "Connection lost";

/// Worker to controller messages
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// Transport opened
    Connected {
        /// Endpoint that was opened
        endpoint: String,
    },
    /// Transport could not be opened; the worker has exited
    ConnectFailed(ConnectionError),
    /// One raw line, terminator stripped
    Line(Vec<u8>),
    /// A queued write failed; the link stays up
    WriteFailed(ConnectionError),
    /// Transport closed; the worker has exited
    Disconnected(String),
}

/// Controller to worker messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerRequest {
    /// Write these bytes
    Write(Vec<u8>),
    /// Close the transport and exit
    Close,
}

/// Handle to a running serial worker thread
pub struct SerialWorker {
    requests: mpsc::UnboundedSender<WorkerRequest>,
    cancel: CancelToken,
    thread: Option<JoinHandle<()>>,
}

impl SerialWorker {
    /// Spawn a worker that opens `endpoint` and reports to `events`
    pub fn spawn(
        opener: Arc<dyn TransportOpener>,
        endpoint: impl Into<String>,
        events: mpsc::UnboundedSender<WorkerEvent>,
    ) -> Result<Self, ConnectionError> {
        let endpoint = endpoint.into();
        let (requests, request_rx) = mpsc::unbounded_channel();
        let cancel = CancelToken::new();

        let worker_cancel = cancel.clone();
        let thread = thread::Builder::new()
            .name("dish-serial".to_string())
            .spawn(move || run(opener, endpoint, request_rx, worker_cancel, events))?;

        Ok(Self {
            requests,
            cancel,
            thread: Some(thread),
        })
    }

    /// Queue bytes for the transport
    pub fn write(&self, data: Vec<u8>) -> Result<(), ConnectionError> {
        self.requests
            .send(WorkerRequest::Write(data))
            .map_err(|_| ConnectionError::WriteFailed {
                reason: "serial worker has stopped".to_string(),
            })
    }

    /// Unblock the pending read; the worker exits at its next timeout tick
    pub fn cancel_pending_io(&self) {
        self.cancel.cancel();
    }

    /// Ask the worker to flush queued writes, close the transport and exit
    pub fn close(&self) {
        // Close is queued behind any pending writes.
        let _ = self.requests.send(WorkerRequest::Close);
        self.cancel_pending_io();
    }

    /// Whether the worker thread has exited
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Wait for the worker thread to exit
    pub fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Serial worker thread panicked");
            }
        }
    }
}

impl Drop for SerialWorker {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.close();
            self.join();
        }
    }
}

fn run(
    opener: Arc<dyn TransportOpener>,
    endpoint: String,
    mut requests: mpsc::UnboundedReceiver<WorkerRequest>,
    cancel: CancelToken,
    events: mpsc::UnboundedSender<WorkerEvent>,
) {
    let mut transport = match opener.open(&endpoint) {
        Ok(transport) => transport,
        Err(err) => {
            tracing::warn!("Connection to {} failed: {}", endpoint, err);
            let _ = events.send(WorkerEvent::ConnectFailed(err));
            return;
        }
    };

    tracing::info!("Serial worker attached to {}", transport.name());
    if events
        .send(WorkerEvent::Connected {
            endpoint: endpoint.clone(),
        })
        .is_err()
    {
        cancel.cancel();
    }

    let reason = loop {
        service_requests(transport.as_mut(), &mut requests, &cancel, &events);

        if cancel.is_cancelled() {
            break REASON_USER.to_string();
        }

        match transport.read_line() {
            Ok(ReadOutcome::Line(line)) => {
                tracing::trace!("rx: {}", String::from_utf8_lossy(&line));
                if events.send(WorkerEvent::Line(line)).is_err() {
                    cancel.cancel();
                }
            }
            Ok(ReadOutcome::Idle) => {}
            Ok(ReadOutcome::Closed) => {
                break if cancel.is_cancelled() {
                    REASON_USER.to_string()
                } else {
                    REASON_LOST.to_string()
                };
            }
            Err(err) => {
                if cancel.is_cancelled() {
                    break REASON_USER.to_string();
                }
                tracing::error!("Read from {} failed: {}", endpoint, err);
                break err.to_string();
            }
        }
    };

    // Writes queued just before the close request still go out.
    service_requests(transport.as_mut(), &mut requests, &cancel, &events);

    if let Err(err) = transport.close() {
        tracing::warn!("Closing {} failed: {}", endpoint, err);
    }

    tracing::info!("Serial worker for {} stopped: {}", endpoint, reason);
    let _ = events.send(WorkerEvent::Disconnected(reason));
}

fn service_requests(
    transport: &mut dyn Transport,
    requests: &mut mpsc::UnboundedReceiver<WorkerRequest>,
    cancel: &CancelToken,
    events: &mpsc::UnboundedSender<WorkerEvent>,
) {
    loop {
        match requests.try_recv() {
            Ok(WorkerRequest::Write(data)) => {
                tracing::trace!("tx: {}", String::from_utf8_lossy(&data).trim_end());
                if let Err(err) = transport.write(&data) {
                    tracing::warn!("Write to {} failed: {}", transport.name(), err);
                    let _ = events.send(WorkerEvent::WriteFailed(err));
                }
            }
            Ok(WorkerRequest::Close) => cancel.cancel(),
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => {
                cancel.cancel();
                break;
            }
        }
    }
}
