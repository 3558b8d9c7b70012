//! # DishKit Communication
//!
//! Everything between the rotor's serial line and the presentation layer:
//! the colon-delimited line protocol, the byte transports, the serial worker
//! thread, and the dish controller that ties them to the motor trackers.

pub mod communication;
pub mod controller;
pub mod protocol;

pub use communication::{
    mock::{MockDevice, MockOpener},
    serial::{list_ports, SerialOpener, SerialPortInfo, SerialTransport},
    worker::{SerialWorker, WorkerEvent, WorkerRequest},
    CancelToken, ReadOutcome, Transport, TransportOpener,
};

pub use controller::{
    connection::{ConnectionMachine, Transition},
    DishController,
};

pub use protocol::{decode, AxisReport, Command, Message};
