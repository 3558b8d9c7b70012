//! Rotor line protocol
//!
//! One message per `\n`-terminated line, fields separated by `:`.
//! Incoming lines are reports (`I:REPORT[AZ]:...`) or device errors (`E:...`);
//! outgoing lines are plain-text commands such as `GOTO 10 20`.

pub mod command_creator;
pub mod response_parser;

pub use command_creator::Command;
pub use response_parser::{decode, AxisReport, Message};
