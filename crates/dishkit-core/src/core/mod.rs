//! Notification plumbing between the controller and presentation layers

pub mod event;
pub mod listener;
