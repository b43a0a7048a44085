//! Core types shared by the server strategies and the client.
//!
//! This module contains the request mode, the wire units written by each
//! strategy, and the decoded events and outcomes the client works with.

pub mod events;
pub mod mode;
pub mod wire;

pub use events::{
    HeartbeatEvent, OperationOutcome, ProgressEvent, RequestStatus, StreamEvent,
};
pub use mode::Mode;
pub use wire::{Completion, RawUnit, StatusUnit, TypedUnit};
