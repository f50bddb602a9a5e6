//! Eva core data models.
//!
//! This crate defines the parameter space, the values exchanged with the
//! remote optimizer and the codecs that move them across the socket.

#![warn(missing_docs)]

// Errors
mod error;

// Parameter space
mod descriptor;
mod value;

// Wire format
pub mod wire;
pub mod chromosome;
mod request;

// Re-exports
pub use error::{ConfigError, ProtocolError};

pub use descriptor::{ParameterDescriptor, ParameterKind, ParameterSpace, ValueType};
pub use value::{ParameterSink, ParameterStore, ParameterValue, ParameterValueSet};

pub use wire::{MessageKind, WireMessage, CONTINUE_TOKEN, TERMINATE_TOKEN};
pub use request::{describe, IntervalSlot, OptimizationRequest, ProblemEncoding, WireParam, DOUBLE_RANGE};
