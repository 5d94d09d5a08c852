//! Device-side USB Audio Class 2 streaming function.
//!
//! Discovers the function's interfaces from its configuration descriptors,
//! follows the host's alternate setting selections, moves application bytes
//! to and from streaming endpoints and answers clock source control requests.

#![no_std]

#[cfg(feature = "cortex-m")]
use cortex_m as _;

pub mod bus;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod fifo;
pub mod interface;
pub mod parser;
pub mod topology;

mod control;
mod function;
mod scheduler;

#[cfg(test)]
mod mock;

pub use bus::{AudioHandler, ControlPipe, NoopHandler, TransferEngine, TransferResult};
pub use config::AudioConfig;
pub use descriptor::EndpointDescriptor;
pub use error::{AudioError, Result, UsbFault};
pub use fifo::StreamBuffer;
pub use function::AudioFunction;
pub use interface::{InterfaceConfig, InterfaceState, ALT_NOT_ACTIVE};
pub use topology::{ClockSource, Entity, Range, Topology, UnitControl};
