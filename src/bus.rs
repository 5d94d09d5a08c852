//! Seams to the device controller, the control pipe and the application.

use usb_device::control::Request;
use usb_device::endpoint::EndpointAddress;
use usb_device::{UsbDirection, UsbError};

use crate::descriptor::EndpointDescriptor;

/// Completion status reported with a finished transfer
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferResult {
    Success,
    Failed,
    Stalled,
}

/// Device controller endpoint engine.
///
/// Transfers complete asynchronously; the device stack reports each
/// completion through [`crate::AudioFunction::transfer_complete`].
pub trait TransferEngine {
    /// Configure and enable an endpoint
    fn open(&mut self, ep: &EndpointDescriptor) -> Result<(), UsbError>;

    /// Disable an endpoint opened earlier
    fn close(&mut self, _ep: EndpointAddress) {}

    /// Queue one IN packet; the engine copies `data` before returning
    fn submit_in(&mut self, ep: EndpointAddress, data: &[u8]) -> Result<(), UsbError>;

    /// Arm reception of one OUT packet of at most `len` bytes
    fn submit_out(&mut self, ep: EndpointAddress, len: usize) -> Result<(), UsbError>;

    /// Fetch the payload of a completed OUT transfer
    fn read(&mut self, ep: EndpointAddress, buf: &mut [u8]) -> Result<usize, UsbError>;

    /// True while a transfer is outstanding on `ep`
    fn busy(&self, ep: EndpointAddress) -> bool;
}

/// Control endpoint data/status stages
pub trait ControlPipe {
    /// Send a data stage for an IN request
    fn respond(&mut self, req: &Request, data: &[u8]) -> Result<(), UsbError>;

    /// Send a zero-length status stage
    fn status(&mut self, req: &Request) -> Result<(), UsbError>;

    /// Data stage received with an OUT request
    fn data(&self) -> &[u8] {
        &[]
    }
}

/// Application callbacks, keyed by streaming interface slot
pub trait AudioHandler {
    /// Host selected an alternate setting with an endpoint
    fn interface_connected(&mut self, _slot: u8, _dir: UsbDirection, _packet_size: u16) {}

    /// Received bytes are waiting in the slot's buffer
    fn rx(&mut self, _slot: u8) {}

    /// An IN transfer finished
    fn tx_complete(&mut self, _slot: u8) {}

    /// Every control request addressed to the function passes here first
    fn control_request_seen(&mut self, _req: &Request) {}
}

/// Handler that ignores every notification
pub struct NoopHandler;

impl AudioHandler for NoopHandler {}
