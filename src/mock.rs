//! Recording stand-ins for the device stack, shared by module tests.

extern crate std;

use std::vec::Vec;

use usb_device::control::{Recipient, Request, RequestType};
use usb_device::endpoint::EndpointAddress;
use usb_device::{UsbDirection, UsbError};

use crate::bus::{AudioHandler, ControlPipe, TransferEngine};
use crate::descriptor::EndpointDescriptor;

pub fn endpoint(addr: u8, size: u16) -> EndpointDescriptor {
    EndpointDescriptor {
        address: EndpointAddress::from(addr),
        attributes: 0x05,
        max_packet_size_raw: size,
        interval: 1,
    }
}

#[derive(Default, Debug)]
pub struct MockEngine {
    pub opened: Vec<EndpointDescriptor>,
    pub closed: Vec<EndpointAddress>,
    pub sent: Vec<(EndpointAddress, Vec<u8>)>,
    pub armed: Vec<(EndpointAddress, usize)>,
    pub busy: Vec<EndpointAddress>,
    pub received: Vec<(EndpointAddress, Vec<u8>)>,
    pub refuse_open: bool,
    pub refuse_submit: bool,
}

impl MockEngine {
    /// Finish the outstanding transfer on `ep`
    pub fn complete(&mut self, ep: EndpointAddress) {
        self.busy.retain(|busy| *busy != ep);
    }

    /// Finish the armed OUT transfer on `ep` with `data` from the host
    pub fn deliver(&mut self, ep: EndpointAddress, data: &[u8]) {
        self.complete(ep);
        self.received.push((ep, Vec::from(data)));
    }
}

impl TransferEngine for MockEngine {
    fn open(&mut self, ep: &EndpointDescriptor) -> Result<(), UsbError> {
        if self.refuse_open {
            return Err(UsbError::InvalidEndpoint);
        }
        self.opened.push(*ep);
        Ok(())
    }

    fn close(&mut self, ep: EndpointAddress) {
        self.complete(ep);
        self.closed.push(ep);
    }

    fn submit_in(&mut self, ep: EndpointAddress, data: &[u8]) -> Result<(), UsbError> {
        if self.refuse_submit {
            return Err(UsbError::WouldBlock);
        }
        self.busy.push(ep);
        self.sent.push((ep, Vec::from(data)));
        Ok(())
    }

    fn submit_out(&mut self, ep: EndpointAddress, len: usize) -> Result<(), UsbError> {
        if self.refuse_submit {
            return Err(UsbError::WouldBlock);
        }
        self.busy.push(ep);
        self.armed.push((ep, len));
        Ok(())
    }

    fn read(&mut self, ep: EndpointAddress, buf: &mut [u8]) -> Result<usize, UsbError> {
        let pos = self
            .received
            .iter()
            .position(|(addr, _)| *addr == ep)
            .ok_or(UsbError::WouldBlock)?;
        let (_, data) = self.received.remove(pos);
        let count = data.len().min(buf.len());
        buf[..count].copy_from_slice(&data[..count]);
        Ok(count)
    }

    fn busy(&self, ep: EndpointAddress) -> bool {
        self.busy.contains(&ep)
    }
}

#[derive(Default, Debug)]
pub struct MockPipe {
    pub responses: Vec<Vec<u8>>,
    pub statuses: usize,
    pub out_data: Vec<u8>,
}

impl ControlPipe for MockPipe {
    fn respond(&mut self, _req: &Request, data: &[u8]) -> Result<(), UsbError> {
        self.responses.push(Vec::from(data));
        Ok(())
    }

    fn status(&mut self, _req: &Request) -> Result<(), UsbError> {
        self.statuses += 1;
        Ok(())
    }

    fn data(&self) -> &[u8] {
        &self.out_data
    }
}

#[derive(Default, Debug)]
pub struct MockHandler {
    pub connected: Vec<(u8, UsbDirection, u16)>,
    pub rx: Vec<u8>,
    pub tx: Vec<u8>,
    pub seen: usize,
}

impl AudioHandler for MockHandler {
    fn interface_connected(&mut self, slot: u8, dir: UsbDirection, packet_size: u16) {
        self.connected.push((slot, dir, packet_size));
    }

    fn rx(&mut self, slot: u8) {
        self.rx.push(slot);
    }

    fn tx_complete(&mut self, slot: u8) {
        self.tx.push(slot);
    }

    fn control_request_seen(&mut self, _req: &Request) {
        self.seen += 1;
    }
}

pub fn request(
    direction: UsbDirection,
    request_type: RequestType,
    recipient: Recipient,
    request: u8,
    value: u16,
    index: u16,
) -> Request {
    Request {
        direction,
        request_type,
        recipient,
        request,
        value,
        index,
        length: 64,
    }
}

/// Builds configuration descriptor streams
#[derive(Default)]
pub struct Descriptors {
    bytes: Vec<u8>,
}

impl Descriptors {
    pub fn new() -> Self {
        Self::default()
    }

    fn interface(mut self, number: u8, alt: u8, sub_class: u8, endpoints: u8) -> Self {
        self.bytes
            .extend_from_slice(&[9, 0x04, number, alt, endpoints, 0x01, sub_class, 0x20, 0]);
        self
    }

    /// Audio Control v2 interface
    pub fn control(self, number: u8) -> Self {
        self.interface(number, 0, 0x01, 0)
    }

    /// Audio Streaming v2 interface alternate setting
    pub fn streaming(self, number: u8, alt: u8, endpoints: u8) -> Self {
        self.interface(number, alt, 0x02, endpoints)
    }

    /// Class-specific interface descriptor of `len` bytes
    pub fn cs_interface(mut self, len: u8) -> Self {
        self.bytes.push(len);
        self.bytes.push(0x24);
        self.bytes.extend(core::iter::repeat(0x01).take(len as usize - 2));
        self
    }

    pub fn endpoint(mut self, addr: u8, size: u16) -> Self {
        let [lo, hi] = size.to_le_bytes();
        self.bytes.extend_from_slice(&[7, 0x05, addr, 0x05, lo, hi, 1]);
        self
    }

    pub fn cs_endpoint(mut self) -> Self {
        self.bytes.extend_from_slice(&[8, 0x25, 0x01, 0, 0, 0, 0, 0]);
        self
    }

    pub fn raw(mut self, raw: &[u8]) -> Self {
        self.bytes.extend_from_slice(raw);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}
