//! Standard and class-specific descriptor views over a raw configuration stream.
//!
//! The stream comes from the device stack and is not trusted: every view is
//! built from a bounds-checked slice, never from a pointer cast.

use core::convert::TryFrom;

use num_enum::TryFromPrimitive;
use usb_device::endpoint::{EndpointAddress, EndpointType};
use usb_device::UsbDirection;

use crate::error::{AudioError, Result};

pub const USB_AUDIO_CLASS: u8 = 0x01;

/// Descriptor types found in a configuration descriptor (cf §9.4 of USB 2.0)
#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DescriptorType {
    Device = 0x01,
    Configuration = 0x02,
    String = 0x03,
    Interface = 0x04,
    Endpoint = 0x05,
    InterfaceAssociation = 0x0B,
    CsInterface = 0x24,
    CsEndpoint = 0x25,
}

/// Audio interface subclass codes
#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AudioSubclass {
    Control = 0x01,
    Streaming = 0x02,
    MidiStreaming = 0x03,
}

/// Audio interface protocol codes
#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AudioProtocol {
    V1 = 0x00,
    V2 = 0x20,
    V3 = 0x30,
}

pub const INTERFACE_DESCRIPTOR_LEN: usize = 9;
pub const ENDPOINT_DESCRIPTOR_LEN: usize = 7;

/// Standard interface descriptor
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterfaceDescriptor {
    pub interface_number: u8,
    pub alternate_setting: u8,
    pub num_endpoints: u8,
    pub class: u8,
    pub sub_class: u8,
    pub protocol: u8,
}

impl InterfaceDescriptor {
    pub fn parse(raw: &[u8]) -> Option<Self> {
        if raw.len() < INTERFACE_DESCRIPTOR_LEN || raw[1] != DescriptorType::Interface as u8 {
            return None;
        }
        Some(InterfaceDescriptor {
            interface_number: raw[2],
            alternate_setting: raw[3],
            num_endpoints: raw[4],
            class: raw[5],
            sub_class: raw[6],
            protocol: raw[7],
        })
    }

    fn is_audio(&self, subclass: AudioSubclass, protocol: AudioProtocol) -> bool {
        self.class == USB_AUDIO_CLASS
            && AudioSubclass::try_from(self.sub_class).ok() == Some(subclass)
            && AudioProtocol::try_from(self.protocol).ok() == Some(protocol)
    }

    pub fn is_audio_control_v2(&self) -> bool {
        self.is_audio(AudioSubclass::Control, AudioProtocol::V2)
    }

    pub fn is_audio_streaming_v2(&self) -> bool {
        self.is_audio(AudioSubclass::Streaming, AudioProtocol::V2)
    }
}

/// Standard endpoint descriptor, kept verbatim for a later SET_INTERFACE
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub address: EndpointAddress,
    pub attributes: u8,
    /// Raw wMaxPacketSize, including the high-bandwidth bits
    pub max_packet_size_raw: u16,
    pub interval: u8,
}

impl EndpointDescriptor {
    pub fn parse(raw: &[u8]) -> Option<Self> {
        if raw.len() < ENDPOINT_DESCRIPTOR_LEN || raw[1] != DescriptorType::Endpoint as u8 {
            return None;
        }
        Some(EndpointDescriptor {
            address: EndpointAddress::from(raw[2]),
            attributes: raw[3],
            max_packet_size_raw: u16::from_le_bytes([raw[4], raw[5]]),
            interval: raw[6],
        })
    }

    pub fn direction(&self) -> UsbDirection {
        self.address.direction()
    }

    /// Packet payload size (bits 10..0 of wMaxPacketSize)
    pub fn max_packet_size(&self) -> u16 {
        self.max_packet_size_raw & 0x07FF
    }

    pub fn transfer_type(&self) -> EndpointType {
        match self.attributes & 0b11 {
            0 => EndpointType::Control,
            1 => EndpointType::Isochronous,
            2 => EndpointType::Bulk,
            _ => EndpointType::Interrupt,
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for EndpointDescriptor {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "EP {=u8:#x} attr {=u8:#x} size {=u16} interval {=u8}",
            u8::from(self.address),
            self.attributes,
            self.max_packet_size(),
            self.interval
        )
    }
}

/// One descriptor of the stream, as typed as we care to make it
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DescriptorRef<'a> {
    Interface(InterfaceDescriptor),
    Endpoint(EndpointDescriptor),
    CsInterface(&'a [u8]),
    CsEndpoint(&'a [u8]),
    Other(u8, &'a [u8]),
}

impl DescriptorRef<'_> {
    pub fn is_class_specific(&self) -> bool {
        matches!(self, DescriptorRef::CsInterface(_) | DescriptorRef::CsEndpoint(_))
    }
}

/// Walks a descriptor stream by each descriptor's self-declared length.
///
/// Yields `Err(MalformedDescriptor(offset))` once and then stops if a length
/// field is zero, shorter than a header, or runs past the end of the buffer.
pub struct DescriptorParser<'a> {
    buf: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> DescriptorParser<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0, failed: false }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Look at the next descriptor without consuming it
    pub fn peek(&self) -> Option<Result<DescriptorRef<'a>>> {
        if self.failed || self.pos >= self.buf.len() {
            return None;
        }
        Some(self.raw_at(self.pos).map(|raw| classify(raw)))
    }

    fn raw_at(&self, pos: usize) -> Result<&'a [u8]> {
        let rest = &self.buf[pos..];
        let len = rest[0] as usize;
        if len < 2 || len > rest.len() {
            return Err(AudioError::MalformedDescriptor(pos));
        }
        Ok(&rest[..len])
    }
}

fn classify(raw: &[u8]) -> DescriptorRef<'_> {
    let malformed = DescriptorRef::Other(raw[1], raw);
    match DescriptorType::try_from(raw[1]) {
        Ok(DescriptorType::Interface) => InterfaceDescriptor::parse(raw).map_or(malformed, DescriptorRef::Interface),
        Ok(DescriptorType::Endpoint) => EndpointDescriptor::parse(raw).map_or(malformed, DescriptorRef::Endpoint),
        Ok(DescriptorType::CsInterface) => DescriptorRef::CsInterface(raw),
        Ok(DescriptorType::CsEndpoint) => DescriptorRef::CsEndpoint(raw),
        _ => malformed,
    }
}

impl<'a> Iterator for DescriptorParser<'a> {
    type Item = Result<DescriptorRef<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.buf.len() {
            return None;
        }
        match self.raw_at(self.pos) {
            Ok(raw) => {
                // move to next element
                self.pos += raw.len();
                Some(Ok(classify(raw)))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;

    #[test]
    fn should_decode_endpoint_descriptor() {
        let ep = EndpointDescriptor::parse(&[7, 0x05, 0x81, 0x05, 0xC0, 0x08, 1]).unwrap();
        assert_eq!(ep.direction(), UsbDirection::In);
        assert_eq!(ep.address.index(), 1);
        // high-bandwidth bits are masked off
        assert_eq!(ep.max_packet_size(), 0xC0);
        assert_eq!(ep.transfer_type(), EndpointType::Isochronous);
    }

    #[test]
    fn should_reject_short_endpoint_descriptor() {
        assert!(EndpointDescriptor::parse(&[5, 0x05, 0x81, 0x05, 0xC0]).is_none());
    }

    #[test]
    fn should_identify_audio_interfaces() {
        let ac = InterfaceDescriptor::parse(&[9, 0x04, 0, 0, 0, 0x01, 0x01, 0x20, 0]).unwrap();
        assert!(ac.is_audio_control_v2());
        assert!(!ac.is_audio_streaming_v2());

        let as_v1 = InterfaceDescriptor::parse(&[9, 0x04, 1, 0, 0, 0x01, 0x02, 0x00, 0]).unwrap();
        assert!(!as_v1.is_audio_streaming_v2());
    }

    #[test]
    fn should_walk_descriptors_by_length() {
        let bytes = [
            9, 0x04, 1, 0, 1, 0x01, 0x02, 0x20, 0, //
            6, 0x24, 0x01, 0, 0, 0, //
            7, 0x05, 0x01, 0x09, 0x40, 0x00, 1, //
            5, 0x25, 0x01, 0, 0,
        ];
        let mut parser = DescriptorParser::new(&bytes);
        assert!(matches!(parser.next(), Some(Ok(DescriptorRef::Interface(_)))));
        assert!(matches!(parser.peek(), Some(Ok(DescriptorRef::CsInterface(raw))) if raw.len() == 6));
        assert!(matches!(parser.next(), Some(Ok(DescriptorRef::CsInterface(_)))));
        assert!(matches!(parser.next(), Some(Ok(DescriptorRef::Endpoint(ep))) if ep.max_packet_size() == 64));
        assert!(matches!(parser.next(), Some(Ok(DescriptorRef::CsEndpoint(_)))));
        assert!(parser.next().is_none());
        assert_eq!(parser.position(), bytes.len());
    }

    #[test]
    fn should_stop_on_overrunning_length() {
        let bytes = [9, 0x04, 1, 0, 1, 0x01, 0x02, 0x20, 0, 12, 0x24, 0x01];
        let mut parser = DescriptorParser::new(&bytes);
        assert!(parser.next().unwrap().is_ok());
        assert_eq!(parser.next(), Some(Err(AudioError::MalformedDescriptor(9))));
        assert!(parser.next().is_none());
        assert_eq!(parser.position(), 9);
    }

    #[test]
    fn should_stop_on_zero_length() {
        let mut parser = DescriptorParser::new(&[0, 0x24, 0x01]);
        assert_eq!(parser.next(), Some(Err(AudioError::MalformedDescriptor(0))));
        assert!(parser.next().is_none());
    }
}
