//! Builds the audio function topology from its configuration descriptors.

use log::{debug, warn};

use crate::config::MAX_STREAMING_INTERFACES;
use crate::descriptor::{DescriptorParser, DescriptorRef};
use crate::error::{AudioError, Result};
use crate::interface::InterfaceConfig;

/// Topology found by one parse, committed to the function only if complete
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Enumeration {
    pub ac_interface: u8,
    pub interfaces: [InterfaceConfig; MAX_STREAMING_INTERFACES],
    /// Bytes of the stream belonging to this function
    pub consumed: usize,
}

/// Parse one audio function: an Audio Control v2 interface followed by its
/// Audio Streaming v2 interfaces. `desc` starts at the AC interface
/// descriptor and ends with the configuration; its length is the budget.
///
/// Stops at the first descriptor that does not belong to the function, so
/// `consumed` tells the caller where the next function starts.
pub fn parse_function(desc: &[u8]) -> Result<Enumeration> {
    let mut parser = DescriptorParser::new(desc);

    let ac = match parser.next() {
        Some(Ok(DescriptorRef::Interface(itf))) if itf.is_audio_control_v2() => itf,
        Some(Err(err)) => return Err(err),
        _ => return Err(AudioError::NotAudioControl),
    };
    let mut found = Enumeration {
        ac_interface: ac.interface_number,
        interfaces: [InterfaceConfig::new(); MAX_STREAMING_INTERFACES],
        consumed: 0,
    };
    debug!("AC interface {}", ac.interface_number);

    // Class-specific AC descriptors (and the optional interrupt endpoint)
    while let Some(next) = parser.peek() {
        match next? {
            DescriptorRef::CsInterface(_) | DescriptorRef::CsEndpoint(_) | DescriptorRef::Endpoint(_) => {
                parser.next();
            }
            _ => break,
        }
    }

    while let Some(next) = parser.peek() {
        let itf = match next? {
            DescriptorRef::Interface(itf) if itf.is_audio_streaming_v2() => itf,
            _ => break,
        };
        parser.next();

        let number = itf.interface_number;
        let alt = itf.alternate_setting;
        let slot = number.wrapping_sub(ac.interface_number).wrapping_sub(1) as usize;
        let state = found
            .interfaces
            .get_mut(slot)
            .ok_or(AudioError::InterfaceOutOfRange(number))?;
        state.record_alt(number, alt)?;
        debug!("AS interface {} alt {} in slot {}", number, alt, slot);

        while let Some(next) = parser.peek() {
            match next? {
                desc if desc.is_class_specific() => {}
                DescriptorRef::Endpoint(ep) => state.record_endpoint(alt, ep)?,
                _ => break,
            }
            parser.next();
        }
    }

    found.consumed = parser.position();
    Ok(found)
}

/// Like [`parse_function`], logging why a function was refused.
pub(crate) fn parse_logged(desc: &[u8]) -> Result<Enumeration> {
    parse_function(desc).map_err(|err| {
        warn!("audio function refused: {:?}", err);
        err
    })
}
