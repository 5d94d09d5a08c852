//! Audio streaming interface state and its alternate-setting state machine.

use log::{debug, warn};
use usb_device::UsbDirection;

use crate::bus::{AudioHandler, TransferEngine};
use crate::config::{MAX_ALT_SETTINGS, MAX_PACKET_SIZE, STREAM_BUFFER_SIZE};
use crate::descriptor::EndpointDescriptor;
use crate::error::{AudioError, Result};
use crate::fifo::StreamBuffer;

const _: () = assert!(MAX_ALT_SETTINGS <= 32, "alternate settings are tracked in a u32 mask");

/// Value reported by GET_INTERFACE before the host selected any alternate
pub const ALT_NOT_ACTIVE: u8 = 0xFF;

/// What descriptor parsing found for one streaming interface.
///
/// Owned per configuration: cleared on bus reset and rebuilt by the parser.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InterfaceConfig {
    pub(crate) interface_number: Option<u8>,
    pub(crate) active_alt: Option<u8>,
    pub(crate) alt_mask: u32,
    pub(crate) endpoints: [Option<EndpointDescriptor>; MAX_ALT_SETTINGS],
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl InterfaceConfig {
    pub const fn new() -> Self {
        InterfaceConfig {
            interface_number: None,
            active_alt: None,
            alt_mask: 0,
            endpoints: [None; MAX_ALT_SETTINGS],
        }
    }

    pub fn seen(&self, alt: u8) -> bool {
        (alt as usize) < MAX_ALT_SETTINGS && self.alt_mask & (1 << alt) != 0
    }

    /// Mark `alt` of `interface_number` as declared
    pub(crate) fn record_alt(&mut self, interface_number: u8, alt: u8) -> Result<()> {
        if alt as usize >= MAX_ALT_SETTINGS {
            return Err(AudioError::AltSettingOutOfRange(alt));
        }
        if self.seen(alt) {
            return Err(AudioError::DuplicateAltSetting(interface_number, alt));
        }
        self.alt_mask |= 1 << alt;
        self.interface_number = Some(interface_number);
        self.endpoints[alt as usize] = None;
        Ok(())
    }

    /// Keep the first endpoint declared by `alt`.
    ///
    /// Endpoint number 0 means "no endpoint": the alternate stays zero-bandwidth.
    pub(crate) fn record_endpoint(&mut self, alt: u8, ep: EndpointDescriptor) -> Result<()> {
        if ep.address.index() == 0 {
            debug!("alt {} declares endpoint 0, left without endpoint", alt);
            return Ok(());
        }
        if ep.max_packet_size() as usize > MAX_PACKET_SIZE {
            return Err(AudioError::PacketTooLarge(ep.max_packet_size()));
        }
        let slot = self
            .endpoints
            .get_mut(alt as usize)
            .ok_or(AudioError::AltSettingOutOfRange(alt))?;
        if slot.is_none() {
            *slot = Some(ep);
        } else {
            debug!("alt {} ignores extra endpoint {:?}", alt, ep.address);
        }
        Ok(())
    }

    pub fn endpoint(&self, alt: u8) -> Option<&EndpointDescriptor> {
        self.endpoints.get(alt as usize)?.as_ref()
    }

    pub fn active_endpoint(&self) -> Option<&EndpointDescriptor> {
        self.endpoint(self.active_alt?)
    }
}

/// One audio streaming interface.
///
/// `config` is the per-configuration block; the buffer and the transfer
/// scratch area persist across bus resets, only their content is dropped.
pub struct InterfaceState {
    pub(crate) config: InterfaceConfig,
    pub(crate) fifo: StreamBuffer<STREAM_BUFFER_SIZE>,
    pub(crate) scratch: [u8; MAX_PACKET_SIZE],
}

impl Default for InterfaceState {
    fn default() -> Self {
        Self::new()
    }
}

impl InterfaceState {
    pub const fn new() -> Self {
        InterfaceState {
            config: InterfaceConfig::new(),
            fifo: StreamBuffer::new(),
            scratch: [0; MAX_PACKET_SIZE],
        }
    }

    pub fn reset(&mut self) {
        self.config = InterfaceConfig::new();
        self.fifo.clear();
    }

    pub fn interface_number(&self) -> Option<u8> {
        self.config.interface_number
    }

    pub fn active_alt(&self) -> Option<u8> {
        self.config.active_alt
    }

    /// Alternate settings seen while parsing, one bit per index
    pub fn alt_mask(&self) -> u32 {
        self.config.alt_mask
    }

    pub fn endpoint(&self, alt: u8) -> Option<&EndpointDescriptor> {
        self.config.endpoint(alt)
    }

    /// Bytes waiting in the streaming buffer
    pub fn buffered(&self) -> usize {
        self.fifo.len()
    }

    pub fn stream(&self) -> &StreamBuffer<STREAM_BUFFER_SIZE> {
        &self.fifo
    }

    /// Active endpoint, if it moves data in direction `dir`
    pub fn streaming_endpoint(&self, dir: UsbDirection) -> Option<EndpointDescriptor> {
        self.config
            .active_endpoint()
            .filter(|ep| ep.direction() == dir)
            .copied()
    }

    pub fn is_streaming(&self) -> bool {
        self.config.active_endpoint().is_some()
    }

    /// Host SET_INTERFACE.
    ///
    /// An alternate with an endpoint opens it (priming reception for OUT)
    /// and notifies the application. An alternate without one is the
    /// zero-bandwidth setting: the previous endpoint is closed and buffered
    /// bytes are dropped. On error the interface is left as it was.
    pub fn select_alt<B: TransferEngine, A: AudioHandler>(
        &mut self,
        slot: u8,
        alt: u8,
        bus: &mut B,
        app: &mut A,
    ) -> Result<()> {
        if !self.config.seen(alt) {
            return Err(AudioError::UnseenAltSetting(alt));
        }
        let previous = self.config.active_endpoint().copied();

        match self.config.endpoint(alt).copied() {
            Some(ep) => {
                bus.open(&ep)?;
                if let Some(prev) = previous.filter(|prev| prev.address != ep.address) {
                    bus.close(prev.address);
                }
                self.config.active_alt = Some(alt);
                debug!("AS slot {} alt {} streaming on {:?}", slot, alt, ep.address);

                if ep.direction() == UsbDirection::Out {
                    // continuous reception must be armed before the host sends anything
                    if let Err(err) = self.prime_out(slot, bus) {
                        warn!("AS slot {} could not arm reception: {:?}", slot, err);
                    }
                }
                app.interface_connected(slot, ep.direction(), ep.max_packet_size());
            }
            None => {
                if let Some(prev) = previous {
                    bus.close(prev.address);
                }
                self.fifo.clear();
                self.config.active_alt = Some(alt);
                debug!("AS slot {} alt {} stops streaming", slot, alt);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use crate::mock::{endpoint, MockEngine, MockHandler};
    use usb_device::endpoint::EndpointAddress;

    fn parsed(out_ep: Option<EndpointDescriptor>) -> InterfaceState {
        let mut itf = InterfaceState::new();
        itf.config.record_alt(1, 0).unwrap();
        itf.config.record_alt(1, 1).unwrap();
        if let Some(ep) = out_ep {
            itf.config.record_endpoint(1, ep).unwrap();
        }
        itf
    }

    #[test]
    fn should_reject_duplicate_and_out_of_range_alts() {
        let mut config = InterfaceConfig::new();
        config.record_alt(2, 0).unwrap();
        assert_eq!(config.record_alt(2, 0), Err(AudioError::DuplicateAltSetting(2, 0)));
        assert_eq!(
            config.record_alt(2, MAX_ALT_SETTINGS as u8),
            Err(AudioError::AltSettingOutOfRange(MAX_ALT_SETTINGS as u8))
        );
        assert_eq!(config.alt_mask.count_ones(), 1);
        assert_eq!(config.interface_number, Some(2));
    }

    #[test]
    fn should_keep_first_endpoint_of_alt() {
        let mut config = InterfaceConfig::new();
        config.record_alt(1, 1).unwrap();
        config.record_endpoint(1, endpoint(0x01, 192)).unwrap();
        config.record_endpoint(1, endpoint(0x81, 4)).unwrap();
        assert_eq!(config.endpoint(1).map(|ep| ep.max_packet_size()), Some(192));
    }

    #[test]
    fn should_not_record_control_endpoint() {
        let mut config = InterfaceConfig::new();
        config.record_alt(1, 1).unwrap();
        config.record_endpoint(1, endpoint(0x00, 64)).unwrap();
        config.record_endpoint(1, endpoint(0x80, 64)).unwrap();
        assert!(config.endpoint(1).is_none());

        config.record_endpoint(1, endpoint(0x02, 64)).unwrap();
        assert_eq!(config.endpoint(1).map(|ep| u8::from(ep.address)), Some(0x02));
    }

    #[test]
    fn should_refuse_oversized_packets() {
        let mut config = InterfaceConfig::new();
        config.record_alt(1, 1).unwrap();
        assert_eq!(
            config.record_endpoint(1, endpoint(0x01, 1024)),
            Err(AudioError::PacketTooLarge(1024))
        );
    }

    #[test]
    fn should_reject_unseen_alt_without_transition() {
        let mut itf = parsed(Some(endpoint(0x01, 64)));
        let mut bus = MockEngine::default();
        let mut app = MockHandler::default();
        itf.config.alt_mask = 0b01;
        assert_eq!(itf.select_alt(0, 1, &mut bus, &mut app), Err(AudioError::UnseenAltSetting(1)));
        assert_eq!(itf.active_alt(), None);
        assert!(bus.opened.is_empty());
        assert!(app.connected.is_empty());
    }

    #[test]
    fn should_open_and_prime_out_endpoint() {
        let mut itf = parsed(Some(endpoint(0x01, 64)));
        let mut bus = MockEngine::default();
        let mut app = MockHandler::default();
        itf.select_alt(0, 1, &mut bus, &mut app).unwrap();

        assert_eq!(itf.active_alt(), Some(1));
        assert_eq!(bus.opened.len(), 1);
        assert_eq!(bus.armed, std::vec![(EndpointAddress::from(0x01), 64)]);
        assert_eq!(app.connected, std::vec![(0, UsbDirection::Out, 64)]);
    }

    #[test]
    fn should_leave_state_when_open_fails() {
        let mut itf = parsed(Some(endpoint(0x81, 64)));
        let mut bus = MockEngine::default();
        bus.refuse_open = true;
        let mut app = MockHandler::default();
        assert!(itf.select_alt(0, 1, &mut bus, &mut app).is_err());
        assert_eq!(itf.active_alt(), None);
        assert!(app.connected.is_empty());
    }

    #[test]
    fn should_stop_streaming_on_zero_bandwidth_alt() {
        let mut itf = parsed(Some(endpoint(0x81, 64)));
        let mut bus = MockEngine::default();
        let mut app = MockHandler::default();
        itf.select_alt(0, 1, &mut bus, &mut app).unwrap();
        itf.fifo.enqueue(&[1, 2, 3]);

        itf.select_alt(0, 0, &mut bus, &mut app).unwrap();
        assert_eq!(itf.active_alt(), Some(0));
        assert!(!itf.is_streaming());
        assert_eq!(itf.buffered(), 0);
        assert_eq!(bus.closed, std::vec![EndpointAddress::from(0x81)]);
        assert_eq!(app.connected.len(), 1);
    }

    #[test]
    fn should_clear_config_and_buffered_bytes_on_reset() {
        let mut itf = parsed(Some(endpoint(0x81, 64)));
        let mut bus = MockEngine::default();
        itf.select_alt(0, 1, &mut bus, &mut MockHandler::default()).unwrap();
        itf.fifo.enqueue(&[1, 2, 3]);
        itf.reset();
        assert_eq!(itf.active_alt(), None);
        assert_eq!(itf.alt_mask(), 0);
        assert_eq!(itf.interface_number(), None);
        assert_eq!(itf.buffered(), 0);
        assert_eq!(itf.stream().capacity(), STREAM_BUFFER_SIZE);
    }
}
