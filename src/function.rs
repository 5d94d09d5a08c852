//! The audio function aggregate: one AC interface and its streaming interfaces.

use log::{debug, trace, warn};
use usb_device::endpoint::EndpointAddress;

use crate::bus::{AudioHandler, TransferEngine, TransferResult};
use crate::config::{AudioConfig, MAX_STREAMING_INTERFACES};
use crate::error::{AudioError, Result};
use crate::interface::InterfaceState;
use crate::parser;
use crate::topology::Topology;

/// Device-side engine of one USB Audio Class 2 function.
///
/// The device stack drives it through [`init`](Self::init),
/// [`reset`](Self::reset), [`open`](Self::open),
/// [`control_request`](Self::control_request) and
/// [`transfer_complete`](Self::transfer_complete); the application moves
/// bytes through [`write`](Self::write), [`flush`](Self::flush) and
/// [`read`](Self::read), keyed by streaming interface slot.
pub struct AudioFunction {
    pub(crate) ac_interface: Option<u8>,
    pub(crate) interfaces: [InterfaceState; MAX_STREAMING_INTERFACES],
    pub(crate) topology: Topology,
    config: AudioConfig,
}

impl Default for AudioFunction {
    fn default() -> Self {
        Self::new(AudioConfig::default())
    }
}

impl AudioFunction {
    pub fn new(config: AudioConfig) -> Self {
        AudioFunction {
            ac_interface: None,
            interfaces: core::array::from_fn(|_| InterfaceState::new()),
            topology: Topology::from_config(&config),
            config,
        }
    }

    /// Device stack initialization: clear all state and restore the topology.
    pub fn init(&mut self) {
        self.reset();
        self.topology = Topology::from_config(&self.config);
    }

    /// Bus reset. Topology has to be parsed again before streaming resumes.
    pub fn reset(&mut self) {
        self.ac_interface = None;
        for itf in self.interfaces.iter_mut() {
            itf.reset();
        }
        debug!("audio function reset");
    }

    /// Parse the descriptors of one function, starting at its AC interface.
    ///
    /// Returns the bytes consumed. On error nothing is committed: the
    /// previous per-configuration state stays as it was.
    pub fn open(&mut self, desc: &[u8]) -> Result<usize> {
        let found = parser::parse_logged(desc)?;

        self.ac_interface = Some(found.ac_interface);
        for (itf, config) in self.interfaces.iter_mut().zip(found.interfaces.iter()) {
            itf.config = *config;
            itf.fifo.clear();
        }
        debug!("audio function on interface {} uses {} bytes", found.ac_interface, found.consumed);
        Ok(found.consumed)
    }

    /// Status stage of a control transfer went out; nothing to finish here.
    pub fn control_complete(&mut self) -> bool {
        true
    }

    /// Completion of a transfer on one of the function's endpoints.
    ///
    /// Returns false if no streaming interface has `ep` active.
    pub fn transfer_complete<B: TransferEngine, A: AudioHandler>(
        &mut self,
        bus: &mut B,
        app: &mut A,
        ep: EndpointAddress,
        result: TransferResult,
        xferred: usize,
    ) -> bool {
        trace!("transfer complete on {:?}: {:?} {}", ep, result, xferred);
        let found = self.interfaces.iter_mut().enumerate().find(|(_, itf)| {
            itf.config.active_endpoint().map(|active| active.address) == Some(ep)
        });
        match found {
            Some((slot, itf)) => {
                itf.transfer_complete(slot as u8, bus, app, ep, result, xferred);
                true
            }
            None => {
                warn!("transfer complete on unclaimed endpoint {:?}", ep);
                false
            }
        }
    }

    /// Queue bytes for the host on streaming interface `slot`.
    pub fn write<B: TransferEngine>(&mut self, slot: u8, bus: &mut B, data: &[u8]) -> Result<usize> {
        self.slot_mut(slot)?.write(slot, bus, data)
    }

    pub fn flush<B: TransferEngine>(&mut self, slot: u8, bus: &mut B) -> Result<usize> {
        self.slot_mut(slot)?.flush(slot, bus)
    }

    /// Take bytes received from the host on streaming interface `slot`.
    pub fn read(&mut self, slot: u8, out: &mut [u8]) -> Result<usize> {
        Ok(self.slot_mut(slot)?.read(out))
    }

    pub fn write_default<B: TransferEngine>(&mut self, bus: &mut B, data: &[u8]) -> Result<usize> {
        self.write(0, bus, data)
    }

    pub fn read_default(&mut self, out: &mut [u8]) -> Result<usize> {
        self.read(0, out)
    }

    pub fn ac_interface(&self) -> Option<u8> {
        self.ac_interface
    }

    pub fn interface(&self, slot: u8) -> Option<&InterfaceState> {
        self.interfaces.get(slot as usize)
    }

    pub fn interfaces(&self) -> &[InterfaceState] {
        &self.interfaces
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn topology_mut(&mut self) -> &mut Topology {
        &mut self.topology
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    fn slot_mut(&mut self, slot: u8) -> Result<&mut InterfaceState> {
        self.interfaces
            .get_mut(slot as usize)
            .ok_or(AudioError::UnknownInterface(slot))
    }

    /// Slot of the streaming interface numbered `interface_number`
    pub(crate) fn slot_of(&self, interface_number: u8) -> Result<u8> {
        let ac = self.ac_interface.ok_or(AudioError::UnknownInterface(interface_number))?;
        let slot = interface_number.wrapping_sub(ac).wrapping_sub(1);
        match self.interfaces.get(slot as usize) {
            Some(itf) if itf.interface_number() == Some(interface_number) => Ok(slot),
            _ => Err(AudioError::UnknownInterface(interface_number)),
        }
    }
}
