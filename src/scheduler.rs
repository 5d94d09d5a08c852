//! Moves bytes between streaming buffers and endpoint transfers.
//!
//! At most one transfer is outstanding per endpoint. A flush that finds the
//! endpoint busy does nothing: the bytes stay buffered until the completion
//! of the outstanding transfer flushes again.

use log::{trace, warn};
use usb_device::endpoint::EndpointAddress;
use usb_device::UsbDirection;

use crate::bus::{AudioHandler, TransferEngine, TransferResult};
use crate::config::MAX_PACKET_SIZE;
use crate::error::{AudioError, Result};
use crate::interface::InterfaceState;

impl InterfaceState {
    /// Queue application bytes for the host, flushing once a full packet is buffered.
    ///
    /// Returns how many bytes were accepted; the rest did not fit.
    pub fn write<B: TransferEngine>(&mut self, slot: u8, bus: &mut B, data: &[u8]) -> Result<usize> {
        let ep = self
            .streaming_endpoint(UsbDirection::In)
            .ok_or(AudioError::NotStreaming(slot))?;

        let accepted = self.fifo.enqueue(data);
        if accepted < data.len() {
            trace!("AS slot {} buffer full, {} bytes refused", slot, data.len() - accepted);
        }
        if self.fifo.len() >= ep.max_packet_size() as usize {
            if let Err(err) = self.flush(slot, bus) {
                warn!("AS slot {} flush failed: {:?}", slot, err);
            }
        }
        Ok(accepted)
    }

    /// Submit up to one packet of buffered bytes if the IN endpoint is idle.
    ///
    /// Returns the number of bytes submitted, zero when busy or empty. Bytes
    /// leave the buffer only once the engine accepted the transfer.
    pub fn flush<B: TransferEngine>(&mut self, slot: u8, bus: &mut B) -> Result<usize> {
        let ep = self
            .streaming_endpoint(UsbDirection::In)
            .ok_or(AudioError::NotStreaming(slot))?;
        let size = ep.max_packet_size() as usize;
        let fifo = &self.fifo;
        let scratch = &mut self.scratch;

        // busy check and submit must not interleave with a completion
        critical_section::with(|_| -> Result<usize> {
            if bus.busy(ep.address) {
                return Ok(0);
            }
            let count = fifo.peek(&mut scratch[..size]);
            if count == 0 {
                return Ok(0);
            }
            bus.submit_in(ep.address, &scratch[..count])?;
            fifo.discard(count);
            Ok(count)
        })
    }

    /// Take received bytes from the streaming buffer.
    pub fn read(&mut self, out: &mut [u8]) -> usize {
        self.fifo.dequeue(out)
    }

    /// Arm the next OUT transfer, one max-size packet.
    pub(crate) fn prime_out<B: TransferEngine>(&mut self, slot: u8, bus: &mut B) -> Result<()> {
        let ep = self
            .streaming_endpoint(UsbDirection::Out)
            .ok_or(AudioError::NotStreaming(slot))?;
        critical_section::with(|_| -> Result<()> {
            if !bus.busy(ep.address) {
                bus.submit_out(ep.address, ep.max_packet_size() as usize)?;
            }
            Ok(())
        })
    }

    /// Completion of a transfer on this interface's active endpoint.
    ///
    /// OUT: received bytes go to the streaming buffer, reception is re-armed,
    /// then the application is told. IN: the backlog is flushed, then the
    /// application is told.
    pub(crate) fn transfer_complete<B: TransferEngine, A: AudioHandler>(
        &mut self,
        slot: u8,
        bus: &mut B,
        app: &mut A,
        ep: EndpointAddress,
        result: TransferResult,
        xferred: usize,
    ) {
        if result != TransferResult::Success {
            warn!("AS slot {} transfer on {:?} ended {:?}", slot, ep, result);
        }
        match ep.direction() {
            UsbDirection::Out => {
                if result == TransferResult::Success && xferred > 0 {
                    self.receive(slot, bus, ep, xferred);
                }
                if let Err(err) = self.prime_out(slot, bus) {
                    warn!("AS slot {} could not re-arm reception: {:?}", slot, err);
                }
                app.rx(slot);
            }
            UsbDirection::In => {
                match self.flush(slot, bus) {
                    Ok(0) => {}
                    Ok(count) => trace!("AS slot {} backlog flush {}", slot, count),
                    Err(err) => warn!("AS slot {} backlog flush failed: {:?}", slot, err),
                }
                app.tx_complete(slot);
            }
        }
    }

    fn receive<B: TransferEngine>(&mut self, slot: u8, bus: &mut B, ep: EndpointAddress, xferred: usize) {
        let len = xferred.min(MAX_PACKET_SIZE);
        match bus.read(ep, &mut self.scratch[..len]) {
            Ok(count) => {
                let count = count.min(len);
                let kept = self.fifo.enqueue(&self.scratch[..count]);
                if kept < count {
                    warn!("AS slot {} dropped {} received bytes", slot, count - kept);
                }
            }
            Err(err) => warn!("AS slot {} read failed: {:?}", slot, err),
        }
    }
}
