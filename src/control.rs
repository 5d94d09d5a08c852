//! Control request dispatch for the audio function.

use core::convert::TryFrom;

use log::{debug, trace};
use usb_device::control::{Recipient, Request, RequestType};
use usb_device::UsbDirection;

use crate::bus::{AudioHandler, ControlPipe, TransferEngine};
use crate::error::{AudioError, Result};
use crate::function::AudioFunction;
use crate::interface::ALT_NOT_ACTIVE;
use crate::topology::{ClassRequest, Response, UnitControl};

impl AudioFunction {
    /// Handle a SETUP addressed to this function.
    ///
    /// Returns false when the request is not handled; the device stack then
    /// stalls the control transfer.
    pub fn control_request<B, P, A>(&mut self, bus: &mut B, pipe: &mut P, app: &mut A, req: &Request) -> bool
    where
        B: TransferEngine,
        P: ControlPipe,
        A: AudioHandler,
    {
        app.control_request_seen(req);
        trace!(
            "control {:?} {:?} req {:#04x} value {:#06x} index {:#06x} len {}",
            req.request_type,
            req.recipient,
            req.request,
            req.value,
            req.index,
            req.length
        );
        match self.dispatch(bus, pipe, app, req) {
            Ok(()) => true,
            Err(err) => {
                debug!("control request rejected: {:?}", err);
                false
            }
        }
    }

    fn dispatch<B, P, A>(&mut self, bus: &mut B, pipe: &mut P, app: &mut A, req: &Request) -> Result<()>
    where
        B: TransferEngine,
        P: ControlPipe,
        A: AudioHandler,
    {
        match (req.request_type, req.recipient) {
            (RequestType::Standard, _) => match req.request {
                Request::GET_INTERFACE => {
                    let slot = self.slot_of(req.index as u8)?;
                    let alt = self.interfaces[slot as usize].active_alt().unwrap_or(ALT_NOT_ACTIVE);
                    respond(pipe, req, &[alt])
                }
                Request::SET_INTERFACE => {
                    let slot = self.slot_of(req.index as u8)?;
                    let alt = u8::try_from(req.value).map_err(|_| AudioError::UnseenAltSetting(u8::MAX))?;
                    self.interfaces[slot as usize].select_alt(slot, alt, bus, app)?;
                    pipe.status(req)?;
                    Ok(())
                }
                other => Err(AudioError::UnsupportedRequest(other)),
            },
            (RequestType::Class, Recipient::Interface) => {
                if Some(req.index as u8) == self.ac_interface {
                    self.audio_control_request(pipe, req)
                } else {
                    self.streaming_request(req)
                }
            }
            _ => Err(AudioError::UnsupportedRequest(req.request)),
        }
    }

    /// Class request to the AC interface: wIndex high byte names the unit,
    /// wValue high byte the control selector.
    fn audio_control_request<P: ControlPipe>(&mut self, pipe: &mut P, req: &Request) -> Result<()> {
        let unit_id = (req.index >> 8) as u8;
        let selector = (req.value >> 8) as u8;
        let code = ClassRequest::try_from(req.request).map_err(|_| AudioError::UnsupportedRequest(req.request))?;
        let unit = self
            .topology
            .find_mut(unit_id)
            .ok_or(AudioError::UnknownUnit(unit_id))?;

        let mut out = Response::new();
        match (req.direction, code) {
            (UsbDirection::In, ClassRequest::Cur) => unit.get_cur(selector, &mut out)?,
            (UsbDirection::In, ClassRequest::Range) => unit.get_range(selector, &mut out)?,
            (UsbDirection::Out, ClassRequest::Cur) => {
                unit.set_cur(selector, pipe.data())?;
                debug!("unit {} control {} set", unit_id, selector);
                pipe.status(req)?;
                return Ok(());
            }
            (UsbDirection::Out, ClassRequest::Range) => return Err(AudioError::UnsupportedRequest(req.request)),
        }
        respond(pipe, req, &out)
    }

    /// Class requests to streaming interfaces are not modeled.
    fn streaming_request(&mut self, req: &Request) -> Result<()> {
        Err(AudioError::UnsupportedRequest(req.request))
    }
}

/// Data stage, cut to what the host asked for
fn respond<P: ControlPipe>(pipe: &mut P, req: &Request, data: &[u8]) -> Result<()> {
    let len = data.len().min(req.length as usize);
    pipe.respond(req, &data[..len])?;
    Ok(())
}
