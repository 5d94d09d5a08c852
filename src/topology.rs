//! Audio control topology: the units the host may query through class requests.
//!
//! Each entity answers for its own controls through [`UnitControl`]; the
//! dispatcher only maps the unit id from wIndex to an entity.

use core::convert::TryFrom;

use heapless::Vec;
use num_enum::TryFromPrimitive;
use crate::config::{AudioConfig, MAX_UNITS};
use crate::error::{AudioError, Result, UsbFault};

/// Largest encoded control payload (a 16-bit count plus one 32-bit range triple fits easily)
pub const RESPONSE_CAPACITY: usize = 20;

/// Control payload encoded on the stack of the request being answered
pub type Response = Vec<u8, RESPONSE_CAPACITY>;

/// Audio 2.0 class-specific request codes (bRequest)
#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ClassRequest {
    Cur = 0x01,
    Range = 0x02,
}

/// Clock source control selectors (high byte of wValue)
#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ClockSourceControl {
    Undefined = 0x00,
    SamplingFrequency = 0x01,
    ClockValid = 0x02,
}

fn put(out: &mut Response, bytes: &[u8]) -> Result<()> {
    out.extend_from_slice(bytes)
        .map_err(|_| AudioError::Usb(UsbFault::BufferOverflow))
}

fn put_u16(out: &mut Response, value: u16) -> Result<()> {
    put(out, &value.to_le_bytes())
}

fn put_u32(out: &mut Response, value: u32) -> Result<()> {
    put(out, &value.to_le_bytes())
}

/// What a unit can do for the host
pub trait UnitControl {
    fn id(&self) -> u8;

    /// Encode the current value of control `selector`
    fn get_cur(&self, selector: u8, out: &mut Response) -> Result<()>;

    /// Apply the data stage of a SET CUR request
    fn set_cur(&mut self, selector: u8, data: &[u8]) -> Result<()>;

    /// Encode the sub-range list of control `selector`
    fn get_range(&self, selector: u8, out: &mut Response) -> Result<()>;
}

/// Inclusive (min, max, resolution) triple
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Range {
    pub min: u32,
    pub max: u32,
    pub res: u32,
}

impl Range {
    pub const fn single(value: u32) -> Self {
        Range { min: value, max: value, res: 0 }
    }

    pub fn contains(&self, value: u32) -> bool {
        if value < self.min || value > self.max {
            return false;
        }
        self.res == 0 || (value - self.min) % self.res == 0
    }

    /// Layout {count:16, (min:32, max:32, res:32)×count}, a single sub-range here
    fn encode(&self, out: &mut Response) -> Result<()> {
        put_u16(out, 1)?;
        put_u32(out, self.min)?;
        put_u32(out, self.max)?;
        put_u32(out, self.res)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockFrequency {
    pub cur: u32,
    pub range: Range,
}

/// Clock source entity with a sampling frequency control
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockSource {
    pub id: u8,
    pub freq: ClockFrequency,
}

impl ClockSource {
    /// A clock fixed at one sample rate
    pub const fn fixed(id: u8, sample_rate: u32) -> Self {
        ClockSource {
            id,
            freq: ClockFrequency {
                cur: sample_rate,
                range: Range::single(sample_rate),
            },
        }
    }
}

impl UnitControl for ClockSource {
    fn id(&self) -> u8 {
        self.id
    }

    fn get_cur(&self, selector: u8, out: &mut Response) -> Result<()> {
        match ClockSourceControl::try_from(selector) {
            Ok(ClockSourceControl::ClockValid) => put(out, &[1]),
            // any other selector reads the sampling frequency
            _ => put_u32(out, self.freq.cur),
        }
    }

    fn set_cur(&mut self, selector: u8, data: &[u8]) -> Result<()> {
        if let Ok(ClockSourceControl::ClockValid) = ClockSourceControl::try_from(selector) {
            return Err(AudioError::UnsupportedRequest(ClassRequest::Cur as u8));
        }
        let raw = <[u8; 4]>::try_from(data).map_err(|_| AudioError::UnsupportedRequest(ClassRequest::Cur as u8))?;
        let rate = u32::from_le_bytes(raw);
        if !self.freq.range.contains(rate) {
            return Err(AudioError::UnsupportedRequest(ClassRequest::Cur as u8));
        }
        self.freq.cur = rate;
        Ok(())
    }

    fn get_range(&self, selector: u8, out: &mut Response) -> Result<()> {
        match ClockSourceControl::try_from(selector) {
            Ok(ClockSourceControl::ClockValid) => Err(AudioError::UnsupportedRequest(ClassRequest::Range as u8)),
            _ => self.freq.range.encode(out),
        }
    }
}

/// Entities the topology can hold
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Entity {
    ClockSource(ClockSource),
}

impl UnitControl for Entity {
    fn id(&self) -> u8 {
        match self {
            Entity::ClockSource(clock) => clock.id(),
        }
    }

    fn get_cur(&self, selector: u8, out: &mut Response) -> Result<()> {
        match self {
            Entity::ClockSource(clock) => clock.get_cur(selector, out),
        }
    }

    fn set_cur(&mut self, selector: u8, data: &[u8]) -> Result<()> {
        match self {
            Entity::ClockSource(clock) => clock.set_cur(selector, data),
        }
    }

    fn get_range(&self, selector: u8, out: &mut Response) -> Result<()> {
        match self {
            Entity::ClockSource(clock) => clock.get_range(selector, out),
        }
    }
}

/// Unit id → entity lookup
#[derive(Clone, Debug, Default)]
pub struct Topology {
    units: Vec<Entity, MAX_UNITS>,
}

impl Topology {
    pub const fn new() -> Self {
        Topology { units: Vec::new() }
    }

    /// The minimal topology: one fixed-rate clock source
    pub fn from_config(config: &AudioConfig) -> Self {
        let mut topology = Topology::new();
        // an empty table always has room for one unit
        let _ = topology.add(Entity::ClockSource(ClockSource::fixed(config.clock_source_id, config.sample_rate)));
        topology
    }

    /// Register an entity, replacing any previous one with the same id
    pub fn add(&mut self, entity: Entity) -> Result<()> {
        if let Some(existing) = self.find_mut(entity.id()) {
            *existing = entity;
            return Ok(());
        }
        self.units
            .push(entity)
            .map_err(|e| AudioError::TopologyFull(e.id()))
    }

    pub fn find(&self, id: u8) -> Option<&Entity> {
        self.units.iter().find(|unit| unit.id() == id)
    }

    pub fn find_mut(&mut self, id: u8) -> Option<&mut Entity> {
        self.units.iter_mut().find(|unit| unit.id() == id)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
