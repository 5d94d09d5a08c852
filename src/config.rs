//! Compile-time capacities and runtime settings of the audio function.

/// How many audio streaming interfaces may follow the audio control interface.
pub const MAX_STREAMING_INTERFACES: usize = 2;

/// Alternate settings tracked per streaming interface (indices `0..MAX_ALT_SETTINGS`).
pub const MAX_ALT_SETTINGS: usize = 2;

/// Byte capacity of each interface's streaming buffer.
pub const STREAM_BUFFER_SIZE: usize = 512 + 192;

/// Largest full-speed isochronous packet, also the size of the transfer scratch buffer.
pub const MAX_PACKET_SIZE: usize = 1023;

/// Units the control topology can hold.
pub const MAX_UNITS: usize = 4;

pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Entity id of the clock source declared in the AC descriptors.
pub const CLOCK_SOURCE_ID: u8 = 4;

/// Runtime settings of the audio control topology.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AudioConfig {
    pub clock_source_id: u8,
    pub sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        AudioConfig {
            clock_source_id: CLOCK_SOURCE_ID,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl AudioConfig {
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_clock_source(mut self, id: u8) -> Self {
        self.clock_source_id = id;
        self
    }
}
