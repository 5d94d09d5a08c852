use usb_device::UsbError;

/// Everything that can go wrong inside the audio function.
///
/// Parse violations abort enumeration of the function, request rejections
/// make the device stack stall the control transfer, and transfer
/// rejections come from the endpoint engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AudioError {
    /// First descriptor is not an Audio Control v2 interface
    NotAudioControl,
    /// Descriptor length field is zero, too short, or runs past the budget
    MalformedDescriptor(usize),
    /// Streaming interface slot beyond `MAX_STREAMING_INTERFACES`
    InterfaceOutOfRange(u8),
    /// Alternate setting beyond `MAX_ALT_SETTINGS`
    AltSettingOutOfRange(u8),
    /// Same (interface, alternate) pair declared twice
    DuplicateAltSetting(u8, u8),
    /// Endpoint packet size larger than the transfer scratch buffer
    PacketTooLarge(u16),

    UnknownInterface(u8),
    UnseenAltSetting(u8),
    UnknownUnit(u8),
    UnsupportedRequest(u8),
    /// Interface slot has no open endpoint for this direction
    NotStreaming(u8),
    /// Unit table already holds `MAX_UNITS` entities
    TopologyFull(u8),

    Usb(UsbFault),
}

/// Transfer failure reported by the device stack
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsbFault {
    WouldBlock,
    ParseError,
    BufferOverflow,
    EndpointOverflow,
    EndpointMemoryOverflow,
    InvalidEndpoint,
    Unsupported,
    InvalidState,
}

impl From<UsbError> for UsbFault {
    fn from(err: UsbError) -> Self {
        match err {
            UsbError::WouldBlock => UsbFault::WouldBlock,
            UsbError::ParseError => UsbFault::ParseError,
            UsbError::BufferOverflow => UsbFault::BufferOverflow,
            UsbError::EndpointOverflow => UsbFault::EndpointOverflow,
            UsbError::EndpointMemoryOverflow => UsbFault::EndpointMemoryOverflow,
            UsbError::InvalidEndpoint => UsbFault::InvalidEndpoint,
            UsbError::Unsupported => UsbFault::Unsupported,
            UsbError::InvalidState => UsbFault::InvalidState,
        }
    }
}

impl From<UsbError> for AudioError {
    fn from(err: UsbError) -> Self {
        AudioError::Usb(err.into())
    }
}

impl AudioError {
    /// Descriptor-structure errors, fatal to enumeration of the function.
    pub fn is_parse_violation(&self) -> bool {
        matches!(
            self,
            AudioError::NotAudioControl
                | AudioError::MalformedDescriptor(_)
                | AudioError::InterfaceOutOfRange(_)
                | AudioError::AltSettingOutOfRange(_)
                | AudioError::DuplicateAltSetting(_, _)
                | AudioError::PacketTooLarge(_)
        )
    }
}

pub type Result<T> = core::result::Result<T, AudioError>;
