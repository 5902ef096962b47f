use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::BytesMut;
use canfram_frame::{decode_hex, encode_data_frame, CanId, EncodingError};

/// Channel id commands are injected on unless configured otherwise.
pub const DEFAULT_INJECT_ID: &str = "010";

/// Channel id the device answers on.
pub const DEFAULT_RECEIVE_ID: &str = "011";

/// Application commands understood by the device firmware.
///
/// The command lives entirely in the payload; the CAN id only selects the
/// device's command channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Erase the FRAM.
    Clear,
    /// Stream the whole 32 KiB FRAM.
    FullDump,
    /// Stream one 512-byte debug sector.
    PartialDump,
    /// Set the device clock to `epoch` seconds.
    RtcUpdate { epoch: u32 },
}

impl Command {
    /// RTC update carrying the current wall-clock time.
    pub fn rtc_now() -> Self {
        let epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        Command::RtcUpdate { epoch }
    }

    /// First payload byte.
    pub fn opcode(&self) -> u8 {
        match self {
            Command::Clear => 0x01,
            Command::FullDump => 0x02,
            Command::PartialDump => 0x04,
            Command::RtcUpdate { .. } => 0xAA,
        }
    }

    /// The payload as the firmware documents it: hex text.
    pub fn payload_text(&self) -> String {
        match self {
            Command::Clear => "01".to_string(),
            Command::FullDump => "02".to_string(),
            Command::PartialDump => "04".to_string(),
            Command::RtcUpdate { epoch } => format!("AA{epoch:08X}"),
        }
    }

    /// Binary payload bytes sent on the wire.
    pub fn payload(&self) -> Result<Vec<u8>, EncodingError> {
        decode_hex(&self.payload_text())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Clear => "clear",
            Command::FullDump => "full-dump",
            Command::PartialDump => "partial-dump",
            Command::RtcUpdate { .. } => "rtc-update",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name(), self.payload_text())
    }
}

/// Builds command data frames addressed to one inject channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEncoder {
    inject_id: CanId,
}

impl Default for CommandEncoder {
    fn default() -> Self {
        Self {
            inject_id: CanId::from_bytes(0x00, 0x10),
        }
    }
}

impl CommandEncoder {
    pub fn new(inject_id: CanId) -> Self {
        Self { inject_id }
    }

    /// Encoder for an inject id given as 1-3 hex digits.
    pub fn from_hex(inject_id: &str) -> Result<Self, EncodingError> {
        CanId::from_hex(inject_id).map(Self::new)
    }

    pub fn inject_id(&self) -> CanId {
        self.inject_id
    }

    /// Append the data frame for `command` to `dst`.
    pub fn encode(&self, command: &Command, dst: &mut BytesMut) -> Result<(), EncodingError> {
        let payload = command.payload()?;
        encode_data_frame(self.inject_id, &payload, dst)
    }
}
