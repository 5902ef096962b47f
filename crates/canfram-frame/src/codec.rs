use std::fmt;
use std::str::FromStr;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::warn;

use crate::error::EncodingError;

/// First byte of every well-formed frame.
pub const SYNC: u8 = 0xAA;

/// Second byte of a settings frame.
pub const SETTINGS_MARKER: u8 = 0x55;

/// Settings frame command byte (set bus parameters, variable protocol).
pub const SETTINGS_COMMAND: u8 = 0x12;

/// Settings frames are always this long, checksum included.
pub const SETTINGS_FRAME_LEN: usize = 20;

/// High nibble of a standard data frame's type byte.
pub const DATA_TYPE: u8 = 0xC0;

/// Last byte of a data frame.
pub const DATA_END: u8 = 0x55;

/// Sync + type + two id bytes + end marker.
pub const DATA_OVERHEAD: usize = 5;

/// Largest classic CAN payload.
pub const MAX_PAYLOAD: usize = 8;

const TYPE_KIND_MASK: u8 = 0xF0;
const DLC_MASK: u8 = 0x0F;
const SETTINGS_CHECKSUM_RANGE: std::ops::Range<usize> = 2..SETTINGS_FRAME_LEN - 1;

/// CAN bus bit-rate tiers understood by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum CanSpeed {
    Kbps1000 = 0x01,
    Kbps800 = 0x02,
    #[default]
    Kbps500 = 0x03,
    Kbps400 = 0x04,
    Kbps250 = 0x05,
    Kbps200 = 0x06,
    Kbps125 = 0x07,
    Kbps100 = 0x08,
    Kbps50 = 0x09,
    Kbps20 = 0x0A,
    Kbps10 = 0x0B,
    Kbps5 = 0x0C,
}

impl CanSpeed {
    /// Every tier, fastest first.
    pub const ALL: [CanSpeed; 12] = [
        CanSpeed::Kbps1000,
        CanSpeed::Kbps800,
        CanSpeed::Kbps500,
        CanSpeed::Kbps400,
        CanSpeed::Kbps250,
        CanSpeed::Kbps200,
        CanSpeed::Kbps125,
        CanSpeed::Kbps100,
        CanSpeed::Kbps50,
        CanSpeed::Kbps20,
        CanSpeed::Kbps10,
        CanSpeed::Kbps5,
    ];

    /// Exact match on a bit rate in bits per second.
    pub fn from_bps(bps: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|speed| speed.bps() == bps)
    }

    /// Like [`CanSpeed::from_bps`], but unsupported rates fall back to 500 kbit/s.
    pub fn from_bps_or_default(bps: u32) -> Self {
        Self::from_bps(bps).unwrap_or_else(|| {
            let fallback = Self::default();
            warn!(
                requested = bps,
                fallback = fallback.bps(),
                "unsupported CAN speed, using default"
            );
            fallback
        })
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|speed| speed.code() == code)
    }

    pub fn bps(self) -> u32 {
        match self {
            CanSpeed::Kbps1000 => 1_000_000,
            CanSpeed::Kbps800 => 800_000,
            CanSpeed::Kbps500 => 500_000,
            CanSpeed::Kbps400 => 400_000,
            CanSpeed::Kbps250 => 250_000,
            CanSpeed::Kbps200 => 200_000,
            CanSpeed::Kbps125 => 125_000,
            CanSpeed::Kbps100 => 100_000,
            CanSpeed::Kbps50 => 50_000,
            CanSpeed::Kbps20 => 20_000,
            CanSpeed::Kbps10 => 10_000,
            CanSpeed::Kbps5 => 5_000,
        }
    }

    /// Byte sent in the settings frame.
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Adapter bus mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum BusMode {
    #[default]
    Normal = 0x00,
    Loopback = 0x01,
    Silent = 0x02,
    LoopbackSilent = 0x03,
}

impl BusMode {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(BusMode::Normal),
            0x01 => Some(BusMode::Loopback),
            0x02 => Some(BusMode::Silent),
            0x03 => Some(BusMode::LoopbackSilent),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Width of CAN identifiers the adapter should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum IdFormat {
    #[default]
    Standard = 0x01,
    Extended = 0x02,
}

impl IdFormat {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(IdFormat::Standard),
            0x02 => Some(IdFormat::Extended),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// A standard CAN id as written by the operator: one to three hex digits.
///
/// On the wire the id occupies two bytes, low byte first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanId(u16);

impl CanId {
    /// Largest id expressible in three hex digits.
    pub const MAX: u16 = 0xFFF;

    /// Parse `"1"`, `"AB"` or `"010"` style id text.
    ///
    /// With three digits the first digit lands in the high byte; shorter ids
    /// only populate the low byte.
    pub fn from_hex(text: &str) -> Result<Self, EncodingError> {
        if text.is_empty() || text.len() > 3 || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(EncodingError::InvalidId(text.to_string()));
        }
        u16::from_str_radix(text, 16)
            .map(CanId)
            .map_err(|_| EncodingError::InvalidId(text.to_string()))
    }

    pub fn from_bytes(msb: u8, lsb: u8) -> Self {
        CanId(u16::from_be_bytes([msb, lsb]))
    }

    pub fn raw(self) -> u16 {
        self.0
    }

    pub fn msb(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn lsb(self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}

impl FromStr for CanId {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CanId::from_hex(s)
    }
}

impl fmt::Display for CanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}{:02x}", self.msb(), self.lsb())
    }
}

/// Decoded fields of a settings frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsFrame {
    pub speed: CanSpeed,
    pub id_format: IdFormat,
    pub mode: BusMode,
}

/// Decoded fields of a data frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    pub id: CanId,
    pub payload: Bytes,
}

/// Additive checksum: byte sum modulo 256.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Checksum a settings frame is expected to carry in its last byte.
pub(crate) fn settings_checksum(frame: &[u8]) -> u8 {
    checksum(&frame[SETTINGS_CHECKSUM_RANGE])
}

/// Build the 20-byte settings frame.
///
/// ```text
/// AA 55 12 <speed> <idFmt> [filter ×4] [mask ×4] <mode> 01 00 00 00 00 <checksum>
/// ```
/// Filter and mask are always zero (accept everything). The checksum covers
/// bytes 2 through 18, between the markers and the checksum byte.
pub fn encode_settings(speed: CanSpeed, mode: BusMode, id_format: IdFormat) -> [u8; SETTINGS_FRAME_LEN] {
    let mut frame = [0u8; SETTINGS_FRAME_LEN];
    frame[0] = SYNC;
    frame[1] = SETTINGS_MARKER;
    frame[2] = SETTINGS_COMMAND;
    frame[3] = speed.code();
    frame[4] = id_format.code();
    // 5..13: filter id and mask id, unused
    frame[13] = mode.code();
    frame[14] = 0x01;
    // 15..19: reserved
    frame[SETTINGS_FRAME_LEN - 1] = settings_checksum(&frame);
    frame
}

/// Decode a settings frame's fields. Does not verify the checksum.
pub fn decode_settings(raw: &[u8]) -> Option<SettingsFrame> {
    if raw.len() != SETTINGS_FRAME_LEN || raw[0] != SYNC || raw[1] != SETTINGS_MARKER {
        return None;
    }
    Some(SettingsFrame {
        speed: CanSpeed::from_code(raw[3])?,
        id_format: IdFormat::from_code(raw[4])?,
        mode: BusMode::from_code(raw[13])?,
    })
}

/// Encode a data frame addressed to the id written as hex text.
pub fn encode_data(id: &str, payload: &[u8], dst: &mut BytesMut) -> Result<(), EncodingError> {
    let id = CanId::from_hex(id)?;
    encode_data_frame(id, payload, dst)
}

/// Encode a data frame.
///
/// Wire format:
/// ```text
/// ┌──────┬──────────────┬────────┬────────┬─────────────┬──────┐
/// │ 0xAA │ 0xC0 | DLC   │ id LSB │ id MSB │ payload×DLC │ 0x55 │
/// └──────┴──────────────┴────────┴────────┴─────────────┴──────┘
/// ```
pub fn encode_data_frame(id: CanId, payload: &[u8], dst: &mut BytesMut) -> Result<(), EncodingError> {
    if payload.len() > MAX_PAYLOAD {
        return Err(EncodingError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    dst.reserve(DATA_OVERHEAD + payload.len());
    dst.put_u8(SYNC);
    dst.put_u8(DATA_TYPE | payload.len() as u8);
    dst.put_u8(id.lsb());
    dst.put_u8(id.msb());
    dst.put_slice(payload);
    dst.put_u8(DATA_END);
    Ok(())
}

/// Decode a complete data frame. Returns `None` for anything else.
pub fn decode_data(raw: &[u8]) -> Option<DataFrame> {
    if raw.len() < DATA_OVERHEAD || raw[0] != SYNC || !is_data_type(raw[1]) {
        return None;
    }
    let len = declared_payload_len(raw[1]);
    if len > MAX_PAYLOAD || raw.len() != len + DATA_OVERHEAD {
        return None;
    }
    Some(DataFrame {
        id: CanId::from_bytes(raw[3], raw[2]),
        payload: Bytes::copy_from_slice(&raw[4..4 + len]),
    })
}

/// Convert hex text to bytes, two digits per byte.
///
/// Characters that are not hex digits are skipped, a dangling final digit is
/// ignored, and output stops at [`MAX_PAYLOAD`] bytes.
pub fn decode_hex(text: &str) -> Result<Vec<u8>, EncodingError> {
    let mut out = Vec::with_capacity(MAX_PAYLOAD);
    let mut high: Option<u8> = None;

    for c in text.chars() {
        let Some(nibble) = c.to_digit(16) else {
            continue;
        };
        match high.take() {
            None => high = Some(nibble as u8),
            Some(h) => {
                out.push((h << 4) | nibble as u8);
                if out.len() == MAX_PAYLOAD {
                    if text.chars().filter(char::is_ascii_hexdigit).count() > MAX_PAYLOAD * 2 {
                        warn!(bytes = MAX_PAYLOAD, "hex payload truncated");
                    }
                    break;
                }
            }
        }
    }

    if out.is_empty() {
        return Err(EncodingError::EmptyPayload(text.to_string()));
    }
    Ok(out)
}

pub(crate) fn is_data_type(type_byte: u8) -> bool {
    type_byte & TYPE_KIND_MASK == DATA_TYPE
}

pub(crate) fn declared_payload_len(type_byte: u8) -> usize {
    (type_byte & DLC_MASK) as usize
}
