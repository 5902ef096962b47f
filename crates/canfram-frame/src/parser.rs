use bytes::{Bytes, BytesMut};

use crate::codec::{
    declared_payload_len, is_data_type, DATA_OVERHEAD, SETTINGS_FRAME_LEN, SETTINGS_MARKER, SYNC,
};

/// Default capacity of the frame assembly buffer.
pub const MAX_FRAME_LEN: usize = 32;

/// Where the parser stands after the last byte it was fed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// Nothing buffered; the next byte should be `0xAA`.
    ExpectSync,
    /// Sync seen; the next byte selects the frame kind.
    ExpectType,
    /// Inside a settings frame, waiting for all 20 bytes.
    AccumulateSettings,
    /// Inside a data frame of the given total length.
    AccumulateData(usize),
    /// The buffer holds one whole frame.
    Complete,
    /// The buffer filled before the frame completed.
    Overflow,
}

/// Incremental frame boundary detector.
///
/// There is no length prefix or escape scheme on the adapter link, so the
/// frame length is inferred from the first two bytes:
/// - a leading byte other than `0xAA` is a complete one-byte frame
/// - `AA 55` starts a 20-byte settings frame
/// - `AA Cn` starts a data frame of `n + 5` bytes
/// - any other second byte ends the frame at two bytes
///
/// The parser never searches ahead for the next sync byte.
#[derive(Debug)]
pub struct FrameParser {
    buf: BytesMut,
    state: ParseState,
    max_len: usize,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    pub fn new() -> Self {
        Self::with_capacity(MAX_FRAME_LEN)
    }

    pub fn with_capacity(max_len: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(max_len),
            state: ParseState::ExpectSync,
            max_len,
        }
    }

    /// Feed one byte and return the resulting state.
    ///
    /// Feeding a parser that is `Complete` or `Overflow` starts a new frame.
    pub fn push(&mut self, byte: u8) -> ParseState {
        if matches!(self.state, ParseState::Complete | ParseState::Overflow) {
            self.reset();
        }
        if self.buf.len() >= self.max_len {
            self.state = ParseState::Overflow;
            return self.state;
        }

        self.buf.extend_from_slice(&[byte]);
        let len = self.buf.len();

        self.state = match self.state {
            ParseState::ExpectSync if byte == SYNC => ParseState::ExpectType,
            ParseState::ExpectSync => ParseState::Complete,
            ParseState::ExpectType if byte == SETTINGS_MARKER => ParseState::AccumulateSettings,
            ParseState::ExpectType if is_data_type(byte) => {
                ParseState::AccumulateData(declared_payload_len(byte) + DATA_OVERHEAD)
            }
            ParseState::ExpectType => ParseState::Complete,
            ParseState::AccumulateSettings if len >= SETTINGS_FRAME_LEN => ParseState::Complete,
            ParseState::AccumulateData(total) if len >= total => ParseState::Complete,
            other => other,
        };
        self.state
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Bytes of the frame assembled so far.
    pub fn buffer(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_len
    }

    /// Drop any partial frame.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.state = ParseState::ExpectSync;
    }

    /// Hand out the buffered bytes and start over.
    pub fn take_frame(&mut self) -> Bytes {
        let frame = self.buf.split().freeze();
        self.state = ParseState::ExpectSync;
        frame
    }
}

/// Whether `prefix` already holds a complete frame.
///
/// False for every strict prefix of a well-formed frame, true once its full
/// length is present. A first byte other than `0xAA` is complete on its own.
pub fn is_frame_complete(prefix: &[u8]) -> bool {
    let mut parser = FrameParser::with_capacity(prefix.len().max(MAX_FRAME_LEN));
    prefix
        .iter()
        .any(|&byte| parser.push(byte) == ParseState::Complete)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode_data, encode_settings, BusMode, CanSpeed, IdFormat};

    fn data_frame(len: usize) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_data("010", &[0x5A; 8][..len], &mut buf).unwrap();
        buf.to_vec()
    }

    #[test]
    fn strict_prefixes_are_incomplete() {
        let settings = encode_settings(CanSpeed::Kbps250, BusMode::Silent, IdFormat::Standard);
        for n in 0..settings.len() {
            assert!(!is_frame_complete(&settings[..n]), "settings prefix {n}");
        }
        assert!(is_frame_complete(&settings));

        for payload_len in 0..=8 {
            let frame = data_frame(payload_len);
            for n in 0..frame.len() {
                assert!(!is_frame_complete(&frame[..n]), "data[{payload_len}] prefix {n}");
            }
            assert!(is_frame_complete(&frame));
        }
    }

    #[test]
    fn stray_leading_byte_is_its_own_frame() {
        assert!(is_frame_complete(&[0x00]));
        assert!(is_frame_complete(&[0x55]));
        assert!(!is_frame_complete(&[0xAA]));
    }

    #[test]
    fn unknown_type_byte_completes_at_two() {
        assert!(is_frame_complete(&[0xAA, 0x12]));
        assert!(is_frame_complete(&[0xAA, 0xE3]));
    }

    #[test]
    fn states_follow_frame_structure() {
        let mut parser = FrameParser::new();
        assert_eq!(parser.state(), ParseState::ExpectSync);
        assert_eq!(parser.push(0xAA), ParseState::ExpectType);
        assert_eq!(parser.push(0xC2), ParseState::AccumulateData(7));
        for byte in [0x11, 0x00, 0x01, 0x02] {
            assert_eq!(parser.push(byte), ParseState::AccumulateData(7));
        }
        assert_eq!(parser.push(0x55), ParseState::Complete);
        assert_eq!(parser.len(), 7);

        let frame = parser.take_frame();
        assert_eq!(frame.as_ref(), &[0xAA, 0xC2, 0x11, 0x00, 0x01, 0x02, 0x55]);
        assert!(parser.is_empty());
        assert_eq!(parser.state(), ParseState::ExpectSync);

        assert_eq!(parser.push(0xAA), ParseState::ExpectType);
        assert_eq!(parser.push(0x55), ParseState::AccumulateSettings);
    }

    #[test]
    fn overflow_when_capacity_is_below_frame_length() {
        let settings = encode_settings(CanSpeed::Kbps500, BusMode::Normal, IdFormat::Standard);
        let mut parser = FrameParser::with_capacity(16);
        let mut states = settings.iter().map(|&b| parser.push(b));
        assert!(states
            .by_ref()
            .take(16)
            .all(|s| matches!(s, ParseState::ExpectType | ParseState::AccumulateSettings)));
        assert_eq!(states.next(), Some(ParseState::Overflow));
        drop(states);
        assert_eq!(parser.len(), 16);

        // The next byte starts over.
        assert_eq!(parser.push(0x01), ParseState::Complete);
        assert_eq!(parser.len(), 1);
    }
}
