use bytes::Bytes;

use crate::codec::{
    decode_data, decode_settings, declared_payload_len, is_data_type, CanId, DataFrame,
    SettingsFrame, MAX_PAYLOAD, SETTINGS_FRAME_LEN, SETTINGS_MARKER, SYNC,
};

/// Shortest buffer that is reported as a data frame.
const MIN_DATA_FRAME_LEN: usize = 6;

const PAYLOAD_OFFSET: usize = 4;

/// Classification of a completed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Settings,
    Data,
    Unknown,
}

/// One frame as it came off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    raw: Bytes,
    kind: FrameKind,
}

impl Frame {
    /// Classify a completed buffer.
    pub fn classify(raw: impl Into<Bytes>) -> Self {
        let raw = raw.into();
        let kind = if is_settings_marked(&raw) {
            FrameKind::Settings
        } else if raw.len() >= MIN_DATA_FRAME_LEN && raw[0] == SYNC && is_data_type(raw[1]) {
            FrameKind::Data
        } else {
            FrameKind::Unknown
        };
        Self { raw, kind }
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    /// The complete frame bytes, markers included.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Id of a data frame, read from bytes 3 (high) and 2 (low).
    pub fn id(&self) -> Option<CanId> {
        match self.kind {
            FrameKind::Data => Some(CanId::from_bytes(self.raw[3], self.raw[2])),
            _ => None,
        }
    }

    /// Payload of a data frame: the declared length, cut to at most
    /// [`MAX_PAYLOAD`] bytes and never past the end marker position.
    pub fn payload(&self) -> Option<&[u8]> {
        if self.kind != FrameKind::Data {
            return None;
        }
        let declared = declared_payload_len(self.raw[1]);
        let end = (PAYLOAD_OFFSET + declared)
            .min(PAYLOAD_OFFSET + MAX_PAYLOAD)
            .min(self.raw.len() - 1);
        Some(&self.raw[PAYLOAD_OFFSET..end])
    }

    pub fn data(&self) -> Option<DataFrame> {
        match self.kind {
            FrameKind::Data => decode_data(&self.raw),
            _ => None,
        }
    }

    pub fn settings(&self) -> Option<SettingsFrame> {
        match self.kind {
            FrameKind::Settings => decode_settings(&self.raw),
            _ => None,
        }
    }
}

/// Exactly 20 bytes starting with the settings markers.
pub(crate) fn is_settings_marked(raw: &[u8]) -> bool {
    raw.len() == SETTINGS_FRAME_LEN && raw[0] == SYNC && raw[1] == SETTINGS_MARKER
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::codec::{encode_data, encode_settings, BusMode, CanSpeed, IdFormat};

    #[test]
    fn classifies_settings() {
        let raw = encode_settings(CanSpeed::Kbps1000, BusMode::Loopback, IdFormat::Extended);
        let frame = Frame::classify(raw.to_vec());
        assert_eq!(frame.kind(), FrameKind::Settings);
        assert_eq!(frame.settings().unwrap().speed, CanSpeed::Kbps1000);
        assert!(frame.payload().is_none());
        assert!(frame.id().is_none());
    }

    #[test]
    fn classifies_data() {
        let mut buf = BytesMut::new();
        encode_data("011", &[0xDE, 0xAD], &mut buf).unwrap();
        let frame = Frame::classify(buf.freeze());
        assert_eq!(frame.kind(), FrameKind::Data);
        assert_eq!(frame.id().unwrap().to_string(), "0011");
        assert_eq!(frame.payload().unwrap(), &[0xDE, 0xAD]);
        assert_eq!(frame.data().unwrap().payload.as_ref(), &[0xDE, 0xAD]);
    }

    #[test]
    fn empty_data_frame_is_unknown() {
        let mut buf = BytesMut::new();
        encode_data("011", &[], &mut buf).unwrap();
        assert_eq!(Frame::classify(buf.freeze()).kind(), FrameKind::Unknown);
    }

    #[test]
    fn stray_and_unhandled_frames_are_unknown() {
        assert_eq!(Frame::classify(vec![0x13u8]).kind(), FrameKind::Unknown);
        assert_eq!(Frame::classify(vec![0xAAu8, 0x07]).kind(), FrameKind::Unknown);
    }

    #[test]
    fn oversized_dlc_is_still_data() {
        let frame = Frame::classify(vec![
            0xAAu8, 0xCA, 0x00, 0x00, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 0x55,
        ]);
        assert_eq!(frame.kind(), FrameKind::Data);
        assert_eq!(frame.payload().unwrap(), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(frame.data().is_none());
    }

    #[test]
    fn dlc_nine_payload_stops_at_eight_bytes() {
        let frame = Frame::classify(vec![
            0xAAu8, 0xC9, 0x11, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x55,
        ]);
        assert_eq!(frame.kind(), FrameKind::Data);
        assert_eq!(frame.id().unwrap().to_string(), "0011");
        assert_eq!(
            frame.payload().unwrap(),
            &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]
        );
    }

    #[test]
    fn payload_stops_before_the_last_byte() {
        // Declares four payload bytes; the buffer ends early and its last
        // byte sits where the end marker would be.
        let frame = Frame::classify(vec![0xAAu8, 0xC4, 0x11, 0x00, 0x01, 0x02]);
        assert_eq!(frame.kind(), FrameKind::Data);
        assert_eq!(frame.payload().unwrap(), &[0x01]);
        assert!(frame.data().is_none());
    }
}
