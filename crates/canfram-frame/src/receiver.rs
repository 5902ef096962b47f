use std::time::Duration;

use canfram_transport::ByteChannel;
use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::codec::settings_checksum;
use crate::error::{FrameError, Result};
use crate::frame::{is_settings_marked, Frame};
use crate::parser::{FrameParser, ParseState, MAX_FRAME_LEN};

/// Default wait for a byte before re-checking cancellation.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Configuration for the frame receiver.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Longest wait for a single byte. Cancellation is checked between waits.
    pub poll_interval: Duration,
    /// Assembly buffer capacity. Default: 32 bytes.
    pub max_frame_len: usize,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_frame_len: MAX_FRAME_LEN,
        }
    }
}

/// Reads classified frames from a [`ByteChannel`], one byte at a time.
///
/// Each call assembles exactly one frame (or fails). Nothing is retried: a
/// frame that overflows the buffer or fails its checksum is dropped and the
/// caller decides whether to keep going.
pub struct FrameReceiver<C> {
    channel: C,
    parser: FrameParser,
    config: ReceiverConfig,
}

impl<C: ByteChannel> FrameReceiver<C> {
    /// Create a receiver with default configuration.
    pub fn new(channel: C) -> Self {
        Self::with_config(channel, ReceiverConfig::default())
    }

    /// Create a receiver with explicit configuration.
    pub fn with_config(channel: C, config: ReceiverConfig) -> Self {
        Self {
            channel,
            parser: FrameParser::with_capacity(config.max_frame_len),
            config,
        }
    }

    /// Read the next complete frame.
    ///
    /// Blocks until a frame completes, the buffer overflows, the channel
    /// fails, or `cancel` is set. Any partial frame is discarded on error.
    pub fn read_frame(&mut self, cancel: &CancelToken) -> Result<Frame> {
        self.parser.reset();

        loop {
            if cancel.is_cancelled() {
                self.discard_partial("cancelled");
                return Err(FrameError::Cancelled);
            }

            let byte = match self.channel.read_byte(self.config.poll_interval) {
                Ok(Some(byte)) => byte,
                Ok(None) => continue,
                Err(err) => {
                    self.discard_partial("transport error");
                    return Err(err.into());
                }
            };

            match self.parser.push(byte) {
                ParseState::Complete => break,
                ParseState::Overflow => {
                    let max = self.parser.capacity();
                    warn!(max, "frame assembly buffer overflow, discarding");
                    self.parser.reset();
                    return Err(FrameError::Framing { max });
                }
                _ => {}
            }
        }

        let raw = self.parser.take_frame();

        if is_settings_marked(&raw) {
            let expected = settings_checksum(&raw);
            let actual = raw[raw.len() - 1];
            if expected != actual {
                warn!(expected, actual, "settings frame checksum incorrect");
                return Err(FrameError::Checksum { expected, actual });
            }
        }

        let frame = Frame::classify(raw);
        debug!(kind = ?frame.kind(), len = frame.len(), "received frame");
        Ok(frame)
    }

    /// Discard everything currently pending on the channel.
    ///
    /// Stops at the first empty poll interval. Returns the number of bytes
    /// thrown away.
    pub fn drain(&mut self, cancel: &CancelToken) -> Result<usize> {
        self.parser.reset();
        let mut dropped = 0usize;
        while !cancel.is_cancelled() {
            match self.channel.read_byte(self.config.poll_interval)? {
                Some(_) => dropped += 1,
                None => break,
            }
        }
        debug!(dropped, "drained pending input");
        Ok(dropped)
    }

    /// Write raw bytes to the channel.
    pub fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.channel.send(bytes).map_err(FrameError::from)
    }

    /// Bytes of a frame currently being assembled.
    pub fn pending(&self) -> &[u8] {
        self.parser.buffer()
    }

    /// Borrow the underlying channel.
    pub fn get_ref(&self) -> &C {
        &self.channel
    }

    fn discard_partial(&mut self, reason: &str) {
        if !self.parser.is_empty() {
            debug!(len = self.parser.len(), reason, "discarding partial frame");
        }
        self.parser.reset();
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use canfram_transport::ScriptedChannel;

    use super::*;
    use crate::codec::{encode_data, encode_settings, BusMode, CanSpeed, IdFormat};
    use crate::frame::FrameKind;

    fn settings_bytes() -> Vec<u8> {
        encode_settings(CanSpeed::Kbps500, BusMode::Normal, IdFormat::Standard).to_vec()
    }

    fn data_bytes(id: &str, payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_data(id, payload, &mut buf).unwrap();
        buf.to_vec()
    }

    #[test]
    fn settings_then_data_yields_two_frames() {
        let mut wire = settings_bytes();
        wire.extend(data_bytes("011", &[0x01, 0x02]));
        let cancel = CancelToken::new();
        let mut receiver = FrameReceiver::new(ScriptedChannel::new(wire));

        let first = receiver.read_frame(&cancel).unwrap();
        assert_eq!(first.kind(), FrameKind::Settings);
        assert_eq!(first.len(), 20);

        let second = receiver.read_frame(&cancel).unwrap();
        assert_eq!(second.kind(), FrameKind::Data);
        assert_eq!(second.len(), 7);
        assert_eq!(second.payload().unwrap(), &[0x01, 0x02]);

        assert!(receiver.pending().is_empty());
        assert_eq!(receiver.get_ref().remaining(), 0);
    }

    #[test]
    fn corrupted_settings_checksum_is_rejected() {
        let mut wire = settings_bytes();
        wire[19] ^= 0xFF;
        let mut receiver = FrameReceiver::new(ScriptedChannel::new(wire));

        let err = receiver.read_frame(&CancelToken::new()).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Checksum {
                expected: 0x17,
                actual: 0xE8
            }
        ));
        assert!(err.is_recoverable());
        assert!(receiver.pending().is_empty());
    }

    #[test]
    fn stray_bytes_come_out_as_single_byte_frames() {
        let mut wire = vec![0x00, 0x7F];
        wire.extend(data_bytes("1", &[0x42]));
        let cancel = CancelToken::new();
        let mut receiver = FrameReceiver::new(ScriptedChannel::new(wire));

        for stray in [0x00, 0x7F] {
            let frame = receiver.read_frame(&cancel).unwrap();
            assert_eq!(frame.kind(), FrameKind::Unknown);
            assert_eq!(frame.raw(), &[stray]);
        }
        let frame = receiver.read_frame(&cancel).unwrap();
        assert_eq!(frame.kind(), FrameKind::Data);
        assert_eq!(frame.id().unwrap().raw(), 0x001);
    }

    #[test]
    fn overflow_reports_framing_error_and_continues() {
        let mut wire = settings_bytes();
        wire.extend(data_bytes("010", &[0x09]));
        let config = ReceiverConfig {
            max_frame_len: 16,
            ..ReceiverConfig::default()
        };
        let cancel = CancelToken::new();
        let mut receiver = FrameReceiver::with_config(ScriptedChannel::new(wire), config);

        let err = receiver.read_frame(&cancel).unwrap_err();
        assert!(matches!(err, FrameError::Framing { max: 16 }));

        // The tail of the oversized frame resyncs as stray single bytes.
        let mut kinds = Vec::new();
        loop {
            let frame = receiver.read_frame(&cancel).unwrap();
            kinds.push(frame.kind());
            if frame.kind() == FrameKind::Data {
                break;
            }
        }
        assert_eq!(kinds.last(), Some(&FrameKind::Data));
        assert!(kinds[..kinds.len() - 1]
            .iter()
            .all(|k| *k == FrameKind::Unknown));
    }

    #[test]
    fn cancellation_discards_partial_frame() {
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let channel = ScriptedChannel::new([0xAA, 0xC3, 0x10]).on_drained(move || trigger.cancel());
        let mut receiver = FrameReceiver::new(channel);

        let err = receiver.read_frame(&cancel).unwrap_err();
        assert!(matches!(err, FrameError::Cancelled));
        assert!(receiver.pending().is_empty());
    }

    #[test]
    fn cancelled_before_start_reads_nothing() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut receiver = FrameReceiver::new(ScriptedChannel::new([0x01]));
        assert!(matches!(
            receiver.read_frame(&cancel),
            Err(FrameError::Cancelled)
        ));
        assert_eq!(receiver.get_ref().remaining(), 1);
    }

    #[test]
    fn transport_failure_is_surfaced() {
        let channel = ScriptedChannel::new([0xAA]).fail_reads_when_drained();
        let mut receiver = FrameReceiver::new(channel);
        let err = receiver.read_frame(&CancelToken::new()).unwrap_err();
        assert!(matches!(err, FrameError::Transport(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn drain_discards_pending_bytes() {
        let mut receiver = FrameReceiver::new(ScriptedChannel::new([1, 2, 3, 4, 5]));
        assert_eq!(receiver.drain(&CancelToken::new()).unwrap(), 5);
        assert_eq!(receiver.get_ref().remaining(), 0);
    }

    #[test]
    fn send_writes_through() {
        let mut receiver = FrameReceiver::new(ScriptedChannel::new([]));
        receiver.send(&[0xAA, 0xC0, 0x10, 0x00, 0x55]).unwrap();
        assert_eq!(receiver.get_ref().sent(), &[0xAA, 0xC0, 0x10, 0x00, 0x55]);
    }
}
