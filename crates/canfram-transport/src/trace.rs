use std::time::Duration;

use tracing::info;

use crate::error::Result;
use crate::traits::ByteChannel;

/// How much serial traffic to echo to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum TraceLevel {
    /// No traffic tracing.
    #[default]
    Off,
    /// Hex of every outbound write and every inbound byte.
    Bytes,
    /// `Bytes`, plus a printable view of outbound payload bytes.
    Verbose,
}

impl TraceLevel {
    /// Map a repeated `-t` flag count to a level.
    pub fn from_count(count: u8) -> Self {
        match count {
            0 => Self::Off,
            1 => Self::Bytes,
            _ => Self::Verbose,
        }
    }
}

/// Render bytes as lowercase two-digit hex separated by spaces.
pub fn hex_line(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Printable view of the bytes between a data frame's id and its end marker.
fn payload_text(frame: &[u8]) -> String {
    if frame.len() < 5 {
        return String::new();
    }
    frame[4..frame.len() - 1]
        .iter()
        .map(|&b| {
            if b.is_ascii_alphanumeric() {
                b as char
            } else {
                '.'
            }
        })
        .collect()
}

/// A [`ByteChannel`] wrapper that logs traffic under the `canfram::traffic` target.
#[derive(Debug)]
pub struct Traced<C> {
    inner: C,
    level: TraceLevel,
}

impl<C: ByteChannel> Traced<C> {
    pub fn new(inner: C, level: TraceLevel) -> Self {
        Self { inner, level }
    }

    pub fn level(&self) -> TraceLevel {
        self.level
    }

    pub fn get_ref(&self) -> &C {
        &self.inner
    }
}

impl<C: ByteChannel> ByteChannel for Traced<C> {
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        let byte = self.inner.read_byte(timeout)?;
        if let (Some(b), true) = (byte, self.level >= TraceLevel::Bytes) {
            info!(target: "canfram::traffic", "<<< {b:02x}");
        }
        Ok(byte)
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        match self.level {
            TraceLevel::Off => {}
            TraceLevel::Bytes => info!(target: "canfram::traffic", ">>> {}", hex_line(bytes)),
            TraceLevel::Verbose => info!(
                target: "canfram::traffic",
                ">>> {}    '{}'",
                hex_line(bytes),
                payload_text(bytes)
            ),
        }
        self.inner.send(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedChannel;

    #[test]
    fn hex_line_formats_lowercase_pairs() {
        assert_eq!(hex_line(&[0xAA, 0x05, 0xC1]), "aa 05 c1");
        assert_eq!(hex_line(&[]), "");
    }

    #[test]
    fn payload_text_masks_non_alphanumerics() {
        let frame = [0xAA, 0xC3, 0x10, 0x00, b'O', b'k', 0x01, 0x55];
        assert_eq!(payload_text(&frame), "Ok.");
        assert_eq!(payload_text(&[0xAA]), "");
    }

    #[test]
    fn trace_level_from_count() {
        assert_eq!(TraceLevel::from_count(0), TraceLevel::Off);
        assert_eq!(TraceLevel::from_count(1), TraceLevel::Bytes);
        assert_eq!(TraceLevel::from_count(5), TraceLevel::Verbose);
    }

    #[test]
    fn traced_channel_passes_traffic_through() {
        let mut traced = Traced::new(ScriptedChannel::new([0x42]), TraceLevel::Verbose);
        traced.send(&[0xAA, 0xC0, 0x10, 0x00, 0x55]).unwrap();
        assert_eq!(
            traced.read_byte(Duration::from_millis(1)).unwrap(),
            Some(0x42)
        );
        assert_eq!(traced.read_byte(Duration::from_millis(1)).unwrap(), None);
        assert_eq!(traced.get_ref().sent(), &[0xAA, 0xC0, 0x10, 0x00, 0x55]);
    }
}
