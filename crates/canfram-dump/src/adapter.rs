use canfram_frame::{encode_settings, BusMode, CanSpeed, IdFormat, SETTINGS_FRAME_LEN};
use canfram_transport::ByteChannel;
use tracing::info;

use crate::error::Result;

/// Bus parameters pushed to the adapter at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdapterConfig {
    pub speed: CanSpeed,
    pub mode: BusMode,
    pub id_format: IdFormat,
}

impl AdapterConfig {
    /// Normal-mode, standard-id configuration at `bps`.
    ///
    /// Rates the adapter does not support fall back to 500 kbit/s.
    pub fn from_bps(bps: u32) -> Self {
        Self {
            speed: CanSpeed::from_bps_or_default(bps),
            ..Self::default()
        }
    }

    pub fn settings_frame(&self) -> [u8; SETTINGS_FRAME_LEN] {
        encode_settings(self.speed, self.mode, self.id_format)
    }
}

/// Send the settings frame once. The adapter does not acknowledge it.
pub fn configure_adapter<C: ByteChannel + ?Sized>(
    channel: &mut C,
    config: &AdapterConfig,
) -> Result<()> {
    channel.send(&config.settings_frame())?;
    info!(
        speed = config.speed.bps(),
        mode = ?config.mode,
        id_format = ?config.id_format,
        "adapter configured"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use canfram_transport::ScriptedChannel;

    use super::*;
    use crate::error::DumpError;

    #[test]
    fn writes_one_settings_frame() {
        let mut channel = ScriptedChannel::new([]);
        let config = AdapterConfig::from_bps(250_000);
        configure_adapter(&mut channel, &config).unwrap();

        assert_eq!(channel.writes(), 1);
        let sent = channel.sent();
        assert_eq!(sent.len(), 20);
        assert_eq!(&sent[..5], &[0xAA, 0x55, 0x12, 0x05, 0x01]);
        assert_eq!(sent[13], 0x00);
    }

    #[test]
    fn unsupported_speed_falls_back_to_default() {
        let config = AdapterConfig::from_bps(42);
        assert_eq!(config.speed, CanSpeed::Kbps500);
        assert_eq!(config.settings_frame()[3], 0x03);
    }

    #[test]
    fn write_failure_is_reported() {
        let mut channel = ScriptedChannel::new([]).fail_sends();
        let err = configure_adapter(&mut channel, &AdapterConfig::default()).unwrap_err();
        assert!(matches!(err, DumpError::Transport(_)));
    }
}
