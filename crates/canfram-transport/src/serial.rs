use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort as _, StopBits};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::ByteChannel;

/// Serial bit rate most USB-CAN adapters ship configured for.
pub const DEFAULT_BAUD_RATE: u32 = 2_000_000;

/// Upper bound on a stalled write.
const WRITE_STALL_TIMEOUT: Duration = Duration::from_secs(2);

/// A serial character device in raw 8N2 mode.
///
/// Every read waits at most the timeout the caller passes, so loops above can
/// check for cancellation between bytes. The device is closed on drop.
pub struct SerialPort {
    port: Box<dyn serialport::SerialPort>,
    path: PathBuf,
    baud_rate: u32,
}

impl SerialPort {
    /// Open `path` at `baud_rate`, 8 data bits, no parity, 2 stop bits, no
    /// flow control. Rates without a standard `Bxxxx` constant (2 Mbit and up)
    /// are accepted.
    pub fn open(path: impl AsRef<Path>, baud_rate: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        std::fs::metadata(&path).map_err(|source| TransportError::Open {
            path: path.clone(),
            source,
        })?;

        let port = serialport::new(path.to_string_lossy(), baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::Two)
            .flow_control(FlowControl::None)
            .timeout(WRITE_STALL_TIMEOUT)
            .open()
            .map_err(|err| open_error(&path, err))?;

        info!(?path, baud_rate, "opened serial device");

        Ok(Self {
            port,
            path,
            baud_rate,
        })
    }

    /// The device path this port was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The configured line rate in bits per second.
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.port
            .set_timeout(timeout)
            .map_err(|err| TransportError::Io(io::Error::from(err)))
    }
}

/// The node exists at this point, so anything but a permission problem means
/// it would not take the line settings.
fn open_error(path: &Path, err: serialport::Error) -> TransportError {
    let denied = err.kind == serialport::ErrorKind::Io(ErrorKind::PermissionDenied);
    let source = io::Error::from(err);
    if denied {
        TransportError::Open {
            path: path.to_path_buf(),
            source,
        }
    } else {
        TransportError::Configure {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl ByteChannel for SerialPort {
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        self.set_timeout(timeout)?;

        let mut byte = [0u8; 1];
        match self.port.read(&mut byte) {
            Ok(1) => Ok(Some(byte[0])),
            Ok(_) => Err(TransportError::Closed),
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.set_timeout(WRITE_STALL_TIMEOUT)?;
        match self.port.write_all(bytes).and_then(|()| self.port.flush()) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::WriteZero => return Err(TransportError::Closed),
            Err(err) => return Err(TransportError::Io(err)),
        }
        debug!(len = bytes.len(), "wrote to serial device");
        Ok(())
    }
}

impl std::fmt::Debug for SerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPort")
            .field("path", &self.path)
            .field("baud_rate", &self.baud_rate)
            .finish()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn open_missing_device_reports_path() {
        let path = format!("/dev/canfram-missing-{}", std::process::id());
        let err = SerialPort::open(&path, DEFAULT_BAUD_RATE).unwrap_err();
        match err {
            TransportError::Open { path: p, source } => {
                assert_eq!(p, PathBuf::from(&path));
                assert_eq!(source.kind(), ErrorKind::NotFound);
            }
            other => panic!("expected open error, got {other:?}"),
        }
    }

    #[test]
    fn non_tty_is_rejected_at_configure() {
        let dir = std::env::temp_dir().join(format!("canfram-serial-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("plain-file");
        std::fs::write(&path, b"not a tty").unwrap();

        let result = SerialPort::open(&path, DEFAULT_BAUD_RATE);
        assert!(matches!(result, Err(TransportError::Configure { .. })));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn open_error_keeps_permission_problems_at_open() {
        let path = Path::new("/dev/ttyUSB0");
        let denied = serialport::Error::new(
            serialport::ErrorKind::Io(ErrorKind::PermissionDenied),
            "denied",
        );
        assert!(matches!(
            open_error(path, denied),
            TransportError::Open { .. }
        ));

        let rejected = serialport::Error::new(serialport::ErrorKind::Unknown, "not a tty");
        assert!(matches!(
            open_error(path, rejected),
            TransportError::Configure { .. }
        ));
    }
}
