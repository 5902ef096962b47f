use std::fmt;
use std::io;

use canfram_dump::DumpError;
use canfram_frame::{EncodingError, FrameError};
use canfram_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

/// Anything that went wrong on the serial line is a transport failure,
/// except a device node we may not open.
pub fn transport_error(context: &str, err: TransportError) -> CliError {
    let denied = match &err {
        TransportError::Open { source, .. }
        | TransportError::Configure { source, .. }
        | TransportError::Io(source) => source.kind() == io::ErrorKind::PermissionDenied,
        TransportError::Closed => false,
    };
    let code = if denied {
        PERMISSION_DENIED
    } else {
        TRANSPORT_ERROR
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn encoding_error(context: &str, err: EncodingError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Transport(err) => transport_error(context, err),
        FrameError::Encoding(err) => encoding_error(context, err),
        FrameError::Framing { .. } | FrameError::Checksum { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::Cancelled => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn dump_error(context: &str, err: DumpError) -> CliError {
    match err {
        DumpError::Transport(err) => transport_error(context, err),
        DumpError::Frame(err) => frame_error(context, err),
        DumpError::Encoding(err) => encoding_error(context, err),
        DumpError::Sink(err) => io_error(context, err),
    }
}
