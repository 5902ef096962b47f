use canfram_transport::TransportError;

/// Reasons an outbound frame could not be built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    /// The id text is empty, longer than three digits, or not hex.
    #[error("CAN id {0:?} is not 1-3 hex digits")]
    InvalidId(String),

    /// More than eight payload bytes.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// Hex payload text contained no complete byte.
    #[error("no hex bytes in payload text {0:?}")]
    EmptyPayload(String),
}

/// Errors that can occur while building or receiving frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The assembly buffer filled up before the frame completed.
    #[error("frame overflowed {max}-byte assembly buffer")]
    Framing { max: usize },

    /// A settings frame arrived with a bad checksum.
    #[error("settings frame checksum mismatch (expected {expected:#04x}, got {actual:#04x})")]
    Checksum { expected: u8, actual: u8 },

    /// An outbound frame could not be encoded.
    #[error("encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    /// The underlying byte channel failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Cancellation was requested before a frame completed.
    #[error("receive cancelled")]
    Cancelled,
}

impl FrameError {
    /// Errors after which the caller may simply move on to the next frame.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FrameError::Framing { .. } | FrameError::Checksum { .. })
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
