use canfram_frame::{EncodingError, FrameError};
use canfram_transport::TransportError;

/// Errors that end a device operation.
#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// A command frame could not be built.
    #[error("encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    /// Writing a record to the sink failed.
    #[error("sink write failed: {0}")]
    Sink(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DumpError>;
