use std::path::PathBuf;

/// Errors that can occur on the serial byte channel.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the device node.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The device opened but rejected the line settings.
    #[error("failed to configure {path}: {source}")]
    Configure {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred while reading or writing.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device stopped accepting bytes mid-write.
    #[error("transport closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
