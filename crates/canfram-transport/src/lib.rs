//! Raw byte transport to a USB-CAN serial adapter.
//!
//! This is the lowest layer of canfram. It knows nothing about frames: it
//! moves single bytes in and whole buffers out over a character device that
//! has been put into raw 8N2 mode. Everything else builds on the
//! [`ByteChannel`] trait provided here.

pub mod error;
pub mod trace;
pub mod traits;

pub mod serial;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::{Result, TransportError};
pub use trace::{hex_line, TraceLevel, Traced};
pub use traits::ByteChannel;

pub use serial::{SerialPort, DEFAULT_BAUD_RATE};

#[cfg(any(test, feature = "mock"))]
pub use mock::ScriptedChannel;
