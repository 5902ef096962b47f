use std::time::Duration;

use crate::error::Result;

/// A raw, unframed byte channel to the adapter.
///
/// Reads are one byte at a time and bounded in time so callers can check for
/// cancellation between attempts. Writes are all-or-nothing.
pub trait ByteChannel {
    /// Wait at most `timeout` for one byte.
    ///
    /// Returns `Ok(None)` when nothing arrived in time.
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>>;

    /// Write every byte of `bytes`, blocking until done or failed.
    fn send(&mut self, bytes: &[u8]) -> Result<()>;
}

impl<C: ByteChannel + ?Sized> ByteChannel for &mut C {
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        (**self).read_byte(timeout)
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).send(bytes)
    }
}

impl<C: ByteChannel + ?Sized> ByteChannel for Box<C> {
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        (**self).read_byte(timeout)
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).send(bytes)
    }
}
