//! In-memory [`ByteChannel`] for exercising the layers above without hardware.

use std::collections::VecDeque;
use std::time::Duration;

use crate::error::{Result, TransportError};
use crate::traits::ByteChannel;

type DrainHook = Box<dyn FnMut() + Send>;

/// Replays a fixed inbound byte script and records every outbound write.
///
/// Once the script is empty, reads report "no data" (after the optional
/// drain hook has fired once), mimicking a quiet bus.
pub struct ScriptedChannel {
    inbound: VecDeque<u8>,
    sent: Vec<u8>,
    writes: usize,
    on_drained: Option<DrainHook>,
    fail_reads_when_drained: bool,
    fail_sends: bool,
}

impl ScriptedChannel {
    pub fn new(inbound: impl IntoIterator<Item = u8>) -> Self {
        Self {
            inbound: inbound.into_iter().collect(),
            sent: Vec::new(),
            writes: 0,
            on_drained: None,
            fail_reads_when_drained: false,
            fail_sends: false,
        }
    }

    /// Run `hook` the first time a read finds the script empty.
    pub fn on_drained(mut self, hook: impl FnMut() + Send + 'static) -> Self {
        self.on_drained = Some(Box::new(hook));
        self
    }

    /// Report an I/O error instead of "no data" once the script is empty.
    pub fn fail_reads_when_drained(mut self) -> Self {
        self.fail_reads_when_drained = true;
        self
    }

    /// Make every `send` fail.
    pub fn fail_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    /// Append more inbound bytes.
    pub fn push_inbound(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes.iter().copied());
    }

    /// Everything written so far, concatenated.
    pub fn sent(&self) -> &[u8] {
        &self.sent
    }

    /// Number of `send` calls that succeeded.
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Inbound bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.inbound.len()
    }
}

impl ByteChannel for ScriptedChannel {
    fn read_byte(&mut self, _timeout: Duration) -> Result<Option<u8>> {
        if let Some(byte) = self.inbound.pop_front() {
            return Ok(Some(byte));
        }
        if let Some(mut hook) = self.on_drained.take() {
            hook();
        }
        if self.fail_reads_when_drained {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "scripted read failure",
            )));
        }
        Ok(None)
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        if self.fail_sends {
            return Err(TransportError::Closed);
        }
        self.sent.extend_from_slice(bytes);
        self.writes += 1;
        Ok(())
    }
}

impl std::fmt::Debug for ScriptedChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedChannel")
            .field("remaining", &self.inbound.len())
            .field("sent", &self.sent.len())
            .finish()
    }
}
