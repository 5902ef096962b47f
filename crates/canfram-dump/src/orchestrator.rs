use std::time::Duration;

use bytes::BytesMut;
use canfram_frame::{CancelToken, Frame, FrameError, FrameKind, FrameReceiver};
use canfram_transport::ByteChannel;
use tracing::{debug, info, warn};

use crate::command::{Command, CommandEncoder};
use crate::error::{DumpError, Result};
use crate::sink::{FrameRecord, Sink};

/// Pause between sending a command and reading the first response frame.
pub const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Frames the device streams for a full 32 KiB FRAM dump.
pub const FULL_DUMP_FRAMES: usize = 7190;

/// Frames the device streams for one 512-byte sector.
pub const SECTOR_DUMP_FRAMES: usize = 128;

/// One command plus the number of frames to collect after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpJob {
    pub command: Command,
    pub expected_frames: usize,
    /// Short name used for artifacts and logs.
    pub label: &'static str,
}

impl DumpJob {
    pub fn new(command: Command, expected_frames: usize, label: &'static str) -> Self {
        Self {
            command,
            expected_frames,
            label,
        }
    }

    pub fn full_dump() -> Self {
        Self::new(Command::FullDump, FULL_DUMP_FRAMES, "dump-fram-32kb")
    }

    pub fn sector_dump() -> Self {
        Self::new(Command::PartialDump, SECTOR_DUMP_FRAMES, "dump-fram-512b")
    }

    /// Clear the FRAM and read the single reply frame.
    pub fn clear() -> Self {
        Self::new(Command::Clear, 1, "clear-fram")
    }

    /// Set the device clock; nothing is read back.
    pub fn rtc_update(epoch: u32) -> Self {
        Self::new(Command::RtcUpdate { epoch }, 0, "update-rtc")
    }

    /// Override the frame budget.
    pub fn with_frames(mut self, expected_frames: usize) -> Self {
        self.expected_frames = expected_frames;
        self
    }
}

/// Phase of a running dump job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DumpState {
    SendCommand,
    Settle,
    Receive { remaining: usize },
    Done,
}

/// What a dump job did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpReport {
    /// Frame budget of the job.
    pub requested: usize,
    /// Records written to the sink.
    pub records: usize,
    /// Settings frames among the records, written as unknown records.
    pub settings: usize,
    pub framing_errors: usize,
    pub checksum_errors: usize,
    /// Whether cancellation cut the job short.
    pub cancelled: bool,
}

impl DumpReport {
    /// Receive attempts that produced nothing for the sink.
    pub fn gaps(&self) -> usize {
        self.framing_errors + self.checksum_errors
    }
}

/// Dump orchestration settings.
#[derive(Debug, Clone)]
pub struct DumperConfig {
    pub settle_delay: Duration,
}

impl Default for DumperConfig {
    fn default() -> Self {
        Self {
            settle_delay: SETTLE_DELAY,
        }
    }
}

/// Runs dump jobs against one adapter.
pub struct Dumper<C> {
    receiver: FrameReceiver<C>,
    encoder: CommandEncoder,
    config: DumperConfig,
}

impl<C: ByteChannel> Dumper<C> {
    pub fn new(receiver: FrameReceiver<C>, encoder: CommandEncoder) -> Self {
        Self::with_config(receiver, encoder, DumperConfig::default())
    }

    pub fn with_config(
        receiver: FrameReceiver<C>,
        encoder: CommandEncoder,
        config: DumperConfig,
    ) -> Self {
        Self {
            receiver,
            encoder,
            config,
        }
    }

    /// Encode and write one command frame.
    pub fn send_command(&mut self, command: &Command) -> Result<()> {
        let mut buf = BytesMut::new();
        self.encoder.encode(command, &mut buf)?;
        self.receiver.send(&buf)?;
        info!(%command, id = %self.encoder.inject_id(), "command sent");
        Ok(())
    }

    /// Send the job's command, then read exactly `expected_frames` frames.
    ///
    /// Framing and checksum errors leave a gap and use up one iteration of
    /// the budget; they never trigger a retry. Cancellation stops early with
    /// whatever has been written. Transport and sink failures end the job
    /// with an error.
    pub fn run<S: Sink + ?Sized>(
        &mut self,
        job: &DumpJob,
        sink: &mut S,
        cancel: &CancelToken,
    ) -> Result<DumpReport> {
        let mut report = DumpReport {
            requested: job.expected_frames,
            ..DumpReport::default()
        };

        let outcome = self.drive(job, sink, cancel, &mut report);
        let flushed = sink.flush().map_err(DumpError::Sink);
        outcome?;
        flushed?;

        info!(
            job = job.label,
            requested = report.requested,
            records = report.records,
            gaps = report.gaps(),
            cancelled = report.cancelled,
            "dump job finished"
        );
        Ok(report)
    }

    fn drive<S: Sink + ?Sized>(
        &mut self,
        job: &DumpJob,
        sink: &mut S,
        cancel: &CancelToken,
        report: &mut DumpReport,
    ) -> Result<()> {
        let mut state = DumpState::SendCommand;

        loop {
            if cancel.is_cancelled() && state != DumpState::Done {
                report.cancelled = true;
                state = DumpState::Done;
            }

            state = match state {
                DumpState::SendCommand => {
                    self.send_command(&job.command)?;
                    DumpState::Settle
                }
                DumpState::Settle => {
                    if !self.config.settle_delay.is_zero() {
                        std::thread::sleep(self.config.settle_delay);
                    }
                    DumpState::Receive {
                        remaining: job.expected_frames,
                    }
                }
                DumpState::Receive { remaining: 0 } => DumpState::Done,
                DumpState::Receive { remaining } => match self.receiver.read_frame(cancel) {
                    Ok(frame) => {
                        self.emit(&frame, sink, report)?;
                        DumpState::Receive {
                            remaining: remaining - 1,
                        }
                    }
                    Err(FrameError::Cancelled) => {
                        report.cancelled = true;
                        DumpState::Done
                    }
                    Err(FrameError::Framing { .. }) => {
                        report.framing_errors += 1;
                        DumpState::Receive {
                            remaining: remaining - 1,
                        }
                    }
                    Err(FrameError::Checksum { .. }) => {
                        report.checksum_errors += 1;
                        DumpState::Receive {
                            remaining: remaining - 1,
                        }
                    }
                    Err(err) => {
                        warn!(job = job.label, error = %err, "dump job aborted");
                        return Err(err.into());
                    }
                },
                DumpState::Done => return Ok(()),
            };
        }
    }

    fn emit<S: Sink + ?Sized>(
        &mut self,
        frame: &Frame,
        sink: &mut S,
        report: &mut DumpReport,
    ) -> Result<()> {
        if frame.kind() == FrameKind::Settings {
            report.settings += 1;
            debug!(settings = ?frame.settings(), "settings frame received");
        }
        sink.write_record(&FrameRecord::from_frame(frame))
            .map_err(DumpError::Sink)?;
        report.records += 1;
        Ok(())
    }

    /// Throw away everything the adapter has buffered.
    pub fn drain(&mut self, cancel: &CancelToken) -> Result<usize> {
        Ok(self.receiver.drain(cancel)?)
    }

    pub fn receiver(&self) -> &FrameReceiver<C> {
        &self.receiver
    }
}
