//! Device-level operations on top of the frame layer.
//!
//! Configure the adapter once, then run dump jobs: send one command frame,
//! wait for the device to settle, and collect a fixed number of response
//! frames into a [`Sink`]. Completion is purely count-based; the device does
//! not signal the end of a transfer.

pub mod adapter;
pub mod command;
pub mod error;
pub mod orchestrator;
pub mod sink;

pub use adapter::{configure_adapter, AdapterConfig};
pub use command::{Command, CommandEncoder, DEFAULT_INJECT_ID, DEFAULT_RECEIVE_ID};
pub use error::{DumpError, Result};
pub use orchestrator::{
    DumpJob, DumpReport, Dumper, DumperConfig, FULL_DUMP_FRAMES, SECTOR_DUMP_FRAMES,
    SETTLE_DELAY,
};
pub use sink::{FrameRecord, JsonSink, RecordFormat, Sink, Tee, TextSink};
