use std::fmt;
use std::io::{self, Write};

use canfram_frame::{CanId, Frame};
use canfram_transport::hex_line;
use serde::Serialize;

/// One line of dump output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameRecord {
    /// A data frame: its id and the payload bytes it actually carried.
    Data { id: CanId, payload: Vec<u8> },
    /// Any other frame, settings echoes included, byte for byte.
    Unknown { raw: Vec<u8> },
}

impl FrameRecord {
    /// Record for a received frame. Every frame produces one.
    pub fn from_frame(frame: &Frame) -> Self {
        match (frame.id(), frame.payload()) {
            (Some(id), Some(payload)) => FrameRecord::Data {
                id,
                payload: payload.to_vec(),
            },
            _ => FrameRecord::Unknown {
                raw: frame.raw().to_vec(),
            },
        }
    }
}

impl fmt::Display for FrameRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameRecord::Data { id, payload } => {
                write!(f, "Frame ID: {id}, Data: {}", hex_line(payload))
            }
            FrameRecord::Unknown { raw } => write!(f, "Unknown: {}", hex_line(raw)),
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum JsonRecord {
    Data { id: String, payload: String },
    Unknown { raw: String },
}

impl From<&FrameRecord> for JsonRecord {
    fn from(record: &FrameRecord) -> Self {
        match record {
            FrameRecord::Data { id, payload } => JsonRecord::Data {
                id: id.to_string(),
                payload: hex_line(payload),
            },
            FrameRecord::Unknown { raw } => JsonRecord::Unknown {
                raw: hex_line(raw),
            },
        }
    }
}

/// Destination for decoded frame records.
pub trait Sink {
    fn write_record(&mut self, record: &FrameRecord) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn write_record(&mut self, record: &FrameRecord) -> io::Result<()> {
        (**self).write_record(record)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn write_record(&mut self, record: &FrameRecord) -> io::Result<()> {
        (**self).write_record(record)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Collects records in memory.
impl Sink for Vec<FrameRecord> {
    fn write_record(&mut self, record: &FrameRecord) -> io::Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

/// Plain-text records, one per line.
#[derive(Debug)]
pub struct TextSink<W> {
    inner: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Sink for TextSink<W> {
    fn write_record(&mut self, record: &FrameRecord) -> io::Result<()> {
        writeln!(self.inner, "{record}")
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// JSON lines: one object per record.
#[derive(Debug)]
pub struct JsonSink<W> {
    inner: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Sink for JsonSink<W> {
    fn write_record(&mut self, record: &FrameRecord) -> io::Result<()> {
        serde_json::to_writer(&mut self.inner, &JsonRecord::from(record))?;
        self.inner.write_all(b"\n")
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Writes every record to two sinks, first `A` then `B`.
#[derive(Debug)]
pub struct Tee<A, B> {
    first: A,
    second: B,
}

impl<A: Sink, B: Sink> Tee<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    pub fn into_inner(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A: Sink, B: Sink> Sink for Tee<A, B> {
    fn write_record(&mut self, record: &FrameRecord) -> io::Result<()> {
        self.first.write_record(record)?;
        self.second.write_record(record)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.first.flush()?;
        self.second.flush()
    }
}

/// On-disk / console record layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordFormat {
    #[default]
    Text,
    Json,
}

impl RecordFormat {
    /// A boxed sink writing this format to `writer`.
    pub fn sink<W: Write + 'static>(self, writer: W) -> Box<dyn Sink> {
        match self {
            RecordFormat::Text => Box::new(TextSink::new(writer)),
            RecordFormat::Json => Box::new(JsonSink::new(writer)),
        }
    }
}
