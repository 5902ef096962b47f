use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use canfram_dump::{
    configure_adapter, AdapterConfig, CommandEncoder, DumpJob, DumpReport, Dumper, Sink, Tee,
    TextSink,
};
use canfram_frame::{CanId, CancelToken, FrameReceiver};
use canfram_transport::{ByteChannel, SerialPort, TraceLevel, Traced};
use tracing::info;

use crate::cmd::DeviceArgs;
use crate::exit::{dump_error, io_error, transport_error, CliError, CliResult, INTERNAL};
use crate::output::{print_report, OutputFormat};

type Channel = Box<dyn ByteChannel>;

/// An opened, configured adapter plus everything needed to run jobs on it.
pub struct Session {
    dumper: Dumper<Channel>,
    cancel: CancelToken,
    receive_id: CanId,
    dump_dir: PathBuf,
    format: OutputFormat,
    quiet: bool,
}

impl Session {
    /// Validate the device arguments, open the port and push the bus settings.
    pub fn open(args: &DeviceArgs, format: OutputFormat) -> CliResult<Self> {
        let path = args
            .device
            .as_deref()
            .ok_or_else(|| CliError::usage("no serial device given (use --device)"))?;
        let encoder = CommandEncoder::from_hex(&args.inject_id)
            .map_err(|err| CliError::usage(format!("invalid inject id: {err}")))?;
        let receive_id = CanId::from_hex(&args.receive_id)
            .map_err(|err| CliError::usage(format!("invalid receive id: {err}")))?;
        let adapter = AdapterConfig::from_bps(args.speed);

        let mut channel = open_channel(path, args.baudrate, TraceLevel::from_count(args.trace))?;
        configure_adapter(channel.as_mut(), &adapter)
            .map_err(|err| dump_error("adapter init failed", err))?;
        info!(
            device = %path.display(),
            inject_id = %encoder.inject_id(),
            receive_id = %receive_id,
            "adapter ready"
        );

        let cancel = CancelToken::new();
        install_ctrlc_handler(cancel.clone())?;

        let dumper = Dumper::new(FrameReceiver::new(channel), encoder);
        Ok(Self::new(dumper, cancel, receive_id, args, format))
    }

    /// Wrap an already configured dumper. Output settings come from `args`.
    pub fn new(
        dumper: Dumper<Channel>,
        cancel: CancelToken,
        receive_id: CanId,
        args: &DeviceArgs,
        format: OutputFormat,
    ) -> Self {
        Self {
            dumper,
            cancel,
            receive_id,
            dump_dir: args.dump_dir.clone(),
            format,
            quiet: args.quiet,
        }
    }

    /// The id the device answers on. Reported only; frames are not filtered by it.
    pub fn receive_id(&self) -> CanId {
        self.receive_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run a job whose response frames are echoed but not saved.
    pub fn run(&mut self, job: &DumpJob) -> CliResult<DumpReport> {
        let mut sink = self.console_sink();
        let report = self
            .dumper
            .run(job, &mut sink, &self.cancel)
            .map_err(|err| dump_error(job.label, err))?;
        if job.expected_frames > 0 {
            print_report(job.label, &report, None, self.format);
        }
        Ok(report)
    }

    /// Run a job and save its records under the dump directory.
    pub fn run_to_file(&mut self, job: &DumpJob) -> CliResult<DumpReport> {
        let path = artifact_path(&self.dump_dir, job.label, self.format.extension());
        let file = create_artifact(&path)?;
        let file_sink = self.format.record_format().sink(BufWriter::new(file));
        info!(path = %path.display(), job = job.label, "writing dump");

        let mut sink = Tee::new(file_sink, self.console_sink());
        let report = self
            .dumper
            .run(job, &mut sink, &self.cancel)
            .map_err(|err| dump_error(job.label, err))?;
        print_report(job.label, &report, Some(&path), self.format);
        Ok(report)
    }

    /// Drop whatever the adapter has buffered.
    pub fn flush(&mut self) -> CliResult<usize> {
        let dropped = self
            .dumper
            .drain(&self.cancel)
            .map_err(|err| dump_error("flush failed", err))?;
        info!(dropped, "bus buffer cleared");
        Ok(dropped)
    }

    fn console_sink(&self) -> Box<dyn Sink> {
        if self.quiet {
            Box::new(TextSink::new(io::sink()))
        } else {
            self.format.record_format().sink(io::stdout())
        }
    }
}

/// `<dir>/<unix-seconds>-<label>.<ext>`
pub fn artifact_path(dir: &Path, label: &str, extension: &str) -> PathBuf {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    dir.join(format!("{secs}-{label}.{extension}"))
}

fn create_artifact(path: &Path) -> CliResult<File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .map_err(|err| io_error(&format!("cannot create {}", dir.display()), err))?;
    }
    File::create(path).map_err(|err| io_error(&format!("cannot create {}", path.display()), err))
}

fn open_channel(path: &Path, baud_rate: u32, trace: TraceLevel) -> CliResult<Channel> {
    let port = SerialPort::open(path, baud_rate)
        .map_err(|err| transport_error("adapter init failed", err))?;
    let channel: Channel = match trace {
        TraceLevel::Off => Box::new(port),
        level => Box::new(Traced::new(port, level)),
    };
    Ok(channel)
}

fn install_ctrlc_handler(cancel: CancelToken) -> CliResult<()> {
    ctrlc::set_handler(move || cancel.cancel())
        .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
