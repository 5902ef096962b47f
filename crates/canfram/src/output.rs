use std::path::Path;

use canfram_dump::{DumpReport, RecordFormat};
use canfram_frame::CanSpeed;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn record_format(self) -> RecordFormat {
        match self {
            OutputFormat::Text => RecordFormat::Text,
            OutputFormat::Json => RecordFormat::Json,
        }
    }

    /// Extension for dump artifacts in this format.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Json => "jsonl",
        }
    }
}

#[derive(Serialize)]
struct SpeedOutput {
    bps: u32,
    code: u8,
    default: bool,
}

pub fn print_speeds(format: OutputFormat) {
    let default = CanSpeed::default();
    match format {
        OutputFormat::Json => {
            let rows: Vec<SpeedOutput> = CanSpeed::ALL
                .iter()
                .map(|speed| SpeedOutput {
                    bps: speed.bps(),
                    code: speed.code(),
                    default: *speed == default,
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string(&rows).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Text => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SPEED", "BPS", "CODE", ""]);
            for speed in CanSpeed::ALL {
                table.add_row(vec![
                    speed_label(speed.bps()),
                    speed.bps().to_string(),
                    format!("0x{:02x}", speed.code()),
                    if speed == default { "default" } else { "" }.to_string(),
                ]);
            }
            println!("{table}");
        }
    }
}

#[derive(Serialize)]
struct ReportOutput<'a> {
    job: &'a str,
    artifact: Option<String>,
    requested: usize,
    records: usize,
    settings: usize,
    framing_errors: usize,
    checksum_errors: usize,
    cancelled: bool,
}

/// Job summary on stderr for text, as a JSON line on stdout otherwise.
pub fn print_report(job: &str, report: &DumpReport, artifact: Option<&Path>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ReportOutput {
                job,
                artifact: artifact.map(|p| p.display().to_string()),
                requested: report.requested,
                records: report.records,
                settings: report.settings,
                framing_errors: report.framing_errors,
                checksum_errors: report.checksum_errors,
                cancelled: report.cancelled,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Text => {
            let mut line = format!(
                "{job}: {}/{} frames recorded",
                report.records, report.requested
            );
            if report.gaps() > 0 {
                line.push_str(&format!(
                    ", {} dropped ({} framing, {} checksum)",
                    report.gaps(),
                    report.framing_errors,
                    report.checksum_errors
                ));
            }
            if report.cancelled {
                line.push_str(", cancelled");
            }
            if let Some(path) = artifact {
                line.push_str(&format!(", saved to {}", path.display()));
            }
            eprintln!("{line}");
        }
    }
}

fn speed_label(bps: u32) -> String {
    if bps >= 1_000_000 {
        format!("{} Mbit/s", bps / 1_000_000)
    } else {
        format!("{} kbit/s", bps / 1_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_labels() {
        assert_eq!(speed_label(1_000_000), "1 Mbit/s");
        assert_eq!(speed_label(125_000), "125 kbit/s");
        assert_eq!(speed_label(5_000), "5 kbit/s");
    }

    #[test]
    fn report_serializes_all_counters() {
        let out = ReportOutput {
            job: "dump-fram-512b",
            artifact: None,
            requested: 128,
            records: 127,
            settings: 0,
            framing_errors: 1,
            checksum_errors: 0,
            cancelled: false,
        };
        let json = serde_json::to_string(&out).expect("report should serialize");
        assert!(json.contains("\"records\":127"));
        assert!(json.contains("\"artifact\":null"));
    }
}
