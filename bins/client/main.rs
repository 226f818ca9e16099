//! # ABX Client
//!
//! Streams every record from an ABX exchange, recovers missing sequences,
//! and writes the sorted result as JSON.
//!
//! ## Command-line Options
//! - `--host` / `-H`: exchange host (default `127.0.0.1`).
//! - `--port` / `-p`: exchange port (default `3000`).
//! - `--output` / `-o`: JSON output path (default `output.json`).
//! - `--connect-timeout-ms`, `--read-timeout-ms`: `0` disables the timeout.
//! - `--resend-delay-ms`: pause between resend requests.
//! - `--log-level` / `-l`: `error`, `warn`, `info`, `debug`, `trace`.

use abx_client::client::{AbxClient, RunReport};
use abx_client::config::{ClientConfig, RecoveryConfig};
use abx_client::errors::CliError;
use abx_client::logging::init_logger;
use abx_client::output::write_json_file;
use abx_client::progress::ProgressEvent;
use std::time::Duration;
use structopt::StructOpt;

/// Command-line options for the client
#[derive(Debug, StructOpt)]
#[structopt(name = "abx_client", about = "ABX exchange client with gap recovery")]
struct Opt {
    /// Exchange host
    #[structopt(short = "H", long, default_value = "127.0.0.1")]
    host: String,

    /// Exchange TCP port
    #[structopt(short, long, default_value = "3000")]
    port: u16,

    /// Path of the JSON output file
    #[structopt(short, long, default_value = "output.json")]
    output: String,

    /// Connect timeout in milliseconds, 0 to wait forever
    #[structopt(long, default_value = "5000")]
    connect_timeout_ms: u64,

    /// Read timeout in milliseconds, 0 to wait forever
    #[structopt(long, default_value = "10000")]
    read_timeout_ms: u64,

    /// Pause between resend requests in milliseconds
    #[structopt(long, default_value = "100")]
    resend_delay_ms: u64,

    /// Log level: error, warn, info, debug, trace
    #[structopt(short, long, default_value = "info")]
    log_level: String,
}

impl Opt {
    fn to_config(&self) -> ClientConfig {
        let timeout = |ms: u64| (ms > 0).then(|| Duration::from_millis(ms));
        ClientConfig {
            host: self.host.clone(),
            port: self.port,
            connect_timeout: timeout(self.connect_timeout_ms),
            read_timeout: timeout(self.read_timeout_ms),
            recovery: RecoveryConfig {
                resend_delay: Duration::from_millis(self.resend_delay_ms),
            },
        }
    }
}

/// Renders the events the log does not already cover.
fn render_progress(event: &ProgressEvent) {
    match event {
        ProgressEvent::RecordReceived(record) => log::debug!("Processing {}", record),
        ProgressEvent::RequestingSequence {
            sequence,
            position,
            total,
        } => log::debug!("[{}/{}] requesting sequence {}", position, total, sequence),
        ProgressEvent::SequenceUnrecovered { sequence, reason } => {
            log::warn!("Sequence {} is still missing: {}", sequence, reason)
        }
        _ => {}
    }
}

fn log_summary(report: &RunReport) {
    let recovery = &report.recovery;
    log::info!("Retrieval summary:");
    log::info!("  Total sequences:        {}", recovery.max_sequence);
    log::info!("  Initially missing:      {}", recovery.missing_count());
    log::info!("  Successfully retrieved: {}", recovery.retrieved_count());
    log::info!("  Retrieval rate:         {:.1}%", recovery.retrieval_rate());

    let secs = report.elapsed.as_secs_f64();
    let rate = if secs > 0.0 {
        report.records.len() as f64 / secs
    } else {
        report.records.len() as f64
    };
    log::info!("Statistics:");
    log::info!("  Total records:   {}", report.records.len());
    log::info!("  Execution time:  {:.3}s", secs);
    log::info!("  Records/second:  {:.0}", rate);
}

fn main() -> Result<(), CliError> {
    // Parse CLI arguments
    let opt = Opt::from_args();

    init_logger(&opt.log_level)?;

    log::info!("Starting ABX client");
    log::debug!("Command line options: {:?}", opt);

    let client = AbxClient::new(opt.to_config()).on_progress(render_progress);
    let report = client.run()?;

    if let Some(e) = &report.stream.error {
        log::warn!("Stream ended early ({}), continuing with partial data", e);
    }
    if !report.is_complete() {
        log::warn!(
            "Run partially successful: {} sequences could not be recovered",
            report.recovery.unrecovered.len()
        );
    }

    write_json_file(&opt.output, &report.records)?;
    log_summary(&report);

    log::info!("Processing complete, results written to {}", opt.output);
    Ok(())
}
