//! # ABX Exchange Simulator
//!
//! A local stand-in for the ABX exchange. It serves a randomly generated
//! record book over TCP and can withhold chosen sequences from the
//! "stream all" response so that clients have gaps to recover.
//!
//! ## Command-line Options
//! - `--tcp-addr` / `-t`: TCP listen address (default `127.0.0.1:3000`).
//! - `--records` / `-r`: number of records in the book (default `14`).
//! - `--drop` / `-d`: comma-separated sequences withheld from the stream.
//! - `--log-level` / `-l`: Log level (`error`, `warn`, `info`, `debug`, `trace`).

use abx_client::defs::{DEFAULT_BOOK_SIZE, VOLATILITY};
use abx_client::errors::CliError;
use abx_client::exchange_server::ExchangeServer;
use abx_client::logging::init_logger;
use abx_client::record_generator::RecordGenerator;
use std::collections::HashSet;
use structopt::StructOpt;

/// Command-line options for the exchange simulator
#[derive(Debug, StructOpt)]
#[structopt(name = "abx_server", about = "ABX exchange simulator")]
struct Opt {
    /// TCP listen address, e.g., 127.0.0.1:3000
    #[structopt(short, long, default_value = "127.0.0.1:3000")]
    tcp_addr: String,

    /// Number of records in the book
    #[structopt(short, long)]
    records: Option<usize>,

    /// Sequences withheld from the stream-all response, e.g. 3,7,11
    #[structopt(short, long, use_delimiter = true)]
    drop: Vec<i32>,

    /// Log level: error, warn, info, debug, trace
    #[structopt(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), CliError> {
    // Parse CLI arguments
    let opt = Opt::from_args();

    // Initialize logger
    init_logger(&opt.log_level)?;

    log::info!("Starting ABX exchange simulator");
    log::debug!("Command line options: {:?}", opt);

    let count = opt.records.unwrap_or(DEFAULT_BOOK_SIZE);
    let generator = RecordGenerator::new(VOLATILITY)
        .map_err(|e| CliError::GeneralError(e.to_string()))?;
    let book = generator
        .generate(count)
        .map_err(|e| CliError::GeneralError(e.to_string()))?;
    log::info!("Generated book of {} records", book.len());

    let dropped: HashSet<i32> = opt.drop.iter().copied().collect();
    if !dropped.is_empty() {
        log::info!("Withholding sequences {:?} from the stream", dropped);
    }

    let server = ExchangeServer::new(&opt.tcp_addr, book, dropped)?;

    log::info!("Exchange simulator initialized. Waiting for client connections...");
    server.start()?;

    log::info!("Server shutdown complete");
    Ok(())
}
