//! # ABX Exchange Client
//!
//! This crate implements a client for the ABX exchange, a fixed-layout
//! binary market-data feed served over plain TCP, together with a small
//! exchange simulator speaking the same protocol.
//!
//! ## Features
//!
//! - Stream every record the exchange currently holds.
//! - Detect gaps in the record sequence numbers.
//! - Re-request each missing record on its own connection.
//! - Merge both phases into one set sorted by sequence.
//! - Write the result as a JSON array.
//! - Connect/read timeouts, cooperative cancellation and progress events.
//!
//! ## Architecture Overview
//!
//! - [`codec`](crate::codec) — Request encoding and record frame decoding.
//! - [`session`](crate::session) — One TCP connection per request/response exchange.
//! - [`stream_reader`](crate::stream_reader) — The "stream all" exchange.
//! - [`recovery`](crate::recovery) — Gap detection and per-sequence resend.
//! - [`store`](crate::store) — Run-scoped record accumulator.
//! - [`client`](crate::client) — Orchestrates a full run.
//! - [`output`](crate::output) — JSON output file.
//! - [`progress`](crate::progress) — Progress events and cancellation.
//! - [`exchange_server`](crate::exchange_server) — Exchange simulator.
//! - [`record_generator`](crate::record_generator) — Random record books for the simulator.
//! - [`config`](crate::config), [`defs`](crate::defs) — Settings and protocol constants.
//! - [`logging`](crate::logging) — Logger setup shared by both binaries.
//! - [`errors`](crate::errors) — Error types used across modules.
//!
//! ## Wire Protocol
//!
//! Every request is two bytes, `[call type, payload]`, sent on a fresh
//! connection:
//!
//! - `[1, 0]`
//!   The server streams all records back to back and closes the connection.
//!
//! - `[2, seq]`
//!   The server sends the single record with sequence `seq` and closes.
//!   Only sequences up to 255 can be requested this way.
//!
//! Each record is exactly 17 bytes: symbol (4), side (1), quantity (4),
//! price (4), sequence (4), integers big-endian. There is no length prefix.
//!
//! ## Example: Running the Client
//!
//! ```no_run
//! use abx_client::client::AbxClient;
//! use abx_client::config::ClientConfig;
//! use abx_client::output::write_json_file;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = AbxClient::new(ClientConfig::default());
//!     let report = client.run()?;
//!
//!     println!(
//!         "retrieved {} of {} missing records",
//!         report.recovery.retrieved_count(),
//!         report.recovery.missing_count()
//!     );
//!     write_json_file("output.json", &report.records)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unreachable_pub)]

pub mod client;
pub mod codec;
pub mod config;
pub mod defs;
pub mod errors;
pub mod exchange_server;
pub mod logging;
pub mod output;
pub mod progress;
pub mod record;
pub mod record_generator;
pub mod recovery;
pub mod session;
pub mod store;
pub mod stream_reader;
