/// Default exchange host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default exchange TCP port.
pub const DEFAULT_PORT: u16 = 3000;

/// Size in bytes of one record frame on the wire.
///
/// The protocol carries no length prefix or delimiter, so this value
/// alone defines record boundaries.
pub const RECORD_SIZE: usize = 17;

/// Size in bytes of every request frame: `[call type, payload]`.
pub const REQUEST_SIZE: usize = 2;

/// Call type asking the server to stream every available record.
pub const CALL_STREAM_ALL: u8 = 1;

/// Call type asking the server to resend a single record by sequence.
pub const CALL_RESEND: u8 = 2;

/// Pause between two resend requests, in milliseconds.
///
/// A courtesy to the server, not a correctness requirement.
pub const RESEND_DELAY_MSEC: u64 = 100;

/// Default timeout for establishing a TCP connection, in milliseconds.
pub const CONNECT_TIMEOUT_MSEC: u64 = 5000;

/// Default timeout for a single blocking read, in milliseconds.
///
/// Applies per read call, not to the whole exchange.
pub const READ_TIMEOUT_MSEC: u64 = 10_000;

/// Price volatility used by the exchange simulator's record generator.
pub const VOLATILITY: f64 = 0.02;

/// Default number of records served by the exchange simulator.
pub const DEFAULT_BOOK_SIZE: usize = 14;
