use rand_distr::NormalError;
use thiserror::Error;

/// Errors produced while encoding requests or decoding record frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Fewer bytes than a full record frame were available.
    ///
    /// The partial frame is discarded and never turned into a record.
    #[error("Malformed frame: expected {expected} bytes, got {actual}")]
    MalformedFrame {
        /// Bytes required for one frame.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// The sequence cannot be carried by the single-byte resend payload.
    #[error("Sequence {0} does not fit the one-byte resend payload (0..=255)")]
    SequenceOutOfRange(i32),
}

/// Errors raised by a single transport session.
///
/// Every variant is fatal to the exchange it happened in and to nothing else.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The TCP connection could not be established (refused, unreachable, timed out).
    #[error("Failed to connect to {addr}: {reason}")]
    ConnectFailed {
        /// Target address as `host:port`.
        addr: String,
        /// Underlying failure description.
        reason: String,
    },

    /// The request could not be written in full.
    #[error("Failed to send request: {0}")]
    SendFailed(String),

    /// A read failed for a reason other than an orderly close by the peer.
    #[error("Failed to receive data: {0}")]
    ReceiveFailed(String),

    /// The session was used after it had been closed.
    #[error("Session is closed")]
    Closed,
}

/// Errors returned by a client run.
///
/// Only failures of the initial stream-all exchange surface here; recovery
/// failures are reported per sequence in the recovery report instead.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The stream-all exchange could not be started.
    #[error("Initial stream failed: {0}")]
    StreamFailed(#[from] SessionError),
}

/// Errors raised while writing the JSON output artifact.
#[derive(Error, Debug)]
pub enum OutputError {
    /// The output file could not be created or written.
    #[error("Failed to write output file: {0}")]
    Io(String),

    /// The records could not be serialized.
    #[error("Failed to serialize records: {0}")]
    Serialize(String),
}

impl From<std::io::Error> for OutputError {
    fn from(err: std::io::Error) -> Self {
        OutputError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for OutputError {
    fn from(err: serde_json::Error) -> Self {
        OutputError::Serialize(err.to_string())
    }
}

/// Errors that may occur inside the
/// [`RecordGenerator`](crate::record_generator::RecordGenerator).
#[derive(Error, Debug)]
pub enum GeneratorError {
    /// Supplied volatility parameter is outside `(0.0, 1.0]`.
    #[error("Invalid volatility: {0}")]
    InvalidVolatility(f64),

    /// Error constructing the log-normal distribution used for price moves.
    #[error("Failed to build price distribution: {0}")]
    DistributionError(#[from] NormalError),
}

/// Errors produced by the exchange simulator.
#[derive(Error, Debug)]
pub enum ExchangeServerError {
    /// The TCP listener failed to bind to the specified address/port.
    #[error("Failed to bind TCP listener: {0}")]
    BindError(String),

    /// Error while accepting an incoming TCP connection.
    #[error("Failed to accept TCP connection: {0}")]
    AcceptError(String),

    /// I/O error during communication with a specific client.
    #[error("Client IO error: {0}")]
    ClientIoError(String),

    /// The record book could not be generated.
    #[error("Record generator error: {0}")]
    GeneratorError(#[from] GeneratorError),
}

/// High-level errors returned by the client and server binaries.
#[derive(Error, Debug)]
pub enum CliError {
    /// General wrapper around any textual failure.
    #[error("Cli failed with error: {0}")]
    GeneralError(String),
}

impl From<ClientError> for CliError {
    fn from(err: ClientError) -> Self {
        CliError::GeneralError(err.to_string())
    }
}

impl From<OutputError> for CliError {
    fn from(err: OutputError) -> Self {
        CliError::GeneralError(err.to_string())
    }
}

impl From<ExchangeServerError> for CliError {
    fn from(err: ExchangeServerError) -> Self {
        CliError::GeneralError(err.to_string())
    }
}
