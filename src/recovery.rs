use crate::codec::{decode_record, encode_resend_request};
use crate::config::RecoveryConfig;
use crate::defs::RECORD_SIZE;
use crate::errors::{CodecError, SessionError};
use crate::progress::{CancelToken, Progress, ProgressEvent};
use crate::record::Record;
use crate::session::{Connector, Received, Session};
use crate::store::RecordStore;

use std::fmt;
use std::thread;

/// Why a missing sequence is still missing after recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryFailure {
    /// The sequence cannot be expressed in a resend request, or the reply
    /// could not be decoded.
    Codec(CodecError),

    /// Connecting, sending or receiving failed.
    Session(SessionError),

    /// The server closed the connection without a full record.
    NotDelivered {
        /// Bytes received before the close.
        received_bytes: usize,
    },

    /// The server answered with a different sequence.
    Mismatch {
        /// Sequence actually delivered.
        delivered: i32,
    },

    /// Skipped because the run was cancelled.
    Cancelled,
}

impl fmt::Display for RecoveryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryFailure::Codec(e) => write!(f, "{}", e),
            RecoveryFailure::Session(e) => write!(f, "{}", e),
            RecoveryFailure::NotDelivered { received_bytes } => write!(
                f,
                "connection closed after {} of {} bytes",
                received_bytes, RECORD_SIZE
            ),
            RecoveryFailure::Mismatch { delivered } => {
                write!(f, "server delivered sequence {} instead", delivered)
            }
            RecoveryFailure::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A sequence the recovery phase could not fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unrecovered {
    /// The missing sequence.
    pub sequence: i32,
    /// Why it is still missing.
    pub failure: RecoveryFailure,
}

/// Accounting of one recovery pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecoveryReport {
    /// Upper bound of the checked range `1..=max_sequence`.
    pub max_sequence: i32,

    /// Sequences absent after the stream phase, ascending.
    pub missing: Vec<i32>,

    /// Sequences filled during this pass, ascending.
    pub retrieved: Vec<i32>,

    /// Sequences still absent, with the reason.
    pub unrecovered: Vec<Unrecovered>,

    /// Whether the pass stopped early on cancellation.
    pub cancelled: bool,
}

impl RecoveryReport {
    /// Number of sequences that were missing before recovery.
    pub fn missing_count(&self) -> usize {
        self.missing.len()
    }

    /// Number of sequences recovered.
    pub fn retrieved_count(&self) -> usize {
        self.retrieved.len()
    }

    /// Whether every missing sequence was recovered.
    pub fn is_complete(&self) -> bool {
        self.retrieved_count() == self.missing_count()
    }

    /// Recovered share of the missing sequences, in percent.
    ///
    /// 100 when nothing was missing.
    pub fn retrieval_rate(&self) -> f64 {
        if self.missing.is_empty() {
            return 100.0;
        }
        self.retrieved_count() as f64 * 100.0 / self.missing_count() as f64
    }
}

/// Requests every sequence in `1..=store.max_sequence()` that `store` lacks.
///
/// Each missing sequence gets a fresh connection, one at a time and in
/// ascending order, with `config.resend_delay` between two connection
/// attempts. A failure only affects its own sequence; the pass always runs
/// to the end unless `cancel` fires.
pub fn recover_gaps<C: Connector>(
    connector: &C,
    store: &mut RecordStore,
    config: &RecoveryConfig,
    progress: &Progress,
    cancel: &CancelToken,
) -> RecoveryReport {
    let mut report = RecoveryReport {
        max_sequence: store.max_sequence(),
        missing: store.missing_sequences(),
        ..RecoveryReport::default()
    };

    let missing = report.missing.clone();
    let total = missing.len();
    log::info!(
        "Checked sequences 1..={}: {} missing",
        report.max_sequence,
        total
    );
    progress.emit(ProgressEvent::RecoveryStarted { missing: total });

    let mut contacted = false;
    for (index, &sequence) in missing.iter().enumerate() {
        if cancel.is_cancelled() {
            skip_cancelled(&mut report, sequence, total - index);
            continue;
        }

        if store.contains(sequence) {
            // An earlier resend answered with this sequence instead.
            log::debug!("Sequence {} already delivered, skipping request", sequence);
            report.retrieved.push(sequence);
            continue;
        }

        let request = match encode_resend_request(sequence) {
            Ok(request) => request,
            Err(e) => {
                log::warn!("Cannot request sequence {}: {}", sequence, e);
                mark_unrecovered(&mut report, progress, sequence, RecoveryFailure::Codec(e));
                continue;
            }
        };

        if contacted && !config.resend_delay.is_zero() {
            thread::sleep(config.resend_delay);
        }
        contacted = true;

        progress.emit(ProgressEvent::RequestingSequence {
            sequence,
            position: index + 1,
            total,
        });
        log::info!("Requesting missing sequence {}", sequence);

        match resend(connector, &request) {
            Ok(record) if record.sequence == sequence => {
                store.insert_recovered(record);
                log::info!("Retrieved sequence {}", sequence);
                report.retrieved.push(sequence);
                progress.emit(ProgressEvent::SequenceRetrieved(record));
            }
            Ok(record) => {
                log::warn!(
                    "Requested sequence {} but received {}",
                    sequence,
                    record.sequence
                );
                store.insert_recovered(record);
                mark_unrecovered(
                    &mut report,
                    progress,
                    sequence,
                    RecoveryFailure::Mismatch {
                        delivered: record.sequence,
                    },
                );
            }
            Err(_) if cancel.is_cancelled() => {
                skip_cancelled(&mut report, sequence, total - index);
            }
            Err(failure) => {
                log::warn!("Failed to retrieve sequence {}: {}", sequence, failure);
                mark_unrecovered(&mut report, progress, sequence, failure);
            }
        }
    }

    if report.is_complete() {
        log::info!(
            "All {} missing records were retrieved",
            report.missing_count()
        );
    } else {
        log::warn!(
            "Retrieved {} out of {} missing records",
            report.retrieved_count(),
            report.missing_count()
        );
    }
    progress.emit(ProgressEvent::RecoveryCompleted {
        missing: report.missing_count(),
        retrieved: report.retrieved_count(),
    });

    report
}

fn skip_cancelled(report: &mut RecoveryReport, sequence: i32, remaining: usize) {
    if !report.cancelled {
        log::warn!("Recovery cancelled, skipping {} sequences", remaining);
        report.cancelled = true;
    }
    report.unrecovered.push(Unrecovered {
        sequence,
        failure: RecoveryFailure::Cancelled,
    });
}

fn mark_unrecovered(
    report: &mut RecoveryReport,
    progress: &Progress,
    sequence: i32,
    failure: RecoveryFailure,
) {
    progress.emit(ProgressEvent::SequenceUnrecovered {
        sequence,
        reason: failure.to_string(),
    });
    report.unrecovered.push(Unrecovered { sequence, failure });
}

/// One resend exchange on its own connection.
fn resend<C: Connector>(connector: &C, request: &[u8]) -> Result<Record, RecoveryFailure> {
    let mut session = connector.open().map_err(RecoveryFailure::Session)?;
    let result = exchange(&mut session, request);
    session.close();
    result
}

fn exchange<S: Session>(session: &mut S, request: &[u8]) -> Result<Record, RecoveryFailure> {
    session.send(request).map_err(RecoveryFailure::Session)?;

    match session
        .receive_exactly(RECORD_SIZE)
        .map_err(RecoveryFailure::Session)?
    {
        Received::Complete(frame) => decode_record(&frame).map_err(RecoveryFailure::Codec),
        Received::Closed(partial) => Err(RecoveryFailure::NotDelivered {
            received_bytes: partial.len(),
        }),
    }
}
