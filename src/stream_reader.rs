use crate::codec::{decode_record, encode_stream_all_request};
use crate::defs::RECORD_SIZE;
use crate::errors::SessionError;
use crate::progress::{CancelToken, Progress, ProgressEvent};
use crate::session::{Connector, Received, Session};
use crate::store::RecordStore;

/// How the stream-all exchange ended.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamOutcome {
    /// Records decoded and stored.
    pub received: usize,

    /// Highest sequence decoded, 0 if nothing arrived.
    pub max_sequence: i32,

    /// Bytes of an incomplete trailing frame that were discarded.
    pub dangling_bytes: usize,

    /// Request write or read failure that cut the stream short. Records
    /// before it are kept.
    pub error: Option<SessionError>,

    /// The stream was abandoned because cancellation was requested.
    pub cancelled: bool,
}

impl StreamOutcome {
    /// Whether the server closed the stream cleanly on a frame boundary.
    pub fn is_clean(&self) -> bool {
        self.error.is_none() && self.dangling_bytes == 0 && !self.cancelled
    }
}

/// Runs the stream-all exchange, appending every decoded record to `store`.
///
/// End-of-stream is the peer closing the connection. A failure to write the
/// request or to read a frame ends the phase early but is reported in the
/// outcome rather than returned, so the records already stored stay usable
/// and the run can go on to recovery.
///
/// # Errors
/// Returns [`SessionError::ConnectFailed`] when the connection cannot be
/// established at all.
pub fn read_stream<C: Connector>(
    connector: &C,
    store: &mut RecordStore,
    progress: &Progress,
    cancel: &CancelToken,
) -> Result<StreamOutcome, SessionError> {
    let mut session = connector.open()?;
    let outcome = drive_stream(&mut session, store, progress, cancel);
    session.close();
    Ok(outcome)
}

fn drive_stream<S: Session>(
    session: &mut S,
    store: &mut RecordStore,
    progress: &Progress,
    cancel: &CancelToken,
) -> StreamOutcome {
    let mut outcome = StreamOutcome::default();

    log::info!("Requesting full record stream");
    match session.send(&encode_stream_all_request()) {
        Ok(()) => {
            progress.emit(ProgressEvent::Connected);
            read_frames(session, store, progress, cancel, &mut outcome);
        }
        Err(_) if cancel.is_cancelled() => mark_cancelled(&mut outcome),
        Err(e) => {
            log::error!("Failed to send stream request: {}", e);
            outcome.error = Some(e);
        }
    }

    log::info!(
        "Stream completed: {} records, max sequence {}",
        outcome.received,
        outcome.max_sequence
    );
    progress.emit(ProgressEvent::StreamCompleted {
        received: outcome.received,
        max_sequence: outcome.max_sequence,
    });

    outcome
}

fn read_frames<S: Session>(
    session: &mut S,
    store: &mut RecordStore,
    progress: &Progress,
    cancel: &CancelToken,
    outcome: &mut StreamOutcome,
) {
    loop {
        if cancel.is_cancelled() {
            mark_cancelled(outcome);
            return;
        }

        let received = session.receive_exactly(RECORD_SIZE);
        if cancel.is_cancelled() && !matches!(received, Ok(Received::Complete(_))) {
            // The read was cut short by the cancel shutting the socket down.
            mark_cancelled(outcome);
            return;
        }

        match received {
            Ok(Received::Complete(frame)) => match decode_record(&frame) {
                Ok(record) => {
                    log::trace!("Received {}", record);
                    outcome.received += 1;
                    outcome.max_sequence = outcome.max_sequence.max(record.sequence);
                    store.push_streamed(record);
                    progress.emit(ProgressEvent::RecordReceived(record));
                }
                Err(e) => {
                    log::warn!("Dropping undecodable frame: {}", e);
                }
            },
            Ok(Received::Closed(tail)) => {
                if !tail.is_empty() {
                    log::warn!(
                        "Stream closed mid-frame, discarding {} of {} bytes",
                        tail.len(),
                        RECORD_SIZE
                    );
                    outcome.dangling_bytes = tail.len();
                }
                return;
            }
            Err(e) => {
                log::error!(
                    "Stream interrupted after {} records: {}",
                    outcome.received,
                    e
                );
                outcome.error = Some(e);
                return;
            }
        }
    }
}

fn mark_cancelled(outcome: &mut StreamOutcome) {
    log::warn!(
        "Stream cancelled after {} records, keeping what was received",
        outcome.received
    );
    outcome.cancelled = true;
}
