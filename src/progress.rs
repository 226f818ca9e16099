use crate::record::Record;

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Progress notifications emitted while a run is in flight.
///
/// Rendering them (progress bars, spinners, colours) is left to the
/// consumer; the core only reports what happened.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// The stream-all connection is established and the request sent.
    Connected,

    /// A record arrived on the stream-all exchange.
    RecordReceived(Record),

    /// The stream-all exchange ended.
    StreamCompleted {
        /// Records decoded from the stream.
        received: usize,
        /// Highest sequence seen.
        max_sequence: i32,
    },

    /// Gap detection finished and recovery is about to start.
    RecoveryStarted {
        /// Sequences that will be requested.
        missing: usize,
    },

    /// A resend request for `sequence` is about to be sent.
    RequestingSequence {
        /// Sequence being requested.
        sequence: i32,
        /// 1-based index among the missing sequences.
        position: usize,
        /// Number of missing sequences.
        total: usize,
    },

    /// A missing record was recovered.
    SequenceRetrieved(Record),

    /// A missing sequence could not be recovered.
    SequenceUnrecovered {
        /// Sequence that is still missing.
        sequence: i32,
        /// Human-readable reason.
        reason: String,
    },

    /// The recovery phase is over.
    RecoveryCompleted {
        /// Sequences missing after the stream phase.
        missing: usize,
        /// Sequences successfully recovered.
        retrieved: usize,
    },

    /// Records were sorted and are ready for output.
    Finalized {
        /// Total records in the final set.
        total: usize,
    },
}

/// Callback receiving progress events.
pub type ProgressCallback = dyn Fn(&ProgressEvent) + Send + Sync + 'static;

/// Optional progress sink passed through the run.
#[derive(Clone, Default)]
pub struct Progress {
    callback: Option<Arc<ProgressCallback>>,
}

impl Progress {
    /// A sink that drops every event.
    pub fn none() -> Self {
        Self::default()
    }

    /// A sink forwarding every event to `callback`.
    pub fn new(callback: impl Fn(&ProgressEvent) + Send + Sync + 'static) -> Self {
        Self {
            callback: Some(Arc::new(callback)),
        }
    }

    /// Delivers `event` to the callback, if any.
    pub fn emit(&self, event: ProgressEvent) {
        if let Some(callback) = &self.callback {
            (callback)(&event);
        }
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress")
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// Cooperative cancellation flag shared between a run and its controller.
///
/// Cancelling stops the stream phase and skips any remaining recovery
/// attempts. Connections registered through [`watch`](Self::watch) are shut
/// down immediately, so a read blocked on the exchange returns at once.
/// Records collected so far are kept.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    shared: Arc<CancelShared>,
}

#[derive(Debug, Default)]
struct CancelShared {
    flag: AtomicBool,
    next_id: AtomicU64,
    watched: Mutex<HashMap<u64, TcpStream>>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation and shuts down every watched connection.
    pub fn cancel(&self) {
        self.shared.flag.store(true, Ordering::SeqCst);
        let watched = self.watched();
        for stream in watched.values() {
            // Already closed by the peer is fine.
            let _ = stream.shutdown(Shutdown::Both);
        }
        if !watched.is_empty() {
            log::debug!("Cancelled {} live connection(s)", watched.len());
        }
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.shared.flag.load(Ordering::SeqCst)
    }

    /// Registers `stream` so that [`cancel`](Self::cancel) shuts it down.
    ///
    /// The registration lasts until the returned guard is dropped. A stream
    /// watched after cancellation is shut down right away.
    pub fn watch(&self, stream: &TcpStream) -> io::Result<CancelWatch> {
        let clone = stream.try_clone()?;
        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        self.watched().insert(id, clone);

        if self.is_cancelled() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        Ok(CancelWatch {
            shared: self.shared.clone(),
            id,
        })
    }

    fn watched(&self) -> MutexGuard<'_, HashMap<u64, TcpStream>> {
        self.shared.watched()
    }
}

impl CancelShared {
    fn watched(&self) -> MutexGuard<'_, HashMap<u64, TcpStream>> {
        // The map stays consistent even if a holder panicked.
        self.watched.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registration of a connection with a [`CancelToken`]. Dropping it
/// unregisters the connection.
#[derive(Debug)]
pub struct CancelWatch {
    shared: Arc<CancelShared>,
    id: u64,
}

impl Drop for CancelWatch {
    fn drop(&mut self) {
        self.shared.watched().remove(&self.id);
    }
}
