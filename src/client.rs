use crate::config::{ClientConfig, RecoveryConfig};
use crate::errors::ClientError;
use crate::progress::{CancelToken, Progress, ProgressEvent};
use crate::record::Record;
use crate::recovery::{RecoveryReport, recover_gaps};
use crate::session::{Connector, TcpConnector};
use crate::store::RecordStore;
use crate::stream_reader::{StreamOutcome, read_stream};

use std::time::{Duration, Instant};

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// All records from both phases, sorted by sequence.
    pub records: Vec<Record>,

    /// How the stream-all exchange ended.
    pub stream: StreamOutcome,

    /// Gap recovery accounting.
    pub recovery: RecoveryReport,

    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

impl RunReport {
    /// Whether every gap found after the stream phase was filled.
    ///
    /// A run that is not complete is still usable; it just lacks some records.
    pub fn is_complete(&self) -> bool {
        self.recovery.is_complete()
    }
}

/// ABX exchange client.
///
/// A run streams every record the server has, re-requests each missing
/// sequence on its own connection, and returns the merged records sorted by
/// sequence. Only one connection is open at any time.
#[derive(Debug)]
pub struct AbxClient<C = TcpConnector> {
    connector: C,
    recovery: RecoveryConfig,
    progress: Progress,
    cancel: CancelToken,
}

impl AbxClient<TcpConnector> {
    /// Creates a TCP client from `config`.
    ///
    /// Every connection the client opens is registered with its
    /// [`cancel_token`](Self::cancel_token), so cancelling interrupts a
    /// blocked read.
    pub fn new(config: ClientConfig) -> Self {
        let cancel = CancelToken::new();
        let connector = TcpConnector::from_config(&config).with_cancel_token(cancel.clone());
        Self {
            connector,
            recovery: config.recovery,
            progress: Progress::none(),
            cancel,
        }
    }
}

impl<C: Connector> AbxClient<C> {
    /// Creates a client over an arbitrary transport.
    ///
    /// Cancellation is only checked between reads unless the connector's
    /// sessions are tied to [`cancel_token`](Self::cancel_token) themselves.
    pub fn with_connector(connector: C, recovery: RecoveryConfig) -> Self {
        Self {
            connector,
            recovery,
            progress: Progress::none(),
            cancel: CancelToken::new(),
        }
    }

    /// Registers a callback receiving [`ProgressEvent`]s during runs.
    pub fn on_progress(
        mut self,
        callback: impl Fn(&ProgressEvent) + Send + Sync + 'static,
    ) -> Self {
        self.progress = Progress::new(callback);
        self
    }

    /// Token that aborts an in-flight run when cancelled.
    ///
    /// The run still returns the records gathered before cancellation.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Performs a full run: stream, recover gaps, sort.
    ///
    /// # Errors
    /// Returns [`ClientError::StreamFailed`] only when the first connection
    /// cannot be established. Every later failure, including a failed write
    /// of the stream request, is absorbed and reported in the [`RunReport`].
    pub fn run(&self) -> Result<RunReport, ClientError> {
        let started = Instant::now();
        let mut store = RecordStore::new();

        log::info!("Starting stream phase");
        let stream = read_stream(&self.connector, &mut store, &self.progress, &self.cancel)
            .inspect_err(|e| log::error!("Initial connection failed: {}", e))?;

        log::info!("Starting gap recovery phase");
        let recovery = recover_gaps(
            &self.connector,
            &mut store,
            &self.recovery,
            &self.progress,
            &self.cancel,
        );

        let records = store.finalize();
        log::info!("Finalized {} records", records.len());
        self.progress.emit(ProgressEvent::Finalized {
            total: records.len(),
        });

        Ok(RunReport {
            records,
            stream,
            recovery,
            elapsed: started.elapsed(),
        })
    }
}
