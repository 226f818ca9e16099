use crate::codec::encode_record;
use crate::defs::{CALL_RESEND, CALL_STREAM_ALL, REQUEST_SIZE};
use crate::errors::ExchangeServerError;
use crate::record::Record;
use crate::session::{Received, read_exactly};

use std::collections::HashSet;
use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

/// Exchange simulator speaking the ABX wire protocol.
///
/// Serves a fixed record book. Every connection carries one request:
/// - `[1, _]` → every record not listed in `dropped`, then close
/// - `[2, seq]` → the record with sequence `seq` if the book has it, then close
///
/// Withholding sequences from the stream lets clients exercise gap recovery.
pub struct ExchangeServer {
    /// TCP listener socket
    listener: TcpListener,

    /// Records served, shared with handler threads
    book: Arc<Vec<Record>>,

    /// Sequences left out of the stream-all response
    dropped: Arc<HashSet<i32>>,
}

impl ExchangeServer {
    /// Creates a new exchange server bound to the given address.
    ///
    /// # Arguments
    /// * `addr` - Address to bind, e.g., `"127.0.0.1:3000"`. Port `0` picks a free port.
    /// * `book` - Records to serve.
    /// * `dropped` - Sequences withheld from the stream-all response.
    ///
    /// # Returns
    /// * `Ok(ExchangeServer)` if binding succeeds.
    /// * `Err(ExchangeServerError::BindError)` if the port is unavailable.
    pub fn new(
        addr: &str,
        book: Vec<Record>,
        dropped: HashSet<i32>,
    ) -> Result<Self, ExchangeServerError> {
        log::info!("Binding exchange server to address: {}", addr);
        let listener =
            TcpListener::bind(addr).map_err(|e| ExchangeServerError::BindError(e.to_string()))?;
        log::info!(
            "Exchange server bound to {:?} serving {} records ({} withheld from stream)",
            listener.local_addr().ok(),
            book.len(),
            dropped.len()
        );

        Ok(Self {
            listener,
            book: Arc::new(book),
            dropped: Arc::new(dropped),
        })
    }

    /// Address the listener is actually bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ExchangeServerError> {
        self.listener
            .local_addr()
            .map_err(|e| ExchangeServerError::BindError(e.to_string()))
    }

    /// Accepts connections forever, one handler thread per connection.
    pub fn start(&self) -> Result<(), ExchangeServerError> {
        log::info!("Exchange server starting main loop");
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    log::debug!("New TCP connection from: {}", addr);
                    let book = self.book.clone();
                    let dropped = self.dropped.clone();
                    thread::spawn(move || {
                        if let Err(e) = handle_connection(stream, addr, &book, &dropped) {
                            log::warn!("Connection handler error for {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    log::error!("Failed to accept TCP connection: {}", e);
                    return Err(ExchangeServerError::AcceptError(e.to_string()));
                }
            }
        }
    }
}

/// Serves the single request carried by one connection, then closes it.
fn handle_connection(
    mut stream: TcpStream,
    addr: SocketAddr,
    book: &[Record],
    dropped: &HashSet<i32>,
) -> Result<(), ExchangeServerError> {
    let request = match read_exactly(&mut stream, REQUEST_SIZE)
        .map_err(|e| ExchangeServerError::ClientIoError(e.to_string()))?
    {
        Received::Complete(request) => request,
        Received::Closed(_) => {
            log::debug!("Client {} closed before sending a request", addr);
            return Ok(());
        }
    };

    match request[0] {
        CALL_STREAM_ALL => {
            let mut sent = 0;
            for record in book.iter().filter(|r| !dropped.contains(&r.sequence)) {
                write_record(&mut stream, record)?;
                sent += 1;
            }
            log::info!("Streamed {} records to {}", sent, addr);
        }
        CALL_RESEND => {
            let sequence = i32::from(request[1]);
            match book.iter().find(|r| r.sequence == sequence) {
                Some(record) => {
                    write_record(&mut stream, record)?;
                    log::info!("Resent sequence {} to {}", sequence, addr);
                }
                None => log::warn!("Client {} asked for unknown sequence {}", addr, sequence),
            }
        }
        other => log::warn!("Invalid call type {} from {}", other, addr),
    }

    // Dropping the stream closes it, which ends the response.
    Ok(())
}

fn write_record(stream: &mut TcpStream, record: &Record) -> Result<(), ExchangeServerError> {
    stream
        .write_all(&encode_record(record))
        .map_err(|e| ExchangeServerError::ClientIoError(e.to_string()))
}
