use crate::config::ClientConfig;
use crate::errors::SessionError;
use crate::progress::{CancelToken, CancelWatch};

use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Result of a [`Session::receive_exactly`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// Exactly the requested number of bytes arrived.
    Complete(Vec<u8>),

    /// The peer closed the connection first. Holds whatever arrived before
    /// the close, possibly nothing.
    ///
    /// For the stream-all exchange this is the normal end-of-stream signal.
    Closed(Vec<u8>),
}

/// One request/response exchange over a single connection.
///
/// A session is opened by a [`Connector`], used for exactly one request,
/// then closed. Implementations must also release the connection on drop.
pub trait Session {
    /// Writes the whole request.
    fn send(&mut self, request: &[u8]) -> Result<(), SessionError>;

    /// Reads until `n` bytes have arrived or the peer closes the connection.
    fn receive_exactly(&mut self, n: usize) -> Result<Received, SessionError>;

    /// Releases the connection. Calling it more than once is a no-op.
    fn close(&mut self);
}

/// Opens fresh sessions to the exchange.
pub trait Connector {
    /// Session type produced by this connector.
    type Session: Session;

    /// Establishes a new connection.
    ///
    /// # Errors
    /// Returns [`SessionError::ConnectFailed`] when the peer is unreachable,
    /// refuses the connection, or the connect timeout expires.
    fn open(&self) -> Result<Self::Session, SessionError>;
}

/// Connector backed by blocking `std::net` TCP sockets.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    host: String,
    port: u16,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    cancel: Option<CancelToken>,
}

impl TcpConnector {
    /// Creates a connector without timeouts. Reads and connects may block
    /// indefinitely.
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            connect_timeout: None,
            read_timeout: None,
            cancel: None,
        }
    }

    /// Creates a connector using the address and timeouts of `config`.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            connect_timeout: config.connect_timeout,
            read_timeout: config.read_timeout,
            cancel: None,
        }
    }

    /// Registers every opened connection with `cancel`, so cancelling
    /// interrupts a blocked read instead of waiting for the read timeout.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Target address as `host:port`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn connect(&self) -> io::Result<TcpStream> {
        let Some(timeout) = self.connect_timeout else {
            return TcpStream::connect((self.host.as_str(), self.port));
        };

        let mut last_err = None;
        for addr in (self.host.as_str(), self.port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(ErrorKind::InvalidInput, "address resolved to nothing")
        }))
    }
}

impl Connector for TcpConnector {
    type Session = TcpSession;

    fn open(&self) -> Result<TcpSession, SessionError> {
        let addr = self.addr();
        let connect_failed = |e: io::Error| SessionError::ConnectFailed {
            addr: addr.clone(),
            reason: e.to_string(),
        };

        log::debug!("Connecting to {}", addr);
        let stream = self.connect().map_err(connect_failed)?;

        stream
            .set_read_timeout(self.read_timeout)
            .map_err(connect_failed)?;
        stream
            .set_write_timeout(self.read_timeout)
            .map_err(connect_failed)?;
        stream.set_nodelay(true).map_err(connect_failed)?;
        let watch = match &self.cancel {
            Some(cancel) => Some(cancel.watch(&stream).map_err(connect_failed)?),
            None => None,
        };

        log::debug!("Connected to {}", addr);
        Ok(TcpSession {
            stream: Some(stream),
            peer: addr,
            watch,
        })
    }
}

/// A single TCP connection used for exactly one exchange.
#[derive(Debug)]
pub struct TcpSession {
    stream: Option<TcpStream>,
    peer: String,
    watch: Option<CancelWatch>,
}

impl TcpSession {
    fn stream(&mut self) -> Result<&mut TcpStream, SessionError> {
        self.stream.as_mut().ok_or(SessionError::Closed)
    }
}

impl Session for TcpSession {
    fn send(&mut self, request: &[u8]) -> Result<(), SessionError> {
        let stream = self.stream()?;
        stream
            .write_all(request)
            .map_err(|e| SessionError::SendFailed(e.to_string()))?;
        stream
            .flush()
            .map_err(|e| SessionError::SendFailed(e.to_string()))
    }

    fn receive_exactly(&mut self, n: usize) -> Result<Received, SessionError> {
        let stream = self.stream()?;
        read_exactly(stream, n).map_err(|e| SessionError::ReceiveFailed(e.to_string()))
    }

    fn close(&mut self) {
        self.watch = None;
        if let Some(stream) = self.stream.take() {
            // The peer may already be gone; nothing useful to do on failure.
            let _ = stream.shutdown(Shutdown::Both);
            log::debug!("Closed connection to {}", self.peer);
        }
    }
}

impl Drop for TcpSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Reads from `reader` until `n` bytes are accumulated or EOF is hit.
///
/// Interrupted reads are retried. Any other error, including a read
/// timeout, is returned as-is.
pub fn read_exactly<R: Read>(reader: &mut R, n: usize) -> io::Result<Received> {
    let mut buf = vec![0u8; n];
    let mut filled = 0;

    while filled < n {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                buf.truncate(filled);
                return Ok(Received::Closed(buf));
            }
            Ok(read) => filled += read,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(Received::Complete(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::net::TcpListener;
    use std::thread;

    /// Reader that hands out scripted chunks and errors one call at a time.
    struct ChunkedReader {
        steps: VecDeque<io::Result<Vec<u8>>>,
    }

    impl Read for ChunkedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.steps.pop_front() {
                None => Ok(0),
                Some(Err(e)) => Err(e),
                Some(Ok(chunk)) => {
                    let len = chunk.len().min(buf.len());
                    buf[..len].copy_from_slice(&chunk[..len]);
                    Ok(len)
                }
            }
        }
    }

    #[test]
    fn test_read_exactly_complete() {
        let mut cursor = Cursor::new(vec![1u8, 2, 3, 4, 5]);
        assert_eq!(
            read_exactly(&mut cursor, 3).unwrap(),
            Received::Complete(vec![1, 2, 3])
        );
        assert_eq!(
            read_exactly(&mut cursor, 3).unwrap(),
            Received::Closed(vec![4, 5])
        );
        assert_eq!(read_exactly(&mut cursor, 3).unwrap(), Received::Closed(vec![]));
    }

    #[test]
    fn test_read_exactly_accumulates_chunks_and_retries_interrupts() {
        let mut reader = ChunkedReader {
            steps: VecDeque::from(vec![
                Ok(vec![1, 2]),
                Err(io::Error::new(ErrorKind::Interrupted, "signal")),
                Ok(vec![3]),
                Ok(vec![4, 5]),
            ]),
        };
        assert_eq!(
            read_exactly(&mut reader, 5).unwrap(),
            Received::Complete(vec![1, 2, 3, 4, 5])
        );
    }

    #[test]
    fn test_read_exactly_propagates_other_errors() {
        let mut reader = ChunkedReader {
            steps: VecDeque::from(vec![
                Ok(vec![1]),
                Err(io::Error::new(ErrorKind::ConnectionReset, "reset")),
            ]),
        };
        let err = read_exactly(&mut reader, 4).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionReset);
    }

    #[test]
    fn test_connect_refused() {
        // Bind then drop to get a port nothing listens on.
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let connector = TcpConnector::new("127.0.0.1", port);
        assert!(matches!(
            connector.open(),
            Err(SessionError::ConnectFailed { .. })
        ));
    }

    #[test]
    fn test_tcp_session_exchange_and_idempotent_close() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0u8; 2];
            stream.read_exact(&mut request).unwrap();
            stream.write_all(&[9, 8, 7]).unwrap();
            request
        });

        let mut session = TcpConnector::new("127.0.0.1", port).open().unwrap();
        session.send(&[1, 0]).unwrap();
        assert_eq!(
            session.receive_exactly(2).unwrap(),
            Received::Complete(vec![9, 8])
        );
        assert_eq!(session.receive_exactly(2).unwrap(), Received::Closed(vec![7]));
        session.close();
        session.close();
        assert_eq!(session.send(&[1, 0]), Err(SessionError::Closed));

        assert_eq!(server.join().unwrap(), [1, 0]);
    }

    #[test]
    fn test_read_timeout_is_receive_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_millis(300));
            drop(stream);
        });

        let config = ClientConfig {
            port,
            read_timeout: Some(Duration::from_millis(50)),
            ..ClientConfig::default()
        };
        let mut session = TcpConnector::from_config(&config).open().unwrap();
        assert!(matches!(
            session.receive_exactly(17),
            Err(SessionError::ReceiveFailed(_))
        ));
        server.join().unwrap();
    }

    #[test]
    fn test_cancel_interrupts_blocked_receive() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_millis(1500));
            drop(stream);
        });

        let cancel = CancelToken::new();
        let mut session = TcpConnector::new("127.0.0.1", port)
            .with_cancel_token(cancel.clone())
            .open()
            .unwrap();

        let canceller = cancel.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            canceller.cancel();
        });

        let started = std::time::Instant::now();
        let received = session.receive_exactly(17);
        assert!(started.elapsed() < Duration::from_millis(1000));
        assert!(!matches!(received, Ok(Received::Complete(_))));
        session.close();
        server.join().unwrap();
    }
}
