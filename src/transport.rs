//! TCP transport layer for SiOt communication.
//!
//! This module provides the [`Transport`] struct which owns the stream to the
//! device. It knows about sockets, bytes and byte counts, nothing about op
//! codes or hex.
//!
//! # Design
//!
//! - **Exclusive** - one stream per transport, released on drop
//! - **Synchronous** - blocking reads bounded by an optional deadline
//! - **Length-delimited** - a receive returns once at least the expected
//!   number of bytes has been accumulated, reading in chunks of
//!   [`READ_CHUNK_SIZE`]
//!
//! # Example
//!
//! ```no_run
//! use siot::TcpTransport;
//! use std::time::Duration;
//!
//! let mut transport = TcpTransport::connect(
//!     "192.168.0.10:1025".parse().unwrap(),
//!     None,
//!     Some(Duration::from_secs(2)),
//! ).unwrap();
//!
//! transport.send(b"@R10CRLF").unwrap();
//! let response = transport.receive_exact(8).unwrap();
//! ```

use std::fmt;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::error::{Result, SiotError};

/// Default receive deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Maximum number of bytes requested from the socket per read call.
pub const READ_CHUNK_SIZE: usize = 24;

/// A byte stream the transport can drive.
///
/// Implemented for [`TcpStream`]; tests substitute in-memory streams.
pub trait DeviceStream: Read + Write {
    /// Bounds the next blocking read. `None` blocks indefinitely.
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;
}

impl DeviceStream for TcpStream {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        TcpStream::set_read_timeout(self, timeout)
    }
}

/// Transport over a TCP socket.
pub type TcpTransport = Transport<TcpStream>;

/// Exclusive owner of the stream to one device.
pub struct Transport<S: DeviceStream> {
    stream: S,
    peer: Option<SocketAddr>,
    timeout: Option<Duration>,
    desynchronized: bool,
}

impl Transport<TcpStream> {
    /// Connects to the device.
    ///
    /// # Arguments
    ///
    /// * `addr` - Device IP and port
    /// * `connect_timeout` - Bound on the TCP handshake, `None` for the OS default
    /// * `timeout` - Deadline for each receive, `None` to block indefinitely
    ///
    /// # Errors
    ///
    /// Returns `SiotError::Connect` if the handshake fails, or an I/O error
    /// if the socket cannot be configured.
    pub fn connect(
        addr: SocketAddr,
        connect_timeout: Option<Duration>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let stream = match connect_timeout {
            Some(limit) => TcpStream::connect_timeout(&addr, limit),
            None => TcpStream::connect(addr),
        }
        .map_err(|source| SiotError::Connect { addr, source })?;
        stream.set_nodelay(true)?;
        info!(%addr, "connected to SiOt");

        let mut transport = Self::from_stream(stream, timeout)?;
        transport.peer = Some(addr);
        Ok(transport)
    }
}

impl<S: DeviceStream> Transport<S> {
    /// Wraps an already-connected stream.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the stream rejects its read timeout.
    pub fn from_stream(mut stream: S, timeout: Option<Duration>) -> Result<Self> {
        if timeout.is_none() {
            stream.set_read_timeout(None)?;
        }
        Ok(Self {
            stream,
            peer: None,
            timeout,
            desynchronized: false,
        })
    }

    /// Sends one complete frame.
    ///
    /// # Errors
    ///
    /// - `SiotError::Desynchronized` if an earlier exchange failed; nothing
    ///   is written
    /// - `SiotError::Io` if the write fails
    pub fn send(&mut self, frame: &[u8]) -> Result<()> {
        if self.desynchronized {
            warn!("refusing to send on desynchronized connection");
            return Err(SiotError::Desynchronized);
        }
        debug!(frame = %String::from_utf8_lossy(frame), "send");
        let written = self
            .stream
            .write_all(frame)
            .and_then(|()| self.stream.flush());
        written.map_err(|e| self.desync(SiotError::Io(e)))
    }

    /// Reads until at least `expected_len` bytes have been accumulated.
    ///
    /// Reads are issued in chunks of up to [`READ_CHUNK_SIZE`] bytes and
    /// everything received is returned, so the result can be up to one chunk
    /// longer than `expected_len`.
    ///
    /// # Errors
    ///
    /// - `SiotError::Timeout` if the deadline expires first
    /// - `SiotError::Closed` if the device closes the stream first
    /// - `SiotError::InvalidResponse` if the bytes are not UTF-8
    /// - `SiotError::Io` for other socket errors
    ///
    /// Any error other than `InvalidResponse` leaves the stream at an unknown
    /// offset, and the transport refuses further sends.
    pub fn receive_exact(&mut self, expected_len: usize) -> Result<String> {
        if self.desynchronized {
            return Err(SiotError::Desynchronized);
        }
        self.fill(expected_len).map_err(|e| self.desync(e))
    }

    fn fill(&mut self, expected_len: usize) -> Result<String> {
        let deadline = self.timeout.map(|limit| Instant::now() + limit);
        let mut buffer = Vec::with_capacity(expected_len + READ_CHUNK_SIZE);
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        while buffer.len() < expected_len {
            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(self.timed_out(expected_len, buffer.len()));
                }
                self.stream.set_read_timeout(Some(remaining))?;
            }

            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    warn!(expected_len, received = buffer.len(), "device closed connection");
                    return Err(SiotError::Closed {
                        expected: expected_len,
                        received: buffer.len(),
                    });
                }
                Ok(n) => {
                    trace!(n, total = buffer.len() + n, expected_len, "recv chunk");
                    buffer.extend_from_slice(&chunk[..n]);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(self.timed_out(expected_len, buffer.len()));
                }
                Err(e) => return Err(SiotError::Io(e)),
            }
        }

        String::from_utf8(buffer)
            .map_err(|e| SiotError::invalid_response(format!("response is not UTF-8: {}", e)))
    }

    /// Marks the stream as misaligned and passes `err` through.
    pub(crate) fn desync(&mut self, err: SiotError) -> SiotError {
        if !matches!(err, SiotError::InvalidResponse { .. }) {
            self.desynchronized = true;
        }
        err
    }

    /// Returns `false` once an exchange has failed mid-frame.
    pub fn is_synchronized(&self) -> bool {
        !self.desynchronized
    }

    fn timed_out(&self, expected: usize, received: usize) -> SiotError {
        warn!(expected, received, timeout = ?self.timeout, "receive timed out");
        SiotError::Timeout { expected, received }
    }

    /// Returns the device address, if the transport dialed it.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Returns the receive deadline.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns a reference to the underlying stream.
    pub fn stream(&self) -> &S {
        &self.stream
    }
}

impl<S: DeviceStream> fmt::Debug for Transport<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("peer", &self.peer)
            .field("timeout", &self.timeout)
            .field("synchronized", &!self.desynchronized)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// In-memory stream replaying scripted read chunks.
    #[derive(Default)]
    struct ScriptedStream {
        reads: VecDeque<io::Result<Vec<u8>>>,
        writes: Vec<Vec<u8>>,
        read_calls: usize,
        timeouts: Vec<Option<Duration>>,
    }

    impl ScriptedStream {
        fn with_chunks(chunks: &[&[u8]]) -> Self {
            Self {
                reads: chunks.iter().map(|c| Ok(c.to_vec())).collect(),
                ..Self::default()
            }
        }
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.read_calls += 1;
            match self.reads.pop_front() {
                Some(Ok(mut data)) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    if n < data.len() {
                        self.reads.push_front(Ok(data.split_off(n)));
                    }
                    Ok(n)
                }
                Some(Err(e)) => Err(e),
                None => Err(io::Error::new(ErrorKind::WouldBlock, "no data")),
            }
        }
    }

    impl Write for ScriptedStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes.push(buf.to_vec());
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl DeviceStream for ScriptedStream {
        fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
            self.timeouts.push(timeout);
            Ok(())
        }
    }

    #[test]
    fn test_default_constants() {
        assert_eq!(DEFAULT_TIMEOUT, Duration::from_secs(2));
        assert_eq!(READ_CHUNK_SIZE, 24);
    }

    #[test]
    fn test_receive_accumulates_small_chunks() {
        let stream = ScriptedStream::with_chunks(&[b"@R", b"01A", b"5B3", b"000", b"0xx"]);
        let mut transport = Transport::from_stream(stream, None).unwrap();

        let text = transport.receive_exact(14).unwrap();
        assert_eq!(text, "@R01A5B30000xx");
        assert_eq!(transport.stream().read_calls, 5);
    }

    #[test]
    fn test_receive_does_not_return_early() {
        let stream = ScriptedStream::with_chunks(&[b"@R10", b"1", b"0", b"CR"]);
        let mut transport = Transport::from_stream(stream, None).unwrap();

        let text = transport.receive_exact(8).unwrap();
        assert!(text.len() >= 8);
        assert_eq!(transport.stream().read_calls, 4);
    }

    #[test]
    fn test_receive_keeps_over_read() {
        let stream = ScriptedStream::with_chunks(&[b"@R1010CRLF"]);
        let mut transport = Transport::from_stream(stream, None).unwrap();

        assert_eq!(transport.receive_exact(6).unwrap(), "@R1010CRLF");
    }

    #[test]
    fn test_receive_reads_at_most_one_chunk() {
        let big = [b'0'; 100];
        let stream = ScriptedStream::with_chunks(&[&big]);
        let mut transport = Transport::from_stream(stream, None).unwrap();

        let text = transport.receive_exact(14).unwrap();
        assert_eq!(text.len(), READ_CHUNK_SIZE);
    }

    #[test]
    fn test_receive_zero_expected() {
        let mut transport = Transport::from_stream(ScriptedStream::default(), None).unwrap();
        assert_eq!(transport.receive_exact(0).unwrap(), "");
        assert_eq!(transport.stream().read_calls, 0);
    }

    #[test]
    fn test_receive_timeout_reports_progress() {
        let stream = ScriptedStream::with_chunks(&[b"@R01"]);
        let mut transport =
            Transport::from_stream(stream, Some(Duration::from_secs(5))).unwrap();

        match transport.receive_exact(14) {
            Err(SiotError::Timeout { expected, received }) => {
                assert_eq!(expected, 14);
                assert_eq!(received, 4);
            }
            other => panic!("expected Timeout, got {:?}", other),
        }
        assert!(transport.stream().timeouts.iter().all(|t| t.is_some()));
    }

    #[test]
    fn test_receive_closed() {
        let mut stream = ScriptedStream::with_chunks(&[b"@R0"]);
        stream.reads.push_back(Ok(Vec::new()));
        let mut transport = Transport::from_stream(stream, None).unwrap();

        assert!(matches!(
            transport.receive_exact(8),
            Err(SiotError::Closed {
                expected: 8,
                received: 3
            })
        ));
    }

    #[test]
    fn test_receive_retries_interrupted() {
        let mut stream = ScriptedStream::default();
        stream
            .reads
            .push_back(Err(io::Error::new(ErrorKind::Interrupted, "signal")));
        stream.reads.push_back(Ok(b"@R1010CR".to_vec()));
        let mut transport = Transport::from_stream(stream, None).unwrap();

        assert_eq!(transport.receive_exact(8).unwrap(), "@R1010CR");
    }

    #[test]
    fn test_receive_other_io_error() {
        let mut stream = ScriptedStream::default();
        stream
            .reads
            .push_back(Err(io::Error::new(ErrorKind::ConnectionReset, "reset")));
        let mut transport = Transport::from_stream(stream, None).unwrap();

        assert!(matches!(transport.receive_exact(8), Err(SiotError::Io(_))));
    }

    #[test]
    fn test_receive_invalid_utf8() {
        let stream = ScriptedStream::with_chunks(&[&[0xFF, 0xFE, 0xFD, 0xFC]]);
        let mut transport = Transport::from_stream(stream, None).unwrap();

        assert!(matches!(
            transport.receive_exact(4),
            Err(SiotError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_send_single_write() {
        let mut transport = Transport::from_stream(ScriptedStream::default(), None).unwrap();
        transport.send(b"@R01CRLF").unwrap();
        assert_eq!(transport.stream().writes, vec![b"@R01CRLF".to_vec()]);
    }

    #[test]
    fn test_send_rejected_after_timeout() {
        let stream = ScriptedStream::with_chunks(&[b"@R05"]);
        let mut transport =
            Transport::from_stream(stream, Some(Duration::from_secs(5))).unwrap();

        assert!(transport.receive_exact(8).unwrap_err().is_timeout());
        assert!(!transport.is_synchronized());

        // the late tail is queued but must never be read as the next reply
        transport.stream.reads.push_back(Ok(b"80CR".to_vec()));
        assert!(matches!(
            transport.send(b"@R10CRLF"),
            Err(SiotError::Desynchronized)
        ));
        assert!(matches!(
            transport.receive_exact(8),
            Err(SiotError::Desynchronized)
        ));
        assert!(transport.stream().writes.is_empty());
        assert_eq!(transport.stream().reads.len(), 1);
    }

    #[test]
    fn test_closed_and_io_errors_desynchronize() {
        let mut stream = ScriptedStream::default();
        stream.reads.push_back(Ok(Vec::new()));
        let mut transport = Transport::from_stream(stream, None).unwrap();
        assert!(transport.receive_exact(8).is_err());
        assert!(!transport.is_synchronized());

        let mut stream = ScriptedStream::default();
        stream
            .reads
            .push_back(Err(io::Error::new(ErrorKind::ConnectionReset, "reset")));
        let mut transport = Transport::from_stream(stream, None).unwrap();
        assert!(transport.receive_exact(8).is_err());
        assert!(!transport.is_synchronized());
    }

    #[test]
    fn test_invalid_utf8_keeps_sync() {
        let stream = ScriptedStream::with_chunks(&[&[0xFF, 0xFE, 0xFD, 0xFC]]);
        let mut transport = Transport::from_stream(stream, None).unwrap();

        assert!(transport.receive_exact(4).is_err());
        assert!(transport.is_synchronized());
        transport.send(b"@R10CRLF").unwrap();
    }

    #[test]
    fn test_transport_debug() {
        let transport = Transport::from_stream(ScriptedStream::default(), None).unwrap();
        let debug_str = format!("{:?}", transport);
        assert!(debug_str.contains("Transport"));
        assert!(debug_str.contains("timeout"));
        assert!(debug_str.contains("synchronized: true"));
    }

    #[test]
    fn test_connect_refused() {
        // Bind then drop to obtain a local port with no listener.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = TcpTransport::connect(addr, Some(Duration::from_millis(500)), None);
        assert!(matches!(result, Err(SiotError::Connect { .. })));
    }
}
