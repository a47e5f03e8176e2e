//! High-level client for the SiOt I/O controller.
//!
//! This module provides the [`Client`] struct, the primary interface for
//! querying a SiOt device.
//!
//! # Overview
//!
//! Every query follows the same path: look up the [`Query`] descriptor, build
//! the frame, send it in one write, receive until the descriptor's frame
//! length has arrived, slice the payload and decode it. The public `check_*`
//! methods are thin instantiations of that path and return the strings the
//! device sends; the typed methods (`io_state`, `uptime`, ...) parse those
//! strings into [`status`](crate::status) values.
//!
//! # Example
//!
//! ```no_run
//! use siot::{Client, ClientConfig, FlagPage};
//! use std::net::Ipv4Addr;
//!
//! let config = ClientConfig::new(Ipv4Addr::new(192, 168, 0, 10), 1025);
//! let mut client = Client::new(config)?;
//!
//! let io = client.check_io_state()?;
//! let uptime = client.uptime()?;
//! let counters = client.flag_counters(FlagPage::Flags17To32)?;
//! client.set_ether_flag("01000101")?;
//! # Ok::<(), siot::SiotError>(())
//! ```
//!
//! # Thread Safety
//!
//! Responses carry no correlation id, so only one query may be in flight.
//! Every operation takes `&mut self`; share a client between threads behind a
//! `Mutex` so that whole queries are serialized.

use std::fmt;
use std::net::{IpAddr, SocketAddr, TcpStream};
use std::time::Duration;

use tracing::{debug, warn};

use crate::codec::bits_to_hex;
use crate::command::{
    Command, Query, Terminator, ETHER_FLAG, FLAG_COUNTERS, FLAG_STATE, IO_STATE, OUT_COUNTERS,
    RUN_STATE, UPTIME, WRITE_ETHER_FLAG,
};
use crate::error::{Result, SiotError};
use crate::response::{EtherFlagAck, ResponseFrame};
use crate::status::{
    parse_counters, parse_flag_counters, BitVector, EtherFlags, FlagPage, FlagState, IoState, RunState, Uptime,
};
use crate::transport::{DeviceStream, Transport, DEFAULT_TIMEOUT};

/// Number of bits accepted by [`Client::set_ether_flag`].
pub const ETHER_FLAG_BITS: usize = 8;

/// Configuration for creating a SiOt client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Device IP address and TCP port.
    pub addr: SocketAddr,
    /// Receive deadline per query, `None` to block indefinitely.
    pub timeout: Option<Duration>,
    /// Bound on the TCP handshake, `None` for the OS default.
    pub connect_timeout: Option<Duration>,
    /// Bytes appended to every command.
    pub terminator: Terminator,
}

impl ClientConfig {
    /// Creates a configuration for the device at `ip:port`.
    ///
    /// Both values are required. The receive deadline defaults to
    /// [`DEFAULT_TIMEOUT`] and the terminator to [`Terminator::Literal`].
    ///
    /// # Example
    ///
    /// ```
    /// use siot::ClientConfig;
    /// use std::net::Ipv4Addr;
    ///
    /// let config = ClientConfig::new(Ipv4Addr::new(192, 168, 0, 10), 1025);
    /// assert_eq!(config.addr.port(), 1025);
    /// ```
    pub fn new(ip: impl Into<IpAddr>, port: u16) -> Self {
        Self {
            addr: SocketAddr::new(ip.into(), port),
            timeout: Some(DEFAULT_TIMEOUT),
            connect_timeout: None,
            terminator: Terminator::default(),
        }
    }

    /// Sets the receive deadline (default is 2 seconds).
    ///
    /// # Example
    ///
    /// ```
    /// use siot::ClientConfig;
    /// use std::net::Ipv4Addr;
    /// use std::time::Duration;
    ///
    /// let config = ClientConfig::new(Ipv4Addr::LOCALHOST, 1025)
    ///     .with_timeout(Duration::from_millis(500));
    /// assert_eq!(config.timeout, Some(Duration::from_millis(500)));
    /// ```
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Removes the receive deadline; queries block until the device answers.
    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Bounds the TCP handshake.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Selects the command terminator.
    ///
    /// # Example
    ///
    /// ```
    /// use siot::{ClientConfig, Terminator};
    /// use std::net::Ipv4Addr;
    ///
    /// let config = ClientConfig::new(Ipv4Addr::LOCALHOST, 1025)
    ///     .with_terminator(Terminator::CrLf);
    /// ```
    pub fn with_terminator(mut self, terminator: Terminator) -> Self {
        self.terminator = terminator;
        self
    }
}

/// SiOt client.
///
/// Owns the connection to one device. Each operation produces exactly one
/// request and one response. No automatic retries or reconnection; the
/// connection is closed when the client is dropped.
pub struct Client<S: DeviceStream = TcpStream> {
    transport: Transport<S>,
    terminator: Terminator,
}

impl Client<TcpStream> {
    /// Connects to the device described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `SiotError::Connect` if the device cannot be reached.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use siot::{Client, ClientConfig};
    /// use std::net::Ipv4Addr;
    ///
    /// let client = Client::new(ClientConfig::new(Ipv4Addr::new(192, 168, 0, 10), 1025)).unwrap();
    /// ```
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = Transport::connect(config.addr, config.connect_timeout, config.timeout)?;
        Ok(Self::from_transport(transport, config.terminator))
    }
}

impl<S: DeviceStream> Client<S> {
    /// Builds a client over an existing transport.
    pub fn from_transport(transport: Transport<S>, terminator: Terminator) -> Self {
        Self {
            transport,
            terminator,
        }
    }

    /// Runs one query: send, receive the full frame, validate it.
    ///
    /// A response that does not echo the query header belongs to another
    /// exchange; the transport is marked out of sync and later queries fail
    /// with `Desynchronized`.
    fn query(&mut self, query: &Query, argument: &str) -> Result<ResponseFrame> {
        let command = Command::new(query, argument)?;
        debug!(
            query = query.name,
            op_code = query.op_code,
            argument,
            frame_len = query.frame_len,
            "query"
        );

        self.transport.send(&command.to_bytes(self.terminator))?;
        let raw = self.transport.receive_exact(query.frame_len)?;
        let frame = ResponseFrame::parse(raw, query)?;
        if query.echoed && !frame.echoes(query) {
            warn!(
                query = query.name,
                received = frame.header(),
                "response does not echo query header"
            );
            let err = SiotError::echo_mismatch(query.header(), frame.header());
            return Err(self.transport.desync(err));
        }
        Ok(frame)
    }

    fn query_decoded(&mut self, query: &Query, argument: &str) -> Result<String> {
        self.query(query, argument)?.decode()
    }

    /// Reads the I/O state (`R01`) as a 32-character device-native bit string.
    ///
    /// Bit order follows the device wiring:
    /// `[IN1, IN2, ..., OUT4, OUT3, OUT2, OUT1, OUT8, ...]`.
    ///
    /// # Errors
    ///
    /// Returns an error if communication fails or the payload is not hex.
    pub fn check_io_state(&mut self) -> Result<String> {
        self.query_decoded(&IO_STATE, "")
    }

    /// Reads the flag state (`R02`) as a 48-character bit string, FLAG1 first.
    pub fn check_flag_state(&mut self) -> Result<String> {
        self.query_decoded(&FLAG_STATE, "")
    }

    /// Reads the Ether flags (`R05`) as an 8-character bit string, Ether1 first.
    pub fn check_ether_flag(&mut self) -> Result<String> {
        self.query_decoded(&ETHER_FLAG, "")
    }

    /// Reads the uptime (`R06`) as 10 raw hex digits: DAY(4) HOUR(2) MIN(2) SEC(2).
    pub fn check_uptime(&mut self) -> Result<String> {
        self.query_decoded(&UPTIME, "")
    }

    /// Reads OUT1-OUT16 counters (`R07`) as 64 raw hex digits, 4 per counter.
    pub fn check_out_counters(&mut self) -> Result<String> {
        self.query_decoded(&OUT_COUNTERS, "")
    }

    /// Reads one page of flag counters (`R09<page>`) as 65 raw characters:
    /// the echoed page digit followed by 64 hex digits.
    ///
    /// Page 0 covers FLAG1-16, 1 covers FLAG17-32, 2 covers FLAG33-48.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for any other page, before sending.
    pub fn check_flag_counters(&mut self, page: u8) -> Result<String> {
        let page = FlagPage::try_from(page)?;
        self.query_decoded(&FLAG_COUNTERS, &page.selector().to_string())
    }

    /// Reads the 2-character run state code (`R10`).
    ///
    /// The first digit is 1=RUN, 2=unused, 4=error, 8=INIT; the second is unused.
    pub fn check_run_state(&mut self) -> Result<String> {
        self.query_decoded(&RUN_STATE, "")
    }

    /// Overwrites the Ether flags (`W02`).
    ///
    /// `bits` is an 8-character device-native bit string, Ether1 first. The
    /// acknowledgment is returned as received; see [`EtherFlagAck::verify`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if `bits` is not 8 characters long and
    /// `InvalidDigit` if it contains anything but `0` and `1`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use siot::{Client, ClientConfig};
    /// # use std::net::Ipv4Addr;
    /// # let mut client = Client::new(ClientConfig::new(Ipv4Addr::new(192, 168, 0, 10), 1025)).unwrap();
    /// // sends "@W022ACRLF"
    /// let ack = client.set_ether_flag("01000101")?;
    /// ack.verify()?;
    /// # Ok::<(), siot::SiotError>(())
    /// ```
    pub fn set_ether_flag(&mut self, bits: &str) -> Result<EtherFlagAck> {
        let count = bits.chars().count();
        if count != ETHER_FLAG_BITS {
            return Err(SiotError::invalid_parameter(
                "bits",
                format!("must be {} bits, got {}", ETHER_FLAG_BITS, count),
            ));
        }
        let hex = bits_to_hex(bits)?;
        let frame = self.query(&WRITE_ETHER_FLAG, &hex)?;
        Ok(EtherFlagAck::new(frame.raw()))
    }

    /// Reads the I/O state as a [`BitVector`].
    pub fn io_state(&mut self) -> Result<IoState> {
        BitVector::new(self.check_io_state()?)
    }

    /// Reads the flag state as a [`BitVector`].
    pub fn flag_state(&mut self) -> Result<FlagState> {
        BitVector::new(self.check_flag_state()?)
    }

    /// Reads the Ether flags as a [`BitVector`].
    pub fn ether_flags(&mut self) -> Result<EtherFlags> {
        BitVector::new(self.check_ether_flag()?)
    }

    /// Reads and parses the uptime.
    pub fn uptime(&mut self) -> Result<Uptime> {
        Uptime::parse(&self.check_uptime()?)
    }

    /// Reads and parses the 16 OUT counters, OUT1 first.
    pub fn out_counters(&mut self) -> Result<Vec<u16>> {
        parse_counters(&self.check_out_counters()?)
    }

    /// Reads and parses the 16 counters of `page`, starting at
    /// [`FlagPage::first_flag`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidResponse` if the device echoes a different page.
    pub fn flag_counters(&mut self, page: FlagPage) -> Result<Vec<u16>> {
        parse_flag_counters(&self.check_flag_counters(page.index())?, page)
    }

    /// Reads and parses the run state.
    pub fn run_state(&mut self) -> Result<RunState> {
        RunState::from_code(&self.check_run_state()?)
    }

    /// Returns `false` once a failed exchange has left the connection out of
    /// sync; reconnect with a new client.
    pub fn is_synchronized(&self) -> bool {
        self.transport.is_synchronized()
    }

    /// Returns the command terminator in use.
    pub fn terminator(&self) -> Terminator {
        self.terminator
    }

    /// Returns the underlying transport.
    pub fn transport(&self) -> &Transport<S> {
        &self.transport
    }
}

impl<S: DeviceStream> fmt::Debug for Client<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("transport", &self.transport)
            .field("terminator", &self.terminator)
            .finish()
    }
}
