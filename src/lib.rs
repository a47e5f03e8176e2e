//! # SiOt Client Library
//!
//! A Rust library for talking to the SiOt I/O controller over its ASCII
//! command protocol on TCP.
//!
//! This is a **protocol-only** library: no polling loops, schedulers or
//! application logic. Each call produces exactly 1 request and 1 response.
//! No automatic retries, caching, or reconnection.
//!
//! ## Features
//!
//! - **Table-driven** — every device query is a static descriptor run by one executor
//! - **Bounded** — receives honour a deadline instead of blocking forever
//! - **Strict decoding** — a bad hex or bit digit is an error, never a zero
//! - **Typed views** — uptime, run state, counters and bit vectors
//!
//! ## Quick Start
//!
//! ```no_run
//! use siot::{Client, ClientConfig};
//! use std::net::Ipv4Addr;
//!
//! fn main() -> siot::Result<()> {
//!     let config = ClientConfig::new(Ipv4Addr::new(192, 168, 0, 10), 1025);
//!     let mut client = Client::new(config)?;
//!
//!     // "0101101011011100..." IN1 first
//!     let io = client.check_io_state()?;
//!     println!("I/O = {}", io);
//!
//!     let uptime = client.uptime()?;
//!     println!("up {}", uptime);
//!
//!     println!("state = {}", client.run_state()?);
//!
//!     // Ether2, Ether6 and Ether8 ON
//!     client.set_ether_flag("01000101")?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Command Set
//!
//! | Op code | Method | Returns |
//! |---------|--------|---------|
//! | `R01` | [`Client::check_io_state`] | 32-bit I/O bit string |
//! | `R02` | [`Client::check_flag_state`] | 48-bit flag bit string |
//! | `R05` | [`Client::check_ether_flag`] | 8-bit Ether flag bit string |
//! | `R06` | [`Client::check_uptime`] | 10 hex digits |
//! | `R07` | [`Client::check_out_counters`] | 64 hex digits |
//! | `R09n` | [`Client::check_flag_counters`] | page digit + 64 hex digits |
//! | `R10` | [`Client::check_run_state`] | 2-character code |
//! | `W02hh` | [`Client::set_ether_flag`] | raw acknowledgment |
//!
//! ## Bit Order
//!
//! The device lists each nibble's bits least-significant first; see [`codec`].
//!
//! ```
//! use siot::codec::{bits_to_hex, hex_to_bits};
//!
//! assert_eq!(hex_to_bits("3F2A").unwrap(), "1100111101000101");
//! assert_eq!(bits_to_hex("01000101").unwrap(), "2A");
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, SiotError>`]. The library never panics in public code.
//!
//! Responses carry no correlation id. After a timeout, a dropped connection or
//! a response that echoes the wrong op code, the client refuses further
//! queries with [`SiotError::Desynchronized`]; build a new one to continue.
//!
//! ```no_run
//! use siot::{Client, ClientConfig, SiotError};
//! use std::net::Ipv4Addr;
//!
//! let mut client = Client::new(ClientConfig::new(Ipv4Addr::new(192, 168, 0, 10), 1025))?;
//!
//! match client.check_flag_state() {
//!     Ok(flags) => println!("flags: {}", flags),
//!     Err(SiotError::Timeout { received, .. }) => println!("timeout after {} bytes", received),
//!     Err(SiotError::InvalidDigit { digit, position }) => {
//!         println!("bad digit {:?} at {}", digit, position);
//!     }
//!     Err(e) if e.is_connection_lost() => println!("reconnect: {}", e),
//!     Err(e) => println!("Error: {}", e),
//! }
//! # Ok::<(), SiotError>(())
//! ```
//!
//! ## Terminator
//!
//! Commands end with the four ASCII letters `CRLF`, not the bytes `0x0D 0x0A`,
//! matching the device's reference client. [`Terminator::CrLf`] is available
//! through [`ClientConfig::with_terminator`] for firmware that expects real
//! control characters.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod client;
pub mod codec;
mod command;
mod error;
mod response;
pub mod status;
mod transport;

// Public re-exports
pub use client::{Client, ClientConfig, ETHER_FLAG_BITS};
pub use command::{
    Argument, Command, Decode, Query, Terminator, COMMANDS, ETHER_FLAG, FLAG_COUNTERS,
    FLAG_STATE, FRAME_START, HEADER_LEN, IO_STATE, OUT_COUNTERS, RUN_STATE, UPTIME,
    WRITE_ETHER_FLAG,
};
pub use error::{Result, SiotError};
pub use response::{EtherFlagAck, ResponseFrame};
pub use status::{
    parse_counters, parse_flag_counters, BitVector, EtherFlags, FlagPage, FlagState, IoState,
    RunState, Uptime,
};
pub use transport::{DeviceStream, TcpTransport, Transport, DEFAULT_TIMEOUT, READ_CHUNK_SIZE};
