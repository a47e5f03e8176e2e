//! SiOt command table and frame construction.
//!
//! Every device query is described by a static [`Query`] descriptor: its op
//! code, the shape of its argument, the total length of the response frame and
//! where the payload sits inside that frame. The [`Client`](crate::Client)
//! drives all of them through one generic executor.
//!
//! # Command Frame
//!
//! | Component | Size | Description |
//! |-----------|------|-------------|
//! | Start | 1 byte | `@` |
//! | Op code | 3 bytes | e.g. `R01`, `W02` |
//! | Argument | 0-2 bytes | page digit or hex byte, command specific |
//! | Terminator | 4 or 2 bytes | literal `CRLF` or `\r\n`, see [`Terminator`] |
//!
//! # Command Table
//!
//! | Descriptor | Frame | Response length | Payload | Decoding |
//! |------------|-------|----------------:|---------|----------|
//! | [`IO_STATE`] | `@R01` | 14 | `[4..12]` | bits |
//! | [`FLAG_STATE`] | `@R02` | 18 | `[4..16]` | bits |
//! | [`ETHER_FLAG`] | `@R05` | 8 | `[4..6]` | bits |
//! | [`UPTIME`] | `@R06` | 16 | `[4..14]` | raw |
//! | [`OUT_COUNTERS`] | `@R07` | 70 | `[4..68]` | raw |
//! | [`FLAG_COUNTERS`] | `@R09<n>` | 71 | `[4..69]` | raw |
//! | [`RUN_STATE`] | `@R10` | 8 | `[4..6]` | raw |
//! | [`WRITE_ETHER_FLAG`] | `@W02<hh>` | 6 | `[0..6]` | raw |
//!
//! Every read response must echo its `@` + op code header; the write
//! acknowledgment is kept unchecked and verified by the caller.
//!
//! # Example
//!
//! ```
//! use siot::{Command, Terminator, IO_STATE};
//!
//! let cmd = Command::new(&IO_STATE, "").unwrap();
//! assert_eq!(cmd.to_bytes(Terminator::Literal), b"@R01CRLF");
//! ```

use crate::error::{Result, SiotError};

/// First byte of every command frame.
pub const FRAME_START: u8 = b'@';

/// Length of the header echo at the start of every response frame.
pub const HEADER_LEN: usize = 4;

/// Bytes appended to every command frame.
///
/// The device documentation spells the terminator as `CRLF`, and the
/// reference client sends those four ASCII letters rather than the control
/// bytes `0x0D 0x0A`. [`Terminator::Literal`] reproduces that and is the
/// default; switch to [`Terminator::CrLf`] only for firmware known to expect
/// real control characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Terminator {
    /// The four ASCII characters `C`, `R`, `L`, `F`.
    #[default]
    Literal,
    /// Carriage return followed by line feed.
    CrLf,
}

impl Terminator {
    /// Returns the terminator bytes.
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Terminator::Literal => b"CRLF",
            Terminator::CrLf => b"\r\n",
        }
    }
}

/// Shape of the argument following the op code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Argument {
    /// No argument.
    None,
    /// One decimal digit selecting a flag page (`0`-`2`).
    PageDigit,
    /// Two uppercase hex digits.
    HexByte,
}

impl Argument {
    fn validate(self, argument: &str) -> Result<()> {
        let valid = match self {
            Argument::None => argument.is_empty(),
            Argument::PageDigit => matches!(argument.as_bytes(), [b'0'..=b'2']),
            Argument::HexByte => {
                argument.len() == 2
                    && argument
                        .bytes()
                        .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b))
            }
        };
        if valid {
            return Ok(());
        }
        let reason = match self {
            Argument::None => "command takes no argument",
            Argument::PageDigit => "must be a single digit 0-2",
            Argument::HexByte => "must be two uppercase hex digits",
        };
        Err(SiotError::invalid_parameter("argument", reason))
    }
}

/// How a response payload is turned into the value returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decode {
    /// Payload is hex and is expanded to a device-native bit string.
    Bits,
    /// Payload is returned verbatim.
    Raw,
}

/// Static description of one device query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Query {
    /// Human-readable name, used in logs.
    pub name: &'static str,
    /// Three-character op code, e.g. `R01`.
    pub op_code: &'static str,
    /// Argument accepted after the op code.
    pub argument: Argument,
    /// Number of bytes to accumulate before the response is complete.
    pub frame_len: usize,
    /// Start offset of the payload within the response.
    pub payload_start: usize,
    /// End offset (exclusive) of the payload within the response.
    pub payload_end: usize,
    /// Payload decoding.
    pub decode: Decode,
    /// Whether the response must start with [`header`](Self::header).
    pub echoed: bool,
}

impl Query {
    /// Length of the payload in characters.
    ///
    /// Zero for a descriptor whose payload range is inverted.
    pub const fn payload_len(&self) -> usize {
        self.payload_end.saturating_sub(self.payload_start)
    }

    /// Checks that the payload range lies inside the frame.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if the frame is shorter than the header or
    /// the payload range is inverted or runs past the frame.
    pub fn validate_layout(&self) -> Result<()> {
        if self.frame_len < HEADER_LEN {
            return Err(SiotError::invalid_parameter(
                "query",
                format!(
                    "{}: frame length {} is shorter than the header",
                    self.name, self.frame_len
                ),
            ));
        }
        if self.payload_start > self.payload_end || self.payload_end > self.frame_len {
            return Err(SiotError::invalid_parameter(
                "query",
                format!(
                    "{}: payload {}..{} does not fit a {}-byte frame",
                    self.name, self.payload_start, self.payload_end, self.frame_len
                ),
            ));
        }
        Ok(())
    }

    /// The 4-character header echo the device sends back (`@` + op code).
    pub fn header(&self) -> String {
        format!("@{}", self.op_code)
    }
}

/// `R01`: I/O state, 32 bits.
pub const IO_STATE: Query = Query {
    name: "io_state",
    op_code: "R01",
    argument: Argument::None,
    frame_len: 14,
    payload_start: HEADER_LEN,
    payload_end: 12,
    decode: Decode::Bits,
    echoed: true,
};

/// `R02`: flag state, FLAG1-FLAG48.
pub const FLAG_STATE: Query = Query {
    name: "flag_state",
    op_code: "R02",
    argument: Argument::None,
    frame_len: 18,
    payload_start: HEADER_LEN,
    payload_end: 16,
    decode: Decode::Bits,
    echoed: true,
};

/// `R05`: Ether flags, Ether1-Ether8.
pub const ETHER_FLAG: Query = Query {
    name: "ether_flag",
    op_code: "R05",
    argument: Argument::None,
    frame_len: 8,
    payload_start: HEADER_LEN,
    payload_end: 6,
    decode: Decode::Bits,
    echoed: true,
};

/// `R06`: uptime as DAY(4) HOUR(2) MIN(2) SEC(2), hex.
pub const UPTIME: Query = Query {
    name: "uptime",
    op_code: "R06",
    argument: Argument::None,
    frame_len: 16,
    payload_start: HEADER_LEN,
    payload_end: 14,
    decode: Decode::Raw,
    echoed: true,
};

/// `R07`: OUT1-OUT16 counters, 4 hex digits each.
pub const OUT_COUNTERS: Query = Query {
    name: "out_counters",
    op_code: "R07",
    argument: Argument::None,
    frame_len: 70,
    payload_start: HEADER_LEN,
    payload_end: 68,
    decode: Decode::Raw,
    echoed: true,
};

/// `R09<n>`: flag counters for page `n`, 4 hex digits each.
pub const FLAG_COUNTERS: Query = Query {
    name: "flag_counters",
    op_code: "R09",
    argument: Argument::PageDigit,
    frame_len: 71,
    payload_start: HEADER_LEN,
    payload_end: 69,
    decode: Decode::Raw,
    echoed: true,
};

/// `R10`: run state code.
pub const RUN_STATE: Query = Query {
    name: "run_state",
    op_code: "R10",
    argument: Argument::None,
    frame_len: 8,
    payload_start: HEADER_LEN,
    payload_end: 6,
    decode: Decode::Raw,
    echoed: true,
};

/// `W02<hh>`: overwrite the Ether flags. The whole ack is the payload.
pub const WRITE_ETHER_FLAG: Query = Query {
    name: "write_ether_flag",
    op_code: "W02",
    argument: Argument::HexByte,
    frame_len: 6,
    payload_start: 0,
    payload_end: 6,
    decode: Decode::Raw,
    echoed: false,
};

/// Every descriptor the device understands.
pub const COMMANDS: [&Query; 8] = [
    &IO_STATE,
    &FLAG_STATE,
    &ETHER_FLAG,
    &UPTIME,
    &OUT_COUNTERS,
    &FLAG_COUNTERS,
    &RUN_STATE,
    &WRITE_ETHER_FLAG,
];

/// A query paired with its validated argument, ready to serialize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command<'a> {
    query: &'a Query,
    argument: String,
}

impl<'a> Command<'a> {
    /// Creates a command for `query`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if `argument` does not match the shape the
    /// query expects.
    ///
    /// # Example
    ///
    /// ```
    /// use siot::{Command, Terminator, FLAG_COUNTERS};
    ///
    /// let cmd = Command::new(&FLAG_COUNTERS, "1").unwrap();
    /// assert_eq!(cmd.to_bytes(Terminator::Literal), b"@R091CRLF");
    /// assert!(Command::new(&FLAG_COUNTERS, "3").is_err());
    /// ```
    pub fn new(query: &'a Query, argument: impl Into<String>) -> Result<Self> {
        let argument = argument.into();
        query.argument.validate(&argument)?;
        Ok(Self { query, argument })
    }

    /// Returns the descriptor this command was built from.
    pub fn query(&self) -> &'a Query {
        self.query
    }

    /// Returns the argument.
    pub fn argument(&self) -> &str {
        &self.argument
    }

    /// Serializes the command to a single wire frame.
    pub fn to_bytes(&self, terminator: Terminator) -> Vec<u8> {
        let terminator = terminator.as_bytes();
        let mut frame = Vec::with_capacity(
            1 + self.query.op_code.len() + self.argument.len() + terminator.len(),
        );
        frame.push(FRAME_START);
        frame.extend_from_slice(self.query.op_code.as_bytes());
        frame.extend_from_slice(self.argument.as_bytes());
        frame.extend_from_slice(terminator);
        frame
    }
}
