//! Response frame validation and payload extraction.
//!
//! # Response Structure
//!
//! | Component | Size | Description |
//! |-----------|------|-------------|
//! | Header | 4 bytes | Echo of `@` + op code, checked by the client |
//! | Payload | fixed per command | Hex digits |
//! | Trailer | fixed per command | Discarded |
//!
//! The receive loop may accumulate more bytes than the frame length; anything
//! beyond the payload is ignored.
//!
//! # Example
//!
//! ```
//! use siot::{ResponseFrame, IO_STATE};
//!
//! let frame = ResponseFrame::parse("@R01A5B30000xx".to_string(), &IO_STATE).unwrap();
//! assert_eq!(frame.header(), "@R01");
//! assert_eq!(frame.payload(), "A5B30000");
//! assert_eq!(frame.decode().unwrap(), siot::codec::hex_to_bits("A5B30000").unwrap());
//! ```

use crate::codec::hex_to_bits;
use crate::command::{Decode, Query, HEADER_LEN, WRITE_ETHER_FLAG};
use crate::error::{Result, SiotError};

/// A complete response accumulated for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    raw: String,
    query: Query,
}

impl ResponseFrame {
    /// Validates an accumulated response against its query descriptor.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if the descriptor's payload range does not
    /// fit its frame, and `InvalidResponse` if the text contains non-ASCII
    /// bytes or is shorter than the query's frame length.
    pub fn parse(raw: String, query: &Query) -> Result<Self> {
        query.validate_layout()?;
        if !raw.is_ascii() {
            return Err(SiotError::invalid_response(format!(
                "{} response contains non-ASCII data",
                query.name
            )));
        }
        if raw.len() < query.frame_len {
            return Err(SiotError::invalid_response(format!(
                "{} response too short: expected at least {} bytes, got {}",
                query.name,
                query.frame_len,
                raw.len()
            )));
        }

        Ok(Self { raw, query: *query })
    }

    /// Everything that was received, including bytes past the frame length.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The header echo.
    pub fn header(&self) -> &str {
        &self.raw[..HEADER_LEN]
    }

    /// Whether the header echoes the query's op code.
    pub fn echoes(&self, query: &Query) -> bool {
        self.header() == query.header()
    }

    /// The fixed-width payload slice.
    pub fn payload(&self) -> &str {
        &self.raw[self.query.payload_start..self.query.payload_end]
    }

    /// Bytes between the payload and the end of the frame.
    pub fn trailer(&self) -> &str {
        &self.raw[self.query.payload_end..self.query.frame_len]
    }

    /// Applies the query's decoding to the payload.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDigit` if a bit-decoded payload is not valid hex.
    pub fn decode(&self) -> Result<String> {
        match self.query.decode {
            Decode::Bits => hex_to_bits(self.payload()),
            Decode::Raw => Ok(self.payload().to_string()),
        }
    }
}

/// Acknowledgment returned by the device after an Ether flag write.
///
/// The device's acknowledgment format is undocumented, so the bytes are kept
/// as received. [`verify`](Self::verify) only checks that the acknowledgment
/// starts with the `@W02` header echo every SiOt response carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtherFlagAck {
    raw: String,
}

impl EtherFlagAck {
    /// Wraps the received acknowledgment text.
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Everything that was received.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether the acknowledgment starts with the `@W02` header echo.
    pub fn echoes_command(&self) -> bool {
        self.raw.starts_with(&WRITE_ETHER_FLAG.header())
    }

    /// Returns the acknowledgment if it echoes the command header.
    ///
    /// # Errors
    ///
    /// Returns `SiotError::AckMismatch` otherwise.
    ///
    /// # Example
    ///
    /// ```
    /// use siot::EtherFlagAck;
    ///
    /// assert!(EtherFlagAck::new("@W02CR").verify().is_ok());
    /// assert!(EtherFlagAck::new("@E01CR").verify().is_err());
    /// ```
    pub fn verify(self) -> Result<Self> {
        if self.echoes_command() {
            Ok(self)
        } else {
            Err(SiotError::ack_mismatch(WRITE_ETHER_FLAG.header(), self.raw))
        }
    }
}
