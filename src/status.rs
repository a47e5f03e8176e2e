//! Typed views over SiOt query results.
//!
//! The [`Client`](crate::Client) `check_*` calls return the strings the
//! device sends. The types here give those strings their documented meaning.
//!
//! | Query | Type |
//! |-------|------|
//! | I/O state, flag state, Ether flags | [`BitVector`] |
//! | Uptime | [`Uptime`] |
//! | Run state | [`RunState`] |
//! | OUT counters | `Vec<u16>` via [`parse_counters`] |
//! | Flag counters | `Vec<u16>` via [`parse_flag_counters`] |
//!
//! # Example
//!
//! ```
//! use siot::{RunState, Uptime};
//!
//! let uptime = Uptime::parse("0002173B0A").unwrap();
//! assert_eq!(uptime.to_string(), "2d 23:59:10");
//!
//! assert_eq!(RunState::from_code("10").unwrap(), RunState::Run);
//! ```

use std::fmt;
use std::time::Duration;

use crate::codec::{parse_hex_u16, parse_hex_u8};
use crate::error::{Result, SiotError};

/// Number of hex digits per counter value.
pub const COUNTER_DIGITS: usize = 4;

/// Number of flags per flag counter page.
pub const FLAGS_PER_PAGE: u8 = 16;

fn ensure_hex(text: &str) -> Result<()> {
    match text.chars().enumerate().find(|(_, c)| !c.is_ascii_hexdigit()) {
        Some((position, digit)) => Err(SiotError::invalid_digit(digit, position)),
        None => Ok(()),
    }
}

/// A device-native bit string; index 0 is channel or flag 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct BitVector(String);

/// I/O state: `[IN1, IN2, ..., OUT4, OUT3, OUT2, OUT1, OUT8, ...]` as wired.
pub type IoState = BitVector;
/// Flag state: FLAG1 to FLAG48.
pub type FlagState = BitVector;
/// Ether flags: Ether1 to Ether8.
pub type EtherFlags = BitVector;

impl BitVector {
    /// Wraps a `0`/`1` string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDigit` for any other character.
    pub fn new(bits: impl Into<String>) -> Result<Self> {
        let bits = bits.into();
        if let Some((position, digit)) = bits
            .chars()
            .enumerate()
            .find(|(_, c)| *c != '0' && *c != '1')
        {
            return Err(SiotError::invalid_digit(digit, position));
        }
        Ok(Self(bits))
    }

    /// Builds a bit string from booleans, index 0 first.
    ///
    /// # Example
    ///
    /// ```
    /// use siot::BitVector;
    ///
    /// let flags = BitVector::from_bools(&[false, true, false, false, false, true, false, true]);
    /// assert_eq!(flags.as_str(), "01000101");
    /// ```
    pub fn from_bools(bits: &[bool]) -> Self {
        Self(bits.iter().map(|&b| if b { '1' } else { '0' }).collect())
    }

    /// Returns the bit at `index` (0-based), or `None` past the end.
    pub fn get(&self, index: usize) -> Option<bool> {
        self.0.as_bytes().get(index).map(|&b| b == b'1')
    }

    /// Returns the 0-based indices of every set bit.
    pub fn on_indices(&self) -> Vec<usize> {
        self.0
            .bytes()
            .enumerate()
            .filter(|(_, b)| *b == b'1')
            .map(|(i, _)| i)
            .collect()
    }

    /// Returns the bits as booleans.
    pub fn to_bools(&self) -> Vec<bool> {
        self.0.bytes().map(|b| b == b'1').collect()
    }

    /// Number of bits.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the vector holds no bits.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The underlying bit string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for BitVector {
    type Error = SiotError;

    fn try_from(bits: String) -> Result<Self> {
        BitVector::new(bits)
    }
}

impl From<BitVector> for String {
    fn from(bits: BitVector) -> Self {
        bits.0
    }
}

/// Time since the device started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Uptime {
    /// Whole days.
    pub days: u16,
    /// Hours, 0-23.
    pub hours: u8,
    /// Minutes, 0-59.
    pub minutes: u8,
    /// Seconds, 0-59.
    pub seconds: u8,
}

impl Uptime {
    /// Length of the uptime payload.
    pub const DIGITS: usize = 10;

    /// Parses `DDDDHHMMSS`, every field in hex.
    ///
    /// # Errors
    ///
    /// Returns `InvalidResponse` if the length is not 10 and `InvalidDigit`
    /// for a non-hex character. Field values are not range-checked.
    pub fn parse(hex: &str) -> Result<Self> {
        if hex.len() != Self::DIGITS {
            return Err(SiotError::invalid_response(format!(
                "uptime must be {} hex digits, got {:?}",
                Self::DIGITS,
                hex
            )));
        }
        ensure_hex(hex)?;

        Ok(Self {
            days: parse_hex_u16(&hex[0..4])?,
            hours: parse_hex_u8(&hex[4..6])?,
            minutes: parse_hex_u8(&hex[6..8])?,
            seconds: parse_hex_u8(&hex[8..10])?,
        })
    }

    /// Total uptime as a [`Duration`].
    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(
            u64::from(self.days) * 86_400
                + u64::from(self.hours) * 3_600
                + u64::from(self.minutes) * 60
                + u64::from(self.seconds),
        )
    }
}

impl fmt::Display for Uptime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}d {:02}:{:02}:{:02}",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

/// Operating state reported by `R10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RunState {
    /// `1`: running.
    Run,
    /// `2`: reserved by the device.
    Unused,
    /// `4`: error.
    Error,
    /// `8`: initializing.
    Init,
    /// Any other hex digit.
    Unknown(char),
}

impl RunState {
    /// Decodes the 2-character status code; only the first digit is used.
    ///
    /// # Errors
    ///
    /// Returns `InvalidResponse` for an empty code and `InvalidDigit` if the
    /// first character is not hex.
    ///
    /// # Example
    ///
    /// ```
    /// use siot::RunState;
    ///
    /// assert_eq!(RunState::from_code("40").unwrap(), RunState::Error);
    /// assert_eq!(RunState::from_code("C0").unwrap(), RunState::Unknown('C'));
    /// assert!(RunState::from_code("Z0").is_err());
    /// ```
    pub fn from_code(code: &str) -> Result<Self> {
        let first = code
            .chars()
            .next()
            .ok_or_else(|| SiotError::invalid_response("empty run state code"))?;
        Ok(match first {
            '1' => RunState::Run,
            '2' => RunState::Unused,
            '4' => RunState::Error,
            '8' => RunState::Init,
            c if c.is_ascii_hexdigit() => RunState::Unknown(c.to_ascii_uppercase()),
            c => return Err(SiotError::invalid_digit(c, 0)),
        })
    }

    /// Returns `true` for [`RunState::Run`].
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Run)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Run => write!(f, "RUN"),
            RunState::Unused => write!(f, "UNUSED"),
            RunState::Error => write!(f, "ERROR"),
            RunState::Init => write!(f, "INIT"),
            RunState::Unknown(c) => write!(f, "UNKNOWN({})", c),
        }
    }
}

/// Block of 16 flags addressed by the flag counter query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FlagPage {
    /// FLAG1 to FLAG16 (selector `0`).
    Flags1To16,
    /// FLAG17 to FLAG32 (selector `1`).
    Flags17To32,
    /// FLAG33 to FLAG48 (selector `2`).
    Flags33To48,
}

impl FlagPage {
    /// All pages in order.
    pub const ALL: [FlagPage; 3] = [
        FlagPage::Flags1To16,
        FlagPage::Flags17To32,
        FlagPage::Flags33To48,
    ];

    /// Page index, 0-2.
    pub fn index(self) -> u8 {
        match self {
            FlagPage::Flags1To16 => 0,
            FlagPage::Flags17To32 => 1,
            FlagPage::Flags33To48 => 2,
        }
    }

    /// The selector digit sent after `R09`.
    pub fn selector(self) -> char {
        char::from(b'0' + self.index())
    }

    /// Number of the first flag on this page (1, 17 or 33).
    pub fn first_flag(self) -> u8 {
        self.index() * FLAGS_PER_PAGE + 1
    }
}

impl TryFrom<u8> for FlagPage {
    type Error = SiotError;

    fn try_from(page: u8) -> Result<Self> {
        match page {
            0 => Ok(FlagPage::Flags1To16),
            1 => Ok(FlagPage::Flags17To32),
            2 => Ok(FlagPage::Flags33To48),
            _ => Err(SiotError::invalid_parameter(
                "page",
                format!("must be 0-2, got {}", page),
            )),
        }
    }
}

impl fmt::Display for FlagPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first = self.first_flag();
        write!(f, "FLAG{}-FLAG{}", first, first + FLAGS_PER_PAGE - 1)
    }
}

/// Splits a counter payload into 4-digit hex values.
///
/// A trailing group shorter than four digits is ignored.
///
/// # Errors
///
/// Returns `InvalidDigit` if any character is not hex.
///
/// # Example
///
/// ```
/// use siot::parse_counters;
///
/// assert_eq!(parse_counters("000A00FF").unwrap(), vec![10, 255]);
/// assert_eq!(parse_counters("000A0").unwrap(), vec![10]);
/// ```
pub fn parse_counters(hex: &str) -> Result<Vec<u16>> {
    ensure_hex(hex)?;
    hex.as_bytes()
        .chunks_exact(COUNTER_DIGITS)
        .map(|group| {
            // ensure_hex guarantees ASCII
            let group = std::str::from_utf8(group)
                .map_err(|e| SiotError::invalid_response(e.to_string()))?;
            parse_hex_u16(group)
        })
        .collect()
}

/// Parses a flag counter payload for `page`.
///
/// The device echoes the page selector as the first payload character,
/// followed by 16 counters of 4 hex digits each.
///
/// # Errors
///
/// - `InvalidResponse` if the echoed selector is not `page`'s or fewer than
///   16 counters follow it
/// - `InvalidDigit` if a counter digit is not hex; positions count from the
///   first counter digit
///
/// # Example
///
/// ```
/// use siot::{parse_flag_counters, FlagPage};
///
/// let payload = format!("1{}", "00FF".repeat(16));
/// assert_eq!(parse_flag_counters(&payload, FlagPage::Flags17To32).unwrap(), vec![255; 16]);
/// assert!(parse_flag_counters(&payload, FlagPage::Flags1To16).is_err());
/// ```
pub fn parse_flag_counters(payload: &str, page: FlagPage) -> Result<Vec<u16>> {
    let mut chars = payload.chars();
    match chars.next() {
        Some(selector) if selector == page.selector() => {}
        other => {
            return Err(SiotError::invalid_response(format!(
                "flag counters for {} echoed page {:?}, expected {:?}",
                page,
                other,
                page.selector()
            )));
        }
    }
    let counters = parse_counters(chars.as_str())?;
    if counters.len() < usize::from(FLAGS_PER_PAGE) {
        return Err(SiotError::invalid_response(format!(
            "flag counters for {}: expected {} values, got {}",
            page,
            FLAGS_PER_PAGE,
            counters.len()
        )));
    }
    Ok(counters)
}
