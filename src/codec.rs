//! Hex/bit conversion in the device's nibble-reversed order.
//!
//! The SiOt encodes bit vectors as ASCII hex digits, but lists the bits of
//! each nibble least-significant first so that bit strings read left to right
//! as channel 1, 2, 3, ... Digit order across the string is preserved.
//!
//! | Hex digit | Standard binary | Device bit string |
//! |-----------|-----------------|-------------------|
//! | `3` | `0011` | `1100` |
//! | `F` | `1111` | `1111` |
//! | `2` | `0010` | `0100` |
//! | `A` | `1010` | `0101` |
//!
//! # Example
//!
//! ```
//! use siot::codec::{bits_to_hex, hex_to_bits};
//!
//! let bits = hex_to_bits("3F2A").unwrap();
//! assert_eq!(bits, "1100111101000101");
//! assert_eq!(bits_to_hex(&bits).unwrap(), "3F2A");
//! ```

use crate::error::{Result, SiotError};

/// Number of bits carried by one hex digit.
pub const BITS_PER_DIGIT: usize = 4;

/// Reverses the low 4 bits of `nibble` (`0b0011` becomes `0b1100`).
///
/// The upper 4 bits are ignored.
///
/// # Example
///
/// ```
/// use siot::codec::reverse_nibble;
///
/// assert_eq!(reverse_nibble(0b0011), 0b1100);
/// assert_eq!(reverse_nibble(0xA), 0x5);
/// ```
#[inline]
pub fn reverse_nibble(nibble: u8) -> u8 {
    ((nibble & 0b0001) << 3)
        | ((nibble & 0b0010) << 1)
        | ((nibble & 0b0100) >> 1)
        | ((nibble & 0b1000) >> 3)
}

/// Converts a hex digit string to a device-native bit string.
///
/// Each digit expands to its 4-bit binary form with the bit order reversed.
/// The output is always four times the input length.
///
/// # Errors
///
/// Returns [`SiotError::InvalidDigit`] for any character that is not
/// `0-9`, `A-F` or `a-f`.
///
/// # Example
///
/// ```
/// use siot::codec::hex_to_bits;
///
/// assert_eq!(hex_to_bits("3").unwrap(), "1100");
/// assert_eq!(hex_to_bits("a5").unwrap(), "01011010");
/// assert!(hex_to_bits("G").is_err());
/// ```
pub fn hex_to_bits(hex: &str) -> Result<String> {
    let mut output = String::with_capacity(hex.len() * BITS_PER_DIGIT);

    for (position, digit) in hex.chars().enumerate() {
        let value = digit
            .to_digit(16)
            .ok_or_else(|| SiotError::invalid_digit(digit, position))?;
        for bit in 0..BITS_PER_DIGIT {
            output.push(if (value >> bit) & 1 == 1 { '1' } else { '0' });
        }
    }

    Ok(output)
}

/// Converts a device-native bit string to uppercase hex digits.
///
/// Bits are consumed in groups of four. Trailing bits that do not fill a
/// whole group are dropped without being inspected, so a 13-bit input yields
/// the same three digits as its first 12 bits.
///
/// # Errors
///
/// Returns [`SiotError::InvalidDigit`] for a character other than `0` or `1`
/// inside a processed group.
///
/// # Example
///
/// ```
/// use siot::codec::bits_to_hex;
///
/// assert_eq!(bits_to_hex("01000101").unwrap(), "2A");
/// assert_eq!(bits_to_hex("0100010").unwrap(), "2");
/// assert!(bits_to_hex("2000").is_err());
/// ```
pub fn bits_to_hex(bits: &str) -> Result<String> {
    let chars: Vec<char> = bits.chars().collect();
    let groups = chars.len() / BITS_PER_DIGIT;
    let mut output = String::with_capacity(groups);

    for (group_index, group) in chars.chunks_exact(BITS_PER_DIGIT).enumerate() {
        let mut value = 0u32;
        for (bit, &c) in group.iter().enumerate() {
            match c {
                '0' => {}
                '1' => value |= 1 << bit,
                other => {
                    return Err(SiotError::invalid_digit(
                        other,
                        group_index * BITS_PER_DIGIT + bit,
                    ))
                }
            }
        }
        // value < 16 by construction
        if let Some(digit) = char::from_digit(value, 16) {
            output.push(digit.to_ascii_uppercase());
        }
    }

    Ok(output)
}

/// Parses a big-endian hex number of at most 4 digits.
///
/// Unlike `u16::from_str_radix`, a leading `+` is rejected and errors carry
/// the offending character.
///
/// # Example
///
/// ```
/// use siot::codec::parse_hex_u16;
///
/// assert_eq!(parse_hex_u16("00FF").unwrap(), 255);
/// assert!(parse_hex_u16("+0FF").is_err());
/// ```
pub fn parse_hex_u16(hex: &str) -> Result<u16> {
    if !(1..=4).contains(&hex.chars().count()) {
        return Err(SiotError::invalid_response(format!(
            "expected 1-4 hex digits, got {:?}",
            hex
        )));
    }
    let value = parse_hex(hex)?;
    Ok(value as u16)
}

/// Parses a big-endian hex number of at most 2 digits.
pub fn parse_hex_u8(hex: &str) -> Result<u8> {
    if !(1..=2).contains(&hex.chars().count()) {
        return Err(SiotError::invalid_response(format!(
            "expected 1-2 hex digits, got {:?}",
            hex
        )));
    }
    let value = parse_hex(hex)?;
    Ok(value as u8)
}

fn parse_hex(hex: &str) -> Result<u32> {
    hex.chars().enumerate().try_fold(0u32, |acc, (position, digit)| -> Result<u32> {
        let value = digit
            .to_digit(16)
            .ok_or_else(|| SiotError::invalid_digit(digit, position))?;
        Ok((acc << 4) | value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds the expected device bit string from standard hex via the `hex` crate.
    fn reference_bits(hex_digits: &str) -> String {
        let bytes = hex::decode(hex_digits).unwrap();
        let mut out = String::new();
        for byte in bytes {
            for nibble in [byte >> 4, byte & 0x0F] {
                out.push_str(&format!("{:04b}", reverse_nibble(nibble)));
            }
        }
        out
    }

    #[test]
    fn test_reverse_nibble() {
        assert_eq!(reverse_nibble(0b0000), 0b0000);
        assert_eq!(reverse_nibble(0b0001), 0b1000);
        assert_eq!(reverse_nibble(0b0110), 0b0110);
        assert_eq!(reverse_nibble(0b1111), 0b1111);
        assert_eq!(reverse_nibble(0xF3), 0b1100);
    }

    #[test]
    fn test_hex_to_bits_known_value() {
        let bits = hex_to_bits("3F2A").unwrap();
        assert_eq!(bits.len(), 16);
        assert_eq!(&bits[0..4], "1100");
        assert_eq!(bits, "1100111101000101");
    }

    #[test]
    fn test_hex_to_bits_matches_reference() {
        for input in ["A5B30000", "00", "FF", "0123456789ABCDEF", "7E81"] {
            assert_eq!(hex_to_bits(input).unwrap(), reference_bits(input), "{}", input);
        }
    }

    #[test]
    fn test_hex_to_bits_lowercase() {
        assert_eq!(hex_to_bits("af").unwrap(), hex_to_bits("AF").unwrap());
    }

    #[test]
    fn test_hex_to_bits_empty() {
        assert_eq!(hex_to_bits("").unwrap(), "");
    }

    #[test]
    fn test_hex_to_bits_invalid_digit() {
        match hex_to_bits("1G") {
            Err(SiotError::InvalidDigit { digit, position }) => {
                assert_eq!(digit, 'G');
                assert_eq!(position, 1);
            }
            other => panic!("expected InvalidDigit, got {:?}", other),
        }
        assert!(hex_to_bits(" 1").is_err());
        assert!(hex_to_bits("é").is_err());
    }

    #[test]
    fn test_bits_to_hex_known_value() {
        assert_eq!(bits_to_hex("1100111101000101").unwrap(), "3F2A");
        assert_eq!(bits_to_hex("01000101").unwrap(), "2A");
        assert_eq!(bits_to_hex("0101").unwrap(), "A");
    }

    #[test]
    fn test_bits_to_hex_truncates_remainder() {
        let bits = "1100111101000";
        assert_eq!(bits.len(), 13);
        assert_eq!(bits_to_hex(bits).unwrap(), bits_to_hex(&bits[..12]).unwrap());
        assert_eq!(bits_to_hex("110").unwrap(), "");
    }

    #[test]
    fn test_bits_to_hex_remainder_not_inspected() {
        assert_eq!(bits_to_hex("0000x").unwrap(), "0");
    }

    #[test]
    fn test_bits_to_hex_invalid_digit() {
        match bits_to_hex("00002000") {
            Err(SiotError::InvalidDigit { digit, position }) => {
                assert_eq!(digit, '2');
                assert_eq!(position, 4);
            }
            other => panic!("expected InvalidDigit, got {:?}", other),
        }
    }

    #[test]
    fn test_roundtrip_bits_first() {
        let samples = ["", "0000", "1000", "0110100111110000", "10101010010101011100"];
        for bits in samples {
            assert_eq!(hex_to_bits(&bits_to_hex(bits).unwrap()).unwrap(), bits);
        }
    }

    #[test]
    fn test_roundtrip_hex_first_uppercases() {
        for hex in ["3f2a", "A5B30000", "0", "deadBEEF"] {
            assert_eq!(
                bits_to_hex(&hex_to_bits(hex).unwrap()).unwrap(),
                hex.to_uppercase()
            );
        }
    }

    #[test]
    fn test_parse_hex_u16() {
        assert_eq!(parse_hex_u16("0000").unwrap(), 0);
        assert_eq!(parse_hex_u16("FFFF").unwrap(), 0xFFFF);
        assert_eq!(parse_hex_u16("01a4").unwrap(), 0x01A4);
        assert!(parse_hex_u16("").is_err());
        assert!(parse_hex_u16("10000").is_err());
        assert!(matches!(
            parse_hex_u16("00Z0"),
            Err(SiotError::InvalidDigit { digit: 'Z', position: 2 })
        ));
    }

    #[test]
    fn test_parse_hex_u8() {
        assert_eq!(parse_hex_u8("17").unwrap(), 0x17);
        assert_eq!(parse_hex_u8("F").unwrap(), 0x0F);
        assert!(parse_hex_u8("100").is_err());
    }

    #[test]
    fn test_parse_hex_counts_characters() {
        // 'é' is two bytes but one digit
        assert!(matches!(
            parse_hex_u8("1é"),
            Err(SiotError::InvalidDigit { digit: 'é', position: 1 })
        ));
        assert!(matches!(
            parse_hex_u16("00é0"),
            Err(SiotError::InvalidDigit { digit: 'é', position: 2 })
        ));
        assert!(matches!(
            parse_hex_u8("ééé"),
            Err(SiotError::InvalidResponse { .. })
        ));
    }
}
