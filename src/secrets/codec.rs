//! Decoding of textual secret fields into their fixed-length binary form.
//!
//! Fields may be written either in hexadecimal or in base64 (standard
//! alphabet, padded). Hexadecimal is tried first. Line breaks are ignored in
//! base64 text, so a long value can be wrapped in the secrets file.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::DecodeError;

/// Decode `text` into exactly `expected` bytes.
///
/// A result of the wrong length from either encoding is never accepted; when
/// one of the decodings succeeded the error reports the decoded length, with
/// the base64 length taking precedence over the hexadecimal one.
pub fn decode(text: &str, expected: usize, field: &'static str) -> Result<Vec<u8>, DecodeError> {
    let from_hex = match hex::decode(text) {
        Ok(bytes) if bytes.len() == expected => return Ok(bytes),
        other => other,
    };

    let unwrapped: String = text.chars().filter(|c| !matches!(c, '\r' | '\n')).collect();
    let from_base64 = STANDARD.decode(unwrapped);
    match (from_base64, from_hex) {
        (Ok(bytes), _) if bytes.len() == expected => Ok(bytes),
        (Ok(bytes), _) | (Err(_), Ok(bytes)) => Err(DecodeError::WrongLength {
            field,
            actual: bytes.len(),
            expected,
        }),
        (Err(b64), Err(hex)) => Err(DecodeError::Malformed {
            field,
            reason: format!("neither hex ({}) nor base64 ({})", hex, b64),
        }),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_mac() {
        let out = decode("8c2b8a29d314", 6, "mac").unwrap();
        assert_eq!(out, [0x8c, 0x2b, 0x8a, 0x29, 0xd3, 0x14]);
    }

    #[test]
    fn hex_key() {
        let out = decode("2ba019f94b77d4fe20b39945a4974498", 16, "key").unwrap();
        assert_eq!(
            out,
            [
                0x2b, 0xa0, 0x19, 0xf9, 0x4b, 0x77, 0xd4, 0xfe, 0x20, 0xb3, 0x99, 0x45, 0xa4, 0x97,
                0x44, 0x98
            ]
        );
    }

    #[test]
    fn base64_mac() {
        let out = decode("fLuKJdMk", 6, "mac").unwrap();
        assert_eq!(out, [0x7c, 0xbb, 0x8a, 0x25, 0xd3, 0x24]);
    }

    #[test]
    fn both_encodings_give_back_the_bytes() {
        let blob: Vec<u8> = (0..=255u8).collect();
        assert_eq!(decode(&hex::encode(&blob), 256, "blob").unwrap(), blob);
        assert_eq!(decode(&STANDARD.encode(&blob), 256, "blob").unwrap(), blob);

        let key = [0xa5u8; 16];
        assert_eq!(decode(&hex::encode(key), 16, "key").unwrap(), key);
        assert_eq!(decode(&STANDARD.encode(key), 16, "key").unwrap(), key);
    }

    #[test]
    fn hex_of_wrong_size() {
        let err = decode("1c2b2a75d3", 6, "mac").unwrap_err();
        assert_eq!(
            err,
            DecodeError::WrongLength {
                field: "mac",
                actual: 5,
                expected: 6
            }
        );
    }

    #[test]
    fn base64_of_wrong_size() {
        // 16 zero bytes, given where a MAC is expected
        let err = decode("AAAAAAAAAAAAAAAAAAAAAA==", 6, "mac").unwrap_err();
        assert_eq!(
            err,
            DecodeError::WrongLength {
                field: "mac",
                actual: 16,
                expected: 6
            }
        );
    }

    #[test]
    fn invalid_input() {
        let err = decode("not-a-hex-or-base64!", 8, "key").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { field: "key", .. }));
    }

    #[test]
    fn unpadded_base64_is_rejected() {
        // "AQI=" without its padding
        let err = decode("AQI", 2, "mac").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
    }

    #[test]
    fn wrapped_base64() {
        let blob: Vec<u8> = (0..=255u8).collect();
        let encoded = STANDARD.encode(&blob);
        let wrapped = encoded
            .as_bytes()
            .chunks(76)
            .map(|line| std::str::from_utf8(line).unwrap())
            .collect::<Vec<_>>()
            .join("\r\n");
        assert_eq!(decode(&wrapped, 256, "blob").unwrap(), blob);
    }

    #[test]
    fn base64_with_trailing_newline() {
        let text = format!("{}==\n", "A".repeat(342));
        assert_eq!(decode(&text, 256, "blob").unwrap(), vec![0u8; 256]);
    }

    #[test]
    fn hex_does_not_skip_newlines() {
        // Only the base64 reading remains, which is 9 bytes long
        let err = decode("8c2b8a29d314\n", 6, "mac").unwrap_err();
        assert_eq!(
            err,
            DecodeError::WrongLength {
                field: "mac",
                actual: 9,
                expected: 6
            }
        );
    }
}
