//! Base36 payload codec
//!
//! The payload travels as one big-endian base36 number split over labels.
//! Leading zero bytes do not survive the trip as digits, so the receiver
//! restores them by left-padding to the agreed payload size.

use crate::request::DiscardReason;
use num_bigint::BigUint;

const RADIX: u32 = 36;

/// Decode base36 label bytes into a payload of exactly `size` bytes.
///
/// Digits are `0-9`, `A-Z` and `a-z` (case-insensitive). Anything else, an
/// empty input, or a value needing more than `size` bytes is rejected. The
/// value is never truncated.
pub fn decode_payload(encoded: &[u8], size: usize) -> Result<Box<[u8]>, DiscardReason> {
    if encoded.is_empty() {
        return Err(DiscardReason::EmptyPayload);
    }
    if let Some(position) = encoded.iter().position(|b| !b.is_ascii_alphanumeric()) {
        return Err(DiscardReason::InvalidAlphabet {
            byte: encoded[position],
            position,
        });
    }

    let value = BigUint::parse_bytes(encoded, RADIX).ok_or(DiscardReason::InvalidAlphabet {
        byte: encoded[0],
        position: 0,
    })?;

    // Zero encodes as no significant bytes
    let decoded = if value.bits() == 0 {
        Vec::new()
    } else {
        value.to_bytes_be()
    };

    if decoded.len() > size {
        return Err(DiscardReason::PayloadTooLarge {
            decoded: decoded.len(),
            capacity: size,
        });
    }

    let mut data = vec![0u8; size].into_boxed_slice();
    data[size - decoded.len()..].copy_from_slice(&decoded);
    Ok(data)
}

/// Encode raw bytes as uppercase base36 digits.
///
/// Leading zero bytes are dropped (they are restored by padding on decode);
/// an all-zero or empty payload encodes as `"0"`.
pub fn encode_payload(raw: &[u8]) -> String {
    BigUint::from_bytes_be(raw)
        .to_str_radix(RADIX)
        .to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_300() {
        assert_eq!(encode_payload(&[0x00, 0x00, 0x01, 0x2c]), "8C");
        assert_eq!(encode_payload(&[0x01, 0x3c]), "8S");
    }

    #[test]
    fn test_decode_300_padded() {
        let data = decode_payload(b"8C", 4).unwrap();
        assert_eq!(&data[..], &[0x00, 0x00, 0x01, 0x2c]);
    }

    #[test]
    fn test_decode_lowercase() {
        let data = decode_payload(b"8c", 4).unwrap();
        assert_eq!(&data[..], &[0x00, 0x00, 0x01, 0x2c]);
    }

    #[test]
    fn test_decode_zero() {
        assert_eq!(&decode_payload(b"0", 3).unwrap()[..], &[0, 0, 0]);
        assert_eq!(&decode_payload(b"000", 1).unwrap()[..], &[0]);
        assert_eq!(encode_payload(&[0, 0, 0]), "0");
        assert_eq!(encode_payload(&[]), "0");
    }

    #[test]
    fn test_decode_exact_size() {
        let raw = [0xff, 0xee, 0xdd, 0xcc];
        let encoded = encode_payload(&raw);
        assert_eq!(&decode_payload(encoded.as_bytes(), 4).unwrap()[..], &raw);
    }

    #[test]
    fn test_decode_too_large() {
        let encoded = encode_payload(&[0x01, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(
            decode_payload(encoded.as_bytes(), 4),
            Err(DiscardReason::PayloadTooLarge { decoded: 5, capacity: 4 })
        );
    }

    #[test]
    fn test_decode_invalid_alphabet() {
        assert_eq!(
            decode_payload(b"8C-1", 4),
            Err(DiscardReason::InvalidAlphabet { byte: b'-', position: 2 })
        );
        // Digit separators accepted by big-number parsers are not base36
        assert!(matches!(
            decode_payload(b"8_C", 4),
            Err(DiscardReason::InvalidAlphabet { byte: b'_', .. })
        ));
        assert!(matches!(
            decode_payload(&[b'A', 0xc3, 0xa9], 4),
            Err(DiscardReason::InvalidAlphabet { position: 1, .. })
        ));
    }

    #[test]
    fn test_decode_empty() {
        assert_eq!(decode_payload(b"", 4), Err(DiscardReason::EmptyPayload));
    }

    #[test]
    fn test_leading_zero_bytes_survive() {
        let raw = [0x00, 0x00, 0x00, 0x07, 0x00, 0x42];
        let encoded = encode_payload(&raw);
        assert_eq!(&decode_payload(encoded.as_bytes(), raw.len()).unwrap()[..], &raw);
    }
}
