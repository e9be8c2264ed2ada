//! Field element codec.
//!
//! Every value the chain emits is a 252-bit field element. The projection
//! stores them as fixed-width 32-byte big-endian buffers so that byte order
//! equals numeric order, and short display strings (names, hashes) are packed
//! into a single element as big-endian ASCII.

use alloy_primitives::U256;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::{Error, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Width of an encoded felt in bytes
pub const FELT_BYTES: usize = 32;

/// Maximum number of ASCII characters a short string can hold
pub const SHORT_STRING_CAPACITY: usize = 31;

/// Field modulus P = 2^251 + 17 * 2^192 + 1, big-endian
pub const FIELD_MODULUS: [u8; FELT_BYTES] = [
    0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x11, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
];

// ═══════════════════════════════════════════════════════════════════════════════
// INTEGER CODEC
// ═══════════════════════════════════════════════════════════════════════════════

/// Encode an integer as a 32-byte big-endian buffer
pub fn encode_int(value: U256) -> [u8; FELT_BYTES] {
    value.to_be_bytes::<FELT_BYTES>()
}

/// Decode a 32-byte big-endian buffer. Any other length is rejected.
pub fn decode_int(bytes: &[u8]) -> Result<U256> {
    let array: [u8; FELT_BYTES] = bytes.try_into().map_err(|_| Error::InvalidWidth {
        expected: FELT_BYTES,
        got: bytes.len(),
    })?;
    Ok(U256::from_be_bytes(array))
}

// ═══════════════════════════════════════════════════════════════════════════════
// FELT
// ═══════════════════════════════════════════════════════════════════════════════

/// A field element held in its stored form: 32 big-endian bytes.
///
/// The derived ordering compares bytes lexicographically, which for a fixed
/// big-endian width is numeric ordering.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Felt([u8; FELT_BYTES]);

impl Felt {
    /// The zero element
    pub const ZERO: Felt = Felt([0u8; FELT_BYTES]);

    /// Wrap raw big-endian bytes without range checking
    pub const fn from_bytes_be(bytes: [u8; FELT_BYTES]) -> Self {
        Self(bytes)
    }

    /// Wrap raw bytes, rejecting values at or above the field modulus
    pub fn checked(bytes: [u8; FELT_BYTES]) -> Result<Self> {
        let felt = Self(bytes);
        if !felt.is_field_element() {
            return Err(Error::NotAFieldElement(felt.to_hex()));
        }
        Ok(felt)
    }

    /// Build from a buffer of exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(Self::from_u256(decode_int(bytes)?))
    }

    /// Build from a big integer
    pub fn from_u256(value: U256) -> Self {
        Self(encode_int(value))
    }

    /// Build from a u64
    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; FELT_BYTES];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Build from a u128
    pub fn from_u128(value: u128) -> Self {
        let mut bytes = [0u8; FELT_BYTES];
        bytes[16..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Stored byte form
    pub fn as_bytes(&self) -> &[u8; FELT_BYTES] {
        &self.0
    }

    /// Owned byte form
    pub fn to_bytes_be(self) -> [u8; FELT_BYTES] {
        self.0
    }

    /// Big integer form
    pub fn to_u256(&self) -> U256 {
        U256::from_be_bytes(self.0)
    }

    /// Narrow to u64, failing if any high byte is set
    pub fn to_u64(&self) -> Result<u64> {
        if self.0[..24].iter().any(|b| *b != 0) {
            return Err(Error::Overflow {
                felt: self.to_hex(),
                target: "u64",
            });
        }
        let mut low = [0u8; 8];
        low.copy_from_slice(&self.0[24..]);
        Ok(u64::from_be_bytes(low))
    }

    /// Whether the value is zero
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// `None` for zero, `Some(self)` otherwise.
    ///
    /// The chain encodes "no reference" as zero, so reference-like fields go
    /// through this before they reach the projection.
    pub fn non_zero(self) -> Option<Self> {
        if self.is_zero() {
            None
        } else {
            Some(self)
        }
    }

    /// Whether the value is below the field modulus
    pub fn is_field_element(&self) -> bool {
        self.0 < FIELD_MODULUS
    }

    /// Parse a `0x`-prefixed hex literal of up to 64 digits
    pub fn from_hex(literal: &str) -> Result<Self> {
        let digits = literal
            .strip_prefix("0x")
            .or_else(|| literal.strip_prefix("0X"))
            .ok_or_else(|| Error::InvalidLiteral {
                literal: literal.to_string(),
                reason: "hex value must start with 0x".into(),
            })?;

        if digits.is_empty() || digits.len() > FELT_BYTES * 2 {
            return Err(Error::InvalidLiteral {
                literal: literal.to_string(),
                reason: format!("expected 1 to {} hex digits", FELT_BYTES * 2),
            });
        }

        let padded = if digits.len() % 2 == 1 {
            format!("0{}", digits)
        } else {
            digits.to_string()
        };
        let decoded = hex::decode(&padded).map_err(|e| Error::InvalidLiteral {
            literal: literal.to_string(),
            reason: e.to_string(),
        })?;

        let mut bytes = [0u8; FELT_BYTES];
        bytes[FELT_BYTES - decoded.len()..].copy_from_slice(&decoded);
        Self::checked(bytes)
    }

    /// Parse a base-10 literal
    pub fn from_decimal(literal: &str) -> Result<Self> {
        if literal.is_empty() || !literal.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidLiteral {
                literal: literal.to_string(),
                reason: "expected decimal digits".into(),
            });
        }
        let value = U256::from_str_radix(literal, 10).map_err(|e| Error::InvalidLiteral {
            literal: literal.to_string(),
            reason: e.to_string(),
        })?;
        Self::checked(encode_int(value))
    }

    /// Parse either a hex (`0x…`) or decimal literal
    pub fn parse(literal: &str) -> Result<Self> {
        let trimmed = literal.trim();
        if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
            Self::from_hex(trimmed)
        } else {
            Self::from_decimal(trimmed)
        }
    }

    /// Full-width hex form (`0x` + 64 digits)
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Hex form without leading zero digits
    pub fn to_short_hex(&self) -> String {
        let full = hex::encode(self.0);
        let trimmed = full.trim_start_matches('0');
        if trimmed.is_empty() {
            "0x0".to_string()
        } else {
            format!("0x{}", trimmed)
        }
    }
}

impl From<u64> for Felt {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<U256> for Felt {
    fn from(value: U256) -> Self {
        Self::from_u256(value)
    }
}

impl fmt::Display for Felt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_short_hex())
    }
}

impl fmt::Debug for Felt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Felt({})", self.to_short_hex())
    }
}

// Human-readable formats (JSON inputs, CLI output) use hex strings and accept
// plain integers; binary formats keep the raw 32 bytes.
impl Serialize for Felt {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_short_hex())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Felt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(FeltVisitor)
        } else {
            <[u8; FELT_BYTES]>::deserialize(deserializer).map(Felt)
        }
    }
}

struct FeltVisitor;

impl<'de> Visitor<'de> for FeltVisitor {
    type Value = Felt;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer, a decimal string or a 0x-prefixed hex string")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<Felt, E> {
        Ok(Felt::from_u64(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<Felt, E> {
        u64::try_from(value)
            .map(Felt::from_u64)
            .map_err(|_| E::custom(format!("negative felt literal {}", value)))
    }

    fn visit_u128<E: de::Error>(self, value: u128) -> std::result::Result<Felt, E> {
        Ok(Felt::from_u128(value))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Felt, E> {
        Felt::parse(value).map_err(E::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SHORT STRINGS
// ═══════════════════════════════════════════════════════════════════════════════

/// Pack ASCII text into a felt as a big-endian integer.
///
/// NUL is the padding byte and cannot appear in the text.
pub fn encode_ascii(text: &str) -> Result<Felt> {
    if !text.is_ascii() || text.contains('\0') {
        return Err(Error::InvalidAscii {
            field: "short string".into(),
            text: text.to_string(),
        });
    }
    let bytes = text.as_bytes();
    if bytes.len() > SHORT_STRING_CAPACITY {
        return Err(Error::StringTooLong {
            len: bytes.len(),
            capacity: SHORT_STRING_CAPACITY,
        });
    }

    let mut buffer = [0u8; FELT_BYTES];
    buffer[FELT_BYTES - bytes.len()..].copy_from_slice(bytes);
    Ok(Felt(buffer))
}

/// Unpack a felt into ASCII text.
///
/// Leading zero bytes are the padding of the big-endian word; trailing NULs
/// are dropped as well. A NUL between two characters is an error.
pub fn decode_ascii(felt: &Felt) -> Result<String> {
    let bytes = felt.as_bytes();
    if let Some(bad) = bytes.iter().find(|b| !b.is_ascii()) {
        return Err(Error::InvalidAscii {
            field: "short string".into(),
            text: format!("byte 0x{:02x} in {}", bad, felt.to_short_hex()),
        });
    }

    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| *b != 0).map_or(start, |i| i + 1);
    let content = &bytes[start..end];

    if content.contains(&0) {
        return Err(Error::InvalidAscii {
            field: "short string".into(),
            text: format!("interior NUL in {}", felt.to_short_hex()),
        });
    }

    Ok(content.iter().map(|b| *b as char).collect())
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_int_is_fixed_width() {
        let bytes = encode_int(U256::from(45u64));
        assert_eq!(bytes.len(), FELT_BYTES);
        assert_eq!(bytes[31], 45);
        assert!(bytes[..31].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_decode_int_rejects_wrong_width() {
        let err = decode_int(&[0u8; 31]).unwrap_err();
        assert_eq!(err, Error::InvalidWidth { expected: 32, got: 31 });
        assert!(decode_int(&[0u8; 33]).is_err());
    }

    #[test]
    fn test_byte_order_is_numeric_order() {
        let small = Felt::from_u64(255);
        let large = Felt::from_u64(256);
        assert!(small < large);
        assert!(Felt::ZERO < small);
    }

    #[test]
    fn test_hex_literals() {
        let felt = Felt::from_hex("0xABC").unwrap();
        assert_eq!(felt, Felt::from_u64(0xabc));
        assert_eq!(felt.to_short_hex(), "0xabc");
        assert_eq!(felt.to_hex().len(), 66);
        assert!(Felt::from_hex("abc").is_err());
        assert!(Felt::from_hex("0x").is_err());
        assert!(Felt::from_hex("0xzz").is_err());
    }

    #[test]
    fn test_modulus_check() {
        assert!(Felt::checked(FIELD_MODULUS).is_err());
        let mut below = FIELD_MODULUS;
        below[31] = 0;
        assert!(Felt::checked(below).is_ok());
        assert!(Felt::from_hex(&format!("0x{}", "f".repeat(64))).is_err());
    }

    #[test]
    fn test_decimal_literals() {
        assert_eq!(Felt::parse("45").unwrap(), Felt::from_u64(45));
        assert_eq!(Felt::parse(" 0x2d ").unwrap(), Felt::from_u64(45));
        assert!(Felt::parse("-1").is_err());
        assert!(Felt::parse("").is_err());
    }

    #[test]
    fn test_to_u64() {
        assert_eq!(Felt::from_u64(u64::MAX).to_u64().unwrap(), u64::MAX);
        assert!(Felt::from_u128(u128::MAX).to_u64().is_err());
    }

    #[test]
    fn test_non_zero() {
        assert_eq!(Felt::ZERO.non_zero(), None);
        assert_eq!(Felt::from_u64(3).non_zero(), Some(Felt::from_u64(3)));
    }

    #[test]
    fn test_ascii_known_value() {
        let felt = encode_ascii("Elf").unwrap();
        assert_eq!(felt, Felt::from_u64(0x456c66));
        assert_eq!(decode_ascii(&felt).unwrap(), "Elf");
    }

    #[test]
    fn test_ascii_rejects_bad_input() {
        assert!(matches!(encode_ascii("é"), Err(Error::InvalidAscii { .. })));
        assert!(matches!(
            encode_ascii(&"a".repeat(32)),
            Err(Error::StringTooLong { len: 32, capacity: 31 })
        ));
        assert!(decode_ascii(&Felt::from_u64(0xff)).is_err());
        assert!(matches!(encode_ascii("\0ab"), Err(Error::InvalidAscii { .. })));
        assert!(matches!(encode_ascii("a\0b"), Err(Error::InvalidAscii { .. })));
    }

    #[test]
    fn test_ascii_nul_handling() {
        assert_eq!(decode_ascii(&Felt::from_u64(0x6162)).unwrap(), "ab");
        assert_eq!(decode_ascii(&Felt::from_u64(0x616200)).unwrap(), "ab");
        assert_eq!(decode_ascii(&Felt::ZERO).unwrap(), "");
        assert!(matches!(
            decode_ascii(&Felt::from_u64(0x610062)),
            Err(Error::InvalidAscii { .. })
        ));
    }

    #[test]
    fn test_serde_json_forms() {
        let felt: Felt = serde_json::from_str("\"0xabc\"").unwrap();
        assert_eq!(felt, Felt::from_u64(0xabc));
        let felt: Felt = serde_json::from_str("7").unwrap();
        assert_eq!(felt, Felt::from_u64(7));
        let felt: Felt = serde_json::from_str("\"12\"").unwrap();
        assert_eq!(felt, Felt::from_u64(12));
        assert_eq!(serde_json::to_string(&Felt::from_u64(255)).unwrap(), "\"0xff\"");
        assert!(serde_json::from_str::<Felt>("-3").is_err());
    }

    #[test]
    fn test_bincode_keeps_raw_bytes() {
        let felt = Felt::from_u64(0xdead);
        let data = bincode::serialize(&felt).unwrap();
        assert_eq!(data.len(), FELT_BYTES);
        let back: Felt = bincode::deserialize(&data).unwrap();
        assert_eq!(back, felt);
    }

    proptest! {
        #[test]
        fn prop_int_round_trip(bytes in proptest::array::uniform32(any::<u8>())) {
            let value = U256::from_be_bytes(bytes);
            prop_assert_eq!(decode_int(&encode_int(value)).unwrap(), value);
        }

        #[test]
        fn prop_ascii_round_trip(text in "[\\x00-\\x7f]{0,31}") {
            match encode_ascii(&text) {
                Ok(felt) => prop_assert_eq!(decode_ascii(&felt).unwrap(), text),
                Err(_) => prop_assert!(text.contains('\0')),
            }
        }
    }
}
