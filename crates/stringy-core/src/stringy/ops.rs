//! The byte algorithms behind the four operations.
//!
//! `hash` is the first four bytes of the BLAKE3 digest, little-endian.

use crate::types::{ByteString, CharacterSequence, HashValue, Summary};
use crate::{Result, StringyError};

/// `hash` of the empty input.
pub const EMPTY_HASH: HashValue = HashValue(0xB949_13AF);

pub fn reverse(input: &[u8]) -> ByteString {
    let mut reversed = input.to_vec();
    reversed.reverse();
    ByteString::from(reversed)
}

pub fn hash(input: &[u8]) -> HashValue {
    let digest = blake3::hash(input);
    let bytes = digest.as_bytes();
    HashValue(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

pub fn split(input: &[u8]) -> CharacterSequence {
    CharacterSequence::new(input.iter().map(|&b| b as i8).collect())
}

pub fn summarize(input: &[u8]) -> Result<Summary> {
    let char_count = u32::try_from(input.len()).map_err(|_| StringyError::Validation {
        field: "input".to_string(),
        message: format!("{} bytes exceeds the 32-bit character count", input.len()),
    })?;
    Ok(Summary {
        char_count,
        hash: hash(input),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_hello() {
        assert_eq!(reverse(b"hello").as_bytes(), b"olleh");
        assert!(reverse(b"").is_empty());
    }

    #[test]
    fn test_reverse_is_an_involution() {
        for input in [&b""[..], b"a", b"ab", b"\x00\xff\x10", b"racecar!"] {
            assert_eq!(reverse(reverse(input).as_bytes()).as_bytes(), input);
        }
    }

    #[test]
    fn test_empty_hash_constant() {
        assert_eq!(hash(b""), EMPTY_HASH);
    }

    #[test]
    fn test_hash_is_deterministic_and_input_sensitive() {
        assert_eq!(hash(b"abc"), hash(b"abc"));
        assert_ne!(hash(b"abc"), hash(b"abd"));
    }

    #[test]
    fn test_split_preserves_order_and_length() {
        let seq = split(b"abc");
        assert_eq!(seq.as_slice(), &[97, 98, 99]);

        let seq = split(&[0x80, 0xff]);
        assert_eq!(seq.as_slice(), &[-128, -1]);
        assert_eq!(seq.to_bytes(), vec![0x80, 0xff]);
    }

    #[test]
    fn test_summarize_matches_length_and_hash() {
        let summary = summarize(b"hello").unwrap();
        assert_eq!(summary.char_count, 5);
        assert_eq!(summary.hash, hash(b"hello"));

        let empty = summarize(b"").unwrap();
        assert_eq!(empty.char_count, 0);
        assert_eq!(empty.hash, EMPTY_HASH);
    }
}
