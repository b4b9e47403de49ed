//! Types that cross the process boundary.

use crate::error::StringyError;
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Immutable, length-delimited byte sequence used as operation input.
///
/// Cloning shares the underlying buffer. Travels over the wire as a
/// lowercase hex string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ByteString(Bytes);

impl ByteString {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn from_static(bytes: &'static [u8]) -> Self {
        Self(Bytes::from_static(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lossy UTF-8 view for display.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

impl AsRef<[u8]> for ByteString {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for ByteString {
    fn from(s: &str) -> Self {
        Self(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for ByteString {
    fn from(s: String) -> Self {
        Self(Bytes::from(s))
    }
}

impl From<Vec<u8>> for ByteString {
    fn from(v: Vec<u8>) -> Self {
        Self(Bytes::from(v))
    }
}

impl From<&[u8]> for ByteString {
    fn from(s: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(s))
    }
}

impl Serialize for ByteString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for ByteString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        hex::decode(&encoded)
            .map(ByteString::from)
            .map_err(serde::de::Error::custom)
    }
}

/// Deterministic 32-bit digest of a [`ByteString`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashValue(pub u32);

impl HashValue {
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for HashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

/// Per-byte values of an input, one signed entry per byte, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterSequence(Vec<i8>);

impl CharacterSequence {
    pub fn new(chars: Vec<i8>) -> Self {
        Self(chars)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[i8] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = i8> + '_ {
        self.0.iter().copied()
    }

    /// The entries reinterpreted as the original bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.iter().map(|&c| c as u8).collect()
    }
}

impl std::ops::Index<usize> for CharacterSequence {
    type Output = i8;

    fn index(&self, index: usize) -> &i8 {
        &self.0[index]
    }
}

/// `{charCount, hash}` record describing one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub char_count: u32,
    pub hash: HashValue,
}

/// `major.minor` interface version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InterfaceVersion {
    pub major: u16,
    pub minor: u16,
}

impl InterfaceVersion {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for InterfaceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for InterfaceVersion {
    type Err = StringyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StringyError::Validation {
            field: "interface_version".to_string(),
            message: format!("expected MAJOR.MINOR, got '{}'", s),
        };
        let (major, minor) = s.split_once('.').ok_or_else(invalid)?;
        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

impl TryFrom<String> for InterfaceVersion {
    type Error = StringyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<InterfaceVersion> for String {
    fn from(v: InterfaceVersion) -> Self {
        v.to_string()
    }
}

/// A named, versioned interface: the key a service registers under and a
/// caller resolves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterfaceDescriptor {
    pub name: String,
    pub version: InterfaceVersion,
}

impl InterfaceDescriptor {
    pub fn new(name: impl Into<String>, version: InterfaceVersion) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

impl fmt::Display for InterfaceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_string_wire_form_is_hex() {
        let json = serde_json::to_string(&ByteString::from("hi")).unwrap();
        assert_eq!(json, "\"6869\"");

        let parsed: ByteString = serde_json::from_str("\"00ff\"").unwrap();
        assert_eq!(parsed.as_bytes(), &[0x00, 0xff]);
    }

    #[test]
    fn test_byte_string_rejects_bad_hex() {
        let parsed: Result<ByteString, _> = serde_json::from_str("\"zz\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_byte_string_keeps_interior_nul() {
        let s = ByteString::from(&b"a\0b"[..]);
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn test_summary_uses_camel_case_fields() {
        let summary = Summary {
            char_count: 3,
            hash: HashValue(0xDEAD_BEEF),
        };
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json, serde_json::json!({"charCount": 3, "hash": 0xDEAD_BEEFu32}));
    }

    #[test]
    fn test_hash_value_display_is_zero_padded_hex() {
        assert_eq!(HashValue(0xAB).to_string(), "000000AB");
    }

    #[test]
    fn test_character_sequence_bytes_view() {
        let seq = CharacterSequence::new(vec![97, -1]);
        assert_eq!(seq.to_bytes(), vec![97u8, 255u8]);
        assert_eq!(seq[1], -1);
    }

    #[test]
    fn test_interface_version_parse() {
        let v: InterfaceVersion = "1.2".parse().unwrap();
        assert_eq!(v, InterfaceVersion::new(1, 2));
        assert_eq!(v.to_string(), "1.2");

        assert!("1".parse::<InterfaceVersion>().is_err());
        assert!("a.b".parse::<InterfaceVersion>().is_err());
    }

    #[test]
    fn test_descriptor_serializes_version_as_string() {
        let d = InterfaceDescriptor::new("stringy.IStringy", InterfaceVersion::new(1, 0));
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json, serde_json::json!({"name": "stringy.IStringy", "version": "1.0"}));
        assert_eq!(d.to_string(), "stringy.IStringy@1.0");
    }
}
