use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU32, Ordering};

/// Process-wide counter for the last three bytes of generated ids.
/// Seeded randomly so restarts don't replay the same sequence.
static COUNTER: LazyLock<AtomicU32> = LazyLock::new(|| AtomicU32::new(rand::random()));

/// Random bytes fixed for the lifetime of the process.
static PROCESS_UNIQUE: LazyLock<[u8; 5]> = LazyLock::new(|| rand::random());

/// A 12-byte document identity
///
/// Layout: 4-byte big-endian seconds since the Unix epoch, 5 random bytes
/// unique to the process, and a 3-byte counter. Rendered as 24 lowercase
/// hex characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

/// Returned when a string is not a 24-character hex identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidObjectId(pub String);

impl fmt::Display for InvalidObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid object id: {}", self.0)
    }
}

impl std::error::Error for InvalidObjectId {}

impl ObjectId {
    /// Generates a fresh identity from the current time.
    pub fn new() -> Self {
        let seconds = chrono::Utc::now().timestamp() as u32;
        let count = COUNTER.fetch_add(1, Ordering::Relaxed);

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(&*PROCESS_UNIQUE);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);

        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = InvalidObjectId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 24 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(InvalidObjectId(s.to_string()));
        }

        let mut bytes = [0u8; 12];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|_| InvalidObjectId(s.to_string()))?;
        }

        Ok(Self(bytes))
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ids_are_unique_and_share_process_bytes() {
        let a = ObjectId::new();
        let b = ObjectId::new();

        assert_ne!(a, b);
        assert_eq!(a.to_hex()[8..18], b.to_hex()[8..18]);
    }

    #[test]
    fn test_hex_is_24_lowercase_chars() {
        let id = ObjectId::new();
        let hex = id.to_string();

        assert_eq!(hex.len(), 24);
        assert!(hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        assert_eq!(hex.parse::<ObjectId>().unwrap(), id);
    }

    #[test]
    fn test_parse_accepts_uppercase_hex() {
        let id: ObjectId = "65A1F0C2B3D4E5F601234567".parse().unwrap();
        assert_eq!(id.to_string(), "65a1f0c2b3d4e5f601234567");
    }

    #[test]
    fn test_parse_rejects_malformed_values() {
        for bad in ["123a", "", "zzzzzzzzzzzzzzzzzzzzzzzz", "65a1f0c2b3d4e5f6012345678"] {
            let err = bad.parse::<ObjectId>().unwrap_err();
            assert_eq!(err.0, bad);
        }
    }

    #[test]
    fn test_parse_rejects_multibyte_input_without_panicking() {
        assert!("ééééééééééééé".parse::<ObjectId>().is_err());
        assert!("é12345678901234567890ab".parse::<ObjectId>().is_err());
    }

    #[test]
    fn test_serializes_as_hex_string() {
        let id: ObjectId = "65a1f0c2b3d4e5f601234567".parse().unwrap();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::json!("65a1f0c2b3d4e5f601234567"));

        let back: ObjectId = serde_json::from_value(json).unwrap();
        assert_eq!(back, id);
    }
}
