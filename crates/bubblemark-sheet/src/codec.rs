//! Page identifiers
//!
//! A page identifier is 12 digits: an 8-digit lecture hash, a 2-digit page
//! number and a 2-digit page total. The hash is lossy, so the codec keeps
//! a [`LectureRegistry`] that maps hashes back to lecture ids. Unknown
//! hashes decode to a synthetic `LEC-<hash>` id instead of failing.

use crate::{SheetError, SheetResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Length of an encoded page identifier
pub const PAYLOAD_DIGITS: usize = 12;

const HASH_MODULUS: u64 = 100_000_000;
const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a
pub fn fnv1a_64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |h, &b| {
        (h ^ b as u64).wrapping_mul(FNV_PRIME)
    })
}

/// Eight-digit hash of a lecture id
pub fn lecture_hash(lecture_id: &str) -> u64 {
    fnv1a_64(lecture_id.as_bytes()) % HASH_MODULUS
}

/// Lecture a sheet belongs to
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LectureIdentifier {
    pub lecture_id: String,
    pub course_id: Option<String>,
    pub date: Option<String>,
}

impl LectureIdentifier {
    pub fn new(lecture_id: impl Into<String>) -> Self {
        Self {
            lecture_id: lecture_id.into(),
            ..Default::default()
        }
    }

    pub fn with_course(mut self, course_id: impl Into<String>) -> Self {
        self.course_id = Some(course_id.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }
}

/// Hash to lecture id table
///
/// Shared between the generator, which registers ids, and the pipeline,
/// which resolves decoded hashes. On a hash collision the latest id wins
/// and a warning is logged.
#[derive(Debug, Default)]
pub struct LectureRegistry {
    entries: RwLock<BTreeMap<u64, String>>,
}

impl LectureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `lecture_id` under its hash and return the hash.
    pub fn register(&self, lecture_id: &str) -> u64 {
        let hash = lecture_hash(lecture_id);
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = entries.insert(hash, lecture_id.to_string()) {
            if previous != lecture_id {
                tracing::warn!(
                    hash,
                    previous = %previous,
                    lecture_id,
                    "lecture hash collision, keeping latest mapping"
                );
            }
        }
        hash
    }

    /// Lecture id registered for `hash`
    pub fn lookup(&self, hash: u64) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&hash)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serialize the table as a JSON object keyed by zero-padded hash
    pub fn to_json(&self) -> SheetResult<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let table: BTreeMap<String, &String> = entries
            .iter()
            .map(|(h, id)| (format!("{:08}", h), id))
            .collect();
        serde_json::to_string_pretty(&table).map_err(|e| SheetError::Store(e.to_string()))
    }

    /// Load a table written by [`LectureRegistry::to_json`]
    pub fn from_json(json: &str) -> SheetResult<Self> {
        let table: BTreeMap<String, String> =
            serde_json::from_str(json).map_err(|e| SheetError::Store(e.to_string()))?;
        let mut entries = BTreeMap::new();
        for (key, id) in table {
            let hash = key
                .parse::<u64>()
                .map_err(|_| SheetError::Format(format!("invalid hash key {:?}", key)))?;
            entries.insert(hash, id);
        }
        Ok(Self {
            entries: RwLock::new(entries),
        })
    }
}

/// A decoded page identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedIdentifier {
    /// Registered lecture id, or `LEC-<hash>` when the hash is unknown
    pub lecture_id: String,
    pub page: u32,
    pub total_pages: u32,
    pub hash: u64,
    /// Whether `lecture_id` came from the registry
    pub mapped: bool,
}

/// Encoder and decoder of page identifiers
#[derive(Debug, Clone, Default)]
pub struct IdentifierCodec {
    registry: Arc<LectureRegistry>,
}

impl IdentifierCodec {
    pub fn new(registry: Arc<LectureRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<LectureRegistry> {
        &self.registry
    }

    /// Encode a page identifier and register the lecture id.
    ///
    /// # Errors
    ///
    /// [`SheetError::Format`] if `page` or `total` do not fit two digits or
    /// `page` is outside `1..=total`.
    pub fn encode(&self, lecture_id: &str, page: u32, total: u32) -> SheetResult<String> {
        if total == 0 || total > 99 || page == 0 || page > total {
            return Err(SheetError::Format(format!(
                "page {} of {} cannot be encoded",
                page, total
            )));
        }
        let hash = self.registry.register(lecture_id);
        Ok(format!("{:08}{:02}{:02}", hash, page, total))
    }

    /// Decode a 12-digit page identifier.
    ///
    /// # Errors
    ///
    /// [`SheetError::Format`] unless `code` is exactly 12 ASCII digits.
    pub fn decode(&self, code: &str) -> SheetResult<DecodedIdentifier> {
        if code.len() != PAYLOAD_DIGITS || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SheetError::Format(format!(
                "page identifier must be {} digits, got {:?}",
                PAYLOAD_DIGITS, code
            )));
        }
        let field = |range: std::ops::Range<usize>| -> SheetResult<u64> {
            code[range]
                .parse::<u64>()
                .map_err(|e| SheetError::Format(e.to_string()))
        };
        let hash = field(0..8)?;
        let page = field(8..10)? as u32;
        let total_pages = field(10..12)? as u32;
        let (lecture_id, mapped) = match self.registry.lookup(hash) {
            Some(id) => (id, true),
            None => (format!("LEC-{:08}", hash), false),
        };
        Ok(DecodedIdentifier {
            lecture_id,
            page,
            total_pages,
            hash,
            mapped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv_reference_values() {
        assert_eq!(fnv1a_64(b""), 0xcbf29ce484222325);
        assert_eq!(fnv1a_64(b"a"), 0xaf63dc4c8601ec8c);
        assert!(lecture_hash("LEC-2024-001") < HASH_MODULUS);
    }

    #[test]
    fn test_round_trip() {
        let codec = IdentifierCodec::default();
        let code = codec.encode("LEC-2024-001", 2, 3).unwrap();
        assert_eq!(code.len(), 12);
        assert!(code.ends_with("0203"));
        let decoded = codec.decode(&code).unwrap();
        assert_eq!(decoded.lecture_id, "LEC-2024-001");
        assert_eq!((decoded.page, decoded.total_pages), (2, 3));
        assert!(decoded.mapped);
    }

    #[test]
    fn test_unmapped_hash_falls_back() {
        let codec = IdentifierCodec::default();
        let decoded = codec.decode("123456780101").unwrap();
        assert_eq!(decoded.lecture_id, "LEC-12345678");
        assert_eq!(decoded.hash, 12_345_678);
        assert!(!decoded.mapped);
    }

    #[test]
    fn test_format_errors() {
        let codec = IdentifierCodec::default();
        for bad in ["", "12345678010", "1234567801011", "12345678010a", "１２３４５６７８０１０１"] {
            assert!(matches!(codec.decode(bad), Err(SheetError::Format(_))), "{:?}", bad);
        }
        assert!(codec.encode("L", 0, 1).is_err());
        assert!(codec.encode("L", 3, 2).is_err());
        assert!(codec.encode("L", 1, 100).is_err());
    }

    #[test]
    fn test_registry_json_and_collision() {
        let registry = LectureRegistry::new();
        let h = registry.register("A");
        registry.register("B");
        let restored = LectureRegistry::from_json(&registry.to_json().unwrap()).unwrap();
        assert_eq!(restored.lookup(h).as_deref(), Some("A"));
        assert_eq!(restored.len(), 2);

        // force a collision by inserting under an existing key
        restored
            .entries
            .write()
            .unwrap()
            .insert(lecture_hash("C"), "stale".to_string());
        restored.register("C");
        assert_eq!(restored.lookup(lecture_hash("C")).as_deref(), Some("C"));
    }
}
