use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Longest collection name accepted by the recognition service.
const COLLECTION_MAX_LEN: usize = 255;
/// Shortest table name accepted by the identity store.
const COLLECTION_MIN_LEN: usize = 3;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidCollectionId {
    #[error("collection name must be 3–255 characters, got {0}")]
    Length(usize),
    #[error("collection name contains {0:?}; only letters, digits, '_', '-' and '.' are allowed")]
    Character(char),
}

/// Name of a face collection. Doubles as the identity table name, so it
/// must satisfy the naming rules of both services.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionId(String);

impl CollectionId {
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidCollectionId> {
        let name = name.into();
        let len = name.chars().count();
        if !(COLLECTION_MIN_LEN..=COLLECTION_MAX_LEN).contains(&len) {
            return Err(InvalidCollectionId::Length(len));
        }
        if let Some(bad) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
        {
            return Err(InvalidCollectionId::Character(bad));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CollectionId {
    type Error = InvalidCollectionId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CollectionId> for String {
    fn from(id: CollectionId) -> Self {
        id.0
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque face identifier issued by the recognition service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FaceId(pub String);

impl FaceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FaceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for FaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A face the service indexed into a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceRecord {
    pub face_id: FaceId,
    /// Detection confidence (0–100), when the service reports it.
    pub confidence: Option<f32>,
}

/// A collection face matching a searched image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceMatch {
    pub face_id: FaceId,
    /// Similarity (0–100) between the query image and the indexed face.
    pub similarity: Option<f32>,
}

/// Association between an indexed face and a display name.
///
/// The key is the (collection, face id) pair: an entry cannot exist
/// without the collection whose service issued its face id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityEntry {
    pub collection: CollectionId,
    pub face_id: FaceId,
    pub name: String,
}

impl IdentityEntry {
    pub fn new(collection: CollectionId, face_id: FaceId, name: impl Into<String>) -> Self {
        Self {
            collection,
            face_id,
            name: name.into(),
        }
    }
}

/// The most recent camera capture: where it was written and its encoded bytes.
///
/// Passed by value from the capture step to its consumer instead of being
/// re-read from a well-known path.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

/// Minimum similarity (0–100) for a search hit to count as a match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct MatchThreshold(f32);

impl MatchThreshold {
    pub const DEFAULT: MatchThreshold = MatchThreshold(80.0);

    pub fn new(value: f32) -> Result<Self, String> {
        if (0.0..=100.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(format!("match threshold must be within 0–100, got {value}"))
        }
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

impl Default for MatchThreshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<f32> for MatchThreshold {
    type Error = String;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MatchThreshold> for f32 {
    fn from(t: MatchThreshold) -> Self {
        t.0
    }
}

/// Display name derived from an image file name: the text before the first
/// `.`, or the whole name when that would be empty (dotfiles).
pub fn candidate_name(file_name: &str) -> &str {
    match file_name.split('.').next() {
        Some(stem) if !stem.is_empty() => stem,
        _ => file_name,
    }
}
