//! Seams to the external collaborators: face index, identity store, camera.

use crate::types::{
    CapturedImage, CollectionId, FaceId, FaceMatch, FaceRecord, IdentityEntry, MatchThreshold,
};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{kind} {name} already exists")]
    AlreadyExists { kind: &'static str, name: String },
    #[error("{kind} {name} not found")]
    NotFound { kind: &'static str, name: String },
    #[error("table {table} did not become active within {waited_secs}s")]
    NotReady { table: String, waited_secs: u64 },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("{operation} failed: {message}")]
    Request {
        operation: &'static str,
        message: String,
    },
}

/// Failure of the capture step. Opaque to the workflows, which only report it.
#[derive(Error, Debug)]
#[error("capture failed: {0}")]
pub struct CaptureError(#[source] pub Box<dyn std::error::Error + Send + Sync>);

/// Face-recognition service scoped by named collections.
#[async_trait]
pub trait FaceIndex: Send + Sync {
    /// Create a collection. Existing collections are an error, not a no-op.
    async fn create_collection(&self, collection: &CollectionId) -> Result<(), ServiceError>;

    /// Index every face detected in `image`. Empty when no face is found.
    async fn index_faces(
        &self,
        collection: &CollectionId,
        image: &[u8],
    ) -> Result<Vec<FaceRecord>, ServiceError>;

    /// Up to `max_results` collection faces with similarity >= `threshold`.
    async fn search_faces(
        &self,
        collection: &CollectionId,
        image: &[u8],
        max_results: u32,
        threshold: MatchThreshold,
    ) -> Result<Vec<FaceMatch>, ServiceError>;
}

/// Key-value table of face id → display name, one table per collection.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Create the collection's table; fails if it already exists.
    async fn create_table(&self, collection: &CollectionId) -> Result<(), ServiceError>;

    /// Unconditional upsert keyed by `(entry.collection, entry.face_id)`.
    async fn put(&self, entry: &IdentityEntry) -> Result<(), ServiceError>;

    /// Point lookup. `Ok(None)` means no association, not a failure.
    async fn get(
        &self,
        collection: &CollectionId,
        face_id: &FaceId,
    ) -> Result<Option<IdentityEntry>, ServiceError>;
}

/// Produces a fresh still image; each call replaces the previous capture.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn capture(&self) -> Result<CapturedImage, CaptureError>;
}
