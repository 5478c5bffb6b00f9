//! facer-core — Enrollment and recognition workflows.
//!
//! The face-recognition service, the identity store and the camera are
//! reached only through the traits in [`service`], so every workflow in
//! [`workflow`] runs unchanged against cloud backends or in-memory fakes.

pub mod service;
pub mod types;
pub mod workflow;

pub use service::{CaptureError, FaceIndex, IdentityStore, ImageSource, ServiceError};
pub use types::{
    CapturedImage, CollectionId, FaceId, FaceMatch, FaceRecord, IdentityEntry,
    InvalidCollectionId, MatchThreshold,
};
pub use workflow::{
    BatchPolicy, BatchReport, EnrollOutcome, Orchestrator, RecognizeOutcome, SetupEvent,
    WorkflowError,
};
