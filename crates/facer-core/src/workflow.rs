//! Enrollment and recognition workflows.
//!
//! Each workflow is one linear sequence of service calls. Nothing is
//! retried and nothing persists between runs except what the services
//! themselves store.

use crate::service::{CaptureError, FaceIndex, IdentityStore, ImageSource, ServiceError};
use crate::types::{candidate_name, CollectionId, FaceId, IdentityEntry, MatchThreshold};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Recognition asks for the single best match.
pub const SEARCH_MAX_RESULTS: u32 = 1;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("{}: {source}", file.display())]
    BatchItem {
        file: PathBuf,
        #[source]
        source: Box<WorkflowError>,
    },
}

impl WorkflowError {
    fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| WorkflowError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// What to do when one file of a directory batch fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchPolicy {
    /// Abort the remaining batch on the first failing file.
    #[default]
    FailFast,
    /// Record the failure and continue with the next file.
    KeepGoing,
}

/// Terminal result of enrolling one face.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrollOutcome {
    Enrolled(IdentityEntry),
    /// The service found no face in the image; nothing was stored.
    NoFaceDetected { name: String },
}

impl EnrollOutcome {
    pub fn name(&self) -> &str {
        match self {
            EnrollOutcome::Enrolled(entry) => &entry.name,
            EnrollOutcome::NoFaceDetected { name } => name,
        }
    }
}

/// Terminal result of a recognition attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognizeOutcome {
    Recognized {
        entry: IdentityEntry,
        similarity: Option<f32>,
    },
    /// The collection matched a face that has no identity entry.
    UnknownIdentity {
        face_id: FaceId,
        similarity: Option<f32>,
    },
    NotRecognized,
}

/// Progress of [`Orchestrator::enroll_directory`], delivered as it happens.
#[derive(Debug)]
pub enum SetupEvent<'a> {
    TableCreated(&'a CollectionId),
    TableNotCreated {
        collection: &'a CollectionId,
        error: &'a ServiceError,
    },
    /// The table was created but did not become writable in time.
    TableNotReady {
        collection: &'a CollectionId,
        error: &'a ServiceError,
    },
    CollectionCreated(&'a CollectionId),
    Working { file: &'a str },
    Enrolled(&'a EnrollOutcome),
    FileFailed {
        file: &'a str,
        error: &'a WorkflowError,
    },
}

/// Per-file results of a directory batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub enrolled: Vec<IdentityEntry>,
    pub no_face: Vec<PathBuf>,
    /// Directories and other non-regular entries that were not enrolled.
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, WorkflowError)>,
}

/// Sequences the face index and identity store through the three workflows.
pub struct Orchestrator<I, S> {
    index: I,
    store: S,
    threshold: MatchThreshold,
    policy: BatchPolicy,
}

impl<I: FaceIndex, S: IdentityStore> Orchestrator<I, S> {
    pub fn new(index: I, store: S) -> Self {
        Self {
            index,
            store,
            threshold: MatchThreshold::default(),
            policy: BatchPolicy::default(),
        }
    }

    pub fn with_match_threshold(mut self, threshold: MatchThreshold) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_batch_policy(mut self, policy: BatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[cfg(test)]
    fn index(&self) -> &I {
        &self.index
    }

    #[cfg(test)]
    fn store(&self) -> &S {
        &self.store
    }

    /// Create the identity table and collection, then enroll every regular
    /// file directly under `dir`, named after its file stem.
    ///
    /// Table creation failures are reported through `on_event` and do not
    /// stop the workflow; collection creation failures do.
    pub async fn enroll_directory(
        &self,
        dir: &Path,
        collection: &CollectionId,
        on_event: &mut dyn FnMut(SetupEvent<'_>),
    ) -> Result<BatchReport, WorkflowError> {
        match self.store.create_table(collection).await {
            Ok(()) => {
                tracing::info!(%collection, "identity table created");
                on_event(SetupEvent::TableCreated(collection));
            }
            Err(error @ ServiceError::NotReady { .. }) => {
                tracing::warn!(%collection, %error, "identity table not active yet; continuing");
                on_event(SetupEvent::TableNotReady {
                    collection,
                    error: &error,
                });
            }
            Err(error) => {
                tracing::warn!(%collection, %error, "identity table not created; continuing");
                on_event(SetupEvent::TableNotCreated {
                    collection,
                    error: &error,
                });
            }
        }

        self.index.create_collection(collection).await?;
        tracing::info!(%collection, "collection created");
        on_event(SetupEvent::CollectionCreated(collection));

        let (files, skipped) = scan_directory(dir).await?;
        let mut report = BatchReport {
            skipped,
            ..BatchReport::default()
        };
        self.enroll_paths(collection, files, &mut report, on_event).await?;

        tracing::info!(
            %collection,
            enrolled = report.enrolled.len(),
            no_face = report.no_face.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "directory enrollment finished"
        );
        Ok(report)
    }

    /// Enroll `files` in order under the batch policy, filling `report`.
    async fn enroll_paths(
        &self,
        collection: &CollectionId,
        files: Vec<PathBuf>,
        report: &mut BatchReport,
        on_event: &mut dyn FnMut(SetupEvent<'_>),
    ) -> Result<(), WorkflowError> {
        for path in files {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            on_event(SetupEvent::Working { file: &file_name });

            let name = candidate_name(&file_name);
            let result = self.enroll_file(collection, &path, name).await;
            let read_hit_dir =
                matches!(result, Err(WorkflowError::Io { .. })) && is_dir(&path).await;
            match result {
                Ok(outcome) => {
                    on_event(SetupEvent::Enrolled(&outcome));
                    match outcome {
                        EnrollOutcome::Enrolled(entry) => report.enrolled.push(entry),
                        EnrollOutcome::NoFaceDetected { .. } => report.no_face.push(path),
                    }
                }
                // Became a directory between scan and read.
                Err(WorkflowError::Io { .. }) if read_hit_dir => {
                    tracing::debug!(path = %path.display(), "directory skipped");
                    report.skipped.push(path);
                }
                Err(error) => match self.policy {
                    BatchPolicy::FailFast => {
                        return Err(WorkflowError::BatchItem {
                            file: path,
                            source: Box::new(error),
                        });
                    }
                    BatchPolicy::KeepGoing => {
                        tracing::warn!(
                            path = %path.display(),
                            %error,
                            "enrollment failed; continuing"
                        );
                        on_event(SetupEvent::FileFailed {
                            file: &file_name,
                            error: &error,
                        });
                        report.failed.push((path, error));
                    }
                },
            }
        }
        Ok(())
    }

    /// Read an image file and enroll it under `name`.
    pub async fn enroll_file(
        &self,
        collection: &CollectionId,
        path: &Path,
        name: &str,
    ) -> Result<EnrollOutcome, WorkflowError> {
        let image = tokio::fs::read(path).await.map_err(WorkflowError::io(path))?;
        self.enroll_one(collection, &image, name).await
    }

    /// Index `image` and store the first detected face under `name`.
    pub async fn enroll_one(
        &self,
        collection: &CollectionId,
        image: &[u8],
        name: &str,
    ) -> Result<EnrollOutcome, WorkflowError> {
        let records = self.index.index_faces(collection, image).await?;
        let detected = records.len();

        let Some(record) = records.into_iter().next() else {
            tracing::info!(%collection, name, "no face detected");
            return Ok(EnrollOutcome::NoFaceDetected {
                name: name.to_string(),
            });
        };
        if detected > 1 {
            tracing::debug!(%collection, detected, "multiple faces indexed; keeping the first");
        }

        let entry = IdentityEntry::new(collection.clone(), record.face_id, name);
        self.store.put(&entry).await?;
        tracing::info!(%collection, face_id = %entry.face_id, name, "identity stored");
        Ok(EnrollOutcome::Enrolled(entry))
    }

    /// Capture a still and enroll it under `full_name`.
    pub async fn capture_and_enroll<C: ImageSource + ?Sized>(
        &self,
        camera: &C,
        collection: &CollectionId,
        full_name: &str,
    ) -> Result<EnrollOutcome, WorkflowError> {
        let image = camera.capture().await?;
        tracing::debug!(path = %image.path.display(), bytes = image.bytes.len(), "captured");
        self.enroll_one(collection, &image.bytes, full_name).await
    }

    /// Capture a still, search the collection for it and resolve the name.
    pub async fn capture_and_recognize<C: ImageSource + ?Sized>(
        &self,
        camera: &C,
        collection: &CollectionId,
    ) -> Result<RecognizeOutcome, WorkflowError> {
        let image = camera.capture().await?;
        tracing::debug!(path = %image.path.display(), bytes = image.bytes.len(), "captured");

        let matches = self
            .index
            .search_faces(collection, &image.bytes, SEARCH_MAX_RESULTS, self.threshold)
            .await?;

        // At most one match given SEARCH_MAX_RESULTS.
        let Some(best) = matches.into_iter().next() else {
            tracing::info!(%collection, threshold = self.threshold.value(), "no match");
            return Ok(RecognizeOutcome::NotRecognized);
        };

        let outcome = match self.store.get(collection, &best.face_id).await? {
            Some(entry) => RecognizeOutcome::Recognized {
                entry,
                similarity: best.similarity,
            },
            None => {
                tracing::warn!(
                    %collection,
                    face_id = %best.face_id,
                    "matched face has no identity entry"
                );
                RecognizeOutcome::UnknownIdentity {
                    face_id: best.face_id,
                    similarity: best.similarity,
                }
            }
        };
        Ok(outcome)
    }
}

/// Split the entries directly under `dir` into regular files and the rest,
/// both sorted by path.
async fn scan_directory(dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>), WorkflowError> {
    let mut files = Vec::new();
    let mut skipped = Vec::new();

    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(WorkflowError::io(dir))?;
    while let Some(entry) = entries.next_entry().await.map_err(WorkflowError::io(dir))? {
        let path = entry.path();
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => files.push(path),
            _ => {
                tracing::debug!(path = %path.display(), "not a regular file; skipped");
                skipped.push(path);
            }
        }
    }

    files.sort();
    skipped.sort();
    Ok((files, skipped))
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
}
