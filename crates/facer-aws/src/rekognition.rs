//! Face index backed by Amazon Rekognition collections.

use crate::request_error;
use async_trait::async_trait;
use aws_sdk_rekognition::primitives::Blob;
use aws_sdk_rekognition::types::{self as rk, Image};
use aws_sdk_rekognition::Client;
use facer_core::{
    CollectionId, FaceId, FaceIndex, FaceMatch, FaceRecord, MatchThreshold, ServiceError,
};

pub struct RekognitionIndex {
    client: Client,
}

impl RekognitionIndex {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn image(bytes: &[u8]) -> Image {
    Image::builder().bytes(Blob::new(bytes.to_vec())).build()
}

fn collection_not_found(collection: &CollectionId) -> ServiceError {
    ServiceError::NotFound {
        kind: "collection",
        name: collection.to_string(),
    }
}

/// Indexed faces that carry an id, in service order.
pub(crate) fn face_records(records: &[rk::FaceRecord]) -> Vec<FaceRecord> {
    records
        .iter()
        .filter_map(|record| {
            let face = record.face()?;
            Some(FaceRecord {
                face_id: FaceId(face.face_id()?.to_string()),
                confidence: face.confidence(),
            })
        })
        .collect()
}

/// Search hits that carry a face id, in service order (best first).
pub(crate) fn face_matches(matches: &[rk::FaceMatch]) -> Vec<FaceMatch> {
    matches
        .iter()
        .filter_map(|hit| {
            Some(FaceMatch {
                face_id: FaceId(hit.face()?.face_id()?.to_string()),
                similarity: hit.similarity(),
            })
        })
        .collect()
}

#[async_trait]
impl FaceIndex for RekognitionIndex {
    async fn create_collection(&self, collection: &CollectionId) -> Result<(), ServiceError> {
        let out = self
            .client
            .create_collection()
            .collection_id(collection.as_str())
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_already_exists_exception())
                {
                    ServiceError::AlreadyExists {
                        kind: "collection",
                        name: collection.to_string(),
                    }
                } else {
                    request_error("CreateCollection", err)
                }
            })?;

        tracing::info!(
            %collection,
            arn = out.collection_arn().unwrap_or_default(),
            status = ?out.status_code(),
            "rekognition collection created"
        );

        match out.status_code() {
            None | Some(200) => Ok(()),
            Some(code) => Err(ServiceError::Request {
                operation: "CreateCollection",
                message: format!("unexpected status code {code}"),
            }),
        }
    }

    async fn index_faces(
        &self,
        collection: &CollectionId,
        image_bytes: &[u8],
    ) -> Result<Vec<FaceRecord>, ServiceError> {
        let out = self
            .client
            .index_faces()
            .collection_id(collection.as_str())
            .image(image(image_bytes))
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception())
                {
                    collection_not_found(collection)
                } else {
                    request_error("IndexFaces", err)
                }
            })?;

        let records = face_records(out.face_records());
        tracing::debug!(
            %collection,
            indexed = records.len(),
            unindexed = out.unindexed_faces().len(),
            "index_faces"
        );
        Ok(records)
    }

    async fn search_faces(
        &self,
        collection: &CollectionId,
        image_bytes: &[u8],
        max_results: u32,
        threshold: MatchThreshold,
    ) -> Result<Vec<FaceMatch>, ServiceError> {
        let result = self
            .client
            .search_faces_by_image()
            .collection_id(collection.as_str())
            .image(image(image_bytes))
            .max_faces(max_results.min(i32::MAX as u32) as i32)
            .face_match_threshold(threshold.value())
            .send()
            .await;

        let out = match result {
            Ok(out) => out,
            Err(err) => {
                let service = err.as_service_error();
                if service.is_some_and(|e| e.is_resource_not_found_exception()) {
                    return Err(collection_not_found(collection));
                }
                // Rekognition rejects a query image without any face as an
                // invalid parameter; that is a miss, not a failure.
                if service.is_some_and(|e| e.is_invalid_parameter_exception()) {
                    tracing::info!(%collection, "no face in query image");
                    return Ok(Vec::new());
                }
                return Err(request_error("SearchFacesByImage", err));
            }
        };

        let matches = face_matches(out.face_matches());
        tracing::debug!(%collection, matches = matches.len(), "search_faces_by_image");
        Ok(matches)
    }
}
