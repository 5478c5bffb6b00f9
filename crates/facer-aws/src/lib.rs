//! facer-aws — Amazon Rekognition and DynamoDB backends for facer-core.
//!
//! Both clients are built from one [`AwsSession`], so the credential
//! profile selected on the command line applies to every call.

pub mod dynamodb;
pub mod rekognition;
pub mod session;

pub use dynamodb::{DynamoIdentityStore, TableOptions};
pub use rekognition::RekognitionIndex;
pub use session::AwsSession;

use facer_core::ServiceError;

/// Flatten an SDK error (including its source chain) into a `ServiceError`.
pub(crate) fn request_error<E>(operation: &'static str, err: E) -> ServiceError
where
    E: std::error::Error + 'static,
{
    ServiceError::Request {
        operation,
        message: aws_sdk_rekognition::error::DisplayErrorContext(&err).to_string(),
    }
}
