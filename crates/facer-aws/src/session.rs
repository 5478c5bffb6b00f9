use crate::dynamodb::{DynamoIdentityStore, TableOptions};
use crate::rekognition::RekognitionIndex;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_dynamodb::config::Region;

/// Shared AWS configuration resolved from a named credential profile.
#[derive(Clone)]
pub struct AwsSession {
    config: SdkConfig,
}

impl AwsSession {
    /// Resolve credentials and region from `profile`; `region` overrides the
    /// profile's region when given.
    pub async fn load(profile: &str, region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).profile_name(profile);
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        let config = loader.load().await;

        tracing::debug!(
            profile,
            region = ?config.region(),
            "aws session loaded"
        );
        Self { config }
    }

    pub fn rekognition(&self) -> RekognitionIndex {
        RekognitionIndex::new(aws_sdk_rekognition::Client::new(&self.config))
    }

    pub fn dynamodb(&self, options: TableOptions) -> DynamoIdentityStore {
        DynamoIdentityStore::new(aws_sdk_dynamodb::Client::new(&self.config), options)
    }
}
