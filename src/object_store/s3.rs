use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{ChecksumAlgorithm, CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use tokio::time::sleep;
use tracing::warn;

use super::{validate_bucket_name, validate_key, ObjectStore, ObjectStoreError, DELETE_WAIT_TIMEOUT_SECS};

/// Part size for multipart uploads: S3 requires every part but the
/// last to be at least 5 MiB.
const MULTIPART_PART_SIZE: usize = 8 * 1024 * 1024;

/// S3-backed object store, grounded on `aws-sdk-s3` the way
/// `threefoldtech-s3-cas` drives the same SDK for its backend.
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&config))
    }

    /// Uploads `bytes` to an already-created multipart upload in
    /// `MULTIPART_PART_SIZE` chunks (at least one part, even for empty
    /// or sub-chunk content), returning the completed part list in
    /// order.
    async fn upload_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        bytes: Vec<u8>,
    ) -> Result<Vec<CompletedPart>, ObjectStoreError> {
        let chunks: Vec<Vec<u8>> = if bytes.is_empty() {
            vec![Vec::new()]
        } else {
            bytes
                .chunks(MULTIPART_PART_SIZE)
                .map(|c| c.to_vec())
                .collect()
        };

        let mut parts = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.into_iter().enumerate() {
            let part_number = (index + 1) as i32;
            let output = self
                .client
                .upload_part()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .checksum_algorithm(ChecksumAlgorithm::Sha256)
                .body(ByteStream::from(chunk))
                .send()
                .await
                .map_err(|e| ObjectStoreError::Other(e.to_string()))?;

            let mut completed = CompletedPart::builder().part_number(part_number);
            if let Some(etag) = output.e_tag() {
                completed = completed.e_tag(etag);
            }
            if let Some(checksum) = output.checksum_sha256() {
                completed = completed.checksum_sha256(checksum);
            }
            parts.push(completed.build());
        }

        Ok(parts)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        validate_bucket_name(bucket)?;
        validate_key(key)?;

        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| match &err {
                SdkError::ServiceError(svc) if svc.err().is_no_such_key() => {
                    ObjectStoreError::NotFound
                }
                other => ObjectStoreError::Other(other.to_string()),
            })?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| ObjectStoreError::Other(e.to_string()))?
            .into_bytes();

        Ok(bytes.to_vec())
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        allow_overwrite: bool,
    ) -> Result<(), ObjectStoreError> {
        validate_bucket_name(bucket)?;
        validate_key(key)?;

        let created = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .checksum_algorithm(ChecksumAlgorithm::Sha256)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Other(e.to_string()))?;

        let upload_id = created
            .upload_id()
            .ok_or_else(|| ObjectStoreError::Other("multipart upload has no upload id".to_string()))?
            .to_string();

        match self.upload_parts(bucket, key, &upload_id, bytes).await {
            Ok(parts) => {
                let mut request = self
                    .client
                    .complete_multipart_upload()
                    .bucket(bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .multipart_upload(
                        CompletedMultipartUpload::builder()
                            .set_parts(Some(parts))
                            .build(),
                    );

                if !allow_overwrite {
                    request = request.if_none_match("*");
                }

                request.send().await.map_err(|err| match &err {
                    SdkError::ServiceError(svc) if svc.raw().status().as_u16() == 412 => {
                        ObjectStoreError::Exists
                    }
                    other => ObjectStoreError::Other(other.to_string()),
                })?;

                Ok(())
            }
            Err(err) => {
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    warn!(bucket, key, error = %abort_err, "failed to abort incomplete multipart upload");
                }
                Err(err)
            }
        }
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError> {
        validate_bucket_name(bucket)?;
        validate_key(key)?;

        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Other(e.to_string()))?;

        let deadline = tokio::time::Instant::now() + Duration::from_secs(DELETE_WAIT_TIMEOUT_SECS);
        loop {
            match self.get(bucket, key).await {
                Err(ObjectStoreError::NotFound) => return Ok(()),
                Err(other) => return Err(other),
                Ok(_) => {
                    if tokio::time::Instant::now() >= deadline {
                        warn!(bucket, key, "object still present after delete wait timeout");
                        return Ok(());
                    }
                    sleep(Duration::from_millis(500)).await;
                }
            }
        }
    }
}
