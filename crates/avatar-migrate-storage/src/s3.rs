use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use bytes::Bytes;

/// Largest object a single CopyObject call accepts.
const SINGLE_COPY_LIMIT: u64 = 5 * 1024 * 1024 * 1024; // 5GB
/// Byte range copied per UploadPartCopy call for objects above the limit.
const COPY_PART_SIZE: u64 = 512 * 1024 * 1024; // 512MB

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    /// * `credentials` - Static `(access_key_id, secret_access_key)`; when `None` the default
    ///   AWS credential chain is used
    pub async fn new(
        region: String,
        endpoint_url: Option<String>,
        credentials: Option<(String, String)>,
    ) -> StorageResult<Self> {
        // Failures surface to the operator immediately; the run is restarted by hand.
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .retry_config(RetryConfig::disabled());

        if let Some((access_key_id, secret_access_key)) = credentials {
            loader = loader.credentials_provider(Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "avatar-migrate-env",
            ));
        }

        let sdk_config = loader.load().await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(ref endpoint) = endpoint_url {
            // Use path-style addressing for S3-compatible providers (required for MinIO, etc.)
            s3_config_builder = s3_config_builder
                .endpoint_url(endpoint)
                .force_path_style(true);
        }
        let client = Client::from_conf(s3_config_builder.build());

        tracing::info!(
            region = %region,
            endpoint = endpoint_url.as_deref().unwrap_or("aws"),
            "S3 client configured"
        );

        Ok(S3Storage { client })
    }

    /// `CopySource` header value: `bucket/key` with the key URL-encoded.
    fn copy_source(bucket: &str, key: &str) -> String {
        format!("{}/{}", bucket, urlencoding::encode(key))
    }

    async fn content_length(&self, bucket: &str, key: &str) -> StorageResult<u64> {
        let head = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match &e {
                SdkError::ServiceError(service_err)
                    if matches!(service_err.err(), HeadObjectError::NotFound(_)) =>
                {
                    StorageError::NotFound(format!("{}/{}", bucket, key))
                }
                _ => StorageError::BackendError(DisplayErrorContext(&e).to_string()),
            })?;

        Ok(head.content_length().unwrap_or(0).max(0) as u64)
    }

    /// Server-side copy in byte ranges for objects CopyObject refuses.
    async fn multipart_copy(
        &self,
        from_bucket: &str,
        from_key: &str,
        to_bucket: &str,
        to_key: &str,
        size: u64,
    ) -> StorageResult<()> {
        let create_result = self
            .client
            .create_multipart_upload()
            .bucket(to_bucket)
            .key(to_key)
            .send()
            .await
            .map_err(|e| StorageError::CopyFailed(DisplayErrorContext(&e).to_string()))?;

        let upload_id = create_result
            .upload_id()
            .ok_or_else(|| StorageError::CopyFailed("No upload ID returned from S3".to_string()))?
            .to_string();

        match self
            .copy_parts(from_bucket, from_key, to_bucket, to_key, size, &upload_id)
            .await
        {
            Ok(parts) => {
                self.client
                    .complete_multipart_upload()
                    .bucket(to_bucket)
                    .key(to_key)
                    .upload_id(&upload_id)
                    .multipart_upload(
                        CompletedMultipartUpload::builder()
                            .set_parts(Some(parts))
                            .build(),
                    )
                    .send()
                    .await
                    .map_err(|e| StorageError::CopyFailed(DisplayErrorContext(&e).to_string()))?;
                Ok(())
            }
            Err(e) => {
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(to_bucket)
                    .key(to_key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    tracing::warn!(
                        error = %DisplayErrorContext(&abort_err),
                        bucket = %to_bucket,
                        key = %to_key,
                        "Failed to abort multipart copy"
                    );
                }
                Err(e)
            }
        }
    }

    async fn copy_parts(
        &self,
        from_bucket: &str,
        from_key: &str,
        to_bucket: &str,
        to_key: &str,
        size: u64,
        upload_id: &str,
    ) -> StorageResult<Vec<CompletedPart>> {
        let copy_source = Self::copy_source(from_bucket, from_key);
        let mut parts = Vec::new();
        let mut offset = 0u64;
        let mut part_number = 1i32;

        while offset < size {
            let end = (offset + COPY_PART_SIZE).min(size) - 1;

            let result = self
                .client
                .upload_part_copy()
                .bucket(to_bucket)
                .key(to_key)
                .upload_id(upload_id)
                .part_number(part_number)
                .copy_source(&copy_source)
                .copy_source_range(format!("bytes={}-{}", offset, end))
                .send()
                .await
                .map_err(|e| {
                    tracing::error!(
                        error = %DisplayErrorContext(&e),
                        bucket = %to_bucket,
                        key = %to_key,
                        part_number,
                        "Failed to copy part"
                    );
                    StorageError::CopyFailed(DisplayErrorContext(&e).to_string())
                })?;

            let etag = result
                .copy_part_result()
                .and_then(|r| r.e_tag())
                .ok_or_else(|| {
                    StorageError::CopyFailed(format!("No ETag returned for part {}", part_number))
                })?
                .to_string();

            parts.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .e_tag(etag)
                    .build(),
            );

            offset = end + 1;
            part_number += 1;
        }

        Ok(parts)
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn copy(
        &self,
        from_bucket: &str,
        from_key: &str,
        to_bucket: &str,
        to_key: &str,
    ) -> StorageResult<()> {
        let start = std::time::Instant::now();

        let size = self.content_length(from_bucket, from_key).await?;

        if size > SINGLE_COPY_LIMIT {
            self.multipart_copy(from_bucket, from_key, to_bucket, to_key, size)
                .await?;
        } else {
            self.client
                .copy_object()
                .bucket(to_bucket)
                .copy_source(Self::copy_source(from_bucket, from_key))
                .key(to_key)
                .send()
                .await
                .map_err(|e| {
                    tracing::error!(
                        error = %DisplayErrorContext(&e),
                        from_bucket = %from_bucket,
                        from_key = %from_key,
                        to_bucket = %to_bucket,
                        to_key = %to_key,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "S3 copy failed"
                    );
                    StorageError::CopyFailed(DisplayErrorContext(&e).to_string())
                })?;
        }

        tracing::info!(
            from_bucket = %from_bucket,
            from_key = %from_key,
            to_bucket = %to_bucket,
            to_key = %to_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 copy successful"
        );

        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();

        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %DisplayErrorContext(&e),
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                StorageError::DeleteFailed(DisplayErrorContext(&e).to_string())
            })?;

        tracing::info!(
            bucket = %bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn download(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        let start = std::time::Instant::now();

        let result = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match &e {
                SdkError::ServiceError(service_err) => match service_err.err() {
                    GetObjectError::NoSuchKey(_) => {
                        StorageError::NotFound(format!("{}/{}", bucket, key))
                    }
                    _ => StorageError::DownloadFailed(DisplayErrorContext(&e).to_string()),
                },
                _ => StorageError::DownloadFailed(DisplayErrorContext(&e).to_string()),
            })?;

        let data = result
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?
            .into_bytes();

        tracing::debug!(
            bucket = %bucket,
            key = %key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(data.to_vec())
    }

    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()> {
        let size = data.len() as u64;
        let start = std::time::Instant::now();

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(Bytes::from(data)))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %DisplayErrorContext(&e),
                    bucket = %bucket,
                    key = %key,
                    size_bytes = size,
                    "S3 upload failed"
                );
                StorageError::UploadFailed(DisplayErrorContext(&e).to_string())
            })?;

        tracing::debug!(
            bucket = %bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(())
    }

    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        match self.content_length(bucket, key).await {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_source_encodes_key() {
        assert_eq!(
            S3Storage::copy_source("legacy", "image/a.png"),
            "legacy/image%2Fa.png"
        );
        assert_eq!(
            S3Storage::copy_source("legacy", "image/my avatar.png"),
            "legacy/image%2Fmy%20avatar.png"
        );
    }
}
