use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::primitives::ByteStream;
use std::sync::Arc;

// 1. StorageService Contract
/// StorageService
///
/// Abstract contract for the object store that holds uploaded product images.
/// Lets the upload handler run against S3/MinIO in production and an in-memory
/// mock in tests.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the configured bucket if it is missing. Only called in `Env::Local`.
    async fn ensure_bucket_exists(&self);

    /// Writes `bytes` under `key` and returns the public URL of the stored object.
    ///
    /// # Arguments
    /// * `key`: The object key (prefix + filename) inside the bucket.
    /// * `content_type`: The MIME type stored with the object (e.g., "image/png").
    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, String>;
}

// 2. The Real Implementation (S3/MinIO)
/// S3StorageClient
///
/// Concrete implementation over the AWS SDK. `force_path_style(true)` keeps it
/// compatible with MinIO and other S3-compatible gateways, and makes the public
/// URL simply `{endpoint}/{bucket}/{key}`.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    endpoint: String,
    bucket_name: String,
}

impl S3StorageClient {
    /// Constructs the S3 client using credentials and configuration from AppConfig.
    pub fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    /// CreateBucket is idempotent; an "already owned" error is ignored.
    async fn ensure_bucket_exists(&self) {
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!("create_bucket: {:?}", e);
        }
    }

    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, String> {
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        Ok(format!("{}/{}/{}", self.endpoint, self.bucket_name, key))
    }
}

/// Removes directory navigation components (`..`, `.`) and empty segments from a
/// key, so the mock never reports a URL outside its bucket.
fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

// 3. The Mock Implementation (For Tests)
/// MockStorageService
///
/// Accepts every upload without network access and returns a deterministic URL,
/// or fails every call when `should_fail` is set.
#[derive(Clone, Default)]
pub struct MockStorageService {
    pub should_fail: bool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn put_object(
        &self,
        key: &str,
        _content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, String> {
        if self.should_fail {
            return Err("Mock Storage Error: Simulation requested".to_string());
        }
        if bytes.is_empty() {
            return Err("Mock Storage Error: empty object".to_string());
        }

        Ok(format!(
            "http://localhost:9000/mock-bucket/{}",
            sanitize_key(key)
        ))
    }
}

/// StorageState
///
/// The concrete type used to share the storage service across the application state.
pub type StorageState = Arc<dyn StorageService>;
