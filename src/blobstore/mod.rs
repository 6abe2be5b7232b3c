//! S3 compatible object storage bound to a platform service.
//!
//! The service is selected by the JSON variable `cfkit_blobstore`:
//!
//! ```text
//! cfkit_blobstore={"name": "assets"}
//! ```
//!
//! Its credentials provide `access_key_id`, `secret_access_key`, `host` and
//! `bucket_name`. All operations work on that single bucket.

use crate::config::{ConfigError, EnvRecord, RecordBinder, ServiceDescriptor, Settings};
use crate::tools::PinnedBytesStream;
use anyhow::Context;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{self, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use bytes::{Buf, Bytes};
use bytesize::{KB, MB};
use futures_util::TryStreamExt;
use std::fmt::{Debug, Formatter};

// The endpoint decides where requests go, the SDK still insists on a region.
const REGION: &str = "us-east-1";

const MULTIPART_UPLOAD_IDEAL_PART_SIZE: usize = 16 * MB as usize;
const MULTIPART_UPLOAD_BUFFER_SIZE: usize = MULTIPART_UPLOAD_IDEAL_PART_SIZE + (16 * KB as usize);

#[derive(Debug, Default)]
pub struct BlobstoreEnv {
    pub name: String,
}

impl EnvRecord for BlobstoreEnv {
    fn bind(binder: &mut RecordBinder<Self>) {
        binder.string("cfkit_blobstore.name", |env, name| env.name = name);
    }
}

/// Connection data taken from the bound service.
#[derive(Clone, PartialEq, Eq)]
pub struct BlobstoreCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint: String,
    pub bucket: String,
}

impl Debug for BlobstoreCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobstoreCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl BlobstoreCredentials {
    pub fn from_service(service: &ServiceDescriptor) -> Result<Self, ConfigError> {
        Ok(BlobstoreCredentials {
            access_key_id: service.require_credential("access_key_id")?,
            secret_access_key: service.require_credential("secret_access_key")?,
            endpoint: endpoint_url(&service.require_credential("host")?),
            bucket: service.require_credential("bucket_name")?,
        })
    }
}

/// Blob stores are usually reached without TLS inside the platform, so a
/// bare host is addressed via plain HTTP.
fn endpoint_url(host: &str) -> String {
    if host.contains("://") {
        host.to_owned()
    } else {
        format!("http://{}", host)
    }
}

#[derive(Clone, Debug)]
pub struct Blobstore {
    pub client: Client,
    bucket: String,
}

impl Blobstore {
    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Blobstore> {
        tracing::info!("Setting up blobstore....");
        let env: BlobstoreEnv = settings.parse()?;
        tracing::debug!("Blobstore env: {:?}", env);

        let service = settings.require_service(&[env.name.as_str()])?;
        let credentials = BlobstoreCredentials::from_service(&service)?;
        tracing::debug!("Blobstore credentials: {:?}", credentials);

        Ok(Blobstore::connect(credentials).await)
    }

    pub async fn connect(credentials: BlobstoreCredentials) -> Blobstore {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(REGION))
            .credentials_provider(Credentials::new(
                credentials.access_key_id,
                credentials.secret_access_key,
                None,
                None,
                "cfkit_blobstore",
            ))
            .endpoint_url(credentials.endpoint)
            .load()
            .await;

        let s3_config = config::Builder::from(&config)
            .force_path_style(true)
            .build();

        Blobstore {
            client: Client::from_conf(s3_config),
            bucket: credentials.bucket,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    #[tracing::instrument(level = "debug", skip(self, body), err(Display))]
    pub async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .with_context(|| format!("Failed to store '{}' in bucket '{}'", key, self.bucket))?;

        Ok(())
    }

    /// Lists every key of the bucket, following continuation tokens.
    #[tracing::instrument(level = "debug", skip(self), err(Display))]
    pub async fn list(&self) -> anyhow::Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation_token = None;

        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_continuation_token(continuation_token)
                .send()
                .await
                .with_context(|| format!("Failed to list bucket '{}'", self.bucket))?;

            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .map(str::to_owned),
            );

            match page.next_continuation_token() {
                Some(token) if page.is_truncated().unwrap_or(false) => {
                    continuation_token = Some(token.to_owned())
                }
                _ => return Ok(keys),
            }
        }
    }

    #[tracing::instrument(level = "debug", skip(self), err(Display))]
    pub async fn get(&self, key: &str) -> anyhow::Result<Bytes> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to fetch '{}' from bucket '{}'", key, self.bucket))?;

        let data = result
            .body
            .collect()
            .await
            .with_context(|| format!("Failed to read '{}' from bucket '{}'", key, self.bucket))?
            .into_bytes();

        Ok(data)
    }

    #[tracing::instrument(level = "debug", skip(self), err(Display))]
    pub async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to delete '{}' from bucket '{}'", key, self.bucket))?;

        Ok(())
    }

    /// Streams `stream` into `key` as a multipart upload.
    ///
    /// A failed upload is aborted so that no orphaned parts remain.
    #[tracing::instrument(level = "debug", skip(self, stream), err(Display))]
    pub async fn upload(
        &self,
        key: &str,
        content_type: &str,
        stream: PinnedBytesStream,
    ) -> anyhow::Result<()> {
        let upload_id = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .with_context(|| {
                format!(
                    "Failed to create multipart upload for '{}' in bucket '{}'",
                    key, self.bucket
                )
            })?
            .upload_id()
            .with_context(|| {
                format!(
                    "Failed to receive upload id for '{}' in bucket '{}'",
                    key, self.bucket
                )
            })?
            .to_owned();

        let result = self.upload_parts(key, &upload_id, stream).await;
        if result.is_err()
            && let Err(abort_error) = self
                .client
                .abort_multipart_upload()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .send()
                .await
        {
            tracing::error!(
                "Failed to abort multipart upload of '{}' in bucket '{}': {:#}",
                key,
                self.bucket,
                abort_error
            );
        }

        result
    }

    async fn upload_parts(
        &self,
        key: &str,
        upload_id: &str,
        mut stream: PinnedBytesStream,
    ) -> anyhow::Result<()> {
        let mut buffer = Vec::with_capacity(MULTIPART_UPLOAD_BUFFER_SIZE);
        let mut uploaded_parts = Vec::new();

        while let Some(chunk) = stream.try_next().await.context("Failed to read upload data")? {
            buffer.extend_from_slice(chunk.chunk());

            if buffer.len() >= MULTIPART_UPLOAD_IDEAL_PART_SIZE {
                let part_number = uploaded_parts.len() as i32 + 1;
                uploaded_parts.push(self.upload_part(key, upload_id, part_number, &buffer).await?);
                buffer.clear();
            }
        }

        if !buffer.is_empty() || uploaded_parts.is_empty() {
            let part_number = uploaded_parts.len() as i32 + 1;
            uploaded_parts.push(self.upload_part(key, upload_id, part_number, &buffer).await?);
        }

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(uploaded_parts))
                    .build(),
            )
            .send()
            .await
            .with_context(|| {
                format!(
                    "Failed to complete multipart upload of '{}' in bucket '{}'",
                    key, self.bucket
                )
            })?;

        Ok(())
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        data: &[u8],
    ) -> anyhow::Result<CompletedPart> {
        let result = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .with_context(|| {
                format!(
                    "Failed to upload part {} of '{}' in bucket '{}'",
                    part_number, key, self.bucket
                )
            })?;

        Ok(CompletedPart::builder()
            .e_tag(result.e_tag.unwrap_or_default())
            .part_number(part_number)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticEnvironment;

    const SERVICES: &str = r#"{
        "s3-compatible": [{
            "name": "assets",
            "label": "s3-compatible",
            "tags": ["blobstore"],
            "credentials": {
                "access_key_id": "AKIA",
                "secret_access_key": "s3cr3t",
                "host": "blobs.internal:9000",
                "bucket_name": "assets-bucket"
            }
        }]
    }"#;

    fn settings() -> Settings {
        Settings::with_source(
            StaticEnvironment::new()
                .with("VCAP_SERVICES", SERVICES)
                .with("cfkit_blobstore", r#"{"name": "assets"}"#),
        )
    }

    #[test]
    fn reads_credentials_from_bound_service() {
        let settings = settings();
        let env: BlobstoreEnv = settings.parse().unwrap();
        let service = settings.require_service(&[env.name.as_str()]).unwrap();
        let credentials = BlobstoreCredentials::from_service(&service).unwrap();

        assert_eq!(credentials.access_key_id, "AKIA");
        assert_eq!(credentials.endpoint, "http://blobs.internal:9000");
        assert_eq!(credentials.bucket, "assets-bucket");
        assert!(!format!("{:?}", credentials).contains("s3cr3t"));
    }

    #[test]
    fn keeps_explicit_schemes() {
        assert_eq!(endpoint_url("https://s3.example.com"), "https://s3.example.com");
        assert_eq!(endpoint_url("10.0.0.4"), "http://10.0.0.4");
    }

    #[test]
    fn reports_missing_credentials() {
        let settings = Settings::with_source(StaticEnvironment::new().with(
            "VCAP_SERVICES",
            r#"{"s3": [{"name": "assets", "credentials": {"host": "x"}}]}"#,
        ));
        let service = settings.require_service(&["assets"]).unwrap();

        assert!(matches!(
            BlobstoreCredentials::from_service(&service),
            Err(ConfigError::MissingCredential { key, .. }) if key == "access_key_id"
        ));
    }

    #[tokio::test]
    async fn fails_without_bound_service() {
        let settings = Settings::with_source(StaticEnvironment::new());
        assert!(Blobstore::from_settings(&settings).await.is_err());
    }

    #[tokio::test]
    #[ignore]
    async fn round_trips_objects_against_live_store() {
        let blobstore = Blobstore::from_settings(&Settings::new()).await.unwrap();

        blobstore
            .put("cfkit-test.txt", b"hello".to_vec(), "text/plain")
            .await
            .unwrap();
        assert_eq!(blobstore.get("cfkit-test.txt").await.unwrap(), "hello");
        assert!(
            blobstore
                .list()
                .await
                .unwrap()
                .contains(&"cfkit-test.txt".to_owned())
        );
        blobstore.delete("cfkit-test.txt").await.unwrap();
    }
}
