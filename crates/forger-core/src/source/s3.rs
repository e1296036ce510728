//! S3 template source
//!
//! Fetches templates with `GetObject` from AWS S3 or any S3-compatible store
//! (MinIO, Wasabi, DigitalOcean Spaces). Static keys from the configuration
//! take precedence; otherwise credentials come from the standard AWS provider
//! chain.

use crate::error::{Error, FetchError, Result};
use crate::source::TemplateSource;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Default bucket holding the template tree
pub const DEFAULT_BUCKET: &str = "backendforger";

/// Default AWS region of the template bucket
pub const DEFAULT_REGION: &str = "ap-south-1";

/// S3 template source configuration
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3SourceConfig {
    /// Bucket name
    pub bucket: String,
    /// AWS region
    pub region: String,
    /// Custom S3-compatible endpoint (optional)
    pub endpoint: Option<String>,
    /// Prefix prepended to every key (e.g. "v2/")
    pub prefix: String,
    /// Static access key; used only together with `secret_access_key`
    #[serde(default, skip_serializing)]
    pub access_key_id: Option<String>,
    #[serde(default, skip_serializing)]
    pub secret_access_key: Option<String>,
}

impl S3SourceConfig {
    /// Static credentials, when both halves are configured
    pub fn static_credentials(&self) -> Option<Credentials> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) => Some(Credentials::new(
                id.clone(),
                secret.clone(),
                None,
                None,
                "forger-config",
            )),
            _ => None,
        }
    }
}

impl Default for S3SourceConfig {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            prefix: String::new(),
            access_key_id: None,
            secret_access_key: None,
        }
    }
}

impl fmt::Debug for S3SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3SourceConfig")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("prefix", &self.prefix)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Template source backed by an S3 bucket
pub struct S3Source {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3Source {
    /// Create a source from configuration
    pub async fn new(config: &S3SourceConfig) -> Result<Self> {
        if config.bucket.trim().is_empty() {
            return Err(Error::s3_config("bucket name must not be empty"));
        }

        let client = Self::create_client(
            &config.region,
            config.endpoint.as_deref(),
            config.static_credentials(),
        )
        .await;

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            prefix: config.prefix.clone(),
        })
    }

    /// Create a source around an existing client
    pub fn from_client(client: Client, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    /// Create an S3 client with the given region, optional endpoint and optional static keys
    async fn create_client(
        region: &str,
        endpoint: Option<&str>,
        credentials: Option<Credentials>,
    ) -> Client {
        let region = Region::new(region.to_string());

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region)
            .load()
            .await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&sdk_config);

        if let Some(credentials) = credentials {
            debug!("Using static credentials from configuration");
            s3_config_builder = s3_config_builder.credentials_provider(credentials);
        }

        if let Some(endpoint_url) = endpoint {
            debug!("Using custom S3 endpoint: {}", endpoint_url);
            s3_config_builder = s3_config_builder
                .endpoint_url(endpoint_url)
                .force_path_style(true); // Required for MinIO and many S3-compatible services
        }

        Client::from_conf(s3_config_builder.build())
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn make_key(&self, key: &str) -> String {
        object_key(&self.prefix, key)
    }
}

/// Build the full object key from a prefix and a template key
pub(crate) fn object_key(prefix: &str, key: &str) -> String {
    let key = key.trim_start_matches('/');
    let full = if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}/{}", prefix.trim_end_matches('/'), key)
    };
    full.replace("//", "/")
}

#[async_trait]
impl TemplateSource for S3Source {
    async fn fetch(&self, key: &str) -> std::result::Result<Vec<u8>, FetchError> {
        let object_key = self.make_key(key);
        debug!("Downloading template: s3://{}/{}", self.bucket, object_key);

        let resp = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    return Err(FetchError::not_found(key));
                }
                return Err(FetchError::backend(
                    key,
                    DisplayErrorContext(&service_error).to_string(),
                ));
            }
        };

        let body = resp
            .body
            .collect()
            .await
            .map_err(|e| FetchError::backend(key, format!("failed to read response body: {e}")))?;

        let data = body.into_bytes().to_vec();
        debug!(
            "Downloaded {} bytes from s3://{}/{}",
            data.len(),
            self.bucket,
            object_key
        );

        Ok(data)
    }

    fn name(&self) -> &'static str {
        "s3"
    }
}

impl std::fmt::Debug for S3Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Source")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}
