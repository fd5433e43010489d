//! Object store client: pages are PUT here as public-read HTML objects.

use async_trait::async_trait;
use reqwest::{Client, Url};
use std::any::Any;
use std::fmt;
use std::time::Duration;
use tracing::warn;

use crate::config::Config;
use crate::error::PublishError;
use crate::location;

pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Object store failures, split by whether the store answered at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Transport-level failure; the store never responded.
    Unreachable(String),
    /// The store responded with a non-success status.
    Status { status: u16, body: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unreachable(reason) => write!(f, "object store unreachable: {reason}"),
            StoreError::Status { status, body } => {
                write!(f, "object store error {status}: {body}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

impl StoreError {
    /// Attach the publish id assigned before the store was called.
    pub fn into_publish_error(self, publish_id: i64) -> PublishError {
        match self {
            StoreError::Unreachable(reason) => PublishError::StoreUnavailable {
                publish_id,
                reason,
            },
            StoreError::Status { status, body } => PublishError::StorePublish {
                publish_id,
                status,
                body,
            },
        }
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync + Any {
    /// Write one object, world-readable, under the given key.
    async fn put(&self, key: &str, body: &str, content_type: &str) -> Result<(), StoreError>;

    /// Direct URL the object is served from.
    fn url_for(&self, key: &str) -> String;
}

#[derive(Clone)]
pub struct HttpObjectStore {
    http: Client,
    endpoint: String,
    bucket: String,
    token: String,
}

impl fmt::Debug for HttpObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpObjectStore")
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl HttpObjectStore {
    pub fn new(endpoint: String, bucket: String, token: String, timeout: Duration) -> Self {
        let http = Client::builder()
            .user_agent("hackpub/0.1")
            .no_proxy()
            .timeout(timeout)
            .build()
            .expect("reqwest client");
        Self {
            http,
            endpoint,
            bucket,
            token,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            cfg.storage.endpoint.clone(),
            cfg.storage.bucket.clone(),
            cfg.storage.token.clone(),
            cfg.http_timeout(),
        )
    }

    pub fn build_put(
        &self,
        key: &str,
        body: &str,
        content_type: &str,
    ) -> Result<reqwest::Request, StoreError> {
        let url = Url::parse(&self.url_for(key))
            .map_err(|e| StoreError::Unreachable(format!("bad object URL: {e}")))?;
        self.http
            .put(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", content_type)
            .header("x-amz-acl", "public-read")
            .body(body.to_string())
            .build()
            .map_err(|e| StoreError::Unreachable(format!("failed to build request: {e}")))
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(&self, key: &str, body: &str, content_type: &str) -> Result<(), StoreError> {
        let request = self.build_put(key, body, content_type)?;
        let res = self
            .http
            .execute(request)
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            warn!(status, "object store rejected put");
            return Err(StoreError::Status { status, body });
        }
        Ok(())
    }

    fn url_for(&self, key: &str) -> String {
        location::storage_url(&self.endpoint, &self.bucket, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> HttpObjectStore {
        HttpObjectStore::new(
            "https://objects.example.com".into(),
            "pages".into(),
            "secret-token".into(),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn url_for_joins_endpoint_bucket_key() {
        assert_eq!(
            store().url_for("alice/hacks/cats"),
            "https://objects.example.com/pages/alice/hacks/cats"
        );
    }

    #[test]
    fn build_put_sets_headers() {
        let request = store()
            .build_put("alice/hacks/cats", "<title>Cats</title>", HTML_CONTENT_TYPE)
            .unwrap();
        assert_eq!(request.method(), reqwest::Method::PUT);
        assert_eq!(request.url().path(), "/pages/alice/hacks/cats");
        let headers = request.headers();
        assert_eq!(
            headers
                .get("Authorization")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            "Bearer secret-token"
        );
        assert_eq!(
            headers
                .get("Content-Type")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            HTML_CONTENT_TYPE
        );
        assert_eq!(
            headers
                .get("x-amz-acl")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            "public-read"
        );
    }

    #[test]
    fn debug_redacts_token() {
        let rendered = format!("{:?}", store());
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("objects.example.com"));
    }

    #[test]
    fn errors_carry_the_publish_id() {
        let err = StoreError::Status {
            status: 500,
            body: "boom".into(),
        }
        .into_publish_error(9);
        assert!(matches!(
            err,
            PublishError::StorePublish {
                publish_id: 9,
                status: 500,
                ..
            }
        ));

        let err = StoreError::Unreachable("dns".into()).into_publish_error(9);
        assert!(matches!(
            err,
            PublishError::StoreUnavailable { publish_id: 9, .. }
        ));
    }
}
