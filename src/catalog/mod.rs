//! Page catalog client and the publish-time sync routine.
//!
//! The catalog is a directory of published pages keyed by owner and URL.
//! Syncing is idempotent: the same inputs find the same record and update
//! it, so a failed sync can be repeated as-is.

use async_trait::async_trait;
use reqwest::{Client, Url};
use std::any::Any;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::PublishError;

pub mod model;

pub use model::{CatalogFields, CatalogRecord, SearchFilter};
use model::{CreateResponse, SearchResponse};

/// Catalog failures, split by transport, status, and body decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Transport-level failure; the catalog never responded.
    Unreachable(String),
    /// The catalog responded with a non-success status.
    Status { status: u16, body: String },
    /// The catalog responded 2xx but the body was not what we expect.
    Decode(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Unreachable(reason) => write!(f, "catalog unreachable: {reason}"),
            CatalogError::Status { status, body } => write!(f, "catalog error {status}: {body}"),
            CatalogError::Decode(reason) => write!(f, "invalid catalog response: {reason}"),
        }
    }
}

impl std::error::Error for CatalogError {}

#[async_trait]
pub trait CatalogService: Send + Sync + Any {
    /// Records matching the filter. An `email` narrows to one owner.
    async fn search(&self, filter: &SearchFilter) -> Result<Vec<CatalogRecord>, CatalogError>;

    /// Create a record, returning its id.
    async fn create(&self, fields: &CatalogFields) -> Result<String, CatalogError>;

    /// Overwrite an existing record.
    async fn update(&self, id: &str, fields: &CatalogFields) -> Result<(), CatalogError>;
}

#[derive(Clone)]
pub struct CatalogClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    pub fn new(endpoint: &str, token: String, timeout: Duration) -> Result<Self, PublishError> {
        // A trailing slash keeps Url::join from eating the last path segment.
        let normalized = format!("{}/", endpoint.trim_end_matches('/'));
        let base_url = Url::parse(&normalized).map_err(|e| {
            PublishError::Configuration(format!("bad catalog endpoint {endpoint:?}: {e}"))
        })?;
        let http = Client::builder()
            .user_agent("hackpub/0.1")
            .no_proxy()
            .timeout(timeout)
            .build()
            .expect("reqwest client");
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, PublishError> {
        Self::new(
            &cfg.catalog.endpoint,
            cfg.catalog.token.clone(),
            cfg.http_timeout(),
        )
    }

    fn records_url(&self) -> Result<Url, CatalogError> {
        self.base_url
            .join("records")
            .map_err(|e| CatalogError::Unreachable(format!("bad catalog URL: {e}")))
    }

    fn record_url(&self, id: &str) -> Result<Url, CatalogError> {
        self.base_url
            .join(&format!("records/{id}"))
            .map_err(|e| CatalogError::Unreachable(format!("bad catalog URL: {e}")))
    }

    pub fn build_search(&self, filter: &SearchFilter) -> Result<reqwest::Request, CatalogError> {
        let mut url = self.records_url()?;
        url.query_pairs_mut().append_pair("url", &filter.url);
        if let Some(email) = &filter.email {
            url.query_pairs_mut().append_pair("email", email);
        }
        self.http
            .get(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .build()
            .map_err(|e| CatalogError::Unreachable(format!("failed to build request: {e}")))
    }

    async fn execute(&self, request: reqwest::Request) -> Result<String, CatalogError> {
        let res = self
            .http
            .execute(request)
            .await
            .map_err(|e| CatalogError::Unreachable(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            warn!(status, "catalog request failed");
            return Err(CatalogError::Status { status, body });
        }
        res.text()
            .await
            .map_err(|e| CatalogError::Unreachable(e.to_string()))
    }
}

#[async_trait]
impl CatalogService for CatalogClient {
    async fn search(&self, filter: &SearchFilter) -> Result<Vec<CatalogRecord>, CatalogError> {
        let request = self.build_search(filter)?;
        let body = self.execute(request).await?;
        let payload: SearchResponse =
            serde_json::from_str(&body).map_err(|e| CatalogError::Decode(e.to_string()))?;
        Ok(payload.records)
    }

    async fn create(&self, fields: &CatalogFields) -> Result<String, CatalogError> {
        let request = self
            .http
            .post(self.records_url()?)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(fields)
            .build()
            .map_err(|e| CatalogError::Unreachable(format!("failed to build request: {e}")))?;
        let body = self.execute(request).await?;
        let payload: CreateResponse =
            serde_json::from_str(&body).map_err(|e| CatalogError::Decode(e.to_string()))?;
        Ok(payload.id)
    }

    async fn update(&self, id: &str, fields: &CatalogFields) -> Result<(), CatalogError> {
        let request = self
            .http
            .put(self.record_url(id)?)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(fields)
            .build()
            .map_err(|e| CatalogError::Unreachable(format!("failed to build request: {e}")))?;
        self.execute(request).await?;
        Ok(())
    }
}

/// What a sync did to the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Created(String),
    Updated(String),
}

impl SyncOutcome {
    pub fn record_id(&self) -> &str {
        match self {
            SyncOutcome::Created(id) | SyncOutcome::Updated(id) => id,
        }
    }
}

fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Bring the catalog record for one page in line with `fields`.
///
/// The record is looked up by owner and `lookup_url`; for an edit whose URL
/// moved, the caller passes the old URL so the existing record is found and
/// carried to the new one. A lineage pointer that is still a raw URL is
/// swapped for the parent's record id when exactly one record matches it;
/// an unknown or ambiguous parent keeps the URL.
pub async fn sync(
    catalog: &dyn CatalogService,
    owner_email: &str,
    lookup_url: &str,
    mut fields: CatalogFields,
) -> Result<SyncOutcome, CatalogError> {
    if let Some(parent_url) = fields.remixed_from.clone() {
        if is_url(&parent_url) {
            let parents = catalog
                .search(&SearchFilter {
                    email: None,
                    url: parent_url.clone(),
                })
                .await?;
            if parents.len() == 1 {
                fields.remixed_from = Some(parents[0].id.clone());
            } else {
                debug!(
                    parent = %parent_url,
                    matches = parents.len(),
                    "remix parent not uniquely cataloged; keeping URL"
                );
            }
        }
    }

    let matches = catalog
        .search(&SearchFilter {
            email: Some(owner_email.to_string()),
            url: lookup_url.to_string(),
        })
        .await?;

    match matches.as_slice() {
        [] => {
            let id = catalog.create(&fields).await?;
            Ok(SyncOutcome::Created(id))
        }
        [record] => {
            catalog.update(&record.id, &fields).await?;
            Ok(SyncOutcome::Updated(record.id.clone()))
        }
        [record, ..] => {
            warn!(
                owner = %owner_email,
                url = %lookup_url,
                matches = matches.len(),
                "multiple catalog records for one page; updating the first"
            );
            catalog.update(&record.id, &fields).await?;
            Ok(SyncOutcome::Updated(record.id.clone()))
        }
    }
}
