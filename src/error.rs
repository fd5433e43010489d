//! Error taxonomy for the publish pipeline.
//!
//! The object-store and catalog variants carry the already-assigned publish
//! id (and, where it exists, the live URL) so callers can tell "nothing
//! happened, retry everything" apart from "your content is saved, only the
//! later stage needs to run again".

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    /// The request itself is unusable (empty content, bad fields).
    #[error("invalid publish request: {0}")]
    Validation(String),

    /// No authenticated identity accompanied the request.
    #[error("authentication required")]
    AuthRequired,

    /// The submitted page cannot be processed (e.g. no title element).
    #[error("malformed page content: {0}")]
    MalformedContent(String),

    /// An origin project or deletion target does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The project store failed; nothing external was written yet, so the
    /// whole request is safe to retry.
    #[error("project store failure: {0}")]
    Persistence(#[from] sqlx::Error),

    /// The object store could not be reached at all. The project row exists;
    /// only the publish-to-store step needs to be repeated.
    #[error("object store unreachable; content saved as project {publish_id} but not yet live: {reason}")]
    StoreUnavailable { publish_id: i64, reason: String },

    /// The object store answered with a non-success status. Same
    /// recoverability as [`PublishError::StoreUnavailable`].
    #[error("object store rejected publish with status {status}; content saved as project {publish_id} but not yet live")]
    StorePublish {
        publish_id: i64,
        status: u16,
        body: String,
    },

    /// The page is live at `published_url` but its catalog record is stale
    /// or missing; re-running the sync with the same inputs converges.
    #[error("catalog sync failed for {published_url} (project {publish_id} is live): {reason}")]
    CatalogSync {
        publish_id: i64,
        published_url: String,
        reason: String,
    },

    /// Malformed deployment configuration, e.g. a bad custom-domain
    /// template.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl PublishError {
    /// Stable tag used in structured client responses.
    pub fn kind(&self) -> &'static str {
        match self {
            PublishError::Validation(_) => "validation",
            PublishError::AuthRequired => "auth_required",
            PublishError::MalformedContent(_) => "malformed_content",
            PublishError::NotFound(_) => "not_found",
            PublishError::Persistence(_) => "persistence",
            PublishError::StoreUnavailable { .. } => "store_unavailable",
            PublishError::StorePublish { .. } => "store_publish",
            PublishError::CatalogSync { .. } => "catalog_sync",
            PublishError::Configuration(_) => "configuration",
        }
    }

    /// Id of the project row written before the failure, when one exists.
    pub fn publish_id(&self) -> Option<i64> {
        match self {
            PublishError::StoreUnavailable { publish_id, .. }
            | PublishError::StorePublish { publish_id, .. }
            | PublishError::CatalogSync { publish_id, .. } => Some(*publish_id),
            _ => None,
        }
    }

    /// Whether re-running only the failed stage can repair this publish.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PublishError::StoreUnavailable { .. }
                | PublishError::StorePublish { .. }
                | PublishError::CatalogSync { .. }
        )
    }
}
