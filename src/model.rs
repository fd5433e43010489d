//! Core domain types shared across the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a publish request ultimately does to the project store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageOperation {
    /// Brand-new page, no origin.
    Create,
    /// Overwrite of a page the requester owns.
    Edit,
    /// New page derived from someone else's (or one's own) page.
    Remix,
}

impl PageOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageOperation::Create => "create",
            PageOperation::Edit => "edit",
            PageOperation::Remix => "remix",
        }
    }

    pub fn parse(s: &str) -> Option<PageOperation> {
        match s {
            "create" => Some(PageOperation::Create),
            "edit" => Some(PageOperation::Edit),
            "remix" => Some(PageOperation::Remix),
            _ => None,
        }
    }
}

/// A stored page project. `url` stays NULL until the page is live on the
/// object store.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: i64,
    /// Owner identity (email).
    pub user_id: String,
    pub title: String,
    pub raw_html: String,
    pub sanitized_html: String,
    pub url: Option<String>,
    /// Project this one was created from, when any.
    pub origin_id: Option<i64>,
    /// Published URL of the page this one remixes.
    pub remixed_from: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Descriptive fields extracted from the page plus request overrides,
/// HTML-escaped before anything downstream sees them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaData {
    pub title: String,
    pub description: String,
    pub author: String,
    pub locale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Authenticated requester identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub email: String,
    pub username: String,
}

impl Session {
    pub fn new(email: impl Into<String>, username: impl Into<String>) -> Session {
        Session {
            email: email.into(),
            username: username.into(),
        }
    }
}

/// Inbound publish request as the client sends it. Everything except the
/// page content is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublishRequest {
    pub html: String,
    /// Pre-sanitized markup to serve, when the client supplies one.
    #[serde(default)]
    pub sanitized_html: Option<String>,
    /// Operation the client intends; the resolver has the final word.
    #[serde(default)]
    pub operation: Option<PageOperation>,
    /// Project the request builds on, if any.
    #[serde(default)]
    pub origin_id: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Comma-separated tag list.
    #[serde(default)]
    pub tags: Option<String>,
}

/// A validated request ready for the pipeline proper.
#[derive(Debug, Clone)]
pub struct PublishIntent {
    /// Correlates every log line of one publish.
    pub request_id: Uuid,
    pub operation: Option<PageOperation>,
    pub origin_id: Option<i64>,
    pub html: String,
    pub sanitized_html: String,
    pub metadata: MetaData,
}

/// Everything a successful publish produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishResult {
    pub publish_id: i64,
    pub operation: PageOperation,
    pub page_title: String,
    /// Disambiguator appended to the slug when the owner already has pages
    /// with the same title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_title_count: Option<i64>,
    /// Namespace-relative location, e.g. `/hacks/cats-3`.
    pub publish_location: String,
    /// Direct object-store URL.
    pub storage_url: String,
    /// Custom-domain URL, when a custom domain is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_url: Option<String>,
    /// The URL of record: custom when available, storage otherwise.
    pub published_url: String,
    /// Previous URL of an edited page whose title (and thus URL) changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_round_trips_through_str() {
        for op in [
            PageOperation::Create,
            PageOperation::Edit,
            PageOperation::Remix,
        ] {
            assert_eq!(PageOperation::parse(op.as_str()), Some(op));
        }
        assert_eq!(PageOperation::parse("destroy"), None);
    }

    #[test]
    fn request_deserializes_with_bare_html() {
        let req: PublishRequest =
            serde_json::from_str(r#"{"html": "<title>Hi</title>"}"#).unwrap();
        assert_eq!(req.html, "<title>Hi</title>");
        assert!(req.operation.is_none());
        assert!(req.origin_id.is_none());
        assert!(req.tags.is_none());
    }

    #[test]
    fn result_omits_empty_optionals() {
        let result = PublishResult {
            publish_id: 1,
            operation: PageOperation::Create,
            page_title: "Hi".into(),
            page_title_count: None,
            publish_location: "/hacks/hi".into(),
            storage_url: "https://store.test/pages/alice/hacks/hi".into(),
            custom_url: None,
            published_url: "https://store.test/pages/alice/hacks/hi".into(),
            old_url: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("page_title_count").is_none());
        assert!(json.get("custom_url").is_none());
        assert!(json.get("old_url").is_none());
        assert_eq!(json["operation"], "create");
    }
}
