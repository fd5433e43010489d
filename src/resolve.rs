//! Operation resolution: what a request that names an origin actually does.
//!
//! Only the origin's owner may edit it. Anyone else building on a page,
//! whatever their client claimed, gets a remix of their own.

use crate::db::repo::{self, Pool};
use crate::error::PublishError;
use crate::model::{PageOperation, Project, Session};

/// The resolved operation and what it drags along.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub operation: PageOperation,
    /// Published URL of the remixed parent, for lineage.
    pub remixed_from: Option<String>,
    /// URL an edited page lived at before this publish renames it.
    pub old_url: Option<String>,
}

impl Resolution {
    fn passthrough(intended: Option<PageOperation>) -> Resolution {
        Resolution {
            operation: intended.unwrap_or(PageOperation::Create),
            remixed_from: None,
            old_url: None,
        }
    }
}

/// Resolve against an already-loaded origin. Inspects, never mutates.
pub fn resolve_against(
    origin: Option<&Project>,
    intended: Option<PageOperation>,
    requester: &Session,
    new_title: &str,
) -> Resolution {
    let Some(origin) = origin else {
        return Resolution::passthrough(intended);
    };

    let owns = origin.user_id == requester.email;
    if owns && intended == Some(PageOperation::Edit) {
        // The page keeps its row; the old URL matters only when the title
        // (and with it the URL) is about to change.
        let old_url = if origin.title != new_title {
            origin.url.clone()
        } else {
            None
        };
        return Resolution {
            operation: PageOperation::Edit,
            remixed_from: None,
            old_url,
        };
    }

    Resolution {
        operation: PageOperation::Remix,
        remixed_from: origin.url.clone(),
        old_url: None,
    }
}

/// Load the origin (when one is named) and resolve the operation.
pub async fn resolve(
    pool: &Pool,
    intended: Option<PageOperation>,
    origin_id: Option<i64>,
    requester: &Session,
    new_title: &str,
) -> Result<Resolution, PublishError> {
    let Some(id) = origin_id else {
        return Ok(Resolution::passthrough(intended));
    };
    let origin = repo::find_project(pool, id)
        .await?
        .ok_or_else(|| PublishError::NotFound(format!("origin project {id} not found")))?;
    Ok(resolve_against(
        Some(&origin),
        intended,
        requester,
        new_title,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn project(user_id: &str, title: &str, url: Option<&str>) -> Project {
        Project {
            id: 1,
            user_id: user_id.into(),
            title: title.into(),
            raw_html: String::new(),
            sanitized_html: String::new(),
            url: url.map(String::from),
            origin_id: None,
            remixed_from: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn alice() -> Session {
        Session::new("alice@example.com", "alice")
    }

    #[test]
    fn no_origin_passes_the_intent_through() {
        let r = resolve_against(None, None, &alice(), "Cats");
        assert_eq!(r.operation, PageOperation::Create);
        assert!(r.remixed_from.is_none());
        assert!(r.old_url.is_none());

        let r = resolve_against(None, Some(PageOperation::Edit), &alice(), "Cats");
        assert_eq!(r.operation, PageOperation::Edit);
    }

    #[test]
    fn owner_edit_keeps_url_when_title_unchanged() {
        let origin = project("alice@example.com", "Cats", Some("https://x.test/hacks/cats"));
        let r = resolve_against(Some(&origin), Some(PageOperation::Edit), &alice(), "Cats");
        assert_eq!(r.operation, PageOperation::Edit);
        assert!(r.old_url.is_none());
        assert!(r.remixed_from.is_none());
    }

    #[test]
    fn owner_edit_carries_old_url_when_title_changes() {
        let origin = project("alice@example.com", "Old", Some("https://x.test/hacks/old"));
        let r = resolve_against(Some(&origin), Some(PageOperation::Edit), &alice(), "New");
        assert_eq!(r.operation, PageOperation::Edit);
        assert_eq!(r.old_url.as_deref(), Some("https://x.test/hacks/old"));
    }

    #[test]
    fn edit_of_never_published_page_has_no_old_url() {
        let origin = project("alice@example.com", "Old", None);
        let r = resolve_against(Some(&origin), Some(PageOperation::Edit), &alice(), "New");
        assert_eq!(r.operation, PageOperation::Edit);
        assert!(r.old_url.is_none());
    }

    #[test]
    fn foreign_edit_becomes_a_remix() {
        let origin = project("bob@example.com", "Cats", Some("https://x.test/hacks/cats"));
        let r = resolve_against(Some(&origin), Some(PageOperation::Edit), &alice(), "Cats");
        assert_eq!(r.operation, PageOperation::Remix);
        assert_eq!(r.remixed_from.as_deref(), Some("https://x.test/hacks/cats"));
        assert!(r.old_url.is_none());
    }

    #[test]
    fn any_other_intent_with_an_origin_is_a_remix() {
        let origin = project("alice@example.com", "Cats", Some("https://x.test/hacks/cats"));
        for intent in [None, Some(PageOperation::Create), Some(PageOperation::Remix)] {
            let r = resolve_against(Some(&origin), intent, &alice(), "Cats");
            assert_eq!(r.operation, PageOperation::Remix);
            assert_eq!(r.remixed_from.as_deref(), Some("https://x.test/hacks/cats"));
        }
    }

    #[test]
    fn remix_of_unpublished_origin_has_no_lineage_url() {
        let origin = project("bob@example.com", "Cats", None);
        let r = resolve_against(Some(&origin), None, &alice(), "Cats");
        assert_eq!(r.operation, PageOperation::Remix);
        assert!(r.remixed_from.is_none());
    }
}
