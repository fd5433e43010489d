//! Published-page addressing: locations, object keys, and URLs.

use crate::config::PublishConfig;
use crate::error::PublishError;

/// Where a published page lives, in every form the pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageAddress {
    /// Namespace-relative location, e.g. `/hacks/cats-3`.
    pub publish_location: String,
    /// Key of the object inside the bucket, e.g. `alice/hacks/cats-3`.
    pub object_key: String,
    /// Vanity URL on the custom domain, when one is configured.
    pub custom_url: Option<String>,
}

/// Direct URL of an object on the store.
pub fn storage_url(endpoint: &str, bucket: &str, key: &str) -> String {
    format!(
        "{}/{}/{}",
        endpoint.trim_end_matches('/'),
        bucket,
        key.trim_start_matches('/')
    )
}

fn validate_domain(domain: &str) -> Result<(), PublishError> {
    let bad = domain.is_empty()
        || domain.contains("://")
        || domain.contains('/')
        || domain.chars().any(char::is_whitespace)
        || domain.starts_with('.')
        || domain.ends_with('.');
    if bad {
        return Err(PublishError::Configuration(format!(
            "custom domain {domain:?} is not a bare hostname"
        )));
    }
    Ok(())
}

/// Compute the address for a page.
///
/// The path segment is the slug, with `-{n}` appended when a disambiguator
/// was assigned. A page whose title slugs down to nothing is addressed by
/// its publish id instead, so every page has a non-empty location.
pub fn page_address(
    cfg: &PublishConfig,
    username: &str,
    slug: &str,
    disambiguator: Option<i64>,
    publish_id: i64,
) -> Result<PageAddress, PublishError> {
    let segment = if slug.is_empty() {
        publish_id.to_string()
    } else {
        match disambiguator {
            Some(n) => format!("{slug}-{n}"),
            None => slug.to_string(),
        }
    };
    let publish_location = format!("/{}/{}", cfg.namespace, segment);
    let object_key = format!("{username}{publish_location}");

    let custom_url = match &cfg.custom_domain {
        Some(domain) => {
            validate_domain(domain)?;
            Some(format!("https://{username}.{domain}{publish_location}"))
        }
        None => None,
    };

    Ok(PageAddress {
        publish_location,
        object_key,
        custom_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(custom_domain: Option<&str>) -> PublishConfig {
        PublishConfig {
            namespace: "hacks".into(),
            hostname: "pages.example.com".into(),
            custom_domain: custom_domain.map(String::from),
        }
    }

    #[test]
    fn address_without_custom_domain() {
        let addr = page_address(&cfg(None), "alice", "cats", None, 7).unwrap();
        assert_eq!(addr.publish_location, "/hacks/cats");
        assert_eq!(addr.object_key, "alice/hacks/cats");
        assert!(addr.custom_url.is_none());
    }

    #[test]
    fn address_with_disambiguator_and_domain() {
        let addr = page_address(&cfg(Some("pages.example.com")), "bob", "cats", Some(3), 7).unwrap();
        assert_eq!(addr.publish_location, "/hacks/cats-3");
        assert_eq!(addr.object_key, "bob/hacks/cats-3");
        assert_eq!(
            addr.custom_url.as_deref(),
            Some("https://bob.pages.example.com/hacks/cats-3")
        );
    }

    #[test]
    fn empty_slug_falls_back_to_publish_id() {
        let addr = page_address(&cfg(None), "alice", "", Some(3), 42).unwrap();
        assert_eq!(addr.publish_location, "/hacks/42");
        assert_eq!(addr.object_key, "alice/hacks/42");
    }

    #[test]
    fn malformed_domain_is_a_configuration_error() {
        for domain in ["", "https://x.com", "x.com/pages", "x .com", ".x.com", "x.com."] {
            let err = page_address(&cfg(Some(domain)), "alice", "cats", None, 1).unwrap_err();
            assert!(
                matches!(err, PublishError::Configuration(_)),
                "domain {domain:?} should be rejected"
            );
        }
    }

    #[test]
    fn storage_url_joins_cleanly() {
        assert_eq!(
            storage_url("https://objects.example.com/", "pages", "alice/hacks/cats"),
            "https://objects.example.com/pages/alice/hacks/cats"
        );
        assert_eq!(
            storage_url("https://objects.example.com", "pages", "/alice/hacks/cats"),
            "https://objects.example.com/pages/alice/hacks/cats"
        );
    }
}
