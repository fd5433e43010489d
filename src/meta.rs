//! Metadata extraction and sanitization for submitted pages.
//!
//! Every descriptive field is HTML-escaped here, before the rest of the
//! pipeline sees it; nothing downstream escapes again.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::PublishError;
use crate::model::{MetaData, PublishRequest, Session};

static TITLE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title regex"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Pull the page title out of the markup.
///
/// A missing `<title>` element is a hard error: authored pages always carry
/// one, so its absence means the content is not a page we can publish. An
/// empty `<title></title>` is legal and yields an empty title.
pub fn extract_title(html: &str) -> Result<String, PublishError> {
    let caps = TITLE_TAG.captures(html).ok_or_else(|| {
        PublishError::MalformedContent("page has no <title> element".into())
    })?;
    let raw = caps.get(1).map(|m| m.as_str()).unwrap_or("");
    Ok(WHITESPACE.replace_all(raw.trim(), " ").into_owned())
}

/// Default description derived from the title.
pub fn derive_description(title: &str) -> String {
    if title.is_empty() {
        "A page".to_string()
    } else {
        format!("A page about {title}")
    }
}

/// Split a comma-separated tag list, dropping empties.
pub fn normalize_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

fn escape(s: &str) -> String {
    s.replace('<', "&lt;").replace('>', "&gt;")
}

/// Escape angle brackets in every descriptive field. Output contains no
/// `<` or `>`, so applying this twice equals applying it once.
pub fn sanitize(meta: MetaData) -> MetaData {
    MetaData {
        title: escape(&meta.title),
        description: escape(&meta.description),
        author: escape(&meta.author),
        locale: escape(&meta.locale),
        thumbnail: meta.thumbnail.map(|t| escape(&t)),
        tags: meta.tags.iter().map(|t| escape(t)).collect(),
    }
}

/// Assemble the full metadata for a request: extract the title from the
/// markup, fill the remaining fields from the request or defaults, then
/// sanitize the lot.
pub fn process(
    html: &str,
    req: &PublishRequest,
    session: &Session,
) -> Result<MetaData, PublishError> {
    let title = extract_title(html)?;
    let description = req
        .description
        .clone()
        .unwrap_or_else(|| derive_description(&title));
    let author = req.author.clone().unwrap_or_else(|| session.username.clone());
    let locale = req.locale.clone().unwrap_or_else(|| "en-US".to_string());
    let tags = req.tags.as_deref().map(normalize_tags).unwrap_or_default();

    Ok(sanitize(MetaData {
        title,
        description,
        author,
        locale,
        thumbnail: req.thumbnail.clone(),
        tags,
    }))
}
