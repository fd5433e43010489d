//! Title slugs and duplicate-title disambiguation.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::db::repo::{self, Pool};
use crate::error::PublishError;

static NON_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("slug regex"));

/// Lowercase a title and collapse every run of non-alphanumeric characters
/// into a single hyphen. `"My Cats!"` becomes `"my-cats"`.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    NON_SLUG
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Decide the duplicate-title disambiguator for a freshly written project.
///
/// Must run after the project row is written: the count includes the new
/// row, so the first duplicate of an existing title sees a count of 2 and
/// lands at `slug-2`. Edits keep their URL and never get a disambiguator,
/// and an empty title has nothing to collide with.
pub async fn disambiguate(
    pool: &Pool,
    user_id: &str,
    title: &str,
    is_edit: bool,
) -> Result<Option<i64>, PublishError> {
    if is_edit || title.is_empty() {
        return Ok(None);
    }
    let count = repo::count_projects_by_title(pool, user_id, title).await?;
    if count > 1 {
        Ok(Some(count))
    } else {
        Ok(None)
    }
}
