//! Database write and view models used by repositories.
//!
//! Keep these structs focused on the data flowing through queries. Business
//! logic should live in higher layers.

/// Everything needed to persist one publish to the project store.
///
/// `edit` decides between updating the origin row in place and inserting a
/// new row; the resolver fills it in before the store is touched.
#[derive(Debug, Clone)]
pub struct WriteProject<'a> {
    pub user_id: &'a str,
    pub title: &'a str,
    pub raw_html: &'a str,
    pub sanitized_html: &'a str,
    /// Update the origin row instead of inserting a new one.
    pub edit: bool,
    /// Row this publish builds on (required for edits, lineage otherwise).
    pub origin: Option<i64>,
    /// Published URL of the page this one remixes.
    pub remixed_from: Option<&'a str>,
}

/// A queued repair job for a publish that failed partway.
#[derive(Debug, Clone)]
pub struct RetryTask {
    pub id: i64,
    pub project_id: i64,
    pub stage: String,
    /// JSON payload describing the work to redo.
    pub payload: String,
    pub attempt: i32,
}
