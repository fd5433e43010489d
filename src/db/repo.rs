use super::model::{RetryTask, WriteProject};
use crate::error::PublishError;
use crate::model::Project;
use anyhow::Result;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::instrument;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized).await?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// If using a file-backed SQLite URL, expand a leading `~/` and ensure the
/// parent directory exists. Leaves in-memory URLs untouched.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = url["sqlite:".len()..].trim_start_matches("//");
    let (path, query) = match rest.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (rest, None),
    };
    if path.is_empty() {
        return url.to_string();
    }

    let expanded = match path.strip_prefix("~/") {
        Some(tail) => match std::env::var("HOME") {
            Ok(home) => format!("{}/{}", home.trim_end_matches('/'), tail),
            Err(_) => path.to_string(),
        },
        None => path.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    match query {
        Some(q) => format!("sqlite://{expanded}?{q}"),
        None => format!("sqlite://{expanded}"),
    }
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn row_to_project(row: &sqlx::sqlite::SqliteRow) -> Project {
    Project {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        raw_html: row.get("raw_html"),
        sanitized_html: row.get("sanitized_html"),
        url: row.try_get::<Option<String>, _>("url").ok().flatten(),
        origin_id: row.try_get::<Option<i64>, _>("origin_id").ok().flatten(),
        remixed_from: row
            .try_get::<Option<String>, _>("remixed_from")
            .ok()
            .flatten(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[instrument(skip_all)]
pub async fn find_project(pool: &Pool, id: i64) -> Result<Option<Project>, PublishError> {
    let row = sqlx::query(
        "SELECT id, user_id, title, raw_html, sanitized_html, url, origin_id, remixed_from, \
                created_at, updated_at \
         FROM projects WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.as_ref().map(row_to_project))
}

/// Persist one publish. Inserts a new row, or for edits updates the origin
/// row in place, and returns the id the publish now lives under.
#[instrument(skip_all)]
pub async fn write_project(pool: &Pool, w: &WriteProject<'_>) -> Result<i64, PublishError> {
    if w.edit {
        let origin = w.origin.ok_or_else(|| {
            PublishError::NotFound("edit requested without an origin project".into())
        })?;
        let affected = sqlx::query(
            "UPDATE projects SET title = ?, raw_html = ?, sanitized_html = ?, \
                    updated_at = CURRENT_TIMESTAMP \
             WHERE id = ? AND user_id = ?",
        )
        .bind(w.title)
        .bind(w.raw_html)
        .bind(w.sanitized_html)
        .bind(origin)
        .bind(w.user_id)
        .execute(pool)
        .await?
        .rows_affected();
        if affected == 0 {
            return Err(PublishError::NotFound(format!(
                "project {origin} not found for {}",
                w.user_id
            )));
        }
        return Ok(origin);
    }

    let rec = sqlx::query(
        "INSERT INTO projects (user_id, title, raw_html, sanitized_html, origin_id, remixed_from) \
         VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(w.user_id)
    .bind(w.title)
    .bind(w.raw_html)
    .bind(w.sanitized_html)
    .bind(w.origin)
    .bind(w.remixed_from)
    .fetch_one(pool)
    .await?;
    Ok(rec.get::<i64, _>("id"))
}

#[instrument(skip_all)]
pub async fn update_project_url(
    pool: &Pool,
    id: i64,
    user_id: &str,
    url: &str,
) -> Result<(), PublishError> {
    let affected = sqlx::query(
        "UPDATE projects SET url = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ? AND user_id = ?",
    )
    .bind(url)
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await?
    .rows_affected();
    if affected == 0 {
        return Err(PublishError::NotFound(format!(
            "project {id} not found for {user_id}"
        )));
    }
    Ok(())
}

/// How many projects this owner has under the given title, the freshly
/// written one included.
#[instrument(skip_all)]
pub async fn count_projects_by_title(
    pool: &Pool,
    user_id: &str,
    title: &str,
) -> Result<i64, PublishError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE user_id = ? AND title = ?")
            .bind(user_id)
            .bind(title)
            .fetch_one(pool)
            .await?;
    Ok(count)
}

#[instrument(skip_all)]
pub async fn destroy_project(pool: &Pool, id: i64, user_id: &str) -> Result<(), PublishError> {
    let affected = sqlx::query("DELETE FROM projects WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?
        .rows_affected();
    if affected == 0 {
        return Err(PublishError::NotFound(format!(
            "project {id} not found for {user_id}"
        )));
    }
    Ok(())
}

/// All projects that are live on the object store.
#[instrument(skip_all)]
pub async fn list_published_projects(pool: &Pool) -> Result<Vec<Project>, PublishError> {
    let rows = sqlx::query(
        "SELECT id, user_id, title, raw_html, sanitized_html, url, origin_id, remixed_from, \
                created_at, updated_at \
         FROM projects WHERE url IS NOT NULL ORDER BY id ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(row_to_project).collect())
}

#[instrument(skip_all)]
pub async fn enqueue_retry(
    pool: &Pool,
    project_id: i64,
    stage: &str,
    payload: &str,
) -> Result<i64, PublishError> {
    let rec = sqlx::query(
        "INSERT INTO publish_retries (project_id, stage, payload, attempt, due_at) \
         VALUES (?, ?, ?, 0, ?) RETURNING id",
    )
    .bind(project_id)
    .bind(stage)
    .bind(payload)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;
    Ok(rec.get("id"))
}

#[instrument(skip_all)]
pub async fn next_due_retry(pool: &Pool) -> Result<Option<RetryTask>, PublishError> {
    let row = sqlx::query(
        "SELECT id, project_id, stage, payload, attempt FROM publish_retries \
         WHERE datetime(due_at) <= CURRENT_TIMESTAMP ORDER BY datetime(due_at) ASC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|row| RetryTask {
        id: row.get("id"),
        project_id: row.get("project_id"),
        stage: row.get("stage"),
        payload: row.get("payload"),
        attempt: row.get("attempt"),
    }))
}

#[instrument(skip_all)]
pub async fn delete_retry(pool: &Pool, id: i64) -> Result<(), PublishError> {
    sqlx::query("DELETE FROM publish_retries WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn backoff_retry(
    pool: &Pool,
    id: i64,
    attempt: i32,
    max_cap_secs: i64,
) -> Result<(), PublishError> {
    // Exponential backoff: 5s * 2^attempt, capped.
    let secs = (5_i64) * (1_i64 << attempt.min(10));
    let cap = if max_cap_secs <= 0 { secs } else { max_cap_secs };
    let secs = secs.min(cap);
    sqlx::query(
        "UPDATE publish_retries SET attempt = ?, due_at = datetime('now', ? || ' seconds') \
         WHERE id = ?",
    )
    .bind(attempt + 1)
    .bind(secs)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn count_pending_retries(pool: &Pool) -> Result<i64, PublishError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM publish_retries")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
