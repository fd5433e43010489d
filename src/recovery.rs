//! Recovery worker: finishes publishes that failed past the project write.
//!
//! Each queued job targets exactly the stage that failed. An object-store
//! job re-puts the page, records its URL, and runs the catalog sync that
//! never got its turn; a catalog job re-runs the sync alone. Jobs are
//! deleted on success and backed off on failure.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::catalog::{self, CatalogFields, CatalogService};
use crate::db::repo::{self, Pool};
use crate::store::{ObjectStore, HTML_CONTENT_TYPE};

/// Catalog work carried by every job: sync inputs are kept verbatim so a
/// retry converges on the same record the original publish aimed at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogJob {
    pub owner_email: String,
    pub lookup_url: String,
    pub fields: CatalogFields,
}

/// A repair job, tagged by the stage that failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum RetryJob {
    /// The page never reached the store: put it, record its URL, then sync.
    ObjectStore {
        object_key: String,
        published_url: String,
        catalog: CatalogJob,
    },
    /// The page is live; only the catalog record is missing or stale.
    Catalog(CatalogJob),
}

impl RetryJob {
    pub fn stage(&self) -> &'static str {
        match self {
            RetryJob::ObjectStore { .. } => "object_store",
            RetryJob::Catalog(_) => "catalog",
        }
    }
}

async fn run_job(
    pool: &Pool,
    store: &dyn ObjectStore,
    catalog: &dyn CatalogService,
    project_id: i64,
    job: &RetryJob,
) -> Result<()> {
    match job {
        RetryJob::ObjectStore {
            object_key,
            published_url,
            catalog: catalog_job,
        } => {
            let project = repo::find_project(pool, project_id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("project {project_id} vanished"))?;
            store
                .put(object_key, &project.sanitized_html, HTML_CONTENT_TYPE)
                .await?;
            repo::update_project_url(pool, project_id, &project.user_id, published_url).await?;
            catalog::sync(
                catalog,
                &catalog_job.owner_email,
                &catalog_job.lookup_url,
                catalog_job.fields.clone(),
            )
            .await?;
            Ok(())
        }
        RetryJob::Catalog(catalog_job) => {
            catalog::sync(
                catalog,
                &catalog_job.owner_email,
                &catalog_job.lookup_url,
                catalog_job.fields.clone(),
            )
            .await?;
            Ok(())
        }
    }
}

/// Pick up the next due repair job and run it. Returns whether a job was
/// found, so callers can tell an empty queue from a processed task.
#[instrument(skip_all)]
pub async fn process_next_task(
    pool: &Pool,
    store: &dyn ObjectStore,
    catalog: &dyn CatalogService,
    max_backoff_secs: i64,
) -> Result<bool> {
    let Some(task) = repo::next_due_retry(pool).await? else {
        return Ok(false);
    };

    let job: RetryJob = match serde_json::from_str(&task.payload) {
        Ok(job) => job,
        Err(err) => {
            // An undecodable payload can never succeed; drop it.
            warn!(id = task.id, %err, "dropping unreadable repair job");
            repo::delete_retry(pool, task.id).await?;
            return Ok(true);
        }
    };

    if repo::find_project(pool, task.project_id).await?.is_none() {
        info!(
            id = task.id,
            project_id = task.project_id,
            "project gone; cancelling repair job"
        );
        repo::delete_retry(pool, task.id).await?;
        return Ok(true);
    }

    match run_job(pool, store, catalog, task.project_id, &job).await {
        Ok(()) => {
            repo::delete_retry(pool, task.id).await?;
            info!(
                id = task.id,
                project_id = task.project_id,
                stage = job.stage(),
                "repair job succeeded"
            );
        }
        Err(err) => {
            warn!(
                ?err,
                id = task.id,
                project_id = task.project_id,
                stage = job.stage(),
                attempt = task.attempt,
                "repair job failed; backoff"
            );
            repo::backoff_retry(pool, task.id, task.attempt, max_backoff_secs).await?;
        }
    }
    Ok(true)
}
