//! The publish coordinator: one request-scoped pass through every stage.
//!
//! Stage order is fixed: metadata processing, operation resolution, project
//! write, title disambiguation, addressing, object-store put, URL
//! finalization, catalog sync. A failure at any stage ends the pass; a
//! failure after the project write also leaves a repair job behind so the
//! recovery worker can finish the publish.

use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::catalog::{self, CatalogFields, CatalogService};
use crate::config::PublishConfig;
use crate::db::model::WriteProject;
use crate::db::repo::{self, Pool};
use crate::error::PublishError;
use crate::location;
use crate::meta;
use crate::model::{PageOperation, PublishIntent, PublishRequest, PublishResult, Session};
use crate::recovery::{CatalogJob, RetryJob};
use crate::resolve::{self, Resolution};
use crate::slug;
use crate::store::{ObjectStore, HTML_CONTENT_TYPE};

pub struct Publisher {
    pool: Pool,
    store: Arc<dyn ObjectStore>,
    catalog: Arc<dyn CatalogService>,
    cfg: PublishConfig,
}

impl Publisher {
    pub fn new(
        pool: Pool,
        store: Arc<dyn ObjectStore>,
        catalog: Arc<dyn CatalogService>,
        cfg: PublishConfig,
    ) -> Self {
        Self {
            pool,
            store,
            catalog,
            cfg,
        }
    }

    pub fn config(&self) -> &PublishConfig {
        &self.cfg
    }

    fn build_intent(
        &self,
        session: &Session,
        req: &PublishRequest,
    ) -> Result<PublishIntent, PublishError> {
        if req.html.trim().is_empty() {
            return Err(PublishError::Validation("page content is empty".into()));
        }
        let metadata = meta::process(&req.html, req, session)?;
        let sanitized_html = req
            .sanitized_html
            .clone()
            .unwrap_or_else(|| req.html.clone());
        Ok(PublishIntent {
            request_id: Uuid::new_v4(),
            operation: req.operation,
            origin_id: req.origin_id,
            html: req.html.clone(),
            sanitized_html,
            metadata,
        })
    }

    fn catalog_fields(
        &self,
        session: &Session,
        intent: &PublishIntent,
        resolution: &Resolution,
        published_url: &str,
    ) -> CatalogFields {
        CatalogFields {
            email: session.email.clone(),
            url: published_url.to_string(),
            title: intent.metadata.title.clone(),
            description: intent.metadata.description.clone(),
            author: intent.metadata.author.clone(),
            locale: intent.metadata.locale.clone(),
            tags: intent.metadata.tags.clone(),
            thumbnail: intent.metadata.thumbnail.clone(),
            remixed_from: resolution.remixed_from.clone(),
        }
    }

    /// Record a repair job for the failed stage. Enqueue failures are
    /// logged and dropped so they never mask the publish error itself.
    async fn schedule_retry(&self, publish_id: i64, job: &RetryJob) {
        let payload = match serde_json::to_string(job) {
            Ok(p) => p,
            Err(err) => {
                warn!(publish_id, %err, "failed to encode repair job");
                return;
            }
        };
        match repo::enqueue_retry(&self.pool, publish_id, job.stage(), &payload).await {
            Ok(_) => info!(publish_id, stage = job.stage(), "queued publish repair"),
            Err(err) => warn!(publish_id, %err, "failed to queue publish repair"),
        }
    }

    /// Run one publish end to end.
    #[instrument(skip_all)]
    pub async fn publish(
        &self,
        session: &Session,
        req: &PublishRequest,
    ) -> Result<PublishResult, PublishError> {
        let intent = self.build_intent(session, req)?;
        let request_id = intent.request_id;
        info!(
            %request_id,
            user = %session.email,
            title = %intent.metadata.title,
            "publish requested"
        );

        let resolution = resolve::resolve(
            &self.pool,
            intent.operation,
            intent.origin_id,
            session,
            &intent.metadata.title,
        )
        .await?;
        let is_edit = resolution.operation == PageOperation::Edit;

        let publish_id = repo::write_project(
            &self.pool,
            &WriteProject {
                user_id: &session.email,
                title: &intent.metadata.title,
                raw_html: &intent.html,
                sanitized_html: &intent.sanitized_html,
                edit: is_edit,
                origin: intent.origin_id,
                remixed_from: resolution.remixed_from.as_deref(),
            },
        )
        .await?;

        let disambiguator =
            slug::disambiguate(&self.pool, &session.email, &intent.metadata.title, is_edit)
                .await?;
        let slug = slug::slugify(&intent.metadata.title);
        let address = location::page_address(
            &self.cfg,
            &session.username,
            &slug,
            disambiguator,
            publish_id,
        )?;
        let storage_url = self.store.url_for(&address.object_key);
        let published_url = address
            .custom_url
            .clone()
            .unwrap_or_else(|| storage_url.clone());

        // Edits that rename a page are found in the catalog under the URL
        // they had before the rename.
        let lookup_url = resolution
            .old_url
            .clone()
            .unwrap_or_else(|| published_url.clone());
        let catalog_job = CatalogJob {
            owner_email: session.email.clone(),
            lookup_url: lookup_url.clone(),
            fields: self.catalog_fields(session, &intent, &resolution, &published_url),
        };

        if let Err(err) = self
            .store
            .put(&address.object_key, &intent.sanitized_html, HTML_CONTENT_TYPE)
            .await
        {
            warn!(%request_id, publish_id, %err, "object store put failed");
            self.schedule_retry(
                publish_id,
                &RetryJob::ObjectStore {
                    object_key: address.object_key.clone(),
                    published_url: published_url.clone(),
                    catalog: catalog_job,
                },
            )
            .await;
            return Err(err.into_publish_error(publish_id));
        }

        repo::update_project_url(&self.pool, publish_id, &session.email, &published_url).await?;

        match catalog::sync(
            self.catalog.as_ref(),
            &session.email,
            &lookup_url,
            catalog_job.fields.clone(),
        )
        .await
        {
            Ok(outcome) => {
                info!(%request_id, record = outcome.record_id(), "catalog in sync");
            }
            Err(err) => {
                warn!(%request_id, publish_id, %err, "catalog sync failed");
                self.schedule_retry(publish_id, &RetryJob::Catalog(catalog_job))
                    .await;
                return Err(PublishError::CatalogSync {
                    publish_id,
                    published_url,
                    reason: err.to_string(),
                });
            }
        }

        info!(%request_id, publish_id, url = %published_url, "page published");
        Ok(PublishResult {
            publish_id,
            operation: resolution.operation,
            page_title: intent.metadata.title.clone(),
            page_title_count: disambiguator,
            publish_location: address.publish_location,
            storage_url,
            custom_url: address.custom_url,
            published_url,
            old_url: resolution.old_url,
        })
    }

    /// Remove a project the requester owns. The stored object and catalog
    /// record are left to housekeeping.
    #[instrument(skip_all)]
    pub async fn unpublish(&self, session: &Session, publish_id: i64) -> Result<(), PublishError> {
        repo::destroy_project(&self.pool, publish_id, &session.email).await?;
        info!(user = %session.email, publish_id, "project destroyed");
        Ok(())
    }
}
