use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use hackpub::catalog::{self, CatalogClient, CatalogFields, CatalogService, SearchFilter};
use hackpub::model::Project;
use hackpub::{config, db, meta};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Verify that every published project has a matching catalog record"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Re-sync projects whose catalog record is missing or disagrees
    #[arg(long)]
    fix: bool,
}

/// Rebuild record fields from what the project row stores. Author and tags
/// are request-time data the row does not keep, so a repaired record starts
/// without them.
fn fields_from_project(project: &Project) -> CatalogFields {
    CatalogFields {
        email: project.user_id.clone(),
        url: project.url.clone().unwrap_or_default(),
        title: project.title.clone(),
        description: meta::derive_description(&project.title),
        author: String::new(),
        locale: "en-US".into(),
        tags: vec![],
        thumbnail: None,
        remixed_from: project.remixed_from.clone(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| cfg.database.url.clone());

    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    let catalog_client = CatalogClient::from_config(&cfg)?;

    let projects = db::list_published_projects(&pool).await?;
    info!(projects = projects.len(), "checking published projects");

    let mut missing = 0usize;
    let mut duplicated = 0usize;
    let mut fixed = 0usize;

    for project in &projects {
        let Some(url) = project.url.as_deref() else {
            continue;
        };
        let matches = catalog_client
            .search(&SearchFilter {
                email: Some(project.user_id.clone()),
                url: url.to_string(),
            })
            .await?;

        match matches.len() {
            1 => {}
            0 => {
                missing += 1;
                warn!(
                    project_id = project.id,
                    owner = %project.user_id,
                    url = %url,
                    "no catalog record for published project"
                );
                if args.fix {
                    catalog::sync(
                        &catalog_client,
                        &project.user_id,
                        url,
                        fields_from_project(project),
                    )
                    .await?;
                    fixed += 1;
                    info!(project_id = project.id, "catalog record created");
                }
            }
            n => {
                duplicated += 1;
                warn!(
                    project_id = project.id,
                    owner = %project.user_id,
                    url = %url,
                    records = n,
                    "multiple catalog records for one page"
                );
            }
        }
    }

    info!(
        checked = projects.len(),
        missing,
        duplicated,
        fixed,
        "catalog check complete"
    );
    Ok(())
}
