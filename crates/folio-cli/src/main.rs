use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use folio_client::Engine;
use folio_core::{
    CatalogStore, CrawlConfig, CrawlJob, JobManager, JobStatus, JobStore, MemoryCatalogStore,
    MemoryJobStore,
};
use folio_db::{Database, DatabaseConfig};

#[derive(Parser)]
#[command(name = "folio", version, about = "Catalog crawler for online bookshops")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl a category listing and its product pages
    Crawl {
        /// Category listing URL to start from
        #[arg(short, long)]
        url: String,

        /// Rendering engine: "http" or "browser"
        #[arg(short, long, env = "FOLIO_RENDERER", default_value = "http")]
        engine: String,

        /// Persist the job and the catalog to PostgreSQL (requires DATABASE_URL)
        #[arg(long, default_value_t = false)]
        save: bool,

        /// Override FOLIO_MAX_REQUESTS for this run
        #[arg(long)]
        max_requests: Option<usize>,

        /// Allow targets on private or loopback addresses
        #[arg(long, default_value_t = false)]
        allow_private: bool,
    },

    /// Show one crawl job
    Job {
        /// Crawl job ID
        #[arg(short, long)]
        id: Uuid,
    },

    /// List recent crawl jobs
    Jobs {
        /// Only jobs in this status (PENDING, RUNNING, COMPLETED, FAILED)
        #[arg(short, long)]
        status: Option<String>,

        /// Number of jobs to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("folio=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Crawl {
            url,
            engine,
            save,
            max_requests,
            allow_private,
        } => {
            let mut config = CrawlConfig::from_env()?;
            if let Some(max) = max_requests {
                config = config.with_max_requests(max);
            }
            let mut engine = Engine::named(&engine, config.request_timeout)?;
            if allow_private {
                engine = engine.allow_private_urls();
            }
            tracing::info!(engine = engine.name(), "Starting crawl of {url}");

            if save {
                let db = connect_db().await?;
                // Orphan recovery belongs to the server; a live server may own RUNNING rows.
                let manager = JobManager::new(db.job_repo(), engine, db.product_repo(), config);
                let job = cmd_crawl(&manager, &url).await?;
                let products = db.product_repo().count().await?;
                tracing::info!(products, "Catalog size after crawl");
                print_json(&job)?;
            } else {
                let store = MemoryCatalogStore::new();
                let manager =
                    JobManager::new(MemoryJobStore::new(), engine, store.clone(), config);
                let job = cmd_crawl(&manager, &url).await?;
                print_json(&serde_json::json!({
                    "job": job,
                    "products": store.products(),
                }))?;
            }
        }
        Commands::Job { id } => {
            let db = connect_db().await?;
            match db.job_repo().get_job(id).await? {
                Some(job) => print_json(&job)?,
                None => anyhow::bail!("Crawl job not found: {id}"),
            }
        }
        Commands::Jobs { status, limit } => {
            let status = status
                .map(|s| s.parse::<JobStatus>().map_err(anyhow::Error::msg))
                .transpose()?;
            let db = connect_db().await?;
            cmd_jobs(&db, status, limit).await?;
        }
    }

    Ok(())
}

/// Connect to PostgreSQL using DATABASE_URL and apply migrations.
async fn connect_db() -> Result<Database> {
    let config = DatabaseConfig::from_env()
        .context("DATABASE_URL not set. Required for --save, job and jobs commands.")?;
    let db = Database::connect(&config)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await?;
    Ok(db)
}

/// Start a job and wait for it, cancelling the crawl on CTRL+C.
async fn cmd_crawl<J, S>(manager: &JobManager<J, Engine, S>, url: &str) -> Result<CrawlJob>
where
    J: JobStore + 'static,
    S: CatalogStore + 'static,
{
    let job = manager.start_job(url).await?;
    tracing::info!(job_id = %job.id, "Crawl job started");

    tokio::select! {
        _ = manager.drain() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, stopping crawl");
            manager.shutdown().await;
        }
    }

    let job = manager
        .get_job(job.id)
        .await?
        .with_context(|| format!("Crawl job {} disappeared", job.id))?;

    match job.status {
        JobStatus::Completed => {
            tracing::info!(items_found = job.items_found, "Crawl completed")
        }
        _ => tracing::warn!(
            status = %job.status,
            error = job.error.as_deref().unwrap_or(""),
            "Crawl did not complete"
        ),
    }

    Ok(job)
}

async fn cmd_jobs(db: &Database, status: Option<JobStatus>, limit: usize) -> Result<()> {
    let jobs = db.job_repo().list_jobs(status, limit.clamp(1, 100)).await?;

    if jobs.is_empty() {
        println!("No crawl jobs found");
        return Ok(());
    }

    for job in &jobs {
        println!(
            "  [{}] {} {} (items: {}, started: {}){}",
            job.status,
            job.id,
            job.target_url,
            job.items_found,
            job.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            job.error
                .as_deref()
                .map(|e| format!(" error: {e}"))
                .unwrap_or_default(),
        );
    }

    println!("\nTotal: {} jobs", jobs.len());

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
