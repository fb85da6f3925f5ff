//! # Prestart
//!
//! Container pre-start binary. Run it as the first step of the entrypoint,
//! before the application server: it waits for the cache, relational store
//! and document store to come up, applies schema migrations, verifies the
//! schema and ensures baseline data exists. Exit code `0` means the stack
//! is ready to serve traffic; anything else means the deployment must not
//! proceed.

mod config;

use std::{process::ExitCode, sync::Arc, time::Duration};

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::future::try_join_all;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use prestart_core::{
    BootstrapOrchestrator, DependencyTarget, MongoHealth, MongoSeeder,
    Outcome, PostgresHealth, PostgresSeeder, Probe, RedisHealth,
    SchemaMigrator, SeedStore, SqlxMigrator, wait_until_ready,
};

use crate::config::Settings;

/// Exit code used when a shutdown signal aborts the bootstrap.
const EXIT_INTERRUPTED: u8 = 130;

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "prestart")]
#[command(
    about = "Bring a multi-dependency backend from container start to ready: probe, migrate, verify, seed"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Wait for every configured dependency to report healthy, then exit
    Probe,
    /// Wait for the relational store, then apply and verify migrations
    Migrate,
    /// Wait for the stores and ensure baseline data is present
    Seed,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(err) => {
            tracing::error!(error = %err, "configuration invalid, refusing to start");
            return ExitCode::FAILURE;
        }
    };

    let work = async {
        match cli.command {
            None => return run_bootstrap(&settings).await,
            Some(Command::Probe) => run_probe(&settings).await?,
            Some(Command::Migrate) => run_migrate(&settings).await?,
            Some(Command::Seed) => run_seed(&settings).await?,
        }
        Ok(ExitCode::SUCCESS)
    };

    tokio::select! {
        result = work => match result {
            Ok(code) => code,
            Err(err) => {
                tracing::error!(error = %err, "bootstrap aborted");
                ExitCode::FAILURE
            }
        },
        _ = shutdown_signal() => {
            warn!("shutdown signal received, aborting bootstrap");
            ExitCode::from(EXIT_INTERRUPTED)
        }
    }
}

/// The full startup sequence: probes, migrations, verification, seeding.
async fn run_bootstrap(settings: &Settings) -> anyhow::Result<ExitCode> {
    let (pool, database) = database_probe(settings)?;
    let cache = cache_probe(settings)?;
    let (mongo_client, documents) = document_probe(settings).await?;

    let migrator = Arc::new(SqlxMigrator::new(pool.clone()));

    let mut seeders: Vec<Arc<dyn SeedStore>> = vec![Arc::new(
        PostgresSeeder::new(pool, settings.admin.clone()),
    )];
    if settings.mongo_init {
        seeders.push(Arc::new(MongoSeeder::new(
            mongo_client,
            settings.mongo_db.clone(),
        )));
    } else {
        info!("document-store seeding disabled via MONGO_INIT");
    }

    let orchestrator = BootstrapOrchestrator::new(
        vec![cache, database, documents],
        migrator,
        seeders,
    );

    let run = orchestrator.run().await;
    match run.outcome() {
        Outcome::Succeeded => {
            info!("stack is ready, handing off to the server");
            Ok(ExitCode::SUCCESS)
        }
        // The orchestrator already logged the stage and cause.
        _ => Ok(ExitCode::FAILURE),
    }
}

/// Dependency probes only.
async fn run_probe(settings: &Settings) -> anyhow::Result<()> {
    let (_pool, database) = database_probe(settings)?;
    let cache = cache_probe(settings)?;
    let (_client, documents) = document_probe(settings).await?;

    let probes = [cache, database, documents];
    try_join_all(
        probes
            .iter()
            .map(|probe| wait_until_ready(&probe.target, probe.check.as_ref())),
    )
    .await?;

    info!("all dependencies healthy");
    Ok(())
}

/// Wait for the relational store, then migrate and verify.
async fn run_migrate(settings: &Settings) -> anyhow::Result<()> {
    let (pool, database) = database_probe(settings)?;
    wait_until_ready(&database.target, database.check.as_ref()).await?;

    let migrator = SqlxMigrator::new(pool);
    migrator
        .apply_migrations()
        .await
        .context("schema migration failed")?;
    migrator
        .verify_schema()
        .await
        .context("schema verification failed")?;

    info!("migrations applied and verified");
    Ok(())
}

/// Wait for the stores, verify the schema, then seed.
async fn run_seed(settings: &Settings) -> anyhow::Result<()> {
    let (pool, database) = database_probe(settings)?;
    wait_until_ready(&database.target, database.check.as_ref()).await?;

    SqlxMigrator::new(pool.clone())
        .verify_schema()
        .await
        .context("schema must be migrated before seeding")?;

    let mut seeders: Vec<Arc<dyn SeedStore>> = vec![Arc::new(
        PostgresSeeder::new(pool, settings.admin.clone()),
    )];
    if settings.mongo_init {
        let (client, documents) = document_probe(settings).await?;
        wait_until_ready(&documents.target, documents.check.as_ref()).await?;
        seeders.push(Arc::new(MongoSeeder::new(
            client,
            settings.mongo_db.clone(),
        )));
    }

    for seeder in &seeders {
        info!(store = %seeder.name(), "ensuring seed data");
        seeder.ensure_seed_data().await?;
    }

    info!("seed data present");
    Ok(())
}

fn database_probe(settings: &Settings) -> anyhow::Result<(sqlx::PgPool, Probe)> {
    // Lazy pool: the probe's SELECT 1 drives the first real connection.
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy(&settings.database_url)
        .context("invalid PostgreSQL connection URL")?;

    let target = DependencyTarget::new(
        "database",
        settings.database_url.clone(),
        settings.poll_interval,
        settings.database_max_wait,
    );
    let check = Arc::new(PostgresHealth::new(pool.clone()));
    Ok((pool, Probe::new(target, check)))
}

fn cache_probe(settings: &Settings) -> anyhow::Result<Probe> {
    let check = RedisHealth::new(&settings.redis_url)
        .context("invalid Redis connection URL")?;
    let target = DependencyTarget::new(
        "cache",
        settings.redis_url.clone(),
        settings.poll_interval,
        settings.redis_max_wait,
    );
    Ok(Probe::new(target, Arc::new(check)))
}

async fn document_probe(
    settings: &Settings,
) -> anyhow::Result<(mongodb::Client, Probe)> {
    let client = mongodb::Client::with_uri_str(&settings.mongo_url)
        .await
        .context("invalid MongoDB connection URL")?;

    let target = DependencyTarget::new(
        "document-store",
        settings.mongo_url.clone(),
        settings.poll_interval,
        settings.mongo_max_wait,
    );
    let check = Arc::new(MongoHealth::new(client.clone()));
    Ok((client, Probe::new(target, check)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
