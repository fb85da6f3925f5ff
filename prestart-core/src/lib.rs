//! # Prestart Core
//!
//! Bootstrap orchestration for a multi-dependency backend.
//!
//! ## Overview
//!
//! Brings a freshly started process from "container just started" to "ready
//! to serve traffic":
//!
//! - **Dependency probes**: bounded, deadline-driven polling of the cache,
//!   relational store and document store until each answers its native ping
//! - **Migrations**: one all-or-nothing "upgrade schema to latest" step
//! - **Schema verification**: a cheap presence check after migrations
//! - **Seeding**: idempotent creation of baseline records, safe to re-run
//!
//! The orchestrator enforces strict stage ordering: migrations never run
//! while a dependency is unhealthy, and seeding never runs against a schema
//! that has not been migrated. Any failure is fatal to the whole run.
//!
//! ## Architecture
//!
//! The migration and seed tools are reached through the [`SchemaMigrator`]
//! and [`SeedStore`] traits so the orchestrator can be exercised against
//! doubles. Production implementations use:
//! - sqlx/PostgreSQL for schema and relational seed data
//! - redis for the cache ping
//! - mongodb for the document store ping and collection setup

pub mod error;
pub mod migrate;
pub mod orchestrator;
pub mod probe;
pub mod seed;

pub use error::BootstrapError;
pub use migrate::{SchemaMigrator, SqlxMigrator};
pub use orchestrator::{
    BootstrapOrchestrator, BootstrapRun, Outcome, Probe, Stage,
};
pub use probe::{
    DependencyTarget, HealthCheck, MongoHealth, PostgresHealth, RedisHealth,
    wait_until_ready,
};
pub use seed::{AdminSeed, MongoSeeder, PostgresSeeder, SeedStore};
