//! End-to-end orchestrator behavior against hand-rolled fakes.

use std::{
    collections::BTreeSet,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use prestart_core::{
    BootstrapError, BootstrapOrchestrator, DependencyTarget, HealthCheck,
    Outcome, Probe, SchemaMigrator, SeedStore, Stage,
};

/// Becomes healthy after a configurable number of failed pings.
struct RecoveringCheck {
    healthy_after: usize,
    pings: AtomicUsize,
}

impl RecoveringCheck {
    fn new(healthy_after: usize) -> Self {
        Self {
            healthy_after,
            pings: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl HealthCheck for RecoveringCheck {
    async fn ping(&self) -> anyhow::Result<()> {
        let ping = self.pings.fetch_add(1, Ordering::SeqCst);
        if ping < self.healthy_after {
            anyhow::bail!("not up yet");
        }
        Ok(())
    }
}

#[derive(Default)]
struct FakeMigrator {
    applies: AtomicUsize,
    fail_apply: bool,
}

#[async_trait]
impl SchemaMigrator for FakeMigrator {
    async fn apply_migrations(&self) -> Result<(), BootstrapError> {
        self.applies.fetch_add(1, Ordering::SeqCst);
        if self.fail_apply {
            return Err(BootstrapError::Migration {
                output: "exit status 1".into(),
            });
        }
        Ok(())
    }

    async fn verify_schema(&self) -> Result<(), BootstrapError> {
        // Schema is present iff migrations were applied at least once.
        if self.applies.load(Ordering::SeqCst) == 0 {
            return Err(BootstrapError::SchemaVerification(
                "no migrations applied".into(),
            ));
        }
        Ok(())
    }
}

/// In-memory stand-in for a store seeded by natural key.
#[derive(Default)]
struct FakeSeedStore {
    rows: Mutex<BTreeSet<String>>,
    calls: AtomicUsize,
}

#[async_trait]
impl SeedStore for FakeSeedStore {
    fn name(&self) -> &str {
        "fake"
    }

    async fn ensure_seed_data(&self) -> Result<(), BootstrapError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.lock().unwrap();
        if !rows.contains("admin@example.com") {
            rows.insert("admin@example.com".to_string());
        }
        Ok(())
    }
}

fn target(name: &str) -> DependencyTarget {
    DependencyTarget::new(
        name,
        "stub://",
        Duration::from_secs(1),
        Duration::from_secs(10),
    )
}

#[tokio::test(start_paused = true)]
async fn full_run_reaches_ready_once_all_dependencies_recover() {
    let probes = vec![
        Probe::new(target("cache"), Arc::new(RecoveringCheck::new(3))),
        Probe::new(target("db"), Arc::new(RecoveringCheck::new(1))),
        Probe::new(target("docs"), Arc::new(RecoveringCheck::new(0))),
    ];
    let migrator = Arc::new(FakeMigrator::default());
    let seeder = Arc::new(FakeSeedStore::default());

    let orchestrator = BootstrapOrchestrator::new(
        probes,
        migrator.clone(),
        vec![seeder.clone()],
    );

    let run = orchestrator.run().await;
    assert!(run.is_ready());
    assert_eq!(
        run.visited(),
        &[
            Stage::Init,
            Stage::ProbingDependencies,
            Stage::Migrating,
            Stage::VerifyingSchema,
            Stage::Seeding,
            Stage::Ready,
        ]
    );
    assert_eq!(migrator.applies.load(Ordering::SeqCst), 1);
    assert_eq!(seeder.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn seeding_twice_leaves_identical_state() {
    let seeder = FakeSeedStore::default();

    seeder.ensure_seed_data().await.unwrap();
    let after_first = seeder.rows.lock().unwrap().clone();

    seeder.ensure_seed_data().await.unwrap();
    let after_second = seeder.rows.lock().unwrap().clone();

    assert_eq!(after_first, after_second);
    assert_eq!(after_second.len(), 1);
    assert_eq!(seeder.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn one_slow_dependency_fails_the_whole_run() {
    // "docs" never recovers within its 10s deadline.
    let probes = vec![
        Probe::new(target("cache"), Arc::new(RecoveringCheck::new(0))),
        Probe::new(target("db"), Arc::new(RecoveringCheck::new(0))),
        Probe::new(target("docs"), Arc::new(RecoveringCheck::new(usize::MAX))),
    ];
    let migrator = Arc::new(FakeMigrator::default());
    let seeder = Arc::new(FakeSeedStore::default());

    let orchestrator = BootstrapOrchestrator::new(
        probes,
        migrator.clone(),
        vec![seeder.clone()],
    );

    let run = orchestrator.run().await;
    match run.outcome() {
        Outcome::Failed { stage, cause } => {
            assert_eq!(*stage, Stage::ProbingDependencies);
            match cause {
                BootstrapError::Timeout { target, .. } => {
                    assert_eq!(target, "docs")
                }
                other => panic!("expected Timeout, got {other:?}"),
            }
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(migrator.applies.load(Ordering::SeqCst), 0);
    assert_eq!(seeder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn migration_failure_keeps_every_seeder_untouched() {
    let probes = vec![Probe::new(target("db"), Arc::new(RecoveringCheck::new(0)))];
    let migrator = Arc::new(FakeMigrator {
        fail_apply: true,
        ..Default::default()
    });
    let first = Arc::new(FakeSeedStore::default());
    let second = Arc::new(FakeSeedStore::default());

    let orchestrator = BootstrapOrchestrator::new(
        probes,
        migrator,
        vec![first.clone(), second.clone()],
    );

    let run = orchestrator.run().await;
    assert!(!run.is_ready());
    assert_eq!(first.calls.load(Ordering::SeqCst), 0);
    assert_eq!(second.calls.load(Ordering::SeqCst), 0);
}
