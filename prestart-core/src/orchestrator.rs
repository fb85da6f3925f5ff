//! The bootstrap state machine.
//!
//! One [`BootstrapOrchestrator::run`] call walks the stages
//! `Init → ProbingDependencies → Migrating → VerifyingSchema → Seeding →
//! Ready` in order, stopping at the first failure. The observed startup
//! scripts expressed this as a chain of shell invocations held together by
//! `set -e`; here the ordering invariants are explicit and testable against
//! doubles for the migration and seed tools.

use std::{fmt, sync::Arc};

use futures::future::try_join_all;
use tracing::{error, info};

use crate::{
    error::BootstrapError,
    migrate::SchemaMigrator,
    probe::{DependencyTarget, HealthCheck, wait_until_ready},
    seed::SeedStore,
};

/// Stages of a bootstrap run, in the only order they may occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Process start; no work done yet.
    Init,
    /// Waiting for every configured dependency to report healthy.
    ProbingDependencies,
    /// Upgrading persisted schema to the latest revision.
    Migrating,
    /// Cheap schema-presence check after migrations.
    VerifyingSchema,
    /// Ensuring baseline data exists.
    Seeding,
    /// Bootstrap complete; the process may hand off to the server.
    Ready,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::ProbingDependencies => "probing-dependencies",
            Stage::Migrating => "migrating",
            Stage::VerifyingSchema => "verifying-schema",
            Stage::Seeding => "seeding",
            Stage::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// Terminal result of a bootstrap run.
#[derive(Debug)]
pub enum Outcome {
    /// The run is still in progress.
    Pending,
    /// Every stage completed; the process may serve traffic.
    Succeeded,
    /// A stage failed; the run stopped there.
    Failed {
        /// Stage that was active when the failure occurred.
        stage: Stage,
        /// What went wrong.
        cause: BootstrapError,
    },
}

/// One end-to-end execution of the startup sequence.
///
/// Created per process start, mutated only by the orchestrator, discarded on
/// exit. Records every stage entered, in order, for observability and tests.
#[derive(Debug)]
pub struct BootstrapRun {
    visited: Vec<Stage>,
    outcome: Outcome,
}

impl BootstrapRun {
    fn new() -> Self {
        info!(stage = %Stage::Init, "bootstrap starting");
        Self {
            visited: vec![Stage::Init],
            outcome: Outcome::Pending,
        }
    }

    fn enter(&mut self, stage: Stage) {
        info!(stage = %stage, "entering stage");
        self.visited.push(stage);
    }

    fn succeed(&mut self) {
        self.enter(Stage::Ready);
        self.outcome = Outcome::Succeeded;
        info!("bootstrap complete");
    }

    fn fail(&mut self, cause: BootstrapError) {
        let stage = self.current_stage();
        error!(stage = %stage, error = %cause, "bootstrap failed");
        self.outcome = Outcome::Failed { stage, cause };
    }

    /// Stage the run is currently in (or stopped in).
    pub fn current_stage(&self) -> Stage {
        *self.visited.last().unwrap_or(&Stage::Init)
    }

    /// Every stage entered so far, in order.
    pub fn visited(&self) -> &[Stage] {
        &self.visited
    }

    /// Terminal outcome of the run.
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// True once the run reached `Ready`.
    pub fn is_ready(&self) -> bool {
        matches!(self.outcome, Outcome::Succeeded)
    }
}

/// A dependency target paired with the health check that probes it.
pub struct Probe {
    /// What to wait for and how long.
    pub target: DependencyTarget,
    /// The ping implementation for this dependency.
    pub check: Arc<dyn HealthCheck>,
}

impl Probe {
    /// Pair a target with its health check.
    pub fn new(target: DependencyTarget, check: Arc<dyn HealthCheck>) -> Self {
        Self { target, check }
    }
}

impl fmt::Debug for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Probe").field("target", &self.target).finish()
    }
}

/// Sequences probes, migrations, schema verification and seeding.
pub struct BootstrapOrchestrator {
    probes: Vec<Probe>,
    migrator: Arc<dyn SchemaMigrator>,
    seeders: Vec<Arc<dyn SeedStore>>,
}

impl fmt::Debug for BootstrapOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapOrchestrator")
            .field("probes", &self.probes)
            .field("seeders", &self.seeders.len())
            .finish()
    }
}

impl BootstrapOrchestrator {
    /// Assemble an orchestrator from its collaborators.
    pub fn new(
        probes: Vec<Probe>,
        migrator: Arc<dyn SchemaMigrator>,
        seeders: Vec<Arc<dyn SeedStore>>,
    ) -> Self {
        Self {
            probes,
            migrator,
            seeders,
        }
    }

    /// Execute the full bootstrap sequence.
    ///
    /// Never panics; failures are recorded in the returned [`BootstrapRun`].
    /// Probes run concurrently since their order among each other carries no
    /// meaning; every later stage strictly follows the one before it.
    pub async fn run(&self) -> BootstrapRun {
        let mut run = BootstrapRun::new();

        run.enter(Stage::ProbingDependencies);
        let waits = self
            .probes
            .iter()
            .map(|probe| wait_until_ready(&probe.target, probe.check.as_ref()));
        if let Err(cause) = try_join_all(waits).await {
            run.fail(cause);
            return run;
        }

        run.enter(Stage::Migrating);
        if let Err(cause) = self.migrator.apply_migrations().await {
            run.fail(cause);
            return run;
        }

        run.enter(Stage::VerifyingSchema);
        if let Err(cause) = self.migrator.verify_schema().await {
            run.fail(cause);
            return run;
        }

        run.enter(Stage::Seeding);
        for seeder in &self.seeders {
            info!(store = %seeder.name(), "ensuring seed data");
            if let Err(cause) = seeder.ensure_seed_data().await {
                run.fail(cause);
                return run;
            }
        }

        run.succeed();
        run
    }
}
