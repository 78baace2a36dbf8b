use crate::config::{ConfigError, CoordinatorConfig};
use crate::island::{Island, IslandApi, IslandError, IslandRegistry};
use crate::shutdown::Shutdown;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

pub mod collector;
pub mod convergence;
pub mod dispatcher;
pub mod initializer;
pub mod migration;

#[cfg(test)]
pub(crate) mod testing;

use convergence::{ConvergenceMonitor, Verdict};

/// A fitness value together with the island that reported it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IslandFitness {
    pub island: Island,
    pub fitness: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    Converged,
    Stalled,
    /// Ran every cycle allowed by the ceiling.
    CycleCeiling,
    Shutdown,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub cycles_run: usize,
    pub total_generations: usize,
    pub stop_reason: StopReason,
    /// `None` if no island ever answered an evolve call.
    pub global_best: Option<f64>,
    /// Filled by the final status sweep, when enabled.
    pub best_island: Option<IslandFitness>,
    pub elapsed: Duration,
}

/// Drives the island fleet: one readiness handshake, then
/// dispatch, convergence check and ring migration per cycle.
pub struct Coordinator<C: IslandApi> {
    client: Arc<C>,
    registry: IslandRegistry,
    config: CoordinatorConfig,
    shutdown: Shutdown,
}

impl<C: IslandApi> Coordinator<C> {
    pub fn new(
        client: Arc<C>,
        config: CoordinatorConfig,
        shutdown: Shutdown,
    ) -> Result<Self, ConfigError> {
        let registry = IslandRegistry::new(&config.islands)?;
        Ok(Coordinator {
            client,
            registry,
            config,
            shutdown,
        })
    }

    /// Runs the whole search. Only fails if shutdown is requested before every
    /// island has come online.
    pub async fn run(&self) -> Result<RunSummary, IslandError> {
        let run_id = Uuid::new_v4();
        self.run_inner(run_id)
            .instrument(info_span!("run", %run_id))
            .await
    }

    async fn run_inner(&self, run_id: Uuid) -> Result<RunSummary, IslandError> {
        let config = &self.config;
        info!(
            islands = self.registry.len(),
            generations_per_cycle = config.generations_per_cycle,
            max_cycles = config.max_cycles,
            policy = ?config.stopping_policy,
            "Starting coordinator"
        );

        info!("Phase 1: initializing islands");
        initializer::initialize(
            self.client.as_ref(),
            &self.registry,
            config.init_retry_delay,
            config.deadlines.init_call,
            &self.shutdown,
        )
        .await?;

        info!("Phase 2: distributed optimization");
        let started = Instant::now();
        let mut monitor = ConvergenceMonitor::new(config.stopping_policy);
        let mut stop_reason = StopReason::CycleCeiling;
        let mut cycles_run = 0;

        for cycle in 1..=config.max_cycles {
            if self.shutdown.is_triggered() {
                stop_reason = StopReason::Shutdown;
                break;
            }
            let span = info_span!("cycle", cycle);
            info!(
                parent: &span,
                from_generation = (cycle - 1) * config.generations_per_cycle,
                to_generation = cycle * config.generations_per_cycle,
                "Dispatching cycle"
            );

            let aggregate = dispatcher::run_cycle(
                Arc::clone(&self.client),
                &self.registry,
                config.generations_per_cycle,
                &config.deadlines,
                &self.shutdown,
            )
            .instrument(span.clone())
            .await;
            if self.shutdown.is_triggered() {
                stop_reason = StopReason::Shutdown;
                break;
            }
            cycles_run = cycle;

            let previous_best = monitor.global_best();
            let verdict = monitor.evaluate(aggregate.fitness());
            info!(
                parent: &span,
                cycle_best = ?aggregate.best.as_ref().map(|b| b.fitness),
                previous_best = ?previous_best,
                responded = aggregate.responded,
                ?verdict,
                "Cycle evaluated"
            );
            match verdict {
                Verdict::Converged => {
                    info!(parent: &span, "Improvement below tolerance, stopping");
                    stop_reason = StopReason::Converged;
                    break;
                }
                Verdict::Stalled => {
                    info!(parent: &span, "No improvement, stopping");
                    stop_reason = StopReason::Stalled;
                    break;
                }
                Verdict::Continue => {}
            }

            let report = migration::migrate_ring(
                self.client.as_ref(),
                &self.registry,
                &config.deadlines,
                &self.shutdown,
            )
            .instrument(span.clone())
            .await;
            info!(
                parent: &span,
                forwarded = report.forwarded,
                pull_failures = report.pull_failures,
                push_failures = report.push_failures,
                skipped = report.skipped,
                "Migration round complete"
            );
        }

        let best_island = if config.collect_results && !self.shutdown.is_triggered() {
            info!("Phase 3: collecting final island status");
            collector::collect_best(
                self.client.as_ref(),
                &self.registry,
                &config.deadlines,
                &self.shutdown,
            )
            .await
        } else {
            None
        };

        let summary = RunSummary {
            run_id,
            cycles_run,
            total_generations: cycles_run * config.generations_per_cycle,
            stop_reason,
            global_best: monitor.global_best(),
            best_island,
            elapsed: started.elapsed(),
        };
        if summary.global_best.is_none() {
            warn!("No island reported a fitness during the run");
        }
        info!(
            cycles = summary.cycles_run,
            total_generations = summary.total_generations,
            stop_reason = ?summary.stop_reason,
            global_best = ?summary.global_best,
            elapsed = ?summary.elapsed,
            "Optimization finished"
        );
        Ok(summary)
    }
}
