use super::convergence::NO_RESPONSE_FITNESS;
use super::IslandFitness;
use crate::config::Deadlines;
use crate::island::{guarded, EvolveReport, Island, IslandApi, IslandError, IslandRegistry};
use crate::shutdown::Shutdown;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// What one dispatch round produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleAggregate {
    /// Best answer among islands that responded, `None` if nobody did.
    pub best: Option<IslandFitness>,
    pub responded: usize,
    pub failed: usize,
    /// Islands still running when the round deadline or shutdown cut it short.
    pub abandoned: usize,
}

impl CycleAggregate {
    /// The best fitness, or a sentinel below any valid score if nobody answered.
    pub fn fitness(&self) -> f64 {
        self.best
            .as_ref()
            .map_or(NO_RESPONSE_FITNESS, |best| best.fitness)
    }

    fn record(&mut self, island: Island, fitness: f64) {
        self.responded += 1;
        let improves = self
            .best
            .as_ref()
            .map_or(true, |best| fitness > best.fitness);
        if improves {
            self.best = Some(IslandFitness { island, fitness });
        }
    }
}

/// Tells every island to advance `generations` generations, concurrently, and
/// collects the best fitness any of them reports.
///
/// Each island gets its own task, and each task sends its single outcome over
/// one channel; only this function reads the channel, so the running maximum
/// has one owner. Failures are logged and excluded. The round returns once
/// every task has reported, or when `deadlines.round` elapses or shutdown is
/// requested, in which case the stragglers are aborted and left out.
pub async fn run_cycle<C>(
    client: Arc<C>,
    registry: &IslandRegistry,
    generations: usize,
    deadlines: &Deadlines,
    shutdown: &Shutdown,
) -> CycleAggregate
where
    C: IslandApi,
{
    let (tx, mut rx) =
        mpsc::channel::<(Island, Result<EvolveReport, IslandError>)>(registry.len());
    let round_deadline = Instant::now() + deadlines.round;

    let tasks: Vec<_> = registry
        .iter()
        .cloned()
        .map(|island| {
            let client = Arc::clone(&client);
            let tx = tx.clone();
            let shutdown = shutdown.clone();
            let call_deadline = deadlines.island_call;
            tokio::spawn(async move {
                let outcome =
                    guarded(client.evolve(&island, generations), call_deadline, &shutdown).await;
                // The receiver is only gone if the round was abandoned.
                let _ = tx.send((island, outcome)).await;
            })
        })
        .collect();
    drop(tx);

    let mut aggregate = CycleAggregate::default();
    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.triggered() => {
                warn!("Shutdown requested, abandoning dispatch round");
                break;
            }
            next = tokio::time::timeout_at(round_deadline, rx.recv()) => next,
        };
        match next {
            Ok(Some((island, Ok(report)))) => {
                if report.current_best_fitness.is_nan() {
                    warn!(island = %island, "Island reported a NaN fitness, excluding it");
                    aggregate.failed += 1;
                    continue;
                }
                info!(
                    island = %island,
                    status = %report.status,
                    fitness = report.current_best_fitness,
                    "Island finished its generations"
                );
                aggregate.record(island, report.current_best_fitness);
            }
            Ok(Some((island, Err(e)))) => {
                warn!(
                    island = %island,
                    error = %e,
                    "Evolve call failed, excluding island from this cycle"
                );
                aggregate.failed += 1;
            }
            Ok(None) => break,
            Err(_) => {
                warn!(
                    deadline = ?deadlines.round,
                    "Dispatch round deadline elapsed, excluding islands that have not answered"
                );
                break;
            }
        }
    }

    aggregate.abandoned = registry.len() - aggregate.responded - aggregate.failed;
    if aggregate.abandoned > 0 {
        for task in &tasks {
            task.abort();
        }
    }
    debug!(
        responded = aggregate.responded,
        failed = aggregate.failed,
        abandoned = aggregate.abandoned,
        "Dispatch round complete"
    );
    aggregate
}
