use super::IslandFitness;
use crate::config::Deadlines;
use crate::island::{guarded, IslandApi, IslandRegistry};
use crate::shutdown::Shutdown;
use futures::future::join_all;
use tracing::{info, warn};

/// Polls every island's status and returns the best fitness found, with the
/// island that reported it. Islands whose query fails are left out; ties go to
/// the island that comes first in the registry.
pub async fn collect_best<C>(
    client: &C,
    registry: &IslandRegistry,
    deadlines: &Deadlines,
    shutdown: &Shutdown,
) -> Option<IslandFitness>
where
    C: IslandApi + ?Sized,
{
    let answers = join_all(registry.iter().map(|island| async move {
        let outcome = guarded(client.status(island), deadlines.island_call, shutdown).await;
        (island, outcome)
    }))
    .await;

    let mut best: Option<IslandFitness> = None;
    for (island, outcome) in answers {
        match outcome {
            Ok(report) if report.fitness.is_nan() => {
                warn!(island = %island, "Status reported a NaN fitness, skipping");
            }
            Ok(report) => {
                info!(island = %island, fitness = report.fitness, "Final island status");
                if best.as_ref().map_or(true, |b| report.fitness > b.fitness) {
                    best = Some(IslandFitness {
                        island: island.clone(),
                        fitness: report.fitness,
                    });
                }
            }
            Err(e) => {
                warn!(island = %island, error = %e, "Status query failed, skipping island");
            }
        }
    }
    best
}
