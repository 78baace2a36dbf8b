use crate::config::Deadlines;
use crate::island::{guarded, IslandApi, IslandError, IslandRegistry};
use crate::shutdown::Shutdown;
use tokio::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Pairs whose migrants reached the successor.
    pub forwarded: usize,
    pub pull_failures: usize,
    pub push_failures: usize,
    /// Pairs never attempted because the round ran out of time or shutdown fired.
    pub skipped: usize,
}

/// One ring round: every island's migrants are pulled and pushed, unchanged,
/// to its successor.
///
/// Pairs are handled one after the other in registry order. A failed pull
/// skips that pair, a failed push is only logged; either way the round moves
/// on, so a partially exchanged ring is a normal outcome.
pub async fn migrate_ring<C>(
    client: &C,
    registry: &IslandRegistry,
    deadlines: &Deadlines,
    shutdown: &Shutdown,
) -> MigrationReport
where
    C: IslandApi + ?Sized,
{
    let round_deadline = Instant::now() + deadlines.round;
    let mut report = MigrationReport::default();

    for (index, (source, destination)) in registry.ring_pairs().enumerate() {
        let remaining = round_deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() || shutdown.is_triggered() {
            report.skipped = registry.len() - index;
            warn!(
                skipped = report.skipped,
                "Migration round cut short, remaining pairs skipped"
            );
            break;
        }
        let call_deadline = deadlines.island_call.min(remaining);

        let migrants = match guarded(client.pull_migrants(source), call_deadline, shutdown).await
        {
            Ok(migrants) => migrants,
            Err(e) => {
                warn!(
                    source = %source,
                    destination = %destination,
                    error = %e,
                    "Could not pull migrants, skipping pair"
                );
                report.pull_failures += 1;
                continue;
            }
        };

        let remaining = round_deadline.saturating_duration_since(Instant::now());
        let call_deadline = deadlines.island_call.min(remaining);
        match guarded(
            client.push_migrants(destination, &migrants),
            call_deadline,
            shutdown,
        )
        .await
        {
            Ok(()) => {
                debug!(
                    source = %source,
                    destination = %destination,
                    migrants = migrants.len(),
                    "Migrants forwarded"
                );
                report.forwarded += 1;
            }
            Err(e) => {
                if !matches!(e, IslandError::Cancelled) {
                    warn!(
                        source = %source,
                        destination = %destination,
                        error = %e,
                        "Could not push migrants"
                    );
                }
                report.push_failures += 1;
            }
        }
    }
    report
}
