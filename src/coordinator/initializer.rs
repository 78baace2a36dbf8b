use crate::island::{guarded, IslandApi, IslandError, IslandRegistry};
use crate::shutdown::Shutdown;
use std::time::Duration;
use tracing::{info, warn};

/// Blocks until every island has acknowledged an init request.
///
/// Islands are brought up one at a time, in registry order. A failed attempt
/// (transport error, non-success status, or the per-attempt deadline) is
/// retried against the same island after `retry_delay`, with no ceiling on the
/// number of attempts. The only way out without every island online is a
/// shutdown request, reported as [`IslandError::Cancelled`].
pub async fn initialize<C>(
    client: &C,
    registry: &IslandRegistry,
    retry_delay: Duration,
    attempt_deadline: Duration,
    shutdown: &Shutdown,
) -> Result<(), IslandError>
where
    C: IslandApi + ?Sized,
{
    for island in registry {
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            match guarded(client.init(island), attempt_deadline, shutdown).await {
                Ok(()) => {
                    info!(island = %island, attempt, "Island online");
                    break;
                }
                Err(IslandError::Cancelled) => return Err(IslandError::Cancelled),
                Err(e) => {
                    warn!(
                        island = %island,
                        attempt,
                        error = %e,
                        "Island unavailable, retrying in {:?}",
                        retry_delay
                    );
                    tokio::select! {
                        biased;
                        _ = shutdown.triggered() => return Err(IslandError::Cancelled),
                        _ = tokio::time::sleep(retry_delay) => {}
                    }
                }
            }
        }
    }
    Ok(())
}
