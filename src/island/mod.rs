use crate::shutdown::Shutdown;
use futures::future::BoxFuture;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

mod http;
mod registry;
mod wire;

pub use http::HttpIslandClient;
pub use registry::{Island, IslandRegistry};
pub use wire::{
    EvolveReport, MigrantEnvelope, MigrantSet, MigrantSetError, StatusReport,
    MIGRANT_SCHEMA_VERSION,
};

#[derive(Error, Debug)]
pub enum IslandError {
    #[error("Transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Island answered with status {code}")]
    Status { code: u16 },
    #[error("Undecodable response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Malformed migrant set: {0}")]
    MalformedMigrants(#[from] MigrantSetError),
    #[error("No answer within {0:?}")]
    Timeout(Duration),
    #[error("Cancelled by shutdown")]
    Cancelled,
}

/// The five calls the coordinator makes against an island.
///
/// Implementations only move requests and responses; deadlines and
/// cancellation are applied on top of them by [`guarded`].
pub trait IslandApi: Send + Sync + 'static {
    /// Readiness handshake. Must be safe to repeat on an island that is
    /// already initialized.
    fn init<'a>(&'a self, island: &'a Island) -> BoxFuture<'a, Result<(), IslandError>>;

    fn evolve<'a>(
        &'a self,
        island: &'a Island,
        generations: usize,
    ) -> BoxFuture<'a, Result<EvolveReport, IslandError>>;

    fn pull_migrants<'a>(&'a self, island: &'a Island)
        -> BoxFuture<'a, Result<MigrantSet, IslandError>>;

    fn push_migrants<'a>(
        &'a self,
        island: &'a Island,
        migrants: &'a MigrantSet,
    ) -> BoxFuture<'a, Result<(), IslandError>>;

    fn status<'a>(&'a self, island: &'a Island)
        -> BoxFuture<'a, Result<StatusReport, IslandError>>;
}

/// Runs one island call under a deadline, giving up early if shutdown fires.
pub async fn guarded<T, F>(
    call: F,
    deadline: Duration,
    shutdown: &Shutdown,
) -> Result<T, IslandError>
where
    F: Future<Output = Result<T, IslandError>>,
{
    tokio::select! {
        biased;
        _ = shutdown.triggered() => Err(IslandError::Cancelled),
        outcome = tokio::time::timeout(deadline, call) => {
            outcome.unwrap_or(Err(IslandError::Timeout(deadline)))
        }
    }
}
