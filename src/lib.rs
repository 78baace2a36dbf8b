// Modules
pub mod config;
pub mod coordinator;
pub mod island;
pub mod market_data;
pub mod shutdown;

pub use config::{ConfigError, CoordinatorConfig, Deadlines, StoppingPolicy};
pub use coordinator::{Coordinator, IslandFitness, RunSummary, StopReason};
pub use island::{HttpIslandClient, Island, IslandApi, IslandError, IslandRegistry};
pub use shutdown::{Shutdown, ShutdownTrigger};
