use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_GENERATIONS_PER_CYCLE: usize = 30;
pub const DEFAULT_MAX_CYCLES: usize = 100;
pub const DEFAULT_CONVERGENCE_TOLERANCE: f64 = 0.001;
pub const DEFAULT_INIT_RETRY_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_INIT_CALL_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_ISLAND_CALL_TIMEOUT: Duration = Duration::from_secs(600);
pub const DEFAULT_ROUND_TIMEOUT: Duration = Duration::from_secs(1800);

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("No islands configured. Set ISLANDS to a comma-separated list of island URLs.")]
    NoIslands,
    #[error("Invalid value `{value}` for `{key}`")]
    InvalidValue { key: &'static str, value: String },
    #[error("Unknown stopping policy `{0}`, expected `convergence` or `fixed`")]
    UnknownPolicy(String),
    #[error("Invalid island address: `{0}`")]
    InvalidAddress(String),
}

/// When the cycle loop is allowed to stop before hitting the cycle ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoppingPolicy {
    /// Run every cycle up to the ceiling; never stop early.
    FixedCycles,
    /// Stop as soon as a cycle improves the global best by less than `tolerance`
    /// (from the second cycle on), or does not improve it at all.
    ConvergenceTolerance { tolerance: f64 },
}

impl Default for StoppingPolicy {
    fn default() -> Self {
        StoppingPolicy::ConvergenceTolerance {
            tolerance: DEFAULT_CONVERGENCE_TOLERANCE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Deadlines {
    /// Per-attempt bound on an init call.
    pub init_call: Duration,
    /// Per-call bound on evolve, migrant and status calls.
    pub island_call: Duration,
    /// Bound on a whole dispatch or migration round.
    pub round: Duration,
}

impl Default for Deadlines {
    fn default() -> Self {
        Deadlines {
            init_call: DEFAULT_INIT_CALL_TIMEOUT,
            island_call: DEFAULT_ISLAND_CALL_TIMEOUT,
            round: DEFAULT_ROUND_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Island base URLs; the order is the ring order.
    pub islands: Vec<String>,
    pub generations_per_cycle: usize,
    pub max_cycles: usize,
    pub stopping_policy: StoppingPolicy,
    /// Poll every island's status once the loop ends.
    pub collect_results: bool,
    pub init_retry_delay: Duration,
    pub deadlines: Deadlines,
}

impl CoordinatorConfig {
    /// Defaults for everything but the island list.
    pub fn with_islands(islands: Vec<String>) -> Self {
        CoordinatorConfig {
            islands,
            generations_per_cycle: DEFAULT_GENERATIONS_PER_CYCLE,
            max_cycles: DEFAULT_MAX_CYCLES,
            stopping_policy: StoppingPolicy::default(),
            collect_results: true,
            init_retry_delay: DEFAULT_INIT_RETRY_DELAY,
            deadlines: Deadlines::default(),
        }
    }

    /// Reads the process environment, after loading a `.env` file if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let islands = split_islands(&lookup("ISLANDS").unwrap_or_default());
        if islands.is_empty() {
            return Err(ConfigError::NoIslands);
        }

        let generations_per_cycle = parse_positive(
            &lookup,
            "GENERATIONS_PER_CYCLE",
            DEFAULT_GENERATIONS_PER_CYCLE,
        )?;
        let max_cycles = parse_positive(&lookup, "MAX_CYCLES", DEFAULT_MAX_CYCLES)?;

        let tolerance: f64 = parse_or(&lookup, "CONVERGENCE_TOL", DEFAULT_CONVERGENCE_TOLERANCE)?;
        if !tolerance.is_finite() || tolerance < 0. {
            return Err(ConfigError::InvalidValue {
                key: "CONVERGENCE_TOL",
                value: tolerance.to_string(),
            });
        }
        let stopping_policy = match lookup("STOPPING_POLICY")
            .map(|raw| raw.trim().to_ascii_lowercase())
            .as_deref()
        {
            None | Some("") | Some("convergence") => {
                StoppingPolicy::ConvergenceTolerance { tolerance }
            }
            Some("fixed") => StoppingPolicy::FixedCycles,
            Some(other) => return Err(ConfigError::UnknownPolicy(other.to_string())),
        };

        let collect_results = match lookup("COLLECT_RESULTS") {
            None => true,
            Some(raw) => parse_flag(&raw).ok_or(ConfigError::InvalidValue {
                key: "COLLECT_RESULTS",
                value: raw,
            })?,
        };

        let init_retry_delay = Duration::from_millis(parse_positive(
            &lookup,
            "INIT_RETRY_DELAY_MS",
            DEFAULT_INIT_RETRY_DELAY.as_millis() as u64,
        )?);
        let deadlines = Deadlines {
            init_call: Duration::from_secs(parse_positive(
                &lookup,
                "INIT_CALL_TIMEOUT_SECS",
                DEFAULT_INIT_CALL_TIMEOUT.as_secs(),
            )?),
            island_call: Duration::from_secs(parse_positive(
                &lookup,
                "ISLAND_CALL_TIMEOUT_SECS",
                DEFAULT_ISLAND_CALL_TIMEOUT.as_secs(),
            )?),
            round: Duration::from_secs(parse_positive(
                &lookup,
                "CYCLE_TIMEOUT_SECS",
                DEFAULT_ROUND_TIMEOUT.as_secs(),
            )?),
        };

        Ok(CoordinatorConfig {
            islands,
            generations_per_cycle,
            max_cycles,
            stopping_policy,
            collect_results,
            init_retry_delay,
            deadlines,
        })
    }
}

fn split_islands(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(String::from)
        .collect()
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}

fn parse_positive<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default + ToString,
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(lookup, key, default)?;
    if value <= T::default() {
        return Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        });
    }
    Ok(value)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
