use crate::config::StoppingPolicy;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Starting value of the global best: finite, and below any fitness an island
/// can report.
pub const UNSET_FITNESS: f64 = f64::MIN;
/// Cycle aggregate when no island answered; strictly below [`UNSET_FITNESS`].
pub const NO_RESPONSE_FITNESS: f64 = f64::NEG_INFINITY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Continue,
    Converged,
    Stalled,
}

/// Tracks the global best across cycles and decides when the search is done.
#[derive(Debug, Clone)]
pub struct ConvergenceMonitor {
    policy: StoppingPolicy,
    global_best: f64,
    cycle_index: usize,
}

impl ConvergenceMonitor {
    pub fn new(policy: StoppingPolicy) -> Self {
        ConvergenceMonitor {
            policy,
            global_best: UNSET_FITNESS,
            cycle_index: 0,
        }
    }

    /// Feeds one cycle's aggregate and returns what the loop should do next.
    ///
    /// Under [`StoppingPolicy::ConvergenceTolerance`]:
    /// - a cycle that beats the global best by less than the tolerance stops the
    ///   search as converged, except on the first cycle;
    /// - a cycle that does not beat it at all (equal included) stops the search
    ///   as stalled, on any cycle including the first.
    ///
    /// The global best only ever moves up, whatever the policy.
    pub fn evaluate(&mut self, cycle_best: f64) -> Verdict {
        self.cycle_index += 1;
        let improvement = cycle_best - self.global_best;
        let improved = cycle_best > self.global_best;
        if improved {
            self.global_best = cycle_best;
        }

        let verdict = match self.policy {
            StoppingPolicy::FixedCycles => Verdict::Continue,
            StoppingPolicy::ConvergenceTolerance { tolerance } => {
                if !improved {
                    Verdict::Stalled
                } else if self.cycle_index > 1 && improvement < tolerance {
                    Verdict::Converged
                } else {
                    Verdict::Continue
                }
            }
        };
        debug!(
            cycle = self.cycle_index,
            cycle_best,
            improvement,
            ?verdict,
            "Convergence check"
        );
        verdict
    }

    /// `None` until some cycle has produced a real fitness.
    pub fn global_best(&self) -> Option<f64> {
        (self.global_best > UNSET_FITNESS).then_some(self.global_best)
    }

    pub fn cycles_evaluated(&self) -> usize {
        self.cycle_index
    }
}
