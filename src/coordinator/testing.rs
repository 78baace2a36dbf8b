//! In-memory islands driven by a script, for exercising the coordinator
//! without a network.

use crate::island::{
    EvolveReport, Island, IslandApi, IslandError, IslandRegistry, MigrantSet, StatusReport,
};
use futures::{future::BoxFuture, FutureExt};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Init(String),
    Evolve(String, usize),
    Pull(String),
    Push { to: String, genes: Vec<Vec<f64>> },
    Status(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Step {
    Fitness(f64),
    Fail,
    Hang,
}

#[derive(Default)]
struct Script {
    init_failures: HashMap<String, usize>,
    init_hangs: HashMap<String, usize>,
    evolve: HashMap<String, VecDeque<Step>>,
    migrants: HashMap<String, MigrantSet>,
    pull_failures: HashSet<String>,
    push_failures: HashSet<String>,
    status: HashMap<String, f64>,
    calls: Vec<Call>,
}

#[derive(Clone)]
pub(crate) struct ScriptedIslands {
    registry: IslandRegistry,
    script: Arc<Mutex<Script>>,
}

impl ScriptedIslands {
    pub(crate) fn new<const N: usize>(addresses: [&str; N]) -> Self {
        ScriptedIslands {
            registry: IslandRegistry::new(addresses).unwrap(),
            script: Arc::new(Mutex::new(Script::default())),
        }
    }

    pub(crate) fn registry(&self) -> &IslandRegistry {
        &self.registry
    }

    pub(crate) fn fail_init(&self, address: &str, times: usize) {
        self.script
            .lock()
            .unwrap()
            .init_failures
            .insert(address.into(), times);
    }

    pub(crate) fn hang_init(&self, address: &str, times: usize) {
        self.script
            .lock()
            .unwrap()
            .init_hangs
            .insert(address.into(), times);
    }

    /// Steps are consumed one per evolve call; the last one repeats.
    pub(crate) fn script_evolve(&self, address: &str, steps: impl IntoIterator<Item = Step>) {
        self.script
            .lock()
            .unwrap()
            .evolve
            .insert(address.into(), steps.into_iter().collect());
    }

    pub(crate) fn set_migrants(&self, address: &str, genes: Vec<Vec<f64>>) {
        self.script
            .lock()
            .unwrap()
            .migrants
            .insert(address.into(), MigrantSet::new(genes).unwrap());
    }

    pub(crate) fn fail_pull(&self, address: &str) {
        self.script
            .lock()
            .unwrap()
            .pull_failures
            .insert(address.into());
    }

    pub(crate) fn fail_push(&self, address: &str) {
        self.script
            .lock()
            .unwrap()
            .push_failures
            .insert(address.into());
    }

    pub(crate) fn set_status(&self, address: &str, fitness: f64) {
        self.script
            .lock()
            .unwrap()
            .status
            .insert(address.into(), fitness);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.script.lock().unwrap().calls.clone()
    }

    pub(crate) fn count_calls(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.script
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|call| predicate(call))
            .count()
    }

    fn record(&self, call: Call) -> std::sync::MutexGuard<'_, Script> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(call);
        script
    }
}

fn take_one(counter: Option<&mut usize>) -> bool {
    match counter {
        Some(remaining) if *remaining > 0 => {
            *remaining -= 1;
            true
        }
        _ => false,
    }
}

impl IslandApi for ScriptedIslands {
    fn init<'a>(&'a self, island: &'a Island) -> BoxFuture<'a, Result<(), IslandError>> {
        let (hang, fail) = {
            let mut script = self.record(Call::Init(island.address().into()));
            let hang = take_one(script.init_hangs.get_mut(island.address()));
            let fail = !hang && take_one(script.init_failures.get_mut(island.address()));
            (hang, fail)
        };
        async move {
            if hang {
                futures::future::pending::<()>().await;
            }
            if fail {
                return Err(IslandError::Status { code: 503 });
            }
            Ok(())
        }
        .boxed()
    }

    fn evolve<'a>(
        &'a self,
        island: &'a Island,
        generations: usize,
    ) -> BoxFuture<'a, Result<EvolveReport, IslandError>> {
        let step = {
            let mut script =
                self.record(Call::Evolve(island.address().into(), generations));
            script.evolve.get_mut(island.address()).and_then(|steps| {
                if steps.len() > 1 {
                    steps.pop_front()
                } else {
                    steps.front().copied()
                }
            })
        };
        async move {
            match step {
                Some(Step::Fitness(fitness)) => Ok(EvolveReport {
                    status: "evolved".into(),
                    current_best_fitness: fitness,
                }),
                Some(Step::Hang) => futures::future::pending().await,
                Some(Step::Fail) | None => Err(IslandError::Status { code: 500 }),
            }
        }
        .boxed()
    }

    fn pull_migrants<'a>(
        &'a self,
        island: &'a Island,
    ) -> BoxFuture<'a, Result<MigrantSet, IslandError>> {
        let outcome = {
            let script = self.record(Call::Pull(island.address().into()));
            if script.pull_failures.contains(island.address()) {
                Err(IslandError::Status { code: 500 })
            } else {
                Ok(script
                    .migrants
                    .get(island.address())
                    .cloned()
                    .unwrap_or_else(|| {
                        MigrantSet::new(vec![vec![island.position() as f64; 2]]).unwrap()
                    }))
            }
        };
        async move { outcome }.boxed()
    }

    fn push_migrants<'a>(
        &'a self,
        island: &'a Island,
        migrants: &'a MigrantSet,
    ) -> BoxFuture<'a, Result<(), IslandError>> {
        let fail = {
            let script = self.record(Call::Push {
                to: island.address().into(),
                genes: migrants.genes().to_vec(),
            });
            script.push_failures.contains(island.address())
        };
        async move {
            if fail {
                Err(IslandError::Status { code: 500 })
            } else {
                Ok(())
            }
        }
        .boxed()
    }

    fn status<'a>(
        &'a self,
        island: &'a Island,
    ) -> BoxFuture<'a, Result<StatusReport, IslandError>> {
        let fitness = {
            let script = self.record(Call::Status(island.address().into()));
            script.status.get(island.address()).copied()
        };
        async move {
            fitness
                .map(|fitness| StatusReport { fitness })
                .ok_or(IslandError::Status { code: 404 })
        }
        .boxed()
    }
}
