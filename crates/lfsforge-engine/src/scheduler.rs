//! Scheduler: computes the topological order over a
//! target set plus its transitive dependencies, then fans dispatch out
//! across a bounded worker pool while respecting the dependency DAG's
//! ready-set. A package's failure blocks its dependents but never
//! cancels independent branches.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Condvar, Mutex};

use lfsforge_core::LoadError;
use lfsforge_recipe::model::Recipe;
use lfsforge_recipe::store::RecipeStore;

use crate::outcome::{StepError, StepOutcome};

/// Terminal per-package outcome of one `Scheduler::run` call, as
/// recorded for reporting to the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetResult {
    Ok,
    /// The step itself reported a non-failure skip (already satisfied,
    /// or the `(phase, pkg)` lock was busy).
    Skipped(String),
    Failed(String),
    /// A transitive dependency of this package ended non-`ok`; this
    /// package was never dispatched.
    Blocked,
}

impl TargetResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, TargetResult::Ok)
    }
}

/// Bounded-concurrency worker pool over a recipe dependency DAG.
pub struct Scheduler {
    concurrency: usize,
}

struct Graph<'a> {
    recipes: Vec<&'a Recipe>,
    index_of: HashMap<&'a str, usize>,
    in_degree: Vec<usize>,
    /// `dependents[i]` lists the indices that depend on recipe `i`,
    /// restricted to the requested subset.
    dependents: Vec<Vec<usize>>,
}

impl<'a> Graph<'a> {
    fn build(recipes: Vec<&'a Recipe>) -> Self {
        let index_of: HashMap<&str, usize> = recipes
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.as_str(), i))
            .collect();

        let mut in_degree = vec![0usize; recipes.len()];
        let mut dependents = vec![Vec::new(); recipes.len()];
        for (i, recipe) in recipes.iter().enumerate() {
            for dep in &recipe.depends {
                if let Some(&dep_idx) = index_of.get(dep.as_str()) {
                    in_degree[i] += 1;
                    dependents[dep_idx].push(i);
                }
            }
        }

        Self {
            recipes,
            index_of,
            in_degree,
            dependents,
        }
    }
}

struct Shared {
    ready: VecDeque<usize>,
    in_degree: Vec<usize>,
    results: Vec<Option<TargetResult>>,
    /// Count of packages not yet given a terminal result (dispatched,
    /// waiting in `ready`, or still blocked on a predecessor).
    pending: usize,
    in_flight: usize,
}

impl Scheduler {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// `schedule(targets, concurrency)`: `store` resolves
    /// `targets` plus their transitive dependencies into the DAG this
    /// scheduler dispatches over; `work` is invoked once per package, on
    /// a worker thread, once every dependency has ended `Ok`.
    pub fn run<F>(
        &self,
        store: &RecipeStore,
        targets: &[String],
        work: F,
    ) -> Result<HashMap<String, TargetResult>, LoadError>
    where
        F: Fn(&Recipe) -> Result<StepOutcome, StepError> + Send + Sync,
    {
        let names = transitive_closure(store, targets)?;
        let recipes = store.topological(&names)?;
        let graph = Graph::build(recipes);

        let initial_ready: VecDeque<usize> = graph
            .in_degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| i)
            .collect();

        let shared = Mutex::new(Shared {
            ready: initial_ready,
            in_degree: graph.in_degree.clone(),
            results: vec![None; graph.recipes.len()],
            pending: graph.recipes.len(),
            in_flight: 0,
        });
        let cond = Condvar::new();
        let worker_count = self.concurrency.min(graph.recipes.len().max(1));

        std::thread::scope(|scope| {
            for _ in 0..worker_count {
                scope.spawn(|| self.worker_loop(&graph, &shared, &cond, &work));
            }
        });

        let shared = shared.into_inner().expect("scheduler mutex poisoned");
        Ok(graph
            .recipes
            .iter()
            .enumerate()
            .map(|(i, r)| {
                (
                    r.name.clone(),
                    shared.results[i].clone().unwrap_or(TargetResult::Blocked),
                )
            })
            .collect())
    }

    fn worker_loop<F>(&self, graph: &Graph, shared: &Mutex<Shared>, cond: &Condvar, work: &F)
    where
        F: Fn(&Recipe) -> Result<StepOutcome, StepError> + Send + Sync,
    {
        loop {
            let idx = {
                let mut guard = shared.lock().expect("scheduler mutex poisoned");
                loop {
                    if let Some(idx) = guard.ready.pop_front() {
                        guard.in_flight += 1;
                        break Some(idx);
                    }
                    if guard.pending == 0 {
                        break None;
                    }
                    guard = cond.wait(guard).expect("scheduler mutex poisoned");
                }
            };

            let Some(idx) = idx else { break };
            let recipe = graph.recipes[idx];
            let result = match work(recipe) {
                Ok(StepOutcome::Done | StepOutcome::AlreadySatisfied) => TargetResult::Ok,
                Ok(StepOutcome::Locked) => TargetResult::Skipped("locked".to_string()),
                Ok(StepOutcome::Skipped(reason)) => TargetResult::Skipped(reason),
                Err(e) => TargetResult::Failed(e.to_string()),
            };

            let mut guard = shared.lock().expect("scheduler mutex poisoned");
            guard.in_flight -= 1;
            guard.pending -= 1;
            let ok = result.is_ok();
            guard.results[idx] = Some(result);

            if ok {
                for &dep_idx in &graph.dependents[idx] {
                    guard.in_degree[dep_idx] -= 1;
                    if guard.in_degree[dep_idx] == 0 {
                        guard.ready.push_back(dep_idx);
                    }
                }
            } else {
                block_all_dependents(graph, &mut guard, idx);
            }
            cond.notify_all();
        }
    }
}

/// Recursively marks every transitive dependent of a failed/blocked
/// package `Blocked` and removes it from `pending`, so the scheduler
/// never dispatches it.
fn block_all_dependents(graph: &Graph, guard: &mut Shared, idx: usize) {
    let mut queue: VecDeque<usize> = graph.dependents[idx].iter().copied().collect();
    let mut seen: HashSet<usize> = HashSet::new();
    while let Some(dep_idx) = queue.pop_front() {
        if !seen.insert(dep_idx) {
            continue;
        }
        if guard.results[dep_idx].is_some() {
            continue;
        }
        guard.results[dep_idx] = Some(TargetResult::Blocked);
        guard.pending -= 1;
        for &next in &graph.dependents[dep_idx] {
            queue.push_back(next);
        }
    }
}

/// `targets ∪ transitive_dependencies(targets)`.
fn transitive_closure(store: &RecipeStore, targets: &[String]) -> Result<Vec<String>, LoadError> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = targets.iter().cloned().collect();
    while let Some(name) = queue.pop_front() {
        if !seen.insert(name.clone()) {
            continue;
        }
        let recipe = store.find(&name)?;
        for dep in &recipe.depends {
            if !seen.contains(dep) {
                queue.push_back(dep.clone());
            }
        }
    }
    Ok(seen.into_iter().collect())
}
