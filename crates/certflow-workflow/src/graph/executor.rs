use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use certflow_core::error::{CertflowError, Result};

use super::edge::{ConditionalEdge, Edge};
use super::node::Node;
use super::state::GraphState;

/// Record of one node invocation.
#[derive(Debug, Clone)]
pub struct NodeRun {
    /// Which node was executed.
    pub node: String,
    /// 1-based position within its fan-out, for branch invocations.
    pub branch: Option<usize>,
    /// Execution time in milliseconds.
    pub elapsed_ms: u64,
}

/// Result of executing an entire graph.
#[derive(Debug, Clone)]
pub struct ExecutionResult<S> {
    /// The fully merged terminal state.
    pub state: S,
    /// Node invocations in merge order.
    pub node_runs: Vec<NodeRun>,
    /// Nodes with no outgoing transitions that ran.
    pub terminal_nodes: Vec<String>,
    /// Total execution time in milliseconds.
    pub total_elapsed_ms: u64,
}

impl<S> ExecutionResult<S> {
    /// How many times `node` ran (branches count individually).
    pub fn runs_of(&self, node: &str) -> usize {
        self.node_runs.iter().filter(|r| r.node == node).count()
    }
}

#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Upper bound on tasks running at once within a step.
    pub max_concurrency: usize,
    /// Deadline for each node invocation unless the node sets its own.
    pub node_timeout: Option<Duration>,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            node_timeout: None,
        }
    }
}

/// A scheduled invocation.
struct Task<B> {
    node: String,
    branch: Option<(usize, B)>,
}

/// Executes a compiled DAG.
///
/// The run proceeds in steps. Every task of a step receives its own copy of
/// the state (fan-out branches overlaid with their payload) and they run
/// concurrently on the tokio pool, bounded by `max_concurrency`. When all of
/// them finish, their updates are folded into the shared state strictly in
/// dispatch order, never completion order. Successors are then collected
/// from static edges and routers. A plain successor that is still reachable
/// from another pending task waits, so a join node runs once, after every
/// branch feeding it.
pub struct GraphExecutor<S: GraphState> {
    nodes: HashMap<String, Arc<Node<S>>>,
    edges: Vec<Edge>,
    routers: HashMap<String, ConditionalEdge<S>>,
    entry: String,
    descendants: HashMap<String, HashSet<String>>,
    options: ExecutorOptions,
}

impl<S: GraphState> GraphExecutor<S> {
    pub(crate) fn new(
        nodes: HashMap<String, Arc<Node<S>>>,
        edges: Vec<Edge>,
        routers: HashMap<String, ConditionalEdge<S>>,
        entry: String,
        descendants: HashMap<String, HashSet<String>>,
        options: ExecutorOptions,
    ) -> Self {
        Self {
            nodes,
            edges,
            routers,
            entry,
            descendants,
            options,
        }
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// True when `name` has neither static edges nor a router.
    pub fn is_terminal(&self, name: &str) -> bool {
        !self.routers.contains_key(name) && !self.edges.iter().any(|e| e.from == name)
    }

    /// Run from the entry node until no task remains.
    ///
    /// Any node or branch failure fails the whole run; sibling branches still
    /// in flight are aborted and no partial state is returned.
    pub async fn run(&self, initial: S) -> Result<ExecutionResult<S>> {
        let start = Instant::now();
        let mut state = initial;
        let mut node_runs = Vec::new();
        let mut terminal_nodes = Vec::new();
        let mut pending: Vec<Task<S::Branch>> = vec![Task {
            node: self.entry.clone(),
            branch: None,
        }];

        while !pending.is_empty() {
            let (ready, waiting) = self.split_ready(pending);

            let outcomes = self.run_step(&state, &ready).await?;
            for (task, (update, elapsed_ms)) in ready.iter().zip(outcomes) {
                state.apply(update);
                node_runs.push(NodeRun {
                    node: task.node.clone(),
                    branch: task.branch.as_ref().map(|(i, _)| *i),
                    elapsed_ms,
                });
            }

            let mut next = waiting;
            let mut routed: HashSet<&str> = HashSet::new();
            for task in &ready {
                let name = task.node.as_str();
                if self.is_terminal(name) {
                    if !terminal_nodes.iter().any(|t| t == name) {
                        terminal_nodes.push(name.to_string());
                    }
                    continue;
                }
                for edge in self.edges.iter().filter(|e| e.from == name) {
                    push_plain(&mut next, &edge.to);
                }
                // one router evaluation per node per step, on the merged state
                if let Some(router) = self.routers.get(name) {
                    if !routed.insert(name) {
                        continue;
                    }
                    let routes = router.route(&state)?;
                    let width = routes.iter().filter(|r| r.branch.is_some()).count();
                    if width > 1 {
                        info!(from = %name, branches = width, "Fanning out");
                    }
                    let mut position = 0;
                    for route in routes {
                        match route.branch {
                            Some(payload) => {
                                position += 1;
                                next.push(Task {
                                    node: route.target,
                                    branch: Some((position, payload)),
                                });
                            }
                            None => push_plain(&mut next, &route.target),
                        }
                    }
                }
            }
            pending = next;
        }

        let total_elapsed_ms = start.elapsed().as_millis() as u64;
        debug!(total_elapsed_ms, nodes = node_runs.len(), "Graph run complete");

        Ok(ExecutionResult {
            state,
            node_runs,
            terminal_nodes,
            total_elapsed_ms,
        })
    }

    /// Partition pending tasks into those that may run now and plain tasks
    /// that must wait for another pending task upstream of them.
    fn split_ready(
        &self,
        pending: Vec<Task<S::Branch>>,
    ) -> (Vec<Task<S::Branch>>, Vec<Task<S::Branch>>) {
        let blocked: Vec<bool> = pending
            .iter()
            .enumerate()
            .map(|(i, task)| {
                task.branch.is_none()
                    && pending.iter().enumerate().any(|(j, other)| {
                        j != i
                            && other.node != task.node
                            && self
                                .descendants
                                .get(&other.node)
                                .is_some_and(|d| d.contains(&task.node))
                    })
            })
            .collect();

        let mut ready = Vec::new();
        let mut waiting = Vec::new();
        for (task, wait) in pending.into_iter().zip(blocked) {
            if wait {
                debug!(node = %task.node, "Waiting for upstream branches");
                waiting.push(task);
            } else {
                ready.push(task);
            }
        }
        (ready, waiting)
    }

    /// Run one step's tasks concurrently; outcomes come back in task order.
    ///
    /// Branches live in a `JoinSet`: the first failure aborts the rest, and
    /// dropping the step future aborts every branch still in flight.
    async fn run_step(
        &self,
        state: &S,
        tasks: &[Task<S::Branch>],
    ) -> Result<Vec<(S::Update, u64)>> {
        if let [task] = tasks {
            let input = self.input_for(state, task);
            let node = self.node(&task.node)?;
            let outcome = invoke(node, input, self.options.node_timeout, task_label(task)).await?;
            return Ok(vec![outcome]);
        }

        let nodes = tasks
            .iter()
            .map(|task| self.node(&task.node))
            .collect::<Result<Vec<_>>>()?;

        let permits = Arc::new(Semaphore::new(self.options.max_concurrency.max(1)));
        let mut branches = JoinSet::new();
        for (position, (task, node)) in tasks.iter().zip(nodes).enumerate() {
            let input = self.input_for(state, task);
            let permits = permits.clone();
            let timeout = self.options.node_timeout;
            let label = task_label(task);
            branches.spawn(async move {
                let name = node.name.clone();
                let outcome = match permits.acquire_owned().await {
                    Ok(_permit) => AssertUnwindSafe(invoke(node, input, timeout, label))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|_| {
                            Err(CertflowError::BranchAborted {
                                node: name,
                                message: "branch panicked".to_string(),
                            })
                        }),
                    Err(e) => Err(CertflowError::BranchAborted {
                        node: name,
                        message: e.to_string(),
                    }),
                };
                (position, outcome)
            });
        }

        let mut slots: Vec<Option<(S::Update, u64)>> = tasks.iter().map(|_| None).collect();
        while let Some(joined) = branches.join_next().await {
            match joined {
                Ok((position, Ok(outcome))) => slots[position] = Some(outcome),
                Ok((_, Err(e))) => {
                    branches.abort_all();
                    return Err(e);
                }
                Err(join_err) => {
                    branches.abort_all();
                    return Err(CertflowError::BranchAborted {
                        node: step_label(tasks),
                        message: join_err.to_string(),
                    });
                }
            }
        }

        slots
            .into_iter()
            .zip(tasks)
            .map(|(slot, task)| {
                slot.ok_or_else(|| CertflowError::BranchAborted {
                    node: task.node.clone(),
                    message: "branch produced no outcome".to_string(),
                })
            })
            .collect()
    }

    fn node(&self, name: &str) -> Result<Arc<Node<S>>> {
        self.nodes
            .get(name)
            .cloned()
            .ok_or_else(|| CertflowError::UnknownNode(name.to_string()))
    }

    fn input_for(&self, state: &S, task: &Task<S::Branch>) -> S {
        match &task.branch {
            Some((_, payload)) => state.with_branch(payload.clone()),
            None => state.clone(),
        }
    }
}

fn push_plain<B>(tasks: &mut Vec<Task<B>>, target: &str) {
    if !tasks.iter().any(|t| t.branch.is_none() && t.node == target) {
        tasks.push(Task {
            node: target.to_string(),
            branch: None,
        });
    }
}

fn step_label<B>(tasks: &[Task<B>]) -> String {
    let mut names: Vec<&str> = tasks.iter().map(|t| t.node.as_str()).collect();
    names.dedup();
    names.join(", ")
}

fn task_label<B>(task: &Task<B>) -> Option<usize> {
    task.branch.as_ref().map(|(i, _)| *i)
}

async fn invoke<S: GraphState>(
    node: Arc<Node<S>>,
    input: S,
    default_timeout: Option<Duration>,
    branch: Option<usize>,
) -> Result<(S::Update, u64)> {
    info!(node = %node.name, branch = ?branch, "Executing graph node");
    let started = Instant::now();

    let deadline = node.timeout.or(default_timeout);
    let result = match deadline {
        Some(limit) => match tokio::time::timeout(limit, node.invoke(input)).await {
            Ok(r) => r,
            Err(_) => Err(CertflowError::NodeTimeout {
                node: node.name.clone(),
                timeout_secs: limit.as_millis().div_ceil(1000) as u64,
            }),
        },
        None => node.invoke(input).await,
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match result {
        Ok(update) => {
            debug!(node = %node.name, branch = ?branch, elapsed_ms, "Node execution complete");
            Ok((update, elapsed_ms))
        }
        Err(e) => {
            error!(node = %node.name, branch = ?branch, error = %e, "Graph node failed");
            Err(e)
        }
    }
}
