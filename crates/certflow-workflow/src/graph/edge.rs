use std::sync::Arc;

use certflow_core::error::{CertflowError, Result};

use super::state::GraphState;

/// A static transition, always taken after `from` completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// Source node name.
    pub from: String,
    /// Target node name.
    pub to: String,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// One target chosen by a router.
///
/// A route without a branch payload is a plain transition. A route carrying a
/// payload becomes its own fan-out branch, run on a copy of the state
/// overlaid with that payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Route<B> {
    pub target: String,
    pub branch: Option<B>,
}

impl<B> Route<B> {
    /// Plain transition to `target`.
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            branch: None,
        }
    }

    /// Fan-out branch to `target` with a per-branch payload.
    pub fn send(target: impl Into<String>, branch: B) -> Self {
        Self {
            target: target.into(),
            branch: Some(branch),
        }
    }
}

pub type RouterFn<S> =
    Arc<dyn Fn(&S) -> Vec<Route<<S as GraphState>::Branch>> + Send + Sync>;

/// A router attached to a node, evaluated on the merged state once the node
/// (and every branch of it in the same step) has completed.
pub struct ConditionalEdge<S: GraphState> {
    pub from: String,
    /// Every node the router may choose. Needed up front for cycle and join
    /// analysis.
    pub targets: Vec<String>,
    router: RouterFn<S>,
}

impl<S: GraphState> ConditionalEdge<S> {
    pub fn new<R>(from: impl Into<String>, targets: Vec<String>, router: R) -> Self
    where
        R: Fn(&S) -> Vec<Route<S::Branch>> + Send + Sync + 'static,
    {
        Self {
            from: from.into(),
            targets,
            router: Arc::new(router),
        }
    }

    /// Evaluate the router. Zero routes is a dead end; a route to a node not
    /// listed in `targets` is rejected.
    pub fn route(&self, state: &S) -> Result<Vec<Route<S::Branch>>> {
        let routes = (self.router)(state);
        if routes.is_empty() {
            return Err(CertflowError::DeadEnd(self.from.clone()));
        }
        if let Some(bad) = routes.iter().find(|r| !self.targets.contains(&r.target)) {
            return Err(CertflowError::UndeclaredTarget {
                from: self.from.clone(),
                to: bad.target.clone(),
            });
        }
        Ok(routes)
    }
}

impl<S: GraphState> std::fmt::Debug for ConditionalEdge<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionalEdge")
            .field("from", &self.from)
            .field("targets", &self.targets)
            .finish()
    }
}
