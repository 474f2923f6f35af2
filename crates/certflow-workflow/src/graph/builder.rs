use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use certflow_core::error::{CertflowError, Result};

use super::edge::{ConditionalEdge, Edge, Route};
use super::executor::{ExecutorOptions, GraphExecutor};
use super::node::Node;
use super::state::GraphState;

/// Registry of nodes, static edges, and routers.
///
/// Every structural mistake is reported here, before any run: duplicate
/// names, edges to unknown nodes, and edges that would close a cycle.
pub struct GraphBuilder<S: GraphState> {
    nodes: HashMap<String, Arc<Node<S>>>,
    order: Vec<String>,
    edges: Vec<Edge>,
    routers: HashMap<String, ConditionalEdge<S>>,
    entry: Option<String>,
}

impl<S: GraphState> Default for GraphBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: GraphState> GraphBuilder<S> {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
            edges: Vec::new(),
            routers: HashMap::new(),
            entry: None,
        }
    }

    /// Register a node. Names must be unique.
    pub fn add_node(&mut self, node: Node<S>) -> Result<&mut Self> {
        if self.nodes.contains_key(&node.name) {
            return Err(CertflowError::DuplicateNode(node.name));
        }
        self.order.push(node.name.clone());
        self.nodes.insert(node.name.clone(), Arc::new(node));
        Ok(self)
    }

    /// Static transition taken every time `from` completes.
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<&mut Self> {
        self.require(from)?;
        self.require(to)?;
        self.reject_cycle(from, to)?;
        if !self.edges.iter().any(|e| e.from == from && e.to == to) {
            self.edges.push(Edge::new(from, to));
        }
        Ok(self)
    }

    /// Attach a router to `from`. `targets` lists every node the router may
    /// return; one router per node.
    pub fn add_conditional_edge<R>(
        &mut self,
        from: &str,
        targets: &[&str],
        router: R,
    ) -> Result<&mut Self>
    where
        R: Fn(&S) -> Vec<Route<S::Branch>> + Send + Sync + 'static,
    {
        self.require(from)?;
        if self.routers.contains_key(from) {
            return Err(CertflowError::Config(format!(
                "node '{}' already has a conditional edge",
                from
            )));
        }
        for to in targets {
            self.require(to)?;
            self.reject_cycle(from, to)?;
        }
        let targets = targets.iter().map(|t| t.to_string()).collect();
        self.routers
            .insert(from.to_string(), ConditionalEdge::new(from, targets, router));
        Ok(self)
    }

    /// Node the run starts from.
    pub fn set_entry(&mut self, name: &str) -> Result<&mut Self> {
        self.require(name)?;
        self.entry = Some(name.to_string());
        Ok(self)
    }

    /// Freeze the graph into an executor.
    pub fn compile(self, options: ExecutorOptions) -> Result<GraphExecutor<S>> {
        let entry = self.entry.clone().ok_or(CertflowError::MissingEntry)?;
        let descendants = self
            .order
            .iter()
            .map(|name| (name.clone(), self.reachable_from(name)))
            .collect();
        Ok(GraphExecutor::new(
            self.nodes,
            self.edges,
            self.routers,
            entry,
            descendants,
            options,
        ))
    }

    fn require(&self, name: &str) -> Result<()> {
        if self.nodes.contains_key(name) {
            Ok(())
        } else {
            Err(CertflowError::UnknownNode(name.to_string()))
        }
    }

    fn successors<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        let static_targets = self
            .edges
            .iter()
            .filter(move |e| e.from == name)
            .map(|e| e.to.as_str());
        let routed = self
            .routers
            .get(name)
            .into_iter()
            .flat_map(|r| r.targets.iter().map(String::as_str));
        static_targets.chain(routed)
    }

    /// Every node reachable from `start`, excluding `start` itself.
    fn reachable_from(&self, start: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut stack: Vec<&str> = self.successors(start).collect();
        while let Some(name) = stack.pop() {
            if seen.insert(name.to_string()) {
                stack.extend(self.successors(name));
            }
        }
        seen
    }

    /// Adding `from -> to` closes a cycle iff `from` is reachable from `to`.
    fn reject_cycle(&self, from: &str, to: &str) -> Result<()> {
        if from == to {
            return Err(CertflowError::Cycle {
                from: from.to_string(),
                to: to.to_string(),
                path: format!("{} -> {}", from, to),
            });
        }
        if let Some(path) = self.path_between(to, from) {
            return Err(CertflowError::Cycle {
                from: from.to_string(),
                to: to.to_string(),
                path: format!("{} -> {}", from, path.join(" -> ")),
            });
        }
        Ok(())
    }

    fn path_between(&self, start: &str, goal: &str) -> Option<Vec<String>> {
        let mut parent: HashMap<String, String> = HashMap::new();
        let mut seen = HashSet::from([start.to_string()]);
        let mut stack = vec![start.to_string()];
        while let Some(name) = stack.pop() {
            if name == goal {
                let mut path = vec![name.clone()];
                let mut cursor = name;
                while let Some(prev) = parent.get(&cursor) {
                    path.push(prev.clone());
                    cursor = prev.clone();
                }
                path.reverse();
                return Some(path);
            }
            for next in self.successors(&name) {
                if seen.insert(next.to_string()) {
                    parent.insert(next.to_string(), name.clone());
                    stack.push(next.to_string());
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::state::tests::{Counter, CounterUpdate};

    fn noop(name: &str) -> Node<Counter> {
        Node::new(name, |_: Counter| async { Ok(CounterUpdate::default()) })
    }

    fn builder(names: &[&str]) -> GraphBuilder<Counter> {
        let mut b = GraphBuilder::new();
        for name in names {
            b.add_node(noop(name)).unwrap();
        }
        b
    }

    #[test]
    fn test_duplicate_node() {
        let mut b = builder(&["a"]);
        let err = b.add_node(noop("a")).err().unwrap();
        assert!(matches!(err, CertflowError::DuplicateNode(ref n) if n == "a"));
        assert!(err.is_construction());
    }

    #[test]
    fn test_edge_to_unknown_node() {
        let mut b = builder(&["a"]);
        let err = b.add_edge("a", "ghost").err().unwrap();
        assert!(matches!(err, CertflowError::UnknownNode(ref n) if n == "ghost"));
    }

    #[test]
    fn test_cycle_rejected_at_registration() {
        let mut b = builder(&["a", "b", "c"]);
        b.add_edge("a", "b").unwrap();
        b.add_edge("b", "c").unwrap();
        let err = b.add_edge("c", "a").err().unwrap();
        match err {
            CertflowError::Cycle { from, to, path } => {
                assert_eq!(from, "c");
                assert_eq!(to, "a");
                assert_eq!(path, "c -> a -> b -> c");
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_self_loop_rejected() {
        let mut b = builder(&["a"]);
        assert!(matches!(
            b.add_edge("a", "a").err().unwrap(),
            CertflowError::Cycle { .. }
        ));
    }

    #[test]
    fn test_cycle_through_conditional_targets() {
        let mut b = builder(&["a", "b"]);
        b.add_conditional_edge("a", &["b"], |_: &Counter| vec![Route::to("b")])
            .unwrap();
        let err = b.add_edge("b", "a").err().unwrap();
        assert!(matches!(err, CertflowError::Cycle { .. }));
    }

    #[test]
    fn test_second_router_rejected() {
        let mut b = builder(&["a", "b"]);
        b.add_conditional_edge("a", &["b"], |_: &Counter| vec![Route::to("b")])
            .unwrap();
        assert!(b
            .add_conditional_edge("a", &["b"], |_: &Counter| vec![Route::to("b")])
            .is_err());
    }

    #[test]
    fn test_compile_requires_entry() {
        let b = builder(&["a"]);
        let err = b.compile(ExecutorOptions::default()).err().unwrap();
        assert!(matches!(err, CertflowError::MissingEntry));
    }

    #[test]
    fn test_reachability() {
        let mut b = builder(&["a", "b", "c", "d"]);
        b.add_edge("a", "b").unwrap();
        b.add_conditional_edge("b", &["c"], |_: &Counter| vec![Route::to("c")])
            .unwrap();
        let from_a = b.reachable_from("a");
        assert!(from_a.contains("b") && from_a.contains("c"));
        assert!(!from_a.contains("d"));
        assert!(b.reachable_from("c").is_empty());
    }
}
