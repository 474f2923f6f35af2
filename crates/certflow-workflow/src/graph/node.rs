use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

use certflow_core::error::Result;

use super::state::GraphState;

/// Boxed unit of work: takes a snapshot of the state, returns a partial update.
pub type NodeFn<S> =
    Arc<dyn Fn(S) -> BoxFuture<'static, Result<<S as GraphState>::Update>> + Send + Sync>;

/// A named node in the execution graph.
pub struct Node<S: GraphState> {
    /// Unique identifier for this node.
    pub name: String,
    action: NodeFn<S>,
    /// Overrides the executor-wide deadline for this node.
    pub timeout: Option<Duration>,
}

impl<S: GraphState> Node<S> {
    pub fn new<F, Fut>(name: impl Into<String>, action: F) -> Self
    where
        F: Fn(S) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<S::Update>> + Send + 'static,
    {
        Self {
            name: name.into(),
            action: Arc::new(move |state| Box::pin(action(state))),
            timeout: None,
        }
    }

    /// Set a per-node deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub(crate) fn invoke(&self, state: S) -> BoxFuture<'static, Result<S::Update>> {
        (self.action)(state)
    }
}

impl<S: GraphState> std::fmt::Debug for Node<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::state::tests::{Counter, CounterUpdate};

    #[tokio::test]
    async fn test_node_invoke() {
        let node = Node::new("inc", |s: Counter| async move {
            Ok(CounterUpdate {
                add: s.total + 1,
                ..Default::default()
            })
        });
        let update = node.invoke(Counter::default()).await.unwrap();
        assert_eq!(update.add, 1);
        assert_eq!(node.name, "inc");
        assert!(node.timeout.is_none());
    }

    #[test]
    fn test_node_timeout_builder() {
        let node = Node::new("slow", |_: Counter| async { Ok(CounterUpdate::default()) })
            .with_timeout(Duration::from_secs(3));
        assert_eq!(node.timeout, Some(Duration::from_secs(3)));
    }
}
