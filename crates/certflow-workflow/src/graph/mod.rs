//! Graph execution engine: DAG-based workflow orchestration.
//!
//! A workflow is a directed acyclic graph of named [`Node`]s. Each node takes a
//! snapshot of the typed state and returns a partial update. Transitions are
//! either static [`Edge`]s or routers attached with
//! [`GraphBuilder::add_conditional_edge`], which may return one target or
//! fan out into many branches, each with its own payload.
//!
//! The [`GraphExecutor`] walks the graph from its entry node, runs fan-out
//! branches concurrently, and folds every update back into the shared state
//! through [`GraphState::apply`] in dispatch order.

pub mod builder;
pub mod edge;
pub mod executor;
pub mod node;
pub mod state;

pub use builder::GraphBuilder;
pub use edge::{ConditionalEdge, Edge, Route};
pub use executor::{ExecutionResult, ExecutorOptions, GraphExecutor, NodeRun};
pub use node::Node;
pub use state::GraphState;
