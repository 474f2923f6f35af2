pub mod gate;
pub mod graph;
pub mod remote;
pub mod router;
pub mod verdict;
pub mod workflow;

pub use gate::{DocumentGate, GateDecision};
pub use graph::{
    ExecutionResult, ExecutorOptions, GraphBuilder, GraphExecutor, GraphState, Node, NodeRun,
    Route,
};
pub use remote::RemoteCollaborators;
pub use router::{build_section_tasks, route_sections, SectionContext};
pub use verdict::{compile_verdict, invalid_document_verdict, DocumentSignals};
pub use workflow::{ValidationRequest, ValidationWorkflow, WorkflowOptions};
