use certflow_core::state::{SharedState, StateUpdate};
use certflow_core::types::SectionTask;

/// State that can flow through a [`GraphExecutor`](super::GraphExecutor).
///
/// Nodes receive an owned snapshot and return an `Update`; the executor is the
/// only place updates are folded back in. Fan-out branches receive a copy of
/// the state overlaid with their `Branch` payload.
pub trait GraphState: Clone + Send + Sync + 'static {
    type Update: Send + 'static;
    type Branch: Clone + Send + Sync + 'static;

    fn apply(&mut self, update: Self::Update);

    fn with_branch(&self, branch: Self::Branch) -> Self;
}

impl GraphState for SharedState {
    type Update = StateUpdate;
    type Branch = SectionTask;

    fn apply(&mut self, update: StateUpdate) {
        SharedState::apply(self, update);
    }

    fn with_branch(&self, branch: SectionTask) -> Self {
        let mut copy = self.clone();
        copy.current_section = Some(branch);
        copy
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Small state used to exercise the engine without the certificate domain.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub(crate) struct Counter {
        pub total: i64,
        pub visited: Vec<String>,
        pub items: Vec<usize>,
        pub last: Option<String>,
        pub branch: Option<usize>,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    pub(crate) struct CounterUpdate {
        pub add: i64,
        pub visit: Option<String>,
        pub items: Vec<usize>,
        pub last: Option<String>,
    }

    impl CounterUpdate {
        pub fn visit(name: &str) -> Self {
            Self {
                visit: Some(name.to_string()),
                ..Default::default()
            }
        }
    }

    impl GraphState for Counter {
        type Update = CounterUpdate;
        type Branch = usize;

        fn apply(&mut self, update: CounterUpdate) {
            self.total += update.add;
            if let Some(v) = update.visit {
                self.visited.push(v);
            }
            self.items.extend(update.items);
            self.items.sort();
            if update.last.is_some() {
                self.last = update.last;
            }
        }

        fn with_branch(&self, branch: usize) -> Self {
            let mut copy = self.clone();
            copy.branch = Some(branch);
            copy
        }
    }

    #[test]
    fn test_shared_state_branch_overlay_is_private() {
        let base = SharedState::default();
        let task = SectionTask {
            section_index: 2,
            section_text: "vigencia".into(),
            enterprise: "ACME".into(),
            worker: "12345678".into(),
            worker_type: certflow_core::WorkerType::Dni,
            reference_date: None,
            validated_data: None,
            verdict: None,
        };
        let branch = base.with_branch(task.clone());
        assert_eq!(branch.current_section, Some(task));
        assert!(base.current_section.is_none());
    }
}
