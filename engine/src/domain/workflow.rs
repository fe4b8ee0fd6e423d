//! Identifiers for long-running engine workflows.

/// Identifier of one import or optimization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkflowId(u64);

impl WorkflowId {
    /// Wrap a raw identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw identifier.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "workflow-{}", self.0)
    }
}

/// Monotonic allocator of [`WorkflowId`]s.
#[derive(Debug, Default)]
pub(crate) struct WorkflowIds {
    last: u64,
}

impl WorkflowIds {
    pub(crate) fn allocate(&mut self) -> WorkflowId {
        self.last = self.last.saturating_add(1);
        WorkflowId(self.last)
    }
}
