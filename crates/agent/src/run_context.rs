//! Per-run execution context: nesting depth and cancellation.

use tokio_util::sync::CancellationToken;

/// Carried through a run and handed, one level deeper, to subagents.
///
/// Cancelling a context cancels every subagent spawned beneath it; a
/// child can be cancelled without affecting its parent.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    depth: u32,
    cancel: CancellationToken,
}

impl RunContext {
    /// A top-level context (depth 0).
    pub fn new(cancel: CancellationToken) -> Self {
        Self { depth: 0, cancel }
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Context for a subagent spawned from this run.
    pub fn child(&self) -> Self {
        Self {
            depth: self.depth + 1,
            cancel: self.cancel.child_token(),
        }
    }
}
