//! Run budgets and loop outcomes.

use warmloop_core::provider::Usage;

/// Ceiling for one loop run. Checked before every model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    /// Model calls allowed in the run
    pub max_iterations: u32,
    /// Tokens (all kinds, cached included) allowed in the run
    pub max_tokens: Option<u64>,
}

impl Budget {
    pub fn iterations(max_iterations: u32) -> Self {
        Self {
            max_iterations,
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u64>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Which limit, if any, forbids another model call.
    pub fn exhausted(&self, iterations: u32, tokens_used: u64) -> Option<BudgetLimit> {
        if iterations >= self.max_iterations {
            return Some(BudgetLimit::Iterations);
        }
        match self.max_tokens {
            Some(max) if tokens_used >= max => Some(BudgetLimit::Tokens),
            _ => None,
        }
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self::iterations(25)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetLimit {
    Iterations,
    Tokens,
}

impl std::fmt::Display for BudgetLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Iterations => f.write_str("iteration budget"),
            Self::Tokens => f.write_str("token budget"),
        }
    }
}

/// How a loop run ended.
///
/// `BudgetExceeded` is the only way a run ends without a model-issued
/// final response, and it never masquerades as one.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopOutcome {
    /// The model answered without requesting tools.
    Final {
        text: String,
        iterations: u32,
        usage: Usage,
    },
    /// The run hit its budget first. `partial` is the text of the last
    /// assistant message, possibly empty.
    BudgetExceeded {
        limit: BudgetLimit,
        partial: String,
        iterations: u32,
        usage: Usage,
    },
}

impl LoopOutcome {
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Final { .. })
    }

    /// The final answer or the partial text.
    pub fn text(&self) -> &str {
        match self {
            Self::Final { text, .. } => text,
            Self::BudgetExceeded { partial, .. } => partial,
        }
    }

    pub fn iterations(&self) -> u32 {
        match self {
            Self::Final { iterations, .. } | Self::BudgetExceeded { iterations, .. } => *iterations,
        }
    }

    pub fn usage(&self) -> Usage {
        match self {
            Self::Final { usage, .. } | Self::BudgetExceeded { usage, .. } => *usage,
        }
    }
}
