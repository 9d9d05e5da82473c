use thiserror::Error;

use super::optimizer::GroupId;
use crate::property::PropertySet;

/// Structured failures of one optimization run. A failed run never yields a
/// partial plan; the memo is discarded with the optimizer.
#[derive(Debug, Clone, Error)]
pub enum OptimizeError {
    #[error("no statements to optimize")]
    EmptyInput,
    #[error("no physical plan for group {group} satisfies {required}")]
    NoPlan {
        group: GroupId,
        required: PropertySet,
    },
    #[error("optimizer invariant violated: {0}")]
    InvariantViolated(String),
    #[error("optimization cancelled")]
    Cancelled,
}
