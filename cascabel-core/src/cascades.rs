//! The core cascades optimizer implementation.

mod binding;
mod error;
mod memo;
mod optimizer;

pub use binding::BindingIter;
pub use error::OptimizeError;
pub use memo::{ExprOptInfo, Memo, MemoExpr, MemoExprRef, WinnerInfo};
pub use optimizer::{
    CancellationToken, CascadesOptimizer, ExprId, GroupId, OptimizerProperties, RuleId,
};
