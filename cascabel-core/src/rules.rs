mod ir;

use crate::nodes::{ArcPlanNode, NodeType, PlanNode};

pub use ir::Pattern;

/// Phase gating for rules: transformation rules fire during exploration and
/// keep the plan logical, implementation rules fire during implementation
/// and produce physical expressions for the same group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RuleCategory {
    Transformation,
    Implementation,
}

/// A rewrite rule. The binding iterator materializes every embedding of
/// `pattern()` rooted at a memo expression; `check` guards each binding and
/// `transform` produces equivalent plans that are recorded back into the
/// source group. Rules are pure; a rule that does not apply returns no
/// plans.
pub trait Rule<T: NodeType>: 'static + Send + Sync {
    fn name(&self) -> &'static str;

    fn category(&self) -> RuleCategory;

    fn pattern(&self) -> &Pattern<T>;

    fn check(&self, _binding: &ArcPlanNode<T>) -> bool {
        true
    }

    fn transform(&self, binding: ArcPlanNode<T>) -> Vec<PlanNode<T>>;
}
