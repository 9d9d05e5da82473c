use cascabel_core::nodes::{ArcPlanNode, PlanNode};
use cascabel_core::rules::{Pattern, Rule, RuleCategory};

use crate::plan_nodes::{
    ArcRelPredNode, BinOpPred, BinOpType, JoinType, LogOpPred, LogOpType, LogicalJoin,
    PhysicalHashJoin, RelNodeTyp, RelPredType, RelReprPlanNode, RelReprPredNode,
};

fn inner_join_pattern() -> Pattern<RelNodeTyp> {
    Pattern::node(
        RelNodeTyp::Join(JoinType::Inner),
        vec![Pattern::Any, Pattern::Any],
    )
}

/// Inner-join commutativity: `A join B -> B join A`.
pub struct JoinCommuteRule {
    matcher: Pattern<RelNodeTyp>,
}

impl JoinCommuteRule {
    pub fn new() -> Self {
        Self {
            matcher: inner_join_pattern(),
        }
    }
}

impl Rule<RelNodeTyp> for JoinCommuteRule {
    fn name(&self) -> &'static str {
        "join_commute"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Transformation
    }

    fn pattern(&self) -> &Pattern<RelNodeTyp> {
        &self.matcher
    }

    fn transform(&self, binding: ArcPlanNode<RelNodeTyp>) -> Vec<PlanNode<RelNodeTyp>> {
        let join = LogicalJoin::from_plan_node(binding).unwrap();
        let commuted = LogicalJoin::new(join.right(), join.left(), join.cond(), JoinType::Inner);
        vec![commuted.into_plan_node().as_ref().clone()]
    }
}

/// Inner-join associativity: `(A join B) join C -> A join (B join C)`.
pub struct JoinAssocRule {
    matcher: Pattern<RelNodeTyp>,
}

impl JoinAssocRule {
    pub fn new() -> Self {
        Self {
            matcher: Pattern::node(
                RelNodeTyp::Join(JoinType::Inner),
                vec![inner_join_pattern(), Pattern::Any],
            ),
        }
    }
}

impl Rule<RelNodeTyp> for JoinAssocRule {
    fn name(&self) -> &'static str {
        "join_assoc"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Transformation
    }

    fn pattern(&self) -> &Pattern<RelNodeTyp> {
        &self.matcher
    }

    fn transform(&self, binding: ArcPlanNode<RelNodeTyp>) -> Vec<PlanNode<RelNodeTyp>> {
        let outer = LogicalJoin::from_plan_node(binding).unwrap();
        let inner = LogicalJoin::from_plan_node(outer.left()).unwrap();
        let rotated_inner =
            LogicalJoin::new(inner.right(), outer.right(), outer.cond(), JoinType::Inner);
        let rotated = LogicalJoin::new(
            inner.left(),
            rotated_inner.into_plan_node(),
            inner.cond(),
            JoinType::Inner,
        );
        vec![rotated.into_plan_node().as_ref().clone()]
    }
}

fn is_equi_cond(pred: &ArcRelPredNode) -> bool {
    match pred.typ {
        RelPredType::BinOp(BinOpType::Eq) => {
            let bin = BinOpPred::from_pred_node(pred.clone()).unwrap();
            bin.left().typ == RelPredType::ColumnRef && bin.right().typ == RelPredType::ColumnRef
        }
        RelPredType::LogOp(LogOpType::And) => {
            let log = LogOpPred::from_pred_node(pred.clone()).unwrap();
            !log.children().is_empty() && log.children().iter().all(is_equi_cond)
        }
        _ => false,
    }
}

/// Implement an inner join with an equality condition as a hash join.
pub struct HashJoinRule {
    matcher: Pattern<RelNodeTyp>,
}

impl HashJoinRule {
    pub fn new() -> Self {
        Self {
            matcher: inner_join_pattern(),
        }
    }
}

impl Rule<RelNodeTyp> for HashJoinRule {
    fn name(&self) -> &'static str {
        "hash_join"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Implementation
    }

    fn pattern(&self) -> &Pattern<RelNodeTyp> {
        &self.matcher
    }

    fn check(&self, binding: &ArcPlanNode<RelNodeTyp>) -> bool {
        is_equi_cond(&binding.predicate(0))
    }

    fn transform(&self, binding: ArcPlanNode<RelNodeTyp>) -> Vec<PlanNode<RelNodeTyp>> {
        let join = LogicalJoin::from_plan_node(binding).unwrap();
        let hash_join =
            PhysicalHashJoin::new(join.left(), join.right(), join.cond(), JoinType::Inner);
        vec![hash_join.into_plan_node().as_ref().clone()]
    }
}
