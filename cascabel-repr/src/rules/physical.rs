use std::sync::Arc;

use cascabel_core::nodes::{ArcPlanNode, PlanNode};
use cascabel_core::rules::{Pattern, Rule, RuleCategory};

use crate::plan_nodes::{JoinType, RelNodeTyp};

fn logical_arity(typ: &RelNodeTyp) -> usize {
    match typ {
        RelNodeTyp::Scan => 0,
        RelNodeTyp::Filter
        | RelNodeTyp::Projection
        | RelNodeTyp::Sort
        | RelNodeTyp::Limit => 1,
        RelNodeTyp::Join(_) => 2,
        _ => panic!("{} is not a convertible logical operator", typ),
    }
}

/// One-to-one conversion of a logical operator into its default physical
/// counterpart, keeping children and parameters.
pub struct PhysicalConversionRule {
    matcher: Pattern<RelNodeTyp>,
}

impl PhysicalConversionRule {
    pub fn new(logical_typ: RelNodeTyp) -> Self {
        Self {
            matcher: Pattern::node(logical_typ, vec![Pattern::Any; logical_arity(&logical_typ)]),
        }
    }

    /// Define conversions below, and add them to this list!
    pub fn all_conversions() -> Vec<Arc<dyn Rule<RelNodeTyp>>> {
        vec![
            Arc::new(PhysicalConversionRule::new(RelNodeTyp::Scan)),
            Arc::new(PhysicalConversionRule::new(RelNodeTyp::Filter)),
            Arc::new(PhysicalConversionRule::new(RelNodeTyp::Projection)),
            Arc::new(PhysicalConversionRule::new(RelNodeTyp::Join(
                JoinType::Inner,
            ))),
            Arc::new(PhysicalConversionRule::new(RelNodeTyp::Join(
                JoinType::LeftOuter,
            ))),
            Arc::new(PhysicalConversionRule::new(RelNodeTyp::Join(
                JoinType::RightOuter,
            ))),
            Arc::new(PhysicalConversionRule::new(RelNodeTyp::Join(
                JoinType::FullOuter,
            ))),
            Arc::new(PhysicalConversionRule::new(RelNodeTyp::Join(
                JoinType::Cross,
            ))),
            Arc::new(PhysicalConversionRule::new(RelNodeTyp::Sort)),
            Arc::new(PhysicalConversionRule::new(RelNodeTyp::Limit)),
        ]
    }
}

impl Rule<RelNodeTyp> for PhysicalConversionRule {
    fn name(&self) -> &'static str {
        "physical_conversion"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Implementation
    }

    fn pattern(&self) -> &Pattern<RelNodeTyp> {
        &self.matcher
    }

    fn transform(&self, binding: ArcPlanNode<RelNodeTyp>) -> Vec<PlanNode<RelNodeTyp>> {
        let PlanNode {
            typ,
            children,
            predicates,
        } = binding.as_ref().clone();

        let physical_typ = match typ {
            RelNodeTyp::Scan => RelNodeTyp::PhysicalScan,
            RelNodeTyp::Filter => RelNodeTyp::PhysicalFilter,
            RelNodeTyp::Projection => RelNodeTyp::PhysicalProjection,
            RelNodeTyp::Join(join_type) => RelNodeTyp::PhysicalNestedLoopJoin(join_type),
            RelNodeTyp::Sort => RelNodeTyp::PhysicalSort,
            RelNodeTyp::Limit => RelNodeTyp::PhysicalLimit,
            _ => return vec![],
        };
        vec![PlanNode {
            typ: physical_typ,
            children,
            predicates,
        }]
    }
}
