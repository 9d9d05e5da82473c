//! Typed interface of plan nodes.

mod filter;
mod join;
mod limit;
pub(super) mod macros;
mod predicates;
mod projection;
mod scan;
mod sort;

use cascabel_core::cascades::GroupId;
use cascabel_core::nodes::{ArcPlanNode, ArcPredNode, NodeType, PlanNode, PredNode};

pub use filter::{LogicalFilter, PhysicalFilter};
pub use join::{JoinType, LogicalJoin, PhysicalHashJoin, PhysicalNestedLoopJoin};
pub use limit::{LogicalLimit, PhysicalLimit};
pub use predicates::{
    BinOpPred, BinOpType, ColumnRefPred, ConstantPred, ConstantType, ListPred, LogOpPred,
    LogOpType, SortOrderPred, SortOrderType, TablePred,
};
pub use projection::{LogicalProjection, PhysicalProjection};
pub use scan::{LogicalScan, PhysicalScan};
pub use sort::{LogicalSort, PhysicalSort};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelPredType {
    Constant(ConstantType),
    ColumnRef,
    BinOp(BinOpType),
    LogOp(LogOpType),
    SortOrder(SortOrderType),
    Table,
    List,
}

impl std::fmt::Display for RelPredType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelNodeTyp {
    /// Placeholder for a memo group during optimization.
    Group(GroupId),
    // Logical plan nodes
    // Developers: update `is_logical` after adding new plan nodes
    Scan,
    Filter,
    Projection,
    Join(JoinType),
    Sort,
    Limit,
    // Physical plan nodes
    PhysicalScan,
    PhysicalFilter,
    PhysicalProjection,
    PhysicalNestedLoopJoin(JoinType),
    PhysicalHashJoin(JoinType),
    PhysicalSort,
    PhysicalLimit,
}

impl std::fmt::Display for RelNodeTyp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Self::Group(group_id) = self {
            write!(f, "{}", group_id)
        } else {
            write!(f, "{:?}", self)
        }
    }
}

impl NodeType for RelNodeTyp {
    type PredType = RelPredType;

    fn is_logical(&self) -> bool {
        matches!(
            self,
            Self::Scan | Self::Filter | Self::Projection | Self::Join(_) | Self::Sort | Self::Limit
        )
    }

    fn extract_group(&self) -> Option<GroupId> {
        match self {
            Self::Group(group_id) => Some(*group_id),
            _ => None,
        }
    }

    fn group_typ(group_id: GroupId) -> Self {
        Self::Group(group_id)
    }
}

pub type RelPlanNode = PlanNode<RelNodeTyp>;
pub type ArcRelPlanNode = ArcPlanNode<RelNodeTyp>;
pub type RelPredNode = PredNode<RelNodeTyp>;
pub type ArcRelPredNode = ArcPredNode<RelNodeTyp>;

/// Typed view over an untyped plan node of a specific variant.
pub trait RelReprPlanNode: 'static + Clone {
    fn into_plan_node(self) -> ArcRelPlanNode;

    fn from_plan_node(plan_node: ArcRelPlanNode) -> Option<Self>;
}

/// Typed view over an untyped predicate node of a specific variant.
pub trait RelReprPredNode: 'static + Clone {
    fn into_pred_node(self) -> ArcRelPredNode;

    fn from_pred_node(pred_node: ArcRelPredNode) -> Option<Self>;
}
