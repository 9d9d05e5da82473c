use core::fmt;
use std::fmt::Display;

use super::macros::define_plan_node;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum JoinType {
    Inner = 1,
    FullOuter,
    LeftOuter,
    RightOuter,
    Cross,
}

impl Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Clone, Debug)]
pub struct LogicalJoin(pub super::ArcRelPlanNode);

define_plan_node!(
    LogicalJoin,
    Join,
    [{ 0, left }, { 1, right }],
    [{ 0, cond }],
    { join_type: JoinType }
);

#[derive(Clone, Debug)]
pub struct PhysicalNestedLoopJoin(pub super::ArcRelPlanNode);

define_plan_node!(
    PhysicalNestedLoopJoin,
    PhysicalNestedLoopJoin,
    [{ 0, left }, { 1, right }],
    [{ 0, cond }],
    { join_type: JoinType }
);

#[derive(Clone, Debug)]
pub struct PhysicalHashJoin(pub super::ArcRelPlanNode);

define_plan_node!(
    PhysicalHashJoin,
    PhysicalHashJoin,
    [{ 0, left }, { 1, right }],
    [{ 0, cond }],
    { join_type: JoinType }
);
