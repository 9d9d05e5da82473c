use super::macros::define_plan_node;

#[derive(Clone, Debug)]
pub struct LogicalSort(pub super::ArcRelPlanNode);

// The `exprs` predicate is a list of sort-order predicates over column
// references, outermost key first.
define_plan_node!(
    LogicalSort,
    Sort,
    [{ 0, child }],
    [{ 0, exprs }]
);

#[derive(Clone, Debug)]
pub struct PhysicalSort(pub super::ArcRelPlanNode);

define_plan_node!(
    PhysicalSort,
    PhysicalSort,
    [{ 0, child }],
    [{ 0, exprs }]
);
