use super::macros::define_plan_node;

#[derive(Clone, Debug)]
pub struct LogicalFilter(pub super::ArcRelPlanNode);

define_plan_node!(
    LogicalFilter,
    Filter,
    [{ 0, child }],
    [{ 0, cond }]
);

#[derive(Clone, Debug)]
pub struct PhysicalFilter(pub super::ArcRelPlanNode);

define_plan_node!(
    PhysicalFilter,
    PhysicalFilter,
    [{ 0, child }],
    [{ 0, cond }]
);
