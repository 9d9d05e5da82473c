use super::macros::define_plan_node;

#[derive(Clone, Debug)]
pub struct LogicalLimit(pub super::ArcRelPlanNode);

define_plan_node!(
    LogicalLimit,
    Limit,
    [{ 0, child }],
    [{ 0, fetch }]
);

#[derive(Clone, Debug)]
pub struct PhysicalLimit(pub super::ArcRelPlanNode);

define_plan_node!(
    PhysicalLimit,
    PhysicalLimit,
    [{ 0, child }],
    [{ 0, fetch }]
);
