use super::macros::define_plan_node;

#[derive(Clone, Debug)]
pub struct LogicalProjection(pub super::ArcRelPlanNode);

define_plan_node!(
    LogicalProjection,
    Projection,
    [{ 0, child }],
    [{ 0, exprs }]
);

#[derive(Clone, Debug)]
pub struct PhysicalProjection(pub super::ArcRelPlanNode);

define_plan_node!(
    PhysicalProjection,
    PhysicalProjection,
    [{ 0, child }],
    [{ 0, exprs }]
);
