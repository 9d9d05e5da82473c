use anyhow::Result;
use cascabel_repr::plan_nodes::{
    BinOpPred, BinOpType, ColumnRefPred, ConstantPred, ConstantType, JoinType, LogicalFilter,
    LogicalJoin, LogicalScan, RelReprPlanNode, RelReprPredNode,
};
use cascabel_repr::{default_optimizer, Value};
use tracing::Level;

pub fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .init();

    let mut optimizer = default_optimizer(
        [("t1", 1000), ("t2", 100), ("t3", 10000)]
            .into_iter()
            .map(|(table, rows)| (table.into(), rows))
            .collect(),
    );

    // The plan: (filter (scan t1) #1=2) join (scan t2) join (scan t3)
    let scan1 = LogicalScan::new("t1");
    let filter_cond = BinOpPred::new(
        ColumnRefPred::new(1).into_pred_node(),
        ConstantPred::new(ConstantType::Int64, Value::Int64(2)).into_pred_node(),
        BinOpType::Eq,
    );
    let filter1 = LogicalFilter::new(scan1.into_plan_node(), filter_cond.into_pred_node());
    let scan2 = LogicalScan::new("t2");
    let join_cond = ConstantPred::bool(true);
    let scan3 = LogicalScan::new("t3");
    let join_filter = LogicalJoin::new(
        filter1.into_plan_node(),
        scan2.into_plan_node(),
        join_cond.clone().into_pred_node(),
        JoinType::Inner,
    );
    let fnal = LogicalJoin::new(
        scan3.into_plan_node(),
        join_filter.into_plan_node(),
        join_cond.into_pred_node(),
        JoinType::Inner,
    );

    let plan = optimizer.optimize(fnal.into_plan_node())?;
    tracing::info!(plan_space = optimizer.compute_plan_space(), "optimization done");
    println!("plan: {}", plan);
    Ok(())
}
