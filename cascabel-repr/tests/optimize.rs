use std::collections::HashMap;
use std::sync::Arc;

use cascabel_core::cascades::{CascadesOptimizer, OptimizeError, OptimizerProperties};
use cascabel_core::property::{Property, PropertySet, SortKey};
use cascabel_repr::cost::{DummyCostModel, RelCostModel};
use cascabel_repr::plan_nodes::{
    ArcRelPlanNode, BinOpPred, BinOpType, ColumnRefPred, ConstantPred, JoinType, ListPred,
    LogicalJoin, LogicalScan, LogicalSort, RelNodeTyp, RelReprPlanNode, RelReprPredNode,
    SortOrderPred, SortOrderType,
};
use cascabel_repr::properties::{NoEnforcerModel, RelPropertyModel};
use cascabel_repr::{default_optimizer, default_rules};

fn tables(rows: &[(&str, usize)]) -> HashMap<Arc<str>, usize> {
    rows.iter().map(|&(t, n)| (t.into(), n)).collect()
}

fn scan(table: &str) -> ArcRelPlanNode {
    LogicalScan::new(table).into_plan_node()
}

fn join(left: ArcRelPlanNode, right: ArcRelPlanNode) -> ArcRelPlanNode {
    LogicalJoin::new(
        left,
        right,
        ConstantPred::bool(true).into_pred_node(),
        JoinType::Inner,
    )
    .into_plan_node()
}

fn equi_join(left: ArcRelPlanNode, right: ArcRelPlanNode) -> ArcRelPlanNode {
    let cond = BinOpPred::new(
        ColumnRefPred::new(0).into_pred_node(),
        ColumnRefPred::new(0).into_pred_node(),
        BinOpType::Eq,
    );
    LogicalJoin::new(left, right, cond.into_pred_node(), JoinType::Inner).into_plan_node()
}

fn sort_by(child: ArcRelPlanNode, column: usize) -> ArcRelPlanNode {
    let key = SortOrderPred::new(
        SortOrderType::Asc,
        ColumnRefPred::new(column).into_pred_node(),
    );
    LogicalSort::new(child, ListPred::new(vec![key.into_pred_node()]).into_pred_node())
        .into_plan_node()
}

fn ordered_by(column: usize) -> PropertySet {
    PropertySet::with_property(Property::SortOrder(vec![SortKey::asc(column)]))
}

#[test]
fn join_commutativity_picks_cheaper_orientation() {
    let mut optimizer = default_optimizer(tables(&[("t1", 1000), ("t2", 100)]));
    let plan = optimizer.optimize(join(scan("t1"), scan("t2"))).unwrap();

    // the cheaper orientation drives the smaller table as the outer side
    assert_eq!(
        plan.typ,
        RelNodeTyp::PhysicalNestedLoopJoin(JoinType::Inner)
    );
    assert_eq!(plan.child(0).typ, RelNodeTyp::PhysicalScan);
    assert_eq!(plan.child(1).typ, RelNodeTyp::PhysicalScan);
    let outer = LogicalScan::new("t2").into_plan_node().predicate(0);
    assert_eq!(plan.child(0).predicate(0), outer);

    // the join group holds two logical and two physical expressions
    let (root_group, _) = optimizer.record(join(scan("t1"), scan("t2")));
    assert_eq!(
        optimizer.memo().get_all_exprs_in_group(root_group).len(),
        4
    );
}

#[test]
fn equi_join_implements_as_hash_join() {
    let mut optimizer = default_optimizer(tables(&[("t1", 1000), ("t2", 100)]));
    let plan = optimizer
        .optimize(equi_join(scan("t1"), scan("t2")))
        .unwrap();
    assert_eq!(plan.typ, RelNodeTyp::PhysicalHashJoin(JoinType::Inner));
    // hash join builds on the right; the smaller table stays there
    let build = LogicalScan::new("t2").into_plan_node().predicate(0);
    assert_eq!(plan.child(1).predicate(0), build);
}

#[test]
fn equivalent_join_trees_share_a_group() {
    let mut optimizer = default_optimizer(tables(&[("a", 10), ("b", 20)]));
    let tree1 = join(scan("a"), join(scan("a"), scan("b")));
    let tree2 = join(join(scan("a"), scan("b")), scan("a"));

    optimizer.optimize(tree1.clone()).unwrap();
    let (group_1, _) = optimizer.record(tree1);
    let (group_2, _) = optimizer.record(tree2);
    assert_eq!(
        optimizer.memo().reduce_group(group_1),
        optimizer.memo().reduce_group(group_2)
    );
}

#[test]
fn sort_requirement_is_enforced() {
    let mut optimizer = CascadesOptimizer::new(
        default_rules(),
        Arc::new(RelCostModel::new(tables(&[("t1", 1000)]))),
        Arc::new(RelPropertyModel::new()),
    );
    let plan = optimizer.optimize(sort_by(scan("t1"), 0)).unwrap();

    assert_eq!(plan.typ, RelNodeTyp::PhysicalSort);
    assert_eq!(plan.child(0).typ, RelNodeTyp::PhysicalScan);

    let (group, _) = optimizer.record(scan("t1"));
    let enforced_cost = optimizer
        .memo()
        .winner(group, &ordered_by(0))
        .unwrap()
        .cost
        .total();

    // a scan that already delivers the order elides the sort and is
    // strictly cheaper
    let mut optimizer = CascadesOptimizer::new(
        default_rules(),
        Arc::new(RelCostModel::new(tables(&[("t1", 1000)]))),
        Arc::new(RelPropertyModel::new().with_sorted_table("t1", vec![SortKey::asc(0)])),
    );
    let plan = optimizer.optimize(sort_by(scan("t1"), 0)).unwrap();
    assert_eq!(plan.typ, RelNodeTyp::PhysicalScan);

    let (group, _) = optimizer.record(scan("t1"));
    let elided_cost = optimizer
        .memo()
        .winner(group, &ordered_by(0))
        .unwrap()
        .cost
        .total();
    assert!(elided_cost < enforced_cost);
}

#[test]
fn unenforceable_requirement_reports_no_plan() {
    let mut optimizer = CascadesOptimizer::new(
        default_rules(),
        Arc::new(RelCostModel::new(tables(&[("t1", 1000)]))),
        Arc::new(NoEnforcerModel(RelPropertyModel::new())),
    );
    let result = optimizer.optimize(sort_by(scan("t1"), 0));
    assert!(matches!(result, Err(OptimizeError::NoPlan { .. })));
}

#[test]
fn optimization_is_deterministic() {
    let run = || {
        let mut optimizer =
            default_optimizer(tables(&[("t1", 1000), ("t2", 100), ("t3", 10000)]));
        let tree = join(join(scan("t1"), scan("t2")), scan("t3"));
        let plan = optimizer.optimize(tree.clone()).unwrap();
        let (group, _) = optimizer.record(tree);
        let cost = optimizer
            .memo()
            .winner(group, &PropertySet::new())
            .unwrap()
            .cost
            .total();
        (format!("{}", plan), cost)
    };
    let (plan_1, cost_1) = run();
    let (plan_2, cost_2) = run();
    assert_eq!(plan_1, plan_2);
    assert_eq!(cost_1, cost_2);
}

#[test]
fn commute_pair_terminates_at_closure() {
    let mut optimizer = default_optimizer(tables(&[("a", 10), ("b", 20)]));
    let tree = join(scan("a"), scan("b"));
    optimizer.optimize(tree.clone()).unwrap();

    // closure: two logical joins, two physical joins, two scans with one
    // physical alternative each
    assert_eq!(optimizer.compute_plan_space(), 8);

    // applying commutativity to anything in the root group only reproduces
    // known expressions
    let (root_before, _) = optimizer.record(tree);
    let space_before = optimizer.compute_plan_space();
    let (root_after, _) = optimizer.record(join(scan("b"), scan("a")));
    assert_eq!(
        optimizer.memo().reduce_group(root_before),
        optimizer.memo().reduce_group(root_after)
    );
    assert_eq!(optimizer.compute_plan_space(), space_before);
}

#[test]
fn ingestion_is_idempotent() {
    let mut optimizer = default_optimizer(tables(&[("a", 10), ("b", 20)]));
    let tree = join(scan("a"), scan("b"));
    let first = optimizer.record(tree.clone());
    let second = optimizer.record(tree);
    assert_eq!(first, second);
}

#[test]
fn replanning_the_chosen_plan_keeps_its_cost() {
    let tree = join(scan("t1"), scan("t2"));
    let mut optimizer = default_optimizer(tables(&[("t1", 1000), ("t2", 100)]));
    let plan = optimizer.optimize(tree.clone()).unwrap();
    let (group, _) = optimizer.record(tree);
    let cost = optimizer
        .memo()
        .winner(group, &PropertySet::new())
        .unwrap()
        .cost
        .total();

    // feeding the physical winner back through a fresh optimizer yields a
    // plan of equal cost
    let mut optimizer = default_optimizer(tables(&[("t1", 1000), ("t2", 100)]));
    let replanned = optimizer.optimize(plan.clone()).unwrap();
    let (group, _) = optimizer.record(plan.clone());
    let replanned_cost = optimizer
        .memo()
        .winner(group, &PropertySet::new())
        .unwrap()
        .cost
        .total();
    assert_eq!(format!("{}", plan), format!("{}", replanned));
    assert_eq!(cost, replanned_cost);
}

#[test]
fn cost_ties_break_by_insertion_order() {
    // under a zero-cost model every candidate ties; the first physical
    // expression recorded must stay the winner
    let mut optimizer = CascadesOptimizer::new(
        default_rules(),
        Arc::new(DummyCostModel),
        Arc::new(RelPropertyModel::new()),
    );
    let plan = optimizer.optimize(join(scan("t1"), scan("t2"))).unwrap();
    assert_eq!(
        plan.typ,
        RelNodeTyp::PhysicalNestedLoopJoin(JoinType::Inner)
    );
    let original_outer = LogicalScan::new("t1").into_plan_node().predicate(0);
    assert_eq!(plan.child(0).predicate(0), original_outer);
}

#[test]
fn single_scan_implements_directly() {
    let mut optimizer = default_optimizer(tables(&[("t1", 50)]));
    let plan = optimizer.optimize(scan("t1")).unwrap();
    assert_eq!(plan.typ, RelNodeTyp::PhysicalScan);
    assert!(plan.children.is_empty());
}

#[test]
fn no_implementation_rules_means_no_plan() {
    let mut optimizer = CascadesOptimizer::new(
        vec![],
        Arc::new(RelCostModel::new(tables(&[]))),
        Arc::new(RelPropertyModel::new()),
    );
    let result = optimizer.optimize(scan("t1"));
    assert!(matches!(result, Err(OptimizeError::NoPlan { .. })));
}

#[test]
fn empty_statement_list_is_reported() {
    let mut optimizer = default_optimizer(tables(&[]));
    let result = optimizer.optimize_statements(vec![]);
    assert!(matches!(result, Err(OptimizeError::EmptyInput)));
}

#[test]
fn cancellation_aborts_the_search() {
    let mut optimizer = default_optimizer(tables(&[("a", 10), ("b", 20)]));
    optimizer.cancellation_token().cancel();
    let result = optimizer.optimize(join(scan("a"), scan("b")));
    assert!(matches!(result, Err(OptimizeError::Cancelled)));
}

#[test]
fn exhausted_explore_budget_still_plans() {
    let mut optimizer = CascadesOptimizer::new_with_prop(
        default_rules(),
        Arc::new(RelCostModel::new(tables(&[("t1", 1000), ("t2", 100)]))),
        Arc::new(RelPropertyModel::new()),
        OptimizerProperties {
            partial_explore_iter: Some(0),
        },
    );
    let plan = optimizer.optimize(join(scan("t1"), scan("t2"))).unwrap();
    assert_eq!(
        plan.typ,
        RelNodeTyp::PhysicalNestedLoopJoin(JoinType::Inner)
    );
    // no commuted alternative was generated
    assert_eq!(optimizer.compute_plan_space(), 6);
}
