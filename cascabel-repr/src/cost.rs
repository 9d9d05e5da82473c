//! Cost and cardinality model over per-table row counts.

use std::collections::HashMap;
use std::sync::Arc;

use cascabel_core::cost::{Cost, CostModel, Statistics};
use cascabel_core::nodes::Value;

use crate::plan_nodes::{ArcRelPredNode, RelNodeTyp};

pub const DEFAULT_TABLE_ROW_CNT: f64 = 1000.0;
pub const DEFAULT_FILTER_SELECTIVITY: f64 = 0.2;
pub const DEFAULT_JOIN_SELECTIVITY: f64 = 0.1;

/// Row-count summary of a group's output.
#[derive(Clone, Debug)]
pub struct RelStatistics {
    pub row_cnt: f64,
}

impl RelStatistics {
    pub fn new(row_cnt: f64) -> Statistics {
        Statistics(Arc::new(RelStatistics { row_cnt }))
    }

    pub fn row_cnt_of(statistics: &Statistics) -> f64 {
        statistics
            .0
            .downcast_ref::<RelStatistics>()
            .map(|s| s.row_cnt)
            .unwrap_or(DEFAULT_TABLE_ROW_CNT)
    }
}

fn row_cnt(children: &[&Statistics], idx: usize) -> f64 {
    children
        .get(idx)
        .map(|s| RelStatistics::row_cnt_of(s))
        .unwrap_or(DEFAULT_TABLE_ROW_CNT)
}

/// Cost slots: `[weighted total, compute, io]`.
fn cost(compute: f64, io: f64) -> Cost {
    Cost(vec![compute + io, compute, io])
}

pub struct RelCostModel {
    table_rows: HashMap<Arc<str>, usize>,
}

impl RelCostModel {
    pub fn new(table_rows: HashMap<Arc<str>, usize>) -> Self {
        Self { table_rows }
    }

    fn scan_rows(&self, predicates: &[ArcRelPredNode]) -> f64 {
        let table = match predicates.first().and_then(|p| p.data.clone()) {
            Some(Value::String(table)) => table,
            _ => return DEFAULT_TABLE_ROW_CNT,
        };
        self.table_rows
            .get(&table)
            .map(|&rows| rows as f64)
            .unwrap_or(DEFAULT_TABLE_ROW_CNT)
    }
}

impl CostModel<RelNodeTyp> for RelCostModel {
    fn derive_statistics(
        &self,
        node: &RelNodeTyp,
        predicates: &[ArcRelPredNode],
        children: &[&Statistics],
    ) -> Statistics {
        let row_cnt = match node {
            RelNodeTyp::PhysicalScan => self.scan_rows(predicates),
            RelNodeTyp::PhysicalFilter => row_cnt(children, 0) * DEFAULT_FILTER_SELECTIVITY,
            RelNodeTyp::PhysicalNestedLoopJoin(_) | RelNodeTyp::PhysicalHashJoin(_) => {
                row_cnt(children, 0) * row_cnt(children, 1) * DEFAULT_JOIN_SELECTIVITY
            }
            RelNodeTyp::PhysicalLimit => {
                let fetch = predicates
                    .first()
                    .and_then(|p| p.data.as_ref())
                    .map(|v| v.as_i64() as f64)
                    .unwrap_or(f64::MAX);
                row_cnt(children, 0).min(fetch)
            }
            _ => row_cnt(children, 0),
        };
        RelStatistics::new(row_cnt.max(1.0))
    }

    fn compute_operation_cost(
        &self,
        node: &RelNodeTyp,
        predicates: &[ArcRelPredNode],
        _children_costs: &[Cost],
        children_stats: &[&Statistics],
    ) -> Cost {
        match node {
            RelNodeTyp::PhysicalScan => cost(0.0, self.scan_rows(predicates)),
            RelNodeTyp::PhysicalFilter => cost(row_cnt(children_stats, 0), 0.0),
            RelNodeTyp::PhysicalNestedLoopJoin(_) => {
                let outer = row_cnt(children_stats, 0);
                let inner = row_cnt(children_stats, 1);
                cost(outer + outer * inner, 0.0)
            }
            RelNodeTyp::PhysicalHashJoin(_) => {
                let probe = row_cnt(children_stats, 0);
                let build = row_cnt(children_stats, 1);
                cost(probe + 2.0 * build, 0.0)
            }
            RelNodeTyp::PhysicalSort => {
                let rows = row_cnt(children_stats, 0).max(2.0);
                cost(rows * rows.log2(), 0.0)
            }
            RelNodeTyp::PhysicalProjection | RelNodeTyp::PhysicalLimit => {
                cost(row_cnt(children_stats, 0) * 0.01, 0.0)
            }
            _ => self.zero(),
        }
    }

    fn explain(&self, cost: &Cost) -> String {
        format!(
            "weighted={:.2},compute={:.2},io={:.2}",
            cost.0[0], cost.0[1], cost.0[2]
        )
    }

    fn accumulate(&self, total_cost: &mut Cost, cost: &Cost) {
        for (slot, value) in total_cost.0.iter_mut().zip(cost.0.iter()) {
            *slot += value;
        }
    }

    fn zero(&self) -> Cost {
        cost(0.0, 0.0)
    }
}

/// Zero-cost model. Intended for testing the search machinery when the
/// choice of winner does not matter.
pub struct DummyCostModel;

impl CostModel<RelNodeTyp> for DummyCostModel {
    fn derive_statistics(
        &self,
        _node: &RelNodeTyp,
        _predicates: &[ArcRelPredNode],
        _children: &[&Statistics],
    ) -> Statistics {
        RelStatistics::new(1.0)
    }

    fn compute_operation_cost(
        &self,
        _node: &RelNodeTyp,
        _predicates: &[ArcRelPredNode],
        _children_costs: &[Cost],
        _children_stats: &[&Statistics],
    ) -> Cost {
        Cost(vec![0.0])
    }

    fn explain(&self, _cost: &Cost) -> String {
        "dummy".to_string()
    }

    fn accumulate(&self, _total_cost: &mut Cost, _cost: &Cost) {}

    fn zero(&self) -> Cost {
        Cost(vec![0.0])
    }
}
