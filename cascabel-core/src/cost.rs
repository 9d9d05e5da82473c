use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

use crate::nodes::{ArcPredNode, NodeType};

/// Cost components of a physical expression. Slot 0 is the weighted total
/// used for winner comparison; the remaining slots are model-defined.
#[derive(Default, Clone, Debug, PartialOrd, PartialEq)]
pub struct Cost(pub Vec<f64>);

impl Cost {
    pub fn total(&self) -> f64 {
        self.0[0]
    }
}

/// Statistics summary of a group, opaque to the search framework. The cost
/// model downcasts to its own representation.
#[derive(Clone)]
pub struct Statistics(pub Arc<dyn Any + Send + Sync>);

impl Debug for Statistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<statistics>")
    }
}

pub trait CostModel<T: NodeType>: 'static + Send + Sync {
    /// Statistics of an expression from its children's statistics.
    fn derive_statistics(
        &self,
        node: &T,
        predicates: &[ArcPredNode<T>],
        children: &[&Statistics],
    ) -> Statistics;

    /// Cost of the operation itself, excluding child costs. Must be
    /// monotone in the child inputs so that locally best children compose
    /// into a globally best plan.
    fn compute_operation_cost(
        &self,
        node: &T,
        predicates: &[ArcPredNode<T>],
        children_costs: &[Cost],
        children_stats: &[&Statistics],
    ) -> Cost;

    fn explain(&self, cost: &Cost) -> String;

    fn accumulate(&self, total_cost: &mut Cost, cost: &Cost);

    fn sum(&self, operation_cost: &Cost, inputs: &[Cost]) -> Cost {
        let mut total_cost = operation_cost.clone();
        for input in inputs {
            self.accumulate(&mut total_cost, input);
        }
        total_cost
    }

    fn zero(&self) -> Cost;
}
