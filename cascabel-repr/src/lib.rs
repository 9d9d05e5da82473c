#![allow(clippy::new_without_default)]

use std::collections::HashMap;
use std::sync::Arc;

use cascabel_core::cascades::CascadesOptimizer;
use cascabel_core::rules::Rule;

pub mod cost;
pub mod plan_nodes;
pub mod properties;
pub mod rules;

pub use cascabel_core::nodes::Value;

use cost::RelCostModel;
use plan_nodes::RelNodeTyp;
use properties::RelPropertyModel;

/// The default rule set: join reordering plus the one-to-one physical
/// conversions and the hash join alternative.
pub fn default_rules() -> Vec<Arc<dyn Rule<RelNodeTyp>>> {
    let mut rules: Vec<Arc<dyn Rule<RelNodeTyp>>> = vec![
        Arc::new(rules::JoinCommuteRule::new()),
        Arc::new(rules::JoinAssocRule::new()),
    ];
    rules.extend(rules::PhysicalConversionRule::all_conversions());
    rules.push(Arc::new(rules::HashJoinRule::new()));
    rules
}

/// A ready-to-use optimizer over the default rule set, costed by per-table
/// row counts.
pub fn default_optimizer(
    table_rows: HashMap<Arc<str>, usize>,
) -> CascadesOptimizer<RelNodeTyp> {
    CascadesOptimizer::new(
        default_rules(),
        Arc::new(RelCostModel::new(table_rows)),
        Arc::new(RelPropertyModel::new()),
    )
}
