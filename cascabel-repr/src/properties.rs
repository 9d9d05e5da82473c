//! Physical property knowledge for the relational operator set.

use std::collections::HashMap;
use std::sync::Arc;

use cascabel_core::nodes::{ArcPlanNode, NodeType};
use cascabel_core::physical_prop::{Enforcer, PropertyModel};
use cascabel_core::property::{Property, PropertyKind, PropertySet, SortKey};
use itertools::Itertools;

use crate::plan_nodes::{
    ArcRelPredNode, ColumnRefPred, ListPred, RelNodeTyp, RelReprPredNode, SortOrderPred,
    SortOrderType, TablePred,
};

/// Decode a sort-key list predicate (a `List` of `SortOrder` over
/// `ColumnRef`) into lattice sort keys.
pub fn sort_keys_from_pred(pred: &ArcRelPredNode) -> Vec<SortKey> {
    let list = ListPred::from_pred_node(pred.clone()).expect("sort keys must be a list");
    list.children()
        .iter()
        .map(|child| {
            let order = SortOrderPred::from_pred_node(child.clone())
                .expect("sort key must be a sort-order predicate");
            let column = ColumnRefPred::from_pred_node(order.child())
                .expect("sort key must order a column reference")
                .index();
            match order.order() {
                SortOrderType::Asc => SortKey::asc(column),
                SortOrderType::Desc => SortKey::desc(column),
            }
        })
        .collect_vec()
}

/// Encode lattice sort keys back into the list predicate carried by sort
/// operators.
pub fn sort_keys_to_pred(keys: &[SortKey]) -> ArcRelPredNode {
    ListPred::new(
        keys.iter()
            .map(|key| {
                let order = if key.desc {
                    SortOrderType::Desc
                } else {
                    SortOrderType::Asc
                };
                SortOrderPred::new(order, ColumnRefPred::new(key.column).into_pred_node())
                    .into_pred_node()
            })
            .collect_vec(),
    )
    .into_pred_node()
}

fn sort_set(keys: Vec<SortKey>) -> PropertySet {
    if keys.is_empty() {
        PropertySet::new()
    } else {
        PropertySet::with_property(Property::SortOrder(keys))
    }
}

/// Property model of the relational operator set. Tables registered via
/// [`RelPropertyModel::with_sorted_table`] are stored in that order (e.g. a
/// clustered index), so a plain scan of them already delivers it.
pub struct RelPropertyModel {
    sorted_tables: HashMap<Arc<str>, Vec<SortKey>>,
}

impl RelPropertyModel {
    pub fn new() -> Self {
        Self {
            sorted_tables: HashMap::new(),
        }
    }

    pub fn with_sorted_table(mut self, table: impl Into<Arc<str>>, keys: Vec<SortKey>) -> Self {
        self.sorted_tables.insert(table.into(), keys);
        self
    }

    fn table_order(&self, predicates: &[ArcRelPredNode]) -> Vec<SortKey> {
        let table = TablePred::from_pred_node(predicates[0].clone())
            .expect("scan must carry a table predicate")
            .table();
        self.sorted_tables.get(&table).cloned().unwrap_or_default()
    }
}

impl PropertyModel<RelNodeTyp> for RelPropertyModel {
    fn extract_required(
        &self,
        root: ArcPlanNode<RelNodeTyp>,
    ) -> (PropertySet, ArcPlanNode<RelNodeTyp>) {
        // A topmost sort is the plan-level ORDER BY; it becomes the
        // required output property and the tree below it is what gets
        // ingested. Inner sorts stay ordinary operators.
        if root.typ == RelNodeTyp::Sort {
            let keys = sort_keys_from_pred(&root.predicate(0));
            (sort_set(keys), root.child(0))
        } else {
            (PropertySet::new(), root)
        }
    }

    fn output_input_pairs(
        &self,
        typ: &RelNodeTyp,
        predicates: &[ArcRelPredNode],
        arity: usize,
        required: &PropertySet,
    ) -> Vec<(PropertySet, Vec<PropertySet>)> {
        match typ {
            RelNodeTyp::PhysicalScan => {
                vec![(sort_set(self.table_order(predicates)), vec![])]
            }
            RelNodeTyp::PhysicalSort => {
                // A sort imposes its key order no matter how the input
                // arrives; any non-ordering requirement passes through.
                let keys = sort_keys_from_pred(&predicates[0]);
                vec![(
                    sort_set(keys),
                    vec![required.without(PropertyKind::SortOrder)],
                )]
            }
            RelNodeTyp::PhysicalFilter | RelNodeTyp::PhysicalLimit => {
                // Order-preserving: either demand nothing, or pass an
                // ordering requirement down to the input.
                let mut pairs = vec![(PropertySet::new(), vec![PropertySet::new()])];
                if let Some(keys) = required.sort_order() {
                    let sorted = sort_set(keys.to_vec());
                    pairs.push((sorted.clone(), vec![sorted]));
                }
                pairs
            }
            RelNodeTyp::PhysicalProjection => {
                vec![(PropertySet::new(), vec![PropertySet::new()])]
            }
            RelNodeTyp::PhysicalNestedLoopJoin(_) | RelNodeTyp::PhysicalHashJoin(_) => {
                vec![(PropertySet::new(), vec![PropertySet::new(), PropertySet::new()])]
            }
            _ => {
                debug_assert!(!typ.is_physical(), "unhandled physical operator {}", typ);
                let _ = arity;
                vec![]
            }
        }
    }

    fn derive(
        &self,
        typ: &RelNodeTyp,
        predicates: &[ArcRelPredNode],
        children: &[&PropertySet],
    ) -> PropertySet {
        match typ {
            RelNodeTyp::PhysicalScan => sort_set(self.table_order(predicates)),
            RelNodeTyp::PhysicalSort => sort_set(sort_keys_from_pred(&predicates[0])),
            // Filters and limits keep whatever order and distribution the
            // input delivered.
            RelNodeTyp::PhysicalFilter | RelNodeTyp::PhysicalLimit => children[0].clone(),
            _ => PropertySet::new(),
        }
    }

    fn enforcer(&self, required: &PropertySet) -> Option<Enforcer<RelNodeTyp>> {
        let keys = required.sort_order()?;
        Some(Enforcer {
            typ: RelNodeTyp::PhysicalSort,
            predicates: vec![sort_keys_to_pred(keys)],
            child_required: required.without(PropertyKind::SortOrder),
        })
    }
}

/// Same operator knowledge, but no enforcers: a requirement nothing
/// satisfies intrinsically stays unsatisfied.
pub struct NoEnforcerModel(pub RelPropertyModel);

impl PropertyModel<RelNodeTyp> for NoEnforcerModel {
    fn extract_required(
        &self,
        root: ArcPlanNode<RelNodeTyp>,
    ) -> (PropertySet, ArcPlanNode<RelNodeTyp>) {
        self.0.extract_required(root)
    }

    fn output_input_pairs(
        &self,
        typ: &RelNodeTyp,
        predicates: &[ArcRelPredNode],
        arity: usize,
        required: &PropertySet,
    ) -> Vec<(PropertySet, Vec<PropertySet>)> {
        self.0.output_input_pairs(typ, predicates, arity, required)
    }

    fn derive(
        &self,
        typ: &RelNodeTyp,
        predicates: &[ArcRelPredNode],
        children: &[&PropertySet],
    ) -> PropertySet {
        self.0.derive(typ, predicates, children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_keys_round_trip() {
        let keys = vec![SortKey::asc(1), SortKey::desc(3)];
        assert_eq!(sort_keys_from_pred(&sort_keys_to_pred(&keys)), keys);
    }

    #[test]
    fn scan_of_sorted_table_derives_order() {
        let model = RelPropertyModel::new().with_sorted_table("t1", vec![SortKey::asc(0)]);
        let preds = vec![TablePred::new("t1").into_pred_node()];
        let derived = model.derive(&RelNodeTyp::PhysicalScan, &preds, &[]);
        assert_eq!(derived.sort_order(), Some(&[SortKey::asc(0)][..]));

        let preds = vec![TablePred::new("t2").into_pred_node()];
        let derived = model.derive(&RelNodeTyp::PhysicalScan, &preds, &[]);
        assert!(derived.is_empty());
    }
}
