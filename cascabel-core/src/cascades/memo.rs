use std::collections::{hash_map::Entry, HashMap, HashSet};
use std::fmt::Display;
use std::sync::Arc;

use itertools::Itertools;
use tracing::trace;

use super::optimizer::{ExprId, GroupId};
use crate::cost::{Cost, Statistics};
use crate::nodes::{ArcPlanNode, ArcPredNode, NodeType, PlanNode};
use crate::property::PropertySet;

pub type MemoExprRef<T> = Arc<MemoExpr<T>>;

/// Fully unmaterialized plan node for fast hashing in the memo table: the
/// operator, its parameters, and the child groups. This is the unit of
/// memoization; two expressions are the same expression iff these fields
/// are equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MemoExpr<T: NodeType> {
    pub typ: T,
    pub children: Vec<GroupId>,
    pub predicates: Vec<ArcPredNode<T>>,
}

impl<T: NodeType> Display for MemoExpr<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}", self.typ)?;
        for child in &self.children {
            write!(f, " {}", child)?;
        }
        for pred in &self.predicates {
            write!(f, " {}", pred)?;
        }
        write!(f, ")")
    }
}

/// The chosen plan of a group under one required property set.
#[derive(Debug, Clone)]
pub struct WinnerInfo {
    pub expr_id: ExprId,
    pub cost: Cost,
    pub statistics: Statistics,
    /// Output properties the winning expression derives; always subsumes
    /// the required set it is keyed under.
    pub output: PropertySet,
    /// Input properties demanded of each child, in child order. Extraction
    /// recurses with these.
    pub inputs: Vec<PropertySet>,
}

/// Costing result of one expression under one required property set.
#[derive(Debug, Clone)]
pub struct ExprOptInfo {
    pub output: PropertySet,
    pub inputs: Vec<PropertySet>,
    pub cost: Cost,
    pub statistics: Statistics,
}

pub(crate) struct Group {
    pub(crate) group_exprs: HashSet<ExprId>,
    pub(crate) explored: bool,
    pub(crate) implemented: bool,
    /// Rule applications charged to this group, for the optional
    /// partial-exploration budget.
    pub(crate) rule_applications: usize,
    pub(crate) winners: HashMap<PropertySet, WinnerInfo>,
}

impl Group {
    fn new() -> Self {
        Self {
            group_exprs: HashSet::new(),
            explored: false,
            implemented: false,
            rule_applications: 0,
            winners: HashMap::new(),
        }
    }
}

pub struct Memo<T: NodeType> {
    // Source of truth.
    groups: HashMap<GroupId, Group>,
    expr_id_to_expr_node: HashMap<ExprId, MemoExprRef<T>>,

    // Internal states.
    group_expr_counter: usize,

    // Indexes.
    expr_node_to_expr_id: HashMap<MemoExpr<T>, ExprId>,
    expr_id_to_group_id: HashMap<ExprId, GroupId>,

    // Per-expression costing results, keyed by the required output
    // properties the expression was optimized under.
    expr_opt_info: HashMap<(ExprId, PropertySet), ExprOptInfo>,

    // We update all group IDs in the memo table upon group merging, but the
    // recursive search may still hold an old group ID. This mapping
    // redirects to the merged group ID.
    merged_group_mapping: HashMap<GroupId, GroupId>,
    dup_expr_mapping: HashMap<ExprId, ExprId>,
}

impl<T: NodeType> Memo<T> {
    pub fn new() -> Self {
        Self {
            groups: HashMap::new(),
            expr_id_to_expr_node: HashMap::new(),
            group_expr_counter: 0,
            expr_node_to_expr_id: HashMap::new(),
            expr_id_to_group_id: HashMap::new(),
            expr_opt_info: HashMap::new(),
            merged_group_mapping: HashMap::new(),
            dup_expr_mapping: HashMap::new(),
        }
    }

    /// Group id and expr id share one counter so that trace output reads
    /// unambiguously.
    fn next_group_id(&mut self) -> GroupId {
        let id = self.group_expr_counter;
        self.group_expr_counter += 1;
        GroupId(id)
    }

    fn next_expr_id(&mut self) -> ExprId {
        let id = self.group_expr_counter;
        self.group_expr_counter += 1;
        ExprId(id)
    }

    fn verify_integrity(&self) {
        if cfg!(debug_assertions) {
            let num_of_exprs = self.expr_id_to_expr_node.len();
            assert_eq!(num_of_exprs, self.expr_node_to_expr_id.len());
            assert_eq!(num_of_exprs, self.expr_id_to_group_id.len());

            let mut valid_groups = HashSet::new();
            for to in self.merged_group_mapping.values() {
                assert_eq!(self.merged_group_mapping[to], *to);
                valid_groups.insert(*to);
            }
            assert_eq!(valid_groups.len(), self.groups.len());

            for (id, node) in self.expr_id_to_expr_node.iter() {
                assert_eq!(self.expr_node_to_expr_id[node], *id);
                for child in &node.children {
                    assert!(
                        valid_groups.contains(child),
                        "invalid group used in expression {}, where {} does not exist any more",
                        node,
                        child
                    );
                }
            }

            let mut cnt = 0;
            for (group_id, group) in &self.groups {
                assert!(valid_groups.contains(group_id));
                cnt += group.group_exprs.len();
                assert!(!group.group_exprs.is_empty());
                for expr in &group.group_exprs {
                    assert_eq!(self.expr_id_to_group_id[expr], *group_id);
                }
            }
            assert_eq!(cnt, num_of_exprs);
        }
    }

    /// Add an expression tree into the memo. Children that are group
    /// placeholders resolve to their groups; fully materialized children
    /// are recorded bottom-up first. Returns the owning group and the expr
    /// id; recording an identical tree twice returns the same pair.
    pub fn add_new_expr(&mut self, plan_node: ArcPlanNode<T>) -> (GroupId, ExprId) {
        let (group_id, expr_id, _) = self.add_new_group_expr_inner(plan_node, None);
        self.verify_integrity();
        (group_id, expr_id)
    }

    /// Add an expression into `group_id`, merging groups if the canonical
    /// index shows the expression already lives in another group. Returns
    /// the expr id and whether the expression is new.
    pub fn add_expr_to_group(
        &mut self,
        plan_node: ArcPlanNode<T>,
        group_id: GroupId,
    ) -> (ExprId, bool) {
        let reduced_group_id = self.reduce_group(group_id);
        let (returned_group_id, expr_id, is_new) =
            self.add_new_group_expr_inner(plan_node, Some(reduced_group_id));
        debug_assert_eq!(returned_group_id, reduced_group_id);
        self.verify_integrity();
        (expr_id, is_new)
    }

    /// The current id of a possibly-merged group.
    pub fn reduce_group(&self, group_id: GroupId) -> GroupId {
        self.merged_group_mapping[&group_id]
    }

    fn add_new_group_expr_inner(
        &mut self,
        plan_node: ArcPlanNode<T>,
        add_to_group_id: Option<GroupId>,
    ) -> (GroupId, ExprId, bool) {
        let children_group_ids = plan_node
            .children
            .iter()
            .map(|child| match child.typ.extract_group() {
                Some(group_id) => self.reduce_group(group_id),
                None => self.add_new_expr(child.clone()).0,
            })
            .collect::<Vec<_>>();
        let memo_node = MemoExpr {
            typ: plan_node.typ.clone(),
            children: children_group_ids,
            predicates: plan_node.predicates.clone(),
        };
        if let Some(&expr_id) = self.expr_node_to_expr_id.get(&memo_node) {
            let group_id = self.expr_id_to_group_id[&expr_id];
            if let Some(add_to_group_id) = add_to_group_id {
                let add_to_group_id = self.reduce_group(add_to_group_id);
                self.merge_group_inner(add_to_group_id, group_id);
                return (add_to_group_id, expr_id, false);
            }
            return (group_id, expr_id, false);
        }
        let expr_id = self.next_expr_id();
        let group_id = if let Some(group_id) = add_to_group_id {
            group_id
        } else {
            self.next_group_id()
        };
        self.expr_id_to_expr_node
            .insert(expr_id, Arc::new(memo_node.clone()));
        self.expr_id_to_group_id.insert(expr_id, group_id);
        self.expr_node_to_expr_id.insert(memo_node.clone(), expr_id);
        self.append_expr_to_group(expr_id, group_id, memo_node);
        (group_id, expr_id, true)
    }

    fn append_expr_to_group(&mut self, expr_id: ExprId, group_id: GroupId, memo_node: MemoExpr<T>) {
        trace!(event = "add_expr_to_group", group_id = %group_id, expr_id = %expr_id, memo_node = %memo_node);
        if let Entry::Occupied(mut entry) = self.groups.entry(group_id) {
            entry.get_mut().group_exprs.insert(expr_id);
            return;
        }
        let mut group = Group::new();
        group.group_exprs.insert(expr_id);
        self.groups.insert(group_id, group);
        self.merged_group_mapping.insert(group_id, group_id);
    }

    fn merge_group_inner(&mut self, merge_into: GroupId, merge_from: GroupId) {
        if merge_into == merge_from {
            return;
        }
        trace!(event = "merge_group", merge_into = %merge_into, merge_from = %merge_from);
        let group_merge_from = self.groups.remove(&merge_from).unwrap();
        let group_merge_into = self.groups.get_mut(&merge_into).unwrap();
        // The flags must be re-earned by the surviving group, so both sides
        // have to agree for them to stick. Winners carry over and keep the
        // cheaper entry per requirement.
        group_merge_into.explored &= group_merge_from.explored;
        group_merge_into.implemented &= group_merge_from.implemented;
        group_merge_into.rule_applications += group_merge_from.rule_applications;
        for (required, winner) in group_merge_from.winners {
            match group_merge_into.winners.get(&required) {
                Some(incumbent) if incumbent.cost.total() <= winner.cost.total() => {}
                _ => {
                    group_merge_into.winners.insert(required, winner);
                }
            }
        }
        for from_expr in group_merge_from.group_exprs {
            let ret = self.expr_id_to_group_id.insert(from_expr, merge_into);
            debug_assert!(ret.is_some());
            self.groups
                .get_mut(&merge_into)
                .unwrap()
                .group_exprs
                .insert(from_expr);
        }
        self.merged_group_mapping.insert(merge_from, merge_into);

        // Update all indexes and other data structures
        // 1. update merged group mapping -- could be optimized with union find
        for (_, mapped_to) in self.merged_group_mapping.iter_mut() {
            if *mapped_to == merge_from {
                *mapped_to = merge_into;
            }
        }

        let mut pending_recursive_merge = Vec::new();
        let mut removed_exprs = Vec::new();
        // 2. update all group expressions and indexes
        for (group_id, group) in self.groups.iter_mut() {
            let mut new_expr_list = HashSet::new();
            for expr_id in group.group_exprs.iter() {
                let expr = self.expr_id_to_expr_node[expr_id].clone();
                if expr.children.contains(&merge_from) {
                    // Create the new expr node
                    let old_expr = expr.as_ref().clone();
                    let mut new_expr = expr.as_ref().clone();
                    new_expr.children.iter_mut().for_each(|x| {
                        if *x == merge_from {
                            *x = merge_into;
                        }
                    });
                    // Update all existing entries and indexes
                    self.expr_id_to_expr_node
                        .insert(*expr_id, Arc::new(new_expr.clone()));
                    self.expr_node_to_expr_id.remove(&old_expr);
                    if let Some(dup_expr) = self.expr_node_to_expr_id.get(&new_expr) {
                        // The rewritten expression collides with an existing
                        // one. Unless both live in this group already, their
                        // groups are equivalent too and must merge; either
                        // way this copy is dropped.
                        let dup_group_id = self.expr_id_to_group_id[dup_expr];
                        if dup_group_id != *group_id {
                            pending_recursive_merge.push((dup_group_id, *group_id));
                        }
                        self.expr_id_to_expr_node.remove(expr_id);
                        self.expr_id_to_group_id.remove(expr_id);
                        self.dup_expr_mapping.insert(*expr_id, *dup_expr);
                        removed_exprs.push(*expr_id);
                        new_expr_list.insert(*dup_expr); // adding this temporarily -- should be removed once recursive merge finishes
                    } else {
                        self.expr_node_to_expr_id.insert(new_expr, *expr_id);
                        new_expr_list.insert(*expr_id);
                    }
                } else {
                    new_expr_list.insert(*expr_id);
                }
            }
            assert!(!new_expr_list.is_empty());
            group.group_exprs = new_expr_list;
        }
        if !removed_exprs.is_empty() {
            self.expr_opt_info
                .retain(|(expr_id, _), _| !removed_exprs.contains(expr_id));
        }
        for (merge_from, merge_into) in pending_recursive_merge {
            // Reduce first: each merge may have invalidated groups seen in
            // the last loop iteration.
            let merge_from = self.reduce_group(merge_from);
            let merge_into = self.reduce_group(merge_into);
            self.merge_group_inner(merge_into, merge_from);
        }
    }

    /// Group id of an expression. Volatile across group merges.
    pub fn get_group_id(&self, mut expr_id: ExprId) -> GroupId {
        while let Some(new_expr_id) = self.dup_expr_mapping.get(&expr_id) {
            expr_id = *new_expr_id;
        }
        *self
            .expr_id_to_group_id
            .get(&expr_id)
            .expect("expr not found in group mapping")
    }

    pub fn get_expr_memoed(&self, mut expr_id: ExprId) -> MemoExprRef<T> {
        while let Some(new_expr_id) = self.dup_expr_mapping.get(&expr_id) {
            expr_id = *new_expr_id;
        }
        self.expr_id_to_expr_node
            .get(&expr_id)
            .expect("expr not found in expr mapping")
            .clone()
    }

    /// Expressions of a group in insertion order (ids are monotone).
    pub fn get_all_exprs_in_group(&self, group_id: GroupId) -> Vec<ExprId> {
        let group_id = self.reduce_group(group_id);
        let group = self.groups.get(&group_id).expect("group not found");
        let mut exprs = group.group_exprs.iter().copied().collect_vec();
        exprs.sort();
        exprs
    }

    pub fn get_all_group_ids(&self) -> Vec<GroupId> {
        let mut ids = self.groups.keys().copied().collect_vec();
        ids.sort();
        ids
    }

    fn group(&self, group_id: GroupId) -> &Group {
        let group_id = self.reduce_group(group_id);
        self.groups.get(&group_id).expect("group not found")
    }

    fn group_mut(&mut self, group_id: GroupId) -> &mut Group {
        let group_id = self.reduce_group(group_id);
        self.groups.get_mut(&group_id).expect("group not found")
    }

    pub fn is_group_explored(&self, group_id: GroupId) -> bool {
        self.group(group_id).explored
    }

    pub fn mark_group_explored(&mut self, group_id: GroupId) {
        self.group_mut(group_id).explored = true;
    }

    pub fn is_group_implemented(&self, group_id: GroupId) -> bool {
        self.group(group_id).implemented
    }

    pub fn mark_group_implemented(&mut self, group_id: GroupId) {
        self.group_mut(group_id).implemented = true;
    }

    pub fn group_rule_applications(&self, group_id: GroupId) -> usize {
        self.group(group_id).rule_applications
    }

    pub fn incr_group_rule_applications(&mut self, group_id: GroupId) {
        self.group_mut(group_id).rule_applications += 1;
    }

    pub fn winner(&self, group_id: GroupId, required: &PropertySet) -> Option<&WinnerInfo> {
        self.group(group_id).winners.get(required)
    }

    /// Install `info` as the winner for `required` if it strictly improves
    /// on the incumbent. Ties keep the incumbent, so enumeration order
    /// decides and the result is reproducible.
    pub fn update_winner_if_cheaper(
        &mut self,
        group_id: GroupId,
        required: PropertySet,
        info: WinnerInfo,
    ) -> bool {
        let group_id = self.reduce_group(group_id);
        let group = self.groups.get_mut(&group_id).expect("group not found");
        match group.winners.get(&required) {
            Some(incumbent) if incumbent.cost.total() <= info.cost.total() => false,
            _ => {
                trace!(event = "update_winner", group_id = %group_id, expr_id = %info.expr_id,
                    required = %required, total_cost = info.cost.total());
                group.winners.insert(required, info);
                true
            }
        }
    }

    pub fn expr_opt_info(&self, expr_id: ExprId, required: &PropertySet) -> Option<&ExprOptInfo> {
        self.expr_opt_info.get(&(expr_id, required.clone()))
    }

    pub fn set_expr_opt_info(&mut self, expr_id: ExprId, required: PropertySet, info: ExprOptInfo) {
        self.expr_opt_info.insert((expr_id, required), info);
    }

    /// Number of expressions in the memo table.
    pub fn compute_plan_space(&self) -> usize {
        self.expr_id_to_expr_node.len()
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    /// Materialize one expression with group placeholders as children.
    pub fn get_expr_binding(&self, expr_id: ExprId) -> ArcPlanNode<T> {
        let expr = self.get_expr_memoed(expr_id);
        Arc::new(PlanNode {
            typ: expr.typ.clone(),
            children: expr
                .children
                .iter()
                .map(|group| Arc::new(PlanNode::new_group(*group)))
                .collect_vec(),
            predicates: expr.predicates.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{PredNode, Value};

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    enum MemoTestTyp {
        Group(GroupId),
        Join,
        Project,
        Scan,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    enum MemoTestPredTyp {
        Table,
        Constant,
    }

    impl std::fmt::Display for MemoTestTyp {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::Group(x) => write!(f, "{}", x),
                other => write!(f, "{:?}", other),
            }
        }
    }

    impl std::fmt::Display for MemoTestPredTyp {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl NodeType for MemoTestTyp {
        type PredType = MemoTestPredTyp;

        fn is_logical(&self) -> bool {
            matches!(self, Self::Project | Self::Scan | Self::Join)
        }

        fn extract_group(&self) -> Option<GroupId> {
            match self {
                Self::Group(group_id) => Some(*group_id),
                _ => None,
            }
        }

        fn group_typ(group_id: GroupId) -> Self {
            Self::Group(group_id)
        }
    }

    fn table(name: &str) -> ArcPredNode<MemoTestTyp> {
        Arc::new(PredNode {
            typ: MemoTestPredTyp::Table,
            children: vec![],
            data: Some(Value::String(name.into())),
        })
    }

    fn constant(v: i64) -> ArcPredNode<MemoTestTyp> {
        Arc::new(PredNode {
            typ: MemoTestPredTyp::Constant,
            children: vec![],
            data: Some(Value::Int64(v)),
        })
    }

    fn scan(name: &str) -> ArcPlanNode<MemoTestTyp> {
        Arc::new(PlanNode {
            typ: MemoTestTyp::Scan,
            children: vec![],
            predicates: vec![table(name)],
        })
    }

    fn join(
        left: ArcPlanNode<MemoTestTyp>,
        right: ArcPlanNode<MemoTestTyp>,
    ) -> ArcPlanNode<MemoTestTyp> {
        Arc::new(PlanNode {
            typ: MemoTestTyp::Join,
            children: vec![left, right],
            predicates: vec![],
        })
    }

    fn project(child: ArcPlanNode<MemoTestTyp>, expr: i64) -> ArcPlanNode<MemoTestTyp> {
        Arc::new(PlanNode {
            typ: MemoTestTyp::Project,
            children: vec![child],
            predicates: vec![constant(expr)],
        })
    }

    #[test]
    fn add_commuted_join_to_group() {
        let mut memo = Memo::new();
        let (group_id, _) = memo.add_new_expr(join(scan("t1"), scan("t2")));
        let (_, is_new) = memo.add_expr_to_group(join(scan("t2"), scan("t1")), group_id);
        assert!(is_new);
        assert_eq!(memo.get_all_exprs_in_group(group_id).len(), 2);
    }

    #[test]
    fn identical_trees_dedup_to_one_group() {
        let mut memo = Memo::new();
        let (group_id_1, expr_id_1) =
            memo.add_new_expr(project(join(scan("t1"), scan("t2")), 1));
        let (group_id_2, expr_id_2) =
            memo.add_new_expr(project(join(scan("t1"), scan("t2")), 1));
        assert_eq!(group_id_1, group_id_2);
        assert_eq!(expr_id_1, expr_id_2);
    }

    #[test]
    fn merging_child_groups_merges_parents() {
        let mut memo = Memo::new();
        let expr1 = project(scan("t1"), 1);
        let expr2 = project(scan("t1-alias"), 1);
        memo.add_new_expr(expr1.clone());
        memo.add_new_expr(expr2.clone());
        // merging two child groups causes the parents to collapse
        let (scan_group, _) = memo.add_new_expr(scan("t1"));
        let (_, is_new) = memo.add_expr_to_group(scan("t1-alias"), scan_group);
        assert!(!is_new);
        let (group_1, _) = memo.add_new_expr(expr1);
        let (group_2, _) = memo.add_new_expr(expr2);
        assert_eq!(group_1, group_2);
    }

    #[test]
    fn cascading_merge() {
        let mut memo = Memo::new();
        let expr1 = project(project(scan("t1"), 1), 2);
        let expr2 = project(project(scan("t1-alias"), 1), 2);
        memo.add_new_expr(expr1.clone());
        memo.add_new_expr(expr2.clone());
        let (scan_group, _) = memo.add_new_expr(scan("t1"));
        memo.add_expr_to_group(scan("t1-alias"), scan_group);
        let (group_1, _) = memo.add_new_expr(expr1.clone());
        let (group_2, _) = memo.add_new_expr(expr2.clone());
        assert_eq!(group_1, group_2);
        let (mid_1, _) = memo.add_new_expr(expr1.child(0));
        let (mid_2, _) = memo.add_new_expr(expr2.child(0));
        assert_eq!(mid_1, mid_2);
    }

    #[test]
    fn predicates_distinguish_expressions() {
        let mut memo = Memo::new();
        let (group_1, _) = memo.add_new_expr(project(scan("t1"), 1));
        let (group_2, _) = memo.add_new_expr(project(scan("t1"), 2));
        assert_ne!(group_1, group_2);
    }
}
