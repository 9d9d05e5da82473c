//! Pattern binding against the memo.
//!
//! [`BindingIter`] enumerates every embedding of a rule pattern rooted at
//! one memo expression. The iterator keeps one cursor per pattern level: a
//! nested match walks the expressions of its group in insertion order
//! while the levels below it hold their own cursors, odometer-style. Each
//! binding is produced on demand, so a failing rule guard stops the
//! enumeration without any level ever building its cross product. The
//! insertion-order walks keep the whole optimization reproducible.

use std::sync::Arc;

use super::memo::Memo;
use super::optimizer::{ExprId, GroupId};
use crate::nodes::{ArcPlanNode, ArcPredNode, NodeType, PlanNode};
use crate::rules::Pattern;

pub struct BindingIter<'a, T: NodeType> {
    memo: &'a Memo<T>,
    state: Option<NodeState<'a, T>>,
}

impl<'a, T: NodeType> BindingIter<'a, T> {
    pub fn new(memo: &'a Memo<T>, expr_id: ExprId, pattern: &'a Pattern<T>) -> Self {
        if !matches!(pattern, Pattern::Match { .. }) {
            panic!("top node of a rule pattern must be a match node");
        }
        Self {
            memo,
            state: NodeState::init(memo, pattern, expr_id),
        }
    }
}

impl<T: NodeType> Iterator for BindingIter<'_, T> {
    type Item = ArcPlanNode<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let state = self.state.as_mut()?;
        let binding = state.current();
        if !state.advance(self.memo) {
            self.state = None;
        }
        Some(binding)
    }
}

/// Cursor over the bindings of one `Match` level against one expression:
/// the expression's payload plus one child cursor per subpattern.
struct NodeState<'a, T: NodeType> {
    typ: T,
    predicates: Vec<ArcPredNode<T>>,
    children: Vec<ChildState<'a, T>>,
}

/// Cursor of one child position of a match.
enum ChildState<'a, T: NodeType> {
    /// A leaf binds the whole group as a placeholder, exactly once.
    Leaf { group_id: GroupId },
    /// A nested match walks the group's expressions in insertion order,
    /// holding the cursor state of the expression it is currently bound to.
    Node {
        pattern: &'a Pattern<T>,
        exprs: Vec<ExprId>,
        next_idx: usize,
        inner: Option<Box<NodeState<'a, T>>>,
    },
}

impl<'a, T: NodeType> NodeState<'a, T> {
    /// Position a cursor at the first binding of `pattern` against
    /// `expr_id`, or `None` when the expression does not embed it.
    fn init(memo: &Memo<T>, pattern: &'a Pattern<T>, expr_id: ExprId) -> Option<Self> {
        let Pattern::Match { typ, children } = pattern else {
            unreachable!("node cursor built from a leaf pattern");
        };
        let expr = memo.get_expr_memoed(expr_id);
        if typ != &expr.typ || children.len() != expr.children.len() {
            return None;
        }
        let mut child_states = Vec::with_capacity(children.len());
        for (subpattern, group_id) in children.iter().zip(expr.children.iter()) {
            let mut child = match subpattern {
                Pattern::Any => ChildState::Leaf {
                    group_id: *group_id,
                },
                Pattern::Match { .. } => ChildState::Node {
                    pattern: subpattern,
                    exprs: memo.get_all_exprs_in_group(*group_id),
                    next_idx: 0,
                    inner: None,
                },
            };
            if !child.reset(memo) {
                return None;
            }
            child_states.push(child);
        }
        Some(Self {
            typ: expr.typ.clone(),
            predicates: expr.predicates.clone(),
            children: child_states,
        })
    }

    /// Materialize the binding the cursors currently point at.
    fn current(&self) -> ArcPlanNode<T> {
        Arc::new(PlanNode {
            typ: self.typ.clone(),
            children: self.children.iter().map(|child| child.current()).collect(),
            predicates: self.predicates.clone(),
        })
    }

    /// Odometer step: advance the least significant child cursor that has
    /// bindings left and rewind everything after it.
    fn advance(&mut self, memo: &Memo<T>) -> bool {
        for idx in (0..self.children.len()).rev() {
            if self.children[idx].advance(memo) {
                for child in &mut self.children[idx + 1..] {
                    let rewound = child.reset(memo);
                    debug_assert!(rewound, "cursor lost its bindings");
                }
                return true;
            }
        }
        false
    }
}

impl<'a, T: NodeType> ChildState<'a, T> {
    fn current(&self) -> ArcPlanNode<T> {
        match self {
            ChildState::Leaf { group_id } => Arc::new(PlanNode::new_group(*group_id)),
            ChildState::Node { inner, .. } => {
                inner.as_ref().expect("cursor not positioned").current()
            }
        }
    }

    /// Move to the next binding of this child: descend into the inner
    /// cursor first, then fall over to the group's next matching
    /// expression.
    fn advance(&mut self, memo: &Memo<T>) -> bool {
        match self {
            ChildState::Leaf { .. } => false,
            ChildState::Node {
                pattern,
                exprs,
                next_idx,
                inner,
            } => {
                if let Some(inner_state) = inner {
                    if inner_state.advance(memo) {
                        return true;
                    }
                }
                while *next_idx < exprs.len() {
                    let expr_id = exprs[*next_idx];
                    *next_idx += 1;
                    if let Some(state) = NodeState::init(memo, *pattern, expr_id) {
                        *inner = Some(Box::new(state));
                        return true;
                    }
                }
                false
            }
        }
    }

    /// Rewind to the first binding; reports whether one exists.
    fn reset(&mut self, memo: &Memo<T>) -> bool {
        if let ChildState::Node {
            next_idx, inner, ..
        } = self
        {
            *next_idx = 0;
            *inner = None;
        } else {
            return true;
        }
        self.advance(memo)
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;
    use crate::cascades::memo::Memo;
    use crate::nodes::{ArcPredNode, PredNode, Value};

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    enum BindTestTyp {
        Group(GroupId),
        Join,
        Scan,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    enum BindTestPredTyp {
        Table,
    }

    impl std::fmt::Display for BindTestTyp {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::Group(x) => write!(f, "{}", x),
                other => write!(f, "{:?}", other),
            }
        }
    }

    impl std::fmt::Display for BindTestPredTyp {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl NodeType for BindTestTyp {
        type PredType = BindTestPredTyp;

        fn is_logical(&self) -> bool {
            matches!(self, Self::Join | Self::Scan)
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

    fn table(name: &str) -> ArcPredNode<BindTestTyp> {
        Arc::new(PredNode {
            typ: BindTestPredTyp::Table,
            children: vec![],
            data: Some(Value::String(name.into())),
        })
    }

    fn scan(name: &str) -> ArcPlanNode<BindTestTyp> {
        Arc::new(PlanNode {
            typ: BindTestTyp::Scan,
            children: vec![],
            predicates: vec![table(name)],
        })
    }

    fn join(
        left: ArcPlanNode<BindTestTyp>,
        right: ArcPlanNode<BindTestTyp>,
    ) -> ArcPlanNode<BindTestTyp> {
        Arc::new(PlanNode {
            typ: BindTestTyp::Join,
            children: vec![left, right],
            predicates: vec![],
        })
    }

    fn join_pattern() -> Pattern<BindTestTyp> {
        Pattern::node(BindTestTyp::Join, vec![Pattern::Any, Pattern::Any])
    }

    #[test]
    fn leaf_children_bind_as_groups() {
        let mut memo = Memo::new();
        let (_, expr_id) = memo.add_new_expr(join(scan("a"), scan("b")));
        let bindings = BindingIter::new(&memo, expr_id, &join_pattern()).collect_vec();
        assert_eq!(bindings.len(), 1);
        assert!(bindings[0].child(0).typ.extract_group().is_some());
        assert!(bindings[0].child(1).typ.extract_group().is_some());
    }

    #[test]
    fn kind_mismatch_yields_nothing() {
        let mut memo = Memo::new();
        let (_, expr_id) = memo.add_new_expr(scan("a"));
        let bindings = BindingIter::new(&memo, expr_id, &join_pattern()).collect_vec();
        assert!(bindings.is_empty());
    }

    #[test]
    fn nested_pattern_enumerates_group_alternatives() {
        let mut memo = Memo::new();
        let inner = join(scan("a"), scan("b"));
        let (_, root_id) = memo.add_new_expr(join(inner.clone(), scan("c")));
        // add the commuted alternative to the inner group
        let (inner_group, _) = memo.add_new_expr(inner);
        memo.add_expr_to_group(join(scan("b"), scan("a")), inner_group);

        let pattern = Pattern::node(
            BindTestTyp::Join,
            vec![join_pattern(), Pattern::Any],
        );
        let bindings = BindingIter::new(&memo, root_id, &pattern).collect_vec();
        // two alternatives of the inner join group
        assert_eq!(bindings.len(), 2);
        // deterministic: first binding follows insertion order
        let first_inner = bindings[0].child(0);
        assert_eq!(first_inner.typ, BindTestTyp::Join);
        assert_ne!(bindings[0].child(0).children, bindings[1].child(0).children);
    }

    #[test]
    fn two_nested_levels_step_odometer_style() {
        let mut memo = Memo::new();
        let left = join(scan("a"), scan("b"));
        let right = join(scan("c"), scan("d"));
        let (_, root_id) = memo.add_new_expr(join(left.clone(), right.clone()));
        let (left_group, _) = memo.add_new_expr(left);
        memo.add_expr_to_group(join(scan("b"), scan("a")), left_group);
        let (right_group, _) = memo.add_new_expr(right);
        memo.add_expr_to_group(join(scan("d"), scan("c")), right_group);

        let pattern = Pattern::node(
            BindTestTyp::Join,
            vec![join_pattern(), join_pattern()],
        );
        let bindings = BindingIter::new(&memo, root_id, &pattern).collect_vec();
        // 2 alternatives on each side
        assert_eq!(bindings.len(), 4);
        // the right (least significant) cursor steps first
        assert_eq!(
            bindings[0].child(0).children,
            bindings[1].child(0).children
        );
        assert_ne!(
            bindings[0].child(1).children,
            bindings[1].child(1).children
        );
    }
}
