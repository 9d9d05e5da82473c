//! Plan node and predicate representation.
//!
//! A [`PlanNode`] is a materialized operator tree: every child is either a
//! full subtree or a group placeholder referring back into the memo. Group
//! placeholders are how rule bindings leave unexpanded children behind, and
//! how transformed plans reference the equivalence classes they came from.

use std::fmt::{Debug, Display};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::cascades::GroupId;

/// The node-type tag of a plan operator. Implementations are closed enums
/// split into a logical and a physical subset, plus a group placeholder
/// variant used during optimization.
pub trait NodeType:
    Clone + Debug + Display + Eq + Hash + Send + Sync + 'static
{
    type PredType: Clone + Debug + Display + Eq + Hash + Send + Sync + 'static;

    fn is_logical(&self) -> bool;

    fn is_physical(&self) -> bool {
        !self.is_logical() && self.extract_group().is_none()
    }

    /// If this is a group placeholder, the group it refers to.
    fn extract_group(&self) -> Option<GroupId>;

    /// The placeholder node type referring to `group_id`.
    fn group_typ(group_id: GroupId) -> Self;
}

/// Scalar constants carried by predicate leaves. Floats compare and hash
/// by bit pattern so that values stay usable as memo keys.
#[derive(Clone, Debug)]
pub enum Value {
    Bool(bool),
    Int64(i64),
    UInt64(u64),
    Float64(f64),
    String(Arc<str>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::UInt64(a), Value::UInt64(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Bool(v) => v.hash(state),
            Value::Int64(v) => v.hash(state),
            Value::UInt64(v) => v.hash(state),
            Value::Float64(v) => v.to_bits().hash(state),
            Value::String(v) => v.hash(state),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::UInt64(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "\"{}\"", v),
        }
    }
}

impl Value {
    pub fn as_i64(&self) -> i64 {
        match self {
            Value::Int64(v) => *v,
            _ => panic!("value is not i64: {}", self),
        }
    }

    pub fn as_u64(&self) -> u64 {
        match self {
            Value::UInt64(v) => *v,
            _ => panic!("value is not u64: {}", self),
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Value::Float64(v) => *v,
            _ => panic!("value is not f64: {}", self),
        }
    }

    pub fn as_str(&self) -> Arc<str> {
        match self {
            Value::String(v) => v.clone(),
            _ => panic!("value is not str: {}", self),
        }
    }
}

pub type ArcPredNode<T> = Arc<PredNode<T>>;

/// A predicate tree. Predicates are the kind-specific parameters of an
/// operator (conditions, column lists, table names); they are stored
/// verbatim inside memo expressions and take part in canonical hashing.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PredNode<T: NodeType> {
    pub typ: T::PredType,
    pub children: Vec<ArcPredNode<T>>,
    pub data: Option<Value>,
}

impl<T: NodeType> Display for PredNode<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}", self.typ)?;
        for child in &self.children {
            write!(f, " {}", child)?;
        }
        if let Some(data) = &self.data {
            write!(f, " {}", data)?;
        }
        write!(f, ")")
    }
}

impl<T: NodeType> PredNode<T> {
    pub fn child(&self, idx: usize) -> ArcPredNode<T> {
        self.children[idx].clone()
    }
}

pub type ArcPlanNode<T> = Arc<PlanNode<T>>;

/// A materialized operator tree node. Children whose `typ` extracts to a
/// group are placeholders into the memo rather than expanded subtrees.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PlanNode<T: NodeType> {
    pub typ: T,
    pub children: Vec<ArcPlanNode<T>>,
    pub predicates: Vec<ArcPredNode<T>>,
}

impl<T: NodeType> Display for PlanNode<T> {
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

impl<T: NodeType> PlanNode<T> {
    /// A placeholder node referring to a memo group.
    pub fn new_group(group_id: GroupId) -> Self {
        Self {
            typ: T::group_typ(group_id),
            children: vec![],
            predicates: vec![],
        }
    }

    pub fn child(&self, idx: usize) -> ArcPlanNode<T> {
        self.children[idx].clone()
    }

    pub fn predicate(&self, idx: usize) -> ArcPredNode<T> {
        self.predicates[idx].clone()
    }
}
