use std::sync::Arc;

use cascabel_core::nodes::Value;

use super::{ArcRelPredNode, RelPredNode, RelPredType, RelReprPredNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstantType {
    Bool,
    Int64,
    UInt64,
    Float64,
    Utf8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOpType {
    Eq,
    Neq,
    Lt,
    Leq,
    Gt,
    Geq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogOpType {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrderType {
    Asc,
    Desc,
}

#[derive(Clone, Debug)]
pub struct ColumnRefPred(pub ArcRelPredNode);

impl ColumnRefPred {
    pub fn new(column_idx: usize) -> Self {
        Self(Arc::new(RelPredNode {
            typ: RelPredType::ColumnRef,
            children: vec![],
            data: Some(Value::UInt64(column_idx as u64)),
        }))
    }

    pub fn index(&self) -> usize {
        self.0.data.as_ref().unwrap().as_u64() as usize
    }
}

impl RelReprPredNode for ColumnRefPred {
    fn into_pred_node(self) -> ArcRelPredNode {
        self.0
    }

    fn from_pred_node(pred_node: ArcRelPredNode) -> Option<Self> {
        if pred_node.typ == RelPredType::ColumnRef {
            Some(Self(pred_node))
        } else {
            None
        }
    }
}

#[derive(Clone, Debug)]
pub struct ConstantPred(pub ArcRelPredNode);

impl ConstantPred {
    pub fn new(typ: ConstantType, value: Value) -> Self {
        Self(Arc::new(RelPredNode {
            typ: RelPredType::Constant(typ),
            children: vec![],
            data: Some(value),
        }))
    }

    pub fn bool(value: bool) -> Self {
        Self::new(ConstantType::Bool, Value::Bool(value))
    }

    pub fn int64(value: i64) -> Self {
        Self::new(ConstantType::Int64, Value::Int64(value))
    }

    pub fn float64(value: f64) -> Self {
        Self::new(ConstantType::Float64, Value::Float64(value))
    }

    pub fn value(&self) -> Value {
        self.0.data.clone().unwrap()
    }
}

impl RelReprPredNode for ConstantPred {
    fn into_pred_node(self) -> ArcRelPredNode {
        self.0
    }

    fn from_pred_node(pred_node: ArcRelPredNode) -> Option<Self> {
        if matches!(pred_node.typ, RelPredType::Constant(_)) {
            Some(Self(pred_node))
        } else {
            None
        }
    }
}

#[derive(Clone, Debug)]
pub struct BinOpPred(pub ArcRelPredNode);

impl BinOpPred {
    pub fn new(left: ArcRelPredNode, right: ArcRelPredNode, op: BinOpType) -> Self {
        Self(Arc::new(RelPredNode {
            typ: RelPredType::BinOp(op),
            children: vec![left, right],
            data: None,
        }))
    }

    pub fn op(&self) -> BinOpType {
        if let RelPredType::BinOp(op) = self.0.typ {
            op
        } else {
            unreachable!()
        }
    }

    pub fn left(&self) -> ArcRelPredNode {
        self.0.child(0)
    }

    pub fn right(&self) -> ArcRelPredNode {
        self.0.child(1)
    }
}

impl RelReprPredNode for BinOpPred {
    fn into_pred_node(self) -> ArcRelPredNode {
        self.0
    }

    fn from_pred_node(pred_node: ArcRelPredNode) -> Option<Self> {
        if matches!(pred_node.typ, RelPredType::BinOp(_)) {
            Some(Self(pred_node))
        } else {
            None
        }
    }
}

#[derive(Clone, Debug)]
pub struct LogOpPred(pub ArcRelPredNode);

impl LogOpPred {
    pub fn new(op: LogOpType, children: Vec<ArcRelPredNode>) -> Self {
        Self(Arc::new(RelPredNode {
            typ: RelPredType::LogOp(op),
            children,
            data: None,
        }))
    }

    pub fn children(&self) -> &[ArcRelPredNode] {
        &self.0.children
    }
}

impl RelReprPredNode for LogOpPred {
    fn into_pred_node(self) -> ArcRelPredNode {
        self.0
    }

    fn from_pred_node(pred_node: ArcRelPredNode) -> Option<Self> {
        if matches!(pred_node.typ, RelPredType::LogOp(_)) {
            Some(Self(pred_node))
        } else {
            None
        }
    }
}

/// One ORDER BY key: direction over a column reference.
#[derive(Clone, Debug)]
pub struct SortOrderPred(pub ArcRelPredNode);

impl SortOrderPred {
    pub fn new(order: SortOrderType, child: ArcRelPredNode) -> Self {
        Self(Arc::new(RelPredNode {
            typ: RelPredType::SortOrder(order),
            children: vec![child],
            data: None,
        }))
    }

    pub fn order(&self) -> SortOrderType {
        if let RelPredType::SortOrder(order) = self.0.typ {
            order
        } else {
            unreachable!()
        }
    }

    pub fn child(&self) -> ArcRelPredNode {
        self.0.child(0)
    }
}

impl RelReprPredNode for SortOrderPred {
    fn into_pred_node(self) -> ArcRelPredNode {
        self.0
    }

    fn from_pred_node(pred_node: ArcRelPredNode) -> Option<Self> {
        if matches!(pred_node.typ, RelPredType::SortOrder(_)) {
            Some(Self(pred_node))
        } else {
            None
        }
    }
}

#[derive(Clone, Debug)]
pub struct TablePred(pub ArcRelPredNode);

impl TablePred {
    pub fn new(table: impl Into<Arc<str>>) -> Self {
        Self(Arc::new(RelPredNode {
            typ: RelPredType::Table,
            children: vec![],
            data: Some(Value::String(table.into())),
        }))
    }

    pub fn table(&self) -> Arc<str> {
        self.0.data.as_ref().unwrap().as_str()
    }
}

impl RelReprPredNode for TablePred {
    fn into_pred_node(self) -> ArcRelPredNode {
        self.0
    }

    fn from_pred_node(pred_node: ArcRelPredNode) -> Option<Self> {
        if pred_node.typ == RelPredType::Table {
            Some(Self(pred_node))
        } else {
            None
        }
    }
}

#[derive(Clone, Debug)]
pub struct ListPred(pub ArcRelPredNode);

impl ListPred {
    pub fn new(children: Vec<ArcRelPredNode>) -> Self {
        Self(Arc::new(RelPredNode {
            typ: RelPredType::List,
            children,
            data: None,
        }))
    }

    pub fn len(&self) -> usize {
        self.0.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.children.is_empty()
    }

    pub fn child(&self, idx: usize) -> ArcRelPredNode {
        self.0.child(idx)
    }

    pub fn children(&self) -> &[ArcRelPredNode] {
        &self.0.children
    }
}

impl RelReprPredNode for ListPred {
    fn into_pred_node(self) -> ArcRelPredNode {
        self.0
    }

    fn from_pred_node(pred_node: ArcRelPredNode) -> Option<Self> {
        if pred_node.typ == RelPredType::List {
            Some(Self(pred_node))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_constants_compare_by_bits() {
        let a = ConstantPred::float64(1.5);
        let b = ConstantPred::float64(1.5);
        assert_eq!(a.0, b.0);
        assert_eq!(a.value().as_f64(), 1.5);
        // bit equality: -0.0 and 0.0 are distinct memo keys
        assert_ne!(ConstantPred::float64(-0.0).0, ConstantPred::float64(0.0).0);
    }
}
