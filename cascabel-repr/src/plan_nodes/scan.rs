use std::sync::Arc;

use super::{
    ArcRelPlanNode, RelNodeTyp, RelPlanNode, RelReprPlanNode, RelReprPredNode, TablePred,
};

#[derive(Clone, Debug)]
pub struct LogicalScan(pub ArcRelPlanNode);

impl LogicalScan {
    pub fn new(table: impl Into<Arc<str>>) -> Self {
        Self(Arc::new(RelPlanNode {
            typ: RelNodeTyp::Scan,
            children: vec![],
            predicates: vec![TablePred::new(table).into_pred_node()],
        }))
    }

    pub fn table(&self) -> Arc<str> {
        TablePred::from_pred_node(self.0.predicate(0))
            .unwrap()
            .table()
    }
}

impl RelReprPlanNode for LogicalScan {
    fn into_plan_node(self) -> ArcRelPlanNode {
        self.0
    }

    fn from_plan_node(plan_node: ArcRelPlanNode) -> Option<Self> {
        if plan_node.typ == RelNodeTyp::Scan {
            Some(Self(plan_node))
        } else {
            None
        }
    }
}

#[derive(Clone, Debug)]
pub struct PhysicalScan(pub ArcRelPlanNode);

impl PhysicalScan {
    pub fn new(table: impl Into<Arc<str>>) -> Self {
        Self(Arc::new(RelPlanNode {
            typ: RelNodeTyp::PhysicalScan,
            children: vec![],
            predicates: vec![TablePred::new(table).into_pred_node()],
        }))
    }

    pub fn table(&self) -> Arc<str> {
        TablePred::from_pred_node(self.0.predicate(0))
            .unwrap()
            .table()
    }
}

impl RelReprPlanNode for PhysicalScan {
    fn into_plan_node(self) -> ArcRelPlanNode {
        self.0
    }

    fn from_plan_node(plan_node: ArcRelPlanNode) -> Option<Self> {
        if plan_node.typ == RelNodeTyp::PhysicalScan {
            Some(Self(plan_node))
        } else {
            None
        }
    }
}
