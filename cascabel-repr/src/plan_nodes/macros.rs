macro_rules! define_plan_node {
    (
        $struct_name:ident,
        $variant:ident,
        [ $({ $child_id:literal, $child_name:ident }),* ] ,
        [ $({ $pred_id:literal, $pred_name:ident }),* ]
        $(, { $inner_name:ident : $inner_typ:ty })?
    ) => {
        impl crate::plan_nodes::RelReprPlanNode for $struct_name {
            fn into_plan_node(self) -> crate::plan_nodes::ArcRelPlanNode {
                self.0
            }

            fn from_plan_node(
                plan_node: crate::plan_nodes::ArcRelPlanNode,
            ) -> Option<Self> {
                #[allow(unused_variables)]
                if let crate::plan_nodes::RelNodeTyp::$variant $( ($inner_name) )? = plan_node.typ {
                    Some(Self(plan_node))
                } else {
                    None
                }
            }
        }

        impl $struct_name {
            pub fn new(
                $($child_name: crate::plan_nodes::ArcRelPlanNode,)*
                $($pred_name: crate::plan_nodes::ArcRelPredNode,)*
                $($inner_name: $inner_typ,)?
            ) -> $struct_name {
                $struct_name(std::sync::Arc::new(crate::plan_nodes::RelPlanNode {
                    typ: crate::plan_nodes::RelNodeTyp::$variant $( ($inner_name) )?,
                    children: vec![ $($child_name),* ],
                    predicates: vec![ $($pred_name),* ],
                }))
            }

            $(
                pub fn $child_name(&self) -> crate::plan_nodes::ArcRelPlanNode {
                    self.0.child($child_id)
                }
            )*

            $(
                pub fn $pred_name(&self) -> crate::plan_nodes::ArcRelPredNode {
                    self.0.predicate($pred_id)
                }
            )*

            $(
                pub fn $inner_name(&self) -> $inner_typ {
                    if let crate::plan_nodes::RelNodeTyp::$variant(x) = self.0.typ {
                        x
                    } else {
                        unreachable!()
                    }
                }
            )?
        }
    };
}

pub(crate) use define_plan_node;
