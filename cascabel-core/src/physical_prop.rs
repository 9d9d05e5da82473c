use crate::cost::Statistics;
use crate::nodes::{ArcPlanNode, ArcPredNode, NodeType};
use crate::property::PropertySet;

/// An enforcer operator produced by the property model to close a property
/// gap: a physical node planted on top of its own group, demanding only the
/// non-enforced remainder of the requirement from below.
pub struct Enforcer<T: NodeType> {
    pub typ: T,
    pub predicates: Vec<ArcPredNode<T>>,
    pub child_required: PropertySet,
}

/// Per-operator physical property knowledge: which requirements an input
/// plan root carries, which `(output, inputs)` modes a physical operator
/// offers under a requirement, what it actually delivers given its
/// children's outputs, and which enforcer (if any) can close a gap.
pub trait PropertyModel<T: NodeType>: 'static + Send + Sync {
    /// Split the required output properties off the root of an input plan,
    /// e.g. absorb a topmost sort into an ordering requirement. Returns the
    /// requirement and the tree to ingest.
    fn extract_required(&self, root: ArcPlanNode<T>) -> (PropertySet, ArcPlanNode<T>) {
        (PropertySet::new(), root)
    }

    /// The feasible `(output properties, per-child input properties)` modes
    /// of a physical operator under `required`. An operator may offer
    /// several modes (e.g. pass an ordering requirement down, or offer its
    /// intrinsic output order). Pairs whose children turn out to have no
    /// satisfying plan are skipped by the optimizer.
    fn output_input_pairs(
        &self,
        typ: &T,
        predicates: &[ArcPredNode<T>],
        arity: usize,
        required: &PropertySet,
    ) -> Vec<(PropertySet, Vec<PropertySet>)>;

    /// The output properties an operator delivers given the properties its
    /// chosen child plans actually derived.
    fn derive(
        &self,
        typ: &T,
        predicates: &[ArcPredNode<T>],
        children: &[&PropertySet],
    ) -> PropertySet;

    /// Statistics pass-through/adjustment for an enforcer node. The default
    /// keeps the child statistics unchanged, which holds for order-only
    /// enforcers.
    fn enforcer_statistics(&self, child: &Statistics) -> Statistics {
        child.clone()
    }

    /// An enforcer able to supply `required` when no expression of a group
    /// does. `None` means the requirement cannot be enforced and extraction
    /// will report that no plan exists.
    fn enforcer(&self, _required: &PropertySet) -> Option<Enforcer<T>> {
        None
    }
}
