use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use itertools::Itertools;
use tracing::trace;

use super::binding::BindingIter;
use super::error::OptimizeError;
use super::memo::{ExprOptInfo, Memo, WinnerInfo};
use crate::cost::CostModel;
use crate::nodes::{ArcPlanNode, NodeType, PlanNode};
use crate::physical_prop::PropertyModel;
use crate::property::PropertySet;
use crate::rules::{Rule, RuleCategory};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct GroupId(pub(super) usize);

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct ExprId(pub usize);

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct RuleId(pub usize);

impl Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "!{}", self.0)
    }
}

impl Display for ExprId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "R{}", self.0)
    }
}

impl From<usize> for RuleId {
    fn from(id: usize) -> Self {
        Self(id)
    }
}

/// Tuning knobs of one optimizer instance.
#[derive(Clone, Debug, Default)]
pub struct OptimizerProperties {
    /// Bound on productive rule applications charged to a single group.
    /// Guards against pathological rule sets; exploration of a group stops
    /// once the budget is spent.
    pub partial_explore_iter: Option<usize>,
}

/// Cooperative cancellation flag, checked at each recursion entry of the
/// search. Cloning shares the flag.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The cascades search engine: a memo of equivalence groups plus the
/// explore / implement / optimize / extract drivers.
///
/// One instance owns one memo and optimizes one query at a time; the caller
/// constructs it, runs [`CascadesOptimizer::optimize`], hands the returned
/// physical tree to the executor and drops the optimizer. Nothing is
/// retained across queries and nothing is shared across threads.
pub struct CascadesOptimizer<T: NodeType> {
    memo: Memo<T>,
    /// Transformation rules fired while exploring (logical -> logical).
    transformation_rules: Vec<(RuleId, Arc<dyn Rule<T>>)>,
    /// Implementation rules fired while implementing (logical -> physical).
    implementation_rules: Vec<(RuleId, Arc<dyn Rule<T>>)>,
    /// Cost model, used to determine the cost of a given plan.
    cost: Arc<dyn CostModel<T>>,
    /// Physical property knowledge: requirements, operator modes, enforcers.
    property_model: Arc<dyn PropertyModel<T>>,
    prop: OptimizerProperties,
    cancellation: CancellationToken,
}

impl<T: NodeType> CascadesOptimizer<T> {
    pub fn new(
        rules: Vec<Arc<dyn Rule<T>>>,
        cost: Arc<dyn CostModel<T>>,
        property_model: Arc<dyn PropertyModel<T>>,
    ) -> Self {
        Self::new_with_prop(rules, cost, property_model, OptimizerProperties::default())
    }

    pub fn new_with_prop(
        rules: Vec<Arc<dyn Rule<T>>>,
        cost: Arc<dyn CostModel<T>>,
        property_model: Arc<dyn PropertyModel<T>>,
        prop: OptimizerProperties,
    ) -> Self {
        let (transformation, implementation): (Vec<_>, Vec<_>) = rules
            .into_iter()
            .partition(|rule| rule.category() == RuleCategory::Transformation);
        // Assign rule IDs, transformation rules first
        let transformation_rules = transformation
            .into_iter()
            .enumerate()
            .map(|(i, r)| (RuleId(i), r))
            .collect_vec();
        let offset = transformation_rules.len();
        let implementation_rules = implementation
            .into_iter()
            .enumerate()
            .map(|(i, r)| (RuleId(i + offset), r))
            .collect_vec();
        Self {
            memo: Memo::new(),
            transformation_rules,
            implementation_rules,
            cost,
            property_model,
            prop,
            cancellation: CancellationToken::new(),
        }
    }

    /// A handle that cancels this optimization from another vantage point
    /// (e.g. a timeout watchdog).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn cost(&self) -> &Arc<dyn CostModel<T>> {
        &self.cost
    }

    pub fn memo(&self) -> &Memo<T> {
        &self.memo
    }

    /// Number of expressions in the memo table.
    pub fn compute_plan_space(&self) -> usize {
        self.memo.compute_plan_space()
    }

    /// Ingest an input operator tree, bottom-up, deduplicated.
    pub fn record(&mut self, root: ArcPlanNode<T>) -> (GroupId, ExprId) {
        self.memo.add_new_expr(root)
    }

    /// Optimize a batch of statements the way the planner entry point hands
    /// them over. Only the first statement is planned.
    pub fn optimize_statements(
        &mut self,
        statements: Vec<ArcPlanNode<T>>,
    ) -> Result<ArcPlanNode<T>, OptimizeError> {
        let Some(root) = statements.into_iter().next() else {
            return Err(OptimizeError::EmptyInput);
        };
        self.optimize(root)
    }

    /// Optimize one logical operator tree into the cheapest physical tree.
    /// The required output properties are read off the tree root (e.g. a
    /// topmost sort becomes an ordering requirement).
    pub fn optimize(&mut self, root: ArcPlanNode<T>) -> Result<ArcPlanNode<T>, OptimizeError> {
        let (required, root) = self.property_model.extract_required(root);
        self.optimize_with_required(root, required)
    }

    pub fn optimize_with_required(
        &mut self,
        root: ArcPlanNode<T>,
        required: PropertySet,
    ) -> Result<ArcPlanNode<T>, OptimizeError> {
        let (group_id, expr_id) = self.record(root);
        trace!(event = "optimize_begin", group_id = %group_id, expr_id = %expr_id, required = %required);
        self.explore_group(group_id)?;
        self.implement_group(group_id)?;
        self.optimize_group(group_id, &required)?;
        let plan = self.choose_best(group_id, &required)?;
        trace!(event = "optimize_finish", group_id = %group_id, plan_space = self.memo.compute_plan_space());
        Ok(plan)
    }

    /// Explore logically equivalent plans of a group to fixpoint: once a
    /// group is marked explored, every transformation rule applied to any
    /// of its expressions only reproduces expressions the memo already
    /// holds.
    fn explore_group(&mut self, group_id: GroupId) -> Result<(), OptimizeError> {
        let group_id = self.memo.reduce_group(group_id);
        if self.memo.is_group_explored(group_id) {
            return Ok(());
        }
        trace!(event = "explore_group", group_id = %group_id);
        // Snapshot the expression list: rule application grows the group
        // while it is iterated. Expressions inserted during this pass are
        // explored by the recursive call already issued on them.
        let exprs = self.memo.get_all_exprs_in_group(group_id);
        for expr_id in exprs {
            self.explore_expr(expr_id)?;
        }
        self.memo.mark_group_explored(group_id);
        Ok(())
    }

    fn explore_expr(&mut self, expr_id: ExprId) -> Result<(), OptimizeError> {
        self.check_cancelled()?;
        let expr = self.memo.get_expr_memoed(expr_id);
        if !expr.typ.is_logical() {
            return Ok(());
        }
        let group_id = self.memo.get_group_id(expr_id);
        trace!(event = "explore_expr", group_id = %group_id, expr_id = %expr_id, expr = %expr);

        // Apply all rules to one expression before moving on to the next
        // expression in the group: an application of some rule can create a
        // match for a previously checked rule, which would otherwise be
        // missed.
        let rules = self.transformation_rules.clone();
        for (rule_id, rule) in rules {
            if self.explore_budget_exhausted(group_id) {
                trace!(event = "explore_budget_exhausted", group_id = %group_id);
                break;
            }
            let candidates = self.transform_expr(expr_id, rule_id, &rule)?;
            for candidate in candidates {
                self.explore_expr(candidate)?;
            }
        }

        // Explore child groups; each runs against its own budget, so a
        // spent budget here must not cut them off.
        let children = self.memo.get_expr_memoed(expr_id).children.clone();
        for child_id in children {
            if !self.memo.is_group_explored(child_id) {
                self.explore_group(child_id)?;
            }
        }
        Ok(())
    }

    /// Produce physical alternatives for every logical expression of the
    /// group, then recurse into child groups.
    fn implement_group(&mut self, group_id: GroupId) -> Result<(), OptimizeError> {
        let group_id = self.memo.reduce_group(group_id);
        if self.memo.is_group_implemented(group_id) {
            return Ok(());
        }
        trace!(event = "implement_group", group_id = %group_id);
        let exprs = self.memo.get_all_exprs_in_group(group_id);
        for expr_id in exprs {
            self.implement_expr(expr_id)?;
        }
        self.memo.mark_group_implemented(group_id);
        Ok(())
    }

    fn implement_expr(&mut self, expr_id: ExprId) -> Result<(), OptimizeError> {
        self.check_cancelled()?;
        let expr = self.memo.get_expr_memoed(expr_id);
        if !expr.typ.is_logical() {
            return Ok(());
        }
        let group_id = self.memo.get_group_id(expr_id);
        trace!(event = "implement_expr", group_id = %group_id, expr_id = %expr_id, expr = %expr);
        let rules = self.implementation_rules.clone();
        for (rule_id, rule) in rules {
            self.transform_expr(expr_id, rule_id, &rule)?;
        }
        let children = self.memo.get_expr_memoed(expr_id).children.clone();
        for child_id in children {
            if !self.memo.is_group_implemented(child_id) {
                self.implement_group(child_id)?;
            }
        }
        Ok(())
    }

    /// Apply one rule to one expression: enumerate bindings, guard, record
    /// the transformed plans into the source group. A transformation
    /// preserves relational equivalence, so the results join the
    /// equivalence class they were derived from; the memo merges groups
    /// when two derivations converge. Returns the expressions that are new
    /// to the memo.
    fn transform_expr(
        &mut self,
        expr_id: ExprId,
        rule_id: RuleId,
        rule: &Arc<dyn Rule<T>>,
    ) -> Result<Vec<ExprId>, OptimizeError> {
        let group_id = self.memo.get_group_id(expr_id);
        let mut produced = Vec::new();
        for binding in BindingIter::new(&self.memo, expr_id, rule.pattern()) {
            if !rule.check(&binding) {
                continue;
            }
            trace!(event = "rule_match", rule_id = %rule_id, rule = %rule.name(), expr_id = %expr_id, binding = %binding);
            produced.extend(rule.transform(binding));
        }
        if produced.is_empty() {
            return Ok(vec![]);
        }
        self.memo.incr_group_rule_applications(group_id);
        let mut new_exprs = Vec::new();
        for plan in produced {
            let (new_expr_id, is_new) = self.memo.add_expr_to_group(Arc::new(plan), group_id);
            if is_new {
                trace!(event = "rule_produced_expr", rule_id = %rule_id, rule = %rule.name(), group_id = %group_id, new_expr_id = %new_expr_id);
                new_exprs.push(new_expr_id);
            }
        }
        Ok(new_exprs)
    }

    /// Find the cheapest physical plan of a group under `required`. The
    /// winner map doubles as the memoization table: a group already solved
    /// for these exact properties is not revisited.
    fn optimize_group(
        &mut self,
        group_id: GroupId,
        required: &PropertySet,
    ) -> Result<(), OptimizeError> {
        let group_id = self.memo.reduce_group(group_id);
        if self.memo.winner(group_id, required).is_some() {
            return Ok(());
        }
        trace!(event = "optimize_group", group_id = %group_id, required = %required);
        let exprs = self.memo.get_all_exprs_in_group(group_id);
        for expr_id in exprs {
            if self.memo.get_expr_memoed(expr_id).typ.is_physical() {
                self.optimize_expr(expr_id, required)?;
            }
        }
        if self.memo.winner(group_id, required).is_none() {
            self.try_enforce(group_id, required)?;
        }
        Ok(())
    }

    fn optimize_expr(
        &mut self,
        expr_id: ExprId,
        required: &PropertySet,
    ) -> Result<(), OptimizeError> {
        self.check_cancelled()?;
        let expr = self.memo.get_expr_memoed(expr_id);
        if !expr.typ.is_physical() {
            return Err(OptimizeError::InvariantViolated(format!(
                "optimize_expr on non-physical expression {}",
                expr
            )));
        }
        let group_id = self.memo.get_group_id(expr_id);
        trace!(event = "optimize_expr", group_id = %group_id, expr_id = %expr_id, expr = %expr, required = %required);

        let pairs = self.property_model.output_input_pairs(
            &expr.typ,
            &expr.predicates,
            expr.children.len(),
            required,
        );
        'pairs: for (advertised_output, input_props) in pairs {
            if input_props.len() != expr.children.len() {
                return Err(OptimizeError::InvariantViolated(format!(
                    "property model offered {} input sets for arity {} of {}",
                    input_props.len(),
                    expr.children.len(),
                    expr
                )));
            }
            let mut child_costs = Vec::with_capacity(expr.children.len());
            let mut child_stats = Vec::with_capacity(expr.children.len());
            let mut child_outputs = Vec::with_capacity(expr.children.len());
            for (idx, child_group) in expr.children.iter().enumerate() {
                let child_required = &input_props[idx];
                // An expression may reference its own group (enforcers do).
                // Demanding of that group exactly what is being computed
                // right now cannot make progress; skip the pair.
                if self.memo.reduce_group(*child_group) == group_id && child_required == required {
                    trace!(event = "skip_pair", reason = "self_reference", expr_id = %expr_id);
                    continue 'pairs;
                }
                self.optimize_group(*child_group, child_required)?;
                match self.memo.winner(*child_group, child_required) {
                    Some(winner) => {
                        child_costs.push(winner.cost.clone());
                        child_stats.push(winner.statistics.clone());
                        child_outputs.push(winner.output.clone());
                    }
                    None => {
                        // No child plan satisfies the demanded input
                        // properties; this mode is infeasible.
                        trace!(event = "skip_pair", reason = "no_child_winner",
                            expr_id = %expr_id, child_group = %child_group, child_required = %child_required);
                        continue 'pairs;
                    }
                }
            }

            let stats_refs = child_stats.iter().collect_vec();
            let statistics =
                self.cost
                    .derive_statistics(&expr.typ, &expr.predicates, &stats_refs);
            let operation_cost = self.cost.compute_operation_cost(
                &expr.typ,
                &expr.predicates,
                &child_costs,
                &stats_refs,
            );
            let total_cost = self.cost.sum(&operation_cost, &child_costs);
            let output_refs = child_outputs.iter().collect_vec();
            let output = self
                .property_model
                .derive(&expr.typ, &expr.predicates, &output_refs);
            trace!(event = "costed_pair", expr_id = %expr_id, advertised = %advertised_output,
                output = %output, total_cost = total_cost.total());

            if output.subsumes(required) {
                let info = WinnerInfo {
                    expr_id,
                    cost: total_cost.clone(),
                    statistics: statistics.clone(),
                    output: output.clone(),
                    inputs: input_props.clone(),
                };
                self.memo
                    .update_winner_if_cheaper(group_id, required.clone(), info);
            }
            // Record the cheapest feasible mode of this expression for the
            // requirement, whether or not it won the group.
            match self.memo.expr_opt_info(expr_id, required) {
                Some(existing) if existing.cost.total() <= total_cost.total() => {}
                _ => {
                    self.memo.set_expr_opt_info(
                        expr_id,
                        required.clone(),
                        ExprOptInfo {
                            output,
                            inputs: input_props,
                            cost: total_cost,
                            statistics,
                        },
                    );
                }
            }
        }
        Ok(())
    }

    /// Close a property gap with an enforcer: a physical operator planted
    /// on top of this group's plan for the weakened requirement. The
    /// enforcer is recorded as an ordinary expression of the group and
    /// costed like any other; if the property model offers none, the group
    /// simply has no winner and extraction reports it.
    fn try_enforce(
        &mut self,
        group_id: GroupId,
        required: &PropertySet,
    ) -> Result<(), OptimizeError> {
        let Some(enforcer) = self.property_model.enforcer(required) else {
            return Ok(());
        };
        if enforcer.child_required == *required {
            return Err(OptimizeError::InvariantViolated(format!(
                "enforcer for {} does not weaken the requirement",
                required
            )));
        }
        trace!(event = "enforce", group_id = %group_id, required = %required, op = %enforcer.typ);
        self.optimize_group(group_id, &enforcer.child_required)?;
        let Some(child_winner) = self
            .memo
            .winner(group_id, &enforcer.child_required)
            .cloned()
        else {
            return Ok(());
        };
        let plan = Arc::new(PlanNode {
            typ: enforcer.typ.clone(),
            children: vec![Arc::new(PlanNode::new_group(group_id))],
            predicates: enforcer.predicates.clone(),
        });
        let (expr_id, _) = self.memo.add_expr_to_group(plan, group_id);

        let statistics = self.property_model.enforcer_statistics(&child_winner.statistics);
        let operation_cost = self.cost.compute_operation_cost(
            &enforcer.typ,
            &enforcer.predicates,
            std::slice::from_ref(&child_winner.cost),
            &[&child_winner.statistics],
        );
        let total_cost = self
            .cost
            .sum(&operation_cost, std::slice::from_ref(&child_winner.cost));
        let output = self
            .property_model
            .derive(&enforcer.typ, &enforcer.predicates, &[&child_winner.output]);
        if !output.subsumes(required) {
            trace!(event = "enforce_insufficient", group_id = %group_id, output = %output);
            return Ok(());
        }
        let info = WinnerInfo {
            expr_id,
            cost: total_cost.clone(),
            statistics: statistics.clone(),
            output: output.clone(),
            inputs: vec![enforcer.child_required.clone()],
        };
        self.memo
            .update_winner_if_cheaper(group_id, required.clone(), info);
        self.memo.set_expr_opt_info(
            expr_id,
            required.clone(),
            ExprOptInfo {
                output,
                inputs: vec![enforcer.child_required],
                cost: total_cost,
                statistics,
            },
        );
        Ok(())
    }

    /// Walk the winner map top-down and materialize the chosen physical
    /// tree. Children are extracted under the input properties recorded on
    /// the winning expression.
    pub fn choose_best(
        &self,
        group_id: GroupId,
        required: &PropertySet,
    ) -> Result<ArcPlanNode<T>, OptimizeError> {
        self.check_cancelled()?;
        let group_id = self.memo.reduce_group(group_id);
        let Some(winner) = self.memo.winner(group_id, required) else {
            return Err(OptimizeError::NoPlan {
                group: group_id,
                required: required.clone(),
            });
        };
        let winner = winner.clone();
        trace!(event = "choose_best", group_id = %group_id, required = %required, expr_id = %winner.expr_id);
        let expr = self.memo.get_expr_memoed(winner.expr_id);
        if winner.inputs.len() != expr.children.len() {
            return Err(OptimizeError::InvariantViolated(format!(
                "winner of group {} records {} input property sets for arity {}",
                group_id,
                winner.inputs.len(),
                expr.children.len()
            )));
        }
        let mut children = Vec::with_capacity(expr.children.len());
        for (child_group, child_required) in expr.children.iter().zip(winner.inputs.iter()) {
            children.push(self.choose_best(*child_group, child_required)?);
        }
        Ok(Arc::new(PlanNode {
            typ: expr.typ.clone(),
            children,
            predicates: expr.predicates.clone(),
        }))
    }

    /// Print the memo table, for debugging.
    pub fn dump(&self) {
        for group_id in self.memo.get_all_group_ids() {
            println!("group {}", group_id);
            for expr_id in self.memo.get_all_exprs_in_group(group_id) {
                println!("  expr {}: {}", expr_id, self.memo.get_expr_memoed(expr_id));
            }
        }
    }

    fn explore_budget_exhausted(&self, group_id: GroupId) -> bool {
        match self.prop.partial_explore_iter {
            Some(limit) => self.memo.group_rule_applications(group_id) >= limit,
            None => false,
        }
    }

    fn check_cancelled(&self) -> Result<(), OptimizeError> {
        if self.cancellation.is_cancelled() {
            Err(OptimizeError::Cancelled)
        } else {
            Ok(())
        }
    }
}
