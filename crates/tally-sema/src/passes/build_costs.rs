//! Pass 6: cost-expression construction.
//!
//! First collects the function call graph and delegates to the ordering
//! pass; recursion is rejected here, before any body is costed. Function
//! bodies are then costed callees-first, so every call site can embed the
//! callee's (possibly symbolic) cost replayed through the call's chain.
//!
//! Per-node rules mirror the expression structure: sequences sum, branches
//! take the worst alternative, iteration multiplies the per-element body
//! cost by the container's declared element bound.

use std::collections::HashMap;

use crate::cost::CostExpression;
use crate::fault::Fault;
use crate::passes::order_functions::{toposort, CallGraph};
use crate::passes::Session;
use crate::tables::Resolution;
use crate::ty::{ParamKind, Type};
use tally_types::ast::{Block, Def, Expr, ExprKind, FunctionDef, NodeId, Stmt, BLOCK_KIND};

pub(crate) fn run(sess: &mut Session<'_>) {
    let functions: HashMap<NodeId, &FunctionDef> = sess
        .file
        .defs
        .iter()
        .filter_map(|d| match d {
            Def::Function(f) => Some((f.id, f)),
            _ => None,
        })
        .collect();

    let mut graph = CallGraph::default();
    for f in functions.values() {
        graph.add_node(f.id);
        collect_calls(sess, &f.body, f.id, &mut graph);
    }
    match toposort(&graph) {
        Err(cycle) => {
            let mut names: Vec<&str> = cycle
                .iter()
                .filter_map(|id| functions.get(id).map(|f| f.name.name.as_str()))
                .collect();
            names.sort_unstable();
            let span = cycle
                .first()
                .and_then(|id| functions.get(id))
                .map(|f| f.span)
                .unwrap_or(sess.file.span);
            sess.record(span, Fault::RecursionNotAllowed(names.join(", ")));
        }
        Ok(order) => {
            for def in &order {
                if let Some(f) = functions.get(def) {
                    let cost = cost_block(sess, &f.body);
                    if let Err(fault) = sess.tables.set_function_cost(f.id, cost) {
                        sess.record(f.span, fault);
                    }
                }
            }
            sess.tables.function_order = order;
        }
    }
}

// ── Call-graph collection ──

fn collect_calls(sess: &Session<'_>, block: &Block, caller: NodeId, graph: &mut CallGraph) {
    for line in &block.lines {
        match line {
            Stmt::Let(s) => collect_expr(sess, &s.value, caller, graph),
            Stmt::Assign(s) => collect_expr(sess, &s.value, caller, graph),
            Stmt::Return(s) => collect_expr(sess, &s.value, caller, graph),
            Stmt::Expr(e) => collect_expr(sess, e, caller, graph),
        }
    }
}

fn collect_expr(sess: &Session<'_>, expr: &Expr, caller: NodeId, graph: &mut CallGraph) {
    if let Some(Resolution::Function { def, .. }) = sess.tables.resolution_of(expr.id) {
        // The callee must be costed before its caller.
        graph.add_edge(*def, caller);
    }
    match &expr.kind {
        ExprKind::ListLit(items) | ExprKind::SetLit(items) => {
            for item in items {
                collect_expr(sess, item, caller, graph);
            }
        }
        ExprKind::DictLit(entries) => {
            for (k, v) in entries {
                collect_expr(sess, k, caller, graph);
                collect_expr(sess, v, caller, graph);
            }
        }
        ExprKind::PairLit(a, b) => {
            collect_expr(sess, a, caller, graph);
            collect_expr(sess, b, caller, graph);
        }
        ExprKind::MemberAccess { object, .. } => collect_expr(sess, object, caller, graph),
        ExprKind::Call { args, .. } => {
            for arg in args {
                collect_expr(sess, arg, caller, graph);
            }
        }
        ExprKind::MethodCall { object, args, .. } => {
            collect_expr(sess, object, caller, graph);
            for arg in args {
                collect_expr(sess, arg, caller, graph);
            }
        }
        ExprKind::If {
            condition,
            then_block,
            else_block,
        } => {
            collect_expr(sess, condition, caller, graph);
            collect_calls(sess, then_block, caller, graph);
            if let Some(e) = else_block {
                collect_calls(sess, e, caller, graph);
            }
        }
        ExprKind::Foreach {
            iterable, body, ..
        } => {
            collect_expr(sess, iterable, caller, graph);
            collect_calls(sess, body, caller, graph);
        }
        _ => {}
    }
}

// ── Per-node cost construction ──

fn commit(sess: &mut Session<'_>, node: NodeId, span: tally_types::Span, cost: CostExpression) {
    if let Err(f) = sess.tables.set_cost(node, cost) {
        sess.record(span, f);
    }
}

fn cost_block(sess: &mut Session<'_>, block: &Block) -> CostExpression {
    let mut parts = vec![sess.arch.node_cost(BLOCK_KIND)];
    for line in &block.lines {
        parts.push(cost_stmt(sess, line));
    }
    let cost = CostExpression::sum(parts);
    commit(sess, block.id, block.span, cost.clone());
    cost
}

fn cost_stmt(sess: &mut Session<'_>, stmt: &Stmt) -> CostExpression {
    match stmt {
        Stmt::Let(s) => {
            let cost = CostExpression::sum(vec![
                sess.arch.node_cost(stmt.kind_name()),
                cost_expr(sess, &s.value),
            ]);
            commit(sess, s.id, s.span, cost.clone());
            cost
        }
        Stmt::Assign(s) => {
            let cost = CostExpression::sum(vec![
                sess.arch.node_cost(stmt.kind_name()),
                cost_expr(sess, &s.value),
            ]);
            commit(sess, s.id, s.span, cost.clone());
            cost
        }
        Stmt::Return(s) => {
            let cost = CostExpression::sum(vec![
                sess.arch.node_cost(stmt.kind_name()),
                cost_expr(sess, &s.value),
            ]);
            commit(sess, s.id, s.span, cost.clone());
            cost
        }
        Stmt::Expr(e) => cost_expr(sess, e),
    }
}

fn cost_expr(sess: &mut Session<'_>, expr: &Expr) -> CostExpression {
    let own = sess.arch.node_cost(expr.kind_name());
    let cost = match &expr.kind {
        ExprKind::IntLit(_)
        | ExprKind::BoolLit(_)
        | ExprKind::CharLit(_)
        | ExprKind::StringLit(_)
        | ExprKind::DecimalLit(_)
        | ExprKind::Identifier(_) => own,
        ExprKind::ListLit(items) | ExprKind::SetLit(items) => {
            let mut parts = vec![own];
            for item in items {
                parts.push(cost_expr(sess, item));
            }
            CostExpression::sum(parts)
        }
        ExprKind::DictLit(entries) => {
            let mut parts = vec![own];
            for (k, v) in entries {
                parts.push(cost_expr(sess, k));
                parts.push(cost_expr(sess, v));
            }
            CostExpression::sum(parts)
        }
        ExprKind::PairLit(a, b) => {
            CostExpression::sum(vec![own, cost_expr(sess, a), cost_expr(sess, b)])
        }
        ExprKind::MemberAccess { object, .. } => {
            CostExpression::sum(vec![own, cost_expr(sess, object)])
        }
        ExprKind::Call { args, .. } => {
            let arg_costs: Vec<CostExpression> =
                args.iter().map(|a| cost_expr(sess, a)).collect();
            cost_call(sess, expr.id, own, None, arg_costs)
        }
        ExprKind::MethodCall { object, args, .. } => {
            let receiver = cost_expr(sess, object);
            let arg_costs: Vec<CostExpression> =
                args.iter().map(|a| cost_expr(sess, a)).collect();
            cost_call(sess, expr.id, own, Some(receiver), arg_costs)
        }
        ExprKind::If {
            condition,
            then_block,
            else_block,
        } => {
            let cond = cost_expr(sess, condition);
            let then_cost = cost_block(sess, then_block);
            let branch = match else_block {
                // The worst branch dominates; a missing else branch costs
                // nothing beyond the condition.
                Some(e) => {
                    let else_cost = cost_block(sess, e);
                    CostExpression::max(vec![then_cost, else_cost])
                }
                None => then_cost,
            };
            CostExpression::sum(vec![own, cond, branch])
        }
        ExprKind::Foreach {
            iterable, body, ..
        } => {
            let iter_cost = cost_expr(sess, iterable);
            let bound = iteration_bound(&sess.tables.type_of(iterable.id));
            let body_cost = cost_block(sess, body);
            CostExpression::sum(vec![
                own,
                iter_cost,
                CostExpression::product(vec![bound, body_cost]),
            ])
        }
    };
    commit(sess, expr.id, expr.span, cost.clone());
    cost
}

/// `Sum(own, callee's replayed cost, each argument's cost scaled by its
/// formal parameter's multiplier)`.
fn cost_call(
    sess: &mut Session<'_>,
    node: NodeId,
    own: CostExpression,
    receiver: Option<CostExpression>,
    arg_costs: Vec<CostExpression>,
) -> CostExpression {
    let mut parts = vec![own];
    parts.extend(receiver);
    match sess.tables.resolution_of(node).cloned() {
        Some(Resolution::Function { def, chain }) => {
            let body = sess
                .tables
                .function_cost(def)
                .cloned()
                .unwrap_or(CostExpression::ConstantFin);
            parts.push(chain.replay_cost(&body));
            parts.extend(arg_costs);
        }
        Some(Resolution::Plugin { func, chain }) => {
            parts.push(chain.replay_cost(&func.cost));
            for (i, arg) in arg_costs.into_iter().enumerate() {
                let multiplier = func
                    .params
                    .get(i)
                    .map(|p| chain.replay_cost(&p.cost_multiplier))
                    .unwrap_or(CostExpression::Fin(1));
                if multiplier == CostExpression::Fin(1) {
                    parts.push(arg);
                } else {
                    parts.push(CostExpression::product(vec![arg, multiplier]));
                }
            }
        }
        // Construction, calls through function-typed locals, and failed
        // resolutions all charge the flat node cost plus their arguments.
        _ => {
            parts.push(CostExpression::ConstantFin);
            parts.extend(arg_costs);
        }
    }
    CostExpression::sum(parts)
}

/// The element-count bound of an iterated container: the fin parameter of
/// its terminus, replayed through the instantiation's chain.
fn iteration_bound(iter_ty: &Type) -> CostExpression {
    match iter_ty {
        Type::Instantiation(inst) => {
            let fin = inst
                .terminus
                .type_params()
                .iter()
                .find(|p| p.kind == ParamKind::Fin);
            match fin {
                Some(p) => match inst.chain.replay(&Type::Parameter(p.clone())) {
                    Type::Cost(c) => c,
                    Type::Parameter(q) => CostExpression::FinParameter(q.name),
                    _ => CostExpression::ConstantFin,
                },
                None => CostExpression::ConstantFin,
            }
        }
        // Already reported as a type or feature error.
        _ => CostExpression::ConstantFin,
    }
}
