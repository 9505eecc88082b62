#![forbid(unsafe_code)]

use scopecheck_ast::{BinOp, CallView, Expr, ExprKind};

use crate::catalog;
use crate::resolve::{TypeDescriptor, TypeResolver};

/// Factories whose result is a concrete scheduler.
const SCHEDULER_FACTORIES: &[&str] = &[
    "newSingleThreadContext",
    "newFixedThreadPoolContext",
    "asCoroutineDispatcher",
    "limitedParallelism",
];

/// Whether any value argument of `call` selects an execution context.
///
/// Each call site is judged on its own arguments; a dispatcher passed to an
/// enclosing launch is not inherited.
pub fn has_explicit_context(call: CallView<'_>, resolver: &dyn TypeResolver) -> bool {
    call.value_args().any(|arg| is_context_arg(arg, resolver))
}

fn is_context_arg(arg: &Expr, resolver: &dyn TypeResolver) -> bool {
    let arg = arg.unparen();
    if let Some(ty) = resolver.resolve(arg) {
        return is_context_type(&ty);
    }
    match combination_operands(arg) {
        Some(operands) => operands.iter().any(|op| names_context_operand(op, resolver)),
        None => names_context(arg),
    }
}

/// One operand of an unresolved combination.
fn names_context_operand(expr: &Expr, resolver: &dyn TypeResolver) -> bool {
    match resolver.resolve(expr) {
        Some(ty) => is_context_type(&ty),
        None => names_context(expr),
    }
}

/// Exactly the context abstraction, or any dispatcher. Other context
/// elements (`CoroutineName`, `Job`, handlers) do not select a scheduler.
fn is_context_type(ty: &TypeDescriptor) -> bool {
    ty.qualified_name() == catalog::COROUTINE_CONTEXT
        || ty.is_subtype_of(catalog::COROUTINE_DISPATCHER)
}

/// Flattened operands of `a + b + c` or `a.plus(b)`.
fn combination_operands(expr: &Expr) -> Option<Vec<&Expr>> {
    let mut out = Vec::new();
    match &expr.unparen().kind {
        ExprKind::Binary {
            left,
            op: BinOp::Add,
            right,
        } => {
            flatten(left, &mut out);
            flatten(right, &mut out);
        }
        _ => {
            let call = expr.unparen().as_call()?;
            if call.name.node != "plus" {
                return None;
            }
            let receiver = call.receiver?;
            flatten(receiver, &mut out);
            for arg in call.value_args() {
                flatten(arg, &mut out);
            }
        }
    }
    Some(out)
}

fn flatten<'e>(expr: &'e Expr, out: &mut Vec<&'e Expr>) {
    match combination_operands(expr) {
        Some(inner) => out.extend(inner),
        None => out.push(expr.unparen()),
    }
}

fn names_scheduler_textually(expr: &Expr) -> bool {
    let expr = expr.unparen();
    if let Some(path) = expr.dotted_path() {
        if path.starts_with("Dispatchers.") || path.starts_with("kotlinx.coroutines.Dispatchers.") {
            return true;
        }
        return catalog::simple_name(&path)
            .to_ascii_lowercase()
            .contains("dispatcher");
    }
    match expr.as_call() {
        Some(call) => SCHEDULER_FACTORIES.contains(&call.name.node.as_str()),
        None => false,
    }
}

fn names_context(expr: &Expr) -> bool {
    if names_scheduler_textually(expr) {
        return true;
    }
    let Some(path) = expr.unparen().dotted_path() else {
        return false;
    };
    let last = catalog::simple_name(&path).to_ascii_lowercase();
    last.ends_with("context") || last == "ctx"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::BindingContext;
    use crate::resolve::UnresolvedTypes;
    use scopecheck_ast::{Decl, FunctionBody, SourceUnit, Stmt};

    fn launch_calls(unit: &SourceUnit) -> Vec<&Expr> {
        let mut out = Vec::new();
        for d in &unit.decls {
            if let Decl::Function(f) = d {
                if let Some(FunctionBody::Block(b)) = &f.body {
                    for s in &b.stmts {
                        if let Stmt::Expr(e) = s {
                            out.push(e);
                        }
                    }
                }
            }
        }
        out
    }

    fn check(src: &str, resolved: bool) -> Vec<bool> {
        let unit = scopecheck_parse::parse_source(src).expect("parse");
        let ctx = BindingContext::build(&unit);
        let resolver: &dyn TypeResolver = if resolved { &ctx } else { &UnresolvedTypes };
        launch_calls(&unit)
            .into_iter()
            .map(|e| has_explicit_context(e.as_call().unwrap(), resolver))
            .collect()
    }

    const SRC: &str = "import kotlinx.coroutines.*\n\nfun f(scope: CoroutineScope, dispatcher: CoroutineDispatcher, name: CoroutineName, ctx: kotlin.coroutines.CoroutineContext) {\n    scope.launch { }\n    scope.launch(Dispatchers.IO) { }\n    scope.async(Dispatchers.Default) { }\n    scope.launch(dispatcher) { }\n    scope.launch(Dispatchers.IO + CoroutineName(\"loader\")) { }\n    scope.launch(name) { }\n    scope.launch(ctx) { }\n    scope.launch(SupervisorJob() + name) { }\n    scope.launch(start = CoroutineStart.LAZY) { }\n    scope.launch(newSingleThreadContext(\"db\")) { }\n}\n";

    #[test]
    fn resolved_arguments() {
        assert_eq!(
            check(SRC, true),
            vec![false, true, true, true, true, false, true, true, false, true]
        );
    }

    #[test]
    fn textual_fallback_matches_names() {
        assert_eq!(
            check(SRC, false),
            vec![false, true, true, true, true, false, true, false, false, true]
        );
    }

    #[test]
    fn combined_contexts_resolve_to_a_context() {
        let src = "import kotlinx.coroutines.*\n\nfun f(s: CoroutineScope, ctx: kotlin.coroutines.CoroutineContext, other: kotlin.coroutines.CoroutineContext) {\n    s.launch(ctx) { }\n    s.launch(ctx + CoroutineName(\"n\")) { }\n    s.launch(ctx + other) { }\n    s.launch(SupervisorJob() + CoroutineName(\"n\")) { }\n    s.launch(ctx.plus(CoroutineName(\"n\"))) { }\n}\n";
        assert_eq!(check(src, true), vec![true, true, true, true, true]);
        assert_eq!(check(src, false), vec![true, true, true, false, true]);
    }

    #[test]
    fn plus_call_is_a_combination() {
        let src = "fun f(scope: CoroutineScope, job: Job) {\n    scope.launch(job.plus(Dispatchers.Main)) { }\n}\n";
        assert_eq!(check(src, false), vec![true]);
    }
}
