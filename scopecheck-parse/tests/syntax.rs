use scopecheck_ast::{ClassKind, Decl, ExprKind, FunctionBody, Stmt, TypeRefKind};
use scopecheck_parse::{parse_expr, parse_source, parse_source_with_recovery};

fn only_function(src: &str) -> scopecheck_ast::FunctionDecl {
    let unit = parse_source(src).expect("parse");
    match unit.decls.into_iter().next() {
        Some(Decl::Function(f)) => f,
        other => panic!("expected a function, got {other:?}"),
    }
}

fn body_stmts(f: &scopecheck_ast::FunctionDecl) -> &[Stmt] {
    match f.body.as_ref() {
        Some(FunctionBody::Block(b)) => &b.stmts,
        other => panic!("expected a block body, got {other:?}"),
    }
}

#[test]
fn package_and_imports_are_recorded() {
    let src = "package com.example.app\n\nimport kotlinx.coroutines.*\nimport kotlinx.coroutines.GlobalScope as GS\n";
    let unit = parse_source(src).expect("parse");
    assert_eq!(unit.package_name(), "com.example.app");
    assert_eq!(unit.imports.len(), 2);
    assert!(unit.imports[0].star);
    assert_eq!(unit.imports[0].path.dotted(), "kotlinx.coroutines");
    assert_eq!(unit.imports[1].bound_name(), Some("GS"));
}

#[test]
fn suspend_function_with_trailing_lambda_launch() {
    let src = "suspend fun load(scope: CoroutineScope) {\n    scope.launch {\n        fetch()\n    }\n}\n";
    let f = only_function(src);
    assert!(f.is_suspending());
    assert_eq!(f.name.node, "load");
    let param = f.params.find("scope").expect("scope param");
    assert_eq!(
        param.ty.as_ref().and_then(|t| t.simple_name()),
        Some("CoroutineScope")
    );

    let stmts = body_stmts(&f);
    assert_eq!(stmts.len(), 1);
    let Stmt::Expr(e) = &stmts[0] else {
        panic!("expected expression statement");
    };
    let call = e.as_call().expect("call");
    assert_eq!(call.name.node, "launch");
    assert_eq!(call.receiver.and_then(|r| r.dotted_path()).as_deref(), Some("scope"));
    assert!(call.trailing.is_some());
    assert!(call.args.is_empty());
}

#[test]
fn launch_with_dispatcher_argument_and_lambda() {
    let e = parse_expr("GlobalScope.launch(Dispatchers.IO) { work() }").expect("parse");
    let call = e.as_call().expect("call");
    assert_eq!(call.args.len(), 1);
    assert_eq!(call.args[0].value().dotted_path().as_deref(), Some("Dispatchers.IO"));
    assert_eq!(call.receiver.and_then(|r| r.head_name()), Some("GlobalScope"));
}

#[test]
fn named_block_argument_counts_as_body() {
    let e = parse_expr("scope.async(context = ctx, block = { 42 })").expect("parse");
    let call = e.as_call().expect("call");
    assert!(call.trailing.is_none());
    assert!(call.body_lambda().is_some());
    assert_eq!(call.args[0].name(), Some("context"));
}

#[test]
fn fresh_scope_receiver_is_a_call() {
    let e = parse_expr("CoroutineScope(Dispatchers.Main + job).launch { }").expect("parse");
    let call = e.as_call().expect("call");
    let receiver = call.receiver.expect("receiver");
    let inner = receiver.as_call().expect("constructor call");
    assert_eq!(inner.name.node, "CoroutineScope");
    assert!(matches!(
        inner.args[0].value().kind,
        ExprKind::Binary { .. }
    ));
}

#[test]
fn extension_receiver_is_split_from_name() {
    let f = only_function("fun CoroutineScope.startPolling() = launch { poll() }\n");
    assert_eq!(f.name.node, "startPolling");
    assert_eq!(
        f.receiver.as_ref().and_then(|t| t.simple_name()),
        Some("CoroutineScope")
    );
    assert!(matches!(f.body, Some(FunctionBody::Expr(_))));

    let f = only_function("fun kotlinx.coroutines.CoroutineScope.go() {}\n");
    assert_eq!(f.name.node, "go");
    assert_eq!(
        f.receiver.as_ref().and_then(|t| t.written_name()).as_deref(),
        Some("kotlinx.coroutines.CoroutineScope")
    );
}

#[test]
fn suspend_function_type_with_receiver() {
    let f = only_function(
        "fun <T> run(block: suspend CoroutineScope.() -> T): T = TODO()\n",
    );
    let ty = f.params.find("block").and_then(|p| p.ty.as_ref()).expect("type");
    match &ty.kind {
        TypeRefKind::Function {
            receiver, suspend, ..
        } => {
            assert!(*suspend);
            assert_eq!(
                receiver.as_ref().and_then(|r| r.simple_name()),
                Some("CoroutineScope")
            );
        }
        other => panic!("expected function type, got {other:?}"),
    }
}

#[test]
fn class_with_supertypes_and_members() {
    let src = r#"
class MyViewModel(private val repo: Repo) : ViewModel(), CoroutineScope {
    private val job = Job()

    val state: Int
        get() = 1

    init {
        viewModelScope.launch { repo.load() }
    }

    fun refresh() {
        launch { repo.load() }
    }

    companion object {
        const val TAG = "vm"
    }
}
"#;
    let unit = parse_source(src).expect("parse");
    let Some(Decl::Class(class)) = unit.decls.first() else {
        panic!("expected class");
    };
    assert_eq!(class.kind, ClassKind::Class);
    assert_eq!(class.name.node, "MyViewModel");
    let supers: Vec<_> = class
        .supertypes
        .iter()
        .filter_map(|s| s.ty.simple_name())
        .collect();
    assert_eq!(supers, vec!["ViewModel", "CoroutineScope"]);
    assert!(class.supertypes[0].ctor_args.is_some());
    assert!(class.supertypes[1].ctor_args.is_none());

    let names: Vec<_> = class.members.iter().map(|m| m.name().node.as_str()).collect();
    assert_eq!(names, vec!["job", "state", "init", "refresh", "Companion"]);
}

#[test]
fn delegated_supertype_does_not_swallow_body() {
    let src = "class Presenter : CoroutineScope by MainScope() {\n    fun start() {}\n}\n";
    let unit = parse_source(src).expect("parse");
    let Some(Decl::Class(class)) = unit.decls.first() else {
        panic!("expected class");
    };
    assert_eq!(class.members.len(), 1);
    assert_eq!(class.members[0].name().node, "start");
}

#[test]
fn parameter_named_like_a_modifier() {
    let f = only_function("fun set(value: Int, data: String) {}\n");
    let names: Vec<_> = f.params.params.iter().map(|p| p.name.node.as_str()).collect();
    assert_eq!(names, vec!["value", "data"]);
}

#[test]
fn control_flow_and_when_parse() {
    let src = r#"
suspend fun work(items: List<Int>) {
    for (i in items) {
        if (i > 0) println(i) else continue
    }
    val label = when (items.size) {
        0 -> "none"
        in 1..3 -> "few"
        else -> "many"
    }
    val x = items.firstOrNull() ?: return
    try {
        delay(10)
    } catch (e: CancellationException) {
        throw e
    } finally {
        cleanup()
    }
    while (true) { break }
}
"#;
    let f = only_function(src);
    assert_eq!(body_stmts(&f).len(), 5);
}

#[test]
fn if_without_else_inside_when_arm() {
    let src = "fun f(x: Int) {\n    when {\n        x > 0 -> if (x > 5) go()\n        else -> stop()\n    }\n}\n";
    let f = only_function(src);
    let Stmt::Expr(e) = &body_stmts(&f)[0] else {
        panic!("expected expression statement");
    };
    let ExprKind::When { arms, .. } = &e.kind else {
        panic!("expected when");
    };
    assert_eq!(arms.len(), 2);
}

#[test]
fn lambda_parameters_are_detected() {
    let e = parse_expr("items.forEach { item -> scope.launch { handle(item) } }").expect("parse");
    let call = e.as_call().expect("call");
    let lambda = call.trailing.expect("lambda");
    assert_eq!(lambda.params.len(), 1);
    assert_eq!(lambda.params[0].name.node, "item");
    assert_eq!(lambda.body.stmts.len(), 1);
}

#[test]
fn explicit_type_arguments_on_calls() {
    let e = parse_expr("scope.async<Int>(Dispatchers.Default) { 1 }").expect("parse");
    let call = e.as_call().expect("call");
    assert_eq!(call.name.node, "async");
    assert_eq!(call.type_args.len(), 1);
    assert_eq!(call.args.len(), 1);

    let e = parse_expr("a < b").expect("parse");
    assert!(matches!(e.kind, ExprKind::Binary { .. }));
}

#[test]
fn member_chain_across_lines() {
    let e = parse_expr("flow\n    .map { it * 2 }\n    .launchIn(scope)").expect("parse");
    let call = e.as_call().expect("call");
    assert_eq!(call.name.node, "launchIn");
}

#[test]
fn expression_ids_are_unique() {
    let unit = parse_source("fun f() { a.b(c, d) { e } }\n").expect("parse");
    let Some(Decl::Function(f)) = unit.decls.first() else {
        panic!("expected function");
    };
    let Stmt::Expr(e) = &body_stmts(f)[0] else {
        panic!("expected expression statement");
    };
    let mut ids = Vec::new();
    collect_ids(e, &mut ids);
    let before = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), before);
}

fn collect_ids(e: &scopecheck_ast::Expr, out: &mut Vec<scopecheck_ast::ExprId>) {
    out.push(e.id);
    match &e.kind {
        ExprKind::Member { base, .. } => collect_ids(base, out),
        ExprKind::Call {
            callee,
            args,
            trailing,
            ..
        } => {
            collect_ids(callee, out);
            for a in args {
                collect_ids(a.value(), out);
            }
            if let Some(l) = trailing {
                for s in &l.body.stmts {
                    if let Stmt::Expr(inner) = s {
                        collect_ids(inner, out);
                    }
                }
            }
        }
        _ => {}
    }
}

#[test]
fn recovery_keeps_following_declarations() {
    let src = "fun broken( {\n}\n\nsuspend fun ok() {\n    GlobalScope.launch { }\n}\n";
    let (unit, errors) = parse_source_with_recovery(src).expect("lex");
    assert!(!errors.is_empty());
    assert!(
        unit.decls
            .iter()
            .any(|d| d.name().node == "ok"),
        "decls: {:?}",
        unit.decls.iter().map(|d| d.name().node.clone()).collect::<Vec<_>>()
    );
}

#[test]
fn deep_nesting_is_an_error_not_a_crash() {
    let nested = |depth: usize| format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
    let shallow = format!("fun g() {{\n    val x = {}\n}}\n", nested(20));
    parse_source(&shallow).expect("moderate nesting parses");

    let deep = format!(
        "fun g() {{\n    val x = {}\n}}\n\nfun h() {{\n    GlobalScope.launch {{ }}\n}}\n",
        nested(5000)
    );
    let (unit, errors) = parse_source_with_recovery(&deep).expect("lex");
    assert!(errors.iter().any(|e| e.message.contains("nested too deeply")));
    assert!(unit.decls.iter().any(|d| d.name().node == "h"));

    let negations = format!("val y = {}1\n", "- ".repeat(5000));
    assert!(parse_source(&negations).is_err());
}

#[test]
fn strict_parse_reports_first_error() {
    let err = parse_source("fun f() { val = 1 }\n").expect_err("expected parse error");
    let msg = err.to_string();
    assert!(msg.contains("parse error"), "unexpected error message: {msg}");
}

#[test]
fn script_statements_are_kept() {
    let unit = parse_source("GlobalScope.launch { }\nprintln(1)\n").expect("parse");
    assert!(unit.decls.is_empty());
    assert_eq!(unit.statements.len(), 2);
}
