use scopecheck_core::{AnalysisOptions, Engine, Report, RuleId, SourceInput};

fn run(src: &str) -> Report {
    let unit = scopecheck_parse::parse_source(src).expect("parse");
    Engine::default().run(&[SourceInput::new("Main.kt", unit)])
}

fn run_textual(src: &str) -> Report {
    let unit = scopecheck_parse::parse_source(src).expect("parse");
    let options = AnalysisOptions {
        resolve_types: false,
        ..AnalysisOptions::default()
    };
    Engine::new(options).run(&[SourceInput::new("Main.kt", unit)])
}

fn counts(report: &Report) -> [usize; 3] {
    [
        report.count(RuleId::GlobalScope),
        report.count(RuleId::CoroutineWithoutDispatcher),
        report.count(RuleId::TopLevelCoroutineInSuspendFun),
    ]
}

#[test]
fn global_scope_at_file_scope() {
    let src = "import kotlinx.coroutines.*\n\nval job = GlobalScope.launch { }\n";
    assert_eq!(counts(&run(src)), [1, 0, 0]);
    assert_eq!(counts(&run_textual(src)), [1, 0, 0]);
}

#[test]
fn injected_scope_with_dispatcher_is_clean() {
    let src = "import kotlinx.coroutines.*\n\nfun load(scope: CoroutineScope) {\n    scope.launch(Dispatchers.IO) { }\n}\n";
    assert_eq!(counts(&run(src)), [0, 0, 0]);
    assert_eq!(counts(&run_textual(src)), [0, 0, 0]);
}

#[test]
fn fresh_scope_inside_suspend_function() {
    let src = "import kotlinx.coroutines.*\n\nsuspend fun f() {\n    CoroutineScope(Dispatchers.Default).launch { }\n}\n";
    let report = run(src);
    assert_eq!(report.count(RuleId::TopLevelCoroutineInSuspendFun), 1);
    assert_eq!(report.count(RuleId::GlobalScope), 1);
    let top = report
        .findings
        .iter()
        .find(|f| f.rule_id == "TopLevelCoroutineInSuspendFunRule")
        .unwrap();
    assert_eq!(top.message, "Detect CoroutineScope().launch in suspend function");
}

#[test]
fn launch_inside_coroutine_scope_builder() {
    let src = "import kotlinx.coroutines.*\n\nsuspend fun f() {\n    coroutineScope {\n        launch { }\n    }\n}\n";
    let report = run(src);
    assert_eq!(report.count(RuleId::TopLevelCoroutineInSuspendFun), 0);
    assert_eq!(report.count(RuleId::GlobalScope), 0);
}

#[test]
fn coroutine_name_is_not_a_dispatcher() {
    let src = "import kotlinx.coroutines.*\n\nfun f(scope: CoroutineScope, name: CoroutineName) {\n    scope.launch(name) { }\n}\n";
    assert_eq!(counts(&run(src)), [0, 1, 0]);
    assert_eq!(counts(&run_textual(src)), [0, 1, 0]);
}

#[test]
fn findings_carry_the_flat_report_shape() {
    let src = "fun f(scope: CoroutineScope) {\n    scope.launch { }\n}\n";
    let report = run(src);
    let finding = &report.findings[0];
    assert_eq!(finding.rule_id, "CoroutineWithoutDispatcherRule");
    assert_eq!(finding.severity.as_str(), "Defect");
    assert_eq!(finding.debt.as_str(), "TWENTY_MINS");
    assert_eq!(finding.file, "Main.kt");
    assert_eq!(&src[finding.start_offset..finding.end_offset], "launch { }");
    assert_eq!(finding.message, "Call to 'launch' should specify a dispatcher (e.g. Dispatchers.IO)");
}
