use proptest::prelude::*;
use scopecheck_core::{Engine, Finding, RuleId, SourceInput};

fn statement() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("GlobalScope.launch { }".to_string()),
        Just("scope.launch { }".to_string()),
        Just("scope.async(Dispatchers.IO) { }".to_string()),
        Just("CoroutineScope(Dispatchers.Default).launch { }".to_string()),
        Just("Child().launch(Dispatchers.Main) { }".to_string()),
        Just("launch { }".to_string()),
        Just("coroutineScope { launch { } }".to_string()),
        Just("supervisorScope { scope.launch(name) { } }".to_string()),
        Just("flowOf(1).launchIn(CoroutineScope(Dispatchers.IO))".to_string()),
        Just("val local = 1".to_string()),
    ]
}

fn function() -> impl Strategy<Value = String> {
    (any::<bool>(), prop::collection::vec(statement(), 0..6)).prop_map(|(suspend, stmts)| {
        let mut out = String::new();
        if suspend {
            out.push_str("suspend ");
        }
        out.push_str("fun work(scope: CoroutineScope, name: CoroutineName) {\n");
        for s in stmts {
            out.push_str("    ");
            out.push_str(&s);
            out.push('\n');
        }
        out.push_str("}\n");
        out
    })
}

fn unit_strategy() -> impl Strategy<Value = (bool, Vec<String>)> {
    (any::<bool>(), prop::collection::vec(function(), 1..4))
}

fn render(imports: bool, functions: &[String]) -> String {
    let mut out = String::new();
    if imports {
        out.push_str("import kotlinx.coroutines.*\nimport kotlinx.coroutines.flow.*\n\n");
    }
    out.push_str("class Child : CoroutineScope\n\n");
    for f in functions {
        out.push_str(f);
        out.push('\n');
    }
    out
}

fn findings(src: &str) -> Vec<Finding> {
    let unit = scopecheck_parse::parse_source(src).expect("generated source parses");
    Engine::default()
        .run(&[SourceInput::new("Gen.kt", unit)])
        .findings
}

proptest! {
    #[test]
    fn repeated_runs_report_the_same_findings((imports, functions) in unit_strategy()) {
        let src = render(imports, &functions);
        let first = findings(&src);
        let second = findings(&src);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn global_scope_launches_are_reported_once_each((imports, functions) in unit_strategy()) {
        let src = render(imports, &functions);
        let expected = src.matches("GlobalScope.launch").count();
        let found = findings(&src)
            .iter()
            .filter(|f| f.rule_id == RuleId::GlobalScope.as_str() && f.message.starts_with("Do not use GlobalScope"))
            .count();
        prop_assert_eq!(found, expected);
    }

    #[test]
    fn builder_nested_launches_are_never_top_level((imports, functions) in unit_strategy()) {
        let src = render(imports, &functions);
        let found = findings(&src);
        for f in found.iter().filter(|f| f.rule_id == RuleId::TopLevelCoroutineInSuspendFun.as_str()) {
            let before = &src[..f.start_offset];
            let line_start = before.rfind('\n').map_or(0, |i| i + 1);
            let line = &src[line_start..];
            prop_assert!(!line.trim_start().starts_with("coroutineScope"));
            prop_assert!(!line.trim_start().starts_with("supervisorScope"));
        }
    }
}
