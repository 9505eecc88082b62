use scopecheck_core::{AnalysisOptions, Engine, Report, RuleId, SourceInput};

fn run(src: &str) -> Report {
    let unit = scopecheck_parse::parse_source(src).expect("parse");
    Engine::default().run(&[SourceInput::new("Main.kt", unit)])
}

fn count(src: &str, rule: RuleId) -> usize {
    run(src).count(rule)
}

const IMPORTS: &str = "import kotlinx.coroutines.*\nimport kotlinx.coroutines.flow.*\n\n";

fn with_imports(body: &str) -> String {
    format!("{IMPORTS}{body}")
}

mod global_scope {
    use super::*;

    #[test]
    fn launch_and_async_on_global_scope() {
        let src = with_imports("fun f() {\n    GlobalScope.launch { }\n    GlobalScope.async { }\n}\n");
        assert_eq!(count(&src, RuleId::GlobalScope), 2);
    }

    #[test]
    fn qualified_global_scope_without_imports() {
        let src = "fun f() {\n    kotlinx.coroutines.GlobalScope.launch { }\n}\n";
        assert_eq!(count(src, RuleId::GlobalScope), 1);
    }

    #[test]
    fn inline_scope_in_suspend_function() {
        let src = with_imports("suspend fun f() {\n    CoroutineScope(Dispatchers.Default).launch { }\n}\n");
        assert_eq!(count(&src, RuleId::GlobalScope), 1);
    }

    #[test]
    fn scope_in_property_is_not_reported() {
        let src = with_imports(
            "class Repo {\n    private val scope = CoroutineScope(SupervisorJob() + Dispatchers.IO)\n\n    fun refresh() {\n        scope.launch(Dispatchers.IO) { }\n    }\n}\n",
        );
        assert_eq!(count(&src, RuleId::GlobalScope), 0);
    }

    #[test]
    fn structured_builders_are_clean() {
        let src = with_imports(
            "suspend fun f() {\n    coroutineScope { launch { } }\n    supervisorScope { launch { } }\n}\n",
        );
        assert_eq!(count(&src, RuleId::GlobalScope), 0);
    }

    #[test]
    fn fresh_scope_inside_builder_block_is_exempt() {
        let src = with_imports(
            "suspend fun f() {\n    supervisorScope {\n        CoroutineScope(Dispatchers.IO).launch { }\n        GlobalScope.launch { }\n    }\n}\n",
        );
        assert_eq!(count(&src, RuleId::GlobalScope), 1);
        let unit = scopecheck_parse::parse_source(&src).expect("parse");
        let textual = AnalysisOptions {
            resolve_types: false,
            ..AnalysisOptions::default()
        };
        let report = Engine::new(textual).run(&[SourceInput::new("Main.kt", unit)]);
        assert_eq!(report.count(RuleId::GlobalScope), 1);
        let global = report
            .findings
            .iter()
            .find(|f| f.rule_id == "GlobalScopeRule")
            .expect("global scope finding");
        assert!(global.message.starts_with("Do not use GlobalScope"));
    }

    #[test]
    fn configured_bounded_scope_is_not_reported() {
        let src = with_imports(
            "class ActivityScope : CoroutineScope\n\nfun f() {\n    ActivityScope().launch(Dispatchers.Main) { }\n}\n",
        );
        let unit = scopecheck_parse::parse_source(&src).expect("parse");
        assert_eq!(
            Engine::default()
                .run(&[SourceInput::new("Main.kt", unit.clone())])
                .count(RuleId::GlobalScope),
            1
        );
        let options = AnalysisOptions {
            bounded_scopes: vec!["ActivityScope".into()],
            ..AnalysisOptions::default()
        };
        assert_eq!(
            Engine::new(options)
                .run(&[SourceInput::new("Main.kt", unit)])
                .count(RuleId::GlobalScope),
            0
        );
    }

    #[test]
    fn lifecycle_hint_names_bounded_scopes() {
        let src = "fun f() {\n    GlobalScope.launch { }\n}\n";
        let unit = scopecheck_parse::parse_source(src).expect("parse");
        let options = AnalysisOptions {
            lifecycle_hint: true,
            ..AnalysisOptions::default()
        };
        let report = Engine::new(options).run(&[SourceInput::new("Main.kt", unit)]);
        let hint = report.findings[0].hint.clone().unwrap();
        assert!(hint.contains("viewModelScope"));
    }
}

mod without_dispatcher {
    use super::*;

    #[test]
    fn missing_dispatcher_on_launch_and_async() {
        let src = with_imports(
            "fun f(scope: CoroutineScope) {\n    scope.launch { }\n    scope.async { }\n}\n",
        );
        assert_eq!(count(&src, RuleId::CoroutineWithoutDispatcher), 2);
    }

    #[test]
    fn dispatcher_constants_and_parameters() {
        let src = with_imports(
            "fun f(scope: CoroutineScope, dispatcher: CoroutineDispatcher) {\n    scope.launch(Dispatchers.IO) { }\n    scope.async(Dispatchers.Default) { }\n    scope.launch(dispatcher) { }\n    scope.launch(Dispatchers.IO + CoroutineName(\"loader\")) { }\n}\n",
        );
        assert_eq!(count(&src, RuleId::CoroutineWithoutDispatcher), 0);
    }

    #[test]
    fn nested_launch_does_not_inherit_the_dispatcher() {
        let src = with_imports(
            "fun f(scope: CoroutineScope) {\n    scope.launch(Dispatchers.IO) {\n        launch { }\n    }\n}\n",
        );
        assert_eq!(count(&src, RuleId::CoroutineWithoutDispatcher), 1);
    }

    #[test]
    fn receiverless_launch_in_suspend_function() {
        let src = with_imports("suspend fun loadData() {\n    launch { }\n}\n");
        assert_eq!(count(&src, RuleId::CoroutineWithoutDispatcher), 1);
    }

    #[test]
    fn calls_without_a_body_are_not_launches() {
        let src = "fun f(launcher: ActivityResultLauncher) {\n    launcher.launch(\"image/*\")\n}\n";
        assert_eq!(count(src, RuleId::CoroutineWithoutDispatcher), 0);
    }

    #[test]
    fn global_scope_is_left_to_its_own_rule() {
        let src = "fun f() {\n    GlobalScope.launch { }\n}\n";
        assert_eq!(count(src, RuleId::CoroutineWithoutDispatcher), 0);
    }

    #[test]
    fn launch_in_is_not_checked() {
        let src = with_imports("fun f(scope: CoroutineScope) {\n    flowOf(1).launchIn(scope)\n}\n");
        assert_eq!(count(&src, RuleId::CoroutineWithoutDispatcher), 0);
    }
}

mod top_level {
    use super::*;

    fn top(src: &str) -> Vec<String> {
        run(src)
            .findings
            .into_iter()
            .filter(|f| f.rule_id == RuleId::TopLevelCoroutineInSuspendFun.as_str())
            .map(|f| f.message)
            .collect()
    }

    #[test]
    fn declared_scope_subtype_constructed_inline() {
        let src = with_imports(
            "interface CoScope : CoroutineScope {}\n\nsuspend fun f() {\n    CoScope(Dispatchers.Default).async { }\n}\n",
        );
        assert_eq!(
            top(&src),
            vec!["Detect [child of CoroutineScope].async in suspend function"]
        );
    }

    #[test]
    fn qualified_builder_contains_its_launches() {
        let src = "suspend fun f(scope: kotlinx.coroutines.CoroutineScope) {\n    kotlinx.coroutines.coroutineScope {\n        scope.launch { }\n        launch { }\n    }\n}\n";
        assert!(top(src).is_empty());
    }

    #[test]
    fn scope_parameters() {
        let src = with_imports(
            "interface CoScope : CoroutineScope {}\n\nsuspend fun loadInfo(scope: CoroutineScope) {\n    scope.launch { }\n}\n\nsuspend fun loadMore(scope: CoScope) {\n    scope.launch { }\n}\n",
        );
        assert_eq!(
            top(&src),
            vec![
                "Detect [CoroutineScope parameter].launch in suspend function",
                "Detect [CoroutineScope parameter].launch in suspend function",
            ]
        );
    }

    #[test]
    fn opaque_parameter_is_exempt() {
        let src = "suspend fun f(scope: Injected) {\n    scope.launch { }\n}\n";
        assert!(top(src).is_empty());
    }

    #[test]
    fn launch_in_on_a_fresh_scope() {
        let src = with_imports(
            "suspend fun <T> f() {\n    flow<T> { }.launchIn(CoroutineScope(Dispatchers.Main))\n}\n",
        );
        assert_eq!(
            top(&src),
            vec!["Detect CoroutineScope().launchIn in suspend function"]
        );
    }

    #[test]
    fn regular_functions_are_exempt() {
        let src = with_imports("fun f() {\n    CoroutineScope(Dispatchers.Default).launch { }\n}\n");
        assert!(top(&src).is_empty());
    }

    #[test]
    fn builders_exempt_nested_launches() {
        let src = with_imports(
            "suspend fun f() {\n    coroutineScope {\n        CoroutineScope(Dispatchers.IO).launch { }\n    }\n    supervisorScope {\n        launch { }\n    }\n}\n",
        );
        assert!(top(&src).is_empty());
    }

    #[test]
    fn empty_builders_after_the_launch_do_not_help() {
        let src = with_imports(
            "suspend fun f() {\n    CoroutineScope(Dispatchers.IO).launch { }\n    coroutineScope { }\n    supervisorScope { }\n}\n",
        );
        assert_eq!(top(&src).len(), 1);
    }

    #[test]
    fn scope_receiver_of_extension_function() {
        let src = with_imports("suspend fun CoroutineScope.f() {\n    launch { }\n}\n");
        assert_eq!(
            top(&src),
            vec!["Detect [CoroutineScope receiver].launch in suspend function"]
        );
    }

    #[test]
    fn member_of_scope_class() {
        let src = with_imports(
            "class Repo : CoroutineScope by MainScope() {\n    suspend fun refresh() {\n        launch(Dispatchers.IO) { }\n    }\n}\n",
        );
        assert_eq!(top(&src).len(), 1);
    }

    #[test]
    fn textual_and_resolved_paths_agree_on_common_code() {
        let src = with_imports(
            "suspend fun f(scope: CoroutineScope) {\n    scope.launch { }\n    CoroutineScope(Dispatchers.IO).launch { }\n    coroutineScope { launch { } }\n}\n",
        );
        let unit = scopecheck_parse::parse_source(&src).expect("parse");
        let resolved = Engine::default().run(&[SourceInput::new("Main.kt", unit.clone())]);
        let textual = Engine::new(AnalysisOptions {
            resolve_types: false,
            ..AnalysisOptions::default()
        })
        .run(&[SourceInput::new("Main.kt", unit)]);
        assert_eq!(resolved.findings, textual.findings);
    }
}

mod registry {
    use super::*;

    #[test]
    fn subtypes_declared_in_other_units_are_known() {
        let base = scopecheck_parse::parse_source("package a\n\ninterface AppScope : CoroutineScope\n")
            .expect("parse");
        let user = scopecheck_parse::parse_source(
            "package b\n\nimport a.AppScope\n\nsuspend fun f(scope: AppScope) {\n    scope.launch { }\n}\n",
        )
        .expect("parse");
        let report = Engine::default().run(&[
            SourceInput::new("a/AppScope.kt", base),
            SourceInput::new("b/Use.kt", user.clone()),
        ]);
        assert_eq!(report.count(RuleId::TopLevelCoroutineInSuspendFun), 1);

        let alone = Engine::default().run(&[SourceInput::new("b/Use.kt", user)]);
        assert_eq!(alone.count(RuleId::TopLevelCoroutineInSuspendFun), 0);
    }
}
