#![forbid(unsafe_code)]

//! Built-in knowledge of the coroutine runtime: types and their direct
//! supertypes, singleton objects, members and factory functions.

pub const COROUTINES_PACKAGE: &str = "kotlinx.coroutines";
pub const COROUTINE_CONTEXT: &str = "kotlin.coroutines.CoroutineContext";
pub const EMPTY_CONTEXT: &str = "kotlin.coroutines.EmptyCoroutineContext";
pub const COROUTINE_SCOPE: &str = "kotlinx.coroutines.CoroutineScope";
pub const GLOBAL_SCOPE: &str = "kotlinx.coroutines.GlobalScope";
pub const COROUTINE_DISPATCHER: &str = "kotlinx.coroutines.CoroutineDispatcher";
pub const MAIN_DISPATCHER: &str = "kotlinx.coroutines.MainCoroutineDispatcher";
pub const EXECUTOR_DISPATCHER: &str = "kotlinx.coroutines.ExecutorCoroutineDispatcher";
pub const CLOSEABLE_DISPATCHER: &str = "kotlinx.coroutines.CloseableCoroutineDispatcher";
pub const DISPATCHERS: &str = "kotlinx.coroutines.Dispatchers";
pub const COROUTINE_NAME: &str = "kotlinx.coroutines.CoroutineName";
pub const EXCEPTION_HANDLER: &str = "kotlinx.coroutines.CoroutineExceptionHandler";
pub const JOB: &str = "kotlinx.coroutines.Job";
pub const COMPLETABLE_JOB: &str = "kotlinx.coroutines.CompletableJob";
pub const DEFERRED: &str = "kotlinx.coroutines.Deferred";
pub const FLOW: &str = "kotlinx.coroutines.flow.Flow";
pub const SHARED_FLOW: &str = "kotlinx.coroutines.flow.SharedFlow";
pub const STATE_FLOW: &str = "kotlinx.coroutines.flow.StateFlow";
pub const MUTABLE_SHARED_FLOW: &str = "kotlinx.coroutines.flow.MutableSharedFlow";
pub const MUTABLE_STATE_FLOW: &str = "kotlinx.coroutines.flow.MutableStateFlow";
pub const VIEW_MODEL: &str = "androidx.lifecycle.ViewModel";
pub const LIFECYCLE_OWNER: &str = "androidx.lifecycle.LifecycleOwner";
pub const LIFECYCLE_SCOPE: &str = "androidx.lifecycle.LifecycleCoroutineScope";

/// Lifecycle-bound scope properties, by qualified name.
pub const BOUNDED_SCOPE_PROPERTIES: &[&str] = &[
    "androidx.lifecycle.viewModelScope",
    "androidx.lifecycle.lifecycleScope",
];

/// Runtime types with their direct supertypes.
pub const TYPES: &[(&str, &[&str])] = &[
    (COROUTINE_CONTEXT, &[]),
    (EMPTY_CONTEXT, &[COROUTINE_CONTEXT]),
    (COROUTINE_SCOPE, &[]),
    (GLOBAL_SCOPE, &[COROUTINE_SCOPE]),
    (COROUTINE_DISPATCHER, &[COROUTINE_CONTEXT]),
    (MAIN_DISPATCHER, &[COROUTINE_DISPATCHER]),
    (EXECUTOR_DISPATCHER, &[COROUTINE_DISPATCHER]),
    (CLOSEABLE_DISPATCHER, &[COROUTINE_DISPATCHER]),
    (DISPATCHERS, &[]),
    (COROUTINE_NAME, &[COROUTINE_CONTEXT]),
    (EXCEPTION_HANDLER, &[COROUTINE_CONTEXT]),
    (JOB, &[COROUTINE_CONTEXT]),
    (COMPLETABLE_JOB, &[JOB]),
    (DEFERRED, &[JOB]),
    ("kotlinx.coroutines.CoroutineStart", &[]),
    (FLOW, &[]),
    (SHARED_FLOW, &[FLOW]),
    (STATE_FLOW, &[SHARED_FLOW]),
    (MUTABLE_SHARED_FLOW, &[SHARED_FLOW]),
    (MUTABLE_STATE_FLOW, &[STATE_FLOW, MUTABLE_SHARED_FLOW]),
    (VIEW_MODEL, &[]),
    (LIFECYCLE_OWNER, &[]),
    (LIFECYCLE_SCOPE, &[COROUTINE_SCOPE]),
];

/// Singletons usable as values: object name and its type.
pub const OBJECTS: &[(&str, &str)] = &[
    (GLOBAL_SCOPE, GLOBAL_SCOPE),
    (DISPATCHERS, DISPATCHERS),
    (EMPTY_CONTEXT, EMPTY_CONTEXT),
    ("kotlinx.coroutines.NonCancellable", JOB),
];

/// Properties of runtime types: owner, member, member type.
///
/// Extension properties (`viewModelScope`, `lifecycleScope`) are listed under
/// the type they extend.
pub const MEMBERS: &[(&str, &str, &str)] = &[
    (DISPATCHERS, "IO", COROUTINE_DISPATCHER),
    (DISPATCHERS, "Default", COROUTINE_DISPATCHER),
    (DISPATCHERS, "Main", MAIN_DISPATCHER),
    (DISPATCHERS, "Unconfined", COROUTINE_DISPATCHER),
    (MAIN_DISPATCHER, "immediate", MAIN_DISPATCHER),
    (COROUTINE_SCOPE, "coroutineContext", COROUTINE_CONTEXT),
    (VIEW_MODEL, "viewModelScope", COROUTINE_SCOPE),
    (LIFECYCLE_OWNER, "lifecycleScope", LIFECYCLE_SCOPE),
];

/// Top-level factory functions and constructors: qualified name, return type.
pub const FUNCTIONS: &[(&str, &str)] = &[
    ("kotlinx.coroutines.CoroutineScope", COROUTINE_SCOPE),
    ("kotlinx.coroutines.MainScope", COROUTINE_SCOPE),
    ("kotlinx.coroutines.CoroutineName", COROUTINE_NAME),
    ("kotlinx.coroutines.Job", COMPLETABLE_JOB),
    ("kotlinx.coroutines.SupervisorJob", COMPLETABLE_JOB),
    ("kotlinx.coroutines.CoroutineExceptionHandler", EXCEPTION_HANDLER),
    ("kotlinx.coroutines.newSingleThreadContext", CLOSEABLE_DISPATCHER),
    ("kotlinx.coroutines.newFixedThreadPoolContext", CLOSEABLE_DISPATCHER),
    ("kotlinx.coroutines.flow.flow", FLOW),
    ("kotlinx.coroutines.flow.flowOf", FLOW),
    ("kotlinx.coroutines.flow.emptyFlow", FLOW),
    ("kotlinx.coroutines.flow.channelFlow", FLOW),
    ("kotlinx.coroutines.flow.callbackFlow", FLOW),
    ("kotlinx.coroutines.flow.MutableStateFlow", MUTABLE_STATE_FLOW),
    ("kotlinx.coroutines.flow.MutableSharedFlow", MUTABLE_SHARED_FLOW),
];

/// Member and extension functions: name, receiver type (`None` for any receiver), return type.
pub const METHODS: &[(&str, Option<&str>, &str)] = &[
    ("launch", Some(COROUTINE_SCOPE), JOB),
    ("async", Some(COROUTINE_SCOPE), DEFERRED),
    ("launchIn", Some(FLOW), JOB),
    ("asCoroutineDispatcher", None, EXECUTOR_DISPATCHER),
    ("limitedParallelism", Some(COROUTINE_DISPATCHER), COROUTINE_DISPATCHER),
    ("plus", Some(COROUTINE_CONTEXT), COROUTINE_CONTEXT),
    ("asStateFlow", Some(MUTABLE_STATE_FLOW), STATE_FLOW),
    ("asSharedFlow", Some(MUTABLE_SHARED_FLOW), SHARED_FLOW),
];

/// Calls whose trailing lambda runs with a `CoroutineScope` receiver.
pub const SCOPE_RECEIVER_BUILDERS: &[&str] = &[
    "launch",
    "async",
    "coroutineScope",
    "supervisorScope",
    "withContext",
    "runBlocking",
];

/// Packages imported implicitly into every file.
pub const DEFAULT_IMPORTS: &[&str] = &[
    "kotlin",
    "kotlin.annotation",
    "kotlin.collections",
    "kotlin.comparisons",
    "kotlin.io",
    "kotlin.ranges",
    "kotlin.sequences",
    "kotlin.text",
];

pub fn direct_supertypes(name: &str) -> Option<&'static [&'static str]> {
    TYPES.iter().find(|(n, _)| *n == name).map(|(_, s)| *s)
}

pub fn is_known_type(name: &str) -> bool {
    direct_supertypes(name).is_some()
}

pub fn object_type(name: &str) -> Option<&'static str> {
    OBJECTS.iter().find(|(n, _)| *n == name).map(|(_, t)| *t)
}

pub fn function_return(name: &str) -> Option<&'static str> {
    FUNCTIONS.iter().find(|(n, _)| *n == name).map(|(_, t)| *t)
}

/// Whether a qualified name denotes anything in the catalog.
pub fn is_known_symbol(name: &str) -> bool {
    is_known_type(name) || object_type(name).is_some() || function_return(name).is_some()
}

/// Last segment of a qualified name.
pub fn simple_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}
