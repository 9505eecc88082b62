#![forbid(unsafe_code)]

//! Per-unit binding pass: assigns static types to expressions from declared
//! types, initializers, imports and the runtime catalog.

use std::collections::{HashMap, HashSet};

use scopecheck_ast::{
    BinOp, Block, CallArg, ClassDecl, ClassKind, Decl, Expr, ExprId, ExprKind, FunctionBody, FunctionDecl,
    Lambda, PropertyDecl, SourceUnit, Stmt, TypeRef, TypeRefKind, UnaryOp,
};

use crate::catalog;
use crate::resolve::{TypeDescriptor, TypeResolver, TypeTable};

/// Name resolution environment of one unit.
#[derive(Clone, Debug, Default)]
struct ImportEnv {
    package: String,
    /// Bound name (alias or last segment) to qualified name.
    explicit: HashMap<String, String>,
    stars: Vec<String>,
    /// Simple and nested (`Outer.Inner`) names of classes declared in the unit.
    local_types: HashMap<String, String>,
    local_objects: HashSet<String>,
}

impl ImportEnv {
    fn qualify(&self, simple: &str) -> String {
        if self.package.is_empty() {
            simple.to_string()
        } else {
            format!("{}.{simple}", self.package)
        }
    }

    /// Resolves a written (possibly dotted) name to a qualified one, trying
    /// explicit imports, unit declarations, star imports, the unit's package
    /// and the default imports, in that order.
    fn resolve(&self, written: &str, exists: &dyn Fn(&str) -> bool) -> Option<String> {
        if let Some((head, rest)) = written.split_once('.') {
            if exists(written) {
                return Some(written.to_string());
            }
            if let Some(local) = self.local_types.get(written) {
                return Some(local.clone());
            }
            let head = self.resolve(head, &|_| true)?;
            let candidate = format!("{head}.{rest}");
            return exists(&candidate).then_some(candidate);
        }

        if let Some(q) = self.explicit.get(written) {
            return Some(q.clone());
        }
        if let Some(q) = self.local_types.get(written) {
            return Some(q.clone());
        }
        let candidates = self
            .stars
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.package.as_str()))
            .chain(catalog::DEFAULT_IMPORTS.iter().copied());
        for pkg in candidates {
            let candidate = if pkg.is_empty() {
                written.to_string()
            } else {
                format!("{pkg}.{written}")
            };
            if exists(&candidate) {
                return Some(candidate);
            }
        }
        None
    }
}

/// Resolver backed by a binding pass over one unit.
#[derive(Clone, Debug, Default)]
pub struct BindingContext {
    types: HashMap<ExprId, TypeDescriptor>,
    env: ImportEnv,
    table: TypeTable,
}

impl BindingContext {
    pub fn build(unit: &SourceUnit) -> Self {
        let mut env = ImportEnv {
            package: unit.package_name(),
            ..ImportEnv::default()
        };
        for import in &unit.imports {
            let path = import.path.dotted();
            if import.star {
                env.stars.push(path);
            } else if let Some(bound) = import.bound_name() {
                env.explicit.insert(bound.to_string(), path);
            }
        }

        let mut classes = Vec::new();
        collect_classes(&unit.decls, None, &env, &mut classes);
        for (q, nested, class) in &classes {
            env.local_types.entry(class.name.node.clone()).or_insert_with(|| q.clone());
            env.local_types.entry(nested.clone()).or_insert_with(|| q.clone());
            if class.kind == ClassKind::Object {
                env.local_objects.insert(q.clone());
            }
        }

        let local_names: HashSet<String> = classes.iter().map(|(q, _, _)| q.clone()).collect();
        let mut table = TypeTable::default();
        for (q, _, class) in &classes {
            let supers = class
                .supertypes
                .iter()
                .filter_map(|s| s.ty.written_name())
                .filter_map(|w| {
                    env.resolve(&w, &|c| catalog::is_known_type(c) || local_names.contains(c))
                })
                .collect();
            table.declare(q.clone(), supers);
        }

        let mut binder = Binder {
            env: &env,
            table: &table,
            functions: HashMap::new(),
            members: HashMap::new(),
            scopes: Vec::new(),
            receivers: Vec::new(),
            class_path: Vec::new(),
            types: HashMap::new(),
        };
        binder.prepare(unit, &classes);
        binder.unit(unit);
        let types = binder.types;

        Self { types, env, table }
    }

    fn resolve_type_name(&self, written: &str) -> Option<TypeDescriptor> {
        let q = self.env.resolve(written, &|c| self.table.contains(c))?;
        self.table.descriptor(&q)
    }

    /// Number of expressions with a known type.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeResolver for BindingContext {
    fn resolve(&self, expr: &Expr) -> Option<TypeDescriptor> {
        self.types.get(&expr.id).cloned()
    }

    fn resolve_type_ref(&self, ty: &TypeRef) -> Option<TypeDescriptor> {
        match &ty.kind {
            TypeRefKind::Named { name, .. } => self.resolve_type_name(&name.dotted()),
            _ => None,
        }
    }
}

/// Qualified name, nested written name and declaration of every class in
/// `decls`, descending into members and function bodies.
fn collect_classes<'u>(
    decls: &'u [Decl],
    outer: Option<(&str, &str)>,
    env: &ImportEnv,
    out: &mut Vec<(String, String, &'u ClassDecl)>,
) {
    for decl in decls {
        match decl {
            Decl::Class(class) => {
                let (q, nested) = match outer {
                    Some((oq, on)) => (
                        format!("{oq}.{}", class.name.node),
                        format!("{on}.{}", class.name.node),
                    ),
                    None => (env.qualify(&class.name.node), class.name.node.clone()),
                };
                out.push((q.clone(), nested.clone(), class));
                collect_classes(&class.members, Some((q.as_str(), nested.as_str())), env, out);
            }
            Decl::Function(f) => {
                if let Some(FunctionBody::Block(body)) = &f.body {
                    for stmt in &body.stmts {
                        if let Stmt::Decl(d) = stmt {
                            collect_classes(std::slice::from_ref(d), outer, env, out);
                        }
                    }
                }
            }
            Decl::Property(_) => {}
        }
    }
}

type Scope = HashMap<String, Option<TypeDescriptor>>;

struct Binder<'a> {
    env: &'a ImportEnv,
    table: &'a TypeTable,
    /// Top-level functions with a declared return type.
    functions: HashMap<String, TypeDescriptor>,
    /// Member property types of local classes, by class qualified name.
    members: HashMap<String, HashMap<String, TypeDescriptor>>,
    scopes: Vec<Scope>,
    /// Implicit receivers, innermost last.
    receivers: Vec<TypeDescriptor>,
    class_path: Vec<String>,
    types: HashMap<ExprId, TypeDescriptor>,
}

impl<'a> Binder<'a> {
    fn type_ref(&self, ty: &TypeRef) -> Option<TypeDescriptor> {
        match &ty.kind {
            TypeRefKind::Named { name, .. } => {
                let q = self
                    .env
                    .resolve(&name.dotted(), &|c| self.table.contains(c))?;
                self.table.descriptor(&q)
            }
            _ => None,
        }
    }

    fn descriptor(&self, name: &str) -> Option<TypeDescriptor> {
        self.table.descriptor(name)
    }

    /// Declared member and function types, visible before their declaration.
    fn prepare(&mut self, unit: &SourceUnit, classes: &[(String, String, &ClassDecl)]) {
        for decl in &unit.decls {
            if let Decl::Function(f) = decl {
                if let Some(ret) = f.ret.as_ref().and_then(|r| self.type_ref(r)) {
                    self.functions.insert(f.name.node.clone(), ret);
                }
            }
        }
        for (q, _, class) in classes {
            let mut members = HashMap::new();
            if let Some(ctor) = &class.ctor {
                for p in ctor.params.iter().filter(|p| p.binding.is_some()) {
                    if let Some(t) = p.ty.as_ref().and_then(|t| self.type_ref(t)) {
                        members.insert(p.name.node.clone(), t);
                    }
                }
            }
            for m in &class.members {
                if let Decl::Property(p) = m {
                    if let Some(t) = p.ty.as_ref().and_then(|t| self.type_ref(t)) {
                        members.insert(p.name.node.clone(), t);
                    }
                }
            }
            self.members.insert(q.clone(), members);
        }
    }

    fn record(&mut self, expr: &Expr, ty: Option<TypeDescriptor>) -> Option<TypeDescriptor> {
        if let Some(t) = &ty {
            self.types.insert(expr.id, t.clone());
        }
        ty
    }

    fn push_scope(&mut self) {
        self.scopes.push(Scope::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn define(&mut self, name: &str, ty: Option<TypeDescriptor>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), ty);
        }
    }

    fn member_type(&self, owner: &TypeDescriptor, name: &str) -> Option<TypeDescriptor> {
        let owners = std::iter::once(owner.qualified_name())
            .chain(owner.supertypes().iter().map(String::as_str));
        for o in owners {
            if let Some(t) = self.members.get(o).and_then(|m| m.get(name)) {
                return Some(t.clone());
            }
        }
        catalog::MEMBERS
            .iter()
            .find(|(o, m, _)| *m == name && owner.is_subtype_of(o))
            .and_then(|(_, _, t)| self.descriptor(t))
    }

    fn object_type(&self, written: &str) -> Option<TypeDescriptor> {
        let env = self.env;
        let q = env.resolve(written, &|c| {
            catalog::object_type(c).is_some() || env.local_objects.contains(c)
        })?;
        match catalog::object_type(&q) {
            Some(ty) => self.descriptor(ty),
            None if env.local_objects.contains(&q) => self.descriptor(&q),
            None => None,
        }
    }

    fn lookup_value(&self, name: &str) -> Option<TypeDescriptor> {
        for scope in self.scopes.iter().rev() {
            if let Some(t) = scope.get(name) {
                return t.clone();
            }
        }
        for recv in self.receivers.iter().rev() {
            if let Some(t) = self.member_type(recv, name) {
                return Some(t);
            }
        }
        self.object_type(name)
    }

    fn method_type(&self, receiver: Option<&TypeDescriptor>, name: &str) -> Option<TypeDescriptor> {
        catalog::METHODS
            .iter()
            .filter(|(m, _, _)| *m == name)
            .find(|(_, recv, _)| match (recv, receiver) {
                (None, _) => true,
                (Some(r), Some(t)) => t.is_subtype_of(r),
                (Some(_), None) => false,
            })
            .and_then(|(_, _, ret)| self.descriptor(ret))
    }

    /// Type of a call through a plain name: constructors, factories,
    /// top-level functions, then methods on implicit receivers.
    fn named_call_type(&self, name: &str) -> Option<TypeDescriptor> {
        let env = self.env;
        let table = self.table;
        let resolved = env.resolve(name, &|c| {
            catalog::function_return(c).is_some() || (table.contains(c) && !catalog::is_known_type(c))
        });
        if let Some(q) = resolved {
            if let Some(ret) = catalog::function_return(&q) {
                return self.descriptor(ret);
            }
            if let Some(t) = self.descriptor(&q).filter(|_| !catalog::is_known_type(&q)) {
                return Some(t);
            }
        }
        if let Some(t) = self.functions.get(name) {
            return Some(t.clone());
        }
        for recv in self.receivers.iter().rev() {
            if let Some(t) = self.method_type(Some(recv), name) {
                return Some(t);
            }
        }
        self.method_type(None, name)
    }

    fn unit(&mut self, unit: &SourceUnit) {
        self.push_scope();
        for decl in &unit.decls {
            if let Decl::Property(p) = decl {
                let ty = p.ty.as_ref().and_then(|t| self.type_ref(t));
                self.define(&p.name.node, ty);
            }
        }
        for decl in &unit.decls {
            self.decl(decl, None);
        }
        for stmt in &unit.statements {
            self.stmt(stmt);
        }
        self.pop_scope();
    }

    fn decl(&mut self, decl: &Decl, owner: Option<&str>) {
        match decl {
            Decl::Function(f) => self.function(f),
            Decl::Class(c) => self.class(c),
            Decl::Property(p) => self.property(p, owner),
        }
    }

    fn function(&mut self, f: &FunctionDecl) {
        self.push_scope();
        for p in &f.params.params {
            if let Some(d) = &p.default {
                self.expr(d);
            }
            let ty = p.ty.as_ref().and_then(|t| self.type_ref(t));
            self.define(&p.name.node, ty);
        }
        let receiver = f.receiver.as_ref().and_then(|r| self.type_ref(r));
        let pushed = receiver.is_some();
        if let Some(r) = receiver {
            self.receivers.push(r);
        }
        match &f.body {
            Some(FunctionBody::Block(b)) => self.block(b),
            Some(FunctionBody::Expr(e)) => {
                self.expr(e);
            }
            None => {}
        }
        if pushed {
            self.receivers.pop();
        }
        self.pop_scope();
    }

    fn class(&mut self, class: &ClassDecl) {
        let q = match self.class_path.last() {
            Some(outer) => format!("{outer}.{}", class.name.node),
            None => self.env.qualify(&class.name.node),
        };
        let receiver = self.descriptor(&q);
        let pushed = receiver.is_some();
        if let Some(r) = receiver {
            self.receivers.push(r);
        }
        self.class_path.push(q.clone());
        self.push_scope();
        if let Some(ctor) = &class.ctor {
            for p in &ctor.params {
                if let Some(d) = &p.default {
                    self.expr(d);
                }
                let ty = p.ty.as_ref().and_then(|t| self.type_ref(t));
                self.define(&p.name.node, ty);
            }
        }
        for s in &class.supertypes {
            for arg in s.ctor_args.iter().flatten() {
                self.expr(arg.value());
            }
        }
        for member in &class.members {
            self.decl(member, Some(&q));
        }
        self.pop_scope();
        self.class_path.pop();
        if pushed {
            self.receivers.pop();
        }
    }

    fn property(&mut self, p: &PropertyDecl, owner: Option<&str>) {
        let init = p.init.as_ref().and_then(|e| self.expr(e));
        if let Some(getter) = &p.getter {
            match getter {
                FunctionBody::Block(b) => self.block(b),
                FunctionBody::Expr(e) => {
                    self.expr(e);
                }
            }
        }
        let declared = p.ty.as_ref().and_then(|t| self.type_ref(t));
        let ty = if p.delegated { declared } else { declared.or(init) };
        match owner {
            Some(class) => {
                if let Some(t) = ty {
                    self.members
                        .entry(class.to_string())
                        .or_default()
                        .entry(p.name.node.clone())
                        .or_insert(t);
                }
            }
            None => self.define(&p.name.node, ty),
        }
    }

    fn block(&mut self, block: &Block) {
        self.push_scope();
        for stmt in &block.stmts {
            self.stmt(stmt);
        }
        self.pop_scope();
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Decl(d) => self.decl(d, None),
            Stmt::Expr(e) | Stmt::Throw(e) => {
                self.expr(e);
            }
            Stmt::Assign(a) => {
                self.expr(&a.target);
                self.expr(&a.expr);
            }
            Stmt::Return(r) => {
                if let Some(v) = &r.value {
                    self.expr(v);
                }
            }
            Stmt::While(w) | Stmt::DoWhile(w) => {
                self.expr(&w.cond);
                self.block(&w.body);
            }
            Stmt::For(f) => {
                self.expr(&f.iterable);
                self.push_scope();
                for b in &f.binders {
                    let ty = b.ty.as_ref().and_then(|t| self.type_ref(t));
                    self.define(&b.name.node, ty);
                }
                self.block(&f.body);
                self.pop_scope();
            }
            Stmt::Break(_) | Stmt::Continue(_) => {}
        }
    }

    fn lambda(&mut self, lambda: &Lambda, receiver: Option<TypeDescriptor>) {
        let pushed = receiver.is_some();
        if let Some(r) = receiver {
            self.receivers.push(r);
        }
        self.push_scope();
        for p in &lambda.params {
            let ty = p.ty.as_ref().and_then(|t| self.type_ref(t));
            self.define(&p.name.node, ty);
        }
        for stmt in &lambda.body.stmts {
            self.stmt(stmt);
        }
        self.pop_scope();
        if pushed {
            self.receivers.pop();
        }
    }

    fn expr(&mut self, expr: &Expr) -> Option<TypeDescriptor> {
        let ty = match &expr.kind {
            ExprKind::Name(n) => self.lookup_value(&n.node),
            ExprKind::This(None) => self.receivers.last().cloned(),
            ExprKind::This(Some(_))
            | ExprKind::Super
            | ExprKind::Null
            | ExprKind::BoolLit(_)
            | ExprKind::IntLit(_)
            | ExprKind::FloatLit(_)
            | ExprKind::CharLit(_)
            | ExprKind::StringLit(_) => None,
            ExprKind::Paren(inner) => self.expr(inner),
            ExprKind::Member { base, member, .. } => match self.expr(base) {
                Some(bt) => self.member_type(&bt, &member.node),
                None => expr
                    .dotted_path()
                    .and_then(|path| self.object_type(&path)),
            },
            ExprKind::Call {
                callee,
                args,
                trailing,
                ..
            } => self.call(callee, args, trailing.as_deref()),
            ExprKind::Lambda(l) => {
                self.lambda(l, None);
                None
            }
            ExprKind::Unary { op, expr: inner } => {
                let t = self.expr(inner);
                match op {
                    UnaryOp::NotNull => t,
                    _ => None,
                }
            }
            ExprKind::Binary { left, op, right } => {
                let lt = self.expr(left);
                let rt = self.expr(right);
                match op {
                    BinOp::Add => match (&lt, &rt) {
                        (Some(l), Some(r))
                            if l.is_subtype_of(catalog::COROUTINE_CONTEXT)
                                && r.is_subtype_of(catalog::COROUTINE_CONTEXT) =>
                        {
                            self.descriptor(catalog::COROUTINE_CONTEXT)
                        }
                        _ => None,
                    },
                    BinOp::Elvis => lt.or(rt),
                    _ => None,
                }
            }
            ExprKind::TypeTest { expr: inner, .. } => {
                self.expr(inner);
                None
            }
            ExprKind::Cast { expr: inner, ty, .. } => {
                self.expr(inner);
                self.type_ref(ty)
            }
            ExprKind::If {
                cond,
                then_block,
                else_block,
            } => {
                self.expr(cond);
                self.block(then_block);
                if let Some(b) = else_block {
                    self.block(b);
                }
                None
            }
            ExprKind::When { subject, arms } => {
                if let Some(s) = subject {
                    self.expr(s);
                }
                for arm in arms {
                    for c in &arm.conditions {
                        self.expr(c);
                    }
                    self.block(&arm.body);
                }
                None
            }
            ExprKind::Try {
                body,
                catches,
                finally,
            } => {
                self.block(body);
                for c in catches {
                    self.push_scope();
                    let ty = c.param.ty.as_ref().and_then(|t| self.type_ref(t));
                    self.define(&c.param.name.node, ty);
                    self.block(&c.body);
                    self.pop_scope();
                }
                if let Some(f) = finally {
                    self.block(f);
                }
                None
            }
            ExprKind::CallableRef { receiver, .. } => {
                if let Some(r) = receiver {
                    self.expr(r);
                }
                None
            }
            ExprKind::Object {
                supertypes,
                members,
            } => {
                for s in supertypes {
                    for arg in s.ctor_args.iter().flatten() {
                        self.expr(arg.value());
                    }
                }
                self.push_scope();
                for m in members {
                    self.decl(m, None);
                }
                self.pop_scope();
                None
            }
            ExprKind::Jump(stmt) => {
                self.stmt(stmt);
                None
            }
        };
        self.record(expr, ty)
    }

    fn call(
        &mut self,
        callee: &Expr,
        args: &[CallArg],
        trailing: Option<&Lambda>,
    ) -> Option<TypeDescriptor> {
        let (name, ty) = match &callee.kind {
            ExprKind::Name(n) => (Some(n.node.as_str()), self.named_call_type(&n.node)),
            ExprKind::Member { base, member, .. } => {
                let bt = self.expr(base);
                let ty = self.method_type(bt.as_ref(), &member.node);
                (Some(member.node.as_str()), ty)
            }
            _ => {
                self.expr(callee);
                (None, None)
            }
        };

        let scoped_body = name.is_some_and(|n| catalog::SCOPE_RECEIVER_BUILDERS.contains(&n));
        let receiver = if scoped_body {
            self.descriptor(catalog::COROUTINE_SCOPE)
        } else {
            None
        };

        for arg in args {
            match &arg.value().kind {
                ExprKind::Lambda(l) => {
                    self.lambda(l, receiver.clone());
                }
                _ => {
                    self.expr(arg.value());
                }
            }
        }
        if let Some(l) = trailing {
            self.lambda(l, receiver);
        }
        ty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_call_in_fn(unit: &SourceUnit, fn_name: &str) -> Expr {
        for d in &unit.decls {
            if let Decl::Function(f) = d {
                if f.name.node == fn_name {
                    if let Some(FunctionBody::Block(b)) = &f.body {
                        for s in &b.stmts {
                            if let Stmt::Expr(e) = s {
                                return e.clone();
                            }
                        }
                    }
                }
            }
        }
        panic!("no expression statement in {fn_name}");
    }

    fn parse(src: &str) -> SourceUnit {
        scopecheck_parse::parse_source(src).expect("parse")
    }

    #[test]
    fn parameter_types_resolve_through_explicit_imports() {
        let unit = parse(
            "import kotlinx.coroutines.CoroutineScope\n\nfun f(scope: CoroutineScope) {\n    scope.launch { }\n}\n",
        );
        let ctx = BindingContext::build(&unit);
        let call = first_call_in_fn(&unit, "f");
        let view = call.as_call().unwrap();
        let receiver = ctx.resolve(view.receiver.unwrap()).unwrap();
        assert_eq!(receiver.qualified_name(), catalog::COROUTINE_SCOPE);
        let result = ctx.resolve(&call).unwrap();
        assert_eq!(result.qualified_name(), catalog::JOB);
    }

    #[test]
    fn unimported_names_stay_unresolved() {
        let unit = parse("fun f(scope: CoroutineScope) {\n    scope.launch { }\n}\n");
        let ctx = BindingContext::build(&unit);
        let call = first_call_in_fn(&unit, "f");
        let view = call.as_call().unwrap();
        assert!(ctx.resolve(view.receiver.unwrap()).is_none());
    }

    #[test]
    fn dispatchers_members_resolve_with_star_import() {
        let unit = parse("import kotlinx.coroutines.*\n\nfun f() {\n    Dispatchers.IO\n}\n");
        let ctx = BindingContext::build(&unit);
        let e = first_call_in_fn(&unit, "f");
        let t = ctx.resolve(&e).unwrap();
        assert!(t.is_subtype_of(catalog::COROUTINE_DISPATCHER));
    }

    #[test]
    fn local_subtypes_and_constructor_calls() {
        let src = "package app\n\nimport kotlinx.coroutines.CoroutineScope\n\ninterface CoScope : CoroutineScope {}\nclass Leaf : CoScope\n\nfun f() {\n    Leaf().launch { }\n}\n";
        let unit = parse(src);
        let ctx = BindingContext::build(&unit);
        let call = first_call_in_fn(&unit, "f");
        let receiver = call.as_call().unwrap().receiver.unwrap();
        let t = ctx.resolve(receiver).unwrap();
        assert_eq!(t.qualified_name(), "app.Leaf");
        assert!(t.is_subtype_of(catalog::COROUTINE_SCOPE));
    }

    #[test]
    fn view_model_scope_resolves_inside_view_model() {
        let src = "import androidx.lifecycle.ViewModel\n\nclass Vm : ViewModel() {\n    fun go() {\n        viewModelScope.launch { }\n    }\n}\n";
        let unit = parse(src);
        let ctx = BindingContext::build(&unit);
        let Some(Decl::Class(class)) = unit.decls.first() else {
            panic!("expected class");
        };
        let Some(Decl::Function(go)) = class.members.first() else {
            panic!("expected method");
        };
        let Some(FunctionBody::Block(body)) = &go.body else {
            panic!("expected body");
        };
        let Stmt::Expr(call) = &body.stmts[0] else {
            panic!("expected call");
        };
        let receiver = call.as_call().unwrap().receiver.unwrap();
        let t = ctx.resolve(receiver).unwrap();
        assert_eq!(t.qualified_name(), catalog::COROUTINE_SCOPE);
    }

    #[test]
    fn context_sum_is_a_context() {
        let src = "import kotlinx.coroutines.*\n\nfun f(job: Job) {\n    Dispatchers.IO + job\n}\n";
        let unit = parse(src);
        let ctx = BindingContext::build(&unit);
        let e = first_call_in_fn(&unit, "f");
        assert_eq!(
            ctx.resolve(&e).map(|t| t.qualified_name().to_string()).as_deref(),
            Some(catalog::COROUTINE_CONTEXT)
        );
    }

    #[test]
    fn locals_shadow_outer_names() {
        let src = "import kotlinx.coroutines.*\n\nval scope: CoroutineScope = MainScope()\n\nfun f() {\n    val scope = 1\n    scope\n}\n";
        let unit = parse(src);
        let ctx = BindingContext::build(&unit);
        let Some(Decl::Function(f)) = unit.decls.get(1) else {
            panic!("expected function");
        };
        let Some(FunctionBody::Block(body)) = &f.body else {
            panic!("expected body");
        };
        let Stmt::Expr(e) = &body.stmts[1] else {
            panic!("expected expression");
        };
        assert!(ctx.resolve(e).is_none());
    }
}
