#![forbid(unsafe_code)]

//! Lexical traversal with the enclosing function, class and lambda frames of
//! every call site.

use scopecheck_ast::{
    Block, CallArg, CallView, ClassDecl, Decl, Expr, ExprKind, FunctionBody, FunctionDecl, Lambda,
    PropertyDecl, SourceUnit, Stmt,
};

use crate::catalog;

/// Calls that open a child scope tied to the enclosing suspension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuilderKind {
    CoroutineScope,
    SupervisorScope,
}

impl BuilderKind {
    pub fn name(self) -> &'static str {
        match self {
            BuilderKind::CoroutineScope => "coroutineScope",
            BuilderKind::SupervisorScope => "supervisorScope",
        }
    }
}

/// `coroutineScope { }` / `supervisorScope { }`, called bare or qualified
/// with the runtime package.
pub fn builder_kind(call: CallView<'_>) -> Option<BuilderKind> {
    if call.body_lambda().is_none() {
        return None;
    }
    if let Some(receiver) = call.receiver {
        if receiver.dotted_path().as_deref() != Some(catalog::COROUTINES_PACKAGE) {
            return None;
        }
    }
    match call.name.node.as_str() {
        "coroutineScope" => Some(BuilderKind::CoroutineScope),
        "supervisorScope" => Some(BuilderKind::SupervisorScope),
        _ => None,
    }
}

pub fn is_suspending(f: &FunctionDecl) -> bool {
    f.is_suspending()
}

#[derive(Clone, Copy, Debug)]
pub enum Frame<'a> {
    Function(&'a FunctionDecl),
    Class(&'a ClassDecl),
    /// Object expression body.
    Object,
    Lambda {
        lambda: &'a Lambda,
        builder: Option<BuilderKind>,
    },
}

/// Frames enclosing the node being visited, outermost first.
#[derive(Clone, Debug, Default)]
pub struct LexicalContext<'a> {
    frames: Vec<Frame<'a>>,
}

impl<'a> LexicalContext<'a> {
    pub fn frames(&self) -> &[Frame<'a>] {
        &self.frames
    }

    fn function_index(&self) -> Option<usize> {
        self.frames
            .iter()
            .rposition(|f| matches!(f, Frame::Function(_)))
    }

    pub fn enclosing_function(&self) -> Option<&'a FunctionDecl> {
        match self.frames[self.function_index()?] {
            Frame::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Class whose member the enclosing function is, if any.
    pub fn enclosing_class(&self) -> Option<&'a ClassDecl> {
        let idx = self.function_index()?;
        match self.frames[..idx].last() {
            Some(Frame::Class(c)) => Some(*c),
            _ => None,
        }
    }

    pub fn is_suspending(&self) -> bool {
        self.enclosing_function().is_some_and(is_suspending)
    }

    /// Builder entries between the current node and the enclosing function,
    /// innermost first.
    pub fn enclosing_builder_entries(&self) -> Vec<BuilderKind> {
        let start = self.function_index().map_or(0, |i| i + 1);
        self.frames[start..]
            .iter()
            .rev()
            .filter_map(|f| match f {
                Frame::Lambda { builder, .. } => *builder,
                _ => None,
            })
            .collect()
    }

    /// Lambdas between the current node and the enclosing function.
    pub fn lambda_depth(&self) -> usize {
        let start = self.function_index().map_or(0, |i| i + 1);
        self.frames[start..]
            .iter()
            .filter(|f| matches!(f, Frame::Lambda { .. } | Frame::Object))
            .count()
    }
}

pub trait Visitor<'a> {
    fn visit_call(&mut self, call: CallView<'a>, cx: &LexicalContext<'a>);
}

/// Visits every named call of `unit` in source order, outer calls first.
pub fn walk_unit<'a, V: Visitor<'a>>(unit: &'a SourceUnit, visitor: &mut V) {
    let mut walker = Walker {
        cx: LexicalContext::default(),
        visitor,
    };
    for decl in &unit.decls {
        walker.decl(decl);
    }
    for stmt in &unit.statements {
        walker.stmt(stmt);
    }
}

struct Walker<'a, 'v, V> {
    cx: LexicalContext<'a>,
    visitor: &'v mut V,
}

impl<'a, V: Visitor<'a>> Walker<'a, '_, V> {
    fn with_frame(&mut self, frame: Frame<'a>, f: impl FnOnce(&mut Self)) {
        self.cx.frames.push(frame);
        f(self);
        self.cx.frames.pop();
    }

    fn decl(&mut self, decl: &'a Decl) {
        match decl {
            Decl::Function(f) => self.function(f),
            Decl::Class(c) => self.class(c),
            Decl::Property(p) => self.property(p),
        }
    }

    fn function(&mut self, f: &'a FunctionDecl) {
        self.with_frame(Frame::Function(f), |w| {
            for p in &f.params.params {
                if let Some(d) = &p.default {
                    w.expr(d);
                }
            }
            match &f.body {
                Some(FunctionBody::Block(b)) => w.block(b),
                Some(FunctionBody::Expr(e)) => w.expr(e),
                None => {}
            }
        });
    }

    fn class(&mut self, c: &'a ClassDecl) {
        self.with_frame(Frame::Class(c), |w| {
            if let Some(ctor) = &c.ctor {
                for p in &ctor.params {
                    if let Some(d) = &p.default {
                        w.expr(d);
                    }
                }
            }
            for s in &c.supertypes {
                for arg in s.ctor_args.iter().flatten() {
                    w.expr(arg.value());
                }
            }
            for m in &c.members {
                w.decl(m);
            }
        });
    }

    fn property(&mut self, p: &'a PropertyDecl) {
        if let Some(init) = &p.init {
            self.expr(init);
        }
        match &p.getter {
            Some(FunctionBody::Block(b)) => self.block(b),
            Some(FunctionBody::Expr(e)) => self.expr(e),
            None => {}
        }
    }

    fn block(&mut self, b: &'a Block) {
        for stmt in &b.stmts {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::Decl(d) => self.decl(d),
            Stmt::Expr(e) | Stmt::Throw(e) => self.expr(e),
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
                self.block(&f.body);
            }
            Stmt::Break(_) | Stmt::Continue(_) => {}
        }
    }

    fn lambda(&mut self, lambda: &'a Lambda, builder: Option<BuilderKind>) {
        self.with_frame(Frame::Lambda { lambda, builder }, |w| w.block(&lambda.body));
    }

    fn expr(&mut self, expr: &'a Expr) {
        match &expr.kind {
            ExprKind::Name(_)
            | ExprKind::This(_)
            | ExprKind::Super
            | ExprKind::Null
            | ExprKind::BoolLit(_)
            | ExprKind::IntLit(_)
            | ExprKind::FloatLit(_)
            | ExprKind::CharLit(_)
            | ExprKind::StringLit(_) => {}
            ExprKind::Paren(inner) => self.expr(inner),
            ExprKind::Member { base, .. } => self.expr(base),
            ExprKind::Call {
                callee,
                args,
                trailing,
                ..
            } => self.call(expr, callee, args, trailing.as_deref()),
            ExprKind::Lambda(l) => self.lambda(l, None),
            ExprKind::Unary { expr: inner, .. }
            | ExprKind::TypeTest { expr: inner, .. }
            | ExprKind::Cast { expr: inner, .. } => self.expr(inner),
            ExprKind::Binary { left, right, .. } => {
                self.expr(left);
                self.expr(right);
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
            }
            ExprKind::Try {
                body,
                catches,
                finally,
            } => {
                self.block(body);
                for c in catches {
                    self.block(&c.body);
                }
                if let Some(f) = finally {
                    self.block(f);
                }
            }
            ExprKind::CallableRef { receiver, .. } => {
                if let Some(r) = receiver {
                    self.expr(r);
                }
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
                self.with_frame(Frame::Object, |w| {
                    for m in members {
                        w.decl(m);
                    }
                });
            }
            ExprKind::Jump(stmt) => self.stmt(stmt),
        }
    }

    fn call(
        &mut self,
        expr: &'a Expr,
        callee: &'a Expr,
        args: &'a [CallArg],
        trailing: Option<&'a Lambda>,
    ) {
        let builder = match expr.as_call() {
            Some(view) => {
                self.visitor.visit_call(view, &self.cx);
                builder_kind(view)
            }
            None => None,
        };
        match &callee.kind {
            ExprKind::Name(_) => {}
            ExprKind::Member { base, .. } => self.expr(base),
            _ => self.expr(callee),
        }
        for arg in args {
            match &arg.value().kind {
                ExprKind::Lambda(l) => self.lambda(l, builder),
                _ => self.expr(arg.value()),
            }
        }
        if let Some(l) = trailing {
            self.lambda(l, builder);
        }
    }
}
