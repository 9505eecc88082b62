#![forbid(unsafe_code)]

use miette::SourceSpan;

pub type Span = SourceSpan;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub span: Span,
    pub node: T,
}

impl<T> Spanned<T> {
    pub fn new(span: Span, node: T) -> Self {
        Self { span, node }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            span: self.span,
            node: f(self.node),
        }
    }
}

pub fn span(start: usize, len: usize) -> Span {
    SourceSpan::new(start.into(), len)
}

pub fn span_between(start: usize, end: usize) -> Span {
    debug_assert!(end >= start);
    span(start, end - start)
}

pub fn span_end(span: Span) -> usize {
    span.offset() + span.len()
}

/// Smallest span covering both `a` and `b`.
pub fn span_join(a: Span, b: Span) -> Span {
    let start = a.offset().min(b.offset());
    let end = span_end(a).max(span_end(b));
    span_between(start, end)
}

pub type Ident = Spanned<String>;

/// Identity of an expression node within one parsed unit.
///
/// Assigned densely by the parser; type information is keyed by it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub u32);

#[derive(Clone, Debug, PartialEq)]
pub struct SourceUnit {
    pub span: Span,
    pub package: Option<QualifiedName>,
    pub imports: Vec<ImportDirective>,
    pub decls: Vec<Decl>,
    /// Top-level statements of script units.
    pub statements: Vec<Stmt>,
}

impl SourceUnit {
    /// Dotted package name, empty for the default package.
    pub fn package_name(&self) -> String {
        self.package
            .as_ref()
            .map(QualifiedName::dotted)
            .unwrap_or_default()
    }

    /// Qualifies a top-level simple name with this unit's package.
    pub fn qualify(&self, simple: &str) -> String {
        let pkg = self.package_name();
        if pkg.is_empty() {
            simple.to_string()
        } else {
            format!("{pkg}.{simple}")
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct QualifiedName {
    pub span: Span,
    pub segments: Vec<Ident>,
}

impl QualifiedName {
    pub fn dotted(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.node.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn last(&self) -> &str {
        self.segments.last().map(|s| s.node.as_str()).unwrap_or("")
    }

    pub fn is_simple(&self) -> bool {
        self.segments.len() == 1
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImportDirective {
    pub span: Span,
    pub path: QualifiedName,
    pub star: bool,
    pub alias: Option<Ident>,
}

impl ImportDirective {
    /// The simple name this import binds, `None` for star imports.
    pub fn bound_name(&self) -> Option<&str> {
        if self.star {
            return None;
        }
        match &self.alias {
            Some(alias) => Some(alias.node.as_str()),
            None => Some(self.path.last()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Decl {
    Function(FunctionDecl),
    Class(ClassDecl),
    Property(PropertyDecl),
}

impl Decl {
    pub fn span(&self) -> Span {
        match self {
            Decl::Function(f) => f.span,
            Decl::Class(c) => c.span,
            Decl::Property(p) => p.span,
        }
    }

    pub fn name(&self) -> &Ident {
        match self {
            Decl::Function(f) => &f.name,
            Decl::Class(c) => &c.name,
            Decl::Property(p) => &p.name,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Modifiers {
    pub items: Vec<Ident>,
}

impl Modifiers {
    pub fn contains(&self, name: &str) -> bool {
        self.items.iter().any(|m| m.node == name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDecl {
    pub span: Span,
    pub modifiers: Modifiers,
    pub name: Ident,
    pub type_params: Vec<Ident>,
    /// Extension receiver type (`fun CoroutineScope.f()`).
    pub receiver: Option<TypeRef>,
    pub params: ParameterList,
    pub ret: Option<TypeRef>,
    /// Absent for abstract and interface members.
    pub body: Option<FunctionBody>,
}

impl FunctionDecl {
    pub fn is_suspending(&self) -> bool {
        self.modifiers.contains("suspend")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FunctionBody {
    Block(Block),
    Expr(Expr),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParameterList {
    pub span: Option<Span>,
    pub params: Vec<Param>,
}

impl ParameterList {
    pub fn find(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name.node == name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingKind {
    Val,
    Var,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub span: Span,
    pub name: Ident,
    pub ty: Option<TypeRef>,
    pub default: Option<Expr>,
    /// `val`/`var` on a primary-constructor parameter.
    pub binding: Option<BindingKind>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
    Object,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassDecl {
    pub span: Span,
    pub modifiers: Modifiers,
    pub kind: ClassKind,
    pub name: Ident,
    pub type_params: Vec<Ident>,
    pub ctor: Option<ParameterList>,
    pub supertypes: Vec<SuperType>,
    pub members: Vec<Decl>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SuperType {
    pub span: Span,
    pub ty: TypeRef,
    /// Present when the supertype is a constructor invocation (`: ViewModel()`).
    pub ctor_args: Option<Vec<CallArg>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PropertyDecl {
    pub span: Span,
    pub modifiers: Modifiers,
    pub mutable: bool,
    pub receiver: Option<TypeRef>,
    pub name: Ident,
    pub ty: Option<TypeRef>,
    pub init: Option<Expr>,
    /// `by <expr>` delegation; stored in `init`.
    pub delegated: bool,
    pub getter: Option<FunctionBody>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeRef {
    pub span: Span,
    pub kind: TypeRefKind,
    pub nullable: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeRefKind {
    Named {
        name: QualifiedName,
        args: Vec<TypeRef>,
    },
    Function {
        receiver: Option<Box<TypeRef>>,
        params: Vec<TypeRef>,
        ret: Box<TypeRef>,
        suspend: bool,
    },
    /// `*` projection.
    Star,
}

impl TypeRef {
    /// Written name of a nominal type (`kotlinx.coroutines.CoroutineScope` or `CoroutineScope`).
    pub fn written_name(&self) -> Option<String> {
        match &self.kind {
            TypeRefKind::Named { name, .. } => Some(name.dotted()),
            _ => None,
        }
    }

    pub fn simple_name(&self) -> Option<&str> {
        match &self.kind {
            TypeRefKind::Named { name, .. } => Some(name.last()),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub span: Span,
    pub stmts: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Decl(Decl),
    Expr(Expr),
    Assign(AssignStmt),
    Return(ReturnStmt),
    Throw(Expr),
    While(WhileStmt),
    DoWhile(WhileStmt),
    For(ForStmt),
    Break(Span),
    Continue(Span),
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssignStmt {
    pub span: Span,
    pub target: Expr,
    pub op: AssignOp,
    pub expr: Expr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReturnStmt {
    pub span: Span,
    pub label: Option<Ident>,
    pub value: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WhileStmt {
    pub span: Span,
    pub cond: Expr,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ForStmt {
    pub span: Span,
    pub binders: Vec<Param>,
    pub iterable: Expr,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub id: ExprId,
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Name(Ident),
    This(Option<Ident>),
    Super,
    Null,
    BoolLit(bool),
    IntLit(String),
    FloatLit(String),
    CharLit(String),
    StringLit(String),
    Paren(Box<Expr>),
    Member {
        base: Box<Expr>,
        member: Ident,
        safe: bool,
    },
    Call {
        callee: Box<Expr>,
        type_args: Vec<TypeRef>,
        args: Vec<CallArg>,
        trailing: Option<Box<Lambda>>,
    },
    Lambda(Box<Lambda>),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    TypeTest {
        expr: Box<Expr>,
        ty: TypeRef,
        negated: bool,
    },
    Cast {
        expr: Box<Expr>,
        ty: TypeRef,
        safe: bool,
    },
    If {
        cond: Box<Expr>,
        then_block: Block,
        else_block: Option<Block>,
    },
    When {
        subject: Option<Box<Expr>>,
        arms: Vec<WhenArm>,
    },
    Try {
        body: Block,
        catches: Vec<CatchClause>,
        finally: Option<Block>,
    },
    /// `Foo::class`, `::bar`, `obj::baz`.
    CallableRef {
        receiver: Option<Box<Expr>>,
        member: Ident,
    },
    /// `object : Base { ... }`
    Object {
        supertypes: Vec<SuperType>,
        members: Vec<Decl>,
    },
    /// `return`, `throw`, `break`, `continue` used as expressions (`x ?: return`).
    Jump(Box<Stmt>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Lambda {
    pub span: Span,
    pub params: Vec<Param>,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WhenArm {
    pub span: Span,
    /// Empty for the `else` arm.
    pub conditions: Vec<Expr>,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CatchClause {
    pub span: Span,
    pub param: Param,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CallArg {
    Positional(Expr),
    Named { name: Ident, value: Expr },
    Spread(Expr),
}

impl CallArg {
    pub fn value(&self) -> &Expr {
        match self {
            CallArg::Positional(e) | CallArg::Spread(e) => e,
            CallArg::Named { value, .. } => value,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            CallArg::Named { name, .. } => Some(name.node.as_str()),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    NotNull,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Range,

    Eq,
    Ne,
    RefEq,
    RefNe,
    Lt,
    Gt,
    Le,
    Ge,
    In,
    NotIn,

    And,
    Or,
    Elvis,
    /// Named infix call (`a to b`, `x shl 2`).
    Infix,
}

/// A call expression seen as `receiver.name<type_args>(args) { trailing }`.
#[derive(Clone, Copy, Debug)]
pub struct CallView<'a> {
    pub expr: &'a Expr,
    pub receiver: Option<&'a Expr>,
    pub name: &'a Ident,
    pub safe: bool,
    pub type_args: &'a [TypeRef],
    pub args: &'a [CallArg],
    pub trailing: Option<&'a Lambda>,
}

impl<'a> CallView<'a> {
    /// Value arguments, excluding the trailing lambda.
    pub fn value_args(self) -> impl Iterator<Item = &'a Expr> + 'a {
        self.args.iter().map(CallArg::value)
    }

    /// The task body: the trailing lambda, or a lambda passed as last `block` argument.
    pub fn body_lambda(self) -> Option<&'a Lambda> {
        if let Some(l) = self.trailing {
            return Some(l);
        }
        match self.args.last() {
            Some(CallArg::Named { name, value }) if name.node == "block" => match &value.kind {
                ExprKind::Lambda(l) => Some(l),
                _ => None,
            },
            _ => None,
        }
    }
}

impl Expr {
    /// Strips redundant parentheses.
    pub fn unparen(&self) -> &Expr {
        let mut e = self;
        while let ExprKind::Paren(inner) = &e.kind {
            e = inner.as_ref();
        }
        e
    }

    /// Views a named call (`f(..)`, `a.f(..)`, `a?.f(..)`); `None` for other expressions.
    pub fn as_call(&self) -> Option<CallView<'_>> {
        let ExprKind::Call {
            callee,
            type_args,
            args,
            trailing,
        } = &self.kind
        else {
            return None;
        };
        let (receiver, name, safe) = match &callee.kind {
            ExprKind::Name(name) => (None, name, false),
            ExprKind::Member { base, member, safe } => (Some(base.as_ref()), member, *safe),
            _ => return None,
        };
        Some(CallView {
            expr: self,
            receiver,
            name,
            safe,
            type_args,
            args,
            trailing: trailing.as_deref(),
        })
    }

    /// Dotted textual path for `a`, `a.b.c` chains of plain names.
    pub fn dotted_path(&self) -> Option<String> {
        match &self.unparen().kind {
            ExprKind::Name(n) => Some(n.node.clone()),
            ExprKind::Member { base, member, .. } => {
                let mut head = base.dotted_path()?;
                head.push('.');
                head.push_str(&member.node);
                Some(head)
            }
            _ => None,
        }
    }

    /// Leading name of a receiver chain as written: `GlobalScope` for `GlobalScope`,
    /// `CoroutineScope` for `CoroutineScope(ctx)`, `a` for `a.b.c()`.
    pub fn head_name(&self) -> Option<&str> {
        match &self.unparen().kind {
            ExprKind::Name(n) => Some(n.node.as_str()),
            ExprKind::Member { base, .. } => base.head_name(),
            ExprKind::Call { callee, .. } => callee.head_name(),
            _ => None,
        }
    }
}
