#![forbid(unsafe_code)]

use scopecheck_ast::{
    span_between, span_end, AssignOp, AssignStmt, BinOp, BindingKind, Block, CallArg, CatchClause,
    ClassDecl, ClassKind, Decl, Expr, ExprId, ExprKind, ForStmt, FunctionBody, FunctionDecl, Ident,
    ImportDirective, Lambda, Modifiers, Param, ParameterList, PropertyDecl, QualifiedName,
    ReturnStmt, SourceUnit, Span, Spanned, Stmt, SuperType, TypeRef, TypeRefKind, UnaryOp,
    WhenArm, WhileStmt,
};
use scopecheck_lex::{Token, TokenKind};

use crate::error::ParseError;

const MODIFIERS: &[&str] = &[
    "public",
    "private",
    "protected",
    "internal",
    "open",
    "final",
    "abstract",
    "sealed",
    "data",
    "enum",
    "annotation",
    "inner",
    "companion",
    "override",
    "lateinit",
    "const",
    "suspend",
    "inline",
    "noinline",
    "crossinline",
    "reified",
    "tailrec",
    "operator",
    "infix",
    "external",
    "vararg",
    "value",
    "expect",
    "actual",
];

/// Soft keywords that never start an infix call.
const NOT_INFIX: &[&str] = &["by", "get", "set", "where"];

fn is_modifier(name: &str) -> bool {
    MODIFIERS.contains(&name)
}

/// A soft modifier keyword only counts as one when something declarable follows.
fn modifier_follows(next: &TokenKind) -> bool {
    matches!(
        next,
        TokenKind::Ident(_)
            | TokenKind::At
            | TokenKind::KwFun
            | TokenKind::KwClass
            | TokenKind::KwInterface
            | TokenKind::KwObject
            | TokenKind::KwVal
            | TokenKind::KwVar
            | TokenKind::KwTypealias
    )
}

type PResult<T> = Result<T, ParseError>;

/// Deepest expression nesting accepted before the parse of a statement fails.
const MAX_NESTING: usize = 32;

pub struct Parser<'a> {
    tokens: &'a [Token],
    idx: usize,
    next_id: u32,
    errors: Vec<ParseError>,
    depth: usize,
    /// Set while parsing `by` delegation in a supertype list, where `{` opens the class body.
    no_trailing_lambda: bool,
}

impl<'a> Parser<'a> {
    /// `tokens` must end with `TokenKind::Eof`, as produced by the lexer.
    pub fn new(tokens: &'a [Token]) -> Self {
        debug_assert!(matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::Eof)));
        Self {
            tokens,
            idx: 0,
            next_id: 0,
            errors: Vec::new(),
            depth: 0,
            no_trailing_lambda: false,
        }
    }

    /// Parses a whole unit; the first recorded error fails the parse.
    pub fn parse_unit(&mut self) -> PResult<SourceUnit> {
        let (unit, mut errors) = self.parse_unit_with_recovery();
        if errors.is_empty() {
            Ok(unit)
        } else {
            Err(errors.remove(0))
        }
    }

    /// Parses a whole unit, skipping declarations and statements that fail to parse.
    pub fn parse_unit_with_recovery(&mut self) -> (SourceUnit, Vec<ParseError>) {
        let mut package = None;
        let mut imports = Vec::new();
        let mut decls = Vec::new();
        let mut statements = Vec::new();

        self.skip_separators();
        self.skip_file_annotations();

        if self.at(&TokenKind::KwPackage) {
            self.bump();
            match self.parse_qualified_name() {
                Ok(name) => package = Some(name),
                Err(e) => {
                    self.errors.push(e);
                    self.recover();
                }
            }
        }

        loop {
            self.skip_separators();
            if !self.at(&TokenKind::KwImport) {
                break;
            }
            match self.parse_import() {
                Ok(import) => imports.push(import),
                Err(e) => {
                    self.errors.push(e);
                    self.recover();
                }
            }
        }

        loop {
            self.skip_separators();
            match self.peek() {
                TokenKind::Eof => break,
                TokenKind::RBrace => {
                    let err = self.error_here("unmatched '}'");
                    self.errors.push(err);
                    self.bump();
                    continue;
                }
                _ => {}
            }

            let before = self.idx;
            let result = if self.at_decl_start(false) {
                self.parse_decl(true).map(|d| {
                    if let Some(d) = d {
                        decls.push(d);
                    }
                })
            } else {
                self.parse_stmt_into(&mut statements)
            };
            match result.and_then(|_| self.expect_stmt_end()) {
                Ok(()) => {}
                Err(e) => {
                    self.errors.push(e);
                    self.recover();
                }
            }
            if self.idx == before {
                self.bump();
            }
        }

        let end = self.tokens.last().map(|t| span_end(t.span)).unwrap_or(0);
        let unit = SourceUnit {
            span: span_between(0, end),
            package,
            imports,
            decls,
            statements,
        };
        (unit, std::mem::take(&mut self.errors))
    }

    pub fn parse_expr_eof(&mut self) -> PResult<Expr> {
        self.skip_newlines();
        let expr = self.parse_expr()?;
        self.skip_separators();
        if !self.at(&TokenKind::Eof) {
            return Err(self.error_here("expected end of input"));
        }
        Ok(expr)
    }

    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    fn tok(&self, i: usize) -> &'a Token {
        let tokens: &'a [Token] = self.tokens;
        &tokens[i.min(tokens.len() - 1)]
    }

    fn peek(&self) -> &'a TokenKind {
        &self.tok(self.idx).kind
    }

    fn peek_at(&self, n: usize) -> &'a TokenKind {
        &self.tok(self.idx + n).kind
    }

    fn peek_span(&self) -> Span {
        self.tok(self.idx).span
    }

    fn bump(&mut self) -> &'a Token {
        let t = self.tok(self.idx);
        if self.idx < self.tokens.len() - 1 {
            self.idx += 1;
        }
        t
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.peek() == kind
    }

    fn at_ident(&self, name: &str) -> bool {
        matches!(self.peek(), TokenKind::Ident(s) if s == name)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> PResult<Span> {
        if self.at(&kind) {
            Ok(self.bump().span)
        } else {
            Err(self.error_here(&format!(
                "expected {what}, found {}",
                self.peek().describe()
            )))
        }
    }

    /// Runs `f` one nesting level deeper, failing past `MAX_NESTING`.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(self.error_here("expression nested too deeply"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn error_here(&self, message: &str) -> ParseError {
        ParseError {
            message: message.to_string(),
            span: self.peek_span(),
        }
    }

    fn start(&self) -> usize {
        self.peek_span().offset()
    }

    fn prev_end(&self) -> usize {
        if self.idx == 0 {
            0
        } else {
            span_end(self.tok(self.idx - 1).span)
        }
    }

    fn span_from(&self, start: usize) -> Span {
        span_between(start, self.prev_end().max(start))
    }

    fn skip_newlines(&mut self) {
        while self.at(&TokenKind::Newline) {
            self.bump();
        }
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek(), TokenKind::Newline | TokenKind::Semi) {
            self.bump();
        }
    }

    /// Index of the first non-newline token at or after the cursor.
    fn significant_index(&self) -> usize {
        let mut i = self.idx;
        while matches!(self.tok(i).kind, TokenKind::Newline) && i < self.tokens.len() - 1 {
            i += 1;
        }
        i
    }

    fn peek_significant(&self) -> &'a TokenKind {
        &self.tok(self.significant_index()).kind
    }

    fn ident(&mut self, what: &str) -> PResult<Ident> {
        match self.peek() {
            TokenKind::Ident(name) => {
                let span = self.bump().span;
                Ok(Spanned::new(span, name.clone()))
            }
            other => Err(self.error_here(&format!(
                "expected {what}, found {}",
                other.describe()
            ))),
        }
    }

    fn mk(&mut self, span: Span, kind: ExprKind) -> Expr {
        let id = ExprId(self.next_id);
        self.next_id += 1;
        Expr { id, span, kind }
    }

    fn expect_stmt_end(&mut self) -> PResult<()> {
        match self.peek() {
            TokenKind::Newline | TokenKind::Semi => {
                self.bump();
                Ok(())
            }
            TokenKind::RBrace | TokenKind::Eof => Ok(()),
            other => Err(self.error_here(&format!(
                "expected newline or ';', found {}",
                other.describe()
            ))),
        }
    }

    /// Skips to the next statement boundary at the current nesting depth.
    fn recover(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.peek() {
                TokenKind::Eof => return,
                TokenKind::LParen | TokenKind::LBrace | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBracket => depth = depth.saturating_sub(1),
                TokenKind::RBrace => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                }
                TokenKind::Newline | TokenKind::Semi if depth == 0 => {
                    self.bump();
                    return;
                }
                _ => {}
            }
            self.bump();
        }
    }

    /// Index just past the bracket group opened at `i`.
    fn skip_group_from(&self, i: usize) -> usize {
        let mut depth = 0usize;
        let mut j = i;
        loop {
            match &self.tok(j).kind {
                TokenKind::Eof => return j,
                TokenKind::LParen | TokenKind::LBrace | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return j + 1;
                    }
                }
                _ => {}
            }
            j += 1;
        }
    }

    fn skip_group(&mut self) {
        let end = self.skip_group_from(self.idx);
        while self.idx < end && !self.at(&TokenKind::Eof) {
            self.bump();
        }
    }

    /// Index past an annotation starting at `i` (`@Name`, `@a.b.Name(...)`, `@use:Name`, `@[...]`).
    fn skip_annotation_from(&self, i: usize) -> usize {
        let mut j = i + 1;
        if matches!(self.tok(j).kind, TokenKind::LBracket) {
            return self.skip_group_from(j);
        }
        if matches!(self.tok(j).kind, TokenKind::Ident(_) | TokenKind::KwFun)
            && matches!(self.tok(j + 1).kind, TokenKind::Colon)
        {
            j += 2;
        }
        if !matches!(self.tok(j).kind, TokenKind::Ident(_)) {
            return j;
        }
        j += 1;
        while matches!(self.tok(j).kind, TokenKind::Dot)
            && matches!(self.tok(j + 1).kind, TokenKind::Ident(_))
        {
            j += 2;
        }
        if matches!(self.tok(j).kind, TokenKind::LParen) {
            j = self.skip_group_from(j);
        }
        j
    }

    fn skip_annotations(&mut self) {
        while self.at(&TokenKind::At) {
            let end = self.skip_annotation_from(self.idx);
            while self.idx < end {
                self.bump();
            }
            self.skip_newlines();
        }
    }

    fn skip_file_annotations(&mut self) {
        loop {
            self.skip_separators();
            let is_file = self.at(&TokenKind::At)
                && matches!(self.peek_at(1), TokenKind::Ident(s) if s == "file")
                && matches!(self.peek_at(2), TokenKind::Colon);
            if !is_file {
                return;
            }
            let end = self.skip_annotation_from(self.idx);
            while self.idx < end {
                self.bump();
            }
        }
    }

    // ------------------------------------------------------------------
    // Headers
    // ------------------------------------------------------------------

    fn parse_qualified_name(&mut self) -> PResult<QualifiedName> {
        let start = self.start();
        let mut segments = vec![self.ident("name")?];
        while self.at(&TokenKind::Dot) && matches!(self.peek_at(1), TokenKind::Ident(_)) {
            self.bump();
            segments.push(self.ident("name")?);
        }
        Ok(QualifiedName {
            span: self.span_from(start),
            segments,
        })
    }

    fn parse_import(&mut self) -> PResult<ImportDirective> {
        let start = self.expect(TokenKind::KwImport, "'import'")?.offset();
        let path = self.parse_qualified_name()?;
        let mut star = false;
        if self.at(&TokenKind::Dot) && matches!(self.peek_at(1), TokenKind::Star) {
            self.bump();
            self.bump();
            star = true;
        }
        let alias = if self.eat(&TokenKind::KwAs) {
            Some(self.ident("import alias")?)
        } else {
            None
        };
        Ok(ImportDirective {
            span: self.span_from(start),
            path,
            star,
            alias,
        })
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    /// Whether the cursor starts a declaration (after annotations and modifiers).
    fn at_decl_start(&self, in_class: bool) -> bool {
        let mut i = self.idx;
        loop {
            match &self.tok(i).kind {
                TokenKind::At => {
                    i = self.skip_annotation_from(i);
                    while matches!(self.tok(i).kind, TokenKind::Newline) {
                        i += 1;
                    }
                }
                TokenKind::Ident(s) if is_modifier(s) && modifier_follows(&self.tok(i + 1).kind) => {
                    i += 1
                }
                TokenKind::KwFun
                | TokenKind::KwClass
                | TokenKind::KwInterface
                | TokenKind::KwObject
                | TokenKind::KwVal
                | TokenKind::KwVar
                | TokenKind::KwTypealias => return true,
                TokenKind::Ident(s) if in_class && (s == "init" || s == "constructor") => {
                    return matches!(
                        self.tok(i + 1).kind,
                        TokenKind::LBrace | TokenKind::LParen
                    );
                }
                _ => return false,
            }
        }
    }

    fn parse_modifiers(&mut self) -> Modifiers {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                TokenKind::At => self.skip_annotations(),
                TokenKind::Ident(s) if is_modifier(s) && modifier_follows(self.peek_at(1)) => {
                    let span = self.bump().span;
                    items.push(Spanned::new(span, s.clone()));
                }
                _ => break,
            }
        }
        Modifiers { items }
    }

    /// Parses one declaration; `None` for declarations that carry nothing
    /// the analysis looks at (type aliases).
    fn parse_decl(&mut self, allow_accessors: bool) -> PResult<Option<Decl>> {
        let start = self.start();
        let modifiers = self.parse_modifiers();
        match self.peek() {
            TokenKind::KwFun if matches!(self.peek_at(1), TokenKind::KwInterface) => {
                self.bump();
                self.parse_class(start, modifiers).map(Some)
            }
            TokenKind::KwFun => self.parse_function(start, modifiers).map(|f| Some(Decl::Function(f))),
            TokenKind::KwClass | TokenKind::KwInterface | TokenKind::KwObject => {
                self.parse_class(start, modifiers).map(Some)
            }
            TokenKind::KwVal | TokenKind::KwVar => self
                .parse_property(start, modifiers, allow_accessors)
                .map(|p| Some(Decl::Property(p))),
            TokenKind::KwTypealias => {
                while !matches!(
                    self.peek(),
                    TokenKind::Newline | TokenKind::Semi | TokenKind::Eof
                ) {
                    self.bump();
                }
                Ok(None)
            }
            other => Err(self.error_here(&format!(
                "expected declaration, found {}",
                other.describe()
            ))),
        }
    }

    fn parse_type_params(&mut self) -> PResult<Vec<Ident>> {
        let mut out = Vec::new();
        if !self.at(&TokenKind::Lt) {
            return Ok(out);
        }
        self.bump();
        loop {
            self.skip_newlines();
            self.skip_annotations();
            while matches!(self.peek(), TokenKind::Ident(s) if s == "reified" || s == "out")
                || self.at(&TokenKind::KwIn)
            {
                self.bump();
            }
            out.push(self.ident("type parameter")?);
            if self.eat(&TokenKind::Colon) {
                self.parse_type()?;
            }
            self.skip_newlines();
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            self.expect(TokenKind::Gt, "'>'")?;
            break;
        }
        Ok(out)
    }

    fn skip_where_clause(&mut self) -> PResult<()> {
        if !self.at_ident("where") {
            return Ok(());
        }
        self.bump();
        loop {
            self.ident("type parameter")?;
            self.expect(TokenKind::Colon, "':'")?;
            self.parse_type()?;
            if !self.eat(&TokenKind::Comma) {
                return Ok(());
            }
            self.skip_newlines();
        }
    }

    fn parse_function(&mut self, start: usize, modifiers: Modifiers) -> PResult<FunctionDecl> {
        self.expect(TokenKind::KwFun, "'fun'")?;
        let type_params = self.parse_type_params()?;

        // `fun name(`, `fun Recv.name(`, `fun a.b.Recv.name(`, `fun List<T>.name(`.
        let head = self.parse_type()?;
        let (receiver, name) = if self.eat(&TokenKind::Dot) {
            (Some(head), self.ident("function name")?)
        } else {
            split_receiver(head).ok_or_else(|| self.error_here("expected function name"))?
        };

        let params = self.parse_params(false)?;
        let ret = if self.eat(&TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.skip_where_clause()?;

        let body = if self.at(&TokenKind::LBrace) {
            Some(FunctionBody::Block(self.parse_block()?))
        } else if self.at(&TokenKind::Eq) {
            self.bump();
            self.skip_newlines();
            Some(FunctionBody::Expr(self.parse_expr()?))
        } else {
            None
        };

        Ok(FunctionDecl {
            span: self.span_from(start),
            modifiers,
            name,
            type_params,
            receiver,
            params,
            ret,
            body,
        })
    }

    fn parse_params(&mut self, ctor: bool) -> PResult<ParameterList> {
        let start = self.expect(TokenKind::LParen, "'('")?.offset();
        let mut params = Vec::new();
        loop {
            self.skip_newlines();
            if self.eat(&TokenKind::RParen) {
                break;
            }
            params.push(self.parse_param(ctor)?);
            self.skip_newlines();
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            self.expect(TokenKind::RParen, "')'")?;
            break;
        }
        Ok(ParameterList {
            span: Some(self.span_from(start)),
            params,
        })
    }

    fn parse_param(&mut self, ctor: bool) -> PResult<Param> {
        let start = self.start();
        self.parse_modifiers();
        let binding = if ctor && self.eat(&TokenKind::KwVal) {
            Some(BindingKind::Val)
        } else if ctor && self.eat(&TokenKind::KwVar) {
            Some(BindingKind::Var)
        } else {
            None
        };
        let name = self.ident("parameter name")?;
        let ty = if self.eat(&TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let default = if self.eat(&TokenKind::Eq) {
            self.skip_newlines();
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(Param {
            span: self.span_from(start),
            name,
            ty,
            default,
            binding,
        })
    }

    fn parse_class(&mut self, start: usize, modifiers: Modifiers) -> PResult<Decl> {
        let kind = match self.bump().kind {
            TokenKind::KwClass => ClassKind::Class,
            TokenKind::KwInterface => ClassKind::Interface,
            TokenKind::KwObject => ClassKind::Object,
            _ => return Err(self.error_here("expected 'class', 'interface' or 'object'")),
        };

        let name = match (kind, self.peek()) {
            (_, TokenKind::Ident(_)) => self.ident("class name")?,
            // `companion object` may be anonymous.
            (ClassKind::Object, _) => Spanned::new(self.peek_span(), "Companion".to_string()),
            _ => return Err(self.error_here("expected class name")),
        };
        let type_params = self.parse_type_params()?;

        self.parse_modifiers();
        if self.at_ident("constructor") {
            self.bump();
        }
        let ctor = if self.at(&TokenKind::LParen) {
            Some(self.parse_params(true)?)
        } else {
            None
        };

        let supertypes = if self.at(&TokenKind::Colon) {
            self.bump();
            self.parse_supertypes()?
        } else {
            Vec::new()
        };
        self.skip_where_clause()?;

        let members = if self.at(&TokenKind::LBrace) {
            self.parse_class_body(modifiers.contains("enum"))?
        } else {
            Vec::new()
        };

        Ok(Decl::Class(ClassDecl {
            span: self.span_from(start),
            modifiers,
            kind,
            name,
            type_params,
            ctor,
            supertypes,
            members,
        }))
    }

    fn parse_supertypes(&mut self) -> PResult<Vec<SuperType>> {
        let mut out = Vec::new();
        loop {
            self.skip_newlines();
            self.skip_annotations();
            let start = self.start();
            let ty = self.parse_type()?;
            let ctor_args = if self.at(&TokenKind::LParen) {
                Some(self.parse_call_args()?)
            } else {
                None
            };
            if self.at_ident("by") {
                self.bump();
                self.skip_newlines();
                let saved = std::mem::replace(&mut self.no_trailing_lambda, true);
                let delegate = self.parse_expr();
                self.no_trailing_lambda = saved;
                delegate?;
            }
            out.push(SuperType {
                span: self.span_from(start),
                ty,
                ctor_args,
            });
            if !self.eat(&TokenKind::Comma) {
                return Ok(out);
            }
        }
    }

    fn parse_class_body(&mut self, is_enum: bool) -> PResult<Vec<Decl>> {
        self.expect(TokenKind::LBrace, "'{'")?;
        if is_enum {
            self.skip_enum_entries();
        }

        let mut members = Vec::new();
        loop {
            self.skip_separators();
            if matches!(self.peek(), TokenKind::RBrace | TokenKind::Eof) {
                break;
            }
            let before = self.idx;
            let result = self.parse_class_member().and_then(|member| {
                if let Some(member) = member {
                    members.push(member);
                }
                self.expect_stmt_end()
            });
            if let Err(e) = result {
                self.errors.push(e);
                self.recover();
            }
            if self.idx == before {
                self.bump();
            }
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(members)
    }

    /// Skips `A, B(1), C { ... };` up to the member section or the closing brace.
    fn skip_enum_entries(&mut self) {
        loop {
            match self.peek() {
                TokenKind::Semi => {
                    self.bump();
                    return;
                }
                TokenKind::RBrace | TokenKind::Eof => return,
                TokenKind::LParen | TokenKind::LBrace | TokenKind::LBracket => self.skip_group(),
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn parse_class_member(&mut self) -> PResult<Option<Decl>> {
        let start = self.start();
        if self.at_ident("init") && matches!(self.peek_at(1), TokenKind::LBrace) {
            let name_tok = self.bump();
            let name = Spanned::new(name_tok.span, "init".to_string());
            let body = self.parse_block()?;
            return Ok(Some(Decl::Function(FunctionDecl {
                span: self.span_from(start),
                modifiers: Modifiers::default(),
                name,
                type_params: Vec::new(),
                receiver: None,
                params: ParameterList::default(),
                ret: None,
                body: Some(FunctionBody::Block(body)),
            })));
        }

        if !self.at_decl_start(true) {
            return Err(self.error_here(&format!(
                "expected class member, found {}",
                self.peek().describe()
            )));
        }

        let save = self.idx;
        let modifiers = self.parse_modifiers();
        if self.at_ident("constructor") {
            return self.parse_secondary_ctor(start, modifiers).map(Some);
        }
        self.idx = save;
        self.parse_decl(true)
    }

    fn parse_secondary_ctor(&mut self, start: usize, modifiers: Modifiers) -> PResult<Decl> {
        let name = self.ident("'constructor'")?;
        let params = self.parse_params(false)?;
        if self.eat(&TokenKind::Colon) {
            self.skip_newlines();
            if !matches!(self.peek(), TokenKind::KwThis | TokenKind::KwSuper) {
                return Err(self.error_here("expected 'this' or 'super' delegation"));
            }
            self.bump();
            self.parse_call_args()?;
        }
        let body = if self.at(&TokenKind::LBrace) {
            Some(FunctionBody::Block(self.parse_block()?))
        } else {
            None
        };
        Ok(Decl::Function(FunctionDecl {
            span: self.span_from(start),
            modifiers,
            name,
            type_params: Vec::new(),
            receiver: None,
            params,
            ret: None,
            body,
        }))
    }

    fn parse_property(
        &mut self,
        start: usize,
        modifiers: Modifiers,
        allow_accessors: bool,
    ) -> PResult<PropertyDecl> {
        let mutable = matches!(self.bump().kind, TokenKind::KwVar);
        self.parse_type_params()?;

        let head = self.parse_type()?;
        let (receiver, name) = if self.eat(&TokenKind::Dot) {
            (Some(head), self.ident("property name")?)
        } else {
            split_receiver(head).ok_or_else(|| self.error_here("expected property name"))?
        };

        let ty = if self.eat(&TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };

        let mut delegated = false;
        let init = if self.eat(&TokenKind::Eq) {
            self.skip_newlines();
            Some(self.parse_expr()?)
        } else if self.at_ident("by") {
            self.bump();
            self.skip_newlines();
            delegated = true;
            Some(self.parse_expr()?)
        } else {
            None
        };

        let getter = if allow_accessors {
            self.parse_accessors()?
        } else {
            None
        };

        Ok(PropertyDecl {
            span: self.span_from(start),
            modifiers,
            mutable,
            receiver,
            name,
            ty,
            init,
            delegated,
            getter,
        })
    }

    /// Parses `get() = ...` / `set(v) { ... }` following a member property.
    fn parse_accessors(&mut self) -> PResult<Option<FunctionBody>> {
        let mut getter = None;
        loop {
            let mut j = self.significant_index();
            while matches!(&self.tok(j).kind, TokenKind::Ident(s) if is_modifier(s)) {
                j += 1;
            }
            let is_get = matches!(&self.tok(j).kind, TokenKind::Ident(s) if s == "get");
            let is_set = matches!(&self.tok(j).kind, TokenKind::Ident(s) if s == "set");
            if !is_get && !is_set {
                return Ok(getter);
            }
            while self.idx <= j {
                self.bump();
            }
            if !self.at(&TokenKind::LParen) {
                // `private set` without a body.
                continue;
            }
            self.skip_group();
            if self.eat(&TokenKind::Colon) {
                self.parse_type()?;
            }
            let body = if self.at(&TokenKind::LBrace) {
                Some(FunctionBody::Block(self.parse_block()?))
            } else if self.eat(&TokenKind::Eq) {
                self.skip_newlines();
                Some(FunctionBody::Expr(self.parse_expr()?))
            } else {
                None
            };
            if is_get {
                getter = body;
            }
        }
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    fn parse_type(&mut self) -> PResult<TypeRef> {
        let start = self.start();
        self.skip_annotations();
        let suspend = self.at_ident("suspend")
            && matches!(self.peek_at(1), TokenKind::Ident(_) | TokenKind::LParen);
        if suspend {
            self.bump();
        }
        let mut ty = self.parse_type_inner()?;
        while self.at(&TokenKind::Question) {
            self.bump();
            ty.nullable = true;
        }
        ty.span = self.span_from(start);

        // Function type with receiver: `T.() -> R`.
        if self.at(&TokenKind::Dot) && matches!(self.peek_at(1), TokenKind::LParen) {
            self.bump();
            let mut f = self.parse_type_inner()?;
            if let TypeRefKind::Function { receiver, .. } = &mut f.kind {
                *receiver = Some(Box::new(ty));
            }
            f.span = self.span_from(start);
            ty = f;
        }
        if suspend {
            if let TypeRefKind::Function { suspend, .. } = &mut ty.kind {
                *suspend = true;
            }
        }
        Ok(ty)
    }

    fn parse_type_inner(&mut self) -> PResult<TypeRef> {
        let start = self.start();
        match self.peek() {
            TokenKind::LParen => self.parse_paren_type(),
            TokenKind::Star => {
                self.bump();
                Ok(TypeRef {
                    span: self.span_from(start),
                    kind: TypeRefKind::Star,
                    nullable: false,
                })
            }
            TokenKind::Ident(_) => {
                let name = self.parse_qualified_name()?;
                let args = if self.at(&TokenKind::Lt) {
                    self.parse_type_args()?
                } else {
                    Vec::new()
                };
                Ok(TypeRef {
                    span: self.span_from(start),
                    kind: TypeRefKind::Named { name, args },
                    nullable: false,
                })
            }
            other => Err(self.error_here(&format!("expected type, found {}", other.describe()))),
        }
    }

    /// `(A, B) -> R` or a parenthesized type `(T)`.
    fn parse_paren_type(&mut self) -> PResult<TypeRef> {
        let start = self.expect(TokenKind::LParen, "'('")?.offset();
        let mut params = Vec::new();
        loop {
            self.skip_newlines();
            if self.eat(&TokenKind::RParen) {
                break;
            }
            if matches!(self.peek(), TokenKind::Ident(_)) && matches!(self.peek_at(1), TokenKind::Colon)
            {
                self.bump();
                self.bump();
            }
            params.push(self.parse_type()?);
            self.skip_newlines();
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            self.expect(TokenKind::RParen, "')'")?;
            break;
        }

        if self.eat(&TokenKind::Arrow) {
            let ret = self.parse_type()?;
            return Ok(TypeRef {
                span: self.span_from(start),
                kind: TypeRefKind::Function {
                    receiver: None,
                    params,
                    ret: Box::new(ret),
                    suspend: false,
                },
                nullable: false,
            });
        }

        match params.len() {
            1 => Ok(params.remove(0)),
            _ => Err(ParseError {
                message: "expected '->' after function type parameters".to_string(),
                span: self.span_from(start),
            }),
        }
    }

    fn parse_type_args(&mut self) -> PResult<Vec<TypeRef>> {
        self.expect(TokenKind::Lt, "'<'")?;
        let mut args = Vec::new();
        loop {
            self.skip_newlines();
            if matches!(self.peek(), TokenKind::Ident(s) if s == "out")
                && matches!(self.peek_at(1), TokenKind::Ident(_) | TokenKind::LParen)
            {
                self.bump();
            } else if self.at(&TokenKind::KwIn) {
                self.bump();
            }
            args.push(self.parse_type()?);
            self.skip_newlines();
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            self.expect(TokenKind::Gt, "'>'")?;
            return Ok(args);
        }
    }

    /// Speculatively parses call-site type arguments (`flow<T> { }`, `listOf<Int>()`).
    fn try_call_type_args(&mut self) -> Option<Vec<TypeRef>> {
        let save = self.idx;
        let saved_errors = self.errors.len();
        if let Ok(args) = self.parse_type_args() {
            let followed = match self.peek() {
                TokenKind::LParen | TokenKind::LBrace | TokenKind::ColonColon => true,
                TokenKind::Dot => true,
                _ => false,
            };
            if followed {
                return Some(args);
            }
        }
        self.idx = save;
        self.errors.truncate(saved_errors);
        None
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_block(&mut self) -> PResult<Block> {
        let start = self.expect(TokenKind::LBrace, "'{'")?.offset();
        let stmts = self.parse_stmts_until_rbrace();
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(Block {
            span: self.span_from(start),
            stmts,
        })
    }

    fn parse_stmts_until_rbrace(&mut self) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        loop {
            self.skip_separators();
            if matches!(self.peek(), TokenKind::RBrace | TokenKind::Eof) {
                break;
            }
            let before = self.idx;
            let result = self
                .parse_stmt_into(&mut stmts)
                .and_then(|_| self.expect_stmt_end());
            if let Err(e) = result {
                self.errors.push(e);
                self.recover();
            }
            if self.idx == before {
                self.bump();
            }
        }
        stmts
    }

    /// A control-structure body: a block, or a single statement wrapped in one.
    fn parse_control_body(&mut self) -> PResult<Block> {
        self.skip_newlines();
        if self.at(&TokenKind::LBrace) {
            return self.parse_block();
        }
        let start = self.start();
        let mut stmts = Vec::new();
        self.parse_stmt_into(&mut stmts)?;
        Ok(Block {
            span: self.span_from(start),
            stmts,
        })
    }

    fn parse_stmt_into(&mut self, out: &mut Vec<Stmt>) -> PResult<()> {
        self.skip_label();

        if matches!(self.peek(), TokenKind::KwVal | TokenKind::KwVar)
            && matches!(self.peek_at(1), TokenKind::LParen)
        {
            return self.parse_destructuring(out);
        }
        if self.at_decl_start(false) {
            if let Some(decl) = self.parse_decl(false)? {
                out.push(Stmt::Decl(decl));
            }
            return Ok(());
        }

        let start = self.start();
        let stmt = match self.peek() {
            TokenKind::KwReturn | TokenKind::KwThrow | TokenKind::KwBreak | TokenKind::KwContinue => {
                self.parse_jump()?
            }
            TokenKind::KwWhile => {
                self.bump();
                let cond = self.parse_paren_cond()?;
                let body = self.parse_control_body()?;
                Stmt::While(WhileStmt {
                    span: self.span_from(start),
                    cond,
                    body,
                })
            }
            TokenKind::KwDo => {
                self.bump();
                let body = self.parse_control_body()?;
                self.skip_newlines();
                self.expect(TokenKind::KwWhile, "'while'")?;
                let cond = self.parse_paren_cond()?;
                Stmt::DoWhile(WhileStmt {
                    span: self.span_from(start),
                    cond,
                    body,
                })
            }
            TokenKind::KwFor => self.parse_for()?,
            _ => {
                let target = self.parse_expr()?;
                let op = match self.peek() {
                    TokenKind::Eq => Some(AssignOp::Assign),
                    TokenKind::PlusEq => Some(AssignOp::AddAssign),
                    TokenKind::MinusEq => Some(AssignOp::SubAssign),
                    TokenKind::StarEq => Some(AssignOp::MulAssign),
                    TokenKind::SlashEq => Some(AssignOp::DivAssign),
                    TokenKind::PercentEq => Some(AssignOp::RemAssign),
                    _ => None,
                };
                match op {
                    Some(op) => {
                        self.bump();
                        self.skip_newlines();
                        let expr = self.parse_expr()?;
                        Stmt::Assign(AssignStmt {
                            span: self.span_from(start),
                            target,
                            op,
                            expr,
                        })
                    }
                    None => Stmt::Expr(target),
                }
            }
        };
        out.push(stmt);
        Ok(())
    }

    /// Skips a statement label (`outer@ for (...)`).
    fn skip_label(&mut self) {
        if matches!(self.peek(), TokenKind::Ident(_))
            && matches!(self.peek_at(1), TokenKind::At)
            && span_end(self.peek_span()) == self.tok(self.idx + 1).span.offset()
        {
            self.bump();
            self.bump();
            self.skip_newlines();
        }
    }

    fn parse_label_ref(&mut self) -> Option<Ident> {
        if self.at(&TokenKind::At) && self.peek_span().offset() == self.prev_end() {
            self.bump();
            return self.ident("label").ok();
        }
        None
    }

    fn parse_jump(&mut self) -> PResult<Stmt> {
        let start = self.start();
        let tok = self.bump();
        let stmt = match tok.kind {
            TokenKind::KwReturn => {
                let label = self.parse_label_ref();
                let value = if self.at_expr_end() {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                Stmt::Return(ReturnStmt {
                    span: self.span_from(start),
                    label,
                    value,
                })
            }
            TokenKind::KwThrow => {
                self.skip_newlines();
                Stmt::Throw(self.parse_expr()?)
            }
            TokenKind::KwBreak => {
                self.parse_label_ref();
                Stmt::Break(self.span_from(start))
            }
            _ => {
                self.parse_label_ref();
                Stmt::Continue(self.span_from(start))
            }
        };
        Ok(stmt)
    }

    fn at_expr_end(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::Newline
                | TokenKind::Semi
                | TokenKind::RBrace
                | TokenKind::RParen
                | TokenKind::Comma
                | TokenKind::Eof
        )
    }

    fn parse_paren_cond(&mut self) -> PResult<Expr> {
        self.expect(TokenKind::LParen, "'('")?;
        self.skip_newlines();
        let cond = self.parse_expr()?;
        self.skip_newlines();
        self.expect(TokenKind::RParen, "')'")?;
        Ok(cond)
    }

    fn parse_for(&mut self) -> PResult<Stmt> {
        let start = self.expect(TokenKind::KwFor, "'for'")?.offset();
        self.expect(TokenKind::LParen, "'('")?;
        let mut binders = Vec::new();
        if self.at(&TokenKind::LParen) {
            self.bump();
            loop {
                self.skip_newlines();
                binders.push(self.parse_param(false)?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen, "')'")?;
        } else {
            binders.push(self.parse_param(false)?);
        }
        self.expect(TokenKind::KwIn, "'in'")?;
        self.skip_newlines();
        let iterable = self.parse_expr()?;
        self.skip_newlines();
        self.expect(TokenKind::RParen, "')'")?;
        let body = self.parse_control_body()?;
        Ok(Stmt::For(ForStmt {
            span: self.span_from(start),
            binders,
            iterable,
            body,
        }))
    }

    /// `val (a, b) = expr` becomes the initializer expression plus one
    /// uninitialized local per binder.
    fn parse_destructuring(&mut self, out: &mut Vec<Stmt>) -> PResult<()> {
        let start = self.start();
        let mutable = matches!(self.bump().kind, TokenKind::KwVar);
        self.expect(TokenKind::LParen, "'('")?;
        let mut binders = Vec::new();
        loop {
            self.skip_newlines();
            binders.push(self.parse_param(false)?);
            self.skip_newlines();
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        self.expect(TokenKind::Eq, "'='")?;
        self.skip_newlines();
        let init = self.parse_expr()?;
        let span = self.span_from(start);
        out.push(Stmt::Expr(init));
        for b in binders {
            out.push(Stmt::Decl(Decl::Property(PropertyDecl {
                span,
                modifiers: Modifiers::default(),
                mutable,
                receiver: None,
                name: b.name,
                ty: b.ty,
                init: None,
                delegated: false,
                getter: None,
            })));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    pub(crate) fn parse_expr(&mut self) -> PResult<Expr> {
        self.nested(|p| p.parse_disjunction())
    }

    fn binary(&mut self, left: Expr, op: BinOp, right: Expr) -> Expr {
        let span = span_between(left.span.offset(), span_end(right.span));
        self.mk(
            span,
            ExprKind::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
        )
    }

    /// Consumes newlines when the next significant token is `kind`
    /// (operators that may start a continuation line).
    fn continue_line_with(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            return true;
        }
        if self.at(&TokenKind::Newline) && self.peek_significant() == kind {
            self.skip_newlines();
            return true;
        }
        false
    }

    fn parse_disjunction(&mut self) -> PResult<Expr> {
        let mut left = self.parse_conjunction()?;
        while self.continue_line_with(&TokenKind::OrOr) {
            self.bump();
            self.skip_newlines();
            let right = self.parse_conjunction()?;
            left = self.binary(left, BinOp::Or, right);
        }
        Ok(left)
    }

    fn parse_conjunction(&mut self) -> PResult<Expr> {
        let mut left = self.parse_equality()?;
        while self.continue_line_with(&TokenKind::AndAnd) {
            self.bump();
            self.skip_newlines();
            let right = self.parse_equality()?;
            left = self.binary(left, BinOp::And, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> PResult<Expr> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.peek() {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::Neq => BinOp::Ne,
                TokenKind::EqEqEq => BinOp::RefEq,
                TokenKind::NeqEq => BinOp::RefNe,
                _ => return Ok(left),
            };
            self.bump();
            self.skip_newlines();
            let right = self.parse_comparison()?;
            left = self.binary(left, op, right);
        }
    }

    fn parse_comparison(&mut self) -> PResult<Expr> {
        let mut left = self.parse_named_check()?;
        loop {
            let op = match self.peek() {
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Le => BinOp::Le,
                TokenKind::Ge => BinOp::Ge,
                _ => return Ok(left),
            };
            self.bump();
            self.skip_newlines();
            let right = self.parse_named_check()?;
            left = self.binary(left, op, right);
        }
    }

    fn parse_named_check(&mut self) -> PResult<Expr> {
        let mut left = self.parse_elvis()?;
        loop {
            let negated = self.at(&TokenKind::Bang)
                && matches!(self.peek_at(1), TokenKind::KwIs | TokenKind::KwIn);
            if negated {
                self.bump();
            }
            match self.peek() {
                TokenKind::KwIs => {
                    self.bump();
                    let ty = self.parse_type()?;
                    let span = span_between(left.span.offset(), self.prev_end());
                    left = self.mk(
                        span,
                        ExprKind::TypeTest {
                            expr: Box::new(left),
                            ty,
                            negated,
                        },
                    );
                }
                TokenKind::KwIn => {
                    self.bump();
                    self.skip_newlines();
                    let right = self.parse_elvis()?;
                    let op = if negated { BinOp::NotIn } else { BinOp::In };
                    left = self.binary(left, op, right);
                }
                _ => return Ok(left),
            }
        }
    }

    fn parse_elvis(&mut self) -> PResult<Expr> {
        let mut left = self.parse_infix_call()?;
        while self.continue_line_with(&TokenKind::Elvis) {
            self.bump();
            self.skip_newlines();
            let right = self.parse_infix_call()?;
            left = self.binary(left, BinOp::Elvis, right);
        }
        Ok(left)
    }

    fn parse_infix_call(&mut self) -> PResult<Expr> {
        let mut left = self.parse_range()?;
        loop {
            let TokenKind::Ident(name) = self.peek() else {
                return Ok(left);
            };
            if NOT_INFIX.contains(&name.as_str()) || !self.starts_operand(1) {
                return Ok(left);
            }
            self.bump();
            self.skip_newlines();
            let right = self.parse_range()?;
            left = self.binary(left, BinOp::Infix, right);
        }
    }

    /// Whether the token `n` ahead can start an operand on the same line.
    fn starts_operand(&self, n: usize) -> bool {
        matches!(
            self.peek_at(n),
            TokenKind::Ident(_)
                | TokenKind::Int(_)
                | TokenKind::Float(_)
                | TokenKind::Char(_)
                | TokenKind::String(_)
                | TokenKind::KwThis
                | TokenKind::KwNull
                | TokenKind::KwTrue
                | TokenKind::KwFalse
                | TokenKind::LParen
                | TokenKind::Minus
                | TokenKind::Bang
        )
    }

    fn parse_range(&mut self) -> PResult<Expr> {
        let mut left = self.parse_additive()?;
        while matches!(self.peek(), TokenKind::DotDot | TokenKind::DotDotLt) {
            self.bump();
            self.skip_newlines();
            let right = self.parse_additive()?;
            left = self.binary(left, BinOp::Range, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> PResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => return Ok(left),
            };
            self.bump();
            self.skip_newlines();
            let right = self.parse_multiplicative()?;
            left = self.binary(left, op, right);
        }
    }

    fn parse_multiplicative(&mut self) -> PResult<Expr> {
        let mut left = self.parse_as()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Rem,
                _ => return Ok(left),
            };
            self.bump();
            self.skip_newlines();
            let right = self.parse_as()?;
            left = self.binary(left, op, right);
        }
    }

    fn parse_as(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_prefix()?;
        loop {
            let safe = match self.peek() {
                TokenKind::KwAs => false,
                TokenKind::KwAsSafe => true,
                _ => return Ok(expr),
            };
            self.bump();
            let ty = self.parse_type()?;
            let span = span_between(expr.span.offset(), self.prev_end());
            expr = self.mk(
                span,
                ExprKind::Cast {
                    expr: Box::new(expr),
                    ty,
                    safe,
                },
            );
        }
    }

    fn parse_prefix(&mut self) -> PResult<Expr> {
        let start = self.start();
        let op = match self.peek() {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::PlusPlus => Some(UnaryOp::PreInc),
            TokenKind::MinusMinus => Some(UnaryOp::PreDec),
            _ => None,
        };
        let Some(op) = op else {
            self.skip_annotations();
            self.skip_label();
            return self.parse_postfix();
        };
        self.bump();
        let expr = self.nested(|p| p.parse_prefix())?;
        Ok(self.mk(
            self.span_from(start),
            ExprKind::Unary {
                op,
                expr: Box::new(expr),
            },
        ))
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let start = self.start();
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                TokenKind::Dot | TokenKind::SafeDot => {
                    let safe = matches!(self.bump().kind, TokenKind::SafeDot);
                    self.skip_newlines();
                    let member = self.parse_member_name()?;
                    expr = self.mk(
                        self.span_from(start),
                        ExprKind::Member {
                            base: Box::new(expr),
                            member,
                            safe,
                        },
                    );
                }
                TokenKind::Newline
                    if matches!(
                        self.peek_significant(),
                        TokenKind::Dot | TokenKind::SafeDot
                    ) =>
                {
                    self.skip_newlines();
                }
                TokenKind::LParen => {
                    let args = self.parse_call_args()?;
                    let trailing = self.parse_trailing_lambda()?;
                    expr = self.mk(
                        self.span_from(start),
                        ExprKind::Call {
                            callee: Box::new(expr),
                            type_args: Vec::new(),
                            args,
                            trailing,
                        },
                    );
                }
                TokenKind::Lt if is_callee(&expr) => {
                    let Some(type_args) = self.try_call_type_args() else {
                        return Ok(expr);
                    };
                    let had_parens = self.at(&TokenKind::LParen);
                    let args = if had_parens {
                        self.parse_call_args()?
                    } else {
                        Vec::new()
                    };
                    let trailing = self.parse_trailing_lambda()?;
                    if !had_parens && trailing.is_none() {
                        // `Foo<T>::class` and friends: keep the plain reference.
                        continue;
                    }
                    expr = self.mk(
                        self.span_from(start),
                        ExprKind::Call {
                            callee: Box::new(expr),
                            type_args,
                            args,
                            trailing,
                        },
                    );
                }
                TokenKind::LBrace if is_callee(&expr) && !self.no_trailing_lambda => {
                    let trailing = self.parse_trailing_lambda()?;
                    expr = self.mk(
                        self.span_from(start),
                        ExprKind::Call {
                            callee: Box::new(expr),
                            type_args: Vec::new(),
                            args: Vec::new(),
                            trailing,
                        },
                    );
                }
                TokenKind::LBracket => {
                    let open = self.bump().span;
                    let mut args = Vec::new();
                    loop {
                        self.skip_newlines();
                        args.push(CallArg::Positional(self.parse_expr()?));
                        self.skip_newlines();
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                    self.expect(TokenKind::RBracket, "']'")?;
                    let get = Spanned::new(open, "get".to_string());
                    let callee_span = expr.span;
                    let callee = self.mk(
                        callee_span,
                        ExprKind::Member {
                            base: Box::new(expr),
                            member: get,
                            safe: false,
                        },
                    );
                    expr = self.mk(
                        self.span_from(start),
                        ExprKind::Call {
                            callee: Box::new(callee),
                            type_args: Vec::new(),
                            args,
                            trailing: None,
                        },
                    );
                }
                TokenKind::BangBang => {
                    self.bump();
                    expr = self.mk(
                        self.span_from(start),
                        ExprKind::Unary {
                            op: UnaryOp::NotNull,
                            expr: Box::new(expr),
                        },
                    );
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    let op = if matches!(self.bump().kind, TokenKind::PlusPlus) {
                        UnaryOp::PostInc
                    } else {
                        UnaryOp::PostDec
                    };
                    expr = self.mk(
                        self.span_from(start),
                        ExprKind::Unary {
                            op,
                            expr: Box::new(expr),
                        },
                    );
                }
                TokenKind::ColonColon => {
                    self.bump();
                    let member = self.parse_member_name()?;
                    expr = self.mk(
                        self.span_from(start),
                        ExprKind::CallableRef {
                            receiver: Some(Box::new(expr)),
                            member,
                        },
                    );
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Member names may be soft or hard keywords after `.`/`::` (`Foo::class`).
    fn parse_member_name(&mut self) -> PResult<Ident> {
        let span = self.peek_span();
        let name = match self.peek() {
            TokenKind::Ident(s) => s.clone(),
            TokenKind::KwClass => "class".to_string(),
            TokenKind::KwObject => "object".to_string(),
            other => {
                return Err(self.error_here(&format!(
                    "expected member name, found {}",
                    other.describe()
                )))
            }
        };
        self.bump();
        Ok(Spanned::new(span, name))
    }

    fn parse_trailing_lambda(&mut self) -> PResult<Option<Box<Lambda>>> {
        // Annotated or labeled trailing lambdas are not recognized.
        if self.at(&TokenKind::LBrace) && !self.no_trailing_lambda {
            return Ok(Some(Box::new(self.parse_lambda()?)));
        }
        Ok(None)
    }

    pub(crate) fn parse_call_args(&mut self) -> PResult<Vec<CallArg>> {
        let saved = std::mem::replace(&mut self.no_trailing_lambda, false);
        let args = self.parse_call_args_inner();
        self.no_trailing_lambda = saved;
        args
    }

    fn parse_call_args_inner(&mut self) -> PResult<Vec<CallArg>> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        loop {
            self.skip_newlines();
            if self.eat(&TokenKind::RParen) {
                return Ok(args);
            }
            let arg = if matches!(self.peek(), TokenKind::Ident(_))
                && matches!(self.peek_at(1), TokenKind::Eq)
            {
                let name = self.ident("argument name")?;
                self.bump();
                self.skip_newlines();
                CallArg::Named {
                    name,
                    value: self.parse_expr()?,
                }
            } else if self.eat(&TokenKind::Star) {
                CallArg::Spread(self.parse_expr()?)
            } else {
                CallArg::Positional(self.parse_expr()?)
            };
            args.push(arg);
            self.skip_newlines();
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            self.expect(TokenKind::RParen, "')'")?;
            return Ok(args);
        }
    }

    fn parse_lambda(&mut self) -> PResult<Lambda> {
        let start = self.expect(TokenKind::LBrace, "'{'")?.offset();
        let params = self.try_lambda_params().unwrap_or_default();
        let stmts = self.parse_stmts_until_rbrace();
        self.expect(TokenKind::RBrace, "'}'")?;
        let span = self.span_from(start);
        Ok(Lambda {
            span,
            params,
            body: Block { span, stmts },
        })
    }

    /// `a, b: Int, (c, d), _ ->`; restores the cursor when there is no arrow.
    fn try_lambda_params(&mut self) -> Option<Vec<Param>> {
        let save = self.idx;
        let saved_errors = self.errors.len();
        self.skip_newlines();
        let mut params = Vec::new();
        let ok = loop {
            let start = self.start();
            if self.at(&TokenKind::LParen) {
                let end = self.skip_group_from(self.idx);
                while self.idx < end {
                    self.bump();
                }
                let span = self.span_from(start);
                params.push(Param {
                    span,
                    name: Spanned::new(span, "_".to_string()),
                    ty: None,
                    default: None,
                    binding: None,
                });
            } else if let TokenKind::Ident(name) = self.peek() {
                let name_span = self.bump().span;
                let ty = if self.eat(&TokenKind::Colon) {
                    match self.parse_type() {
                        Ok(t) => Some(t),
                        Err(_) => break false,
                    }
                } else {
                    None
                };
                params.push(Param {
                    span: self.span_from(start),
                    name: Spanned::new(name_span, name.clone()),
                    ty,
                    default: None,
                    binding: None,
                });
            } else {
                break false;
            }
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            break self.eat(&TokenKind::Arrow);
        };
        if ok {
            Some(params)
        } else {
            self.idx = save;
            self.errors.truncate(saved_errors);
            None
        }
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let start = self.start();
        let tok = self.peek();
        let kind = match tok {
            TokenKind::Ident(name) => {
                let span = self.bump().span;
                ExprKind::Name(Spanned::new(span, name.clone()))
            }
            TokenKind::Int(s) => {
                self.bump();
                ExprKind::IntLit(s.clone())
            }
            TokenKind::Float(s) => {
                self.bump();
                ExprKind::FloatLit(s.clone())
            }
            TokenKind::Char(s) => {
                self.bump();
                ExprKind::CharLit(s.clone())
            }
            TokenKind::String(s) => {
                self.bump();
                ExprKind::StringLit(s.clone())
            }
            TokenKind::KwNull => {
                self.bump();
                ExprKind::Null
            }
            TokenKind::KwTrue | TokenKind::KwFalse => {
                let value = matches!(self.bump().kind, TokenKind::KwTrue);
                ExprKind::BoolLit(value)
            }
            TokenKind::KwThis => {
                self.bump();
                ExprKind::This(self.parse_label_ref())
            }
            TokenKind::KwSuper => {
                self.bump();
                if self.at(&TokenKind::Lt) {
                    self.parse_type_args()?;
                }
                self.parse_label_ref();
                ExprKind::Super
            }
            TokenKind::LParen => {
                self.bump();
                self.skip_newlines();
                let inner = self.parse_expr()?;
                self.skip_newlines();
                self.expect(TokenKind::RParen, "')'")?;
                ExprKind::Paren(Box::new(inner))
            }
            TokenKind::LBrace => ExprKind::Lambda(Box::new(self.parse_lambda()?)),
            TokenKind::KwIf => return self.parse_if(),
            TokenKind::KwWhen => return self.parse_when(),
            TokenKind::KwTry => return self.parse_try(),
            TokenKind::KwObject => {
                self.bump();
                let supertypes = if self.eat(&TokenKind::Colon) {
                    self.parse_supertypes()?
                } else {
                    Vec::new()
                };
                let members = if self.at(&TokenKind::LBrace) {
                    self.parse_class_body(false)?
                } else {
                    Vec::new()
                };
                ExprKind::Object {
                    supertypes,
                    members,
                }
            }
            TokenKind::ColonColon => {
                self.bump();
                let member = self.parse_member_name()?;
                ExprKind::CallableRef {
                    receiver: None,
                    member,
                }
            }
            TokenKind::KwReturn | TokenKind::KwThrow | TokenKind::KwBreak | TokenKind::KwContinue => {
                ExprKind::Jump(Box::new(self.parse_jump()?))
            }
            other => {
                return Err(self.error_here(&format!(
                    "expected expression, found {}",
                    other.describe()
                )))
            }
        };
        Ok(self.mk(self.span_from(start), kind))
    }

    fn parse_if(&mut self) -> PResult<Expr> {
        let start = self.expect(TokenKind::KwIf, "'if'")?.offset();
        let cond = self.parse_paren_cond()?;
        let then_block = self.parse_control_body()?;
        let j = self.significant_index();
        let else_follows = matches!(self.tok(j).kind, TokenKind::KwElse)
            && !matches!(self.tok(j + 1).kind, TokenKind::Arrow);
        let else_block = if else_follows {
            self.skip_newlines();
            self.bump();
            Some(self.parse_control_body()?)
        } else if self.at(&TokenKind::Semi) && matches!(self.peek_at(1), TokenKind::KwElse) {
            self.bump();
            self.bump();
            Some(self.parse_control_body()?)
        } else {
            None
        };
        Ok(self.mk(
            self.span_from(start),
            ExprKind::If {
                cond: Box::new(cond),
                then_block,
                else_block,
            },
        ))
    }

    fn parse_when(&mut self) -> PResult<Expr> {
        let start = self.expect(TokenKind::KwWhen, "'when'")?.offset();
        let subject = if self.at(&TokenKind::LParen) {
            self.bump();
            self.skip_newlines();
            if matches!(self.peek(), TokenKind::KwVal | TokenKind::KwVar) {
                self.bump();
                self.ident("subject name")?;
                if self.eat(&TokenKind::Colon) {
                    self.parse_type()?;
                }
                self.expect(TokenKind::Eq, "'='")?;
                self.skip_newlines();
            }
            let subject = self.parse_expr()?;
            self.skip_newlines();
            self.expect(TokenKind::RParen, "')'")?;
            Some(Box::new(subject))
        } else {
            None
        };

        self.skip_newlines();
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut arms = Vec::new();
        loop {
            self.skip_separators();
            if matches!(self.peek(), TokenKind::RBrace | TokenKind::Eof) {
                break;
            }
            let before = self.idx;
            match self.parse_when_arm() {
                Ok(arm) => arms.push(arm),
                Err(e) => {
                    self.errors.push(e);
                    self.recover();
                }
            }
            if self.idx == before {
                self.bump();
            }
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(self.mk(self.span_from(start), ExprKind::When { subject, arms }))
    }

    fn parse_when_arm(&mut self) -> PResult<WhenArm> {
        let start = self.start();
        let mut conditions = Vec::new();
        if !self.eat(&TokenKind::KwElse) {
            loop {
                self.skip_newlines();
                conditions.push(self.parse_when_condition()?);
                self.skip_newlines();
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.skip_newlines();
        self.expect(TokenKind::Arrow, "'->'")?;
        let body = self.parse_control_body()?;
        self.expect_stmt_end()?;
        Ok(WhenArm {
            span: self.span_from(start),
            conditions,
            body,
        })
    }

    fn parse_when_condition(&mut self) -> PResult<Expr> {
        let start = self.start();
        let negated = self.at(&TokenKind::Bang)
            && matches!(self.peek_at(1), TokenKind::KwIs | TokenKind::KwIn);
        if negated {
            self.bump();
        }
        match self.peek() {
            TokenKind::KwIs => {
                let is_span = self.bump().span;
                let ty = self.parse_type()?;
                let subject = self.mk(
                    is_span,
                    ExprKind::Name(Spanned::new(is_span, "it".to_string())),
                );
                Ok(self.mk(
                    self.span_from(start),
                    ExprKind::TypeTest {
                        expr: Box::new(subject),
                        ty,
                        negated,
                    },
                ))
            }
            TokenKind::KwIn => {
                self.bump();
                self.parse_expr()
            }
            _ => self.parse_expr(),
        }
    }

    fn parse_try(&mut self) -> PResult<Expr> {
        let start = self.expect(TokenKind::KwTry, "'try'")?.offset();
        let body = self.parse_block()?;
        let mut catches = Vec::new();
        while self.continue_line_with(&TokenKind::KwCatch) {
            let catch_start = self.bump().span.offset();
            self.expect(TokenKind::LParen, "'('")?;
            let param = self.parse_param(false)?;
            self.expect(TokenKind::RParen, "')'")?;
            let block = self.parse_block()?;
            catches.push(CatchClause {
                span: self.span_from(catch_start),
                param,
                body: block,
            });
        }
        let finally = if self.continue_line_with(&TokenKind::KwFinally) {
            self.bump();
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(self.mk(
            self.span_from(start),
            ExprKind::Try {
                body,
                catches,
                finally,
            },
        ))
    }
}

/// Expressions that may be followed by type arguments or a bare trailing lambda.
fn is_callee(expr: &Expr) -> bool {
    matches!(expr.kind, ExprKind::Name(_) | ExprKind::Member { .. })
}

/// Splits `a.b.Recv.name` (parsed as one dotted type) into receiver type and name.
fn split_receiver(head: TypeRef) -> Option<(Option<TypeRef>, Ident)> {
    let TypeRef {
        span,
        kind,
        nullable,
    } = head;
    let TypeRefKind::Named { mut name, args } = kind else {
        return None;
    };
    if !args.is_empty() || nullable {
        return None;
    }
    let last = name.segments.pop()?;
    if name.segments.is_empty() {
        return Some((None, last));
    }
    let recv_end = name
        .segments
        .last()
        .map(|s| span_end(s.span))
        .unwrap_or_else(|| span.offset());
    name.span = span_between(span.offset(), recv_end);
    let receiver = TypeRef {
        span: name.span,
        kind: TypeRefKind::Named {
            name,
            args: Vec::new(),
        },
        nullable: false,
    };
    Some((Some(receiver), last))
}
