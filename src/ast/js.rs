//! The script AST.
//!
//! Covers the ES subset the scanners classify: declarations, assignments,
//! classes, functions, arrows, calls, member chains, and literals. Anything
//! more exotic parses to an opaque node rather than failing, as long as it
//! is syntactically balanced.

use crate::ast::Span;
use crate::jsdoc::Annotation;

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Var(VarDecl),
    Function(FunctionDecl),
    Class(ClassDecl),
    Expr(ExprStmt),
    Return(ReturnStmt),
    Throw(ThrowStmt),
    If(IfStmt),
    Block(BlockStmt),
    For(LoopStmt),
    While(LoopStmt),
    Try(TryStmt),
    /// A statement whose interior the parser deliberately does not model.
    Opaque(Span),
    Empty(Span),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Var(s) => s.span,
            Stmt::Function(s) => s.span,
            Stmt::Class(s) => s.span,
            Stmt::Expr(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::Throw(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::Block(s) => s.span,
            Stmt::For(s) | Stmt::While(s) => s.span,
            Stmt::Try(s) => s.span,
            Stmt::Opaque(span) | Stmt::Empty(span) => *span,
        }
    }

    /// The JSDoc annotation attached to this statement, if any.
    pub fn doc(&self) -> Option<&Annotation> {
        match self {
            Stmt::Var(s) => s.doc.as_ref(),
            Stmt::Function(s) => s.doc.as_ref(),
            Stmt::Class(s) => s.doc.as_ref(),
            Stmt::Expr(s) => s.doc.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub kind: VarKind,
    pub declarators: Vec<Declarator>,
    pub doc: Option<Annotation>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Declarator {
    pub name: String,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub doc: Option<Annotation>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: Option<String>,
    pub superclass: Option<Box<Expr>>,
    pub members: Vec<ClassMember>,
    pub doc: Option<Annotation>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Method,
    Getter,
    Setter,
    Constructor,
    Field,
}

#[derive(Debug, Clone)]
pub struct ClassMember {
    pub kind: MemberKind,
    pub is_static: bool,
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    /// Initializer of a field member; `None` for everything else.
    pub value: Option<Expr>,
    pub doc: Option<Annotation>,
    pub span: Span,
}

impl ClassDecl {
    pub fn member(&self, name: &str) -> Option<&ClassMember> {
        self.members.iter().find(|member| member.name == name)
    }

    /// The object literal returned by a static getter, e.g.
    /// `static get properties() { return {...}; }`.
    pub fn static_getter_object(&self, name: &str) -> Option<&ObjectLit> {
        let member = self
            .members
            .iter()
            .find(|m| m.is_static && m.kind == MemberKind::Getter && m.name == name)?;
        getter_returned(&member.body).and_then(|expr| match expr {
            Expr::Object(object) => Some(object),
            _ => None,
        })
    }

    /// The expression returned by a static getter.
    pub fn static_getter_value(&self, name: &str) -> Option<&Expr> {
        let member = self
            .members
            .iter()
            .find(|m| m.is_static && m.kind == MemberKind::Getter && m.name == name)?;
        getter_returned(&member.body)
    }
}

fn getter_returned(body: &[Stmt]) -> Option<&Expr> {
    body.iter().find_map(|stmt| match stmt {
        Stmt::Return(ret) => ret.value.as_ref(),
        _ => None,
    })
}

#[derive(Debug, Clone)]
pub struct ExprStmt {
    pub expr: Expr,
    pub doc: Option<Annotation>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ThrowStmt {
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_branch: Box<Stmt>,
    pub else_branch: Option<Box<Stmt>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct BlockStmt {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

/// `for`/`while`/`do` loops; the header is consumed but not modeled.
#[derive(Debug, Clone)]
pub struct LoopStmt {
    pub body: Box<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TryStmt {
    pub block: BlockStmt,
    pub handler: Option<BlockStmt>,
    pub finalizer: Option<BlockStmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Ident(Ident),
    Member(MemberExpr),
    Call(CallExpr),
    New(CallExpr),
    Assign(AssignExpr),
    Class(Box<ClassDecl>),
    Function(Box<FunctionDecl>),
    Arrow(Box<ArrowFunction>),
    Object(ObjectLit),
    Array(ArrayLit),
    String(StringLit),
    Number(NumberLit),
    Bool(BoolLit),
    Null(Span),
    This(Span),
    /// Template and regex literals, kept opaque.
    Template(Span),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Conditional(ConditionalExpr),
}

#[derive(Debug, Clone)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct MemberExpr {
    pub object: Box<Expr>,
    pub property: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    pub callee: Box<Expr>,
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct AssignExpr {
    pub op: &'static str,
    pub target: Box<Expr>,
    pub value: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ArrowFunction {
    pub params: Vec<Param>,
    pub body: ArrowBody,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ArrowBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone)]
pub struct ObjectLit {
    pub properties: Vec<ObjectProperty>,
    pub span: Span,
}

impl ObjectLit {
    pub fn property(&self, key: &str) -> Option<&ObjectProperty> {
        self.properties.iter().find(|property| property.key == key)
    }

    pub fn property_value(&self, key: &str) -> Option<&Expr> {
        self.property(key).map(|property| &property.value)
    }
}

#[derive(Debug, Clone)]
pub struct ObjectProperty {
    pub key: String,
    pub key_span: Span,
    pub value: Expr,
    pub is_method: bool,
    pub doc: Option<Annotation>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ArrayLit {
    pub items: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct StringLit {
    pub value: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct NumberLit {
    pub raw: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct BoolLit {
    pub value: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct UnaryExpr {
    pub op: &'static str,
    pub operand: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub op: &'static str,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ConditionalExpr {
    pub test: Box<Expr>,
    pub consequent: Box<Expr>,
    pub alternate: Box<Expr>,
    pub span: Span,
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Ident(e) => e.span,
            Expr::Member(e) => e.span,
            Expr::Call(e) | Expr::New(e) => e.span,
            Expr::Assign(e) => e.span,
            Expr::Class(e) => e.span,
            Expr::Function(e) => e.span,
            Expr::Arrow(e) => e.span,
            Expr::Object(e) => e.span,
            Expr::Array(e) => e.span,
            Expr::String(e) => e.span,
            Expr::Number(e) => e.span,
            Expr::Bool(e) => e.span,
            Expr::Null(span) | Expr::This(span) | Expr::Template(span) => *span,
            Expr::Unary(e) => e.span,
            Expr::Binary(e) => e.span,
            Expr::Conditional(e) => e.span,
        }
    }

    /// Renders `a`, `a.b`, `a.b.c`... for identifier/member chains.
    pub fn dotted_name(&self) -> Option<String> {
        match self {
            Expr::Ident(ident) => Some(ident.name.clone()),
            Expr::Member(member) => {
                let object = member.object.dotted_name()?;
                Some(format!("{object}.{}", member.property))
            }
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Expr::String(string) => Some(&string.value),
            _ => None,
        }
    }

    /// A compact textual rendering of literal expressions, used for
    /// property default values. Non-literal expressions render to a
    /// placeholder rather than `None` so callers can always show something.
    pub fn literal_text(&self) -> Option<String> {
        match self {
            Expr::String(string) => Some(format!("\"{}\"", string.value)),
            Expr::Number(number) => Some(number.raw.clone()),
            Expr::Bool(boolean) => Some(boolean.value.to_string()),
            Expr::Null(_) => Some("null".to_string()),
            Expr::Ident(ident) => Some(ident.name.clone()),
            Expr::Member(_) => self.dotted_name(),
            Expr::Array(array) => {
                let items: Vec<String> = array
                    .items
                    .iter()
                    .map(|item| item.literal_text().unwrap_or_else(|| "...".to_string()))
                    .collect();
                Some(format!("[{}]", items.join(", ")))
            }
            Expr::Object(object) if object.properties.is_empty() => Some("{}".to_string()),
            Expr::Unary(unary) => {
                let operand = unary.operand.literal_text()?;
                Some(format!("{}{}", unary.op, operand))
            }
            _ => None,
        }
    }
}

/// AST traversal in source order.
///
/// Every method defaults to walking into children; scanners override the
/// node kinds they classify and decide whether to keep descending.
pub trait Visitor<'a> {
    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &'a Expr) {
        walk_expr(self, expr);
    }

    fn visit_class(&mut self, class: &'a ClassDecl) {
        walk_class(self, class);
    }

    fn visit_object_property(&mut self, property: &'a ObjectProperty) {
        walk_object_property(self, property);
    }
}

pub fn walk_program<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, program: &'a Program) {
    for stmt in &program.statements {
        visitor.visit_stmt(stmt);
    }
}

pub fn walk_stmt<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, stmt: &'a Stmt) {
    match stmt {
        Stmt::Var(var) => {
            for declarator in &var.declarators {
                if let Some(init) = &declarator.init {
                    visitor.visit_expr(init);
                }
            }
        }
        Stmt::Function(function) => {
            for stmt in &function.body {
                visitor.visit_stmt(stmt);
            }
        }
        Stmt::Class(class) => visitor.visit_class(class),
        Stmt::Expr(expr) => visitor.visit_expr(&expr.expr),
        Stmt::Return(ret) => {
            if let Some(value) = &ret.value {
                visitor.visit_expr(value);
            }
        }
        Stmt::Throw(throw) => visitor.visit_expr(&throw.value),
        Stmt::If(branch) => {
            visitor.visit_expr(&branch.condition);
            visitor.visit_stmt(&branch.then_branch);
            if let Some(alternate) = &branch.else_branch {
                visitor.visit_stmt(alternate);
            }
        }
        Stmt::Block(block) => {
            for stmt in &block.statements {
                visitor.visit_stmt(stmt);
            }
        }
        Stmt::For(looped) | Stmt::While(looped) => visitor.visit_stmt(&looped.body),
        Stmt::Try(tried) => {
            for block in [Some(&tried.block), tried.handler.as_ref(), tried.finalizer.as_ref()]
                .into_iter()
                .flatten()
            {
                for stmt in &block.statements {
                    visitor.visit_stmt(stmt);
                }
            }
        }
        Stmt::Opaque(_) | Stmt::Empty(_) => {}
    }
}

pub fn walk_expr<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, expr: &'a Expr) {
    match expr {
        Expr::Member(member) => visitor.visit_expr(&member.object),
        Expr::Call(call) | Expr::New(call) => {
            visitor.visit_expr(&call.callee);
            for arg in &call.args {
                visitor.visit_expr(arg);
            }
        }
        Expr::Assign(assign) => {
            visitor.visit_expr(&assign.target);
            visitor.visit_expr(&assign.value);
        }
        Expr::Class(class) => visitor.visit_class(class),
        Expr::Function(function) => {
            for stmt in &function.body {
                visitor.visit_stmt(stmt);
            }
        }
        Expr::Arrow(arrow) => match &arrow.body {
            ArrowBody::Expr(body) => visitor.visit_expr(body),
            ArrowBody::Block(body) => {
                for stmt in body {
                    visitor.visit_stmt(stmt);
                }
            }
        },
        Expr::Object(object) => {
            for property in &object.properties {
                visitor.visit_object_property(property);
            }
        }
        Expr::Array(array) => {
            for item in &array.items {
                visitor.visit_expr(item);
            }
        }
        Expr::Unary(unary) => visitor.visit_expr(&unary.operand),
        Expr::Binary(binary) => {
            visitor.visit_expr(&binary.left);
            visitor.visit_expr(&binary.right);
        }
        Expr::Conditional(conditional) => {
            visitor.visit_expr(&conditional.test);
            visitor.visit_expr(&conditional.consequent);
            visitor.visit_expr(&conditional.alternate);
        }
        Expr::Ident(_)
        | Expr::String(_)
        | Expr::Number(_)
        | Expr::Bool(_)
        | Expr::Null(_)
        | Expr::This(_)
        | Expr::Template(_) => {}
    }
}

pub fn walk_class<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, class: &'a ClassDecl) {
    if let Some(superclass) = &class.superclass {
        visitor.visit_expr(superclass);
    }
    for member in &class.members {
        for stmt in &member.body {
            visitor.visit_stmt(stmt);
        }
        if let Some(value) = &member.value {
            visitor.visit_expr(value);
        }
    }
}

pub fn walk_object_property<'a, V: Visitor<'a> + ?Sized>(
    visitor: &mut V,
    property: &'a ObjectProperty,
) {
    visitor.visit_expr(&property.value);
}
