//! Resolved syntax tree
//!
//! The tree mirrors the source program after type checking. Expressions carry
//! a [`NodeId`] so their resolved type can be looked up in the package's
//! [`TypeInfo`](crate::TypeInfo); identifiers carry the kind of object they
//! resolved to.

use crate::scope::{BindingId, ScopeId};
use crate::types::{Receiver, TypeId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node {}", self.0)
    }
}

/// What an identifier resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentKind {
    Var,
    Const,
    Func,
    TypeName,
    Package,
    Builtin,
    Nil,
    Receiver,
    /// The blank identifier `_`
    Blank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LitKind {
    Int,
    Float,
    Imag,
    Char,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Quo,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    AndNot,
    LAnd,
    LOr,
    Eql,
    Neq,
    Lss,
    Leq,
    Gtr,
    Geq,
}

impl BinaryOp {
    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOp::Eql | BinaryOp::Neq)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    /// Bitwise complement `^x`
    Xor,
    /// Address-of `&x`
    Addr,
    /// Channel receive `<-x`
    Recv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "expr", rename_all = "snake_case")]
pub enum ExprKind {
    Ident {
        name: String,
        obj: IdentKind,
    },
    BasicLit {
        lit: LitKind,
        value: String,
    },
    /// Literal whose type is the node's resolved type
    CompositeLit {
        elts: Vec<Expr>,
    },
    FuncLit(FuncLit),
    Paren {
        x: Box<Expr>,
    },
    Selector {
        x: Box<Expr>,
        sel: String,
    },
    Index {
        x: Box<Expr>,
        index: Box<Expr>,
    },
    Slice {
        x: Box<Expr>,
        low: Option<Box<Expr>>,
        high: Option<Box<Expr>>,
        max: Option<Box<Expr>>,
    },
    TypeAssert {
        x: Box<Expr>,
        ty: TypeId,
    },
    Call {
        fun: Box<Expr>,
        args: Vec<Expr>,
        #[serde(default)]
        ellipsis: bool,
    },
    /// Pointer dereference `*x`
    Star {
        x: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        x: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        x: Box<Expr>,
        y: Box<Expr>,
    },
    KeyValue {
        key: Box<Expr>,
        value: Box<Expr>,
    },
    /// A type in expression position (conversion callee, `make`/`new` argument)
    TypeExpr {
        ty: TypeId,
    },
}

impl Expr {
    pub fn ident_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Ident { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(&self.kind, ExprKind::Ident { obj: IdentKind::Blank, .. })
            || self.ident_name() == Some("_")
    }

    pub fn is_nil(&self) -> bool {
        match &self.kind {
            ExprKind::Ident { obj: IdentKind::Nil, .. } => true,
            ExprKind::Paren { x } => x.is_nil(),
            _ => false,
        }
    }

    /// Strip redundant parentheses
    pub fn unparen(&self) -> &Expr {
        match &self.kind {
            ExprKind::Paren { x } => x.unparen(),
            _ => self,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncLit {
    /// A `Signature` entry
    pub sig: TypeId,
    pub body: Block,
    pub scope: ScopeId,
    #[serde(default)]
    pub escapes: Vec<BindingId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignOp {
    Assign,
    Define,
    Add,
    Sub,
    Mul,
    Quo,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    AndNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchKind {
    Break,
    Continue,
    Goto,
    Fallthrough,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    /// Absent when the block shares its parent's scope (function bodies)
    #[serde(default)]
    pub scope: Option<ScopeId>,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>, scope: Option<ScopeId>) -> Self {
        Self { stmts, scope }
    }
}

/// One `var` or `const` spec inside a function body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueSpec {
    pub names: Vec<Expr>,
    #[serde(default)]
    pub values: Vec<Expr>,
    #[serde(default)]
    pub is_const: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseClause {
    /// `None` marks the `default` clause
    pub values: Option<Vec<Expr>>,
    pub body: Vec<Stmt>,
    pub scope: ScopeId,
}

impl CaseClause {
    pub fn is_default(&self) -> bool {
        self.values.is_none()
    }

    pub fn ends_in_fallthrough(&self) -> bool {
        matches!(
            self.body.last(),
            Some(Stmt::Branch { tok: BranchKind::Fallthrough, .. })
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Stmt {
    Empty,
    Expr {
        x: Expr,
    },
    Assign {
        lhs: Vec<Expr>,
        op: AssignOp,
        rhs: Vec<Expr>,
    },
    IncDec {
        x: Expr,
        inc: bool,
    },
    Decl {
        specs: Vec<ValueSpec>,
    },
    Return {
        results: Vec<Expr>,
    },
    Block(Block),
    If {
        init: Option<Box<Stmt>>,
        cond: Expr,
        then: Block,
        els: Option<Box<Stmt>>,
        scope: ScopeId,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        post: Option<Box<Stmt>>,
        body: Block,
        scope: ScopeId,
    },
    Range {
        key: Option<Expr>,
        value: Option<Expr>,
        #[serde(default)]
        define: bool,
        x: Expr,
        body: Block,
        scope: ScopeId,
    },
    Switch {
        init: Option<Box<Stmt>>,
        tag: Option<Expr>,
        clauses: Vec<CaseClause>,
        scope: ScopeId,
    },
    TypeSwitch {
        x: Expr,
    },
    Select,
    Defer {
        call: Expr,
    },
    Go {
        call: Expr,
    },
    Send {
        chan: Expr,
        value: Expr,
    },
    Labeled {
        label: String,
        stmt: Box<Stmt>,
    },
    Branch {
        tok: BranchKind,
        #[serde(default)]
        label: Option<String>,
    },
}

/// Receiver clause of a method declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecvDecl {
    #[serde(default)]
    pub name: Option<String>,
    /// The receiver's base named type (never the pointer)
    pub ty: TypeId,
    pub kind: Receiver,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncDecl {
    pub name: String,
    #[serde(default)]
    pub recv: Option<RecvDecl>,
    /// A `Signature` entry
    pub sig: TypeId,
    /// `None` for functions implemented outside the program
    #[serde(default)]
    pub body: Option<Block>,
    pub scope: ScopeId,
    /// Locals the escape analysis found captured by an outliving closure
    #[serde(default)]
    pub escapes: Vec<BindingId>,
}

impl FuncDecl {
    pub fn is_method(&self) -> bool {
        self.recv.is_some()
    }
}

/// A package-level object, in declaration order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "object", rename_all = "snake_case")]
pub enum Object {
    TypeName { name: String, ty: TypeId },
    Func(FuncDecl),
    Var { name: String, ty: TypeId },
    Const { name: String, ty: TypeId, value: String },
}

impl Object {
    pub fn name(&self) -> &str {
        match self {
            Object::TypeName { name, .. }
            | Object::Var { name, .. }
            | Object::Const { name, .. } => name,
            Object::Func(func) => &func.name,
        }
    }

    pub fn is_exported(&self) -> bool {
        self.name().chars().next().is_some_and(char::is_uppercase)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    pub name: String,
    pub objects: Vec<Object>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(id: u32, name: &str, obj: IdentKind) -> Expr {
        Expr {
            id: NodeId(id),
            kind: ExprKind::Ident {
                name: name.to_string(),
                obj,
            },
        }
    }

    #[test]
    fn test_blank_and_nil_detection() {
        assert!(ident(0, "_", IdentKind::Blank).is_blank());
        assert!(!ident(1, "x", IdentKind::Var).is_blank());

        let paren_nil = Expr {
            id: NodeId(3),
            kind: ExprKind::Paren {
                x: Box::new(ident(2, "nil", IdentKind::Nil)),
            },
        };
        assert!(paren_nil.is_nil());
    }

    #[test]
    fn test_case_clause_fallthrough() {
        let clause = CaseClause {
            values: Some(Vec::new()),
            body: vec![Stmt::Branch {
                tok: BranchKind::Fallthrough,
                label: None,
            }],
            scope: ScopeId(0),
        };
        assert!(clause.ends_in_fallthrough());
        assert!(!clause.is_default());
    }

    #[test]
    fn test_object_export() {
        let exported = Object::Var {
            name: "Count".to_string(),
            ty: TypeId(0),
        };
        let private = Object::Var {
            name: "count".to_string(),
            ty: TypeId(0),
        };
        assert!(exported.is_exported());
        assert!(!private.is_exported());
    }
}
