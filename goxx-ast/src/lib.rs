//! goxx resolved program model
//!
//! This crate describes the input of the translator: a whole Go program after
//! type checking and escape analysis. It holds the type arena, the resolved
//! syntax tree, per-package scopes, per-node type information and the package
//! variable initialisation order. Programs are exchanged as JSON.

pub mod ast;
pub mod builder;
pub mod error;
pub mod program;
pub mod scope;
pub mod types;

pub use ast::{
    AssignOp, BinaryOp, Block, BranchKind, CaseClause, Expr, ExprKind, File, FuncDecl, FuncLit,
    IdentKind, LitKind, NodeId, Object, RecvDecl, Stmt, UnaryOp, ValueSpec,
};
pub use error::{LoadError, Result};
pub use program::{load_program, walk_exprs, Initializer, Package, Program, TypeInfo};
pub use scope::{Binding, BindingId, BindingKind, Scope, ScopeId, ScopeTree};
pub use types::{
    BasicKind, ChanDir, Field, Method, MethodSig, NamedType, Param, Receiver, ResolvedType,
    Signature, TypeId, TypeTable,
};
