//! Packages and whole programs

use crate::ast::{Expr, ExprKind, File, NodeId, Object, Stmt};
use crate::error::{LoadError, Result};
use crate::scope::{ScopeId, ScopeTree};
use crate::types::{ResolvedType, TypeId, TypeTable};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Resolved type of every typed expression node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<(NodeId, TypeId)>", into = "Vec<(NodeId, TypeId)>")]
pub struct TypeInfo {
    types: HashMap<NodeId, TypeId>,
}

impl TypeInfo {
    pub fn insert(&mut self, node: NodeId, ty: TypeId) {
        self.types.insert(node, ty);
    }

    pub fn get(&self, node: NodeId) -> Option<TypeId> {
        self.types.get(&node).copied()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl From<Vec<(NodeId, TypeId)>> for TypeInfo {
    fn from(entries: Vec<(NodeId, TypeId)>) -> Self {
        Self {
            types: entries.into_iter().collect(),
        }
    }
}

impl From<TypeInfo> for Vec<(NodeId, TypeId)> {
    fn from(info: TypeInfo) -> Self {
        let mut entries: Vec<_> = info.types.into_iter().collect();
        entries.sort();
        entries
    }
}

/// One step of package variable initialisation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Initializer {
    pub lhs: Vec<String>,
    pub rhs: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub imports: Vec<String>,
    pub files: Vec<File>,
    #[serde(default)]
    pub scopes: ScopeTree,
    #[serde(default)]
    pub type_info: TypeInfo,
    /// Variable initialisers in dependency order
    #[serde(default)]
    pub init_order: Vec<Initializer>,
}

impl Package {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            path: name.clone(),
            name,
            imports: Vec::new(),
            files: Vec::new(),
            scopes: ScopeTree::new(),
            type_info: TypeInfo::default(),
            init_order: Vec::new(),
        }
    }

    /// Top-level objects across all files, in file then declaration order
    pub fn symbols(&self) -> impl Iterator<Item = &Object> {
        self.files.iter().flat_map(|f| f.objects.iter())
    }

    pub fn lookup(&self, name: &str) -> Option<&Object> {
        self.symbols().find(|o| o.name() == name)
    }

    pub fn type_of(&self, expr: &Expr) -> Option<TypeId> {
        self.type_info.get(expr.id)
    }

    pub fn has_init(&self) -> bool {
        self.symbols()
            .any(|o| matches!(o, Object::Func(f) if f.name == "init" && f.recv.is_none()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub types: TypeTable,
    /// Packages in dependency order, dependencies first
    pub packages: Vec<Package>,
    #[serde(default = "default_entry")]
    pub entry: String,
}

fn default_entry() -> String {
    "main".to_string()
}

impl Program {
    pub fn from_json(source: &str) -> Result<Self> {
        let program: Program = serde_json::from_str(source)?;
        program.validate()?;
        debug!(
            packages = program.packages.len(),
            types = program.types.len(),
            "loaded program"
        );
        Ok(program)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn package(&self, name: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.name == name)
    }

    pub fn entry_package(&self) -> Option<&Package> {
        self.package(&self.entry)
    }

    /// Check that every type and scope reference resolves
    pub fn validate(&self) -> Result<()> {
        let check = |id: TypeId, context: &str| -> Result<()> {
            if self.types.get(id).is_none() {
                return Err(LoadError::dangling_type(id.0, context));
            }
            Ok(())
        };

        for (id, ty) in self.types.iter() {
            for child in ty.children() {
                check(child, &format!("type {}", id))?;
            }
            if let ResolvedType::Named(named) = ty {
                if named.name.is_empty() {
                    return Err(LoadError::invalid(format!("named type {} has no name", id)));
                }
            }
        }

        for package in &self.packages {
            let check_scope = |scope: ScopeId| -> Result<()> {
                if package.scopes.get(scope).is_none() {
                    return Err(LoadError::DanglingScope {
                        id: scope.0,
                        package: package.name.clone(),
                    });
                }
                Ok(())
            };

            for scope in package.scopes.iter() {
                for binding in &scope.bindings {
                    check(binding.ty, &format!("binding {}", binding.name))?;
                }
            }

            for object in package.symbols() {
                match object {
                    Object::TypeName { ty, name } | Object::Var { ty, name } => check(*ty, name)?,
                    Object::Const { ty, name, .. } => check(*ty, name)?,
                    Object::Func(func) => {
                        check(func.sig, &func.name)?;
                        check_scope(func.scope)?;
                        if let Some(recv) = &func.recv {
                            check(recv.ty, &func.name)?;
                        }
                        if let Some(body) = &func.body {
                            let mut first_error = None;
                            walk_exprs(&body.stmts, &mut |expr| {
                                if first_error.is_some() {
                                    return;
                                }
                                let result = match &expr.kind {
                                    ExprKind::TypeAssert { ty, .. } | ExprKind::TypeExpr { ty } => {
                                        check(*ty, &func.name)
                                    }
                                    ExprKind::FuncLit(lit) => {
                                        check(lit.sig, &func.name).and_then(|_| check_scope(lit.scope))
                                    }
                                    _ => Ok(()),
                                };
                                first_error = result.err();
                            });
                            if let Some(err) = first_error {
                                return Err(err);
                            }
                        }
                    }
                }
            }
        }

        if self.entry_package().is_none() && !self.packages.is_empty() {
            return Err(LoadError::invalid(format!(
                "entry package `{}` not found",
                self.entry
            )));
        }

        Ok(())
    }
}

/// Load a program description from a JSON file
pub fn load_program(path: &Path) -> Result<Program> {
    let source = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.to_path_buf(),
        error: e,
    })?;
    Program::from_json(&source)
}

/// Visit every expression reachable from a statement list, outermost first
pub fn walk_exprs<'a>(stmts: &'a [Stmt], visit: &mut dyn FnMut(&'a Expr)) {
    for stmt in stmts {
        walk_stmt(stmt, visit);
    }
}

fn walk_stmt<'a>(stmt: &'a Stmt, visit: &mut dyn FnMut(&'a Expr)) {
    match stmt {
        Stmt::Empty | Stmt::Select | Stmt::Branch { .. } => {}
        Stmt::Expr { x } | Stmt::IncDec { x, .. } | Stmt::TypeSwitch { x } => walk_expr(x, visit),
        Stmt::Defer { call } | Stmt::Go { call } => walk_expr(call, visit),
        Stmt::Assign { lhs, rhs, .. } => {
            lhs.iter().chain(rhs.iter()).for_each(|e| walk_expr(e, visit))
        }
        Stmt::Decl { specs } => {
            for spec in specs {
                spec.names
                    .iter()
                    .chain(spec.values.iter())
                    .for_each(|e| walk_expr(e, visit));
            }
        }
        Stmt::Return { results } => results.iter().for_each(|e| walk_expr(e, visit)),
        Stmt::Block(block) => walk_exprs(&block.stmts, visit),
        Stmt::If {
            init,
            cond,
            then,
            els,
            ..
        } => {
            if let Some(init) = init {
                walk_stmt(init, visit);
            }
            walk_expr(cond, visit);
            walk_exprs(&then.stmts, visit);
            if let Some(els) = els {
                walk_stmt(els, visit);
            }
        }
        Stmt::For {
            init,
            cond,
            post,
            body,
            ..
        } => {
            if let Some(init) = init {
                walk_stmt(init, visit);
            }
            if let Some(cond) = cond {
                walk_expr(cond, visit);
            }
            if let Some(post) = post {
                walk_stmt(post, visit);
            }
            walk_exprs(&body.stmts, visit);
        }
        Stmt::Range {
            key,
            value,
            x,
            body,
            ..
        } => {
            key.iter().chain(value.iter()).for_each(|e| walk_expr(e, visit));
            walk_expr(x, visit);
            walk_exprs(&body.stmts, visit);
        }
        Stmt::Switch {
            init, tag, clauses, ..
        } => {
            if let Some(init) = init {
                walk_stmt(init, visit);
            }
            if let Some(tag) = tag {
                walk_expr(tag, visit);
            }
            for clause in clauses {
                clause.values.iter().flatten().for_each(|e| walk_expr(e, visit));
                walk_exprs(&clause.body, visit);
            }
        }
        Stmt::Send { chan, value } => {
            walk_expr(chan, visit);
            walk_expr(value, visit);
        }
        Stmt::Labeled { stmt, .. } => walk_stmt(stmt, visit),
    }
}

fn walk_expr<'a>(expr: &'a Expr, visit: &mut dyn FnMut(&'a Expr)) {
    visit(expr);
    match &expr.kind {
        ExprKind::Ident { .. } | ExprKind::BasicLit { .. } | ExprKind::TypeExpr { .. } => {}
        ExprKind::CompositeLit { elts } => elts.iter().for_each(|e| walk_expr(e, visit)),
        ExprKind::FuncLit(lit) => walk_exprs(&lit.body.stmts, visit),
        ExprKind::Paren { x }
        | ExprKind::Selector { x, .. }
        | ExprKind::TypeAssert { x, .. }
        | ExprKind::Star { x }
        | ExprKind::Unary { x, .. } => walk_expr(x, visit),
        ExprKind::Index { x, index } => {
            walk_expr(x, visit);
            walk_expr(index, visit);
        }
        ExprKind::Slice { x, low, high, max } => {
            walk_expr(x, visit);
            [low, high, max]
                .into_iter()
                .flatten()
                .for_each(|e| walk_expr(e, visit));
        }
        ExprKind::Call { fun, args, .. } => {
            walk_expr(fun, visit);
            args.iter().for_each(|e| walk_expr(e, visit));
        }
        ExprKind::Binary { x, y, .. } => {
            walk_expr(x, visit);
            walk_expr(y, visit);
        }
        ExprKind::KeyValue { key, value } => {
            walk_expr(key, visit);
            walk_expr(value, visit);
        }
    }
}
