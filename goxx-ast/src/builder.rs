//! Fluent construction of resolved programs
//!
//! Used by tests and tools that need a [`Program`] without running the Go
//! front end. Every expression built through a [`PackageBuilder`] gets a fresh
//! [`NodeId`] and, when a type is supplied, an entry in the package's type info.

use crate::ast::*;
use crate::program::{Initializer, Package, Program};
use crate::scope::{Binding, BindingId, BindingKind, ScopeId};
use crate::types::*;
use std::collections::HashMap;

/// Program builder
pub struct ProgramBuilder {
    types: TypeTable,
    basics: HashMap<BasicKind, TypeId>,
    packages: Vec<Package>,
    entry: String,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self {
            types: TypeTable::new(),
            basics: HashMap::new(),
            packages: Vec::new(),
            entry: "main".to_string(),
        }
    }

    pub fn entry(mut self, package: &str) -> Self {
        self.entry = package.to_string();
        self
    }

    pub fn ty(&mut self, ty: ResolvedType) -> TypeId {
        self.types.push(ty)
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    pub fn basic(&mut self, kind: BasicKind) -> TypeId {
        if let Some(id) = self.basics.get(&kind) {
            return *id;
        }
        let id = self.types.push(ResolvedType::Basic { basic: kind });
        self.basics.insert(kind, id);
        id
    }

    pub fn pointer(&mut self, elem: TypeId) -> TypeId {
        self.ty(ResolvedType::Pointer { elem })
    }

    pub fn slice(&mut self, elem: TypeId) -> TypeId {
        self.ty(ResolvedType::Slice { elem })
    }

    pub fn array(&mut self, elem: TypeId, len: u64) -> TypeId {
        self.ty(ResolvedType::Array { elem, len })
    }

    pub fn map(&mut self, key: TypeId, elem: TypeId) -> TypeId {
        self.ty(ResolvedType::Map { key, elem })
    }

    pub fn chan(&mut self, elem: TypeId, dir: ChanDir) -> TypeId {
        self.ty(ResolvedType::Chan { elem, dir })
    }

    pub fn tuple(&mut self, items: Vec<TypeId>) -> TypeId {
        self.ty(ResolvedType::Tuple { items })
    }

    /// Signature with unnamed parameters and results
    pub fn func(&mut self, params: &[TypeId], results: &[TypeId]) -> TypeId {
        let params = params.iter().map(|&ty| Param { name: None, ty }).collect();
        let results = results.iter().map(|&ty| Param { name: None, ty }).collect();
        self.ty(ResolvedType::Signature(Signature {
            params,
            results,
            variadic: false,
        }))
    }

    /// Signature with named parameters
    pub fn func_named(&mut self, params: &[(&str, TypeId)], results: &[TypeId], variadic: bool) -> TypeId {
        let params = params
            .iter()
            .map(|&(name, ty)| Param {
                name: Some(name.to_string()),
                ty,
            })
            .collect();
        let results = results.iter().map(|&ty| Param { name: None, ty }).collect();
        self.ty(ResolvedType::Signature(Signature {
            params,
            results,
            variadic,
        }))
    }

    pub fn struct_type(&mut self, fields: &[(&str, TypeId)]) -> TypeId {
        let fields = fields
            .iter()
            .map(|&(name, ty)| Field {
                name: name.to_string(),
                ty,
                embedded: false,
            })
            .collect();
        self.ty(ResolvedType::Struct { fields })
    }

    pub fn interface(&mut self, methods: &[(&str, TypeId)]) -> TypeId {
        let methods = methods
            .iter()
            .map(|&(name, sig)| MethodSig {
                name: name.to_string(),
                sig,
            })
            .collect();
        self.ty(ResolvedType::Interface { methods })
    }

    pub fn empty_interface(&mut self) -> TypeId {
        self.interface(&[])
    }

    /// The predeclared `error` contract
    pub fn error_type(&mut self) -> TypeId {
        let string = self.basic(BasicKind::String);
        let sig = self.func(&[], &[string]);
        let underlying = self.interface(&[("Error", sig)]);
        self.named("", "error", underlying)
    }

    pub fn named(&mut self, package: &str, name: &str, underlying: TypeId) -> TypeId {
        self.ty(ResolvedType::Named(NamedType {
            package: package.to_string(),
            name: name.to_string(),
            underlying,
            methods: Vec::new(),
        }))
    }

    /// Declare a named type whose underlying type is set later (recursive types)
    pub fn declare_named(&mut self, package: &str, name: &str) -> TypeId {
        let placeholder = self.basic(BasicKind::UntypedNil);
        self.named(package, name, placeholder)
    }

    pub fn set_underlying(&mut self, named: TypeId, underlying: TypeId) {
        if let Some(ResolvedType::Named(n)) = self.types.get_mut(named) {
            n.underlying = underlying;
        }
    }

    pub fn method(&mut self, named: TypeId, name: &str, sig: TypeId, receiver: Receiver) {
        if let Some(ResolvedType::Named(n)) = self.types.get_mut(named) {
            n.methods.push(Method {
                name: name.to_string(),
                sig,
                receiver,
            });
        }
    }

    pub fn package(&mut self, name: &str) -> PackageBuilder<'_> {
        PackageBuilder {
            program: self,
            package: Package::new(name),
            next_node: 0,
            next_binding: 0,
        }
    }

    pub fn build(self) -> Program {
        Program {
            types: self.types,
            packages: self.packages,
            entry: self.entry,
        }
    }
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Package builder
pub struct PackageBuilder<'a> {
    program: &'a mut ProgramBuilder,
    package: Package,
    next_node: u32,
    next_binding: u32,
}

impl<'a> PackageBuilder<'a> {
    /// Access the program to create more types
    pub fn types(&mut self) -> &mut ProgramBuilder {
        &mut *self.program
    }

    pub fn import(&mut self, package: &str) -> &mut Self {
        self.package.imports.push(package.to_string());
        self
    }

    pub fn scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        self.package.scopes.push(parent)
    }

    pub fn bind(&mut self, scope: ScopeId, name: &str, ty: TypeId, kind: BindingKind) -> BindingId {
        let id = BindingId(self.next_binding);
        self.next_binding += 1;
        if let Some(scope) = self.package.scopes.get_mut(scope) {
            scope.bindings.push(Binding {
                id,
                name: name.to_string(),
                ty,
                kind,
            });
        }
        id
    }

    pub fn expr(&mut self, kind: ExprKind, ty: Option<TypeId>) -> Expr {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        if let Some(ty) = ty {
            self.package.type_info.insert(id, ty);
        }
        Expr { id, kind }
    }

    pub fn ident(&mut self, name: &str, obj: IdentKind, ty: Option<TypeId>) -> Expr {
        self.expr(
            ExprKind::Ident {
                name: name.to_string(),
                obj,
            },
            ty,
        )
    }

    pub fn var(&mut self, name: &str, ty: TypeId) -> Expr {
        self.ident(name, IdentKind::Var, Some(ty))
    }

    pub fn blank(&mut self) -> Expr {
        self.ident("_", IdentKind::Blank, None)
    }

    pub fn nil(&mut self) -> Expr {
        let ty = self.program.basic(BasicKind::UntypedNil);
        self.ident("nil", IdentKind::Nil, Some(ty))
    }

    pub fn func_ref(&mut self, name: &str, sig: TypeId) -> Expr {
        self.ident(name, IdentKind::Func, Some(sig))
    }

    pub fn builtin(&mut self, name: &str) -> Expr {
        self.ident(name, IdentKind::Builtin, None)
    }

    pub fn int(&mut self, value: i64) -> Expr {
        let ty = self.program.basic(BasicKind::Int);
        self.expr(
            ExprKind::BasicLit {
                lit: LitKind::Int,
                value: value.to_string(),
            },
            Some(ty),
        )
    }

    pub fn string(&mut self, value: &str) -> Expr {
        let ty = self.program.basic(BasicKind::String);
        self.expr(
            ExprKind::BasicLit {
                lit: LitKind::String,
                value: format!("{:?}", value),
            },
            Some(ty),
        )
    }

    pub fn binary(&mut self, op: BinaryOp, x: Expr, y: Expr, ty: TypeId) -> Expr {
        self.expr(
            ExprKind::Binary {
                op,
                x: Box::new(x),
                y: Box::new(y),
            },
            Some(ty),
        )
    }

    pub fn call(&mut self, fun: Expr, args: Vec<Expr>, result: Option<TypeId>) -> Expr {
        self.expr(
            ExprKind::Call {
                fun: Box::new(fun),
                args,
                ellipsis: false,
            },
            result,
        )
    }

    pub fn selector(&mut self, x: Expr, sel: &str, ty: Option<TypeId>) -> Expr {
        self.expr(
            ExprKind::Selector {
                x: Box::new(x),
                sel: sel.to_string(),
            },
            ty,
        )
    }

    pub fn type_assert(&mut self, x: Expr, target: TypeId) -> Expr {
        self.expr(
            ExprKind::TypeAssert {
                x: Box::new(x),
                ty: target,
            },
            Some(target),
        )
    }

    pub fn func_lit(&mut self, sig: TypeId, body: Block, scope: ScopeId) -> Expr {
        self.expr(
            ExprKind::FuncLit(FuncLit {
                sig,
                body,
                scope,
                escapes: Vec::new(),
            }),
            Some(sig),
        )
    }

    pub fn file(&mut self, name: &str) -> usize {
        self.package.files.push(File {
            name: name.to_string(),
            objects: Vec::new(),
        });
        self.package.files.len() - 1
    }

    pub fn object(&mut self, file: usize, object: Object) -> &mut Self {
        if let Some(file) = self.package.files.get_mut(file) {
            file.objects.push(object);
        }
        self
    }

    pub fn type_name(&mut self, file: usize, name: &str, ty: TypeId) -> &mut Self {
        self.object(
            file,
            Object::TypeName {
                name: name.to_string(),
                ty,
            },
        )
    }

    pub fn func_decl(&mut self, file: usize, func: FuncDecl) -> &mut Self {
        self.object(file, Object::Func(func))
    }

    pub fn global(&mut self, file: usize, name: &str, ty: TypeId) -> &mut Self {
        self.object(
            file,
            Object::Var {
                name: name.to_string(),
                ty,
            },
        )
    }

    pub fn init_var(&mut self, lhs: &[&str], rhs: Expr) -> &mut Self {
        self.package.init_order.push(Initializer {
            lhs: lhs.iter().map(|s| s.to_string()).collect(),
            rhs,
        });
        self
    }

    /// Finish the package and add it to the program
    pub fn finish(self) {
        self.program.packages.push(self.package);
    }
}

/// Shorthand for an expression statement
pub fn expr_stmt(x: Expr) -> Stmt {
    Stmt::Expr { x }
}

/// Shorthand for `lhs op rhs`
pub fn assign(lhs: Vec<Expr>, op: AssignOp, rhs: Vec<Expr>) -> Stmt {
    Stmt::Assign { lhs, op, rhs }
}
