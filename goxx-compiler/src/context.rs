//! Read-only inputs of one package translation

use crate::config::TranslatorConfig;
use crate::error::{CodegenError, CodegenResult};
use crate::session::Session;
use crate::typesig::TypeTranslator;
use crate::utils::namespace_name;
use goxx_ast::{Expr, Package, Program, Scope, ScopeId, TypeId, TypeTable};
use goxx_checker::SatisfactionIndex;

/// Everything a component may read while emitting one package
#[derive(Debug, Clone, Copy)]
pub struct EmitContext<'a> {
    pub program: &'a Program,
    pub package: &'a Package,
    pub index: &'a SatisfactionIndex,
    pub config: &'a TranslatorConfig,
}

impl<'a> EmitContext<'a> {
    pub fn new(
        program: &'a Program,
        package: &'a Package,
        index: &'a SatisfactionIndex,
        config: &'a TranslatorConfig,
    ) -> Self {
        Self {
            program,
            package,
            index,
            config,
        }
    }

    pub fn types(&self) -> &'a TypeTable {
        &self.program.types
    }

    /// C++ namespace of the package being emitted
    pub fn namespace(&self) -> String {
        namespace_name(&self.package.name)
    }

    pub fn translator(&self) -> TypeTranslator<'a> {
        TypeTranslator::new(&self.program.types, Some(self.package.name.as_str()))
            .with_map_hoisting(self.config.hoist_map_values)
    }

    pub fn type_sig(&self, session: &mut Session, id: TypeId) -> CodegenResult<String> {
        self.translator().type_sig(session, id)
    }

    pub fn nil_val(&self, id: TypeId) -> CodegenResult<String> {
        self.translator().nil_val(id)
    }

    /// Resolved type of an expression node
    pub fn type_of(&self, expr: &Expr) -> CodegenResult<TypeId> {
        self.package
            .type_of(expr)
            .ok_or_else(|| CodegenError::inconsistent(expr.id, "no resolved type"))
    }

    pub fn scope(&self, id: ScopeId) -> CodegenResult<&'a Scope> {
        self.package
            .scopes
            .get(id)
            .ok_or_else(|| CodegenError::inconsistent(format!("scope {}", id.0), "scope not found"))
    }

    /// Position of a package in program order
    pub fn package_position(&self, name: &str) -> Option<usize> {
        self.program.packages.iter().position(|p| p.name == name)
    }

    /// Whether `package` is emitted before or together with the current one
    pub fn is_visible_package(&self, package: &str) -> bool {
        match (
            self.package_position(package),
            self.package_position(&self.package.name),
        ) {
            (Some(other), Some(current)) => other <= current,
            _ => false,
        }
    }
}
