//! Scope declarations and defer stacks
//!
//! Every lexical block declares its own bindings up front, zero-initialized,
//! before any of its statements run. Go `var x = e` and `x := e` then lower
//! to plain assignments. Escaping bindings stay on the stack and are only
//! marked.

use crate::context::EmitContext;
use crate::error::CodegenResult;
use crate::session::Session;
use crate::utils::{char_literal, sanitize_identifier, string_literal};
use goxx_ast::{BasicKind, BindingId, BindingKind, ResolvedType, ScopeId, Stmt};
use tracing::warn;

/// Local holding a function's deferred calls
pub const DEFER_STACK: &str = "_defer_";

/// Declarations for the bindings of one scope, in binding order
pub fn scope_declarations(
    cx: &EmitContext<'_>,
    session: &mut Session,
    scope: ScopeId,
    escapes: &[BindingId],
) -> CodegenResult<Vec<String>> {
    let mut lines = Vec::new();
    for binding in &cx.scope(scope)?.bindings {
        if !binding.is_block_local() {
            continue;
        }
        let name = sanitize_identifier(&binding.name);
        let ty = cx.type_sig(session, binding.ty)?;

        if let BindingKind::Const { value } = &binding.kind {
            lines.push(const_declaration(cx, &ty, &name, binding.ty, value));
            continue;
        }

        let zero = cx.nil_val(binding.ty)?;
        let mut line = format!("{} {}{{{}}};", ty, name, zero);
        if escapes.contains(&binding.id) {
            warn!(binding = %binding.name, package = %cx.package.name, "escaping binding left on the stack");
            if cx.config.annotate_escapes {
                line.push_str(" /* escapes */");
            }
        }
        lines.push(line);
    }
    Ok(lines)
}

pub(crate) fn const_declaration(cx: &EmitContext<'_>, ty: &str, name: &str, id: goxx_ast::TypeId, value: &str) -> String {
    match cx.types().get(id) {
        Some(ResolvedType::Basic { basic }) if basic.is_string() => {
            format!("const {} {} = {};", ty, name, string_literal(value))
        }
        Some(ResolvedType::Basic { basic: BasicKind::UntypedRune }) if value.starts_with('\'') => {
            format!("constexpr {} {} = {};", ty, name, char_literal(value))
        }
        Some(ResolvedType::Basic { .. }) => format!("constexpr {} {} = {};", ty, name, value),
        _ => format!("const {} {}{{{}}};", ty, name, value),
    }
}

/// Whether a statement list registers deferred calls
///
/// Function literals are not entered; they own their defer stack.
pub fn uses_defer(stmts: &[Stmt]) -> bool {
    stmts.iter().any(stmt_uses_defer)
}

fn stmt_uses_defer(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Defer { .. } => true,
        Stmt::Block(block) => uses_defer(&block.stmts),
        Stmt::If { then, els, .. } => {
            uses_defer(&then.stmts) || els.as_deref().is_some_and(stmt_uses_defer)
        }
        Stmt::For { body, .. } | Stmt::Range { body, .. } => uses_defer(&body.stmts),
        Stmt::Switch { clauses, .. } => clauses.iter().any(|c| uses_defer(&c.body)),
        Stmt::Labeled { stmt, .. } => stmt_uses_defer(stmt),
        _ => false,
    }
}

/// Declaration of the per-function defer stack
pub fn defer_stack_decl() -> String {
    format!("goxx::defer {};", DEFER_STACK)
}

/// Register `call` on the defer stack, capturing by value now
pub fn defer_push(call: &str) -> String {
    format!("{}.push([=]() mutable {{ {}; }});", DEFER_STACK, call)
}
