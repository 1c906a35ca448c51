//! Statement and expression walker
//!
//! Lowers function bodies to C++ one statement at a time. A
//! [`FunctionEmitter`] owns the output buffer of a single function and a
//! stack of frames, one per function or function literal being emitted, so
//! `return` and receiver references resolve against the innermost one.

mod expr;
mod stmt;
pub mod switch;

use crate::context::EmitContext;
use crate::emitter::CppEmitter;
use crate::error::{CodegenError, CodegenResult, ResultExt};
use crate::named_types::{by_value_name, method_shape, MethodShape};
use crate::scope::{defer_stack_decl, scope_declarations, uses_defer};
use crate::session::Session;
use crate::utils::sanitize_identifier;
use goxx_ast::{Block, BindingId, FuncDecl, Initializer, Object, Param, ScopeId, TypeId};
use tracing::debug;

/// How the receiver identifier is spelled inside a method body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverMode {
    /// Pointer receiver: `this`
    This,
    /// By-value implementation already running on a copy: `(*this)`
    Deref,
    /// Plain value method working on a local copy: `_recv`
    Copy,
}

#[derive(Debug, Clone)]
pub(crate) struct Frame {
    results: Vec<Param>,
    result_type: String,
    named_results: Vec<String>,
    receiver: Option<ReceiverMode>,
    escapes: Vec<BindingId>,
}

#[derive(Debug, Clone)]
pub(crate) enum BreakTarget {
    Loop,
    Switch { label: String, used: bool },
}

/// Emits one function body
pub struct FunctionEmitter<'a, 's> {
    cx: EmitContext<'a>,
    session: &'s mut Session,
    out: CppEmitter,
    /// Set by a multi-target assignment; consumed by the next expression
    tuple_mode: bool,
    frames: Vec<Frame>,
    breaks: Vec<BreakTarget>,
    fallthrough: Option<String>,
}

impl<'a, 's> FunctionEmitter<'a, 's> {
    pub fn new(cx: EmitContext<'a>, session: &'s mut Session) -> Self {
        let width = cx.config.indent_width;
        Self {
            cx,
            session,
            out: CppEmitter::new(width),
            tuple_mode: false,
            frames: Vec::new(),
            breaks: Vec::new(),
            fallthrough: None,
        }
    }

    pub fn finish(self) -> String {
        self.out.finish()
    }

    fn frame(&self) -> CodegenResult<&Frame> {
        self.frames
            .last()
            .ok_or_else(|| CodegenError::mismatch("statement outside of a function"))
    }

    fn make_frame(&mut self, sig: TypeId, receiver: Option<ReceiverMode>, escapes: &[BindingId]) -> CodegenResult<Frame> {
        let translator = self.cx.translator();
        let signature = translator.signature(sig)?;
        let result_type = translator.results_sig(self.session, &signature.results)?;
        let named_results = signature
            .results
            .iter()
            .filter_map(|p| p.name.as_deref())
            .filter(|n| !n.is_empty())
            .map(sanitize_identifier)
            .collect::<Vec<_>>();
        let named_results = if named_results.len() == signature.results.len() {
            named_results
        } else {
            Vec::new()
        };
        Ok(Frame {
            results: signature.results.clone(),
            result_type,
            named_results,
            receiver,
            escapes: escapes.to_vec(),
        })
    }

    /// Scope declarations, then the defer stack when one is needed
    fn emit_prologue(&mut self, scope: Option<ScopeId>, stmts: &[goxx_ast::Stmt], with_defer: bool) -> CodegenResult<()> {
        if let Some(scope) = scope {
            let escapes = self.frame()?.escapes.clone();
            for line in scope_declarations(&self.cx, self.session, scope, &escapes)? {
                self.out.emit_line(&line);
            }
        }
        if with_defer && uses_defer(stmts) {
            self.out.emit_line(&defer_stack_decl());
        }
        Ok(())
    }

    /// Emit a body of a function or method definition
    fn emit_body(&mut self, head: &str, scope: ScopeId, body: &Block, prologue: Option<String>) -> CodegenResult<()> {
        self.out.emit_line(&format!("{} {{", head));
        self.out.indent();
        if let Some(line) = prologue {
            self.out.emit_line(&line);
        }
        self.emit_prologue(Some(scope), &body.stmts, true)?;
        if let Some(inner) = body.scope.filter(|s| *s != scope) {
            self.emit_prologue(Some(inner), &[], false)?;
        }
        self.emit_stmts(&body.stmts)?;
        self.out.dedent();
        self.out.emit_line("}");
        Ok(())
    }
}

/// C++ name of a package-level function
///
/// `main` would clash with the global entry point, and a package may declare
/// any number of `init` functions.
pub fn function_name(func: &FuncDecl, init_ordinal: usize) -> String {
    match func.name.as_str() {
        "main" => "_main".to_string(),
        "init" => format!("_init_{}", init_ordinal),
        other => sanitize_identifier(other),
    }
}

/// Definition of a function or method; empty when it has no body
pub fn emit_function(
    cx: EmitContext<'_>,
    session: &mut Session,
    func: &FuncDecl,
    name: &str,
) -> CodegenResult<String> {
    let Some(body) = &func.body else {
        return Ok(String::new());
    };
    debug!(function = %func.name, "emitting function body");

    let translator = cx.translator();
    let sig = translator.signature(func.sig)?;
    let rendered = translator.function_sig(session, sig)?;

    let mut emitter = FunctionEmitter::new(cx, session);
    let (head, receiver, prologue) = match &func.recv {
        None => (
            format!("{} {}({})", rendered.result, name, rendered.params_decl()),
            None,
            None,
        ),
        Some(recv) => {
            let owner = cx
                .types()
                .named(recv.ty)
                .ok_or_else(|| CodegenError::inconsistent(recv.ty, "receiver is not a named type"))?;
            let method = owner.method(&func.name).ok_or_else(|| {
                CodegenError::inconsistent(recv.ty, format!("no method `{}` on `{}`", func.name, owner.name))
            })?;
            let owner_name = sanitize_identifier(&owner.name);
            let method_name = sanitize_identifier(&func.name);
            let params = rendered.params_decl();
            match method_shape(&cx, recv.ty, method) {
                MethodShape::Virtual | MethodShape::Plain => (
                    format!("{} {}::{}({})", rendered.result, owner_name, method_name, params),
                    Some(ReceiverMode::This),
                    None,
                ),
                MethodShape::VirtualByValue => (
                    format!(
                        "{} {}::{}({})",
                        rendered.result,
                        owner_name,
                        by_value_name(&method_name),
                        params
                    ),
                    Some(ReceiverMode::Deref),
                    None,
                ),
                MethodShape::PlainByValue => (
                    format!("{} {}::{}({})", rendered.result, owner_name, method_name, params),
                    Some(ReceiverMode::Copy),
                    Some(format!("{} _recv = *this;", owner_name)),
                ),
            }
        }
    };

    let frame = emitter.make_frame(func.sig, receiver, &func.escapes)?;
    emitter.frames.push(frame);
    emitter
        .emit_body(&head, func.scope, body, prologue)
        .context(|| format!("function `{}`", func.name))?;
    Ok(emitter.finish())
}

/// `void _package_init()` running the package's variable initializers
pub fn emit_package_init(cx: EmitContext<'_>, session: &mut Session, inits: &[Initializer]) -> CodegenResult<String> {
    let mut emitter = FunctionEmitter::new(cx, session);
    emitter.frames.push(Frame {
        results: Vec::new(),
        result_type: "void".to_string(),
        named_results: Vec::new(),
        receiver: None,
        escapes: Vec::new(),
    });
    emitter.out.emit_line("void _package_init() {");
    emitter.out.indent();
    for init in inits {
        emitter
            .emit_initializer(init)
            .context(|| format!("initializer of `{}`", init.lhs.join(", ")))?;
    }
    emitter.out.dedent();
    emitter.out.emit_line("}");
    Ok(emitter.finish())
}

impl FunctionEmitter<'_, '_> {
    fn emit_initializer(&mut self, init: &Initializer) -> CodegenResult<()> {
        match init.lhs.as_slice() {
            [single] if single == "_" => {
                let value = self.expr(&init.rhs)?;
                self.out.emit_line(&format!("(void)({});", value));
            }
            [single] => {
                let target = self.cx.package.symbols().find_map(|o| match o {
                    Object::Var { name, ty } if name == single => Some(*ty),
                    _ => None,
                });
                let value = match target {
                    Some(ty) => self.convert_to(&init.rhs, ty)?,
                    None => self.expr(&init.rhs)?,
                };
                self.out
                    .emit_line(&format!("{} = {};", sanitize_identifier(single), value));
            }
            many => {
                let targets = many
                    .iter()
                    .map(|n| if n == "_" { "std::ignore".to_string() } else { sanitize_identifier(n) })
                    .collect::<Vec<_>>()
                    .join(", ");
                self.tuple_mode = true;
                let value = self.expr(&init.rhs)?;
                self.out.emit_line(&format!("std::tie({}) = {};", targets, value));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
