//! Expression lowering
//!
//! Every expression renders to a single C++ expression string. Binary
//! operations are always parenthesized, so operator precedence never depends
//! on the surrounding context.

use super::{FunctionEmitter, ReceiverMode};
use crate::emitter::CppEmitter;
use crate::error::{CodegenError, CodegenResult};
use crate::utils::{char_literal, int_literal, namespace_name, sanitize_identifier, string_literal};
use goxx_ast::{
    BinaryOp, Expr, ExprKind, FuncLit, IdentKind, LitKind, ResolvedType, Signature, TypeId, UnaryOp,
};

fn binary_operator(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Quo => "/",
        BinaryOp::Rem => "%",
        BinaryOp::And => "&",
        BinaryOp::Or => "|",
        BinaryOp::Xor => "^",
        BinaryOp::Shl => "<<",
        BinaryOp::Shr => ">>",
        BinaryOp::AndNot => "& ~",
        BinaryOp::LAnd => "&&",
        BinaryOp::LOr => "||",
        BinaryOp::Eql => "==",
        BinaryOp::Neq => "!=",
        BinaryOp::Lss => "<",
        BinaryOp::Leq => "<=",
        BinaryOp::Gtr => ">",
        BinaryOp::Geq => ">=",
    }
}

/// Whether a type spelling can be used as a functional cast `T(x)`
fn is_simple_type_name(sig: &str) -> bool {
    sig.chars().all(|c| c.is_alphanumeric() || c == '_' || c == ':')
}

impl FunctionEmitter<'_, '_> {
    pub(crate) fn expr(&mut self, expr: &Expr) -> CodegenResult<String> {
        let tuple = std::mem::replace(&mut self.tuple_mode, false);
        match &expr.kind {
            ExprKind::Ident { name, obj } => self.ident(expr, name, *obj),
            ExprKind::BasicLit { lit, value } => match lit {
                LitKind::Int => Ok(int_literal(value)),
                LitKind::Float => Ok(value.replace('_', "")),
                LitKind::Imag => Err(CodegenError::unsupported("imaginary literal")),
                LitKind::Char => Ok(char_literal(value)),
                LitKind::String => Ok(string_literal(value)),
            },
            ExprKind::CompositeLit { elts } => {
                let ty = self.cx.type_of(expr)?;
                self.composite(ty, elts)
            }
            ExprKind::FuncLit(lit) => self.func_lit(lit),
            ExprKind::Paren { x } => {
                self.tuple_mode = tuple;
                Ok(format!("({})", self.expr(x)?))
            }
            ExprKind::Selector { x, sel } => self.selector(x, sel),
            ExprKind::Index { x, index } => {
                let container = self.cx.package.type_of(x);
                let is_map = container
                    .and_then(|t| self.cx.types().underlying(t))
                    .is_some_and(|t| matches!(t, ResolvedType::Map { .. }));
                let is_pointer = container.is_some_and(|t| self.cx.types().is_pointer(t));
                let target = self.expr(x)?;
                let key = self.expr(index)?;
                if is_map && tuple {
                    Ok(format!("goxx::map_lookup({}, {})", target, key))
                } else if is_pointer {
                    Ok(format!("(*{})[{}]", target, key))
                } else {
                    Ok(format!("{}[{}]", target, key))
                }
            }
            ExprKind::Slice { x, low, high, max } => {
                let target = self.expr(x)?;
                let bound = |this: &mut Self, e: &Option<Box<Expr>>, absent: &str| match e {
                    Some(e) => this.expr(e),
                    None => Ok(absent.to_string()),
                };
                let low = bound(self, low, "0")?;
                let high = bound(self, high, "goxx::npos")?;
                let max = bound(self, max, "goxx::npos")?;
                Ok(format!("goxx::slice_expr({}, {}, {}, {})", target, low, high, max))
            }
            ExprKind::TypeAssert { x, ty } => {
                let target = self.cx.type_sig(self.session, *ty)?;
                let value = self.expr(x)?;
                if tuple {
                    Ok(format!("goxx::try_assert<{}>({})", target, value))
                } else {
                    Ok(format!("goxx::type_assert<{}>({})", target, value))
                }
            }
            ExprKind::Call { fun, args, ellipsis } => self.call(expr, fun, args, *ellipsis),
            ExprKind::Star { x } => Ok(format!("(*{})", self.expr(x)?)),
            ExprKind::Unary { op, x } => match op {
                UnaryOp::Neg => Ok(format!("(-{})", self.expr(x)?)),
                UnaryOp::Plus => Ok(format!("(+{})", self.expr(x)?)),
                UnaryOp::Not => Ok(format!("(!{})", self.expr(x)?)),
                UnaryOp::Xor => Ok(format!("(~{})", self.expr(x)?)),
                UnaryOp::Addr => match &x.unparen().kind {
                    ExprKind::CompositeLit { elts } => {
                        let ty = self.cx.type_of(x.unparen())?;
                        let sig = self.cx.type_sig(self.session, ty)?;
                        let value = self.composite(ty, elts)?;
                        Ok(format!("new {}({})", sig, value))
                    }
                    _ => Ok(format!("(&{})", self.expr(x)?)),
                },
                UnaryOp::Recv => {
                    let channel = self.expr(x)?;
                    if tuple {
                        Ok(format!("{}.recv_ok()", channel))
                    } else {
                        Ok(format!("{}.recv()", channel))
                    }
                }
            },
            ExprKind::Binary { op, x, y } => self.binary(*op, x, y),
            ExprKind::KeyValue { .. } => Err(CodegenError::unsupported(
                "key-value pair outside of a composite literal",
            )),
            ExprKind::TypeExpr { ty } => self.cx.type_sig(self.session, *ty),
        }
    }

    fn ident(&mut self, expr: &Expr, name: &str, obj: IdentKind) -> CodegenResult<String> {
        Ok(match obj {
            IdentKind::Nil => "nullptr".to_string(),
            IdentKind::Blank => "std::ignore".to_string(),
            IdentKind::Package => namespace_name(name),
            IdentKind::Receiver => match self.frame()?.receiver {
                Some(ReceiverMode::This) => "this".to_string(),
                Some(ReceiverMode::Deref) => "(*this)".to_string(),
                Some(ReceiverMode::Copy) => "_recv".to_string(),
                None => return Err(CodegenError::mismatch(format!("receiver `{}` outside of a method", name))),
            },
            IdentKind::Const if name == "true" || name == "false" => name.to_string(),
            IdentKind::Func if name == "main" => "_main".to_string(),
            IdentKind::TypeName => {
                let ty = self.cx.type_of(expr)?;
                self.cx.type_sig(self.session, ty)?
            }
            IdentKind::Builtin => {
                return Err(CodegenError::unsupported(format!("builtin `{}` used as a value", name)))
            }
            IdentKind::Var | IdentKind::Const | IdentKind::Func => sanitize_identifier(name),
        })
    }

    fn selector(&mut self, x: &Expr, sel: &str) -> CodegenResult<String> {
        let member = sanitize_identifier(sel);
        if let ExprKind::Ident { name, obj } = &x.unparen().kind {
            match obj {
                IdentKind::Package => return Ok(format!("{}::{}", namespace_name(name), member)),
                IdentKind::Receiver => {
                    let base = self.expr(x)?;
                    let arrow = matches!(self.frame()?.receiver, Some(ReceiverMode::This));
                    return Ok(format!("{}{}{}", base, if arrow { "->" } else { "." }, member));
                }
                _ => {}
            }
        }
        let arrow = match self.cx.package.type_of(x) {
            Some(ty) => self.cx.types().is_pointer(ty) || self.cx.translator().is_contract_pointer(ty),
            None => false,
        };
        let base = self.expr(x)?;
        Ok(format!("{}{}{}", base, if arrow { "->" } else { "." }, member))
    }

    fn binary(&mut self, op: BinaryOp, x: &Expr, y: &Expr) -> CodegenResult<String> {
        if op.is_equality() && (x.is_nil() || y.is_nil()) {
            let operand = if x.is_nil() { y } else { x };
            let operand = self.expr(operand)?;
            return Ok(if op == BinaryOp::Eql {
                format!("goxx::is_zero({})", operand)
            } else {
                format!("!goxx::is_zero({})", operand)
            });
        }
        let left = self.expr(x)?;
        let right = self.expr(y)?;
        Ok(format!("({} {} {})", left, binary_operator(op), right))
    }

    /// Composite literal of type `ty`
    fn composite(&mut self, ty: TypeId, elts: &[Expr]) -> CodegenResult<String> {
        let sig = self.cx.type_sig(self.session, ty)?;
        let underlying = self
            .cx
            .types()
            .underlying(ty)
            .ok_or_else(|| CodegenError::inconsistent(ty, "composite literal of unknown type"))?;

        match underlying {
            ResolvedType::Struct { fields } => {
                if elts.is_empty() {
                    return Ok(format!("{}{{}}", sig));
                }
                let mut assigns = Vec::with_capacity(elts.len());
                for (i, elt) in elts.iter().enumerate() {
                    let (field, value) = match &elt.kind {
                        ExprKind::KeyValue { key, value } => {
                            let name = key.ident_name().ok_or_else(|| {
                                CodegenError::mismatch("struct literal key is not a field name")
                            })?;
                            let field = fields.iter().find(|f| f.name == name).ok_or_else(|| {
                                CodegenError::inconsistent(elt.id, format!("no field `{}`", name))
                            })?;
                            (field, value.as_ref())
                        }
                        _ => {
                            let field = fields.get(i).ok_or_else(|| {
                                CodegenError::mismatch("more values than fields in struct literal")
                            })?;
                            (field, elt)
                        }
                    };
                    let value = self.convert_to(value, field.ty)?;
                    assigns.push(format!("_v.{} = {};", sanitize_identifier(&field.name), value));
                }
                Ok(format!("[&]() {{ {} _v; {} return _v; }}()", sig, assigns.join(" ")))
            }
            ResolvedType::Slice { elem } | ResolvedType::Array { elem, .. } => {
                let elem = *elem;
                let items = elts
                    .iter()
                    .map(|e| match &e.kind {
                        ExprKind::KeyValue { .. } => {
                            Err(CodegenError::unsupported("indexed slice or array literal"))
                        }
                        _ => self.element(e, elem),
                    })
                    .collect::<CodegenResult<Vec<_>>>()?;
                if matches!(underlying, ResolvedType::Array { .. }) {
                    Ok(format!("{}{{{{{}}}}}", sig, items.join(", ")))
                } else {
                    Ok(format!("{}{{{}}}", sig, items.join(", ")))
                }
            }
            ResolvedType::Map { key, elem } => {
                let (key, elem) = (*key, *elem);
                let pairs = elts
                    .iter()
                    .map(|e| match &e.kind {
                        ExprKind::KeyValue { key: k, value: v } => {
                            Ok(format!("{{{}, {}}}", self.element(k, key)?, self.element(v, elem)?))
                        }
                        _ => Err(CodegenError::mismatch("map literal element without a key")),
                    })
                    .collect::<CodegenResult<Vec<_>>>()?;
                Ok(format!("{}{{{}}}", sig, pairs.join(", ")))
            }
            ResolvedType::Pointer { elem } => {
                let elem = *elem;
                let target = self.cx.type_sig(self.session, elem)?;
                let value = self.composite(elem, elts)?;
                Ok(format!("new {}({})", target, value))
            }
            other => Err(CodegenError::unsupported(format!(
                "composite literal of {} type",
                other.kind_name()
            ))),
        }
    }

    /// Element of a composite literal; elided literal types come from `ty`
    fn element(&mut self, expr: &Expr, ty: TypeId) -> CodegenResult<String> {
        match &expr.kind {
            ExprKind::CompositeLit { elts } if self.cx.package.type_of(expr).is_none() => {
                self.composite(ty, elts)
            }
            _ => self.convert_to(expr, ty),
        }
    }

    fn func_lit(&mut self, lit: &FuncLit) -> CodegenResult<String> {
        let translator = self.cx.translator();
        let sig = translator.signature(lit.sig)?;
        let rendered = translator.function_sig(self.session, sig)?;
        let receiver = self.frame()?.receiver;
        let frame = self.make_frame(lit.sig, receiver, &lit.escapes)?;

        let level = self.out.level();
        let width = self.out.width();
        let outer_out = std::mem::replace(&mut self.out, CppEmitter::with_level(width, level + 1));
        let outer_breaks = std::mem::take(&mut self.breaks);
        let outer_fallthrough = self.fallthrough.take();
        self.frames.push(frame);

        let inner = lit.body.scope.filter(|s| *s != lit.scope);
        let result = self
            .emit_prologue(Some(lit.scope), &lit.body.stmts, true)
            .and_then(|_| self.emit_prologue(inner, &[], false))
            .and_then(|_| self.emit_stmts(&lit.body.stmts));

        self.frames.pop();
        self.fallthrough = outer_fallthrough;
        self.breaks = outer_breaks;
        let body = std::mem::replace(&mut self.out, outer_out).finish();
        result?;

        Ok(format!(
            "[&]({}) -> {} {{\n{}{}}}",
            rendered.params_decl(),
            rendered.result,
            body,
            self.out.padding()
        ))
    }

    fn call(&mut self, call: &Expr, fun: &Expr, args: &[Expr], ellipsis: bool) -> CodegenResult<String> {
        let callee = fun.unparen();
        match &callee.kind {
            ExprKind::Ident {
                name,
                obj: IdentKind::Builtin,
            } => return self.builtin(call, name, args, ellipsis),
            ExprKind::TypeExpr { ty } => return self.conversion(*ty, args),
            ExprKind::Ident {
                obj: IdentKind::TypeName,
                ..
            } => {
                let ty = self.cx.type_of(callee)?;
                return self.conversion(ty, args);
            }
            _ => {}
        }

        let signature = self
            .cx
            .package
            .type_of(fun)
            .and_then(|t| self.cx.types().signature(t))
            .cloned();
        let function = self.expr(fun)?;

        // f(g()) where g returns every argument f takes
        if let (Some(sig), [single]) = (&signature, args) {
            if sig.params.len() > 1 && !sig.variadic {
                let values = self.expr(single)?;
                return Ok(format!(
                    "std::apply([&](auto &&...args) {{ return {}(args...); }}, {})",
                    function, values
                ));
            }
        }

        let args = match &signature {
            Some(sig) => self.call_args(sig, args, ellipsis)?,
            None => args
                .iter()
                .map(|a| self.expr(a))
                .collect::<CodegenResult<Vec<_>>>()?,
        };
        Ok(format!("{}({})", function, args.join(", ")))
    }

    fn call_args(&mut self, sig: &Signature, args: &[Expr], ellipsis: bool) -> CodegenResult<Vec<String>> {
        let fixed = if sig.variadic {
            sig.params.len().saturating_sub(1)
        } else {
            sig.params.len()
        };
        let mut rendered = Vec::with_capacity(args.len());
        for (arg, param) in args.iter().zip(sig.params.iter()).take(fixed) {
            rendered.push(self.convert_to(arg, param.ty)?);
        }
        if !sig.variadic {
            return Ok(rendered);
        }

        let Some(last) = sig.params.last() else {
            return Ok(rendered);
        };
        let rest = &args[fixed.min(args.len())..];
        if ellipsis {
            for arg in rest {
                rendered.push(self.expr(arg)?);
            }
            return Ok(rendered);
        }
        let elem = match self.cx.types().underlying(last.ty) {
            Some(ResolvedType::Slice { elem }) => *elem,
            _ => return Err(CodegenError::inconsistent(last.ty, "variadic parameter is not a slice")),
        };
        let slice = self.cx.type_sig(self.session, last.ty)?;
        let items = rest
            .iter()
            .map(|a| self.convert_to(a, elem))
            .collect::<CodegenResult<Vec<_>>>()?;
        rendered.push(format!("{}{{{}}}", slice, items.join(", ")));
        Ok(rendered)
    }

    fn conversion(&mut self, target: TypeId, args: &[Expr]) -> CodegenResult<String> {
        let [value] = args else {
            return Err(CodegenError::mismatch("conversion takes exactly one value"));
        };
        let types = self.cx.types();
        if types.is_interface(target) {
            return self.convert_to(value, target);
        }
        let sig = self.cx.type_sig(self.session, target)?;
        let value = self.expr(value)?;
        if is_simple_type_name(&sig) {
            Ok(format!("{}({})", sig, value))
        } else {
            Ok(format!("static_cast<{}>({})", sig, value))
        }
    }

    /// Render `expr` for a destination of type `target`, boxing into
    /// interfaces where the destination requires it
    pub(crate) fn convert_to(&mut self, expr: &Expr, target: TypeId) -> CodegenResult<String> {
        let translator = self.cx.translator();
        let types = self.cx.types();

        if expr.is_nil() {
            if !translator.nil_val(target)?.is_empty() || translator.is_contract_pointer(target) {
                return Ok("nullptr".to_string());
            }
            return translator.zero_expr(self.session, target);
        }

        let Some(source) = self.cx.package.type_of(expr) else {
            return self.expr(expr);
        };
        if source == target || !types.is_interface(target) {
            return self.expr(expr);
        }

        let target_is_error = types.named(target).is_some_and(|n| n.is_error());
        if types.is_empty_interface(target) {
            return self.box_any(expr);
        }
        if target_is_error {
            if types.named(source).is_some_and(|n| n.is_error()) {
                return self.expr(expr);
            }
            let value = self.expr(expr)?;
            return Ok(format!("goxx::make_error({})", value));
        }

        // A named contract, held through a pointer.
        let target_sig = translator.type_sig(self.session, target)?;
        let value = self.expr(expr)?;
        if translator.is_contract_pointer(source) {
            return Ok(format!("dynamic_cast<{}>({})", target_sig, value));
        }
        if types.is_pointer(source) {
            return Ok(value);
        }
        let source_sig = translator.type_sig(self.session, source)?;
        Ok(format!("new {}({})", source_sig, value))
    }

    /// Box a value into `goxx::interface`, carrying its concrete type
    fn box_any(&mut self, expr: &Expr) -> CodegenResult<String> {
        let translator = self.cx.translator();
        let source = match self.cx.package.type_of(expr) {
            Some(source) if !translator.types().is_empty_interface(source) => source,
            _ => return self.expr(expr),
        };
        let source_sig = translator.type_sig(self.session, source)?;
        let value = self.expr(expr)?;
        Ok(format!("goxx::make_iface<{}>({})", source_sig, value))
    }

    fn builtin(&mut self, call: &Expr, name: &str, args: &[Expr], ellipsis: bool) -> CodegenResult<String> {
        let rendered = |this: &mut Self, args: &[Expr]| -> CodegenResult<String> {
            Ok(args
                .iter()
                .map(|a| this.expr(a))
                .collect::<CodegenResult<Vec<_>>>()?
                .join(", "))
        };
        match name {
            "len" | "cap" | "copy" | "close" | "print" | "println" | "min" | "max" | "clear" => {
                Ok(format!("goxx::{}({})", name, rendered(self, args)?))
            }
            "append" if ellipsis => Ok(format!("goxx::append_all({})", rendered(self, args)?)),
            "append" => {
                let Some((slice, items)) = args.split_first() else {
                    return Err(CodegenError::mismatch("append without a slice"));
                };
                let elem = self
                    .cx
                    .package
                    .type_of(slice)
                    .and_then(|t| match self.cx.types().underlying(t) {
                        Some(ResolvedType::Slice { elem }) => Some(*elem),
                        _ => None,
                    });
                let mut parts = vec![self.expr(slice)?];
                for item in items {
                    parts.push(match elem {
                        Some(elem) => self.convert_to(item, elem)?,
                        None => self.expr(item)?,
                    });
                }
                Ok(format!("goxx::append({})", parts.join(", ")))
            }
            "make" => {
                let Some((ty, sizes)) = args.split_first() else {
                    return Err(CodegenError::mismatch("make without a type"));
                };
                let ty = self.expr(ty)?;
                Ok(format!("goxx::make<{}>({})", ty, rendered(self, sizes)?))
            }
            "new" => {
                let [ty] = args else {
                    return Err(CodegenError::mismatch("new takes exactly one type"));
                };
                Ok(format!("new {}()", self.expr(ty)?))
            }
            "delete" => Ok(format!("goxx::remove({})", rendered(self, args)?)),
            "panic" => {
                let [value] = args else {
                    return Err(CodegenError::mismatch("panic takes exactly one value"));
                };
                Ok(format!("goxx::panic({})", self.box_any(value)?))
            }
            // Panics unwind through `goxx::defer` destructors, which cannot stop them.
            "recover" => Err(CodegenError::unsupported("builtin `recover`")),
            "complex" | "real" | "imag" => Err(CodegenError::unsupported(format!("complex builtin `{}`", name))),
            other => Err(CodegenError::unsupported(format!(
                "builtin `{}` at {}",
                other, call.id
            ))),
        }
    }
}
