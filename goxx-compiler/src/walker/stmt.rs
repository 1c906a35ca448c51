//! Statement lowering

use super::{BreakTarget, FunctionEmitter};
use crate::error::{CodegenError, CodegenResult};
use crate::scope::defer_push;
use crate::utils::sanitize_identifier;
use goxx_ast::{AssignOp, Block, BranchKind, Expr, ExprKind, ResolvedType, ScopeId, Stmt, UnaryOp};

impl FunctionEmitter<'_, '_> {
    pub(crate) fn emit_stmts(&mut self, stmts: &[Stmt]) -> CodegenResult<()> {
        for stmt in stmts {
            self.emit_stmt(stmt)?;
        }
        Ok(())
    }

    pub(crate) fn emit_stmt(&mut self, stmt: &Stmt) -> CodegenResult<()> {
        match stmt {
            Stmt::Empty => Ok(()),
            Stmt::Expr { x } => {
                let text = self.expr(x)?;
                self.out.emit_line(&format!("{};", text));
                Ok(())
            }
            Stmt::IncDec { x, inc } => {
                let text = self.expr(x)?;
                self.out
                    .emit_line(&format!("{}{};", text, if *inc { "++" } else { "--" }));
                Ok(())
            }
            Stmt::Assign { lhs, op, rhs } => {
                let line = self.assignment(lhs, *op, rhs)?;
                self.out.emit_line(&format!("{};", line));
                Ok(())
            }
            Stmt::Decl { specs } => {
                for spec in specs.iter().filter(|s| !s.is_const && !s.values.is_empty()) {
                    let line = self.assignment(&spec.names, AssignOp::Define, &spec.values)?;
                    self.out.emit_line(&format!("{};", line));
                }
                Ok(())
            }
            Stmt::Return { results } => self.emit_return(results),
            Stmt::Block(block) => {
                self.out.emit_line("{");
                self.out.indent();
                self.emit_block_contents(block)?;
                self.out.dedent();
                self.out.emit_line("}");
                Ok(())
            }
            Stmt::If { .. } => {
                self.emit_if(stmt, false)?;
                Ok(())
            }
            Stmt::For {
                init,
                cond,
                post,
                body,
                scope,
            } => self.emit_for(init.as_deref(), cond.as_ref(), post.as_deref(), body, *scope),
            Stmt::Range {
                key,
                value,
                x,
                body,
                scope,
                ..
            } => self.emit_range(key.as_ref(), value.as_ref(), x, body, *scope),
            Stmt::Switch {
                init,
                tag,
                clauses,
                scope,
            } => self.emit_switch(init.as_deref(), tag.as_ref(), clauses, *scope),
            Stmt::TypeSwitch { .. } => Err(CodegenError::unsupported("type switch")),
            Stmt::Select => Err(CodegenError::unsupported("select statement")),
            Stmt::Defer { call } => {
                let call = self.expr(call)?;
                self.out.emit_line(&defer_push(&call));
                Ok(())
            }
            Stmt::Go { call } => {
                let call = self.expr(call)?;
                self.out
                    .emit_line(&format!("goxx::go([=]() mutable {{ {}; }});", call));
                Ok(())
            }
            Stmt::Send { chan, value } => {
                let channel = self.expr(chan)?;
                let elem = match self.cx.package.type_of(chan).and_then(|t| self.cx.types().underlying(t)) {
                    Some(ResolvedType::Chan { elem, .. }) => Some(*elem),
                    _ => None,
                };
                let value = match elem {
                    Some(elem) => self.convert_to(value, elem)?,
                    None => self.expr(value)?,
                };
                self.out.emit_line(&format!("{}.send({});", channel, value));
                Ok(())
            }
            Stmt::Labeled { label, stmt } => {
                self.out.emit_label(&sanitize_identifier(label));
                self.emit_stmt(stmt)
            }
            Stmt::Branch { tok, label } => self.emit_branch(*tok, label.as_deref()),
        }
    }

    /// Declarations of a block's own scope followed by its statements
    pub(crate) fn emit_block_contents(&mut self, block: &Block) -> CodegenResult<()> {
        self.emit_prologue(block.scope, &[], false)?;
        self.emit_stmts(&block.stmts)
    }

    /// Open a `{` when a statement's own scope declares anything
    pub(crate) fn open_scope(&mut self, scope: ScopeId, force: bool) -> CodegenResult<bool> {
        if !self.scope_declares(scope)? && !force {
            return Ok(false);
        }
        self.out.emit_line("{");
        self.out.indent();
        self.emit_prologue(Some(scope), &[], false)?;
        Ok(true)
    }

    pub(crate) fn close_scope(&mut self, opened: bool) {
        if opened {
            self.out.dedent();
            self.out.emit_line("}");
        }
    }

    fn emit_if(&mut self, stmt: &Stmt, chained: bool) -> CodegenResult<()> {
        let Stmt::If {
            init,
            cond,
            then,
            els,
            scope,
        } = stmt
        else {
            return self.emit_stmt(stmt);
        };

        let opened = self.open_scope(*scope, init.is_some())?;
        if let Some(init) = init {
            self.emit_stmt(init)?;
        }
        let cond = self.expr(cond)?;
        if chained {
            self.out.dedent();
            self.out.emit_line(&format!("}} else if ({}) {{", cond));
        } else {
            self.out.emit_line(&format!("if ({}) {{", cond));
        }
        self.out.indent();
        self.emit_block_contents(then)?;

        match els.as_deref() {
            None => {}
            Some(Stmt::Block(block)) => {
                self.out.dedent();
                self.out.emit_line("} else {");
                self.out.indent();
                self.emit_block_contents(block)?;
            }
            Some(nested @ Stmt::If { init: None, scope, .. }) if !self.scope_declares(*scope)? => {
                self.emit_if(nested, true)?;
            }
            Some(other) => {
                self.out.dedent();
                self.out.emit_line("} else {");
                self.out.indent();
                self.emit_stmt(other)?;
            }
        }

        // A chained `else if` is closed by the `if` that started the chain.
        if !chained {
            self.out.dedent();
            self.out.emit_line("}");
        }
        self.close_scope(opened);
        Ok(())
    }

    fn scope_declares(&self, scope: ScopeId) -> CodegenResult<bool> {
        Ok(self
            .cx
            .scope(scope)?
            .bindings
            .iter()
            .any(|b| b.is_block_local()))
    }

    fn emit_for(
        &mut self,
        init: Option<&Stmt>,
        cond: Option<&Expr>,
        post: Option<&Stmt>,
        body: &Block,
        scope: ScopeId,
    ) -> CodegenResult<()> {
        let opened = self.open_scope(scope, init.is_some())?;
        if let Some(init) = init {
            self.emit_stmt(init)?;
        }
        let cond = match cond {
            Some(cond) => self.expr(cond)?,
            None => String::new(),
        };
        let post = match post {
            Some(post) => self.simple_stmt(post)?,
            None => String::new(),
        };
        let head = if cond.is_empty() && post.is_empty() {
            "for (;;) {".to_string()
        } else if post.is_empty() {
            format!("for (; {};) {{", cond)
        } else {
            format!("for (; {}; {}) {{", cond, post)
        };
        self.out.emit_line(&head);
        self.emit_loop_body(body)?;
        self.close_scope(opened);
        Ok(())
    }

    fn emit_loop_body(&mut self, body: &Block) -> CodegenResult<()> {
        self.out.indent();
        self.breaks.push(BreakTarget::Loop);
        let result = self.emit_block_contents(body);
        self.breaks.pop();
        result?;
        self.out.dedent();
        self.out.emit_line("}");
        Ok(())
    }

    /// Statement rendered without its trailing `;`, for `for` post clauses
    fn simple_stmt(&mut self, stmt: &Stmt) -> CodegenResult<String> {
        match stmt {
            Stmt::IncDec { x, inc } => {
                let text = self.expr(x)?;
                Ok(format!("{}{}", text, if *inc { "++" } else { "--" }))
            }
            Stmt::Assign { lhs, op, rhs } => self.assignment(lhs, *op, rhs),
            Stmt::Expr { x } => self.expr(x),
            _ => Err(CodegenError::unsupported("loop post statement")),
        }
    }

    fn emit_range(
        &mut self,
        key: Option<&Expr>,
        value: Option<&Expr>,
        x: &Expr,
        body: &Block,
        scope: ScopeId,
    ) -> CodegenResult<()> {
        let key = key.filter(|k| !k.is_blank());
        let value = value.filter(|v| !v.is_blank());
        let flavor = match (key.is_some(), value.is_some()) {
            (true, true) => "range_key_value",
            (true, false) => "range_key",
            (false, true) => "range_value",
            (false, false) => "range_void",
        };

        let opened = self.open_scope(scope, false)?;
        let source = self.expr(x)?;
        let item = self.session.fresh_ident();
        self.out
            .emit_line(&format!("for (auto {} : goxx::{}({})) {{", item, flavor, source));
        self.out.indent();
        match (key, value) {
            (Some(k), Some(v)) => {
                let (k, v) = (self.expr(k)?, self.expr(v)?);
                self.out
                    .emit_line(&format!("std::tie({}, {}) = {};", k, v, item));
            }
            (Some(bound), None) | (None, Some(bound)) => {
                let bound = self.expr(bound)?;
                self.out.emit_line(&format!("{} = {};", bound, item));
            }
            (None, None) => self.out.emit_line(&format!("(void){};", item)),
        }
        self.out.dedent();
        self.emit_loop_body(body)?;
        self.close_scope(opened);
        Ok(())
    }

    fn emit_return(&mut self, results: &[Expr]) -> CodegenResult<()> {
        let frame = self.frame()?.clone();
        match (results, frame.results.len()) {
            ([], 0) => self.out.emit_line("return;"),
            ([], 1) if frame.named_results.len() == 1 => {
                self.out
                    .emit_line(&format!("return {};", frame.named_results[0]));
            }
            ([], _) if !frame.named_results.is_empty() => {
                self.out.emit_line(&format!(
                    "return {}({});",
                    frame.result_type,
                    frame.named_results.join(", ")
                ));
            }
            ([single], 1) => {
                let value = self.convert_to(single, frame.results[0].ty)?;
                self.out.emit_line(&format!("return {};", value));
            }
            ([single], _) => {
                // A call forwarding all of its results.
                let value = self.expr(single)?;
                self.out.emit_line(&format!("return {};", value));
            }
            (many, n) if many.len() == n => {
                let values = many
                    .iter()
                    .zip(frame.results.iter())
                    .map(|(e, p)| self.convert_to(e, p.ty))
                    .collect::<CodegenResult<Vec<_>>>()?;
                self.out.emit_line(&format!(
                    "return {}({});",
                    frame.result_type,
                    values.join(", ")
                ));
            }
            (many, n) => {
                return Err(CodegenError::mismatch(format!(
                    "return of {} values from a function with {} results",
                    many.len(),
                    n
                )))
            }
        }
        Ok(())
    }

    fn emit_branch(&mut self, tok: BranchKind, label: Option<&str>) -> CodegenResult<()> {
        match (tok, label) {
            (BranchKind::Goto, Some(label)) => {
                self.out
                    .emit_line(&format!("goto {};", sanitize_identifier(label)));
            }
            (BranchKind::Goto, None) => return Err(CodegenError::mismatch("goto without a label")),
            (BranchKind::Break | BranchKind::Continue, Some(label)) => {
                let word = if tok == BranchKind::Break { "break" } else { "continue" };
                return Err(CodegenError::unsupported(format!("labeled {} to `{}`", word, label)));
            }
            (BranchKind::Continue, None) => self.out.emit_line("continue;"),
            (BranchKind::Break, None) => match self.breaks.last_mut() {
                Some(BreakTarget::Switch { label, used }) => {
                    *used = true;
                    let line = format!("goto {};", label);
                    self.out.emit_line(&line);
                }
                Some(BreakTarget::Loop) => self.out.emit_line("break;"),
                None => return Err(CodegenError::mismatch("break outside of a loop or switch")),
            },
            (BranchKind::Fallthrough, _) => {
                let target = self
                    .fallthrough
                    .take()
                    .ok_or_else(|| CodegenError::mismatch("fallthrough without a following clause"))?;
                self.out.emit_line(&format!("goto {};", target));
            }
        }
        Ok(())
    }

    /// One assignment without its trailing `;`
    pub(crate) fn assignment(&mut self, lhs: &[Expr], op: AssignOp, rhs: &[Expr]) -> CodegenResult<String> {
        if let Some(compound) = compound_operator(op) {
            let (target, value) = match (lhs, rhs) {
                ([target], [value]) => (target, value),
                _ => return Err(CodegenError::mismatch("compound assignment needs one operand per side")),
            };
            let target = self.expr(target)?;
            let value = self.expr(value)?;
            return Ok(if op == AssignOp::AndNot {
                format!("{} &= ~({})", target, value)
            } else {
                format!("{} {} {}", target, compound, value)
            });
        }

        match (lhs, rhs) {
            ([target], [value]) => {
                if target.is_blank() {
                    let value = self.expr(value)?;
                    return Ok(format!("(void)({})", value));
                }
                let value = match self.cx.package.type_of(target) {
                    Some(ty) => self.convert_to(value, ty)?,
                    None => self.expr(value)?,
                };
                let target = self.expr(target)?;
                Ok(format!("{} = {}", target, value))
            }
            (targets, [value]) if is_tuple_source(value) => {
                let targets = self.tie_targets(targets)?;
                self.tuple_mode = true;
                let value = self.expr(value)?;
                Ok(format!("std::tie({}) = {}", targets, value))
            }
            (targets, values) if targets.len() == values.len() => {
                let values = targets
                    .iter()
                    .zip(values.iter())
                    .map(|(t, v)| match self.cx.package.type_of(t) {
                        Some(ty) if !t.is_blank() => self.convert_to(v, ty),
                        _ => self.expr(v),
                    })
                    .collect::<CodegenResult<Vec<_>>>()?;
                let targets = self.tie_targets(targets)?;
                Ok(format!(
                    "std::tie({}) = std::make_tuple({})",
                    targets,
                    values.join(", ")
                ))
            }
            (targets, values) => Err(CodegenError::mismatch(format!(
                "{} targets assigned from {} values",
                targets.len(),
                values.len()
            ))),
        }
    }

    fn tie_targets(&mut self, targets: &[Expr]) -> CodegenResult<String> {
        Ok(targets
            .iter()
            .map(|t| {
                if t.is_blank() {
                    Ok("std::ignore".to_string())
                } else {
                    self.expr(t)
                }
            })
            .collect::<CodegenResult<Vec<_>>>()?
            .join(", "))
    }
}

fn compound_operator(op: AssignOp) -> Option<&'static str> {
    Some(match op {
        AssignOp::Assign | AssignOp::Define => return None,
        AssignOp::Add => "+=",
        AssignOp::Sub => "-=",
        AssignOp::Mul => "*=",
        AssignOp::Quo => "/=",
        AssignOp::Rem => "%=",
        AssignOp::And => "&=",
        AssignOp::Or => "|=",
        AssignOp::Xor => "^=",
        AssignOp::Shl => "<<=",
        AssignOp::Shr => ">>=",
        AssignOp::AndNot => "&=",
    })
}

/// Expressions that produce several values for one assignment
fn is_tuple_source(expr: &Expr) -> bool {
    match &expr.unparen().kind {
        ExprKind::Call { .. } | ExprKind::TypeAssert { .. } | ExprKind::Index { .. } => true,
        ExprKind::Unary { op: UnaryOp::Recv, .. } => true,
        _ => false,
    }
}
