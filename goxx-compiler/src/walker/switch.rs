//! Switch lowering
//!
//! An expression switch becomes an `if` / `else if` cascade. The default
//! clause always comes last, wherever it sits in the source. A clause that
//! is the target of a `fallthrough` starts with a synthesized label, and the
//! `fallthrough` itself becomes a `goto` to it. `break` jumps to a label
//! placed after the cascade, since a C++ `break` would leave the enclosing
//! loop instead.

use super::{BreakTarget, FunctionEmitter};
use crate::error::CodegenResult;
use crate::session::Session;
use goxx_ast::{CaseClause, Expr, ExprKind, ScopeId, Stmt};

/// One clause in emission order
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchArm {
    /// Index of the clause in source order
    pub clause: usize,
    pub is_default: bool,
    /// Label opening the body, present on fallthrough targets only
    pub label: Option<String>,
    /// Clause entered by this clause's trailing `fallthrough`
    pub falls_into: Option<usize>,
}

/// Emission order and jump targets of a switch
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchPlan {
    pub arms: Vec<SwitchArm>,
}

impl SwitchPlan {
    pub fn new(clauses: &[CaseClause], session: &mut Session) -> Self {
        let count = clauses.len();
        let falls_into: Vec<Option<usize>> = clauses
            .iter()
            .enumerate()
            .map(|(i, c)| (c.ends_in_fallthrough() && i + 1 < count).then_some(i + 1))
            .collect();
        let labels: Vec<Option<String>> = (0..count)
            .map(|i| falls_into.contains(&Some(i)).then(|| session.fresh_label()))
            .collect();

        let arm = |i: usize| SwitchArm {
            clause: i,
            is_default: clauses[i].is_default(),
            label: labels[i].clone(),
            falls_into: falls_into[i],
        };
        let arms = (0..count)
            .filter(|&i| !clauses[i].is_default())
            .chain((0..count).filter(|&i| clauses[i].is_default()))
            .map(arm)
            .collect();
        Self { arms }
    }

    pub fn arm(&self, clause: usize) -> Option<&SwitchArm> {
        self.arms.iter().find(|a| a.clause == clause)
    }

    pub fn default_arm(&self) -> Option<&SwitchArm> {
        self.arms.iter().find(|a| a.is_default)
    }

    /// Clauses the lowered cascade runs, in order, given which case clauses
    /// have a matching value
    pub fn trace(&self, matches: impl Fn(usize) -> bool) -> Vec<usize> {
        let entry = self
            .arms
            .iter()
            .find(|a| !a.is_default && matches(a.clause))
            .or_else(|| self.default_arm());
        let mut executed = Vec::new();
        let mut current = entry;
        while let Some(arm) = current {
            executed.push(arm.clause);
            current = arm.falls_into.and_then(|next| self.arm(next));
        }
        executed
    }
}

/// Tags that can be compared repeatedly without re-evaluation
fn is_trivial_tag(tag: &Expr) -> bool {
    matches!(
        tag.unparen().kind,
        ExprKind::Ident { .. } | ExprKind::BasicLit { .. }
    )
}

impl FunctionEmitter<'_, '_> {
    pub(crate) fn emit_switch(
        &mut self,
        init: Option<&Stmt>,
        tag: Option<&Expr>,
        clauses: &[CaseClause],
        scope: ScopeId,
    ) -> CodegenResult<()> {
        self.out.emit_line("{");
        self.out.indent();
        self.emit_prologue(Some(scope), &[], false)?;
        if let Some(init) = init {
            self.emit_stmt(init)?;
        }

        let tag = match tag {
            Some(tag) if is_trivial_tag(tag) => Some(self.expr(tag)?),
            Some(tag) => {
                let value = self.expr(tag)?;
                let temp = self.session.fresh_ident();
                self.out.emit_line(&format!("auto {} = {};", temp, value));
                Some(temp)
            }
            None => None,
        };

        let plan = SwitchPlan::new(clauses, self.session);
        let end = self.session.fresh_label();
        let outer_fallthrough = self.fallthrough.take();
        self.breaks.push(BreakTarget::Switch {
            label: end.clone(),
            used: false,
        });

        let result = self.emit_arms(&plan, clauses, tag.as_deref());

        let used = matches!(self.breaks.pop(), Some(BreakTarget::Switch { used: true, .. }));
        self.fallthrough = outer_fallthrough;
        result?;
        if used {
            self.out.emit_label(&end);
        }
        self.out.dedent();
        self.out.emit_line("}");
        Ok(())
    }

    fn emit_arms(&mut self, plan: &SwitchPlan, clauses: &[CaseClause], tag: Option<&str>) -> CodegenResult<()> {
        for (position, arm) in plan.arms.iter().enumerate() {
            let clause = &clauses[arm.clause];
            let head = match &clause.values {
                None => None,
                Some(values) => Some(self.case_condition(tag, values)?),
            };
            let line = match (position, head) {
                (0, Some(cond)) => format!("if ({}) {{", cond),
                (0, None) => "{".to_string(),
                (_, Some(cond)) => format!("}} else if ({}) {{", cond),
                (_, None) => "} else {".to_string(),
            };
            if position > 0 {
                self.out.dedent();
            }
            self.out.emit_line(&line);
            self.out.indent();

            if let Some(label) = &arm.label {
                self.out.emit_label(label);
            }
            self.emit_prologue(Some(clause.scope), &[], false)?;
            self.fallthrough = arm
                .falls_into
                .and_then(|next| plan.arm(next))
                .and_then(|target| target.label.clone());
            self.emit_stmts(&clause.body)?;
            self.fallthrough = None;
        }
        if !plan.arms.is_empty() {
            self.out.dedent();
            self.out.emit_line("}");
        }
        Ok(())
    }

    fn case_condition(&mut self, tag: Option<&str>, values: &[Expr]) -> CodegenResult<String> {
        if values.is_empty() {
            return Ok("false".to_string());
        }
        let tests = values
            .iter()
            .map(|value| match tag {
                Some(tag) if value.is_nil() => Ok(format!("goxx::is_zero({})", tag)),
                Some(tag) => Ok(format!("{} == {}", tag, self.expr(value)?)),
                None => self.expr(value),
            })
            .collect::<CodegenResult<Vec<_>>>()?;
        if tests.len() == 1 {
            return Ok(tests.join(""));
        }
        Ok(tests
            .iter()
            .map(|t| format!("({})", t))
            .collect::<Vec<_>>()
            .join(" || "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goxx_ast::BranchKind;

    fn clause(values: Option<usize>, fallthrough: bool, scope: u32) -> CaseClause {
        let mut body = vec![Stmt::Empty];
        if fallthrough {
            body.push(Stmt::Branch {
                tok: BranchKind::Fallthrough,
                label: None,
            });
        }
        CaseClause {
            values: values.map(|_| Vec::new()),
            body,
            scope: ScopeId(scope),
        }
    }

    #[test]
    fn test_default_last_and_fallthrough_runs_next_clause() {
        // case 1: A; fallthrough / case 2: B / default: C
        let clauses = vec![
            clause(Some(1), true, 0),
            clause(Some(2), false, 1),
            clause(None, false, 2),
        ];
        let mut session = Session::new();
        let plan = SwitchPlan::new(&clauses, &mut session);

        let order: Vec<usize> = plan.arms.iter().map(|a| a.clause).collect();
        assert_eq!(order, vec![0, 1, 2]);
        assert!(plan.arms[1].label.is_some());
        assert!(plan.arms[0].label.is_none());

        let case_values = [Some(1), Some(2), None];
        let run = |tag: i64| plan.trace(|i| case_values[i] == Some(tag));
        assert_eq!(run(1), vec![0, 1]);
        assert_eq!(run(2), vec![1]);
        assert_eq!(run(3), vec![2]);
    }

    #[test]
    fn test_default_in_source_middle_is_emitted_last() {
        // default: C / case 1: A; fallthrough / case 2: B
        let clauses = vec![
            clause(None, false, 0),
            clause(Some(1), true, 1),
            clause(Some(2), false, 2),
        ];
        let mut session = Session::new();
        let plan = SwitchPlan::new(&clauses, &mut session);

        let order: Vec<usize> = plan.arms.iter().map(|a| a.clause).collect();
        assert_eq!(order, vec![1, 2, 0]);

        let case_values = [None, Some(1), Some(2)];
        let run = |tag: i64| plan.trace(|i| case_values[i] == Some(tag));
        assert_eq!(run(1), vec![1, 2]);
        assert_eq!(run(3), vec![0]);
    }

    #[test]
    fn test_fallthrough_into_default() {
        let clauses = vec![clause(Some(1), true, 0), clause(None, false, 1)];
        let mut session = Session::new();
        let plan = SwitchPlan::new(&clauses, &mut session);

        assert!(plan.default_arm().and_then(|a| a.label.as_ref()).is_some());
        assert_eq!(plan.trace(|i| i == 0), vec![0, 1]);
        assert_eq!(plan.trace(|_| false), vec![1]);
    }

    #[test]
    fn test_no_default_and_no_match_runs_nothing() {
        let clauses = vec![clause(Some(1), false, 0)];
        let mut session = Session::new();
        let plan = SwitchPlan::new(&clauses, &mut session);
        assert!(plan.trace(|_| false).is_empty());
    }
}
