use super::{AdvancedTypeChecker, CheckReport};
use crate::advanced::dependent::DependencyKind;
use crate::advanced::DependentType;
use crate::ast::Expr;
use crate::diagnostics::ErrorKind;

impl AdvancedTypeChecker {
    /// Every sub-check runs; each failure adds its own error.
    pub(super) fn check_dependent(&mut self, expr: &Expr, t: &DependentType, report: &mut CheckReport) {
        let var = t.dependency.variable.as_str();
        if !var.is_empty() {
            let resolved = match t.dependency.kind {
                DependencyKind::Value => {
                    self.env.contains(var) || expr.identifiers().contains(&var)
                }
                DependencyKind::Index => t.indices.iter().any(|i| i.name == var),
                DependencyKind::Type => t.constructor.params.iter().any(|p| p.name == var),
            };
            if !resolved {
                report.diags.error(
                    ErrorKind::DependencyMismatch,
                    format!("`{}` depends on `{}`, which is not in scope", t.display_name(), var),
                );
            }
        }

        t.validate(self.config.max_universe_level, &mut report.diags);
    }
}
