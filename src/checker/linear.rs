use super::{AdvancedTypeChecker, CheckReport};
use crate::advanced::linear::{AccessPermissions, LinearConstraintKind};
use crate::advanced::LinearType;
use crate::ast::Expr;
use crate::diagnostics::ErrorKind;

impl AdvancedTypeChecker {
    pub(super) fn check_linear(&mut self, expr: &Expr, t: &LinearType, report: &mut CheckReport) {
        // Multiplicity shape, lifetime and constraint shape
        t.validate(&mut report.diags);

        let idents = expr.resource_uses();
        let referenced: Vec<&str> = idents
            .iter()
            .copied()
            .filter(|name| self.ctx.linearity.is_tracked(name))
            .collect();

        // Uses of tracked resources were recorded when the check started;
        // a freshly produced value counts as one use.
        let usage = referenced
            .iter()
            .map(|name| self.ctx.linearity.count(name))
            .max()
            .unwrap_or(1);
        if t.multiplicity.is_well_formed() {
            if usage < t.multiplicity.min {
                report.diags.error(
                    ErrorKind::LinearityViolation,
                    format!(
                        "{} value used {} time(s), fewer than the required {}",
                        t.usage, usage, t.multiplicity
                    ),
                );
            } else if referenced.is_empty() && !t.multiplicity.admits(usage) {
                report.diags.error(
                    ErrorKind::LinearityViolation,
                    format!("{} value cannot be used within {}", t.usage, t.multiplicity),
                );
            }
        }

        let moved = expr.moved_identifiers();
        for constraint in &t.constraints {
            let resource = constraint.resource.as_str();
            let violated = match constraint.kind {
                LinearConstraintKind::Consume => self.ctx.linearity.count(resource) == 0,
                LinearConstraintKind::NoAlias => idents.iter().filter(|n| **n == resource).count() > 1,
                LinearConstraintKind::Borrow => moved.contains(&resource),
                LinearConstraintKind::NoEscape => expr.captures(resource),
            };
            if violated {
                report.diags.error(
                    ErrorKind::LinearityViolation,
                    format!("constraint {} is violated", constraint),
                );
            }
        }

        let required = expr
            .regions_used()
            .iter()
            .filter(|access| access.region == t.region.name)
            .fold(AccessPermissions::none(), |acc, access| {
                acc.union(AccessPermissions::from_access(access.access))
            });
        let missing = t.region.permissions.missing(&required);
        if !missing.is_empty() {
            report.diags.error(
                ErrorKind::CapabilityInsufficient,
                format!(
                    "region `{}` does not grant {} permission",
                    t.region.name,
                    missing.join(", ")
                ),
            );
        }
    }
}
