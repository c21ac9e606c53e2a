use tracing::debug;

use super::{AdvancedTypeChecker, CheckReport};
use crate::advanced::RefinementType;
use crate::ast::Expr;
use crate::diagnostics::{ErrorKind, WarningKind};
use crate::proof::ProofStatus;
use crate::types::{TypeConstraint, TypeKind};

impl AdvancedTypeChecker {
    pub(super) fn check_refinement(&mut self, expr: &Expr, t: &RefinementType, report: &mut CheckReport) {
        // A malformed base stops the refinement check here
        let mut base = CheckReport::new(expr.span);
        if *t.base.kind() == TypeKind::Invalid {
            base.diags.error(ErrorKind::KindMismatch, "refinement of an invalid base type");
        } else if t.base.is_advanced() {
            self.check_inferred(expr, &t.base, None, &mut base);
        }
        let base_failed = base.diags.has_errors();
        report.absorb(base);
        if base_failed {
            return;
        }

        let idents = expr.identifiers();
        let env = &self.env;
        t.check_predicates(
            |name| env.contains(name) || idents.contains(&name),
            &mut report.diags,
        );

        match t.proof.status {
            ProofStatus::Complete => {}
            ProofStatus::Failed => report.diags.error(
                ErrorKind::ProofObligationUnsatisfied,
                format!("proof obligation for {} has failed", t.display_name()),
            ),
            ProofStatus::Pending | ProofStatus::Partial => {
                let discharge = self.proofs.discharge_obligation(&t.proof, &t.context);
                if discharge.success {
                    return;
                }
                let reason = discharge.error.unwrap_or_default();
                let mut obligation = t.proof.clone();
                if self.config.allow_deferred_proofs {
                    debug!(ty = %t.display_name(), "proof obligation deferred");
                    report.diags.warn(
                        WarningKind::ProofDeferred,
                        format!("proof obligation for {} deferred ({})", t.display_name(), reason),
                    );
                    report.constraints.extend(t.proof.goals.iter().enumerate().map(|(i, goal)| {
                        TypeConstraint::predicate(format!("proof_goal_{}", i), goal.statement.to_string())
                    }));
                } else {
                    obligation.status = ProofStatus::Failed;
                    report.diags.error(
                        ErrorKind::ProofObligationUnsatisfied,
                        format!("proof obligation for {} is not satisfied ({})", t.display_name(), reason),
                    );
                }
                report.proof_obligations.push(obligation);
            }
        }
    }
}
