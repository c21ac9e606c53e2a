use tracing::debug;

use super::{AdvancedTypeChecker, CheckReport};
use crate::advanced::RankNType;
use crate::ast::Expr;
use crate::diagnostics::{CheckError, ErrorKind};
use crate::types::Scheme;

impl AdvancedTypeChecker {
    /// Skolemize the quantifiers in a fresh scope and check the expression
    /// against the rigid body. The scope is always closed afterwards.
    pub(super) fn check_rank_n(&mut self, expr: &Expr, t: &RankNType, report: &mut CheckReport) {
        t.validate(&mut report.diags);

        self.with_scope(|checker| {
            let (skolems, body) = checker.inference.skolemize(t);
            for (name, skolem) in skolems {
                checker.env.bind(name, Scheme::mono(skolem));
            }
            debug!(body = %body, level = checker.ctx.scope_level, "skolemized rank-n body");

            // A name bound at this type already has it; anything else must
            // be at least as polymorphic as the body
            match checker.inference.infer_unannotated(&checker.env, expr) {
                Ok(underlying) if !underlying.is_advanced() => {
                    if let Err(err) = checker.inference.subsume(&body, &underlying) {
                        report.diags.error(
                            ErrorKind::RankMismatch,
                            format!(
                                "{} is not as polymorphic as {}: {}",
                                underlying,
                                t.display_name(),
                                err
                            ),
                        );
                    }
                }
                Ok(_) => {}
                Err(err) => report.push(CheckError::from(err)),
            }

            if body.is_advanced() {
                checker.check_inferred(expr, &body, None, report);
            }
        });
    }
}
