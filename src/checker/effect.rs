use super::{AdvancedTypeChecker, CheckReport};
use crate::advanced::effect::Purity;
use crate::advanced::linear::AccessPermissions;
use crate::advanced::EffectType;
use crate::ast::{AccessKind, Expr};
use crate::diagnostics::{ErrorKind, WarningKind};

impl AdvancedTypeChecker {
    pub(super) fn check_effect(&mut self, expr: &Expr, t: &EffectType, report: &mut CheckReport) {
        let used = expr.effects_used();
        self.ctx.effects.record(&used);

        t.validate(&mut report.diags);

        if t.purity == Purity::Pure {
            if !used.is_empty() {
                report.diags.error(
                    ErrorKind::EffectMismatch,
                    format!("expression of pure type performs effects: {}", used),
                );
            }
        } else {
            for effect in used.iter() {
                if t.find_effect(effect).is_none() && !t.handles(effect) {
                    report.diags.error(
                        ErrorKind::EffectMismatch,
                        format!("effect `{}` is performed but not declared by {}", effect, t.display_name()),
                    );
                }
            }
        }

        if self.config.warn_unused_effects {
            for effect in &t.effects {
                if !used.contains(&effect.name) {
                    report.diags.warn(
                        WarningKind::EffectNeverUsed,
                        format!("effect `{}` is declared but never performed", effect.name),
                    );
                }
            }
        }

        let regions = expr.regions_used();
        for access in regions.iter() {
            if !matches!(access.access, AccessKind::Write | AccessKind::Move) {
                continue;
            }
            if t.purity == Purity::ReadOnly && access.access == AccessKind::Write {
                report.diags.error(
                    ErrorKind::EffectMismatch,
                    format!("read-only expression writes to region `{}`", access.region),
                );
            }
            let required = AccessPermissions::from_access(access.access);
            let granted = t.capability(&access.region).map(|c| c.permissions);
            if !granted.is_some_and(|p| p.covers(&required)) {
                report.diags.error(
                    ErrorKind::CapabilityInsufficient,
                    format!(
                        "{} access to region `{}` needs a capability granting it",
                        access.access, access.region
                    ),
                );
            }
        }

        for cap in &t.capabilities {
            if cap.permissions.write && !regions.writes_to(&cap.resource) {
                report.diags.warn(
                    WarningKind::CapabilityOverPermissive,
                    format!("capability on `{}` grants write access that is never used", cap.resource),
                );
            }
        }
    }
}
