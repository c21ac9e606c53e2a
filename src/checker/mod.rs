//! The advanced type checker.
//!
//! A check infers the expression's type, then dispatches on the variant
//! of an advanced type to a per-variant checker. Unlike the unifiers,
//! checking collects every diagnostic it can find instead of stopping at
//! the first one.

mod dependent;
mod effect;
pub mod infer;
mod linear;
mod rank_n;
mod refinement;

use std::collections::BTreeMap;

use tracing::debug;

pub use infer::{AdvancedInference, InferenceError};

use crate::advanced::{AdvancedType, AdvancedTypeId};
use crate::ast::{Expr, Span};
use crate::config::CheckerConfig;
use crate::context::CheckContext;
use crate::diagnostics::{
    format_header, CheckError, CheckWarning, Diagnostics, ErrorConfig, ErrorKind, WarningKind,
};
use crate::env::TypeEnv;
use crate::proof::{ProofEngine, ProofObligation};
use crate::types::{Scheme, Type, TypeConstraint};
use crate::unify::{AdvancedUnifier, UnificationResult};
use crate::validate::{validate_well_formedness, TypeValidationResult};

/// Report of one `check_advanced_type` call
#[derive(Debug, Clone)]
pub struct TypeCheckResult {
    /// True when no errors were recorded; warnings never affect it
    pub success: bool,
    pub ty: Option<Type>,
    pub constraints: Vec<TypeConstraint>,
    /// Obligations that were deferred or could not be discharged
    pub proof_obligations: Vec<ProofObligation>,
    pub errors: Vec<CheckError>,
    pub warnings: Vec<CheckWarning>,
}

impl TypeCheckResult {
    pub fn has_error(&self, kind: ErrorKind) -> bool {
        self.errors.iter().any(|e| e.kind == kind)
    }

    pub fn has_warning(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }

    /// Render every diagnostic, errors first
    pub fn render(&self, config: &ErrorConfig) -> String {
        let mut sections: Vec<String> = Vec::new();
        for error in &self.errors {
            sections.push(error.render(config));
        }
        for warning in &self.warnings {
            sections.push(warning.render(config));
        }
        if sections.is_empty() {
            let ty = self.ty.as_ref().map(|t| t.to_string()).unwrap_or_default();
            return format!("{}\n\n{}", format_header("OK", &config.colors), ty);
        }
        sections.join("\n\n")
    }
}

/// Findings accumulated while checking one expression
#[derive(Debug, Default)]
pub(crate) struct CheckReport {
    pub(crate) diags: Diagnostics,
    pub(crate) constraints: Vec<TypeConstraint>,
    pub(crate) proof_obligations: Vec<ProofObligation>,
}

impl CheckReport {
    fn new(span: Span) -> Self {
        Self {
            diags: Diagnostics::at(span),
            ..Self::default()
        }
    }

    fn push(&mut self, error: CheckError) {
        self.diags.push(error);
    }

    fn absorb(&mut self, other: CheckReport) {
        self.diags.merge(other.diags);
        self.constraints.extend(other.constraints);
        self.proof_obligations.extend(other.proof_obligations);
    }

    fn finish(self, ty: Option<Type>) -> TypeCheckResult {
        TypeCheckResult {
            success: !self.diags.has_errors(),
            ty,
            constraints: self.constraints,
            proof_obligations: self.proof_obligations,
            errors: self.diags.errors,
            warnings: self.diags.warnings,
        }
    }
}

/// One checking session. Holds the environment, the inference state and
/// the per-variant trackers; use one checker per compilation unit.
#[derive(Debug)]
pub struct AdvancedTypeChecker {
    config: CheckerConfig,
    unifier: AdvancedUnifier,
    inference: AdvancedInference,
    proofs: ProofEngine,
    env: TypeEnv,
    ctx: CheckContext,
}

impl Default for AdvancedTypeChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl AdvancedTypeChecker {
    pub fn new() -> Self {
        Self::with_config(CheckerConfig::default())
    }

    pub fn with_config(config: CheckerConfig) -> Self {
        Self {
            inference: AdvancedInference::new(config.suggestion_distance),
            config,
            unifier: AdvancedUnifier::new(),
            proofs: ProofEngine::new(),
            env: TypeEnv::new(),
            ctx: CheckContext::new(),
        }
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// A fresh advanced type identity for this session
    pub fn next_id(&mut self) -> AdvancedTypeId {
        self.ctx.ids.next_advanced()
    }

    /// A type variable no other variable in this session shares
    pub fn fresh_type_var(&mut self) -> Type {
        self.inference.fresh_var()
    }

    /// Bind `name` monomorphically. Names bound to linear types are
    /// tracked for usage.
    pub fn bind(&mut self, name: &str, ty: Type) {
        if matches!(ty.as_advanced(), Some(AdvancedType::Linear(_))) {
            self.ctx.linearity.register(name);
        }
        self.inference.reserve_vars(&ty);
        self.env.bind(name, Scheme::mono(ty));
    }

    pub fn bind_scheme(&mut self, name: &str, scheme: Scheme) {
        self.inference.reserve_scheme(&scheme);
        self.env.bind(name, scheme);
    }

    pub fn env(&self) -> &TypeEnv {
        &self.env
    }

    /// Number of environment frames currently open
    pub fn scope_depth(&self) -> usize {
        self.env.depth()
    }

    pub fn scope_level(&self) -> u32 {
        self.ctx.scope_level
    }

    pub fn proof_engine(&self) -> &ProofEngine {
        &self.proofs
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    pub fn unify(&self, t1: &Type, t2: &Type) -> UnificationResult {
        self.unifier.unify(t1, t2)
    }

    pub fn infer_type(&mut self, expr: &Expr) -> Result<Type, InferenceError> {
        self.inference.infer(&self.env, expr)
    }

    pub fn validate_well_formedness(&self, ty: &AdvancedType) -> TypeValidationResult {
        validate_well_formedness(ty, &self.config)
    }

    pub fn check_advanced_type(&mut self, expr: &Expr, expected: Option<&Type>) -> TypeCheckResult {
        let mut report = CheckReport::new(expr.span);
        for ty in expected.into_iter().chain(expr.annotations()) {
            self.inference.reserve_vars(ty);
        }

        let inferred = match self.infer_type(expr) {
            Ok(ty) => ty,
            Err(err) => {
                debug!(%err, "inference failed");
                let mut error = CheckError::from(err);
                error.span = Some(expr.span);
                report.push(error);
                return report.finish(None);
            }
        };

        self.record_linear_uses(expr, &mut report);
        let ty = self.check_inferred(expr, &inferred, expected, &mut report);
        report.finish(Some(ty))
    }

    /// Warnings for linear resources bound in this session but never used
    pub fn unconsumed_resources(&self) -> Vec<CheckWarning> {
        self.ctx
            .linearity
            .unconsumed()
            .into_iter()
            .map(|name| {
                CheckWarning::new(
                    WarningKind::LinearResourceNotConsumed,
                    format!("linear resource `{}` is never consumed", name),
                )
            })
            .collect()
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    fn check_inferred(
        &mut self,
        expr: &Expr,
        inferred: &Type,
        expected: Option<&Type>,
        report: &mut CheckReport,
    ) -> Type {
        if let Some(adv) = inferred.as_advanced() {
            debug!(kind = %adv.kind(), ty = %inferred, "check advanced type");
            match adv {
                AdvancedType::RankN(t) => self.check_rank_n(expr, t, report),
                AdvancedType::Dependent(t) => self.check_dependent(expr, t, report),
                AdvancedType::Effect(t) => self.check_effect(expr, t, report),
                AdvancedType::Linear(t) => self.check_linear(expr, t, report),
                AdvancedType::Refinement(t) => self.check_refinement(expr, t, report),
            }
            if let Some(expected) = expected {
                let result = self.unifier.unify(inferred, expected);
                match result.error {
                    Some(failure) => report.push(CheckError::from(failure)),
                    None => report.constraints.extend(result.constraints),
                }
            }
            return inferred.clone();
        }

        let Some(expected) = expected else {
            return inferred.clone();
        };

        if expected.is_advanced() {
            report.diags.error(
                ErrorKind::KindMismatch,
                format!(
                    "type mismatch: a value of type {} cannot be used as advanced type {}",
                    inferred, expected
                ),
            );
            return inferred.clone();
        }

        match self.inference.unify_any(inferred, expected) {
            Ok(ty) => ty,
            Err(err) => {
                report.diags.error(ErrorKind::KindMismatch, format!("type mismatch: {}", err));
                inferred.clone()
            }
        }
    }

    /// Run `f` inside a fresh environment frame. The frame is closed and
    /// the scope level restored whatever `f` reports.
    fn with_scope<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.ctx.enter_scope();
        self.env = std::mem::take(&mut self.env).extend();
        let result = f(self);
        self.env = std::mem::take(&mut self.env).close();
        self.ctx.exit_scope();
        result
    }

    /// Count uses of tracked linear resources in `expr`, through any
    /// aliases, and report a resource used more often than its type allows
    fn record_linear_uses(&mut self, expr: &Expr, report: &mut CheckReport) {
        let mut uses: BTreeMap<&str, u32> = BTreeMap::new();
        for name in expr.resource_uses() {
            if self.ctx.linearity.is_tracked(name) {
                *uses.entry(name).or_insert(0) += 1;
            }
        }

        for (name, count) in uses {
            let total = self.ctx.linearity.record(name, count);
            let declared = self.env.lookup(name).and_then(|s| match s.ty.as_advanced() {
                Some(AdvancedType::Linear(t)) => Some(t.multiplicity),
                _ => None,
            });
            if let Some(multiplicity) = declared {
                if multiplicity.max.is_some_and(|max| total > max) {
                    report.diags.error(
                        ErrorKind::LinearityViolation,
                        format!(
                            "`{}` may be used {} but is used {} time(s)",
                            name, multiplicity, total
                        ),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinOp;

    #[test]
    fn test_ordinary_check() {
        let mut checker = AdvancedTypeChecker::new();
        let expr = Expr::binary(BinOp::Add, Expr::int(1), Expr::int(2));
        let result = checker.check_advanced_type(&expr, Some(&Type::int()));
        assert!(result.success);
        assert_eq!(result.ty, Some(Type::int()));
    }

    #[test]
    fn test_ordinary_mismatch() {
        let mut checker = AdvancedTypeChecker::new();
        let result = checker.check_advanced_type(&Expr::int(1), Some(&Type::bool()));
        assert!(!result.success);
        assert!(result.has_error(ErrorKind::KindMismatch));
    }

    #[test]
    fn test_inference_failure_aborts() {
        let mut checker = AdvancedTypeChecker::new();
        checker.bind("count", Type::int());
        let expr = Expr::var("cuont").at(Span::new(3, 8));
        let result = checker.check_advanced_type(&expr, None);
        assert!(!result.success);
        assert!(result.ty.is_none());
        assert_eq!(result.errors[0].kind, ErrorKind::UndefinedVariable);
        assert_eq!(result.errors[0].suggestions, vec!["count".to_string()]);
        assert_eq!(result.errors[0].span, Some(Span::new(3, 8)));
    }

    #[test]
    fn test_with_scope_restores_depth() {
        let mut checker = AdvancedTypeChecker::new();
        let before = checker.scope_depth();
        let inner = checker.with_scope(|c| c.with_scope(|c| c.scope_depth()));
        assert_eq!(inner, before + 2);
        assert_eq!(checker.scope_depth(), before);
        assert_eq!(checker.scope_level(), 0);
    }

    #[test]
    fn test_render_success() {
        let mut checker = AdvancedTypeChecker::new();
        let result = checker.check_advanced_type(&Expr::int(1), None);
        assert!(result.render(&ErrorConfig::default()).contains("int"));
    }
}
