//! Unification of advanced types.
//!
//! [`AdvancedUnifier::unify`] dispatches on the kind tags of both sides.
//! Two advanced types of the same variant go to that variant's unifier;
//! an advanced type never unifies with an ordinary one; two ordinary types
//! must agree on kind and name. Every variant unifier stops at the first
//! failing check.

use thiserror::Error;
use tracing::debug;

use crate::advanced::dependent::DependencyKind;
use crate::advanced::effect::{Purity, RegionKind};
use crate::advanced::linear::{LifetimeKind, Multiplicity, UsageKind};
use crate::advanced::rank_n::Kind;
use crate::advanced::{
    AdvancedKind, AdvancedType, DependentType, EffectType, LinearType, RankNType, RefinementType,
};
use crate::diagnostics::{CheckError, ErrorKind};
use crate::proof::ProofStatus;
use crate::subst::Substitution;
use crate::types::{Type, TypeConstraint};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnifyFailure {
    #[error("Cannot unify advanced type {advanced} with basic type {basic}")]
    AdvancedWithBasic { advanced: String, basic: String },
    #[error("Cannot unify {0} type with {1} type")]
    VariantMismatch(AdvancedKind, AdvancedKind),
    #[error("Cannot unify {0} with {1}")]
    BasicMismatch(String, String),
    #[error("Advanced type {0} carries no extension data")]
    MissingExtension(String),

    #[error("Rank mismatch: {0} vs {1}")]
    Rank(u32, u32),
    #[error("Quantifier count mismatch: {0} vs {1}")]
    QuantifierCount(usize, usize),
    #[error("Quantifier kind mismatch: {0} vs {1}")]
    QuantifierKind(Kind, Kind),
    #[error("Body mismatch: {0} vs {1}")]
    Body(String, String),

    #[error("Universe level mismatch: {0} vs {1}")]
    UniverseLevel(u32, u32),
    #[error("Dependency kind mismatch: {0:?} vs {1:?}")]
    DependencyKind(DependencyKind, DependencyKind),
    #[error("Dependency variable mismatch: {0} vs {1}")]
    DependencyVariable(String, String),
    #[error("Constructor mismatch: {0} vs {1}")]
    Constructor(String, String),
    #[error("Constructor parameter mismatch in {constructor}: {detail}")]
    ConstructorParam { constructor: String, detail: String },
    #[error("Index count mismatch: {0} vs {1}")]
    IndexCount(usize, usize),

    #[error("Purity mismatch: {0} vs {1}")]
    Purity(Purity, Purity),
    #[error("Region mismatch: {0} vs {1}")]
    Region(String, String),
    #[error("Effect {0} not found")]
    MissingEffect(String),
    #[error("Effect {effect} differs: {detail}")]
    EffectShape { effect: String, detail: String },

    #[error("Usage mismatch: {0} vs {1}")]
    Usage(UsageKind, UsageKind),
    #[error("Multiplicity mismatch: {0} vs {1}")]
    Multiplicity(Multiplicity, Multiplicity),
    #[error("Base type mismatch: {0} vs {1}")]
    BaseType(String, String),
    #[error("Lifetime mismatch: {0:?} vs {1:?}")]
    Lifetime(LifetimeKind, LifetimeKind),
    #[error("Permission mismatch in region {0}")]
    Permissions(String),

    #[error("Refinement count mismatch: {0} vs {1}")]
    RefinementCount(usize, usize),
    #[error("Refinement {0} differs")]
    Refinement(usize),
    #[error("Proof status mismatch: {0} vs {1}")]
    ProofStatus(ProofStatus, ProofStatus),
    #[error("Proof goal count mismatch: {0} vs {1}")]
    GoalCount(usize, usize),
    #[error("Refinement context mismatch: {0}")]
    Context(&'static str),
}

impl From<UnifyFailure> for CheckError {
    fn from(failure: UnifyFailure) -> CheckError {
        let kind = match &failure {
            UnifyFailure::Rank(..) | UnifyFailure::QuantifierCount(..) => ErrorKind::RankMismatch,
            UnifyFailure::UniverseLevel(..)
            | UnifyFailure::DependencyKind(..)
            | UnifyFailure::DependencyVariable(..) => ErrorKind::DependencyMismatch,
            UnifyFailure::Purity(..) | UnifyFailure::MissingEffect(_) | UnifyFailure::EffectShape { .. } => {
                ErrorKind::EffectMismatch
            }
            UnifyFailure::Usage(..) | UnifyFailure::Multiplicity(..) => ErrorKind::LinearityViolation,
            _ => ErrorKind::AdvancedUnificationFailure,
        };
        CheckError::new(kind, failure.to_string())
    }
}

/// Outcome of one unification
#[derive(Debug, Clone)]
pub struct UnificationResult {
    pub success: bool,
    pub unified_type: Option<Type>,
    pub substitution: Substitution,
    pub constraints: Vec<TypeConstraint>,
    pub error: Option<UnifyFailure>,
}

impl UnificationResult {
    fn unified(ty: &Type, substitution: Substitution, constraints: Vec<TypeConstraint>) -> Self {
        Self {
            success: true,
            unified_type: Some(ty.clone()),
            substitution,
            constraints,
            error: None,
        }
    }

    fn failed(error: UnifyFailure) -> Self {
        Self {
            success: false,
            unified_type: None,
            substitution: Substitution::empty(),
            constraints: Vec::new(),
            error: Some(error),
        }
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }

    pub fn into_result(self) -> Result<UnificationResult, UnifyFailure> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self),
        }
    }
}

type Unified = Result<(Substitution, Vec<TypeConstraint>), UnifyFailure>;

/// Dispatching unifier for advanced types. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvancedUnifier;

impl AdvancedUnifier {
    pub fn new() -> Self {
        AdvancedUnifier
    }

    pub fn unify(&self, t1: &Type, t2: &Type) -> UnificationResult {
        let k1 = t1.kind().advanced_kind();
        let k2 = t2.kind().advanced_kind();

        let outcome = match (k1, k2) {
            (Some(_), Some(_)) => {
                debug!(left = %t1.kind(), right = %t2.kind(), "advanced unification");
                self.dispatch(t1, t2)
            }
            (Some(_), None) => Err(UnifyFailure::AdvancedWithBasic {
                advanced: t1.kind().tag().to_string(),
                basic: t2.kind().tag().to_string(),
            }),
            (None, Some(_)) => Err(UnifyFailure::AdvancedWithBasic {
                advanced: t2.kind().tag().to_string(),
                basic: t1.kind().tag().to_string(),
            }),
            (None, None) if t1.same_head(t2) => Ok((Substitution::empty(), Vec::new())),
            (None, None) => Err(UnifyFailure::BasicMismatch(t1.to_string(), t2.to_string())),
        };

        match outcome {
            Ok((subst, constraints)) => UnificationResult::unified(t1, subst, constraints),
            Err(error) => {
                debug!(%error, "unification failed");
                UnificationResult::failed(error)
            }
        }
    }

    fn dispatch(&self, t1: &Type, t2: &Type) -> Unified {
        let a1 = t1
            .as_advanced()
            .ok_or_else(|| UnifyFailure::MissingExtension(t1.name.clone()))?;
        let a2 = t2
            .as_advanced()
            .ok_or_else(|| UnifyFailure::MissingExtension(t2.name.clone()))?;

        match (a1, a2) {
            (AdvancedType::RankN(a), AdvancedType::RankN(b)) => self.unify_rank_n(a, b),
            (AdvancedType::Dependent(a), AdvancedType::Dependent(b)) => self.unify_dependent(a, b),
            (AdvancedType::Effect(a), AdvancedType::Effect(b)) => self.unify_effect(a, b),
            (AdvancedType::Linear(a), AdvancedType::Linear(b)) => self.unify_linear(a, b),
            (AdvancedType::Refinement(a), AdvancedType::Refinement(b)) => {
                self.unify_refinement(a, b)
            }
            _ => Err(UnifyFailure::VariantMismatch(a1.kind(), a2.kind())),
        }
    }

    // ========================================================================
    // Rank-N
    // ========================================================================

    /// Alpha-rename the second type's quantifiers to the first's, then
    /// require structurally equal bodies.
    pub fn unify_rank_n(&self, a: &RankNType, b: &RankNType) -> Unified {
        if a.rank != b.rank {
            return Err(UnifyFailure::Rank(a.rank, b.rank));
        }
        if a.quantifiers.len() != b.quantifiers.len() {
            return Err(UnifyFailure::QuantifierCount(
                a.quantifiers.len(),
                b.quantifiers.len(),
            ));
        }

        let mut subst = Substitution::empty();
        for (qa, qb) in a.quantifiers.iter().zip(&b.quantifiers) {
            if qa.kind != qb.kind {
                return Err(UnifyFailure::QuantifierKind(qa.kind.clone(), qb.kind.clone()));
            }
            if qa.var.id != qb.var.id || qa.var.name != qb.var.name {
                subst.insert(qb.var.id, Type::var(qa.var.clone()));
            }
        }

        let body = subst.apply(&b.body);
        if body != a.body {
            return Err(UnifyFailure::Body(a.body.to_string(), body.to_string()));
        }
        Ok((subst, Vec::new()))
    }

    // ========================================================================
    // Dependent
    // ========================================================================

    /// Indices are compared by count only.
    pub fn unify_dependent(&self, a: &DependentType, b: &DependentType) -> Unified {
        if a.universe_level != b.universe_level {
            return Err(UnifyFailure::UniverseLevel(a.universe_level, b.universe_level));
        }
        if a.dependency.kind != b.dependency.kind {
            return Err(UnifyFailure::DependencyKind(a.dependency.kind, b.dependency.kind));
        }
        if a.dependency.variable != b.dependency.variable {
            return Err(UnifyFailure::DependencyVariable(
                a.dependency.variable.clone(),
                b.dependency.variable.clone(),
            ));
        }

        let (ca, cb) = (&a.constructor, &b.constructor);
        if ca.name != cb.name {
            return Err(UnifyFailure::Constructor(ca.name.clone(), cb.name.clone()));
        }
        if ca.params.len() != cb.params.len() {
            return Err(UnifyFailure::ConstructorParam {
                constructor: ca.name.clone(),
                detail: format!("{} vs {} parameters", ca.params.len(), cb.params.len()),
            });
        }
        for (pa, pb) in ca.params.iter().zip(&cb.params) {
            if pa.name != pb.name || pa.ty != pb.ty {
                return Err(UnifyFailure::ConstructorParam {
                    constructor: ca.name.clone(),
                    detail: format!("{}: {} vs {}: {}", pa.name, pa.ty, pb.name, pb.ty),
                });
            }
        }

        if a.indices.len() != b.indices.len() {
            return Err(UnifyFailure::IndexCount(a.indices.len(), b.indices.len()));
        }
        Ok((Substitution::empty(), Vec::new()))
    }

    // ========================================================================
    // Effect
    // ========================================================================

    /// Every effect of `a` must appear in `b` with the same shape. Extra
    /// effects in `b` are allowed.
    pub fn unify_effect(&self, a: &EffectType, b: &EffectType) -> Unified {
        if a.purity != b.purity {
            return Err(UnifyFailure::Purity(a.purity, b.purity));
        }
        if a.region.kind != b.region.kind || a.region.name != b.region.name {
            return Err(UnifyFailure::Region(
                region_label(a.region.kind, &a.region.name),
                region_label(b.region.kind, &b.region.name),
            ));
        }

        for ea in &a.effects {
            let eb = b
                .find_effect(&ea.name)
                .ok_or_else(|| UnifyFailure::MissingEffect(ea.name.clone()))?;
            let shape = |detail: String| UnifyFailure::EffectShape {
                effect: ea.name.clone(),
                detail,
            };

            if ea.kind != eb.kind {
                return Err(shape(format!("kind {:?} vs {:?}", ea.kind, eb.kind)));
            }
            if ea.params.len() != eb.params.len() {
                return Err(shape(format!(
                    "{} vs {} parameters",
                    ea.params.len(),
                    eb.params.len()
                )));
            }
            if let Some((pa, pb)) = ea.params.iter().zip(&eb.params).find(|(pa, pb)| pa != pb) {
                return Err(shape(format!("parameter {} vs {}", pa, pb)));
            }
            if ea.operations.len() != eb.operations.len() {
                return Err(shape(format!(
                    "{} vs {} operations",
                    ea.operations.len(),
                    eb.operations.len()
                )));
            }
            for (oa, ob) in ea.operations.iter().zip(&eb.operations) {
                if oa.name != ob.name || oa.return_type != ob.return_type {
                    return Err(shape(format!(
                        "operation {}: {} vs {}: {}",
                        oa.name, oa.return_type, ob.name, ob.return_type
                    )));
                }
            }
            if ea.attributes.atomic != eb.attributes.atomic {
                return Err(shape("atomicity differs".to_string()));
            }
        }
        Ok((Substitution::empty(), Vec::new()))
    }

    // ========================================================================
    // Linear
    // ========================================================================

    /// On success the first type's linear constraints are carried forward
    /// as predicate constraints.
    pub fn unify_linear(&self, a: &LinearType, b: &LinearType) -> Unified {
        if a.usage != b.usage {
            return Err(UnifyFailure::Usage(a.usage, b.usage));
        }
        if a.multiplicity != b.multiplicity {
            return Err(UnifyFailure::Multiplicity(a.multiplicity, b.multiplicity));
        }
        if !a.base.same_head(&b.base) {
            return Err(UnifyFailure::BaseType(a.base.to_string(), b.base.to_string()));
        }
        if a.region.name != b.region.name {
            return Err(UnifyFailure::Region(a.region.name.clone(), b.region.name.clone()));
        }
        if a.region.lifetime.kind != b.region.lifetime.kind {
            return Err(UnifyFailure::Lifetime(
                a.region.lifetime.kind,
                b.region.lifetime.kind,
            ));
        }
        if a.region.permissions != b.region.permissions {
            return Err(UnifyFailure::Permissions(a.region.name.clone()));
        }

        let constraints = a
            .constraints
            .iter()
            .enumerate()
            .map(|(i, c)| TypeConstraint::predicate(format!("linear_{}", i), c.to_string()))
            .collect();
        Ok((Substitution::empty(), constraints))
    }

    // ========================================================================
    // Refinement
    // ========================================================================

    /// On success each proof goal of the first type becomes a
    /// `proof_goal_<i>` constraint that still has to be discharged.
    pub fn unify_refinement(&self, a: &RefinementType, b: &RefinementType) -> Unified {
        if !a.base.same_head(&b.base) {
            return Err(UnifyFailure::BaseType(a.base.to_string(), b.base.to_string()));
        }
        if a.refinements.len() != b.refinements.len() {
            return Err(UnifyFailure::RefinementCount(
                a.refinements.len(),
                b.refinements.len(),
            ));
        }
        for (i, (ra, rb)) in a.refinements.iter().zip(&b.refinements).enumerate() {
            if ra.var != rb.var || ra.kind != rb.kind || ra.strength != rb.strength {
                return Err(UnifyFailure::Refinement(i));
            }
        }
        if a.proof.status != b.proof.status {
            return Err(UnifyFailure::ProofStatus(a.proof.status, b.proof.status));
        }
        if a.proof.goals.len() != b.proof.goals.len() {
            return Err(UnifyFailure::GoalCount(a.proof.goals.len(), b.proof.goals.len()));
        }
        if a.context.assumptions.len() != b.context.assumptions.len() {
            return Err(UnifyFailure::Context("assumption counts differ"));
        }
        if a.context.axioms.len() != b.context.axioms.len() {
            return Err(UnifyFailure::Context("axiom counts differ"));
        }

        let constraints = a
            .proof
            .goals
            .iter()
            .enumerate()
            .map(|(i, goal)| {
                TypeConstraint::predicate(format!("proof_goal_{}", i), goal.statement.to_string())
            })
            .collect();
        Ok((Substitution::empty(), constraints))
    }
}

fn region_label(kind: RegionKind, name: &str) -> String {
    format!("{:?}:{}", kind, name)
}
