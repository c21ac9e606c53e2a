//! Test support for exercising the type checker without a front end.
//!
//! This module provides:
//! - Terse builders for ordinary and advanced types
//! - Ready-made advanced types used across the scenario tests
//! - Assertion helpers over `TypeCheckResult` and `UnificationResult`
//!
//! Expressions are built directly with the `Expr` constructors; there is no
//! surface syntax to parse.

use crate::advanced::linear::{Multiplicity, UsageKind};
use crate::advanced::rank_n::{Kind, Quantifier};
use crate::advanced::refinement::{CmpOp, Predicate, Refinement};
use crate::advanced::{AdvancedType, AdvancedTypeId, LinearType, RankNType, RefinementType};
use crate::ast::Expr;
use crate::checker::{AdvancedTypeChecker, TypeCheckResult};
use crate::diagnostics::{ErrorKind, WarningKind};
use crate::proof::{GoalKind, ProofGoal};
use crate::types::{Type, TypeVar, TypeVarId};
use crate::unify::{AdvancedUnifier, UnificationResult};

// ============================================================================
// Type Builders
// ============================================================================

/// A type variable with a display name
pub fn tv(id: TypeVarId, name: &str) -> Type {
    Type::var(TypeVar::named(id, name))
}

/// `(params) -> ret`
pub fn fun(params: Vec<Type>, ret: Type) -> Type {
    Type::function(params, ret)
}

/// `forall a. (a) -> a` at the given rank
pub fn identity_rank_n(id: u32, rank: u32) -> RankNType {
    let a = TypeVar::named(0, "a");
    RankNType::new(AdvancedTypeId(id), rank, fun(vec![Type::var(a.clone())], Type::var(a)))
        .with_quantifier(Quantifier::new(TypeVar::named(0, "a"), Kind::Star))
}

/// A linear resource over `base` with an explicit multiplicity
pub fn linear_of(id: u32, base: Type, usage: UsageKind, multiplicity: Multiplicity) -> LinearType {
    LinearType::new(AdvancedTypeId(id), base, usage).with_multiplicity(multiplicity)
}

/// `{x: int | x > 0}` with no proof goals
pub fn positive_int(id: u32) -> RefinementType {
    RefinementType::new(AdvancedTypeId(id), Type::int()).with_refinement(Refinement::invariant(
        "x",
        Predicate::compare(CmpOp::Gt, Predicate::var("x"), Predicate::Int(0)),
    ))
}

/// `positive_int` plus one goal the proof engine cannot close on its own
pub fn positive_int_with_goal(id: u32) -> RefinementType {
    positive_int(id).with_proof_goal(ProofGoal::new(
        GoalKind::Inequality,
        Predicate::compare(CmpOp::Ge, Predicate::var("x"), Predicate::Int(1)),
    ))
}

/// Project any advanced variant into a `Type`
pub fn adv(ty: impl Into<AdvancedType>) -> Type {
    Type::advanced(ty.into())
}

// ============================================================================
// Checking Helpers
// ============================================================================

/// Check `expr` in a fresh checker with the given bindings
pub fn check_with(bindings: &[(&str, Type)], expr: &Expr, expected: Option<&Type>) -> TypeCheckResult {
    let mut checker = AdvancedTypeChecker::new();
    for (name, ty) in bindings {
        checker.bind(name, ty.clone());
    }
    checker.check_advanced_type(expr, expected)
}

/// Assert that a check succeeded, printing its diagnostics otherwise
pub fn assert_check_ok(result: &TypeCheckResult) {
    assert!(
        result.success,
        "expected the check to succeed, got errors: {:?}",
        result.errors
    );
}

/// Assert that a check failed with at least one error of `kind`
pub fn assert_check_error(result: &TypeCheckResult, kind: ErrorKind) {
    assert!(!result.success, "expected the check to fail with {:?}", kind);
    assert!(
        result.has_error(kind),
        "expected a {:?} error, got: {:?}",
        kind,
        result.errors
    );
}

pub fn assert_check_warning(result: &TypeCheckResult, kind: WarningKind) {
    assert!(
        result.has_warning(kind),
        "expected a {:?} warning, got: {:?}",
        kind,
        result.warnings
    );
}

/// Unify with a fresh advanced unifier
pub fn unify(t1: &Type, t2: &Type) -> UnificationResult {
    AdvancedUnifier::new().unify(t1, t2)
}

/// Assert that unification fails with exactly `message`
pub fn assert_unify_error(t1: &Type, t2: &Type, message: &str) {
    let result = unify(t1, t2);
    assert!(!result.success, "expected {} and {} not to unify", t1, t2);
    assert_eq!(result.error_message().as_deref(), Some(message));
}

// ============================================================================
// Test Macros
// ============================================================================

/// Macro for asserting a check succeeds
#[macro_export]
macro_rules! assert_checks {
    ($result:expr) => {
        $crate::test_support::assert_check_ok(&$result)
    };
}

/// Macro for asserting a check fails with an error kind
#[macro_export]
macro_rules! assert_rejects {
    ($result:expr, $kind:expr) => {
        $crate::test_support::assert_check_error(&$result, $kind)
    };
}
