//! Type Rejection Tests - Soundness Canaries and Rejection Verification
//!
//! These tests verify that the type system REJECTS invalid programs.
//! A checker that accepts everything is useless.
//!
//! Categories:
//! 1. Soundness canaries - Must ALWAYS reject, or we have a soundness bug
//! 2. Type mismatch rejection - Basic type errors
//! 3. Scope rejection - Unbound variables
//! 4. Advanced coercion - Ordinary values never become advanced types
//! 5. Session hygiene - Caller-built variables never alias fresh ones

use tessera::advanced::linear::UsageKind;
use tessera::advanced::{AdvancedTypeId, LinearType};
use tessera::ast::{BinOp, Expr, Param, Span};
use tessera::infer::{Inferencer, TypeError};
use tessera::test_support::{
    assert_check_error, assert_check_ok, check_with, fun, identity_rank_n, tv,
};
use tessera::types::{Scheme, Type};
use tessera::{AdvancedTypeChecker, ErrorKind, TypeEnv};

fn infer(env: &TypeEnv, expr: &Expr) -> Result<Type, TypeError> {
    Inferencer::new().infer_expr(env, expr)
}

// ============================================================================
// Soundness Canaries
// ============================================================================
// If ANY of these tests pass (don't reject), we have a CRITICAL soundness bug.

mod soundness {
    use super::*;

    #[test]
    fn occurs_check_self_application() {
        // fun x -> x x would have infinite type: a = a -> b
        let expr = Expr::lambda(
            vec![Param::new("x")],
            Expr::call(Expr::var("x"), vec![Expr::var("x")]),
        );
        let result = infer(&TypeEnv::new(), &expr);
        assert!(
            matches!(result, Err(TypeError::OccursCheck { .. })),
            "Self-application must fail occurs check, got {:?}",
            result
        );
    }

    #[test]
    fn occurs_check_through_checker() {
        let expr = Expr::lambda(
            vec![Param::new("f")],
            Expr::call(Expr::var("f"), vec![Expr::var("f")]),
        );
        let result = check_with(&[], &expr, None);
        assert_check_error(&result, ErrorKind::OccursCheckFailure);
    }

    #[test]
    fn lambda_bound_variable_is_monomorphic() {
        // fun f -> (f 1, f true) must fail: lambda parameters are not generalized
        let expr = Expr::lambda(
            vec![Param::new("f")],
            Expr::binary(
                BinOp::Eq,
                Expr::call(Expr::var("f"), vec![Expr::int(1)]),
                Expr::call(Expr::var("f"), vec![Expr::bool(true)]),
            ),
        );
        assert!(infer(&TypeEnv::new(), &expr).is_err());
    }

    #[test]
    fn let_bound_identity_is_polymorphic() {
        // The counterpart of the canary above: let generalizes
        let expr = Expr::let_in(
            "id",
            Expr::lambda(vec![Param::new("x")], Expr::var("x")),
            Expr::binary(
                BinOp::Eq,
                Expr::call(Expr::var("id"), vec![Expr::bool(false)]),
                Expr::call(Expr::var("id"), vec![Expr::bool(true)]),
            ),
        );
        assert_eq!(infer(&TypeEnv::new(), &expr), Ok(Type::bool()));
        let expr = Expr::let_in(
            "id",
            Expr::lambda(vec![Param::new("x")], Expr::var("x")),
            Expr::call(Expr::var("id"), vec![Expr::call(Expr::var("id"), vec![Expr::int(3)])]),
        );
        assert_eq!(infer(&TypeEnv::new(), &expr), Ok(Type::int()));
    }
}

// ============================================================================
// Type Mismatch Rejection
// ============================================================================

mod mismatch {
    use super::*;

    #[test]
    fn add_int_and_bool() {
        let expr = Expr::binary(BinOp::Add, Expr::int(1), Expr::bool(true));
        let result = infer(&TypeEnv::new(), &expr);
        assert!(matches!(result, Err(TypeError::Mismatch { .. })), "{:?}", result);
    }

    #[test]
    fn logical_operator_needs_bool() {
        let expr = Expr::binary(BinOp::And, Expr::int(1), Expr::int(2));
        assert!(infer(&TypeEnv::new(), &expr).is_err());
    }

    #[test]
    fn wrong_argument_type() {
        let env = TypeEnv::with_bindings(vec![(
            "not".to_string(),
            Scheme::mono(fun(vec![Type::bool()], Type::bool())),
        )]);
        let expr = Expr::call(Expr::var("not"), vec![Expr::int(0)]);
        let err = infer(&env, &expr).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("bool"), "{}", message);
        assert!(message.contains("int"), "{}", message);
    }

    #[test]
    fn wrong_arity() {
        let env = TypeEnv::with_bindings(vec![(
            "pair".to_string(),
            Scheme::mono(fun(vec![Type::int(), Type::int()], Type::int())),
        )]);
        let expr = Expr::call(Expr::var("pair"), vec![Expr::int(1)]);
        assert!(matches!(
            infer(&env, &expr),
            Err(TypeError::ArityMismatch { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn call_non_function() {
        let expr = Expr::call(Expr::int(42), vec![Expr::int(1)]).at(Span::new(0, 5));
        let result = check_with(&[], &expr, None);
        assert_check_error(&result, ErrorKind::NonFunctionCall);
    }

    #[test]
    fn expected_type_mismatch() {
        let result = check_with(&[], &Expr::bool(true), Some(&Type::int()));
        assert_check_error(&result, ErrorKind::KindMismatch);
        assert!(result.errors[0].message.starts_with("type mismatch"));
    }

    #[test]
    fn polymorphic_binding_instantiates_per_use() {
        let a = tv(0, "a");
        let env = TypeEnv::with_bindings(vec![(
            "id".to_string(),
            Scheme::poly(vec![a.as_var().cloned().unwrap()], fun(vec![a.clone()], a)),
        )]);
        let expr = Expr::binary(
            BinOp::Add,
            Expr::call(Expr::var("id"), vec![Expr::int(1)]),
            Expr::call(Expr::var("id"), vec![Expr::bool(true)]),
        );
        assert!(infer(&env, &expr).is_err());
    }
}

// ============================================================================
// Scope Rejection
// ============================================================================

mod scope {
    use super::*;

    #[test]
    fn unbound_variable() {
        let result = infer(&TypeEnv::new(), &Expr::var("undefined_var"));
        assert!(matches!(result, Err(TypeError::UnboundVariable { .. })));
    }

    #[test]
    fn lambda_parameter_does_not_escape() {
        let expr = Expr::binary(
            BinOp::Add,
            Expr::call(
                Expr::lambda(vec![Param::new("x")], Expr::var("x")),
                vec![Expr::int(1)],
            ),
            Expr::var("x"),
        );
        assert!(matches!(
            infer(&TypeEnv::new(), &expr),
            Err(TypeError::UnboundVariable { .. })
        ));
    }

    #[test]
    fn undefined_variable_suggests_near_names() {
        let result = check_with(
            &[("counter", Type::int()), ("total", Type::int())],
            &Expr::var("countr"),
            None,
        );
        assert_check_error(&result, ErrorKind::UndefinedVariable);
        assert_eq!(result.errors[0].suggestions, vec!["counter".to_string()]);
    }
}

// ============================================================================
// Advanced Coercion
// ============================================================================

mod coercion {
    use super::*;

    #[test]
    fn ordinary_value_is_not_a_linear_value() {
        let linear = LinearType::new(AdvancedTypeId(1), Type::int(), UsageKind::Linear);
        let expected = tessera::test_support::adv(linear);
        let result = check_with(&[], &Expr::int(7), Some(&expected));
        assert_check_error(&result, ErrorKind::KindMismatch);
    }

    #[test]
    fn linear_value_is_not_an_ordinary_value() {
        let linear = tessera::test_support::adv(LinearType::new(
            AdvancedTypeId(1),
            Type::int(),
            UsageKind::Linear,
        ));
        let result = check_with(&[("h", linear)], &Expr::var("h"), Some(&Type::int()));
        assert_check_error(&result, ErrorKind::AdvancedUnificationFailure);
        assert!(result.errors[0].message.contains("Cannot unify advanced type Linear"));
    }
}

// ============================================================================
// Session Hygiene
// ============================================================================

mod session {
    use super::*;

    #[test]
    fn bound_variable_does_not_alias_fresh_variables() {
        // (fun y -> y)(true) == (x == 1) with x : 'a is well-typed
        let mut checker = AdvancedTypeChecker::new();
        checker.bind("x", tv(0, "a"));
        let expr = Expr::binary(
            BinOp::Eq,
            Expr::call(
                Expr::lambda(vec![Param::new("y")], Expr::var("y")),
                vec![Expr::bool(true)],
            ),
            Expr::binary(BinOp::Eq, Expr::var("x"), Expr::int(1)),
        );
        let result = checker.check_advanced_type(&expr, None);
        assert_check_ok(&result);
        assert_eq!(result.ty, Some(Type::bool()));
    }

    #[test]
    fn bound_scheme_reserves_its_variables() {
        let a = tv(3, "a");
        let mut checker = AdvancedTypeChecker::new();
        checker.bind_scheme(
            "id",
            Scheme::poly(vec![a.as_var().cloned().unwrap()], fun(vec![a.clone()], a)),
        );
        let fresh = checker.fresh_type_var();
        assert!(fresh.as_var().unwrap().id > 3, "{} reuses a bound id", fresh);
    }

    #[test]
    fn quantified_variables_inside_advanced_types_are_reserved() {
        let mut checker = AdvancedTypeChecker::new();
        checker.bind("poly", tessera::test_support::adv(identity_rank_n(1, 1)));
        checker.bind("late", tv(6, "b"));
        let first = checker.fresh_type_var();
        let second = checker.fresh_type_var();
        assert_eq!(first.as_var().unwrap().id, 7);
        assert_ne!(first, second);
    }
}
