//! Property-based tests for the inference engine
//!
//! These tests verify the algebraic laws the checker relies on:
//! - Unification reflexivity and symmetry
//! - Occurs check correctness (prevents infinite types)
//! - Substitution composition
//! - Generalize/instantiate round trip

use proptest::prelude::*;
use proptest::strategy::ValueTree;

use tessera::infer::{Inferencer, TypeError};
use tessera::subst::Substitution;
use tessera::types::{Field, Scheme, Type, TypeVar, TypeVarId};
use tessera::unify::AdvancedUnifier;
use tessera::TypeEnv;

/// Variable ids used by generated types stay below this bound
const MAX_GENERATED_VAR: TypeVarId = 8;

// ============================================================================
// Type Generators
// ============================================================================

fn arb_base_type() -> BoxedStrategy<Type> {
    prop_oneof![
        Just(Type::int()),
        Just(Type::bool()),
        Just(Type::string()),
        Just(Type::unit()),
        Just(Type::float()),
        Just(Type::char()),
    ]
    .boxed()
}

/// Generate a ground (monomorphic, no type variables) type
fn arb_ground_type(depth: usize) -> BoxedStrategy<Type> {
    if depth == 0 {
        return arb_base_type();
    }
    let inner = || arb_ground_type(depth - 1);
    prop_oneof![
        // Base types (weighted higher to avoid explosion)
        4 => arb_base_type(),
        // Compound types
        1 => (prop::collection::vec(inner(), 0..3), inner())
            .prop_map(|(params, ret)| Type::function(params, ret)),
        1 => prop::collection::vec(inner(), 2..=3).prop_map(Type::tuple),
        1 => inner().prop_map(Type::array),
        1 => inner().prop_map(Type::pointer),
        1 => inner().prop_map(|t| Type::generic("Option", vec![t])),
        1 => (inner(), inner()).prop_map(|(x, y)| {
            Type::structure("Point", vec![Field::new("x", x), Field::new("y", y)])
        }),
    ]
    .boxed()
}

/// Generate a type that may contain type variables
fn arb_type_with_vars(depth: usize) -> BoxedStrategy<Type> {
    let var = (0..MAX_GENERATED_VAR).prop_map(|id| Type::var(TypeVar::new(id)));
    if depth == 0 {
        return prop_oneof![3 => arb_base_type(), 2 => var].boxed();
    }
    let inner = || arb_type_with_vars(depth - 1);
    prop_oneof![
        3 => arb_base_type(),
        2 => var,
        1 => (prop::collection::vec(inner(), 0..3), inner())
            .prop_map(|(params, ret)| Type::function(params, ret)),
        1 => prop::collection::vec(inner(), 2..=3).prop_map(Type::tuple),
        1 => inner().prop_map(Type::array),
        1 => inner().prop_map(|t| Type::generic("List", vec![t])),
    ]
    .boxed()
}

/// Generate a substitution over the generated variable range
fn arb_substitution() -> BoxedStrategy<Substitution> {
    prop::collection::vec((0..MAX_GENERATED_VAR, arb_type_with_vars(1)), 0..4)
        .prop_map(|pairs| {
            let mut subst = Substitution::empty();
            for (id, ty) in pairs {
                subst.insert(id, ty);
            }
            subst
        })
        .boxed()
}

// ============================================================================
// Property Tests: Unification
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// unify(t, t) succeeds for every ordinary type
    #[test]
    fn unify_reflexive(t in arb_type_with_vars(3)) {
        let mut inf = Inferencer::new();
        prop_assert!(inf.unify(&t, &t).is_ok(), "unify({}, {}) failed", t, t);
        prop_assert!(inf.substitution().is_empty());
    }

    /// The advanced engine's ordinary path is reflexive too
    #[test]
    fn advanced_unify_reflexive(t in arb_ground_type(3)) {
        let result = AdvancedUnifier::new().unify(&t, &t);
        prop_assert!(result.success, "{:?}", result.error_message());
        prop_assert_eq!(result.unified_type, Some(t));
    }

    /// unify(a, b) succeeds iff unify(b, a) succeeds
    #[test]
    fn unify_symmetric(t1 in arb_ground_type(2), t2 in arb_ground_type(2)) {
        let r1 = Inferencer::new().unify(&t1, &t2);
        let r2 = Inferencer::new().unify(&t2, &t1);
        prop_assert_eq!(r1.is_ok(), r2.is_ok(), "{} vs {}", t1, t2);
    }

    /// After unification both sides resolve to the same type
    #[test]
    fn unify_makes_equal(t1 in arb_type_with_vars(2), t2 in arb_type_with_vars(2)) {
        let mut inf = Inferencer::new();
        if inf.unify(&t1, &t2).is_ok() {
            prop_assert_eq!(inf.resolve(&t1), inf.resolve(&t2));
        }
    }

    /// A variable never unifies with a function mentioning it
    #[test]
    fn occurs_check_rejects_infinite_types(other in arb_ground_type(2), ret in arb_ground_type(1)) {
        let mut inf = Inferencer::new();
        let v = inf.fresh_var();
        let f = Type::function(vec![v.clone(), other], ret);
        let result = inf.unify(&v, &f);
        prop_assert!(matches!(result, Err(TypeError::OccursCheck { .. })), "{:?}", result);
    }
}

// ============================================================================
// Property Tests: Substitution and Polymorphism
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// compose(s1, s2).apply(t) == s1.apply(s2.apply(t))
    #[test]
    fn compose_applies_right_then_left(
        s1 in arb_substitution(),
        s2 in arb_substitution(),
        t in arb_type_with_vars(3),
    ) {
        let composed = s1.compose(&s2).apply(&t);
        let sequential = s1.apply(&s2.apply(&t));
        prop_assert_eq!(composed, sequential);
    }

    /// The empty substitution is an identity for both compose and apply
    #[test]
    fn empty_substitution_is_identity(s in arb_substitution(), t in arb_type_with_vars(3)) {
        let empty = Substitution::empty();
        prop_assert_eq!(empty.apply(&t), t.clone());
        prop_assert_eq!(empty.compose(&s).apply(&t), s.apply(&t));
        prop_assert_eq!(s.compose(&empty).apply(&t), s.apply(&t));
    }

    /// Generalizing in an empty environment then instantiating yields the
    /// same shape over entirely fresh variables
    #[test]
    fn generalize_instantiate_round_trip(t in arb_type_with_vars(3)) {
        let mut inf = Inferencer::new();
        // Move the counter past every generated id
        for _ in 0..MAX_GENERATED_VAR {
            inf.fresh_var();
        }
        let scheme = inf.generalize(&TypeEnv::new(), &t);
        prop_assert_eq!(scheme.vars.len(), t.free_type_vars().len());

        let instance = inf.instantiate(&scheme);
        prop_assert_eq!(instance.display_normalized(), t.display_normalized());

        let original: Vec<TypeVarId> = t.free_type_vars().iter().map(|v| v.id).collect();
        for var in instance.free_type_vars() {
            prop_assert!(!original.contains(&var.id), "variable {} was reused", var);
        }
    }

    /// A monomorphic scheme instantiates to itself
    #[test]
    fn instantiate_mono_is_identity(t in arb_type_with_vars(3)) {
        let mut inf = Inferencer::new();
        prop_assert_eq!(inf.instantiate(&Scheme::mono(t.clone())), t);
    }

    /// Variables free in the environment are never quantified
    #[test]
    fn generalize_respects_environment(t in arb_type_with_vars(3)) {
        let inf = Inferencer::new();
        let mut env = TypeEnv::new();
        env.bind("fixed", Scheme::mono(t.clone()));
        let scheme = inf.generalize(&env, &t);
        prop_assert!(scheme.vars.is_empty());
    }
}

// ============================================================================
// Unit checks for generator sanity
// ============================================================================

#[test]
fn ground_types_have_no_variables() {
    let mut runner = proptest::test_runner::TestRunner::default();
    for _ in 0..50 {
        let t = arb_ground_type(3)
            .new_tree(&mut runner)
            .expect("strategy produces a value")
            .current();
        assert!(t.free_type_vars().is_empty(), "{} has variables", t);
    }
}
