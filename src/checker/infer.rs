//! Expression inference for the checker.
//!
//! Works like the plain Hindley-Milner pass but routes any unification
//! that involves an advanced type through the advanced unifier, and looks
//! through rank-N callees by instantiating their quantifiers.
//!
//! An unsolved variable may stand for an advanced value, so an
//! unannotated lambda parameter can receive a linear resource. Everything
//! else involving an advanced type goes through the advanced unifier.

use thiserror::Error;

use crate::advanced::{AdvancedType, RankNType};
use crate::ast::{Expr, ExprKind, Span};
use crate::context::SkolemGen;
use crate::diagnostics::{find_similar, CheckError, ErrorKind};
use crate::env::TypeEnv;
use crate::infer::{literal_type, Inferencer, TypeError};
use crate::subst::Substitution;
use crate::types::{Scheme, Type};
use crate::unify::{AdvancedUnifier, UnifyFailure};

#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    #[error("undefined variable: {name}")]
    UndefinedVariable {
        name: String,
        span: Span,
        suggestions: Vec<String>,
    },
    #[error("cannot call a value of type {ty}")]
    NonFunctionCall { ty: Type, span: Span },
    #[error("expected {expected} argument(s), found {found}")]
    ArityMismatch {
        expected: usize,
        found: usize,
        span: Span,
    },
    #[error(transparent)]
    Unification(#[from] UnifyFailure),
    #[error(transparent)]
    Mismatch(#[from] TypeError),
}

impl From<InferenceError> for CheckError {
    fn from(err: InferenceError) -> CheckError {
        match err {
            InferenceError::UndefinedVariable {
                ref name,
                span,
                ref suggestions,
            } => CheckError::new(ErrorKind::UndefinedVariable, format!("undefined variable: {}", name))
                .at(span)
                .with_suggestions(suggestions.clone()),
            InferenceError::NonFunctionCall { span, .. } => {
                CheckError::new(ErrorKind::NonFunctionCall, err.to_string()).at(span)
            }
            InferenceError::ArityMismatch { span, .. } => {
                CheckError::new(ErrorKind::KindMismatch, err.to_string()).at(span)
            }
            InferenceError::Unification(failure) => CheckError::from(failure),
            InferenceError::Mismatch(type_error) => CheckError::from(type_error),
        }
    }
}

#[derive(Debug)]
pub struct AdvancedInference {
    hm: Inferencer,
    unifier: AdvancedUnifier,
    skolems: SkolemGen,
    suggestion_distance: usize,
}

impl AdvancedInference {
    pub fn new(suggestion_distance: usize) -> Self {
        Self {
            hm: Inferencer::new(),
            unifier: AdvancedUnifier::new(),
            skolems: SkolemGen::default(),
            suggestion_distance,
        }
    }

    pub fn resolve(&self, ty: &Type) -> Type {
        self.hm.resolve(ty)
    }

    pub fn fresh_var(&mut self) -> Type {
        self.hm.fresh_var()
    }

    /// Keep fresh variables clear of every id mentioned by `ty`
    pub fn reserve_vars(&mut self, ty: &Type) {
        self.hm.reserve_vars(ty);
    }

    pub fn reserve_scheme(&mut self, scheme: &Scheme) {
        for var in &scheme.vars {
            self.hm.reserve_past(var.id);
        }
        self.hm.reserve_vars(&scheme.ty);
    }

    pub fn skolems_issued(&self) -> u32 {
        self.skolems.issued()
    }

    /// Infer the type of `expr`. A rank-N annotation on `expr` itself is
    /// taken as given here; the checker verifies it against the node.
    pub fn infer(&mut self, env: &TypeEnv, expr: &Expr) -> Result<Type, InferenceError> {
        let ty = self.infer_node(env, expr)?;
        let ty = match expr.get_type() {
            Some(annotated)
                if matches!(annotated.as_advanced(), Some(AdvancedType::RankN(_)))
                    && !self.hm.resolve(&ty).is_advanced() =>
            {
                annotated.clone()
            }
            Some(annotated) => self.unify_any(annotated, &ty)?,
            None => ty,
        };
        Ok(self.hm.resolve(&ty))
    }

    /// Infer `expr` as if it carried no annotation
    pub fn infer_unannotated(&mut self, env: &TypeEnv, expr: &Expr) -> Result<Type, InferenceError> {
        let ty = self.infer_node(env, expr)?;
        Ok(self.hm.resolve(&ty))
    }

    /// Replace the quantifiers of `t` with fresh skolems. Returns each
    /// quantifier name with its skolem, and the rigid body.
    pub fn skolemize(&mut self, t: &RankNType) -> (Vec<(String, Type)>, Type) {
        let mut rigid = Substitution::empty();
        let mut skolems = Vec::with_capacity(t.quantifiers.len());
        for q in &t.quantifiers {
            let skolem = self.skolems.fresh(&q.var.name);
            rigid.insert(q.var.id, skolem.clone());
            skolems.push((q.var.name.clone(), skolem));
        }
        (skolems, rigid.apply(&t.body))
    }

    /// Does the ordinary type `ty` fit the rigid `body`? Skolems unify only
    /// with themselves and with unsolved variables.
    pub fn subsume(&mut self, body: &Type, ty: &Type) -> Result<(), InferenceError> {
        self.hm.unify(body, ty)?;
        Ok(())
    }

    /// Unify two types, using the advanced unifier when either side is
    /// advanced and the Hindley-Milner engine otherwise
    pub fn unify_any(&mut self, t1: &Type, t2: &Type) -> Result<Type, InferenceError> {
        let t1 = self.hm.resolve(t1);
        let t2 = self.hm.resolve(t2);
        if t1.is_advanced() || t2.is_advanced() {
            if let Some(var) = t1.as_var() {
                self.hm.unify_variable(var, &t2)?;
                return Ok(t2);
            }
            if let Some(var) = t2.as_var() {
                self.hm.unify_variable(var, &t1)?;
                return Ok(t1);
            }
            let result = self.unifier.unify(&t1, &t2).into_result()?;
            return Ok(result.unified_type.unwrap_or(t1));
        }
        self.hm.unify(&t1, &t2)?;
        Ok(self.hm.resolve(&t1))
    }

    fn infer_inner(&mut self, env: &TypeEnv, expr: &Expr) -> Result<Type, InferenceError> {
        let ty = self.infer_node(env, expr)?;
        let Some(annotated) = expr.get_type() else {
            return Ok(ty);
        };
        match annotated.as_advanced() {
            Some(AdvancedType::RankN(t)) if !self.hm.resolve(&ty).is_advanced() => {
                let (_, body) = self.skolemize(t);
                self.subsume(&body, &ty)?;
                Ok(annotated.clone())
            }
            _ => self.unify_any(annotated, &ty),
        }
    }

    fn infer_node(&mut self, env: &TypeEnv, expr: &Expr) -> Result<Type, InferenceError> {
        match &expr.node {
            ExprKind::Lit(lit) => Ok(literal_type(lit)),

            ExprKind::Var(name) => match env.lookup(name) {
                Some(scheme) => Ok(self.hm.instantiate(scheme)),
                None => Err(InferenceError::UndefinedVariable {
                    name: name.clone(),
                    span: expr.span,
                    suggestions: find_similar(name, env.names(), self.suggestion_distance),
                }),
            },

            ExprKind::Call { func, args } => {
                let callee = self.infer_inner(env, func)?;
                let callee = self.hm.resolve(&callee);
                let callee = self.callable_view(&callee);

                if let Some((params, ret)) = callee.function_parts() {
                    if params.len() != args.len() {
                        return Err(InferenceError::ArityMismatch {
                            expected: params.len(),
                            found: args.len(),
                            span: expr.span,
                        });
                    }
                    for (param, arg) in params.iter().zip(args) {
                        let arg_ty = self.infer_inner(env, arg)?;
                        self.unify_any(param, &arg_ty)?;
                    }
                    return Ok(ret.clone());
                }

                if callee.as_var().is_some() {
                    let mut arg_tys = Vec::with_capacity(args.len());
                    for arg in args {
                        arg_tys.push(self.infer_inner(env, arg)?);
                    }
                    let ret = self.hm.fresh_var();
                    self.hm.unify(&callee, &Type::function(arg_tys, ret.clone()))?;
                    return Ok(ret);
                }

                Err(InferenceError::NonFunctionCall {
                    ty: callee,
                    span: func.span,
                })
            }

            ExprKind::Binary { op, left, right } => {
                let left_ty = self.infer_inner(env, left)?;
                let right_ty = self.infer_inner(env, right)?;
                let unified = self.unify_any(&left_ty, &right_ty)?;
                if op.is_comparison() {
                    Ok(Type::bool())
                } else {
                    Ok(unified)
                }
            }

            ExprKind::Lambda { params, body } => {
                let mut scope = env.clone().extend();
                let mut param_tys = Vec::with_capacity(params.len());
                for param in params {
                    let ty = match &param.ty {
                        Some(ty) => ty.clone(),
                        None => self.hm.fresh_var(),
                    };
                    scope.bind(param.name.clone(), Scheme::mono(ty.clone()));
                    param_tys.push(ty);
                }
                let body_ty = self.infer_inner(&scope, body)?;
                Ok(Type::function(param_tys, body_ty))
            }

            ExprKind::Let { name, value, body } => {
                let value_ty = self.infer_inner(env, value)?;
                let scheme = self.hm.generalize(env, &value_ty);
                let mut scope = env.clone().extend();
                scope.bind(name.clone(), scheme);
                self.infer_inner(&scope, body)
            }
        }
    }

    /// A rank-N callee is called at a fresh instance of its body
    fn callable_view(&mut self, callee: &Type) -> Type {
        match callee.as_advanced() {
            Some(AdvancedType::RankN(t)) => {
                let mut fresh = Substitution::empty();
                for q in &t.quantifiers {
                    let var = self.hm.fresh_var();
                    fresh.insert(q.var.id, var);
                }
                fresh.apply(&t.body)
            }
            _ => callee.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advanced::rank_n::{Kind, Quantifier};
    use crate::advanced::{AdvancedTypeId, RankNType};
    use crate::ast::BinOp;
    use crate::types::TypeVar;

    #[test]
    fn test_comparison_yields_bool() {
        let mut inf = AdvancedInference::new(2);
        let expr = Expr::binary(BinOp::Lt, Expr::int(1), Expr::int(2));
        assert_eq!(inf.infer(&TypeEnv::new(), &expr).unwrap(), Type::bool());
    }

    #[test]
    fn test_non_function_call() {
        let mut env = TypeEnv::new();
        env.bind("n", Scheme::mono(Type::int()));
        let mut inf = AdvancedInference::new(2);
        let err = inf
            .infer(&env, &Expr::call(Expr::var("n"), vec![]))
            .unwrap_err();
        assert!(matches!(err, InferenceError::NonFunctionCall { .. }));
        assert_eq!(CheckError::from(err).kind, ErrorKind::NonFunctionCall);
    }

    #[test]
    fn test_rank_n_callee_is_instantiated() {
        let a = TypeVar::named(100, "a");
        let poly = RankNType::new(
            AdvancedTypeId(0),
            1,
            Type::function(vec![Type::var(a.clone())], Type::var(a.clone())),
        )
        .with_quantifier(Quantifier::new(a, Kind::Star));
        let mut env = TypeEnv::new();
        env.bind("id", Scheme::mono(Type::advanced(poly.into())));

        let mut inf = AdvancedInference::new(2);
        let expr = Expr::call(Expr::var("id"), vec![Expr::int(4)]);
        assert_eq!(inf.infer(&env, &expr).unwrap(), Type::int());
    }

    #[test]
    fn test_advanced_operand_against_basic() {
        let a = TypeVar::named(100, "a");
        let poly = RankNType::new(AdvancedTypeId(0), 1, Type::var(a.clone()))
            .with_quantifier(Quantifier::new(a, Kind::Star));
        let mut env = TypeEnv::new();
        env.bind("p", Scheme::mono(Type::advanced(poly.into())));

        let mut inf = AdvancedInference::new(2);
        let expr = Expr::binary(BinOp::Add, Expr::var("p"), Expr::int(1));
        let err = inf.infer(&env, &expr).unwrap_err();
        assert!(matches!(
            err,
            InferenceError::Unification(UnifyFailure::AdvancedWithBasic { .. })
        ));
    }

    #[test]
    fn test_unsolved_variable_binds_to_advanced_type() {
        let a = TypeVar::named(100, "a");
        let poly = Type::advanced(
            RankNType::new(AdvancedTypeId(0), 1, Type::var(a.clone()))
                .with_quantifier(Quantifier::new(a, Kind::Star))
                .into(),
        );
        let mut inf = AdvancedInference::new(2);
        let v = inf.fresh_var();
        assert_eq!(inf.unify_any(&v, &poly).unwrap(), poly);
        assert_eq!(inf.resolve(&v), poly);
    }

    #[test]
    fn test_subsume_keeps_skolems_rigid() {
        let a = TypeVar::named(100, "a");
        let poly = RankNType::new(
            AdvancedTypeId(0),
            1,
            Type::function(vec![Type::var(a.clone())], Type::var(a.clone())),
        )
        .with_quantifier(Quantifier::new(a, Kind::Star));

        let mut inf = AdvancedInference::new(2);
        let (skolems, body) = inf.skolemize(&poly);
        assert_eq!(skolems.len(), 1);
        assert_eq!(inf.skolems_issued(), 1);

        let v = inf.fresh_var();
        assert!(inf.subsume(&body, &Type::function(vec![v.clone()], v)).is_ok());
        let concrete = Type::function(vec![Type::int()], Type::int());
        assert!(inf.subsume(&body, &concrete).is_err());
    }

    #[test]
    fn test_root_rank_n_annotation_is_deferred() {
        let a = TypeVar::named(100, "a");
        let poly = Type::advanced(
            RankNType::new(
                AdvancedTypeId(0),
                1,
                Type::function(vec![Type::var(a.clone())], Type::var(a.clone())),
            )
            .with_quantifier(Quantifier::new(a, Kind::Star))
            .into(),
        );
        let increment = Expr::lambda(
            vec![crate::ast::Param::new("x")],
            Expr::binary(BinOp::Add, Expr::var("x"), Expr::int(1)),
        )
        .with_type(poly.clone());

        let mut inf = AdvancedInference::new(2);
        assert_eq!(inf.infer(&TypeEnv::new(), &increment).unwrap(), poly);

        let nested = Expr::let_in("f", increment, Expr::int(0));
        assert!(inf.infer(&TypeEnv::new(), &nested).is_err());
    }
}
