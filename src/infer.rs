//! Hindley-Milner type inference (Algorithm W) over the expression tree

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::trace;

use crate::ast::{Expr, ExprKind, Literal, Span};
use crate::diagnostics::{find_similar, CheckError, ErrorKind};
use crate::env::TypeEnv;
use crate::subst::Substitution;
use crate::types::{Scheme, Type, TypeKind, TypeVar, TypeVarId};

/// Context for where a unification error occurred
#[derive(Debug, Clone, PartialEq)]
pub enum UnifyContext {
    /// Unifying function argument with parameter type
    FunctionArgument {
        func_name: Option<String>,
        param_num: usize,
    },
    /// Unifying function body with declared return type
    FunctionReturn { func_name: Option<String> },
    /// Unifying let binding value with its annotation
    LetBinding { name: String },
    /// Unifying operands of a binary operator
    BinOp { op: String, side: &'static str },
    /// Unifying an expression with the type recorded on it
    Annotation,
}

impl std::fmt::Display for UnifyContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnifyContext::FunctionArgument {
                func_name: Some(name),
                param_num,
            } => write!(f, "in argument {} of `{}`", param_num, name),
            UnifyContext::FunctionArgument {
                func_name: None,
                param_num,
            } => write!(f, "in argument {}", param_num),
            UnifyContext::FunctionReturn {
                func_name: Some(name),
            } => write!(f, "in the return type of `{}`", name),
            UnifyContext::FunctionReturn { func_name: None } => write!(f, "in the return type"),
            UnifyContext::LetBinding { name } => write!(f, "in the binding of `{}`", name),
            UnifyContext::BinOp { op, side } => {
                write!(f, "in the {} operand of `{}`", side, op)
            }
            UnifyContext::Annotation => write!(f, "against its annotation"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypeError {
    #[error("unbound variable: {name}")]
    UnboundVariable {
        name: String,
        span: Span,
        suggestions: Vec<String>,
    },
    #[error("type mismatch: expected {expected}, found {found}")]
    Mismatch {
        expected: Type,
        found: Type,
        context: Option<UnifyContext>,
    },
    #[error("arity mismatch: expected {expected}, found {found}")]
    ArityMismatch { expected: usize, found: usize },
    #[error("field mismatch: expected `{expected}`, found `{found}`")]
    FieldMismatch { expected: String, found: String },
    #[error("infinite type: {var} occurs in {ty}")]
    OccursCheck { var: TypeVar, ty: Type },
    #[error("cannot call a value of type {ty}")]
    NotAFunction { ty: Type, span: Span },
}

impl TypeError {
    /// Add context to a type mismatch error
    pub fn with_context(self, ctx: UnifyContext) -> TypeError {
        match self {
            TypeError::Mismatch {
                expected,
                found,
                context: _,
            } => TypeError::Mismatch {
                expected,
                found,
                context: Some(ctx),
            },
            other => other,
        }
    }

    fn mismatch(expected: &Type, found: &Type) -> TypeError {
        TypeError::Mismatch {
            expected: expected.clone(),
            found: found.clone(),
            context: None,
        }
    }
}

impl From<TypeError> for CheckError {
    fn from(err: TypeError) -> CheckError {
        let kind = match &err {
            TypeError::UnboundVariable { .. } => ErrorKind::UndefinedVariable,
            TypeError::OccursCheck { .. } => ErrorKind::OccursCheckFailure,
            TypeError::NotAFunction { .. } => ErrorKind::NonFunctionCall,
            TypeError::Mismatch { .. }
            | TypeError::ArityMismatch { .. }
            | TypeError::FieldMismatch { .. } => ErrorKind::KindMismatch,
        };
        let message = match &err {
            TypeError::Mismatch {
                context: Some(ctx), ..
            } => format!("{} {}", err, ctx),
            _ => err.to_string(),
        };
        let error = CheckError::new(kind, message);
        match err {
            TypeError::UnboundVariable {
                span, suggestions, ..
            } => error.at(span).with_suggestions(suggestions),
            TypeError::NotAFunction { span, .. } => error.at(span),
            _ => error,
        }
    }
}

/// The type of a literal
pub fn literal_type(lit: &Literal) -> Type {
    match lit {
        Literal::Int(_) => Type::int(),
        Literal::Float(_) => Type::float(),
        Literal::Bool(_) => Type::bool(),
        Literal::String(_) => Type::string(),
        Literal::Char(_) => Type::char(),
        Literal::Unit => Type::unit(),
    }
}

/// One inference session: a variable counter and the substitution
/// accumulated by unification. Not shared between sessions.
#[derive(Debug, Default)]
pub struct Inferencer {
    /// Counter for generating fresh type variables
    next_var: TypeVarId,
    /// Current let-nesting level
    level: u32,
    subst: Substitution,
}

impl Inferencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh type variable
    pub fn fresh_var(&mut self) -> Type {
        let id = self.next_var;
        self.next_var += 1;
        Type::var(TypeVar::new(id).at_level(self.level))
    }

    /// Never issue `id` or anything below it from now on
    pub fn reserve_past(&mut self, id: TypeVarId) {
        self.next_var = self.next_var.max(id.saturating_add(1));
    }

    /// Move the counter past every variable `ty` mentions
    pub fn reserve_vars(&mut self, ty: &Type) {
        if let Some(max) = ty.max_var_id() {
            self.reserve_past(max);
        }
    }

    pub fn substitution(&self) -> &Substitution {
        &self.subst
    }

    /// Apply everything learned so far to `ty`
    pub fn resolve(&self, ty: &Type) -> Type {
        self.subst.apply(ty)
    }

    // ========================================================================
    // Unification
    // ========================================================================

    pub fn unify(&mut self, t1: &Type, t2: &Type) -> Result<(), TypeError> {
        let t1 = self.resolve(t1);
        let t2 = self.resolve(t2);

        if t1 == t2 {
            return Ok(());
        }

        match (t1.kind(), t2.kind()) {
            (TypeKind::Var(var), _) => self.unify_variable(var, &t2),
            (_, TypeKind::Var(var)) => self.unify_variable(var, &t1),
            (TypeKind::Function, TypeKind::Function)
            | (TypeKind::Tuple, TypeKind::Tuple)
            | (TypeKind::Array, TypeKind::Array)
            | (TypeKind::Pointer, TypeKind::Pointer) => self.unify_components(&t1, &t2),
            (TypeKind::Generic, TypeKind::Generic) if t1.name == t2.name => {
                self.unify_components(&t1, &t2)
            }
            (TypeKind::Struct, TypeKind::Struct) if t1.name == t2.name => self.unify_fields(&t1, &t2),
            _ => Err(TypeError::mismatch(&t1, &t2)),
        }
    }

    /// Unify with context for better error messages
    pub fn unify_with_context(
        &mut self,
        t1: &Type,
        t2: &Type,
        context: UnifyContext,
    ) -> Result<(), TypeError> {
        self.unify(t1, t2).map_err(|e| e.with_context(context))
    }

    /// Positional unification of component lists. The first failing pair
    /// aborts the whole unification.
    fn unify_components(&mut self, t1: &Type, t2: &Type) -> Result<(), TypeError> {
        if t1.params.len() != t2.params.len() {
            // Function component lists end with the return type
            let ret = usize::from(*t1.kind() == TypeKind::Function);
            return Err(TypeError::ArityMismatch {
                expected: t1.params.len().saturating_sub(ret),
                found: t2.params.len().saturating_sub(ret),
            });
        }
        for (a, b) in t1.params.iter().zip(&t2.params) {
            self.unify(a, b)?;
        }
        Ok(())
    }

    fn unify_fields(&mut self, t1: &Type, t2: &Type) -> Result<(), TypeError> {
        if t1.fields.len() != t2.fields.len() {
            return Err(TypeError::ArityMismatch {
                expected: t1.fields.len(),
                found: t2.fields.len(),
            });
        }
        for (f1, f2) in t1.fields.iter().zip(&t2.fields) {
            if f1.name != f2.name {
                return Err(TypeError::FieldMismatch {
                    expected: f1.name.clone(),
                    found: f2.name.clone(),
                });
            }
            self.unify(&f1.ty, &f2.ty)?;
        }
        Ok(())
    }

    /// Bind `var` to `ty` after the occurs check
    pub fn unify_variable(&mut self, var: &TypeVar, ty: &Type) -> Result<(), TypeError> {
        if ty.as_var().is_some_and(|other| other.id == var.id) {
            return Ok(());
        }
        if ty.occurs(var.id) {
            return Err(TypeError::OccursCheck {
                var: var.clone(),
                ty: ty.clone(),
            });
        }
        trace!(var = %var, ty = %ty, "bind type variable");
        self.subst = Substitution::singleton(var.id, ty.clone()).compose(&self.subst);
        Ok(())
    }

    pub fn occurs_check(&self, var: &TypeVar, ty: &Type) -> bool {
        self.resolve(ty).occurs(var.id)
    }

    pub fn free_variables(&self, ty: &Type) -> BTreeSet<TypeVar> {
        self.resolve(ty).free_type_vars()
    }

    // ========================================================================
    // Polymorphism
    // ========================================================================

    /// Replace the quantified variables of `scheme` with fresh ones
    pub fn instantiate(&mut self, scheme: &Scheme) -> Type {
        if scheme.vars.is_empty() {
            return scheme.ty.clone();
        }
        let mut fresh = Substitution::empty();
        for var in &scheme.vars {
            let ty = self.fresh_var();
            fresh.insert(var.id, ty);
        }
        fresh.apply(&scheme.ty)
    }

    /// Quantify over the variables free in `ty` but not in `env`
    pub fn generalize(&self, env: &TypeEnv, ty: &Type) -> Scheme {
        let ty = self.resolve(ty);
        let env_vars: BTreeSet<TypeVarId> = env
            .free_type_vars()
            .into_iter()
            .flat_map(|v| self.free_variables(&Type::var(v)))
            .map(|v| v.id)
            .collect();
        let vars = ty
            .free_type_vars()
            .into_iter()
            .filter(|v| !env_vars.contains(&v.id))
            .collect();
        Scheme::poly(vars, ty)
    }

    // ========================================================================
    // Algorithm W
    // ========================================================================

    pub fn infer_expr(&mut self, env: &TypeEnv, expr: &Expr) -> Result<Type, TypeError> {
        let ty = self.infer_inner(env, expr)?;
        Ok(self.resolve(&ty))
    }

    /// An annotated node must agree with its annotation
    fn infer_inner(&mut self, env: &TypeEnv, expr: &Expr) -> Result<Type, TypeError> {
        let ty = self.infer_node(env, expr)?;
        match expr.get_type() {
            Some(annotated) => {
                self.unify_with_context(annotated, &ty, UnifyContext::Annotation)?;
                Ok(annotated.clone())
            }
            None => Ok(ty),
        }
    }

    fn infer_node(&mut self, env: &TypeEnv, expr: &Expr) -> Result<Type, TypeError> {
        match &expr.node {
            ExprKind::Lit(lit) => Ok(literal_type(lit)),

            ExprKind::Var(name) => match env.lookup(name) {
                Some(scheme) => Ok(self.instantiate(scheme)),
                None => Err(TypeError::UnboundVariable {
                    name: name.clone(),
                    span: expr.span,
                    suggestions: find_similar(name, env.names(), 2),
                }),
            },

            ExprKind::Call { func, args } => {
                let func_ty = self.infer_inner(env, func)?;
                let mut arg_tys = Vec::with_capacity(args.len());
                for arg in args {
                    arg_tys.push(self.infer_inner(env, arg)?);
                }

                let resolved = self.resolve(&func_ty);
                let func_name = match &func.node {
                    ExprKind::Var(name) => Some(name.clone()),
                    _ => None,
                };
                match resolved.function_parts() {
                    Some((params, ret)) => {
                        if params.len() != arg_tys.len() {
                            return Err(TypeError::ArityMismatch {
                                expected: params.len(),
                                found: arg_tys.len(),
                            });
                        }
                        for (i, (param, arg)) in params.iter().zip(&arg_tys).enumerate() {
                            self.unify_with_context(
                                param,
                                arg,
                                UnifyContext::FunctionArgument {
                                    func_name: func_name.clone(),
                                    param_num: i + 1,
                                },
                            )?;
                        }
                        Ok(ret.clone())
                    }
                    None if resolved.as_var().is_some() => {
                        let ret = self.fresh_var();
                        self.unify(&resolved, &Type::function(arg_tys, ret.clone()))?;
                        Ok(ret)
                    }
                    None => Err(TypeError::NotAFunction {
                        ty: resolved.clone(),
                        span: func.span,
                    }),
                }
            }

            ExprKind::Binary { op, left, right } => {
                let left_ty = self.infer_inner(env, left)?;
                let right_ty = self.infer_inner(env, right)?;
                if op.is_logical() {
                    self.unify_with_context(
                        &Type::bool(),
                        &left_ty,
                        UnifyContext::BinOp {
                            op: op.symbol().to_string(),
                            side: "left",
                        },
                    )?;
                }
                self.unify_with_context(
                    &left_ty,
                    &right_ty,
                    UnifyContext::BinOp {
                        op: op.symbol().to_string(),
                        side: "right",
                    },
                )?;
                if op.is_comparison() {
                    Ok(Type::bool())
                } else {
                    Ok(left_ty)
                }
            }

            ExprKind::Lambda { params, body } => {
                let mut scope = env.clone().extend();
                let mut param_tys = Vec::with_capacity(params.len());
                for param in params {
                    let ty = match &param.ty {
                        Some(ty) => ty.clone(),
                        None => self.fresh_var(),
                    };
                    scope.bind(param.name.clone(), Scheme::mono(ty.clone()));
                    param_tys.push(ty);
                }
                let body_ty = self.infer_inner(&scope, body)?;
                Ok(Type::function(param_tys, body_ty))
            }

            ExprKind::Let { name, value, body } => {
                self.level += 1;
                let value_ty = self.infer_inner(env, value);
                self.level -= 1;
                let scheme = self.generalize(env, &value_ty?);

                let mut scope = env.clone().extend();
                scope.bind(name.clone(), scheme);
                self.infer_inner(&scope, body)
            }
        }
    }
}
