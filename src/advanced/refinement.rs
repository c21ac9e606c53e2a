//! Refinement types and the predicate language they are written in

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use super::AdvancedTypeId;
use crate::diagnostics::{Diagnostics, ErrorKind, WarningKind};
use crate::proof::{ProofGoal, ProofObligation, ProofStatus};
use crate::types::{Type, TypeKind};

// ============================================================================
// Predicates
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Mod => "%",
        }
    }
}

/// A logical formula over integer and boolean terms
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Predicate {
    Bool(bool),
    Int(i64),
    Var(String),
    Compare(CmpOp, Box<Predicate>, Box<Predicate>),
    Arith(ArithOp, Box<Predicate>, Box<Predicate>),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
    Implies(Box<Predicate>, Box<Predicate>),
    /// Uninterpreted function or measure applied to terms: `len(xs)`
    App(String, Vec<Predicate>),
}

/// Result of evaluating a ground predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Int(i64),
}

impl Predicate {
    pub fn var(name: impl Into<String>) -> Predicate {
        Predicate::Var(name.into())
    }

    pub fn compare(op: CmpOp, left: Predicate, right: Predicate) -> Predicate {
        Predicate::Compare(op, Box::new(left), Box::new(right))
    }

    pub fn arith(op: ArithOp, left: Predicate, right: Predicate) -> Predicate {
        Predicate::Arith(op, Box::new(left), Box::new(right))
    }

    pub fn and(self, other: Predicate) -> Predicate {
        Predicate::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Predicate) -> Predicate {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }

    pub fn implies(self, other: Predicate) -> Predicate {
        Predicate::Implies(Box::new(self), Box::new(other))
    }

    /// Variables the predicate refers to. Applied function names are not
    /// variables.
    pub fn free_vars(&self) -> BTreeSet<String> {
        let mut vars = BTreeSet::new();
        self.collect_vars(&mut vars);
        vars
    }

    fn collect_vars(&self, vars: &mut BTreeSet<String>) {
        match self {
            Predicate::Bool(_) | Predicate::Int(_) => {}
            Predicate::Var(name) => {
                vars.insert(name.clone());
            }
            Predicate::Compare(_, l, r)
            | Predicate::Arith(_, l, r)
            | Predicate::And(l, r)
            | Predicate::Or(l, r)
            | Predicate::Implies(l, r) => {
                l.collect_vars(vars);
                r.collect_vars(vars);
            }
            Predicate::Not(inner) => inner.collect_vars(vars),
            Predicate::App(_, args) => {
                for arg in args {
                    arg.collect_vars(vars);
                }
            }
        }
    }

    /// Evaluate a predicate without free variables or applications.
    /// Returns `None` when it is not ground, is ill-typed, or divides by zero.
    pub fn eval(&self) -> Option<Value> {
        match self {
            Predicate::Bool(b) => Some(Value::Bool(*b)),
            Predicate::Int(n) => Some(Value::Int(*n)),
            Predicate::Var(_) | Predicate::App(..) => None,
            Predicate::Compare(op, l, r) => match (l.eval()?, r.eval()?) {
                (Value::Int(a), Value::Int(b)) => {
                    let result = match op {
                        CmpOp::Eq => a == b,
                        CmpOp::Ne => a != b,
                        CmpOp::Lt => a < b,
                        CmpOp::Le => a <= b,
                        CmpOp::Gt => a > b,
                        CmpOp::Ge => a >= b,
                    };
                    Some(Value::Bool(result))
                }
                (Value::Bool(a), Value::Bool(b)) => match op {
                    CmpOp::Eq => Some(Value::Bool(a == b)),
                    CmpOp::Ne => Some(Value::Bool(a != b)),
                    _ => None,
                },
                _ => None,
            },
            Predicate::Arith(op, l, r) => {
                let a = l.eval_int()?;
                let b = r.eval_int()?;
                let result = match op {
                    ArithOp::Add => a.checked_add(b)?,
                    ArithOp::Sub => a.checked_sub(b)?,
                    ArithOp::Mul => a.checked_mul(b)?,
                    ArithOp::Div => a.checked_div(b)?,
                    ArithOp::Mod => a.checked_rem(b)?,
                };
                Some(Value::Int(result))
            }
            Predicate::And(l, r) => Some(Value::Bool(l.eval_bool()? && r.eval_bool()?)),
            Predicate::Or(l, r) => Some(Value::Bool(l.eval_bool()? || r.eval_bool()?)),
            Predicate::Implies(l, r) => Some(Value::Bool(!l.eval_bool()? || r.eval_bool()?)),
            Predicate::Not(inner) => Some(Value::Bool(!inner.eval_bool()?)),
        }
    }

    pub fn eval_bool(&self) -> Option<bool> {
        match self.eval()? {
            Value::Bool(b) => Some(b),
            Value::Int(_) => None,
        }
    }

    fn eval_int(&self) -> Option<i64> {
        match self.eval()? {
            Value::Int(n) => Some(n),
            Value::Bool(_) => None,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Bool(b) => write!(f, "{}", b),
            Predicate::Int(n) => write!(f, "{}", n),
            Predicate::Var(name) => write!(f, "{}", name),
            Predicate::Compare(op, l, r) => write!(f, "{} {} {}", l, op.symbol(), r),
            Predicate::Arith(op, l, r) => write!(f, "({} {} {})", l, op.symbol(), r),
            Predicate::And(l, r) => write!(f, "({} && {})", l, r),
            Predicate::Or(l, r) => write!(f, "({} || {})", l, r),
            Predicate::Implies(l, r) => write!(f, "({} => {})", l, r),
            Predicate::Not(inner) => write!(f, "!{}", inner),
            Predicate::App(name, args) => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

// ============================================================================
// Refinement types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefinementKind {
    Invariant,
    Precondition,
    Postcondition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strength {
    Weak,
    Strong,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Refinement {
    /// The variable standing for the refined value
    pub var: String,
    pub predicate: Predicate,
    pub kind: RefinementKind,
    pub strength: Strength,
}

impl Refinement {
    /// A strong invariant on `var`
    pub fn invariant(var: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            var: var.into(),
            predicate,
            kind: RefinementKind::Invariant,
            strength: Strength::Strong,
        }
    }

    pub fn with_kind(mut self, kind: RefinementKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn weak(mut self) -> Self {
        self.strength = Strength::Weak;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub name: String,
    pub body: Predicate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lemma {
    pub name: String,
    pub statement: Predicate,
}

/// Facts available while checking a refinement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefinementContext {
    pub assumptions: Vec<Predicate>,
    pub definitions: Vec<Definition>,
    pub axioms: Vec<Predicate>,
    pub lemmas: Vec<Lemma>,
}

impl RefinementContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assume(mut self, fact: Predicate) -> Self {
        self.assumptions.push(fact);
        self
    }

    pub fn define(mut self, name: impl Into<String>, body: Predicate) -> Self {
        self.definitions.push(Definition {
            name: name.into(),
            body,
        });
        self
    }

    pub fn axiom(mut self, fact: Predicate) -> Self {
        self.axioms.push(fact);
        self
    }

    pub fn defines(&self, name: &str) -> bool {
        self.definitions.iter().any(|d| d.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct RefinementType {
    pub id: AdvancedTypeId,
    pub base: Type,
    pub refinements: Vec<Refinement>,
    pub proof: ProofObligation,
    pub context: RefinementContext,
}

impl RefinementType {
    /// A refinement of `base` with a pending, goal-free proof obligation
    pub fn new(id: AdvancedTypeId, base: Type) -> Self {
        Self {
            id,
            base,
            refinements: Vec::new(),
            proof: ProofObligation::new(),
            context: RefinementContext::default(),
        }
    }

    pub fn with_refinement(mut self, refinement: Refinement) -> Self {
        self.refinements.push(refinement);
        self
    }

    pub fn with_proof_goal(mut self, goal: ProofGoal) -> Self {
        self.proof.goals.push(goal);
        self
    }

    pub fn with_context(mut self, context: RefinementContext) -> Self {
        self.context = context;
        self
    }

    pub fn display_name(&self) -> String {
        let Some(first) = self.refinements.first() else {
            return self.base.to_string();
        };
        let preds: Vec<String> = self.refinements.iter().map(|r| r.predicate.to_string()).collect();
        format!("{{{}: {} | {}}}", first.var, self.base, preds.join(" && "))
    }

    /// Check every refinement predicate. `in_scope` reports names bound
    /// outside the type, such as environment bindings.
    pub fn check_predicates(&self, in_scope: impl Fn(&str) -> bool, diags: &mut Diagnostics) {
        let mut referenced: HashSet<String> = HashSet::new();
        let mut seen: Vec<&Predicate> = Vec::new();

        for refinement in &self.refinements {
            if refinement.var.is_empty() {
                diags.error(ErrorKind::RefinementFailure, "refinement binds no variable");
            }

            for var in refinement.predicate.free_vars() {
                let bound = var == refinement.var || self.context.defines(&var) || in_scope(&var);
                if !bound {
                    diags.error(
                        ErrorKind::RefinementFailure,
                        format!("unbound variable `{}` in refinement `{}`", var, refinement.predicate),
                    );
                }
                referenced.insert(var);
            }

            if refinement.predicate.eval_bool() == Some(false) {
                diags.error(
                    ErrorKind::RefinementFailure,
                    format!("refinement `{}` can never hold", refinement.predicate),
                );
            }

            if seen.contains(&&refinement.predicate) {
                diags.warn(
                    WarningKind::RedundantConstraint,
                    format!("refinement `{}` is repeated", refinement.predicate),
                );
            } else {
                seen.push(&refinement.predicate);
            }

            if refinement.kind == RefinementKind::Postcondition && refinement.strength == Strength::Weak {
                diags.warn(
                    WarningKind::RefinementWeakened,
                    format!("postcondition `{}` is only weakly enforced", refinement.predicate),
                );
            }
        }

        for def in &self.context.definitions {
            if !referenced.contains(&def.name) {
                diags.warn(
                    WarningKind::UnusedVariable,
                    format!("definition `{}` is never referenced", def.name),
                );
            }
        }
    }

    pub fn validate(&self, diags: &mut Diagnostics) {
        if *self.base.kind() == TypeKind::Invalid {
            diags.error(ErrorKind::KindMismatch, "refinement of an invalid base type");
        }
        self.check_predicates(|_| false, diags);
        if self.proof.status == ProofStatus::Failed {
            diags.error(
                ErrorKind::ProofObligationUnsatisfied,
                format!("proof obligation for `{}` has failed", self.display_name()),
            );
        }
    }
}
