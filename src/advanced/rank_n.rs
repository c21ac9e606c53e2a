//! Higher-rank polymorphic types

use std::collections::HashSet;
use std::fmt;

use super::AdvancedTypeId;
use crate::diagnostics::{Diagnostics, ErrorKind};
use crate::types::{Type, TypeConstraint, TypeVar};

/// The kind of a quantified variable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Kind of ordinary types
    Star,
    Arrow(Box<Kind>, Box<Kind>),
    Effect,
    Row,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Star => write!(f, "*"),
            Kind::Arrow(from, to) => write!(f, "({} -> {})", from, to),
            Kind::Effect => write!(f, "Effect"),
            Kind::Row => write!(f, "Row"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quantifier {
    pub var: TypeVar,
    pub kind: Kind,
    pub constraints: Vec<TypeConstraint>,
}

impl Quantifier {
    pub fn new(var: TypeVar, kind: Kind) -> Self {
        Self {
            var,
            kind,
            constraints: Vec::new(),
        }
    }

    pub fn with_constraint(mut self, constraint: TypeConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}

/// Inclusive bounds on the rank a type may have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankConstraint {
    pub min_rank: u32,
    pub max_rank: u32,
}

impl RankConstraint {
    pub fn new(min_rank: u32, max_rank: u32) -> Self {
        Self { min_rank, max_rank }
    }

    pub fn admits(&self, rank: u32) -> bool {
        self.min_rank <= rank && rank <= self.max_rank
    }
}

#[derive(Debug, Clone)]
pub struct RankNType {
    pub id: AdvancedTypeId,
    pub rank: u32,
    pub quantifiers: Vec<Quantifier>,
    pub body: Type,
    pub rank_constraints: Vec<RankConstraint>,
}

impl RankNType {
    pub fn new(id: AdvancedTypeId, rank: u32, body: Type) -> Self {
        Self {
            id,
            rank,
            quantifiers: Vec::new(),
            body,
            rank_constraints: Vec::new(),
        }
    }

    pub fn with_quantifier(mut self, quantifier: Quantifier) -> Self {
        self.quantifiers.push(quantifier);
        self
    }

    pub fn with_rank_constraint(mut self, constraint: RankConstraint) -> Self {
        self.rank_constraints.push(constraint);
        self
    }

    pub fn display_name(&self) -> String {
        if self.quantifiers.is_empty() {
            return self.body.to_string();
        }
        let vars: Vec<&str> = self.quantifiers.iter().map(|q| q.var.name.as_str()).collect();
        format!("forall {}. {}", vars.join(" "), self.body)
    }

    /// Report rank constraints that exclude this type's rank
    pub fn check_rank_constraints(&self, diags: &mut Diagnostics) {
        for constraint in &self.rank_constraints {
            if constraint.min_rank > constraint.max_rank {
                diags.error(
                    ErrorKind::ConstraintUnsatisfiable,
                    format!(
                        "rank constraint {}..{} is empty",
                        constraint.min_rank, constraint.max_rank
                    ),
                );
            } else if !constraint.admits(self.rank) {
                diags.error(
                    ErrorKind::RankMismatch,
                    format!(
                        "rank {} is outside the allowed range {}..{}",
                        self.rank, constraint.min_rank, constraint.max_rank
                    ),
                );
            }
        }
    }

    pub fn validate(&self, diags: &mut Diagnostics) {
        if self.rank == 0 && !self.quantifiers.is_empty() {
            diags.error(
                ErrorKind::RankMismatch,
                "a rank-0 type cannot quantify over variables",
            );
        }

        let mut seen = HashSet::new();
        for (i, q) in self.quantifiers.iter().enumerate() {
            if q.var.name.is_empty() {
                diags.error(
                    ErrorKind::KindMismatch,
                    format!("quantifier {} has an empty variable name", i),
                );
            } else if !seen.insert(q.var.name.as_str()) {
                diags.error(
                    ErrorKind::KindMismatch,
                    format!("type variable `{}` is quantified twice", q.var.name),
                );
            }
        }

        self.check_rank_constraints(diags);
    }
}
