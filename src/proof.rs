//! Proof obligations attached to refinement types and the engine that
//! discharges them

use std::fmt;

use tracing::debug;

use crate::advanced::refinement::{Predicate, RefinementContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GoalKind {
    Implication,
    Equality,
    Inequality,
    Membership,
    Existence,
    Uniqueness,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProofGoal {
    pub statement: Predicate,
    /// Hypotheses local to this goal
    pub context: Vec<Predicate>,
    pub kind: GoalKind,
}

impl ProofGoal {
    pub fn new(kind: GoalKind, statement: Predicate) -> Self {
        Self {
            statement,
            context: Vec::new(),
            kind,
        }
    }

    pub fn assuming(mut self, hypothesis: Predicate) -> Self {
        self.context.push(hypothesis);
        self
    }
}

impl fmt::Display for ProofGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, hyp) in self.context.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", hyp)?;
        }
        if !self.context.is_empty() {
            write!(f, " |- ")?;
        }
        write!(f, "{}", self.statement)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tactic {
    Intro,
    Apply(String),
    Rewrite(String),
    Induction(String),
    Simplify,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProofStatus {
    Pending,
    Partial,
    Complete,
    Failed,
}

impl fmt::Display for ProofStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProofStatus::Pending => "pending",
            ProofStatus::Partial => "partial",
            ProofStatus::Complete => "complete",
            ProofStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProofObligation {
    pub goals: Vec<ProofGoal>,
    pub hypotheses: Vec<Predicate>,
    pub tactics: Vec<Tactic>,
    pub status: ProofStatus,
}

impl ProofObligation {
    /// A pending obligation with no goals
    pub fn new() -> Self {
        Self {
            goals: Vec::new(),
            hypotheses: Vec::new(),
            tactics: Vec::new(),
            status: ProofStatus::Pending,
        }
    }

    pub fn with_goal(mut self, goal: ProofGoal) -> Self {
        self.goals.push(goal);
        self
    }

    pub fn is_trivial(&self) -> bool {
        self.status == ProofStatus::Complete || self.goals.is_empty()
    }
}

impl Default for ProofObligation {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of trying to discharge an obligation
#[derive(Debug, Clone, PartialEq)]
pub struct Discharge {
    pub success: bool,
    /// The goals could not be closed automatically and need a manual proof
    pub required_proof: bool,
    pub error: Option<String>,
}

impl Discharge {
    fn proved() -> Self {
        Self {
            success: true,
            required_proof: false,
            error: None,
        }
    }
}

/// Discharges proof obligations.
///
/// Obligations that are already complete or carry no goals are accepted.
/// Anything else is reported as needing a manual proof; an automatic
/// prover would close decidable goals here before falling back to that.
#[derive(Debug, Default)]
pub struct ProofEngine {
    discharged: usize,
    deferred: usize,
}

impl ProofEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn discharge_obligation(
        &mut self,
        obligation: &ProofObligation,
        context: &RefinementContext,
    ) -> Discharge {
        if obligation.is_trivial() {
            self.discharged += 1;
            return Discharge::proved();
        }

        self.deferred += 1;
        debug!(
            goals = obligation.goals.len(),
            assumptions = context.assumptions.len(),
            "proof obligation needs a manual proof"
        );
        let goals: Vec<String> = obligation.goals.iter().map(|g| g.to_string()).collect();
        Discharge {
            success: false,
            required_proof: true,
            error: Some(format!("unproved goals: {}", goals.join("; "))),
        }
    }

    /// Obligations accepted so far
    pub fn discharged(&self) -> usize {
        self.discharged
    }

    /// Obligations handed back for a manual proof so far
    pub fn deferred(&self) -> usize {
        self.deferred
    }
}
