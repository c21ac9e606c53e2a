//! The five advanced type variants carried in a type's extension slot

pub mod dependent;
pub mod effect;
pub mod linear;
pub mod rank_n;
pub mod refinement;

use std::fmt;

pub use dependent::DependentType;
pub use effect::EffectType;
pub use linear::LinearType;
pub use rank_n::RankNType;
pub use refinement::RefinementType;

use crate::config::CheckerConfig;
use crate::diagnostics::Diagnostics;
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdvancedKind {
    RankN,
    Dependent,
    Effect,
    Linear,
    Refinement,
}

impl AdvancedKind {
    pub fn tag(&self) -> &'static str {
        match self {
            AdvancedKind::RankN => "RankN",
            AdvancedKind::Dependent => "Dependent",
            AdvancedKind::Effect => "Effect",
            AdvancedKind::Linear => "Linear",
            AdvancedKind::Refinement => "Refinement",
        }
    }
}

impl fmt::Display for AdvancedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Identity of an advanced type, issued per checking session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AdvancedTypeId(pub u32);

impl fmt::Display for AdvancedTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub enum AdvancedType {
    RankN(RankNType),
    Dependent(DependentType),
    Effect(EffectType),
    Linear(LinearType),
    Refinement(RefinementType),
}

impl AdvancedType {
    pub fn kind(&self) -> AdvancedKind {
        match self {
            AdvancedType::RankN(_) => AdvancedKind::RankN,
            AdvancedType::Dependent(_) => AdvancedKind::Dependent,
            AdvancedType::Effect(_) => AdvancedKind::Effect,
            AdvancedType::Linear(_) => AdvancedKind::Linear,
            AdvancedType::Refinement(_) => AdvancedKind::Refinement,
        }
    }

    pub fn id(&self) -> AdvancedTypeId {
        match self {
            AdvancedType::RankN(t) => t.id,
            AdvancedType::Dependent(t) => t.id,
            AdvancedType::Effect(t) => t.id,
            AdvancedType::Linear(t) => t.id,
            AdvancedType::Refinement(t) => t.id,
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            AdvancedType::RankN(t) => t.display_name(),
            AdvancedType::Dependent(t) => t.display_name(),
            AdvancedType::Effect(t) => t.display_name(),
            AdvancedType::Linear(t) => t.display_name(),
            AdvancedType::Refinement(t) => t.display_name(),
        }
    }

    /// Ordinary types carried inside this advanced type
    pub fn component_types(&self) -> Vec<&Type> {
        match self {
            AdvancedType::RankN(t) => vec![&t.body],
            AdvancedType::Dependent(t) => t
                .constructor
                .params
                .iter()
                .map(|p| &p.ty)
                .chain(t.indices.iter().map(|i| &i.ty))
                .collect(),
            AdvancedType::Effect(t) => t
                .effects
                .iter()
                .flat_map(|e| {
                    e.params.iter().chain(
                        e.operations
                            .iter()
                            .flat_map(|op| op.params.iter().chain(std::iter::once(&op.return_type))),
                    )
                })
                .collect(),
            AdvancedType::Linear(t) => vec![&t.base],
            AdvancedType::Refinement(t) => vec![&t.base],
        }
    }

    /// Project into the universal representation
    pub fn to_type(&self) -> Type {
        Type::advanced(self.clone())
    }

    /// Structural well-formedness, independent of any expression
    pub fn validate(&self, config: &CheckerConfig, diags: &mut Diagnostics) {
        match self {
            AdvancedType::RankN(t) => t.validate(diags),
            AdvancedType::Dependent(t) => t.validate(config.max_universe_level, diags),
            AdvancedType::Effect(t) => t.validate(diags),
            AdvancedType::Linear(t) => t.validate(diags),
            AdvancedType::Refinement(t) => t.validate(diags),
        }
    }
}

impl From<RankNType> for AdvancedType {
    fn from(t: RankNType) -> Self {
        AdvancedType::RankN(t)
    }
}

impl From<DependentType> for AdvancedType {
    fn from(t: DependentType) -> Self {
        AdvancedType::Dependent(t)
    }
}

impl From<EffectType> for AdvancedType {
    fn from(t: EffectType) -> Self {
        AdvancedType::Effect(t)
    }
}

impl From<LinearType> for AdvancedType {
    fn from(t: LinearType) -> Self {
        AdvancedType::Linear(t)
    }
}

impl From<RefinementType> for AdvancedType {
    fn from(t: RefinementType) -> Self {
        AdvancedType::Refinement(t)
    }
}

impl fmt::Display for AdvancedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
