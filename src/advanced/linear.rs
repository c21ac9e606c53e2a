//! Linear, affine and relevant resource types

use std::fmt;

use super::AdvancedTypeId;
use crate::ast::AccessKind;
use crate::diagnostics::{Diagnostics, ErrorKind};
use crate::types::{Type, TypeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsageKind {
    /// Exactly once
    Linear,
    /// At most once
    Affine,
    /// At least once
    Relevant,
    Unrestricted,
}

impl fmt::Display for UsageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UsageKind::Linear => "linear",
            UsageKind::Affine => "affine",
            UsageKind::Relevant => "relevant",
            UsageKind::Unrestricted => "unrestricted",
        };
        write!(f, "{}", s)
    }
}

/// Allowed usage count range. `max = None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Multiplicity {
    pub min: u32,
    pub max: Option<u32>,
}

impl Multiplicity {
    pub fn exactly(n: u32) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    pub fn bounded(min: u32, max: u32) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    pub fn at_least(min: u32) -> Self {
        Self { min, max: None }
    }

    /// The canonical range of a usage discipline
    pub fn for_usage(usage: UsageKind) -> Self {
        match usage {
            UsageKind::Linear => Multiplicity::exactly(1),
            UsageKind::Affine => Multiplicity::bounded(0, 1),
            UsageKind::Relevant => Multiplicity::at_least(1),
            UsageKind::Unrestricted => Multiplicity::at_least(0),
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.max.map_or(true, |max| self.min <= max)
    }

    pub fn admits(&self, count: u32) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }

    /// Whether this range fits inside the one a usage discipline allows
    pub fn respects(&self, usage: UsageKind) -> bool {
        let canonical = Multiplicity::for_usage(usage);
        let max_ok = match (canonical.max, self.max) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(limit), Some(max)) => max <= limit,
        };
        self.min >= canonical.min && max_ok
    }
}

impl fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "[{}..{}]", self.min, max),
            None => write!(f, "[{}..*]", self.min),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifetimeKind {
    Static,
    Scoped,
    Local,
    /// Sentinel for a lifetime that could not be resolved
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lifetime {
    pub kind: LifetimeKind,
    pub name: String,
}

impl Lifetime {
    pub fn new(kind: LifetimeKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    pub fn static_lifetime() -> Self {
        Lifetime::new(LifetimeKind::Static, "static")
    }

    pub fn scoped(name: impl Into<String>) -> Self {
        Lifetime::new(LifetimeKind::Scoped, name)
    }
}

/// The read/write/move/borrow permission tuple
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AccessPermissions {
    pub read: bool,
    pub write: bool,
    pub moves: bool,
    pub borrow: bool,
}

impl AccessPermissions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            read: true,
            write: true,
            moves: true,
            borrow: true,
        }
    }

    pub fn read_only() -> Self {
        Self {
            read: true,
            borrow: true,
            ..Self::default()
        }
    }

    /// The single permission an access needs
    pub fn from_access(access: AccessKind) -> Self {
        let mut perms = Self::none();
        match access {
            AccessKind::Read => perms.read = true,
            AccessKind::Write => perms.write = true,
            AccessKind::Move => perms.moves = true,
            AccessKind::Borrow => perms.borrow = true,
        }
        perms
    }

    pub fn union(self, other: AccessPermissions) -> Self {
        Self {
            read: self.read || other.read,
            write: self.write || other.write,
            moves: self.moves || other.moves,
            borrow: self.borrow || other.borrow,
        }
    }

    /// True when every permission set in `required` is also set here
    pub fn covers(&self, required: &AccessPermissions) -> bool {
        self.missing(required).is_empty()
    }

    /// Names of the permissions in `required` that are not granted
    pub fn missing(&self, required: &AccessPermissions) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if required.read && !self.read {
            missing.push("read");
        }
        if required.write && !self.write {
            missing.push("write");
        }
        if required.moves && !self.moves {
            missing.push("move");
        }
        if required.borrow && !self.borrow {
            missing.push("borrow");
        }
        missing
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearRegion {
    pub name: String,
    pub lifetime: Lifetime,
    pub permissions: AccessPermissions,
}

impl LinearRegion {
    pub fn new(name: impl Into<String>, lifetime: Lifetime, permissions: AccessPermissions) -> Self {
        Self {
            name: name.into(),
            lifetime,
            permissions,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinearConstraintKind {
    /// The resource must be used by the expression
    Consume,
    /// The resource may not be referenced more than once
    NoAlias,
    /// The resource may only be borrowed, never moved
    Borrow,
    /// The resource may not be captured by a closure
    NoEscape,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub kind: LinearConstraintKind,
    pub resource: String,
}

impl LinearConstraint {
    pub fn new(kind: LinearConstraintKind, resource: impl Into<String>) -> Self {
        Self {
            kind,
            resource: resource.into(),
        }
    }
}

impl fmt::Display for LinearConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.kind {
            LinearConstraintKind::Consume => "consume",
            LinearConstraintKind::NoAlias => "no_alias",
            LinearConstraintKind::Borrow => "borrow",
            LinearConstraintKind::NoEscape => "no_escape",
        };
        write!(f, "{}({})", name, self.resource)
    }
}

#[derive(Debug, Clone)]
pub struct LinearType {
    pub id: AdvancedTypeId,
    pub base: Type,
    pub usage: UsageKind,
    pub multiplicity: Multiplicity,
    pub region: LinearRegion,
    pub constraints: Vec<LinearConstraint>,
}

impl LinearType {
    /// A resource of `base` with the canonical multiplicity of `usage`,
    /// living in a static region with every permission granted
    pub fn new(id: AdvancedTypeId, base: Type, usage: UsageKind) -> Self {
        Self {
            id,
            base,
            usage,
            multiplicity: Multiplicity::for_usage(usage),
            region: LinearRegion::new("static", Lifetime::static_lifetime(), AccessPermissions::all()),
            constraints: Vec::new(),
        }
    }

    pub fn with_multiplicity(mut self, multiplicity: Multiplicity) -> Self {
        self.multiplicity = multiplicity;
        self
    }

    pub fn with_region(mut self, region: LinearRegion) -> Self {
        self.region = region;
        self
    }

    pub fn with_constraint(mut self, constraint: LinearConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.usage, self.base)
    }

    pub fn validate(&self, diags: &mut Diagnostics) {
        if *self.base.kind() == TypeKind::Invalid {
            diags.error(ErrorKind::KindMismatch, "linear type has an invalid base type");
        }

        if !self.multiplicity.is_well_formed() {
            diags.error(
                ErrorKind::LinearityViolation,
                format!("multiplicity {} has min greater than max", self.multiplicity),
            );
        } else if !self.multiplicity.respects(self.usage) {
            diags.error(
                ErrorKind::LinearityViolation,
                format!(
                    "multiplicity {} is not allowed for a {} resource (expected within {})",
                    self.multiplicity,
                    self.usage,
                    Multiplicity::for_usage(self.usage)
                ),
            );
        }

        if self.region.lifetime.kind == LifetimeKind::Invalid {
            diags.error(
                ErrorKind::LinearityViolation,
                format!("region `{}` has an invalid lifetime", self.region.name),
            );
        }

        for constraint in &self.constraints {
            if constraint.resource.is_empty() {
                diags.error(
                    ErrorKind::ConstraintUnsatisfiable,
                    format!("{} names no resource", constraint),
                );
            }
            if constraint.kind == LinearConstraintKind::NoAlias && self.usage == UsageKind::Unrestricted {
                diags.error(
                    ErrorKind::ConstraintUnsatisfiable,
                    format!("{} cannot hold for an unrestricted resource", constraint),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplicity_for_usage() {
        assert_eq!(Multiplicity::for_usage(UsageKind::Linear), Multiplicity::exactly(1));
        assert_eq!(Multiplicity::for_usage(UsageKind::Affine), Multiplicity::bounded(0, 1));
        assert!(Multiplicity::for_usage(UsageKind::Relevant).admits(7));
        assert!(!Multiplicity::for_usage(UsageKind::Relevant).admits(0));
        assert!(Multiplicity::for_usage(UsageKind::Unrestricted).admits(0));
    }

    #[test]
    fn test_multiplicity_respects_usage() {
        assert!(Multiplicity::exactly(1).respects(UsageKind::Affine));
        assert!(!Multiplicity::at_least(1).respects(UsageKind::Linear));
        assert!(Multiplicity::bounded(2, 5).respects(UsageKind::Relevant));
    }

    #[test]
    fn test_permissions_cover() {
        let granted = AccessPermissions::read_only();
        let write = AccessPermissions::from_access(AccessKind::Write);
        assert!(!granted.covers(&write));
        assert_eq!(granted.missing(&write), vec!["write"]);
        assert!(AccessPermissions::all().covers(&write));
        assert!(granted.covers(&AccessPermissions::none()));
    }

    #[test]
    fn test_validate_min_greater_than_max() {
        let ty = LinearType::new(AdvancedTypeId(0), Type::int(), UsageKind::Unrestricted)
            .with_multiplicity(Multiplicity::bounded(3, 1));
        let mut diags = Diagnostics::new();
        ty.validate(&mut diags);
        assert!(diags.has_error(ErrorKind::LinearityViolation));
    }

    #[test]
    fn test_validate_invalid_lifetime() {
        let region = LinearRegion::new(
            "r",
            Lifetime::new(LifetimeKind::Invalid, "?"),
            AccessPermissions::all(),
        );
        let ty = LinearType::new(AdvancedTypeId(0), Type::int(), UsageKind::Linear).with_region(region);
        let mut diags = Diagnostics::new();
        ty.validate(&mut diags);
        assert_eq!(diags.errors.len(), 1);
        assert!(diags.errors[0].message.contains("invalid lifetime"));
    }

    #[test]
    fn test_validate_well_formed() {
        let ty = LinearType::new(AdvancedTypeId(0), Type::int(), UsageKind::Linear)
            .with_constraint(LinearConstraint::new(LinearConstraintKind::Consume, "h"));
        let mut diags = Diagnostics::new();
        ty.validate(&mut diags);
        assert!(!diags.has_errors());
    }
}
