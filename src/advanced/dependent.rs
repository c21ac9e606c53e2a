//! Dependent types indexed by values

use std::fmt;

use super::AdvancedTypeId;
use crate::diagnostics::{Diagnostics, ErrorKind};
use crate::types::{Type, TypeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// Depends on a runtime value
    Value,
    /// Depends on another type
    Type,
    /// Depends on a type-level index
    Index,
}

/// What the type depends on: a variable and optionally the expression it
/// was computed from
#[derive(Debug, Clone, PartialEq)]
pub struct ValueDependency {
    pub kind: DependencyKind,
    pub variable: String,
    pub expression: Option<String>,
}

impl ValueDependency {
    pub fn new(kind: DependencyKind, variable: impl Into<String>) -> Self {
        Self {
            kind,
            variable: variable.into(),
            expression: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: Type,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeConstructor {
    pub name: String,
    pub params: Vec<Parameter>,
}

impl TypeConstructor {
    pub fn new(name: impl Into<String>, params: Vec<Parameter>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

/// Case analysis over the family; one case per constructor it handles
#[derive(Debug, Clone, PartialEq)]
pub struct Eliminator {
    pub name: String,
    pub cases: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexConstraint {
    Equal(i64),
    AtLeast(i64),
    AtMost(i64),
}

impl IndexConstraint {
    pub fn admits(&self, value: i64) -> bool {
        match *self {
            IndexConstraint::Equal(n) => value == n,
            IndexConstraint::AtLeast(n) => value >= n,
            IndexConstraint::AtMost(n) => value <= n,
        }
    }
}

impl fmt::Display for IndexConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexConstraint::Equal(n) => write!(f, "== {}", n),
            IndexConstraint::AtLeast(n) => write!(f, ">= {}", n),
            IndexConstraint::AtMost(n) => write!(f, "<= {}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeIndex {
    pub name: String,
    pub ty: Type,
    /// Statically known value of the index, when there is one
    pub value: Option<i64>,
    pub constraints: Vec<IndexConstraint>,
}

impl TypeIndex {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            value: None,
            constraints: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: i64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_constraint(mut self, constraint: IndexConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}

#[derive(Debug, Clone)]
pub struct DependentType {
    pub id: AdvancedTypeId,
    pub dependency: ValueDependency,
    pub constructor: TypeConstructor,
    pub eliminator: Option<Eliminator>,
    pub indices: Vec<TypeIndex>,
    pub universe_level: u32,
}

impl DependentType {
    pub fn new(id: AdvancedTypeId, dependency: ValueDependency, constructor: TypeConstructor) -> Self {
        Self {
            id,
            dependency,
            constructor,
            eliminator: None,
            indices: Vec::new(),
            universe_level: 0,
        }
    }

    pub fn with_index(mut self, index: TypeIndex) -> Self {
        self.indices.push(index);
        self
    }

    pub fn with_eliminator(mut self, eliminator: Eliminator) -> Self {
        self.eliminator = Some(eliminator);
        self
    }

    pub fn at_universe(mut self, level: u32) -> Self {
        self.universe_level = level;
        self
    }

    pub fn display_name(&self) -> String {
        if self.indices.is_empty() {
            return self.constructor.name.clone();
        }
        let indices: Vec<&str> = self.indices.iter().map(|i| i.name.as_str()).collect();
        format!("{}[{}]", self.constructor.name, indices.join(", "))
    }

    /// Structural checks. Every failing check records its own error and the
    /// remaining checks still run.
    pub fn validate(&self, max_universe_level: u32, diags: &mut Diagnostics) {
        if self.dependency.variable.is_empty() {
            diags.error(ErrorKind::DependencyMismatch, "dependency names no variable");
        }

        if self.constructor.name.is_empty() {
            diags.error(ErrorKind::DependencyMismatch, "type constructor has an empty name");
        }
        for (i, param) in self.constructor.params.iter().enumerate() {
            if param.name.is_empty() {
                diags.error(
                    ErrorKind::DependencyMismatch,
                    format!("parameter {} of `{}` is unnamed", i, self.constructor.name),
                );
            }
        }

        if self.universe_level > max_universe_level {
            diags.error(
                ErrorKind::DependencyMismatch,
                format!(
                    "universe level {} exceeds the maximum of {}",
                    self.universe_level, max_universe_level
                ),
            );
        }

        if let Some(elim) = &self.eliminator {
            if !elim.cases.iter().any(|c| *c == self.constructor.name) {
                diags.error(
                    ErrorKind::DependencyMismatch,
                    format!(
                        "eliminator `{}` has no case for `{}`",
                        elim.name, self.constructor.name
                    ),
                );
            }
        }

        for index in &self.indices {
            self.validate_index(index, diags);
        }
    }

    fn validate_index(&self, index: &TypeIndex, diags: &mut Diagnostics) {
        if index.name.is_empty() {
            diags.error(
                ErrorKind::DependencyMismatch,
                format!("`{}` has an unnamed index", self.constructor.name),
            );
        }
        if *index.ty.kind() == TypeKind::Invalid {
            diags.error(
                ErrorKind::KindMismatch,
                format!("index `{}` has an invalid type", index.name),
            );
        }
        if let Some(value) = index.value {
            for constraint in &index.constraints {
                if !constraint.admits(value) {
                    diags.error(
                        ErrorKind::ConstraintUnsatisfiable,
                        format!(
                            "index `{}` = {} violates constraint {}",
                            index.name, value, constraint
                        ),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector() -> DependentType {
        DependentType::new(
            AdvancedTypeId(0),
            ValueDependency::new(DependencyKind::Value, "n"),
            TypeConstructor::new("Vec", vec![Parameter::new("elem", Type::int())]),
        )
        .with_index(TypeIndex::new("n", Type::int()))
    }

    #[test]
    fn test_display_name() {
        assert_eq!(vector().display_name(), "Vec[n]");
    }

    #[test]
    fn test_well_formed() {
        let mut diags = Diagnostics::new();
        vector().validate(64, &mut diags);
        assert!(!diags.has_errors());
    }

    #[test]
    fn test_all_checks_run() {
        let ty = DependentType::new(
            AdvancedTypeId(0),
            ValueDependency::new(DependencyKind::Value, ""),
            TypeConstructor::new("", vec![Parameter::new("", Type::int())]),
        )
        .at_universe(100);
        let mut diags = Diagnostics::new();
        ty.validate(64, &mut diags);
        assert_eq!(diags.errors.len(), 4);
    }

    #[test]
    fn test_index_constraint_violation() {
        let ty = vector().with_index(
            TypeIndex::new("m", Type::int())
                .with_value(12)
                .with_constraint(IndexConstraint::AtMost(10)),
        );
        let mut diags = Diagnostics::new();
        ty.validate(64, &mut diags);
        assert!(diags.has_error(ErrorKind::ConstraintUnsatisfiable));
    }

    #[test]
    fn test_eliminator_missing_case() {
        let ty = vector().with_eliminator(Eliminator {
            name: "fold".into(),
            cases: vec!["List".into()],
        });
        let mut diags = Diagnostics::new();
        ty.validate(64, &mut diags);
        assert_eq!(diags.errors.len(), 1);
    }
}
