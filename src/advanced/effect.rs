//! Effect types: declared effects, purity, regions, capabilities and handlers

use std::collections::HashSet;
use std::fmt;

use super::linear::AccessPermissions;
use super::AdvancedTypeId;
use crate::diagnostics::{Diagnostics, ErrorKind, WarningKind};
use crate::types::{Type, TypeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    IO,
    State,
    Exception,
    Async,
    Nondeterminism,
    Allocation,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Public,
    Internal,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EffectAttributes {
    pub atomic: bool,
    pub idempotent: bool,
    pub commutative: bool,
}

/// An operation an effect exposes, e.g. `get : () -> s` for `State s`
#[derive(Debug, Clone, PartialEq)]
pub struct EffectOperation {
    pub name: String,
    pub params: Vec<Type>,
    pub return_type: Type,
}

impl EffectOperation {
    pub fn new(name: impl Into<String>, params: Vec<Type>, return_type: Type) -> Self {
        Self {
            name: name.into(),
            params,
            return_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Effect {
    pub name: String,
    pub kind: EffectKind,
    pub params: Vec<Type>,
    pub operations: Vec<EffectOperation>,
    pub attributes: EffectAttributes,
    pub visibility: Visibility,
}

impl Effect {
    pub fn new(name: impl Into<String>, kind: EffectKind) -> Self {
        Self {
            name: name.into(),
            kind,
            params: Vec::new(),
            operations: Vec::new(),
            attributes: EffectAttributes::default(),
            visibility: Visibility::default(),
        }
    }

    pub fn with_param(mut self, ty: Type) -> Self {
        self.params.push(ty);
        self
    }

    pub fn with_operation(mut self, op: EffectOperation) -> Self {
        self.operations.push(op);
        self
    }

    pub fn atomic(mut self) -> Self {
        self.attributes.atomic = true;
        self
    }

    pub fn operation(&self, name: &str) -> Option<&EffectOperation> {
        self.operations.iter().find(|op| op.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Purity {
    Pure,
    ReadOnly,
    Impure,
}

impl fmt::Display for Purity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Purity::Pure => "pure",
            Purity::ReadOnly => "read-only",
            Purity::Impure => "impure",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    Global,
    Heap,
    Stack,
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub kind: RegionKind,
    pub name: String,
}

impl Region {
    pub fn new(kind: RegionKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    pub fn global() -> Self {
        Region::new(RegionKind::Global, "global")
    }
}

/// Permission to touch a named resource or region
#[derive(Debug, Clone, PartialEq)]
pub struct Capability {
    pub resource: String,
    pub permissions: AccessPermissions,
}

impl Capability {
    pub fn new(resource: impl Into<String>, permissions: AccessPermissions) -> Self {
        Self {
            resource: resource.into(),
            permissions,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EffectHandler {
    /// The effect this handler intercepts
    pub effect: String,
    /// Operations it implements
    pub operations: Vec<String>,
    pub resumable: bool,
}

impl EffectHandler {
    pub fn new(effect: impl Into<String>, operations: Vec<String>) -> Self {
        Self {
            effect: effect.into(),
            operations,
            resumable: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EffectType {
    pub id: AdvancedTypeId,
    pub effects: Vec<Effect>,
    pub purity: Purity,
    pub region: Region,
    pub capabilities: Vec<Capability>,
    pub handlers: Vec<EffectHandler>,
}

impl EffectType {
    pub fn new(id: AdvancedTypeId, purity: Purity) -> Self {
        Self {
            id,
            effects: Vec::new(),
            purity,
            region: Region::global(),
            capabilities: Vec::new(),
            handlers: Vec::new(),
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn with_handler(mut self, handler: EffectHandler) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn find_effect(&self, name: &str) -> Option<&Effect> {
        self.effects.iter().find(|e| e.name == name)
    }

    pub fn handles(&self, effect: &str) -> bool {
        self.handlers.iter().any(|h| h.effect == effect)
    }

    pub fn capability(&self, resource: &str) -> Option<&Capability> {
        self.capabilities.iter().find(|c| c.resource == resource)
    }

    pub fn display_name(&self) -> String {
        if self.effects.is_empty() {
            return self.purity.to_string();
        }
        let names: Vec<&str> = self.effects.iter().map(|e| e.name.as_str()).collect();
        format!("{} <{}>", self.purity, names.join(", "))
    }

    pub fn validate(&self, diags: &mut Diagnostics) {
        if self.purity == Purity::Pure && !self.effects.is_empty() {
            let names: Vec<&str> = self.effects.iter().map(|e| e.name.as_str()).collect();
            diags.error(
                ErrorKind::EffectMismatch,
                format!("pure effect type declares effects: {}", names.join(", ")),
            );
        }

        if self.purity == Purity::ReadOnly {
            for cap in self.capabilities.iter().filter(|c| c.permissions.write) {
                diags.error(
                    ErrorKind::EffectMismatch,
                    format!("read-only effect type grants write access to `{}`", cap.resource),
                );
            }
        }

        let mut seen = HashSet::new();
        for effect in &self.effects {
            if effect.name.is_empty() {
                diags.error(ErrorKind::EffectMismatch, "effect with an empty name");
                continue;
            }
            if !seen.insert(effect.name.as_str()) {
                diags.warn(
                    WarningKind::RedundantConstraint,
                    format!("effect `{}` is declared more than once", effect.name),
                );
            }
            for op in &effect.operations {
                if op.name.is_empty() {
                    diags.error(
                        ErrorKind::EffectMismatch,
                        format!("effect `{}` has an operation with an empty name", effect.name),
                    );
                }
                if *op.return_type.kind() == TypeKind::Invalid {
                    diags.error(
                        ErrorKind::EffectMismatch,
                        format!("operation `{}.{}` has an invalid return type", effect.name, op.name),
                    );
                }
            }
        }

        for handler in &self.handlers {
            let Some(effect) = self.find_effect(&handler.effect) else {
                diags.error(
                    ErrorKind::EffectMismatch,
                    format!("handler for undeclared effect `{}`", handler.effect),
                );
                continue;
            };
            for op in &handler.operations {
                if effect.operation(op).is_none() {
                    diags.error(
                        ErrorKind::EffectMismatch,
                        format!("handler for `{}` implements unknown operation `{}`", effect.name, op),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> Effect {
        Effect::new("State", EffectKind::State)
            .with_param(Type::int())
            .with_operation(EffectOperation::new("get", vec![], Type::int()))
            .with_operation(EffectOperation::new("put", vec![Type::int()], Type::unit()))
    }

    #[test]
    fn test_pure_with_effects_is_mismatch() {
        let ty = EffectType::new(AdvancedTypeId(0), Purity::Pure).with_effect(state());
        let mut diags = Diagnostics::new();
        ty.validate(&mut diags);
        assert!(diags.has_error(ErrorKind::EffectMismatch));
    }

    #[test]
    fn test_pure_without_effects_is_fine() {
        let ty = EffectType::new(AdvancedTypeId(0), Purity::Pure);
        let mut diags = Diagnostics::new();
        ty.validate(&mut diags);
        assert!(!diags.has_errors());
    }

    #[test]
    fn test_handler_for_unknown_operation() {
        let ty = EffectType::new(AdvancedTypeId(0), Purity::Impure)
            .with_effect(state())
            .with_handler(EffectHandler::new("State", vec!["get".into(), "modify".into()]));
        let mut diags = Diagnostics::new();
        ty.validate(&mut diags);
        assert_eq!(diags.errors.len(), 1);
        assert!(diags.errors[0].message.contains("modify"));
    }

    #[test]
    fn test_invalid_operation_return_type() {
        let effect = Effect::new("IO", EffectKind::IO)
            .with_operation(EffectOperation::new("read", vec![], Type::invalid()));
        let ty = EffectType::new(AdvancedTypeId(0), Purity::Impure).with_effect(effect);
        let mut diags = Diagnostics::new();
        ty.validate(&mut diags);
        assert!(diags.has_error(ErrorKind::EffectMismatch));
    }

    #[test]
    fn test_display_name() {
        let ty = EffectType::new(AdvancedTypeId(0), Purity::Impure).with_effect(state());
        assert_eq!(ty.display_name(), "impure <State>");
        assert_eq!(EffectType::new(AdvancedTypeId(1), Purity::Pure).display_name(), "pure");
    }
}
