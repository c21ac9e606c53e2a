//! Well-formedness of advanced types, independent of any expression

use tracing::debug;

use crate::advanced::AdvancedType;
use crate::config::CheckerConfig;
use crate::diagnostics::{CheckError, CheckWarning, Diagnostics};
use crate::types::Type;

#[derive(Debug, Clone, PartialEq)]
pub struct TypeValidationResult {
    pub valid: bool,
    pub errors: Vec<CheckError>,
    pub warnings: Vec<CheckWarning>,
}

/// Validate `ty` and every advanced type nested in a rank-N body or in a
/// linear or refinement base
pub fn validate_well_formedness(ty: &AdvancedType, config: &CheckerConfig) -> TypeValidationResult {
    let mut diags = Diagnostics::new();
    validate_into(ty, config, &mut diags);
    debug!(
        ty = %ty,
        errors = diags.errors.len(),
        warnings = diags.warnings.len(),
        "validated advanced type"
    );
    TypeValidationResult {
        valid: !diags.has_errors(),
        errors: diags.errors,
        warnings: diags.warnings,
    }
}

fn validate_into(ty: &AdvancedType, config: &CheckerConfig, diags: &mut Diagnostics) {
    ty.validate(config, diags);
    let nested: Option<&Type> = match ty {
        AdvancedType::RankN(t) => Some(&t.body),
        AdvancedType::Linear(t) => Some(&t.base),
        AdvancedType::Refinement(t) => Some(&t.base),
        AdvancedType::Dependent(_) | AdvancedType::Effect(_) => None,
    };
    if let Some(inner) = nested.and_then(Type::as_advanced) {
        validate_into(inner, config, diags);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advanced::effect::{Effect, EffectKind, Purity};
    use crate::advanced::linear::{Multiplicity, UsageKind};
    use crate::advanced::{AdvancedTypeId, EffectType, LinearType, RefinementType};
    use crate::diagnostics::ErrorKind;

    #[test]
    fn test_pure_with_effects_is_ill_formed() {
        let ty = EffectType::new(AdvancedTypeId(1), Purity::Pure)
            .with_effect(Effect::new("State", EffectKind::State));
        let result = validate_well_formedness(&ty.into(), &CheckerConfig::default());
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.kind == ErrorKind::EffectMismatch));
    }

    #[test]
    fn test_well_formed_linear() {
        let ty = LinearType::new(AdvancedTypeId(1), Type::int(), UsageKind::Linear);
        let result = validate_well_formedness(&ty.into(), &CheckerConfig::default());
        assert!(result.valid, "{:?}", result.errors);
    }

    #[test]
    fn test_nested_base_is_validated() {
        let inner = LinearType::new(AdvancedTypeId(1), Type::int(), UsageKind::Linear)
            .with_multiplicity(Multiplicity::bounded(3, 1));
        let outer = RefinementType::new(AdvancedTypeId(2), AdvancedType::from(inner).to_type());
        let result = validate_well_formedness(&outer.into(), &CheckerConfig::default());
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.kind == ErrorKind::LinearityViolation));
    }
}
