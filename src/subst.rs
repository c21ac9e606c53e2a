//! Finite maps from type-variable identity to type

use std::collections::HashMap;

use crate::types::{Type, TypeKind, TypeVarId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Substitution(HashMap<TypeVarId, Type>);

impl Substitution {
    pub fn empty() -> Self {
        Substitution(HashMap::new())
    }

    pub fn singleton(var: TypeVarId, ty: Type) -> Self {
        let mut map = HashMap::new();
        map.insert(var, ty);
        Substitution(map)
    }

    pub fn insert(&mut self, var: TypeVarId, ty: Type) {
        self.0.insert(var, ty);
    }

    pub fn get(&self, var: TypeVarId) -> Option<&Type> {
        self.0.get(&var)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Variables mapped by this substitution
    pub fn domain(&self) -> impl Iterator<Item = TypeVarId> + '_ {
        self.0.keys().copied()
    }

    /// Rewrite `ty`, replacing mapped variables and recursing into
    /// component and field types. Advanced types manage their own binders
    /// and are left untouched.
    pub fn apply(&self, ty: &Type) -> Type {
        if self.0.is_empty() {
            return ty.clone();
        }
        match ty.kind() {
            TypeKind::Var(var) => self.0.get(&var.id).cloned().unwrap_or_else(|| ty.clone()),
            _ => ty.map_children(|child| self.apply(child)),
        }
    }

    /// `self ∘ other`: applying the result equals applying `other`, then `self`.
    pub fn compose(&self, other: &Substitution) -> Substitution {
        let mut result: HashMap<TypeVarId, Type> = other
            .0
            .iter()
            .map(|(var, ty)| (*var, self.apply(ty)))
            .collect();

        for (var, ty) in &self.0 {
            result.entry(*var).or_insert_with(|| ty.clone());
        }

        Substitution(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Field, TypeVar};

    fn var(id: TypeVarId) -> Type {
        Type::var(TypeVar::new(id))
    }

    #[test]
    fn test_empty_substitution() {
        let subst = Substitution::empty();
        let ty = Type::int();
        assert_eq!(subst.apply(&ty), ty);
    }

    #[test]
    fn test_singleton_substitution() {
        let subst = Substitution::singleton(0, Type::int());
        assert_eq!(subst.apply(&var(0)), Type::int());
    }

    #[test]
    fn test_apply_to_function() {
        let subst = Substitution::singleton(0, Type::int());
        let ty = Type::function(vec![var(0)], Type::string());
        assert_eq!(
            subst.apply(&ty),
            Type::function(vec![Type::int()], Type::string())
        );
    }

    #[test]
    fn test_apply_to_struct_fields() {
        let subst = Substitution::singleton(2, Type::bool());
        let ty = Type::structure("Flag", vec![Field::new("set", var(2))]);
        assert_eq!(subst.apply(&ty).fields[0].ty, Type::bool());
    }

    #[test]
    fn test_apply_preserves_unbound_vars() {
        let subst = Substitution::singleton(0, Type::int());
        assert_eq!(subst.apply(&var(1)), var(1));
    }

    #[test]
    fn test_compose_applies_right_first() {
        // s1 = {t1 -> int}, s2 = {t0 -> t1}; (s1 ∘ s2)(t0) = s1(s2(t0)) = int
        let s1 = Substitution::singleton(1, Type::int());
        let s2 = Substitution::singleton(0, var(1));

        let composed = s1.compose(&s2);
        assert_eq!(composed.apply(&var(0)), Type::int());
        assert_eq!(composed.apply(&var(1)), Type::int());
    }

    #[test]
    fn test_compose_order() {
        let s1 = Substitution::singleton(0, Type::int());
        let s2 = Substitution::singleton(0, Type::string());

        // `other` is applied first, so its binding for t0 wins
        let result = s1.compose(&s2);
        assert_eq!(result.apply(&var(0)), Type::string());
    }

    #[test]
    fn test_substitution_idempotent() {
        let subst = Substitution::singleton(0, Type::int());
        let once = subst.apply(&var(0));
        let twice = subst.apply(&once);
        assert_eq!(once, twice);
    }
}
