//! Scope-chained typing environment

use std::collections::{BTreeSet, HashMap};

use crate::subst::Substitution;
use crate::types::{Scheme, TypeVar};

/// A frame of name-to-scheme bindings linked to its enclosing frame.
///
/// A child frame is created with [`TypeEnv::extend`] when a lexical scope
/// opens and dropped with [`TypeEnv::close`] when it ends.
#[derive(Debug, Clone, Default)]
pub struct TypeEnv {
    bindings: HashMap<String, Scheme>,
    parent: Option<Box<TypeEnv>>,
}

impl TypeEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bindings(bindings: Vec<(String, Scheme)>) -> Self {
        TypeEnv {
            bindings: bindings.into_iter().collect(),
            parent: None,
        }
    }

    /// Open a child frame whose parent is `self`
    pub fn extend(self) -> TypeEnv {
        TypeEnv {
            bindings: HashMap::new(),
            parent: Some(Box::new(self)),
        }
    }

    /// Discard this frame and return its parent. The root frame is returned
    /// unchanged.
    pub fn close(self) -> TypeEnv {
        match self.parent {
            Some(parent) => *parent,
            None => self,
        }
    }

    pub fn bind(&mut self, name: impl Into<String>, scheme: Scheme) {
        self.bindings.insert(name.into(), scheme);
    }

    /// Search this frame, then each enclosing frame
    pub fn lookup(&self, name: &str) -> Option<&Scheme> {
        self.bindings
            .get(name)
            .or_else(|| self.parent.as_ref().and_then(|p| p.lookup(name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Number of frames in the chain, the root included
    pub fn depth(&self) -> usize {
        1 + self.parent.as_ref().map_or(0, |p| p.depth())
    }

    /// Every name visible from this frame
    pub fn names(&self) -> BTreeSet<&str> {
        let mut names: BTreeSet<&str> = self.bindings.keys().map(|s| s.as_str()).collect();
        if let Some(parent) = &self.parent {
            names.extend(parent.names());
        }
        names
    }

    pub fn free_type_vars(&self) -> BTreeSet<TypeVar> {
        let mut free = BTreeSet::new();
        for scheme in self.bindings.values() {
            free.extend(scheme.free_type_vars());
        }
        if let Some(parent) = &self.parent {
            free.extend(parent.free_type_vars());
        }
        free
    }

    pub fn apply_subst(&mut self, subst: &Substitution) {
        for scheme in self.bindings.values_mut() {
            scheme.ty = subst.apply(&scheme.ty);
        }
        if let Some(parent) = &mut self.parent {
            parent.apply_subst(subst);
        }
    }
}
