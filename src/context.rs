//! Per-session checking state: id generators, scope level and trackers.
//! Skolems are issued by the inference session, which owns a [`SkolemGen`].

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use crate::advanced::AdvancedTypeId;
use crate::ast::EffectSet;
use crate::types::{SkolemId, Type};

/// Issues advanced type identities for one session
#[derive(Debug, Default)]
pub struct IdGen {
    next: u32,
}

impl IdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_advanced(&mut self) -> AdvancedTypeId {
        let id = AdvancedTypeId(self.next);
        self.next += 1;
        id
    }
}

/// Generates skolem constants standing in for quantified variables
#[derive(Debug, Default)]
pub struct SkolemGen {
    next: u32,
}

impl SkolemGen {
    pub fn fresh(&mut self, name: &str) -> Type {
        let id = SkolemId(self.next);
        self.next += 1;
        trace!(name, id = id.0, "fresh skolem");
        Type::skolem(id, name)
    }

    /// Number of skolems issued so far
    pub fn issued(&self) -> u32 {
        self.next
    }
}

/// Usage counts of linear resources, accumulated over a session
#[derive(Debug, Default)]
pub struct LinearityTracker {
    uses: BTreeMap<String, u32>,
}

impl LinearityTracker {
    /// Start tracking `name` with no uses
    pub fn register(&mut self, name: &str) {
        self.uses.entry(name.to_string()).or_insert(0);
    }

    pub fn is_tracked(&self, name: &str) -> bool {
        self.uses.contains_key(name)
    }

    /// Add `count` uses of `name` and return its new total
    pub fn record(&mut self, name: &str, count: u32) -> u32 {
        let total = self.uses.entry(name.to_string()).or_insert(0);
        *total += count;
        debug!(resource = name, uses = *total, "linear usage");
        *total
    }

    pub fn count(&self, name: &str) -> u32 {
        self.uses.get(name).copied().unwrap_or(0)
    }

    /// Tracked resources that have never been used
    pub fn unconsumed(&self) -> Vec<&str> {
        self.uses
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Effects performed by the expressions checked so far
#[derive(Debug, Default)]
pub struct EffectTracker {
    active: BTreeSet<String>,
}

impl EffectTracker {
    pub fn record(&mut self, effects: &EffectSet) {
        self.active.extend(effects.iter().map(str::to_string));
    }

    pub fn is_active(&self, effect: &str) -> bool {
        self.active.contains(effect)
    }

    pub fn active(&self) -> impl Iterator<Item = &str> {
        self.active.iter().map(|s| s.as_str())
    }
}

/// Mutable state shared by every check in one session
#[derive(Debug, Default)]
pub struct CheckContext {
    pub scope_level: u32,
    pub ids: IdGen,
    pub linearity: LinearityTracker,
    pub effects: EffectTracker,
}

impl CheckContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter_scope(&mut self) {
        self.scope_level += 1;
        trace!(level = self.scope_level, "enter scope");
    }

    pub fn exit_scope(&mut self) {
        trace!(level = self.scope_level, "exit scope");
        self.scope_level = self.scope_level.saturating_sub(1);
    }
}
