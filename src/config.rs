//! Checker configuration

/// Knobs for one checking session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckerConfig {
    /// Whether unproved refinement obligations become warnings instead of errors
    pub allow_deferred_proofs: bool,
    /// Dependent types above this universe level are rejected
    pub max_universe_level: u32,
    /// Emit a warning for declared effects the expression never performs
    pub warn_unused_effects: bool,
    /// Maximum edit distance for "did you mean" suggestions
    pub suggestion_distance: usize,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            allow_deferred_proofs: true,
            max_universe_level: 64,
            warn_unused_effects: true,
            suggestion_distance: 2,
        }
    }
}

impl CheckerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deferred_proofs(mut self, allow: bool) -> Self {
        self.allow_deferred_proofs = allow;
        self
    }

    pub fn with_max_universe_level(mut self, level: u32) -> Self {
        self.max_universe_level = level;
        self
    }

    pub fn with_unused_effect_warnings(mut self, warn: bool) -> Self {
        self.warn_unused_effects = warn;
        self
    }

    pub fn with_suggestion_distance(mut self, distance: usize) -> Self {
        self.suggestion_distance = distance;
        self
    }
}
