//! Structured diagnostics and their rendering.
//!
//! This module provides:
//! - The error and warning taxonomy produced by the checker
//! - An accumulator used by collect-and-continue checking
//! - ANSI color support and Elm-style headers for rendering
//! - Levenshtein distance for "did you mean?" suggestions

use std::fmt;

use crate::ast::Span;

// ============================================================================
// Taxonomy
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    KindMismatch,
    RankMismatch,
    DependencyMismatch,
    EffectMismatch,
    LinearityViolation,
    RefinementFailure,
    CapabilityInsufficient,
    ProofObligationUnsatisfied,
    ConstraintUnsatisfiable,
    AdvancedUnificationFailure,
    OccursCheckFailure,
    UndefinedVariable,
    NonFunctionCall,
}

impl ErrorKind {
    pub fn title(&self) -> &'static str {
        match self {
            ErrorKind::KindMismatch => "TYPE MISMATCH",
            ErrorKind::RankMismatch => "RANK MISMATCH",
            ErrorKind::DependencyMismatch => "DEPENDENCY MISMATCH",
            ErrorKind::EffectMismatch => "EFFECT MISMATCH",
            ErrorKind::LinearityViolation => "LINEARITY VIOLATION",
            ErrorKind::RefinementFailure => "REFINEMENT FAILURE",
            ErrorKind::CapabilityInsufficient => "INSUFFICIENT CAPABILITY",
            ErrorKind::ProofObligationUnsatisfied => "UNSATISFIED PROOF OBLIGATION",
            ErrorKind::ConstraintUnsatisfiable => "UNSATISFIABLE CONSTRAINT",
            ErrorKind::AdvancedUnificationFailure => "UNIFICATION FAILURE",
            ErrorKind::OccursCheckFailure => "INFINITE TYPE",
            ErrorKind::UndefinedVariable => "UNDEFINED VARIABLE",
            ErrorKind::NonFunctionCall => "NOT A FUNCTION",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    UnusedVariable,
    RedundantConstraint,
    EffectNeverUsed,
    LinearResourceNotConsumed,
    RefinementWeakened,
    CapabilityOverPermissive,
    ProofDeferred,
}

impl WarningKind {
    pub fn title(&self) -> &'static str {
        match self {
            WarningKind::UnusedVariable => "UNUSED VARIABLE",
            WarningKind::RedundantConstraint => "REDUNDANT CONSTRAINT",
            WarningKind::EffectNeverUsed => "UNUSED EFFECT",
            WarningKind::LinearResourceNotConsumed => "UNCONSUMED RESOURCE",
            WarningKind::RefinementWeakened => "WEAKENED REFINEMENT",
            WarningKind::CapabilityOverPermissive => "OVER-PERMISSIVE CAPABILITY",
            WarningKind::ProofDeferred => "DEFERRED PROOF",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Option<Span>,
    pub suggestions: Vec<String>,
}

impl CheckError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
            suggestions: Vec::new(),
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn render(&self, config: &ErrorConfig) -> String {
        let colors = &config.colors;
        let mut out = format_header(self.kind.title(), colors);
        if let Some(span) = &self.span {
            out.push('\n');
            out.push_str(&format_location(config.filename.as_deref(), span, colors));
        }
        out.push_str("\n\n");
        out.push_str(&self.message);
        out.push_str(&format_suggestions(&self.suggestions, colors));
        out
    }
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckWarning {
    pub kind: WarningKind,
    pub message: String,
    pub span: Option<Span>,
}

impl CheckWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn render(&self, config: &ErrorConfig) -> String {
        let colors = &config.colors;
        let mut out = format!(
            "{}{}{}",
            colors.yellow(),
            format_header(self.kind.title(), &Colors::new(false)),
            colors.reset()
        );
        if let Some(span) = &self.span {
            out.push('\n');
            out.push_str(&format_location(config.filename.as_deref(), span, colors));
        }
        out.push_str("\n\n");
        out.push_str(&self.message);
        out
    }
}

impl fmt::Display for CheckWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Errors and warnings collected by one checking pass
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub errors: Vec<CheckError>,
    pub warnings: Vec<CheckWarning>,
    span: Option<Span>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `span` to every diagnostic recorded from now on
    pub fn at(span: Span) -> Self {
        Self {
            span: Some(span),
            ..Self::default()
        }
    }

    pub fn error(&mut self, kind: ErrorKind, message: impl Into<String>) {
        let mut error = CheckError::new(kind, message);
        error.span = self.span;
        self.errors.push(error);
    }

    pub fn warn(&mut self, kind: WarningKind, message: impl Into<String>) {
        let mut warning = CheckWarning::new(kind, message);
        warning.span = self.span;
        self.warnings.push(warning);
    }

    pub fn push(&mut self, error: CheckError) {
        self.errors.push(error);
    }

    pub fn merge(&mut self, other: Diagnostics) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_error(&self, kind: ErrorKind) -> bool {
        self.errors.iter().any(|e| e.kind == kind)
    }
}

// ============================================================================
// Rendering configuration
// ============================================================================

/// ANSI color codes for terminal output
#[derive(Debug, Clone)]
pub struct Colors {
    pub enabled: bool,
}

impl Colors {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn red(&self) -> &'static str {
        if self.enabled { "\x1b[31m" } else { "" }
    }

    pub fn cyan(&self) -> &'static str {
        if self.enabled { "\x1b[36m" } else { "" }
    }

    pub fn yellow(&self) -> &'static str {
        if self.enabled { "\x1b[33m" } else { "" }
    }

    pub fn bold(&self) -> &'static str {
        if self.enabled { "\x1b[1m" } else { "" }
    }

    pub fn reset(&self) -> &'static str {
        if self.enabled { "\x1b[0m" } else { "" }
    }
}

impl Default for Colors {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Configuration for diagnostic display
#[derive(Debug, Clone)]
pub struct ErrorConfig {
    pub colors: Colors,
    pub filename: Option<String>,
}

impl ErrorConfig {
    pub fn new(use_color: bool) -> Self {
        Self {
            colors: Colors::new(use_color),
            filename: None,
        }
    }

    pub fn with_filename(mut self, name: impl Into<String>) -> Self {
        self.filename = Some(name.into());
        self
    }
}

impl Default for ErrorConfig {
    fn default() -> Self {
        Self::new(false)
    }
}

// ============================================================================
// Levenshtein Distance for "Did you mean?" suggestions
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Find similar names from a list of candidates.
///
/// Returns up to 3 suggestions within the given max edit distance,
/// sorted by distance (closest first).
pub fn find_similar<'a>(
    name: &str,
    candidates: impl IntoIterator<Item = &'a str>,
    max_distance: usize,
) -> Vec<String> {
    let mut suggestions: Vec<(String, usize)> = candidates
        .into_iter()
        .filter_map(|c| {
            let dist = levenshtein_distance(name, c);
            // Only suggest if within max_distance and not identical
            if dist > 0 && dist <= max_distance {
                Some((c.to_string(), dist))
            } else {
                None
            }
        })
        .collect();

    // Sort by distance, then alphabetically for ties
    suggestions.sort_by(|(a, da), (b, db)| da.cmp(db).then_with(|| a.cmp(b)));

    suggestions.into_iter().map(|(s, _)| s).take(3).collect()
}

/// Format the "did you mean?" hint.
pub fn format_suggestions(suggestions: &[String], colors: &Colors) -> String {
    if suggestions.is_empty() {
        return String::new();
    }

    if suggestions.len() == 1 {
        format!(
            "\n\nDid you mean {}{}{}?",
            colors.bold(),
            suggestions[0],
            colors.reset()
        )
    } else {
        let formatted: Vec<String> = suggestions
            .iter()
            .map(|s| format!("{}{}{}", colors.bold(), s, colors.reset()))
            .collect();
        format!("\n\nDid you mean one of: {}?", formatted.join(", "))
    }
}

/// Format the header line.
///
/// Example: "-- TYPE MISMATCH ---------------------------------------------"
pub fn format_header(title: &str, colors: &Colors) -> String {
    let dashes = "-".repeat(60usize.saturating_sub(title.len() + 4).max(2));
    format!("{}-- {} {}{}", colors.cyan(), title, dashes, colors.reset())
}

/// Format the location line.
///
/// Example: "src/main.tsr:12..15"
pub fn format_location(filename: Option<&str>, span: &Span, colors: &Colors) -> String {
    let file = filename.unwrap_or("<input>");
    format!("{}{}:{}{}", colors.bold(), file, span, colors.reset())
}

// ============================================================================
// Tests
// ============================================================================
