//! Typed expression tree handed over by the lowering pass.
//!
//! The checker only reads these nodes. Besides its shape each node carries
//! the effect and region sets the lowering pass attached to it.

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use crate::types::Type;

pub type Ident = String;

/// Source location for error reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

// ============================================================================
// Effects and regions
// ============================================================================

/// Names of the effects a node performs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectSet(BTreeSet<String>);

impl EffectSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, effect: impl Into<String>) {
        self.0.insert(effect.into());
    }

    pub fn contains(&self, effect: &str) -> bool {
        self.0.contains(effect)
    }

    pub fn extend(&mut self, other: &EffectSet) {
        self.0.extend(other.0.iter().cloned());
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<S: Into<String>> FromIterator<S> for EffectSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        EffectSet(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for EffectSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccessKind {
    Read,
    Write,
    Move,
    Borrow,
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccessKind::Read => "read",
            AccessKind::Write => "write",
            AccessKind::Move => "move",
            AccessKind::Borrow => "borrow",
        };
        write!(f, "{}", s)
    }
}

/// One access to a memory region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionAccess {
    pub region: String,
    pub access: AccessKind,
}

impl RegionAccess {
    pub fn new(region: impl Into<String>, access: AccessKind) -> Self {
        Self {
            region: region.into(),
            access,
        }
    }
}

/// Region accesses a node performs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionSet(Vec<RegionAccess>);

impl RegionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, access: RegionAccess) {
        if !self.0.contains(&access) {
            self.0.push(access);
        }
    }

    pub fn extend(&mut self, other: &RegionSet) {
        for access in &other.0 {
            self.push(access.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegionAccess> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn writes_to(&self, region: &str) -> bool {
        self.0
            .iter()
            .any(|a| a.region == region && a.access == AccessKind::Write)
    }
}

impl FromIterator<RegionAccess> for RegionSet {
    fn from_iter<I: IntoIterator<Item = RegionAccess>>(iter: I) -> Self {
        let mut set = RegionSet::new();
        for access in iter {
            set.push(access);
        }
        set
    }
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Char(char),
    Unit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Comparison
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    // Boolean
    And,
    Or,
}

impl BinOp {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Neq | BinOp::Lt | BinOp::Gt | BinOp::Lte | BinOp::Gte
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Neq => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Lte => "<=",
            BinOp::Gte => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Lambda parameter; unannotated parameters get a fresh type variable
#[derive(Debug, Clone)]
pub struct Param {
    pub name: Ident,
    pub ty: Option<Type>,
}

impl Param {
    pub fn new(name: impl Into<Ident>) -> Self {
        Self {
            name: name.into(),
            ty: None,
        }
    }

    pub fn typed(name: impl Into<Ident>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty: Some(ty),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Lit(Literal),

    // Variable reference
    Var(Ident),

    // Call: f(a, b)
    Call {
        func: Rc<Expr>,
        args: Vec<Expr>,
    },

    // Binary operator
    Binary {
        op: BinOp,
        left: Rc<Expr>,
        right: Rc<Expr>,
    },

    // Lambda: fun (x, y) -> body
    Lambda {
        params: Vec<Param>,
        body: Rc<Expr>,
    },

    // Let binding: let x = e1 in e2
    Let {
        name: Ident,
        value: Rc<Expr>,
        body: Rc<Expr>,
    },
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub node: ExprKind,
    pub span: Span,
    pub effects: EffectSet,
    pub regions: RegionSet,
    /// Type recorded by the lowering pass, if any
    pub ty: Option<Type>,
}

impl Expr {
    pub fn new(node: ExprKind) -> Self {
        Self {
            node,
            span: Span::default(),
            effects: EffectSet::new(),
            regions: RegionSet::new(),
            ty: None,
        }
    }

    pub fn lit(lit: Literal) -> Self {
        Expr::new(ExprKind::Lit(lit))
    }

    pub fn int(n: i64) -> Self {
        Expr::lit(Literal::Int(n))
    }

    pub fn bool(b: bool) -> Self {
        Expr::lit(Literal::Bool(b))
    }

    pub fn var(name: impl Into<Ident>) -> Self {
        Expr::new(ExprKind::Var(name.into()))
    }

    pub fn call(func: Expr, args: Vec<Expr>) -> Self {
        Expr::new(ExprKind::Call {
            func: Rc::new(func),
            args,
        })
    }

    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Self {
        Expr::new(ExprKind::Binary {
            op,
            left: Rc::new(left),
            right: Rc::new(right),
        })
    }

    pub fn lambda(params: Vec<Param>, body: Expr) -> Self {
        Expr::new(ExprKind::Lambda {
            params,
            body: Rc::new(body),
        })
    }

    pub fn let_in(name: impl Into<Ident>, value: Expr, body: Expr) -> Self {
        Expr::new(ExprKind::Let {
            name: name.into(),
            value: Rc::new(value),
            body: Rc::new(body),
        })
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn with_effects<S: Into<String>>(mut self, effects: impl IntoIterator<Item = S>) -> Self {
        for effect in effects {
            self.effects.insert(effect);
        }
        self
    }

    pub fn with_regions(mut self, regions: impl IntoIterator<Item = RegionAccess>) -> Self {
        for access in regions {
            self.regions.push(access);
        }
        self
    }

    pub fn with_type(mut self, ty: Type) -> Self {
        self.ty = Some(ty);
        self
    }

    pub fn get_type(&self) -> Option<&Type> {
        self.ty.as_ref()
    }

    /// Every type written on this expression: node annotations and
    /// lambda parameter types, lambda bodies included
    pub fn annotations(&self) -> Vec<&Type> {
        let mut out = Vec::new();
        self.collect_annotations(&mut out);
        out
    }

    fn collect_annotations<'a>(&'a self, out: &mut Vec<&'a Type>) {
        out.extend(self.ty.as_ref());
        match &self.node {
            ExprKind::Lit(_) | ExprKind::Var(_) => {}
            ExprKind::Call { func, args } => {
                func.collect_annotations(out);
                args.iter().for_each(|arg| arg.collect_annotations(out));
            }
            ExprKind::Binary { left, right, .. } => {
                left.collect_annotations(out);
                right.collect_annotations(out);
            }
            ExprKind::Lambda { params, body } => {
                out.extend(params.iter().filter_map(|p| p.ty.as_ref()));
                body.collect_annotations(out);
            }
            ExprKind::Let { value, body, .. } => {
                value.collect_annotations(out);
                body.collect_annotations(out);
            }
        }
    }

    /// Effects attached to this node alone
    pub fn get_effects(&self) -> &EffectSet {
        &self.effects
    }

    /// Region accesses attached to this node alone
    pub fn get_regions(&self) -> &RegionSet {
        &self.regions
    }

    /// Effects performed when this expression is evaluated.
    /// Building a lambda is pure: its body's effects stay latent.
    pub fn effects_used(&self) -> EffectSet {
        let mut effects = self.effects.clone();
        self.for_each_evaluated_child(|child| effects.extend(&child.effects_used()));
        effects
    }

    /// Region accesses performed when this expression is evaluated
    pub fn regions_used(&self) -> RegionSet {
        let mut regions = self.regions.clone();
        self.for_each_evaluated_child(|child| regions.extend(&child.regions_used()));
        regions
    }

    fn for_each_evaluated_child(&self, mut f: impl FnMut(&Expr)) {
        match &self.node {
            ExprKind::Lit(_) | ExprKind::Var(_) | ExprKind::Lambda { .. } => {}
            ExprKind::Call { func, args } => {
                f(func);
                args.iter().for_each(f);
            }
            ExprKind::Binary { left, right, .. } => {
                f(left);
                f(right);
            }
            ExprKind::Let { value, body, .. } => {
                f(value);
                f(body);
            }
        }
    }

    /// Free variable occurrences, in evaluation order, one entry per use
    pub fn identifiers(&self) -> Vec<&str> {
        let mut out = Vec::new();
        let mut bound = Vec::new();
        self.collect_identifiers(&mut bound, &mut out);
        out
    }

    fn collect_identifiers<'a>(&'a self, bound: &mut Vec<&'a str>, out: &mut Vec<&'a str>) {
        match &self.node {
            ExprKind::Lit(_) => {}
            ExprKind::Var(name) => {
                if !bound.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            ExprKind::Call { func, args } => {
                func.collect_identifiers(bound, out);
                for arg in args {
                    arg.collect_identifiers(bound, out);
                }
            }
            ExprKind::Binary { left, right, .. } => {
                left.collect_identifiers(bound, out);
                right.collect_identifiers(bound, out);
            }
            ExprKind::Lambda { params, body } => {
                let mark = bound.len();
                bound.extend(params.iter().map(|p| p.name.as_str()));
                body.collect_identifiers(bound, out);
                bound.truncate(mark);
            }
            ExprKind::Let { name, value, body } => {
                value.collect_identifiers(bound, out);
                bound.push(name);
                body.collect_identifiers(bound, out);
                bound.pop();
            }
        }
    }

    /// Free variable uses in evaluation order, with aliases resolved. A
    /// name bound directly to a variable, by `let` or by applying a lambda
    /// to it, counts as that variable, and the aliasing binding is not a
    /// use of its own.
    pub fn resource_uses(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_uses(&mut Aliases::default(), &mut out);
        out
    }

    fn collect_uses<'a>(&'a self, scope: &mut Aliases<'a>, out: &mut Vec<&'a str>) {
        match &self.node {
            ExprKind::Lit(_) => {}
            ExprKind::Var(name) => {
                if let Some(source) = scope.resolve(name) {
                    out.push(source);
                }
            }
            ExprKind::Call { func, args } => {
                if let ExprKind::Lambda { params, body } = &func.node {
                    if params.len() == args.len() {
                        let mut sources = Vec::with_capacity(args.len());
                        for arg in args {
                            if !arg.is_var() {
                                arg.collect_uses(scope, out);
                            }
                            sources.push(scope.source_of(arg));
                        }
                        let mark = scope.mark();
                        for (param, source) in params.iter().zip(sources) {
                            scope.push(&param.name, source);
                        }
                        body.collect_uses(scope, out);
                        scope.reset(mark);
                        return;
                    }
                }
                func.collect_uses(scope, out);
                for arg in args {
                    arg.collect_uses(scope, out);
                }
            }
            ExprKind::Binary { left, right, .. } => {
                left.collect_uses(scope, out);
                right.collect_uses(scope, out);
            }
            ExprKind::Lambda { params, body } => {
                let mark = scope.mark();
                for param in params {
                    scope.push(&param.name, None);
                }
                body.collect_uses(scope, out);
                scope.reset(mark);
            }
            ExprKind::Let { name, value, body } => {
                if !value.is_var() {
                    value.collect_uses(scope, out);
                }
                let mark = scope.mark();
                let source = scope.source_of(value);
                scope.push(name, source);
                body.collect_uses(scope, out);
                scope.reset(mark);
            }
        }
    }

    /// Names passed directly as call arguments (moved into the callee).
    /// Shadowed names are skipped and aliases resolve to their source.
    pub fn moved_identifiers(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_moved(&mut Aliases::default(), &mut out);
        out
    }

    fn collect_moved<'a>(&'a self, scope: &mut Aliases<'a>, out: &mut Vec<&'a str>) {
        match &self.node {
            ExprKind::Call { func, args } => {
                func.collect_moved(scope, out);
                for arg in args {
                    match &arg.node {
                        ExprKind::Var(name) => {
                            if let Some(source) = scope.resolve(name) {
                                out.push(source);
                            }
                        }
                        _ => arg.collect_moved(scope, out),
                    }
                }
                // An applied lambda runs now, so its body's moves are real
                if let ExprKind::Lambda { params, body } = &func.node {
                    let sources: Vec<Option<&str>> = params
                        .iter()
                        .enumerate()
                        .map(|(i, _)| args.get(i).and_then(|arg| scope.source_of(arg)))
                        .collect();
                    let mark = scope.mark();
                    for (param, source) in params.iter().zip(sources) {
                        scope.push(&param.name, source);
                    }
                    body.collect_moved(scope, out);
                    scope.reset(mark);
                }
            }
            ExprKind::Binary { left, right, .. } => {
                left.collect_moved(scope, out);
                right.collect_moved(scope, out);
            }
            ExprKind::Let { name, value, body } => {
                value.collect_moved(scope, out);
                let mark = scope.mark();
                let source = scope.source_of(value);
                scope.push(name, source);
                body.collect_moved(scope, out);
                scope.reset(mark);
            }
            ExprKind::Lit(_) | ExprKind::Var(_) | ExprKind::Lambda { .. } => {}
        }
    }

    fn is_var(&self) -> bool {
        matches!(self.node, ExprKind::Var(_))
    }

    /// Does `name` occur free inside a lambda body, i.e. get captured?
    /// Aliases of `name` count as `name`.
    pub fn captures(&self, name: &str) -> bool {
        let mut out = Vec::new();
        self.collect_captured(&mut Aliases::default(), &mut out);
        out.contains(&name)
    }

    fn collect_captured<'a>(&'a self, scope: &mut Aliases<'a>, out: &mut Vec<&'a str>) {
        match &self.node {
            ExprKind::Lit(_) | ExprKind::Var(_) => {}
            ExprKind::Lambda { params, body } => {
                let mark = scope.mark();
                for param in params {
                    scope.push(&param.name, None);
                }
                body.collect_uses(scope, out);
                scope.reset(mark);
            }
            ExprKind::Call { func, args } => {
                func.collect_captured(scope, out);
                for arg in args {
                    arg.collect_captured(scope, out);
                }
            }
            ExprKind::Binary { left, right, .. } => {
                left.collect_captured(scope, out);
                right.collect_captured(scope, out);
            }
            ExprKind::Let { name, value, body } => {
                value.collect_captured(scope, out);
                let mark = scope.mark();
                let source = scope.source_of(value);
                scope.push(name, source);
                body.collect_captured(scope, out);
                scope.reset(mark);
            }
        }
    }
}

/// Names bound while walking an expression. Each binding records the free
/// variable it stands for, or `None` when it hides the name.
#[derive(Debug, Default)]
struct Aliases<'a> {
    frames: Vec<(&'a str, Option<&'a str>)>,
}

impl<'a> Aliases<'a> {
    /// The free variable `name` refers to, if any
    fn resolve(&self, name: &'a str) -> Option<&'a str> {
        match self.frames.iter().rev().find(|(bound, _)| *bound == name) {
            Some((_, source)) => *source,
            None => Some(name),
        }
    }

    fn source_of(&self, value: &'a Expr) -> Option<&'a str> {
        match &value.node {
            ExprKind::Var(name) => self.resolve(name),
            _ => None,
        }
    }

    fn push(&mut self, name: &'a str, source: Option<&'a str>) {
        self.frames.push((name, source));
    }

    fn mark(&self) -> usize {
        self.frames.len()
    }

    fn reset(&mut self, mark: usize) {
        self.frames.truncate(mark);
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            ExprKind::Lit(Literal::Int(n)) => write!(f, "{}", n),
            ExprKind::Lit(Literal::Float(x)) => write!(f, "{}", x),
            ExprKind::Lit(Literal::Bool(b)) => write!(f, "{}", b),
            ExprKind::Lit(Literal::String(s)) => write!(f, "{:?}", s),
            ExprKind::Lit(Literal::Char(c)) => write!(f, "{:?}", c),
            ExprKind::Lit(Literal::Unit) => write!(f, "()"),
            ExprKind::Var(name) => write!(f, "{}", name),
            ExprKind::Call { func, args } => {
                write!(f, "{}(", func)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            ExprKind::Binary { op, left, right } => write!(f, "({} {} {})", left, op, right),
            ExprKind::Lambda { params, body } => {
                let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
                write!(f, "fun ({}) -> {}", names.join(", "), body)
            }
            ExprKind::Let { name, value, body } => write!(f, "let {} = {} in {}", name, value, body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers_counts_each_use() {
        let expr = Expr::binary(BinOp::Add, Expr::var("x"), Expr::var("x"));
        assert_eq!(expr.identifiers(), vec!["x", "x"]);
    }

    #[test]
    fn test_identifiers_skip_bound_names() {
        let expr = Expr::let_in(
            "y",
            Expr::var("x"),
            Expr::lambda(vec![Param::new("z")], Expr::binary(BinOp::Add, Expr::var("y"), Expr::var("z"))),
        );
        assert_eq!(expr.identifiers(), vec!["x"]);
    }

    #[test]
    fn test_lambda_effects_are_latent() {
        let body = Expr::int(1).with_effects(["io"]);
        let lam = Expr::lambda(vec![], body.clone());
        assert!(lam.effects_used().is_empty());

        let call = Expr::call(Expr::var("f"), vec![body]).with_effects(["state"]);
        let used = call.effects_used();
        assert!(used.contains("io"));
        assert!(used.contains("state"));
        assert_eq!(used.len(), 2);
    }

    #[test]
    fn test_region_set_dedups() {
        let set: RegionSet = vec![
            RegionAccess::new("heap", AccessKind::Write),
            RegionAccess::new("heap", AccessKind::Write),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.iter().count(), 1);
        assert!(set.writes_to("heap"));
    }

    #[test]
    fn test_moved_identifiers() {
        let expr = Expr::call(Expr::var("consume"), vec![Expr::var("buf"), Expr::int(3)]);
        assert_eq!(expr.moved_identifiers(), vec!["buf"]);
    }

    #[test]
    fn test_resource_uses_resolve_let_alias() {
        let expr = Expr::let_in(
            "x",
            Expr::var("h"),
            Expr::binary(BinOp::Add, Expr::var("x"), Expr::var("x")),
        );
        assert_eq!(expr.resource_uses(), vec!["h", "h"]);
        assert_eq!(expr.identifiers(), vec!["h"]);
    }

    #[test]
    fn test_resource_uses_resolve_applied_lambda() {
        let lam = Expr::lambda(
            vec![Param::new("y"), Param::new("z")],
            Expr::binary(BinOp::Add, Expr::var("y"), Expr::var("z")),
        );
        let expr = Expr::call(lam, vec![Expr::var("h"), Expr::var("k")]);
        assert_eq!(expr.resource_uses(), vec!["h", "k"]);
    }

    #[test]
    fn test_resource_uses_respect_shadowing() {
        let expr = Expr::let_in(
            "h",
            Expr::int(1),
            Expr::lambda(vec![Param::new("k")], Expr::binary(BinOp::Add, Expr::var("h"), Expr::var("k"))),
        );
        assert!(expr.resource_uses().is_empty());
    }

    #[test]
    fn test_moved_identifiers_skip_shadowed_names() {
        let shadowed = Expr::let_in(
            "buf",
            Expr::int(0),
            Expr::call(Expr::var("consume"), vec![Expr::var("buf")]),
        );
        assert!(shadowed.moved_identifiers().is_empty());

        let param = Expr::call(
            Expr::lambda(
                vec![Param::new("buf")],
                Expr::call(Expr::var("consume"), vec![Expr::var("buf")]),
            ),
            vec![Expr::int(0)],
        );
        assert!(param.moved_identifiers().is_empty());

        let alias = Expr::let_in(
            "b",
            Expr::var("buf"),
            Expr::call(Expr::var("consume"), vec![Expr::var("b")]),
        );
        assert_eq!(alias.moved_identifiers(), vec!["buf"]);
    }

    #[test]
    fn test_captures() {
        let lam = Expr::lambda(vec![Param::new("a")], Expr::var("handle"));
        assert!(lam.captures("handle"));
        assert!(!lam.captures("a"));
        assert!(!Expr::var("handle").captures("handle"));

        let aliased = Expr::let_in("h", Expr::var("handle"), Expr::lambda(vec![], Expr::var("h")));
        assert!(aliased.captures("handle"));
        let shadowed = Expr::let_in("handle", Expr::int(0), Expr::lambda(vec![], Expr::var("handle")));
        assert!(!shadowed.captures("handle"));
    }

    #[test]
    fn test_display() {
        let expr = Expr::call(Expr::var("f"), vec![Expr::binary(BinOp::Mul, Expr::int(2), Expr::var("x"))]);
        assert_eq!(expr.to_string(), "f((2 * x))");
    }
}
