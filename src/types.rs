//! Internal type representation shared by inference, unification and checking

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::advanced::{AdvancedKind, AdvancedType};

/// A type variable ID
pub type TypeVarId = u32;

/// A type variable: an identity plus a display name and an optional let-level.
///
/// Equality, ordering and hashing only look at the identity.
#[derive(Debug, Clone)]
pub struct TypeVar {
    pub id: TypeVarId,
    pub name: String,
    pub level: Option<u32>,
}

impl TypeVar {
    pub fn new(id: TypeVarId) -> Self {
        Self {
            id,
            name: format!("t{}", id),
            level: None,
        }
    }

    pub fn named(id: TypeVarId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            level: None,
        }
    }

    pub fn at_level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }
}

impl PartialEq for TypeVar {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeVar {}

impl Hash for TypeVar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for TypeVar {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeVar {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Display for TypeVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Identity of a skolem constant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SkolemId(pub u32);

/// The kind tag of a type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Unit,
    Bool,
    Integer,
    Float,
    String,
    Char,
    Struct,
    /// Parameters followed by the return type in `Type::params`
    Function,
    Tuple,
    Array,
    Pointer,
    /// Named type constructor applied to `params`: `List<int>`
    Generic,
    Var(TypeVar),
    Skolem(SkolemId),
    /// Sentinel for types that failed to resolve
    Invalid,
    /// One of the five advanced variants; the extension slot is populated
    Advanced(AdvancedKind),
}

impl TypeKind {
    pub fn is_advanced(&self) -> bool {
        matches!(self, TypeKind::Advanced(_))
    }

    pub fn advanced_kind(&self) -> Option<AdvancedKind> {
        match self {
            TypeKind::Advanced(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Short tag used in diagnostics
    pub fn tag(&self) -> &'static str {
        match self {
            TypeKind::Unit => "Unit",
            TypeKind::Bool => "Bool",
            TypeKind::Integer => "Integer",
            TypeKind::Float => "Float",
            TypeKind::String => "String",
            TypeKind::Char => "Char",
            TypeKind::Struct => "Struct",
            TypeKind::Function => "Function",
            TypeKind::Tuple => "Tuple",
            TypeKind::Array => "Array",
            TypeKind::Pointer => "Pointer",
            TypeKind::Generic => "Generic",
            TypeKind::Var(_) => "TypeVariable",
            TypeKind::Skolem(_) => "Skolem",
            TypeKind::Invalid => "Invalid",
            TypeKind::Advanced(kind) => kind.tag(),
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Size and alignment; `None` means not yet known
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Layout {
    pub size: Option<u64>,
    pub align: Option<u64>,
}

impl Layout {
    pub fn known(size: u64, align: u64) -> Self {
        Self {
            size: Some(size),
            align: Some(align),
        }
    }

    pub fn is_known(&self) -> bool {
        self.size.is_some() && self.align.is_some()
    }
}

/// A named struct field
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: Type,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A method signature attached to a type
#[derive(Debug, Clone)]
pub struct Method {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    /// `T: Trait`
    Trait,
    Subtype,
    Equality,
    /// A named logical predicate that must still be discharged
    Predicate,
}

/// A constraint attached to a type or collected during unification
#[derive(Debug, Clone, PartialEq)]
pub struct TypeConstraint {
    pub kind: ConstraintKind,
    pub name: String,
    pub args: Vec<Type>,
    pub predicate: Option<String>,
}

impl TypeConstraint {
    pub fn predicate(name: impl Into<String>, predicate: impl Into<String>) -> Self {
        Self {
            kind: ConstraintKind::Predicate,
            name: name.into(),
            args: Vec::new(),
            predicate: Some(predicate.into()),
        }
    }

    pub fn trait_bound(name: impl Into<String>, args: Vec<Type>) -> Self {
        Self {
            kind: ConstraintKind::Trait,
            name: name.into(),
            args,
            predicate: None,
        }
    }
}

impl fmt::Display for TypeConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.predicate) {
            (ConstraintKind::Predicate, Some(pred)) => write!(f, "{}: {}", self.name, pred),
            _ => {
                write!(f, "{}", self.name)?;
                for arg in &self.args {
                    write!(f, " {}", arg)?;
                }
                Ok(())
            }
        }
    }
}

/// The universal type value.
///
/// The advanced extension slot is private: it can only be filled through
/// [`Type::advanced`], which also sets the matching kind tag.
#[derive(Debug, Clone)]
pub struct Type {
    kind: TypeKind,
    pub name: String,
    pub layout: Layout,
    pub params: Vec<Type>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    pub constraints: Vec<TypeConstraint>,
    extension: Option<Rc<AdvancedType>>,
}

impl Type {
    fn with_kind(kind: TypeKind, name: impl Into<String>) -> Type {
        Type {
            kind,
            name: name.into(),
            layout: Layout::default(),
            params: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            constraints: Vec::new(),
            extension: None,
        }
    }

    // ========================================================================
    // Constructors
    // ========================================================================

    pub fn unit() -> Type {
        Type::with_kind(TypeKind::Unit, "()").with_layout(Layout::known(0, 1))
    }

    pub fn bool() -> Type {
        Type::with_kind(TypeKind::Bool, "bool").with_layout(Layout::known(1, 1))
    }

    pub fn int() -> Type {
        Type::with_kind(TypeKind::Integer, "int").with_layout(Layout::known(8, 8))
    }

    /// An integer type with a specific name (`i32`, `u8`, ...)
    pub fn integer(name: impl Into<String>) -> Type {
        Type::with_kind(TypeKind::Integer, name)
    }

    pub fn float() -> Type {
        Type::with_kind(TypeKind::Float, "float").with_layout(Layout::known(8, 8))
    }

    pub fn string() -> Type {
        Type::with_kind(TypeKind::String, "string")
    }

    pub fn char() -> Type {
        Type::with_kind(TypeKind::Char, "char").with_layout(Layout::known(4, 4))
    }

    pub fn invalid() -> Type {
        Type::with_kind(TypeKind::Invalid, "<invalid>")
    }

    /// Function type: parameters followed by the return type
    pub fn function(params: Vec<Type>, ret: Type) -> Type {
        let mut ty = Type::with_kind(TypeKind::Function, "fn");
        ty.params = params;
        ty.params.push(ret);
        ty
    }

    pub fn tuple(elems: Vec<Type>) -> Type {
        let mut ty = Type::with_kind(TypeKind::Tuple, "tuple");
        ty.params = elems;
        ty
    }

    pub fn array(elem: Type) -> Type {
        let mut ty = Type::with_kind(TypeKind::Array, "array");
        ty.params = vec![elem];
        ty
    }

    pub fn pointer(elem: Type) -> Type {
        let mut ty = Type::with_kind(TypeKind::Pointer, "ptr").with_layout(Layout::known(8, 8));
        ty.params = vec![elem];
        ty
    }

    pub fn generic(name: impl Into<String>, args: Vec<Type>) -> Type {
        let mut ty = Type::with_kind(TypeKind::Generic, name);
        ty.params = args;
        ty
    }

    pub fn structure(name: impl Into<String>, fields: Vec<Field>) -> Type {
        let mut ty = Type::with_kind(TypeKind::Struct, name);
        ty.fields = fields;
        ty
    }

    pub fn var(var: TypeVar) -> Type {
        let name = var.name.clone();
        Type::with_kind(TypeKind::Var(var), name)
    }

    pub fn skolem(id: SkolemId, name: impl Into<String>) -> Type {
        Type::with_kind(TypeKind::Skolem(id), name)
    }

    /// Project an advanced type into the universal representation
    pub fn advanced(adv: AdvancedType) -> Type {
        let kind = TypeKind::Advanced(adv.kind());
        let mut ty = Type::with_kind(kind, adv.display_name());
        ty.extension = Some(Rc::new(adv));
        ty
    }

    pub fn with_layout(mut self, layout: Layout) -> Type {
        self.layout = layout;
        self
    }

    pub fn with_method(mut self, name: impl Into<String>, ty: Type) -> Type {
        self.methods.push(Method {
            name: name.into(),
            ty,
        });
        self
    }

    pub fn with_constraint(mut self, constraint: TypeConstraint) -> Type {
        self.constraints.push(constraint);
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn as_advanced(&self) -> Option<&AdvancedType> {
        self.extension.as_deref()
    }

    pub fn is_advanced(&self) -> bool {
        self.kind.is_advanced()
    }

    pub fn as_var(&self) -> Option<&TypeVar> {
        match &self.kind {
            TypeKind::Var(var) => Some(var),
            _ => None,
        }
    }

    /// Split a function type into its parameters and return type
    pub fn function_parts(&self) -> Option<(&[Type], &Type)> {
        if self.kind != TypeKind::Function {
            return None;
        }
        self.params
            .split_last()
            .map(|(ret, params)| (params, ret))
    }

    /// Same kind tag and same display name
    pub fn same_head(&self, other: &Type) -> bool {
        self.kind == other.kind && self.name == other.name
    }

    /// Rebuild this type with `f` applied to every component and field type.
    /// Advanced types are opaque and returned unchanged.
    pub fn map_children(&self, mut f: impl FnMut(&Type) -> Type) -> Type {
        if self.is_advanced() {
            return self.clone();
        }
        let mut out = self.clone();
        out.params = self.params.iter().map(&mut f).collect();
        out.fields = self
            .fields
            .iter()
            .map(|field| Field {
                name: field.name.clone(),
                ty: f(&field.ty),
            })
            .collect();
        out
    }

    /// Check if this type contains a given type variable (occurs check).
    /// Does not look through advanced extension slots.
    pub fn occurs(&self, id: TypeVarId) -> bool {
        match &self.kind {
            TypeKind::Var(var) => var.id == id,
            TypeKind::Advanced(_) => false,
            _ => {
                self.params.iter().any(|t| t.occurs(id))
                    || self.fields.iter().any(|f| f.ty.occurs(id))
            }
        }
    }

    /// Type variables appearing in this type, in identity order
    pub fn free_type_vars(&self) -> BTreeSet<TypeVar> {
        let mut vars = BTreeSet::new();
        self.collect_vars(&mut vars);
        vars
    }

    fn collect_vars(&self, vars: &mut BTreeSet<TypeVar>) {
        match &self.kind {
            TypeKind::Var(var) => {
                vars.insert(var.clone());
            }
            TypeKind::Advanced(_) => {}
            _ => {
                for param in &self.params {
                    param.collect_vars(vars);
                }
                for field in &self.fields {
                    field.ty.collect_vars(vars);
                }
            }
        }
    }

    /// Largest type variable id mentioned anywhere in this type, including
    /// inside advanced extension slots and rank-N quantifiers
    pub fn max_var_id(&self) -> Option<TypeVarId> {
        let own = match &self.kind {
            TypeKind::Var(var) => Some(var.id),
            TypeKind::Advanced(_) => self.extension.as_deref().and_then(|adv| {
                let quantified = match adv {
                    AdvancedType::RankN(t) => t.quantifiers.iter().map(|q| q.var.id).max(),
                    _ => None,
                };
                adv.component_types()
                    .into_iter()
                    .filter_map(Type::max_var_id)
                    .chain(quantified)
                    .max()
            }),
            _ => None,
        };
        self.params
            .iter()
            .chain(self.fields.iter().map(|f| &f.ty))
            .filter_map(Type::max_var_id)
            .chain(own)
            .max()
    }

    // ========================================================================
    // User-Friendly Type Display
    // ========================================================================

    /// Display the type with normalized variable names (a, b, c instead of t732)
    pub fn display_normalized(&self) -> String {
        let mut var_map: HashMap<TypeVarId, char> = HashMap::new();
        let mut next_var = 'a';
        self.display_with_map(&mut var_map, &mut next_var)
    }

    fn display_with_map(&self, var_map: &mut HashMap<TypeVarId, char>, next_var: &mut char) -> String {
        fn join(types: &[Type], var_map: &mut HashMap<TypeVarId, char>, next_var: &mut char) -> String {
            types
                .iter()
                .map(|t| t.display_with_map(var_map, next_var))
                .collect::<Vec<_>>()
                .join(", ")
        }
        match &self.kind {
            TypeKind::Var(var) => {
                let c = *var_map.entry(var.id).or_insert_with(|| {
                    let c = *next_var;
                    *next_var = if *next_var == 'z' {
                        'a'
                    } else {
                        (*next_var as u8 + 1) as char
                    };
                    c
                });
                format!("'{}", c)
            }
            TypeKind::Function => match self.params.split_last() {
                Some((ret, params)) => {
                    let params = join(params, var_map, next_var);
                    let ret = ret.display_with_map(var_map, next_var);
                    format!("({}) -> {}", params, ret)
                }
                None => "() -> ?".to_string(),
            },
            TypeKind::Tuple => format!("({})", join(&self.params, var_map, next_var)),
            TypeKind::Array => format!("[{}]", join(&self.params, var_map, next_var)),
            TypeKind::Pointer => format!("*{}", join(&self.params, var_map, next_var)),
            TypeKind::Generic if !self.params.is_empty() => {
                format!("{}<{}>", self.name, join(&self.params, var_map, next_var))
            }
            _ => self.name.clone(),
        }
    }
}

/// Structural equality: kind, name, parameters and fields, recursively
impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.name == other.name
            && self.params == other.params
            && self.fields == other.fields
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, types: &[Type]) -> fmt::Result {
            for (i, t) in types.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", t)?;
            }
            Ok(())
        }
        match &self.kind {
            TypeKind::Var(var) => write!(f, "'{}", var.name),
            TypeKind::Skolem(id) => write!(f, "!{}#{}", self.name, id.0),
            TypeKind::Function => match self.params.split_last() {
                Some((ret, params)) => {
                    write!(f, "(")?;
                    list(f, params)?;
                    write!(f, ") -> {}", ret)
                }
                None => write!(f, "() -> ?"),
            },
            TypeKind::Tuple => {
                write!(f, "(")?;
                list(f, &self.params)?;
                write!(f, ")")
            }
            TypeKind::Array => {
                write!(f, "[")?;
                list(f, &self.params)?;
                write!(f, "]")
            }
            TypeKind::Pointer => {
                write!(f, "*")?;
                list(f, &self.params)
            }
            TypeKind::Generic if !self.params.is_empty() => {
                write!(f, "{}<", self.name)?;
                list(f, &self.params)?;
                write!(f, ">")
            }
            _ => write!(f, "{}", self.name),
        }
    }
}

/// A polymorphic type scheme: forall a b. a -> b -> a
#[derive(Debug, Clone, PartialEq)]
pub struct Scheme {
    /// The quantified type variables
    pub vars: Vec<TypeVar>,
    /// The underlying type
    pub ty: Type,
}

impl Scheme {
    /// A monomorphic type (no quantified variables)
    pub fn mono(ty: Type) -> Scheme {
        Scheme {
            vars: Vec::new(),
            ty,
        }
    }

    pub fn poly(vars: Vec<TypeVar>, ty: Type) -> Scheme {
        Scheme { vars, ty }
    }

    /// Free variables of the body that are not quantified
    pub fn free_type_vars(&self) -> BTreeSet<TypeVar> {
        let mut free = self.ty.free_type_vars();
        for var in &self.vars {
            free.remove(var);
        }
        free
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.vars.is_empty() {
            write!(f, "forall")?;
            for var in &self.vars {
                write!(f, " {}", var.name)?;
            }
            write!(f, ". ")?;
        }
        write!(f, "{}", self.ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality_ignores_layout() {
        let a = Type::int();
        let b = Type::integer("int");
        assert_eq!(a, b);
        assert_ne!(Type::int(), Type::integer("i32"));
    }

    #[test]
    fn test_struct_equality_by_field() {
        let p1 = Type::structure("Point", vec![Field::new("x", Type::int()), Field::new("y", Type::int())]);
        let p2 = Type::structure("Point", vec![Field::new("x", Type::int()), Field::new("y", Type::int())]);
        let p3 = Type::structure("Point", vec![Field::new("x", Type::int()), Field::new("z", Type::int())]);
        assert_eq!(p1, p2);
        assert_ne!(p1, p3);
    }

    #[test]
    fn test_function_parts() {
        let f = Type::function(vec![Type::int(), Type::bool()], Type::string());
        let (params, ret) = f.function_parts().unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(*ret, Type::string());
        assert!(Type::int().function_parts().is_none());
    }

    #[test]
    fn test_occurs_recurses_into_components() {
        let v = TypeVar::new(3);
        let f = Type::function(vec![Type::var(v.clone())], Type::int());
        assert!(f.occurs(3));
        assert!(!f.occurs(4));
        let s = Type::structure("Box", vec![Field::new("inner", Type::array(Type::var(v)))]);
        assert!(s.occurs(3));
    }

    #[test]
    fn test_free_type_vars_ordered() {
        let ty = Type::tuple(vec![
            Type::var(TypeVar::new(5)),
            Type::var(TypeVar::new(1)),
            Type::var(TypeVar::new(5)),
        ]);
        let ids: Vec<_> = ty.free_type_vars().into_iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![1, 5]);
    }

    #[test]
    fn test_display_normalized() {
        let ty = Type::function(
            vec![Type::var(TypeVar::new(40)), Type::var(TypeVar::new(7))],
            Type::var(TypeVar::new(40)),
        );
        assert_eq!(ty.display_normalized(), "('a, 'b) -> 'a");
    }

    #[test]
    fn test_scheme_free_vars_exclude_quantified() {
        let a = TypeVar::new(0);
        let b = TypeVar::new(1);
        let scheme = Scheme::poly(
            vec![a.clone()],
            Type::function(vec![Type::var(a)], Type::var(b.clone())),
        );
        let free = scheme.free_type_vars();
        assert_eq!(free.len(), 1);
        assert!(free.contains(&b));
    }
}
