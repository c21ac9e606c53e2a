//! Tessera - type representation, Hindley-Milner inference and checking of
//! rank-N, dependent, effect, linear and refinement types

pub mod advanced;
pub mod ast;
pub mod checker;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod env;
pub mod infer;
pub mod proof;
pub mod subst;
pub mod test_support;
pub mod types;
pub mod unify;
pub mod validate;

pub use advanced::{AdvancedKind, AdvancedType, AdvancedTypeId};
pub use ast::{Expr, Span};
pub use checker::{AdvancedTypeChecker, InferenceError, TypeCheckResult};
pub use config::CheckerConfig;
pub use diagnostics::{
    find_similar, format_header, format_location, format_suggestions, levenshtein_distance,
    CheckError, CheckWarning, Colors, ErrorConfig, ErrorKind, WarningKind,
};
pub use env::TypeEnv;
pub use infer::{Inferencer, TypeError};
pub use proof::{ProofEngine, ProofObligation, ProofStatus};
pub use subst::Substitution;
pub use types::{Scheme, Type, TypeKind, TypeVar};
pub use unify::{AdvancedUnifier, UnificationResult, UnifyFailure};
pub use validate::{validate_well_formedness, TypeValidationResult};
