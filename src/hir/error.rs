//! Error types for import resolution and lookup.

use thiserror::Error;

use super::ids::ScopeId;
use super::resolve::Origin;

/// Why an import operand did not resolve to a scope.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum UnresolvedReason {
    #[error("it is not a namespace, class, or enumeration")]
    NotAScope,
    #[error("the name is not declared")]
    UnknownName,
    #[error("template arguments are required")]
    MissingTemplateArguments,
    #[error("it has no member type `{0}`")]
    NoSuchMember(String),
    #[error("the alias chain does not terminate")]
    AliasCycle,
}

/// Failure to open an import. The import statement is rejected; the
/// surrounding construct keeps using ordinary lookup.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("cannot import `{operand}`: {reason}")]
    UnresolvedScope {
        operand: String,
        reason: UnresolvedReason,
    },
    #[error("cannot import the generic body of template `{template}`")]
    UninstantiatedTemplate { template: String },
    #[error(transparent)]
    Instantiate(#[from] InstantiateError),
}

impl ImportError {
    pub(crate) fn unresolved(operand: impl Into<String>, reason: UnresolvedReason) -> Self {
        ImportError::UnresolvedScope {
            operand: operand.into(),
            reason,
        }
    }
}

/// Failure reported by the template machinery of the symbol table.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InstantiateError {
    #[error("{0:?} is not a class template")]
    NotATemplate(ScopeId),
    #[error("template {template:?} expects {expected} argument(s), {found} given")]
    ArityMismatch {
        template: ScopeId,
        expected: usize,
        found: usize,
    },
    #[error("template instantiation depth exceeds the limit of {limit}")]
    DepthExceeded { limit: usize },
    #[error("unknown scope {0:?}")]
    UnknownScope(ScopeId),
}

/// A lookup that did not produce exactly one declaration.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("use of undeclared identifier `{name}`")]
    NotFound { name: String },
    #[error("reference to `{name}` is ambiguous ({} candidate scopes)", .origins.len())]
    AmbiguousName { name: String, origins: Vec<Origin> },
    #[error("`{name}` can only be resolved once the enclosing template is instantiated")]
    DependentScopeDeferred { name: String },
}
