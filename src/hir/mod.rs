//! Semantic model: symbols, import directives, and name lookup.
//!
//! ## Layers (dependency order)
//!
//! ```text
//! engine      → directives in force, guards, instantiation frames
//!   ↓
//! resolve     → staged lookup at a program point
//!   ↓
//! ambiguity   → verdict over collected candidates
//! import_set  → importable members of a scope, cached
//!   ↓
//! descriptor  → import operand → scope entity (or deferred token)
//!   ↓
//! table/index → the symbol table the engine consumes
//! ```

mod ambiguity;
mod descriptor;
mod diagnostics;
mod directive;
mod engine;
mod error;
mod ids;
mod import_set;
mod index;
mod resolve;
mod symbols;
mod table;

pub use ambiguity::{check as check_ambiguity, distinct_decls, distinct_origins};
pub use descriptor::{
    DeferredScope, DescriptorResolver, Resolution, ScopeDescriptor, DEFAULT_ALIAS_STEP_LIMIT,
};
pub use diagnostics::{
    codes, Diagnostic, DiagnosticCollector, LookupReporter, RelatedInfo, Severity,
};
pub use directive::{DirectiveSet, DirectiveState, ImportDirective, ImportKind, LexicalExtent};
pub use engine::{EngineConfig, ImportEngine, ImportGuard, InstantiationGuard};
pub use error::{ImportError, InstantiateError, LookupError, UnresolvedReason};
pub use ids::{BlockId, DeclId, DirectiveId, ScopeId};
pub use import_set::{is_importable, ImportSet, ImportSetBuilder};
pub use index::{SymbolIndex, DEFAULT_INSTANTIATION_LIMIT};
pub use resolve::{
    AssociatedScopes, Candidate, ImportContribution, LookupResolver, LookupResult, LookupSite,
    Origin, ProgramPoint, Verdict, VisibleImport,
};
pub use symbols::{
    Block, DeclKind, Declaration, Owner, ScopeEntity, ScopeKind, ScopeRef, Storage, Substitution,
    TemplateArgs, TypeRef,
};
pub use table::{ScopeChain, SymbolTable};
