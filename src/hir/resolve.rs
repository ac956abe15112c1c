//! Name lookup at a program point.
//!
//! Lookup merges ordinary lexical results with the candidates of the import
//! directives covering the point. The merge runs as a fixed sequence of
//! stages:
//!
//! 1. **Ordinary lookup** - innermost link of the scope chain with any match.
//! 2. **Fallback hiding** - an ordinary match silences fallback-only imports.
//! 3. **Unconditional imports** - always join the candidate list.
//! 4. **Fallback union** - with no ordinary match, fallback-only and
//!    unconditional candidates are merged.
//! 5. **Strict case labels** - optionally narrow a case label to the
//!    enumerators of its switch's enum.
//! 6. **Associated scopes** - consulted only when nothing else matched.
//! 7. **Deferral** - nothing matched but a dependent import may still
//!    supply the name.
//!
//! The collected candidates go to [`ambiguity::check`](super::ambiguity::check)
//! for the verdict.

use std::sync::Arc;

use crate::base::{FilePosition, Interner, Name};

use super::ambiguity;
use super::directive::ImportKind;
use super::error::{ImportError, LookupError};
use super::ids::{BlockId, DeclId, DirectiveId, ScopeId};
use super::import_set::{is_importable, ImportSet};
use super::symbols::{Owner, ScopeKind};
use super::table::SymbolTable;

// ============================================================================
// PROGRAM POINTS
// ============================================================================

/// The syntactic position a name is looked up from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LookupSite {
    /// Bare identifier or member access.
    Expression,
    /// A `case` label of the switch whose body is `switch`.
    CaseLabel { switch: BlockId },
}

/// Where a lookup happens: source position, innermost block, and site.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ProgramPoint {
    pub position: FilePosition,
    pub block: BlockId,
    pub site: LookupSite,
}

impl ProgramPoint {
    pub fn expr(position: FilePosition, block: BlockId) -> Self {
        Self {
            position,
            block,
            site: LookupSite::Expression,
        }
    }

    /// A case label written directly in the body of `switch`.
    pub fn case_label(position: FilePosition, switch: BlockId) -> Self {
        Self {
            position,
            block: switch,
            site: LookupSite::CaseLabel { switch },
        }
    }

    pub fn is_case_label(&self) -> bool {
        matches!(self.site, LookupSite::CaseLabel { .. })
    }
}

// ============================================================================
// RESULTS
// ============================================================================

/// How a candidate became visible.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Ordinary lexical lookup, found in this scope or block.
    Ordinary(Owner),
    /// Through an import directive of `scope`.
    Imported { directive: DirectiveId, scope: ScopeId },
    /// Through an associated scope.
    Associated(ScopeId),
}

/// A declaration together with the route it was found by.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub decl: DeclId,
    pub origin: Origin,
}

/// Outcome of a lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Unique(DeclId),
    /// Distinct declarations matched; one origin per route.
    Ambiguous(Vec<Origin>),
    NotFound,
    /// No match yet, but a template-dependent import covers the point.
    Deferred,
}

#[derive(Clone, Debug)]
pub struct LookupResult {
    pub name: Name,
    /// Every candidate in stage order.
    pub candidates: Vec<Candidate>,
    pub verdict: Verdict,
    /// Fallback-only candidates suppressed by an ordinary match.
    pub hidden: Vec<Candidate>,
    /// Dependent imports whose operand failed under the active instantiation.
    pub unresolved: Vec<(DirectiveId, ImportError)>,
}

impl LookupResult {
    pub fn unique(&self) -> Option<DeclId> {
        match self.verdict {
            Verdict::Unique(decl) => Some(decl),
            _ => None,
        }
    }

    pub fn is_unique(&self) -> bool {
        matches!(self.verdict, Verdict::Unique(_))
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self.verdict, Verdict::Ambiguous(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.verdict, Verdict::NotFound)
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self.verdict, Verdict::Deferred)
    }

    pub fn into_result(self, interner: &Interner) -> Result<DeclId, LookupError> {
        let name = interner.display(self.name).to_string();
        match self.verdict {
            Verdict::Unique(decl) => Ok(decl),
            Verdict::Ambiguous(origins) => Err(LookupError::AmbiguousName { name, origins }),
            Verdict::NotFound => Err(LookupError::NotFound { name }),
            Verdict::Deferred => Err(LookupError::DependentScopeDeferred { name }),
        }
    }
}

// ============================================================================
// INPUTS
// ============================================================================

/// Source of extra scopes searched when nothing else matches, such as the
/// scopes associated with the argument types of a call.
pub trait AssociatedScopes {
    fn associated_scopes(&self, name: Name, point: &ProgramPoint) -> Vec<ScopeId>;
}

/// What an import covering the point currently supplies.
#[derive(Clone, Debug)]
pub enum ImportContribution {
    Ready(Arc<ImportSet>),
    /// Dependent operand with no active instantiation binding it.
    Pending,
    Failed(ImportError),
}

/// An import directive covering the lookup point.
#[derive(Clone, Debug)]
pub struct VisibleImport {
    pub directive: DirectiveId,
    pub kind: ImportKind,
    pub contribution: ImportContribution,
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Runs the lookup stages for one point.
pub struct LookupResolver<'a, T: SymbolTable> {
    table: &'a T,
    imports: &'a [VisibleImport],
    strict_case_labels: bool,
    associated: Option<&'a dyn AssociatedScopes>,
}

impl<'a, T: SymbolTable> LookupResolver<'a, T> {
    /// `imports` must already be filtered to those covering the point.
    pub fn new(table: &'a T, imports: &'a [VisibleImport]) -> Self {
        Self {
            table,
            imports,
            strict_case_labels: false,
            associated: None,
        }
    }

    pub fn with_strict_case_labels(mut self, strict: bool) -> Self {
        self.strict_case_labels = strict;
        self
    }

    pub fn with_associated_scopes(mut self, associated: Option<&'a dyn AssociatedScopes>) -> Self {
        self.associated = associated;
        self
    }

    pub fn resolve(&self, name: Name, point: &ProgramPoint) -> LookupResult {
        let spelled = self.table.interner().display(name);

        // Stage 1
        let chain = self.table.chain_at(point.block);
        let ordinary: Vec<Candidate> = self
            .table
            .ordinary_lookup(name, &chain)
            .into_iter()
            .filter_map(|decl| {
                let owner = self.table.declaration(decl)?.owner;
                Some(Candidate {
                    decl,
                    origin: Origin::Ordinary(owner),
                })
            })
            .collect();
        tracing::trace!("lookup `{}`: {} ordinary match(es)", spelled, ordinary.len());

        let mut fallback = Vec::new();
        let mut enum_fallback = Vec::new();
        let mut has_enum_fallback = false;
        let mut unconditional = Vec::new();
        let mut pending = false;
        let mut unresolved = Vec::new();

        for import in self.imports {
            let set = match &import.contribution {
                ImportContribution::Ready(set) => set,
                ImportContribution::Pending => {
                    pending = true;
                    continue;
                }
                ImportContribution::Failed(err) => {
                    unresolved.push((import.directive, err.clone()));
                    continue;
                }
            };
            let found = set.get(name).iter().map(|&decl| Candidate {
                decl,
                origin: Origin::Imported {
                    directive: import.directive,
                    scope: set.scope(),
                },
            });
            match import.kind {
                ImportKind::Unconditional => unconditional.extend(found),
                ImportKind::FallbackOnly if set.kind() == ScopeKind::Enum => {
                    has_enum_fallback = true;
                    let found: Vec<_> = found.collect();
                    enum_fallback.extend(found.iter().copied());
                    fallback.extend(found);
                }
                ImportKind::FallbackOnly => fallback.extend(found),
            }
        }

        let mut hidden = Vec::new();
        let mut candidates = ordinary;
        if !candidates.is_empty() {
            // Stages 2 and 3
            hidden = fallback
                .into_iter()
                .filter(|c| !candidates.iter().any(|o| o.decl == c.decl))
                .collect();
            if !hidden.is_empty() {
                tracing::trace!(
                    "lookup `{}`: {} fallback candidate(s) hidden by ordinary match",
                    spelled,
                    hidden.len()
                );
            }
            candidates.extend(unconditional);
        } else {
            // Stage 4
            tracing::trace!(
                "lookup `{}`: no ordinary match, {} fallback and {} unconditional candidate(s)",
                spelled,
                fallback.len(),
                unconditional.len()
            );
            candidates.extend(fallback);
            candidates.extend(unconditional);
        }

        // Stage 5
        if self.strict_case_labels && point.is_case_label() && has_enum_fallback {
            let before = candidates.len();
            candidates.retain(|c| enum_fallback.iter().any(|e| e.decl == c.decl));
            for c in enum_fallback {
                if !candidates.contains(&c) {
                    candidates.push(c);
                }
            }
            hidden.clear();
            tracing::trace!(
                "lookup `{}`: strict case label kept {} of {} candidate(s)",
                spelled,
                candidates.len(),
                before
            );
        }

        // Stage 6
        if candidates.is_empty() {
            if let Some(associated) = self.associated {
                for scope in associated.associated_scopes(name, point) {
                    candidates.extend(self.associated_candidates(scope, name));
                }
                tracing::trace!(
                    "lookup `{}`: {} candidate(s) from associated scopes",
                    spelled,
                    candidates.len()
                );
            }
        }

        // Stage 7
        let verdict = if candidates.is_empty() && pending {
            Verdict::Deferred
        } else {
            ambiguity::check(&candidates)
        };
        tracing::trace!("lookup `{}`: {:?}", spelled, verdict);

        LookupResult {
            name,
            candidates,
            verdict,
            hidden,
            unresolved,
        }
    }

    fn associated_candidates(&self, scope: ScopeId, name: Name) -> Vec<Candidate> {
        let Some(entity) = self.table.scope(scope) else {
            return Vec::new();
        };
        self.table
            .members_named(scope, name)
            .into_iter()
            .filter(|&decl| {
                self.table
                    .declaration(decl)
                    .is_some_and(|d| is_importable(entity.kind, d))
            })
            .map(|decl| Candidate {
                decl,
                origin: Origin::Associated(scope),
            })
            .collect()
    }
}
