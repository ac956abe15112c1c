//! The import engine: opens and releases import directives and answers
//! lookups against the directives in force.
//!
//! Directives are scoped. [`ImportEngine::begin_import`] returns an
//! [`ImportGuard`] that releases the directive when dropped, so visibility
//! never outlives the construct that opened it, even on early return.
//! Dependent directives are resolved lazily under the substitution pushed by
//! [`ImportEngine::enter_instantiation`].

use std::ops::{Deref, DerefMut};

use rustc_hash::FxHashMap;

use crate::base::Name;

use super::descriptor::{DeferredScope, DescriptorResolver, Resolution, DEFAULT_ALIAS_STEP_LIMIT};
use super::directive::{DirectiveSet, DirectiveState, ImportDirective, ImportKind, LexicalExtent};
use super::error::{ImportError, UnresolvedReason};
use super::ids::DirectiveId;
use super::import_set::ImportSetBuilder;
use super::index::SymbolIndex;
use super::resolve::{
    AssociatedScopes, ImportContribution, LookupResolver, LookupResult, ProgramPoint,
    VisibleImport,
};
use super::symbols::{ScopeKind, ScopeRef, Substitution};
use super::table::{ScopeChain, SymbolTable};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Engine-wide lookup options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Restrict case labels of a switch over an enum to that enum's
    /// enumerators.
    pub strict_case_labels: bool,
    /// Maximum alias and parameter hops when resolving an operand.
    pub alias_step_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strict_case_labels: false,
            alias_step_limit: DEFAULT_ALIAS_STEP_LIMIT,
        }
    }
}

impl EngineConfig {
    pub fn with_strict_case_labels(mut self, strict: bool) -> Self {
        self.strict_case_labels = strict;
        self
    }

    pub fn with_alias_step_limit(mut self, limit: usize) -> Self {
        self.alias_step_limit = limit;
        self
    }
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct ImportEngine<T: SymbolTable = SymbolIndex> {
    table: T,
    config: EngineConfig,
    builder: ImportSetBuilder,
    directives: DirectiveSet,
    /// Substitutions of the instantiations being analysed, outermost first.
    frames: Vec<Substitution>,
    deferred: FxHashMap<(DirectiveId, Substitution), ImportContribution>,
    associated: Option<Box<dyn AssociatedScopes>>,
}

impl<T: SymbolTable> ImportEngine<T> {
    pub fn new(table: T) -> Self {
        Self::with_config(table, EngineConfig::default())
    }

    pub fn with_config(table: T, config: EngineConfig) -> Self {
        Self {
            table,
            config,
            builder: ImportSetBuilder::new(),
            directives: DirectiveSet::new(),
            frames: Vec::new(),
            deferred: FxHashMap::default(),
            associated: None,
        }
    }

    /// Install a source of associated scopes for the last lookup stage.
    pub fn with_associated_scopes(mut self, associated: impl AssociatedScopes + 'static) -> Self {
        self.associated = Some(Box::new(associated));
        self
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut T {
        &mut self.table
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn import_sets(&self) -> &ImportSetBuilder {
        &self.builder
    }

    pub fn directive(&self, id: DirectiveId) -> Option<&ImportDirective> {
        self.directives.get(id)
    }

    pub fn directives(&self) -> impl Iterator<Item = &ImportDirective> {
        self.directives.iter()
    }

    // ========================================================================
    // DIRECTIVES
    // ========================================================================

    /// Open an import of `operand` over `extent`.
    ///
    /// A dependent operand opens a deferred directive. On error nothing is
    /// opened and lookup in the extent stays ordinary.
    pub fn begin_import(
        &mut self,
        operand: ScopeRef,
        kind: ImportKind,
        extent: LexicalExtent,
    ) -> Result<ImportGuard<'_, T>, ImportError> {
        let chain = self.table.chain_at(extent.block);
        let state = self.resolve_operand(&operand, &chain)?;
        let id = self.open(operand, kind, extent, state, false);
        Ok(ImportGuard::new(self, id))
    }

    /// Open the fallback-only import of a `switch` whose body is
    /// `extent.block`.
    ///
    /// Returns `None` when the controlling expression's type is not an
    /// enumeration. A dependent type opens a deferred directive that
    /// contributes only if it later resolves to an enum.
    pub fn begin_switch(
        &mut self,
        controlling: ScopeRef,
        extent: LexicalExtent,
    ) -> Result<Option<ImportGuard<'_, T>>, ImportError> {
        let chain = self.table.chain_at(extent.block).enclosing();
        let state = match self.resolve_operand(&controlling, &chain) {
            Ok(state) => state,
            Err(ImportError::UnresolvedScope {
                reason: UnresolvedReason::NotAScope,
                ..
            }) => return Ok(None),
            Err(err) => return Err(err),
        };
        if let DirectiveState::Active { set, .. } = &state {
            if set.kind() != ScopeKind::Enum {
                tracing::trace!(
                    "switch over `{}` is not over an enum; no fallback import",
                    self.table.render_scope_ref(&controlling)
                );
                return Ok(None);
            }
        }
        let id = self.open(controlling, ImportKind::FallbackOnly, extent, state, true);
        Ok(Some(ImportGuard::new(self, id)))
    }

    /// Release a directive. Lookups no longer see it afterwards.
    pub fn end_import(&mut self, id: DirectiveId) -> Option<ImportDirective> {
        let released = self.release(id);
        if released.is_none() {
            tracing::warn!("end_import: no open directive {:?}", id);
        }
        released
    }

    fn open(
        &mut self,
        operand: ScopeRef,
        kind: ImportKind,
        extent: LexicalExtent,
        state: DirectiveState,
        from_switch: bool,
    ) -> DirectiveId {
        let deferred = matches!(state, DirectiveState::Deferred(_));
        let rendered = self.table.render_scope_ref(&operand);
        let id = self
            .directives
            .insert(kind, extent, operand, state, from_switch);
        tracing::debug!(
            "opened {} {:?} of `{}`{}",
            kind.display(),
            id,
            rendered,
            if deferred { " (deferred)" } else { "" }
        );
        id
    }

    fn release(&mut self, id: DirectiveId) -> Option<ImportDirective> {
        let released = self.directives.remove(id)?;
        self.deferred.retain(|(directive, _), _| *directive != id);
        tracing::debug!("released {} {:?}", released.kind.display(), id);
        Some(released)
    }

    fn resolve_operand(
        &mut self,
        operand: &ScopeRef,
        chain: &ScopeChain,
    ) -> Result<DirectiveState, ImportError> {
        let subst = self.active_substitution();
        let resolution = DescriptorResolver::new(&mut self.table)
            .with_substitution(subst.as_ref())
            .with_alias_step_limit(self.config.alias_step_limit)
            .resolve(operand, chain)?;
        match resolution {
            Resolution::Resolved(descriptor) => {
                let set = self.builder.build(&mut self.table, &descriptor)?;
                Ok(DirectiveState::Active { descriptor, set })
            }
            Resolution::Deferred(token) => Ok(DirectiveState::Deferred(token)),
        }
    }

    // ========================================================================
    // INSTANTIATION
    // ========================================================================

    /// Analyse the body of an instantiation with `subst` binding its
    /// template parameters. Frames nest; inner bindings win.
    pub fn enter_instantiation(&mut self, subst: Substitution) -> InstantiationGuard<'_, T> {
        tracing::debug!(
            "entering instantiation frame {} ({} binding(s))",
            self.frames.len(),
            subst.len()
        );
        self.frames.push(subst);
        InstantiationGuard { engine: self }
    }

    /// Current bindings, or `None` outside any instantiation.
    pub fn active_substitution(&self) -> Option<Substitution> {
        let (first, rest) = self.frames.split_first()?;
        Some(rest.iter().fold(first.clone(), |acc, inner| acc.layered(inner)))
    }

    fn contribution(&mut self, id: DirectiveId, token: &DeferredScope) -> ImportContribution {
        let Some(subst) = self.active_substitution() else {
            return ImportContribution::Pending;
        };
        let key = (id, subst);
        if let Some(cached) = self.deferred.get(&key) {
            return cached.clone();
        }

        let resolved = DescriptorResolver::new(&mut self.table)
            .with_substitution(Some(&key.1))
            .with_alias_step_limit(self.config.alias_step_limit)
            .resolve_deferred(token);
        let contribution = match resolved {
            Ok(Resolution::Resolved(descriptor)) => {
                match self.builder.build(&mut self.table, &descriptor) {
                    Ok(set) => ImportContribution::Ready(set),
                    Err(err) => ImportContribution::Failed(err),
                }
            }
            Ok(Resolution::Deferred(_)) => ImportContribution::Pending,
            Err(err) => ImportContribution::Failed(err),
        };
        if let ImportContribution::Failed(err) = &contribution {
            tracing::debug!("deferred import {:?} failed: {}", id, err);
        }

        self.deferred.insert(key, contribution.clone());
        contribution
    }

    // ========================================================================
    // LOOKUP
    // ========================================================================

    /// Imports contributing at `point`, resolving deferred ones as needed.
    pub fn visible_imports(&mut self, point: &ProgramPoint) -> Vec<VisibleImport> {
        let covering: Vec<(DirectiveId, ImportKind, bool, DirectiveState)> = self
            .directives
            .covering(point)
            .map(|d| (d.id, d.kind, d.from_switch, d.state.clone()))
            .collect();

        let mut visible = Vec::with_capacity(covering.len());
        for (directive, kind, from_switch, state) in covering {
            let contribution = match state {
                DirectiveState::Active { set, .. } => ImportContribution::Ready(set),
                DirectiveState::Deferred(token) => self.contribution(directive, &token),
            };
            if from_switch {
                match &contribution {
                    ImportContribution::Ready(set) if set.kind() != ScopeKind::Enum => continue,
                    ImportContribution::Failed(ImportError::UnresolvedScope {
                        reason: UnresolvedReason::NotAScope,
                        ..
                    }) => continue,
                    _ => {}
                }
            }
            visible.push(VisibleImport {
                directive,
                kind,
                contribution,
            });
        }
        visible
    }

    pub fn lookup(&mut self, name: Name, point: &ProgramPoint) -> LookupResult {
        let imports = self.visible_imports(point);
        LookupResolver::new(&self.table, &imports)
            .with_strict_case_labels(self.config.strict_case_labels)
            .with_associated_scopes(self.associated.as_deref())
            .resolve(name, point)
    }

    pub fn lookup_str(&mut self, name: &str, point: &ProgramPoint) -> LookupResult {
        let name = self.table.interner().intern(name);
        self.lookup(name, point)
    }
}

// ============================================================================
// GUARDS
// ============================================================================

/// An open import directive. Dropping the guard releases it.
///
/// The guard dereferences to the engine so lookups and nested imports can be
/// made while it is open.
pub struct ImportGuard<'e, T: SymbolTable> {
    engine: &'e mut ImportEngine<T>,
    id: DirectiveId,
    released: bool,
}

impl<'e, T: SymbolTable> ImportGuard<'e, T> {
    fn new(engine: &'e mut ImportEngine<T>, id: DirectiveId) -> Self {
        Self {
            engine,
            id,
            released: false,
        }
    }

    pub fn id(&self) -> DirectiveId {
        self.id
    }

    /// Release now and hand back the directive.
    pub fn end(mut self) -> Option<ImportDirective> {
        self.released = true;
        self.engine.end_import(self.id)
    }
}

impl<T: SymbolTable> Deref for ImportGuard<'_, T> {
    type Target = ImportEngine<T>;

    fn deref(&self) -> &Self::Target {
        self.engine
    }
}

impl<T: SymbolTable> DerefMut for ImportGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.engine
    }
}

impl<T: SymbolTable> Drop for ImportGuard<'_, T> {
    fn drop(&mut self) {
        if !self.released {
            self.engine.release(self.id);
        }
    }
}

/// An active instantiation frame. Dropping the guard pops it.
pub struct InstantiationGuard<'e, T: SymbolTable> {
    engine: &'e mut ImportEngine<T>,
}

impl<T: SymbolTable> Deref for InstantiationGuard<'_, T> {
    type Target = ImportEngine<T>;

    fn deref(&self) -> &Self::Target {
        self.engine
    }
}

impl<T: SymbolTable> DerefMut for InstantiationGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.engine
    }
}

impl<T: SymbolTable> Drop for InstantiationGuard<'_, T> {
    fn drop(&mut self) {
        self.engine.frames.pop();
        tracing::debug!("left instantiation frame {}", self.engine.frames.len());
    }
}
