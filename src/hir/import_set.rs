//! Import sets: the names a scope contributes when it is imported.
//!
//! Only declarations usable without an instance are importable. Results are
//! cached per descriptor, so importing the same scope (or the same template
//! instantiation) at many points builds its set once.

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::base::Name;

use super::descriptor::ScopeDescriptor;
use super::error::{ImportError, InstantiateError};
use super::ids::{DeclId, ScopeId};
use super::symbols::{DeclKind, Declaration, ScopeKind, Storage};
use super::table::SymbolTable;

/// Whether a member of a `kind` scope may be imported.
///
/// Enumerators always are; non-static members never are.
pub fn is_importable(kind: ScopeKind, decl: &Declaration) -> bool {
    match decl.kind {
        DeclKind::Enumerator => true,
        DeclKind::NonStaticMember => false,
        _ => kind != ScopeKind::Enum && decl.storage() == Storage::Static,
    }
}

/// The importable declarations of one concrete scope.
#[derive(Clone, Debug)]
pub struct ImportSet {
    scope: ScopeId,
    kind: ScopeKind,
    decls: Vec<DeclId>,
    by_name: IndexMap<Name, Vec<DeclId>>,
}

impl ImportSet {
    fn new(scope: ScopeId, kind: ScopeKind) -> Self {
        Self {
            scope,
            kind,
            decls: Vec::new(),
            by_name: IndexMap::new(),
        }
    }

    fn push(&mut self, id: DeclId, name: Name) {
        self.decls.push(id);
        self.by_name.entry(name).or_default().push(id);
    }

    /// The scope the set was built from (the instantiation, for templates).
    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// Importable declarations spelled `name`.
    pub fn get(&self, name: Name) -> &[DeclId] {
        self.by_name.get(&name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All importable declarations, own members first, then re-exports.
    pub fn decls(&self) -> &[DeclId] {
        &self.decls
    }

    pub fn names(&self) -> impl Iterator<Item = Name> + '_ {
        self.by_name.keys().copied()
    }

    pub fn contains(&self, decl: DeclId) -> bool {
        self.decls.contains(&decl)
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

/// Builds and caches [`ImportSet`]s.
#[derive(Debug, Default)]
pub struct ImportSetBuilder {
    cache: FxHashMap<ScopeDescriptor, Arc<ImportSet>>,
    hits: usize,
}

impl ImportSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Import set for `desc`, instantiating a class template first when the
    /// descriptor carries arguments.
    pub fn build<T: SymbolTable>(
        &mut self,
        table: &mut T,
        desc: &ScopeDescriptor,
    ) -> Result<Arc<ImportSet>, ImportError> {
        if let Some(set) = self.cache.get(desc) {
            self.hits += 1;
            return Ok(Arc::clone(set));
        }

        let scope = if desc.args.is_empty() {
            desc.scope
        } else {
            table.instantiate(desc.scope, &desc.args)?
        };
        let entity = table
            .scope(scope)
            .ok_or(InstantiateError::UnknownScope(scope))?;
        if entity.is_template() {
            return Err(ImportError::UninstantiatedTemplate {
                template: table.qualified_name(scope),
            });
        }

        let mut set = ImportSet::new(scope, entity.kind);
        let mut visited = FxHashSet::default();
        collect(&*table, scope, &mut set, &mut visited);

        tracing::debug!(
            "built import set for {}: {} declaration(s) from {} scope(s)",
            table.qualified_name(scope),
            set.len(),
            visited.len()
        );

        let set = Arc::new(set);
        self.cache.insert(desc.clone(), Arc::clone(&set));
        Ok(set)
    }

    /// Number of builds answered from the cache.
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Number of cached sets.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Add the importable members of `scope`, then of everything it re-exports.
fn collect<T: SymbolTable>(
    table: &T,
    scope: ScopeId,
    set: &mut ImportSet,
    visited: &mut FxHashSet<ScopeId>,
) {
    if !visited.insert(scope) {
        return;
    }
    let Some(entity) = table.scope(scope) else {
        return;
    };

    for &id in table.declarations_of(scope) {
        if let Some(decl) = table.declaration(id) {
            if is_importable(entity.kind, decl) {
                set.push(id, decl.name);
            }
        }
    }

    for &reexport in &entity.reexports {
        collect(table, reexport, set, visited);
    }
}
