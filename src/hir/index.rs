//! In-memory symbol table.
//!
//! [`SymbolIndex`] stores every scope, declaration and lexical block in flat
//! vectors addressed by typed ids, with a per-owner name index for ordinary
//! lookup. It also owns class template instantiation: each distinct
//! (template, arguments) pair is instantiated once and cached.

use rustc_hash::FxHashMap;

use crate::base::{FileRange, Interner, Name};

use super::error::InstantiateError;
use super::ids::{BlockId, DeclId, ScopeId};
use super::symbols::{
    Block, DeclKind, Declaration, Owner, ScopeEntity, ScopeKind, ScopeRef, Substitution,
    TemplateArgs, TypeRef,
};
use super::table::{ScopeChain, SymbolTable};

/// Default nesting limit for template instantiation.
pub const DEFAULT_INSTANTIATION_LIMIT: usize = 64;

/// Symbol table for a compilation unit.
#[derive(Debug)]
pub struct SymbolIndex {
    interner: Interner,
    scopes: Vec<ScopeEntity>,
    decls: Vec<Declaration>,
    blocks: Vec<Block>,
    /// (owner, name) -> declarations, for ordinary lookup.
    by_name: FxHashMap<(Owner, Name), Vec<DeclId>>,
    /// (template, arguments) -> instantiated scope.
    instances: FxHashMap<(ScopeId, TemplateArgs), ScopeId>,
    instantiation_limit: usize,
}

impl Default for SymbolIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolIndex {
    /// Create an index holding only the global namespace.
    pub fn new() -> Self {
        Self {
            interner: Interner::new(),
            scopes: vec![ScopeEntity::new(None, ScopeKind::Namespace, None)],
            decls: Vec::new(),
            blocks: Vec::new(),
            by_name: FxHashMap::default(),
            instances: FxHashMap::default(),
            instantiation_limit: DEFAULT_INSTANTIATION_LIMIT,
        }
    }

    /// Set the nesting limit for template instantiation.
    pub fn with_instantiation_limit(mut self, limit: usize) -> Self {
        self.instantiation_limit = limit;
        self
    }

    /// The global namespace.
    pub fn global(&self) -> ScopeId {
        ScopeId::new(0)
    }

    pub fn intern(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    // ========================================================================
    // CONSTRUCTION
    // ========================================================================

    /// Add a named scope inside `parent`, declared there as a nested type.
    pub fn add_scope(&mut self, parent: ScopeId, name: &str, kind: ScopeKind) -> ScopeId {
        let name = self.intern(name);
        let id = self.alloc_scope(ScopeEntity::new(Some(name), kind, Some(parent)));
        self.push_decl(Declaration {
            name,
            kind: DeclKind::NestedType,
            owner: Owner::Scope(parent),
            ty: Some(TypeRef::Scope(id)),
            span: None,
        });
        id
    }

    pub fn add_namespace(&mut self, parent: ScopeId, name: &str) -> ScopeId {
        self.add_scope(parent, name, ScopeKind::Namespace)
    }

    pub fn add_class(&mut self, parent: ScopeId, name: &str) -> ScopeId {
        self.add_scope(parent, name, ScopeKind::ClassLike)
    }

    /// Add a class template with the given parameter names.
    pub fn add_class_template(&mut self, parent: ScopeId, name: &str, params: &[&str]) -> ScopeId {
        let id = self.add_scope(parent, name, ScopeKind::ClassLike);
        let params = params.iter().map(|p| self.intern(p)).collect();
        self.scopes[id.index() as usize].template_params = Some(params);
        id
    }

    /// Add an enumeration and its enumerators.
    pub fn add_enum(&mut self, parent: ScopeId, name: &str, enumerators: &[&str]) -> ScopeId {
        let id = self.add_scope(parent, name, ScopeKind::Enum);
        for enumerator in enumerators {
            self.declare_typed(id, enumerator, DeclKind::Enumerator, TypeRef::Scope(id));
        }
        id
    }

    /// Add a lexical block inside a scope or another block.
    pub fn add_block(&mut self, parent: impl Into<Owner>) -> BlockId {
        let id = BlockId::new(self.blocks.len() as u32);
        self.blocks.push(Block {
            parent: parent.into(),
            decls: Vec::new(),
        });
        id
    }

    pub fn declare(&mut self, owner: impl Into<Owner>, name: &str, kind: DeclKind) -> DeclId {
        let name = self.intern(name);
        self.push_decl(Declaration {
            name,
            kind,
            owner: owner.into(),
            ty: None,
            span: None,
        })
    }

    /// Declare a value or type with a known type.
    pub fn declare_typed(
        &mut self,
        owner: impl Into<Owner>,
        name: &str,
        kind: DeclKind,
        ty: TypeRef,
    ) -> DeclId {
        let name = self.intern(name);
        self.push_decl(Declaration {
            name,
            kind,
            owner: owner.into(),
            ty: Some(ty),
            span: None,
        })
    }

    /// `using name = target;` inside a scope.
    pub fn declare_alias(&mut self, scope: ScopeId, name: &str, target: TypeRef) -> DeclId {
        self.declare_typed(scope, name, DeclKind::TypeAlias, target)
    }

    /// Record a `using namespace target;` written inside `scope`'s body.
    pub fn add_reexport(&mut self, scope: ScopeId, target: ScopeId) {
        let reexports = &mut self.scopes[scope.index() as usize].reexports;
        if !reexports.contains(&target) {
            reexports.push(target);
        }
    }

    pub fn set_span(&mut self, decl: DeclId, span: FileRange) {
        if let Some(decl) = self.decls.get_mut(decl.index() as usize) {
            decl.span = Some(span);
        }
    }

    /// Instantiated scope for `(template, args)`, if it was built.
    pub fn instance(&self, template: ScopeId, args: &TemplateArgs) -> Option<ScopeId> {
        self.instances.get(&(template, args.clone())).copied()
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    fn alloc_scope(&mut self, entity: ScopeEntity) -> ScopeId {
        let id = ScopeId::new(self.scopes.len() as u32);
        self.scopes.push(entity);
        id
    }

    fn push_decl(&mut self, decl: Declaration) -> DeclId {
        let id = DeclId::new(self.decls.len() as u32);
        match decl.owner {
            Owner::Scope(scope) => self.scopes[scope.index() as usize].decls.push(id),
            Owner::Block(block) => self.blocks[block.index() as usize].decls.push(id),
        }
        self.by_name.entry((decl.owner, decl.name)).or_default().push(id);
        self.decls.push(decl);
        id
    }

    // ========================================================================
    // INSTANTIATION
    // ========================================================================

    /// Copy `source` into a new scope under `parent`, substituting template
    /// parameters. Nested scopes of `source` are copied recursively.
    fn clone_scope(
        &mut self,
        source: ScopeId,
        subst: &Substitution,
        parent: Option<ScopeId>,
        instance_of: Option<(ScopeId, TemplateArgs)>,
        depth: usize,
    ) -> Result<ScopeId, InstantiateError> {
        if depth >= self.instantiation_limit {
            return Err(InstantiateError::DepthExceeded {
                limit: self.instantiation_limit,
            });
        }
        let src = self
            .scopes
            .get(source.index() as usize)
            .cloned()
            .ok_or(InstantiateError::UnknownScope(source))?;

        let mut entity = ScopeEntity::new(src.name, src.kind, parent);
        if instance_of.is_none() {
            // Member templates stay templates in the copy.
            entity.template_params = src.template_params.clone();
        }
        entity.instance_of = instance_of;
        let target = self.alloc_scope(entity);

        let mut copies: FxHashMap<ScopeId, ScopeId> = FxHashMap::default();
        for decl_id in src.decls {
            let decl = self
                .decls
                .get(decl_id.index() as usize)
                .cloned()
                .ok_or(InstantiateError::UnknownScope(source))?;
            let ty = match decl.ty {
                Some(TypeRef::Scope(own)) if own == source => Some(TypeRef::Scope(target)),
                Some(TypeRef::Scope(nested))
                    if decl.kind == DeclKind::NestedType
                        && self.scope(nested).is_none_or(|s| s.parent == Some(source)) =>
                {
                    let copy = self.clone_scope(nested, subst, Some(target), None, depth + 1)?;
                    copies.insert(nested, copy);
                    Some(TypeRef::Scope(copy))
                }
                other => other.map(|ty| ty.substitute(subst)),
            };
            self.push_decl(Declaration {
                owner: Owner::Scope(target),
                ty,
                ..decl
            });
        }

        let reexports = src
            .reexports
            .iter()
            .map(|r| copies.get(r).copied().unwrap_or(*r))
            .collect();
        if let Some(entity) = self.scopes.get_mut(target.index() as usize) {
            entity.reexports = reexports;
        }

        Ok(target)
    }

    /// Drop every scope and declaration allocated past the given lengths.
    fn rollback(&mut self, scopes: usize, decls: usize) {
        self.scopes.truncate(scopes);
        self.decls.truncate(decls);
        self.by_name.retain(|(owner, _), _| match owner {
            Owner::Scope(scope) => (scope.index() as usize) < scopes,
            Owner::Block(_) => true,
        });
    }

    fn template_param_in(&self, chain: &ScopeChain, name: Name) -> bool {
        chain.links().iter().any(|link| match link {
            Owner::Scope(id) => self
                .scope(*id)
                .and_then(|scope| scope.template_params.as_ref())
                .is_some_and(|params| params.contains(&name)),
            Owner::Block(_) => false,
        })
    }
}

impl SymbolTable for SymbolIndex {
    fn interner(&self) -> &Interner {
        &self.interner
    }

    fn scope(&self, id: ScopeId) -> Option<&ScopeEntity> {
        self.scopes.get(id.index() as usize)
    }

    fn declaration(&self, id: DeclId) -> Option<&Declaration> {
        self.decls.get(id.index() as usize)
    }

    fn declarations_of(&self, scope: ScopeId) -> &[DeclId] {
        self.scope(scope).map(|s| s.decls.as_slice()).unwrap_or(&[])
    }

    fn chain_at(&self, block: BlockId) -> ScopeChain {
        let mut links = vec![Owner::Block(block)];
        let mut current = self.blocks.get(block.index() as usize).map(|b| b.parent);
        while let Some(owner) = current {
            match owner {
                Owner::Block(parent) => {
                    links.push(owner);
                    current = self.blocks.get(parent.index() as usize).map(|b| b.parent);
                }
                Owner::Scope(scope) => {
                    links.extend(self.chain_of_scope(scope).links().iter().copied());
                    current = None;
                }
            }
        }
        ScopeChain::new(links)
    }

    fn chain_of_scope(&self, scope: ScopeId) -> ScopeChain {
        let mut links = Vec::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            links.push(Owner::Scope(id));
            current = self.scope(id).and_then(|s| s.parent);
        }
        ScopeChain::new(links)
    }

    fn ordinary_lookup(&self, name: Name, chain: &ScopeChain) -> Vec<DeclId> {
        for link in chain.links() {
            if let Some(found) = self.by_name.get(&(*link, name)) {
                if !found.is_empty() {
                    return found.clone();
                }
            }
        }
        Vec::new()
    }

    fn resolve_type_or_expr(&self, reference: &ScopeRef, chain: &ScopeChain) -> Option<TypeRef> {
        match reference {
            ScopeRef::Expr(name) => self
                .ordinary_lookup(*name, chain)
                .into_iter()
                .filter_map(|id| self.declaration(id))
                .find(|decl| !decl.kind.names_type())
                .and_then(|decl| decl.ty.clone()),
            ScopeRef::Type(TypeRef::Named(name)) => self
                .ordinary_lookup(*name, chain)
                .into_iter()
                .filter_map(|id| self.declaration(id))
                .find(|decl| decl.kind.names_type())
                .and_then(|decl| decl.ty.clone())
                .or_else(|| {
                    self.template_param_in(chain, *name)
                        .then_some(TypeRef::Param(*name))
                }),
            ScopeRef::Type(ty) => Some(ty.clone()),
        }
    }

    fn instantiate(
        &mut self,
        template: ScopeId,
        args: &TemplateArgs,
    ) -> Result<ScopeId, InstantiateError> {
        if let Some(&instance) = self.instances.get(&(template, args.clone())) {
            return Ok(instance);
        }
        let entity = self
            .scope(template)
            .ok_or(InstantiateError::UnknownScope(template))?;
        let params = entity
            .template_params
            .clone()
            .ok_or(InstantiateError::NotATemplate(template))?;
        if params.len() != args.len() {
            return Err(InstantiateError::ArityMismatch {
                template,
                expected: params.len(),
                found: args.len(),
            });
        }
        let parent = entity.parent;

        let subst = Substitution::from_params(&params, args);
        let (scopes, decls) = (self.scopes.len(), self.decls.len());
        let instance =
            match self.clone_scope(template, &subst, parent, Some((template, args.clone())), 0) {
                Ok(instance) => instance,
                Err(err) => {
                    self.rollback(scopes, decls);
                    tracing::debug!(
                        "instantiating {} failed: {}",
                        self.qualified_name(template),
                        err
                    );
                    return Err(err);
                }
            };
        self.instances.insert((template, args.clone()), instance);

        tracing::debug!(
            "instantiated {} as {:?}",
            self.qualified_name(instance),
            instance
        );
        Ok(instance)
    }
}
