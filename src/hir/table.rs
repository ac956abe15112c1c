//! The symbol table contract the engine consumes.
//!
//! The engine never owns declarations; it queries a [`SymbolTable`] for
//! scopes, declarations, ordinary lexical lookup and template instantiation.
//! [`SymbolIndex`](super::SymbolIndex) is the in-memory implementation.

use crate::base::{Interner, Name};

use super::error::InstantiateError;
use super::ids::{BlockId, DeclId, ScopeId};
use super::symbols::{Declaration, Owner, ScopeEntity, ScopeRef, TemplateArgs, TypeRef};

/// The ordinary lexical scope chain at a program point, innermost first.
///
/// Starts at a block (or a scope) and ends at the global namespace.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScopeChain {
    links: Vec<Owner>,
}

impl ScopeChain {
    pub fn new(links: Vec<Owner>) -> Self {
        Self { links }
    }

    pub fn links(&self) -> &[Owner] {
        &self.links
    }

    /// The innermost scope entity on the chain, skipping blocks.
    pub fn innermost_scope(&self) -> Option<ScopeId> {
        self.links.iter().find_map(|link| match link {
            Owner::Scope(id) => Some(*id),
            Owner::Block(_) => None,
        })
    }

    /// The chain without its innermost link.
    pub fn enclosing(&self) -> ScopeChain {
        Self::new(self.links.iter().skip(1).copied().collect())
    }
}

/// Queries the engine needs from the front end's symbol table.
pub trait SymbolTable {
    fn interner(&self) -> &Interner;

    fn scope(&self, id: ScopeId) -> Option<&ScopeEntity>;

    fn declaration(&self, id: DeclId) -> Option<&Declaration>;

    /// Declarations owned by `scope`, in declaration order.
    fn declarations_of(&self, scope: ScopeId) -> &[DeclId];

    /// Scope chain visible from inside `block`.
    fn chain_at(&self, block: BlockId) -> ScopeChain;

    /// Scope chain visible from inside the body of `scope`.
    fn chain_of_scope(&self, scope: ScopeId) -> ScopeChain;

    /// All declarations of `name` in the innermost link of `chain` that has
    /// any; outer links are hidden by inner ones.
    fn ordinary_lookup(&self, name: Name, chain: &ScopeChain) -> Vec<DeclId>;

    /// One step of ordinary type/expression resolution.
    ///
    /// An expression resolves to its declared type and a type name to the
    /// type it denotes; structured references are returned unchanged. The
    /// result may still need further resolution.
    fn resolve_type_or_expr(&self, reference: &ScopeRef, chain: &ScopeChain) -> Option<TypeRef>;

    /// Instantiate a class template, returning the cached instance when the
    /// same arguments were seen before.
    fn instantiate(
        &mut self,
        template: ScopeId,
        args: &TemplateArgs,
    ) -> Result<ScopeId, InstantiateError>;

    /// Members of `scope` spelled `name`.
    fn members_named(&self, scope: ScopeId, name: Name) -> Vec<DeclId> {
        self.declarations_of(scope)
            .iter()
            .copied()
            .filter(|&id| self.declaration(id).is_some_and(|decl| decl.name == name))
            .collect()
    }

    /// `outer::inner<args>` spelling of a scope; `::` for the global namespace.
    fn qualified_name(&self, scope: ScopeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            let Some(entity) = self.scope(id) else { break };
            if let Some(name) = entity.name {
                let mut segment = self.interner().display(name).to_string();
                if let Some((_, args)) = &entity.instance_of {
                    segment.push_str(&self.render_args(args));
                }
                segments.push(segment);
            }
            current = entity.parent;
        }
        if segments.is_empty() {
            return "::".to_string();
        }
        segments.reverse();
        segments.join("::")
    }

    fn render_args(&self, args: &TemplateArgs) -> String {
        let rendered: Vec<String> = args.iter().map(|arg| self.render_type(arg)).collect();
        format!("<{}>", rendered.join(", "))
    }

    fn render_type(&self, ty: &TypeRef) -> String {
        match ty {
            TypeRef::Scalar(name) | TypeRef::Named(name) | TypeRef::Param(name) => {
                self.interner().display(*name).to_string()
            }
            TypeRef::Scope(id) => self.qualified_name(*id),
            TypeRef::Specialization { template, args } => {
                format!("{}{}", self.qualified_name(*template), self.render_args(args))
            }
            TypeRef::Member { base, member } => {
                format!("{}::{}", self.render_type(base), self.interner().display(*member))
            }
        }
    }

    fn render_scope_ref(&self, reference: &ScopeRef) -> String {
        match reference {
            ScopeRef::Type(ty) => self.render_type(ty),
            ScopeRef::Expr(name) => self.interner().display(*name).to_string(),
        }
    }

    /// Human-readable owner of a declaration, for diagnostics.
    fn render_owner(&self, owner: Owner) -> String {
        match owner {
            Owner::Scope(id) => self.qualified_name(id),
            Owner::Block(_) => "local scope".to_string(),
        }
    }
}
