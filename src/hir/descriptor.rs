//! Scope descriptor resolution.
//!
//! Turns the operand of an import (`using namespace X;`, or the controlling
//! expression of a `switch`) into the scope entity it denotes. Operands that
//! depend on a template parameter produce a [`DeferredScope`] token, which
//! is resolved again per instantiation instead of re-analysing the source.

use crate::base::Name;

use super::error::{ImportError, UnresolvedReason};
use super::ids::ScopeId;
use super::symbols::{ScopeRef, Substitution, TemplateArgs, TypeRef};
use super::table::{ScopeChain, SymbolTable};

/// Default bound on alias and parameter hops while resolving one operand.
pub const DEFAULT_ALIAS_STEP_LIMIT: usize = 32;

/// A resolved import operand.
///
/// `args` is empty unless `scope` is a class template, in which case the
/// import set comes from the instantiation for these arguments.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScopeDescriptor {
    pub scope: ScopeId,
    pub args: TemplateArgs,
}

impl ScopeDescriptor {
    pub fn plain(scope: ScopeId) -> Self {
        Self {
            scope,
            args: TemplateArgs::default(),
        }
    }
}

/// An operand that mentions an unbound template parameter.
///
/// Holds the dependent reference and the scope chain it was written in, so
/// it can be resolved without the source once arguments are known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeferredScope {
    pub reference: TypeRef,
    pub chain: ScopeChain,
}

/// Outcome of resolving an operand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ScopeDescriptor),
    /// Not an error: the operand waits for template arguments.
    Deferred(DeferredScope),
}

impl Resolution {
    pub fn descriptor(&self) -> Option<&ScopeDescriptor> {
        match self {
            Resolution::Resolved(desc) => Some(desc),
            Resolution::Deferred(_) => None,
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Resolution::Deferred(_))
    }
}

/// Resolves import operands against a symbol table.
pub struct DescriptorResolver<'a, T: SymbolTable> {
    table: &'a mut T,
    subst: Option<&'a Substitution>,
    alias_step_limit: usize,
}

impl<'a, T: SymbolTable> DescriptorResolver<'a, T> {
    pub fn new(table: &'a mut T) -> Self {
        Self {
            table,
            subst: None,
            alias_step_limit: DEFAULT_ALIAS_STEP_LIMIT,
        }
    }

    /// Bind template parameters for this resolution.
    pub fn with_substitution(mut self, subst: Option<&'a Substitution>) -> Self {
        self.subst = subst;
        self
    }

    pub fn with_alias_step_limit(mut self, limit: usize) -> Self {
        self.alias_step_limit = limit;
        self
    }

    /// Resolve an operand written where `chain` is the visible scope chain.
    pub fn resolve(
        &mut self,
        reference: &ScopeRef,
        chain: &ScopeChain,
    ) -> Result<Resolution, ImportError> {
        let operand = self.table.render_scope_ref(reference);
        let ty = self
            .table
            .resolve_type_or_expr(reference, chain)
            .ok_or_else(|| ImportError::unresolved(&operand, UnresolvedReason::UnknownName))?;
        self.resolve_type(ty, chain, &operand, self.alias_step_limit)
    }

    /// Retry a deferred operand under the current substitution.
    ///
    /// Yields `Deferred` again if the substitution leaves it dependent.
    pub fn resolve_deferred(&mut self, deferred: &DeferredScope) -> Result<Resolution, ImportError> {
        let operand = self.table.render_type(&deferred.reference);
        self.resolve_type(
            deferred.reference.clone(),
            &deferred.chain,
            &operand,
            self.alias_step_limit,
        )
    }

    fn resolve_type(
        &mut self,
        ty: TypeRef,
        chain: &ScopeChain,
        operand: &str,
        steps: usize,
    ) -> Result<Resolution, ImportError> {
        if steps == 0 {
            return Err(ImportError::unresolved(operand, UnresolvedReason::AliasCycle));
        }

        match ty {
            TypeRef::Scalar(_) => Err(ImportError::unresolved(operand, UnresolvedReason::NotAScope)),

            TypeRef::Named(name) => {
                let next = self
                    .table
                    .resolve_type_or_expr(&ScopeRef::Type(TypeRef::Named(name)), chain)
                    .ok_or_else(|| ImportError::unresolved(operand, UnresolvedReason::UnknownName))?;
                self.resolve_type(next, chain, operand, steps - 1)
            }

            TypeRef::Scope(id) => {
                let entity = self
                    .table
                    .scope(id)
                    .ok_or_else(|| ImportError::unresolved(operand, UnresolvedReason::UnknownName))?;
                if entity.is_template() {
                    return Err(ImportError::unresolved(
                        operand,
                        UnresolvedReason::MissingTemplateArguments,
                    ));
                }
                Ok(Resolution::Resolved(ScopeDescriptor::plain(id)))
            }

            TypeRef::Param(param) => match self.subst.and_then(|subst| subst.get(param)).cloned() {
                Some(bound) => self.resolve_type(bound, chain, operand, steps - 1),
                None => Ok(Resolution::Deferred(DeferredScope {
                    reference: TypeRef::Param(param),
                    chain: chain.clone(),
                })),
            },

            TypeRef::Specialization { template, args } => {
                let args = match self.subst {
                    Some(subst) => args.substitute(subst),
                    None => args,
                };
                match self.canonical_args(args.clone(), chain, operand, steps - 1)? {
                    Some(canonical) => Ok(Resolution::Resolved(ScopeDescriptor {
                        scope: template,
                        args: canonical,
                    })),
                    None => Ok(Resolution::Deferred(DeferredScope {
                        reference: TypeRef::Specialization { template, args },
                        chain: chain.clone(),
                    })),
                }
            }

            TypeRef::Member { base, member } => {
                let desc = match self.resolve_type((*base).clone(), chain, operand, steps - 1)? {
                    Resolution::Resolved(desc) => desc,
                    Resolution::Deferred(_) => {
                        return Ok(Resolution::Deferred(DeferredScope {
                            reference: TypeRef::Member { base, member },
                            chain: chain.clone(),
                        }));
                    }
                };
                let scope = self.concrete_scope(&desc)?;
                let target = self.member_type(scope, member, operand)?;
                let member_chain = self.table.chain_of_scope(scope);
                self.resolve_type(target, &member_chain, operand, steps - 1)
            }
        }
    }

    /// Canonical form of a template argument: names and aliases followed
    /// down to a scope, a scalar or a specialization of canonical arguments.
    ///
    /// `None` while the argument still depends on an unbound parameter.
    fn canonical_arg(
        &mut self,
        arg: TypeRef,
        chain: &ScopeChain,
        operand: &str,
        steps: usize,
    ) -> Result<Option<TypeRef>, ImportError> {
        if steps == 0 && !matches!(arg, TypeRef::Scalar(_) | TypeRef::Scope(_)) {
            return Err(ImportError::unresolved(operand, UnresolvedReason::AliasCycle));
        }

        match arg {
            TypeRef::Scalar(_) | TypeRef::Scope(_) => Ok(Some(arg)),

            TypeRef::Named(name) => {
                let next = self
                    .table
                    .resolve_type_or_expr(&ScopeRef::Type(TypeRef::Named(name)), chain)
                    .ok_or_else(|| ImportError::unresolved(operand, UnresolvedReason::UnknownName))?;
                self.canonical_arg(next, chain, operand, steps - 1)
            }

            TypeRef::Param(param) => match self.subst.and_then(|subst| subst.get(param)).cloned() {
                Some(bound) => self.canonical_arg(bound, chain, operand, steps - 1),
                None => Ok(None),
            },

            TypeRef::Specialization { template, args } => Ok(self
                .canonical_args(args, chain, operand, steps - 1)?
                .map(|args| TypeRef::Specialization { template, args })),

            TypeRef::Member { base, member } => {
                let desc = match self.resolve_type(*base, chain, operand, steps - 1)? {
                    Resolution::Resolved(desc) => desc,
                    Resolution::Deferred(_) => return Ok(None),
                };
                let scope = self.concrete_scope(&desc)?;
                let target = self.member_type(scope, member, operand)?;
                let member_chain = self.table.chain_of_scope(scope);
                self.canonical_arg(target, &member_chain, operand, steps - 1)
            }
        }
    }

    fn canonical_args(
        &mut self,
        args: TemplateArgs,
        chain: &ScopeChain,
        operand: &str,
        steps: usize,
    ) -> Result<Option<TemplateArgs>, ImportError> {
        let mut canonical = Vec::with_capacity(args.len());
        for arg in args.0 {
            match self.canonical_arg(arg, chain, operand, steps)? {
                Some(arg) => canonical.push(arg),
                None => return Ok(None),
            }
        }
        Ok(Some(TemplateArgs::new(canonical)))
    }

    /// The type named by `member` inside `scope`.
    fn member_type(
        &self,
        scope: ScopeId,
        member: Name,
        operand: &str,
    ) -> Result<TypeRef, ImportError> {
        self.table
            .members_named(scope, member)
            .into_iter()
            .filter_map(|id| self.table.declaration(id))
            .find(|decl| decl.kind.names_type())
            .and_then(|decl| decl.ty.clone())
            .ok_or_else(|| {
                let member = self.table.interner().display(member).to_string();
                ImportError::unresolved(operand, UnresolvedReason::NoSuchMember(member))
            })
    }

    /// The scope whose members a descriptor exposes, instantiating if needed.
    fn concrete_scope(&mut self, desc: &ScopeDescriptor) -> Result<ScopeId, ImportError> {
        if desc.args.is_empty() {
            return Ok(desc.scope);
        }
        Ok(self.table.instantiate(desc.scope, &desc.args)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::error::InstantiateError;
    use crate::hir::index::SymbolIndex;
    use crate::hir::symbols::DeclKind;

    #[test]
    fn test_named_struct_resolves() {
        let mut index = SymbolIndex::new();
        let global = index.global();
        let s = index.add_class(global, "some_struct");
        let name = index.intern("some_struct");
        let chain = index.chain_of_scope(global);

        let resolution = DescriptorResolver::new(&mut index)
            .resolve(&ScopeRef::Type(TypeRef::Named(name)), &chain)
            .unwrap();

        assert_eq!(resolution, Resolution::Resolved(ScopeDescriptor::plain(s)));
    }

    #[test]
    fn test_scalar_is_unresolved() {
        let mut index = SymbolIndex::new();
        let global = index.global();
        let int = index.intern("int");
        let chain = index.chain_of_scope(global);

        let err = DescriptorResolver::new(&mut index)
            .resolve(&ScopeRef::Type(TypeRef::Scalar(int)), &chain)
            .unwrap_err();

        assert_eq!(
            err,
            ImportError::unresolved("int", UnresolvedReason::NotAScope)
        );
    }

    #[test]
    fn test_alias_is_followed() {
        let mut index = SymbolIndex::new();
        let global = index.global();
        let e = index.add_enum(global, "reason_t", &["a"]);
        index.declare_alias(global, "reason", TypeRef::Scope(e));
        let reason = index.intern("reason");
        let chain = index.chain_of_scope(global);

        let resolution = DescriptorResolver::new(&mut index)
            .resolve(&ScopeRef::Type(TypeRef::Named(reason)), &chain)
            .unwrap();

        assert_eq!(resolution.descriptor(), Some(&ScopeDescriptor::plain(e)));
    }

    #[test]
    fn test_alias_cycle_is_bounded() {
        let mut index = SymbolIndex::new();
        let global = index.global();
        let a = index.intern("a");
        let b = index.intern("b");
        index.declare_alias(global, "a", TypeRef::Named(b));
        index.declare_alias(global, "b", TypeRef::Named(a));
        let chain = index.chain_of_scope(global);

        let err = DescriptorResolver::new(&mut index)
            .with_alias_step_limit(8)
            .resolve(&ScopeRef::Type(TypeRef::Named(a)), &chain)
            .unwrap_err();

        assert!(matches!(
            err,
            ImportError::UnresolvedScope { reason: UnresolvedReason::AliasCycle, .. }
        ));
    }

    #[test]
    fn test_dependent_member_defers_then_resolves() {
        let mut index = SymbolIndex::new();
        let global = index.global();
        let v1 = index.add_class(global, "v1");
        let world = index.add_class(v1, "world");
        let version = index.intern("Version");
        let world_name = index.intern("world");
        let chain = index.chain_of_scope(global);
        let operand = ScopeRef::Type(TypeRef::member(TypeRef::Param(version), world_name));

        let deferred = match DescriptorResolver::new(&mut index).resolve(&operand, &chain) {
            Ok(Resolution::Deferred(token)) => token,
            other => panic!("expected deferral, got {:?}", other),
        };

        let subst = Substitution::new().bind(version, TypeRef::Scope(v1));
        let resolution = DescriptorResolver::new(&mut index)
            .with_substitution(Some(&subst))
            .resolve_deferred(&deferred)
            .unwrap();

        assert_eq!(resolution.descriptor(), Some(&ScopeDescriptor::plain(world)));
    }

    #[test]
    fn test_missing_member_type() {
        let mut index = SymbolIndex::new();
        let global = index.global();
        let v1 = index.add_class(global, "v1");
        index.declare(v1, "world", DeclKind::StaticData);
        let world = index.intern("world");
        let chain = index.chain_of_scope(global);

        let err = DescriptorResolver::new(&mut index)
            .resolve(
                &ScopeRef::Type(TypeRef::member(TypeRef::Scope(v1), world)),
                &chain,
            )
            .unwrap_err();

        assert_eq!(
            err,
            ImportError::unresolved("v1::world", UnresolvedReason::NoSuchMember("world".into()))
        );
    }

    #[test]
    fn test_template_without_arguments() {
        let mut index = SymbolIndex::new();
        let global = index.global();
        let header = index.add_class_template(global, "Header", &["V"]);
        let chain = index.chain_of_scope(global);

        let err = DescriptorResolver::new(&mut index)
            .resolve(&ScopeRef::Type(TypeRef::Scope(header)), &chain)
            .unwrap_err();

        assert!(matches!(
            err,
            ImportError::UnresolvedScope {
                reason: UnresolvedReason::MissingTemplateArguments,
                ..
            }
        ));
    }

    #[test]
    fn test_specialization_arguments_are_canonical() {
        let mut index = SymbolIndex::new();
        let global = index.global();
        let v1 = index.add_class(global, "v1");
        index.declare_alias(global, "current", TypeRef::Named(index.intern("v1")));
        let header = index.add_class_template(global, "Header", &["V"]);
        let current = index.intern("current");
        let chain = index.chain_of_scope(global);

        let resolution = DescriptorResolver::new(&mut index)
            .resolve(
                &ScopeRef::Type(TypeRef::Specialization {
                    template: header,
                    args: TemplateArgs::new([TypeRef::Named(current)]),
                }),
                &chain,
            )
            .unwrap();

        assert_eq!(
            resolution.descriptor().map(|d| &d.args),
            Some(&TemplateArgs::new([TypeRef::Scope(v1)]))
        );
    }

    #[test]
    fn test_parameter_spelled_by_name_defers() {
        // template <class Version> struct Reader { using namespace Header<Version>; };
        let mut index = SymbolIndex::new();
        let global = index.global();
        let header = index.add_class_template(global, "Header", &["V"]);
        let reader = index.add_class_template(global, "Reader", &["Version"]);
        let version = index.intern("Version");
        let chain = index.chain_of_scope(reader);

        let resolution = DescriptorResolver::new(&mut index)
            .resolve(
                &ScopeRef::Type(TypeRef::Specialization {
                    template: header,
                    args: TemplateArgs::new([TypeRef::Named(version)]),
                }),
                &chain,
            )
            .unwrap();

        assert!(resolution.is_deferred());
    }

    #[test]
    fn test_member_of_specialization_instantiates() {
        let mut index = SymbolIndex::new();
        let global = index.global();
        let plain = index.add_class(global, "plain");
        let header = index.add_class_template(global, "Header", &["V"]);
        index.add_class(header, "fields");
        let fields = index.intern("fields");
        let chain = index.chain_of_scope(global);
        let args = TemplateArgs::new([TypeRef::Scope(plain)]);

        let resolution = DescriptorResolver::new(&mut index)
            .resolve(
                &ScopeRef::Type(TypeRef::member(
                    TypeRef::Specialization { template: header, args: args.clone() },
                    fields,
                )),
                &chain,
            )
            .unwrap();

        let instance = index.instance(header, &args).unwrap();
        let desc = resolution.descriptor().unwrap();
        assert_eq!(index.scope(desc.scope).unwrap().parent, Some(instance));
    }

    #[test]
    fn test_specialization_of_non_template() {
        let mut index = SymbolIndex::new();
        let global = index.global();
        let plain = index.add_class(global, "plain");
        let inner = index.intern("inner");
        let chain = index.chain_of_scope(global);

        let err = DescriptorResolver::new(&mut index)
            .resolve(
                &ScopeRef::Type(TypeRef::member(
                    TypeRef::Specialization {
                        template: plain,
                        args: TemplateArgs::new([TypeRef::Scope(plain)]),
                    },
                    inner,
                )),
                &chain,
            )
            .unwrap_err();

        assert_eq!(err, ImportError::Instantiate(InstantiateError::NotATemplate(plain)));
    }
}
