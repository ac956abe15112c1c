//! Data model: scope entities, declarations, type references.
//!
//! These are owned by the symbol table and outlive any single lookup.

use crate::base::{FileRange, Name};

use super::ids::{BlockId, DeclId, ScopeId};

// ============================================================================
// SCOPE ENTITIES
// ============================================================================

/// The three kinds of scope whose members can be imported.
///
/// The kind only matters to the import filter; everything else treats a
/// scope uniformly.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Namespace,
    /// `class` or `struct`.
    ClassLike,
    Enum,
}

impl ScopeKind {
    pub fn display(&self) -> &'static str {
        match self {
            ScopeKind::Namespace => "namespace",
            ScopeKind::ClassLike => "class",
            ScopeKind::Enum => "enum",
        }
    }
}

/// A namespace, class-like type, or enumeration.
#[derive(Clone, Debug)]
pub struct ScopeEntity {
    /// `None` only for the global namespace.
    pub name: Option<Name>,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// Owned declarations in declaration order.
    pub decls: Vec<DeclId>,
    /// Parameters of a class template. `None` for non-templates and for
    /// instantiations.
    pub template_params: Option<Vec<Name>>,
    /// For an instantiation: the template and the arguments it was built from.
    pub instance_of: Option<(ScopeId, TemplateArgs)>,
    /// Scopes re-exported by a `using namespace` written inside this scope.
    pub reexports: Vec<ScopeId>,
}

impl ScopeEntity {
    pub fn new(name: Option<Name>, kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Self {
            name,
            kind,
            parent,
            decls: Vec::new(),
            template_params: None,
            instance_of: None,
            reexports: Vec::new(),
        }
    }

    /// A generic template body, as opposed to an instantiation of one.
    pub fn is_template(&self) -> bool {
        self.template_params.is_some()
    }
}

// ============================================================================
// DECLARATIONS
// ============================================================================

/// What a declaration declares.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DeclKind {
    TypeAlias,
    StaticData,
    StaticFunction,
    /// Data member or member function that needs an instance.
    NonStaticMember,
    Enumerator,
    /// A namespace, class, or enum declared inside another scope.
    NestedType,
    /// Namespace-scope or block-scope object.
    Variable,
    /// Namespace-scope function.
    Function,
}

/// Whether using a declaration needs an object instance.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Storage {
    Static,
    Instance,
}

impl DeclKind {
    /// Storage class implied by the kind. A non-static member is always
    /// `Instance`.
    pub fn storage(&self) -> Storage {
        match self {
            DeclKind::NonStaticMember => Storage::Instance,
            _ => Storage::Static,
        }
    }

    /// Declarations that name a type and can head a scope path.
    pub fn names_type(&self) -> bool {
        matches!(self, DeclKind::TypeAlias | DeclKind::NestedType)
    }

    pub fn display(&self) -> &'static str {
        match self {
            DeclKind::TypeAlias => "type alias",
            DeclKind::StaticData => "static data member",
            DeclKind::StaticFunction => "static member function",
            DeclKind::NonStaticMember => "non-static member",
            DeclKind::Enumerator => "enumerator",
            DeclKind::NestedType => "nested type",
            DeclKind::Variable => "variable",
            DeclKind::Function => "function",
        }
    }
}

/// Where a declaration lives.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Owner {
    Scope(ScopeId),
    Block(BlockId),
}

impl From<ScopeId> for Owner {
    fn from(id: ScopeId) -> Self {
        Owner::Scope(id)
    }
}

impl From<BlockId> for Owner {
    fn from(id: BlockId) -> Self {
        Owner::Block(id)
    }
}

/// A declared name.
#[derive(Clone, Debug)]
pub struct Declaration {
    pub name: Name,
    pub kind: DeclKind,
    pub owner: Owner,
    /// Declared type of a value, target of an alias, or the scope a nested
    /// type introduces.
    pub ty: Option<TypeRef>,
    pub span: Option<FileRange>,
}

impl Declaration {
    pub fn storage(&self) -> Storage {
        self.kind.storage()
    }
}

/// A lexical block holding local declarations.
#[derive(Clone, Debug)]
pub struct Block {
    /// Enclosing block or, for an outermost block, the scope it belongs to.
    pub parent: Owner,
    pub decls: Vec<DeclId>,
}

// ============================================================================
// TYPE REFERENCES
// ============================================================================

/// A reference to a type as written in a declaration or import operand.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// A builtin non-scope type such as `int`.
    Scalar(Name),
    /// An unqualified name still to be looked up.
    Named(Name),
    Scope(ScopeId),
    /// A template parameter.
    Param(Name),
    /// A class template applied to arguments: `Header<v1>`.
    Specialization { template: ScopeId, args: TemplateArgs },
    /// A nested name: `Version::world`.
    Member { base: Box<TypeRef>, member: Name },
}

impl TypeRef {
    pub fn member(base: TypeRef, member: Name) -> Self {
        TypeRef::Member {
            base: Box::new(base),
            member,
        }
    }

    /// Whether the reference mentions a template parameter.
    pub fn is_dependent(&self) -> bool {
        match self {
            TypeRef::Param(_) => true,
            TypeRef::Specialization { args, .. } => args.is_dependent(),
            TypeRef::Member { base, .. } => base.is_dependent(),
            TypeRef::Scalar(_) | TypeRef::Named(_) | TypeRef::Scope(_) => false,
        }
    }

    /// Replace bound parameters; unbound ones stay dependent.
    pub fn substitute(&self, subst: &Substitution) -> TypeRef {
        match self {
            TypeRef::Param(p) => subst.get(*p).cloned().unwrap_or_else(|| self.clone()),
            TypeRef::Specialization { template, args } => TypeRef::Specialization {
                template: *template,
                args: args.substitute(subst),
            },
            TypeRef::Member { base, member } => TypeRef::Member {
                base: Box::new(base.substitute(subst)),
                member: *member,
            },
            TypeRef::Scalar(_) | TypeRef::Named(_) | TypeRef::Scope(_) => self.clone(),
        }
    }
}

/// Arguments of a template instantiation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TemplateArgs(pub Vec<TypeRef>);

impl TemplateArgs {
    pub fn new(args: impl IntoIterator<Item = TypeRef>) -> Self {
        Self(args.into_iter().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeRef> {
        self.0.iter()
    }

    pub fn is_dependent(&self) -> bool {
        self.0.iter().any(TypeRef::is_dependent)
    }

    pub fn substitute(&self, subst: &Substitution) -> Self {
        Self(self.0.iter().map(|arg| arg.substitute(subst)).collect())
    }
}

/// Template parameter bindings of one instantiation.
///
/// Bindings are kept sorted by parameter so equal substitutions hash equally
/// and can key caches.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Substitution {
    bindings: Vec<(Name, TypeRef)>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `param`, replacing any earlier binding.
    pub fn bind(mut self, param: Name, ty: TypeRef) -> Self {
        self.insert(param, ty);
        self
    }

    pub fn insert(&mut self, param: Name, ty: TypeRef) {
        match self.bindings.binary_search_by_key(&param, |(p, _)| *p) {
            Ok(idx) => self.bindings[idx].1 = ty,
            Err(idx) => self.bindings.insert(idx, (param, ty)),
        }
    }

    /// Pair template parameters with arguments positionally.
    pub fn from_params(params: &[Name], args: &TemplateArgs) -> Self {
        let mut subst = Self::new();
        for (param, arg) in params.iter().zip(args.iter()) {
            subst.insert(*param, arg.clone());
        }
        subst
    }

    pub fn get(&self, param: Name) -> Option<&TypeRef> {
        self.bindings
            .binary_search_by_key(&param, |(p, _)| *p)
            .ok()
            .map(|idx| &self.bindings[idx].1)
    }

    /// `inner` layered over `self`; inner bindings win.
    pub fn layered(&self, inner: &Substitution) -> Substitution {
        let mut merged = self.clone();
        for (param, ty) in &inner.bindings {
            merged.insert(*param, ty.clone());
        }
        merged
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Operand of an import: a type, or an expression whose declared type is used.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScopeRef {
    /// `using namespace some_struct;`
    Type(TypeRef),
    /// The controlling expression of a `switch`, named by a variable.
    Expr(Name),
}
