//! Imports inside class templates and of template specializations.
//!
//! The running example is a reader for a versioned binary format:
//!
//! ```text
//! struct v1 { struct world { static const int magic; }; };
//! struct v2 { struct world { static const int magic; static void upgrade(); }; };
//!
//! template <class Version> struct Reader {
//!     void read() { using namespace Version::world; ... magic ... }
//! };
//! ```

use rstest::rstest;
use scope_import::base::{FileId, FilePosition, FileRange};
use scope_import::hir::{
    BlockId, DeclId, DeclKind, ImportEngine, ImportError, ImportKind, InstantiateError,
    LexicalExtent, LookupError, Owner, ProgramPoint, ScopeId, ScopeRef, Substitution, SymbolIndex,
    SymbolTable, TemplateArgs, TypeRef, UnresolvedReason, Verdict,
};

const FILE: FileId = FileId::new(0);

fn extent(block: BlockId) -> LexicalExtent {
    LexicalExtent::new(block, FileRange::new(FILE, 0u32, 500u32))
}

fn point(block: BlockId) -> ProgramPoint {
    ProgramPoint::expr(FilePosition::new(FILE, 100u32), block)
}

struct Versions {
    index: SymbolIndex,
    v1: ScopeId,
    v2: ScopeId,
    magic1: DeclId,
    magic2: DeclId,
    upgrade2: DeclId,
    header: ScopeId,
    reader_body: BlockId,
}

fn versions() -> Versions {
    let mut index = SymbolIndex::new();
    let global = index.global();

    let v1 = index.add_class(global, "v1");
    let world1 = index.add_class(v1, "world");
    let magic1 = index.declare(world1, "magic", DeclKind::StaticData);

    let v2 = index.add_class(global, "v2");
    let world2 = index.add_class(v2, "world");
    let magic2 = index.declare(world2, "magic", DeclKind::StaticData);
    let upgrade2 = index.declare(world2, "upgrade", DeclKind::StaticFunction);

    // template <class V> struct Header { static int size; int offset; using layout = V; };
    let header = index.add_class_template(global, "Header", &["V"]);
    index.declare(header, "size", DeclKind::StaticData);
    index.declare(header, "offset", DeclKind::NonStaticMember);
    let v = index.intern("V");
    index.declare_alias(header, "layout", TypeRef::Param(v));

    let reader = index.add_class_template(global, "Reader", &["Version"]);
    let reader_body = index.add_block(reader);

    Versions {
        index,
        v1,
        v2,
        magic1,
        magic2,
        upgrade2,
        header,
        reader_body,
    }
}

/// `Version::world`, spelled the way it appears inside `Reader`.
fn version_world(index: &SymbolIndex) -> ScopeRef {
    ScopeRef::Type(TypeRef::member(
        TypeRef::Named(index.intern("Version")),
        index.intern("world"),
    ))
}

fn bind_version(index: &SymbolIndex, version: ScopeId) -> Substitution {
    Substitution::new().bind(index.intern("Version"), TypeRef::Scope(version))
}

#[test]
fn test_dependent_import_defers_until_instantiation() {
    let v = versions();
    let operand = version_world(&v.index);
    let body = v.reader_body;
    let mut engine = ImportEngine::new(v.index);

    let mut guard = engine
        .begin_import(operand, ImportKind::Unconditional, extent(body))
        .unwrap();
    assert!(guard.directive(guard.id()).unwrap().is_deferred());

    let result = guard.lookup_str("magic", &point(body));
    assert_eq!(result.verdict, Verdict::Deferred);
    assert_eq!(
        result.into_result(guard.table().interner()),
        Err(LookupError::DependentScopeDeferred {
            name: "magic".to_string()
        })
    );
}

#[test]
fn test_each_instantiation_sees_its_own_version() {
    let v = versions();
    let operand = version_world(&v.index);
    let body = v.reader_body;
    let with_v1 = bind_version(&v.index, v.v1);
    let with_v2 = bind_version(&v.index, v.v2);
    let mut engine = ImportEngine::new(v.index);

    let mut guard = engine
        .begin_import(operand, ImportKind::Unconditional, extent(body))
        .unwrap();

    {
        let mut inst = guard.enter_instantiation(with_v1);
        assert_eq!(inst.lookup_str("magic", &point(body)).verdict, Verdict::Unique(v.magic1));
        assert!(inst.lookup_str("upgrade", &point(body)).is_not_found());
    }
    {
        let mut inst = guard.enter_instantiation(with_v2);
        assert_eq!(inst.lookup_str("magic", &point(body)).verdict, Verdict::Unique(v.magic2));
        assert_eq!(
            inst.lookup_str("upgrade", &point(body)).verdict,
            Verdict::Unique(v.upgrade2)
        );
    }

    assert!(guard.lookup_str("magic", &point(body)).is_deferred());
}

#[test]
fn test_nested_instantiation_frames_prefer_inner_binding() {
    let v = versions();
    let operand = version_world(&v.index);
    let body = v.reader_body;
    let with_v1 = bind_version(&v.index, v.v1);
    let with_v2 = bind_version(&v.index, v.v2);
    let mut engine = ImportEngine::new(v.index);

    let mut guard = engine
        .begin_import(operand, ImportKind::Unconditional, extent(body))
        .unwrap();
    let mut outer = guard.enter_instantiation(with_v1);
    let mut inner = outer.enter_instantiation(with_v2);

    assert_eq!(inner.lookup_str("magic", &point(body)).verdict, Verdict::Unique(v.magic2));
}

#[test]
fn test_non_scope_argument_reports_unresolved_import() {
    let v = versions();
    let operand = version_world(&v.index);
    let body = v.reader_body;
    let int = v.index.intern("int");
    let with_int = Substitution::new().bind(v.index.intern("Version"), TypeRef::Scalar(int));
    let mut engine = ImportEngine::new(v.index);

    let mut guard = engine
        .begin_import(operand, ImportKind::Unconditional, extent(body))
        .unwrap();
    let id = guard.id();
    let mut inst = guard.enter_instantiation(with_int);
    let result = inst.lookup_str("magic", &point(body));

    assert_eq!(result.verdict, Verdict::NotFound);
    assert_eq!(result.unresolved.len(), 1);
    assert_eq!(result.unresolved[0].0, id);
    assert!(matches!(
        result.unresolved[0].1,
        ImportError::UnresolvedScope {
            reason: UnresolvedReason::NotAScope,
            ..
        }
    ));
}

#[test]
fn test_specialization_imports_instantiated_members() {
    let v = versions();
    let args = TemplateArgs::new([TypeRef::Scope(v.v1)]);
    let operand = ScopeRef::Type(TypeRef::Specialization {
        template: v.header,
        args: args.clone(),
    });
    let global = v.index.global();
    let mut index = v.index;
    let body = index.add_block(global);
    let mut engine = ImportEngine::new(index);

    let mut guard = engine
        .begin_import(operand, ImportKind::Unconditional, extent(body))
        .unwrap();

    let size = guard.lookup_str("size", &point(body)).unique().unwrap();
    assert!(guard.lookup_str("offset", &point(body)).is_not_found());

    let layout = guard.lookup_str("layout", &point(body)).unique().unwrap();
    let table = guard.table();
    let instance = table.instance(v.header, &args).unwrap();
    assert_eq!(table.declaration(size).unwrap().owner, Owner::Scope(instance));
    assert_eq!(
        table.declaration(layout).unwrap().ty,
        Some(TypeRef::Scope(v.v1))
    );
    assert_eq!(table.qualified_name(instance), "Header<v1>");
}

#[test]
fn test_dependent_specialization_shares_instantiation() {
    // using namespace Header<v1>;  ...  template <class Version> ... using namespace Header<Version>;
    let v = versions();
    let version = v.index.intern("Version");
    let dependent = ScopeRef::Type(TypeRef::Specialization {
        template: v.header,
        args: TemplateArgs::new([TypeRef::Param(version)]),
    });
    let concrete = ScopeRef::Type(TypeRef::Specialization {
        template: v.header,
        args: TemplateArgs::new([TypeRef::Scope(v.v1)]),
    });
    let global = v.index.global();
    let with_v1 = bind_version(&v.index, v.v1);
    let reader_body = v.reader_body;
    let mut index = v.index;
    let plain_body = index.add_block(global);
    let mut engine = ImportEngine::new(index);

    let expected = {
        let mut guard = engine
            .begin_import(concrete, ImportKind::Unconditional, extent(plain_body))
            .unwrap();
        guard.lookup_str("size", &point(plain_body)).unique().unwrap()
    };

    let mut guard = engine
        .begin_import(dependent, ImportKind::Unconditional, extent(reader_body))
        .unwrap();
    assert!(guard.lookup_str("size", &point(reader_body)).is_deferred());

    let mut inst = guard.enter_instantiation(with_v1);
    assert_eq!(
        inst.lookup_str("size", &point(reader_body)).verdict,
        Verdict::Unique(expected)
    );
    assert_eq!(inst.import_sets().hits(), 1);
}

#[rstest]
#[case::too_many_arguments(2)]
#[case::too_few_arguments(0)]
fn test_specialization_arity_is_checked(#[case] count: usize) {
    let v = versions();
    let args = TemplateArgs::new(std::iter::repeat(TypeRef::Scope(v.v1)).take(count));
    let operand = ScopeRef::Type(TypeRef::Specialization {
        template: v.header,
        args,
    });
    let global = v.index.global();
    let mut index = v.index;
    let body = index.add_block(global);
    let mut engine = ImportEngine::new(index);

    let err = engine
        .begin_import(operand, ImportKind::Unconditional, extent(body))
        .err()
        .unwrap();

    if count == 0 {
        // An empty argument list names the generic body.
        assert_eq!(
            err,
            ImportError::UninstantiatedTemplate {
                template: "Header".to_string()
            }
        );
    } else {
        assert_eq!(
            err,
            ImportError::Instantiate(InstantiateError::ArityMismatch {
                template: v.header,
                expected: 1,
                found: count,
            })
        );
    }
}

#[test]
fn test_instantiation_depth_limit() {
    // template <class T> struct Outer { struct Inner { static int x; }; };
    let mut index = SymbolIndex::new().with_instantiation_limit(1);
    let global = index.global();
    let int = index.intern("int");
    let outer = index.add_class_template(global, "Outer", &["T"]);
    let inner = index.add_class(outer, "Inner");
    index.declare(inner, "x", DeclKind::StaticData);
    let body = index.add_block(global);
    let operand = ScopeRef::Type(TypeRef::Specialization {
        template: outer,
        args: TemplateArgs::new([TypeRef::Scalar(int)]),
    });
    let mut engine = ImportEngine::new(index);

    let err = engine
        .begin_import(operand, ImportKind::Unconditional, extent(body))
        .err()
        .unwrap();

    assert_eq!(
        err,
        ImportError::Instantiate(InstantiateError::DepthExceeded { limit: 1 })
    );
}

#[test]
fn test_dependent_switch_only_imports_enums() {
    // template <class E> void f(E e) { switch (e) { case a: ... } }
    let mut index = SymbolIndex::new();
    let global = index.global();
    let letters = index.add_enum(global, "letters", &["a", "b"]);
    let widget = index.add_class(global, "widget");
    index.declare(widget, "a", DeclKind::StaticData);
    let f = index.add_class_template(global, "f", &["E"]);
    let body = index.add_block(f);
    let e_param = index.intern("E");
    index.declare_typed(body, "e", DeclKind::Variable, TypeRef::Param(e_param));
    let switch = index.add_block(body);
    let operand = ScopeRef::Expr(index.intern("e"));
    let mut engine = ImportEngine::new(index);

    let mut guard = engine
        .begin_switch(operand, extent(switch))
        .unwrap()
        .unwrap();
    let label = ProgramPoint::case_label(FilePosition::new(FILE, 100u32), switch);
    assert!(guard.lookup_str("a", &label).is_deferred());

    {
        let mut inst =
            guard.enter_instantiation(Substitution::new().bind(e_param, TypeRef::Scope(letters)));
        assert!(inst.lookup_str("a", &label).is_unique());
    }
    {
        let mut inst =
            guard.enter_instantiation(Substitution::new().bind(e_param, TypeRef::Scope(widget)));
        let result = inst.lookup_str("a", &label);
        assert!(result.is_not_found());
        assert!(result.unresolved.is_empty());
    }
}

#[test]
fn test_argument_spellings_share_one_instantiation() {
    // using namespace Header<v1>;  using namespace Header<v1_alias>;  using namespace Header<::v1>;
    let v = versions();
    let global = v.index.global();
    let mut index = v.index;
    index.declare_alias(global, "v1_alias", TypeRef::Scope(v.v1));
    let body = index.add_block(global);
    let spellings = [
        TypeRef::Scope(v.v1),
        TypeRef::Named(index.intern("v1")),
        TypeRef::Named(index.intern("v1_alias")),
    ];
    let mut engine = ImportEngine::new(index);

    let mut expected = None;
    for spelling in spellings {
        let operand = ScopeRef::Type(TypeRef::Specialization {
            template: v.header,
            args: TemplateArgs::new([spelling]),
        });
        let mut guard = engine
            .begin_import(operand, ImportKind::Unconditional, extent(body))
            .unwrap();
        let size = guard.lookup_str("size", &point(body)).unique().unwrap();
        assert_eq!(*expected.get_or_insert(size), size);
    }

    assert_eq!(engine.import_sets().len(), 1);
    assert_eq!(engine.import_sets().hits(), 2);
}

#[test]
fn test_two_spellings_of_one_specialization_are_not_ambiguous() {
    let v = versions();
    let global = v.index.global();
    let mut index = v.index;
    let body = index.add_block(global);
    let by_scope = ScopeRef::Type(TypeRef::Specialization {
        template: v.header,
        args: TemplateArgs::new([TypeRef::Scope(v.v1)]),
    });
    let by_name = ScopeRef::Type(TypeRef::Specialization {
        template: v.header,
        args: TemplateArgs::new([TypeRef::Named(index.intern("v1"))]),
    });
    let mut engine = ImportEngine::new(index);

    let mut first = engine
        .begin_import(by_scope, ImportKind::Unconditional, extent(body))
        .unwrap();
    let mut second = first
        .begin_import(by_name, ImportKind::Unconditional, extent(body))
        .unwrap();

    let result = second.lookup_str("size", &point(body));
    assert!(result.is_unique(), "{:?}", result.verdict);
    assert_eq!(result.candidates.len(), 2);
}

#[test]
fn test_parameter_bound_by_name_matches_concrete_specialization() {
    let v = versions();
    let version = v.index.intern("Version");
    let dependent = ScopeRef::Type(TypeRef::Specialization {
        template: v.header,
        args: TemplateArgs::new([TypeRef::Param(version)]),
    });
    let concrete = ScopeRef::Type(TypeRef::Specialization {
        template: v.header,
        args: TemplateArgs::new([TypeRef::Scope(v.v1)]),
    });
    let by_name = Substitution::new().bind(version, TypeRef::Named(v.index.intern("v1")));
    let global = v.index.global();
    let reader_body = v.reader_body;
    let mut index = v.index;
    let plain_body = index.add_block(global);
    let mut engine = ImportEngine::new(index);

    let expected = engine
        .begin_import(concrete, ImportKind::Unconditional, extent(plain_body))
        .unwrap()
        .lookup_str("size", &point(plain_body))
        .unique()
        .unwrap();

    let mut guard = engine
        .begin_import(dependent, ImportKind::Unconditional, extent(reader_body))
        .unwrap();
    let mut inst = guard.enter_instantiation(by_name);

    assert_eq!(
        inst.lookup_str("size", &point(reader_body)).verdict,
        Verdict::Unique(expected)
    );
}

#[test]
fn test_failed_import_leaves_table_unchanged() {
    // template <class T> struct Outer { struct Inner { static int x; }; };
    let mut index = SymbolIndex::new().with_instantiation_limit(1);
    let global = index.global();
    let int = index.intern("int");
    let outer = index.add_class_template(global, "Outer", &["T"]);
    let inner = index.add_class(outer, "Inner");
    index.declare(inner, "x", DeclKind::StaticData);
    let body = index.add_block(global);
    let operand = ScopeRef::Type(TypeRef::Specialization {
        template: outer,
        args: TemplateArgs::new([TypeRef::Scalar(int)]),
    });
    let mut engine = ImportEngine::new(index);
    let scopes = engine.table().scope_count();

    for _ in 0..3 {
        assert!(engine
            .begin_import(operand.clone(), ImportKind::Unconditional, extent(body))
            .is_err());
    }

    assert_eq!(engine.table().scope_count(), scopes);
    assert!(engine.directives().next().is_none());
}
