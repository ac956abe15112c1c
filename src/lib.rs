//! # scope-import
//!
//! Scope-import resolution for a C++-like front end: fallback-only lookup of
//! `case` labels in a switch over an enumeration, and `using namespace`
//! applied to classes, structs and enums, including inside templates.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! hir   → symbol table contract, import directives, staged lookup
//!   ↓
//! base  → primitives (FileId, spans, Name interning)
//! ```
//!
//! ## Example
//!
//! ```
//! use scope_import::base::{FileId, FilePosition, FileRange};
//! use scope_import::hir::{
//!     ImportEngine, LexicalExtent, ProgramPoint, ScopeRef, SymbolIndex, TypeRef, DeclKind,
//! };
//!
//! // enum E { a, b, c };  void f(E e) { switch (e) { case a: ... } }
//! let mut index = SymbolIndex::new();
//! let global = index.global();
//! let e = index.add_enum(global, "E", &["a", "b", "c"]);
//! let body = index.add_block(global);
//! index.declare_typed(body, "e", DeclKind::Variable, TypeRef::Scope(e));
//! let switch = index.add_block(body);
//! let operand = ScopeRef::Expr(index.intern("e"));
//!
//! let mut engine = ImportEngine::new(index);
//! let extent = LexicalExtent::new(switch, FileRange::new(FileId::new(0), 40u32, 90u32));
//! let mut guard = engine.begin_switch(operand, extent).unwrap().unwrap();
//!
//! let label = ProgramPoint::case_label(FilePosition::new(FileId::new(0), 52u32), switch);
//! assert!(guard.lookup_str("a", &label).is_unique());
//! ```

/// Foundation types: FileId, spans, Name interning
pub mod base;

/// Semantic model: symbol table, import directives, lookup
pub mod hir;

// Re-export commonly needed items
pub use base::{FileId, FilePosition, FileRange, Interner, Name};
pub use hir::{
    ImportEngine, ImportError, ImportKind, LookupError, LookupResult, ProgramPoint, SymbolIndex,
    SymbolTable, Verdict,
};
