//! Typed handles into the symbol table and the engine.

use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
        pub struct $name(pub u32);

        impl $name {
            #[inline]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn index(self) -> u32 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl From<u32> for $name {
            #[inline]
            fn from(raw: u32) -> Self {
                Self(raw)
            }
        }
    };
}

define_id!(
    /// A scope-introducing entity: namespace, class-like, or enum.
    ScopeId
);
define_id!(
    /// A declaration owned by a scope or a lexical block.
    DeclId
);
define_id!(
    /// A lexical block: function body, compound statement, or switch body.
    BlockId
);
define_id!(
    /// An import directive registered with the engine.
    DirectiveId
);
