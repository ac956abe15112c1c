//! Identifier interning.
//!
//! Every declared name and every looked-up identifier is a [`Name`]; lookups
//! compare `u32`s, never strings.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use std::fmt;

/// An interned identifier.
///
/// Two `Name`s from the same [`Interner`] are equal exactly when their
/// spellings are equal.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Name(u32);

impl Name {
    #[inline]
    pub(crate) const fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Get the raw index.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.0)
    }
}

/// String interner for identifiers.
#[derive(Default)]
pub struct Interner {
    inner: RwLock<InternerInner>,
}

#[derive(Default)]
struct InternerInner {
    map: FxHashMap<SmolStr, u32>,
    strings: Vec<SmolStr>,
}

impl Interner {
    /// Create a new empty interner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern an identifier, returning the existing `Name` if it was seen before.
    pub fn intern(&self, s: &str) -> Name {
        {
            let inner = self.inner.read();
            if let Some(&index) = inner.map.get(s) {
                return Name::from_raw(index);
            }
        }

        let mut inner = self.inner.write();

        // Another writer may have won the race between the two locks.
        if let Some(&index) = inner.map.get(s) {
            return Name::from_raw(index);
        }

        let smol = SmolStr::new(s);
        let index = inner.strings.len() as u32;
        inner.strings.push(smol.clone());
        inner.map.insert(smol, index);

        Name::from_raw(index)
    }

    /// Find the `Name` for an identifier without interning it.
    ///
    /// A spelling that was never interned cannot be declared anywhere, so
    /// callers can short-circuit lookups with this.
    pub fn find(&self, s: &str) -> Option<Name> {
        self.inner.read().map.get(s).map(|&index| Name::from_raw(index))
    }

    /// Look up the spelling of a `Name`.
    ///
    /// Returns `None` if the `Name` was created by a different interner.
    pub fn lookup(&self, name: Name) -> Option<SmolStr> {
        let inner = self.inner.read();
        inner.strings.get(name.0 as usize).cloned()
    }

    /// Spelling of a `Name`, or `<?>` for a foreign handle.
    ///
    /// Intended for messages, where a placeholder beats a panic.
    pub fn display(&self, name: Name) -> SmolStr {
        self.lookup(name).unwrap_or_else(|| SmolStr::new_static("<?>"))
    }

    /// Get the number of interned identifiers.
    pub fn len(&self) -> usize {
        self.inner.read().strings.len()
    }

    /// Check if the interner is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Interner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Interner")
            .field("count", &inner.strings.len())
            .finish()
    }
}
