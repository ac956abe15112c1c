//! Import directives and their lexical extents.

use std::sync::Arc;

use crate::base::{FilePosition, FileRange};

use super::descriptor::{DeferredScope, ScopeDescriptor};
use super::ids::{BlockId, DirectiveId};
use super::import_set::ImportSet;
use super::resolve::{LookupSite, ProgramPoint};
use super::symbols::ScopeRef;

/// How a directive's names compete with ordinary lookup.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ImportKind {
    /// `using namespace X;` over any scope kind. Candidates always
    /// participate.
    Unconditional,
    /// The implicit import of a `switch` over an enum. Consulted only for
    /// case labels of that switch, and only when ordinary lookup is empty.
    FallbackOnly,
}

impl ImportKind {
    pub fn display(&self) -> &'static str {
        match self {
            ImportKind::Unconditional => "using-directive",
            ImportKind::FallbackOnly => "switch fallback import",
        }
    }
}

/// The region a directive is visible in.
///
/// `block` is the block the directive was written in. For a fallback-only
/// import it is the switch body the directive is bound to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LexicalExtent {
    pub block: BlockId,
    pub range: FileRange,
}

impl LexicalExtent {
    pub fn new(block: BlockId, range: FileRange) -> Self {
        Self { block, range }
    }

    pub fn covers(&self, position: FilePosition) -> bool {
        self.range.contains(position)
    }
}

#[derive(Clone, Debug)]
pub enum DirectiveState {
    Active {
        descriptor: ScopeDescriptor,
        set: Arc<ImportSet>,
    },
    /// Operand depends on a template parameter.
    Deferred(DeferredScope),
}

/// An open import.
#[derive(Clone, Debug)]
pub struct ImportDirective {
    pub id: DirectiveId,
    pub kind: ImportKind,
    pub extent: LexicalExtent,
    pub operand: ScopeRef,
    pub state: DirectiveState,
    /// Opened by a `switch`; a deferred operand that turns out not to be an
    /// enum contributes nothing.
    pub from_switch: bool,
}

impl ImportDirective {
    /// Whether the directive contributes candidates at `point`.
    pub fn applies_to(&self, point: &ProgramPoint) -> bool {
        if !self.extent.covers(point.position) {
            return false;
        }
        match self.kind {
            ImportKind::Unconditional => true,
            ImportKind::FallbackOnly => matches!(
                point.site,
                LookupSite::CaseLabel { switch } if switch == self.extent.block
            ),
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self.state, DirectiveState::Deferred(_))
    }

    pub fn import_set(&self) -> Option<&Arc<ImportSet>> {
        match &self.state {
            DirectiveState::Active { set, .. } => Some(set),
            DirectiveState::Deferred(_) => None,
        }
    }
}

/// Open directives in the order they were opened.
#[derive(Debug, Default)]
pub struct DirectiveSet {
    directives: Vec<ImportDirective>,
    next_id: u32,
}

impl DirectiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        kind: ImportKind,
        extent: LexicalExtent,
        operand: ScopeRef,
        state: DirectiveState,
        from_switch: bool,
    ) -> DirectiveId {
        let id = DirectiveId::new(self.next_id);
        self.next_id += 1;
        self.directives.push(ImportDirective {
            id,
            kind,
            extent,
            operand,
            state,
            from_switch,
        });
        id
    }

    pub fn remove(&mut self, id: DirectiveId) -> Option<ImportDirective> {
        let idx = self.directives.iter().position(|d| d.id == id)?;
        Some(self.directives.remove(idx))
    }

    pub fn get(&self, id: DirectiveId) -> Option<&ImportDirective> {
        self.directives.iter().find(|d| d.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImportDirective> {
        self.directives.iter()
    }

    /// Directives contributing at `point`.
    pub fn covering<'a>(
        &'a self,
        point: &'a ProgramPoint,
    ) -> impl Iterator<Item = &'a ImportDirective> + 'a {
        self.directives.iter().filter(move |d| d.applies_to(point))
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }
}
