//! Verdict over a candidate list.
//!
//! Candidates naming the same declaration collapse, however they were
//! reached. Two or more distinct declarations are ambiguous.

use indexmap::IndexSet;

use super::ids::DeclId;
use super::resolve::{Candidate, Origin, Verdict};

pub fn check(candidates: &[Candidate]) -> Verdict {
    let decls = distinct_decls(candidates);
    match decls.as_slice() {
        [] => Verdict::NotFound,
        [decl] => Verdict::Unique(*decl),
        _ => Verdict::Ambiguous(distinct_origins(candidates)),
    }
}

/// Declarations in first-seen order.
pub fn distinct_decls(candidates: &[Candidate]) -> Vec<DeclId> {
    candidates
        .iter()
        .map(|c| c.decl)
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

/// Origins in first-seen order.
pub fn distinct_origins(candidates: &[Candidate]) -> Vec<Origin> {
    candidates
        .iter()
        .map(|c| c.origin)
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}
