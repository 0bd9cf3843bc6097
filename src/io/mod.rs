//! Filesystem I/O: atomic persistence and the bounded directory walk used by
//! the Work Selector's full-walk fallback (spec.md §4.1 source 4).

pub mod persistence;
pub mod walk;
