//! The expression ranker's supporting machinery (§4.5): per-document
//! factor bookkeeping, the min-gaps/ATC/LCCS trackers that feed it, and
//! the formula compiler in [`hook`].

pub mod atc;
pub mod factors;
pub mod hook;
pub mod lccs;
pub mod min_gaps;

pub use factors::{FieldFactors, Factors};
pub use hook::CompiledExpr;
