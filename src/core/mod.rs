//! Table-transform engine: column addressing, value standardization,
//! composite-key lookup, pivot aggregation and its presentation pass.

pub mod columns;
pub mod concatenate;
pub mod lookup;
pub mod pivot;
pub mod presentation;
pub mod standardize;

pub use columns::{index_to_letter, letter_to_index, ColumnRef, TableRole};
pub use concatenate::{concatenate, ConcatPart};
pub use lookup::{lookup, LookupOutcome, LookupRequest, MatchMode, MatchReport, ReturnMode};
pub use pivot::{pivot, AggFunc, PivotOutcome, PivotRequest, ValueSpec};
pub use standardize::{build_key, standardize};
