//! Domain rules that sit above the wire models: the static subject catalog and
//! how a fetched book list is filtered and ordered for display.

pub mod listing;
pub mod subjects;

pub use subjects::{SUBJECTS, Subject};
