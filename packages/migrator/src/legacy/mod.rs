//! Read-side view of the legacy database.
//!
//! Only the columns the migration reads are mapped. Columns that may hold
//! NULL in old rows are `Option` here even where the target schema is strict,
//! so one bad row cannot fail a whole page.

pub mod file;
pub mod user;
