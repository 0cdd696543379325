//! Tag cleanup: comparison keys, planning, and the executor that applies a
//! plan one transaction at a time.

pub mod analyzer;
pub mod consolidate;
pub mod normalize;
pub mod store;

pub use analyzer::{CleanupPlan, MergeGroup, SplitTarget, TagUsage, analyze};
pub use consolidate::{Consolidation, TagConsolidator};
pub use normalize::normalize;
pub use store::TagStore;
