pub mod config;
pub mod query;
pub mod storage;

pub use query::{FileQueryFilters, FileQueryWhere, QueryParam, build_file_query_where};
