//! Target schema of the file-sharing application.

pub mod file;
pub mod file_tag;
pub mod tag;
pub mod user;
