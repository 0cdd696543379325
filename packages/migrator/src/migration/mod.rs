//! Steps that move legacy data into the target schema and check the result.

pub mod files;
pub mod sequences;
pub mod users;
pub mod verify;

pub use files::FileMigrator;
pub use sequences::fix_sequences;
pub use users::UserMigrator;
pub use verify::verify;
