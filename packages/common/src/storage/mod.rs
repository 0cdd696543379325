mod error;
mod key;
mod traits;

pub mod filesystem;
#[cfg(feature = "object-storage")]
pub mod s3;

pub use error::StorageError;
pub use key::{DEFAULT_CONTENT_TYPE, ObjectKey, content_type_for};
pub use traits::ObjectStore;
