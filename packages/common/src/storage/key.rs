use std::fmt;

/// Fallback content type for unknown extensions.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Explicit extension table. Anything not listed is served as
/// [`DEFAULT_CONTENT_TYPE`].
const CONTENT_TYPES: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("txt", "text/plain"),
    ("zip", "application/zip"),
    ("lzh", "application/x-lzh-compressed"),
    ("7z", "application/x-7z-compressed"),
];

/// Look up the content type for a filename by its final extension.
pub fn content_type_for(filename: &str) -> &'static str {
    let Some((_, ext)) = filename.rsplit_once('.') else {
        return DEFAULT_CONTENT_TYPE;
    };
    let ext = ext.to_ascii_lowercase();
    CONTENT_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, content_type)| *content_type)
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

/// Storage key of a migrated file: `files/<id>/<original-filename>`.
/// Same id and name, same key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    pub const FILES_PREFIX: &'static str = "files";

    pub fn for_file(id: i32, filename: &str) -> Self {
        Self(format!("{}/{id}/{filename}", Self::FILES_PREFIX))
    }

    /// Wrap an already-built key, e.g. a `file_path` read back from the database.
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key segments, for backends that map keys onto a directory tree.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
