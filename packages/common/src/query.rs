//! WHERE-clause builder for the file search listing.
//!
//! The search feature lives outside this workspace; this module pins down the
//! predicate shape it runs against the migrated `files` table so both sides
//! agree on column names and placeholder numbering.

/// Search filters for the file listing.
#[derive(Debug, Clone, Default)]
pub struct FileQueryFilters {
    pub data_type: Option<String>,
    pub target_user_id: Option<i32>,
    pub keyword: Option<String>,
    /// Ids pre-selected by a tag filter. Empty means "no tag filter".
    pub tag_filtered_file_ids: Option<Vec<i32>>,
    /// Ids whose tags matched the keyword; OR-ed into the keyword predicate.
    pub keyword_matched_file_ids: Option<Vec<i32>>,
}

/// A bound parameter, numbered by its position in [`FileQueryWhere::params`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryParam {
    Text(String),
    Int(i32),
    IntArray(Vec<i32>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileQueryWhere {
    /// `WHERE ...` or the empty string.
    pub where_clause: String,
    pub params: Vec<QueryParam>,
}

/// Visibility rule appended to keyword searches. `downloadable_at` holds
/// Japan local wall-clock time, so `NOW()` is shifted to match.
pub const VISIBLE_NOW: &str =
    "(downloadable_at IS NULL OR downloadable_at <= NOW() AT TIME ZONE 'Asia/Tokyo')";

/// Escape ILIKE wildcards (`\`, `%`, `_`) with a backslash.
pub fn escape_like(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len());
    for c in keyword.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

struct Builder {
    conditions: Vec<String>,
    params: Vec<QueryParam>,
}

impl Builder {
    /// Push a parameter and return its `$n` placeholder.
    fn bind(&mut self, param: QueryParam) -> String {
        self.params.push(param);
        format!("${}", self.params.len())
    }
}

fn contains(column: &str, placeholder: &str) -> String {
    format!("{column} ILIKE '%' || {placeholder} || '%' ESCAPE '\\'")
}

/// Build the WHERE clause and ordered parameters for a file search.
pub fn build_file_query_where(filters: &FileQueryFilters) -> FileQueryWhere {
    let mut b = Builder {
        conditions: Vec::new(),
        params: Vec::new(),
    };

    if let Some(data_type) = filters.data_type.as_deref().filter(|s| !s.is_empty()) {
        let p = b.bind(QueryParam::Text(data_type.to_string()));
        b.conditions.push(format!("data_type = {p}"));
    }

    if let Some(user_id) = filters.target_user_id {
        let p = b.bind(QueryParam::Int(user_id));
        b.conditions.push(format!("upload_user_id = {p}"));
    }

    if let Some(keyword) = filters.keyword.as_deref().filter(|s| !s.is_empty()) {
        let escaped = escape_like(keyword);
        let mut alternatives = Vec::with_capacity(4);
        for column in ["file_name", "file_comment", "upload_owner_name"] {
            let p = b.bind(QueryParam::Text(escaped.clone()));
            alternatives.push(contains(column, &p));
        }
        if let Some(ids) = filters
            .keyword_matched_file_ids
            .as_ref()
            .filter(|ids| !ids.is_empty())
        {
            let p = b.bind(QueryParam::IntArray(ids.clone()));
            alternatives.push(format!("id = ANY({p})"));
        }
        b.conditions.push(format!("({})", alternatives.join(" OR ")));
        b.conditions.push(VISIBLE_NOW.to_string());
    }

    if let Some(ids) = filters
        .tag_filtered_file_ids
        .as_ref()
        .filter(|ids| !ids.is_empty())
    {
        let p = b.bind(QueryParam::IntArray(ids.clone()));
        b.conditions.push(format!("id = ANY({p})"));
    }

    let where_clause = if b.conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", b.conditions.join(" AND "))
    };

    FileQueryWhere {
        where_clause,
        params: b.params,
    }
}

#[cfg(feature = "sea-orm")]
impl From<QueryParam> for sea_orm::Value {
    fn from(param: QueryParam) -> Self {
        match param {
            QueryParam::Text(s) => s.into(),
            QueryParam::Int(i) => i.into(),
            QueryParam::IntArray(ids) => ids.into(),
        }
    }
}
