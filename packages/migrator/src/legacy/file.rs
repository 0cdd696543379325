use sea_orm::entity::prelude::*;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "files")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Stored as a string column in the legacy schema.
    pub upload_user_id: Option<String>,
    pub upload_owner_name: Option<String>,
    pub file_name: String,
    pub file_comment: Option<String>,
    pub file_data: Option<Vec<u8>>,
    pub data_type: Option<String>,

    pub search_tag1: Option<String>,
    pub search_tag2: Option<String>,
    pub search_tag3: Option<String>,
    pub search_tag4: Option<String>,

    pub downloadable_at: Option<DateTime>,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Legacy tag slots in slot order, trimmed, blanks dropped.
    pub fn tag_slots(&self) -> Vec<&str> {
        [
            &self.search_tag1,
            &self.search_tag2,
            &self.search_tag3,
            &self.search_tag4,
        ]
        .into_iter()
        .filter_map(|slot| slot.as_deref())
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .collect()
    }

    /// Owner id if the legacy string column holds a number.
    pub fn uploader_id(&self) -> Option<i32> {
        self.upload_user_id
            .as_deref()
            .and_then(|raw| raw.trim().parse().ok())
    }
}
