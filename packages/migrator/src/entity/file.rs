use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "files")]
pub struct Model {
    /// Carried over from the legacy row; never generated during migration.
    #[sea_orm(primary_key)]
    pub id: i32,

    /// NULL when the uploader no longer exists.
    pub upload_user_id: Option<i32>,
    #[sea_orm(belongs_to, from = "upload_user_id", to = "id")]
    pub uploader: HasOne<super::user::Entity>,

    pub upload_owner_name: String,
    pub file_name: String,

    /// Object store key, `files/<id>/<file_name>`.
    pub file_path: Option<String>,

    /// Payload size in bytes.
    pub file_size: i64,

    #[sea_orm(column_type = "Text")]
    pub file_comment: String,

    /// "1" for team data, "2" for match data.
    pub data_type: String,

    /// Local (Asia/Tokyo) wall-clock time before which the file is hidden.
    pub downloadable_at: Option<DateTime>,

    #[sea_orm(has_many)]
    pub file_tags: HasMany<super::file_tag::Entity>,

    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}

impl ActiveModelBehavior for ActiveModel {}
