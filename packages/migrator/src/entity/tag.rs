use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tags")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Display name. Uniqueness is exact; variants that only differ in case
    /// or width are merged by `clean-tags`.
    #[sea_orm(unique)]
    pub tag_name: String,

    #[sea_orm(has_many)]
    pub file_tags: HasMany<super::file_tag::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
