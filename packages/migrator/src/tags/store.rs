use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbBackend, DbErr, EntityTrait, FromQueryResult, QueryFilter, Set,
    Statement,
};

use super::analyzer::TagUsage;
use crate::entity::{file_tag, tag};

const USAGE_SQL: &str = "SELECT t.id, t.tag_name, COUNT(ft.file_id)::BIGINT AS file_count \
     FROM tags t LEFT JOIN file_tags ft ON ft.tag_id = t.id \
     GROUP BY t.id, t.tag_name ORDER BY t.id";

const COPY_LINKS_SQL: &str = "INSERT INTO file_tags (file_id, tag_id) \
     SELECT file_id, $1 FROM file_tags WHERE tag_id = $2 \
     ON CONFLICT (file_id, tag_id) DO NOTHING";

/// Tag and association operations against a connection or an open
/// transaction. Holds no state of its own.
pub struct TagStore<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> TagStore<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Every tag with its file count, ordered by id.
    pub async fn fetch_usage(&self) -> Result<Vec<TagUsage>, DbErr> {
        TagUsage::find_by_statement(Statement::from_string(DbBackend::Postgres, USAGE_SQL))
            .all(self.conn)
            .await
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<tag::Model>, DbErr> {
        tag::Entity::find()
            .filter(tag::Column::TagName.eq(name))
            .one(self.conn)
            .await
    }

    /// Id of the tag named exactly `name`, inserting it if absent.
    ///
    /// Uses `ON CONFLICT DO NOTHING` rather than catching the unique
    /// violation, which would abort an enclosing Postgres transaction.
    pub async fn get_or_create(&self, name: &str) -> Result<i32, DbErr> {
        let model = tag::ActiveModel {
            tag_name: Set(name.to_string()),
            ..Default::default()
        };

        let result = tag::Entity::insert(model)
            .on_conflict(
                OnConflict::column(tag::Column::TagName)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.conn)
            .await;

        match result {
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }

        self.find_by_name(name)
            .await?
            .map(|t| t.id)
            .ok_or_else(|| DbErr::RecordNotFound(format!("tag {name:?} after insert")))
    }

    /// Link a file to a tag. An existing link is left alone.
    pub async fn link(&self, file_id: i32, tag_id: i32) -> Result<(), DbErr> {
        let model = file_tag::ActiveModel {
            file_id: Set(file_id),
            tag_id: Set(tag_id),
        };

        let result = file_tag::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([file_tag::Column::FileId, file_tag::Column::TagId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.conn)
            .await;

        match result {
            Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Give `to` every file `from` has. Returns the number of new links.
    pub async fn copy_links(&self, from: i32, to: i32) -> Result<u64, DbErr> {
        let stmt =
            Statement::from_sql_and_values(DbBackend::Postgres, COPY_LINKS_SQL, [to.into(), from.into()]);
        Ok(self.conn.execute_raw(stmt).await?.rows_affected())
    }

    pub async fn unlink_all(&self, tag_id: i32) -> Result<u64, DbErr> {
        let res = file_tag::Entity::delete_many()
            .filter(file_tag::Column::TagId.eq(tag_id))
            .exec(self.conn)
            .await?;
        Ok(res.rows_affected)
    }

    pub async fn delete_tag(&self, tag_id: i32) -> Result<(), DbErr> {
        tag::Entity::delete_by_id(tag_id).exec(self.conn).await?;
        Ok(())
    }
}
