//! Document entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub tender_id: i64,

    /// Name on disk, `{tender_id}_{sanitized}`
    #[sea_orm(column_type = "Text")]
    pub filename: String,

    #[sea_orm(column_type = "Text")]
    pub original_filename: String,

    pub file_size: Option<i64>,

    /// Lower-cased extension, empty when the name has none
    #[sea_orm(column_type = "Text")]
    pub file_type: String,

    /// Empty when extraction produced nothing
    #[sea_orm(column_type = "Text")]
    pub extracted_text: String,

    pub upload_date: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tender::Entity",
        from = "Column::TenderId",
        to = "super::tender::Column::Id"
    )]
    Tender,
}

impl Related<super::tender::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tender.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
