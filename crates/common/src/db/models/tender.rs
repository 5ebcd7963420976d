//! Tender entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Tender status. Stored as text; values outside the known set are kept as-is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TenderStatus {
    Active,
    Won,
    Lost,
    Pending,
    Other(String),
}

impl From<TenderStatus> for String {
    fn from(status: TenderStatus) -> Self {
        match status {
            TenderStatus::Active => "active".to_string(),
            TenderStatus::Won => "won".to_string(),
            TenderStatus::Lost => "lost".to_string(),
            TenderStatus::Pending => "pending".to_string(),
            TenderStatus::Other(s) => s,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tenders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub user_id: i64,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub client: String,

    #[sea_orm(column_type = "Double")]
    pub value: f64,

    pub deadline: Date,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    #[sea_orm(column_type = "Text")]
    pub category: String,

    /// Computed once at creation
    #[sea_orm(column_type = "Double")]
    pub risk_score: f64,

    /// Computed once at creation
    #[sea_orm(column_type = "Double")]
    pub profit_prediction: f64,

    pub submission_date: Date,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,

    #[sea_orm(has_many = "super::document::Entity")]
    Documents,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Documents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
