//! Repository pattern for database operations
//!
//! Tender reads take the owning user id so ownership is enforced in SQL.
//! Document reads are keyed by tender and must follow an ownership check.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};
use serde::Serialize;

/// Aggregates over one user's tenders
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TenderStats {
    pub total: u64,
    pub active: u64,
    pub won: u64,
    /// Sum of `value` over won tenders
    pub won_value: f64,
}

/// Fields supplied when inserting a tender
#[derive(Debug, Clone)]
pub struct NewTender {
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub client: String,
    pub value: f64,
    pub deadline: NaiveDate,
    pub category: String,
    pub risk_score: f64,
    pub profit_prediction: f64,
    pub submission_date: NaiveDate,
}

/// Fields supplied when inserting a document
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub tender_id: i64,
    pub filename: String,
    pub original_filename: String,
    pub file_size: Option<i64>,
    pub file_type: String,
    pub extracted_text: String,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // User Operations
    // ========================================================================

    /// Create a user; a taken email yields `AppError::Duplicate`
    pub async fn create_user(
        &self,
        name: String,
        email: String,
        password_hash: String,
        company: Option<String>,
    ) -> Result<User> {
        let user = UserActiveModel {
            name: Set(name),
            email: Set(email),
            password_hash: Set(password_hash),
            company: Set(company),
            phone: Set(None),
            address: Set(None),
            bio: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        user.insert(self.conn()).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Duplicate {
                    message: "Email already exists".to_string(),
                }
            } else {
                AppError::Database(e)
            }
        })
    }

    /// Find user by ID
    pub async fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
        UserEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Find user by email
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        UserEntity::find()
            .filter(UserColumn::Email.eq(email))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Count users with the given email
    pub async fn count_users_by_email(&self, email: &str) -> Result<u64> {
        UserEntity::find()
            .filter(UserColumn::Email.eq(email))
            .count(self.conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Tender Operations
    // ========================================================================

    /// Create a new tender with status `active`
    pub async fn create_tender(&self, new: NewTender) -> Result<Tender> {
        let tender = TenderActiveModel {
            user_id: Set(new.user_id),
            title: Set(new.title),
            description: Set(new.description),
            client: Set(new.client),
            value: Set(new.value),
            deadline: Set(new.deadline),
            status: Set(String::from(TenderStatus::Active)),
            category: Set(new.category),
            risk_score: Set(new.risk_score),
            profit_prediction: Set(new.profit_prediction),
            submission_date: Set(new.submission_date),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        tender.insert(self.conn()).await.map_err(Into::into)
    }

    /// All tenders owned by a user, newest first
    pub async fn list_tenders(&self, user_id: i64) -> Result<Vec<Tender>> {
        TenderEntity::find()
            .filter(TenderColumn::UserId.eq(user_id))
            .order_by_desc(TenderColumn::CreatedAt)
            .order_by_desc(TenderColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Find a tender only if the given user owns it
    pub async fn find_tender_for_user(&self, tender_id: i64, user_id: i64) -> Result<Option<Tender>> {
        TenderEntity::find_by_id(tender_id)
            .filter(TenderColumn::UserId.eq(user_id))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Dashboard aggregates for one user
    pub async fn tender_stats(&self, user_id: i64) -> Result<TenderStats> {
        let owned = || TenderEntity::find().filter(TenderColumn::UserId.eq(user_id));
        let with_status = |status: TenderStatus| {
            owned().filter(TenderColumn::Status.eq(String::from(status)))
        };

        let total = owned().count(self.conn()).await?;
        let active = with_status(TenderStatus::Active).count(self.conn()).await?;
        let won = with_status(TenderStatus::Won).count(self.conn()).await?;

        let won_value = with_status(TenderStatus::Won)
            .select_only()
            .column_as(Expr::col(TenderColumn::Value).sum(), "won_value")
            .into_tuple::<Option<f64>>()
            .one(self.conn())
            .await?
            .flatten()
            .unwrap_or(0.0);

        Ok(TenderStats {
            total,
            active,
            won,
            won_value,
        })
    }

    // ========================================================================
    // Document Operations
    // ========================================================================

    /// Record an uploaded document
    pub async fn create_document(&self, new: NewDocument) -> Result<Document> {
        let document = DocumentActiveModel {
            tender_id: Set(new.tender_id),
            filename: Set(new.filename),
            original_filename: Set(new.original_filename),
            file_size: Set(new.file_size),
            file_type: Set(new.file_type),
            extracted_text: Set(new.extracted_text),
            upload_date: Set(Utc::now()),
            ..Default::default()
        };

        document.insert(self.conn()).await.map_err(Into::into)
    }

    /// Documents attached to a tender, in upload order
    pub async fn list_documents(&self, tender_id: i64) -> Result<Vec<Document>> {
        DocumentEntity::find()
            .filter(DocumentColumn::TenderId.eq(tender_id))
            .order_by_asc(DocumentColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }
}

/// Whether an error is a unique-constraint violation
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}


#[cfg(test)]
mod tests {
    use super::*;

    async fn repo() -> Repository {
        Repository::new(DbPool::in_memory().await.unwrap())
    }

    fn new_tender(user_id: i64, title: &str, value: f64) -> NewTender {
        let today = Utc::now().date_naive();
        NewTender {
            user_id,
            title: title.to_string(),
            description: None,
            client: "City Council".to_string(),
            value,
            deadline: today,
            category: "Construction".to_string(),
            risk_score: 0.2,
            profit_prediction: 0.1,
            submission_date: today,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let repo = repo().await;
        repo.create_user("A".into(), "a@example.com".into(), "h".into(), None)
            .await
            .unwrap();

        let err = repo
            .create_user("B".into(), "a@example.com".into(), "h".into(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Duplicate { .. }));
        assert_eq!(repo.count_users_by_email("a@example.com").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_tender_ownership_filter() {
        let repo = repo().await;
        let alice = repo
            .create_user("Alice".into(), "alice@example.com".into(), "h".into(), None)
            .await
            .unwrap();
        let bob = repo
            .create_user("Bob".into(), "bob@example.com".into(), "h".into(), None)
            .await
            .unwrap();

        let tender = repo.create_tender(new_tender(alice.id, "Bridge", 10.0)).await.unwrap();
        assert_eq!(tender.status, "active");

        assert!(repo.find_tender_for_user(tender.id, alice.id).await.unwrap().is_some());
        assert!(repo.find_tender_for_user(tender.id, bob.id).await.unwrap().is_none());
        assert!(repo.list_tenders(bob.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_tenders_newest_first() {
        let repo = repo().await;
        let user = repo
            .create_user("U".into(), "u@example.com".into(), "h".into(), None)
            .await
            .unwrap();

        let first = repo.create_tender(new_tender(user.id, "first", 1.0)).await.unwrap();
        let second = repo.create_tender(new_tender(user.id, "second", 2.0)).await.unwrap();

        let ids: Vec<i64> = repo
            .list_tenders(user.id)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_tender_stats() {
        let repo = repo().await;
        let user = repo
            .create_user("U".into(), "u@example.com".into(), "h".into(), None)
            .await
            .unwrap();

        assert_eq!(repo.tender_stats(user.id).await.unwrap(), TenderStats::default());

        let a = repo.create_tender(new_tender(user.id, "a", 100.0)).await.unwrap();
        let b = repo.create_tender(new_tender(user.id, "b", 250.5)).await.unwrap();
        repo.create_tender(new_tender(user.id, "c", 7.0)).await.unwrap();
        fixtures::set_status(&repo, a.id, TenderStatus::Won).await;
        fixtures::set_status(&repo, b.id, TenderStatus::Won).await;
        let c = repo.create_tender(new_tender(user.id, "d", 9.0)).await.unwrap();
        fixtures::set_status(&repo, c.id, TenderStatus::Other("shortlisted".into())).await;

        let stats = repo.tender_stats(user.id).await.unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.won, 2);
        assert!((stats.won_value - 350.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_documents_by_tender() {
        let repo = repo().await;
        let user = repo
            .create_user("U".into(), "u@example.com".into(), "h".into(), None)
            .await
            .unwrap();
        let tender = repo.create_tender(new_tender(user.id, "t", 1.0)).await.unwrap();

        let doc = repo
            .create_document(NewDocument {
                tender_id: tender.id,
                filename: format!("{}_spec.docx", tender.id),
                original_filename: "spec.docx".into(),
                file_size: Some(12),
                file_type: "docx".into(),
                extracted_text: String::new(),
            })
            .await
            .unwrap();

        let docs = repo.list_documents(tender.id).await.unwrap();
        assert_eq!(docs, vec![doc]);
        assert!(repo.list_documents(tender.id + 1).await.unwrap().is_empty());
    }
}
