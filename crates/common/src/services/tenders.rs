//! Tender lifecycle: dashboard figures, listing, creation, detail, uploads
//!
//! Every operation takes the acting user id from a verified credential and
//! only touches tenders that user owns.

use crate::db::models::{Document, Tender};
use crate::db::{NewDocument, NewTender, Repository, TenderStats};
use crate::errors::{AppError, Result};
use crate::extraction::TextExtractor;
use crate::metrics;
use crate::prediction::{Prediction, Predictor, TenderFeatures};
use axum::body::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Placeholder shown until real margin tracking exists
pub const AVG_PROFIT_MARGIN: f64 = 15.2;

const DEFAULT_CATEGORY: &str = "Other";

/// Dashboard figures for one user
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_tenders: u64,
    pub active_tenders: u64,
    pub won_tenders: u64,
    pub total_value: f64,
    pub win_rate: f64,
    pub avg_profit_margin: f64,
}

impl From<TenderStats> for DashboardStats {
    fn from(stats: TenderStats) -> Self {
        Self {
            total_tenders: stats.total,
            active_tenders: stats.active,
            won_tenders: stats.won,
            total_value: stats.won_value,
            win_rate: win_rate(stats.won, stats.total),
            avg_profit_margin: AVG_PROFIT_MARGIN,
        }
    }
}

/// Tender as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenderView {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub client: String,
    pub value: f64,
    pub deadline: NaiveDate,
    pub status: String,
    pub category: String,
    pub risk_score: f64,
    pub profit_prediction: f64,
    pub submission_date: NaiveDate,
}

impl From<Tender> for TenderView {
    fn from(t: Tender) -> Self {
        Self {
            id: t.id,
            title: t.title,
            description: t.description,
            client: t.client,
            value: t.value,
            deadline: t.deadline,
            status: t.status,
            category: t.category,
            risk_score: t.risk_score,
            profit_prediction: t.profit_prediction,
            submission_date: t.submission_date,
        }
    }
}

/// Document entry in a tender detail
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentView {
    pub id: i64,
    pub name: String,
    pub size: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub upload_date: DateTime<Utc>,
}

impl From<Document> for DocumentView {
    fn from(d: Document) -> Self {
        Self {
            id: d.id,
            name: d.original_filename,
            size: humanize_size(d.file_size),
            file_type: d.file_type,
            upload_date: d.upload_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenderDetail {
    pub tender: TenderView,
    pub documents: Vec<DocumentView>,
}

/// Fields accepted when creating a tender
#[derive(Debug, Clone, Default)]
pub struct CreateTenderInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub client: Option<String>,
    pub value: Option<f64>,
    /// `YYYY-MM-DD`
    pub deadline: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CreatedTender {
    pub tender_id: i64,
    pub risk_score: f64,
    pub profit_prediction: f64,
}

/// An uploaded file as received from the client
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Bytes,
}

pub struct TenderService {
    repo: Repository,
    predictor: Arc<dyn Predictor>,
    extractor: Arc<dyn TextExtractor>,
    upload_dir: PathBuf,
}

impl TenderService {
    pub fn new(
        repo: Repository,
        predictor: Arc<dyn Predictor>,
        extractor: Arc<dyn TextExtractor>,
        upload_dir: PathBuf,
    ) -> Self {
        Self {
            repo,
            predictor,
            extractor,
            upload_dir,
        }
    }

    pub async fn dashboard_stats(&self, user_id: i64) -> Result<DashboardStats> {
        let stats = self.repo.tender_stats(user_id).await?;
        Ok(DashboardStats::from(stats))
    }

    /// The user's tenders, newest first
    pub async fn list(&self, user_id: i64) -> Result<Vec<TenderView>> {
        let tenders = self.repo.list_tenders(user_id).await?;
        Ok(tenders.into_iter().map(TenderView::from).collect())
    }

    /// Validate, score and store a new tender
    pub async fn create(&self, user_id: i64, input: CreateTenderInput) -> Result<CreatedTender> {
        self.create_on(user_id, input, Utc::now().date_naive()).await
    }

    async fn create_on(
        &self,
        user_id: i64,
        input: CreateTenderInput,
        today: NaiveDate,
    ) -> Result<CreatedTender> {
        let title = present(input.title);
        let client = present(input.client);
        let deadline = present(input.deadline);
        // A zero value counts as missing
        let value = input.value.filter(|v| *v != 0.0);

        let (Some(title), Some(client), Some(value), Some(deadline)) =
            (title, client, value, deadline)
        else {
            return Err(AppError::MissingField {
                fields: "title, client, value, deadline".to_string(),
            });
        };

        if !value.is_finite() || value < 0.0 {
            return Err(AppError::Validation {
                message: "Tender value must be a non-negative number".to_string(),
                field: Some("value".to_string()),
            });
        }

        let deadline = NaiveDate::parse_from_str(deadline.trim(), "%Y-%m-%d").map_err(|_| {
            AppError::InvalidFormat {
                message: "deadline must be YYYY-MM-DD".to_string(),
            }
        })?;

        let category = present(input.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        let days_to_deadline = (deadline - today).num_days();

        let Prediction {
            risk_score,
            profit_prediction,
        } = self
            .predictor
            .predict(&TenderFeatures::new(value, days_to_deadline, category.as_str()));

        let tender = self
            .repo
            .create_tender(NewTender {
                user_id,
                title,
                description: input.description,
                client,
                value,
                deadline,
                category,
                risk_score,
                profit_prediction,
                submission_date: today,
            })
            .await?;

        metrics::record_tender_created(&tender.category);
        tracing::info!(
            tender_id = tender.id,
            user_id,
            days_to_deadline,
            risk_score,
            profit_prediction,
            model = self.predictor.model_name(),
            "Tender created"
        );

        Ok(CreatedTender {
            tender_id: tender.id,
            risk_score,
            profit_prediction,
        })
    }

    /// A tender and its documents; NotFound unless the user owns it
    pub async fn detail(&self, user_id: i64, tender_id: i64) -> Result<TenderDetail> {
        let tender = self.owned_tender(user_id, tender_id).await?;
        let documents = self.repo.list_documents(tender.id).await?;

        Ok(TenderDetail {
            tender: TenderView::from(tender),
            documents: documents.into_iter().map(DocumentView::from).collect(),
        })
    }

    /// Store an uploaded file against a tender and record its text
    pub async fn upload_document(&self, user_id: i64, tender_id: i64, upload: Upload) -> Result<i64> {
        if upload.filename.is_empty() {
            return Err(AppError::Validation {
                message: "No file selected".to_string(),
                field: Some("file".to_string()),
            });
        }

        let tender = self.owned_tender(user_id, tender_id).await?;

        let sanitized = sanitize_filename(&upload.filename);
        if sanitized.is_empty() {
            return Err(AppError::Validation {
                message: "Invalid file name".to_string(),
                field: Some("file".to_string()),
            });
        }

        let stored_name = format!("{}_{}", tender.id, sanitized);
        let path = self.upload_dir.join(&stored_name);

        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::write(&path, &upload.bytes).await?;

        let file_type = file_type_of(&sanitized);
        let extracted_text = self.extractor.extract(&path, &file_type).await;
        let file_size = i64::try_from(upload.bytes.len()).ok();

        let document = self
            .repo
            .create_document(NewDocument {
                tender_id: tender.id,
                filename: stored_name,
                original_filename: upload.filename,
                file_size,
                file_type,
                extracted_text,
            })
            .await?;

        metrics::record_document_uploaded(&document.file_type);
        tracing::info!(
            document_id = document.id,
            tender_id = tender.id,
            file_type = %document.file_type,
            size = ?document.file_size,
            extracted_chars = document.extracted_text.len(),
            extractor = self.extractor.name(),
            "Document uploaded"
        );

        Ok(document.id)
    }

    async fn owned_tender(&self, user_id: i64, tender_id: i64) -> Result<Tender> {
        self.repo
            .find_tender_for_user(tender_id, user_id)
            .await?
            .ok_or(AppError::TenderNotFound { id: tender_id })
    }
}

/// Percentage of won tenders to one decimal, ties to even; 0 when there are none
pub fn win_rate(won: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let rate = won as f64 / total as f64 * 100.0;
    (rate * 10.0).round_ties_even() / 10.0
}

/// `"X.X MB"`, or `"Unknown"` for an absent or zero size
pub fn humanize_size(bytes: Option<i64>) -> String {
    match bytes {
        Some(b) if b != 0 => format!("{:.1} MB", b as f64 / 1024.0 / 1024.0),
        _ => "Unknown".to_string(),
    }
}

/// Lower-cased text after the last `.`, empty when there is none
pub fn file_type_of(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

/// Reduce a client-supplied name to a safe, flat ASCII file name
///
/// Path separators become spaces, whitespace runs become `_`, anything
/// outside `[A-Za-z0-9_.-]` is dropped and leading or trailing `.`/`_` are
/// stripped. The result may be empty.
pub fn sanitize_filename(name: &str) -> String {
    let ascii: String = name.chars().filter(char::is_ascii).collect();
    let flattened = ascii.replace(['/', '\\'], " ");
    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");

    joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::set_status;
    use crate::db::models::TenderStatus;
    use crate::db::DbPool;
    use crate::extraction::{DocumentProcessor, MockExtractor};
    use crate::prediction::{DefaultPredictor, DEFAULT_PREDICTION};
    use std::sync::Mutex;

    /// Records the features it is asked to score
    #[derive(Default)]
    struct RecordingPredictor {
        seen: Mutex<Vec<TenderFeatures>>,
    }

    impl Predictor for RecordingPredictor {
        fn predict(&self, features: &TenderFeatures) -> Prediction {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(features.clone());
            }
            Prediction {
                risk_score: 0.42,
                profit_prediction: 0.11,
            }
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    struct Fixture {
        service: TenderService,
        repo: Repository,
        _dir: tempfile::TempDir,
        upload_dir: PathBuf,
    }

    async fn fixture_with(
        predictor: Arc<dyn Predictor>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Fixture {
        let repo = Repository::new(DbPool::in_memory().await.unwrap());
        let dir = tempfile::tempdir().unwrap();
        let upload_dir = dir.path().join("uploads");
        Fixture {
            service: TenderService::new(repo.clone(), predictor, extractor, upload_dir.clone()),
            repo,
            _dir: dir,
            upload_dir,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(Arc::new(DefaultPredictor), Arc::new(DocumentProcessor::default())).await
    }

    async fn user(repo: &Repository, email: &str) -> i64 {
        repo.create_user("U".into(), email.into(), "h".into(), None)
            .await
            .unwrap()
            .id
    }

    fn input(title: &str, value: f64, deadline: &str) -> CreateTenderInput {
        CreateTenderInput {
            title: Some(title.to_string()),
            description: Some("Road resurfacing".to_string()),
            client: Some("County Roads".to_string()),
            value: Some(value),
            deadline: Some(deadline.to_string()),
            category: None,
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_win_rate() {
        assert_eq!(win_rate(0, 0), 0.0);
        assert_eq!(win_rate(1, 4), 25.0);
        assert_eq!(win_rate(1, 3), 33.3);
        assert_eq!(win_rate(2, 3), 66.7);
        assert_eq!(win_rate(1, 16), 6.2);
        assert_eq!(win_rate(5, 16), 31.2);
        assert_eq!(win_rate(3, 16), 18.8);
    }

    #[test]
    fn test_humanize_size() {
        assert_eq!(humanize_size(Some(1_572_864)), "1.5 MB");
        assert_eq!(humanize_size(Some(1024)), "0.0 MB");
        assert_eq!(humanize_size(Some(0)), "Unknown");
        assert_eq!(humanize_size(None), "Unknown");
    }

    #[test]
    fn test_file_type_of() {
        assert_eq!(file_type_of("Spec.PDF"), "pdf");
        assert_eq!(file_type_of("archive.tar.gz"), "gz");
        assert_eq!(file_type_of("README"), "");
        assert_eq!(file_type_of("trailing."), "");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("My cool movie.mov"), "My_cool_movie.mov");
        assert_eq!(sanitize_filename("../../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_filename("i contain cool \u{fc}ml\u{e4}uts.txt"), "i_contain_cool_mluts.txt");
        assert_eq!(sanitize_filename("..\\bid (final).docx"), "bid_final.docx");
        assert_eq!(sanitize_filename("../.."), "");
        assert_eq!(sanitize_filename("___"), "");
    }

    #[tokio::test]
    async fn test_create_scores_and_stores() {
        let predictor = Arc::new(RecordingPredictor::default());
        let fx = fixture_with(predictor.clone(), Arc::new(MockExtractor::new(""))).await;
        let uid = user(&fx.repo, "a@example.com").await;

        let created = fx
            .service
            .create_on(uid, input("Bridge", 2_500_000.0, "2024-03-11"), date("2024-03-01"))
            .await
            .unwrap();
        assert_eq!(created.risk_score, 0.42);
        assert_eq!(created.profit_prediction, 0.11);

        let seen = predictor.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].days_to_deadline, 10);
        assert_eq!(seen[0].category, "Other");
        assert_eq!(seen[0].client_history, 0.5);

        let tenders = fx.service.list(uid).await.unwrap();
        assert_eq!(tenders.len(), 1);
        assert_eq!(tenders[0].id, created.tender_id);
        assert_eq!(tenders[0].status, "active");
        assert_eq!(tenders[0].category, "Other");
        assert_eq!(tenders[0].submission_date, date("2024-03-01"));
    }

    #[tokio::test]
    async fn test_past_deadline_is_allowed() {
        let predictor = Arc::new(RecordingPredictor::default());
        let fx = fixture_with(predictor.clone(), Arc::new(MockExtractor::new(""))).await;
        let uid = user(&fx.repo, "a@example.com").await;

        fx.service
            .create_on(uid, input("Late", 10.0, "2024-02-25"), date("2024-03-01"))
            .await
            .unwrap();
        assert_eq!(predictor.seen.lock().unwrap()[0].days_to_deadline, -5);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let fx = fixture().await;
        let uid = user(&fx.repo, "a@example.com").await;

        let mut blank_title = input("", 10.0, "2030-01-01");
        blank_title.title = Some("  ".into());
        let cases = [
            (blank_title, "missing"),
            (input("T", 0.0, "2030-01-01"), "missing"),
            (CreateTenderInput::default(), "missing"),
            (input("T", 10.0, "01/02/2030"), "format"),
            (input("T", -5.0, "2030-01-01"), "negative"),
        ];

        for (case, label) in cases {
            let err = fx.service.create(uid, case).await.unwrap_err();
            assert_eq!(
                err.status_code(),
                axum::http::StatusCode::BAD_REQUEST,
                "{label}: {err}"
            );
        }
        assert!(fx.service.list(uid).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_default_prediction_is_used() {
        let fx = fixture().await;
        let uid = user(&fx.repo, "a@example.com").await;

        let created = fx.service.create(uid, input("T", 10.0, "2030-01-01")).await.unwrap();
        assert_eq!(created.risk_score, DEFAULT_PREDICTION.risk_score);
        assert_eq!(created.profit_prediction, DEFAULT_PREDICTION.profit_prediction);
    }

    #[tokio::test]
    async fn test_cross_user_isolation() {
        let fx = fixture().await;
        let alice = user(&fx.repo, "alice@example.com").await;
        let bob = user(&fx.repo, "bob@example.com").await;

        let created = fx.service.create(alice, input("T", 10.0, "2030-01-01")).await.unwrap();

        assert!(fx.service.list(bob).await.unwrap().is_empty());
        let err = fx.service.detail(bob, created.tender_id).await.unwrap_err();
        assert!(matches!(err, AppError::TenderNotFound { .. }));

        let upload = Upload {
            filename: "spec.pdf".into(),
            bytes: Bytes::from_static(b"%PDF"),
        };
        let err = fx
            .service
            .upload_document(bob, created.tender_id, upload)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TenderNotFound { .. }));
        assert!(!fx.upload_dir.exists(), "nothing may be written for a foreign tender");
    }

    #[tokio::test]
    async fn test_dashboard_stats() {
        let fx = fixture().await;
        let uid = user(&fx.repo, "a@example.com").await;

        let empty = fx.service.dashboard_stats(uid).await.unwrap();
        assert_eq!(empty.total_tenders, 0);
        assert_eq!(empty.win_rate, 0.0);
        assert_eq!(empty.total_value, 0.0);
        assert_eq!(empty.avg_profit_margin, 15.2);

        let mut ids = Vec::new();
        for value in [100.0, 200.0, 300.0, 400.0] {
            let created = fx.service.create(uid, input("T", value, "2030-01-01")).await.unwrap();
            ids.push(created.tender_id);
        }
        set_status(&fx.repo, ids[1], TenderStatus::Won).await;
        set_status(&fx.repo, ids[2], TenderStatus::Lost).await;

        let stats = fx.service.dashboard_stats(uid).await.unwrap();
        assert_eq!(stats.total_tenders, 4);
        assert_eq!(stats.active_tenders, 2);
        assert_eq!(stats.won_tenders, 1);
        assert_eq!(stats.total_value, 200.0);
        assert_eq!(stats.win_rate, 25.0);
    }

    #[tokio::test]
    async fn test_upload_docx_stores_empty_text() {
        let fx = fixture().await;
        let uid = user(&fx.repo, "a@example.com").await;
        let created = fx.service.create(uid, input("T", 10.0, "2030-01-01")).await.unwrap();

        let upload = Upload {
            filename: "Bill of Quantities.DOCX".into(),
            bytes: Bytes::from(vec![7u8; 1_572_864]),
        };
        let document_id = fx
            .service
            .upload_document(uid, created.tender_id, upload)
            .await
            .unwrap();

        let stored_name = format!("{}_Bill_of_Quantities.DOCX", created.tender_id);
        assert!(fx.upload_dir.join(&stored_name).exists());

        let docs = fx.repo.list_documents(created.tender_id).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, document_id);
        assert_eq!(docs[0].filename, stored_name);
        assert_eq!(docs[0].original_filename, "Bill of Quantities.DOCX");
        assert_eq!(docs[0].file_type, "docx");
        assert_eq!(docs[0].extracted_text, "");

        let detail = fx.service.detail(uid, created.tender_id).await.unwrap();
        assert_eq!(detail.documents[0].size, "1.5 MB");
        assert_eq!(detail.documents[0].name, "Bill of Quantities.DOCX");
        assert_eq!(detail.documents[0].file_type, "docx");
    }

    #[tokio::test]
    async fn test_upload_records_extracted_text() {
        let fx = fixture_with(
            Arc::new(DefaultPredictor),
            Arc::new(MockExtractor::new("Scope of works")),
        )
        .await;
        let uid = user(&fx.repo, "a@example.com").await;
        let created = fx.service.create(uid, input("T", 10.0, "2030-01-01")).await.unwrap();

        let upload = Upload {
            filename: "scope.pdf".into(),
            bytes: Bytes::from_static(b"%PDF-1.4"),
        };
        fx.service
            .upload_document(uid, created.tender_id, upload)
            .await
            .unwrap();

        let docs = fx.repo.list_documents(created.tender_id).await.unwrap();
        assert_eq!(docs[0].extracted_text, "Scope of works");
    }

    #[tokio::test]
    async fn test_upload_type_follows_stored_name() {
        let fx = fixture().await;
        let uid = user(&fx.repo, "a@example.com").await;
        let created = fx.service.create(uid, input("T", 10.0, "2030-01-01")).await.unwrap();

        let upload = Upload {
            filename: "site scan.JPG ".into(),
            bytes: Bytes::from_static(b"\xff\xd8\xff"),
        };
        fx.service
            .upload_document(uid, created.tender_id, upload)
            .await
            .unwrap();

        let docs = fx.repo.list_documents(created.tender_id).await.unwrap();
        assert_eq!(docs[0].filename, format!("{}_site_scan.JPG", created.tender_id));
        assert_eq!(docs[0].original_filename, "site scan.JPG ");
        assert_eq!(docs[0].file_type, "jpg");
    }

    #[tokio::test]
    async fn test_upload_rejects_bad_names() {
        let fx = fixture().await;
        let uid = user(&fx.repo, "a@example.com").await;
        let created = fx.service.create(uid, input("T", 10.0, "2030-01-01")).await.unwrap();

        for name in ["", "../.."] {
            let upload = Upload {
                filename: name.into(),
                bytes: Bytes::from_static(b"x"),
            };
            let err = fx
                .service
                .upload_document(uid, created.tender_id, upload)
                .await
                .unwrap_err();
            assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST, "{name:?}");
        }
        assert!(fx.repo.list_documents(created.tender_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_detail_reads_are_stable() {
        let fx = fixture().await;
        let uid = user(&fx.repo, "a@example.com").await;
        let created = fx.service.create(uid, input("T", 10.0, "2030-01-01")).await.unwrap();

        let first = fx.service.detail(uid, created.tender_id).await.unwrap();
        let second = fx.service.detail(uid, created.tender_id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.tender.risk_score, created.risk_score);
        assert!(first.documents.is_empty());
    }
}
