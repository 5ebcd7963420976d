//! Application services shared by the HTTP layer

pub mod accounts;
pub mod insights;
pub mod tenders;

pub use accounts::{AccountService, AuthSession, RegisterInput, UserProfile, UserSummary};
pub use insights::{AnalyticsReport, InsightsService, RenderedReport};
pub use tenders::{
    CreateTenderInput, CreatedTender, DashboardStats, DocumentView, TenderDetail, TenderService,
    TenderView, Upload,
};
