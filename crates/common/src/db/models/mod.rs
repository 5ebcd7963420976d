//! SeaORM entity models
//!
//! Database entities for TenderDesk

mod analytics_metric;
mod document;
mod tender;
mod user;

pub use user::{
    Entity as UserEntity,
    Model as User,
    ActiveModel as UserActiveModel,
    Column as UserColumn,
};

pub use tender::{
    Entity as TenderEntity,
    Model as Tender,
    ActiveModel as TenderActiveModel,
    Column as TenderColumn,
    TenderStatus,
};

pub use document::{
    Entity as DocumentEntity,
    Model as Document,
    ActiveModel as DocumentActiveModel,
    Column as DocumentColumn,
};

pub use analytics_metric::{
    Entity as AnalyticsMetricEntity,
    Model as AnalyticsMetric,
    ActiveModel as AnalyticsMetricActiveModel,
    Column as AnalyticsMetricColumn,
};
