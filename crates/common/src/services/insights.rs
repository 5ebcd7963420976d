//! Analytics summary and downloadable reports
//!
//! Both are placeholders: the analytics figures are fixed and the report
//! content does not depend on the caller's data.

use crate::errors::Result;
use crate::report::{ReportData, ReportRenderer};
use chrono::{NaiveDate, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub summary: AnalyticsSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_bids: u64,
    pub win_rate: f64,
    pub total_value: u64,
    pub avg_profit_margin: f64,
    pub trends: AnalyticsTrends,
}

/// Percentage change against the previous period
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsTrends {
    pub bids: i64,
    pub win_rate: f64,
    pub value: f64,
    pub profit: f64,
}

/// A rendered report ready for download
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct InsightsService {
    renderer: ReportRenderer,
}

impl InsightsService {
    pub fn new(renderer: ReportRenderer) -> Self {
        Self { renderer }
    }

    pub fn analytics(&self, user_id: i64) -> AnalyticsReport {
        tracing::debug!(user_id, "Serving analytics summary");

        AnalyticsReport {
            summary: AnalyticsSummary {
                total_bids: 156,
                win_rate: 28.8,
                total_value: 12_450_000,
                avg_profit_margin: 15.2,
                trends: AnalyticsTrends {
                    bids: 12,
                    win_rate: -2.1,
                    value: 18.5,
                    profit: 3.2,
                },
            },
        }
    }

    pub fn report(&self, user_id: i64, report_type: &str) -> Result<RenderedReport> {
        self.report_on(user_id, report_type, Utc::now().date_naive())
    }

    fn report_on(&self, user_id: i64, report_type: &str, today: NaiveDate) -> Result<RenderedReport> {
        let data = ReportData::new(report_type, today);
        let bytes = self.renderer.render(&data)?;

        tracing::info!(user_id, report_type, size = bytes.len(), "Report generated");

        Ok(RenderedReport {
            filename: data.filename(),
            bytes,
        })
    }
}
