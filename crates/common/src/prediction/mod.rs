//! Tender scoring
//!
//! Maps a tender's feature vector (value, days to deadline, category,
//! client history) to a risk probability and a profit margin. Scoring never
//! fails: any problem inside a model yields [`DEFAULT_PREDICTION`].

mod model;

pub use model::TenderModel;

use crate::config::PredictionConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Returned whenever a model cannot produce a usable score
pub const DEFAULT_PREDICTION: Prediction = Prediction {
    risk_score: 0.3,
    profit_prediction: 0.15,
};

/// Client history score used until real client records exist
pub const DEFAULT_CLIENT_HISTORY: f64 = 0.5;

/// Ordinal codes for the categories the model was trained on
pub const CATEGORY_CODES: [(&str, u8); 5] = [
    ("Construction", 0),
    ("Technology", 1),
    ("Healthcare", 2),
    ("Infrastructure", 3),
    ("Education", 4),
];

/// Encode a category name; unknown categories share code 0
pub fn category_code(category: &str) -> u8 {
    CATEGORY_CODES
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, code)| *code)
        .unwrap_or(0)
}

/// Model inputs for one tender
#[derive(Debug, Clone, PartialEq)]
pub struct TenderFeatures {
    pub value: f64,
    pub days_to_deadline: i64,
    pub category: String,
    pub client_history: f64,
}

impl TenderFeatures {
    pub fn new(value: f64, days_to_deadline: i64, category: impl Into<String>) -> Self {
        Self {
            value,
            days_to_deadline,
            category: category.into(),
            client_history: DEFAULT_CLIENT_HISTORY,
        }
    }

    /// Numeric vector in training column order
    pub fn to_vector(&self) -> [f64; 4] {
        [
            self.value,
            self.days_to_deadline as f64,
            f64::from(category_code(&self.category)),
            self.client_history,
        ]
    }
}

/// Model outputs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Probability in [0, 1]
    pub risk_score: f64,
    /// Margin fraction, never negative
    pub profit_prediction: f64,
}

impl Prediction {
    /// Clamp raw outputs into range, rejecting non-finite values
    pub fn checked(risk: f64, profit: f64) -> Option<Self> {
        if !risk.is_finite() || !profit.is_finite() {
            return None;
        }
        Some(Self {
            risk_score: risk.clamp(0.0, 1.0),
            profit_prediction: profit.max(0.0),
        })
    }
}

/// Trait for tender scoring
pub trait Predictor: Send + Sync {
    /// Score a tender; implementations fall back to [`DEFAULT_PREDICTION`]
    fn predict(&self, features: &TenderFeatures) -> Prediction;

    /// Name reported in logs
    fn model_name(&self) -> &str;
}

/// Predictor used when no model could be loaded or trained
pub struct DefaultPredictor;

impl Predictor for DefaultPredictor {
    fn predict(&self, _features: &TenderFeatures) -> Prediction {
        DEFAULT_PREDICTION
    }

    fn model_name(&self) -> &str {
        "default"
    }
}

/// Load the persisted model, training one if absent; defaults if both fail
pub fn create_predictor(config: &PredictionConfig) -> Arc<dyn Predictor> {
    match TenderModel::load_or_train(&config.model_dir) {
        Ok(model) => Arc::new(model),
        Err(e) => {
            tracing::error!(
                error = %e,
                model_dir = %config.model_dir.display(),
                "Scoring model unavailable, using default scores"
            );
            Arc::new(DefaultPredictor)
        }
    }
}
