//! Logistic/linear scoring model with JSON persistence

use super::{Prediction, Predictor, TenderFeatures, DEFAULT_PREDICTION};
use crate::metrics::METRICS_PREFIX;
use anyhow::Context;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;

const MODEL_FILE: &str = "tender_model.json";
const FEATURES: usize = 4;

/// Synthetic training sample parameters
const TRAINING_SEED: u64 = 42;
const TRAINING_SAMPLES: usize = 1000;
const EPOCHS: usize = 400;
const LEARNING_RATE: f64 = 0.1;

/// Per-column standardization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StandardScaler {
    mean: [f64; FEATURES],
    scale: [f64; FEATURES],
}

impl StandardScaler {
    fn fit(rows: &[[f64; FEATURES]]) -> Self {
        let n = rows.len().max(1) as f64;
        let mut mean = [0.0; FEATURES];
        let mut scale = [0.0; FEATURES];

        for row in rows {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x / n;
            }
        }
        for row in rows {
            for j in 0..FEATURES {
                scale[j] += (row[j] - mean[j]).powi(2) / n;
            }
        }
        for s in scale.iter_mut() {
            *s = s.sqrt();
            // constant column
            if *s == 0.0 {
                *s = 1.0;
            }
        }

        Self { mean, scale }
    }

    fn transform(&self, row: &[f64; FEATURES]) -> [f64; FEATURES] {
        let mut out = [0.0; FEATURES];
        for j in 0..FEATURES {
            out[j] = (row[j] - self.mean[j]) / self.scale[j];
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LinearWeights {
    weights: [f64; FEATURES],
    bias: f64,
}

impl LinearWeights {
    fn zero() -> Self {
        Self { weights: [0.0; FEATURES], bias: 0.0 }
    }

    fn dot(&self, x: &[f64; FEATURES]) -> f64 {
        self.weights.iter().zip(x).map(|(w, v)| w * v).sum::<f64>() + self.bias
    }

    /// Batch gradient descent; `link` maps the linear term to a prediction
    fn fit(rows: &[[f64; FEATURES]], targets: &[f64], link: fn(f64) -> f64) -> Self {
        let n = rows.len().max(1) as f64;
        let mut model = Self::zero();

        for _ in 0..EPOCHS {
            let mut grad = [0.0; FEATURES];
            let mut grad_bias = 0.0;

            for (x, y) in rows.iter().zip(targets) {
                let err = link(model.dot(x)) - y;
                for j in 0..FEATURES {
                    grad[j] += err * x[j] / n;
                }
                grad_bias += err / n;
            }

            for (w, g) in model.weights.iter_mut().zip(grad) {
                *w -= LEARNING_RATE * g;
            }
            model.bias -= LEARNING_RATE * grad_bias;
        }

        model
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn identity(z: f64) -> f64 {
    z
}

/// Risk classifier plus profit regressor over standardized features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenderModel {
    scaler: StandardScaler,
    risk: LinearWeights,
    profit: LinearWeights,
}

impl TenderModel {
    /// Load `tender_model.json` from `dir`, or train and save a fresh model.
    /// Fails when a fresh model cannot be persisted.
    pub fn load_or_train(dir: &Path) -> anyhow::Result<Self> {
        let path = dir.join(MODEL_FILE);

        match Self::load(&path) {
            Ok(model) => {
                tracing::info!(path = %path.display(), "Scoring model loaded");
                return Ok(model);
            }
            Err(e) => {
                tracing::info!(path = %path.display(), reason = %e, "Training new scoring model");
            }
        }

        let model = Self::train();
        model.save(dir)?;
        Ok(model)
    }

    fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    /// Write the model as JSON into `dir`
    pub fn save(&self, dir: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating {}", dir.display()))?;
        let path = dir.join(MODEL_FILE);
        std::fs::write(&path, serde_json::to_vec_pretty(self)?)
            .with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(path = %path.display(), "Scoring model saved");
        Ok(())
    }

    /// Fit on a seeded synthetic sample
    pub fn train() -> Self {
        let mut rng = StdRng::seed_from_u64(TRAINING_SEED);
        let mut rows = Vec::with_capacity(TRAINING_SAMPLES);
        let mut risk_labels = Vec::with_capacity(TRAINING_SAMPLES);
        let mut margins = Vec::with_capacity(TRAINING_SAMPLES);

        for _ in 0..TRAINING_SAMPLES {
            rows.push([
                rng.gen::<f64>() * 10_000_000.0,
                rng.gen::<f64>() * 365.0,
                f64::from(rng.gen_range(0u8..5)),
                rng.gen::<f64>(),
            ]);

            let risk = beta_2_5(&mut rng);
            risk_labels.push(if risk > 0.5 { 1.0 } else { 0.0 });

            let margin = 0.15 + 0.05 * standard_normal(&mut rng);
            margins.push(margin.clamp(0.0, 0.5));
        }

        let scaler = StandardScaler::fit(&rows);
        let scaled: Vec<_> = rows.iter().map(|r| scaler.transform(r)).collect();

        let model = Self {
            risk: LinearWeights::fit(&scaled, &risk_labels, sigmoid),
            profit: LinearWeights::fit(&scaled, &margins, identity),
            scaler,
        };

        tracing::debug!(samples = TRAINING_SAMPLES, "Scoring model trained");
        model
    }

    /// Raw model output; `None` when the result is unusable
    pub fn try_predict(&self, features: &TenderFeatures) -> Option<Prediction> {
        let x = self.scaler.transform(&features.to_vector());
        Prediction::checked(sigmoid(self.risk.dot(&x)), self.profit.dot(&x))
    }
}

impl Predictor for TenderModel {
    fn predict(&self, features: &TenderFeatures) -> Prediction {
        self.try_predict(features).unwrap_or_else(|| {
            tracing::error!(?features, "Scoring produced a non-finite result");
            metrics::counter!(format!("{}_prediction_fallbacks_total", METRICS_PREFIX)).increment(1);
            DEFAULT_PREDICTION
        })
    }

    fn model_name(&self) -> &str {
        "tender-model"
    }
}

/// Beta(2, 5) as the 2nd smallest of 6 uniforms
fn beta_2_5(rng: &mut impl Rng) -> f64 {
    let mut u: [f64; 6] = std::array::from_fn(|_| rng.gen());
    u.sort_by(f64::total_cmp);
    u[1]
}

/// Box-Muller
fn standard_normal(rng: &mut impl Rng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_is_deterministic() {
        assert_eq!(TenderModel::train(), TenderModel::train());
    }

    #[test]
    fn test_predictions_in_range() {
        let model = TenderModel::train();

        for (value, days, category) in [
            (1_000_000.0, 30, "Technology"),
            (0.0, -10, "Other"),
            (9_999_999.0, 365, "Education"),
            (1e12, 100_000, "Construction"),
        ] {
            let p = model.predict(&TenderFeatures::new(value, days, category));
            assert!((0.0..=1.0).contains(&p.risk_score), "risk {p:?}");
            assert!(p.profit_prediction >= 0.0, "profit {p:?}");
        }
    }

    #[test]
    fn test_non_finite_input_falls_back() {
        let model = TenderModel::train();
        let features = TenderFeatures::new(f64::NAN, 30, "Technology");
        assert_eq!(model.try_predict(&features), None);
        assert_eq!(model.predict(&features), DEFAULT_PREDICTION);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let trained = TenderModel::load_or_train(dir.path()).unwrap();
        let loaded = TenderModel::load(&dir.path().join(MODEL_FILE)).unwrap();

        let features = TenderFeatures::new(1_000_000.0, 30, "Technology");
        let a = trained.predict(&features);
        let b = loaded.predict(&features);
        assert!((a.risk_score - b.risk_score).abs() < 1e-9);
        assert!((a.profit_prediction - b.profit_prediction).abs() < 1e-9);
    }

    #[test]
    fn test_corrupt_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MODEL_FILE), "{not json").unwrap();

        let model = TenderModel::load_or_train(dir.path()).unwrap();
        assert_eq!(model, TenderModel::train());
    }

    #[test]
    fn test_sample_distributions() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 5000;
        let mean_beta: f64 = (0..n).map(|_| beta_2_5(&mut rng)).sum::<f64>() / n as f64;
        let mean_normal: f64 = (0..n).map(|_| standard_normal(&mut rng)).sum::<f64>() / n as f64;

        // E[Beta(2,5)] = 2/7
        assert!((mean_beta - 2.0 / 7.0).abs() < 0.02, "{mean_beta}");
        assert!(mean_normal.abs() < 0.06, "{mean_normal}");
    }
}
