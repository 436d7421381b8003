// src/ml/cost_model.rs
use chrono::{DateTime, Utc};
use log::{debug, info};
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{CostingError, Result};
use crate::ml::feature_extraction::{vocabulary_fingerprint, FEATURE_VECTOR_SIZE};

/// Artifact format version. Bumped whenever the persisted layout changes
/// shape, so stale files fail loudly at load instead of misbehaving.
pub const MODEL_FORMAT_VERSION: u32 = 1;

const DEFAULT_ETA0: f64 = 0.01;
const DEFAULT_POWER_T: f64 = 0.25;
const DEFAULT_ALPHA: f64 = 1e-4;
const DEFAULT_MAX_ITER: usize = 1000;
const DEFAULT_TOL: f64 = 1e-3;
const N_ITER_NO_CHANGE: usize = 5;
const SHUFFLE_SEED: u64 = 42;

// Per-feature centering and scaling statistics, learned once from the
// training batch and frozen afterward. Online updates adapt the regressor
// only; recomputing these from single samples would drift the feature
// geometry out from under the learned weights.
#[derive(Serialize, Deserialize, Debug, Clone)]
struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    fn fit(features: &Array2<f64>) -> Result<Self> {
        let mean = features.mean_axis(Axis(0)).ok_or_else(|| {
            CostingError::InvalidTrainingData("cannot compute statistics of an empty batch".into())
        })?;
        // Population standard deviation. Constant columns get a scale of 1.0
        // so they pass through centered instead of dividing by zero.
        let mut scale = features.std_axis(Axis(0), 0.0);
        for s in scale.iter_mut() {
            if *s == 0.0 {
                *s = 1.0;
            }
        }
        Ok(Self {
            mean: mean.to_vec(),
            scale: scale.to_vec(),
        })
    }

    fn transform(&self, features: &[f64]) -> Vec<f64> {
        features
            .iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(x, (mean, scale))| (x - mean) / scale)
            .collect()
    }
}

// A linear regressor trained by stochastic gradient descent on the squared
// error, with an inverse-scaling learning rate (eta0 / t^power_t) and L2
// regularization on the weights. The sample counter t carries over from
// batch fitting into online updates so the step size keeps decaying across
// the model's whole lifetime.
#[derive(Serialize, Deserialize, Debug, Clone)]
struct SgdRegressor {
    weights: Vec<f64>,
    bias: f64,
    eta0: f64,
    power_t: f64,
    alpha: f64,
    samples_seen: u64,
    epochs_run: u64,
}

impl SgdRegressor {
    fn new(feature_count: usize) -> Self {
        Self {
            weights: vec![0.0; feature_count],
            bias: 0.0,
            eta0: DEFAULT_ETA0,
            power_t: DEFAULT_POWER_T,
            alpha: DEFAULT_ALPHA,
            samples_seen: 0,
            epochs_run: 0,
        }
    }

    fn predict(&self, scaled: &[f64]) -> f64 {
        let dot: f64 = self
            .weights
            .iter()
            .zip(scaled.iter())
            .map(|(w, z)| w * z)
            .sum();
        dot + self.bias
    }

    // One gradient step on a single observation. Returns the half squared
    // error before the step, which the batch fit accumulates per epoch.
    fn step(&mut self, scaled: &[f64], target: f64) -> f64 {
        let eta = self.eta0 / ((self.samples_seen + 1) as f64).powf(self.power_t);
        let error = self.predict(scaled) - target;

        let decay = 1.0 - eta * self.alpha;
        for (weight, z) in self.weights.iter_mut().zip(scaled.iter()) {
            *weight = *weight * decay - eta * error * z;
        }
        // The bias term is not regularized.
        self.bias -= eta * error;

        self.samples_seen += 1;
        0.5 * error * error
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct TrainedState {
    scaler: StandardScaler,
    regressor: SgdRegressor,
    trained_at: DateTime<Utc>,
}

/// Online task cost model: a frozen normalization stage in front of an
/// incrementally trainable linear regressor. Created untrained; gains state
/// through [`fit_batch`](CostModel::fit_batch) or [`load`](CostModel::load).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CostModel {
    pub version: u32,
    model_id: String,
    vocabulary_fingerprint: String,
    state: Option<TrainedState>,
}

impl CostModel {
    pub fn new() -> Self {
        Self {
            version: MODEL_FORMAT_VERSION,
            model_id: Uuid::new_v4().to_string(),
            vocabulary_fingerprint: vocabulary_fingerprint(),
            state: None,
        }
    }

    /// Fits normalization statistics and regressor weights from scratch on a
    /// batch of historical observations. Epochs run over a seeded shuffle of
    /// the batch until the average epoch loss stops improving by at least the
    /// tolerance for several consecutive epochs, or the iteration cap hits.
    pub fn fit_batch(&mut self, features: &[Vec<f64>], costs: &[f64]) -> Result<()> {
        if features.is_empty() {
            return Err(CostingError::InvalidTrainingData(
                "training batch is empty".to_string(),
            ));
        }
        if features.len() != costs.len() {
            return Err(CostingError::InvalidTrainingData(format!(
                "{} feature vectors but {} costs",
                features.len(),
                costs.len()
            )));
        }
        for (i, row) in features.iter().enumerate() {
            if row.len() != FEATURE_VECTOR_SIZE {
                return Err(CostingError::InvalidTrainingData(format!(
                    "feature vector {} has length {}, expected {}",
                    i,
                    row.len(),
                    FEATURE_VECTOR_SIZE
                )));
            }
        }
        for (i, cost) in costs.iter().enumerate() {
            if !cost.is_finite() {
                return Err(CostingError::InvalidTrainingData(format!(
                    "cost {} is not a finite number",
                    i
                )));
            }
        }

        let flat: Vec<f64> = features.iter().flatten().copied().collect();
        let matrix = Array2::from_shape_vec((features.len(), FEATURE_VECTOR_SIZE), flat)
            .map_err(|e| CostingError::InvalidTrainingData(e.to_string()))?;
        let scaler = StandardScaler::fit(&matrix)?;
        let scaled: Vec<Vec<f64>> = features.iter().map(|row| scaler.transform(row)).collect();

        let mut regressor = SgdRegressor::new(FEATURE_VECTOR_SIZE);
        let mut rng = StdRng::seed_from_u64(SHUFFLE_SEED);
        let mut order: Vec<usize> = (0..features.len()).collect();

        let mut best_loss = f64::INFINITY;
        let mut stalled_epochs = 0;

        for _ in 0..DEFAULT_MAX_ITER {
            order.shuffle(&mut rng);

            let mut epoch_loss = 0.0;
            for &i in &order {
                epoch_loss += regressor.step(&scaled[i], costs[i]);
            }
            let epoch_loss = epoch_loss / features.len() as f64;
            regressor.epochs_run += 1;

            if epoch_loss > best_loss - DEFAULT_TOL {
                stalled_epochs += 1;
            } else {
                stalled_epochs = 0;
            }
            if epoch_loss < best_loss {
                best_loss = epoch_loss;
            }
            if stalled_epochs >= N_ITER_NO_CHANGE {
                break;
            }
        }

        info!(
            "Fitted cost model on {} samples over {} epochs (best avg loss {:.4})",
            features.len(),
            regressor.epochs_run,
            best_loss
        );

        self.state = Some(TrainedState {
            scaler,
            regressor,
            trained_at: Utc::now(),
        });
        Ok(())
    }

    /// Predicts a cost for one feature vector. Deterministic for a given
    /// model state; negative predictions are passed through untouched.
    pub fn predict(&self, features: &[f64]) -> Result<f64> {
        let state = self.state.as_ref().ok_or(CostingError::ModelNotTrained)?;
        if features.len() != FEATURE_VECTOR_SIZE {
            return Err(CostingError::FeatureLengthMismatch {
                expected: FEATURE_VECTOR_SIZE,
                actual: features.len(),
            });
        }
        Ok(state.regressor.predict(&state.scaler.transform(features)))
    }

    /// One online gradient step against an observed outcome, using the frozen
    /// normalization statistics from the batch fit. Returns the post-update
    /// prediction for the same vector.
    pub fn update(&mut self, features: &[f64], actual_cost: f64) -> Result<f64> {
        let state = self.state.as_mut().ok_or(CostingError::ModelNotTrained)?;
        if features.len() != FEATURE_VECTOR_SIZE {
            return Err(CostingError::FeatureLengthMismatch {
                expected: FEATURE_VECTOR_SIZE,
                actual: features.len(),
            });
        }
        if !actual_cost.is_finite() || actual_cost < 0.0 {
            return Err(CostingError::InvalidTrainingData(format!(
                "actual cost must be a non-negative finite number, got {}",
                actual_cost
            )));
        }

        let scaled = state.scaler.transform(features);
        state.regressor.step(&scaled, actual_cost);
        debug!(
            "Updated cost model {} with observation {:.2} (samples seen: {})",
            self.model_id, actual_cost, state.regressor.samples_seen
        );
        Ok(state.regressor.predict(&scaled))
    }

    /// Serializes the full model to pretty JSON, staged through a temp file
    /// in the destination directory and renamed into place. A concurrent
    /// loader sees either the previous artifact or the new one, never a
    /// partial write.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(json.as_bytes())?;
        staged.persist(path).map_err(|e| CostingError::Io(e.error))?;

        debug!("Saved cost model {} to {}", self.model_id, path.display());
        Ok(())
    }

    /// Reads a model artifact back. A missing file surfaces as an I/O error;
    /// an unparseable or contract-violating artifact as corrupt state.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let model: CostModel = serde_json::from_str(&raw).map_err(|e| {
            CostingError::CorruptModelState(format!("failed to parse model artifact: {}", e))
        })?;
        model.validate()?;

        info!(
            "Loaded cost model {} (format v{}) from {}",
            model.model_id,
            model.version,
            path.display()
        );
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        if self.version != MODEL_FORMAT_VERSION {
            return Err(CostingError::CorruptModelState(format!(
                "unsupported model format version {} (expected {})",
                self.version, MODEL_FORMAT_VERSION
            )));
        }
        if self.vocabulary_fingerprint != vocabulary_fingerprint() {
            return Err(CostingError::CorruptModelState(
                "tag vocabulary fingerprint does not match this build".to_string(),
            ));
        }
        if let Some(state) = &self.state {
            if state.scaler.mean.len() != FEATURE_VECTOR_SIZE
                || state.scaler.scale.len() != FEATURE_VECTOR_SIZE
                || state.regressor.weights.len() != FEATURE_VECTOR_SIZE
            {
                return Err(CostingError::CorruptModelState(
                    "persisted parameter vectors do not match the feature contract".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn is_trained(&self) -> bool {
        self.state.is_some()
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Number of gradient steps taken so far, counting every epoch pass over
    /// the batch plus every online update.
    pub fn samples_seen(&self) -> u64 {
        self.state
            .as_ref()
            .map_or(0, |state| state.regressor.samples_seen)
    }

    pub fn epochs_run(&self) -> u64 {
        self.state
            .as_ref()
            .map_or(0, |state| state.regressor.epochs_run)
    }

    pub fn trained_at(&self) -> Option<DateTime<Utc>> {
        self.state.as_ref().map(|state| state.trained_at)
    }

    pub fn weights(&self) -> Option<Vec<f64>> {
        self.state
            .as_ref()
            .map(|state| state.regressor.weights.clone())
    }

    pub fn bias(&self) -> Option<f64> {
        self.state.as_ref().map(|state| state.regressor.bias)
    }

    /// Per-feature (mean, scale) normalization statistics, in contract order.
    pub fn normalization(&self) -> Option<(Vec<f64>, Vec<f64>)> {
        self.state
            .as_ref()
            .map(|state| (state.scaler.mean.clone(), state.scaler.scale.clone()))
    }

    pub fn get_stats_display(&self) -> String {
        let mut output = format!("Cost Model (format v{}) Statistics:\n", self.version);
        output.push_str(&format!("  Model ID:    {}\n", self.model_id));
        output.push_str(&format!(
            "  Vocabulary:  {}\n",
            &self.vocabulary_fingerprint[..12.min(self.vocabulary_fingerprint.len())]
        ));
        match &self.state {
            Some(state) => {
                output.push_str(&format!(
                    "  Trained at:  {}\n",
                    state.trained_at.to_rfc3339()
                ));
                output.push_str(&format!(
                    "  Samples seen: {} (over {} epochs)\n",
                    state.regressor.samples_seen, state.regressor.epochs_run
                ));
                output.push_str(&format!("  Bias:        {:.4}\n", state.regressor.bias));
            }
            None => output.push_str("  Untrained (no fitted state)\n"),
        }
        output
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle used by the serving layer: any number of concurrent readers
/// for prediction, a single writer at a time for online updates.
pub type SharedCostModel = Arc<RwLock<CostModel>>;

pub fn create_shared_model(model: CostModel) -> SharedCostModel {
    Arc::new(RwLock::new(model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::feature_extraction::extract_task_features;
    use crate::models::task::{TagsField, TaskInput};

    fn tagged_task(title: &str, tag: &str) -> Vec<f64> {
        extract_task_features(&TaskInput {
            title: Some(title.to_string()),
            description: Some(format!("{} work item", title)),
            tags: TagsField::List(vec![tag.to_string()]),
        })
    }

    fn training_batch() -> (Vec<Vec<f64>>, Vec<f64>) {
        let mut features = Vec::new();
        let mut costs = Vec::new();
        for i in 0..10 {
            features.push(tagged_task(&format!("Frontend task {}", i), "frontend"));
            costs.push(500.0 + (i % 3) as f64 * 10.0);
            features.push(tagged_task(&format!("Backend task {}", i), "backend"));
            costs.push(1500.0 + (i % 3) as f64 * 10.0);
        }
        (features, costs)
    }

    fn trained_model() -> CostModel {
        let (features, costs) = training_batch();
        let mut model = CostModel::new();
        model.fit_batch(&features, &costs).unwrap();
        model
    }

    #[test]
    fn test_fit_batch_learns_tag_cost_split() {
        let model = trained_model();

        let frontend = model
            .predict(&tagged_task("Frontend task x", "frontend"))
            .unwrap();
        let backend = model
            .predict(&tagged_task("Backend task x", "backend"))
            .unwrap();

        assert!((frontend - 500.0).abs() < (frontend - 1500.0).abs());
        assert!((backend - 1500.0).abs() < (backend - 500.0).abs());
    }

    #[test]
    fn test_fit_batch_is_reproducible() {
        let (features, costs) = training_batch();
        let mut first = CostModel::new();
        let mut second = CostModel::new();
        first.fit_batch(&features, &costs).unwrap();
        second.fit_batch(&features, &costs).unwrap();

        let vector = tagged_task("Frontend task x", "frontend");
        assert_eq!(
            first.predict(&vector).unwrap(),
            second.predict(&vector).unwrap()
        );
    }

    #[test]
    fn test_fit_batch_rejects_empty_input() {
        let mut model = CostModel::new();
        assert!(matches!(
            model.fit_batch(&[], &[]),
            Err(CostingError::InvalidTrainingData(_))
        ));
    }

    #[test]
    fn test_fit_batch_rejects_length_mismatch() {
        let mut model = CostModel::new();
        let features = vec![vec![0.0; FEATURE_VECTOR_SIZE]];
        assert!(matches!(
            model.fit_batch(&features, &[1.0, 2.0]),
            Err(CostingError::InvalidTrainingData(_))
        ));
    }

    #[test]
    fn test_fit_batch_rejects_inconsistent_vectors() {
        let mut model = CostModel::new();
        let features = vec![vec![0.0; FEATURE_VECTOR_SIZE], vec![0.0; 3]];
        assert!(matches!(
            model.fit_batch(&features, &[1.0, 2.0]),
            Err(CostingError::InvalidTrainingData(_))
        ));
    }

    #[test]
    fn test_predict_before_fit_is_rejected() {
        let model = CostModel::new();
        let result = model.predict(&vec![0.0; FEATURE_VECTOR_SIZE]);
        assert!(matches!(result, Err(CostingError::ModelNotTrained)));
    }

    #[test]
    fn test_update_before_fit_is_rejected() {
        let mut model = CostModel::new();
        let result = model.update(&vec![0.0; FEATURE_VECTOR_SIZE], 100.0);
        assert!(matches!(result, Err(CostingError::ModelNotTrained)));
    }

    #[test]
    fn test_predict_rejects_wrong_vector_length() {
        let model = trained_model();
        assert!(matches!(
            model.predict(&[1.0, 2.0]),
            Err(CostingError::FeatureLengthMismatch {
                expected: FEATURE_VECTOR_SIZE,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_update_moves_prediction_toward_observation() {
        let mut model = trained_model();
        let vector = tagged_task("Frontend task a", "frontend");

        let before = model.predict(&vector).unwrap();
        let target = before + 400.0;

        let after = model.update(&vector, target).unwrap();
        assert!((after - target).abs() < (before - target).abs());
        assert!(after > before);
        assert_eq!(model.predict(&vector).unwrap(), after);
    }

    #[test]
    fn test_update_rejects_negative_cost() {
        let mut model = trained_model();
        let vector = tagged_task("Frontend task a", "frontend");
        assert!(matches!(
            model.update(&vector, -5.0),
            Err(CostingError::InvalidTrainingData(_))
        ));
    }

    #[test]
    fn test_save_load_round_trip_preserves_predictions() {
        let model = trained_model();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cost_model.json");

        model.save(&path).unwrap();
        let loaded = CostModel::load(&path).unwrap();

        let vector = tagged_task("Frontend task x", "frontend");
        assert_eq!(
            model.predict(&vector).unwrap(),
            loaded.predict(&vector).unwrap()
        );
        assert_eq!(model.model_id(), loaded.model_id());
        assert_eq!(model.samples_seen(), loaded.samples_seen());
        assert_eq!(model.weights(), loaded.weights());
        assert_eq!(model.bias(), loaded.bias());
        assert_eq!(model.normalization(), loaded.normalization());
    }

    #[test]
    fn test_untrained_model_round_trips() {
        let model = CostModel::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cost_model.json");

        model.save(&path).unwrap();
        let loaded = CostModel::load(&path).unwrap();
        assert!(!loaded.is_trained());
        assert_eq!(loaded.samples_seen(), 0);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = CostModel::load(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(CostingError::Io(_))));
    }

    #[test]
    fn test_load_rejects_unparseable_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cost_model.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            CostModel::load(&path),
            Err(CostingError::CorruptModelState(_))
        ));
    }

    #[test]
    fn test_load_rejects_fingerprint_mismatch() {
        let model = trained_model();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cost_model.json");
        model.save(&path).unwrap();

        let mut raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        raw["vocabulary_fingerprint"] = serde_json::Value::String("0000".to_string());
        std::fs::write(&path, serde_json::to_string(&raw).unwrap()).unwrap();

        assert!(matches!(
            CostModel::load(&path),
            Err(CostingError::CorruptModelState(_))
        ));
    }

    #[test]
    fn test_load_rejects_unsupported_format_version() {
        let model = trained_model();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cost_model.json");
        model.save(&path).unwrap();

        let mut raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        raw["version"] = serde_json::json!(MODEL_FORMAT_VERSION + 1);
        std::fs::write(&path, serde_json::to_string(&raw).unwrap()).unwrap();

        assert!(matches!(
            CostModel::load(&path),
            Err(CostingError::CorruptModelState(_))
        ));
    }
}
