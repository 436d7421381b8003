// src/ml/dataset.rs
use log::debug;
use std::fs;
use std::path::Path;

use crate::error::{CostingError, Result};
use crate::ml::feature_extraction::extract_task_features;
use crate::models::task::TrainingRecord;

/// Reads a training dataset from a JSON file: an array of task records, each
/// carrying an observed cost under `cost_usd` (preferred) or the legacy
/// `cost` field.
pub fn load_training_records(path: &Path) -> Result<Vec<TrainingRecord>> {
    let raw = fs::read_to_string(path)?;
    let records: Vec<TrainingRecord> = serde_json::from_str(&raw).map_err(|e| {
        CostingError::InvalidTrainingData(format!("failed to parse dataset: {}", e))
    })?;

    debug!(
        "Read {} training records from {}",
        records.len(),
        path.display()
    );
    Ok(records)
}

/// Converts one dataset record into its feature vector and observed cost.
/// A record with a missing, negative, or non-finite cost is rejected by
/// index rather than silently coerced to a default.
pub fn prepare_record(record: &TrainingRecord, index: usize) -> Result<(Vec<f64>, f64)> {
    let cost = record.observed_cost().ok_or_else(|| {
        CostingError::InvalidTrainingData(format!("record {} has no cost field", index))
    })?;
    if !cost.is_finite() || cost < 0.0 {
        return Err(CostingError::InvalidTrainingData(format!(
            "record {} has an invalid cost: {}",
            index, cost
        )));
    }

    Ok((extract_task_features(&record.task_input()), cost))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::feature_extraction::FEATURE_VECTOR_SIZE;

    const DATASET: &str = r#"[
        {"title": "Build landing page", "description": "Marketing site refresh", "tags": ["frontend"], "cost_usd": 450.0},
        {"title": "API hardening", "description": "Rate limit the public endpoints", "tags": "backend,security", "cost": 1200.0}
    ]"#;

    #[test]
    fn test_prepare_record_extracts_vector_and_cost() {
        let records: Vec<TrainingRecord> = serde_json::from_str(DATASET).unwrap();

        let (features, cost) = prepare_record(&records[0], 0).unwrap();
        assert_eq!(features.len(), FEATURE_VECTOR_SIZE);
        assert_eq!(cost, 450.0);

        let (_, legacy_cost) = prepare_record(&records[1], 1).unwrap();
        assert_eq!(legacy_cost, 1200.0);
    }

    #[test]
    fn test_preferred_cost_field_wins_over_legacy() {
        let raw = r#"{"title": "t", "description": "d", "tags": [], "cost_usd": 100.0, "cost": 900.0}"#;
        let record: TrainingRecord = serde_json::from_str(raw).unwrap();
        let (_, cost) = prepare_record(&record, 0).unwrap();
        assert_eq!(cost, 100.0);
    }

    #[test]
    fn test_record_without_cost_is_rejected_by_index() {
        let raw = r#"{"title": "broken", "description": "d", "tags": []}"#;
        let record: TrainingRecord = serde_json::from_str(raw).unwrap();
        let err = prepare_record(&record, 7).unwrap_err();
        assert!(err.to_string().contains("record 7"));
    }

    #[test]
    fn test_negative_cost_is_rejected() {
        let raw = r#"{"title": "t", "description": "d", "tags": [], "cost_usd": -3.0}"#;
        let record: TrainingRecord = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            prepare_record(&record, 0),
            Err(CostingError::InvalidTrainingData(_))
        ));
    }

    #[test]
    fn test_load_records_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trainingdata.json");
        std::fs::write(&path, DATASET).unwrap();

        let records = load_training_records(&path).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_malformed_dataset_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trainingdata.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            load_training_records(&path),
            Err(CostingError::InvalidTrainingData(_))
        ));
    }
}
