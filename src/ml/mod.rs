// src/ml/mod.rs

pub mod cost_model;
pub mod dataset;
pub mod feature_extraction;

pub use cost_model::{create_shared_model, CostModel, SharedCostModel, MODEL_FORMAT_VERSION};
pub use dataset::{load_training_records, prepare_record};
pub use feature_extraction::{
    extract_task_features, get_feature_metadata, vocabulary_fingerprint, FeatureMetadata,
    FEATURE_VECTOR_SIZE, TAG_VOCABULARY,
};
