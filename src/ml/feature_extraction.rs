// src/ml/feature_extraction.rs
use sha2::{Digest, Sha256};

use crate::models::task::TaskInput;

/// The closed, ordered tag vocabulary shared by the extractor and the
/// persisted model schema. The order is part of the feature contract:
/// changing it invalidates every previously trained model, so any edit
/// must go through an artifact format bump and a retrain.
pub const TAG_VOCABULARY: [&str; 11] = [
    "frontend",
    "backend",
    "ai",
    "blockchain",
    "security",
    "ui/ux",
    "devops",
    "marketing",
    "qa",
    "analytics",
    "mobile",
];

/// Three base features (title length, description length, tag count) plus one
/// indicator per vocabulary tag.
pub const FEATURE_VECTOR_SIZE: usize = 3 + TAG_VOCABULARY.len();

/// SHA-256 over the joined vocabulary. Persisted inside model artifacts so a
/// vocabulary drift shows up as an explicit load failure instead of silently
/// misaligned indicator columns.
pub fn vocabulary_fingerprint() -> String {
    let mut hasher = Sha256::new();
    hasher.update(TAG_VOCABULARY.join(",").as_bytes());
    hex::encode(hasher.finalize())
}

/// Turn a task description into the fixed-order numeric feature vector.
///
/// Deterministic and total: absent title/description count as empty text and
/// tags normalize per [`TagsField`](crate::models::task::TagsField). A
/// vocabulary indicator is set when the tag appears in the normalized tag
/// list OR as a literal substring of the lowercased `title + " " + description`
/// text. The substring lookup is deliberately loose ("ai" matches inside
/// unrelated words); models are trained against exactly this behavior.
pub fn extract_task_features(task: &TaskInput) -> Vec<f64> {
    let title = task.title.as_deref().unwrap_or("");
    let description = task.description.as_deref().unwrap_or("");
    let tags = task.tags.normalized();

    let full_text = format!("{} {}", title, description).to_lowercase();

    let mut features = Vec::with_capacity(FEATURE_VECTOR_SIZE);
    features.push(title.chars().count() as f64);
    features.push(description.chars().count() as f64);
    features.push(tags.len() as f64);

    for tag_keyword in TAG_VOCABULARY {
        let has_tag =
            tags.iter().any(|t| t.as_str() == tag_keyword) || full_text.contains(tag_keyword);
        features.push(if has_tag { 1.0 } else { 0.0 });
    }

    features
}

/// Descriptive metadata for one feature vector slot.
#[derive(Debug, Clone)]
pub struct FeatureMetadata {
    pub name: String,
    pub description: String,
    pub min_value: f64,
    pub max_value: f64,
}

/// Metadata table parallel to the feature vector layout, used by reporting
/// tools to label normalization statistics and learned weights.
pub fn get_feature_metadata() -> Vec<FeatureMetadata> {
    let mut metadata = vec![
        FeatureMetadata {
            name: "title_length".to_string(),
            description: "Character count of the task title.".to_string(),
            min_value: 0.0,
            max_value: 10_000.0,
        },
        FeatureMetadata {
            name: "description_length".to_string(),
            description: "Character count of the task description.".to_string(),
            min_value: 0.0,
            max_value: 100_000.0,
        },
        FeatureMetadata {
            name: "tag_count".to_string(),
            description: "Number of tags supplied with the task.".to_string(),
            min_value: 0.0,
            max_value: 100.0,
        },
    ];

    for tag in TAG_VOCABULARY {
        metadata.push(FeatureMetadata {
            name: format!("tag_{}", tag.replace('/', "_")),
            description: format!("Boolean indicating the '{}' category.", tag),
            min_value: 0.0,
            max_value: 1.0,
        });
    }

    metadata
}
