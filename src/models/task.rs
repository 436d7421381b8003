// src/models/task.rs
use serde::{Deserialize, Serialize};

/// Tags as supplied by callers: either a list of strings or a single
/// comma-separated string. Both forms normalize to the same lowercase list.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum TagsField {
    List(Vec<String>),
    CommaSeparated(String),
}

impl Default for TagsField {
    fn default() -> Self {
        TagsField::List(Vec::new())
    }
}

impl TagsField {
    /// Normalize to a lowercase tag list. A comma-separated string is split
    /// on "," with each element trimmed; list elements are lowercased as-is.
    /// No de-duplication: indicator features are membership-based, so
    /// duplicates cannot change them, but the raw count is preserved.
    pub fn normalized(&self) -> Vec<String> {
        match self {
            TagsField::List(tags) => tags.iter().map(|t| t.to_lowercase()).collect(),
            TagsField::CommaSeparated(raw) => raw
                .split(',')
                .map(|t| t.trim().to_lowercase())
                .collect(),
        }
    }
}

/// A task as described by callers: short title, free-text description, and
/// categorical tags. All fields are optional; absent text is treated as empty.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct TaskInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: TagsField,
}

/// One record of the historical training dataset. Costs arrive under two
/// legacy field names; `cost_usd` wins when both are present.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TrainingRecord {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: TagsField,
    #[serde(default)]
    pub cost_usd: Option<f64>,
    #[serde(default)]
    pub cost: Option<f64>,
}

impl TrainingRecord {
    pub fn task_input(&self) -> TaskInput {
        TaskInput {
            title: self.title.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
        }
    }

    /// The observed cost for this record, or None when neither field is set.
    pub fn observed_cost(&self) -> Option<f64> {
        self.cost_usd.or(self.cost)
    }
}
