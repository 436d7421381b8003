// src/models/mod.rs

pub mod task;

pub use task::{TagsField, TaskInput, TrainingRecord};
