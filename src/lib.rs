// src/lib.rs
//! Task cost estimation: a deterministic feature extractor over task
//! title/description/tags, an online-trainable linear cost model, and the
//! HTTP serving layer that keeps the two consistent between offline
//! training and live prediction.

pub mod api;
pub mod error;
pub mod ml;
pub mod models;
pub mod utils;

pub use error::{CostingError, Result};
