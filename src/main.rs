// src/main.rs
use anyhow::{Context, Result};
use env_logger::Env;
use log::{info, warn};
use std::path::{Path, PathBuf};

use costing_lib::api;
use costing_lib::ml::{create_shared_model, CostModel};
use costing_lib::utils::config::ServiceConfig;
use costing_lib::utils::env::load_env;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    info!("🚀 Starting task costing service");
    load_env();

    let config = ServiceConfig::from_env();
    config.log_config();

    // A corrupt artifact is a hard startup failure; a missing one just means
    // the service comes up untrained and answers 503 until a model exists.
    let model_path = Path::new(&config.model_path);
    let model = if model_path.exists() {
        CostModel::load(model_path)
            .with_context(|| format!("failed to load model artifact {}", config.model_path))?
    } else {
        warn!(
            "No model artifact at {}; serving untrained until one is written",
            config.model_path
        );
        CostModel::new()
    };

    let shared = create_shared_model(model);
    api::serve(
        shared,
        &config.bind_addr(),
        PathBuf::from(config.model_path.clone()),
    )
    .await
}
