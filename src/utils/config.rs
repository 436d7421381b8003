// src/utils/config.rs
use log::info;
use std::env;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub model_path: String,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        let host = env::var("COSTING_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("COSTING_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .unwrap_or(8000);
        let model_path =
            env::var("COST_MODEL_PATH").unwrap_or_else(|_| "cost_model.json".to_string());

        Self {
            host,
            port,
            model_path,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn log_config(&self) {
        info!("📈 Task costing service configuration:");
        info!("   Listen address: {}", self.bind_addr());
        info!("   Model artifact: {}", self.model_path);
    }
}
