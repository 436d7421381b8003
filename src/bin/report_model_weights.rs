// src/bin/report_model_weights.rs
use anyhow::{Context, Result};
use clap::Parser;
use costing_lib::ml::{get_feature_metadata, CostModel};
use costing_lib::utils::env::load_env;
use std::path::PathBuf;

/// Prints a human-readable report of a trained cost model artifact: learned
/// feature weights sorted by influence, alongside the frozen normalization
/// statistics each weight applies to.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the model artifact to inspect
    #[arg(long, default_value = "cost_model.json")]
    model: PathBuf,
}

fn main() -> Result<()> {
    load_env();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    println!("--- Cost Model Weight Report ---");

    let model = CostModel::load(&args.model)
        .with_context(|| format!("failed to load model artifact {}", args.model.display()))?;

    println!("\n{}", model.get_stats_display());

    if !model.is_trained() {
        println!("Model is untrained. No weights to report.");
        return Ok(());
    }
    let weights = model.weights().unwrap_or_default();
    let bias = model.bias().unwrap_or_default();
    let (means, scales) = model.normalization().unwrap_or_default();

    let metadata = get_feature_metadata();
    let mut rows: Vec<(String, f64, f64, f64)> = metadata
        .iter()
        .zip(means.iter().zip(scales.iter().zip(weights.iter())))
        .map(|(meta, (mean, (scale, weight)))| (meta.name.clone(), *mean, *scale, *weight))
        .collect();

    // Sort by the absolute value of the weight to put the most influential
    // features first.
    rows.sort_by(|a, b| b.3.abs().partial_cmp(&a.3.abs()).unwrap());

    println!("Most Influential Features (Sorted by Absolute Weight):");
    println!("  |------------------------|------------|------------|------------|");
    println!(
        "  | {:<22} | {:>10} | {:>10} | {:>10} |",
        "Feature", "Mean", "Scale", "Weight"
    );
    println!("  |------------------------|------------|------------|------------|");
    for (name, mean, scale, weight) in &rows {
        println!(
            "  | {:<22} | {:>10.3} | {:>10.3} | {:>10.4} |",
            name, mean, scale, weight
        );
    }
    println!("  |------------------------|------------|------------|------------|");
    println!(
        "  | {:<22} | {:>10} | {:>10} | {:>10.4} |",
        "(Bias Term)", "", "", bias
    );
    println!("  |------------------------|------------|------------|------------|");

    println!("\n--- End of Report ---");
    Ok(())
}
