// src/bin/train_cost_model.rs
use anyhow::{Context, Result};
use clap::Parser;
use costing_lib::ml::{
    extract_task_features, load_training_records, prepare_record, CostModel, FEATURE_VECTOR_SIZE,
};
use costing_lib::models::task::{TagsField, TaskInput};
use costing_lib::utils::env::load_env;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Trains the task cost model from a JSON dataset of historical tasks and
/// writes the fitted artifact for the serving process to load.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the training dataset (a JSON array of task records)
    #[arg(long, default_value = "trainingdata.json")]
    data: PathBuf,

    /// Where to write the trained model artifact
    #[arg(long, default_value = "cost_model.json")]
    output: PathBuf,

    /// Fit and report without writing the artifact
    #[arg(long)]
    dry_run: bool,
}

fn print_training_summary(model: &CostModel, record_count: usize, output: &Path, dry_run: bool) {
    println!("\n=== COST MODEL TRAINING SUMMARY ===");
    println!("Model ID: {}", model.model_id());
    println!("Records: {}", record_count);
    println!("Feature vector size: {}", FEATURE_VECTOR_SIZE);
    println!(
        "Gradient steps: {} (over {} epochs)",
        model.samples_seen(),
        model.epochs_run()
    );
    if dry_run {
        println!("Artifact: not written (dry run)");
    } else {
        println!("Artifact: {}", output.display());
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    load_env();

    let args = Args::parse();
    if args.dry_run {
        warn!("DRY RUN MODE: the trained model will not be written to disk.");
    }

    let records = load_training_records(&args.data)
        .with_context(|| format!("failed to read dataset {}", args.data.display()))?;
    info!(
        "Loaded {} training records from {}",
        records.len(),
        args.data.display()
    );

    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )
            .unwrap(),
    );

    let mut features = Vec::with_capacity(records.len());
    let mut costs = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        let (vector, cost) = prepare_record(record, i)?;
        features.push(vector);
        costs.push(cost);
        pb.inc(1);
    }
    pb.finish_with_message("Feature extraction complete.");

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap(),
    );
    spinner.set_message("Fitting cost model...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let mut model = CostModel::new();
    model.fit_batch(&features, &costs)?;
    spinner.finish_with_message("Training complete.");

    if !args.dry_run {
        model
            .save(&args.output)
            .with_context(|| format!("failed to write model artifact {}", args.output.display()))?;
        info!("Saved trained model to {}", args.output.display());
    }

    print_training_summary(&model, records.len(), &args.output, args.dry_run);

    // Quick operator sanity check against a representative task.
    let sample = TaskInput {
        title: Some("Build admin dashboard".to_string()),
        description: Some("CRUD dashboard with charts".to_string()),
        tags: TagsField::List(vec!["frontend".to_string(), "backend".to_string()]),
    };
    let sample_cost = model.predict(&extract_task_features(&sample))?;
    println!(
        "\nSample prediction for \"Build admin dashboard\": ${:.2}",
        sample_cost
    );

    println!("\n=== MODEL STATISTICS ===");
    println!("{}", model.get_stats_display());

    Ok(())
}
