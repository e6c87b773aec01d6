use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crop_pipeline::index_pairs;
use damage_eval::{evaluate_pairs, write_records, CommandClassifier};
use xbd_tools::ToolConfig;

#[derive(Parser, Debug)]
#[command(
    name = "evaluate_pairs",
    about = "Ask a damage classifier about every image pair and write the result table"
)]
struct Args {
    /// Dataset split root containing the images/ and labels/ directories.
    #[arg(long)]
    dataset_root: Option<PathBuf>,
    /// Classifier program; called as `<program> [args..] <pre-image> <post-image>`
    /// with the assessment prompt on stdin.
    #[arg(long)]
    classifier: PathBuf,
    /// Extra argument passed to the classifier before the image paths (repeatable).
    #[arg(long = "classifier-arg", allow_hyphen_values = true)]
    classifier_args: Vec<String>,
    /// Coordinate system whose feature subtypes give the ground truth.
    #[arg(long)]
    ground_truth_system: Option<String>,
    /// Stop after this many pairs.
    #[arg(long)]
    max_pairs: Option<usize>,
    /// Result table to write (JSON Lines).
    #[arg(long)]
    results: Option<PathBuf>,
}

fn main() -> Result<()> {
    xbd_tools::init_logging();
    let args = Args::parse();
    let cfg = ToolConfig::load();

    let dataset_root = args.dataset_root.unwrap_or_else(|| cfg.dataset_root.clone());
    let ground_truth_system = args
        .ground_truth_system
        .unwrap_or_else(|| cfg.ground_truth_coordinate_system.clone());
    let max_pairs = args.max_pairs.or(cfg.max_pairs);
    let results_path = args.results.unwrap_or_else(|| cfg.results_path.clone());

    let index = index_pairs(&dataset_root, &cfg.pair_layout())
        .with_context(|| format!("index pairs under {}", dataset_root.display()))?;
    if index.pairs.is_empty() {
        bail!("no image pairs found under {}", dataset_root.display());
    }

    let classifier = CommandClassifier::new(args.classifier, args.classifier_args);
    let run = evaluate_pairs(&index.pairs, &classifier, &ground_truth_system, max_pairs);

    write_records(&results_path, &run.records)
        .with_context(|| format!("write results {}", results_path.display()))?;
    println!(
        "Evaluation complete: records={}, skipped={}, errors={}, results={}",
        run.records.len(),
        run.skipped.len(),
        run.errors.len(),
        results_path.display()
    );
    for (pair_id, error) in &run.errors {
        println!("  {pair_id}: {error}");
    }
    Ok(())
}
