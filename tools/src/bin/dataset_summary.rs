use anyhow::{bail, Context, Result};
use clap::Parser;
use cli_support::common::DatasetArgs;
use crop_pipeline::{index_pairs, summarize_with_thresholds, ValidationOutcome, ValidationThresholds};
use xbd_tools::ToolConfig;

#[derive(Parser, Debug)]
#[command(
    name = "dataset_summary",
    about = "Summarise label documents in a dataset split and validate them against thresholds"
)]
struct Args {
    #[command(flatten)]
    dataset: DatasetArgs,
    /// Emit the report as JSON instead of text.
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<()> {
    xbd_tools::init_logging();
    let args = Args::parse();
    let cfg = ToolConfig::load();

    let dataset_root = args
        .dataset
        .dataset_root
        .clone()
        .unwrap_or_else(|| cfg.dataset_root.clone());
    let mut opts = cfg.crop_options();
    if let Some(system) = &args.dataset.coordinate_system {
        opts.coordinate_system = system.clone();
    }

    let index = index_pairs(&dataset_root, &cfg.pair_layout())
        .with_context(|| format!("index pairs under {}", dataset_root.display()))?;
    let report = summarize_with_thresholds(&index, &opts, &ValidationThresholds::from_env());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let totals = &report.summary.totals;
        println!("Dataset: {}", dataset_root.display());
        println!(
            "pairs={} missing={} features={} (pre={}, post={})",
            report.summary.pairs.len(),
            report.summary.missing_pairs,
            totals.features(),
            totals.pre_features,
            totals.post_features
        );
        println!(
            "invalid documents={} empty documents={} feature failures={}",
            totals.invalid_documents, totals.empty_documents, totals.feature_failures
        );
        println!("outcome: {}", report.outcome.as_str());
        for reason in &report.reasons {
            println!("  - {reason}");
        }
    }

    if report.outcome == ValidationOutcome::Fail {
        bail!("dataset validation failed");
    }
    Ok(())
}
