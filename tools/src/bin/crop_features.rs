use anyhow::{bail, Context, Result};
use clap::Parser;
use cli_support::common::{CropOutputArgs, DatasetArgs};
use crop_pipeline::{crop_dataset, index_pairs, BatchOptions, CropOptions, ImagePairPaths};
use xbd_tools::ToolConfig;

#[derive(Parser, Debug)]
#[command(
    name = "crop_features",
    about = "Crop every labeled building out of pre/post-disaster image pairs"
)]
struct Args {
    #[command(flatten)]
    dataset: DatasetArgs,
    #[command(flatten)]
    output: CropOutputArgs,
    /// Crop a single pair, e.g. socal-fire_00000031.
    #[arg(long)]
    pair: Option<String>,
    /// Process pairs on a worker pool.
    #[arg(long, default_value_t = false)]
    parallel: bool,
    /// Write each pair's crops into its own subdirectory.
    #[arg(long, default_value_t = false)]
    split_by_pair: bool,
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
    let output = args
        .output
        .resolve(&cfg.crops_root, &cfg.output_extension);
    let crop = CropOptions {
        coordinate_system: args
            .dataset
            .coordinate_system
            .clone()
            .unwrap_or_else(|| cfg.coordinate_system.clone()),
        extension: output.extension.clone(),
    };
    let layout = cfg.pair_layout();

    let pairs: Vec<ImagePairPaths> = match &args.pair {
        Some(pair_id) => {
            let paths = ImagePairPaths::from_layout(&dataset_root, &layout, pair_id);
            let missing = paths.missing_files();
            if !missing.is_empty() {
                bail!("pair {pair_id} is incomplete: missing {missing:?}");
            }
            vec![paths]
        }
        None => {
            let index = index_pairs(&dataset_root, &layout)
                .with_context(|| format!("index pairs under {}", dataset_root.display()))?;
            for missing in &index.missing {
                println!("skipping incomplete pair {}", missing.pair_id);
            }
            index.pairs
        }
    };
    if pairs.is_empty() {
        bail!("no image pairs found under {}", dataset_root.display());
    }

    let report = crop_dataset(
        &pairs,
        &output.output_root,
        &BatchOptions {
            crop,
            parallel: args.parallel,
            split_by_pair: args.split_by_pair,
        },
    );

    let summary = report.summary();
    println!(
        "Crop complete: pairs processed={}, pairs failed={}, documents failed={}, crops written={}, features failed={}, output={}",
        summary.pairs_processed,
        summary.pairs_failed,
        summary.documents_failed,
        summary.crops_written,
        summary.features_failed,
        output.output_root.display()
    );
    for failure in &report.failures {
        println!("  pair {}: {}", failure.pair_id, failure.error);
    }
    for pair in &report.reports {
        for failure in &pair.document_failures {
            println!("  {} {}: {}", pair.pair_id, failure.phase, failure.error);
        }
        for failure in &pair.failures {
            println!(
                "  {} {} {} ({}): {}",
                pair.pair_id, failure.phase, failure.uid, failure.feature_type, failure.error
            );
        }
    }
    Ok(())
}
