use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use clap::Parser;
use damage_eval::{
    check_regression, disaster_breakdown, filter_scored, read_records, scored_records,
    top_error_patterns, write_records, Baseline, MetricsReport, RegressionThresholds,
    RegressionVerdict,
};
use data_contracts::evaluation::{DamageLevel, EvaluationRecord};
use xbd_tools::ToolConfig;

#[derive(Parser, Debug)]
#[command(
    name = "eval_report",
    about = "Score a damage prediction table and check it against the stored baseline"
)]
struct Args {
    /// Result table (JSON Lines of image_name, vlm_prediction, ground_truth).
    #[arg(long)]
    results: Option<PathBuf>,
    /// Baseline metrics file; created from this run when absent.
    #[arg(long)]
    baseline: Option<PathBuf>,
    /// Per-sample output table.
    #[arg(long)]
    per_sample: Option<PathBuf>,
    /// Number of error patterns to print.
    #[arg(long, default_value_t = 8)]
    top_errors: usize,
}

fn main() -> Result<()> {
    xbd_tools::init_logging();
    let args = Args::parse();
    let cfg = ToolConfig::load();

    let results_path = args.results.unwrap_or_else(|| cfg.results_path.clone());
    let baseline_path = args.baseline.unwrap_or_else(|| cfg.baseline_path.clone());
    let per_sample_path = args.per_sample.unwrap_or_else(|| cfg.per_sample_path.clone());

    let rows: Vec<EvaluationRecord> = read_records(&results_path)
        .with_context(|| format!("read results {}", results_path.display()))?;
    let records = filter_scored(&rows);
    println!(
        "Loaded {} rows, {} scored after filtering",
        rows.len(),
        records.len()
    );
    if records.is_empty() {
        bail!("no scorable rows in {}", results_path.display());
    }

    let metrics = MetricsReport::compute(&records);
    print_metrics(&metrics);
    print_confusion(&metrics);

    println!("\nPer-disaster accuracy:");
    for row in disaster_breakdown(&records) {
        println!(
            "  {:<24} {:>6.3} ({}/{})",
            row.disaster, row.accuracy, row.correct, row.total
        );
    }

    println!("\nTop error patterns:");
    for pattern in top_error_patterns(&records, args.top_errors) {
        println!(
            "  {} -> {}: {}",
            pattern.ground_truth, pattern.predicted, pattern.count
        );
    }

    let regressed = regression_check(&metrics, &baseline_path, &cfg.regression)?;

    write_records(&per_sample_path, &scored_records(&records))
        .with_context(|| format!("write per-sample results {}", per_sample_path.display()))?;
    println!("\nPer-sample results written to {}", per_sample_path.display());

    if regressed {
        bail!("metrics regressed against {}", baseline_path.display());
    }
    Ok(())
}

fn print_metrics(metrics: &MetricsReport) {
    println!(
        "\nAccuracy: {:.4} ({}/{})",
        metrics.accuracy, metrics.correct, metrics.samples
    );
    println!(
        "{:<14} {:>9} {:>9} {:>9} {:>8}",
        "class", "precision", "recall", "f1", "support"
    );
    for class in &metrics.classes {
        println!(
            "{:<14} {:>9.3} {:>9.3} {:>9.3} {:>8}",
            class.label.as_str(),
            class.precision,
            class.recall,
            class.f1,
            class.support
        );
    }
    println!(
        "{:<14} {:>9.3} {:>9.3} {:>9.3} {:>8}",
        "macro avg",
        metrics.macro_precision,
        metrics.macro_recall,
        metrics.macro_f1,
        metrics.support_total()
    );
}

fn print_confusion(metrics: &MetricsReport) {
    println!("\nConfusion matrix (rows: ground truth, columns: prediction):");
    print!("{:<14}", "");
    for label in DamageLevel::ALL_ASSESSED {
        print!(" {:>13}", label.as_str());
    }
    println!();
    for truth in DamageLevel::ALL_ASSESSED {
        print!("{:<14}", truth.as_str());
        for predicted in DamageLevel::ALL_ASSESSED {
            print!(" {:>13}", metrics.confusion.get(truth, predicted));
        }
        println!();
    }
}

/// Returns true when the current metrics regressed against the stored baseline.
fn regression_check(
    metrics: &MetricsReport,
    baseline_path: &std::path::Path,
    thresholds: &RegressionThresholds,
) -> Result<bool> {
    let Some(baseline) = Baseline::load(baseline_path)? else {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        Baseline::from_metrics(metrics, created_at).save(baseline_path)?;
        println!("\nNo baseline found; saved current metrics to {}", baseline_path.display());
        return Ok(false);
    };
    let verdict = check_regression(&baseline, metrics, thresholds);
    match verdict {
        RegressionVerdict::AccuracyDrop(drop) => {
            println!("\nREGRESSION: accuracy dropped by {drop:.4}")
        }
        RegressionVerdict::MacroF1Drop(drop) => {
            println!("\nREGRESSION: macro F1 dropped by {drop:.4}")
        }
        RegressionVerdict::Stable => println!(
            "\nNo regression (baseline accuracy {:.4}, macro F1 {:.4})",
            baseline.accuracy, baseline.macro_f1
        ),
    }
    Ok(verdict.is_regression())
}
