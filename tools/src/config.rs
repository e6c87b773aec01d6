use std::path::{Path, PathBuf};

use crop_pipeline::{CropOptions, PairLayout};
use damage_eval::RegressionThresholds;
use serde::Deserialize;

const DEFAULT_CONFIG_NAME: &str = "xbd-tools.toml";
const CONFIG_ENV: &str = "XBD_TOOLS_CONFIG";

#[derive(Debug, Clone)]
pub struct ToolConfig {
    pub dataset_root: PathBuf,
    pub images_subdir: String,
    pub labels_subdir: String,
    pub image_extension: String,
    pub crops_root: PathBuf,
    pub coordinate_system: String,
    pub ground_truth_coordinate_system: String,
    pub output_extension: String,
    pub results_path: PathBuf,
    pub baseline_path: PathBuf,
    pub per_sample_path: PathBuf,
    pub max_pairs: Option<usize>,
    pub regression: RegressionThresholds,
}

impl Default for ToolConfig {
    fn default() -> Self {
        let evaluation_root = PathBuf::from("evaluation");
        Self {
            dataset_root: PathBuf::from("data/test"),
            images_subdir: "images".to_string(),
            labels_subdir: "labels".to_string(),
            image_extension: "png".to_string(),
            crops_root: PathBuf::from("crops"),
            coordinate_system: data_contracts::PIXEL_COORDINATES.to_string(),
            ground_truth_coordinate_system: data_contracts::GEO_COORDINATES.to_string(),
            output_extension: "png".to_string(),
            results_path: evaluation_root.join("results.jsonl"),
            baseline_path: evaluation_root.join("baseline_metrics.json"),
            per_sample_path: evaluation_root.join("per_sample_results.jsonl"),
            max_pairs: None,
            regression: RegressionThresholds::default(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct ToolConfigFile {
    dataset_root: Option<String>,
    images_subdir: Option<String>,
    labels_subdir: Option<String>,
    image_extension: Option<String>,
    crops_root: Option<String>,
    coordinate_system: Option<String>,
    ground_truth_coordinate_system: Option<String>,
    output_extension: Option<String>,
    evaluation: Option<EvaluationSection>,
    regression: Option<RegressionSection>,
}

#[derive(Debug, Deserialize, Default)]
struct EvaluationSection {
    results_path: Option<String>,
    baseline_path: Option<String>,
    per_sample_path: Option<String>,
    max_pairs: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct RegressionSection {
    max_accuracy_drop: Option<f64>,
    max_macro_f1_drop: Option<f64>,
}

impl ToolConfig {
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let cfg = Self::from_path(Path::new(&path)).unwrap_or_default();
            cfg.warn_if_invalid();
            return cfg;
        }
        let cfg = Self::from_path(Path::new(DEFAULT_CONFIG_NAME)).unwrap_or_default();
        cfg.warn_if_invalid();
        cfg
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        let raw = std::fs::read_to_string(path).ok()?;
        match toml::from_str::<ToolConfigFile>(&raw) {
            Ok(file) => Some(Self::from_file(file)),
            Err(e) => {
                log::warn!("tools config: ignoring {}: {e}", path.display());
                None
            }
        }
    }

    fn from_file(file: ToolConfigFile) -> Self {
        let defaults = Self::default();
        let evaluation = file.evaluation.unwrap_or_default();
        let regression = file.regression.unwrap_or_default();
        ToolConfig {
            dataset_root: file
                .dataset_root
                .map(|v| expand_path(&v))
                .unwrap_or(defaults.dataset_root),
            images_subdir: file.images_subdir.unwrap_or(defaults.images_subdir),
            labels_subdir: file.labels_subdir.unwrap_or(defaults.labels_subdir),
            image_extension: file.image_extension.unwrap_or(defaults.image_extension),
            crops_root: file
                .crops_root
                .map(|v| expand_path(&v))
                .unwrap_or(defaults.crops_root),
            coordinate_system: file
                .coordinate_system
                .unwrap_or(defaults.coordinate_system),
            ground_truth_coordinate_system: file
                .ground_truth_coordinate_system
                .unwrap_or(defaults.ground_truth_coordinate_system),
            output_extension: file.output_extension.unwrap_or(defaults.output_extension),
            results_path: evaluation
                .results_path
                .map(|v| expand_path(&v))
                .unwrap_or(defaults.results_path),
            baseline_path: evaluation
                .baseline_path
                .map(|v| expand_path(&v))
                .unwrap_or(defaults.baseline_path),
            per_sample_path: evaluation
                .per_sample_path
                .map(|v| expand_path(&v))
                .unwrap_or(defaults.per_sample_path),
            max_pairs: evaluation.max_pairs,
            regression: RegressionThresholds {
                max_accuracy_drop: regression
                    .max_accuracy_drop
                    .unwrap_or(defaults.regression.max_accuracy_drop),
                max_macro_f1_drop: regression
                    .max_macro_f1_drop
                    .unwrap_or(defaults.regression.max_macro_f1_drop),
            },
        }
    }

    pub fn pair_layout(&self) -> PairLayout {
        PairLayout {
            images_subdir: self.images_subdir.clone(),
            labels_subdir: self.labels_subdir.clone(),
            image_extension: self.image_extension.clone(),
        }
    }

    pub fn crop_options(&self) -> CropOptions {
        CropOptions {
            coordinate_system: self.coordinate_system.clone(),
            extension: self.output_extension.clone(),
        }
    }

    fn warn_if_invalid(&self) {
        if self.coordinate_system.trim().is_empty() {
            log::warn!("tools config: coordinate_system is empty; no features will be cropped");
        }
        if self.output_extension.trim().is_empty() {
            log::warn!("tools config: output_extension is empty; crops cannot be encoded");
        }
        if self.max_pairs == Some(0) {
            log::warn!("tools config: evaluation.max_pairs is 0; evaluation will score nothing");
        }
        if self.regression.max_accuracy_drop < 0.0 || self.regression.max_macro_f1_drop < 0.0 {
            log::warn!("tools config: negative regression threshold flags any change as a regression");
        }
    }
}

fn expand_path(raw: &str) -> PathBuf {
    let mut out = raw.to_string();
    if let Some(stripped) = out.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME") {
            out = format!("{home}{stripped}");
        }
    }
    PathBuf::from(expand_env(&out))
}

fn expand_env(input: &str) -> String {
    let mut out = String::new();
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let key = &rest[start + 2..start + 2 + len];
        match std::env::var(key) {
            Ok(val) => out.push_str(&val),
            Err(_) => out.push_str(&rest[start..start + 3 + len]),
        }
        rest = &rest[start + 3 + len..];
    }
    out.push_str(rest);
    out
}
