use clap::Args;
use std::path::PathBuf;

/// Dataset split location; unset values fall back to the tools config.
#[derive(Debug, Clone, Default, Args)]
pub struct DatasetArgs {
    /// Dataset split root containing the images/ and labels/ directories.
    #[arg(long)]
    pub dataset_root: Option<PathBuf>,
    /// Coordinate system holding pixel-space polygons.
    #[arg(long)]
    pub coordinate_system: Option<String>,
}

/// Crop output options shared across crop-related binaries.
#[derive(Debug, Clone, Default, Args)]
pub struct CropOutputArgs {
    /// Directory to write crops into.
    #[arg(long)]
    pub output_root: Option<PathBuf>,
    /// Output image extension (selects the encoder).
    #[arg(long)]
    pub extension: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CropOutputOpts {
    pub output_root: PathBuf,
    pub extension: String,
}

impl CropOutputOpts {
    pub fn new(output_root: PathBuf, extension: String) -> Self {
        Self {
            output_root,
            extension,
        }
    }
}

impl CropOutputArgs {
    pub fn resolve(&self, default_root: &std::path::Path, default_extension: &str) -> CropOutputOpts {
        CropOutputOpts::new(
            self.output_root
                .clone()
                .unwrap_or_else(|| default_root.to_path_buf()),
            self.extension
                .clone()
                .unwrap_or_else(|| default_extension.to_string()),
        )
    }
}
