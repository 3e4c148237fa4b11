use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// floodmap - SAR flood extent mapping pipeline
#[derive(Parser, Debug)]
#[command(name = "floodmap")]
#[command(about = "Resumable SAR flood extent mapping", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Show planned actions without executing them
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new run workspace
    Init(InitArgs),

    /// Run the flood mapping pipeline
    Run(RunArgs),

    /// Calibrate vegetation thresholds from seed regions
    Calibrate(CalibrateArgs),

    /// Show workspace status and the latest run report
    Status(StatusArgs),
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Workspace directory path (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Output projection written to floodmap.toml (e.g. "UTM 18 D122")
    #[arg(long)]
    pub projection: Option<String>,

    /// DEM used for terrain correction
    #[arg(long)]
    pub dem: Option<PathBuf>,

    /// Force overwrite of an existing floodmap.toml
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Workspace directory (defaults to current directory)
    #[arg(long, short = 'w', default_value = ".")]
    pub workspace: PathBuf,

    /// DEM used for terrain correction
    #[arg(long)]
    pub dem: Option<PathBuf>,

    /// Output projection (e.g. "UTM 18 D122")
    #[arg(long)]
    pub projection: Option<String>,

    /// Output pixel spacing in metres, as x,y
    #[arg(long, value_name = "X,Y")]
    pub pixel_spacing: Option<String>,

    /// Threshold sweep for one polarization; repeatable
    #[arg(long = "threshold", value_name = "POL:MIN:MAX")]
    pub thresholds: Vec<String>,

    /// Smallest flood polygon kept, in hectares
    #[arg(long, value_name = "HA")]
    pub min_polygon_size: Option<String>,

    /// Largest hole filled when merging, in hectares
    #[arg(long, value_name = "HA")]
    pub hole_size: Option<String>,

    /// Binary raster restricting vector extraction
    #[arg(long)]
    pub mask: Option<PathBuf>,

    /// Polygon layer of vegetated land cover
    #[arg(long)]
    pub land_cover: Option<PathBuf>,

    /// Open water seed polygons
    #[arg(long)]
    pub seed_water: Option<PathBuf>,

    /// Non-flooded vegetation seed polygons
    #[arg(long)]
    pub seed_non_flood: Option<PathBuf>,

    /// Flooded vegetation seed polygons
    #[arg(long)]
    pub seed_flood: Option<PathBuf>,

    /// Calibrate vegetation thresholds from the seed polygons
    #[arg(long)]
    pub calibrate: bool,

    /// Open water threshold in dB when not calibrated
    #[arg(long, allow_negative_numbers = true)]
    pub open_water_threshold: Option<f64>,

    /// Flooded vegetation threshold in dB when not calibrated
    #[arg(long, allow_negative_numbers = true)]
    pub veg_flood_threshold: Option<f64>,

    /// Polarization used by the vegetation branch (default HH)
    #[arg(long, value_name = "POL")]
    pub analysis_polarization: Option<String>,

    /// Open water product to merge instead of the default sweep product
    #[arg(long)]
    pub merge_open_water: Option<PathBuf>,

    /// Polarization of the sweep product used as merge open water
    #[arg(long, value_name = "POL")]
    pub merge_polarization: Option<String>,

    /// Threshold of the sweep product used as merge open water
    #[arg(long, value_name = "VALUE")]
    pub merge_threshold: Option<u32>,

    /// Stage to disable; repeatable
    #[arg(long = "skip", value_name = "STAGE")]
    pub skip: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct CalibrateArgs {
    /// Workspace directory (defaults to current directory)
    #[arg(long, short = 'w', default_value = ".")]
    pub workspace: PathBuf,

    /// Decibel image to sample
    #[arg(long)]
    pub image: PathBuf,

    /// Band of the image to sample
    #[arg(long, default_value = "0")]
    pub band: usize,

    /// Open water seed polygons
    #[arg(long)]
    pub seed_water: Option<PathBuf>,

    /// Non-flooded vegetation seed polygons
    #[arg(long)]
    pub seed_non_flood: Option<PathBuf>,

    /// Flooded vegetation seed polygons
    #[arg(long)]
    pub seed_flood: Option<PathBuf>,

    /// Open water threshold in dB used when calibration fails
    #[arg(long, allow_negative_numbers = true)]
    pub open_water_threshold: Option<f64>,

    /// Flooded vegetation threshold in dB used when calibration fails
    #[arg(long, allow_negative_numbers = true)]
    pub veg_flood_threshold: Option<f64>,
}

#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Workspace directory (defaults to current directory)
    #[arg(long, short = 'w', default_value = ".")]
    pub workspace: PathBuf,

    /// Show resolved configuration and per-stage results
    #[arg(long)]
    pub verbose: bool,
}
