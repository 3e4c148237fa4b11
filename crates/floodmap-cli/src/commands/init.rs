//! Init command implementation

use crate::cli::InitArgs;
use crate::dry_run::{display_planned_actions, ActionType, PlannedAction};
use crate::output::OutputWriter;
use crate::output_types::InitOutput;
use anyhow::{bail, Context, Result};
use floodmap_core::models::{projection_code, StageDir};
use floodmap_core::workspace::CONFIG_FILE_NAME;
use floodmap_core::RunWorkspace;
use std::fs;

pub fn execute(args: InitArgs, output: &OutputWriter, dry_run: bool) -> Result<()> {
    // Reject a malformed projection before anything is written
    if let Some(projection) = &args.projection {
        projection_code(projection)?;
    }

    let config_path = args.path.join(CONFIG_FILE_NAME);
    if config_path.exists() && !args.force {
        bail!(
            "Workspace already exists at {}. Use --force to overwrite {}",
            args.path.display(),
            CONFIG_FILE_NAME
        );
    }

    let persistent: Vec<StageDir> =
        StageDir::ALL.iter().copied().filter(|s| s.is_persistent()).collect();

    if dry_run {
        let mut actions: Vec<PlannedAction> = persistent
            .iter()
            .map(|stage| {
                PlannedAction::new(
                    ActionType::CreateDirectory,
                    format!("Create {} directory", stage.dir_name()),
                )
            })
            .collect();
        actions.push(
            PlannedAction::new(ActionType::CreateFile, format!("Create {}", CONFIG_FILE_NAME))
                .with_detail(format!(
                    "Projection: {}",
                    args.projection.as_deref().unwrap_or("(unset)")
                ))
                .with_detail(format!(
                    "DEM: {}",
                    args.dem.as_ref().map(|d| d.display().to_string()).unwrap_or_else(|| "(unset)".to_string())
                )),
        );

        display_planned_actions(output, &actions);
        return Ok(());
    }

    let workspace = RunWorkspace::init(&args.path)?;
    fs::write(&config_path, default_config(&args))
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    if output.is_json() {
        let json_output = InitOutput {
            workspace_path: workspace.root().display().to_string(),
            config_file: config_path.display().to_string(),
            stage_dirs: persistent.iter().map(|s| s.dir_name().to_string()).collect(),
        };
        output.result(json_output)?;
    } else {
        output.success(format!("Initialized flood mapping workspace at {}", args.path.display()));

        output.section("Layout");
        for stage in &persistent {
            output.kv(stage.dir_name(), workspace.stage_path(*stage).display());
        }
        output.info(format!("Place scene archives or folders in {}", StageDir::Raw.dir_name()));
    }

    Ok(())
}

fn default_config(args: &InitArgs) -> String {
    let quoted = |value: Option<String>, key: &str, example: &str| match value {
        Some(v) => format!("{} = {:?}", key, v),
        None => format!("# {} = \"{}\"", key, example),
    };

    format!(
        r#"# Flood mapping workspace configuration
#
# Values here are overridden by FLOODMAP_* environment variables and
# by command-line flags.

# Output projection; the last token is the datum/ellipsoid
{}

# Output pixel spacing in metres, as x,y
pixel_spacing = "12.5,12.5"

# DEM used for terrain correction (relative to this file)
{}

# Smallest flood polygon kept and largest hole filled, in hectares
min_polygon_size = 2.5
hole_size = 2.5

# Vegetation thresholds in dB; used when calibration is off or fails
# open_water_threshold = -13.0
# veg_flood_threshold = -4.0
calibrate = false

# Extraction mask and vegetated land cover polygons
# mask = "aoi_mask.grd"
# land_cover = "landcover.geojson"

# Threshold sweeps on the scaled 8-bit images
# [[thresholds]]
# polarization = "HH"
# min = 10
# max = 12

# Seed polygons for calibration
# [seeds]
# open_water = "seeds/water.geojson"
# non_flood_vegetation = "seeds/nonflood.geojson"
# flood_vegetation = "seeds/flood.geojson"

# Stages to disable, e.g. ["ortho"]
# skip = []
"#,
        quoted(args.projection.clone(), "projection", "UTM 18 D122"),
        quoted(args.dem.as_ref().map(|d| d.display().to_string()), "dem", "dem.grd"),
    )
}
