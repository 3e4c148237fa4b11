//! Calibrate command implementation

use crate::cli::CalibrateArgs;
use crate::config_loader::{load_workspace_config_with_overrides, open_workspace};
use crate::dry_run::{display_planned_actions, ActionType, PlannedAction};
use crate::output::OutputWriter;
use crate::output_types::CalibrateOutput;
use anyhow::{bail, Result};
use floodmap_core::config::CliConfigOverrides;
use floodmap_core::models::{FallbackThresholds, SeedClass, SeedSet};
use floodmap_pipeline::calibrate;
use floodmap_toolkit::LocalToolkit;

pub fn execute(args: CalibrateArgs, output: &OutputWriter, dry_run: bool) -> Result<()> {
    let workspace = open_workspace(&args.workspace)?;
    if !args.image.is_file() {
        bail!("Image not found: {}", args.image.display());
    }

    let layered = load_workspace_config_with_overrides(
        &workspace,
        CliConfigOverrides {
            open_water_threshold: args.open_water_threshold,
            veg_flood_threshold: args.veg_flood_threshold,
            seeds: SeedSet {
                open_water: args.seed_water.clone(),
                non_flood_vegetation: args.seed_non_flood.clone(),
                flood_vegetation: args.seed_flood.clone(),
            },
            ..Default::default()
        },
    )?;
    let seeds = layered.seeds.value;
    let fallback = FallbackThresholds {
        open_water: layered.open_water_threshold.value,
        veg_flood: layered.veg_flood_threshold.value,
    };

    if dry_run {
        let mut action = PlannedAction::new(
            ActionType::RunStage,
            format!("Sample band {} of {}", args.band, args.image.display()),
        );
        for class in SeedClass::ALL {
            let detail = match seeds.region(class) {
                Some(region) => format!("{}: {}", class, region.path.display()),
                None => format!("{}: (missing)", class),
            };
            action = action.with_detail(detail);
        }
        display_planned_actions(output, &[action]);
        return Ok(());
    }

    let scratch = workspace.reset_scratch()?;
    let outcome = calibrate(&LocalToolkit, &args.image, args.band, &seeds, &fallback, &scratch);

    if output.is_json() {
        let json_output = CalibrateOutput {
            image: args.image.display().to_string(),
            source: outcome.source,
            open_water: outcome.thresholds.open_water,
            veg_flood: outcome.thresholds.veg_flood,
            bounds: outcome.bounds,
            warning: outcome.warning.as_ref().map(|w| w.to_string()),
        };
        return output.result(json_output);
    }

    if let Some(warning) = &outcome.warning {
        output.warning(warning);
    } else {
        output.success("Seed classes are separable");
    }

    output.section("Vegetation Thresholds");
    output.kv("Open water", format!("{} dB", outcome.thresholds.open_water));
    output.kv("Flooded vegetation", format!("{} dB", outcome.thresholds.veg_flood));
    output.kv("Source", format!("{:?}", outcome.source));

    if let Some(bounds) = &outcome.bounds {
        output.section("Class Bounds");
        output.kv("Water max", format!("{:.2} dB", bounds.water_max));
        output.kv("Non-flooded vegetation", format!("{:.2} .. {:.2} dB", bounds.non_flood_min, bounds.non_flood_max));
        output.kv("Flooded vegetation min", format!("{:.2} dB", bounds.flood_min));
    }

    Ok(())
}
