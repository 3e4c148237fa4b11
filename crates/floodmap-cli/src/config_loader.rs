//! Configuration loading utilities for CLI commands

use crate::errors::{from_flood_error, workspace_not_found};
use anyhow::Result;
use floodmap_core::config::{CliConfigOverrides, LayeredConfig};
use floodmap_core::RunWorkspace;
use std::path::Path;

/// Open an existing workspace, with a helpful error when it is absent
pub fn open_workspace(path: &Path) -> Result<RunWorkspace> {
    if !path.is_dir() {
        return Err(workspace_not_found(path).into());
    }
    RunWorkspace::open(path).map_err(from_flood_error)
}

/// Load layered configuration for a workspace
///
/// Defaults, then `floodmap.toml` if present, then `FLOODMAP_*` variables.
pub fn load_workspace_config(workspace: &RunWorkspace) -> Result<LayeredConfig> {
    let config = LayeredConfig::with_defaults()
        .load_optional_file(workspace.config_path())
        .map_err(from_flood_error)?
        .load_from_env();

    Ok(config)
}

/// Load layered configuration with CLI overrides
pub fn load_workspace_config_with_overrides(
    workspace: &RunWorkspace,
    overrides: CliConfigOverrides,
) -> Result<LayeredConfig> {
    let mut config = load_workspace_config(workspace)?;
    config.update_from_cli(overrides);
    Ok(config)
}
