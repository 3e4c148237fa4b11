use console::style;
use floodmap_core::FloodError;
use std::fmt;
use std::path::Path;

/// Enhanced error type with suggestions
pub struct CliError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
    pub help_command: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
            help_command: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_help(mut self, command: impl Into<String>) -> Self {
        self.help_command = Some(command.into());
        self
    }

    pub fn display(&self) {
        eprintln!("{} {}\n", style("✗").red().bold(), style(&self.message).red().bold());

        if let Some(ref context) = self.context {
            eprintln!("{}", context);
            eprintln!();
        }

        if !self.suggestions.is_empty() {
            eprintln!("{}", style("To fix this:").yellow().bold());
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, suggestion);
            }
            eprintln!();
        }

        if let Some(ref help_cmd) = self.help_command {
            eprintln!("{} {}", style("Need help?").cyan(), style(help_cmd).cyan().bold());
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Create error for workspace not found
pub fn workspace_not_found(path: &Path) -> CliError {
    CliError::new("Workspace not found")
        .with_context(format!(
            "The workspace directory does not exist.\n\nPath: {}",
            path.display()
        ))
        .with_suggestion(format!("Initialize a workspace: floodmap init {}", path.display()))
        .with_suggestion("Or pass an existing workspace with --workspace")
        .with_help("Run: floodmap init --help")
}

/// Create error for a missing or absent DEM
pub fn missing_dem(detail: &str) -> CliError {
    CliError::new("DEM not available")
        .with_context(format!(
            "Terrain correction needs a digital elevation model.\n\n{}",
            detail
        ))
        .with_suggestion("Pass one: floodmap run --dem path/to/dem.grd")
        .with_suggestion("Or set dem in floodmap.toml, or FLOODMAP_DEM")
        .with_suggestion("Or skip terrain correction: floodmap run --skip ortho")
        .with_help("Run: floodmap run --help")
}

/// Create error for a missing projection
pub fn missing_projection() -> CliError {
    CliError::new("Projection not configured")
        .with_context("Output products are named and reprojected after the projection.")
        .with_suggestion("Pass one: floodmap run --projection \"UTM 18 D122\"")
        .with_suggestion("Or set projection in floodmap.toml, or FLOODMAP_PROJECTION")
        .with_help("Run: floodmap run --help")
}

/// Create error for a rejected mask
pub fn mask_rejected(reason: &str) -> CliError {
    CliError::new("Mask rejected")
        .with_context(format!(
            "The extraction mask cannot be used.\n\nReason: {}",
            reason
        ))
        .with_suggestion("Check that the mask is a raster with 1 inside the area of interest")
        .with_suggestion("Or run without a mask")
        .with_help("Run: floodmap run --help")
}

/// Create error for invalid configuration
pub fn invalid_config(key: &str, reason: &str) -> CliError {
    CliError::new(format!("Invalid configuration: {}", key))
        .with_context(format!("Configuration value is invalid.\n\nReason: {}", reason))
        .with_suggestion("Check floodmap.toml for syntax errors")
        .with_suggestion("Or reinitialize: floodmap init --force")
        .with_help("Run: floodmap status --verbose")
}

/// Convert a library error into an error with suggestions where one applies
pub fn from_flood_error(error: FloodError) -> anyhow::Error {
    let hint = match &error {
        FloodError::ConfigMissing { key } if key == "dem" => {
            Some(missing_dem("No DEM is configured."))
        }
        FloodError::ConfigMissing { key } if key == "projection" => Some(missing_projection()),
        FloodError::Validation { parameter, reason } if parameter == "dem" => {
            Some(missing_dem(reason))
        }
        FloodError::Validation { parameter, reason } if parameter == "mask" => {
            Some(mask_rejected(reason))
        }
        FloodError::Workspace { path, .. } if !path.exists() => Some(workspace_not_found(path)),
        FloodError::ConfigInvalid { key, reason } => Some(invalid_config(key, reason)),
        _ => None,
    };

    match hint {
        Some(cli_error) => cli_error.into(),
        None => anyhow::Error::new(error),
    }
}
