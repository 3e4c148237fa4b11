//! On-disk layout of a run workspace

use crate::error::{FloodError, Result};
use crate::models::StageDir;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the workspace configuration file
pub const CONFIG_FILE_NAME: &str = "floodmap.toml";

/// Root directory of one processing job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunWorkspace {
    root: PathBuf,
}

impl RunWorkspace {
    /// Open an existing workspace directory
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(FloodError::Workspace {
                path: root,
                reason: "workspace directory does not exist".to_string(),
            });
        }
        Ok(Self { root })
    }

    /// Create the workspace root and every persistent stage directory
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        create_dir(&root)?;
        let workspace = Self { root };
        for stage in StageDir::ALL.iter().filter(|s| s.is_persistent()) {
            workspace.ensure_stage(*stage)?;
        }
        Ok(workspace)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    /// Path of a stage directory, without creating it
    pub fn stage_path(&self, stage: StageDir) -> PathBuf {
        self.root.join(stage.dir_name())
    }

    /// Create the stage directory if absent and return its path
    pub fn ensure_stage(&self, stage: StageDir) -> Result<PathBuf> {
        let path = self.stage_path(stage);
        create_dir(&path)?;
        Ok(path)
    }

    /// Remove and recreate the scratch directory
    ///
    /// Call once per pipeline invocation, never between stages.
    pub fn reset_scratch(&self) -> Result<PathBuf> {
        let path = self.stage_path(StageDir::Scratch);
        if path.exists() {
            fs::remove_dir_all(&path).map_err(|e| FloodError::Workspace {
                path: path.clone(),
                reason: format!("failed to clear scratch directory: {}", e),
            })?;
        }
        create_dir(&path)?;
        tracing::debug!(path = %path.display(), "Scratch directory reset");
        Ok(path)
    }

    /// Files directly inside a stage directory whose name ends with `suffix`, sorted
    pub fn list_stage_files(&self, stage: StageDir, suffix: &str) -> Result<Vec<PathBuf>> {
        let dir = self.stage_path(stage);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            let matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with(suffix))
                .unwrap_or(false);
            if path.is_file() && matches {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Whether a declared output counts as produced
///
/// Zero-byte files are treated as absent.
pub fn output_present(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(meta) => meta.is_dir() || meta.len() > 0,
        Err(_) => false,
    }
}

/// Whether an input exists and can be opened for reading
pub fn input_readable(path: &Path) -> bool {
    if path.is_dir() {
        return fs::read_dir(path).is_ok();
    }
    fs::File::open(path).is_ok()
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| FloodError::Workspace {
        path: path.to_path_buf(),
        reason: format!("failed to create directory: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_stage_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let workspace = RunWorkspace::open(dir.path()).unwrap();

        let first = workspace.ensure_stage(StageDir::VectorWater).unwrap();
        fs::write(first.join("keep.geojson"), "{}").unwrap();
        let second = workspace.ensure_stage(StageDir::VectorWater).unwrap();

        assert_eq!(first, second);
        assert!(first.ends_with("OWFEP"));
        assert!(second.join("keep.geojson").exists());
    }

    #[test]
    fn test_reset_scratch_only_touches_scratch() {
        let dir = TempDir::new().unwrap();
        let workspace = RunWorkspace::init(dir.path()).unwrap();

        let scratch = workspace.reset_scratch().unwrap();
        fs::write(scratch.join("temp.grd"), "x").unwrap();
        let mosaic = workspace.stage_path(StageDir::Mosaic);
        fs::write(mosaic.join("keep.grd"), "x").unwrap();

        workspace.reset_scratch().unwrap();

        assert!(scratch.is_dir());
        assert!(!scratch.join("temp.grd").exists());
        assert!(mosaic.join("keep.grd").exists());
    }

    #[test]
    fn test_open_missing_workspace_fails() {
        let dir = TempDir::new().unwrap();
        let err = RunWorkspace::open(dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, FloodError::Workspace { .. }));
    }

    #[test]
    fn test_zero_byte_output_is_not_present() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty.grd");
        fs::write(&empty, "").unwrap();
        let full = dir.path().join("full.grd");
        fs::write(&full, "data").unwrap();

        assert!(!output_present(&empty));
        assert!(output_present(&full));
        assert!(!output_present(&dir.path().join("missing.grd")));
    }

    #[test]
    fn test_list_stage_files_filters_by_suffix() {
        let dir = TempDir::new().unwrap();
        let workspace = RunWorkspace::init(dir.path()).unwrap();
        let vegfep = workspace.stage_path(StageDir::VectorVeg);
        fs::write(vegfep.join("b_vegflood.grd"), "x").unwrap();
        fs::write(vegfep.join("a_vegflood.grd"), "x").unwrap();
        fs::write(vegfep.join("notes.txt"), "x").unwrap();

        let files = workspace.list_stage_files(StageDir::VectorVeg, "_vegflood.grd").unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a_vegflood.grd"));
    }
}
