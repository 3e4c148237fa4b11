//! Scene archive intake and discovery of scene directories under `Raw/`

use floodmap_core::error::{FloodError, Result};
use floodmap_core::models::{SceneId, StageDir};
use floodmap_core::RunWorkspace;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Metadata file expected in every scene directory
pub const METADATA_FILE_NAME: &str = "product.xml";

/// Extension of the directory an archive is unpacked into before the rename
const STAGING_EXTENSION: &str = "partial";

/// One raw scene and the products derived from it
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub id: SceneId,
    pub dir: PathBuf,
    pub metadata: PathBuf,
    pub raw: PathBuf,
    pub ortho: PathBuf,
}

/// Archive intake result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntakeReport {
    pub moved: Vec<PathBuf>,
    pub extracted: Vec<PathBuf>,
}

/// Move `*.zip` archives from the workspace root into `Raw/` and unpack them
///
/// An archive is unpacked into `Raw/<stem>/` only when that directory does not
/// exist yet.
pub fn intake_archives(workspace: &RunWorkspace) -> Result<IntakeReport> {
    let raw = workspace.ensure_stage(StageDir::Raw)?;
    let mut report = IntakeReport::default();

    let mut archives: Vec<PathBuf> = fs::read_dir(workspace.root())?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && has_zip_extension(p))
        .collect();
    archives.sort();

    for archive in archives {
        let Some(name) = archive.file_name() else {
            continue;
        };
        let target = raw.join(name);
        fs::rename(&archive, &target).map_err(|e| FloodError::Workspace {
            path: archive.clone(),
            reason: format!("failed to move archive into Raw: {}", e),
        })?;
        tracing::info!(archive = %target.display(), "Moved scene archive into Raw");
        report.moved.push(target);
    }

    for archive in list_archives(&raw)? {
        let Some(stem) = archive.file_stem() else {
            continue;
        };
        let destination = raw.join(stem);
        if destination.exists() {
            continue;
        }
        extract_archive(&archive, &destination)?;
        report.extracted.push(destination);
    }

    Ok(report)
}

fn has_zip_extension(path: &Path) -> bool {
    path.extension().map(|e| e.eq_ignore_ascii_case("zip")).unwrap_or(false)
}

fn list_archives(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut archives: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && has_zip_extension(p))
        .collect();
    archives.sort();
    Ok(archives)
}

/// Unpack into a staging directory, then rename into place
fn extract_archive(archive: &Path, destination: &Path) -> Result<()> {
    let staging = destination.with_extension(STAGING_EXTENSION);
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }

    let unpack = || -> std::result::Result<(), String> {
        let file = File::open(archive).map_err(|e| e.to_string())?;
        let mut zip = ZipArchive::new(file).map_err(|e| e.to_string())?;
        zip.extract(&staging).map_err(|e| e.to_string())?;
        fs::rename(&staging, destination).map_err(|e| e.to_string())
    };

    unpack().map_err(|reason| {
        let _ = fs::remove_dir_all(&staging);
        FloodError::Workspace {
            path: archive.to_path_buf(),
            reason: format!("failed to extract archive: {}", reason),
        }
    })?;

    tracing::info!(archive = %archive.display(), destination = %destination.display(), "Extracted scene archive");
    Ok(())
}

fn is_staging_dir(path: &Path) -> bool {
    path.extension().map(|e| e == STAGING_EXTENSION).unwrap_or(false)
}

/// Scene directories under `Raw/`, sorted by name
///
/// Directories whose names do not parse as a scene identity are skipped, as
/// are staging directories left by an interrupted archive extraction.
pub fn discover_scenes(workspace: &RunWorkspace, raster_extension: &str) -> Result<Vec<Scene>> {
    let raw = workspace.stage_path(StageDir::Raw);
    if !raw.is_dir() {
        return Ok(Vec::new());
    }

    let mut dirs: Vec<PathBuf> = fs::read_dir(&raw)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_dir() && !is_staging_dir(p))
        .collect();
    dirs.sort();

    let ortho = workspace.stage_path(StageDir::Ortho);
    let mut scenes = Vec::new();
    for dir in dirs {
        let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let id = match SceneId::parse(name) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Skipping directory that is not a scene");
                continue;
            }
        };

        let stem = id.product_stem();
        scenes.push(Scene {
            metadata: dir.join(METADATA_FILE_NAME),
            raw: raw.join(format!("{}.{}", stem, raster_extension)),
            ortho: ortho.join(format!("{}.{}", stem, raster_extension)),
            dir,
            id,
        });
    }

    Ok(scenes)
}
