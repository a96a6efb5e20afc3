// ─── Project Discovery ───
// Locates the `.uproject` descriptor in a directory, blocking and async.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, instrument};

use super::model::UProject;
use crate::core::error::{UProjectError, UProjectResult};

pub const UPROJECT_EXTENSION: &str = "uproject";

/// Path of the descriptor in `dir`, or `None` when there is none.
///
/// Only read failures on `dir` itself are errors.
#[instrument]
pub fn find_config_path_sync(dir: &Path) -> UProjectResult<Option<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|source| UProjectError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| UProjectError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        candidates.push(entry.file_name());
    }

    pick_descriptor(dir, candidates)
}

/// Load the descriptor in `dir`, or `None` when there is none.
pub fn find_config_sync(dir: &Path) -> UProjectResult<Option<UProject>> {
    let Some(config_path) = find_config_path_sync(dir)? else {
        return Ok(None);
    };

    let bytes = std::fs::read(&config_path).map_err(|source| UProjectError::Io {
        path: config_path.clone(),
        source,
    })?;

    UProject::from_slice(config_path, &bytes).map(Some)
}

/// Path of the descriptor in `dir`.
///
/// Absence is reported as [`UProjectError::ProjectNotFound`].
#[instrument]
pub async fn find_config_path(dir: &Path) -> UProjectResult<PathBuf> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|source| UProjectError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

    let mut candidates = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| UProjectError::Io {
        path: dir.to_path_buf(),
        source: e,
    })? {
        let is_dir = entry
            .file_type()
            .await
            .map(|t| t.is_dir())
            .unwrap_or(false);
        if !is_dir {
            candidates.push(entry.file_name());
        }
    }

    pick_descriptor(dir, candidates)?.ok_or_else(|| UProjectError::ProjectNotFound {
        dir: dir.to_path_buf(),
    })
}

/// Load the descriptor in `dir`.
pub async fn find_config(dir: &Path) -> UProjectResult<UProject> {
    let config_path = find_config_path(dir).await?;

    let bytes = tokio::fs::read(&config_path)
        .await
        .map_err(|source| UProjectError::Io {
            path: config_path.clone(),
            source,
        })?;

    UProject::from_slice(config_path, &bytes)
}

/// First `.uproject` entry by file name, resolved against `dir`.
fn pick_descriptor(dir: &Path, mut names: Vec<OsString>) -> UProjectResult<Option<PathBuf>> {
    names.sort();
    let Some(name) = names
        .into_iter()
        .find(|name| Path::new(name).extension() == Some(UPROJECT_EXTENSION.as_ref()))
    else {
        return Ok(None);
    };

    let resolved = absolutize(&dir.join(name))?;
    debug!("Found project descriptor {:?}", resolved);
    Ok(Some(resolved))
}

/// Anchor `path` at the current directory and fold `.` and `..` lexically.
fn absolutize(path: &Path) -> UProjectResult<PathBuf> {
    if path.is_absolute() {
        return Ok(normalize(path));
    }
    let cwd = std::env::current_dir().map_err(|source| UProjectError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(normalize(&cwd.join(path)))
}

/// `..` above the root stays at the root. Symlinks are not followed.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
