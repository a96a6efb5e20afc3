use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::{UProjectError, UProjectResult};

const APP_DIR_NAME: &str = "uproject";
const CONFIG_FILE: &str = "engine_registry.json";

/// Registry locations the engine resolver queries.
///
/// Keys use the `HIVE\path\to\key` form understood by `reg.exe`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineRegistryConfig {
    /// Parent key of launcher installs; the engine association is appended.
    pub installs_root: String,
    /// Key whose values map engine associations to source-build directories.
    pub builds_root: String,
    /// Value under an install key that holds its directory.
    pub installed_directory_value: String,
}

impl Default for EngineRegistryConfig {
    fn default() -> Self {
        Self {
            installs_root: r"HKLM\SOFTWARE\EpicGames\Unreal Engine".to_string(),
            builds_root: r"HKCU\SOFTWARE\Epic Games\Unreal Engine\Builds".to_string(),
            installed_directory_value: "InstalledDirectory".to_string(),
        }
    }
}

impl EngineRegistryConfig {
    /// Key of the install registration for `association`.
    pub fn install_key(&self, association: &str) -> String {
        join_key(&self.installs_root, association)
    }

    /// Load from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> UProjectResult<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                debug!("No registry config at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(UProjectError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&raw)
            .map_err(|e| UProjectError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load from the per-user config location, if one can be determined.
    pub fn load_default() -> UProjectResult<Self> {
        match default_config_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }
}

/// `<config dir>/uproject/engine_registry.json`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE))
}

fn join_key(root: &str, child: &str) -> String {
    format!("{}\\{}", root.trim_end_matches('\\'), child)
}
