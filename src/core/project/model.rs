use std::path::{Path, PathBuf};

use tracing::debug;

use super::descriptor::{ModuleDescriptor, PluginReference, ProjectDescriptor};
use crate::core::engine::{EngineResolver, RegistryStore};
use crate::core::error::{UProjectError, UProjectResult};
use crate::core::targets::{self, HostPlatform, Target};

/// A project descriptor loaded from disk.
///
/// Identity (`name`, `dirname`) is always derived from `path`, never stored
/// next to it. Once built the value is immutable and can be shared freely
/// between the engine resolver and the target generator.
#[derive(Debug, Clone, PartialEq)]
pub struct UProject {
    path: PathBuf,
    descriptor: ProjectDescriptor,
}

impl UProject {
    /// Decode `bytes` as the descriptor found at `path`.
    ///
    /// Decode failures propagate as [`UProjectError::Parse`].
    pub fn from_slice(path: impl Into<PathBuf>, bytes: &[u8]) -> UProjectResult<Self> {
        let path = path.into();
        let descriptor = ProjectDescriptor::from_slice(bytes).map_err(|source| {
            UProjectError::Parse {
                path: path.clone(),
                source,
            }
        })?;

        debug!(
            "Loaded project descriptor {:?} (engine: {:?})",
            path, descriptor.engine_association
        );
        Ok(Self { path, descriptor })
    }

    /// Wrap an already decoded descriptor.
    pub fn new(path: impl Into<PathBuf>, descriptor: ProjectDescriptor) -> Self {
        Self {
            path: path.into(),
            descriptor,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Descriptor file name without its extension.
    pub fn name(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Directory holding the descriptor.
    pub fn dirname(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// Raw `EngineAssociation` field; absent and empty are kept as-is.
    pub fn engine_association(&self) -> Option<&str> {
        self.descriptor.engine_association.as_deref()
    }

    pub fn file_version(&self) -> Option<u32> {
        self.descriptor.file_version
    }

    pub fn modules(&self) -> &[ModuleDescriptor] {
        &self.descriptor.modules
    }

    pub fn plugins(&self) -> &[PluginReference] {
        &self.descriptor.plugins
    }

    /// Names of the plugins the descriptor explicitly enables.
    pub fn enabled_plugins(&self) -> impl Iterator<Item = &str> {
        self.descriptor
            .plugins
            .iter()
            .filter(|p| p.enabled)
            .map(|p| p.name.as_str())
    }

    pub fn descriptor(&self) -> &ProjectDescriptor {
        &self.descriptor
    }

    /// Resolve the engine install directory using the system registry.
    pub async fn engine_directory(&self) -> UProjectResult<PathBuf> {
        let resolver = EngineResolver::system()?;
        self.engine_directory_with(&resolver).await
    }

    /// Resolve the engine install directory against a specific store.
    pub async fn engine_directory_with<S>(
        &self,
        resolver: &EngineResolver<S>,
    ) -> UProjectResult<PathBuf>
    where
        S: RegistryStore + 'static,
    {
        resolver
            .resolve(self.engine_association().unwrap_or_default())
            .await
    }

    /// Targets buildable on the host this process runs on.
    pub fn available_targets(&self) -> UProjectResult<Vec<Target>> {
        self.targets_for(&HostPlatform::current())
    }

    /// Targets buildable on `platform`.
    pub fn targets_for(&self, platform: &HostPlatform) -> UProjectResult<Vec<Target>> {
        targets::available_targets(&self.name(), platform)
    }
}
