//! Locate an Unreal project descriptor (`.uproject`), resolve the engine
//! install it is associated with, and list the targets buildable on the
//! current host.
//!
//! ```no_run
//! # async fn run() -> uproject::UProjectResult<()> {
//! let project = uproject::find_config(std::path::Path::new(".")).await?;
//! let engine_dir = project.engine_directory().await?;
//! for target in project.available_targets()? {
//!     println!("{target} ({})", engine_dir.display());
//! }
//! # Ok(())
//! # }
//! ```

pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::config::EngineRegistryConfig;
pub use crate::core::engine::{
    EngineResolver, MemoryRegistry, RegQueryStore, RegistryError, RegistryKey, RegistryListing,
    RegistryStore, RegistryValue,
};
pub use crate::core::error::{UProjectError, UProjectResult};
pub use crate::core::project::{
    find_config, find_config_path, find_config_path_sync, find_config_sync, ProjectDescriptor,
    UProject,
};
pub use crate::core::targets::{Configuration, HostPlatform, Target, TargetPlatform};

/// Install a `fmt` subscriber filtered by `RUST_LOG`
/// (default `info,uproject=debug`). Does nothing if one is already set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,uproject=debug")),
        )
        .try_init();
}
