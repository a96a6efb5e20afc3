pub mod descriptor;
pub mod finder;
pub mod model;

pub use descriptor::{ModuleDescriptor, PluginReference, ProjectDescriptor};
pub use finder::{
    find_config, find_config_path, find_config_path_sync, find_config_sync, UPROJECT_EXTENSION,
};
pub use model::UProject;
