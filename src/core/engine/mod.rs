pub mod reg_query;
pub mod registry;
pub mod resolver;

pub use reg_query::{parse_query_output, RegQueryStore};
pub use registry::{
    MemoryRegistry, RegistryError, RegistryKey, RegistryListing, RegistryStore, RegistryValue,
};
pub use resolver::EngineResolver;
