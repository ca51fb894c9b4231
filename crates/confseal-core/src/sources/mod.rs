//! Property sources and the registry that orders them
//!
//! - `PropertySource`: named, prioritized raw key/value pairs
//! - `SourceRegistry`: ordered set of sources with atomic snapshot swaps
//! - `SourceLoader`: produces sources (`FileSourceLoader`, `MemorySourceLoader`)

mod source;
mod traits;
mod registry;
mod memory;
mod file;

pub use source::PropertySource;
pub use traits::{SourceLoader, SourceError, SourceResult};
pub use registry::{SourceRegistry, SourceSnapshot, PriorityUpdate, RegistryError, RegistryResult};
pub use memory::MemorySourceLoader;
pub use file::{FileSourceLoader, SourceSpec, load_file, parse_properties, parse_yaml, parse_json};
