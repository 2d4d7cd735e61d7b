//! Model capability records, version resolution and the registry.

pub mod builtin;
mod deprecation;
mod map;
mod record;
mod registry;
mod resolver;
mod version;

pub use deprecation::{DeprecationInfo, DeprecationStatus};
pub use map::CapabilityMap;
pub use record::{CapabilityRecord, TOKEN_LIMIT_PARAMS, is_token_limit_param};
pub use registry::{LoadStats, Registry, RegistrySnapshot};
pub use resolver::VersionResolver;
pub use version::ModelVersion;
