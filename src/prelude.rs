//! Prelude module for convenient imports.
//!
//! ```rust
//! use model_registry::prelude::*;
//! ```

pub use crate::Error;
pub use crate::Result;

pub use crate::config::{RegistryConfig, RegistryData};
pub use crate::constraints::{ConstraintDefinition, ParamValue, ParameterReference};
pub use crate::models::{CapabilityRecord, ModelVersion, Registry};
pub use crate::pricing::PricingInfo;
