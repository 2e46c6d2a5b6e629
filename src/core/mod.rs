pub mod coerce;
pub mod config;
pub mod connector;
pub mod envelope;
pub mod error;
pub mod geo;
pub mod helper;
pub mod helpers;
pub mod registry;
pub mod runner;
pub mod schema;
pub mod types;

pub use config::{ConfigLoader, ConfigValidator, HelpersConfig};
pub use connector::{ConnectorError, CrmConnector, InMemoryConnector};
pub use envelope::{Action, ActionType, HelperFailure, HelperInput, HelperOutput};
pub use error::AppError;
pub use geo::{GeoLocation, GeoLookup, GeoLookupError, HttpGeoLookup};
pub use helper::{ExecutionContext, Helper, HelperMetadata, HelperSettings};
pub use registry::{HelperInfo, HelperRegistry, HelperRegistryBuilder};
pub use runner::{run_step, StepRequest};
pub use schema::{ConfigSchema, PropertySchema, SchemaType};
pub use types::*;
