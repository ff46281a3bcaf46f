//! harbormaster — local dev coordination for the harbor CLI.
//! Runs the port allocation service that keeps concurrently spawned dev-server
//! instances from colliding on TCP ports, manages the YAML accounts config,
//! and wraps the remote REST APIs (secrets, custom objects, file mapper).

pub mod api;
pub mod config;
pub mod error;
pub mod ports;

pub use api::ApiClient;
pub use api::custom_objects::{BatchCreateResponse, ObjectSchema, SchemaLabels};
pub use api::filemapper::FileMapperNode;
pub use config::{AccountConfig, AuthType, Environment, HubConfig};
pub use error::{HarborError, Result};
pub use ports::detect::detect_port;
pub use ports::registry::{BatchAssignment, PortRegistry};
pub use ports::server::{PortCoordinator, RunningCoordinator};
pub use ports::{COORDINATION_PORT, MAX_PORT, MIN_PORT};
