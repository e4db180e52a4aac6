//! Scorebox-State: job records and registry clients
//!
//! The job registry is an external service holding one record per job
//! (id, status, result). This crate provides the data model shared by the
//! pipeline and the CLI, plus two `JobRegistry` implementations.
//!
//! ## Key Components
//!
//! - `JobRegistry`: async trait over create/get/list/update
//! - `HttpJobRegistry`: client for the registry's HTTP API
//! - `MemoryJobRegistry`: in-memory fake used by tests

mod error;
pub mod fakes;
mod http_registry;
pub mod registry_traits;

pub use error::RegistryError;
pub use http_registry::{HttpJobRegistry, RegistryConfig, DEFAULT_REGISTRY_URL};
pub use registry_traits::{
    JobId, JobRecord, JobRegistry, JobStatus, JobUpdate, RegistryResult,
};
