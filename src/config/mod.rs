//! Configuration loading and validation.
//!
//! Defines the [`ConfigSource`] trait for pluggable config backends.
//! Submodules provide the data model, validation logic, and the
//! file-based source implementations. Configuration is loaded once at
//! startup; the resulting [`Config`] is immutable for the life of the
//! process.

pub mod model;
pub mod sources;
pub mod validation;

use async_trait::async_trait;

use crate::error::ForwarderError;
use model::Config;

// async_trait keeps the trait usable as `dyn ConfigSource`.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn load(&self) -> Result<Config, ForwarderError>;
}
