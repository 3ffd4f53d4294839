//! Immutable in-memory municipality registry.

use crate::{
    definition::MunicipalityEndpoint,
    error::{RegistryError, Result},
    loader::RegistryLoader,
};
use std::path::Path;

/// The frozen set of municipality endpoints for this process.
///
/// Built once from the definitions table and never mutated. Scan
/// orchestration treats the entry order as the dispatch order, so it is
/// preserved exactly as the table lists it.
#[derive(Debug, Clone)]
pub struct MunicipalityRegistry {
    endpoints: Vec<MunicipalityEndpoint>,
}

impl MunicipalityRegistry {
    /// Build a registry from already-validated endpoints.
    #[must_use]
    pub fn new(endpoints: Vec<MunicipalityEndpoint>) -> Self {
        Self { endpoints }
    }

    /// Build a registry from the embedded default table.
    pub fn embedded() -> Result<Self> {
        Ok(Self::new(RegistryLoader::load_embedded()?))
    }

    /// Build a registry from a definitions file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(RegistryLoader::load_from_path(path)?))
    }

    /// All registered endpoints, in table order.
    #[must_use]
    pub fn endpoints(&self) -> &[MunicipalityEndpoint] {
        &self.endpoints
    }

    /// Look up an endpoint by its authority code.
    pub fn get(&self, authority_code: &str) -> Result<&MunicipalityEndpoint> {
        self.endpoints
            .iter()
            .find(|e| e.authority_code == authority_code)
            .ok_or_else(|| RegistryError::NotFound {
                authority_code: authority_code.to_string(),
            })
    }

    /// Number of registered municipalities.
    #[must_use]
    pub fn count(&self) -> usize {
        self.endpoints.len()
    }

    /// Whether the registry holds no endpoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
