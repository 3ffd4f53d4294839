//! Municipality table loading from TOML.
//!
//! The table is a single TOML document with `[[municipality]]` entries,
//! either read from disk or compiled in from
//! `municipality-definitions/municipalities.toml`.

use crate::{definition::MunicipalityEndpoint, error::Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// The default table, embedded at compile time.
const EMBEDDED_TABLE: &str =
    include_str!("../../../municipality-definitions/municipalities.toml");

/// Document shape of the definitions TOML.
#[derive(Debug, Deserialize)]
struct DefinitionsDocument {
    #[serde(default, rename = "municipality")]
    municipalities: Vec<MunicipalityEndpoint>,
}

/// Loader for the municipality definitions table.
pub struct RegistryLoader;

impl RegistryLoader {
    /// Load and validate the embedded default table.
    pub fn load_embedded() -> Result<Vec<MunicipalityEndpoint>> {
        let endpoints = Self::parse(EMBEDDED_TABLE)?;
        info!(count = endpoints.len(), "loaded embedded municipality table");
        Ok(endpoints)
    }

    /// Load and validate a definitions table from a file path.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Vec<MunicipalityEndpoint>> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(crate::error::RegistryError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(path)?;
        let endpoints = Self::parse(&contents)?;
        info!(
            count = endpoints.len(),
            path = %path.display(),
            "loaded municipality table"
        );
        Ok(endpoints)
    }

    /// Parse and validate a definitions document.
    ///
    /// Unlike a large crowd-sourced definition pack, this table is small
    /// and curated: a single invalid entry fails the whole load rather
    /// than silently shrinking every scan.
    fn parse(contents: &str) -> Result<Vec<MunicipalityEndpoint>> {
        let document: DefinitionsDocument = toml::from_str(contents)?;

        for endpoint in &document.municipalities {
            endpoint.validate()?;
        }

        Ok(document.municipalities)
    }
}
