//! Municipality endpoint definition.

use crate::error::{RegistryError, Result};
use serde::{Deserialize, Serialize};

/// Municipal-title prefixes stripped when deriving display initials.
const TITLE_PREFIXES: &[&str] = &[
    "עיריית ",
    "מועצה מקומית ",
    "מועצה אזורית ",
    "מ.א. ",
    "מ.א ",
    "מ.מ. ",
    "מ.מ ",
    "רשות ",
];

/// One municipality's portal endpoint configuration.
///
/// Identifies a tenant of the shared legacy portal. Immutable: defined
/// at process start from the definitions table and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MunicipalityEndpoint {
    /// Display name (Hebrew in the shipped table)
    pub name: String,

    /// Tenant identifier the portal uses to select this municipality
    pub authority_code: String,

    /// Report-type code for the fine-lookup flow
    pub report_type_code: String,

    /// Pre-resolved compound access code, when this tenant has one.
    /// Bypasses the authority/report-type negotiation step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_code: Option<String>,
}

impl MunicipalityEndpoint {
    /// Validate the endpoint definition for completeness.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(RegistryError::Validation {
                name: self.name.clone(),
                reason: "name cannot be empty".to_string(),
            });
        }

        if self.authority_code.trim().is_empty() {
            return Err(RegistryError::Validation {
                name: self.name.clone(),
                reason: "authority_code cannot be empty".to_string(),
            });
        }

        if self.report_type_code.trim().is_empty() {
            return Err(RegistryError::Validation {
                name: self.name.clone(),
                reason: "report_type_code cannot be empty".to_string(),
            });
        }

        if let Some(code) = &self.access_code {
            if code.trim().is_empty() {
                return Err(RegistryError::Validation {
                    name: self.name.clone(),
                    reason: "access_code, when present, cannot be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Whether this tenant resolves via a pre-resolved access code.
    #[must_use]
    pub fn has_access_code(&self) -> bool {
        self.access_code.is_some()
    }

    /// Two-character initials for avatar display: the name with the
    /// municipal title prefix stripped, truncated to two characters.
    #[must_use]
    pub fn initials(&self) -> String {
        let mut short = self.name.as_str();
        for prefix in TITLE_PREFIXES {
            if let Some(stripped) = short.strip_prefix(prefix) {
                short = stripped;
                break;
            }
        }
        short.chars().take(2).collect()
    }
}
