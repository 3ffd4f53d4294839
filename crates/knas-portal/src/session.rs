//! Negotiated session parameters and the search-step wire shape.
//!
//! The portal's JSON is loosely typed: numeric fields arrive sometimes
//! as numbers, sometimes as strings, depending on the tenant. Both
//! shapes are accepted everywhere.

use knas_registry::MunicipalityEndpoint;
use serde::Deserialize;
use serde_json::Value;

/// Render a loosely-typed JSON scalar as the string the portal expects
/// back in later steps. Null and non-scalars yield `None`.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Raw body of the parameter-negotiation step (`setParam`).
#[derive(Debug, Deserialize)]
struct SetParamResponse {
    #[serde(rename = "Rashut")]
    authority_code: Option<Value>,
    #[serde(rename = "SwQR")]
    qr_mode: Option<Value>,
    #[serde(rename = "language")]
    language: Option<Value>,
}

/// Session parameters resolved from the portal's own negotiation
/// response.
///
/// Derived fresh for every invocation and threaded through to the
/// search and detail steps - never cached across invocations. The
/// negotiated authority code can differ from the endpoint's input code:
/// the portal is allowed to remap its tenants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParameters {
    /// Authority code as the portal resolved it
    pub authority_code: String,
    /// QR-mode flag, opaque pass-through to the detail step
    pub qr_mode: String,
    /// Language code for the detail step
    pub language: String,
}

impl SessionParameters {
    /// Parse the negotiation response body, falling back to defaults
    /// when it is not parseable JSON.
    #[must_use]
    pub fn parse(body: &str, endpoint: &MunicipalityEndpoint) -> Self {
        match serde_json::from_str::<SetParamResponse>(body) {
            Ok(response) => {
                let fallback = Self::fallback(endpoint);
                Self {
                    authority_code: response
                        .authority_code
                        .as_ref()
                        .and_then(scalar_to_string)
                        .unwrap_or(fallback.authority_code),
                    qr_mode: response
                        .qr_mode
                        .as_ref()
                        .and_then(scalar_to_string)
                        .unwrap_or_else(|| "0".to_string()),
                    language: response
                        .language
                        .as_ref()
                        .and_then(scalar_to_string)
                        .unwrap_or_else(|| "he".to_string()),
                }
            }
            Err(_) => Self::fallback(endpoint),
        }
    }

    /// Defaults used when the portal's negotiation body is not JSON:
    /// the input authority code, QR-mode on iff an access code was
    /// used, Hebrew.
    #[must_use]
    pub fn fallback(endpoint: &MunicipalityEndpoint) -> Self {
        Self {
            authority_code: endpoint.authority_code.clone(),
            qr_mode: (if endpoint.has_access_code() { "1" } else { "0" }).to_string(),
            language: "he".to_string(),
        }
    }
}

/// Raw body of the search step (`Check_Report`).
#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "C")]
    count: Option<Value>,
    #[serde(rename = "ItraSum")]
    balance: Option<Value>,
    #[serde(rename = "Nm")]
    display_name: Option<Value>,
}

impl SearchResponse {
    /// The fine count field `C`. Absent or unparseable counts read as 0.
    #[must_use]
    pub fn count(&self) -> u32 {
        match &self.count {
            Some(Value::Number(n)) => u32::try_from(n.as_u64().unwrap_or(0)).unwrap_or(u32::MAX),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }

    /// The pre-aggregated amount field `ItraSum`, when non-empty.
    #[must_use]
    pub fn balance(&self) -> Option<String> {
        self.balance
            .as_ref()
            .and_then(scalar_to_string)
            .filter(|s| !s.trim().is_empty())
    }

    /// The person display-name field `Nm`, when non-empty.
    #[must_use]
    pub fn person_name(&self) -> Option<String> {
        self.display_name
            .as_ref()
            .and_then(scalar_to_string)
            .filter(|s| !s.trim().is_empty())
    }
}
