//! The seam between the orchestrator and the portal protocol.

use async_trait::async_trait;
use knas_core::MunicipalityResult;
use knas_portal::PortalClient;
use knas_registry::MunicipalityEndpoint;

/// Checks one municipality for one identity/vehicle pair.
///
/// Implemented by [`PortalClient`] in production; tests substitute a
/// stub so orchestration properties can be exercised without a portal.
/// Implementations must be self-contained per call: no state carried
/// across invocations.
#[async_trait]
pub trait MunicipalityChecker: Send + Sync {
    /// Run one municipality check. Never fails: every failure mode is
    /// a `failed` result.
    async fn check(
        &self,
        endpoint: &MunicipalityEndpoint,
        id_number: &str,
        vehicle_number: &str,
    ) -> MunicipalityResult;
}

#[async_trait]
impl MunicipalityChecker for PortalClient {
    async fn check(
        &self,
        endpoint: &MunicipalityEndpoint,
        id_number: &str,
        vehicle_number: &str,
    ) -> MunicipalityResult {
        PortalClient::check(self, endpoint, id_number, vehicle_number).await
    }
}
