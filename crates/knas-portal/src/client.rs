//! The portal session client: one isolated, cookie-bearing HTTP
//! session per municipality check, driven through the portal's
//! multi-step handshake.

use crate::error::{PortalError, Result};
use crate::extractor::extract_fines;
use crate::session::{SearchResponse, SessionParameters};
use knas_core::{MunicipalityResult, PortalConfig};
use knas_registry::MunicipalityEndpoint;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER, USER_AGENT};

/// Landing page establishing the tenant session cookies.
const BOOTSTRAP_PAGE: &str = "Default.aspx";
/// Session-parameter negotiation endpoint.
const SET_PARAM_PAGE: &str = "Menu/setParam.aspx";
/// Session-advancement page; fetched purely for its cookie side effect.
const ADVANCE_PAGE: &str = "step1.aspx";
/// Report-check (search) endpoint.
const SEARCH_PAGE: &str = "Check_Report.aspx";
/// Detail-listing page, scraped when the search answer is ambiguous.
const DETAIL_PAGE: &str = "step2.aspx";

/// Ordering code sent on the search and detail steps. The two observed
/// deployments disagree (1 vs 2) and the portals accept either; kept in
/// one place in case a tenant turns out to care.
const ORDER_CODE: &str = "1";

/// What the search step's answer means for this municipality.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SearchOutcome {
    /// Count of zero: no fines here
    Clean,
    /// Positive count with the portal's own aggregated amount
    Fine {
        count: u32,
        amount: String,
        person_name: Option<String>,
    },
    /// Positive count without an amount. Some tenants report a
    /// portal-wide count here, not a personal one; the detail page
    /// decides.
    Ambiguous { count: u32 },
}

fn classify_search(search: &SearchResponse) -> SearchOutcome {
    let count = search.count();
    if count == 0 {
        return SearchOutcome::Clean;
    }
    match search.balance() {
        Some(amount) => SearchOutcome::Fine {
            count,
            amount,
            person_name: search.person_name(),
        },
        None => SearchOutcome::Ambiguous { count },
    }
}

/// Settle an ambiguous search answer with the detail page's verdict.
///
/// Zero extracted rows confirm the count was tenant-wide, not
/// personal: the result is `clean`. A non-200 detail answer fails the
/// check. Any other detail failure fails open toward `fine` with an
/// "amount unknown" placeholder - the positive count was never
/// disconfirmed, so this path must not report clean.
fn settle_ambiguous(
    endpoint: &MunicipalityEndpoint,
    count: u32,
    detail: Result<String>,
) -> MunicipalityResult {
    match detail {
        Ok(html) => {
            let extracted = extract_fines(&html);
            if extracted.items.is_empty() {
                tracing::debug!(
                    municipality = %endpoint.name,
                    count,
                    "ambiguous count disconfirmed by empty detail page"
                );
                MunicipalityResult::clean(&endpoint.name)
            } else {
                let amount = extracted.amount_text();
                MunicipalityResult::fine_with_items(&endpoint.name, amount, extracted.items)
            }
        }
        Err(err @ PortalError::DetailHttpStatus { .. }) => {
            MunicipalityResult::failed(&endpoint.name, err.to_string())
        }
        Err(err) => MunicipalityResult::fine(
            &endpoint.name,
            count,
            format!("unknown (detail page failed: {err})"),
            None,
        ),
    }
}

/// Client for the shared legacy portal system.
///
/// Holds only configuration; every [`check`](PortalClient::check) call
/// builds a fresh HTTP client with its own cookie store, so no session
/// state is ever shared across municipalities or across calls.
#[derive(Debug, Clone)]
pub struct PortalClient {
    config: PortalConfig,
}

impl PortalClient {
    /// Create a client from portal configuration.
    #[must_use]
    pub fn new(config: PortalConfig) -> Self {
        Self { config }
    }

    /// Check one municipality for fines against one identity/vehicle
    /// pair.
    ///
    /// Produces exactly one result and never returns an error: every
    /// failure path - timeout, refused connection, bad status, non-JSON
    /// body - folds into a `failed` result for this municipality only.
    pub async fn check(
        &self,
        endpoint: &MunicipalityEndpoint,
        id_number: &str,
        vehicle_number: &str,
    ) -> MunicipalityResult {
        match self.run_protocol(endpoint, id_number, vehicle_number).await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(
                    municipality = %endpoint.name,
                    error = %err,
                    "municipality check failed"
                );
                MunicipalityResult::failed(&endpoint.name, err.to_string())
            }
        }
    }

    /// Drive the full handshake. Errors surfacing here become a
    /// `failed` result in [`check`](PortalClient::check).
    async fn run_protocol(
        &self,
        endpoint: &MunicipalityEndpoint,
        id_number: &str,
        vehicle_number: &str,
    ) -> Result<MunicipalityResult> {
        let http = self.build_session()?;
        let bootstrap_url = self.bootstrap_url(endpoint);

        // Step 1: establish session cookies. The body is discarded and
        // a failure here is not separately detected - the protocol
        // continues and any downstream failure surfaces uniformly.
        http.get(&bootstrap_url)
            .timeout(self.config.short_timeout())
            .send()
            .await?;

        // Step 2: negotiate session parameters. The negotiated values
        // feed the search and detail steps; they are never re-derived.
        let session = self
            .negotiate_parameters(&http, endpoint, &bootstrap_url)
            .await?;

        // Step 3: advance the session; response ignored.
        http.get(self.page_url(ADVANCE_PAGE))
            .timeout(self.config.short_timeout())
            .header(REFERER, &bootstrap_url)
            .send()
            .await?;

        // Step 4: search.
        let search = self.search(&http, endpoint, id_number, vehicle_number).await?;

        match classify_search(&search) {
            SearchOutcome::Clean => Ok(MunicipalityResult::clean(&endpoint.name)),
            SearchOutcome::Fine {
                count,
                amount,
                person_name,
            } => Ok(MunicipalityResult::fine(
                &endpoint.name,
                count,
                amount,
                person_name,
            )),
            SearchOutcome::Ambiguous { count } => Ok(self
                .resolve_ambiguous(&http, endpoint, &session, id_number, vehicle_number, count)
                .await),
        }
    }

    /// Step 2: POST the negotiation form and parse the session
    /// parameters, falling back to defaults on a non-JSON body.
    async fn negotiate_parameters(
        &self,
        http: &reqwest::Client,
        endpoint: &MunicipalityEndpoint,
        bootstrap_url: &str,
    ) -> Result<SessionParameters> {
        let form: Vec<(&str, &str)> = match &endpoint.access_code {
            Some(code) => vec![("action", "getData"), ("a", code)],
            None => vec![
                ("action", "getData"),
                ("ReportType", &endpoint.report_type_code),
                ("Rashut", &endpoint.authority_code),
                ("language", ""),
                ("SwShow", ""),
                ("TK", ""),
            ],
        };

        let body = http
            .post(self.page_url(SET_PARAM_PAGE))
            .timeout(self.config.short_timeout())
            .header(REFERER, bootstrap_url)
            .header("X-Requested-With", "XMLHttpRequest")
            .form(&form)
            .send()
            .await?
            .text()
            .await?;

        Ok(SessionParameters::parse(&body, endpoint))
    }

    /// Step 4: POST the report-check form and parse its JSON body.
    async fn search(
        &self,
        http: &reqwest::Client,
        endpoint: &MunicipalityEndpoint,
        id_number: &str,
        vehicle_number: &str,
    ) -> Result<SearchResponse> {
        let response = http
            .post(self.page_url(SEARCH_PAGE))
            .timeout(self.config.long_timeout())
            .header(REFERER, self.page_url(ADVANCE_PAGE))
            .header(ORIGIN, self.config.base_url.clone())
            .header("X-Requested-With", "XMLHttpRequest")
            .form(&[
                ("status", "Check_Report"),
                ("StrFind", vehicle_number),
                ("ReportNo", id_number),
                ("ReportType", &endpoint.report_type_code),
                ("tokenCaptcha", ""),
                ("SwShow", ""),
                ("SwOrder", ORDER_CODE),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortalError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|_| PortalError::NotJson)
    }

    /// Step 5: fetch the detail page and let its data rows resolve the
    /// ambiguous search answer.
    async fn resolve_ambiguous(
        &self,
        http: &reqwest::Client,
        endpoint: &MunicipalityEndpoint,
        session: &SessionParameters,
        id_number: &str,
        vehicle_number: &str,
        count: u32,
    ) -> MunicipalityResult {
        let detail = self
            .fetch_detail(http, endpoint, session, id_number, vehicle_number, count)
            .await;
        settle_ambiguous(endpoint, count, detail)
    }

    /// GET the detail-listing page, parameterized with the negotiated
    /// session values (not the raw endpoint inputs).
    async fn fetch_detail(
        &self,
        http: &reqwest::Client,
        endpoint: &MunicipalityEndpoint,
        session: &SessionParameters,
        id_number: &str,
        vehicle_number: &str,
        count: u32,
    ) -> Result<String> {
        let response = http
            .get(self.page_url(DETAIL_PAGE))
            .timeout(self.config.long_timeout())
            .header(REFERER, self.page_url(ADVANCE_PAGE))
            .query(&[
                ("StrFind", vehicle_number),
                ("ReportNo", id_number),
                ("status", "GetDetails"),
                ("ReportType", &endpoint.report_type_code),
                ("DochC", &count.to_string()),
                ("SwQR", &session.qr_mode),
                ("language", &session.language),
                ("Rashut", &session.authority_code),
                ("SwOrder", ORDER_CODE),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortalError::DetailHttpStatus {
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }

    /// Build the fresh, isolated HTTP session for one invocation.
    fn build_session(&self) -> Result<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        if let Ok(value) = HeaderValue::from_str(&self.config.user_agent) {
            headers.insert(USER_AGENT, value);
        }
        if let Ok(value) = HeaderValue::from_str(&self.config.accept_language) {
            headers.insert(ACCEPT_LANGUAGE, value);
        }

        Ok(reqwest::Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .build()?)
    }

    /// Landing-page URL: access-code form when the tenant has one,
    /// otherwise the two-field authority/report-type form.
    fn bootstrap_url(&self, endpoint: &MunicipalityEndpoint) -> String {
        match &endpoint.access_code {
            Some(code) => format!("{}/{}?a={}", self.config.base_url, BOOTSTRAP_PAGE, code),
            None => format!(
                "{}/{}?ReportType={}&Rashut={}",
                self.config.base_url,
                BOOTSTRAP_PAGE,
                endpoint.report_type_code,
                endpoint.authority_code
            ),
        }
    }

    fn page_url(&self, page: &str) -> String {
        format!("{}/{}", self.config.base_url, page)
    }
}
