//! Shared User-Agent string for API and PDF download traffic.

/// Project URL for User-Agent identification (good citizenship; RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/hcss-utils/unpaywall";

/// Default User-Agent for all requests (identifies the tool).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("unpaywaller/{version} (open-access-harvester; +{PROJECT_UA_URL})")
}
