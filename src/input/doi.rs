//! DOI normalization for input rows.

use std::sync::LazyLock;

use regex::Regex;

/// Strips resolver URL and `doi:` prefixes: `https://doi.org/`, `http://dx.doi.org/`, `DOI: `.
#[allow(clippy::expect_used)]
static DOI_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:https?://(?:dx\.)?doi\.org/|doi:\s*)")
        .expect("DOI prefix regex is valid") // Static pattern, safe to panic
});

/// Normalizes a raw DOI cell.
///
/// Trims whitespace and strips resolver prefixes. The DOI itself is not
/// validated: whatever the API makes of it decides the outcome. Returns
/// `None` only when nothing is left.
///
/// # Examples
///
/// ```
/// use unpaywaller_core::input::normalize_doi;
///
/// assert_eq!(
///     normalize_doi(" https://doi.org/10.1016/j.intell.2017.01.008 ").as_deref(),
///     Some("10.1016/j.intell.2017.01.008")
/// );
/// assert!(normalize_doi("doi:  ").is_none());
/// ```
#[must_use]
pub fn normalize_doi(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let stripped = DOI_PREFIX.replace(trimmed, "");
    let candidate = stripped.trim();
    (!candidate.is_empty()).then(|| candidate.to_string())
}
