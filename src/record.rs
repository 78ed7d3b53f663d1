//! Metadata records returned by the lookup API.
//!
//! Records are kept as ordered JSON maps: the API schema is large and only a
//! handful of fields are ever read. Those few are exposed through typed,
//! optional views so a missing, null, or oddly shaped value never panics.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field under which the stable row identifier is stored in every record.
pub const ID_FIELD: &str = "uuid";

/// Top-level keys stripped from records before persistence by default.
pub const DEFAULT_IRRELEVANT_FIELDS: [&str; 3] =
    ["first_oa_location", "oa_locations", "oa_locations_embargoed"];

/// A metadata record: the API response body plus the attached identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataRecord {
    fields: Map<String, Value>,
}

/// Typed view of an open-access location object.
///
/// Only the fields the fetch workflow reads are modelled; everything else in
/// the object is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OaLocation {
    /// Direct link to a PDF, when the location has one.
    #[serde(default)]
    pub url_for_pdf: Option<String>,
    /// Landing page URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Hosting type reported by the API (`publisher`, `repository`).
    #[serde(default)]
    pub host_type: Option<String>,
}

impl MetadataRecord {
    /// Wraps an already-parsed JSON object.
    #[must_use]
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Returns the raw field map.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Returns a single field value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The DOI echoed back by the API, if present as a string.
    #[must_use]
    pub fn doi(&self) -> Option<&str> {
        self.fields.get("doi").and_then(Value::as_str)
    }

    /// The attached row identifier, if present as a string.
    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        self.fields.get(ID_FIELD).and_then(Value::as_str)
    }

    /// Sets (or replaces) the row identifier.
    pub fn attach_identifier(&mut self, id: &str) {
        self.fields
            .insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    }

    /// Removes every listed top-level key.
    pub fn strip_fields<S: AsRef<str>>(&mut self, keys: &[S]) {
        for key in keys {
            self.fields.shift_remove(key.as_ref());
        }
    }

    /// The best open-access location, when it is a JSON object.
    ///
    /// `null`, a missing key, and any non-object value all map to `None`.
    #[must_use]
    pub fn best_oa_location(&self) -> Option<OaLocation> {
        match self.fields.get("best_oa_location") {
            Some(value @ Value::Object(_)) => serde_json::from_value(value.clone()).ok(),
            _ => None,
        }
    }

    /// Direct PDF link from the best open-access location.
    #[must_use]
    pub fn pdf_url(&self) -> Option<String> {
        self.best_oa_location()
            .and_then(|location| location.url_for_pdf)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
    }
}
