//! Unpaywall metadata lookups.
//!
//! [`UnpaywallClient`] issues `GET <base>/<doi>?email=<contact>` and
//! classifies the response:
//!
//! - 2xx with a JSON object body → [`LookupOutcome::Found`]
//! - 404 → [`LookupOutcome::NotFound`] (expected; the API's `message` is kept)
//! - 403 → [`LookupOutcome::Forbidden`] (expected)
//! - any other status, transport failure, or unusable body → [`ApiError`]

mod client;
mod error;

pub use client::{LookupOutcome, UnpaywallClient};
pub use error::ApiError;
