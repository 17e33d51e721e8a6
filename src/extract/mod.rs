//! Wistia ID extraction from URLs and page markup.
//!
//! Two pure entry points:
//! - [`wistia_id_from_url`] recognises embed URLs without touching the network
//! - [`Extractor`] scans fetched HTML with an ordered cascade of rules

mod patterns;
mod url;

pub use patterns::{Extractor, Rule, WistiaMatch};
pub use url::wistia_id_from_url;

/// Length of every Wistia media ID.
pub const WISTIA_ID_LEN: usize = 10;

/// Check that a string has the Wistia ID shape (10 ASCII alphanumerics).
pub fn is_wistia_id(s: &str) -> bool {
    s.len() == WISTIA_ID_LEN && s.bytes().all(|b| b.is_ascii_alphanumeric())
}
