//! Anti-forgery token scraping from a login page.

use scraper::{Html, Selector};

/// Meta tag Rails-style sites use to publish the CSRF token.
const CSRF_META: &str = r#"meta[name="csrf-token"]"#;

/// Find the login form's anti-forgery token.
///
/// A hidden input named `field` wins over the `csrf-token` meta tag.
pub fn extract_authenticity_token(html: &str, field: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let input = format!(r#"input[name="{}"]"#, field);
    let lookups = [(input.as_str(), "value"), (CSRF_META, "content")];

    for (selector_str, attr) in lookups {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        if let Some(token) = document
            .select(&selector)
            .filter_map(|el| el.value().attr(attr))
            .find(|v| !v.is_empty())
        {
            return Some(token.to_string());
        }
    }

    None
}
