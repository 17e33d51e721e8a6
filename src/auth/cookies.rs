//! Request-scoped session cookies backed by reqwest's cookie store.

use reqwest::cookie::{CookieStore, Jar};
use reqwest::Url;

/// Cookies collected during one login flow.
///
/// Storage follows the usual `Set-Cookie` rules: a later cookie with the same
/// name, domain and path replaces the earlier one, and domain/path scoping
/// decides which cookies are sent to a given URL.
#[derive(Debug, Default)]
pub struct CookieJar {
    jar: Jar,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store every `Set-Cookie` value from a response to `url`.
    /// Returns how many header lines were offered.
    pub fn store<'a>(&self, url: &Url, set_cookies: impl IntoIterator<Item = &'a str>) -> usize {
        let mut offered = 0;
        for value in set_cookies {
            self.jar.add_cookie_str(value, url);
            offered += 1;
        }
        offered
    }

    /// `Cookie` request header value for `url`: `a=1; b=2`, or empty.
    pub fn header_for(&self, url: &Url) -> String {
        self.jar
            .cookies(url)
            .and_then(|value| value.to_str().ok().map(str::to_string))
            .unwrap_or_default()
    }
}
