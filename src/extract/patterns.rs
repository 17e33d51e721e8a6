//! Ordered HTML rules for locating a Wistia media ID.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::{is_wistia_id, WISTIA_ID_LEN};

/// Extraction rule, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Iframe,
    AsyncClass,
    JsEmbed,
    JsonProperty,
    DataAttribute,
    WrapperId,
    Contextual,
}

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::Iframe => "iframe",
            Rule::AsyncClass => "async_class",
            Rule::JsEmbed => "js_embed",
            Rule::JsonProperty => "json_property",
            Rule::DataAttribute => "data_attribute",
            Rule::WrapperId => "wrapper_id",
            Rule::Contextual => "contextual",
        }
    }
}

/// A located ID and the rule that found it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WistiaMatch {
    pub id: String,
    pub rule: Rule,
}

/// Anchored rules. Each has exactly one capture group holding the ID.
static RULES: LazyLock<Vec<(Rule, Regex)>> = LazyLock::new(|| {
    vec![
        (
            Rule::Iframe,
            Regex::new(
                r#"src="[^"]*(?:wistia\.com/embed/(?:iframe|medias)/|fast\.wistia\.net/embed/(?:iframe|medias)/)([a-zA-Z0-9]{10})[^"]*""#,
            )
            .unwrap(),
        ),
        (
            Rule::AsyncClass,
            Regex::new(r#"class="[^"]*wistia_async_([a-zA-Z0-9]{10})[^"]*""#).unwrap(),
        ),
        (
            Rule::JsEmbed,
            Regex::new(r#"(?i)Wistia\.embed\s*\(\s*["']([a-zA-Z0-9]{10})["']"#).unwrap(),
        ),
        (
            Rule::JsonProperty,
            Regex::new(
                r#"["'](?:wistiaId|media_key|hashed_id|videoId)["']\s*:\s*["']([a-zA-Z0-9]{10})["']"#,
            )
            .unwrap(),
        ),
        (
            Rule::DataAttribute,
            Regex::new(r#"data-(?:wistia-id|video-id)="([a-zA-Z0-9]{10})""#).unwrap(),
        ),
        (
            Rule::WrapperId,
            Regex::new(r#"(?:id|class)="[^"]*wistia_([a-zA-Z0-9]{10})[^"]*""#).unwrap(),
        ),
    ]
});

/// Any standalone 10-character token, delimited by non-alphanumerics.
static STANDALONE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]([a-zA-Z0-9]{10})[^a-zA-Z0-9]").unwrap());

/// The word the contextual rule looks around.
static WISTIA_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)wistia").unwrap());

/// Maximum run of non-alphanumerics allowed between a token and "wistia".
const CONTEXT_WINDOW: usize = 50;

/// Wistia ID extractor.
///
/// The contextual rule is a catch-all that accepts any token sitting near the
/// word "wistia". It always runs last and can be switched off.
#[derive(Debug, Clone, Copy)]
pub struct Extractor {
    contextual_fallback: bool,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            contextual_fallback: true,
        }
    }
}

impl Extractor {
    pub fn new(contextual_fallback: bool) -> Self {
        Self {
            contextual_fallback,
        }
    }

    /// Return the ID of the highest-priority rule that matches.
    pub fn extract(&self, html: &str) -> Option<WistiaMatch> {
        for (rule, regex) in RULES.iter() {
            if let Some(id) = first_capture(regex, html) {
                debug!("Wistia ID {} matched by {} rule", id, rule.as_str());
                return Some(WistiaMatch { id, rule: *rule });
            }
        }

        if self.contextual_fallback {
            if let Some(id) = contextual_match(html) {
                debug!("Wistia ID {} matched by contextual rule", id);
                return Some(WistiaMatch {
                    id,
                    rule: Rule::Contextual,
                });
            }
        }

        None
    }
}

fn first_capture(regex: &Regex, haystack: &str) -> Option<String> {
    regex
        .captures(haystack)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|id| is_wistia_id(id))
        .map(str::to_string)
}

/// Accept the first standalone token, in document order, that sits within
/// the context window of "wistia" on either side.
///
/// Candidates are collected around each "wistia" occurrence in one pass, so
/// the cost stays linear in the page size. Comparison is case-insensitive.
fn contextual_match(html: &str) -> Option<String> {
    let mut candidates = HashSet::new();
    for word in WISTIA_WORD.find_iter(html) {
        candidates.extend(token_after(html, word.end()));
        candidates.extend(token_before(html, word.start()));
    }
    if candidates.is_empty() {
        return None;
    }

    STANDALONE_TOKEN
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|token| token.as_str())
        .find(|id| candidates.contains(&id.to_ascii_lowercase()))
        .map(str::to_string)
}

/// The 10 characters following a run of at most [`CONTEXT_WINDOW`]
/// non-alphanumerics that starts at `from`.
fn token_after(html: &str, from: usize) -> Option<String> {
    let (offset, _) = html[from..]
        .char_indices()
        .enumerate()
        .find(|(_, (_, c))| c.is_ascii_alphanumeric())
        .filter(|(gap, _)| *gap <= CONTEXT_WINDOW)
        .map(|(_, found)| found)?;
    let start = from + offset;
    whole_token(html.as_bytes(), start, start + WISTIA_ID_LEN)
}

/// The 10 characters preceding a run of at most [`CONTEXT_WINDOW`]
/// non-alphanumerics that ends at `to`.
fn token_before(html: &str, to: usize) -> Option<String> {
    let (offset, _) = html[..to]
        .char_indices()
        .rev()
        .enumerate()
        .find(|(_, (_, c))| c.is_ascii_alphanumeric())
        .filter(|(gap, _)| *gap <= CONTEXT_WINDOW)
        .map(|(_, found)| found)?;
    let end = offset + 1;
    whole_token(html.as_bytes(), end.checked_sub(WISTIA_ID_LEN)?, end)
}

/// `bytes[start..end]` lowercased, if it is an alphanumeric run with no
/// alphanumeric neighbour on either side.
fn whole_token(bytes: &[u8], start: usize, end: usize) -> Option<String> {
    let token = bytes.get(start..end)?;
    let alnum_at = |i: usize| bytes.get(i).is_some_and(u8::is_ascii_alphanumeric);
    let bounded = (start == 0 || !alnum_at(start - 1)) && !alnum_at(end);
    (bounded && token.iter().all(u8::is_ascii_alphanumeric))
        .then(|| String::from_utf8_lossy(token).to_ascii_lowercase())
}
