//! Page iteration and session-id substitution.
//!
//! A [`PageIterator`] supplies the URLs of pages after the first one. Any
//! URL containing the session placeholder gets the resolved session id
//! substituted before it is fetched.

use regex::Regex;
use url::Url;

use crate::config::SESSION_ID_PLACEHOLDER;
use crate::error::{parse_url, Result};

/// Pull-based supplier of subsequent page URLs.
pub trait PageIterator {
    /// URL of the next page, possibly containing the session placeholder.
    fn next_url(&mut self) -> String;

    /// Whether the supplier has another page.
    fn has_next(&self) -> bool;

    /// Base used to resolve relative links found on these pages.
    fn base_url(&self) -> Option<Url> {
        None
    }
}

/// Numbered pages generated from a template containing `{page}`.
#[derive(Debug, Clone)]
pub struct PageTemplate {
    template: String,
    /// `None` once the range is exhausted.
    next: Option<u32>,
    last: u32,
    base_url: Option<Url>,
}

impl PageTemplate {
    /// Pages `first..=last`.
    pub fn new(template: &str, first: u32, last: u32) -> Self {
        Self {
            template: template.to_string(),
            next: (first <= last).then_some(first),
            last,
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }
}

impl PageIterator for PageTemplate {
    fn next_url(&mut self) -> String {
        let page = self.next.unwrap_or(self.last);
        self.next = page.checked_add(1).filter(|n| *n <= self.last);
        self.template.replace("{page}", &page.to_string())
    }

    fn has_next(&self) -> bool {
        self.next.is_some()
    }

    fn base_url(&self) -> Option<Url> {
        self.base_url.clone()
    }
}

/// A resolved session identifier and the token it replaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId {
    pub placeholder: String,
    pub value: String,
}

impl SessionId {
    pub fn new(value: &str) -> Self {
        Self::with_placeholder(SESSION_ID_PLACEHOLDER, value)
    }

    pub fn with_placeholder(placeholder: &str, value: &str) -> Self {
        Self {
            placeholder: placeholder.to_string(),
            value: value.to_string(),
        }
    }
}

/// Substitute the session id into `raw` (when it carries the placeholder) and parse it.
pub fn resolve_page_url(raw: &str, session: Option<&SessionId>) -> Result<Url> {
    match session {
        Some(s) if raw.contains(&s.placeholder) => parse_url(&raw.replace(&s.placeholder, &s.value)),
        None if raw.contains(SESSION_ID_PLACEHOLDER) => {
            tracing::warn!(url = raw, "Session placeholder present but no session id resolved");
            parse_url(raw)
        }
        _ => parse_url(raw),
    }
}

/// Find `keyword=<value>` in page markup and return the value.
pub fn extract_session_id(markup: &str, keyword: &str) -> Option<String> {
    let pattern = format!(r#"{}\s*=\s*["']?([^&"'\s;<>?#/]+)"#, regex::escape(keyword));
    let re = Regex::new(&pattern).ok()?;
    re.captures(markup)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Pull up to `pages` URLs from `iterator` and extract each page with `extract`.
///
/// Stops early once the iterator reports no further pages. Pages whose URL
/// is malformed or whose extraction fails are logged and contribute nothing.
pub fn paginate<T, I>(
    iterator: &mut I,
    pages: usize,
    session: Option<&SessionId>,
    mut extract: impl FnMut(&Url) -> Result<Vec<T>>,
) -> Vec<T>
where
    I: PageIterator + ?Sized,
{
    let mut results = Vec::new();
    for page in 1..=pages {
        if !iterator.has_next() {
            tracing::info!(page, "Page iterator exhausted");
            break;
        }
        let raw = iterator.next_url();
        let url = match resolve_page_url(&raw, session) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(page, url = %raw, error = %e, "Skipping page with bad URL");
                continue;
            }
        };
        tracing::info!(page, url = %url, "Fetching page");
        match extract(&url) {
            Ok(found) => {
                tracing::debug!(page, count = found.len(), "Page extracted");
                results.extend(found);
            }
            Err(e) => tracing::warn!(page, url = %url, error = %e, "Skipping page"),
        }
    }
    results
}
