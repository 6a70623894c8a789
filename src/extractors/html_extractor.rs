//! Progressive document narrowing.
//!
//! An [`HtmlExtractor`] holds an ordered list of [`Manipulator`] steps. The
//! target page is fetched and every step is applied, in insertion order, to
//! the fragment produced by the step before it.

use std::collections::VecDeque;

use serde::Deserialize;
use url::Url;

use super::element_selector::{Matcher, TagOccurrence};
use crate::dom::{elements_named, html_from, parse};
use crate::error::{parse_url, Result, ScrapeError};
use crate::fetch::Fetch;

fn any_tag() -> String {
    "*".to_string()
}

/// One narrowing step.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Manipulator {
    /// The n-th element named `tag`.
    Nth {
        tag: String,
        #[serde(default)]
        occurrence: usize,
        #[serde(default)]
        matcher: Option<Matcher>,
    },
    /// The first element named `tag` with this id.
    Id {
        #[serde(default = "any_tag")]
        tag: String,
        id: String,
        #[serde(default)]
        matcher: Option<Matcher>,
    },
    /// The n-th element named `tag` carrying this class.
    Class {
        #[serde(default = "any_tag")]
        tag: String,
        class: String,
        #[serde(default)]
        occurrence: usize,
        #[serde(default)]
        matcher: Option<Matcher>,
    },
    /// Everything from the n-th `tag` element to the end of the fragment.
    After {
        tag: String,
        #[serde(default)]
        occurrence: usize,
        #[serde(default)]
        matcher: Option<Matcher>,
    },
    /// Each `open` element paired with the `close` element that follows it,
    /// rewritten as a `<dl>` of `<dt>`/`<dd>` pairs.
    ///
    /// Consecutive opens queue up and take the following closes in order;
    /// opens left without a close are dropped.
    Pair {
        open: String,
        close: String,
        #[serde(default)]
        matcher: Option<Matcher>,
    },
}

impl Manipulator {
    pub fn nth(tag: &str, occurrence: usize) -> Self {
        Manipulator::Nth {
            tag: tag.to_string(),
            occurrence,
            matcher: None,
        }
    }

    pub fn id(tag: &str, id: &str) -> Self {
        Manipulator::Id {
            tag: tag.to_string(),
            id: id.to_string(),
            matcher: None,
        }
    }

    pub fn class(tag: &str, class: &str, occurrence: usize) -> Self {
        Manipulator::Class {
            tag: tag.to_string(),
            class: class.to_string(),
            occurrence,
            matcher: None,
        }
    }

    pub fn after(tag: &str, occurrence: usize) -> Self {
        Manipulator::After {
            tag: tag.to_string(),
            occurrence,
            matcher: None,
        }
    }

    pub fn pair(open: &str, close: &str) -> Self {
        Manipulator::Pair {
            open: open.to_string(),
            close: close.to_string(),
            matcher: None,
        }
    }

    pub fn with_matcher(mut self, matcher: Matcher) -> Self {
        self.set_matcher(matcher);
        self
    }

    fn set_matcher(&mut self, new: Matcher) {
        match self {
            Manipulator::Nth { matcher, .. }
            | Manipulator::Id { matcher, .. }
            | Manipulator::Class { matcher, .. }
            | Manipulator::After { matcher, .. }
            | Manipulator::Pair { matcher, .. } => *matcher = Some(new),
        }
    }

    fn matcher(&self) -> Option<&Matcher> {
        match self {
            Manipulator::Nth { matcher, .. }
            | Manipulator::Id { matcher, .. }
            | Manipulator::Class { matcher, .. }
            | Manipulator::After { matcher, .. }
            | Manipulator::Pair { matcher, .. } => matcher.as_ref(),
        }
    }

    fn target(&self) -> Option<TagOccurrence> {
        match self {
            Manipulator::Nth {
                tag, occurrence, ..
            }
            | Manipulator::After {
                tag, occurrence, ..
            } => Some(TagOccurrence::nth(tag, *occurrence)),
            Manipulator::Id { tag, id, .. } => Some(TagOccurrence::with_id(tag, id)),
            Manipulator::Class {
                tag,
                class,
                occurrence,
                ..
            } => Some(TagOccurrence::with_class(tag, class, *occurrence)),
            Manipulator::Pair { .. } => None,
        }
    }

    /// Apply this step to a fragment, producing the next fragment.
    pub fn apply(&self, fragment: &str) -> Result<String> {
        let document = parse(fragment);
        match (self, self.target()) {
            (Manipulator::Pair { open, close, .. }, _) => {
                Ok(pair_elements(&document, open, close, self.matcher()))
            }
            (Manipulator::After { .. }, Some(target)) => target
                .select(&document, self.matcher())
                .map(html_from)
                .ok_or_else(|| ScrapeError::not_found(target.describe())),
            (_, Some(target)) => target
                .select(&document, self.matcher())
                .map(|el| el.html())
                .ok_or_else(|| ScrapeError::not_found(target.describe())),
            (_, None) => Ok(fragment.to_string()),
        }
    }
}

fn pair_elements(
    document: &scraper::Html,
    open: &str,
    close: &str,
    matcher: Option<&Matcher>,
) -> String {
    let mut out = String::from("<dl>");
    let mut pending: VecDeque<String> = VecDeque::new();
    let mut count = 0usize;

    for el in elements_named(document.root_element(), "*") {
        let name = el.value().name();
        if !pending.is_empty() && name.eq_ignore_ascii_case(close) {
            let label = pending.pop_front().unwrap_or_default();
            let value = el.inner_html();
            if matcher.map_or(true, |m| m.is_match(&label) || m.is_match(&value)) {
                out.push_str(&format!("<dt>{label}</dt><dd>{value}</dd>"));
                count += 1;
            }
        } else if name.eq_ignore_ascii_case(open) {
            pending.push_back(el.inner_html());
        }
    }
    if !pending.is_empty() {
        tracing::debug!(open, unpaired = pending.len(), "Open elements without a close");
    }

    tracing::debug!(open, close, pairs = count, "Paired elements");
    out.push_str("</dl>");
    out
}

/// Builder for a fetch-then-narrow pipeline.
#[derive(Debug, Clone, Default)]
pub struct HtmlExtractor {
    url: Option<Url>,
    session_url: Option<Url>,
    steps: Vec<Manipulator>,
}

impl HtmlExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The page the pipeline starts from.
    pub fn url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    pub fn parse_url(self, url: &str) -> Result<Self> {
        Ok(self.url(parse_url(url)?))
    }

    pub fn target(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Visit `initial_page` before every fetch of the target, in one session.
    pub fn session_support(mut self, initial_page: Url) -> Self {
        self.session_url = Some(initial_page);
        self
    }

    pub fn clear_session_support(mut self) -> Self {
        self.session_url = None;
        self
    }

    /// Append a step after the current last one.
    pub fn add(mut self, step: Manipulator) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(&self) -> &[Manipulator] {
        &self.steps
    }

    pub fn table(self) -> Self {
        self.table_at(0)
    }

    pub fn table_at(self, occurrence: usize) -> Self {
        self.add(Manipulator::nth("table", occurrence))
    }

    /// First table whose markup contains `text`.
    pub fn table_containing(self, text: &str) -> Self {
        self.table().matching(text)
    }

    pub fn table_with_id(self, id: &str) -> Self {
        self.add(Manipulator::id("table", id))
    }

    pub fn div_with_id(self, id: &str) -> Self {
        self.add(Manipulator::id("div", id))
    }

    /// Element of any tag with this id.
    pub fn id(self, id: &str) -> Self {
        self.add(Manipulator::id("*", id))
    }

    pub fn of_class(self, class: &str) -> Self {
        self.of_class_at(class, 0)
    }

    pub fn of_class_at(self, class: &str, occurrence: usize) -> Self {
        self.add(Manipulator::class("*", class, occurrence))
    }

    pub fn after(self, tag: &str, occurrence: usize) -> Self {
        self.add(Manipulator::after(tag, occurrence))
    }

    pub fn pair(self, open: &str, close: &str) -> Self {
        self.add(Manipulator::pair(open, close))
    }

    /// Restrict the most recently added step to candidates containing `text`.
    pub fn matching(self, text: &str) -> Self {
        self.with_last_matcher(Matcher::contains(text))
    }

    /// Restrict the most recently added step to candidates matching a regex.
    pub fn matching_pattern(self, pattern: &str) -> Result<Self> {
        Ok(self.with_last_matcher(Matcher::pattern(pattern)?))
    }

    fn with_last_matcher(mut self, matcher: Matcher) -> Self {
        match self.steps.last_mut() {
            Some(step) => step.set_matcher(matcher),
            None => tracing::warn!(?matcher, "Matcher ignored: no step to attach it to"),
        }
        self
    }

    /// Fold every step over `document`; an empty chain returns it unchanged.
    pub fn narrow(&self, document: &str) -> Result<String> {
        self.steps
            .iter()
            .enumerate()
            .try_fold(document.to_string(), |fragment, (i, step)| {
                let next = step.apply(&fragment)?;
                tracing::debug!(step = i, bytes = next.len(), "Applied manipulator");
                Ok(next)
            })
    }

    /// Fetch the configured URL and narrow it.
    pub fn execute(&self, fetcher: &dyn Fetch) -> Result<String> {
        let url = self.url.as_ref().ok_or(ScrapeError::MissingUrl)?;
        self.execute_at(fetcher, url)
    }

    /// Fetch `url` and narrow it. Transport failures are logged and yield an empty document.
    pub fn execute_at(&self, fetcher: &dyn Fetch, url: &Url) -> Result<String> {
        match self.try_execute_at(fetcher, url) {
            Err(e) if e.is_transport() => {
                tracing::warn!(url = %url, error = %e, "Fetch failed, using empty document");
                Ok(String::new())
            }
            other => other,
        }
    }

    /// Like [`execute_at`](Self::execute_at) but transport failures are returned.
    pub fn try_execute_at(&self, fetcher: &dyn Fetch, url: &Url) -> Result<String> {
        let document = match &self.session_url {
            Some(primer) => fetcher.fetch_in_session(primer, url)?,
            None => fetcher.fetch(url)?,
        };
        self.narrow(&document)
    }
}
