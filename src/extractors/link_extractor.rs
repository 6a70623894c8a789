//! Anchor extraction
//!
//! Collects `<a href>` elements from a fragment as [`Link`]s, optionally
//! filtered by their href, or reduces each link to one query parameter.

use super::element_selector::Matcher;
use super::{Field, Link};
use crate::dom::{elements_named, parse, text_of};
use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct LinkExtractor {
    matcher: Option<Matcher>,
    parameter: Option<String>,
}

impl LinkExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only links whose href contains `text`.
    pub fn matching(mut self, text: &str) -> Self {
        self.matcher = Some(Matcher::contains(text));
        self
    }

    pub fn matching_pattern(mut self, pattern: &str) -> Result<Self> {
        self.matcher = Some(Matcher::pattern(pattern)?);
        Ok(self)
    }

    /// Reduce each link to the value of this query parameter in [`strings`](Self::strings).
    pub fn parameter(mut self, name: &str) -> Self {
        self.parameter = Some(name.to_string());
        self
    }

    pub fn links(&self, fragment: &str) -> Vec<Link> {
        let document = parse(fragment);
        elements_named(document.root_element(), "a")
            .into_iter()
            .filter_map(|a| {
                let href = a.value().attr("href")?;
                if let Some(m) = &self.matcher {
                    if !m.is_match(href) {
                        return None;
                    }
                }
                Some(Link {
                    href: href.to_string(),
                    label: text_of(a),
                })
            })
            .collect()
    }

    /// Links as fields labeled by their text, valued by their href.
    pub fn fields(&self, fragment: &str) -> Vec<Field> {
        self.links(fragment).into_iter().map(Field::from).collect()
    }

    /// Parameter values when [`parameter`](Self::parameter) is set, hrefs otherwise.
    pub fn strings(&self, fragment: &str) -> Vec<String> {
        let links = self.links(fragment);
        match &self.parameter {
            Some(name) => links
                .iter()
                .filter_map(|link| query_parameter(&link.href, name))
                .collect(),
            None => links.into_iter().map(|link| link.href).collect(),
        }
    }
}

/// Value of query parameter `name` in a possibly relative href.
pub fn query_parameter(href: &str, name: &str) -> Option<String> {
    let (_, rest) = href.split_once('?')?;
    let query = rest.split('#').next().unwrap_or_default();
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
    <table>
        <tr><td><a href="/search/view.do?mode=VIEW&amp;oppId=40034">Soil <b>Research</b></a></td></tr>
        <tr><td><a href="/search/view.do?mode=VIEW&amp;oppId=40158#top">Water Quality</a></td></tr>
        <tr><td><a href="/help.html">Help</a></td></tr>
        <tr><td><a name="anchor-only">No href</a></td></tr>
    </table>
    "#;

    #[test]
    fn test_links_require_href() {
        let links = LinkExtractor::new().links(LISTING);
        assert_eq!(links.len(), 3);
        assert_eq!(links[0].href, "/search/view.do?mode=VIEW&oppId=40034");
        assert_eq!(links[0].label, "Soil Research");
    }

    #[test]
    fn test_links_matching_href() {
        let links = LinkExtractor::new().matching("mode=VIEW").links(LISTING);
        assert_eq!(links.len(), 2);
        let links = LinkExtractor::new()
            .matching_pattern(r"\.html$")
            .unwrap()
            .links(LISTING);
        assert_eq!(links[0].label, "Help");
    }

    #[test]
    fn test_parameter_strings() {
        let ids = LinkExtractor::new().parameter("oppId").strings(LISTING);
        assert_eq!(ids, vec!["40034", "40158"]);
    }

    #[test]
    fn test_strings_default_to_hrefs() {
        let hrefs = LinkExtractor::new().matching("help").strings(LISTING);
        assert_eq!(hrefs, vec!["/help.html"]);
    }

    #[test]
    fn test_link_fields() {
        let fields = LinkExtractor::new().matching("mode=VIEW").fields(LISTING);
        assert_eq!(fields[1].label(), "Water Quality");
        assert_eq!(fields[1].value(), "/search/view.do?mode=VIEW&oppId=40158#top");
    }

    #[test]
    fn test_query_parameter() {
        assert_eq!(query_parameter("a?x=1&y=two%20words", "y").as_deref(), Some("two words"));
        assert_eq!(query_parameter("a?x=1", "y"), None);
        assert_eq!(query_parameter("no-query", "x"), None);
    }
}
