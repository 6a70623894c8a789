//! Listing and detail orchestration
//!
//! A [`Scraper`] is bound to one listing URL. It runs a narrowing pipeline
//! over the listing and any subsequent pages, collects links or fields, and
//! follows each link to build one [`Record`] per detail page.

use std::fmt;

use url::Url;

use crate::dom::{parse, text_of};
use crate::error::{parse_url, Result, ScrapeError};
use crate::extractors::{Field, FieldExtractor, HtmlExtractor, Link, LinkExtractor, Record};
use crate::fetch::Fetch;
use crate::pagination::{extract_session_id, paginate, PageIterator, SessionId};

/// How relative links found on a listing become absolute URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkResolution {
    /// Standard reference resolution against the base URL.
    #[default]
    Join,
    /// Base origin followed by the href verbatim, unless the href starts with `http://`.
    Concatenate,
}

/// Listing scraper bound to one target URL and a [`Fetch`] implementation.
pub struct Scraper<'f> {
    fetcher: &'f dyn Fetch,
    url: Option<Url>,
    base_url: Option<Url>,
    session_keyword: Option<String>,
    session: Option<SessionId>,
    pages: usize,
    iterator: Option<Box<dyn PageIterator + 'f>>,
    resolution: LinkResolution,
    convert_urls: bool,
}

impl fmt::Debug for Scraper<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scraper")
            .field("url", &self.url.as_ref().map(Url::as_str))
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field("session_keyword", &self.session_keyword)
            .field("session", &self.session)
            .field("pages", &self.pages)
            .field("iterator", &self.iterator.is_some())
            .field("resolution", &self.resolution)
            .field("convert_urls", &self.convert_urls)
            .finish_non_exhaustive()
    }
}

impl<'f> Scraper<'f> {
    pub fn new(fetcher: &'f dyn Fetch) -> Self {
        Self {
            fetcher,
            url: None,
            base_url: None,
            session_keyword: None,
            session: None,
            pages: 0,
            iterator: None,
            resolution: LinkResolution::default(),
            convert_urls: true,
        }
    }

    /// Keyword whose value in the target page becomes the session id.
    ///
    /// Takes effect on the next call to [`url`](Self::url).
    pub fn session_id_keyword(mut self, keyword: &str) -> Self {
        self.session_keyword = Some(keyword.to_string());
        self
    }

    /// Bind the target URL. Derives the base URL and, with a session keyword
    /// set, fetches the page once to discover the session id.
    pub fn url(mut self, url: &str) -> Result<Self> {
        let parsed = parse_url(url)?;
        self.base_url = Some(base_of(&parsed));
        if let Some(keyword) = self.session_keyword.as_deref() {
            self.session = self.discover_session(&parsed, keyword);
        }
        self.url = Some(parsed);
        Ok(self)
    }

    /// Use a known session id instead of discovering one.
    pub fn session(mut self, session: SessionId) -> Self {
        self.session = Some(session);
        self
    }

    /// Number of subsequent pages to pull from the iterator.
    pub fn pages(mut self, pages: usize) -> Self {
        self.pages = pages;
        self
    }

    pub fn iterator(mut self, iterator: impl PageIterator + 'f) -> Self {
        self.iterator = Some(Box::new(iterator));
        self
    }

    pub fn link_resolution(mut self, resolution: LinkResolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// With `false`, listing hrefs must already be absolute.
    pub fn convert_urls(mut self, convert: bool) -> Self {
        self.convert_urls = convert;
        self
    }

    pub fn target(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session.as_ref()
    }

    fn discover_session(&self, url: &Url, keyword: &str) -> Option<SessionId> {
        let markup = match self.fetcher.fetch(url) {
            Ok(markup) => markup,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Could not fetch page for session id");
                return None;
            }
        };
        match extract_session_id(&markup, keyword) {
            Some(value) => {
                tracing::info!(keyword, session = %value, "Resolved session id");
                Some(SessionId::new(&value))
            }
            None => {
                tracing::warn!(keyword, url = %url, "Session id keyword not found");
                None
            }
        }
    }

    fn require_url(&self) -> Result<&Url> {
        self.url.as_ref().ok_or(ScrapeError::MissingUrl)
    }

    /// Narrowed markup of the target page.
    pub fn result(&self, pipeline: &HtmlExtractor) -> Result<String> {
        pipeline.execute_at(self.fetcher, self.require_url()?)
    }

    /// Text content of the narrowed target page.
    pub fn text(&self, pipeline: &HtmlExtractor) -> Result<String> {
        let fragment = self.result(pipeline)?;
        let document = parse(&fragment);
        Ok(text_of(document.root_element()))
    }

    /// Fields of the target page followed by those of each subsequent page.
    pub fn fields(&mut self, pipeline: &HtmlExtractor, extractor: &FieldExtractor) -> Result<Vec<Field>> {
        self.collect(pipeline, |fragment| extractor.extract(fragment))
    }

    pub fn links(&mut self, pipeline: &HtmlExtractor, links: &LinkExtractor) -> Result<Vec<Link>> {
        self.collect(pipeline, |fragment| Ok(links.links(fragment)))
    }

    pub fn strings(&mut self, pipeline: &HtmlExtractor, links: &LinkExtractor) -> Result<Vec<String>> {
        self.collect(pipeline, |fragment| Ok(links.strings(fragment)))
    }

    /// Errors on the target page are returned; errors on later pages are logged and skipped.
    fn collect<T>(
        &mut self,
        pipeline: &HtmlExtractor,
        extract: impl Fn(&str) -> Result<Vec<T>>,
    ) -> Result<Vec<T>> {
        let url = self.require_url()?.clone();
        let first = pipeline.execute_at(self.fetcher, &url)?;
        let mut results = extract(&first)?;
        tracing::info!(url = %url, count = results.len(), "Extracted target page");

        let fetcher = self.fetcher;
        if let Some(iterator) = self.iterator.as_mut() {
            let more = paginate(iterator.as_mut(), self.pages, self.session.as_ref(), |page| {
                let fragment = pipeline.execute_at(fetcher, page)?;
                extract(&fragment)
            });
            results.extend(more);
        }
        Ok(results)
    }

    fn link_base(&self) -> Option<Url> {
        self.iterator
            .as_ref()
            .and_then(|it| it.base_url())
            .or_else(|| self.base_url.clone())
    }

    /// Absolute URL for a listing href.
    pub fn resolve_link(&self, href: &str) -> Result<Url> {
        let href = href.trim();
        let base = match (self.convert_urls, self.link_base()) {
            (true, Some(base)) => base,
            _ => return parse_url(href),
        };
        match self.resolution {
            LinkResolution::Join => base.join(href).map_err(|e| ScrapeError::malformed(href, e)),
            LinkResolution::Concatenate if href.starts_with("http://") => parse_url(href),
            LinkResolution::Concatenate => {
                parse_url(&format!("{}{}", base.origin().ascii_serialization(), href))
            }
        }
    }

    /// One record per listing link whose detail page could be fetched and extracted.
    ///
    /// Each link's value is its href. Order follows `listing`.
    pub fn details(
        &self,
        listing: &[Field],
        pipeline: &HtmlExtractor,
        extractor: &FieldExtractor,
    ) -> Vec<Record> {
        let mut records = Vec::with_capacity(listing.len());
        for (index, link) in listing.iter().enumerate() {
            let href = link.value();
            let url = match self.resolve_link(&href) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!(index, href = %href, error = %e, "Skipping bad link");
                    continue;
                }
            };
            tracing::debug!(index, url = %url, "Following link");
            let fields = pipeline
                .try_execute_at(self.fetcher, &url)
                .and_then(|fragment| extractor.extract(&fragment));
            match fields {
                Ok(fields) => records.push(Record::new(fields)),
                Err(e) => tracing::warn!(index, url = %url, error = %e, "Skipping detail page"),
            }
        }
        tracing::info!(links = listing.len(), records = records.len(), "Built detail records");
        records
    }

    /// Collect links from the listing pages, then build a record for each.
    pub fn records(
        &mut self,
        listing_pipeline: &HtmlExtractor,
        links: &LinkExtractor,
        detail_pipeline: &HtmlExtractor,
        detail: &FieldExtractor,
    ) -> Result<Vec<Record>> {
        let listing = self.collect(listing_pipeline, |fragment| Ok(links.fields(fragment)))?;
        Ok(self.details(&listing, detail_pipeline, detail))
    }
}

/// Scheme and host (and port) of `url`, with an empty path.
fn base_of(url: &Url) -> Url {
    let mut base = url.clone();
    base.set_path("");
    base.set_query(None);
    base.set_fragment(None);
    base
}
