//! Error types for extraction and crawling.

use thiserror::Error;

/// Main error type for the crate.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// A target or generated string is not a valid URL.
    #[error("Malformed URL '{url}': {source}")]
    MalformedUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Fetching a page failed (connection, status or body read).
    #[error("Failed to fetch {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    /// A designated field or id/class/occurrence lookup matched nothing.
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// A pipeline was executed without a target URL.
    #[error("No URL set on the extractor")]
    MissingUrl,

    /// A pattern matcher failed to compile.
    #[error("Invalid match pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// An extraction request could not be parsed.
    #[error("Invalid extraction request: {0}")]
    InvalidRequest(#[from] serde_json::Error),
}

impl ScrapeError {
    pub(crate) fn malformed(url: &str, source: url::ParseError) -> Self {
        ScrapeError::MalformedUrl {
            url: url.to_string(),
            source,
        }
    }

    pub(crate) fn transport(url: &url::Url, source: ureq::Error) -> Self {
        ScrapeError::Transport {
            url: url.to_string(),
            source: Box::new(source),
        }
    }

    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        ScrapeError::NotFound { what: what.into() }
    }

    /// True for failures of the transport collaborator.
    pub fn is_transport(&self) -> bool {
        matches!(self, ScrapeError::Transport { .. })
    }
}

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Parse a URL, mapping failures to [`ScrapeError::MalformedUrl`].
pub fn parse_url(input: &str) -> Result<url::Url> {
    url::Url::parse(input).map_err(|e| ScrapeError::malformed(input, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_url_display() {
        let err = parse_url("not a url").unwrap_err();
        assert!(matches!(err, ScrapeError::MalformedUrl { .. }));
        assert!(err.to_string().contains("not a url"));
    }

    #[test]
    fn test_not_found_display() {
        let err = ScrapeError::not_found("<h1> for field 'title'");
        assert_eq!(err.to_string(), "Not found: <h1> for field 'title'");
        assert!(!err.is_transport());
    }
}
