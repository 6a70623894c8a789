//! JSON extraction requests
//!
//! A serializable description of one pipeline: where to fetch, how to narrow
//! and which fields to pull. Used by callers that configure extraction from
//! data rather than through the builders.

use serde::{Deserialize, Serialize};

use crate::error::{parse_url, Result};
use crate::extractors::{DesignatedField, Field, FieldExtractor, HtmlExtractor, Manipulator};

fn default_true() -> bool {
    true
}

/// Extraction request
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionRequest {
    /// Target page for [`HtmlExtractor::execute`]
    #[serde(default)]
    pub url: Option<String>,
    /// Page visited first, in the same session, before every target fetch
    #[serde(default)]
    pub session_url: Option<String>,
    /// Narrowing steps, applied in order
    #[serde(default)]
    pub steps: Vec<Manipulator>,
    /// Explicit label/tag lookups
    #[serde(default)]
    pub fields: Vec<DesignatedField>,
    /// Whether the list/table/definition-list heuristics run
    #[serde(default = "default_true")]
    pub heuristics: bool,
}

impl ExtractionRequest {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The narrowing pipeline. Fails only on a malformed URL.
    pub fn html_extractor(&self) -> Result<HtmlExtractor> {
        let mut extractor = self
            .steps
            .iter()
            .cloned()
            .fold(HtmlExtractor::new(), HtmlExtractor::add);
        if let Some(url) = &self.url {
            extractor = extractor.url(parse_url(url)?);
        }
        if let Some(primer) = &self.session_url {
            extractor = extractor.session_support(parse_url(primer)?);
        }
        Ok(extractor)
    }

    pub fn field_extractor(&self) -> FieldExtractor {
        let extractor = if self.heuristics {
            FieldExtractor::new()
        } else {
            FieldExtractor::new().without_heuristics()
        };
        extractor.designated(self.fields.clone())
    }

    /// Narrow `html` and extract fields, without fetching.
    pub fn extract(&self, html: &str) -> Result<Vec<Field>> {
        let fragment = self.html_extractor()?.narrow(html)?;
        self.field_extractor().extract(&fragment)
    }
}

/// Extraction result
#[derive(Debug, Serialize, Default)]
pub struct ExtractionResult {
    pub fields: Vec<Field>,
    /// Any error encountered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Run `request` against supplied markup.
pub fn extract_from_html(html: &str, request: &ExtractionRequest) -> ExtractionResult {
    match request.extract(html) {
        Ok(fields) => ExtractionResult {
            fields,
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Extraction request failed");
            ExtractionResult {
                fields: Vec::new(),
                error: Some(e.to_string()),
            }
        }
    }
}
