//! Schema-free field extraction from HTML pages
//!
//! Provides:
//! - Progressive narrowing of a fetched document (tag occurrence, id, class,
//!   "everything after", open/close pairing)
//! - Heuristic fields from list items, tables and definition lists
//! - Link and query-parameter collection
//! - Pagination with session-id substitution
//! - Listing to detail orchestration producing one record per link

pub mod config;
pub mod dom;
pub mod error;
pub mod extractors;
pub mod fetch;
pub mod listing;
pub mod pagination;
pub mod request;

pub use error::{parse_url, Result, ScrapeError};
pub use extractors::*;
pub use fetch::{Fetch, HttpFetcher};
pub use listing::{LinkResolution, Scraper};
pub use pagination::{PageIterator, PageTemplate, SessionId};
pub use request::{extract_from_html, ExtractionRequest, ExtractionResult};
