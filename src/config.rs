//! Configuration constants and fetch settings.

use serde::Deserialize;

/// Placeholder recognized inside generated page URLs and replaced with the resolved session id.
pub const SESSION_ID_PLACEHOLDER: &str = "$SESSION_ID$";

/// HTTP timeout in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// User agent string identifying this crate.
pub const USER_AGENT: &str = concat!("fieldscrape/", env!("CARGO_PKG_VERSION"));

/// Separator used when rendering a multi-valued field.
pub const VALUE_SEPARATOR: &str = ";";

/// Prefix for labels synthesized for table cells beyond the known headers.
pub const SYNTHETIC_COLUMN_PREFIX: &str = "col";

/// Settings for [`crate::fetch::HttpFetcher`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout() -> u64 {
    HTTP_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    USER_AGENT.to_string()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}
