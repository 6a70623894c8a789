//! Element selection by tag occurrence or attribute value
//!
//! Uses the scraper crate's parse tree; candidates are filtered by an
//! optional matcher on their serialized markup before indexing.

use regex::Regex;
use scraper::{ElementRef, Html};
use serde::Deserialize;

use crate::dom::elements_named;

/// Predicate on an element's serialized markup.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "MatcherDef")]
pub enum Matcher {
    Contains(String),
    Pattern(Regex),
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum MatcherDef {
    Contains(String),
    Pattern(String),
}

impl TryFrom<MatcherDef> for Matcher {
    type Error = regex::Error;

    fn try_from(def: MatcherDef) -> Result<Self, Self::Error> {
        match def {
            MatcherDef::Contains(s) => Ok(Matcher::Contains(s)),
            MatcherDef::Pattern(p) => Regex::new(&p).map(Matcher::Pattern),
        }
    }
}

impl Matcher {
    pub fn contains(text: &str) -> Self {
        Matcher::Contains(text.to_string())
    }

    pub fn pattern(pattern: &str) -> crate::Result<Self> {
        Ok(Matcher::Pattern(Regex::new(pattern)?))
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        match self {
            Matcher::Contains(s) => haystack.contains(s.as_str()),
            Matcher::Pattern(re) => re.is_match(haystack),
        }
    }
}

/// How an element instance is identified among elements of its tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectMode {
    /// 0-based position among all elements of the tag.
    Occurrence(usize),
    /// 0-based position among elements whose attribute equals `value`.
    /// `class` matches any whitespace-separated class token.
    Attribute {
        name: String,
        value: String,
        occurrence: usize,
    },
}

/// Tag name plus the rule that picks one instance of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagOccurrence {
    pub tag: String,
    pub mode: SelectMode,
}

impl TagOccurrence {
    pub fn nth(tag: &str, occurrence: usize) -> Self {
        Self {
            tag: tag.to_string(),
            mode: SelectMode::Occurrence(occurrence),
        }
    }

    pub fn with_attribute(tag: &str, name: &str, value: &str, occurrence: usize) -> Self {
        Self {
            tag: tag.to_string(),
            mode: SelectMode::Attribute {
                name: name.to_string(),
                value: value.to_string(),
                occurrence,
            },
        }
    }

    pub fn with_id(tag: &str, id: &str) -> Self {
        Self::with_attribute(tag, "id", id, 0)
    }

    pub fn with_class(tag: &str, class: &str, occurrence: usize) -> Self {
        Self::with_attribute(tag, "class", class, occurrence)
    }

    fn index(&self) -> usize {
        match &self.mode {
            SelectMode::Occurrence(n) => *n,
            SelectMode::Attribute { occurrence, .. } => *occurrence,
        }
    }

    fn accepts(&self, element: &ElementRef<'_>) -> bool {
        match &self.mode {
            SelectMode::Occurrence(_) => true,
            SelectMode::Attribute { name, value, .. } if name == "class" => {
                element.value().classes().any(|c| c == value)
            }
            SelectMode::Attribute { name, value, .. } => {
                element.value().attr(name) == Some(value.as_str())
            }
        }
    }

    /// Candidate elements in document order, after attribute and matcher filtering.
    pub fn candidates<'a>(&self, document: &'a Html, matcher: Option<&Matcher>) -> Vec<ElementRef<'a>> {
        elements_named(document.root_element(), &self.tag)
            .into_iter()
            .filter(|el| self.accepts(el))
            .filter(|el| matcher.map_or(true, |m| m.is_match(&el.html())))
            .collect()
    }

    /// The selected element, if that many candidates exist.
    pub fn select<'a>(&self, document: &'a Html, matcher: Option<&Matcher>) -> Option<ElementRef<'a>> {
        self.candidates(document, matcher).into_iter().nth(self.index())
    }

    /// Human-readable description used in NotFound errors and logs.
    pub fn describe(&self) -> String {
        match &self.mode {
            SelectMode::Occurrence(n) => format!("<{}> occurrence {}", self.tag, n),
            SelectMode::Attribute {
                name,
                value,
                occurrence,
            } => format!("<{} {}=\"{}\"> occurrence {}", self.tag, name, value, occurrence),
        }
    }
}
