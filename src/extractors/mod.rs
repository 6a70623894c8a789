//! HTML extraction modules
//!
//! The document narrowing pipeline, the element selector it is built on and
//! the field and link extractors that run on the narrowed fragment.

mod element_selector;
mod field_extractor;
mod html_extractor;
mod link_extractor;

pub use element_selector::*;
pub use field_extractor::*;
pub use html_extractor::*;
pub use link_extractor::*;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::VALUE_SEPARATOR;

/// A labeled value (or values) pulled out of markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    label: String,
    values: Vec<String>,
}

impl Field {
    /// Label is trimmed and loses one trailing colon.
    pub fn new(label: &str, value: impl Into<String>) -> Self {
        Self {
            label: clean_label(label),
            values: vec![value.into().trim().to_string()],
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Values joined with `;`.
    pub fn value(&self) -> String {
        self.values.join(VALUE_SEPARATOR)
    }

    /// Continuation row: another value for the same label.
    pub fn add_value(&mut self, value: impl Into<String>) {
        self.values.push(value.into().trim().to_string());
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.value())
    }
}

pub(crate) fn clean_label(label: &str) -> String {
    let trimmed = label.trim();
    trimmed.strip_suffix(':').unwrap_or(trimmed).trim_end().to_string()
}

/// Rendered value of the first field carrying `label`.
pub fn field_value(fields: &[Field], label: &str) -> Option<String> {
    fields.iter().find(|f| f.label == label).map(Field::value)
}

/// Fields of one detail entity, in extraction order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Record {
    fields: Vec<Field>,
}

impl Record {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn get(&self, label: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.label == label)
    }

    pub fn value_of(&self, label: &str) -> Option<String> {
        field_value(&self.fields, label)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl IntoIterator for Record {
    type Item = Field;
    type IntoIter = std::vec::IntoIter<Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// An anchor's href and its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub href: String,
    pub label: String,
}

impl From<Link> for Field {
    fn from(link: Link) -> Self {
        Field::new(&link.label, link.href)
    }
}

/// Explicit lookup: the text of the first `source_tag` element becomes `label`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignatedField {
    pub label: String,
    #[serde(alias = "tag")]
    pub source_tag: String,
}

impl DesignatedField {
    pub fn new(label: &str, source_tag: &str) -> Self {
        Self {
            label: label.to_string(),
            source_tag: source_tag.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_cleanup() {
        let field = Field::new("  Posted Date: ", " 2011-03-01 ");
        assert_eq!(field.label(), "Posted Date");
        assert_eq!(field.value(), "2011-03-01");
    }

    #[test]
    fn test_only_one_colon_stripped() {
        assert_eq!(clean_label("Ratio::"), "Ratio:");
    }

    #[test]
    fn test_multi_value_rendering() {
        let mut field = Field::new("CFDA Number(s)", "10.001");
        field.add_value("10.002");
        assert_eq!(field.values().len(), 2);
        assert_eq!(field.value(), "10.001;10.002");
        assert_eq!(field.to_string(), "CFDA Number(s): 10.001;10.002");
    }

    #[test]
    fn test_record_lookup_returns_first_match() {
        let record = Record::new(vec![
            Field::new("Agency", "Department of Agriculture"),
            Field::new("Agency", "Duplicate"),
        ]);
        assert_eq!(record.len(), 2);
        assert_eq!(record.value_of("Agency").as_deref(), Some("Department of Agriculture"));
        assert!(record.get("Office").is_none());
    }

    #[test]
    fn test_link_into_field() {
        let field: Field = Link {
            href: "/detail?id=7".to_string(),
            label: "Grant 7".to_string(),
        }
        .into();
        assert_eq!(field.label(), "Grant 7");
        assert_eq!(field.value(), "/detail?id=7");
    }

    #[test]
    fn test_record_serializes_fields() {
        let record = Record::new(vec![Field::new("Title", "Grant")]);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["fields"][0]["label"], "Title");
        assert_eq!(json["fields"][0]["values"][0], "Grant");
    }

    #[test]
    fn test_designated_field_accepts_tag_alias() {
        let field: DesignatedField =
            serde_json::from_str(r#"{"label": "title", "tag": "h1"}"#).unwrap();
        assert_eq!(field, DesignatedField::new("title", "h1"));
    }
}
