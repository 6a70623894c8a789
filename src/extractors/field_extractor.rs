//! Schema-free field extraction
//!
//! Turns list items, two-column or header tables and definition lists into
//! labeled fields. Strategies run in a fixed order and their results are
//! concatenated without deduplication.

use scraper::{ElementRef, Html};

use super::{clean_label, DesignatedField, Field};
use crate::config::SYNTHETIC_COLUMN_PREFIX;
use crate::dom::{elements_named, parse, tag_sequence, text_of};
use crate::error::{Result, ScrapeError};

/// One field-producing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    ListItems,
    Tables,
    DefinitionLists,
    Designated,
}

/// Order used unless the caller picks strategies explicitly.
pub const DEFAULT_STRATEGIES: [Strategy; 4] = [
    Strategy::ListItems,
    Strategy::Tables,
    Strategy::DefinitionLists,
    Strategy::Designated,
];

/// Pulls labeled fields out of a fragment.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    strategies: Vec<Strategy>,
    designated: Vec<DesignatedField>,
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self {
            strategies: DEFAULT_STRATEGIES.to_vec(),
            designated: Vec::new(),
        }
    }
}

impl FieldExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only designated fields; no shape heuristics.
    pub fn without_heuristics(mut self) -> Self {
        self.strategies = vec![Strategy::Designated];
        self
    }

    pub fn strategies(mut self, strategies: &[Strategy]) -> Self {
        self.strategies = strategies.to_vec();
        self
    }

    /// Take the text of the first `tag` element as `label`.
    pub fn field(mut self, label: &str, tag: &str) -> Self {
        self.designated.push(DesignatedField::new(label, tag));
        self
    }

    pub fn designated(mut self, fields: Vec<DesignatedField>) -> Self {
        self.designated.extend(fields);
        self
    }

    pub fn extract(&self, fragment: &str) -> Result<Vec<Field>> {
        let document = parse(fragment);
        let mut fields = Vec::new();
        for strategy in &self.strategies {
            let found = match strategy {
                Strategy::ListItems => from_list_items(&document),
                Strategy::Tables => from_tables(&document),
                Strategy::DefinitionLists => from_definition_lists(&document),
                Strategy::Designated => self.from_designated(&document)?,
            };
            tracing::debug!(?strategy, count = found.len(), "Extracted fields");
            fields.extend(found);
        }
        Ok(fields)
    }

    fn from_designated(&self, document: &Html) -> Result<Vec<Field>> {
        self.designated
            .iter()
            .map(|d| {
                let first = elements_named(document.root_element(), &d.source_tag)
                    .into_iter()
                    .next()
                    .ok_or_else(|| {
                        ScrapeError::not_found(format!("<{}> for field '{}'", d.source_tag, d.label))
                    })?;
                let value = text_of(first);
                tracing::debug!(label = %d.label, value = %value, "Designated field");
                Ok(Field::new(&d.label, value))
            })
            .collect()
    }
}

/// Value of a cell: the first anchor href, else the anchor's text, else the cell text.
pub fn normalize_value(element: ElementRef<'_>) -> String {
    let anchors = elements_named(element, "a");
    match anchors.first() {
        None => text_of(element),
        Some(first) => anchors
            .iter()
            .find_map(|a| a.value().attr("href"))
            .map(str::to_string)
            .unwrap_or_else(|| text_of(*first)),
    }
}

/// Split on `:` dropping trailing empty pieces.
fn split_colon(text: &str) -> Vec<&str> {
    let mut parts: Vec<&str> = text.split(':').collect();
    while parts.len() > 1 && parts.last().is_some_and(|p| p.is_empty()) {
        parts.pop();
    }
    parts
}

fn from_list_items(document: &Html) -> Vec<Field> {
    let mut fields = Vec::new();
    for li in elements_named(document.root_element(), "li") {
        let text = text_of(li);
        let parts = split_colon(&text);
        if let [label, value] = parts.as_slice() {
            fields.push(Field::new(label, *value));
            continue;
        }

        let tags = tag_sequence(li).into_iter().filter(|t| t != "br").count();
        if tags != 4 {
            continue;
        }
        // the second tag is the start tag of the first non-break child element
        let Some(enclosing) = elements_named(li, "*")
            .into_iter()
            .skip(1)
            .find(|el| el.value().name() != "br")
        else {
            continue;
        };
        let label = clean_label(&text_of(enclosing));
        let all = clean_label(&text);
        match all.strip_prefix(label.as_str()) {
            Some(rest) => {
                let value: String = rest.chars().skip(1).collect();
                fields.push(Field::new(&label, value));
            }
            None => tracing::debug!(label = %label, text = %all, "List label is not a prefix, skipped"),
        }
    }
    fields
}

fn from_tables(document: &Html) -> Vec<Field> {
    elements_named(document.root_element(), "table")
        .into_iter()
        .flat_map(from_table)
        .collect()
}

fn from_table(table: ElementRef<'_>) -> Vec<Field> {
    let cells = elements_named(table, "td");
    let rows = elements_named(table, "tr");
    tracing::debug!(cells = cells.len(), rows = rows.len(), "Inspecting table");

    let mut fields: Vec<Field> = Vec::new();
    if cells.len() == rows.len() * 2 {
        for pair in cells.chunks(2) {
            let label = clean_label(&text_of(pair[0]));
            let value = normalize_value(pair[1]);
            match fields.last_mut() {
                Some(last) if label.is_empty() => last.add_value(value),
                _ => fields.push(Field::new(&label, value)),
            }
        }
        return fields;
    }

    let mut headers: Vec<String> = Vec::new();
    for row in rows {
        let header_cells = elements_named(row, "th");
        if !header_cells.is_empty() {
            headers = header_cells.into_iter().map(text_of).collect();
        }
        let data_cells = elements_named(row, "td");
        for n in headers.len()..data_cells.len() {
            headers.push(format!("{SYNTHETIC_COLUMN_PREFIX}{n}"));
        }
        for (header, cell) in headers.iter().zip(data_cells) {
            fields.push(Field::new(header, normalize_value(cell)));
        }
    }
    fields
}

fn from_definition_lists(document: &Html) -> Vec<Field> {
    let mut fields = Vec::new();
    for dl in elements_named(document.root_element(), "dl") {
        let labels = elements_named(dl, "dt");
        let values = elements_named(dl, "dd");
        for (label, value) in labels.into_iter().zip(values) {
            fields.push(Field::new(&text_of(label), normalize_value(value)));
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heuristic(strategy: Strategy, html: &str) -> Vec<Field> {
        FieldExtractor::new().strategies(&[strategy]).extract(html).unwrap()
    }

    #[test]
    fn test_two_column_table_yields_one_field_per_row() {
        let html = r#"
        <table>
            <tr><td>Document Type:</td><td>Grants Notice</td></tr>
            <tr><td>Funding Opportunity Number:</td><td>USDA-GRANTS-1</td></tr>
            <tr><td>Posted Date:</td><td>Mar 01, 2011</td></tr>
        </table>
        "#;
        let fields = heuristic(Strategy::Tables, html);
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].label(), "Document Type");
        assert_eq!(fields[1].value(), "USDA-GRANTS-1");
        assert_eq!(fields[2].value(), "Mar 01, 2011");
    }

    #[test]
    fn test_empty_label_continues_previous_field() {
        let html = r#"
        <table>
            <tr><td>CFDA Number(s):</td><td>10.001</td></tr>
            <tr><td> </td><td>10.002</td></tr>
            <tr><td></td><td>10.003</td></tr>
        </table>
        "#;
        let fields = heuristic(Strategy::Tables, html);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].label(), "CFDA Number(s)");
        assert_eq!(fields[0].values(), ["10.001", "10.002", "10.003"]);
        assert_eq!(fields[0].value(), "10.001;10.002;10.003");
    }

    #[test]
    fn test_anchor_cell_normalizes_to_href() {
        let html = r#"<table><tr><td>Link</td><td><a href="/x">label</a></td></tr></table>"#;
        let fields = heuristic(Strategy::Tables, html);
        assert_eq!(fields[0].value(), "/x");
    }

    #[test]
    fn test_anchor_without_href_uses_anchor_text() {
        let html = r#"<table><tr><td>Name</td><td>see <a name="top">Top Anchor</a></td></tr></table>"#;
        let fields = heuristic(Strategy::Tables, html);
        assert_eq!(fields[0].value(), "Top Anchor");
    }

    #[test]
    fn test_first_anchor_with_href_wins() {
        let html = r#"<dl><dt>Contact</dt><dd><a>none</a> <a href="mailto:a@b.gov">mail</a> <a href="/other">o</a></dd></dl>"#;
        let fields = heuristic(Strategy::DefinitionLists, html);
        assert_eq!(fields[0].value(), "mailto:a@b.gov");
    }

    #[test]
    fn test_header_table_maps_cells_to_headers() {
        let html = r#"
        <table>
            <tr><th>Title</th><th>Amount</th></tr>
            <tr><td>Alpha</td><td>100</td></tr>
            <tr><td>Beta</td><td>200</td></tr>
            <tr><td>Gamma</td><td>300</td></tr>
        </table>
        "#;
        let fields = heuristic(Strategy::Tables, html);
        assert_eq!(fields.len(), 6);
        let labels: Vec<_> = fields.iter().map(Field::label).collect();
        assert_eq!(labels, ["Title", "Amount", "Title", "Amount", "Title", "Amount"]);
        assert_eq!(fields[5].value(), "300");
    }

    #[test]
    fn test_header_table_synthesizes_extra_columns() {
        let html = r#"
        <table>
            <tr><th>Title</th><th>Amount</th></tr>
            <tr><td>Alpha</td><td>100</td></tr>
            <tr><td>Beta</td><td>200</td><td>late</td></tr>
        </table>
        "#;
        let fields = heuristic(Strategy::Tables, html);
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[4].label(), "col2");
        assert_eq!(fields[4].value(), "late");
    }

    #[test]
    fn test_new_header_row_resets_headers() {
        let html = r#"
        <table>
            <tr><th>A</th><th>B</th></tr>
            <tr><td>1</td><td>2</td></tr>
            <tr><th>C</th></tr>
            <tr><td>3</td><td>4</td></tr>
        </table>
        "#;
        let fields = heuristic(Strategy::Tables, html);
        let labels: Vec<_> = fields.iter().map(Field::label).collect();
        assert_eq!(labels, ["A", "B", "C", "col1"]);
    }

    #[test]
    fn test_definition_list_pairs_up_to_shorter_side() {
        let html = r#"
        <dl>
            <dt>Agency:</dt><dd>Department of Energy</dd>
            <dt>Office:</dt><dd>Science</dd>
            <dt>Orphan</dt>
        </dl>
        "#;
        let fields = heuristic(Strategy::DefinitionLists, html);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].label(), "Agency");
        assert_eq!(fields[1].value(), "Science");
    }

    #[test]
    fn test_list_items() {
        let html = r#"
        <ul>
            <li>Agency: Department of Agriculture</li>
            <li><strong>Phone</strong> 555-1234</li>
            <li><b>Time:</b> 10:30</li>
            <li>Intro <b>Label</b> rest</li>
            <li>No structure here</li>
        </ul>
        "#;
        let fields = heuristic(Strategy::ListItems, html);
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].label(), "Agency");
        assert_eq!(fields[0].value(), "Department of Agriculture");
        assert_eq!(fields[1].label(), "Phone");
        assert_eq!(fields[1].value(), "555-1234");
        assert_eq!(fields[2].label(), "Time");
        assert_eq!(fields[2].value(), "10:30");
    }

    #[test]
    fn test_list_item_break_tags_are_ignored() {
        let html = "<ul><li><b>Address</b><br>5601 Sunnyside Ave</li></ul>";
        let fields = heuristic(Strategy::ListItems, html);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].label(), "Address");
        assert_eq!(fields[0].value(), "5601 Sunnyside Ave");
    }

    #[test]
    fn test_unrecognized_shapes_contribute_nothing() {
        let html = "<table><tr><td>a</td><td>b</td><td>c</td></tr></table><p>text</p>";
        let fields = FieldExtractor::new().extract("<p>nothing tabular</p>").unwrap();
        assert!(fields.is_empty());
        // three cells, no headers: synthesized labels
        let fields = heuristic(Strategy::Tables, html);
        let labels: Vec<_> = fields.iter().map(Field::label).collect();
        assert_eq!(labels, ["col0", "col1", "col2"]);
    }

    #[test]
    fn test_designated_field_takes_first_element() {
        let html = "<h1>Grant Title</h1><h1>Second</h1>";
        let fields = FieldExtractor::new()
            .without_heuristics()
            .field("title", "h1")
            .extract(html)
            .unwrap();
        assert_eq!(fields, vec![Field::new("title", "Grant Title")]);
    }

    #[test]
    fn test_designated_field_not_found() {
        let err = FieldExtractor::new()
            .field("title", "h1")
            .extract("<p>no heading</p>")
            .unwrap_err();
        assert!(matches!(err, ScrapeError::NotFound { .. }));
    }

    #[test]
    fn test_strategies_concatenate_in_fixed_order() {
        let html = r#"
        <h1>Title</h1>
        <dl><dt>From DL</dt><dd>3</dd></dl>
        <table><tr><td>From Table</td><td>2</td></tr></table>
        <ul><li>From List: 1</li></ul>
        "#;
        let fields = FieldExtractor::new().field("heading", "h1").extract(html).unwrap();
        let labels: Vec<_> = fields.iter().map(Field::label).collect();
        assert_eq!(labels, ["From List", "From Table", "From DL", "heading"]);
    }
}
