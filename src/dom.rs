//! Parse-tree helpers over `scraper`.
//!
//! Fragments move between pipeline steps as serialized markup, so every
//! helper here either parses a string or turns an element back into one.

use scraper::{ElementRef, Html};

/// Elements whose content never counts as text.
const SKIPPED: &[&str] = &["script", "style", "noscript", "template"];

/// Elements that separate words when flattened to text.
const BLOCK: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "footer", "form",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre",
    "section", "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

/// Elements without an end tag.
const VOID: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements the HTML5 parser drops unless they sit inside a `<table>`.
const TABLE_INTERNAL: &[&str] = &[
    "caption", "col", "colgroup", "tbody", "td", "tfoot", "th", "thead", "tr",
];

/// Parse a document or a fragment produced by an earlier step.
///
/// A fragment rooted at a table-internal element is parsed inside a
/// `<table>` so its rows and cells survive.
pub fn parse(markup: &str) -> Html {
    match leading_tag(markup) {
        Some(tag) if TABLE_INTERNAL.contains(&tag.as_str()) => {
            Html::parse_document(&format!("<table>{markup}</table>"))
        }
        _ => Html::parse_document(markup),
    }
}

/// Lowercased name of the first start tag, if the markup begins with one.
fn leading_tag(markup: &str) -> Option<String> {
    let rest = markup.trim_start().strip_prefix('<')?;
    let name: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    (!name.is_empty()).then(|| name.to_ascii_lowercase())
}

/// All elements named `tag` under `root` (inclusive), in document order. `*` matches any tag.
pub fn elements_named<'a>(root: ElementRef<'a>, tag: &str) -> Vec<ElementRef<'a>> {
    root.descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| tag == "*" || el.value().name().eq_ignore_ascii_case(tag))
        .collect()
}

/// Descendant text with whitespace collapsed and trimmed.
pub fn text_of(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            let name = child_el.value().name();
            if SKIPPED.contains(&name) {
                continue;
            }
            let block = BLOCK.contains(&name);
            if block {
                out.push(' ');
            }
            collect_text(child_el, out);
            if block {
                out.push(' ');
            }
        }
    }
}

/// Names of every start/end tag under `element` (inclusive), in document order.
///
/// Void elements contribute a single tag.
pub fn tag_sequence(element: ElementRef<'_>) -> Vec<String> {
    let mut tags = Vec::new();
    push_tags(element, &mut tags);
    tags
}

fn push_tags(element: ElementRef<'_>, tags: &mut Vec<String>) {
    let name = element.value().name().to_string();
    let void = VOID.contains(&name.as_str());
    tags.push(name.clone());
    for child in element.children().filter_map(ElementRef::wrap) {
        push_tags(child, tags);
    }
    if !void {
        tags.push(name);
    }
}

/// Markup from `element` (inclusive) to the end of the document.
pub fn html_from(element: ElementRef<'_>) -> String {
    let mut out = element.html();
    let mut node = *element;
    loop {
        for sibling in node.next_siblings() {
            if let Some(el) = ElementRef::wrap(sibling) {
                out.push_str(&el.html());
            } else if let Some(text) = sibling.value().as_text() {
                out.push_str(&escape_text(text));
            }
        }
        match node.parent() {
            Some(parent) => node = parent,
            None => break,
        }
    }
    out
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_of_separates_blocks() {
        let doc = parse("<div><p>One</p><p>Two<br>Three</p><script>var x;</script></div>");
        let div = elements_named(doc.root_element(), "div")[0];
        assert_eq!(text_of(div), "One Two Three");
    }

    #[test]
    fn test_text_of_keeps_inline_runs() {
        let doc = parse("<li><strong>Agency:</strong>   Department <em>of</em> Energy</li>");
        let li = elements_named(doc.root_element(), "li")[0];
        assert_eq!(text_of(li), "Agency: Department of Energy");
    }

    #[test]
    fn test_elements_named_in_document_order() {
        let doc = parse("<table id='a'><tr><td><table id='b'></table></td></tr></table><table id='c'></table>");
        let ids: Vec<_> = elements_named(doc.root_element(), "table")
            .iter()
            .filter_map(|t| t.value().id())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_tag_sequence_counts_start_and_end() {
        let doc = parse("<ul><li><b>Phone</b><br> 555-1234</li></ul>");
        let li = elements_named(doc.root_element(), "li")[0];
        assert_eq!(tag_sequence(li), vec!["li", "b", "b", "br", "li"]);
    }

    #[test]
    fn test_html_from_includes_rest_of_document() {
        let doc = parse("<div><h2>A</h2><h2>B</h2><p>x &amp; y</p></div><p>tail</p>");
        let second = elements_named(doc.root_element(), "h2")[1];
        let html = html_from(second);
        assert!(html.starts_with("<h2>B</h2>"));
        assert!(html.contains("<p>x &amp; y</p>"));
        assert!(html.ends_with("<p>tail</p>"));
        assert!(!html.contains("<h2>A</h2>"));
    }

    #[test]
    fn test_parse_keeps_table_rows_and_cells() {
        let doc = parse("  <tr><td>B:</td><td>2</td></tr>");
        assert_eq!(elements_named(doc.root_element(), "tr").len(), 1);
        assert_eq!(elements_named(doc.root_element(), "td").len(), 2);

        let doc = parse("<TD>only cell</TD>");
        assert_eq!(text_of(elements_named(doc.root_element(), "td")[0]), "only cell");
    }

    #[test]
    fn test_leading_tag() {
        assert_eq!(leading_tag("\n <tbody><tr></tr></tbody>").as_deref(), Some("tbody"));
        assert_eq!(leading_tag("text <td>"), None);
        assert_eq!(leading_tag("<!-- c --><td>"), None);
    }
}
