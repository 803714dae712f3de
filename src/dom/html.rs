//! Lenient HTML loader.
//!
//! pdf2htmlEX output is close to XHTML but not quite: void elements are
//! written without a closing slash and the head carries scripts and styles
//! full of `<` and `&`. This loader strips `<script>`/`<style>` bodies, treats
//! void elements as empty, closes unclosed elements when an ancestor ends,
//! ignores stray end tags and keeps whitespace text as it is.

use super::{Document, Element, Node};
use crate::error::{Error, ErrorKind, Result};
use lazy_static::lazy_static;
use quick_xml::escape::unescape_with;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;
use regex::Regex;

lazy_static! {
    static ref SCRIPT_RE: Regex = Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap();
    static ref STYLE_RE: Regex = Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").unwrap();
}

const OP: &str = "parse HTML";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

fn resolve_entity(name: &str) -> Option<&'static str> {
    Some(match name {
        "nbsp" => "\u{a0}",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "euml" => "\u{eb}",
        "eacute" => "\u{e9}",
        "egrave" => "\u{e8}",
        "iuml" => "\u{ef}",
        "ouml" => "\u{f6}",
        "uuml" => "\u{fc}",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "hellip" => "\u{2026}",
        _ => return None,
    })
}

/// Parse `html` into a [`Document`] whose root holds the top-level nodes.
pub fn parse_html(html: &str) -> Result<Document> {
    let html = SCRIPT_RE.replace_all(html, "");
    let html = STYLE_RE.replace_all(&html, "");

    let mut reader = Reader::from_str(&html);
    reader.trim_text(false);
    reader.check_end_names(false);

    // Open elements; the bottom entry is the document root.
    let mut stack = vec![Element::new("#document")];
    loop {
        let event = reader.read_event().map_err(|e| {
            Error::new(format!("{} at byte {}", OP, reader.buffer_position()), ErrorKind::Html)
                .with_cause(e)
        })?;
        match event {
            Event::Start(ref start) => {
                let element = start_element(start);
                if VOID_ELEMENTS.contains(&element.tag()) {
                    append(&mut stack, Node::Element(element));
                } else {
                    stack.push(element);
                }
            },
            Event::Empty(ref start) => append(&mut stack, Node::Element(start_element(start))),
            Event::End(ref end) => {
                let name = String::from_utf8_lossy(end.name().as_ref()).to_ascii_lowercase();
                close(&mut stack, &name);
            },
            Event::Text(ref text) => append(&mut stack, Node::Text(decode_text(text))),
            Event::CData(ref data) => {
                append(&mut stack, Node::Text(String::from_utf8_lossy(data).into_owned()))
            },
            Event::Eof => break,
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {},
        }
    }

    while stack.len() > 1 {
        close_top(&mut stack);
    }
    let root = stack.pop().unwrap_or_else(|| Element::new("#document"));
    Ok(Document::new(root))
}

fn start_element(start: &BytesStart<'_>) -> Element {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = Element::new(tag);
    for attr in start.html_attributes().flatten() {
        let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = decode_entities(&String::from_utf8_lossy(&attr.value));
        element = element.with_attribute(name, value);
    }
    element
}

fn decode_text(text: &BytesText<'_>) -> String {
    decode_entities(&String::from_utf8_lossy(text))
}

/// Decode entities one by one. An unknown entity stays verbatim and does not
/// stop its neighbours from being decoded.
fn decode_entities(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let end = tail
            .find(';')
            .filter(|&end| end > 1 && !tail[1..end].contains(|c: char| c == '&' || c.is_whitespace()));
        match end {
            Some(end) => {
                let entity = &tail[..=end];
                match unescape_with(entity, resolve_entity) {
                    Ok(decoded) => out.push_str(&decoded),
                    Err(_) => out.push_str(entity),
                }
                rest = &tail[end + 1..];
            },
            None => {
                out.push('&');
                rest = &tail[1..];
            },
        }
    }
    out.push_str(rest);
    out
}

fn append(stack: &mut [Element], node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.push_child(node);
    }
}

fn close_top(stack: &mut Vec<Element>) {
    if let Some(done) = stack.pop() {
        append(stack, Node::Element(done));
    }
}

/// Close `name` and anything still open inside it. A name that is not open is ignored.
fn close(stack: &mut Vec<Element>, name: &str) {
    let Some(pos) = stack.iter().skip(1).rposition(|e| e.tag() == name) else {
        log::debug!("Ignoring stray </{}>", name);
        return;
    };
    let depth = pos + 1;
    while stack.len() > depth {
        close_top(stack);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf2htmlex_shape() {
        let html = r#"<!DOCTYPE html>
<html><head><meta charset="utf-8">
<style type="text/css">.t{white-space:pre} a > b { }</style>
<script>if (a < b && c) { document.write("<div>"); }</script>
</head><body>
<div id="page-container"><div id="pf1" class="pf"><div class="t">Achternaam<span class="_"> </span>Jansen</div></div><div id="pf2" class="pf"></div></div>
</body></html>"#;
        let doc = parse_html(html).unwrap();
        let pages = doc.pages().unwrap();
        assert_eq!(pages.len(), 2);

        let row = pages[0].element().child_elements().next().unwrap();
        assert_eq!(row.attribute("class"), Some("t"));
        assert_eq!(row.children().len(), 3);
        assert_eq!(row.children()[0].as_text(), Some("Achternaam"));
        assert_eq!(row.children()[2].as_text(), Some("Jansen"));
        assert!(!doc.root().text_content().contains("document.write"));
    }

    #[test]
    fn test_entities() {
        let doc = parse_html("<p title=\"a&amp;b\">3&nbsp;maart &lt;1990&gt;</p><p>&bogus;</p>").unwrap();
        let mut paragraphs = doc.root().child_elements();
        let first = paragraphs.next().unwrap();
        assert_eq!(first.attribute("title"), Some("a&b"));
        assert_eq!(first.text_content(), "3\u{a0}maart <1990>");
        // Unknown entities are kept verbatim.
        assert_eq!(paragraphs.next().unwrap().text_content(), "&bogus;");
    }

    #[test]
    fn test_unknown_entity_leaves_others_decoded() {
        let doc = parse_html("<p title=\"&zwsp;&amp;\">Kunst &amp; Techniek &zwsp; &#233;&eacute; R&D</p>").unwrap();
        let p = doc.root().child_elements().next().unwrap();
        assert_eq!(p.text_content(), "Kunst & Techniek &zwsp; \u{e9}\u{e9} R&D");
        assert_eq!(p.attribute("title"), Some("&zwsp;&"));
    }

    #[test]
    fn test_unbalanced_tags() {
        let doc = parse_html("<div id=x><p>one<br>two</span></div><div>three").unwrap();
        let x = doc.find_by_id("x").unwrap();
        let p = x.child_elements().next().unwrap();
        assert_eq!(p.tag(), "p");
        assert_eq!(p.children().len(), 3);
        assert_eq!(doc.root().child_elements().count(), 2);
        assert_eq!(doc.root().text_content(), "onetwothree");
    }

    #[test]
    fn test_whitespace_text_is_kept() {
        let doc = parse_html("<div><span>a</span> <span>b</span></div>").unwrap();
        let div = doc.root().child_elements().next().unwrap();
        assert_eq!(div.children().len(), 3);
        assert_eq!(div.children()[1].as_text(), Some(" "));
    }
}
