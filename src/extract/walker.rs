//! Page walk: collect `label : value` rows from a rendered page.
//!
//! Every `div` of the page (the page element included) is visited in
//! document order and classified by its direct child nodes:
//!
//! - one text child: a stand-alone line, possibly the register marker
//! - three children, the first and last text: a row; the middle child is the
//!   separator glyph
//! - anything else: ignored
//!
//! The institution name may wrap onto following lines, so the walk is a
//! two-state machine: after an `Instelling` row, stand-alone lines are
//! appended to that row's value until some other element comes along. The
//! marker line ends a continuation rather than extending it.

use crate::dom::{Element, Node};
use indexmap::IndexMap;

/// Text of the line that identifies a diploma page.
pub const DIPLOMA_MARKER: &str = "Uittreksel uit het diplomaregister";

/// The only label whose value continues on following lines.
pub const CONTINUED_LABEL: &str = "Instelling";

/// Labels and values of one page, in first-seen label order.
pub type RawAttributeMap = IndexMap<String, String>;

/// Result of walking one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPage {
    /// Whether the diploma marker was seen.
    pub is_diploma: bool,
    pub fields: RawAttributeMap,
}

/// Classification of one visited element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    Marker,
    Row { label: &'a str, value: &'a str },
    SingleText(&'a str),
    Other,
}

impl<'a> Line<'a> {
    pub fn classify(element: &'a Element) -> Self {
        match element.children() {
            [Node::Text(text)] if text == DIPLOMA_MARKER => Line::Marker,
            [Node::Text(text)] => Line::SingleText(text),
            [Node::Text(label), _, Node::Text(value)] => Line::Row {
                label: label.trim(),
                value: value.trim(),
            },
            _ => Line::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Idle,
    AwaitingContinuation(String),
}

/// Walk `page` and collect its rows.
pub fn walk(page: &Element) -> RawPage {
    let mut raw = RawPage::default();
    let mut state = State::Idle;

    for element in page.descendants().filter(|e| e.tag() == "div") {
        let line = Line::classify(element);

        if let (State::AwaitingContinuation(key), Line::SingleText(text)) = (&state, line) {
            if let Some(value) = raw.fields.get_mut(key) {
                value.push(' ');
                value.push_str(text.trim());
            }
            continue;
        }

        state = State::Idle;
        match line {
            Line::Marker => raw.is_diploma = true,
            Line::Row { label, value } => {
                raw.fields.insert(label.to_string(), value.to_string());
                if label == CONTINUED_LABEL {
                    state = State::AwaitingContinuation(label.to_string());
                }
            },
            Line::SingleText(_) | Line::Other => {},
        }
    }
    raw
}
