//! Quoted-message ("reference message") markup.
//!
//! Stored bodies are HTML-entity-escaped and had the CDATA wrapper around the
//! nested document stripped. [`repair_markup`] undoes both so the body parses,
//! then [`parse_quoted_message`] pulls out the visible reply and the quoted
//! message it refers to.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;

use crate::compressed::decode_compressed_content;
use crate::error::CodecError;
use crate::payload::Payload;

/// App-message sub-type of a quoted/reference message.
pub const QUOTE_SUB_TYPE: &str = "57";

const REPAIRS: &[(&str, &str)] = &[
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&amp;", "&"),
    (
        "<content><?xml version=\"1.0\"?>",
        "<content><![CDATA[<?xml version=\"1.0\"?>",
    ),
    ("</msg>\n</content>", "</msg>]]>\n</content>"),
];

/// A reply that quotes an earlier message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotedMessage {
    /// The visible reply text.
    pub content: String,
    /// Identity of whoever wrote the reply.
    pub sender: String,
    /// Identity of the quoted message's author.
    pub referred_sender: String,
    /// Text of the quoted message.
    pub referred_text: String,
}

/// Reverse the entity escaping and restore the CDATA wrapper around the
/// embedded document fragment.
pub fn repair_markup(xml: &str) -> String {
    REPAIRS
        .iter()
        .fold(xml.to_string(), |acc, (from, to)| acc.replace(from, to))
}

/// Repair and parse a quoted-message body.
///
/// Returns [`CodecError::Parse`] when the markup is not a quote (sub-type
/// other than 57) or lacks a required field, and [`CodecError::Decode`] when
/// it is not well-formed.
pub fn parse_quoted_message(raw_markup: &str) -> Result<QuotedMessage, CodecError> {
    let root = Element::parse(&repair_markup(raw_markup))?;

    let sub_type = root
        .find("type")
        .map(|e| e.text.as_str())
        .ok_or_else(|| CodecError::Parse("message has no type".into()))?;
    if sub_type != QUOTE_SUB_TYPE {
        return Err(CodecError::Parse(format!(
            "message sub-type {sub_type} is not a quoted message"
        )));
    }

    let content = required_text(&root, "title")?;
    let sender = required_text(&root, "fromusername")?;

    let refer = root
        .find("refermsg")
        .ok_or_else(|| CodecError::Parse("quoted message has no refermsg".into()))?;
    let referred_sender = refer
        .child("chatusr")
        .map(|e| e.text.clone())
        .ok_or_else(|| CodecError::Parse("refermsg has no chatusr".into()))?;

    let mut referred_text = refer
        .child("content")
        .map(|e| e.text.clone())
        .filter(|t| !t.is_empty())
        .or_else(|| refer.find("title").map(|e| e.text.clone()))
        .unwrap_or_default();

    // The quoted message may itself be an app message; its title is the text.
    if referred_text.starts_with('<') {
        let nested = Element::parse(&referred_text)?;
        referred_text = nested
            .find("title")
            .map(|e| e.text.clone())
            .unwrap_or_default();
    }

    Ok(QuotedMessage {
        content,
        sender,
        referred_sender,
        referred_text,
    })
}

/// Decompress a stored quoted-message body and parse it.
pub fn decode_quoted_message<'a>(
    raw_compressed: impl Into<Payload<'a>>,
) -> Result<QuotedMessage, CodecError> {
    let markup = decode_compressed_content(raw_compressed)?;
    parse_quoted_message(&markup)
}

fn required_text(root: &Element, name: &str) -> Result<String, CodecError> {
    root.find(name)
        .map(|e| e.text.clone())
        .ok_or_else(|| CodecError::Parse(format!("message has no {name}")))
}

/// Minimal element tree: enough for path lookups, attributes are dropped.
#[derive(Debug, Default)]
struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn new(name: &[u8]) -> Self {
        Self {
            name: String::from_utf8_lossy(name).into_owned(),
            ..Default::default()
        }
    }

    fn parse(xml: &str) -> Result<Element, CodecError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => stack.push(Element::new(e.name().as_ref())),
                Ok(Event::Empty(e)) => {
                    let el = Element::new(e.name().as_ref());
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(el),
                        None => root = root.or(Some(el)),
                    }
                }
                Ok(Event::End(_)) => {
                    let el = stack
                        .pop()
                        .ok_or_else(|| CodecError::Decode("unbalanced end tag".into()))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(el),
                        None => root = root.or(Some(el)),
                    }
                }
                Ok(Event::Text(t)) => {
                    // only text ahead of the first child belongs to an element
                    if let Some(top) = stack.last_mut().filter(|top| top.children.is_empty()) {
                        // A bare '&' left over from repair is kept verbatim.
                        let text = t
                            .unescape()
                            .map(|c| c.into_owned())
                            .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                        top.text.push_str(&text);
                    }
                }
                Ok(Event::CData(c)) => {
                    if let Some(top) = stack.last_mut().filter(|top| top.children.is_empty()) {
                        top.text.push_str(&String::from_utf8_lossy(&c));
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(CodecError::Decode(format!(
                        "malformed markup at byte {}: {e}",
                        reader.buffer_position()
                    )))
                }
            }
        }

        if !stack.is_empty() {
            return Err(CodecError::Decode("markup ended inside an element".into()));
        }
        root.ok_or_else(|| CodecError::Decode("markup has no root element".into()))
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// First descendant (document order, root excluded) with the given name.
    fn find(&self, name: &str) -> Option<&Element> {
        let mut pending: Vec<&Element> = self.children.iter().rev().collect();
        while let Some(el) = pending.pop() {
            if el.name == name {
                return Some(el);
            }
            pending.extend(el.children.iter().rev());
        }
        None
    }
}
