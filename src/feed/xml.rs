//! A small, forgiving element tree for feed documents.
//!
//! Only what the format decoders need: namespace-resolved names, attribute
//! values, the character data directly inside each element, and the raw
//! markup between an element's tags. Entities are decoded with HTML rules so
//! `&nbsp;` and friends in otherwise valid XML do not sink the whole feed.

use std::borrow::Cow;
use std::ops::Range;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

use super::decode::DecodeError;

/// Maximum element nesting accepted before giving up.
const MAX_DEPTH: usize = 256;

pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
pub const CONTENT_NS: &str = "http://purl.org/rss/1.0/modules/content/";
pub const MEDIA_NS: &str = "http://search.yahoo.com/mrss/";

/// How an element name is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Name<'a> {
    /// Local name in any namespace, or none.
    Any(&'a str),
    /// Local name with no namespace.
    Plain(&'a str),
    /// Local name in the given namespace.
    In(&'a str, &'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Attr {
    qualified: String,
    local: String,
    value: String,
}

/// One element of a parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    namespace: Option<String>,
    name: String,
    attrs: Vec<Attr>,
    text: String,
    inner: Range<usize>,
    children: Vec<Element>,
}

impl Element {
    fn open(namespace: Option<String>, start: &BytesStart<'_>, inner_start: usize) -> Self {
        let mut attrs = Vec::new();
        for attr in start.attributes().with_checks(false) {
            match attr {
                Ok(attr) => {
                    let raw = String::from_utf8_lossy(&attr.value);
                    attrs.push(Attr {
                        qualified: String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                        local: String::from_utf8_lossy(attr.key.local_name().as_ref())
                            .into_owned(),
                        value: html_escape::decode_html_entities(&raw).into_owned(),
                    });
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping malformed attribute");
                }
            }
        }

        Self {
            namespace,
            name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
            attrs,
            text: String::new(),
            inner: inner_start..inner_start,
            children: Vec::new(),
        }
    }

    /// Local name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace URI, if the element is in one.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Whether this element matches `name`.
    pub fn is(&self, name: Name<'_>) -> bool {
        match name {
            Name::Any(local) => self.name == local,
            Name::Plain(local) => self.namespace.is_none() && self.name == local,
            Name::In(ns, local) => self.namespace.as_deref() == Some(ns) && self.name == local,
        }
    }

    /// Character data directly inside this element, entities decoded.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// First child matching `name`.
    pub fn child(&self, name: Name<'_>) -> Option<&Element> {
        self.children.iter().find(|c| c.is(name))
    }

    /// All children matching `name`, in document order.
    pub fn children<'s>(&'s self, name: Name<'s>) -> impl Iterator<Item = &'s Element> + 's {
        self.children.iter().filter(move |c| c.is(name))
    }

    /// Text of the first child matching `name`, or `""`.
    pub fn child_text(&self, name: Name<'_>) -> &str {
        self.child(name).map(Element::text).unwrap_or("")
    }

    /// Attribute value by local name, ignoring any prefix.
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.local == local)
            .map(|a| a.value.as_str())
    }

    /// Attribute value by its name as written, e.g. `xml:base`.
    pub fn attr_qualified(&self, qualified: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.qualified == qualified)
            .map(|a| a.value.as_str())
    }
}

/// A parsed document borrowing its UTF-8 source.
#[derive(Debug)]
pub struct Document<'a> {
    source: &'a str,
    root: Element,
}

impl<'a> Document<'a> {
    /// Parses `source` up to the end of its root element.
    ///
    /// Anything after the root element is ignored.
    ///
    /// # Errors
    ///
    /// Returns a `DecodeError` for malformed markup, a document with no
    /// root element, one that ends before its root closes, or nesting
    /// deeper than the supported limit.
    pub fn parse(source: &'a str) -> Result<Self, DecodeError> {
        let mut reader = NsReader::from_str(source);
        reader.config_mut().trim_text(false);

        let mut buf = Vec::new();
        let mut stack: Vec<Element> = Vec::new();

        loop {
            let before = reader.buffer_position() as usize;
            let (ns, event) = match reader.read_resolved_event_into(&mut buf) {
                Ok((ns, event)) => (namespace_of(ns), event),
                Err(e) => {
                    return Err(DecodeError::Xml {
                        position: reader.buffer_position() as u64,
                        message: e.to_string(),
                    })
                }
            };
            let after = reader.buffer_position() as usize;

            match event {
                Event::Start(start) => {
                    if stack.len() >= MAX_DEPTH {
                        return Err(DecodeError::TooDeep(MAX_DEPTH));
                    }
                    stack.push(Element::open(ns, &start, after));
                }
                Event::Empty(start) => {
                    let element = Element::open(ns, &start, after);
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => return Ok(Self { source, root: element }),
                    }
                }
                Event::End(_) => {
                    let Some(mut element) = stack.pop() else {
                        return Err(DecodeError::Xml {
                            position: before as u64,
                            message: "unexpected closing tag".to_owned(),
                        });
                    };
                    element.inner.end = before;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => return Ok(Self { source, root: element }),
                    }
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        let raw = String::from_utf8_lossy(&text);
                        current
                            .text
                            .push_str(&html_escape::decode_html_entities(&raw));
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&data));
                    }
                }
                Event::Eof => {
                    return Err(if stack.is_empty() {
                        DecodeError::MissingRoot
                    } else {
                        DecodeError::UnexpectedEof
                    });
                }
                _ => {}
            }
            buf.clear();
        }
    }

    /// The root element.
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Raw markup between `element`'s start and end tags.
    pub fn inner_xml(&self, element: &Element) -> &'a str {
        self.source.get(element.inner.clone()).unwrap_or("")
    }
}

fn namespace_of(resolved: ResolveResult<'_>) -> Option<String> {
    match resolved {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        _ => None,
    }
}

/// Decodes entities in a string the way element text is decoded.
pub fn unescape(raw: &str) -> Cow<'_, str> {
    html_escape::decode_html_entities(raw)
}
