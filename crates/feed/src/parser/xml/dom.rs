// ABOUTME: Owned, namespace-resolved XML element tree built with quick-xml's NsReader.
// ABOUTME: Each element carries its effective xml:base URL and inherited xml:lang.

use quick_xml::events::{BytesStart, Event};
use quick_xml::escape::{escape, unescape};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use std::borrow::Cow;

use crate::error::FeedError;
use crate::url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub ns: Option<String>,
    pub name: String,
    /// Name as written, including any prefix.
    pub qname: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub ns: Option<String>,
    /// Local name.
    pub name: String,
    pub qname: String,
    pub attrs: Vec<Attr>,
    pub children: Vec<Node>,
    /// Effective base URL.
    pub base: Option<Url>,
    /// Inherited `xml:lang`.
    pub lang: Option<String>,
}

impl Element {
    pub fn is(&self, ns: Option<&str>, name: &str) -> bool {
        self.ns.as_deref() == ns && self.name == name
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    pub fn children_named<'a>(
        &'a self,
        ns: Option<&'a str>,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements().filter(move |e| e.is(ns, name))
    }

    pub fn child(&self, ns: Option<&str>, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.is(ns, name))
    }

    /// Trimmed text of the first matching child, if non-empty.
    pub fn child_text(&self, ns: Option<&str>, name: &str) -> Option<String> {
        self.children_named(ns, name).find_map(Element::trimmed_text)
    }

    /// Value of an attribute without a namespace.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attr_ns(None, name)
    }

    pub fn attr_ns(&self, ns: Option<&str>, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.ns.as_deref() == ns && a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Concatenated text of all descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
            }
        }
    }

    pub fn trimmed_text(&self) -> Option<String> {
        let text = self.text();
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    /// Resolves a URL found in this element against its base.
    pub fn resolve(&self, reference: &str) -> Option<Url> {
        Url::resolve_opt(reference, self.base.as_ref())
    }

    /// Serialized markup of the children.
    pub fn inner_xml(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            write_node(node, &mut out);
        }
        out
    }
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(t) => out.push_str(&escape(t.as_str())),
        Node::Element(e) => {
            out.push('<');
            out.push_str(&e.qname);
            for attr in &e.attrs {
                out.push(' ');
                out.push_str(&attr.qname);
                out.push_str("=\"");
                out.push_str(&escape(attr.value.as_str()));
                out.push('"');
            }
            if e.children.is_empty() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for child in &e.children {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(&e.qname);
            out.push('>');
        }
    }
}

/// Parses a well-formed XML document into its root element.
///
/// `base` seeds `xml:base` resolution for the root.
pub fn parse_document(input: &str, base: Option<&Url>) -> Result<Element, FeedError> {
    let mut reader = NsReader::from_str(input);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event().map_err(FeedError::not_xml)?;
        match event {
            Event::Start(start) => {
                let parent = stack.last();
                let element = open_element(&reader, &start, parent, base)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = open_element(&reader, &start, stack.last(), base)?;
                close_element(element, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| FeedError::not_xml("unexpected closing tag"))?;
                close_element(element, &mut stack, &mut root)?;
            }
            Event::Text(text) => {
                let raw = text.decode().map_err(FeedError::not_xml)?;
                let value = unescape(&raw)
                    .map(Cow::into_owned)
                    .unwrap_or_else(|_| raw.into_owned());
                push_text(&mut stack, value);
            }
            Event::CData(cdata) => {
                let value = cdata.decode().map_err(FeedError::not_xml)?;
                push_text(&mut stack, value.into_owned());
            }
            Event::GeneralRef(reference) => {
                let value = match reference.resolve_char_ref() {
                    Ok(Some(c)) => c.to_string(),
                    _ => {
                        let name = String::from_utf8_lossy(&reference).into_owned();
                        named_entity(&name)
                    }
                };
                push_text(&mut stack, value);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(FeedError::not_xml("unexpected end of document"));
    }
    root.ok_or_else(|| FeedError::not_xml("no root element"))
}

fn named_entity(name: &str) -> String {
    match name {
        "amp" => "&".into(),
        "lt" => "<".into(),
        "gt" => ">".into(),
        "quot" => "\"".into(),
        "apos" => "'".into(),
        "nbsp" => "\u{a0}".into(),
        other => format!("&{};", other),
    }
}

fn push_text(stack: &mut [Element], value: String) {
    if value.is_empty() {
        return;
    }
    if let Some(current) = stack.last_mut() {
        if let Some(Node::Text(prev)) = current.children.last_mut() {
            prev.push_str(&value);
        } else {
            current.children.push(Node::Text(value));
        }
    }
}

fn close_element(
    element: Element,
    stack: &mut [Element],
    root: &mut Option<Element>,
) -> Result<(), FeedError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => return Err(FeedError::not_xml("multiple root elements")),
    }
    Ok(())
}

fn namespace(result: ResolveResult<'_>) -> Option<String> {
    match result {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        _ => None,
    }
}

fn open_element(
    reader: &NsReader<&[u8]>,
    start: &BytesStart<'_>,
    parent: Option<&Element>,
    doc_base: Option<&Url>,
) -> Result<Element, FeedError> {
    let qname = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let (resolved, local) = reader.resolve_element(start.name());
    // undeclared prefixes keep their prefix so they never match a real namespace
    let (ns, name) = match resolved {
        ResolveResult::Unknown(_) => (None, qname.clone()),
        other => (namespace(other), String::from_utf8_lossy(local.as_ref()).into_owned()),
    };

    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(FeedError::not_xml)?;
        let attr_qname = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let (resolved, local) = reader.resolve_attribute(attr.key);
        let raw = String::from_utf8_lossy(&attr.value).into_owned();
        let value = match unescape(&raw) {
            Ok(v) => v.into_owned(),
            Err(_) => raw,
        };
        attrs.push(Attr {
            ns: namespace(resolved),
            name: String::from_utf8_lossy(local.as_ref()).into_owned(),
            qname: attr_qname,
            value,
        });
    }

    let inherited_base = parent.map_or(doc_base, |p| p.base.as_ref());
    let base = match attrs.iter().find(|a| a.qname == "xml:base") {
        Some(attr) => {
            Url::resolve_opt(&attr.value, inherited_base).or_else(|| inherited_base.cloned())
        }
        None => inherited_base.cloned(),
    };
    let lang = match attrs.iter().find(|a| a.qname == "xml:lang") {
        Some(attr) if !attr.value.trim().is_empty() => Some(attr.value.trim().to_string()),
        Some(_) => None,
        None => parent.and_then(|p| p.lang.clone()),
    };

    Ok(Element {
        ns,
        name,
        qname,
        attrs,
        children: Vec::new(),
        base,
        lang,
    })
}
