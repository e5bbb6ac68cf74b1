//! Owned, mutable XML tree used for every part the engine rewrites.
//!
//! Unlike a normalizing DOM, the tree keeps qualified names (`xdr:row`), attribute order, the
//! prolog (XML declaration and any whitespace before the root) and comments, so a part that is
//! parsed and serialized without edits is semantically identical to the input.

use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{Result, TemplateError};

#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    prolog: Vec<Event<'static>>,
    pub root: XmlElement,
    epilog: Vec<Event<'static>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    /// Unescaped character data.
    Text(String),
    CData(String),
    /// Comments and processing instructions, re-emitted as read.
    Verbatim(Event<'static>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    /// Qualified name as written in the document, prefix included.
    pub name: String,
    /// Attributes in document order with unescaped values.
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlDocument {
    pub fn parse(part_name: &str, bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(bytes);
        reader.config_mut().trim_text(false);

        let mut buf = Vec::new();
        let mut prolog = Vec::new();
        let mut epilog = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| TemplateError::parse(part_name, e))?;
            match event {
                Event::Start(e) => stack.push(element_from_start(part_name, &e)?),
                Event::Empty(e) => {
                    let element = element_from_start(part_name, &e)?;
                    attach(part_name, &mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| TemplateError::parse(part_name, "unbalanced end tag"))?;
                    attach(part_name, &mut stack, &mut root, element)?;
                }
                Event::Text(t) => match stack.last_mut() {
                    Some(parent) => {
                        let text = t
                            .unescape()
                            .map_err(|e| TemplateError::parse(part_name, e))?
                            .into_owned();
                        parent.children.push(XmlNode::Text(text));
                    }
                    None => outside_root(&root, &mut prolog, &mut epilog, Event::Text(t.into_owned())),
                },
                Event::CData(c) => match stack.last_mut() {
                    Some(parent) => {
                        let text = String::from_utf8(c.into_inner().into_owned())
                            .map_err(|e| TemplateError::parse(part_name, e))?;
                        parent.children.push(XmlNode::CData(text));
                    }
                    None => return Err(TemplateError::parse(part_name, "CDATA outside root element")),
                },
                Event::Eof => break,
                other => match stack.last_mut() {
                    Some(parent) => parent.children.push(XmlNode::Verbatim(other.into_owned())),
                    None => outside_root(&root, &mut prolog, &mut epilog, other.into_owned()),
                },
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(TemplateError::parse(part_name, "unexpected end of document"));
        }
        let root = root.ok_or_else(|| TemplateError::parse(part_name, "document has no root element"))?;

        Ok(Self {
            prolog,
            root,
            epilog,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        for event in &self.prolog {
            write_event(&mut writer, event.clone())?;
        }
        self.root.write_to(&mut writer)?;
        for event in &self.epilog {
            write_event(&mut writer, event.clone())?;
        }
        Ok(writer.into_inner())
    }
}

fn outside_root(
    root: &Option<XmlElement>,
    prolog: &mut Vec<Event<'static>>,
    epilog: &mut Vec<Event<'static>>,
    event: Event<'static>,
) {
    if root.is_some() {
        epilog.push(event);
    } else {
        prolog.push(event);
    }
}

fn attach(
    part_name: &str,
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => return Err(TemplateError::parse(part_name, "multiple root elements")),
    }
    Ok(())
}

fn element_from_start(part_name: &str, start: &BytesStart<'_>) -> Result<XmlElement> {
    let name = String::from_utf8(start.name().as_ref().to_vec())
        .map_err(|e| TemplateError::parse(part_name, e))?;
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| TemplateError::parse(part_name, e))?;
        let key = String::from_utf8(attr.key.as_ref().to_vec())
            .map_err(|e| TemplateError::parse(part_name, e))?;
        let value = attr
            .unescape_value()
            .map_err(|e| TemplateError::parse(part_name, e))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(XmlElement {
        name,
        attrs,
        children: Vec::new(),
    })
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| TemplateError::Io(std::io::Error::other(e.to_string())))
}

impl From<XmlElement> for XmlNode {
    fn from(el: XmlElement) -> Self {
        XmlNode::Element(el)
    }
}

/// Strip a namespace prefix: `xdr:row` -> `row`.
pub fn local_name(name: &str) -> &str {
    match name.rsplit_once(':') {
        Some((_, local)) => local,
        None => name,
    }
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    pub fn is(&self, local: &str) -> bool {
        self.local_name() == local
    }

    /// Qualified name for a new child element, reusing this element's prefix.
    pub fn child_name(&self, local: &str) -> String {
        match self.name.rsplit_once(':') {
            Some((prefix, _)) => format!("{prefix}:{local}"),
            None => local.to_string(),
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Attribute lookup by local name, ignoring any prefix (`r:id` matches `id`).
    pub fn attr_local(&self, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| local_name(k) == local)
            .map(|(_, v)| v.as_str())
    }

    /// Overwrite in place (keeping attribute order) or append.
    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((key.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, key: &str) -> Option<String> {
        let idx = self.attrs.iter().position(|(k, _)| k == key)?;
        Some(self.attrs.remove(idx).1)
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.is(local))
    }

    pub fn child_mut(&mut self, local: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|el| el.is(local))
    }

    /// Index into `children` of the first element child with this local name.
    pub fn child_index(&self, local: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|node| matches!(node, XmlNode::Element(el) if el.is(local)))
    }

    /// Concatenated direct text content.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            match node {
                XmlNode::Text(t) | XmlNode::CData(t) => out.push_str(t),
                _ => {}
            }
        }
        out
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![XmlNode::Text(text.into())];
    }

    /// Depth-first, pre-order visit of this element and every descendant element.
    pub fn visit_mut(&mut self, f: &mut impl FnMut(&mut XmlElement)) {
        f(self);
        for child in self.elements_mut() {
            child.visit_mut(f);
        }
    }

    fn write_to(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (k, v) in &self.attrs {
            start.push_attribute((k.as_str(), v.as_str()));
        }

        if self.children.is_empty() {
            return write_event(writer, Event::Empty(start));
        }

        write_event(writer, Event::Start(start))?;
        for child in &self.children {
            match child {
                XmlNode::Element(el) => el.write_to(writer)?,
                XmlNode::Text(t) => write_event(writer, Event::Text(BytesText::new(t)))?,
                XmlNode::CData(t) => write_event(writer, Event::CData(BytesCData::new(t.as_str())))?,
                XmlNode::Verbatim(event) => write_event(writer, event.clone())?,
            }
        }
        write_event(writer, Event::End(BytesEnd::new(self.name.as_str())))
    }
}
