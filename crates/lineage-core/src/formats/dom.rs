//! Minimal element tree over quick-xml's pull parser.
//!
//! The reader needs random access to children (a person's parents are
//! resolved after every person has been parsed), so the document is first
//! materialized into `XmlElement`s. Leaf elements keep their text exactly;
//! whitespace-only text between child elements is indentation and dropped.

use crate::LineageError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::str::FromStr;

#[derive(Debug, Clone, Default)]
pub(crate) struct XmlElement {
    pub name: String,
    attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: String,
}

impl XmlElement {
    fn open(start: &BytesStart<'_>) -> Result<Self, LineageError> {
        let name = std::str::from_utf8(start.name().as_ref())
            .map_err(LineageError::io)?
            .to_string();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(LineageError::io)?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(LineageError::io)?
                .to_string();
            let value = attr.unescape_value().map_err(LineageError::io)?.into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
            text: String::new(),
        })
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn required_attr(&self, name: &str) -> Result<&str, LineageError> {
        self.attr(name).ok_or_else(|| {
            LineageError::format(format!("<{}> is missing attribute '{name}'", self.name))
        })
    }

    /// Parse an optional attribute. A present but unparsable value is a
    /// format error.
    pub fn parse_attr<T: FromStr>(&self, name: &str) -> Result<Option<T>, LineageError> {
        self.attr(name)
            .map(|raw| {
                raw.trim().parse().map_err(|_| {
                    LineageError::format(format!(
                        "<{}> attribute '{name}' has invalid value '{raw}'",
                        self.name
                    ))
                })
            })
            .transpose()
    }

    pub fn parse_required_attr<T: FromStr>(&self, name: &str) -> Result<T, LineageError> {
        self.parse_attr(name)?.ok_or_else(|| {
            LineageError::format(format!("<{}> is missing attribute '{name}'", self.name))
        })
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn required_child(&self, name: &str) -> Result<&XmlElement, LineageError> {
        self.child(name).ok_or_else(|| {
            LineageError::format(format!("<{}> is missing child <{name}>", self.name))
        })
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

/// Parse a whole document into its root element.
pub(crate) fn parse(input: &str) -> Result<XmlElement, LineageError> {
    let mut reader = Reader::from_str(input);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event().map_err(LineageError::io)? {
            Event::Start(start) => stack.push(XmlElement::open(&start)?),
            Event::Empty(start) => {
                let element = XmlElement::open(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let mut element = stack
                    .pop()
                    .ok_or_else(|| LineageError::format("unbalanced closing tag"))?;
                if !element.children.is_empty() && element.text.trim().is_empty() {
                    element.text.clear();
                }
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(LineageError::io)?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                let bytes = data.into_inner();
                let text = std::str::from_utf8(&bytes).map_err(LineageError::io)?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(LineageError::format(format!("<{}> is never closed", open.name)));
    }
    root.ok_or_else(|| LineageError::format("document has no root element"))
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), LineageError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_some() => {
            return Err(LineageError::format("document has more than one root element"));
        }
        None => *root = Some(element),
    }
    Ok(())
}
