//! Typed value codec for the WSDL wire format
//!
//! The remote API speaks a restricted SOAP 1.1 encoding: every value is an
//! XML element annotated with `xsi:type` (or `xsi:nil` for null). Only the
//! type encodings the service actually uses are supported: null, string,
//! int, boolean, ordered key/value maps (Apache SOAP `Map`) and arrays
//! (SOAP encoding `Array`).
//!
//! Uses quick-xml events for parsing and serialization.

use std::collections::HashMap;
use std::io;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::constants::{NS_APACHE_MAP, NS_SOAP_ENC, NS_XSD, NS_XSI};
use crate::error::Error;

//==============================================================================
// Values
//==============================================================================

/// A native value in the restricted WSDL type system.
///
/// Maps preserve entry order; the wire format has no canonical ordering and
/// the service is sensitive to argument order.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    String(String),
    Int(i64),
    Bool(bool),
    Map(Vec<(Value, Value)>),
    List(Vec<Value>),
}

impl Value {
    /// Short kind name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::String(_) => "string",
            Value::Int(_) => "int",
            Value::Bool(_) => "boolean",
            Value::Map(_) => "map",
            Value::List(_) => "array",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view. The service is loose about int-vs-string encoding, so
    /// numeric strings count as integers here.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Looks up a string-keyed map entry.
    pub fn map_get(&self, key: &str) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

//==============================================================================
// XML node tree
//==============================================================================

/// A resolved XML attribute: namespace, local name, value.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlAttribute {
    pub namespace: Option<String>,
    pub name: String,
    pub value: String,
}

/// An XML element with resolved namespaces.
///
/// Nodes built by the parser also carry the prefix bindings that were in
/// scope at their position, so QName-valued attribute text (`xsi:type`,
/// `faultcode`) can be resolved later.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlNode {
    pub name: String,
    pub namespace: Option<String>,
    pub attributes: Vec<XmlAttribute>,
    pub text: String,
    pub children: Vec<XmlNode>,
    bindings: HashMap<String, String>,
}

impl XmlNode {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: None,
            attributes: Vec::new(),
            text: String::new(),
            children: Vec::new(),
            bindings: HashMap::new(),
        }
    }

    pub fn with_namespace(name: &str, namespace: &str) -> Self {
        let mut node = Self::new(name);
        node.namespace = Some(namespace.to_string());
        node
    }

    pub fn set_attribute(&mut self, namespace: Option<&str>, name: &str, value: &str) {
        self.attributes.push(XmlAttribute {
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    pub fn attribute(&self, namespace: Option<&str>, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.as_deref() == namespace && a.name == name)
            .map(|a| a.value.as_str())
    }

    /// First direct child with the given local name and no namespace.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children
            .iter()
            .find(|c| c.namespace.is_none() && c.name == name)
    }

    /// All descendants-or-self matching namespace and local name, in
    /// document order.
    pub fn find_all<'a>(&'a self, namespace: Option<&str>, name: &str, out: &mut Vec<&'a XmlNode>) {
        if self.namespace.as_deref() == namespace && self.name == name {
            out.push(self);
        }
        for child in &self.children {
            child.find_all(namespace, name, out);
        }
    }

    /// Resolves a `prefix:local` string against the bindings in scope at
    /// this node. Unprefixed text has no namespace; an unknown prefix
    /// resolves to no namespace (the caller decides whether that is fatal).
    pub fn resolve_qname(&self, text: &str) -> (String, Option<String>) {
        match text.split_once(':') {
            Some((prefix, local)) => (local.to_string(), self.bindings.get(prefix).cloned()),
            None => (text.to_string(), None),
        }
    }

    //--------------------------------------------------------------------------
    // Parsing
    //--------------------------------------------------------------------------

    /// Parses a complete XML document into a node tree, resolving element
    /// and attribute namespaces with a scope stack of `xmlns` declarations.
    pub fn parse_document(payload: &[u8]) -> Result<XmlNode, Error> {
        let mut reader = Reader::from_reader(payload);
        let mut stack: Vec<XmlNode> = Vec::new();
        let mut scopes: Vec<HashMap<String, String>> = vec![HashMap::new()];
        let mut root: Option<XmlNode> = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| Error::Coding(format!("malformed XML: {e}")))?;
            match event {
                Event::Start(start) => {
                    let node = open_element(&start, &mut scopes)?;
                    stack.push(node);
                }
                Event::Empty(start) => {
                    let node = open_element(&start, &mut scopes)?;
                    scopes.pop();
                    attach(node, &mut stack, &mut root)?;
                }
                Event::End(_) => {
                    scopes.pop();
                    let node = stack
                        .pop()
                        .ok_or_else(|| Error::Coding("unbalanced end tag".to_string()))?;
                    attach(node, &mut stack, &mut root)?;
                }
                Event::Text(text) => {
                    if let Some(top) = stack.last_mut() {
                        let content = text
                            .unescape()
                            .map_err(|e| Error::Coding(format!("malformed XML text: {e}")))?;
                        top.text.push_str(&content);
                    }
                }
                Event::CData(data) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::Eof => break,
                // Declaration, comments, processing instructions, doctype
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(Error::Coding("unclosed element in document".to_string()));
        }
        root.ok_or_else(|| Error::Coding("document has no root element".to_string()))
    }
}

fn attach(node: XmlNode, stack: &mut Vec<XmlNode>, root: &mut Option<XmlNode>) -> Result<(), Error> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            if root.is_some() {
                return Err(Error::Coding("document has multiple roots".to_string()));
            }
            *root = Some(node);
        }
    }
    Ok(())
}

fn open_element(
    start: &BytesStart<'_>,
    scopes: &mut Vec<HashMap<String, String>>,
) -> Result<XmlNode, Error> {
    let mut bindings = scopes.last().cloned().unwrap_or_default();
    let mut raw_attrs: Vec<(String, String)> = Vec::new();

    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::Coding(format!("malformed attribute: {e}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::Coding(format!("malformed attribute value: {e}")))?
            .into_owned();
        if key == "xmlns" {
            bindings.insert(String::new(), value);
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            bindings.insert(prefix.to_string(), value);
        } else {
            raw_attrs.push((key, value));
        }
    }

    let raw_name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let (name, namespace) = match raw_name.split_once(':') {
        Some((prefix, local)) => {
            let ns = bindings
                .get(prefix)
                .cloned()
                .ok_or_else(|| Error::Coding(format!("undeclared namespace prefix \"{prefix}\"")))?;
            (local.to_string(), Some(ns))
        }
        // The default namespace applies to elements (but not attributes).
        None => (
            raw_name.clone(),
            bindings.get("").filter(|ns| !ns.is_empty()).cloned(),
        ),
    };

    let mut attributes = Vec::new();
    for (key, value) in raw_attrs {
        let (attr_name, attr_ns) = match key.split_once(':') {
            Some((prefix, local)) => {
                let ns = bindings.get(prefix).cloned().ok_or_else(|| {
                    Error::Coding(format!("undeclared namespace prefix \"{prefix}\""))
                })?;
                (local.to_string(), Some(ns))
            }
            None => (key, None),
        };
        attributes.push(XmlAttribute {
            namespace: attr_ns,
            name: attr_name,
            value,
        });
    }

    scopes.push(bindings.clone());
    Ok(XmlNode {
        name,
        namespace,
        attributes,
        text: String::new(),
        children: Vec::new(),
        bindings,
    })
}

//==============================================================================
// Serialization
//==============================================================================

/// Writes a node tree with the given `(namespace, prefix)` table. When
/// `declare` is set, all prefixes are declared on this element.
pub(crate) fn write_node<W: io::Write>(
    writer: &mut Writer<W>,
    node: &XmlNode,
    prefixes: &[(&str, &str)],
    declare: bool,
) -> Result<(), Error> {
    let tag = qualified_name(node.namespace.as_deref(), &node.name, prefixes)?;
    let mut start = BytesStart::new(tag.as_str());
    if declare {
        for (namespace, prefix) in prefixes {
            let decl = format!("xmlns:{prefix}");
            start.push_attribute((decl.as_str(), *namespace));
        }
    }
    for attr in &node.attributes {
        let attr_name = qualified_name(attr.namespace.as_deref(), &attr.name, prefixes)?;
        start.push_attribute((attr_name.as_str(), attr.value.as_str()));
    }

    if node.children.is_empty() && node.text.is_empty() {
        write_event(writer, Event::Empty(start))
    } else {
        write_event(writer, Event::Start(start))?;
        if !node.text.is_empty() {
            write_event(writer, Event::Text(BytesText::new(&node.text)))?;
        }
        for child in &node.children {
            write_node(writer, child, prefixes, false)?;
        }
        write_event(writer, Event::End(BytesEnd::new(tag.as_str())))
    }
}

pub(crate) fn write_event<W: io::Write>(
    writer: &mut Writer<W>,
    event: Event<'_>,
) -> Result<(), Error> {
    writer
        .write_event(event)
        .map_err(|e| Error::Coding(format!("XML write error: {e}")))
}

fn qualified_name(
    namespace: Option<&str>,
    name: &str,
    prefixes: &[(&str, &str)],
) -> Result<String, Error> {
    match namespace {
        None => Ok(name.to_string()),
        Some(ns) => {
            let prefix = prefixes
                .iter()
                .find(|(uri, _)| *uri == ns)
                .map(|(_, prefix)| *prefix)
                .ok_or_else(|| Error::Coding(format!("no prefix for namespace \"{ns}\"")))?;
            Ok(format!("{prefix}:{name}"))
        }
    }
}

//==============================================================================
// Encoding / decoding
//==============================================================================

/// Encodes a value onto an element, setting its type annotation, text and
/// children. The `Value` enum is closed, so encoding cannot fail.
pub fn encode(value: &Value, node: &mut XmlNode) {
    match value {
        Value::Null => node.set_attribute(Some(NS_XSI), "nil", "true"),
        Value::String(s) => {
            node.set_attribute(Some(NS_XSI), "type", "xsd:string");
            node.text = s.clone();
        }
        Value::Int(i) => {
            node.set_attribute(Some(NS_XSI), "type", "xsd:int");
            node.text = i.to_string();
        }
        Value::Bool(b) => {
            node.set_attribute(Some(NS_XSI), "type", "xsd:boolean");
            node.text = (if *b { "true" } else { "false" }).to_string();
        }
        Value::Map(entries) => {
            node.set_attribute(Some(NS_XSI), "type", "ns2:Map");
            for (key, val) in entries {
                let mut item = XmlNode::new("item");
                let mut key_node = XmlNode::new("key");
                encode(key, &mut key_node);
                item.children.push(key_node);
                let mut value_node = XmlNode::new("value");
                encode(val, &mut value_node);
                item.children.push(value_node);
                node.children.push(item);
            }
        }
        Value::List(items) => {
            node.set_attribute(Some(NS_XSI), "type", "SOAP-ENC:Array");
            for elt in items {
                let mut item = XmlNode::new("item");
                encode(elt, &mut item);
                node.children.push(item);
            }
        }
    }
}

/// Decodes a type-annotated element back into a value.
pub fn decode(node: &XmlNode) -> Result<Value, Error> {
    if node.attribute(Some(NS_XSI), "nil") == Some("true") {
        return Ok(Value::Null);
    }
    let type_attr = node.attribute(Some(NS_XSI), "type").ok_or_else(|| {
        Error::Coding(format!("element \"{}\" has no xsi:type attribute", node.name))
    })?;
    let (local, namespace) = node.resolve_qname(type_attr);
    let namespace = namespace
        .ok_or_else(|| Error::Coding(format!("cannot find namespace for \"{type_attr}\"")))?;

    if namespace == NS_XSD {
        match local.as_str() {
            "string" => Ok(Value::String(node.text.clone())),
            "int" => node
                .text
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| Error::Coding(format!("invalid value for int: \"{}\"", node.text))),
            "boolean" => match node.text.trim() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                other => Err(Error::Coding(format!("invalid value for boolean: \"{other}\""))),
            },
            _ => Err(Error::Coding(format!("unknown XSD type \"{local}\""))),
        }
    } else if namespace == NS_APACHE_MAP {
        if local != "Map" {
            return Err(Error::Coding(format!("unknown map type \"{local}\"")));
        }
        let mut entries = Vec::with_capacity(node.children.len());
        for item in &node.children {
            if item.namespace.is_some() || item.name != "item" {
                return Err(Error::Coding(format!(
                    "invalid child tag \"{}\" in map",
                    item.name
                )));
            }
            let key = item
                .child("key")
                .ok_or_else(|| Error::Coding("map item has no key element".to_string()))?;
            let value = item
                .child("value")
                .ok_or_else(|| Error::Coding("map item has no value element".to_string()))?;
            entries.push((decode(key)?, decode(value)?));
        }
        Ok(Value::Map(entries))
    } else if namespace == NS_SOAP_ENC {
        if local != "Array" {
            return Err(Error::Coding(format!("unknown array type \"{local}\"")));
        }
        let mut items = Vec::with_capacity(node.children.len());
        for item in &node.children {
            if item.namespace.is_some() || item.name != "item" {
                return Err(Error::Coding(format!(
                    "invalid child tag \"{}\" in array",
                    item.name
                )));
            }
            items.push(decode(item)?);
        }
        Ok(Value::List(items))
    } else {
        Err(Error::Coding(format!(
            "unknown type namespace \"{namespace}\" (with type \"{local}\")"
        )))
    }
}

//==============================================================================
// Tests
//==============================================================================
