//! SOAP envelope composition and response parsing
//!
//! A request is an envelope with an `authenticate` header and one named
//! operation in the body; a response carries `...Response` elements in the
//! API namespace whose nested `return` node holds the encoded result.
//! Faults take priority over everything else in a response.

use std::collections::HashMap;

use quick_xml::events::{BytesDecl, BytesText, Event};
use quick_xml::Writer;

use crate::codec::{self, decode, encode, Value, XmlNode};
use crate::constants::{NS_APACHE_MAP, NS_ENVELOPE, NS_SOAP_ENC, NS_XSD, NS_XSI};
use crate::error::{Error, FaultOrigin};

//==============================================================================
// Composer
//==============================================================================

/// Builds a request envelope for one API endpoint.
///
/// The endpoint URL doubles as the namespace of operation elements.
pub struct Composer {
    api: String,
    header: Vec<XmlNode>,
    body: Vec<XmlNode>,
}

impl Composer {
    pub fn new(api: &str) -> Self {
        Self {
            api: api.to_string(),
            header: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Appends the authentication header. Credentials go over the wire as
    /// plain text; channel confidentiality is the transport's concern.
    pub fn add_auth(&mut self, username: &str, password: &str) {
        let mut auth = XmlNode::new("authenticate");
        let mut user = XmlNode::new("UserName");
        user.text = username.to_string();
        auth.children.push(user);
        let mut pass = XmlNode::new("Password");
        pass.text = password.to_string();
        auth.children.push(pass);
        self.header.push(auth);
    }

    /// Appends a named operation with its arguments, in the supplied order.
    pub fn add_operation(&mut self, name: &str, args: Vec<(&str, Value)>) {
        let mut operation = XmlNode::with_namespace(name, &self.api);
        for (arg_name, value) in args {
            let mut arg = XmlNode::new(arg_name);
            encode(&value, &mut arg);
            operation.children.push(arg);
        }
        self.body.push(operation);
    }

    /// Serializes the envelope to the request payload (XML declaration plus
    /// namespaced document).
    pub fn serialize(&self) -> Result<Vec<u8>, Error> {
        let prefixes: [(&str, &str); 6] = [
            (NS_ENVELOPE, "SOAP-ENV"),
            (self.api.as_str(), "ns1"),
            (NS_XSI, "xsi"),
            (NS_XSD, "xsd"),
            (NS_APACHE_MAP, "ns2"),
            (NS_SOAP_ENC, "SOAP-ENC"),
        ];

        let mut envelope = XmlNode::with_namespace("Envelope", NS_ENVELOPE);
        let mut header = XmlNode::with_namespace("Header", NS_ENVELOPE);
        header.children = self.header.clone();
        envelope.children.push(header);
        let mut body = XmlNode::with_namespace("Body", NS_ENVELOPE);
        body.children = self.body.clone();
        envelope.children.push(body);

        let mut writer = Writer::new(Vec::new());
        codec::write_event(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)),
        )?;
        codec::write_event(&mut writer, Event::Text(BytesText::new("\n")))?;
        codec::write_node(&mut writer, &envelope, &prefixes, true)?;
        Ok(writer.into_inner())
    }
}

//==============================================================================
// Response parser
//==============================================================================

/// Parsed response envelope: decoded header and body results keyed by the
/// local name of the element that carried them.
#[derive(Debug)]
pub struct ResponseParser {
    header: HashMap<String, Value>,
    body: HashMap<String, Value>,
}

impl ResponseParser {
    /// Parses a response payload. A fault anywhere in the document yields
    /// `Error::Fault` before any result extraction.
    pub fn parse(api: &str, payload: &[u8]) -> Result<Self, Error> {
        let root = XmlNode::parse_document(payload)?;

        let mut faults = Vec::new();
        root.find_all(Some(NS_ENVELOPE), "Fault", &mut faults);
        if let Some(fault) = faults.first() {
            return Err(parse_fault(fault));
        }

        let mut header = HashMap::new();
        let mut header_nodes = Vec::new();
        root.find_all(Some(NS_ENVELOPE), "Header", &mut header_nodes);
        for node in header_nodes {
            collect_results(api, node, "header", &mut header)?;
        }

        let mut body = HashMap::new();
        let mut body_nodes = Vec::new();
        root.find_all(Some(NS_ENVELOPE), "Body", &mut body_nodes);
        for node in body_nodes {
            collect_results(api, node, "body", &mut body)?;
        }

        Ok(Self { header, body })
    }

    pub fn header_result(&self, name: &str) -> Result<&Value, Error> {
        self.header.get(name).ok_or_else(|| Error::MissingResult {
            section: "header",
            name: name.to_string(),
        })
    }

    pub fn body_result(&self, name: &str) -> Result<&Value, Error> {
        self.body.get(name).ok_or_else(|| Error::MissingResult {
            section: "body",
            name: name.to_string(),
        })
    }
}

/// Extracts origin and message from a fault element. The origin defaults to
/// the server unless the fault code names the client in the envelope
/// namespace.
fn parse_fault(fault: &XmlNode) -> Error {
    let mut origin = FaultOrigin::Server;
    if let Some(code) = fault.child("faultcode") {
        if !code.text.is_empty() {
            let (local, ns) = fault.resolve_qname(code.text.trim());
            if ns.as_deref() == Some(NS_ENVELOPE) && local.eq_ignore_ascii_case("client") {
                origin = FaultOrigin::Client;
            }
        }
    }
    let message = match fault.child("faultstring") {
        Some(fs) if !fs.text.is_empty() => fs.text.clone(),
        _ => "fault element without fault string".to_string(),
    };
    Error::Fault { origin, message }
}

/// Decodes every API-namespaced element's nested `return` node into the
/// result map. First entry per name wins.
fn collect_results(
    api: &str,
    section: &XmlNode,
    where_: &str,
    results: &mut HashMap<String, Value>,
) -> Result<(), Error> {
    for child in &section.children {
        if child.namespace.as_deref() != Some(api) {
            return Err(Error::Coding(format!(
                "cannot interpret {where_} item \"{}\"",
                child.name
            )));
        }
        let mut returns = Vec::new();
        child.find_all(None, "return", &mut returns);
        for ret in returns {
            if !results.contains_key(&child.name) {
                results.insert(child.name.clone(), decode(ret)?);
            }
        }
    }
    Ok(())
}

//==============================================================================
// Tests
//==============================================================================
