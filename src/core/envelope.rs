//! SOAP 1.1 request envelope construction.

use crate::utils::error::{ProxyError, Result};
use quick_xml::escape::escape;
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt::Write;
use std::sync::LazyLock;

pub const DEFAULT_NAMESPACE: &str = "http://tempuri.org/";

/// Object key that marks a value as pre-rendered XML.
pub const RAW_XML_KEY: &str = "$xml";

static ELEMENT_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").expect("valid element regex"));

const ENVELOPE_OPEN: &str = concat!(
    r#"<?xml version="1.0" encoding="utf-8"?>"#,
    r#"<soap:Envelope xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" "#,
    r#"xmlns:xsd="http://www.w3.org/2001/XMLSchema" "#,
    r#"xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">"#,
    "<soap:Body>"
);
const ENVELOPE_CLOSE: &str = "</soap:Body></soap:Envelope>";

/// 組出 `<op xmlns="ns">參數...</op>` 的完整 envelope
pub fn build_envelope(operation: &str, namespace: &str, params: &Map<String, Value>) -> Result<String> {
    check_element_name(operation)?;

    let mut xml = String::with_capacity(512);
    xml.push_str(ENVELOPE_OPEN);
    let _ = write!(xml, r#"<{} xmlns="{}">"#, operation, escape(namespace));
    for (name, value) in params {
        render_param(&mut xml, name, value)?;
    }
    let _ = write!(xml, "</{}>", operation);
    xml.push_str(ENVELOPE_CLOSE);

    Ok(xml)
}

pub fn soap_action(operation: &str, namespace: &str) -> String {
    format!("\"{}{}\"", namespace, operation)
}

fn render_param(out: &mut String, name: &str, value: &Value) -> Result<()> {
    check_element_name(name)?;

    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                render_param(out, name, item)?;
            }
        }
        Value::Object(map) => {
            let _ = write!(out, "<{}>", name);
            if let Some(raw) = raw_xml(map) {
                out.push_str(raw);
            } else {
                for (child, child_value) in map {
                    render_param(out, child, child_value)?;
                }
            }
            let _ = write!(out, "</{}>", name);
        }
        Value::String(s) => {
            let _ = write!(out, "<{0}>{1}</{0}>", name, escape(s.as_str()));
        }
        Value::Number(n) => {
            let _ = write!(out, "<{0}>{1}</{0}>", name, n);
        }
        Value::Bool(b) => {
            let _ = write!(out, "<{0}>{1}</{0}>", name, b);
        }
    }

    Ok(())
}

fn raw_xml(map: &Map<String, Value>) -> Option<&str> {
    if map.len() != 1 {
        return None;
    }
    map.get(RAW_XML_KEY).and_then(Value::as_str)
}

fn check_element_name(name: &str) -> Result<()> {
    if name.to_ascii_lowercase().starts_with("xml") || !ELEMENT_NAME_RE.is_match(name) {
        return Err(ProxyError::InvalidRequest {
            message: format!("'{}' is not a valid XML element name", name),
        });
    }
    Ok(())
}
