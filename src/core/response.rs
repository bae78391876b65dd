//! SOAP 回應解析：XML → JSON、Fault 偵測、拆出 `<op>Response>/<op>Result`。

use crate::core::parsing::value_i64;
use crate::utils::error::{ProxyError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};

struct Frame {
    name: String,
    children: Map<String, Value>,
    text: String,
    nil: bool,
}

impl Frame {
    fn new(name: String, nil: bool) -> Self {
        Self {
            name,
            children: Map::new(),
            text: String::new(),
            nil,
        }
    }

    fn into_value(self) -> (String, Value) {
        let value = if !self.children.is_empty() {
            Value::Object(self.children)
        } else if self.nil {
            Value::Null
        } else {
            Value::String(self.text)
        };
        (self.name, value)
    }
}

/// Convert an XML document into JSON; see module docs for the shape rules.
pub fn xml_to_json(xml: &str) -> Result<Value> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack = vec![Frame::new(String::new(), false)];

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                stack.push(Frame::new(local_name(&e), is_nil(&e)));
            }
            Event::Empty(e) => {
                let (name, value) = Frame::new(local_name(&e), is_nil(&e)).into_value();
                if let Some(parent) = stack.last_mut() {
                    insert_child(&mut parent.children, name, value);
                }
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(_) => {
                if stack.len() < 2 {
                    return Err(ProxyError::ProcessingError {
                        message: "Unbalanced XML in SOAP response".to_string(),
                    });
                }
                if let Some(frame) = stack.pop() {
                    let (name, value) = frame.into_value();
                    if let Some(parent) = stack.last_mut() {
                        insert_child(&mut parent.children, name, value);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() != 1 {
        return Err(ProxyError::ProcessingError {
            message: "Truncated XML in SOAP response".to_string(),
        });
    }

    let root = stack.pop().map(|frame| frame.children).unwrap_or_default();
    Ok(Value::Object(root))
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn is_nil(e: &BytesStart<'_>) -> bool {
    e.attributes().flatten().any(|attr| {
        attr.key.local_name().as_ref() == b"nil" && attr.value.as_ref() == b"true"
    })
}

/// 同名元素重複出現時轉為陣列
fn insert_child(children: &mut Map<String, Value>, name: String, value: Value) {
    match children.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            children.insert(name, value);
        }
    }
}

/// Parse a SOAP response body and return the unwrapped operation result.
pub fn parse_response(operation: &str, xml: &str) -> Result<Value> {
    let document = xml_to_json(xml)?;

    let body = document
        .get("Envelope")
        .and_then(|envelope| envelope.get("Body"))
        .ok_or_else(|| ProxyError::ProcessingError {
            message: format!("Response to {} is not a SOAP envelope", operation),
        })?;

    if let Some(fault) = body.get("Fault") {
        return Err(fault_error(fault));
    }

    let response_key = format!("{}Response", operation);
    let response = body.get(&response_key).ok_or_else(|| ProxyError::ProcessingError {
        message: format!("SOAP body does not contain <{}>", response_key),
    })?;

    Ok(unwrap_result(operation, response))
}

/// 只有 Result 時回傳其值；另有輸出參數時回傳整個 Response 物件
fn unwrap_result(operation: &str, response: &Value) -> Value {
    let Value::Object(map) = response else {
        return Value::Null;
    };

    let result_key = format!("{}Result", operation);
    match map.get(&result_key) {
        Some(result) if map.len() == 1 => result.clone(),
        Some(_) => response.clone(),
        None if map.is_empty() => Value::Null,
        None => response.clone(),
    }
}

/// Detect a SOAP fault without failing on ordinary responses.
pub fn fault_error(fault: &Value) -> ProxyError {
    // SOAP 1.1
    let code = fault
        .get("faultcode")
        .and_then(Value::as_str)
        .or_else(|| {
            // SOAP 1.2
            fault
                .get("Code")
                .and_then(|c| c.get("Value"))
                .and_then(Value::as_str)
        })
        .unwrap_or("soap:Server")
        .to_string();

    let message = fault
        .get("faultstring")
        .and_then(Value::as_str)
        .or_else(|| {
            fault
                .get("Reason")
                .and_then(|r| r.get("Text"))
                .and_then(Value::as_str)
        })
        .unwrap_or("Unknown SOAP fault")
        .to_string();

    ProxyError::SoapFault { code, message }
}

/// `STATUS` at the result root, in a direct child object, or the result itself.
pub fn status_code(result: &Value) -> Option<i64> {
    match result {
        Value::Object(map) => map.get("STATUS").and_then(value_i64).or_else(|| {
            map.values()
                .filter_map(Value::as_object)
                .find_map(|child| child.get("STATUS").and_then(value_i64))
        }),
        Value::String(_) | Value::Number(_) => value_i64(result),
        _ => None,
    }
}
