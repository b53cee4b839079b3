//! Parsed-or-raw response bodies.

use serde_json::Value;

/// Response body, opportunistically parsed as JSON.
///
/// Some endpoints legitimately return non-JSON payloads; a parse failure is
/// therefore never an error, the raw body is carried through instead.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Body parsed as JSON.
    Json(Value),
    /// Body kept as received.
    Raw(String),
}

impl ResponseBody {
    /// Parse `raw`, falling back to [`ResponseBody::Raw`] when it is not JSON.
    pub(crate) fn parse(raw: String) -> Self {
        match serde_json::from_str(&raw) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Raw(raw),
        }
    }

    /// Get the parsed JSON value, if the body was JSON.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Raw(_) => None,
        }
    }

    /// Consume into the parsed JSON value, if the body was JSON.
    pub fn into_json(self) -> Option<Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Raw(_) => None,
        }
    }

    /// Get the raw body, if it did not parse as JSON.
    pub fn as_raw(&self) -> Option<&str> {
        match self {
            ResponseBody::Json(_) => None,
            ResponseBody::Raw(raw) => Some(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_bodies_parse() {
        let body = ResponseBody::parse(r#"{"id":"r1"}"#.to_owned());
        assert_eq!(body.as_json(), Some(&json!({"id": "r1"})));
    }

    #[test]
    fn non_json_bodies_pass_through() {
        let body = ResponseBody::parse("plain text ack".to_owned());
        assert_eq!(body.as_raw(), Some("plain text ack"));
        assert!(body.as_json().is_none());
    }

    #[test]
    fn empty_body_is_raw() {
        let body = ResponseBody::parse(String::new());
        assert_eq!(body.as_raw(), Some(""));
    }
}
