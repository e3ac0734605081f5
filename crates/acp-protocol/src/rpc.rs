//! JSON-RPC 2.0 envelope types.
//!
//! This layer knows nothing about schemas. It classifies raw wire mappings
//! into [`Request`], [`Notification`], and [`Response`] shapes and renders
//! them back out, bit-exact per JSON-RPC 2.0.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use acp_core::{Error, Result};

/// The one supported protocol version literal.
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC request ID.
///
/// The wire also permits `null`; that is modeled as `Option<RequestId>` at
/// the envelope level so a missing key and an explicit `null` stay
/// distinguishable from a real ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Integer ID.
    Number(i64),
    /// String ID.
    String(String),
}

impl RequestId {
    /// Coerces a wire value into an optional ID.
    ///
    /// `null` maps to `None`. Anything other than `null`, a string, or an
    /// integer fails with `InvalidRequest`.
    pub fn from_value(value: &Value) -> Result<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(RequestId::String(s.clone()))),
            Value::Number(n) => n.as_i64().map(|n| Some(RequestId::Number(n))).ok_or_else(|| {
                Error::invalid_request("request id must be null, a string, or an integer")
            }),
            _ => Err(Error::invalid_request(
                "request id must be null, a string, or an integer",
            )),
        }
    }

    fn option_to_value(id: Option<&Self>) -> Value {
        match id {
            None => Value::Null,
            Some(RequestId::Number(n)) => Value::from(*n),
            Some(RequestId::String(s)) => Value::from(s.clone()),
        }
    }
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        RequestId::Number(id)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        RequestId::String(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        RequestId::String(id.to_owned())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::String(s) => write!(f, "{s}"),
        }
    }
}

/// JSON-RPC 2.0 request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Request ID. `None` renders as an explicit `"id": null`.
    pub id: Option<RequestId>,
    /// Method name.
    pub method: String,
    /// Request parameters, omitted from the wire when absent.
    pub params: Option<Value>,
}

impl Request {
    /// Creates a new request.
    #[must_use]
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }

    /// Renders the wire mapping, merging in the jsonrpc literal unless
    /// suppressed.
    #[must_use]
    pub fn to_wire(&self, include_version: bool) -> Value {
        let mut obj = serde_json::Map::new();
        if include_version {
            obj.insert("jsonrpc".to_owned(), Value::from(JSONRPC_VERSION));
        }
        obj.insert("id".to_owned(), RequestId::option_to_value(self.id.as_ref()));
        obj.insert("method".to_owned(), Value::from(self.method.clone()));
        if let Some(params) = &self.params {
            obj.insert("params".to_owned(), params.clone());
        }
        Value::Object(obj)
    }
}

/// JSON-RPC 2.0 notification (a request without an `id` key).
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Method name.
    pub method: String,
    /// Notification parameters, omitted from the wire when absent.
    pub params: Option<Value>,
}

impl Notification {
    /// Creates a new notification.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Renders the wire mapping.
    #[must_use]
    pub fn to_wire(&self, include_version: bool) -> Value {
        let mut obj = serde_json::Map::new();
        if include_version {
            obj.insert("jsonrpc".to_owned(), Value::from(JSONRPC_VERSION));
        }
        obj.insert("method".to_owned(), Value::from(self.method.clone()));
        if let Some(params) = &self.params {
            obj.insert("params".to_owned(), params.clone());
        }
        Value::Object(obj)
    }
}

/// JSON-RPC 2.0 response.
///
/// Holds exactly one of result or error; the alternative is unrepresentable.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// ID of the request this responds to.
    pub id: Option<RequestId>,
    outcome: std::result::Result<Value, Error>,
}

impl Response {
    /// Creates a success response. A `null` result is a valid success.
    #[must_use]
    pub fn success(id: Option<RequestId>, result: Value) -> Self {
        Self {
            id,
            outcome: Ok(result),
        }
    }

    /// Creates an error response.
    #[must_use]
    pub fn failure(id: Option<RequestId>, error: Error) -> Self {
        Self {
            id,
            outcome: Err(error),
        }
    }

    /// The result value, if this is a success response.
    #[must_use]
    pub fn result(&self) -> Option<&Value> {
        self.outcome.as_ref().ok()
    }

    /// The error, if this is an error response.
    #[must_use]
    pub fn error(&self) -> Option<&Error> {
        self.outcome.as_ref().err()
    }

    /// Returns true if this response carries a result.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Returns true if this response carries an error.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.outcome.is_err()
    }

    /// Renders the wire mapping with exactly one of `result`/`error`.
    #[must_use]
    pub fn to_wire(&self, include_version: bool) -> Value {
        let mut obj = serde_json::Map::new();
        if include_version {
            obj.insert("jsonrpc".to_owned(), Value::from(JSONRPC_VERSION));
        }
        obj.insert("id".to_owned(), RequestId::option_to_value(self.id.as_ref()));
        match &self.outcome {
            Ok(result) => obj.insert("result".to_owned(), result.clone()),
            Err(error) => obj.insert("error".to_owned(), error.to_wire()),
        };
        Value::Object(obj)
    }
}

/// A classified JSON-RPC message.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcMessage {
    /// A request (method with an `id` key).
    Request(Request),
    /// A notification (method without an `id` key).
    Notification(Notification),
    /// A response (`result` or `error`).
    Response(Response),
}

impl RpcMessage {
    /// Renders the wire mapping of whichever shape this is.
    #[must_use]
    pub fn to_wire(&self, include_version: bool) -> Value {
        match self {
            RpcMessage::Request(r) => r.to_wire(include_version),
            RpcMessage::Notification(n) => n.to_wire(include_version),
            RpcMessage::Response(r) => r.to_wire(include_version),
        }
    }
}

/// Classifies a wire mapping into a request, notification, or response.
///
/// A `jsonrpc` tag, when present, must equal [`JSONRPC_VERSION`]. Presence of
/// `method` plus an `id` key makes a request; `method` alone makes a
/// notification; `result` or `error` makes a response. Anything else fails
/// with `InvalidRequest`.
pub fn parse(message: &Value) -> Result<RpcMessage> {
    let obj = message
        .as_object()
        .ok_or_else(|| Error::invalid_request("message must be an object"))?;

    if let Some(version) = obj.get("jsonrpc") {
        if *version != JSONRPC_VERSION {
            return Err(Error::invalid_request(format!(
                "unsupported jsonrpc version: {version}"
            )));
        }
    }

    if let Some(method) = obj.get("method") {
        let method = method_name(method)?;
        let params = obj.get("params").cloned();
        if let Some(id) = obj.get("id") {
            return Ok(RpcMessage::Request(Request {
                id: RequestId::from_value(id)?,
                method,
                params,
            }));
        }
        return Ok(RpcMessage::Notification(Notification { method, params }));
    }

    let result = obj.get("result");
    let error = obj.get("error");
    if result.is_some() || error.is_some() {
        let id = match obj.get("id") {
            Some(id) => RequestId::from_value(id)?,
            None => None,
        };
        return match (result, error) {
            (Some(_), Some(_)) => Err(Error::invalid_request(
                "response cannot carry both result and error",
            )),
            (Some(result), None) => Ok(RpcMessage::Response(Response::success(id, result.clone()))),
            (None, Some(error)) => Ok(RpcMessage::Response(Response::failure(
                id,
                Error::from_value(error)?,
            ))),
            (None, None) => unreachable!(),
        };
    }

    Err(Error::invalid_request(
        "message is neither request, response, nor notification",
    ))
}

/// Parses serialized JSON text, then classifies it.
pub fn parse_json(text: &str) -> Result<RpcMessage> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| Error::parse_error(e.to_string()))?;
    parse(&value)
}

fn method_name(method: &Value) -> Result<String> {
    match method {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(Error::invalid_request(format!(
            "method must be a string, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_classifies_request() {
        let msg = parse(&json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"})).unwrap();
        let RpcMessage::Request(req) = msg else {
            panic!("expected request");
        };
        assert_eq!(req.id, Some(RequestId::Number(1)));
        assert_eq!(req.method, "initialize");
        assert_eq!(req.params, None);
    }

    #[test]
    fn test_parse_classifies_notification() {
        let msg = parse(&json!({"jsonrpc": "2.0", "method": "session/cancel", "params": {}})).unwrap();
        assert!(matches!(msg, RpcMessage::Notification(_)));
    }

    #[test]
    fn test_parse_classifies_null_id_as_request() {
        let msg = parse(&json!({"method": "x", "id": null})).unwrap();
        let RpcMessage::Request(req) = msg else {
            panic!("expected request");
        };
        assert_eq!(req.id, None);
    }

    #[test]
    fn test_parse_rejects_wrong_jsonrpc_version() {
        let err = parse(&json!({"jsonrpc": "1.0", "method": "foo", "id": 1})).unwrap_err();
        assert_eq!(err.code, -32600);
    }

    #[test]
    fn test_parse_rejects_unrecognized_message() {
        assert!(parse(&json!({"jsonrpc": "2.0"})).is_err());
        assert!(parse(&json!(42)).is_err());
    }

    #[test]
    fn test_parse_json_rejects_invalid_json() {
        let err = parse_json("not json{{{").unwrap_err();
        assert_eq!(err.code, -32700);
    }

    #[test]
    fn test_parse_rejects_both_result_and_error() {
        let err = parse(&json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": "ok",
            "error": {"code": -1, "message": "err"}
        }))
        .unwrap_err();
        assert_eq!(err.code, -32600);
    }

    #[test]
    fn test_parse_response_with_null_result_is_success() {
        let msg = parse(&json!({"jsonrpc": "2.0", "id": 1, "result": null})).unwrap();
        let RpcMessage::Response(resp) = msg else {
            panic!("expected response");
        };
        assert!(resp.is_success());
        assert_eq!(resp.result(), Some(&Value::Null));
    }

    #[test]
    fn test_request_id_rejects_float() {
        assert!(RequestId::from_value(&json!(3.14)).is_err());
        assert_eq!(RequestId::from_value(&json!(null)).unwrap(), None);
        assert_eq!(
            RequestId::from_value(&json!("abc")).unwrap(),
            Some(RequestId::from("abc"))
        );
        assert_eq!(
            RequestId::from_value(&json!(42)).unwrap(),
            Some(RequestId::Number(42))
        );
    }

    #[test]
    fn test_request_to_wire_omits_absent_params() {
        let req = Request::new(1, "test", None);
        let wire = req.to_wire(true);
        let obj = wire.as_object().unwrap();
        assert!(!obj.contains_key("params"));
        assert_eq!(obj.get("jsonrpc"), Some(&json!("2.0")));
        assert_eq!(obj.get("id"), Some(&json!(1)));
    }

    #[test]
    fn test_request_to_wire_without_version() {
        let req = Request::new(1, "test", Some(json!({"a": 1})));
        let wire = req.to_wire(false);
        assert!(!wire.as_object().unwrap().contains_key("jsonrpc"));
        assert_eq!(wire["params"], json!({"a": 1}));
    }

    #[test]
    fn test_notification_to_wire_omits_absent_params() {
        let wire = Notification::new("test", None).to_wire(true);
        let obj = wire.as_object().unwrap();
        assert!(!obj.contains_key("params"));
        assert!(!obj.contains_key("id"));
    }

    #[test]
    fn test_response_to_wire_renders_exactly_one_member() {
        let ok = Response::success(Some(1.into()), json!({"v": 1})).to_wire(true);
        assert!(ok.as_object().unwrap().contains_key("result"));
        assert!(!ok.as_object().unwrap().contains_key("error"));

        let err = Response::failure(Some(1.into()), Error::new(-32600, "bad", None)).to_wire(true);
        assert_eq!(err["error"]["code"], json!(-32600));
        assert_eq!(err["error"]["message"], json!("bad"));
        assert!(!err.as_object().unwrap().contains_key("result"));
    }

    #[test]
    fn test_method_number_coerced_to_string() {
        let msg = parse(&json!({"method": 42, "id": 1})).unwrap();
        let RpcMessage::Request(req) = msg else {
            panic!("expected request");
        };
        assert_eq!(req.method, "42");
    }
}
