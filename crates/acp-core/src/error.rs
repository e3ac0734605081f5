//! Protocol error model.
//!
//! Errors come in two flavors on the wire: the JSON-RPC 2.0 reserved codes
//! and the protocol-specific extension codes. Both share the same shape:
//! `{code, message, data?}`. An [`Error`] is always serializable into a
//! JSON-RPC error member as-is.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result alias used throughout the codec.
pub type Result<T> = std::result::Result<T, Error>;

/// Well-known error codes.
///
/// Covers the JSON-RPC 2.0 reserved range plus the protocol's own
/// extensions. Arbitrary codes may still appear on the wire; [`Error::code`]
/// is an open `i32` and this enum only names the codes the codec itself
/// produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Invalid JSON was received (-32700).
    ParseError,
    /// The JSON sent is not a valid request object (-32600).
    InvalidRequest,
    /// The method does not exist or is not available (-32601).
    MethodNotFound,
    /// Invalid method parameters (-32602).
    InvalidParams,
    /// Internal JSON-RPC error (-32603).
    InternalError,
    /// The request was cancelled before it completed (-32800).
    RequestCancelled,
    /// Authentication is required before the method may be called (-32000).
    AuthRequired,
    /// A referenced resource does not exist (-32002).
    ResourceNotFound,
}

impl ErrorCode {
    /// The numeric wire code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            ErrorCode::ParseError => -32700,
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
            ErrorCode::RequestCancelled => -32800,
            ErrorCode::AuthRequired => -32000,
            ErrorCode::ResourceNotFound => -32002,
        }
    }

    /// The message used when an error is built without one.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            ErrorCode::ParseError => "Parse error",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::MethodNotFound => "Method not found",
            ErrorCode::InvalidParams => "Invalid params",
            ErrorCode::InternalError => "Internal error",
            ErrorCode::RequestCancelled => "Request cancelled",
            ErrorCode::AuthRequired => "Authentication required",
            ErrorCode::ResourceNotFound => "Resource not found",
        }
    }

    /// Maps a numeric code back to a known [`ErrorCode`].
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -32700 => Some(ErrorCode::ParseError),
            -32600 => Some(ErrorCode::InvalidRequest),
            -32601 => Some(ErrorCode::MethodNotFound),
            -32602 => Some(ErrorCode::InvalidParams),
            -32603 => Some(ErrorCode::InternalError),
            -32800 => Some(ErrorCode::RequestCancelled),
            -32000 => Some(ErrorCode::AuthRequired),
            -32002 => Some(ErrorCode::ResourceNotFound),
            _ => None,
        }
    }

    /// The default message for an arbitrary numeric code.
    #[must_use]
    pub fn default_message_for(code: i32) -> &'static str {
        Self::from_code(code).map_or("Unknown error", ErrorCode::default_message)
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// A protocol error, serializable as a JSON-RPC error member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Error {
    /// Numeric error code.
    pub code: i32,
    /// Human-readable error message.
    pub message: String,
    /// Additional structured detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Error {
    /// Creates an error with an explicit message.
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            code,
            message: message.into(),
            data,
        }
    }

    /// Creates an error carrying the default message for `code`.
    #[must_use]
    pub fn with_code(code: impl Into<i32>, data: Option<Value>) -> Self {
        let code = code.into();
        Self {
            code,
            message: ErrorCode::default_message_for(code).to_owned(),
            data,
        }
    }

    /// Normalizes a wire mapping (`{code, message?, data?}`) into an [`Error`].
    ///
    /// Fails with [`ErrorCode::InvalidRequest`] if the value is not an object
    /// carrying an integer `code`.
    pub fn from_value(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::invalid_request("error member must be an object"))?;
        let code = obj
            .get("code")
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::invalid_request("error object requires an integer code"))?;
        let code = i32::try_from(code)
            .map_err(|_| Error::invalid_request("error code out of int32 range"))?;
        let message = obj
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| ErrorCode::default_message_for(code).to_owned(), str::to_owned);
        Ok(Self {
            code,
            message,
            data: obj.get("data").cloned(),
        })
    }

    /// Serializes the error into its wire mapping.
    #[must_use]
    pub fn to_wire(&self) -> Value {
        let mut obj = serde_json::Map::new();
        obj.insert("code".to_owned(), Value::from(self.code));
        obj.insert("message".to_owned(), Value::from(self.message.clone()));
        if let Some(data) = &self.data {
            obj.insert("data".to_owned(), data.clone());
        }
        Value::Object(obj)
    }

    /// The known [`ErrorCode`] for this error, if any.
    #[must_use]
    pub fn error_code(&self) -> Option<ErrorCode> {
        ErrorCode::from_code(self.code)
    }

    fn shorthand(code: ErrorCode, data: impl Into<Value>) -> Self {
        let data = data.into();
        Self {
            code: code.code(),
            message: code.default_message().to_owned(),
            data: if data.is_null() { None } else { Some(data) },
        }
    }

    /// Parse error (-32700).
    #[must_use]
    pub fn parse_error(data: impl Into<Value>) -> Self {
        Self::shorthand(ErrorCode::ParseError, data)
    }

    /// Invalid request (-32600).
    #[must_use]
    pub fn invalid_request(data: impl Into<Value>) -> Self {
        Self::shorthand(ErrorCode::InvalidRequest, data)
    }

    /// Method not found (-32601).
    #[must_use]
    pub fn method_not_found(data: impl Into<Value>) -> Self {
        Self::shorthand(ErrorCode::MethodNotFound, data)
    }

    /// Invalid params (-32602).
    #[must_use]
    pub fn invalid_params(data: impl Into<Value>) -> Self {
        Self::shorthand(ErrorCode::InvalidParams, data)
    }

    /// Internal error (-32603).
    #[must_use]
    pub fn internal_error(data: impl Into<Value>) -> Self {
        Self::shorthand(ErrorCode::InternalError, data)
    }

    /// Request cancelled (-32800).
    #[must_use]
    pub fn request_cancelled(data: impl Into<Value>) -> Self {
        Self::shorthand(ErrorCode::RequestCancelled, data)
    }

    /// Authentication required (-32000).
    #[must_use]
    pub fn auth_required(data: impl Into<Value>) -> Self {
        Self::shorthand(ErrorCode::AuthRequired, data)
    }

    /// Resource not found (-32002), with the missing URI as data.
    #[must_use]
    pub fn resource_not_found(uri: Option<&str>) -> Self {
        let data = uri.map(|uri| serde_json::json!({ "uri": uri }));
        Self {
            code: ErrorCode::ResourceNotFound.code(),
            message: ErrorCode::ResourceNotFound.default_message().to_owned(),
            data,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)?;
        if let Some(data) = &self.data {
            write!(f, ": {data}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_messages() {
        assert_eq!(ErrorCode::ParseError.default_message(), "Parse error");
        assert_eq!(ErrorCode::default_message_for(-32601), "Method not found");
        assert_eq!(ErrorCode::default_message_for(12345), "Unknown error");
    }

    #[test]
    fn test_shorthand_carries_data() {
        let err = Error::invalid_params("bad field");
        assert_eq!(err.code, -32602);
        assert_eq!(err.message, "Invalid params");
        assert_eq!(err.data, Some(json!("bad field")));
    }

    #[test]
    fn test_shorthand_null_data_is_omitted() {
        let err = Error::internal_error(Value::Null);
        assert_eq!(err.data, None);
        assert!(!err.to_wire().as_object().unwrap().contains_key("data"));
    }

    #[test]
    fn test_from_value_round_trip() {
        let wire = json!({"code": -32700, "message": "Parse error", "data": {"at": 3}});
        let err = Error::from_value(&wire).unwrap();
        assert_eq!(err.error_code(), Some(ErrorCode::ParseError));
        assert_eq!(err.to_wire(), wire);
    }

    #[test]
    fn test_from_value_defaults_message() {
        let err = Error::from_value(&json!({"code": -32800})).unwrap();
        assert_eq!(err.message, "Request cancelled");
    }

    #[test]
    fn test_from_value_rejects_missing_code() {
        let err = Error::from_value(&json!({"message": "no code"})).unwrap_err();
        assert_eq!(err.error_code(), Some(ErrorCode::InvalidRequest));
    }

    #[test]
    fn test_resource_not_found_wraps_uri() {
        let err = Error::resource_not_found(Some("file:///missing"));
        assert_eq!(err.data, Some(json!({"uri": "file:///missing"})));
    }
}
