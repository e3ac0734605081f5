//! The full codec: envelope classification plus schema-aware payload decoding.
//!
//! A [`Codec`] owns two decoders: one for the configured side's methods and
//! one for protocol-level methods (the `$/` namespace). Notifications whose
//! method carries the `$/` prefix route to the protocol decoder; by contract
//! an unrecognized `$/` notification is ignorable, so it degrades to the raw
//! envelope instead of failing.
//!
//! Encoding is the decode path run in reverse: params are serialized,
//! decoded (validated and typed), then re-serialized, so anything this codec
//! emits is canonical wire form.

use serde::Serialize;
use serde_json::Value;

use acp_core::logging::{targets, warn};
use acp_core::{Error, ErrorCode, Result};

use crate::decoder::{DecodedPayload, Decoder};
use crate::registry::Side;
use crate::rpc::{self, Notification, Request, RequestId, Response, RpcMessage};
use crate::types::Typed;

/// Method prefix for protocol-level notifications.
pub const PROTOCOL_PREFIX: &str = "$/";

/// A decoded incoming message.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedMessage {
    /// A request or notification with its payload decoded.
    Payload(DecodedPayload),
    /// An unrecognized `$/` notification, passed through raw.
    Notification(Notification),
    /// A response envelope. Pair it with the method it answers via
    /// [`Codec::decode_response_for`] to type its result.
    Response(Response),
}

/// A response typed against the method it answers.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedResponse {
    /// ID of the request this responds to.
    pub id: Option<RequestId>,
    /// The typed result, or the error the peer sent.
    pub outcome: std::result::Result<Typed, Error>,
}

/// Bidirectional message codec for one side of a connection.
#[derive(Debug, Clone)]
pub struct Codec {
    decoder: Decoder,
    protocol_decoder: Decoder,
}

impl Codec {
    /// Creates a codec with schema validation on, stable schema.
    #[must_use]
    pub fn new(side: Side) -> Self {
        Self::with_options(side, false, true)
    }

    /// Creates a codec with explicit stability and validation settings.
    #[must_use]
    pub fn with_options(side: Side, unstable: bool, validate_schema: bool) -> Self {
        Self {
            decoder: Decoder::new(side, unstable, validate_schema),
            protocol_decoder: Decoder::new(Side::Protocol, unstable, validate_schema),
        }
    }

    /// The side this codec decodes methods for.
    #[must_use]
    pub fn side(&self) -> Side {
        self.decoder.side()
    }

    /// Classifies and decodes a wire mapping.
    pub fn decode_rpc(&self, message: &Value) -> Result<DecodedMessage> {
        match rpc::parse(message)? {
            RpcMessage::Request(request) => self
                .decoder
                .decode_request(&request.method, request.id, request.params.as_ref())
                .map(DecodedMessage::Payload),
            RpcMessage::Notification(notification) => self.decode_notification(notification),
            RpcMessage::Response(response) => Ok(DecodedMessage::Response(response)),
        }
    }

    /// Parses serialized JSON text, then decodes it.
    pub fn decode_rpc_json(&self, text: &str) -> Result<DecodedMessage> {
        let message: Value =
            serde_json::from_str(text).map_err(|e| Error::parse_error(e.to_string()))?;
        self.decode_rpc(&message)
    }

    fn decode_notification(&self, notification: Notification) -> Result<DecodedMessage> {
        if !notification.method.starts_with(PROTOCOL_PREFIX) {
            return self
                .decoder
                .decode_notification(&notification.method, notification.params.as_ref())
                .map(DecodedMessage::Payload);
        }
        match self
            .protocol_decoder
            .decode_notification(&notification.method, notification.params.as_ref())
        {
            Ok(payload) => Ok(DecodedMessage::Payload(payload)),
            Err(err) if err.error_code() == Some(ErrorCode::MethodNotFound) => {
                // Unrecognized protocol notifications are ignorable by
                // contract; hand the raw envelope back instead of failing.
                warn!(
                    target: targets::CODEC,
                    "ignoring unrecognized protocol notification {}",
                    notification.method,
                );
                Ok(DecodedMessage::Notification(notification))
            }
            Err(err) => Err(err),
        }
    }

    /// Parses a raw wire mapping and types it as the response to `method`.
    ///
    /// Anything that is not a response envelope fails with `InvalidRequest`.
    pub fn parse_response(&self, method: &str, message: &Value) -> Result<DecodedResponse> {
        match rpc::parse(message)? {
            RpcMessage::Response(response) => self.decode_response_for(method, &response),
            RpcMessage::Request(_) | RpcMessage::Notification(_) => Err(Error::invalid_request(
                format!("expected a response to {method}"),
            )),
        }
    }

    /// Types an already-classified response against the method it answers.
    ///
    /// An error response passes its error through untouched; a success
    /// response has its result validated and typed like any other payload.
    pub fn decode_response_for(&self, method: &str, response: &Response) -> Result<DecodedResponse> {
        let outcome = match (response.result(), response.error()) {
            (Some(result), _) => {
                let decoded =
                    self.decoder
                        .decode_response(method, response.id.clone(), Some(result))?;
                Ok(decoded
                    .typed_payload
                    .unwrap_or_else(|| Typed::Raw(result.clone())))
            }
            (None, Some(error)) => Err(error.clone()),
            (None, None) => unreachable!("a response holds exactly one of result or error"),
        };
        Ok(DecodedResponse {
            id: response.id.clone(),
            outcome,
        })
    }

    /// Encodes a request into canonical wire form.
    ///
    /// Params are serialized, decoded against the method's request schema,
    /// and re-serialized, so the emitted mapping is exactly what the decode
    /// path would reconstruct.
    pub fn encode_request<P: Serialize>(
        &self,
        id: impl Into<RequestId>,
        method: &str,
        params: &P,
    ) -> Result<Value> {
        let id = id.into();
        let raw = to_value(params)?;
        let decoded = self
            .decoder
            .decode_request(method, Some(id.clone()), Some(&raw))?;
        let canonical = canonical_payload(&decoded, raw);
        Ok(Request::new(id, method, Some(canonical)).to_wire(true))
    }

    /// Encodes a notification into canonical wire form.
    pub fn encode_notification<P: Serialize>(&self, method: &str, params: &P) -> Result<Value> {
        let raw = to_value(params)?;
        let target = if method.starts_with(PROTOCOL_PREFIX) {
            &self.protocol_decoder
        } else {
            &self.decoder
        };
        let decoded = target.decode_notification(method, Some(&raw))?;
        let canonical = canonical_payload(&decoded, raw);
        Ok(Notification::new(method, Some(canonical)).to_wire(true))
    }

    /// Encodes a success response into canonical wire form.
    pub fn encode_result<P: Serialize>(
        &self,
        id: Option<RequestId>,
        method: &str,
        result: &P,
    ) -> Result<Value> {
        let raw = to_value(result)?;
        let decoded = self.decoder.decode_response(method, id.clone(), Some(&raw))?;
        let canonical = canonical_payload(&decoded, raw);
        Ok(Response::success(id, canonical).to_wire(true))
    }

    /// Encodes an error response.
    #[must_use]
    pub fn encode_error(&self, id: Option<RequestId>, error: Error) -> Value {
        Response::failure(id, error).to_wire(true)
    }
}

fn to_value<P: Serialize>(params: &P) -> Result<Value> {
    serde_json::to_value(params)
        .map_err(|e| Error::internal_error(format!("unserializable params: {e}")))
}

fn canonical_payload(decoded: &DecodedPayload, raw: Value) -> Value {
    decoded
        .typed_payload
        .as_ref()
        .map_or(raw, Typed::to_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct InitializeParams {
        #[serde(rename = "protocolVersion")]
        protocol_version: Value,
    }

    fn agent_codec() -> Codec {
        Codec::new(Side::Agent)
    }

    #[test]
    fn test_initialize_round_trip() {
        let codec = agent_codec();
        let wire = codec
            .encode_request(1, "initialize", &json!({ "protocolVersion": 1 }))
            .unwrap();
        assert_eq!(wire["jsonrpc"], json!("2.0"));
        assert_eq!(wire["params"], json!({ "protocolVersion": 1 }));

        let decoded = codec.decode_rpc(&wire).unwrap();
        let DecodedMessage::Payload(payload) = decoded else {
            panic!("expected payload");
        };
        assert_eq!(payload.schema_name, "InitializeRequest");
        assert_eq!(payload.id, Some(RequestId::Number(1)));
    }

    #[test]
    fn test_legacy_version_string_canonicalizes_to_zero() {
        let params = InitializeParams {
            protocol_version: json!("1.0.0"),
        };
        let wire = agent_codec().encode_request(1, "initialize", &params).unwrap();
        assert_eq!(wire["params"], json!({ "protocolVersion": 0 }));
    }

    #[test]
    fn test_invalid_params_fail_with_path() {
        let err = agent_codec()
            .encode_request(1, "initialize", &json!({ "protocolVersion": true }))
            .unwrap_err();
        assert_eq!(err.code, -32602);
        assert!(err.data.unwrap().to_string().contains("$.protocolVersion"));
    }

    #[test]
    fn test_prompt_result_round_trip() {
        let codec = agent_codec();
        let wire = codec
            .encode_result(
                Some(RequestId::Number(4)),
                "session/prompt",
                &json!({ "stopReason": "end_turn" }),
            )
            .unwrap();
        assert_eq!(wire["result"], json!({ "stopReason": "end_turn" }));

        let DecodedMessage::Response(response) = codec.decode_rpc(&wire).unwrap() else {
            panic!("expected response");
        };
        let decoded = codec.decode_response_for("session/prompt", &response).unwrap();
        assert_eq!(decoded.id, Some(RequestId::Number(4)));
        let typed = decoded.outcome.unwrap();
        assert_eq!(typed.get("stop_reason").unwrap().to_value(), json!("end_turn"));
    }

    #[test]
    fn test_parse_response_from_raw_message() {
        let codec = agent_codec();
        let wire = json!({
            "jsonrpc": "2.0",
            "id": 3,
            "result": { "stopReason": "end_turn" }
        });
        let decoded = codec.parse_response("session/prompt", &wire).unwrap();
        assert_eq!(decoded.id, Some(RequestId::Number(3)));
        assert!(decoded.outcome.is_ok());
    }

    #[test]
    fn test_parse_response_rejects_non_responses() {
        let codec = agent_codec();
        let request = json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "session/prompt",
            "params": {}
        });
        let err = codec.parse_response("session/prompt", &request).unwrap_err();
        assert_eq!(err.code, -32600);
    }

    #[test]
    fn test_error_response_round_trip() {
        let codec = agent_codec();
        let wire = codec.encode_error(
            Some(RequestId::Number(2)),
            Error::request_cancelled(Value::Null),
        );
        assert_eq!(wire["error"]["code"], json!(-32800));

        let DecodedMessage::Response(response) = codec.decode_rpc(&wire).unwrap() else {
            panic!("expected response");
        };
        let decoded = codec.decode_response_for("session/prompt", &response).unwrap();
        let err = decoded.outcome.unwrap_err();
        assert_eq!(err.code, -32800);
        assert_eq!(err.message, "Request cancelled");
    }

    #[test]
    fn test_notification_round_trip() {
        let codec = agent_codec();
        let wire = codec
            .encode_notification("session/cancel", &json!({ "sessionId": "s1" }))
            .unwrap();
        assert!(!wire.as_object().unwrap().contains_key("id"));

        let DecodedMessage::Payload(payload) = codec.decode_rpc(&wire).unwrap() else {
            panic!("expected payload");
        };
        assert_eq!(payload.schema_name, "CancelNotification");
    }

    #[test]
    fn test_unknown_protocol_notification_is_ignorable() {
        let codec = agent_codec();
        let wire = json!({
            "jsonrpc": "2.0",
            "method": "$/unheard_of",
            "params": { "anything": 1 }
        });
        let DecodedMessage::Notification(notification) = codec.decode_rpc(&wire).unwrap() else {
            panic!("expected raw notification");
        };
        assert_eq!(notification.method, "$/unheard_of");
        assert_eq!(notification.params, Some(json!({ "anything": 1 })));
    }

    #[test]
    fn test_known_protocol_notification_decodes_when_unstable() {
        let codec = Codec::with_options(Side::Agent, true, true);
        let wire = json!({
            "jsonrpc": "2.0",
            "method": "$/cancel_request",
            "params": { "requestId": 9 }
        });
        let DecodedMessage::Payload(payload) = codec.decode_rpc(&wire).unwrap() else {
            panic!("expected payload");
        };
        assert_eq!(payload.schema_name, "CancelRequestNotification");
        assert_eq!(payload.side, Side::Protocol);
    }

    #[test]
    fn test_known_protocol_notification_with_bad_params_still_fails() {
        let codec = Codec::with_options(Side::Agent, true, true);
        let wire = json!({
            "jsonrpc": "2.0",
            "method": "$/cancel_request",
            "params": {}
        });
        let err = codec.decode_rpc(&wire).unwrap_err();
        assert_eq!(err.code, -32602);
    }

    #[test]
    fn test_extension_request_passes_through() {
        let codec = agent_codec();
        let wire = json!({
            "jsonrpc": "2.0",
            "id": 5,
            "method": "_vendor/custom",
            "params": { "free": "form" }
        });
        let DecodedMessage::Payload(payload) = codec.decode_rpc(&wire).unwrap() else {
            panic!("expected payload");
        };
        assert!(payload.extension);
        assert_eq!(payload.payload, Some(json!({ "free": "form" })));
    }

    #[test]
    fn test_decode_rpc_json_reports_parse_errors() {
        let err = agent_codec().decode_rpc_json("{{{").unwrap_err();
        assert_eq!(err.code, -32700);
    }

    #[test]
    fn test_decode_rpc_json_accepts_text() {
        let text = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":1}}"#;
        let decoded = agent_codec().decode_rpc_json(text).unwrap();
        assert!(matches!(decoded, DecodedMessage::Payload(_)));
    }

    #[test]
    fn test_unknown_method_request_fails() {
        let codec = agent_codec();
        let wire = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "bogus/method",
            "params": {}
        });
        let err = codec.decode_rpc(&wire).unwrap_err();
        assert_eq!(err.code, -32601);
    }
}
