//! Method-aware payload decoding for one side of the connection.
//!
//! A [`Decoder`] resolves a wire method against the method catalog, optionally
//! validates the payload against the resolved schema definition, and builds
//! the typed payload. Methods starting with `_` are extension methods: they
//! bypass the catalog entirely and pass through unvalidated.

use std::sync::Arc;

use serde_json::Value;

use acp_core::logging::{debug, targets};
use acp_core::{Error, Result};

use crate::registry::{MessageKind, SchemaRegistry, Side};
use crate::rpc::RequestId;
use crate::types::{TypeRegistry, Typed};
use crate::validator;

/// Placeholder schema name for extension requests.
pub const EXT_REQUEST: &str = "ExtRequest";
/// Placeholder schema name for extension responses.
pub const EXT_RESPONSE: &str = "ExtResponse";
/// Placeholder schema name for extension notifications.
pub const EXT_NOTIFICATION: &str = "ExtNotification";

/// A decoded protocol payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPayload {
    /// Message kind this payload arrived as.
    pub kind: MessageKind,
    /// Side whose catalog resolved the method.
    pub side: Side,
    /// Wire method name.
    pub method: String,
    /// Request id, when the message carries one.
    pub id: Option<RequestId>,
    /// Resolved schema definition name.
    pub schema_name: String,
    /// Raw payload as received.
    pub payload: Option<Value>,
    /// Typed payload, absent only for extension methods.
    pub typed_payload: Option<Typed>,
    /// Whether this was an extension method.
    pub extension: bool,
}

/// Decodes payloads for one side's method catalog.
#[derive(Debug, Clone)]
pub struct Decoder {
    side: Side,
    validate_schema: bool,
    schemas: Arc<SchemaRegistry>,
    types: Arc<TypeRegistry>,
}

impl Decoder {
    /// Creates a decoder backed by the process-wide registries.
    #[must_use]
    pub fn new(side: Side, unstable: bool, validate_schema: bool) -> Self {
        Self::with_registries(
            side,
            validate_schema,
            Arc::clone(SchemaRegistry::global(unstable)),
            Arc::clone(TypeRegistry::global(unstable)),
        )
    }

    /// Creates a decoder over explicit registries.
    #[must_use]
    pub fn with_registries(
        side: Side,
        validate_schema: bool,
        schemas: Arc<SchemaRegistry>,
        types: Arc<TypeRegistry>,
    ) -> Self {
        Self {
            side,
            validate_schema,
            schemas,
            types,
        }
    }

    /// The side this decoder resolves methods against.
    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Whether payloads are validated before construction.
    #[must_use]
    pub fn validates_schema(&self) -> bool {
        self.validate_schema
    }

    /// Decodes request params.
    ///
    /// Requests must carry params; a request without them fails with
    /// `InvalidParams` before any schema work happens.
    pub fn decode_request(
        &self,
        method: &str,
        id: Option<RequestId>,
        params: Option<&Value>,
    ) -> Result<DecodedPayload> {
        self.decode(MessageKind::Request, method, id, params, true)
    }

    /// Decodes notification params. Params are required, as for requests.
    pub fn decode_notification(
        &self,
        method: &str,
        params: Option<&Value>,
    ) -> Result<DecodedPayload> {
        self.decode(MessageKind::Notification, method, None, params, true)
    }

    /// Decodes a response result for the method it answers.
    ///
    /// A missing result is allowed; it validates and builds as JSON null, so
    /// a method whose response schema requires keys rejects an empty result
    /// whether or not validation is enabled.
    pub fn decode_response(
        &self,
        method: &str,
        id: Option<RequestId>,
        result: Option<&Value>,
    ) -> Result<DecodedPayload> {
        self.decode(MessageKind::Response, method, id, result, false)
    }

    fn decode(
        &self,
        kind: MessageKind,
        method: &str,
        id: Option<RequestId>,
        payload: Option<&Value>,
        payload_required: bool,
    ) -> Result<DecodedPayload> {
        if method.starts_with('_') {
            return Ok(self.decode_extension(kind, method, id, payload));
        }

        let Some(schema_name) = self
            .schemas
            .method_catalog()
            .resolve(self.side, method, kind)
        else {
            return Err(Error::method_not_found(format!(
                "unknown {kind} method: {method}"
            )));
        };
        let schema_name = schema_name.to_owned();

        if payload_required && payload.is_none() {
            return Err(Error::invalid_params(format!(
                "{kind} {method} requires params"
            )));
        }

        if self.validate_schema {
            validator::validate(&self.schemas, &schema_name, payload.unwrap_or(&Value::Null))?;
        }

        // An absent result builds from null, so required keys are enforced
        // even when validation is off.
        let typed_payload = Some(self.types.build(&schema_name, payload.unwrap_or(&Value::Null))?);

        debug!(
            target: targets::DECODER,
            "decoded {kind} {method} as {schema_name} on {} side",
            self.side,
        );

        Ok(DecodedPayload {
            kind,
            side: self.side,
            method: method.to_owned(),
            id,
            schema_name,
            payload: payload.cloned(),
            typed_payload,
            extension: false,
        })
    }

    fn decode_extension(
        &self,
        kind: MessageKind,
        method: &str,
        id: Option<RequestId>,
        payload: Option<&Value>,
    ) -> DecodedPayload {
        let schema_name = match kind {
            MessageKind::Request => EXT_REQUEST,
            MessageKind::Response => EXT_RESPONSE,
            MessageKind::Notification => EXT_NOTIFICATION,
        };
        debug!(
            target: targets::DECODER,
            "passing through extension {kind} {method}",
        );
        DecodedPayload {
            kind,
            side: self.side,
            method: method.to_owned(),
            id,
            schema_name: schema_name.to_owned(),
            payload: payload.cloned(),
            typed_payload: None,
            extension: true,
        }
    }
}
