//! Schema-validated JSON-RPC 2.0 codec for the agent/client protocol.
//!
//! The protocol connects a coding agent to a client (an editor or IDE) over
//! a bidirectional JSON-RPC 2.0 connection. This crate is the wire layer:
//! it classifies envelopes, resolves methods against the protocol's schema
//! documents, validates payloads, and builds typed payload trees whose
//! fields are addressable by snake_case names while serializing back to
//! camelCase wire form.
//!
//! The main entry point is [`Codec`]:
//!
//! ```
//! use acp_protocol::{Codec, DecodedMessage, Side};
//! use serde_json::json;
//!
//! let codec = Codec::new(Side::Agent);
//! let wire = codec
//!     .encode_request(1, "initialize", &json!({ "protocolVersion": 1 }))
//!     .unwrap();
//! let DecodedMessage::Payload(payload) = codec.decode_rpc(&wire).unwrap() else {
//!     panic!("expected payload");
//! };
//! assert_eq!(payload.schema_name, "InitializeRequest");
//! ```

#![forbid(unsafe_code)]

pub mod codec;
pub mod constants;
pub mod decoder;
pub mod methods;
pub mod registry;
pub mod rpc;
pub mod types;
pub mod validator;

pub use acp_core::{Error, ErrorCode, ProtocolVersion, Result};

pub use codec::{Codec, DecodedMessage, DecodedResponse, PROTOCOL_PREFIX};
pub use decoder::{DecodedPayload, Decoder, EXT_NOTIFICATION, EXT_REQUEST, EXT_RESPONSE};
pub use registry::{MessageKind, MethodCatalog, MethodEntry, SchemaRegistry, Side};
pub use rpc::{Notification, Request, RequestId, Response, RpcMessage, JSONRPC_VERSION};
pub use types::{TypeDescriptor, TypeRegistry, Typed, TypedObject, TypedScalar};

use serde_json::Value;
use std::sync::Arc;

/// Validates a payload against a named definition in the process-wide
/// registry.
pub fn validate(definition_name: &str, payload: &Value, unstable: bool) -> Result<()> {
    validator::validate(SchemaRegistry::global(unstable), definition_name, payload)
}

/// Builds a typed payload against a named definition in the process-wide
/// registry.
pub fn build_typed(definition_name: &str, payload: &Value, unstable: bool) -> Result<Typed> {
    TypeRegistry::global(unstable).build(definition_name, payload)
}

/// The generated descriptor for a named definition, if it exists.
#[must_use]
pub fn type_for(definition_name: &str, unstable: bool) -> Option<Arc<TypeDescriptor>> {
    TypeRegistry::global(unstable).fetch(definition_name).cloned()
}
