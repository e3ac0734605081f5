//! Schema registry and method catalog.
//!
//! The protocol ships as two schema documents (stable and unstable, the
//! latter a superset with experimental definitions) plus two metadata
//! documents mapping symbolic method names to wire method names per side.
//! Both are compiled into the binary and parsed once per process behind a
//! [`OnceLock`]; everything handed out afterwards is immutable.
//!
//! Definitions tagged with `x-side` and `x-method` feed the method catalog:
//! `side -> wire method -> {request, response, notification}` definition
//! names, with the message kind inferred from the definition name suffix.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use serde_json::{Map, Value};

use acp_core::logging::{targets, trace};
use acp_core::{Error, Result};

const STABLE_SCHEMA: &str = include_str!("../schema/schema.json");
const UNSTABLE_SCHEMA: &str = include_str!("../schema/schema.unstable.json");
const STABLE_META: &str = include_str!("../schema/meta.json");
const UNSTABLE_META: &str = include_str!("../schema/meta.unstable.json");

/// Which half of the protocol a method belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    /// Methods handled by the agent.
    Agent,
    /// Methods handled by the client.
    Client,
    /// Protocol-level methods (the `$/` namespace).
    Protocol,
}

impl Side {
    /// The tag value used in schema documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Side::Agent => "agent",
            Side::Client => "client",
            Side::Protocol => "protocol",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "agent" => Some(Side::Agent),
            "client" => Some(Side::Client),
            "protocol" => Some(Side::Protocol),
            _ => None,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three message kinds a wire method can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// A request expecting a response.
    Request,
    /// The response to a request.
    Response,
    /// A one-way notification.
    Notification,
}

impl MessageKind {
    /// Lowercase name, used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            MessageKind::Request => "request",
            MessageKind::Response => "response",
            MessageKind::Notification => "notification",
        }
    }

    /// Infers the kind from a definition name suffix.
    #[must_use]
    pub fn infer(definition_name: &str) -> Option<Self> {
        if definition_name.ends_with("Request") {
            Some(MessageKind::Request)
        } else if definition_name.ends_with("Response") {
            Some(MessageKind::Response)
        } else if definition_name.ends_with("Notification") {
            Some(MessageKind::Notification)
        } else {
            None
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Definition names registered for one wire method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodEntry {
    /// Request payload definition.
    pub request: Option<String>,
    /// Response payload definition.
    pub response: Option<String>,
    /// Notification payload definition.
    pub notification: Option<String>,
}

impl MethodEntry {
    /// The definition name for one message kind.
    #[must_use]
    pub fn get(&self, kind: MessageKind) -> Option<&str> {
        match kind {
            MessageKind::Request => self.request.as_deref(),
            MessageKind::Response => self.response.as_deref(),
            MessageKind::Notification => self.notification.as_deref(),
        }
    }

    fn set(&mut self, kind: MessageKind, definition_name: String) {
        let slot = match kind {
            MessageKind::Request => &mut self.request,
            MessageKind::Response => &mut self.response,
            MessageKind::Notification => &mut self.notification,
        };
        *slot = Some(definition_name);
    }
}

/// Wire method name to [`MethodEntry`] for one side.
pub type MethodTable = BTreeMap<String, MethodEntry>;

/// The full method catalog, one table per side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodCatalog {
    agent: MethodTable,
    client: MethodTable,
    protocol: MethodTable,
}

impl MethodCatalog {
    /// The table for one side.
    #[must_use]
    pub fn side(&self, side: Side) -> &MethodTable {
        match side {
            Side::Agent => &self.agent,
            Side::Client => &self.client,
            Side::Protocol => &self.protocol,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut MethodTable {
        match side {
            Side::Agent => &mut self.agent,
            Side::Client => &mut self.client,
            Side::Protocol => &mut self.protocol,
        }
    }

    /// Looks up the definition registered for a (side, method, kind) triple.
    #[must_use]
    pub fn resolve(&self, side: Side, method: &str, kind: MessageKind) -> Option<&str> {
        self.side(side).get(method).and_then(|entry| entry.get(kind))
    }
}

/// Immutable registry of schema definitions and method metadata.
#[derive(Debug)]
pub struct SchemaRegistry {
    unstable: bool,
    defs: Map<String, Value>,
    agent_methods: BTreeMap<String, String>,
    client_methods: BTreeMap<String, String>,
    protocol_methods: BTreeMap<String, String>,
    catalog: MethodCatalog,
}

impl SchemaRegistry {
    /// The process-wide registry for a stability flag, built on first use.
    ///
    /// Embedded documents are validated at build; a malformed embedded
    /// document is a packaging bug, not a runtime condition.
    pub fn global(unstable: bool) -> &'static Arc<SchemaRegistry> {
        static STABLE: OnceLock<Arc<SchemaRegistry>> = OnceLock::new();
        static UNSTABLE: OnceLock<Arc<SchemaRegistry>> = OnceLock::new();
        let cell = if unstable { &UNSTABLE } else { &STABLE };
        cell.get_or_init(|| {
            Arc::new(
                SchemaRegistry::from_embedded(unstable)
                    .expect("embedded schema documents are valid"),
            )
        })
    }

    /// Builds a registry from the embedded schema/meta documents.
    pub fn from_embedded(unstable: bool) -> Result<Self> {
        let (schema_text, meta_text) = if unstable {
            (UNSTABLE_SCHEMA, UNSTABLE_META)
        } else {
            (STABLE_SCHEMA, STABLE_META)
        };
        let schema: Value = serde_json::from_str(schema_text)
            .map_err(|e| Error::internal_error(format!("malformed schema document: {e}")))?;
        let meta: Value = serde_json::from_str(meta_text)
            .map_err(|e| Error::internal_error(format!("malformed meta document: {e}")))?;
        Self::from_documents(&schema, &meta, unstable)
    }

    /// Builds a registry from explicit documents.
    ///
    /// The schema document must carry a `$defs` map. This is the injection
    /// point for tests and embedders that ship their own schema variants.
    pub fn from_documents(schema: &Value, meta: &Value, unstable: bool) -> Result<Self> {
        let defs = schema
            .get("$defs")
            .and_then(Value::as_object)
            .ok_or_else(|| Error::internal_error("schema document has no $defs map"))?
            .clone();
        let catalog = build_method_catalog(&defs);
        trace!(
            target: targets::REGISTRY,
            "built {} registry: {} definitions, {}/{}/{} agent/client/protocol methods",
            if unstable { "unstable" } else { "stable" },
            defs.len(),
            catalog.agent.len(),
            catalog.client.len(),
            catalog.protocol.len(),
        );
        Ok(Self {
            unstable,
            defs,
            agent_methods: method_map(meta, "agentMethods"),
            client_methods: method_map(meta, "clientMethods"),
            protocol_methods: method_map(meta, "protocolMethods"),
            catalog,
        })
    }

    /// Whether this registry holds the unstable schema variant.
    #[must_use]
    pub fn is_unstable(&self) -> bool {
        self.unstable
    }

    /// The definition map.
    #[must_use]
    pub fn defs(&self) -> &Map<String, Value> {
        &self.defs
    }

    /// Whether a definition exists.
    #[must_use]
    pub fn contains(&self, definition_name: &str) -> bool {
        self.defs.contains_key(definition_name)
    }

    /// The schema node for one definition.
    pub fn schema_for(&self, definition_name: &str) -> Result<&Value> {
        self.defs.get(definition_name).ok_or_else(|| {
            Error::invalid_params(format!("unknown schema definition {definition_name}"))
        })
    }

    /// The frozen method catalog.
    #[must_use]
    pub fn method_catalog(&self) -> &MethodCatalog {
        &self.catalog
    }

    /// Symbolic name to wire method name map for the agent side.
    #[must_use]
    pub fn agent_methods(&self) -> &BTreeMap<String, String> {
        &self.agent_methods
    }

    /// Symbolic name to wire method name map for the client side.
    #[must_use]
    pub fn client_methods(&self) -> &BTreeMap<String, String> {
        &self.client_methods
    }

    /// Symbolic name to wire method name map for the protocol side.
    #[must_use]
    pub fn protocol_methods(&self) -> &BTreeMap<String, String> {
        &self.protocol_methods
    }

    /// Symbolic name to wire method name map for any side.
    #[must_use]
    pub fn methods_for(&self, side: Side) -> &BTreeMap<String, String> {
        match side {
            Side::Agent => &self.agent_methods,
            Side::Client => &self.client_methods,
            Side::Protocol => &self.protocol_methods,
        }
    }
}

/// Catalog entries exist only for definitions carrying both side and method
/// tags with an inferable kind suffix; everything else is a plain type.
fn build_method_catalog(defs: &Map<String, Value>) -> MethodCatalog {
    let mut catalog = MethodCatalog::default();
    for (definition_name, schema) in defs {
        let Some(side) = schema
            .get("x-side")
            .and_then(Value::as_str)
            .and_then(Side::from_tag)
        else {
            continue;
        };
        let Some(method) = schema.get("x-method").and_then(Value::as_str) else {
            continue;
        };
        let Some(kind) = MessageKind::infer(definition_name) else {
            continue;
        };
        catalog
            .side_mut(side)
            .entry(method.to_owned())
            .or_default()
            .set(kind, definition_name.clone());
    }
    catalog
}

fn method_map(meta: &Value, key: &str) -> BTreeMap<String, String> {
    meta.get(key)
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_owned())))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stable_schema_has_defs() {
        let registry = SchemaRegistry::global(false);
        assert!(!registry.defs().is_empty());
        assert!(registry.contains("InitializeRequest"));
    }

    #[test]
    fn test_unstable_schema_is_a_superset() {
        let stable = SchemaRegistry::global(false);
        let unstable = SchemaRegistry::global(true);
        assert!(unstable.defs().len() > stable.defs().len());
        assert!(unstable.contains("ListSessionsRequest"));
        assert!(!stable.contains("ListSessionsRequest"));
    }

    #[test]
    fn test_agent_methods_stable() {
        let methods = SchemaRegistry::global(false).agent_methods();
        assert_eq!(methods.get("initialize").map(String::as_str), Some("initialize"));
        assert_eq!(
            methods.get("session_prompt").map(String::as_str),
            Some("session/prompt")
        );
    }

    #[test]
    fn test_client_methods_stable() {
        let methods = SchemaRegistry::global(false).client_methods();
        assert_eq!(
            methods.get("session_update").map(String::as_str),
            Some("session/update")
        );
    }

    #[test]
    fn test_protocol_methods_stable_is_empty() {
        assert!(SchemaRegistry::global(false).protocol_methods().is_empty());
    }

    #[test]
    fn test_protocol_methods_unstable_has_cancel() {
        let methods = SchemaRegistry::global(true).protocol_methods();
        assert_eq!(
            methods.get("cancel_request").map(String::as_str),
            Some("$/cancel_request")
        );
    }

    #[test]
    fn test_method_catalog_has_agent_side() {
        let catalog = SchemaRegistry::global(false).method_catalog();
        assert_eq!(
            catalog.resolve(Side::Agent, "initialize", MessageKind::Request),
            Some("InitializeRequest")
        );
        assert_eq!(
            catalog.resolve(Side::Agent, "session/prompt", MessageKind::Response),
            Some("PromptResponse")
        );
        assert_eq!(
            catalog.resolve(Side::Agent, "session/cancel", MessageKind::Notification),
            Some("CancelNotification")
        );
    }

    #[test]
    fn test_method_catalog_has_client_side() {
        let catalog = SchemaRegistry::global(false).method_catalog();
        assert_eq!(
            catalog.resolve(Side::Client, "session/update", MessageKind::Notification),
            Some("SessionNotification")
        );
        assert_eq!(
            catalog.resolve(Side::Client, "terminal/create", MessageKind::Request),
            Some("CreateTerminalRequest")
        );
    }

    #[test]
    fn test_untagged_definitions_stay_out_of_the_catalog() {
        let catalog = SchemaRegistry::global(false).method_catalog();
        // AgentRequest ends with "Request" but carries no x-side/x-method.
        for side in [Side::Agent, Side::Client, Side::Protocol] {
            for entry in catalog.side(side).values() {
                assert_ne!(entry.request.as_deref(), Some("AgentRequest"));
            }
        }
    }

    #[test]
    fn test_schema_for_unknown_definition_fails() {
        let registry = SchemaRegistry::global(false);
        assert!(registry.schema_for("InitializeRequest").is_ok());
        assert!(registry.schema_for("NoSuchDefinition").is_err());
    }

    #[test]
    fn test_from_documents_injection() {
        let schema = json!({
            "$defs": {
                "PingRequest": {
                    "type": "object",
                    "x-side": "agent",
                    "x-method": "ping",
                    "properties": {}
                }
            }
        });
        let registry = SchemaRegistry::from_documents(&schema, &json!({}), false).unwrap();
        assert_eq!(
            registry
                .method_catalog()
                .resolve(Side::Agent, "ping", MessageKind::Request),
            Some("PingRequest")
        );
        assert!(registry.agent_methods().is_empty());
    }

    #[test]
    fn test_from_documents_requires_defs() {
        assert!(SchemaRegistry::from_documents(&json!({}), &json!({}), false).is_err());
    }
}
