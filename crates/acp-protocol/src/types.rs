//! Typed payload construction.
//!
//! Every schema definition gets a [`TypeDescriptor`] describing its shape:
//! object definitions carry property metadata and a bijective mapping between
//! wire keys (camelCase) and field names (snake_case); everything else is a
//! scalar, optionally with a value coercer. Descriptors are generated eagerly
//! when a [`TypeRegistry`] is built, so lookups never allocate.
//!
//! [`TypeRegistry::build`] turns a raw JSON payload into a [`Typed`] tree:
//! nested `$ref`s become nested typed objects, union branches are resolved
//! by the first branch whose coercion changes the representation, and
//! unrecognized content passes through untouched as [`Typed::Raw`].

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use acp_core::logging::{targets, trace};
use acp_core::{Error, ProtocolVersion, Result};

use crate::registry::SchemaRegistry;

/// Policy for object keys not declared in `properties`.
#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalProperties {
    /// Undeclared keys pass through untouched.
    Allow,
    /// Undeclared keys fail construction.
    Forbid,
    /// Undeclared keys are coerced through this schema node.
    Schema(Value),
}

/// Shape metadata for an object definition.
#[derive(Debug, Clone)]
pub struct ObjectShape {
    property_order: Vec<String>,
    property_schemas: BTreeMap<String, Value>,
    required: Vec<String>,
    additional: AdditionalProperties,
    field_for_wire: BTreeMap<String, String>,
    wire_for_field: BTreeMap<String, String>,
}

impl ObjectShape {
    fn from_schema(schema: &Value) -> Self {
        let properties = schema
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let mut property_order = Vec::with_capacity(properties.len());
        let mut property_schemas = BTreeMap::new();
        let mut field_for_wire = BTreeMap::new();
        let mut wire_for_field = BTreeMap::new();
        for (wire, node) in &properties {
            let mut field = snake_case(wire);
            // Distinct wire keys must stay distinct after normalization.
            while wire_for_field.contains_key(&field) {
                field.push_str("_field");
            }
            field_for_wire.insert(wire.clone(), field.clone());
            wire_for_field.insert(field, wire.clone());
            property_order.push(wire.clone());
            property_schemas.insert(wire.clone(), node.clone());
        }

        let required = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|keys| {
                keys.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        let additional = match schema.get("additionalProperties") {
            Some(Value::Bool(false)) => AdditionalProperties::Forbid,
            Some(node @ Value::Object(_)) => AdditionalProperties::Schema(node.clone()),
            _ => AdditionalProperties::Allow,
        };

        Self {
            property_order,
            property_schemas,
            required,
            additional,
            field_for_wire,
            wire_for_field,
        }
    }

    /// Declared wire keys, in schema order.
    #[must_use]
    pub fn property_order(&self) -> &[String] {
        &self.property_order
    }

    /// Required wire keys.
    #[must_use]
    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// The policy for undeclared keys.
    #[must_use]
    pub fn additional(&self) -> &AdditionalProperties {
        &self.additional
    }

    /// The snake_case field name for a wire key.
    #[must_use]
    pub fn field_for_wire(&self, wire: &str) -> Option<&str> {
        self.field_for_wire.get(wire).map(String::as_str)
    }

    /// The wire key for a snake_case field name.
    #[must_use]
    pub fn wire_for_field(&self, field: &str) -> Option<&str> {
        self.wire_for_field.get(field).map(String::as_str)
    }
}

/// Built-in value coercions for scalar definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarCoercer {
    /// Maps legacy textual versions onto [`ProtocolVersion::V0`].
    ProtocolVersion,
}

impl ScalarCoercer {
    fn apply(self, value: &Value) -> Result<Value> {
        match self {
            ScalarCoercer::ProtocolVersion => {
                Ok(Value::from(ProtocolVersion::parse(value)?.value()))
            }
        }
    }
}

/// Shape metadata for a non-object definition.
#[derive(Debug, Clone)]
pub struct ScalarShape {
    coercer: Option<ScalarCoercer>,
}

/// The two descriptor shapes.
#[derive(Debug, Clone)]
pub enum TypeShape {
    /// An object with declared properties.
    Object(ObjectShape),
    /// Anything else.
    Scalar(ScalarShape),
}

/// Generated metadata for one schema definition.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    name: String,
    shape: TypeShape,
}

impl TypeDescriptor {
    fn from_schema(name: &str, schema: &Value) -> Self {
        let is_object = schema.get("type").and_then(Value::as_str) == Some("object")
            || schema.get("properties").is_some();
        let shape = if is_object {
            TypeShape::Object(ObjectShape::from_schema(schema))
        } else {
            let coercer = (name == "ProtocolVersion").then_some(ScalarCoercer::ProtocolVersion);
            TypeShape::Scalar(ScalarShape { coercer })
        };
        Self {
            name: name.to_owned(),
            shape,
        }
    }

    /// The definition name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The descriptor shape.
    #[must_use]
    pub fn shape(&self) -> &TypeShape {
        &self.shape
    }

    /// Whether this descriptor describes an object.
    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self.shape, TypeShape::Object(_))
    }
}

/// One field of a typed object.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedField {
    field: String,
    wire: String,
    value: Typed,
}

/// A payload constructed against an object definition.
///
/// Fields are stored in declaration order (declared properties first, extras
/// after) and addressable by either their wire key or their field name.
#[derive(Debug, Clone)]
pub struct TypedObject {
    type_name: String,
    entries: Vec<TypedField>,
}

impl TypedObject {
    /// The definition this object was constructed against.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Looks a field up by wire key or field name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Typed> {
        self.entries
            .iter()
            .find(|entry| entry.field == name || entry.wire == name)
            .map(|entry| &entry.value)
    }

    /// Looks a field up, falling back to a default for absent fields.
    #[must_use]
    pub fn get_or<'a>(&'a self, name: &str, default: &'a Typed) -> &'a Typed {
        self.get(name).unwrap_or(default)
    }

    /// Whether a field exists, by wire key or field name.
    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.field.as_str())
    }

    /// Serializes back into a wire mapping, keys in declaration order.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        for entry in &self.entries {
            map.insert(entry.wire.clone(), entry.value.to_value());
        }
        Value::Object(map)
    }
}

impl PartialEq for TypedObject {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && self.to_value() == other.to_value()
    }
}

/// A payload constructed against a scalar definition.
#[derive(Debug, Clone)]
pub struct TypedScalar {
    type_name: String,
    value: Value,
}

impl TypedScalar {
    /// The definition this scalar was constructed against.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The (possibly coerced) value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl PartialEq for TypedScalar {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && self.value == other.value
    }
}

/// A typed payload tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Typed {
    /// Content no definition claimed; passes through verbatim.
    Raw(Value),
    /// A scalar constructed against a definition.
    Scalar(TypedScalar),
    /// An object constructed against a definition.
    Object(TypedObject),
    /// An array whose elements were individually coerced.
    Array(Vec<Typed>),
    /// An inline object whose values were individually coerced.
    Map(BTreeMap<String, Typed>),
}

impl Typed {
    /// Serializes the tree back into plain JSON.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Typed::Raw(value) => value.clone(),
            Typed::Scalar(scalar) => scalar.value.clone(),
            Typed::Object(object) => object.to_value(),
            Typed::Array(items) => Value::Array(items.iter().map(Typed::to_value).collect()),
            Typed::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_value()))
                    .collect(),
            ),
        }
    }

    /// The object inside, if this is one.
    #[must_use]
    pub fn as_object(&self) -> Option<&TypedObject> {
        match self {
            Typed::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Convenience field access, by wire key or field name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Typed> {
        match self {
            Typed::Object(object) => object.get(name),
            Typed::Map(map) => map.get(name),
            _ => None,
        }
    }
}

impl Serialize for Typed {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Outcome of coercing a value against one schema node.
enum Coerced {
    /// The coercion produced a different representation.
    Changed(Typed),
    /// The schema node had nothing to say about this value.
    Untouched,
}

/// Generated descriptors for every definition in a schema registry.
#[derive(Debug)]
pub struct TypeRegistry {
    schemas: Arc<SchemaRegistry>,
    types: BTreeMap<String, Arc<TypeDescriptor>>,
}

impl TypeRegistry {
    /// The process-wide type registry for a stability flag.
    pub fn global(unstable: bool) -> &'static Arc<TypeRegistry> {
        static STABLE: OnceLock<Arc<TypeRegistry>> = OnceLock::new();
        static UNSTABLE: OnceLock<Arc<TypeRegistry>> = OnceLock::new();
        let cell = if unstable { &UNSTABLE } else { &STABLE };
        cell.get_or_init(|| {
            Arc::new(TypeRegistry::new(Arc::clone(SchemaRegistry::global(
                unstable,
            ))))
        })
    }

    /// Generates descriptors for every definition in `schemas`.
    #[must_use]
    pub fn new(schemas: Arc<SchemaRegistry>) -> Self {
        let types: BTreeMap<String, Arc<TypeDescriptor>> = schemas
            .defs()
            .iter()
            .map(|(name, schema)| {
                (
                    name.clone(),
                    Arc::new(TypeDescriptor::from_schema(name, schema)),
                )
            })
            .collect();
        trace!(
            target: targets::REGISTRY,
            "generated {} type descriptors ({} objects)",
            types.len(),
            types.values().filter(|d| d.is_object()).count(),
        );
        Self { schemas, types }
    }

    /// The backing schema registry.
    #[must_use]
    pub fn schemas(&self) -> &Arc<SchemaRegistry> {
        &self.schemas
    }

    /// The descriptor for one definition.
    #[must_use]
    pub fn fetch(&self, definition_name: &str) -> Option<&Arc<TypeDescriptor>> {
        self.types.get(definition_name)
    }

    /// All definition names with descriptors.
    pub fn all(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Constructs a typed payload for a named definition.
    ///
    /// An unknown definition name is not an error: the payload passes
    /// through as [`Typed::Raw`].
    pub fn build(&self, definition_name: &str, payload: &Value) -> Result<Typed> {
        let Some(descriptor) = self.fetch(definition_name) else {
            return Ok(Typed::Raw(payload.clone()));
        };
        self.construct(descriptor, payload)
    }

    /// Coerces an already-typed value into a named definition.
    ///
    /// Idempotent: a value already typed as `definition_name` is returned
    /// unchanged. A value typed as something else is a conflict.
    pub fn coerce(&self, definition_name: &str, value: Typed) -> Result<Typed> {
        match value {
            Typed::Object(ref object) if object.type_name == definition_name => Ok(value),
            Typed::Object(object) => Err(Error::invalid_params(format!(
                "cannot coerce {} into {definition_name}",
                object.type_name
            ))),
            Typed::Scalar(ref scalar) if scalar.type_name == definition_name => Ok(value),
            other => self.build(definition_name, &other.to_value()),
        }
    }

    fn construct(&self, descriptor: &TypeDescriptor, payload: &Value) -> Result<Typed> {
        match &descriptor.shape {
            TypeShape::Object(shape) => self.construct_object(&descriptor.name, shape, payload),
            TypeShape::Scalar(shape) => {
                let value = match shape.coercer {
                    Some(coercer) => coercer.apply(payload)?,
                    None => payload.clone(),
                };
                Ok(Typed::Scalar(TypedScalar {
                    type_name: descriptor.name.clone(),
                    value,
                }))
            }
        }
    }

    fn construct_object(&self, name: &str, shape: &ObjectShape, payload: &Value) -> Result<Typed> {
        let empty;
        let input = match payload {
            Value::Null => {
                empty = Map::new();
                &empty
            }
            Value::Object(map) => map,
            _ => {
                return Err(Error::invalid_params(format!(
                    "{name} expects an object payload"
                )));
            }
        };

        // Field names are accepted on input alongside wire keys, so a typed
        // object can be rebuilt from its own field view.
        let mut normalized: Map<String, Value> = Map::new();
        for (key, value) in input {
            let wire = shape
                .wire_for_field(key)
                .map_or_else(|| key.clone(), str::to_owned);
            normalized.insert(wire, value.clone());
        }

        let missing: Vec<&str> = shape
            .required
            .iter()
            .filter(|key| !normalized.contains_key(*key))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(Error::invalid_params(format!(
                "{name} missing required keys: {}",
                missing.join(", ")
            )));
        }

        let mut entries = Vec::with_capacity(normalized.len());
        for wire in &shape.property_order {
            let Some(value) = normalized.remove(wire) else {
                continue;
            };
            let schema = &shape.property_schemas[wire];
            let coerced = match self.coerce_value(schema, &value)? {
                Coerced::Changed(typed) => typed,
                Coerced::Untouched => Typed::Raw(value),
            };
            entries.push(TypedField {
                field: shape.field_for_wire(wire).unwrap_or(wire).to_owned(),
                wire: wire.clone(),
                value: coerced,
            });
        }

        if !normalized.is_empty() {
            match &shape.additional {
                AdditionalProperties::Forbid => {
                    let unknown: Vec<&str> = normalized.keys().map(String::as_str).collect();
                    return Err(Error::invalid_params(format!(
                        "{name} unknown keys: {}",
                        unknown.join(", ")
                    )));
                }
                AdditionalProperties::Schema(schema) => {
                    for (wire, value) in &normalized {
                        let coerced = match self.coerce_value(schema, value)? {
                            Coerced::Changed(typed) => typed,
                            Coerced::Untouched => Typed::Raw(value.clone()),
                        };
                        entries.push(TypedField {
                            field: snake_case(wire),
                            wire: wire.clone(),
                            value: coerced,
                        });
                    }
                }
                AdditionalProperties::Allow => {
                    for (wire, value) in &normalized {
                        entries.push(TypedField {
                            field: snake_case(wire),
                            wire: wire.clone(),
                            value: Typed::Raw(value.clone()),
                        });
                    }
                }
            }
        }

        Ok(Typed::Object(TypedObject {
            type_name: name.to_owned(),
            entries,
        }))
    }

    /// Coerces a value against an arbitrary schema node.
    fn coerce_value(&self, schema: &Value, value: &Value) -> Result<Coerced> {
        if let Some(name) = ref_name(schema) {
            return self.coerce_ref(name, value);
        }
        if let Some(branches) = schema.get("allOf").and_then(Value::as_array) {
            return self.coerce_all_of(branches, value);
        }
        if let Some(branches) = union_branches(schema) {
            return self.coerce_union(branches, value);
        }
        if let Some(items) = schema.get("items") {
            if let Some(elements) = value.as_array() {
                return self.coerce_array(items, elements);
            }
        }
        if schema.get("properties").is_some() {
            if let Some(object) = value.as_object() {
                return self.coerce_inline_object(schema, object);
            }
        }
        Ok(Coerced::Untouched)
    }

    /// Every resolvable local ref claims the value: objects construct,
    /// scalars wrap. The wrap is what lets a ref branch win union
    /// arbitration even when the target is a plain scalar definition.
    fn coerce_ref(&self, name: &str, value: &Value) -> Result<Coerced> {
        match self.fetch(name) {
            Some(descriptor) => self.construct(descriptor, value).map(Coerced::Changed),
            None => Ok(Coerced::Untouched),
        }
    }

    /// Folds `allOf` branches into at most one typed representation.
    ///
    /// The first branch that produces a typed value wins the wrap; later
    /// branches may only confirm it (a `$ref` to the same definition) or
    /// conflict (a `$ref` to a different object definition).
    fn coerce_all_of(&self, branches: &[Value], value: &Value) -> Result<Coerced> {
        let mut current: Option<Typed> = None;
        for branch in branches {
            match &current {
                None => {
                    if let Coerced::Changed(typed) = self.coerce_value(branch, value)? {
                        current = Some(typed);
                    }
                }
                Some(Typed::Object(object)) => {
                    if let Some(name) = ref_name(branch) {
                        if name != object.type_name
                            && self.fetch(name).is_some_and(|d| d.is_object())
                        {
                            return Err(Error::invalid_params(format!(
                                "allOf branches disagree: {} vs {name}",
                                object.type_name
                            )));
                        }
                    }
                }
                Some(_) => {}
            }
        }
        Ok(current.map_or(Coerced::Untouched, Coerced::Changed))
    }

    /// Resolves `anyOf`/`oneOf` by the first branch whose coercion changes
    /// the representation. Branch construction failures are not errors here;
    /// they just disqualify the branch. A null value short-circuits when any
    /// branch admits null.
    fn coerce_union(&self, branches: &[Value], value: &Value) -> Result<Coerced> {
        if value.is_null() && branches.iter().any(branch_admits_null) {
            return Ok(Coerced::Untouched);
        }
        for branch in branches {
            match self.coerce_value(branch, value) {
                Ok(Coerced::Changed(typed)) => return Ok(Coerced::Changed(typed)),
                Ok(Coerced::Untouched) | Err(_) => {}
            }
        }
        Ok(Coerced::Untouched)
    }

    fn coerce_array(&self, items: &Value, elements: &[Value]) -> Result<Coerced> {
        let mut coerced = Vec::with_capacity(elements.len());
        let mut changed = false;
        for (index, element) in elements.iter().enumerate() {
            let outcome = match items {
                Value::Array(schemas) => match schemas.get(index) {
                    Some(item_schema) => self.coerce_value(item_schema, element)?,
                    None => Coerced::Untouched,
                },
                node => self.coerce_value(node, element)?,
            };
            match outcome {
                Coerced::Changed(typed) => {
                    changed = true;
                    coerced.push(typed);
                }
                Coerced::Untouched => coerced.push(Typed::Raw(element.clone())),
            }
        }
        if changed {
            Ok(Coerced::Changed(Typed::Array(coerced)))
        } else {
            Ok(Coerced::Untouched)
        }
    }

    fn coerce_inline_object(&self, schema: &Value, object: &Map<String, Value>) -> Result<Coerced> {
        let properties = schema
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let mut coerced = BTreeMap::new();
        let mut changed = false;
        for (key, value) in object {
            let typed = match properties.get(key) {
                Some(property_schema) => match self.coerce_value(property_schema, value)? {
                    Coerced::Changed(typed) => {
                        changed = true;
                        typed
                    }
                    Coerced::Untouched => Typed::Raw(value.clone()),
                },
                None => Typed::Raw(value.clone()),
            };
            coerced.insert(key.clone(), typed);
        }
        if changed {
            Ok(Coerced::Changed(Typed::Map(coerced)))
        } else {
            Ok(Coerced::Untouched)
        }
    }
}

fn ref_name(schema: &Value) -> Option<&str> {
    schema
        .get("$ref")
        .and_then(Value::as_str)
        .and_then(|r| r.strip_prefix("#/$defs/"))
        .filter(|name| !name.is_empty() && !name.contains('/'))
}

fn union_branches(schema: &Value) -> Option<&Vec<Value>> {
    schema
        .get("anyOf")
        .or_else(|| schema.get("oneOf"))
        .and_then(Value::as_array)
}

fn branch_admits_null(branch: &Value) -> bool {
    match branch.get("type") {
        Some(Value::String(t)) => t == "null",
        Some(Value::Array(types)) => types.iter().any(|t| t == "null"),
        _ => false,
    }
}

/// Converts a wire key into a Rust-flavored field name.
///
/// CamelCase boundaries and dashes become underscores, leading underscores
/// are stripped, and the result is kept a valid identifier.
#[must_use]
pub fn snake_case(name: &str) -> String {
    let trimmed = name.trim_start_matches('_');
    let chars: Vec<char> = trimmed.chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c == '-' {
            out.push('_');
            continue;
        }
        if c.is_ascii_uppercase() {
            let boundary = match chars.get(i.wrapping_sub(1)) {
                Some(prev) if prev.is_ascii_lowercase() || prev.is_ascii_digit() => true,
                Some(prev) if prev.is_ascii_uppercase() => {
                    chars.get(i + 1).is_some_and(char::is_ascii_lowercase)
                }
                _ => false,
            };
            if boundary && !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    if out.is_empty() {
        return "field".to_owned();
    }
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}
