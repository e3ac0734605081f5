//! Wire string constants for the protocol's closed enums.
//!
//! These mirror the enum definitions in the schema documents; the tests hold
//! the two views together so a schema edit cannot silently drift past the
//! constants.

use serde_json::Value;

use crate::registry::SchemaRegistry;

/// Values of `StopReason`.
pub mod stop_reason {
    pub const END_TURN: &str = "end_turn";
    pub const MAX_TOKENS: &str = "max_tokens";
    pub const MAX_TURN_REQUESTS: &str = "max_turn_requests";
    pub const REFUSAL: &str = "refusal";
    pub const CANCELLED: &str = "cancelled";
}

/// Values of `ToolKind`.
pub mod tool_kind {
    pub const READ: &str = "read";
    pub const EDIT: &str = "edit";
    pub const DELETE: &str = "delete";
    pub const MOVE: &str = "move";
    pub const SEARCH: &str = "search";
    pub const EXECUTE: &str = "execute";
    pub const THINK: &str = "think";
    pub const FETCH: &str = "fetch";
    pub const OTHER: &str = "other";
}

/// Values of `ToolCallStatus`.
pub mod tool_call_status {
    pub const PENDING: &str = "pending";
    pub const IN_PROGRESS: &str = "in_progress";
    pub const COMPLETED: &str = "completed";
    pub const FAILED: &str = "failed";
}

/// Values of `PlanEntryStatus`.
pub mod plan_entry_status {
    pub const PENDING: &str = "pending";
    pub const IN_PROGRESS: &str = "in_progress";
    pub const COMPLETED: &str = "completed";
}

/// Values of `PlanEntryPriority`.
pub mod plan_entry_priority {
    pub const HIGH: &str = "high";
    pub const MEDIUM: &str = "medium";
    pub const LOW: &str = "low";
}

/// Values of `PermissionOptionKind`.
pub mod permission_option_kind {
    pub const ALLOW_ONCE: &str = "allow_once";
    pub const ALLOW_ALWAYS: &str = "allow_always";
    pub const REJECT_ONCE: &str = "reject_once";
    pub const REJECT_ALWAYS: &str = "reject_always";
}

/// Extracts the admissible values of an enum-like definition.
///
/// Handles plain `enum` lists as well as `oneOf`/`anyOf` definitions whose
/// branches carry `const` values. Returns an empty list for definitions that
/// are not enum-like.
#[must_use]
pub fn enum_values(registry: &SchemaRegistry, definition_name: &str) -> Vec<Value> {
    let Some(schema) = registry.defs().get(definition_name) else {
        return Vec::new();
    };
    if let Some(options) = schema.get("enum").and_then(Value::as_array) {
        return options.clone();
    }
    let branches = schema
        .get("oneOf")
        .or_else(|| schema.get("anyOf"))
        .and_then(Value::as_array);
    branches
        .map(|branches| {
            branches
                .iter()
                .filter_map(|branch| branch.get("const").cloned())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assert_matches_schema(definition_name: &str, constants: &[&str]) {
        let registry = SchemaRegistry::global(false);
        let from_schema = enum_values(registry, definition_name);
        let expected: Vec<Value> = constants.iter().map(|c| json!(c)).collect();
        assert_eq!(from_schema, expected, "drift in {definition_name}");
    }

    #[test]
    fn test_stop_reason_matches_schema() {
        assert_matches_schema(
            "StopReason",
            &[
                stop_reason::END_TURN,
                stop_reason::MAX_TOKENS,
                stop_reason::MAX_TURN_REQUESTS,
                stop_reason::REFUSAL,
                stop_reason::CANCELLED,
            ],
        );
    }

    #[test]
    fn test_tool_kind_matches_schema() {
        assert_matches_schema(
            "ToolKind",
            &[
                tool_kind::READ,
                tool_kind::EDIT,
                tool_kind::DELETE,
                tool_kind::MOVE,
                tool_kind::SEARCH,
                tool_kind::EXECUTE,
                tool_kind::THINK,
                tool_kind::FETCH,
                tool_kind::OTHER,
            ],
        );
    }

    #[test]
    fn test_tool_call_status_matches_schema() {
        assert_matches_schema(
            "ToolCallStatus",
            &[
                tool_call_status::PENDING,
                tool_call_status::IN_PROGRESS,
                tool_call_status::COMPLETED,
                tool_call_status::FAILED,
            ],
        );
    }

    #[test]
    fn test_plan_entry_enums_match_schema() {
        assert_matches_schema(
            "PlanEntryStatus",
            &[
                plan_entry_status::PENDING,
                plan_entry_status::IN_PROGRESS,
                plan_entry_status::COMPLETED,
            ],
        );
        assert_matches_schema(
            "PlanEntryPriority",
            &[
                plan_entry_priority::HIGH,
                plan_entry_priority::MEDIUM,
                plan_entry_priority::LOW,
            ],
        );
    }

    #[test]
    fn test_permission_option_kind_matches_schema() {
        assert_matches_schema(
            "PermissionOptionKind",
            &[
                permission_option_kind::ALLOW_ONCE,
                permission_option_kind::ALLOW_ALWAYS,
                permission_option_kind::REJECT_ONCE,
                permission_option_kind::REJECT_ALWAYS,
            ],
        );
    }

    #[test]
    fn test_enum_values_from_const_branches() {
        let registry = SchemaRegistry::from_documents(
            &json!({
                "$defs": {
                    "Mode": {
                        "oneOf": [{ "const": "fast" }, { "const": "slow" }]
                    }
                }
            }),
            &json!({}),
            false,
        )
        .unwrap();
        assert_eq!(enum_values(&registry, "Mode"), vec![json!("fast"), json!("slow")]);
        assert!(enum_values(&registry, "Missing").is_empty());
    }
}
