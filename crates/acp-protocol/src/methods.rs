//! Symbolic method name lookups.
//!
//! The metadata documents map symbolic names (`session_prompt`) onto wire
//! method names (`session/prompt`). These helpers read the process-wide
//! registry for the requested stability level.

use std::collections::BTreeMap;

use crate::registry::{SchemaRegistry, Side};

/// Symbolic-to-wire method map for the agent side.
#[must_use]
pub fn agent(unstable: bool) -> &'static BTreeMap<String, String> {
    SchemaRegistry::global(unstable).agent_methods()
}

/// Symbolic-to-wire method map for the client side.
#[must_use]
pub fn client(unstable: bool) -> &'static BTreeMap<String, String> {
    SchemaRegistry::global(unstable).client_methods()
}

/// Symbolic-to-wire method map for protocol-level methods.
#[must_use]
pub fn protocol(unstable: bool) -> &'static BTreeMap<String, String> {
    SchemaRegistry::global(unstable).protocol_methods()
}

/// Resolves a symbolic name to its wire method name on one side.
#[must_use]
pub fn wire_method(side: Side, symbolic: &str, unstable: bool) -> Option<&'static str> {
    SchemaRegistry::global(unstable)
        .methods_for(side)
        .get(symbolic)
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_method_lookup() {
        assert_eq!(
            wire_method(Side::Agent, "session_prompt", false),
            Some("session/prompt")
        );
        assert_eq!(wire_method(Side::Agent, "initialize", false), Some("initialize"));
        assert_eq!(wire_method(Side::Agent, "session_list", false), None);
        assert_eq!(
            wire_method(Side::Agent, "session_list", true),
            Some("session/list")
        );
    }

    #[test]
    fn test_client_method_lookup() {
        assert_eq!(
            wire_method(Side::Client, "terminal_wait_for_exit", false),
            Some("terminal/wait_for_exit")
        );
        assert!(client(false).contains_key("fs_read_text_file"));
    }

    #[test]
    fn test_protocol_methods_by_stability() {
        assert!(protocol(false).is_empty());
        assert_eq!(
            wire_method(Side::Protocol, "cancel_request", true),
            Some("$/cancel_request")
        );
    }

    #[test]
    fn test_every_agent_method_resolves_in_the_catalog() {
        let registry = SchemaRegistry::global(true);
        for wire in agent(true).values() {
            assert!(
                registry.method_catalog().side(Side::Agent).contains_key(wire),
                "no catalog entry for {wire}"
            );
        }
    }
}
