//! Workflow definition types and validation.
//!
//! Definitions are submitted as JSON documents:
//!
//! ```json
//! {
//!   "id": "order",
//!   "name": "Order fulfilment",
//!   "states": [
//!     {"id": "new", "name": "New", "is_initial": true},
//!     {"id": "shipped", "name": "Shipped"},
//!     {"id": "done", "name": "Done", "is_final": true}
//!   ],
//!   "actions": [
//!     {"id": "ship", "name": "Ship", "from_states": "new", "to_state": "shipped"},
//!     {"id": "close", "name": "Close", "from_states": ["new", "shipped"], "to_state": "done"}
//!   ]
//! }
//! ```

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_true() -> bool {
    true
}

/// A state in a workflow definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// State ID, unique within the definition.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Disabled states cannot be entered or used as the starting point.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Marks the state new instances start in. Exactly one per definition.
    #[serde(default)]
    pub is_initial: bool,

    /// Final states are absorbing: no action fires from them.
    #[serde(default)]
    pub is_final: bool,
}

/// An action: a named transition from one or more source states to a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTransition {
    /// Action ID, unique within the definition.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Disabled actions are refused at execution time.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Source state(s). Accepts a single state ID or an array on the wire.
    #[serde(deserialize_with = "deserialize_from_states")]
    pub from_states: Vec<String>,

    /// Target state ID.
    pub to_state: String,
}

fn deserialize_from_states<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct FromStatesVisitor;

    impl<'de> Visitor<'de> for FromStatesVisitor {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or array of strings")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: de::SeqAccess<'de>,
        {
            let mut states = Vec::new();
            while let Some(s) = seq.next_element::<String>()? {
                states.push(s);
            }
            Ok(states)
        }
    }

    deserializer.deserialize_any(FromStatesVisitor)
}

/// Raw workflow definition as submitted/transmitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinitionRaw {
    /// Definition ID, unique across the registry.
    pub id: String,

    /// Display name.
    pub name: String,

    /// All states, in declaration order.
    #[serde(default)]
    pub states: Vec<State>,

    /// All actions, in declaration order.
    #[serde(default)]
    pub actions: Vec<ActionTransition>,
}

/// Validated and indexed workflow definition. Immutable once admitted.
#[derive(Debug)]
pub struct WorkflowDefinition {
    /// Definition ID.
    pub id: String,

    /// Display name.
    pub name: String,

    /// States in declaration order.
    pub states: Vec<State>,

    /// Actions in declaration order.
    pub actions: Vec<ActionTransition>,

    /// State ID -> position in `states`.
    state_index: HashMap<String, usize>,

    /// Action ID -> position in `actions`.
    action_index: HashMap<String, usize>,

    /// CRC32C of the canonical JSON encoding, for integrity checks.
    pub checksum: String,
}

impl WorkflowDefinition {
    /// Parses and validates a definition from a JSON document.
    ///
    /// `is_registered` is the registry's duplicate-ID view; it is consulted
    /// exactly once, after the ID itself has been checked for emptiness.
    pub fn from_json(
        json: &serde_json::Value,
        is_registered: impl Fn(&str) -> bool,
    ) -> Result<Self, CoreError> {
        let raw: WorkflowDefinitionRaw =
            serde_json::from_value(json.clone()).map_err(|e| CoreError::InvalidDefinition {
                reason: format!("malformed definition document: {e}"),
            })?;
        Self::from_raw(raw, is_registered)
    }

    /// Validates a raw definition and produces the frozen, indexed form.
    ///
    /// Checks run in a fixed order and the first failure wins: non-empty ID,
    /// registry conflict, duplicate state IDs, duplicate action IDs, exactly
    /// one initial state, then referential integrity of every action (target
    /// before sources, actions in declaration order).
    pub fn from_raw(
        raw: WorkflowDefinitionRaw,
        is_registered: impl Fn(&str) -> bool,
    ) -> Result<Self, CoreError> {
        if raw.id.is_empty() {
            return Err(CoreError::InvalidDefinition {
                reason: "definition id must not be empty".to_string(),
            });
        }

        if is_registered(&raw.id) {
            return Err(CoreError::DefinitionExists { id: raw.id });
        }

        let mut state_index = HashMap::with_capacity(raw.states.len());
        for (pos, state) in raw.states.iter().enumerate() {
            if state_index.insert(state.id.clone(), pos).is_some() {
                return Err(CoreError::InvalidDefinition {
                    reason: format!("duplicate state id '{}'", state.id),
                });
            }
        }

        let mut action_index = HashMap::with_capacity(raw.actions.len());
        for (pos, action) in raw.actions.iter().enumerate() {
            if action_index.insert(action.id.clone(), pos).is_some() {
                return Err(CoreError::InvalidDefinition {
                    reason: format!("duplicate action id '{}'", action.id),
                });
            }
        }

        let initial_count = raw.states.iter().filter(|s| s.is_initial).count();
        if initial_count != 1 {
            return Err(CoreError::InvalidDefinition {
                reason: format!("exactly one initial state required, found {initial_count}"),
            });
        }

        for action in &raw.actions {
            if !state_index.contains_key(&action.to_state) {
                return Err(CoreError::InvalidDefinition {
                    reason: format!(
                        "action '{}' references unknown target state '{}'",
                        action.id, action.to_state
                    ),
                });
            }
            for from in &action.from_states {
                if !state_index.contains_key(from) {
                    return Err(CoreError::InvalidDefinition {
                        reason: format!(
                            "action '{}' references unknown source state '{}'",
                            action.id, from
                        ),
                    });
                }
            }
        }

        let json_bytes = serde_json::to_vec(&raw)?;
        let checksum = format!("{:08x}", crc32c::crc32c(&json_bytes));

        Ok(Self {
            id: raw.id,
            name: raw.name,
            states: raw.states,
            actions: raw.actions,
            state_index,
            action_index,
            checksum,
        })
    }

    /// Looks up a state by ID.
    pub fn state(&self, id: &str) -> Option<&State> {
        self.state_index.get(id).map(|&pos| &self.states[pos])
    }

    /// Looks up an action by ID.
    pub fn action(&self, id: &str) -> Option<&ActionTransition> {
        self.action_index.get(id).map(|&pos| &self.actions[pos])
    }

    /// Returns the initial state, if one is declared.
    ///
    /// Admitted definitions always have exactly one; the `Option` lets the
    /// engine treat a missing initial state like a disabled one.
    pub fn initial_state(&self) -> Option<&State> {
        self.states.iter().find(|s| s.is_initial)
    }

    /// Returns true if the given state ID is declared in this definition.
    pub fn has_state(&self, id: &str) -> bool {
        self.state_index.contains_key(id)
    }

    /// Returns all actions declaring the given state as a source.
    pub fn actions_from(&self, state_id: &str) -> Vec<&ActionTransition> {
        self.actions
            .iter()
            .filter(|a| a.from_states.iter().any(|s| s == state_id))
            .collect()
    }

    /// Returns the definition as a JSON document (the admitted canonical form).
    pub fn to_json(&self) -> serde_json::Value {
        let raw = WorkflowDefinitionRaw {
            id: self.id.clone(),
            name: self.name.clone(),
            states: self.states.clone(),
            actions: self.actions.clone(),
        };
        serde_json::to_value(&raw).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_document() -> serde_json::Value {
        serde_json::json!({
            "id": "order",
            "name": "Order fulfilment",
            "states": [
                {"id": "new", "name": "New", "is_initial": true},
                {"id": "shipped", "name": "Shipped"},
                {"id": "done", "name": "Done", "is_final": true}
            ],
            "actions": [
                {"id": "ship", "name": "Ship", "from_states": "new", "to_state": "shipped"},
                {"id": "close", "name": "Close", "from_states": ["new", "shipped"], "to_state": "done"}
            ]
        })
    }

    fn unregistered(_id: &str) -> bool {
        false
    }

    #[test]
    fn test_parse_definition_defaults() {
        let def = WorkflowDefinition::from_json(&sample_document(), unregistered).unwrap();

        assert_eq!(def.id, "order");
        assert_eq!(def.name, "Order fulfilment");
        assert_eq!(def.states.len(), 3);
        assert_eq!(def.actions.len(), 2);

        // enabled defaults to true, flags default to false
        let shipped = def.state("shipped").unwrap();
        assert!(shipped.enabled);
        assert!(!shipped.is_initial);
        assert!(!shipped.is_final);
        assert!(def.state("done").unwrap().is_final);
        assert!(def.action("ship").unwrap().enabled);
    }

    #[test]
    fn test_from_states_accepts_string_or_array() {
        let def = WorkflowDefinition::from_json(&sample_document(), unregistered).unwrap();

        assert_eq!(def.action("ship").unwrap().from_states, vec!["new"]);
        assert_eq!(
            def.action("close").unwrap().from_states,
            vec!["new", "shipped"]
        );
    }

    #[test]
    fn test_malformed_document_rejected() {
        let result = WorkflowDefinition::from_json(&serde_json::json!({"id": 42}), unregistered);
        match result {
            Err(CoreError::InvalidDefinition { reason }) => {
                assert!(reason.contains("malformed definition document"))
            }
            other => panic!("expected InvalidDefinition, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_id_rejected() {
        let mut doc = sample_document();
        doc["id"] = serde_json::json!("");

        let result = WorkflowDefinition::from_json(&doc, unregistered);
        match result {
            Err(CoreError::InvalidDefinition { reason }) => {
                assert!(reason.contains("must not be empty"))
            }
            other => panic!("expected InvalidDefinition, got {other:?}"),
        }
    }

    #[test]
    fn test_registry_conflict() {
        let result = WorkflowDefinition::from_json(&sample_document(), |id| id == "order");
        assert!(matches!(result, Err(CoreError::DefinitionExists { id }) if id == "order"));
    }

    #[test]
    fn test_duplicate_state_id_rejected() {
        let doc = serde_json::json!({
            "id": "dup",
            "name": "Dup",
            "states": [
                {"id": "a", "name": "A", "is_initial": true},
                {"id": "a", "name": "A again"}
            ],
            "actions": []
        });

        let result = WorkflowDefinition::from_json(&doc, unregistered);
        match result {
            Err(CoreError::InvalidDefinition { reason }) => {
                assert!(reason.contains("duplicate state id 'a'"))
            }
            other => panic!("expected InvalidDefinition, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_action_id_rejected() {
        let doc = serde_json::json!({
            "id": "dup",
            "name": "Dup",
            "states": [
                {"id": "a", "name": "A", "is_initial": true},
                {"id": "b", "name": "B"}
            ],
            "actions": [
                {"id": "go", "name": "Go", "from_states": "a", "to_state": "b"},
                {"id": "go", "name": "Go again", "from_states": "b", "to_state": "a"}
            ]
        });

        let result = WorkflowDefinition::from_json(&doc, unregistered);
        match result {
            Err(CoreError::InvalidDefinition { reason }) => {
                assert!(reason.contains("duplicate action id 'go'"))
            }
            other => panic!("expected InvalidDefinition, got {other:?}"),
        }
    }

    #[test]
    fn test_exactly_one_initial_state_required() {
        let none = serde_json::json!({
            "id": "none",
            "name": "None",
            "states": [{"id": "a", "name": "A"}],
            "actions": []
        });
        match WorkflowDefinition::from_json(&none, unregistered) {
            Err(CoreError::InvalidDefinition { reason }) => assert!(reason.contains("found 0")),
            other => panic!("expected InvalidDefinition, got {other:?}"),
        }

        let two = serde_json::json!({
            "id": "two",
            "name": "Two",
            "states": [
                {"id": "a", "name": "A", "is_initial": true},
                {"id": "b", "name": "B", "is_initial": true}
            ],
            "actions": []
        });
        match WorkflowDefinition::from_json(&two, unregistered) {
            Err(CoreError::InvalidDefinition { reason }) => assert!(reason.contains("found 2")),
            other => panic!("expected InvalidDefinition, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_target_state_rejected() {
        let doc = serde_json::json!({
            "id": "bad",
            "name": "Bad",
            "states": [{"id": "a", "name": "A", "is_initial": true}],
            "actions": [
                {"id": "go", "name": "Go", "from_states": "a", "to_state": "ghost"}
            ]
        });

        match WorkflowDefinition::from_json(&doc, unregistered) {
            Err(CoreError::InvalidDefinition { reason }) => {
                assert!(reason.contains("'go'"));
                assert!(reason.contains("unknown target state 'ghost'"));
            }
            other => panic!("expected InvalidDefinition, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_source_state_rejected() {
        let doc = serde_json::json!({
            "id": "bad",
            "name": "Bad",
            "states": [
                {"id": "a", "name": "A", "is_initial": true},
                {"id": "b", "name": "B"}
            ],
            "actions": [
                {"id": "go", "name": "Go", "from_states": ["a", "ghost"], "to_state": "b"}
            ]
        });

        match WorkflowDefinition::from_json(&doc, unregistered) {
            Err(CoreError::InvalidDefinition { reason }) => {
                assert!(reason.contains("'go'"));
                assert!(reason.contains("unknown source state 'ghost'"));
            }
            other => panic!("expected InvalidDefinition, got {other:?}"),
        }
    }

    #[test]
    fn test_target_checked_before_sources() {
        // Both references are broken; the target is reported.
        let doc = serde_json::json!({
            "id": "bad",
            "name": "Bad",
            "states": [{"id": "a", "name": "A", "is_initial": true}],
            "actions": [
                {"id": "go", "name": "Go", "from_states": "ghost-src", "to_state": "ghost-dst"}
            ]
        });

        match WorkflowDefinition::from_json(&doc, unregistered) {
            Err(CoreError::InvalidDefinition { reason }) => {
                assert!(reason.contains("unknown target state 'ghost-dst'"))
            }
            other => panic!("expected InvalidDefinition, got {other:?}"),
        }
    }

    #[test]
    fn test_disabled_initial_state_is_admitted() {
        // The validator checks placement, not enablement; starting an
        // instance is where a disabled initial state is refused.
        let doc = serde_json::json!({
            "id": "dormant",
            "name": "Dormant",
            "states": [{"id": "a", "name": "A", "is_initial": true, "enabled": false}],
            "actions": []
        });

        let def = WorkflowDefinition::from_json(&doc, unregistered).unwrap();
        assert!(!def.initial_state().unwrap().enabled);
    }

    #[test]
    fn test_checksum_is_stable() {
        let def1 = WorkflowDefinition::from_json(&sample_document(), unregistered).unwrap();
        let def2 = WorkflowDefinition::from_json(&sample_document(), unregistered).unwrap();
        assert_eq!(def1.checksum, def2.checksum);
        assert_eq!(def1.checksum.len(), 8);

        let mut other = sample_document();
        other["name"] = serde_json::json!("Different");
        let def3 = WorkflowDefinition::from_json(&other, unregistered).unwrap();
        assert_ne!(def1.checksum, def3.checksum);
    }

    #[test]
    fn test_lookups_and_actions_from() {
        let def = WorkflowDefinition::from_json(&sample_document(), unregistered).unwrap();

        assert!(def.has_state("new"));
        assert!(!def.has_state("ghost"));
        assert!(def.state("ghost").is_none());
        assert!(def.action("ghost").is_none());
        assert_eq!(def.initial_state().unwrap().id, "new");

        let from_new: Vec<&str> = def
            .actions_from("new")
            .iter()
            .map(|a| a.id.as_str())
            .collect();
        assert_eq!(from_new, vec!["ship", "close"]);
        assert!(def.actions_from("done").is_empty());
    }

    #[test]
    fn test_to_json_roundtrips() {
        let def = WorkflowDefinition::from_json(&sample_document(), unregistered).unwrap();
        let doc = def.to_json();

        let again = WorkflowDefinition::from_json(&doc, unregistered).unwrap();
        assert_eq!(again.id, def.id);
        assert_eq!(again.checksum, def.checksum);
    }

    proptest! {
        /// The validator is total: any candidate yields Ok or a structured
        /// validation error, never a panic, and admitted definitions always
        /// carry exactly one initial state and intact references.
        #[test]
        fn prop_validator_total(
            def_id in "[a-b]{0,2}",
            states in proptest::collection::vec(
                ("[a-d]{1,2}", any::<bool>(), any::<bool>(), any::<bool>()),
                0..5,
            ),
            actions in proptest::collection::vec(
                (
                    "[a-d]{1,2}",
                    any::<bool>(),
                    proptest::collection::vec("[a-e]{1,2}", 0..3),
                    "[a-e]{1,2}",
                ),
                0..4,
            ),
        ) {
            let raw = WorkflowDefinitionRaw {
                id: def_id,
                name: "prop".to_string(),
                states: states
                    .iter()
                    .map(|(id, enabled, is_initial, is_final)| State {
                        id: id.clone(),
                        name: id.clone(),
                        enabled: *enabled,
                        is_initial: *is_initial,
                        is_final: *is_final,
                    })
                    .collect(),
                actions: actions
                    .iter()
                    .map(|(id, enabled, from_states, to_state)| ActionTransition {
                        id: id.clone(),
                        name: id.clone(),
                        enabled: *enabled,
                        from_states: from_states.clone(),
                        to_state: to_state.clone(),
                    })
                    .collect(),
            };

            match WorkflowDefinition::from_raw(raw, |_| false) {
                Ok(def) => {
                    prop_assert_eq!(def.states.iter().filter(|s| s.is_initial).count(), 1);
                    for action in &def.actions {
                        prop_assert!(def.has_state(&action.to_state));
                        for from in &action.from_states {
                            prop_assert!(def.has_state(from));
                        }
                    }
                }
                Err(CoreError::InvalidDefinition { reason }) => prop_assert!(!reason.is_empty()),
                Err(e) => prop_assert!(false, "unexpected error: {}", e),
            }
        }
    }
}
