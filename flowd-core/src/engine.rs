//! Workflow engine - coordinates definitions, instances, and transitions.

use crate::definition::{ActionTransition, State, WorkflowDefinition};
use crate::error::CoreError;
use crate::instance::WorkflowInstance;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::Arc;

/// Receipt for a committed transition.
///
/// This is what `execute_action` hands back: the facts of the commit, not
/// the updated instance. Callers that want the instance fetch it separately.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub instance_id: String,
    pub action_id: String,
    pub from_state_id: String,
    pub to_state_id: String,
    pub timestamp: DateTime<Utc>,
}

/// The workflow engine: definition registry, instance store, and executor.
///
/// All methods are synchronous and never perform I/O. Definitions are
/// admitted once and shared immutably; instances are mutated only under
/// their own exclusive lock.
pub struct WorkflowEngine {
    /// Admitted definitions indexed by ID.
    definitions: DashMap<String, Arc<WorkflowDefinition>>,

    /// Definition IDs in admission order. The lock doubles as the admission
    /// critical section, making duplicate-check-plus-insert atomic.
    definition_order: Mutex<Vec<String>>,

    /// Instances indexed by ID.
    instances: DashMap<String, RwLock<WorkflowInstance>>,

    /// Instance IDs in creation order.
    instance_order: Mutex<Vec<String>>,
}

impl WorkflowEngine {
    /// Creates an empty engine.
    pub fn new() -> Self {
        Self {
            definitions: DashMap::new(),
            definition_order: Mutex::new(Vec::new()),
            instances: DashMap::new(),
            instance_order: Mutex::new(Vec::new()),
        }
    }

    // =========================================================================
    // Definition Management
    // =========================================================================

    /// Validates and admits a workflow definition document.
    ///
    /// Validation and insertion happen under the admission lock, so two
    /// racing submissions with the same ID admit exactly one definition.
    /// Admission is all-or-nothing and the definition is frozen thereafter.
    pub fn add_definition(&self, document: &Value) -> Result<Arc<WorkflowDefinition>, CoreError> {
        let mut order = self.definition_order.lock();

        let definition = Arc::new(WorkflowDefinition::from_json(document, |id| {
            self.definitions.contains_key(id)
        })?);

        self.definitions
            .insert(definition.id.clone(), definition.clone());
        order.push(definition.id.clone());

        tracing::info!(
            "definition '{}' admitted ({} states, {} actions, checksum {})",
            definition.id,
            definition.states.len(),
            definition.actions.len(),
            definition.checksum
        );

        Ok(definition)
    }

    /// Gets an admitted definition by ID.
    pub fn get_definition(&self, id: &str) -> Result<Arc<WorkflowDefinition>, CoreError> {
        self.definitions
            .get(id)
            .map(|r| r.clone())
            .ok_or_else(|| CoreError::DefinitionNotFound { id: id.to_string() })
    }

    /// Lists all admitted definitions in admission order.
    pub fn list_definitions(&self) -> Vec<Arc<WorkflowDefinition>> {
        let order = self.definition_order.lock();
        order
            .iter()
            .filter_map(|id| self.definitions.get(id).map(|r| r.clone()))
            .collect()
    }

    /// Lists a definition's states in declaration order.
    pub fn list_states(&self, definition_id: &str) -> Result<Vec<State>, CoreError> {
        Ok(self.get_definition(definition_id)?.states.clone())
    }

    /// Lists a definition's actions in declaration order.
    pub fn list_actions(&self, definition_id: &str) -> Result<Vec<ActionTransition>, CoreError> {
        Ok(self.get_definition(definition_id)?.actions.clone())
    }

    /// Returns the number of admitted definitions.
    pub fn definition_count(&self) -> usize {
        self.definitions.len()
    }

    // =========================================================================
    // Instance Lifecycle
    // =========================================================================

    /// Starts a new instance of the given definition.
    ///
    /// The instance is placed in the definition's initial state, which must
    /// be enabled; there is no way to start in any other state. Instance IDs
    /// are generated UUIDs, so ID creation never contends with transitions.
    pub fn start_instance(&self, definition_id: &str) -> Result<WorkflowInstance, CoreError> {
        let definition = self.get_definition(definition_id)?;

        let initial = definition
            .initial_state()
            .filter(|s| s.enabled)
            .ok_or_else(|| CoreError::NoEnabledInitialState {
                definition: definition_id.to_string(),
            })?;

        let instance_id = uuid::Uuid::new_v4().to_string();
        let instance = WorkflowInstance::new(instance_id.clone(), definition_id, &initial.id);

        let mut order = self.instance_order.lock();
        self.instances
            .insert(instance_id.clone(), RwLock::new(instance.clone()));
        order.push(instance_id);

        tracing::debug!(
            "instance '{}' started for definition '{}' in state '{}'",
            instance.id,
            definition_id,
            instance.current_state_id
        );

        Ok(instance)
    }

    /// Gets a snapshot of an instance by ID.
    pub fn get_instance(&self, id: &str) -> Result<WorkflowInstance, CoreError> {
        self.instances
            .get(id)
            .map(|r| r.read().clone())
            .ok_or_else(|| CoreError::InstanceNotFound { id: id.to_string() })
    }

    /// Lists snapshots of all instances in creation order.
    pub fn list_instances(&self) -> Vec<WorkflowInstance> {
        let order = self.instance_order.lock();
        order
            .iter()
            .filter_map(|id| self.instances.get(id).map(|r| r.read().clone()))
            .collect()
    }

    /// Returns the number of instances.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    // =========================================================================
    // Transition Execution
    // =========================================================================

    /// Executes an action against an instance.
    ///
    /// Guards evaluate in a fixed order and the first failure wins: instance
    /// exists, definition exists, current state declared, current state not
    /// final, action exists, action enabled, current state is a declared
    /// source, target state declared and enabled. The instance's write lock
    /// is held from guard evaluation through the commit, so racing calls
    /// serialize and the losers are judged against the committed state.
    pub fn execute_action(
        &self,
        instance_id: &str,
        action_id: &str,
    ) -> Result<ActionOutcome, CoreError> {
        let instance_lock =
            self.instances
                .get(instance_id)
                .ok_or_else(|| CoreError::InstanceNotFound {
                    id: instance_id.to_string(),
                })?;

        let mut instance = instance_lock.write();

        let definition = self.get_definition(&instance.definition_id)?;

        let current = definition.state(&instance.current_state_id).ok_or_else(|| {
            CoreError::CurrentStateMissing {
                instance: instance_id.to_string(),
                state: instance.current_state_id.clone(),
            }
        })?;

        if current.is_final {
            return Err(CoreError::FinalStateLocked {
                instance: instance_id.to_string(),
                state: current.id.clone(),
            });
        }

        let action = definition
            .action(action_id)
            .ok_or_else(|| CoreError::ActionNotFound {
                definition: definition.id.clone(),
                action: action_id.to_string(),
            })?;

        if !action.enabled {
            return Err(CoreError::ActionDisabled {
                action: action_id.to_string(),
            });
        }

        if !action
            .from_states
            .iter()
            .any(|s| s == &instance.current_state_id)
        {
            return Err(CoreError::InvalidSourceState {
                action: action_id.to_string(),
                state: instance.current_state_id.clone(),
            });
        }

        let target = definition
            .state(&action.to_state)
            .filter(|s| s.enabled)
            .ok_or_else(|| CoreError::TargetStateUnavailable {
                action: action_id.to_string(),
                state: action.to_state.clone(),
            })?;

        let entry = instance.apply_transition(action_id, &target.id);

        tracing::debug!(
            "instance '{}' moved '{}' -> '{}' via action '{}'",
            instance_id,
            entry.from_state_id,
            entry.to_state_id,
            entry.action_id
        );

        Ok(ActionOutcome {
            instance_id: instance_id.to_string(),
            action_id: entry.action_id,
            from_state_id: entry.from_state_id,
            to_state_id: entry.to_state_id,
            timestamp: entry.timestamp,
        })
    }
}

impl Default for WorkflowEngine {
    fn default() -> Self {
        Self::new()
    }
}
