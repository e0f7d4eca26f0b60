//! High-level client API.

use crate::connection::{Connection, ConnectionConfig};
use crate::error::ClientError;
use flowd_protocol::message::*;
use serde_json::{json, Value};
use std::sync::Arc;

/// High-level client for flowd.
pub struct Client {
    conn: Arc<Connection>,
}

impl Client {
    /// Creates a new client with the given configuration.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            conn: Arc::new(Connection::new(config)),
        }
    }

    /// Connects to the server.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.conn.connect().await
    }

    /// Returns whether the client is connected.
    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Closes the connection.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.conn.close().await
    }

    /// Returns the underlying connection (for the background read loop).
    pub fn connection(&self) -> Arc<Connection> {
        self.conn.clone()
    }

    // =========================================================================
    // Helper methods
    // =========================================================================

    async fn request(&self, op: Operation, params: Value) -> Result<Value, ClientError> {
        let response = self.conn.request(op, params).await?;

        if response.is_error() {
            let err = response.error.unwrap();
            return Err(ClientError::ServerError {
                code: err.code,
                message: err.message,
                retryable: err.retryable,
            });
        }

        Ok(response.result.unwrap_or(Value::Null))
    }

    // =========================================================================
    // System operations
    // =========================================================================

    /// Pings the server.
    pub async fn ping(&self) -> Result<(), ClientError> {
        self.request(Operation::Ping, json!({})).await?;
        Ok(())
    }

    /// Gets server info.
    pub async fn info(&self) -> Result<Value, ClientError> {
        self.request(Operation::Info, json!({})).await
    }

    /// Tells the server we are leaving, then closes the connection.
    pub async fn bye(&self) -> Result<(), ClientError> {
        self.request(Operation::Bye, json!({})).await?;
        self.close().await
    }

    // =========================================================================
    // Definition operations
    // =========================================================================

    /// Registers a workflow definition.
    pub async fn create_definition(
        &self,
        definition: Value,
    ) -> Result<CreateDefinitionResult, ClientError> {
        let params = json!({
            "definition": definition,
        });

        let result = self.request(Operation::CreateDefinition, params).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Gets a workflow definition.
    pub async fn get_definition(
        &self,
        definition_id: &str,
    ) -> Result<GetDefinitionResult, ClientError> {
        let params = json!({
            "definition_id": definition_id,
        });

        let result = self.request(Operation::GetDefinition, params).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Lists all registered definitions.
    pub async fn list_definitions(&self) -> Result<ListDefinitionsResult, ClientError> {
        let result = self.request(Operation::ListDefinitions, json!({})).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Lists the states of a definition in declaration order.
    pub async fn list_states(&self, definition_id: &str) -> Result<ListStatesResult, ClientError> {
        let params = json!({
            "definition_id": definition_id,
        });

        let result = self.request(Operation::ListStates, params).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Lists the actions of a definition in declaration order.
    pub async fn list_actions(
        &self,
        definition_id: &str,
    ) -> Result<ListActionsResult, ClientError> {
        let params = json!({
            "definition_id": definition_id,
        });

        let result = self.request(Operation::ListActions, params).await?;
        Ok(serde_json::from_value(result)?)
    }

    // =========================================================================
    // Instance operations
    // =========================================================================

    /// Starts a new instance of a definition.
    pub async fn start_instance(
        &self,
        definition_id: &str,
    ) -> Result<StartInstanceResult, ClientError> {
        let params = json!({
            "definition_id": definition_id,
        });

        let result = self.request(Operation::StartInstance, params).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Gets an instance with its full transition history.
    pub async fn get_instance(&self, instance_id: &str) -> Result<GetInstanceResult, ClientError> {
        let params = json!({
            "instance_id": instance_id,
        });

        let result = self.request(Operation::GetInstance, params).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Lists instances, optionally filtered by definition and current state.
    pub async fn list_instances(
        &self,
        definition_id: Option<&str>,
        current_state_id: Option<&str>,
        limit: Option<u32>,
    ) -> Result<ListInstancesResult, ClientError> {
        let mut params = json!({});

        if let Some(d) = definition_id {
            params["definition_id"] = json!(d);
        }
        if let Some(s) = current_state_id {
            params["current_state_id"] = json!(s);
        }
        if let Some(l) = limit {
            params["limit"] = json!(l);
        }

        let result = self.request(Operation::ListInstances, params).await?;
        Ok(serde_json::from_value(result)?)
    }

    // =========================================================================
    // Action operations
    // =========================================================================

    /// Executes an action on an instance, committing a single transition.
    pub async fn execute_action(
        &self,
        instance_id: &str,
        action_id: &str,
    ) -> Result<ExecuteActionResult, ClientError> {
        let params = json!({
            "instance_id": instance_id,
            "action_id": action_id,
        });

        let result = self.request(Operation::ExecuteAction, params).await?;
        Ok(serde_json::from_value(result)?)
    }
}
