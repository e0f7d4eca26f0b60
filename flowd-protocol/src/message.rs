//! JSON message types for WCP requests and responses.

use crate::error::ErrorCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// WCP operation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    // Session management
    Hello,
    Auth,
    Ping,
    Bye,

    // Server info
    Info,

    // Workflow definition management
    CreateDefinition,
    GetDefinition,
    ListDefinitions,
    ListStates,
    ListActions,

    // Instance lifecycle
    StartInstance,
    GetInstance,
    ListInstances,

    // Transitions
    ExecuteAction,
}

/// Request message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Message type, always "request".
    #[serde(rename = "type")]
    pub msg_type: String,

    /// Unique request ID for correlation.
    pub id: String,

    /// Operation to perform.
    pub op: Operation,

    /// Operation-specific parameters.
    #[serde(default)]
    pub params: Value,
}

impl Request {
    pub fn new(id: impl Into<String>, op: Operation) -> Self {
        Self {
            msg_type: "request".to_string(),
            id: id.into(),
            op,
            params: Value::Object(Default::default()),
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }
}

/// Response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

/// Error details in a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseError {
    /// Stable error code.
    pub code: ErrorCode,

    /// Human-readable error message.
    pub message: String,

    /// Whether this error is retryable.
    pub retryable: bool,

    /// Additional error details.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, Value>,
}

impl ResponseError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            retryable: code.is_retryable(),
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Response metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMeta {
    /// Server timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_time: Option<DateTime<Utc>>,

    /// Additional metadata fields (for forward compatibility).
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Response message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Message type, always "response".
    #[serde(rename = "type")]
    pub msg_type: String,

    /// Request ID this response correlates to.
    pub id: String,

    /// Response status.
    pub status: ResponseStatus,

    /// Result payload (for successful responses).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error details (for error responses).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,

    /// Response metadata.
    #[serde(default, skip_serializing_if = "is_meta_empty")]
    pub meta: ResponseMeta,
}

fn is_meta_empty(meta: &ResponseMeta) -> bool {
    meta.server_time.is_none() && meta.extra.is_empty()
}

impl Response {
    pub fn ok(id: impl Into<String>, result: Value) -> Self {
        Self {
            msg_type: "response".to_string(),
            id: id.into(),
            status: ResponseStatus::Ok,
            result: Some(result),
            error: None,
            meta: ResponseMeta::default(),
        }
    }

    pub fn error(id: impl Into<String>, error: ResponseError) -> Self {
        Self {
            msg_type: "response".to_string(),
            id: id.into(),
            status: ResponseStatus::Error,
            result: None,
            error: Some(error),
            meta: ResponseMeta::default(),
        }
    }

    pub fn with_meta(mut self, meta: ResponseMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }

    pub fn is_error(&self) -> bool {
        self.status == ResponseStatus::Error
    }
}

// ============================================================================
// Operation-specific parameter types
// ============================================================================

/// Parameters for HELLO request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloParams {
    pub protocol_version: u16,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub wire_modes: Vec<String>,
}

/// Result for HELLO response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloResult {
    pub protocol_version: u16,
    pub wire_mode: String,
    pub server_name: String,
    pub server_version: String,
    pub auth_required: bool,
}

/// Parameters for AUTH request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthParams {
    pub method: String,
    pub token: String,
}

/// Parameters for CREATE_DEFINITION request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDefinitionParams {
    /// The workflow definition document (id, name, states, actions).
    pub definition: Value,
}

/// Result for CREATE_DEFINITION response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDefinitionResult {
    pub definition_id: String,
    pub checksum: String,
}

/// Parameters for GET_DEFINITION request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetDefinitionParams {
    pub definition_id: String,
}

/// Result for GET_DEFINITION response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetDefinitionResult {
    pub definition: Value,
    pub checksum: String,
}

/// Definition summary for list responses (excludes the full document).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinitionSummary {
    pub id: String,
    pub name: String,
    pub states: usize,
    pub actions: usize,
    pub checksum: String,
}

/// Result for LIST_DEFINITIONS response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListDefinitionsResult {
    pub items: Vec<DefinitionSummary>,
    pub count: usize,
}

/// Parameters for LIST_STATES request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListStatesParams {
    pub definition_id: String,
}

/// Result for LIST_STATES response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListStatesResult {
    pub definition_id: String,
    /// State objects in declaration order.
    pub states: Vec<Value>,
}

/// Parameters for LIST_ACTIONS request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListActionsParams {
    pub definition_id: String,
}

/// Result for LIST_ACTIONS response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListActionsResult {
    pub definition_id: String,
    /// Action objects in declaration order.
    pub actions: Vec<Value>,
}

/// Parameters for START_INSTANCE request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartInstanceParams {
    pub definition_id: String,
}

/// Result for START_INSTANCE response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartInstanceResult {
    pub instance_id: String,
    pub definition_id: String,
    pub current_state_id: String,
    pub created_at: DateTime<Utc>,
}

/// Parameters for GET_INSTANCE request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetInstanceParams {
    pub instance_id: String,
}

/// One committed transition in an instance's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntryInfo {
    pub action_id: String,
    pub from_state_id: String,
    pub to_state_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Result for GET_INSTANCE response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetInstanceResult {
    pub instance_id: String,
    pub definition_id: String,
    pub current_state_id: String,
    pub history: Vec<HistoryEntryInfo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for LIST_INSTANCES request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListInstancesParams {
    /// Filter by definition ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition_id: Option<String>,
    /// Filter by current state ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_state_id: Option<String>,
    /// Maximum number of instances to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Instance summary for list responses (excludes history for efficiency).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceSummary {
    pub id: String,
    pub definition_id: String,
    pub current_state_id: String,
    pub history_len: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result for LIST_INSTANCES response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListInstancesResult {
    pub items: Vec<InstanceSummary>,
    pub count: usize,
}

/// Parameters for EXECUTE_ACTION request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteActionParams {
    pub instance_id: String,
    pub action_id: String,
}

/// Result for EXECUTE_ACTION response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteActionResult {
    pub applied: bool,
    pub instance_id: String,
    pub action_id: String,
    pub from_state_id: String,
    pub to_state_id: String,
    pub timestamp: DateTime<Utc>,
}
