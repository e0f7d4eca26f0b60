//! Command handlers.

use crate::auth::TokenValidator;
use crate::config::AuthConfig;
use crate::error::ServerError;
use crate::server::ServerStats;
use crate::session::{Session, SessionState, WireMode};
use flowd_core::WorkflowEngine;
use flowd_protocol::message::*;
use flowd_protocol::ErrorCode;
use flowd_protocol::{MAX_PAYLOAD_SIZE, PROTOCOL_VERSION};
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Server identity and limits.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub max_frame_bytes: u32,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: "flowd".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            max_frame_bytes: MAX_PAYLOAD_SIZE,
        }
    }
}

/// Command handler.
pub struct CommandHandler {
    engine: Arc<WorkflowEngine>,
    info: ServerInfo,
    /// Token validator for authentication.
    token_validator: Option<TokenValidator>,
    /// Whether authentication is required.
    auth_required: bool,
    /// Server counters, surfaced via INFO.
    stats: Option<Arc<ServerStats>>,
}

impl CommandHandler {
    /// Creates a new command handler.
    pub fn new(engine: Arc<WorkflowEngine>) -> Self {
        Self {
            engine,
            info: ServerInfo::default(),
            token_validator: None,
            auth_required: false,
            stats: None,
        }
    }

    /// Creates a new command handler with authentication.
    pub fn with_auth(engine: Arc<WorkflowEngine>, auth_config: &AuthConfig) -> Self {
        Self {
            engine,
            info: ServerInfo::default(),
            token_validator: TokenValidator::from_config(auth_config),
            auth_required: auth_config.required,
            stats: None,
        }
    }

    /// Creates a new command handler with custom server info.
    pub fn with_info(engine: Arc<WorkflowEngine>, info: ServerInfo) -> Self {
        Self {
            engine,
            info,
            token_validator: None,
            auth_required: false,
            stats: None,
        }
    }

    /// Attaches server counters so INFO can report them.
    pub fn with_stats(mut self, stats: Arc<ServerStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Returns whether authentication is required for an operation.
    fn requires_auth(&self, op: &Operation) -> bool {
        if !self.auth_required {
            return false;
        }
        // Commands that do NOT require auth (even when auth_required=true)
        !matches!(
            op,
            Operation::Hello |   // Must complete handshake
            Operation::Auth |    // Must be able to authenticate
            Operation::Ping |    // Health checks should work
            Operation::Bye // Graceful disconnect
        )
    }

    /// Handles a request and returns a response.
    pub fn handle(&self, session: &mut Session, request: &Request) -> Response {
        session.record_request();

        if let Some(ref stats) = self.stats {
            stats.requests_total.fetch_add(1, Ordering::Relaxed);
        }

        // AUTH ENFORCEMENT: check if the command requires authentication
        if self.requires_auth(&request.op) && !session.is_authenticated() {
            if let Some(ref stats) = self.stats {
                stats.errors_total.fetch_add(1, Ordering::Relaxed);
            }
            return Response::error(
                &request.id,
                ResponseError::new(
                    ErrorCode::Unauthorized,
                    "authentication required".to_string(),
                ),
            );
        }

        let result = match request.op {
            Operation::Hello => self.handle_hello(session, &request.params),
            Operation::Auth => self.handle_auth(session, &request.params),
            Operation::Ping => self.handle_ping(),
            Operation::Bye => self.handle_bye(session),
            Operation::Info => self.handle_info(),
            Operation::CreateDefinition => self.handle_create_definition(&request.params),
            Operation::GetDefinition => self.handle_get_definition(&request.params),
            Operation::ListDefinitions => self.handle_list_definitions(),
            Operation::ListStates => self.handle_list_states(&request.params),
            Operation::ListActions => self.handle_list_actions(&request.params),
            Operation::StartInstance => self.handle_start_instance(&request.params),
            Operation::GetInstance => self.handle_get_instance(&request.params),
            Operation::ListInstances => self.handle_list_instances(&request.params),
            Operation::ExecuteAction => self.handle_execute_action(&request.params),
        };

        match result {
            Ok(value) => Response::ok(&request.id, value),
            Err(e) => {
                if let Some(ref stats) = self.stats {
                    stats.errors_total.fetch_add(1, Ordering::Relaxed);
                }
                Response::error(
                    &request.id,
                    ResponseError::new(e.error_code(), e.to_string()),
                )
            }
        }
    }

    fn handle_hello(&self, session: &mut Session, params: &Value) -> Result<Value, ServerError> {
        let hello: HelloParams = serde_json::from_value(params.clone())
            .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;

        // Check protocol version
        if hello.protocol_version != PROTOCOL_VERSION {
            return Err(ServerError::UnsupportedProtocol(hello.protocol_version));
        }

        // Negotiate wire mode
        let wire_mode = if hello.wire_modes.contains(&"binary_json".to_string()) {
            WireMode::BinaryJson
        } else if hello.wire_modes.contains(&"jsonl".to_string()) {
            WireMode::Jsonl
        } else {
            WireMode::BinaryJson
        };

        session.complete_handshake(hello.protocol_version, wire_mode, hello.client_name);

        let result = HelloResult {
            protocol_version: PROTOCOL_VERSION,
            wire_mode: match wire_mode {
                WireMode::BinaryJson => "binary_json".to_string(),
                WireMode::Jsonl => "jsonl".to_string(),
            },
            server_name: self.info.name.clone(),
            server_version: self.info.version.clone(),
            auth_required: self.auth_required,
        };

        Ok(serde_json::to_value(result)?)
    }

    fn handle_auth(&self, session: &mut Session, params: &Value) -> Result<Value, ServerError> {
        let auth: AuthParams = serde_json::from_value(params.clone())
            .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;

        // Validate method
        if auth.method != "bearer" {
            return Err(ServerError::AuthFailed(format!(
                "unsupported auth method: {}",
                auth.method
            )));
        }

        match self.token_validator {
            // No validator configured: auth is effectively open, accept any
            // non-empty token so clients can use one code path.
            None => {
                if auth.token.is_empty() {
                    return Err(ServerError::AuthFailed("empty token".to_string()));
                }
            }
            // Validate token against configured hashes
            Some(ref validator) => {
                if !validator.validate(&auth.token) {
                    return Err(ServerError::AuthFailed("invalid token".to_string()));
                }
            }
        }

        session.set_authenticated(true);
        session.set_state(SessionState::Authenticated);
        Ok(json!({"authenticated": true}))
    }

    fn handle_ping(&self) -> Result<Value, ServerError> {
        Ok(json!({"pong": true}))
    }

    fn handle_bye(&self, session: &mut Session) -> Result<Value, ServerError> {
        session.set_state(SessionState::Closing);
        Ok(json!({"goodbye": true}))
    }

    fn handle_info(&self) -> Result<Value, ServerError> {
        let mut info = json!({
            "server_name": self.info.name,
            "server_version": self.info.version,
            "protocol_version": PROTOCOL_VERSION,
            "max_frame_bytes": self.info.max_frame_bytes,
            "definitions": self.engine.definition_count(),
            "instances": self.engine.instance_count(),
        });

        if let Some(ref stats) = self.stats {
            info["uptime_secs"] = json!(stats.uptime().as_secs());
            info["connections_total"] = json!(stats.connections_total.load(Ordering::Relaxed));
            info["connections_active"] = json!(stats.connections_active.load(Ordering::Relaxed));
            info["requests_total"] = json!(stats.requests_total.load(Ordering::Relaxed));
        }

        Ok(info)
    }

    fn handle_create_definition(&self, params: &Value) -> Result<Value, ServerError> {
        let p: CreateDefinitionParams = serde_json::from_value(params.clone())
            .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;

        let definition = self.engine.add_definition(&p.definition)?;

        let result = CreateDefinitionResult {
            definition_id: definition.id.clone(),
            checksum: definition.checksum.clone(),
        };

        Ok(serde_json::to_value(result)?)
    }

    fn handle_get_definition(&self, params: &Value) -> Result<Value, ServerError> {
        let p: GetDefinitionParams = serde_json::from_value(params.clone())
            .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;

        let definition = self.engine.get_definition(&p.definition_id)?;

        let result = GetDefinitionResult {
            definition: definition.to_json(),
            checksum: definition.checksum.clone(),
        };

        Ok(serde_json::to_value(result)?)
    }

    fn handle_list_definitions(&self) -> Result<Value, ServerError> {
        let items: Vec<DefinitionSummary> = self
            .engine
            .list_definitions()
            .into_iter()
            .map(|d| DefinitionSummary {
                id: d.id.clone(),
                name: d.name.clone(),
                states: d.states.len(),
                actions: d.actions.len(),
                checksum: d.checksum.clone(),
            })
            .collect();

        let count = items.len();
        let result = ListDefinitionsResult { items, count };

        Ok(serde_json::to_value(result)?)
    }

    fn handle_list_states(&self, params: &Value) -> Result<Value, ServerError> {
        let p: ListStatesParams = serde_json::from_value(params.clone())
            .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;

        let states = self
            .engine
            .list_states(&p.definition_id)?
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;

        let result = ListStatesResult {
            definition_id: p.definition_id,
            states,
        };

        Ok(serde_json::to_value(result)?)
    }

    fn handle_list_actions(&self, params: &Value) -> Result<Value, ServerError> {
        let p: ListActionsParams = serde_json::from_value(params.clone())
            .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;

        let actions = self
            .engine
            .list_actions(&p.definition_id)?
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;

        let result = ListActionsResult {
            definition_id: p.definition_id,
            actions,
        };

        Ok(serde_json::to_value(result)?)
    }

    fn handle_start_instance(&self, params: &Value) -> Result<Value, ServerError> {
        let p: StartInstanceParams = serde_json::from_value(params.clone())
            .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;

        let instance = self.engine.start_instance(&p.definition_id)?;

        let result = StartInstanceResult {
            instance_id: instance.id,
            definition_id: instance.definition_id,
            current_state_id: instance.current_state_id,
            created_at: instance.created_at,
        };

        Ok(serde_json::to_value(result)?)
    }

    fn handle_get_instance(&self, params: &Value) -> Result<Value, ServerError> {
        let p: GetInstanceParams = serde_json::from_value(params.clone())
            .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;

        let instance = self.engine.get_instance(&p.instance_id)?;

        let history: Vec<HistoryEntryInfo> = instance
            .history
            .iter()
            .map(|entry| HistoryEntryInfo {
                action_id: entry.action_id.clone(),
                from_state_id: entry.from_state_id.clone(),
                to_state_id: entry.to_state_id.clone(),
                timestamp: entry.timestamp,
            })
            .collect();

        let result = GetInstanceResult {
            instance_id: instance.id,
            definition_id: instance.definition_id,
            current_state_id: instance.current_state_id,
            history,
            created_at: instance.created_at,
            updated_at: instance.updated_at,
        };

        Ok(serde_json::to_value(result)?)
    }

    fn handle_list_instances(&self, params: &Value) -> Result<Value, ServerError> {
        let p: ListInstancesParams = serde_json::from_value(params.clone())
            .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;

        // Apply filters
        let matched: Vec<_> = self
            .engine
            .list_instances()
            .into_iter()
            .filter(|i| {
                if let Some(ref definition_id) = p.definition_id {
                    if &i.definition_id != definition_id {
                        return false;
                    }
                }
                if let Some(ref state_id) = p.current_state_id {
                    if &i.current_state_id != state_id {
                        return false;
                    }
                }
                true
            })
            .collect();

        // `count` reports all matches even when `limit` truncates `items`.
        let count = matched.len();
        let limit = p.limit.map(|l| l as usize).unwrap_or(usize::MAX);

        let items: Vec<InstanceSummary> = matched
            .into_iter()
            .take(limit)
            .map(|i| InstanceSummary {
                id: i.id,
                definition_id: i.definition_id,
                current_state_id: i.current_state_id,
                history_len: i.history.len(),
                created_at: i.created_at,
                updated_at: i.updated_at,
            })
            .collect();

        let result = ListInstancesResult { items, count };

        Ok(serde_json::to_value(result)?)
    }

    fn handle_execute_action(&self, params: &Value) -> Result<Value, ServerError> {
        let p: ExecuteActionParams = serde_json::from_value(params.clone())
            .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;

        let outcome = self.engine.execute_action(&p.instance_id, &p.action_id)?;

        let result = ExecuteActionResult {
            applied: true,
            instance_id: outcome.instance_id,
            action_id: outcome.action_id,
            from_state_id: outcome.from_state_id,
            to_state_id: outcome.to_state_id,
            timestamp: outcome.timestamp,
        };

        Ok(serde_json::to_value(result)?)
    }
}
