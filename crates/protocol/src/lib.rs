use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub mod catalogue;

pub use catalogue::{Operation, OperationCall, ToolGroup};

pub const JSONRPC_VERSION: &str = "2.0";
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// One JSON-RPC request written to the tool server, one per line.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Message {
    pub jsonrpc: String,
    pub id: i64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Message {
    pub fn new(id: i64, method: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params: None,
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    pub fn initialize(id: i64) -> Self {
        Self::new(id, "initialize").with_params(json!({ "protocolVersion": MCP_PROTOCOL_VERSION }))
    }

    pub fn initialized(id: i64) -> Self {
        Self::new(id, "initialized").with_params(json!({}))
    }

    pub fn tools_list(id: i64) -> Self {
        Self::new(id, "tools/list")
    }

    pub fn tools_call(id: i64, name: &str, arguments: Value) -> Self {
        Self::new(id, "tools/call").with_params(json!({ "name": name, "arguments": arguments }))
    }

    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RpcError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A server reply correlated to a request by `id`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Reply {
    pub id: i64,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
    #[serde(skip)]
    pub raw: Value,
}

impl Reply {
    /// Parses one stdout line. Anything that is not a JSON object with a
    /// numeric `id` yields `None`.
    pub fn parse_line(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        let raw: Value = serde_json::from_str(trimmed).ok()?;
        if !raw.is_object() {
            return None;
        }
        let mut reply: Reply = serde_json::from_value(raw.clone()).ok()?;
        reply.raw = raw;
        Some(reply)
    }

    /// Tool names advertised by a `tools/list` reply.
    pub fn tool_names(&self) -> Vec<String> {
        self.result
            .as_ref()
            .and_then(|r| r.get("tools"))
            .and_then(Value::as_array)
            .map(|tools| {
                tools
                    .iter()
                    .filter(|t| t.is_object())
                    .map(|t| {
                        t.get("name")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string()
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallResult {
    pub is_error: bool,
    pub text: String,
    pub raw: Value,
}

impl ToolCallResult {
    pub fn from_reply(reply: &Reply) -> Self {
        if let Some(err) = &reply.error {
            let text = if err.message.is_empty() {
                format!("JSON-RPC error {}", err.code)
            } else {
                err.message.clone()
            };
            return Self {
                is_error: true,
                text,
                raw: reply.raw.clone(),
            };
        }

        let result = reply.result.as_ref();
        let is_error = result
            .and_then(|r| r.get("isError"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let text = result
            .and_then(|r| r.get("content"))
            .and_then(Value::as_array)
            .and_then(|items| items.first())
            .and_then(|first| first.get("text"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Self {
            is_error,
            text,
            raw: reply.raw.clone(),
        }
    }

    /// Synthetic failure used when no reply carried the call id.
    pub fn missing_reply(name: &str, replies: &[Reply]) -> Self {
        Self {
            is_error: true,
            text: format!("PARSE_ERROR: no tools/call reply for {name}"),
            raw: json!({ "replies": replies.iter().map(|r| r.raw.clone()).collect::<Vec<_>>() }),
        }
    }

    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }
}
