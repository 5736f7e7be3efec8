use crate::channel::Transport;
use crate::error::Result;
use async_trait::async_trait;
use cortex_qc_protocol::{Message, Operation, Reply, ToolGroup};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Mutex;

#[derive(Default)]
struct FakeState {
    calls: Vec<(String, Value)>,
    list_calls: usize,
    saved: BTreeSet<(String, String)>,
}

/// In-memory stand-in for the tool server, answering each batch the way the
/// real one does over stdio.
pub(crate) struct FakeServer {
    tools: Vec<String>,
    overview: String,
    slice: String,
    failing: Vec<String>,
    forget_saves: bool,
    state: Mutex<FakeState>,
}

impl FakeServer {
    pub(crate) fn new() -> Self {
        Self {
            tools: ToolGroup::REQUIRED
                .iter()
                .map(|g| g.name().to_string())
                .collect(),
            overview: "src/   (1 files)\n  lib.rs\n    [fn      ] run\n".to_string(),
            slice: "pub fn run() {}\n".to_string(),
            failing: Vec::new(),
            forget_saves: false,
            state: Mutex::new(FakeState::default()),
        }
    }

    pub(crate) fn with_tools(mut self, tools: &[&str]) -> Self {
        self.tools = tools.iter().map(|t| t.to_string()).collect();
        self
    }

    pub(crate) fn with_overview(mut self, text: &str) -> Self {
        self.overview = text.to_string();
        self
    }

    pub(crate) fn with_slice(mut self, text: &str) -> Self {
        self.slice = text.to_string();
        self
    }

    /// Every call to `action` (or tool name, for actionless tools) reports isError.
    pub(crate) fn failing(mut self, action: &str) -> Self {
        self.failing.push(action.to_string());
        self
    }

    /// Saves report success but store nothing.
    pub(crate) fn forgetting_saves(mut self) -> Self {
        self.forget_saves = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<(String, Value)> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Action of each tools/call, or the tool name when it has none.
    pub(crate) fn actions(&self) -> Vec<&'static str> {
        self.calls()
            .iter()
            .filter_map(|(name, args)| match args.get("action").and_then(Value::as_str) {
                Some(action) => Operation::from_action(action).and_then(Operation::action),
                None => ToolGroup::REQUIRED
                    .iter()
                    .find(|g| g.name() == name)
                    .map(|g| g.name()),
            })
            .collect()
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    pub(crate) fn saved_tags(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.saved.iter().map(|(_, tag)| tag.clone()).collect()
    }

    fn respond(&self, name: &str, args: &Value) -> (bool, String) {
        let action = args.get("action").and_then(Value::as_str).unwrap_or(name);
        if self.failing.iter().any(|f| f == action) {
            return (true, format!("{action} failed"));
        }
        let arg = |key: &str| args.get(key).and_then(Value::as_str).unwrap_or_default();
        let mut state = self.state.lock().unwrap();

        match action {
            "map_overview" => (false, self.overview.clone()),
            "deep_slice" => (false, self.slice.clone()),
            "read_source" => (false, format!("source of {}", arg("symbol_name"))),
            "find_usages" | "blast_radius" | "propagation_checklist" => {
                (false, format!("{action} for {}\n(no callers)", arg("symbol_name")))
            }
            "save_checkpoint" => {
                if !self.forget_saves {
                    let key = (arg("symbol_name").to_string(), arg("semantic_tag").to_string());
                    state.saved.insert(key);
                }
                (false, format!("saved {}", arg("semantic_tag")))
            }
            "list_checkpoints" => {
                let tags: Vec<&str> = state.saved.iter().map(|(_, t)| t.as_str()).collect();
                (false, tags.join("\n"))
            }
            "compare_checkpoint" => {
                let symbol = arg("symbol_name").to_string();
                for tag in [arg("tag_a"), arg("tag_b")] {
                    if !state.saved.contains(&(symbol.clone(), tag.to_string())) {
                        return (true, format!("No checkpoint found for tag '{tag}'"));
                    }
                }
                (false, "no structural changes".to_string())
            }
            "delete_checkpoint" => {
                let key = (arg("symbol_name").to_string(), arg("semantic_tag").to_string());
                if state.saved.remove(&key) {
                    (false, format!("deleted {}", key.1))
                } else {
                    (true, format!("checkpoint '{}' not found", key.1))
                }
            }
            "run_diagnostics" => (false, "0 errors, 0 warnings".to_string()),
            other => (true, format!("unknown action {other}")),
        }
    }
}

fn reply(id: i64, result: Value) -> Option<Reply> {
    Reply::parse_line(&json!({ "jsonrpc": "2.0", "id": id, "result": result }).to_string())
}

#[async_trait]
impl Transport for FakeServer {
    async fn exchange(&self, batch: &[Message]) -> Result<Vec<Reply>> {
        let mut replies = Vec::new();
        for message in batch {
            let params = message.params.clone().unwrap_or(Value::Null);
            match message.method.as_str() {
                "initialize" => replies.extend(reply(message.id, json!({ "capabilities": {} }))),
                "tools/list" => {
                    self.state.lock().unwrap().list_calls += 1;
                    let tools: Vec<Value> =
                        self.tools.iter().map(|t| json!({ "name": t })).collect();
                    replies.extend(reply(message.id, json!({ "tools": tools })));
                }
                "tools/call" => {
                    let name = params["name"].as_str().unwrap_or_default().to_string();
                    let args = params["arguments"].clone();
                    let (is_error, text) = self.respond(&name, &args);
                    self.state.lock().unwrap().calls.push((name, args));
                    replies.extend(reply(
                        message.id,
                        json!({
                            "isError": is_error,
                            "content": [{ "type": "text", "text": text }],
                        }),
                    ));
                }
                _ => {}
            }
        }
        Ok(replies)
    }
}
