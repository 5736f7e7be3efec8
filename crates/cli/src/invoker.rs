use crate::channel::Transport;
use crate::error::Result;
use cortex_qc_protocol::{Message, OperationCall, Reply, ToolCallResult};
use serde_json::Value;
use std::time::Instant;

const LIST_ID: i64 = 2;
const CALL_ID: i64 = 3;

/// Wraps each tool call in its own handshake and correlates the reply.
pub struct ToolInvoker<T> {
    transport: T,
}

impl<T: Transport> ToolInvoker<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Names advertised by `tools/list`; empty when the server never answered.
    pub async fn list_tools(&self) -> Result<Vec<String>> {
        let batch = [Message::initialize(1), Message::tools_list(LIST_ID)];
        let replies = self.transport.exchange(&batch).await?;
        Ok(replies
            .iter()
            .find(|r| r.id == LIST_ID)
            .map(Reply::tool_names)
            .unwrap_or_default())
    }

    /// Only transport failures are `Err`; a missing or failed reply comes back
    /// as an error [`ToolCallResult`].
    pub async fn call(&self, name: &str, arguments: Value) -> Result<ToolCallResult> {
        let batch = [
            Message::initialize(1),
            Message::initialized(2),
            Message::tools_call(CALL_ID, name, arguments),
        ];
        let started = Instant::now();
        let replies = self.transport.exchange(&batch).await?;
        log::debug!("{name} answered in {:?}", started.elapsed());

        // Last reply wins if the server repeats an id.
        let result = match replies.iter().rev().find(|r| r.id == CALL_ID) {
            Some(reply) => ToolCallResult::from_reply(reply),
            None => {
                log::warn!("no tools/call reply for {name} among {} replies", replies.len());
                ToolCallResult::missing_reply(name, &replies)
            }
        };
        Ok(result)
    }

    pub async fn invoke(&self, call: &OperationCall) -> Result<ToolCallResult> {
        self.call(call.tool_name(), call.arguments.clone()).await
    }
}
