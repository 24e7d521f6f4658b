//! Tool-call accumulation for one model turn.

use crate::llm::ToolCallDelta;
use crate::types::ToolCall;

/// Collects streamed tool-call fragments into complete calls, in arrival order.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    calls: Vec<ToolCall>,
}

impl ToolCallAccumulator {
    pub fn push(&mut self, delta: ToolCallDelta) {
        match delta.id {
            Some(id) => self.calls.push(ToolCall::function(
                &id,
                delta.name.as_deref().unwrap_or_default(),
                &delta.arguments,
            )),
            None => match self.calls.last_mut() {
                Some(last) => {
                    if let Some(name) = delta.name {
                        if last.function.name.is_empty() {
                            last.function.name = name;
                        }
                    }
                    last.function.arguments.push_str(&delta.arguments);
                }
                None => {
                    tracing::warn!(
                        fragment = %delta.arguments,
                        "tool-call fragment without id before any call; ignored"
                    );
                }
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn into_calls(self) -> Vec<ToolCall> {
        self.calls
    }
}
