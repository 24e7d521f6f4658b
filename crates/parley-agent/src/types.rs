//! OpenAI-format message and tool types shared across the agent.

use serde::{Deserialize, Serialize};

/// One transcript entry in OpenAI chat format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn with_role(role: &str, content: Option<String>) -> Self {
        Self {
            role: role.to_string(),
            content,
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn system(content: &str) -> Self {
        Self::with_role("system", Some(content.to_string()))
    }

    pub fn user(content: &str) -> Self {
        Self::with_role("user", Some(content.to_string()))
    }

    pub fn assistant(content: &str) -> Self {
        Self::with_role("assistant", Some(content.to_string()))
    }

    pub fn assistant_with_tool_calls(content: Option<&str>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: Some(tool_calls),
            ..Self::with_role("assistant", content.map(str::to_string))
        }
    }

    pub fn tool_result(tool_call_id: &str, content: &str) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.to_string()),
            ..Self::with_role("tool", Some(content.to_string()))
        }
    }

    pub fn is_system(&self) -> bool {
        self.role == "system"
    }
}

/// A tool call from the LLM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: FunctionCall,
}

impl ToolCall {
    pub fn function(id: &str, name: &str, arguments: &str) -> Self {
        Self {
            id: id.to_string(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }
    }
}

/// Function call details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

/// OpenAI-compatible tool definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDef,
}

/// Function definition within a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    pub fn function(name: &str, description: &str, parameters: serde_json::Value) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDef {
                name: name.to_string(),
                description: description.to_string(),
                parameters,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assistant_with_tool_calls_shape() {
        let msg = ChatMessage::assistant_with_tool_calls(
            None,
            vec![ToolCall::function("c1", "search", r#"{"q":"cats"}"#)],
        );
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "role": "assistant",
                "tool_calls": [{
                    "id": "c1",
                    "type": "function",
                    "function": {"name": "search", "arguments": "{\"q\":\"cats\"}"}
                }]
            })
        );
    }

    #[test]
    fn tool_result_shape() {
        let msg = ChatMessage::tool_result("c1", "\"ok\"");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"role": "tool", "content": "\"ok\"", "tool_call_id": "c1"})
        );
    }
}
