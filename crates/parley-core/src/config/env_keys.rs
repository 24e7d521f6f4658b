//! 环境变量 key 常量与别名定义
//!
//! 主变量优先使用 `PARLEY_*`，兼容 `OPENAI_*`。

/// LLM API 配置
pub mod llm {
    /// API Base（主变量优先）
    pub const API_BASE: &str = "PARLEY_API_BASE";
    pub const API_BASE_ALIASES: &[&str] = &["OPENAI_API_BASE", "OPENAI_BASE_URL", "AZURE_OPENAI_ENDPOINT"];

    /// API Key
    pub const API_KEY: &str = "PARLEY_API_KEY";
    pub const API_KEY_ALIASES: &[&str] = &["OPENAI_API_KEY", "AZURE_OPENAI_API_KEY"];

    /// Model（Azure 下为 deployment 名）
    pub const MODEL: &str = "PARLEY_MODEL";
    pub const MODEL_ALIASES: &[&str] = &["OPENAI_API_MODAL", "OPENAI_MODEL"];

    /// `OPENAI` 或 `AZURE_OPENAI`
    pub const API_TYPE: &str = "PARLEY_API_TYPE";
    pub const API_TYPE_ALIASES: &[&str] = &["OPENAI_API_TYPE"];

    pub const AZURE_API_VERSION: &str = "PARLEY_AZURE_API_VERSION";
    pub const AZURE_API_VERSION_ALIASES: &[&str] = &["OPENAI_API_VERSION"];

    /// 是否使用 SSE 流式输出
    pub const STREAM: &str = "PARLEY_STREAM";
}

/// 响应渲染
pub mod response {
    /// 增量编辑的最小间隔（毫秒）
    pub const RENDER_INTERVAL_MS: &str = "PARLEY_RENDER_INTERVAL_MS";

    /// 单条消息的字符上限
    pub const MESSAGE_LIMIT: &str = "PARLEY_MESSAGE_LIMIT";

    /// 指示表情前缀：`EMOJI_TYPING`、`EMOJI_LOADING` 等
    pub const EMOJI_PREFIX: &str = "EMOJI_";
}

/// 工具循环
pub mod orchestrator {
    /// 单次回复中最多的工具轮次，0 表示不限
    pub const MAX_TOOL_TURNS: &str = "PARLEY_MAX_TOOL_TURNS";

    /// 拼接进对话的历史消息条数
    pub const HISTORY_LIMIT: &str = "PARLEY_HISTORY_LIMIT";
}

/// 远程工具主机
pub mod remote {
    /// `MCP_<NAME>=<url>`，NAME 会被转为小写作为主机 id
    pub const HOST_PREFIX: &str = "MCP_";
}

/// 可观测性与日志
pub mod observability {
    pub const PARLEY_QUIET: &str = "PARLEY_QUIET";
    pub const QUIET_ALIASES: &[&str] = &["QUIET"];

    pub const PARLEY_LOG_LEVEL: &str = "PARLEY_LOG_LEVEL";
    pub const LOG_LEVEL_ALIASES: &[&str] = &["LOG_LEVEL"];

    pub const PARLEY_LOG_JSON: &str = "PARLEY_LOG_JSON";
    pub const LOG_JSON_ALIASES: &[&str] = &["LOG_JSON"];
}

/// 本地工具（未配置则不注册对应工具）
pub mod tools {
    /// Google Custom Search：`search` 工具
    pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
    pub const GOOGLE_CX_ID: &str = "GOOGLE_CX_ID";

    /// Hugging Face 推理：`generate_image` 工具
    pub const HUGGINGFACE_TOKEN: &str = "HUGGINGFACE_TOKEN";
    pub const HUGGINGFACE_MODEL: &str = "HUGGINGFACE_MODEL";
}
