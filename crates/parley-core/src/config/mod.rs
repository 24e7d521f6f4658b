//! Parley 统一配置层
//!
//! 所有环境变量读取集中在此模块，业务代码通过结构化配置访问，避免直接 `std::env::var`。
//!
//! - `loader`：env_or、env_optional、env_bool、env_parse 等辅助函数
//! - `schema`：LlmConfig、ResponseConfig、OrchestratorConfig、RemoteHostsConfig、ToolsConfig、ObservabilityConfig
//! - `env_keys`：key 常量（含 OPENAI_* 兼容别名）

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{env_bool, env_optional, env_or, env_parse, load_dotenv, load_dotenv_from_dir};
pub use schema::{
    ApiKind, ImageGenConfig, Indicators, LlmConfig, ObservabilityConfig, OrchestratorConfig,
    RemoteHost, RemoteHostsConfig, ResponseConfig, SearchConfig, ToolsConfig,
};
