//! 按领域分组的配置结构体
//!
//! 从环境变量加载，统一 fallback 逻辑。

use std::collections::BTreeMap;
use std::time::Duration;

use super::env_keys::{llm, observability as obv_keys, orchestrator, remote, response, tools};
use super::loader::{env_bool, env_optional, env_or, env_parse};
use crate::error::ConfigError;

/// Chat completions API 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiKind {
    #[default]
    OpenAi,
    Azure,
}

impl ApiKind {
    /// `AZURE_OPENAI`（或 `azure`）为 Azure，其余为 OpenAI 兼容
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "AZURE_OPENAI" | "AZURE" => ApiKind::Azure,
            _ => ApiKind::OpenAi,
        }
    }
}

/// LLM API 配置
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub kind: ApiKind,
    pub api_base: String,
    pub api_key: String,
    /// Azure 下为 deployment 名
    pub model: String,
    pub azure_api_version: String,
    pub stream: bool,
}

impl LlmConfig {
    /// 从环境变量加载，空值使用默认（会自动加载 .env）
    pub fn from_env() -> Self {
        super::loader::load_dotenv();
        let kind = env_optional(llm::API_TYPE, llm::API_TYPE_ALIASES)
            .map(|s| ApiKind::parse(&s))
            .unwrap_or_default();
        Self {
            kind,
            api_base: env_or(llm::API_BASE, llm::API_BASE_ALIASES, || {
                "https://api.openai.com/v1".to_string()
            }),
            api_key: env_or(llm::API_KEY, llm::API_KEY_ALIASES, String::new),
            model: env_or(llm::MODEL, llm::MODEL_ALIASES, || "gpt-4o".to_string()),
            azure_api_version: env_or(
                llm::AZURE_API_VERSION,
                llm::AZURE_API_VERSION_ALIASES,
                || "2024-10-21".to_string(),
            ),
            stream: env_bool(llm::STREAM, &[], true),
        }
    }

    /// 从环境变量加载，若 api_key 为空则返回 [`ConfigError::Missing`]
    pub fn try_from_env() -> Result<Self, ConfigError> {
        let cfg = Self::from_env();
        if cfg.api_key.trim().is_empty() {
            return Err(ConfigError::Missing(llm::API_KEY));
        }
        Ok(cfg)
    }
}

/// 状态指示表情（`EMOJI_<NAME>`，NAME 小写）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Indicators {
    entries: BTreeMap<String, String>,
}

impl Indicators {
    const DEFAULT_TYPING: &'static str = "✏️";
    const DEFAULT_LOADING: &'static str = "⏳";

    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let entries = vars
            .into_iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(response::EMOJI_PREFIX)
                    .filter(|name| !name.is_empty())
                    .map(|name| (name.to_lowercase(), v))
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// 流式输出时追加在末尾的"正在输入"标记
    pub fn typing(&self) -> &str {
        self.get("typing").unwrap_or(Self::DEFAULT_TYPING)
    }

    /// `set_status` 前缀
    pub fn loading(&self) -> &str {
        self.get("loading").unwrap_or(Self::DEFAULT_LOADING)
    }
}

/// 响应渲染配置
#[derive(Debug, Clone)]
pub struct ResponseConfig {
    /// 两次增量编辑之间的最小间隔
    pub render_interval: Duration,
    /// 可见消息的字符上限，超出部分以 `response.md` 附件形式发送
    pub message_limit: usize,
    pub indicators: Indicators,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            render_interval: Duration::from_millis(3000),
            message_limit: 2000,
            indicators: Indicators::default(),
        }
    }
}

impl ResponseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        super::loader::load_dotenv();
        let defaults = Self::default();
        let interval_ms = env_parse(
            response::RENDER_INTERVAL_MS,
            &[],
            defaults.render_interval.as_millis() as u64,
        )?;
        Ok(Self {
            render_interval: Duration::from_millis(interval_ms),
            message_limit: env_parse(response::MESSAGE_LIMIT, &[], defaults.message_limit)?,
            indicators: Indicators::from_vars(std::env::vars()),
        })
    }
}

/// 工具循环配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// `None` 表示不限轮次
    pub max_tool_turns: Option<usize>,
    /// 拼接进对话的历史消息条数
    pub history_limit: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_tool_turns: Some(25),
            history_limit: 10,
        }
    }
}

impl OrchestratorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        super::loader::load_dotenv();
        let defaults = Self::default();
        let turns: usize = env_parse(orchestrator::MAX_TOOL_TURNS, &[], 25)?;
        Ok(Self {
            max_tool_turns: (turns > 0).then_some(turns),
            history_limit: env_parse(orchestrator::HISTORY_LIMIT, &[], defaults.history_limit)?,
        })
    }
}

/// 单个远程工具主机
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteHost {
    /// 小写主机 id
    pub name: String,
    pub url: String,
}

/// 远程工具主机表（`MCP_<NAME>=<url>`）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteHostsConfig {
    pub hosts: Vec<RemoteHost>,
}

impl RemoteHostsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        super::loader::load_dotenv();
        Self::from_vars(std::env::vars())
    }

    /// 从任意 (key, value) 序列构建；主机按名称排序，重名返回 [`ConfigError::DuplicateHost`]
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut hosts: Vec<RemoteHost> = Vec::new();
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(remote::HOST_PREFIX) else {
                continue;
            };
            let url = value.trim();
            if name.is_empty() || url.is_empty() {
                continue;
            }
            let name = name.to_lowercase();
            if hosts.iter().any(|h| h.name == name) {
                return Err(ConfigError::DuplicateHost(name));
            }
            hosts.push(RemoteHost {
                name,
                url: url.to_string(),
            });
        }
        hosts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Self { hosts })
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

/// Google Custom Search 配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    pub api_key: String,
    pub cx_id: String,
    pub endpoint: String,
}

impl SearchConfig {
    pub const DEFAULT_ENDPOINT: &'static str = "https://www.googleapis.com/customsearch/v1";
}

/// Hugging Face 文生图配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageGenConfig {
    pub token: String,
    pub model: String,
    /// 模型路径前缀，完整 URL 为 `{endpoint}/{model}`
    pub endpoint: String,
}

impl ImageGenConfig {
    pub const DEFAULT_ENDPOINT: &'static str = "https://router.huggingface.co/hf-inference/models";
}

/// 本地工具配置；缺少凭据的工具为 `None`，不会注册
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolsConfig {
    pub search: Option<SearchConfig>,
    pub image_gen: Option<ImageGenConfig>,
}

impl ToolsConfig {
    pub fn from_env() -> Self {
        super::loader::load_dotenv();
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: BTreeMap<String, String> = vars
            .into_iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(k, v)| (k, v.trim().to_string()))
            .collect();
        let get = |key: &str| vars.get(key).cloned();

        let search = match (get(tools::GOOGLE_API_KEY), get(tools::GOOGLE_CX_ID)) {
            (Some(api_key), Some(cx_id)) => Some(SearchConfig {
                api_key,
                cx_id,
                endpoint: SearchConfig::DEFAULT_ENDPOINT.to_string(),
            }),
            _ => None,
        };
        let image_gen = match (get(tools::HUGGINGFACE_TOKEN), get(tools::HUGGINGFACE_MODEL)) {
            (Some(token), Some(model)) => Some(ImageGenConfig {
                token,
                model,
                endpoint: ImageGenConfig::DEFAULT_ENDPOINT.to_string(),
            }),
            _ => None,
        };
        Self { search, image_gen }
    }
}

/// 可观测性配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| {
            super::loader::load_dotenv();
            Self {
                quiet: env_bool(obv_keys::PARLEY_QUIET, obv_keys::QUIET_ALIASES, false),
                log_level: env_or(
                    obv_keys::PARLEY_LOG_LEVEL,
                    obv_keys::LOG_LEVEL_ALIASES,
                    || "parley=info".to_string(),
                ),
                log_json: env_bool(obv_keys::PARLEY_LOG_JSON, obv_keys::LOG_JSON_ALIASES, false),
            }
        })
    }
}
