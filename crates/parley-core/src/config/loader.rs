//! 统一环境变量加载逻辑
//!
//! 集中维护 fallback 链，避免在业务代码中重复 `or_else` 调用。

use std::env;
use std::path::Path;
use std::str::FromStr;

use crate::error::ConfigError;

/// 加载当前目录下的 `.env` 到环境变量（不覆盖已存在的变量）
pub fn load_dotenv() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let dir = env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
        let applied = load_dotenv_from_dir(&dir);
        if applied > 0 {
            tracing::debug!(applied, dir = %dir.display(), "loaded .env");
        }
    });
}

/// 加载指定目录下的 `.env`，返回实际写入的变量数。
///
/// 文件不存在时静默返回 0。
pub fn load_dotenv_from_dir(dir: &Path) -> usize {
    let Ok(content) = std::fs::read_to_string(dir.join(".env")) else {
        return 0;
    };
    let mut applied = 0;
    for (key, value) in parse_dotenv(&content) {
        if env::var(&key).is_err() {
            env::set_var(&key, value);
            applied += 1;
        }
    }
    applied
}

/// 解析 `.env` 内容为 (key, value) 列表
fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some(eq_pos) = line.find('=') else {
            continue;
        };
        let key = line[..eq_pos].trim();
        let mut value = line[eq_pos + 1..].trim();
        // Strip inline comment (# not inside quotes)
        if let Some(hash_pos) = value.find('#') {
            let before_hash = value[..hash_pos].trim_end();
            if !before_hash.contains('"') && !before_hash.contains('\'') {
                value = before_hash;
            }
        }
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            value = &value[1..value.len() - 1];
        }
        if !key.is_empty() {
            pairs.push((key.to_string(), value.to_string()));
        }
    }
    pairs
}

fn lookup(primary: &str, aliases: &[&str]) -> Option<String> {
    env::var(primary)
        .ok()
        .or_else(|| aliases.iter().find_map(|a| env::var(a).ok()))
}

/// 从主变量或别名链读取环境变量，失败时使用默认值
pub fn env_or<F>(primary: &str, aliases: &[&str], default: F) -> String
where
    F: FnOnce() -> String,
{
    lookup(primary, aliases)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(default)
}

/// 从主变量或别名链读取，返回 Option（空值视为未设置）
pub fn env_optional(primary: &str, aliases: &[&str]) -> Option<String> {
    lookup(primary, aliases).and_then(|s| {
        let s = s.trim().to_string();
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    })
}

/// 解析布尔型环境变量：0/false/no/off 为 false，其余非空值为 true
pub fn env_bool(primary: &str, aliases: &[&str], default: bool) -> bool {
    match lookup(primary, aliases).as_deref() {
        Some(s) => !matches!(
            s.trim().to_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        ),
        None => default,
    }
}

/// 解析数值等 `FromStr` 类型；未设置时返回默认值，格式错误返回 [`ConfigError::InvalidValue`]
pub fn env_parse<T: FromStr>(primary: &str, aliases: &[&str], default: T) -> Result<T, ConfigError> {
    match env_optional(primary, aliases) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: primary.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}
