use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

use crate::error::TrimError;
use crate::locale::Locale;
use crate::text::{DEFAULT_ALLOWED_TAGS, DEFAULT_NUM_CHARS, DEFAULT_NUM_WORDS};

pub const CONFIG_FILE: &str = "htmltrim.toml";

#[derive(Debug, Default, Deserialize)]
pub struct HtmltrimConfig {
    #[serde(default)]
    pub trim: TrimConfig,
    #[serde(default)]
    pub locale: Locale,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub plugins: PluginConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrimConfig {
    #[serde(default = "default_num_words")]
    pub num_words: usize,
    #[serde(default = "default_num_chars")]
    pub num_chars: usize,
    /// 覆盖默认续写标记；空字符串表示不追加
    #[serde(default)]
    pub more: Option<String>,
    #[serde(default = "default_allowed_tags")]
    pub allowed_tags: String,
}

#[derive(Debug, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PluginConfig {
    #[serde(default)]
    pub enabled: Vec<String>,
}

impl HtmltrimConfig {
    /// 读取项目根目录下的 htmltrim.toml，文件不存在时使用默认配置
    pub fn load(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("读取 {CONFIG_FILE} 失败：{}", e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config = toml::from_str(content)
            .map_err(|e| TrimError::Config(format!("解析 {CONFIG_FILE} 失败：{e}")))?;
        Ok(config)
    }
}

// 默认值函数
fn default_num_words() -> usize { DEFAULT_NUM_WORDS }
fn default_num_chars() -> usize { DEFAULT_NUM_CHARS }
fn default_allowed_tags() -> String { DEFAULT_ALLOWED_TAGS.into() }
fn default_log_level() -> String { "info".into() }

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            num_words: default_num_words(),
            num_chars: default_num_chars(),
            more: None,
            allowed_tags: default_allowed_tags(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
