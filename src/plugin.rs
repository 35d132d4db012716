use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// plugin.toml 结构
#[derive(Debug, Deserialize)]
pub struct PluginToml {
    pub plugin: PluginMeta,
}

/// [plugin] 元数据
#[derive(Debug, Deserialize)]
pub struct PluginMeta {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
}

/// 已加载插件的运行时信息
#[derive(Debug, Clone)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

pub fn load_plugin_info(toml_path: &Path) -> Result<PluginInfo> {
    let content = std::fs::read_to_string(toml_path)
        .with_context(|| format!("读取 {} 失败", toml_path.display()))?;
    let parsed: PluginToml = toml::from_str(&content)
        .with_context(|| format!("解析 {} 失败", toml_path.display()))?;

    Ok(PluginInfo {
        name: parsed.plugin.name,
        version: parsed.plugin.version,
        description: parsed.plugin.description,
    })
}
