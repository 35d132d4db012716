use anyhow::{Context, Result};
use mlua::{Lua, LuaOptions, StdLib};
use std::path::{Path, PathBuf};

use crate::hooks::{self, NoHooks, TextHooks, TrimContext};
use crate::locale::Locale;
use crate::lua::hooks::HookRegistry;
use crate::lua::sandbox;
use crate::plugin::{self, PluginInfo};
use crate::text::{self, DEFAULT_ALLOWED_TAGS, DEFAULT_NUM_WORDS};

/// 插件引擎：持有 Lua VM、filter 注册表和已加载的插件信息
pub struct PluginEngine {
    pub lua: Lua,
    pub hooks: HookRegistry,
    pub project_root: PathBuf,
    pub plugins: Vec<PluginInfo>,
}

impl PluginEngine {
    pub fn new(project_root: &Path, locale: &Locale) -> Result<Self> {
        let lua = Lua::new_with(StdLib::ALL_SAFE, LuaOptions::default())
            .map_err(|e| anyhow::anyhow!("Lua VM 初始化失败: {e}"))?;

        sandbox::apply(&lua, project_root)?;

        let engine = Self {
            lua,
            hooks: HookRegistry::new(),
            project_root: project_root.to_path_buf(),
            plugins: Vec::new(),
        };

        engine.register_core_api(locale)?;

        Ok(engine)
    }

    /// 注册全局 `htmltrim` 表，插件内的截断调用不再经过 filter
    fn register_core_api(&self, locale: &Locale) -> Result<()> {
        let lua = &self.lua;

        let api = lua
            .create_table()
            .map_err(|e| anyhow::anyhow!("创建 htmltrim table 失败: {e}"))?;

        // htmltrim.version()
        let version =
            concat!(env!("CARGO_PKG_VERSION"), "-", env!("HTMLTRIM_GIT_COMMIT")).to_string();
        api.set(
            "version",
            lua.create_function(move |_, ()| Ok(version.clone()))
                .map_err(|e| anyhow::anyhow!("{e}"))?,
        )
        .map_err(|e| anyhow::anyhow!("{e}"))?;

        // htmltrim.trim_words(text, num_words?, more?, allowed_tags?)
        // more 为 false 时不追加续写标记
        let locale = locale.clone();
        api.set(
            "trim_words",
            lua.create_function(
                move |_, args: (String, Option<i64>, Option<mlua::Value>, Option<String>)| {
                    let (text, num_words, more, allowed) = args;
                    let num_words = num_words.map_or(DEFAULT_NUM_WORDS, |n| {
                        crate::error::clamp_limit("num_words", n)
                    });
                    let more = lua_more(more)?;
                    let allowed = allowed.unwrap_or_else(|| DEFAULT_ALLOWED_TAGS.to_string());
                    Ok(text::truncate::trim_words(
                        &text,
                        num_words,
                        more.as_deref(),
                        &allowed,
                        &locale,
                        &NoHooks,
                    ))
                },
            )
            .map_err(|e| anyhow::anyhow!("{e}"))?,
        )
        .map_err(|e| anyhow::anyhow!("{e}"))?;

        // htmltrim.close_tags(html)
        api.set(
            "close_tags",
            lua.create_function(|_, html: String| Ok(text::close_tags(&html)))
                .map_err(|e| anyhow::anyhow!("{e}"))?,
        )
        .map_err(|e| anyhow::anyhow!("{e}"))?;

        // htmltrim.strip_tags(text, allowed?)，allowed 形如 "<p><a>"
        api.set(
            "strip_tags",
            lua.create_function(|_, (input, allowed): (String, Option<String>)| {
                Ok(text::strip_tags(&input, allowed.as_deref().unwrap_or("")))
            })
            .map_err(|e| anyhow::anyhow!("{e}"))?,
        )
        .map_err(|e| anyhow::anyhow!("{e}"))?;

        // htmltrim.remove_tags(text, {"script", "iframe"})
        api.set(
            "remove_tags",
            lua.create_function(|_, (input, tags): (String, Vec<String>)| {
                Ok(text::remove_tags(&input, &tags))
            })
            .map_err(|e| anyhow::anyhow!("{e}"))?,
        )
        .map_err(|e| anyhow::anyhow!("{e}"))?;

        // htmltrim.log(message)
        api.set(
            "log",
            lua.create_function(|_, message: String| {
                tracing::info!(target: "htmltrim::plugin", "{message}");
                Ok(())
            })
            .map_err(|e| anyhow::anyhow!("{e}"))?,
        )
        .map_err(|e| anyhow::anyhow!("{e}"))?;

        lua.globals()
            .set("htmltrim", api)
            .map_err(|e| anyhow::anyhow!("{e}"))?;

        Ok(())
    }

    /// 加载 `plugins/<name>/` 下已启用的插件
    pub fn load_plugins(&mut self, enabled_plugins: &[String]) -> Result<()> {
        let plugins_dir = self.project_root.join("plugins");
        if !plugins_dir.exists() {
            if !enabled_plugins.is_empty() {
                tracing::warn!("plugins/ 目录不存在，跳过 {} 个插件", enabled_plugins.len());
            }
            return Ok(());
        }

        for name in enabled_plugins {
            let plugin_dir = plugins_dir.join(name);
            let toml_path = plugin_dir.join("plugin.toml");
            if !toml_path.exists() {
                tracing::warn!("插件 {} 的 plugin.toml 不存在，跳过", name);
                continue;
            }

            let info = plugin::load_plugin_info(&toml_path)
                .with_context(|| format!("加载插件 {} 元数据失败", name))?;

            self.setup_plugin_api()?;

            let main_lua = plugin_dir.join("main.lua");
            if main_lua.exists() {
                let code = std::fs::read_to_string(&main_lua)
                    .with_context(|| format!("读取 {} main.lua 失败", name))?;
                self.lua
                    .load(&code)
                    .set_name(format!("plugins/{}/main.lua", name))
                    .exec()
                    .map_err(|e| anyhow::anyhow!("执行插件 {} 的 main.lua 失败: {}", name, e))?;
            }

            self.collect_pending_filters()?;

            tracing::info!("已加载插件: {} v{}", info.name, info.version);
            self.plugins.push(info);
        }

        Ok(())
    }

    /// 为插件创建 plugin.filter API，注册先暂存到 `_pending_filters`
    fn setup_plugin_api(&self) -> Result<()> {
        let lua = &self.lua;
        let globals = lua.globals();

        let pending = lua.create_table().map_err(|e| anyhow::anyhow!("{e}"))?;
        globals
            .set("_pending_filters", pending)
            .map_err(|e| anyhow::anyhow!("{e}"))?;

        let plugin_table = lua.create_table().map_err(|e| anyhow::anyhow!("{e}"))?;

        // plugin.filter(hook_name, priority, handler)
        plugin_table
            .set(
                "filter",
                lua.create_function(|lua, (hook, priority, func): (String, i32, mlua::Function)| {
                    let pending: mlua::Table = lua.globals().get("_pending_filters")?;
                    let entry = lua.create_table()?;
                    entry.set("hook", hook)?;
                    entry.set("priority", priority)?;
                    entry.set("func", func)?;
                    pending.push(entry)?;
                    Ok(())
                })
                .map_err(|e| anyhow::anyhow!("{e}"))?,
            )
            .map_err(|e| anyhow::anyhow!("{e}"))?;

        globals
            .set("plugin", plugin_table)
            .map_err(|e| anyhow::anyhow!("{e}"))?;

        Ok(())
    }

    fn collect_pending_filters(&mut self) -> Result<()> {
        let lua = &self.lua;
        let globals = lua.globals();

        let pending: mlua::Table = globals
            .get("_pending_filters")
            .map_err(|e| anyhow::anyhow!("{e}"))?;

        for entry in pending.sequence_values::<mlua::Table>() {
            let entry = entry.map_err(|e| anyhow::anyhow!("{e}"))?;
            let hook: String = entry.get("hook").map_err(|e| anyhow::anyhow!("{e}"))?;
            let priority: i32 = entry.get("priority").map_err(|e| anyhow::anyhow!("{e}"))?;
            let func: mlua::Function = entry.get("func").map_err(|e| anyhow::anyhow!("{e}"))?;
            let key = lua
                .create_registry_value(func)
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            self.hooks.add_filter(&hook, priority, key);
        }

        globals
            .set("_pending_filters", mlua::Value::Nil)
            .map_err(|e| anyhow::anyhow!("{e}"))?;

        Ok(())
    }

    /// filter 出错时记录警告并返回原值，截断流程本身不失败
    fn filter_or_keep(&self, hook: &str, value: String, args: &[serde_json::Value]) -> String {
        if !self.hooks.has_handlers(hook) {
            return value;
        }
        match self.hooks.apply_filter(&self.lua, hook, value.clone(), args) {
            Ok(filtered) => {
                tracing::debug!(hook, "filter 已应用");
                filtered
            }
            Err(e) => {
                tracing::warn!("{e}，使用未过滤的值");
                value
            }
        }
    }
}

impl TextHooks for PluginEngine {
    fn filter_allowed_tags(&self, allowed: String) -> String {
        self.filter_or_keep(hooks::ALLOWED_TAGS_HOOK, allowed, &[])
    }

    fn filter_trim_result(&self, text: String, ctx: &TrimContext<'_>) -> String {
        let args = [
            serde_json::json!(ctx.num_words),
            serde_json::json!(ctx.more),
            serde_json::json!(ctx.original),
        ];
        self.filter_or_keep(hooks::TRIM_RESULT_HOOK, text, &args)
    }
}

/// Lua 侧的 more 参数：nil 使用默认，false 不追加，字符串原样使用
fn lua_more(value: Option<mlua::Value>) -> mlua::Result<Option<String>> {
    match value {
        None | Some(mlua::Value::Nil) => Ok(None),
        Some(mlua::Value::Boolean(false)) => Ok(Some(String::new())),
        Some(mlua::Value::String(s)) => Ok(Some(s.to_string_lossy())),
        Some(other) => Err(mlua::Error::external(format!(
            "more 参数必须是字符串或 false，实际为 {}",
            other.type_name()
        ))),
    }
}
