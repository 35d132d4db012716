use mlua::{LuaSerdeExt, RegistryKey};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// Filter 注册表：hook 名 → (优先级, Lua 处理函数)
#[derive(Default)]
pub struct HookRegistry {
    filters: HashMap<String, Vec<(i32, RegistryKey)>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_filter(&mut self, hook: &str, priority: i32, key: RegistryKey) {
        self.filters
            .entry(hook.to_string())
            .or_default()
            .push((priority, key));
    }

    /// 执行 filter：值依次流经按优先级升序排列的处理器
    ///
    /// 每个处理器收到 `(当前值, args...)`，返回值作为下一个处理器的输入。
    /// 优先级相同时按注册顺序执行。
    pub fn apply_filter<T>(
        &self,
        lua: &mlua::Lua,
        hook: &str,
        value: T,
        args: &[serde_json::Value],
    ) -> anyhow::Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let Some(handlers) = self.filters.get(hook) else {
            return Ok(value);
        };

        let mut sorted: Vec<_> = handlers.iter().collect();
        sorted.sort_by_key(|(p, _)| *p);

        let mut current = value;
        for (priority, key) in sorted {
            let func: mlua::Function = lua
                .registry_value(key)
                .map_err(|e| anyhow::anyhow!("获取 filter '{}' handler 失败: {}", hook, e))?;

            let mut call_args = Vec::with_capacity(args.len() + 1);
            call_args.push(
                lua.to_value(&current)
                    .map_err(|e| anyhow::anyhow!("序列化 filter '{}' 输入失败: {}", hook, e))?,
            );
            for arg in args {
                call_args.push(
                    lua.to_value(arg)
                        .map_err(|e| anyhow::anyhow!("序列化 filter '{}' 参数失败: {}", hook, e))?,
                );
            }

            let result = func
                .call::<mlua::Value>(mlua::MultiValue::from_iter(call_args))
                .map_err(|e| {
                    anyhow::anyhow!("filter '{}' 执行失败 (priority={}): {}", hook, priority, e)
                })?;
            current = lua.from_value(result).map_err(|e| {
                anyhow::anyhow!(
                    "filter '{}' 返回值反序列化失败 (priority={}): {}",
                    hook,
                    priority,
                    e
                )
            })?;
        }

        Ok(current)
    }

    pub fn has_handlers(&self, hook: &str) -> bool {
        self.filters.get(hook).is_some_and(|h| !h.is_empty())
    }
}
