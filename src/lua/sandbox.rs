use anyhow::{Context, Result};
use mlua::Lua;
use std::path::{Component, Path, PathBuf};

const DISABLED: [(&str, &str); 3] = [("os", "execute"), ("os", "exit"), ("io", "popen")];

/// 限制插件能力：禁用进程相关函数，`io.open` 只能访问项目根目录内的文件
pub fn apply(lua: &Lua, project_root: &Path) -> Result<()> {
    let globals = lua.globals();

    for (lib, name) in DISABLED {
        let table: mlua::Table = globals
            .get(lib)
            .map_err(|e| anyhow::anyhow!("获取 {lib} 库失败: {e}"))?;
        table
            .set(name, mlua::Value::Nil)
            .map_err(|e| anyhow::anyhow!("禁用 {lib}.{name} 失败: {e}"))?;
    }

    let root = project_root
        .canonicalize()
        .context("项目根目录 canonicalize 失败")?;

    let io: mlua::Table = globals.get("io").map_err(|e| anyhow::anyhow!("{e}"))?;
    let original_open: mlua::Function = io.get("open").map_err(|e| anyhow::anyhow!("{e}"))?;

    let confined_open = lua
        .create_function(move |_, (path, mode): (String, Option<String>)| {
            let full = resolve_path(&root, &path)?;
            let mode = mode.unwrap_or_else(|| "r".to_string());
            original_open.call::<mlua::MultiValue>((full.to_string_lossy().to_string(), mode))
        })
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    io.set("open", confined_open)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    Ok(())
}

/// 解析插件给出的相对路径，拒绝绝对路径和越出项目根目录的路径
pub fn resolve_path(project_root: &Path, relative: &str) -> Result<PathBuf, mlua::Error> {
    let path = Path::new(relative);
    if path.is_absolute() {
        return Err(mlua::Error::external(format!("不允许绝对路径: {relative}")));
    }

    let mut resolved = project_root.to_path_buf();
    for component in path.components() {
        match component {
            Component::Normal(c) => resolved.push(c),
            Component::ParentDir => {
                resolved.pop();
            }
            Component::CurDir => {}
            _ => {
                return Err(mlua::Error::external(format!(
                    "路径包含非法组件: {relative}"
                )));
            }
        }
    }

    // 已存在的路径再解析一次符号链接
    let resolved = if resolved.exists() {
        resolved
            .canonicalize()
            .map_err(|e| mlua::Error::external(format!("路径解析失败: {relative} - {e}")))?
    } else {
        resolved
    };

    if !resolved.starts_with(project_root) {
        return Err(mlua::Error::external(format!(
            "路径越界: {relative} 不在项目根目录内"
        )));
    }

    Ok(resolved)
}
