use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrimError {
    /// 参数不合法（负数上限、非 UTF-8 输入等），核心流程中会被记录并归一化
    #[error("参数 {name} 不合法：{reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error("配置错误：{0}")]
    Config(String),
}

impl TrimError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }
}

/// 将来自 CLI / Lua / 模板的有符号上限归一化为 usize，负数按 0 处理
pub fn clamp_limit(name: &'static str, value: i64) -> usize {
    if value < 0 {
        let err = TrimError::invalid(name, format!("{value} 小于 0，按 0 处理"));
        tracing::warn!("{err}");
        return 0;
    }
    usize::try_from(value).unwrap_or(usize::MAX)
}
