/// `trim_words` 的 allowed_tags 过滤点
pub const ALLOWED_TAGS_HOOK: &str = "trim_words.allowed_tags";

/// `trim_words` 最终结果的过滤点
pub const TRIM_RESULT_HOOK: &str = "trim_words.result";

/// 传给结果过滤器的上下文
#[derive(Debug, Clone)]
pub struct TrimContext<'a> {
    pub num_words: usize,
    pub more: &'a str,
    /// 去标签、截断之前的原始文本
    pub original: &'a str,
}

/// 截断流程中的两个 filter hook
///
/// 调用顺序固定：`filter_allowed_tags` → 去标签 → 截断 → 补齐标签 → `filter_trim_result`。
/// 实现方不应 panic；出错时返回传入值即可。
pub trait TextHooks {
    fn filter_allowed_tags(&self, allowed: String) -> String {
        allowed
    }

    fn filter_trim_result(&self, text: String, _ctx: &TrimContext<'_>) -> String {
        text
    }
}

/// 不做任何过滤
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl TextHooks for NoHooks {}

impl<H: TextHooks + ?Sized> TextHooks for &H {
    fn filter_allowed_tags(&self, allowed: String) -> String {
        (**self).filter_allowed_tags(allowed)
    }

    fn filter_trim_result(&self, text: String, ctx: &TrimContext<'_>) -> String {
        (**self).filter_trim_result(text, ctx)
    }
}

/// 模板过滤器要求 `Send + Sync`，Lua 引擎通过 Mutex 共享
impl<H: TextHooks> TextHooks for std::sync::Mutex<H> {
    fn filter_allowed_tags(&self, allowed: String) -> String {
        match self.lock() {
            Ok(hooks) => hooks.filter_allowed_tags(allowed),
            Err(poisoned) => poisoned.into_inner().filter_allowed_tags(allowed),
        }
    }

    fn filter_trim_result(&self, text: String, ctx: &TrimContext<'_>) -> String {
        match self.lock() {
            Ok(hooks) => hooks.filter_trim_result(text, ctx),
            Err(poisoned) => poisoned.into_inner().filter_trim_result(text, ctx),
        }
    }
}
