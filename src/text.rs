pub mod balance;
pub mod strip;
pub mod truncate;

pub use balance::{close_tags, normalize_void_elements};
pub use strip::{remove_tags, strip_all_tags, strip_tags};
pub use truncate::{DEFAULT_ALLOWED_TAGS, DEFAULT_NUM_CHARS, DEFAULT_NUM_WORDS};

use crate::error::TrimError;
use crate::hooks::{NoHooks, TextHooks};
use crate::locale::Locale;

/// 绑定本地化设置与 filter hook 的截断入口
#[derive(Debug, Clone)]
pub struct TextHelper<H = NoHooks> {
    pub locale: Locale,
    pub hooks: H,
}

impl TextHelper<NoHooks> {
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            hooks: NoHooks,
        }
    }
}

impl Default for TextHelper<NoHooks> {
    fn default() -> Self {
        Self::new(Locale::default())
    }
}

impl<H: TextHooks> TextHelper<H> {
    pub fn with_hooks(locale: Locale, hooks: H) -> Self {
        Self { locale, hooks }
    }

    pub fn trim_words(
        &self,
        text: &str,
        num_words: usize,
        more: Option<&str>,
        allowed_tags: &str,
    ) -> String {
        truncate::trim_words(text, num_words, more, allowed_tags, &self.locale, &self.hooks)
    }

    /// 与 [`trim_words`](Self::trim_words) 相同，但输入为原始字节，非 UTF-8 时报错
    pub fn trim_words_bytes(
        &self,
        bytes: &[u8],
        num_words: usize,
        more: Option<&str>,
        allowed_tags: &str,
    ) -> Result<String, TrimError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| TrimError::invalid("text", format!("不是合法的 UTF-8：{e}")))?;
        Ok(self.trim_words(text, num_words, more, allowed_tags))
    }

    pub fn trim_characters(&self, text: &str, num_chars: usize, more: Option<&str>) -> String {
        truncate::trim_characters(text, num_chars, more, &self.locale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{TrimContext, TextHooks};
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingHooks {
        calls: RefCell<Vec<String>>,
    }

    impl TextHooks for RecordingHooks {
        fn filter_allowed_tags(&self, allowed: String) -> String {
            self.calls.borrow_mut().push(format!("allowed:{allowed}"));
            "p".to_string()
        }

        fn filter_trim_result(&self, text: String, ctx: &TrimContext<'_>) -> String {
            self.calls.borrow_mut().push(format!(
                "result:{}:{}:{}",
                ctx.num_words, ctx.more, ctx.original
            ));
            format!("[{text}]")
        }
    }

    #[test]
    fn test_hooks_called_in_order_with_context() {
        let helper = TextHelper::with_hooks(Locale::default(), RecordingHooks::default());
        let out = helper.trim_words("<p><b>a</b> b c</p>", 2, Some("+"), "p b");

        assert_eq!(out, "[<p>a b+</p>]");
        assert_eq!(
            helper.hooks.calls.borrow().as_slice(),
            ["allowed:p b", "result:2:+:<p><b>a</b> b c</p>"]
        );
    }

    #[test]
    fn test_trim_words_bytes_rejects_invalid_utf8() {
        let helper = TextHelper::default();
        let err = helper
            .trim_words_bytes(&[0x66, 0xff, 0x6f], 5, None, DEFAULT_ALLOWED_TAGS)
            .unwrap_err();
        assert!(matches!(err, TrimError::InvalidArgument { name: "text", .. }));

        let ok = helper
            .trim_words_bytes("one two three".as_bytes(), 2, None, DEFAULT_ALLOWED_TAGS)
            .unwrap();
        assert_eq!(ok, "one two…");
    }

    #[test]
    fn test_marker_only_on_truncation() {
        let helper = TextHelper::default();
        for n in 0..6 {
            let out = helper.trim_words("a b c d", n, Some("!"), DEFAULT_ALLOWED_TAGS);
            assert_eq!(out.ends_with('!'), n < 4, "n = {n}");
            let kept = out.trim_end_matches('!').split_whitespace().count();
            assert_eq!(kept, n.min(4), "n = {n}");
        }
    }

    #[test]
    fn test_helper_is_shareable_between_threads() {
        let helper = std::sync::Arc::new(TextHelper::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let helper = helper.clone();
                std::thread::spawn(move || {
                    helper.trim_words("x y z", 1, None, DEFAULT_ALLOWED_TAGS)
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), "x…");
        }
    }
}
