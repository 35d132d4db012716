use minijinja::value::Rest;
use minijinja::{Environment, Value, context};
use std::sync::Arc;

use crate::config::TrimConfig;
use crate::error::clamp_limit;
use crate::hooks::TextHooks;
use crate::text::{self, TextHelper};

/// 向 MiniJinja 环境注册截断相关过滤器
///
/// 未传入的参数取自 `defaults`（即 htmltrim.toml 的 `[trim]`）。
///
/// - `{{ content|truncate }}` / `{{ content|truncate(20, " [更多]") }}`：按词截断，
///   `false` 表示不追加续写标记
/// - `{{ content|excerpt(80) }}`：去标签后按显示宽度截断
/// - `{{ content|close_tags }}`
/// - `{{ content|remove_tags("script", "iframe") }}`
pub fn register_filters<H>(env: &mut Environment, helper: Arc<TextHelper<H>>, defaults: &TrimConfig)
where
    H: TextHooks + Send + Sync + 'static,
{
    let words = helper.clone();
    let word_defaults = defaults.clone();
    env.add_filter(
        "truncate",
        move |value: String, num_words: Option<i64>, more: Option<Value>| -> String {
            let num_words = num_words
                .map_or(word_defaults.num_words, |n| clamp_limit("num_words", n));
            let more = template_more(more.as_ref()).or_else(|| word_defaults.more.clone());
            words.trim_words(&value, num_words, more.as_deref(), &word_defaults.allowed_tags)
        },
    );

    let chars = helper;
    let char_defaults = defaults.clone();
    env.add_filter(
        "excerpt",
        move |value: String, num_chars: Option<i64>, more: Option<Value>| -> String {
            let num_chars = num_chars
                .map_or(char_defaults.num_chars, |n| clamp_limit("num_chars", n));
            let more = template_more(more.as_ref()).or_else(|| char_defaults.more.clone());
            chars.trim_characters(&value, num_chars, more.as_deref())
        },
    );

    env.add_filter("close_tags", filter_close_tags);
    env.add_filter("remove_tags", filter_remove_tags);
}

/// 以 `content` 变量渲染一段模板源码
pub fn render<H>(
    source: &str,
    content: &str,
    helper: Arc<TextHelper<H>>,
    defaults: &TrimConfig,
) -> Result<String, minijinja::Error>
where
    H: TextHooks + Send + Sync + 'static,
{
    let mut env = Environment::new();
    register_filters(&mut env, helper, defaults);
    env.render_str(source, context! { content => content })
}

fn filter_close_tags(value: String) -> String {
    text::close_tags(&value)
}

fn filter_remove_tags(value: String, tags: Rest<String>) -> String {
    text::remove_tags(&value, &tags.0)
}

fn template_more(more: Option<&Value>) -> Option<String> {
    let value = more?;
    if value.is_none() || value.is_undefined() {
        return None;
    }
    match value.as_str() {
        Some(s) => Some(s.to_string()),
        None if !value.is_true() => Some(String::new()),
        None => Some(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HtmltrimConfig;
    use crate::hooks::TrimContext;
    use crate::locale::Locale;

    fn helper() -> Arc<TextHelper> {
        Arc::new(TextHelper::default())
    }

    fn render_default(source: &str, content: &str) -> String {
        render(source, content, helper(), &TrimConfig::default()).unwrap()
    }

    #[test]
    fn test_truncate_filter_default_marker() {
        let out = render_default("{{ content|truncate(3) }}", "<p>one two three four</p>");
        assert_eq!(out, "<p>one two three…</p>");
    }

    #[test]
    fn test_truncate_filter_marker_options() {
        let out = render_default(r#"{{ content|truncate(2, " »") }}"#, "one two three");
        assert_eq!(out, "one two »");
        let out = render_default("{{ content|truncate(2, false) }}", "one two three");
        assert_eq!(out, "one two");
    }

    #[test]
    fn test_truncate_filter_negative_limit() {
        let out = render_default("{{ content|truncate(-1) }}", "one two");
        assert_eq!(out, "…");
    }

    #[test]
    fn test_excerpt_filter() {
        let out = render_default("{{ content|excerpt(8) }}", "<p>Hello world</p>");
        assert_eq!(out, "Hello w…");
    }

    #[test]
    fn test_truncate_filter_character_locale() {
        let helper = Arc::new(TextHelper::new(Locale::characters()));
        let out = render("{{ content|truncate(2) }}", "你好世界", helper, &TrimConfig::default())
            .unwrap();
        assert_eq!(out, "你好…");
    }

    #[test]
    fn test_filters_use_trim_config() {
        let config = HtmltrimConfig::parse(
            "[trim]\nnum_words = 2\nnum_chars = 5\nmore = \" [more]\"\nallowed_tags = \"p em\"",
        )
        .unwrap();

        let html = "<p><em>a</em> b c d</p>";
        let out = render("{{ content|truncate }}", html, helper(), &config.trim).unwrap();
        assert_eq!(out, "<p><em>a</em> b [more]</p>");

        // 模板参数优先于配置
        let out = render("{{ content|truncate(3, false) }}", "a b c d", helper(), &config.trim)
            .unwrap();
        assert_eq!(out, "a b c");

        let out = render("{{ content|excerpt(9) }}", "Hello world", helper(), &config.trim)
            .unwrap();
        assert_eq!(out, "He [more]");
        let out = render("{{ content|excerpt(5, \"~\") }}", "Hello world", helper(), &config.trim)
            .unwrap();
        assert_eq!(out, "Hell~");
    }

    struct SuffixHooks;

    impl TextHooks for SuffixHooks {
        fn filter_trim_result(&self, text: String, ctx: &TrimContext<'_>) -> String {
            format!("{text}<!-- {} -->", ctx.num_words)
        }
    }

    #[test]
    fn test_truncate_filter_runs_hooks() {
        let helper = Arc::new(TextHelper::with_hooks(Locale::default(), SuffixHooks));
        let out = render("{{ content|truncate(1) }}", "x y", helper, &TrimConfig::default())
            .unwrap();
        assert_eq!(out, "x…<!-- 1 -->");
    }

    #[test]
    fn test_close_and_remove_tags_filters() {
        let out = render_default("{{ content|close_tags }}", "<p><b>hi");
        assert_eq!(out, "<p><b>hi</b></p>");
        let out = render_default(
            r#"{{ content|remove_tags("script", "style") }}"#,
            "a<script>x</script>b<style>y</style>c",
        );
        assert_eq!(out, "abc");
    }
}
