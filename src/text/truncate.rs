use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::balance::close_tags;
use super::strip::{strip_all_tags, strip_tags};
use crate::hooks::{TextHooks, TrimContext};
use crate::locale::LocaleSettings;

pub const DEFAULT_NUM_WORDS: usize = 55;
pub const DEFAULT_NUM_CHARS: usize = 60;
pub const DEFAULT_ALLOWED_TAGS: &str = "p a span b i br blockquote";

fn is_separator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\t' | ' ')
}

/// 把空格分隔的标签名转换为 `<p><a>...` 形式的白名单
pub fn allowed_tag_string(tags: &str) -> String {
    tags.split_whitespace().map(|tag| format!("<{tag}>")).collect()
}

/// 按词（或字符）截断 HTML，保留白名单标签并补齐闭合标签
///
/// `more` 为 `None` 时使用本地化的默认续写标记，`Some("")` 表示不追加。
/// 只有发生截断时才追加续写标记。
pub fn trim_words<L, H>(
    text: &str,
    num_words: usize,
    more: Option<&str>,
    allowed_tags: &str,
    locale: &L,
    hooks: &H,
) -> String
where
    L: LocaleSettings + ?Sized,
    H: TextHooks + ?Sized,
{
    let more = more.map_or_else(|| locale.translate_more(), str::to_string);

    let allowed_tags = hooks.filter_allowed_tags(allowed_tags.to_string());
    let stripped = strip_tags(text, &allowed_tag_string(&allowed_tags));

    let character_mode = locale.uses_character_counting() && locale.is_utf8();
    tracing::debug!(num_words, character_mode, "trim_words 截断");

    // 多取一个单元用于判断是否超出上限
    let limit = num_words.saturating_add(1);
    let (mut trimmed, truncated) = if character_mode {
        trim_units(split_characters(&stripped, limit), num_words, "")
    } else {
        trim_units(split_words(&stripped, limit), num_words, " ")
    };
    if truncated {
        trimmed.push_str(&more);
    }

    let balanced = close_tags(&trimmed);
    let ctx = TrimContext {
        num_words,
        more: &more,
        original: text,
    };
    hooks.filter_trim_result(balanced, &ctx)
}

/// 超过上限时去掉最后一个单元，返回拼接结果及是否发生了截断
fn trim_units<U: AsRef<str>>(mut units: Vec<U>, num_words: usize, sep: &str) -> (String, bool) {
    let truncated = units.len() > num_words;
    if truncated {
        units.pop();
    }
    let joined = units.iter().map(|u| u.as_ref()).collect::<Vec<&str>>().join(sep);
    (joined, truncated)
}

/// 按空白切分，最多 `limit` 段，最后一段保留未切分的剩余文本；空段丢弃
pub fn split_words(text: &str, limit: usize) -> Vec<&str> {
    let mut words = Vec::new();
    let mut rest = text.trim_start_matches(is_separator);

    while !rest.is_empty() {
        if words.len() + 1 >= limit {
            words.push(rest);
            break;
        }
        match rest.find(is_separator) {
            Some(end) => {
                words.push(&rest[..end]);
                rest = rest[end..].trim_start_matches(is_separator);
            }
            None => {
                words.push(rest);
                break;
            }
        }
    }

    words
}

/// 空白压缩为单个空格、去掉首尾空格后按码点切分，最多取 `limit` 个
pub fn split_characters(text: &str, limit: usize) -> Vec<String> {
    let mut collapsed = String::with_capacity(text.len());
    let mut last_was_space = false;
    for ch in text.chars() {
        if is_separator(ch) {
            if !last_was_space {
                collapsed.push(' ');
                last_was_space = true;
            }
        } else {
            collapsed.push(ch);
            last_was_space = false;
        }
    }

    collapsed
        .trim_matches(' ')
        .chars()
        .take(limit)
        .map(String::from)
        .collect()
}

/// 去掉全部标签后按显示宽度截断，全角字符宽度计为 2
///
/// 结果（含续写标记）的宽度不超过 `num_chars`。
pub fn trim_characters<L>(text: &str, num_chars: usize, more: Option<&str>, locale: &L) -> String
where
    L: LocaleSettings + ?Sized,
{
    let more = more.map_or_else(|| locale.translate_more(), str::to_string);
    let text = strip_all_tags(text);

    if text.width() <= num_chars {
        return text;
    }

    let target_width = num_chars.saturating_sub(more.width());
    let mut current_width = 0;
    let mut end_idx = 0;
    for (idx, ch) in text.char_indices() {
        let ch_width = ch.width().unwrap_or(0);
        if current_width + ch_width > target_width {
            break;
        }
        current_width += ch_width;
        end_idx = idx + ch.len_utf8();
    }

    format!("{}{}", &text[..end_idx], more)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::NoHooks;
    use crate::locale::Locale;

    fn words(text: &str, n: usize, more: Option<&str>) -> String {
        trim_words(text, n, more, DEFAULT_ALLOWED_TAGS, &Locale::default(), &NoHooks)
    }

    #[test]
    fn test_trim_words_keeps_paragraph() {
        assert_eq!(
            words("<p>The quick brown fox jumps over the lazy dog</p>", 3, None),
            "<p>The quick brown…</p>"
        );
    }

    #[test]
    fn test_trim_words_short_text_unchanged() {
        assert_eq!(words("short text", 55, None), "short text");
    }

    #[test]
    fn test_trim_words_exact_count_no_marker() {
        assert_eq!(words("one two three", 3, None), "one two three");
    }

    #[test]
    fn test_trim_words_custom_and_empty_marker() {
        assert_eq!(words("one two three four", 2, Some(" [more]")), "one two [more]");
        assert_eq!(words("one two three four", 2, Some("")), "one two");
    }

    #[test]
    fn test_trim_words_zero() {
        assert_eq!(words("one two", 0, None), "…");
        assert_eq!(words("", 0, None), "");
    }

    #[test]
    fn test_trim_words_collapses_whitespace_between_kept_words() {
        assert_eq!(words("  one\n\ttwo   three four", 3, None), "one two three…");
    }

    #[test]
    fn test_trim_words_strips_disallowed_tags() {
        assert_eq!(
            words("<div><p>Hello <em>big</em> <b>bold world</b> again</p></div>", 3, None),
            "<p>Hello big <b>bold…</b></p>"
        );
    }

    #[test]
    fn test_trim_words_custom_allowed_tags() {
        let out = trim_words(
            "<h2>Title</h2> <p>body text here</p>",
            2,
            None,
            "h2",
            &Locale::default(),
            &NoHooks,
        );
        assert_eq!(out, "<h2>Title</h2> body…");
    }

    #[test]
    fn test_trim_words_character_mode() {
        let locale = Locale::characters();
        let out = trim_words("héllo wörld", 5, None, DEFAULT_ALLOWED_TAGS, &locale, &NoHooks);
        assert_eq!(out, "héllo…");
    }

    #[test]
    fn test_trim_words_character_mode_cjk() {
        let locale = Locale::characters();
        let out = trim_words("今天 天气\n很好", 4, Some("……"), DEFAULT_ALLOWED_TAGS, &locale, &NoHooks);
        assert_eq!(out, "今天 天……");
        // 保留的标签字符同样计入字符数
        let out = trim_words("<b>今天天气</b>", 4, None, DEFAULT_ALLOWED_TAGS, &locale, &NoHooks);
        assert_eq!(out, "<b>今…</b>");
    }

    #[test]
    fn test_trim_words_character_mode_requires_utf8() {
        let locale = Locale {
            charset: "ISO-8859-1".into(),
            ..Locale::characters()
        };
        let out = trim_words("héllo wörld", 5, None, DEFAULT_ALLOWED_TAGS, &locale, &NoHooks);
        assert_eq!(out, "héllo wörld");
    }

    #[test]
    fn test_split_words_limit_keeps_remainder() {
        assert_eq!(split_words("a b  c d ", 3), vec!["a", "b", "c d "]);
        assert_eq!(split_words(" a\tb ", 10), vec!["a", "b"]);
        assert_eq!(split_words("   ", 3), Vec::<&str>::new());
        assert_eq!(split_words("a b", 1), vec!["a b"]);
    }

    #[test]
    fn test_split_characters() {
        assert_eq!(split_characters("  a \n b  ", 10), vec!["a", " ", "b"]);
        assert_eq!(split_characters("日本語", 2), vec!["日", "本"]);
    }

    #[test]
    fn test_allowed_tag_string() {
        assert_eq!(allowed_tag_string("p a  br"), "<p><a><br>");
        assert_eq!(allowed_tag_string(""), "");
    }

    #[test]
    fn test_trim_characters() {
        let locale = Locale::default();
        assert_eq!(trim_characters("<p>Hello world</p>", 60, None, &locale), "Hello world");
        assert_eq!(trim_characters("<p>Hello world</p>", 8, None, &locale), "Hello w…");
        assert_eq!(trim_characters("Hello world", 8, Some("..."), &locale), "Hello...");
    }

    #[test]
    fn test_trim_characters_wide_chars() {
        let locale = Locale::default();
        // 每个汉字宽度为 2
        assert_eq!(trim_characters("日本語テスト", 7, Some("..."), &locale), "日本...");
        assert_eq!(trim_characters("日本語", 6, None, &locale), "日本語");
    }
}
