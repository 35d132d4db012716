use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

static UTF8_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^utf-?8$").unwrap());

/// `&hellip;` 渲染后的字符
pub const DEFAULT_MORE: &str = "\u{2026}";

/// 字数统计方式：按空白分词，或按单个字符（中日韩语言）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordCountType {
    #[default]
    Words,
    Characters,
}

/// 截断时需要的本地化信息
pub trait LocaleSettings {
    fn uses_character_counting(&self) -> bool;
    fn is_utf8(&self) -> bool;
    /// 未指定续写标记时使用的默认值
    fn translate_more(&self) -> String;
}

#[derive(Debug, Clone, Deserialize)]
pub struct Locale {
    #[serde(default)]
    pub word_count_type: WordCountType,
    #[serde(default = "default_charset")]
    pub charset: String,
    /// 翻译后的默认续写标记，缺省为 `…`
    #[serde(default)]
    pub more: Option<String>,
}

impl Locale {
    pub fn characters() -> Self {
        Self {
            word_count_type: WordCountType::Characters,
            ..Self::default()
        }
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self {
            word_count_type: WordCountType::Words,
            charset: default_charset(),
            more: None,
        }
    }
}

impl LocaleSettings for Locale {
    fn uses_character_counting(&self) -> bool {
        self.word_count_type == WordCountType::Characters
    }

    fn is_utf8(&self) -> bool {
        UTF8_RE.is_match(&self.charset)
    }

    fn translate_more(&self) -> String {
        self.more.clone().unwrap_or_else(|| DEFAULT_MORE.to_string())
    }
}

fn default_charset() -> String { "UTF-8".into() }
