//! HTML 摘要截断：按词数或字符数截断文本，保留白名单标签并补齐未闭合的标签。
//!
//! ```
//! use htmltrim::TextHelper;
//!
//! let helper = TextHelper::default();
//! let out = helper.trim_words("<p>The quick brown fox jumps</p>", 3, None, "p");
//! assert_eq!(out, "<p>The quick brown…</p>");
//! ```

pub mod config;
pub mod error;
pub mod hooks;
pub mod locale;
pub mod lua;
pub mod plugin;
pub mod template;
pub mod text;

pub use error::TrimError;
pub use hooks::{NoHooks, TextHooks, TrimContext};
pub use locale::{Locale, LocaleSettings, WordCountType};
pub use text::{TextHelper, close_tags, remove_tags, strip_all_tags, strip_tags};
