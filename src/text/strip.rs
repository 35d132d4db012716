use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script[^>]*?>.*?</script>").unwrap());

static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style[^>]*?>.*?</style>").unwrap());

/// 去除 HTML 标签，仅保留白名单中的标签（原样保留其标记）
///
/// `allowed` 形如 `<p><a><span>`，匹配时忽略大小写。注释整体删除；
/// 标签内引号中的 `>` 不会结束标签；未闭合的标签连同其后内容一起丢弃。
pub fn strip_tags(text: &str, allowed: &str) -> String {
    let allowed = parse_allowed(allowed);
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < text.len() {
        let rest = &text[i..];

        if rest.starts_with("<!--") {
            i += rest.find("-->").map_or(rest.len(), |end| end + 3);
            continue;
        }

        let Some(ch) = rest.chars().next() else {
            break;
        };

        let opens_tag = ch == '<' && rest[1..].chars().next().is_some_and(|c| !c.is_whitespace());
        if opens_tag {
            let end = tag_end(rest);
            let tag = &rest[..end];
            if tag.ends_with('>') && allowed.contains(tag_name(tag).as_str()) {
                out.push_str(tag);
            }
            i += end;
            continue;
        }

        out.push(ch);
        i += ch.len_utf8();
    }

    out
}

/// 去除全部标签，`<script>` / `<style>` 连同内容一起删除，并去掉首尾空白
pub fn strip_all_tags(text: &str) -> String {
    let text = SCRIPT_RE.replace_all(text, "");
    let text = STYLE_RE.replace_all(&text, "");
    strip_tags(&text, "").trim().to_string()
}

/// 删除指定元素及其内容，如 `remove_tags(html, &["script", "iframe"])`
///
/// 标签名区分大小写，内容匹配最短的 `</name>`，可跨行。
pub fn remove_tags<S: AsRef<str>>(text: &str, tags: &[S]) -> String {
    if tags.is_empty() {
        return text.to_string();
    }

    let alternation = tags
        .iter()
        .map(|t| regex::escape(t.as_ref()))
        .collect::<Vec<_>>()
        .join("|");
    let open_re = match Regex::new(&format!("<({alternation})(?:[^>]+)?>")) {
        Ok(re) => re,
        Err(e) => {
            tracing::warn!("remove_tags 标签列表无法编译为正则：{e}");
            return text.to_string();
        }
    };

    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut search = 0;

    while let Some(caps) = open_re.captures_at(text, search) {
        let (Some(open), Some(name)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let closer = format!("</{}>", name.as_str());
        match text[open.end()..].find(&closer) {
            Some(offset) => {
                out.push_str(&text[copied..open.start()]);
                copied = open.end() + offset + closer.len();
                search = copied;
            }
            None => search = open.start() + 1,
        }
    }

    out.push_str(&text[copied..]);
    out
}

fn parse_allowed(allowed: &str) -> HashSet<String> {
    allowed
        .split('<')
        .filter_map(|part| part.trim().strip_suffix('>'))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect()
}

/// 返回标签结束位置（`>` 之后），找不到时返回剩余长度
fn tag_end(rest: &str) -> usize {
    let mut quote: Option<u8> = None;
    for (idx, &b) in rest.as_bytes().iter().enumerate().skip(1) {
        match (b, quote) {
            (b'"' | b'\'', None) => quote = Some(b),
            (q, Some(open)) if q == open => quote = None,
            (b'>', None) => return idx + 1,
            _ => {}
        }
    }
    rest.len()
}

fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('<')
        .trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_tags_keeps_allowed() {
        let html = r#"<div><p>Hello <a href="/x">link</a> <em>there</em></p></div>"#;
        assert_eq!(
            strip_tags(html, "<p><a>"),
            r#"<p>Hello <a href="/x">link</a> there</p>"#
        );
    }

    #[test]
    fn test_strip_tags_case_insensitive() {
        assert_eq!(strip_tags("<P>x</P><DIV>y</DIV>", "<p>"), "<P>x</P>y");
    }

    #[test]
    fn test_strip_tags_comments_and_quotes() {
        assert_eq!(strip_tags("a<!-- <p>hidden</p> -->b", "<p>"), "ab");
        assert_eq!(strip_tags(r#"<span title="a>b">x</span>"#, ""), "x");
    }

    #[test]
    fn test_strip_tags_literal_angle_bracket() {
        assert_eq!(strip_tags("1 < 2 and <b>bold</b>", ""), "1 < 2 and bold");
    }

    #[test]
    fn test_strip_tags_unterminated_tag_dropped() {
        assert_eq!(strip_tags("text <a href=\"x", "<a>"), "text ");
    }

    #[test]
    fn test_strip_tags_self_closing_allowed() {
        assert_eq!(strip_tags("a<br/>b<br />c<hr>", "<br>"), "a<br/>b<br />c");
    }

    #[test]
    fn test_strip_all_tags_drops_script_and_style() {
        let html = concat!(
            "  <style>p{color:red}</style>",
            "<p>Hi<script type=\"x\">alert(1)</script> there</p>  ",
        );
        assert_eq!(strip_all_tags(html), "Hi there");
    }

    #[test]
    fn test_remove_tags() {
        let html = "<p>keep</p><script>drop()</script><iframe src=\"x\">\nframe\n</iframe>tail";
        assert_eq!(remove_tags(html, &["script", "iframe"]), "<p>keep</p>tail");
    }

    #[test]
    fn test_remove_tags_unclosed_kept() {
        assert_eq!(remove_tags("<b>open <i>x</i>", &["b", "i"]), "<b>open ");
    }

    #[test]
    fn test_remove_tags_empty_list() {
        let tags: [&str; 0] = [];
        assert_eq!(remove_tags("<b>x</b>", &tags), "<b>x</b>");
    }
}
