use regex::Regex;
use std::sync::LazyLock;

/// 开始标签头：`<name` 后紧跟 `>` 或空格
static OPEN_HEAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([A-Za-z]+)[ >]").unwrap());

static CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</([A-Za-z]+)>").unwrap());

const VOID_CLOSERS: [&str; 3] = ["</br>", "</hr>", "</wbr>"];
const VOID_OPENERS: [(&str, &str); 3] = [
    ("<br>", "<br />"),
    ("<hr>", "<hr />"),
    ("<wbr>", "<wbr />"),
];

/// 为截断后的 HTML 片段补齐缺失的闭合标签
///
/// 只比较开始/闭合标签的数量，不校验嵌套结构：`<b><i>x</b></i>` 会原样返回。
/// 数量不等时按开始标签的逆序补齐，每个已存在的闭合标签只抵消一个同名开始标签。
pub fn close_tags(html: &str) -> String {
    let opened = opened_tags(html);
    let mut closed = closed_tags(html);

    if closed.len() == opened.len() {
        return html.to_string();
    }

    let mut out = String::with_capacity(html.len() + opened.len() * 8);
    out.push_str(html);
    for name in opened.iter().rev() {
        match closed.iter().position(|c| c == name) {
            Some(idx) => {
                closed.remove(idx);
            }
            None => {
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
        }
    }

    normalize_void_elements(&out)
}

/// 去掉 `</br>` 等非法闭合标签，并把 `<br>` 等改写为自闭合形式
pub fn normalize_void_elements(html: &str) -> String {
    let mut out = html.to_string();
    for closer in VOID_CLOSERS {
        out = out.replace(closer, "");
    }
    for (bare, self_closing) in VOID_OPENERS {
        out = out.replace(bare, self_closing);
    }
    out
}

/// 按出现顺序收集未自闭合的开始标签名
///
/// 带属性的标签取到第一个前面不是 `/`、`|` 或空格的 `>` 为止（不跨行），
/// 因此 `<img src="a" />` 这类自闭合标签不计入。
fn opened_tags(html: &str) -> Vec<&str> {
    let mut tags = Vec::new();
    let mut pos = 0;

    while let Some(caps) = OPEN_HEAD_RE.captures_at(html, pos) {
        let (Some(head), Some(name)) = (caps.get(0), caps.get(1)) else {
            break;
        };

        if html.as_bytes()[head.end() - 1] == b'>' {
            tags.push(name.as_str());
            pos = head.end();
            continue;
        }

        match attribute_end(html, head.end()) {
            Some(end) => {
                tags.push(name.as_str());
                pos = end;
            }
            None => pos = head.start() + 1,
        }
    }

    tags
}

/// 从属性区起点查找可结束开始标签的 `>`，返回其后一个字节的位置
fn attribute_end(html: &str, from: usize) -> Option<usize> {
    let bytes = html.as_bytes();
    for (offset, &b) in bytes[from..].iter().enumerate() {
        match b {
            b'\n' => return None,
            b'>' => {
                let idx = from + offset;
                if !matches!(bytes[idx - 1], b'/' | b'|' | b' ') {
                    return Some(idx + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn closed_tags(html: &str) -> Vec<&str> {
    CLOSE_RE
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect()
}
