//! SDF 元素定位
//!
//! 按标签扫描 XML 文本，找到直接子元素并替换其文本内容。
//! 只处理 SDF 用到的普通元素，不处理 CDATA。

use std::ops::Range;

use regex::Regex;

use crate::error::{EnvError, EnvResult};

/// 元素在文本中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementSpan {
    /// 开始标签起点
    pub start: usize,
    /// 内容范围（自闭合元素为空范围）
    pub content_start: usize,
    pub content_end: usize,
    /// 结束标签终点
    pub end: usize,
}

impl ElementSpan {
    pub fn content(&self) -> Range<usize> {
        self.content_start..self.content_end
    }

    /// 自闭合元素的内容范围落在标签末尾
    pub fn is_self_closing(&self) -> bool {
        self.content_start == self.end
    }
}

fn tag_regex() -> EnvResult<Regex> {
    Regex::new(r"(?s)<!--.*?-->|<(/?)([A-Za-z_][\w:.\-]*)[^>]*?(/?)>")
        .map_err(|e| EnvError::Other(format!("无效的标签正则: {}", e)))
}

/// 文档根元素
pub fn root_element(xml: &str) -> EnvResult<Option<ElementSpan>> {
    first_child(xml, 0..xml.len(), None)
}

/// 在 `within` 范围内查找名为 `name` 的直接子元素
pub fn child_element(xml: &str, within: Range<usize>, name: &str) -> EnvResult<Option<ElementSpan>> {
    first_child(xml, within, Some(name))
}

fn first_child(xml: &str, within: Range<usize>, name: Option<&str>) -> EnvResult<Option<ElementSpan>> {
    let re = tag_regex()?;
    let offset = within.start;
    let mut depth = 0usize;
    let mut open: Option<(usize, usize)> = None;

    for cap in re.captures_iter(&xml[within]) {
        let Some(tag_name) = cap.get(2) else {
            // 注释
            continue;
        };
        let whole = cap.get(0).map_or(0..0, |m| m.range());
        let start = offset + whole.start;
        let end = offset + whole.end;
        let closing = cap.get(1).is_some_and(|m| !m.as_str().is_empty());
        let self_closing = cap.get(3).is_some_and(|m| !m.as_str().is_empty());
        let matches_name = name.map_or(true, |n| n == tag_name.as_str());

        if closing {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                if let Some((open_start, content_start)) = open {
                    return Ok(Some(ElementSpan {
                        start: open_start,
                        content_start,
                        content_end: start,
                        end,
                    }));
                }
            }
        } else if self_closing {
            if depth == 0 && matches_name {
                return Ok(Some(ElementSpan {
                    start,
                    content_start: end,
                    content_end: end,
                    end,
                }));
            }
        } else {
            if depth == 0 && matches_name {
                open = Some((start, end));
            }
            depth += 1;
        }
    }
    Ok(None)
}

/// 沿路径逐级查找直接子元素，`path` 如 `["model", "link"]`
pub fn find_path(xml: &str, from: ElementSpan, path: &[&str]) -> EnvResult<ElementSpan> {
    let mut current = from;
    for (i, name) in path.iter().enumerate() {
        current = child_element(xml, current.content(), name)?
            .ok_or_else(|| EnvError::element_not_found(path[..=i].join("/")))?;
    }
    Ok(current)
}

/// 替换若干元素的文本内容
///
/// 自闭合元素（如 `<pose/>`）会展开为 `<pose>text</pose>`，属性保留
pub fn replace_contents(xml: &str, mut edits: Vec<(ElementSpan, String)>) -> String {
    edits.sort_by_key(|(span, _)| std::cmp::Reverse(span.start));
    let mut out = xml.to_string();
    for (span, text) in edits {
        if span.is_self_closing() {
            let expanded = expand_self_closing(&out[span.start..span.end], &text);
            out.replace_range(span.start..span.end, &expanded);
        } else {
            out.replace_range(span.content(), &text);
        }
    }
    out
}

/// `<tag attr="x"/>` → `<tag attr="x">text</tag>`
fn expand_self_closing(tag: &str, text: &str) -> String {
    let open = tag
        .trim_end_matches('>')
        .trim_end_matches('/')
        .trim_end();
    let name = open
        .trim_start_matches('<')
        .split(|c: char| c.is_whitespace())
        .next()
        .unwrap_or_default();
    format!("{}>{}</{}>", open, text, name)
}
