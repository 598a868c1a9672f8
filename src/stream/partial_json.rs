//! 把模型流式输出的 JSON 文本片段还原成部分对象
//!
//! 模型按 token 输出文本，中途的文本通常不是合法 JSON。这里把已收到的前缀
//! 补全（闭合字符串、数组、对象），能解析时就得到一个 `PartialAiAnswer`。

use std::sync::OnceLock;

use regex::Regex;

use crate::models::PartialAiAnswer;

/// 累积文本片段并产出部分对象
#[derive(Debug, Default)]
pub struct PartialJsonParser {
    buffer: String,
    last: Option<PartialAiAnswer>,
}

impl PartialJsonParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一段文本；只有当解析结果与上一次不同才返回
    pub fn push(&mut self, delta: &str) -> Option<PartialAiAnswer> {
        if delta.is_empty() {
            return None;
        }
        self.buffer.push_str(delta);

        let partial = parse_partial(&self.buffer)?;
        if self.last.as_ref() == Some(&partial) {
            return None;
        }
        self.last = Some(partial.clone());
        Some(partial)
    }

    /// 已收到的原始文本
    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// 流结束：完整文本必须是一个合法的 JSON 对象
    pub fn finish(self) -> Result<PartialAiAnswer, String> {
        let cleaned = strip_code_fence(&self.buffer);
        let start = cleaned.find('{');
        let end = cleaned.rfind('}');
        match (start, end) {
            (Some(start), Some(end)) if start < end => {
                serde_json::from_str(&cleaned[start..=end]).map_err(|e| e.to_string())
            }
            _ => Err("响应中没有 JSON 对象".to_string()),
        }
    }
}

/// 解析一个可能不完整的 JSON 前缀
pub fn parse_partial(text: &str) -> Option<PartialAiAnswer> {
    let cleaned = strip_code_fence(text);
    let body = &cleaned[cleaned.find('{')?..];

    if let Some(answer) = close_prefix(body).and_then(|c| serde_json::from_str(&c).ok()) {
        return Some(answer);
    }

    // 直接补全失败（比如停在键名或字面量中间），退回到最近的完整值之后再试
    safe_cut_points(body)
        .into_iter()
        .rev()
        .find_map(|cut| close_prefix(&body[..cut]).and_then(|c| serde_json::from_str(&c).ok()))
}

fn strip_code_fence(text: &str) -> &str {
    static OPEN: OnceLock<Regex> = OnceLock::new();
    let open = OPEN.get_or_init(|| Regex::new(r"^\s*```[A-Za-z]*\s*").expect("valid regex"));

    let text = match open.find(text) {
        Some(m) => &text[m.end()..],
        None => text,
    };
    let trimmed = text.trim_end();
    trimmed.strip_suffix("```").unwrap_or(trimmed)
}

/// 扫描状态
#[derive(Default)]
struct Scan {
    stack: Vec<char>,
    in_string: bool,
    escaped: bool,
    /// 未完成的 \uXXXX：(反斜杠位置, 剩余十六进制位数)
    unicode: Option<(usize, u8)>,
    /// 当前对象里是否已经读到冒号（即正在读值）
    after_colon: bool,
}

/// 闭合前缀中所有未闭合的结构
fn close_prefix(prefix: &str) -> Option<String> {
    let mut scan = Scan::default();
    let mut escape_start = 0;

    for (i, c) in prefix.char_indices() {
        if scan.in_string {
            if let Some((start, remaining)) = scan.unicode {
                scan.unicode = if remaining > 1 { Some((start, remaining - 1)) } else { None };
                continue;
            }
            if scan.escaped {
                scan.escaped = false;
                if c == 'u' {
                    scan.unicode = Some((escape_start, 4));
                }
                continue;
            }
            match c {
                '\\' => {
                    scan.escaped = true;
                    escape_start = i;
                }
                '"' => scan.in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => scan.in_string = true,
            '{' | '[' => {
                scan.stack.push(c);
                scan.after_colon = false;
            }
            '}' | ']' => {
                scan.stack.pop()?;
            }
            ':' => scan.after_colon = true,
            ',' => scan.after_colon = false,
            _ => {}
        }
    }

    let mut out = prefix.to_string();
    if scan.in_string {
        if let Some((start, _)) = scan.unicode {
            out.truncate(start);
        } else if scan.escaped {
            out.truncate(escape_start);
        }
        out.push('"');
    }

    let trimmed_len = out.trim_end().trim_end_matches(',').trim_end().len();
    out.truncate(trimmed_len);

    for open in scan.stack.iter().rev() {
        out.push(if *open == '{' { '}' } else { ']' });
    }
    Some(out)
}

/// 可以安全截断的位置：容器开头之后、完整的值之后
fn safe_cut_points(body: &str) -> Vec<usize> {
    let mut points = Vec::new();
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut string_is_value = false;
    let mut after_colon = false;

    for (i, c) in body.char_indices() {
        let end = i + c.len_utf8();
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
                if string_is_value {
                    points.push(end);
                }
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                string_is_value = stack.last() == Some(&'[') || after_colon;
            }
            '{' | '[' => {
                stack.push(c);
                after_colon = false;
                points.push(end);
            }
            '}' | ']' => {
                stack.pop();
                after_colon = stack.last() == Some(&'{');
                points.push(end);
            }
            ':' => after_colon = true,
            ',' => after_colon = false,
            _ => {}
        }
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_string_value_is_closed() {
        let partial = parse_partial(r#"{"explanation": "Because the ang"#).unwrap();
        assert_eq!(partial.explanation.as_deref(), Some("Because the ang"));
    }

    #[test]
    fn test_dangling_key_is_dropped() {
        let partial = parse_partial(r#"{"aiAnswerMultipleChoice": "A", "expl"#).unwrap();
        assert_eq!(partial.ai_answer_multiple_choice.as_deref(), Some("A"));
        assert_eq!(partial.explanation, None);

        let partial = parse_partial(r#"{"aiAnswerMultipleChoice": "A", "explanation":"#).unwrap();
        assert_eq!(partial.ai_answer_multiple_choice.as_deref(), Some("A"));
    }

    #[test]
    fn test_open_array_is_closed() {
        let partial =
            parse_partial(r#"{"aiAnswerMultipleChoice": "C", "keyPoints": ["Ohm's law", "V = I"#)
                .unwrap();
        assert_eq!(
            partial.key_points,
            Some(vec!["Ohm's law".to_string(), "V = I".to_string()])
        );

        let partial = parse_partial(r#"{"keyPoints": ["#).unwrap();
        assert_eq!(partial.key_points, Some(vec![]));
    }

    #[test]
    fn test_incomplete_escape_is_trimmed() {
        let partial = parse_partial(r#"{"explanation": "line\"#).unwrap();
        assert_eq!(partial.explanation.as_deref(), Some("line"));

        let partial = parse_partial(r#"{"explanation": "angle \u00"#).unwrap();
        assert_eq!(partial.explanation.as_deref(), Some("angle "));
    }

    #[test]
    fn test_code_fence_and_prose_are_ignored() {
        let partial = parse_partial("```json\n{\"solution\": \"Step 1").unwrap();
        assert_eq!(partial.solution.as_deref(), Some("Step 1"));

        assert!(parse_partial("Sure! Here is").is_none());
    }

    #[test]
    fn test_parser_only_reports_changes() {
        let mut parser = PartialJsonParser::new();
        assert!(parser.push("{\"aiAnswer").is_some()); // `{}` 第一次出现
        assert!(parser.push("MultipleChoice").is_none());
        let partial = parser.push("\": \"B\"").unwrap();
        assert_eq!(partial.ai_answer_multiple_choice.as_deref(), Some("B"));
        assert!(parser.push(" ").is_none());
    }

    #[test]
    fn test_finish_requires_complete_object() {
        let mut parser = PartialJsonParser::new();
        parser.push("```json\n{\"aiAnswerMultipleChoice\": \"D\", \"keyPoints\": []}\n```");
        let done = parser.finish().unwrap();
        assert_eq!(done.ai_answer_multiple_choice.as_deref(), Some("D"));

        let mut parser = PartialJsonParser::new();
        parser.push("{\"aiAnswerMultipleChoice\": \"D\"");
        assert!(parser.finish().is_err());
    }
}
