//! 成绩解析服务 - 业务能力层
//!
//! 只负责把查询页面解析成 [`QueryOutcome`]，不关心网络和通知
//!
//! 页面是一个单页应用，成绩数据以对象字面量的形式嵌在脚本里：
//!
//! ```text
//! data: { cj: {"zf": "385", ...}, msg: "" }
//! var cj = null; var msg = "信息不匹配，请检查报考信息";
//! ```
//!
//! 解析顺序：
//! 1. 依次尝试若干提取策略，取出 `cj` 的字面量
//! 2. 字面量为 `null` 时按 `msg` 分类
//! 3. 否则按 JSON 解析，再按字段组依次匹配

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::models::{FailureReason, QueryOutcome, ScoreReport};
use crate::utils::truncate_text;

/// `cj` 为 null 且页面没有 msg 时使用的默认说明
pub const DEFAULT_NULL_MESSAGE: &str = "请检查报考信息或成绩查询尚未开放";

/// 成绩字段，全部出现的字段都会拼进结果
const SCORE_FIELDS: &[&str] = &["总分", "zf", "total_score", "km1", "km2", "km3", "km4"];
/// 录取状态字段
const ADMISSION_FIELDS: &[&str] = &["lqzt", "录取状态", "psyz", "拟录取"];
/// 初试成绩字段
const PRELIMINARY_FIELDS: &[&str] = &["cxsj", "初试成绩", "cs_cj"];

/// 一个提取策略：从页面文本中取出 `cj` 字面量
type ExtractStrategy = fn(&str) -> Option<String>;

/// 提取策略，按结构容忍度从低到高排列
const STRATEGIES: &[(&str, ExtractStrategy)] = &[
    ("flat", extract_flat),
    ("nested", extract_nested),
    ("quoted", extract_quoted),
    ("balanced", extract_balanced),
];

static FLAT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\bcj\s*[:=]\s*(\{[^{}]*\}|null)").expect("valid flat cj pattern")
});

static NESTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\bcj\s*[:=]\s*(\{(?:[^{}]|\{[^{}]*\})*\}|null)").expect("valid nested cj pattern")
});

static QUOTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"cj"\s*:\s*(\{(?:[^{}]|\{[^{}]*\})*\}|null)"#).expect("valid quoted cj pattern")
});

static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:"cj"|\bcj)\s*[:=]\s*\{"#).expect("valid cj anchor pattern")
});

static MSG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)\bmsg\s*[:=]\s*["']([^"']*)["']"#).expect("valid msg pattern")
});

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// `cj: {...}` / `cj = {...}`，对象内不含花括号
pub fn extract_flat(text: &str) -> Option<String> {
    capture(&FLAT_RE, text)
}

/// 允许一层嵌套的对象
pub fn extract_nested(text: &str) -> Option<String> {
    capture(&NESTED_RE, text)
}

/// 带引号的键：`"cj": {...}`
pub fn extract_quoted(text: &str) -> Option<String> {
    capture(&QUOTED_RE, text)
}

/// 从 `cj` 后的 `{` 开始逐字符配平花括号，不限嵌套层数
///
/// 字符串内的花括号不计入
pub fn extract_balanced(text: &str) -> Option<String> {
    let start = ANCHOR_RE.find(text)?.end() - 1;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..=start + offset].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// 依次尝试所有策略，返回第一个命中的字面量
pub fn extract_literal(text: &str) -> Option<String> {
    STRATEGIES.iter().find_map(|(name, strategy)| {
        let raw = strategy(text)?;
        debug!("策略 {} 提取到 cj: {}", name, truncate_text(&raw, 100));
        Some(raw)
    })
}

/// 解析查询页面
///
/// 纯函数，相同输入总是得到相同结果（日志除外）
pub fn classify(raw_text: &str) -> QueryOutcome {
    if raw_text.trim().is_empty() {
        warn!("查询状态: 响应为空，可能是网络错误或会话失效");
        return QueryOutcome::NotYetAvailable(None);
    }

    let Some(raw) = extract_literal(raw_text) else {
        warn!("查询状态: 响应中找不到成绩数据结构");
        return QueryOutcome::NotYetAvailable(None);
    };

    if raw == "null" {
        return classify_null(raw_text);
    }

    let data: Map<String, Value> = match serde_json::from_str(&raw) {
        Ok(data) => data,
        Err(e) => {
            warn!("查询状态: 成绩数据无法解析为 JSON: {}", e);
            debug!("原始数据: {}", truncate_text(&raw, 200));
            return QueryOutcome::Failed(FailureReason::MalformedPayload);
        }
    };

    debug!("成绩 JSON 解析成功，共 {} 个字段", data.len());
    classify_fields(&data)
}

/// `cj` 为 null：根据 msg 判断原因
fn classify_null(raw_text: &str) -> QueryOutcome {
    let msg = capture(&MSG_RE, raw_text)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| DEFAULT_NULL_MESSAGE.to_string());
    warn!("查询状态: ⏳ 无查询结果 - msg: {}", msg);

    if msg.contains("信息不匹配") {
        warn!("  └─ 报考信息与学信网记录不匹配");
        return QueryOutcome::Failed(FailureReason::InformationMismatch);
    }

    if msg.contains("暂未") || msg.contains("未开放") {
        info!("  └─ 成绩尚未公布");
        return QueryOutcome::NotYetAvailable(None);
    }

    QueryOutcome::NotYetAvailable(Some(msg))
}

/// 按字段组依次匹配
fn classify_fields(data: &Map<String, Value>) -> QueryOutcome {
    let note = field_text(data, "zsdwsm");
    if let Some(note) = &note {
        info!("招生单位说明: {}", note);
    }
    let found =
        |text: String| QueryOutcome::ResultFound(ScoreReport::new(text).with_note(note.clone()));

    let scores: String = SCORE_FIELDS
        .iter()
        .filter_map(|field| field_text(data, field).map(|value| format!("{}: {}; ", field, value)))
        .collect();
    if !scores.is_empty() {
        info!("查询状态: ✅ 查到成绩 - {}", scores);
        return found(scores);
    }

    for field in ADMISSION_FIELDS {
        let Some(value) = field_text(data, field) else {
            continue;
        };
        if value.contains("录取") {
            info!("查询状态: ✅ 录取状态 - {}: {}", field, value);
            return found(value);
        }
        if value.contains("体检") {
            info!("查询状态: 📋 体检阶段 - {}: {}", field, value);
            return QueryOutcome::NotYetAvailable(Some(value));
        }
        if value.contains("复试") {
            info!("查询状态: 📝 复试阶段 - {}: {}", field, value);
            return QueryOutcome::NotYetAvailable(Some(value));
        }
    }

    if let Some((field, value)) = PRELIMINARY_FIELDS
        .iter()
        .find_map(|field| field_text(data, field).map(|value| (field, value)))
    {
        info!("查询状态: 📊 初试成绩 - {}: {}", field, value);
        return found(value);
    }

    debug!("全部字段: {:?}", data);
    info!("查询状态: ℹ️ 暂未识别出成绩或录取状态");
    QueryOutcome::NotYetAvailable(None)
}

/// 取字段的文本值，null 和空串视为缺失
fn field_text(data: &Map<String, Value>, field: &str) -> Option<String> {
    match data.get(field)? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(script: &str) -> String {
        format!("<html><body><div id=\"app\"></div><script>{}</script></body></html>", script)
    }

    #[test]
    fn test_total_score_found() {
        let html = page(r#"var cj = {"总分": "245", "psyz": "拟录取", "xm": "张三"}; var msg = "success";"#);
        match classify(&html) {
            QueryOutcome::ResultFound(report) => {
                assert!(report.text.contains("245"), "{}", report.text)
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_all_score_fields_are_joined() {
        let html = page(r#"new Vue({ data: { cj: {"xm": "王五", "zf": 385, "km1": "70", "km2": ""}, msg: "" } })"#);
        assert_eq!(
            classify(&html),
            QueryOutcome::ResultFound(ScoreReport::new("zf: 385; km1: 70; "))
        );
    }

    #[test]
    fn test_null_with_mismatch_message() {
        let html = page(r#"var cj = null; var msg = "信息不匹配，请检查报考信息";"#);
        assert_eq!(
            classify(&html),
            QueryOutcome::Failed(FailureReason::InformationMismatch)
        );
    }

    #[test]
    fn test_null_not_yet_open() {
        for msg in ["成绩暂未公布", "查询未开放"] {
            let html = page(&format!(r#"var cj = null; var msg = "{}";"#, msg));
            assert_eq!(classify(&html), QueryOutcome::NotYetAvailable(None));
        }
    }

    #[test]
    fn test_null_other_message_kept_as_diagnostic() {
        let html = page(r#"cj: null, msg: '成绩尚未发布，请稍后查询'"#);
        assert_eq!(
            classify(&html),
            QueryOutcome::NotYetAvailable(Some("成绩尚未发布，请稍后查询".to_string()))
        );
    }

    #[test]
    fn test_null_without_message_uses_default() {
        let html = page("var cj = null;");
        assert_eq!(classify(&html), QueryOutcome::NotYetAvailable(None));
    }

    #[test]
    fn test_admitted_status() {
        let html = page(r#"var cj = {"lqzt": "已录取", "xm": "李四", "ksbh": "103586210002651"};"#);
        assert_eq!(classify(&html), QueryOutcome::ResultFound(ScoreReport::new("已录取")));
    }

    #[test]
    fn test_physical_exam_and_reexam_stay_pending() {
        for status in ["待体检", "进入复试"] {
            let html = page(&format!(r#"var cj = {{"psyz": "{}"}};"#, status));
            assert!(
                matches!(classify(&html), QueryOutcome::NotYetAvailable(_)),
                "status {}",
                status
            );
        }
    }

    #[test]
    fn test_preliminary_score() {
        let html = page(r#"var cj = {"初试成绩": "385", "xm": "王五"};"#);
        assert_eq!(classify(&html), QueryOutcome::ResultFound(ScoreReport::new("385")));
    }

    #[test]
    fn test_missing_marker_is_not_fatal() {
        let html = page("window.location = '/login';");
        assert_eq!(classify(&html), QueryOutcome::NotYetAvailable(None));
        assert_eq!(classify(""), QueryOutcome::NotYetAvailable(None));
    }

    #[test]
    fn test_malformed_literal() {
        let html = page("cj: {zf: 385, xm: '王五'}");
        assert_eq!(
            classify(&html),
            QueryOutcome::Failed(FailureReason::MalformedPayload)
        );
    }

    #[test]
    fn test_nested_literal_falls_through_to_nested_strategy() {
        let html = page(r#"cj: {"zf": "401", "detail": {"km1": "80"}}, msg: """#);
        assert_eq!(extract_flat(&html), None);
        assert_eq!(
            extract_nested(&html).as_deref(),
            Some(r#"{"zf": "401", "detail": {"km1": "80"}}"#)
        );
        assert_eq!(
            classify(&html),
            QueryOutcome::ResultFound(ScoreReport::new("zf: 401; "))
        );
    }

    #[test]
    fn test_quoted_key() {
        let html = page(r#"window.__STATE__ = {"cj": {"cs_cj": "360"}};"#);
        assert_eq!(extract_quoted(&html).as_deref(), Some(r#"{"cs_cj": "360"}"#));
        assert_eq!(classify(&html), QueryOutcome::ResultFound(ScoreReport::new("360")));
    }

    #[test]
    fn test_uninterpretable_payload() {
        let html = page(r#"var cj = {"xm": "赵六", "zsdwsm": "请留意学院通知"};"#);
        assert_eq!(classify(&html), QueryOutcome::NotYetAvailable(None));
    }

    #[test]
    fn test_classify_is_deterministic() {
        let html = page(r#"var cj = {"总分": "245"};"#);
        assert_eq!(classify(&html), classify(&html));
    }

    #[test]
    fn test_office_note_travels_with_score() {
        let html = page(r#"var cj = {"zf": "385", "zsdwsm": "请于3月20日前确认"};"#);
        assert_eq!(
            classify(&html),
            QueryOutcome::ResultFound(
                ScoreReport::new("zf: 385; ").with_note(Some("请于3月20日前确认".to_string()))
            )
        );
    }

    #[test]
    fn test_empty_message_uses_default() {
        let html = page(r#"var cj = null; var msg = "";"#);
        assert_eq!(classify(&html), QueryOutcome::NotYetAvailable(None));
    }

    #[test]
    fn test_deeply_nested_literal_uses_balanced_scan() {
        let html = page(r#"cj: {"detail": {"scores": {"km1": "80"}}, "zf": "401"}, msg: """#);
        assert_eq!(extract_nested(&html), None);
        assert_eq!(
            extract_balanced(&html).as_deref(),
            Some(r#"{"detail": {"scores": {"km1": "80"}}, "zf": "401"}"#)
        );
        assert_eq!(
            classify(&html),
            QueryOutcome::ResultFound(ScoreReport::new("zf: 401; "))
        );
    }

    #[test]
    fn test_balanced_scan_skips_braces_in_strings() {
        let html = page(r#"var cj = {"zsdwsm": "见 {附件} \"说明\"", "a": {"b": {"c": 1}}};"#);
        assert_eq!(
            extract_balanced(&html).as_deref(),
            Some(r#"{"zsdwsm": "见 {附件} \"说明\"", "a": {"b": {"c": 1}}}"#)
        );
        assert_eq!(extract_balanced(&page("var cj = {\"zf\": 1")), None);
    }
}
