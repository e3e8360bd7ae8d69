//! 模型输出归一化 - 业务能力层
//!
//! 模型不保证只输出 JSON：前后可能有寒暄，也可能包在 Markdown 代码块里。
//! 这里取第一个开分隔符到最后一个闭分隔符之间的最长片段再解析，
//! 任何情况下都返回 `Normalized` 的三种之一，不会返回错误。

use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::models::result::{
    DiagnosticResult, DiagnosticStatus, GradingResult, Normalized, StructuredPage,
};
use crate::utils::logging::truncate_text;

/// 期望的 JSON 形状
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `{ ... }`，评分结果
    Object,
    /// `[ ... ]`，整页结构
    Array,
}

impl Shape {
    fn pattern(self) -> &'static Regex {
        static OBJECT: OnceLock<Regex> = OnceLock::new();
        static ARRAY: OnceLock<Regex> = OnceLock::new();
        match self {
            // (?s) 让 . 匹配换行；贪婪匹配到最后一个闭分隔符
            Shape::Object => OBJECT.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("valid regex")),
            Shape::Array => ARRAY.get_or_init(|| Regex::new(r"(?s)\[.*\]").expect("valid regex")),
        }
    }
}

/// 截取第一个开分隔符到最后一个闭分隔符之间的片段
pub fn extract_span(raw_text: &str, shape: Shape) -> Option<&str> {
    shape.pattern().find(raw_text).map(|m| m.as_str())
}

/// 归一化模型输出
pub fn normalize(raw_text: &str, shape: Shape) -> Normalized {
    let Some(span) = extract_span(raw_text, shape) else {
        warn!(
            "⚠️ 模型输出中没有找到 JSON ({:?}): {}",
            shape,
            truncate_text(raw_text, 80)
        );
        return diagnostic(DiagnosticStatus::NotFound, raw_text);
    };

    let parsed = match shape {
        Shape::Object => serde_json::from_str::<GradingResult>(span).map(Normalized::Grading),
        Shape::Array => serde_json::from_str::<StructuredPage>(span).map(Normalized::Page),
    };

    match parsed {
        Ok(normalized) => {
            debug!("✓ 模型输出解析成功 ({:?})", shape);
            normalized
        }
        Err(e) => {
            warn!(
                "⚠️ 模型输出 JSON 解析失败: {} | 片段: {}",
                e,
                truncate_text(span, 80)
            );
            diagnostic(DiagnosticStatus::ParseError, span)
        }
    }
}

/// 归一化单题评分输出
pub fn normalize_grading(raw_text: &str) -> Normalized {
    normalize(raw_text, Shape::Object)
}

/// 归一化整页结构输出
pub fn normalize_page(raw_text: &str) -> Normalized {
    normalize(raw_text, Shape::Array)
}

fn diagnostic(status: DiagnosticStatus, raw_text: &str) -> Normalized {
    Normalized::Diagnostic(DiagnosticResult {
        status,
        raw_text: raw_text.to_string(),
    })
}
