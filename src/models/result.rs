//! 归一化之后的结果类型
//!
//! 模型输出只有三种归宿：评分结果、整页结构、诊断信息。
//! 诊断信息是正常的返回值，保留了模型的原始输出，方便调用方查看模型到底说了什么。

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::time::Duration;

use crate::models::invocation::StageKind;

/// 模型给出的分数：可能是数字，也可能是 "8/10" 这样的文本
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GradeValue {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for GradeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradeValue::Number(n) => write!(f, "{}", n),
            GradeValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for GradeValue {
    fn from(s: &str) -> Self {
        GradeValue::Text(s.to_string())
    }
}

impl From<i64> for GradeValue {
    fn from(n: i64) -> Self {
        GradeValue::Number(n.into())
    }
}

/// 单题评分结果，缺少的键保持为空
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradingResult {
    #[serde(
        default,
        deserialize_with = "lenient_grade",
        skip_serializing_if = "Option::is_none"
    )]
    pub grade: Option<GradeValue>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub reason: Option<String>,
}

/// 整页中的一道题
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub question: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub answer: String,
    #[serde(
        default,
        deserialize_with = "lenient_grade",
        skip_serializing_if = "Option::is_none"
    )]
    pub grade: Option<GradeValue>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub reason: Option<String>,
}

/// 整页识别的结果，保持模型给出的顺序
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredPage(pub Vec<PageEntry>);

impl StructuredPage {
    pub fn entries(&self) -> &[PageEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 诊断状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticStatus {
    /// 找到了分隔符，但内容不是合法 JSON
    ParseError,
    /// 文本中没有成对的分隔符
    NotFound,
}

impl fmt::Display for DiagnosticStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticStatus::ParseError => f.write_str("parse_error"),
            DiagnosticStatus::NotFound => f.write_str("not_found"),
        }
    }
}

/// 无法得到结构化内容时的诊断信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticResult {
    pub status: DiagnosticStatus,
    /// `not_found` 时是完整原文，`parse_error` 时是截取出的片段
    pub raw_text: String,
}

/// 一次归一化的结果，三者必居其一
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Normalized {
    Grading(GradingResult),
    Page(StructuredPage),
    Diagnostic(DiagnosticResult),
}

impl Normalized {
    pub fn is_diagnostic(&self) -> bool {
        matches!(self, Normalized::Diagnostic(_))
    }

    pub fn as_grading(&self) -> Option<&GradingResult> {
        match self {
            Normalized::Grading(result) => Some(result),
            _ => None,
        }
    }

    pub fn as_page(&self) -> Option<&StructuredPage> {
        match self {
            Normalized::Page(page) => Some(page),
            _ => None,
        }
    }

    pub fn as_diagnostic(&self) -> Option<&DiagnosticResult> {
        match self {
            Normalized::Diagnostic(diag) => Some(diag),
            _ => None,
        }
    }
}

/// 单个阶段的耗时
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageTiming {
    pub stage: StageKind,
    pub elapsed_ms: u64,
}

impl StageTiming {
    pub fn new(stage: StageKind, elapsed: Duration) -> Self {
        Self {
            stage,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}

/// 一次请求的完整输出
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeOutcome {
    /// 图片流程中识别出的文字
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcribed_answer: Option<String>,
    pub result: Normalized,
    pub timings: Vec<StageTiming>,
}

impl GradeOutcome {
    /// 所有阶段耗时之和
    pub fn total_elapsed_ms(&self) -> u64 {
        self.timings.iter().map(|t| t.elapsed_ms).sum()
    }
}

// ========== 宽松反序列化 ==========
// 模型经常把数字写成字符串、把字符串写成对象，这里一律接受，只有语法错误才算解析失败。

fn lenient_grade<'de, D>(deserializer: D) -> Result<Option<GradeValue>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = JsonValue::deserialize(deserializer)?;
    Ok(match value {
        JsonValue::Null => None,
        JsonValue::Number(n) => Some(GradeValue::Number(n)),
        JsonValue::String(s) => Some(GradeValue::Text(s)),
        other => Some(GradeValue::Text(other.to_string())),
    })
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = JsonValue::deserialize(deserializer)?;
    Ok(match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}
