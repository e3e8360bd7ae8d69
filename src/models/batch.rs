//! 批量评分的行模型
//!
//! 原始字段以 `ByteRecord` 保存，写回时逐字节不变；
//! 只有 `student_answer` 会被解码成文本交给流水线。

use csv::ByteRecord;
use serde::Serialize;

/// 输出中追加的三列
pub const RESULT_COLUMNS: [&str; 3] = ["llm_grade", "llm_reason", "processing_time_ms"];

/// 缺少答案时写入 `llm_grade` 的标记
pub const MISSING_DATA_MARKER: &str = "MISSING_DATA";

/// 模型调用失败或输出无法解析时写入 `llm_grade` 的标记
pub const ERROR_MARKER: &str = "ERROR";

/// 读入的一行
#[derive(Debug, Clone)]
pub struct BatchInput {
    /// 原始字段
    pub fields: ByteRecord,
    /// 解码后的学生答案，列缺失或为空白时为 `None`
    pub student_answer: Option<String>,
}

impl BatchInput {
    pub fn new(fields: ByteRecord, student_answer: Option<String>) -> Self {
        let student_answer = student_answer.filter(|a| !a.trim().is_empty());
        Self {
            fields,
            student_answer,
        }
    }
}

/// 一行的处理结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowOutcome {
    /// 正常评分
    Graded {
        grade: String,
        reason: String,
        processing_time_ms: u64,
    },
    /// 没有 `student_answer`，未调用模型
    MissingAnswer,
    /// 模型调用失败，或模型输出无法解析
    Failed {
        error: String,
        processing_time_ms: u64,
    },
}

impl RowOutcome {
    /// 追加到 CSV 的三列：`llm_grade`, `llm_reason`, `processing_time_ms`
    pub fn columns(&self) -> [String; 3] {
        match self {
            RowOutcome::Graded {
                grade,
                reason,
                processing_time_ms,
            } => [grade.clone(), reason.clone(), processing_time_ms.to_string()],
            RowOutcome::MissingAnswer => [
                MISSING_DATA_MARKER.to_string(),
                "student_answer 为空".to_string(),
                String::new(),
            ],
            RowOutcome::Failed {
                error,
                processing_time_ms,
            } => [
                ERROR_MARKER.to_string(),
                error.clone(),
                processing_time_ms.to_string(),
            ],
        }
    }

    pub fn is_graded(&self) -> bool {
        matches!(self, RowOutcome::Graded { .. })
    }
}

/// 输出的一行：原始字段 + 结果
#[derive(Debug, Clone)]
pub struct BatchRow {
    pub fields: ByteRecord,
    pub outcome: RowOutcome,
}

impl BatchRow {
    /// 原始字段补齐到 `width` 列后追加结果列
    pub fn to_record(&self, width: usize) -> ByteRecord {
        let mut record = self.fields.clone();
        while record.len() < width {
            record.push_field(b"");
        }
        for column in self.outcome.columns() {
            record.push_field(column.as_bytes());
        }
        record
    }
}

/// 批量统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub graded: usize,
    pub failed: usize,
    pub missing: usize,
}

impl BatchSummary {
    pub fn from_rows(rows: &[BatchRow]) -> Self {
        let mut summary = BatchSummary {
            total: rows.len(),
            ..Default::default()
        };
        for row in rows {
            match row.outcome {
                RowOutcome::Graded { .. } => summary.graded += 1,
                RowOutcome::MissingAnswer => summary.missing += 1,
                RowOutcome::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }
}
