//! 批量评分 - 编排层
//!
//! ## 职责
//!
//! 逐行调用评分流程，把每一行的结果追加到原始字段之后。
//!
//! ## 行级隔离
//!
//! - 缺少 `student_answer` 的行标记为 `MISSING_DATA`，不调用模型
//! - 模型调用失败（超时、不可用）或输出无法解析的行标记为 `ERROR`
//! - 任何一行的问题都不会中止整批，输出行数与输入行数一致、顺序不变
//!
//! 题目和参考文本在整批开始之前校验一次，缺失时整批直接失败。

use futures::stream::{self, StreamExt};
use std::time::Instant;
use tracing::{info, warn};

use crate::error::Result;
use crate::models::batch::{BatchInput, BatchRow, BatchSummary, RowOutcome};
use crate::models::request::{normalize_criteria, validate_context};
use crate::models::result::Normalized;
use crate::utils::logging::{log_batch_start, print_batch_summary};
use crate::workflow::{GradingFlow, RequestCtx};

/// 批量评分器
#[derive(Debug, Clone)]
pub struct BatchRunner {
    flow: GradingFlow,
    max_concurrent_rows: usize,
}

impl BatchRunner {
    /// # 参数
    /// - `flow`: 评分流程
    /// - `max_concurrent_rows`: 同时处理的行数，1 表示逐行顺序处理
    pub fn new(flow: GradingFlow, max_concurrent_rows: usize) -> Self {
        Self {
            flow,
            max_concurrent_rows: max_concurrent_rows.max(1),
        }
    }

    /// 批量评分
    ///
    /// # 返回
    /// 与输入等长、同序的结果行
    pub async fn run_batch(
        &self,
        inputs: Vec<BatchInput>,
        question: &str,
        reference_text: &str,
        criteria: Option<&str>,
    ) -> Result<Vec<BatchRow>> {
        validate_context(question, reference_text)?;
        let criteria = normalize_criteria(criteria);
        let total = inputs.len();

        log_batch_start(total, self.max_concurrent_rows);

        // buffered 按输入顺序产出结果，并发只影响等待方式
        let rows: Vec<BatchRow> = stream::iter(inputs.into_iter().enumerate())
            .map(|(idx, input)| {
                let ctx = RequestCtx::row(idx + 1, total);
                self.process_row(input, ctx, question, reference_text, criteria)
            })
            .buffered(self.max_concurrent_rows)
            .collect()
            .await;

        print_batch_summary(&BatchSummary::from_rows(&rows));
        Ok(rows)
    }

    /// 处理单行，所有失败都收敛到该行的结果中
    async fn process_row(
        &self,
        input: BatchInput,
        ctx: RequestCtx,
        question: &str,
        reference_text: &str,
        criteria: Option<&str>,
    ) -> BatchRow {
        let BatchInput {
            fields,
            student_answer,
        } = input;

        let Some(answer) = student_answer else {
            warn!("{} ⚠️ 缺少 student_answer，跳过", ctx);
            return BatchRow {
                fields,
                outcome: RowOutcome::MissingAnswer,
            };
        };

        let started = Instant::now();
        let result = self
            .flow
            .grade_answer(question, reference_text, criteria, &answer, &ctx)
            .await;
        let processing_time_ms = started.elapsed().as_millis() as u64;

        let outcome = match result {
            Ok((Normalized::Grading(grading), _)) => RowOutcome::Graded {
                grade: grading.grade.map(|g| g.to_string()).unwrap_or_default(),
                reason: grading.reason.unwrap_or_default(),
                processing_time_ms,
            },
            Ok((Normalized::Diagnostic(diag), _)) => {
                warn!("{} ⚠️ 模型输出无法解析: {}", ctx, diag.status);
                RowOutcome::Failed {
                    error: format!("{}: {}", diag.status, diag.raw_text),
                    processing_time_ms,
                }
            }
            Ok((Normalized::Page(_), _)) => RowOutcome::Failed {
                error: "模型返回了数组而不是评分对象".to_string(),
                processing_time_ms,
            },
            Err(e) => RowOutcome::Failed {
                error: e.to_string(),
                processing_time_ms,
            },
        };

        if outcome.is_graded() {
            info!("{} ✅ 完成 ({}ms)", ctx, processing_time_ms);
        }

        BatchRow { fields, outcome }
    }
}
