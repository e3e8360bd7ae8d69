//! 评分流程 - 流程层
//!
//! 核心职责：定义"一个请求"的完整处理流程
//!
//! 每个阶段都是 提示词构建 → 模型调用 → 输出归一化，阶段之间严格串行：
//! 1. 图片单题：识别 → 评分
//! 2. 整页：识别（整页超时）→ 结构化
//! 3. 文本：评分
//!
//! 任一阶段的模型调用失败都会中止后续阶段，不返回部分结果。
//! 输出无法解析不算失败，诊断信息作为结果返回。

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::clients::ModelInvoker;
use crate::config::StageTimeouts;
use crate::error::Result;
use crate::models::invocation::{ModelCallSpec, StageKind};
use crate::models::request::GradingRequest;
use crate::models::result::{GradeOutcome, Normalized, StageTiming};
use crate::services::prompt_builder::{self, StagePrompt};
use crate::services::response_normalizer::{normalize_grading, normalize_page};
use crate::utils::logging::truncate_text;
use crate::workflow::request_ctx::RequestCtx;

/// 评分流程
///
/// - 编排各请求类型的阶段顺序
/// - 不持有任何可变状态，可在多个请求之间共享
/// - 只依赖注入的 `ModelInvoker`
#[derive(Debug, Clone)]
pub struct GradingFlow {
    invoker: Arc<dyn ModelInvoker>,
    timeouts: StageTimeouts,
}

impl GradingFlow {
    /// 创建新的评分流程
    pub fn new(invoker: Arc<dyn ModelInvoker>, timeouts: StageTimeouts) -> Self {
        Self { invoker, timeouts }
    }

    pub fn invoker(&self) -> &Arc<dyn ModelInvoker> {
        &self.invoker
    }

    /// 手写单题：识别图片后按识别文本评分
    ///
    /// # 返回
    /// 识别文本、评分结果（或诊断信息）以及两个阶段的耗时
    pub async fn grade_from_image(
        &self,
        request: &GradingRequest,
        ctx: &RequestCtx,
    ) -> Result<GradeOutcome> {
        request.validate()?;
        let image = request.image()?;
        info!("{} 📷 开始识别手写答案 ({} 字节)", ctx, image.len());

        let (transcript, transcribe_timing) = self
            .run_stage(
                &StagePrompt::Transcribe { full_page: false },
                Some(image),
                self.timeouts.transcribe,
                ctx,
            )
            .await?;

        if transcript.is_empty() {
            warn!("{} ⚠️ 识别结果为空，仍继续评分", ctx);
        }

        let (result, grade_timing) = self
            .grade_answer(
                &request.question,
                &request.reference_text,
                request.criteria(),
                &transcript,
                ctx,
            )
            .await?;

        Ok(GradeOutcome {
            transcribed_answer: Some(transcript),
            result,
            timings: vec![transcribe_timing, grade_timing],
        })
    }

    /// 整页：识别整页后拆分成题目/答案对
    ///
    /// 题目和参考文本作为试卷上下文放入结构化提示词；
    /// 结构化阶段不评分，`grade`/`reason` 只有模型主动给出时才有值。
    pub async fn grade_full_page(
        &self,
        request: &GradingRequest,
        ctx: &RequestCtx,
    ) -> Result<GradeOutcome> {
        request.validate()?;
        let image = request.image()?;
        info!("{} 📄 开始识别整页 ({} 字节)", ctx, image.len());

        let (transcript, transcribe_timing) = self
            .run_stage(
                &StagePrompt::Transcribe { full_page: true },
                Some(image),
                self.timeouts.full_page,
                ctx,
            )
            .await?;

        let (raw, structure_timing) = self
            .run_stage(
                &StagePrompt::Structure {
                    transcript: &transcript,
                    question: &request.question,
                    reference_text: &request.reference_text,
                },
                None,
                self.timeouts.structure,
                ctx,
            )
            .await?;

        let result = normalize_page(&raw);
        match &result {
            Normalized::Page(page) => info!("{} ✓ 整页拆分出 {} 道题", ctx, page.len()),
            Normalized::Diagnostic(diag) => warn!("{} ⚠️ 整页结构无法解析: {}", ctx, diag.status),
            Normalized::Grading(_) => {}
        }

        Ok(GradeOutcome {
            transcribed_answer: Some(transcript),
            result,
            timings: vec![transcribe_timing, structure_timing],
        })
    }

    /// 文本答案：直接评分
    pub async fn grade_from_text(
        &self,
        request: &GradingRequest,
        ctx: &RequestCtx,
    ) -> Result<GradeOutcome> {
        request.validate()?;
        let answer = request.answer_text()?;

        let (result, grade_timing) = self
            .grade_answer(
                &request.question,
                &request.reference_text,
                request.criteria(),
                answer,
                ctx,
            )
            .await?;

        Ok(GradeOutcome {
            transcribed_answer: None,
            result,
            timings: vec![grade_timing],
        })
    }

    /// 评分阶段（文本流程、图片流程第二步、批量每一行共用）
    ///
    /// 不做字段校验，调用方负责
    pub async fn grade_answer(
        &self,
        question: &str,
        reference_text: &str,
        criteria: Option<&str>,
        answer: &str,
        ctx: &RequestCtx,
    ) -> Result<(Normalized, StageTiming)> {
        let (raw, timing) = self
            .run_stage(
                &StagePrompt::Grade {
                    reference_text,
                    question,
                    criteria,
                    answer,
                },
                None,
                self.timeouts.grade,
                ctx,
            )
            .await?;

        let result = normalize_grading(&raw);
        if let Some(grading) = result.as_grading() {
            info!(
                "{} ✓ 评分: {}",
                ctx,
                grading
                    .grade
                    .as_ref()
                    .map_or_else(|| "(无)".to_string(), |g| g.to_string())
            );
        }
        Ok((result, timing))
    }

    /// 执行一个阶段：构建提示词并调用模型
    ///
    /// # 返回
    /// 模型原始文本和该阶段耗时
    async fn run_stage(
        &self,
        stage: &StagePrompt<'_>,
        image: Option<&[u8]>,
        timeout: Duration,
        ctx: &RequestCtx,
    ) -> Result<(String, StageTiming)> {
        let kind = stage.kind();
        let mut spec = ModelCallSpec::new(kind.model(), prompt_builder::build(stage), timeout);
        if let Some(bytes) = image {
            spec = spec.with_image(bytes);
        }

        let model = self.invoker.model_name(kind.model());
        debug!("{} ▶ {}阶段 (模型: {}, 超时: {:?})", ctx, kind, model, timeout);

        match self.invoker.invoke(&spec).await {
            Ok(response) => {
                info!(
                    "{} ✓ {}完成 (耗时: {}ms)",
                    ctx,
                    kind,
                    response.elapsed.as_millis()
                );
                debug!("{} 模型输出: {}", ctx, truncate_text(&response.content, 120));
                Ok((response.content, StageTiming::new(kind, response.elapsed)))
            }
            Err(e) => {
                error!("{} ❌ {}阶段失败: {}", ctx, kind, e);
                Err(e)
            }
        }
    }
}
