//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：创建推理客户端并检查服务是否就绪
//! 2. **对外操作**：图片单题、整页、文本、CSV 批量四种评分
//! 3. **资源管理**：唯一持有 `ModelInvoker` 的地方，向下注入到流程层
//!
//! Web 层或 CLI 只需要调用这里的方法，把返回值序列化成 JSON 即可。

use std::path::Path;
use std::sync::Arc;

use crate::clients::{build_invoker, ModelInvoker};
use crate::config::Config;
use crate::error::Result;
use crate::models::batch::{BatchRow, BatchSummary};
use crate::models::loaders::{load_csv_file, parse_csv, save_csv_file, write_csv, CsvTable};
use crate::models::request::{validate_context, GradingRequest};
use crate::models::result::GradeOutcome;
use crate::orchestrator::batch_runner::BatchRunner;
use crate::utils::logging::log_startup;
use crate::workflow::{GradingFlow, RequestCtx};

/// 应用主结构
#[derive(Debug, Clone)]
pub struct App {
    config: Config,
    flow: GradingFlow,
    batch: BatchRunner,
}

impl App {
    /// 初始化应用：按配置创建客户端并做就绪检查
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate()?;
        log_startup(&config);

        let invoker = build_invoker(&config)?;
        invoker.check_ready().await?;

        Ok(Self::with_invoker(config, invoker))
    }

    /// 使用已有的客户端（测试或自定义后端）
    pub fn with_invoker(config: Config, invoker: Arc<dyn ModelInvoker>) -> Self {
        let flow = GradingFlow::new(invoker, config.stage_timeouts());
        let batch = BatchRunner::new(flow.clone(), config.max_concurrent_rows);
        Self {
            config,
            flow,
            batch,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 检查推理服务是否就绪
    pub async fn check_ready(&self) -> Result<()> {
        self.flow.invoker().check_ready().await
    }

    /// 手写单题评分
    pub async fn grade_from_image(&self, request: &GradingRequest) -> Result<GradeOutcome> {
        self.flow
            .grade_from_image(request, &RequestCtx::single("图片评分"))
            .await
    }

    /// 整页识别与拆分
    pub async fn grade_full_page(&self, request: &GradingRequest) -> Result<GradeOutcome> {
        self.flow
            .grade_full_page(request, &RequestCtx::single("整页评分"))
            .await
    }

    /// 文本答案评分
    pub async fn grade_from_text(&self, request: &GradingRequest) -> Result<GradeOutcome> {
        self.flow
            .grade_from_text(request, &RequestCtx::single("文本评分"))
            .await
    }

    /// CSV 批量评分（内存中）
    ///
    /// # 参数
    /// - `csv_data`: 上传的 CSV 原始字节
    ///
    /// # 返回
    /// 追加结果列后的 CSV 字节和统计信息
    pub async fn grade_batch_csv(
        &self,
        csv_data: &[u8],
        question: &str,
        reference_text: &str,
        criteria: Option<&str>,
    ) -> Result<(Vec<u8>, BatchSummary)> {
        validate_context(question, reference_text)?;
        let delimiter = self.config.delimiter_byte()?;

        let table = parse_csv(csv_data, delimiter)?;
        let rows = self
            .run_table(&table, question, reference_text, criteria)
            .await?;

        let output = write_csv(&table, &rows, delimiter)?;
        Ok((output, BatchSummary::from_rows(&rows)))
    }

    /// CSV 批量评分（文件）
    pub async fn grade_batch_file(
        &self,
        input: &Path,
        output: &Path,
        question: &str,
        reference_text: &str,
        criteria: Option<&str>,
    ) -> Result<BatchSummary> {
        validate_context(question, reference_text)?;
        let delimiter = self.config.delimiter_byte()?;

        let table = load_csv_file(input, delimiter).await?;
        let rows = self
            .run_table(&table, question, reference_text, criteria)
            .await?;

        save_csv_file(output, &table, &rows, delimiter).await?;
        Ok(BatchSummary::from_rows(&rows))
    }

    async fn run_table(
        &self,
        table: &CsvTable,
        question: &str,
        reference_text: &str,
        criteria: Option<&str>,
    ) -> Result<Vec<BatchRow>> {
        let inputs = table.to_inputs()?;
        self.batch
            .run_batch(inputs, question, reference_text, criteria)
            .await
    }
}
