//! # Exam Grader
//!
//! 调用视觉模型和文本模型为试卷答案评分的 Rust 库
//!
//! ## 架构设计
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 推理服务的唯一出口，实现 `ModelInvoker`
//! - `OllamaClient` - Ollama `/api/chat`
//! - `OpenAiClient` - 兼容 OpenAI 的 chat completions
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 纯函数，不做 IO
//! - `prompt_builder` - 识别 / 结构化 / 评分三种提示词
//! - `response_normalizer` - 从模型的自由文本中取出 JSON
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个请求"的阶段顺序
//! - `RequestCtx` - 日志上下文（操作名或行号）
//! - `GradingFlow` - 识别 → 评分 / 识别 → 结构化 / 评分
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 应用入口，持有客户端
//! - `orchestrator/batch_runner` - CSV 批量评分，行级隔离
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{build_invoker, ModelInvoker, OllamaClient, OpenAiClient};
pub use config::{Config, InferenceBackend, StageTimeouts};
pub use error::{GradeError, Result};
pub use models::{
    BatchRow, BatchSummary, GradeOutcome, GradingRequest, Normalized, RowOutcome,
};
pub use orchestrator::{App, BatchRunner};
pub use workflow::{GradingFlow, RequestCtx};
