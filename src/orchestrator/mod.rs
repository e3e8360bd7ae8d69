//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 创建推理客户端、检查就绪
//! - 对外提供四种评分操作
//!
//! ### `batch_runner` - CSV 批量评分
//! - 逐行调用评分流程，行级隔离
//! - 控制并发行数，保持输出顺序
//!
//! ## 层次关系
//!
//! ```text
//! app (四种操作)
//!     ↓
//! batch_runner (处理 Vec<BatchInput>)
//!     ↓
//! workflow::GradingFlow (处理单个请求)
//!     ↓
//! services (能力层：prompt_builder / response_normalizer)
//!     ↓
//! clients (推理服务：ModelInvoker)
//! ```

pub mod app;
pub mod batch_runner;

pub use app::App;
pub use batch_runner::BatchRunner;
