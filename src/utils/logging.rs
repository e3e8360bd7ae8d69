/// 日志工具模块
///
/// 提供日志初始化和输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::batch::BatchSummary;

/// 初始化日志
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 `debug` 或 `info`。
/// 重复调用不会报错（测试中会多次初始化）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 评分服务启动 - 后端: {:?}", config.inference_backend);
    info!("👁️ 视觉模型: {}", config.vision_model_name);
    info!("📝 文本模型: {}", config.text_model_name);
    info!("{}", "=".repeat(60));
}

/// 记录批量开始信息
///
/// # 参数
/// - `total`: 行数
/// - `max_concurrent`: 最大并发行数
pub fn log_batch_start(total: usize, max_concurrent: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始批量评分: 共 {} 行", total);
    if max_concurrent > 1 {
        info!("📋 并发行数: {}（输出顺序不变）", max_concurrent);
    } else {
        info!("📋 逐行顺序处理");
    }
    info!("{}", "=".repeat(60));
}

/// 打印批量统计信息
pub fn print_batch_summary(summary: &BatchSummary) {
    info!("\n{}", "=".repeat(60));
    info!("📊 批量评分完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", summary.graded, summary.total);
    info!("❌ 失败: {}", summary.failed);
    info!("⚠️ 缺少答案: {}", summary.missing);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
