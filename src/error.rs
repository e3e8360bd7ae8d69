//! 错误类型
//!
//! 按照传播方式划分：
//! - `InputValidation`：调用模型之前就失败，没有任何副作用
//! - `ModelUnavailable` / `ModelTimeout`：推理服务不可达或太慢，终止当前请求（或当前行），不重试
//! - 模型返回了无法解析的内容 **不是** 错误，见 `models::result::Normalized::Diagnostic`

use std::time::Duration;
use thiserror::Error;

/// 评分流水线错误
#[derive(Debug, Error)]
pub enum GradeError {
    /// 缺少必填字段
    #[error("缺少必填字段: {field}")]
    InputValidation { field: &'static str },

    /// 推理服务不可达，或返回了非成功状态
    #[error("模型服务不可用 (模型: {model}): {reason}")]
    ModelUnavailable { model: String, reason: String },

    /// 超过阶段超时时间
    #[error("模型调用超时 (模型: {model}, 超时: {timeout:?})")]
    ModelTimeout { model: String, timeout: Duration },

    /// CSV 读写失败
    #[error("CSV 处理失败: {0}")]
    Csv(#[from] csv::Error),

    /// 文件读写失败
    #[error("文件操作失败: {0}")]
    Io(#[from] std::io::Error),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),
}

impl GradeError {
    /// 创建缺少字段错误
    pub fn missing(field: &'static str) -> Self {
        GradeError::InputValidation { field }
    }

    /// 创建模型不可用错误
    pub fn unavailable(model: impl Into<String>, reason: impl ToString) -> Self {
        GradeError::ModelUnavailable {
            model: model.into(),
            reason: reason.to_string(),
        }
    }

    /// 创建模型超时错误
    pub fn timeout(model: impl Into<String>, timeout: Duration) -> Self {
        GradeError::ModelTimeout {
            model: model.into(),
            timeout,
        }
    }

    /// 是否应当以"服务不可用"(503) 的形式返回给调用方
    pub fn is_service_unavailable(&self) -> bool {
        matches!(
            self,
            GradeError::ModelUnavailable { .. } | GradeError::ModelTimeout { .. }
        )
    }

    /// 是否是调用方输入的问题 (400)
    pub fn is_input_error(&self) -> bool {
        matches!(self, GradeError::InputValidation { .. })
    }
}

impl From<toml::de::Error> for GradeError {
    fn from(err: toml::de::Error) -> Self {
        GradeError::Config(err.to_string())
    }
}

/// 评分流水线结果类型
pub type Result<T> = std::result::Result<T, GradeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(GradeError::timeout("llava", Duration::from_secs(5)).is_service_unavailable());
        assert!(GradeError::unavailable("llava", "connection refused").is_service_unavailable());
        assert!(GradeError::missing("question").is_input_error());
        assert!(!GradeError::missing("question").is_service_unavailable());
    }

    #[test]
    fn test_error_display_mentions_model() {
        let err = GradeError::timeout("llama3.2-vision:11b", Duration::from_secs(90));
        let msg = err.to_string();
        assert!(msg.contains("llama3.2-vision:11b"));
        assert!(msg.contains("90s"));
    }
}
