//! 推理服务客户端
//!
//! 所有客户端都实现 `ModelInvoker`，由调用方显式构造后注入流水线，
//! 不存在进程级的全局模型状态。

pub mod ollama_client;
pub mod openai_client;

pub use ollama_client::OllamaClient;
pub use openai_client::OpenAiClient;

use async_trait::async_trait;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{Config, InferenceBackend};
use crate::error::{GradeError, Result};
use crate::models::invocation::{ModelCallSpec, ModelKind, RawModelResponse};

/// 模型调用能力
///
/// 一次 `invoke` 对应一次对外请求，不做任何重试。
#[async_trait]
pub trait ModelInvoker: Send + Sync + Debug {
    /// 发送提示词（及可选图片），返回模型原始文本
    ///
    /// - 服务不可达或返回非成功状态：`GradeError::ModelUnavailable`
    /// - 超过 `spec.timeout()`：`GradeError::ModelTimeout`
    async fn invoke(&self, spec: &ModelCallSpec) -> Result<RawModelResponse>;

    /// 检查推理服务是否就绪
    async fn check_ready(&self) -> Result<()>;

    /// 模型类型对应的模型名称（用于日志与错误信息）
    fn model_name(&self, kind: ModelKind) -> &str;
}

/// 视觉模型与文本模型的名称
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelNames {
    pub vision: String,
    pub text: String,
}

impl ModelNames {
    pub fn from_config(config: &Config) -> Self {
        Self {
            vision: config.vision_model_name.clone(),
            text: config.text_model_name.clone(),
        }
    }

    pub fn get(&self, kind: ModelKind) -> &str {
        match kind {
            ModelKind::Vision => &self.vision,
            ModelKind::Text => &self.text,
        }
    }
}

/// 根据配置创建客户端
pub fn build_invoker(config: &Config) -> Result<Arc<dyn ModelInvoker>> {
    let invoker: Arc<dyn ModelInvoker> = match config.inference_backend {
        InferenceBackend::Ollama => Arc::new(OllamaClient::new(config)?),
        InferenceBackend::OpenAi => Arc::new(OpenAiClient::new(config)?),
    };
    Ok(invoker)
}

/// 带超时执行一次调用并计时
pub(crate) async fn run_with_timeout<F>(
    model: &str,
    timeout: Duration,
    call: F,
) -> Result<RawModelResponse>
where
    F: Future<Output = Result<String>>,
{
    let started = Instant::now();
    let content = tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| GradeError::timeout(model, timeout))??;

    Ok(RawModelResponse {
        content: content.trim().to_string(),
        elapsed: started.elapsed(),
    })
}

/// 把 reqwest 错误映射为不可用或超时
pub(crate) fn map_request_error(model: &str, timeout: Duration, err: reqwest::Error) -> GradeError {
    if err.is_timeout() {
        GradeError::timeout(model, timeout)
    } else {
        GradeError::unavailable(model, err)
    }
}

/// 根据文件头推断图片 MIME 类型，无法识别时按 JPEG 处理
pub fn image_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_mime_sniffing() {
        assert_eq!(image_mime(&[0x89, b'P', b'N', b'G', 0x0D]), "image/png");
        assert_eq!(image_mime(&[0xFF, 0xD8, 0xFF]), "image/jpeg");
        assert_eq!(image_mime(b"GIF89a"), "image/gif");
        assert_eq!(image_mime(b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
        assert_eq!(image_mime(b""), "image/jpeg");
    }

    #[test]
    fn test_model_names_lookup() {
        let names = ModelNames::from_config(&Config::default());
        assert_eq!(names.get(ModelKind::Vision), "llama3.2-vision:11b");
        assert_eq!(names.get(ModelKind::Text), "llama-3p1-8b");
    }

    #[tokio::test]
    async fn test_run_with_timeout_elapses() {
        let err = run_with_timeout("slow-model", Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".to_string())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, GradeError::ModelTimeout { .. }));
    }

    #[tokio::test]
    async fn test_run_with_timeout_trims_content() {
        let response = run_with_timeout("fast-model", Duration::from_secs(1), async {
            Ok("  merhaba \n".to_string())
        })
        .await
        .unwrap();
        assert_eq!(response.content, "merhaba");
    }
}
