/// Ollama API 客户端
///
/// 调用 Ollama 原生 `/api/chat` 接口，图片以 base64 放在消息的 `images` 字段中。
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{map_request_error, run_with_timeout, ModelInvoker, ModelNames};
use crate::config::Config;
use crate::error::{GradeError, Result};
use crate::models::invocation::{ModelCallSpec, ModelKind, RawModelResponse};
use crate::utils::logging::truncate_text;

const READINESS_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}

/// Ollama 客户端
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    models: ModelNames,
}

impl OllamaClient {
    /// 创建新的 Ollama 客户端
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_base_url(&config.ollama_api_url, ModelNames::from_config(config))
    }

    /// 使用自定义地址创建
    pub fn with_base_url(base_url: impl Into<String>, models: ModelNames) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| GradeError::Config(format!("无法创建 HTTP 客户端: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            models,
        })
    }

    async fn send_chat(&self, model: &str, spec: &ModelCallSpec) -> Result<String> {
        let images = spec
            .image()
            .map(|bytes| vec![general_purpose::STANDARD.encode(bytes)]);

        let request = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: spec.prompt(),
                images,
            }],
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| map_request_error(model, spec.timeout(), e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Ollama 返回错误状态 {} (模型: {})", status, model);
            return Err(GradeError::unavailable(
                model,
                format!("HTTP {}: {}", status, truncate_text(&body, 200)),
            ));
        }

        let envelope: ChatResponse = response
            .json()
            .await
            .map_err(|e| map_request_error(model, spec.timeout(), e))?;

        Ok(envelope.message.content)
    }
}

#[async_trait]
impl ModelInvoker for OllamaClient {
    async fn invoke(&self, spec: &ModelCallSpec) -> Result<RawModelResponse> {
        let model = self.models.get(spec.model());
        debug!(
            "调用 Ollama，模型: {}，提示词长度: {} 字符，图片: {}",
            model,
            spec.prompt().len(),
            spec.image().map_or(0, |b| b.len())
        );

        let response = run_with_timeout(model, spec.timeout(), self.send_chat(model, spec)).await?;

        debug!(
            "✓ Ollama 调用成功 (模型: {}, 耗时: {}ms)",
            model,
            response.elapsed.as_millis()
        );
        Ok(response)
    }

    async fn check_ready(&self) -> Result<()> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(READINESS_TIMEOUT)
            .send()
            .await
            .map_err(|e| map_request_error("ollama", READINESS_TIMEOUT, e))?;

        if !response.status().is_success() {
            return Err(GradeError::unavailable(
                "ollama",
                format!("HTTP {}", response.status()),
            ));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| GradeError::unavailable("ollama", e))?;

        for kind in [ModelKind::Vision, ModelKind::Text] {
            let name = self.models.get(kind);
            // 未写标签的模型名在 Ollama 中以 `:latest` 列出
            let listed = tags
                .models
                .iter()
                .any(|m| m.name == name || m.name.strip_suffix(":latest") == Some(name));
            if !listed {
                warn!("⚠️ Ollama 中没有找到模型 {}，首次调用时可能失败", name);
            }
        }

        info!("✓ Ollama 已就绪: {} 个模型可用", tags.models.len());
        Ok(())
    }

    fn model_name(&self, kind: ModelKind) -> &str {
        self.models.get(kind)
    }
}
