//! 兼容 OpenAI 接口的客户端
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 chat completions 调用
//! - 兼容 OpenAI API 的服务（vLLM、Ollama 的 `/v1`、网关等）
//! - 图片以 `data:` URL（base64）形式放入用户消息

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestUserMessageArgs,
        ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart,
        CreateChatCompletionRequestArgs, ImageDetail, ImageUrl,
    },
    Client,
};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{image_mime, map_request_error, run_with_timeout, ModelInvoker, ModelNames};
use crate::config::Config;
use crate::error::{GradeError, Result};
use crate::models::invocation::{ModelCallSpec, ModelKind, RawModelResponse};

const READINESS_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

/// OpenAI 兼容客户端
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    http: reqwest::Client,
    api_base_url: String,
    api_key: String,
    models: ModelNames,
}

impl OpenAiClient {
    /// 创建新的客户端
    pub fn new(config: &Config) -> Result<Self> {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| GradeError::Config(format!("无法创建 HTTP 客户端: {}", e)))?;

        Ok(Self {
            client: Client::with_config(openai_config),
            http,
            api_base_url: config.llm_api_base_url.trim_end_matches('/').to_string(),
            api_key: config.llm_api_key.clone(),
            models: ModelNames::from_config(config),
        })
    }

    /// 构建用户消息；有图片时使用多段内容
    fn build_user_message(spec: &ModelCallSpec) -> Result<ChatCompletionRequestMessage> {
        let content = match spec.image() {
            Some(bytes) => {
                let data_url = format!(
                    "data:{};base64,{}",
                    image_mime(bytes),
                    general_purpose::STANDARD.encode(bytes)
                );
                ChatCompletionRequestUserMessageContent::Array(vec![
                    ChatCompletionRequestUserMessageContentPart::Text(
                        ChatCompletionRequestMessageContentPartText {
                            text: spec.prompt().to_string(),
                        },
                    ),
                    ChatCompletionRequestUserMessageContentPart::ImageUrl(
                        ChatCompletionRequestMessageContentPartImage {
                            image_url: ImageUrl {
                                url: data_url,
                                detail: Some(ImageDetail::High),
                            },
                        },
                    ),
                ])
            }
            None => ChatCompletionRequestUserMessageContent::Text(spec.prompt().to_string()),
        };

        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()
            .map_err(|e| GradeError::Config(format!("无法构建请求消息: {}", e)))?;

        Ok(ChatCompletionRequestMessage::User(message))
    }

    /// 配置的模型中不在 `/models` 列表里的
    fn unlisted_models(&self, list: &ModelList) -> Vec<&str> {
        [ModelKind::Vision, ModelKind::Text]
            .into_iter()
            .map(|kind| self.models.get(kind))
            .filter(|name| !list.data.iter().any(|m| m.id == *name))
            .collect()
    }

    async fn send_chat(&self, model: &str, spec: &ModelCallSpec) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(vec![Self::build_user_message(spec)?])
            .temperature(0.2)
            .build()
            .map_err(|e| GradeError::Config(format!("无法构建请求: {}", e)))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败 (模型: {}): {}", model, e);
            GradeError::unavailable(model, e)
        })?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| GradeError::unavailable(model, "LLM 返回内容为空"))
    }
}

#[async_trait]
impl ModelInvoker for OpenAiClient {
    async fn invoke(&self, spec: &ModelCallSpec) -> Result<RawModelResponse> {
        let model = self.models.get(spec.model());
        debug!(
            "调用 LLM API，模型: {}，提示词长度: {} 字符",
            model,
            spec.prompt().len()
        );

        let response = run_with_timeout(model, spec.timeout(), self.send_chat(model, spec)).await?;

        debug!("✓ LLM API 调用成功 (耗时: {}ms)", response.elapsed.as_millis());
        Ok(response)
    }

    async fn check_ready(&self) -> Result<()> {
        let mut request = self
            .http
            .get(format!("{}/models", self.api_base_url))
            .timeout(READINESS_TIMEOUT);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_request_error("openai", READINESS_TIMEOUT, e))?;

        if !response.status().is_success() {
            return Err(GradeError::unavailable(
                "openai",
                format!("HTTP {}", response.status()),
            ));
        }

        let list: ModelList = response
            .json()
            .await
            .map_err(|e| GradeError::unavailable("openai", e))?;

        for name in self.unlisted_models(&list) {
            warn!("⚠️ LLM API 中没有列出模型 {}，首次调用时可能失败", name);
        }

        info!(
            "✓ LLM API 已就绪: {} ({} 个模型可用)",
            self.api_base_url,
            list.data.len()
        );
        Ok(())
    }

    fn model_name(&self, kind: ModelKind) -> &str {
        self.models.get(kind)
    }
}
