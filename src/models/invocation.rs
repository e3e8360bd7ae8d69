//! 单次模型调用的输入与输出

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// 使用哪一个模型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// 视觉模型：把手写图片转成文字
    Vision,
    /// 文本模型：结构化与评分
    Text,
}

/// 流水线中的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Transcribe,
    Structure,
    Grade,
}

impl StageKind {
    /// 该阶段由哪个模型执行
    pub fn model(self) -> ModelKind {
        match self {
            StageKind::Transcribe => ModelKind::Vision,
            StageKind::Structure | StageKind::Grade => ModelKind::Text,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageKind::Transcribe => "识别",
            StageKind::Structure => "结构化",
            StageKind::Grade => "评分",
        };
        f.write_str(name)
    }
}

/// 一次模型调用的完整描述，构建后不可修改
#[derive(Debug, Clone)]
pub struct ModelCallSpec {
    model: ModelKind,
    prompt: String,
    image: Option<Vec<u8>>,
    timeout: Duration,
}

impl ModelCallSpec {
    pub fn new(model: ModelKind, prompt: impl Into<String>, timeout: Duration) -> Self {
        Self {
            model,
            prompt: prompt.into(),
            image: None,
            timeout,
        }
    }

    /// 附带图片
    pub fn with_image(mut self, image: impl Into<Vec<u8>>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn model(&self) -> ModelKind {
        self.model
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn image(&self) -> Option<&[u8]> {
        self.image.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// 模型返回的原始文本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawModelResponse {
    pub content: String,
    pub elapsed: Duration,
}
