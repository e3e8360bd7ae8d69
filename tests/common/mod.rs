//! 测试共用的工具
#![allow(dead_code)]

use async_trait::async_trait;
use exam_grader::clients::ModelInvoker;
use exam_grader::error::{GradeError, Result};
use exam_grader::models::{ModelCallSpec, ModelKind, RawModelResponse};
use exam_grader::Config;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

pub fn setup_tracing() {
    exam_grader::utils::logging::init(true);
}

type Responder = Box<dyn Fn(&ModelCallSpec) -> Result<String> + Send + Sync>;
type DelayFn = Box<dyn Fn(&ModelCallSpec) -> Duration + Send + Sync>;

/// 按脚本应答的模型，记录收到的每一次调用
pub struct ScriptedInvoker {
    queue: Mutex<VecDeque<Result<String>>>,
    responder: Option<Responder>,
    delay: Option<DelayFn>,
    calls: Mutex<Vec<ModelCallSpec>>,
}

impl ScriptedInvoker {
    /// 依次返回给定的结果，用完后报不可用
    pub fn sequence(responses: Vec<Result<String>>) -> Self {
        Self {
            queue: Mutex::new(responses.into()),
            responder: None,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 所有调用都返回同一段文本
    pub fn always(content: &str) -> Self {
        let content = content.to_string();
        Self::responding(move |_| Ok(content.clone()))
    }

    /// 根据调用内容决定结果
    pub fn responding<F>(responder: F) -> Self
    where
        F: Fn(&ModelCallSpec) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            queue: Mutex::new(VecDeque::new()),
            responder: Some(Box::new(responder)),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 每次调用前先等待
    pub fn with_delay<F>(mut self, delay: F) -> Self
    where
        F: Fn(&ModelCallSpec) -> Duration + Send + Sync + 'static,
    {
        self.delay = Some(Box::new(delay));
        self
    }

    pub fn calls(&self) -> Vec<ModelCallSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl fmt::Debug for ScriptedInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedInvoker")
            .field("calls", &self.call_count())
            .finish()
    }
}

#[async_trait]
impl ModelInvoker for ScriptedInvoker {
    async fn invoke(&self, spec: &ModelCallSpec) -> Result<RawModelResponse> {
        self.calls.lock().unwrap().push(spec.clone());

        if let Some(delay) = &self.delay {
            tokio::time::sleep(delay(spec)).await;
        }

        let content = match &self.responder {
            Some(responder) => responder(spec)?,
            None => self
                .queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GradeError::unavailable("scripted", "脚本已用完")))?,
        };

        Ok(RawModelResponse {
            content,
            elapsed: Duration::from_millis(5),
        })
    }

    async fn check_ready(&self) -> Result<()> {
        Ok(())
    }

    fn model_name(&self, kind: ModelKind) -> &str {
        match kind {
            ModelKind::Vision => "scripted-vision",
            ModelKind::Text => "scripted-text",
        }
    }
}

/// 测试用配置：超时很短
pub fn test_config() -> Config {
    Config {
        transcribe_timeout_secs: 5,
        full_page_timeout_secs: 7,
        structure_timeout_secs: 3,
        grade_timeout_secs: 2,
        ..Config::default()
    }
}
