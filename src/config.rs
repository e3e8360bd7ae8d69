use crate::error::{GradeError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 推理后端类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceBackend {
    /// Ollama 原生 `/api/chat`
    Ollama,
    /// 兼容 OpenAI 的 chat completions 接口
    OpenAi,
}

impl std::str::FromStr for InferenceBackend {
    type Err = GradeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(InferenceBackend::Ollama),
            "openai" => Ok(InferenceBackend::OpenAi),
            other => Err(GradeError::Config(format!("未知的推理后端: {}", other))),
        }
    }
}

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 推理后端
    pub inference_backend: InferenceBackend,
    /// Ollama 服务地址
    pub ollama_api_url: String,
    // --- OpenAI 兼容接口配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    // --- 模型 ---
    /// 手写识别使用的视觉模型
    pub vision_model_name: String,
    /// 评分使用的文本模型
    pub text_model_name: String,
    // --- 各阶段超时（秒） ---
    pub transcribe_timeout_secs: u64,
    /// 整页识别的图片更大，单独设置
    pub full_page_timeout_secs: u64,
    pub structure_timeout_secs: u64,
    pub grade_timeout_secs: u64,
    // --- 批量 ---
    /// CSV 分隔符
    pub csv_delimiter: char,
    /// 同时评分的行数，1 表示严格顺序执行
    pub max_concurrent_rows: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inference_backend: InferenceBackend::Ollama,
            ollama_api_url: "http://localhost:11434".to_string(),
            llm_api_key: String::new(),
            llm_api_base_url: "http://localhost:11434/v1".to_string(),
            vision_model_name: "llama3.2-vision:11b".to_string(),
            text_model_name: "llama-3p1-8b".to_string(),
            transcribe_timeout_secs: 90,
            full_page_timeout_secs: 180,
            structure_timeout_secs: 60,
            grade_timeout_secs: 60,
            csv_delimiter: ';',
            max_concurrent_rows: 1,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 默认值 → TOML 文件（可选）→ 环境变量，后者覆盖前者
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        let config = base.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn with_env_overrides(self) -> Self {
        Self {
            inference_backend: env_parse("INFERENCE_BACKEND").unwrap_or(self.inference_backend),
            ollama_api_url: std::env::var("OLLAMA_API_URL").unwrap_or(self.ollama_api_url),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(self.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            vision_model_name: std::env::var("VISION_MODEL_NAME").unwrap_or(self.vision_model_name),
            text_model_name: std::env::var("TEXT_MODEL_NAME").unwrap_or(self.text_model_name),
            transcribe_timeout_secs: env_parse("TRANSCRIBE_TIMEOUT_SECS").unwrap_or(self.transcribe_timeout_secs),
            full_page_timeout_secs: env_parse("FULL_PAGE_TIMEOUT_SECS").unwrap_or(self.full_page_timeout_secs),
            structure_timeout_secs: env_parse("STRUCTURE_TIMEOUT_SECS").unwrap_or(self.structure_timeout_secs),
            grade_timeout_secs: env_parse("GRADE_TIMEOUT_SECS").unwrap_or(self.grade_timeout_secs),
            csv_delimiter: env_parse("CSV_DELIMITER").unwrap_or(self.csv_delimiter),
            max_concurrent_rows: env_parse("MAX_CONCURRENT_ROWS").unwrap_or(self.max_concurrent_rows),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
        }
    }

    /// 检查配置是否可用
    pub fn validate(&self) -> Result<()> {
        self.delimiter_byte()?;
        if self.max_concurrent_rows == 0 {
            return Err(GradeError::Config("max_concurrent_rows 不能为 0".to_string()));
        }
        let timeouts = [
            self.transcribe_timeout_secs,
            self.full_page_timeout_secs,
            self.structure_timeout_secs,
            self.grade_timeout_secs,
        ];
        if timeouts.contains(&0) {
            return Err(GradeError::Config("超时时间不能为 0".to_string()));
        }
        Ok(())
    }

    /// CSV 分隔符（字节形式），非 ASCII 字符报配置错误
    pub fn delimiter_byte(&self) -> Result<u8> {
        if !self.csv_delimiter.is_ascii() {
            return Err(GradeError::Config(format!(
                "CSV 分隔符必须是 ASCII 字符: {:?}",
                self.csv_delimiter
            )));
        }
        Ok(self.csv_delimiter as u8)
    }

    pub fn stage_timeouts(&self) -> StageTimeouts {
        StageTimeouts {
            transcribe: Duration::from_secs(self.transcribe_timeout_secs),
            full_page: Duration::from_secs(self.full_page_timeout_secs),
            structure: Duration::from_secs(self.structure_timeout_secs),
            grade: Duration::from_secs(self.grade_timeout_secs),
        }
    }
}

/// 各阶段的超时时间
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageTimeouts {
    pub transcribe: Duration,
    pub full_page: Duration,
    pub structure: Duration,
    pub grade: Duration,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Config::default().stage_timeouts()
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.delimiter_byte().unwrap(), b';');
        assert_eq!(config.inference_backend, InferenceBackend::Ollama);
    }

    #[test]
    fn test_toml_overrides_only_given_keys() {
        let config = Config::from_toml_str(
            r#"
            inference_backend = "openai"
            text_model_name = "qwen2.5:7b"
            grade_timeout_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.inference_backend, InferenceBackend::OpenAi);
        assert_eq!(config.text_model_name, "qwen2.5:7b");
        assert_eq!(config.stage_timeouts().grade, Duration::from_secs(30));
        // 未出现的键保持默认值
        assert_eq!(config.vision_model_name, "llama3.2-vision:11b");
        assert_eq!(config.csv_delimiter, ';');
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Config::from_toml_str("grade_timeout_secs = \"soon\"").unwrap_err();
        assert!(matches!(err, GradeError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let config = Config {
            max_concurrent_rows: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_ascii_delimiter_is_config_error() {
        // 'é' 的码位小于 256，不能直接截成一个字节
        let config = Config {
            csv_delimiter: 'é',
            ..Config::default()
        };
        assert!(matches!(config.delimiter_byte(), Err(GradeError::Config(_))));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("Ollama".parse::<InferenceBackend>().unwrap(), InferenceBackend::Ollama);
        assert_eq!("openai".parse::<InferenceBackend>().unwrap(), InferenceBackend::OpenAi);
        assert!("llamacpp".parse::<InferenceBackend>().is_err());
    }
}
