use crate::error::{GradeError, Result};

/// 学生答案的来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerSource {
    /// 已经是文本（键盘输入或 CSV）
    Text(String),
    /// 手写答案的图片原始字节
    Image(Vec<u8>),
}

impl AnswerSource {
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerSource::Text(text) => text.trim().is_empty(),
            AnswerSource::Image(bytes) => bytes.is_empty(),
        }
    }

    /// 校验时使用的字段名
    fn field_name(&self) -> &'static str {
        match self {
            AnswerSource::Text(_) => "student_answer",
            AnswerSource::Image(_) => "image",
        }
    }
}

/// 一次评分请求
///
/// `question`、`reference_text` 和非空的答案来源是必填项；
/// `criteria` 可选，缺省时只改变提示词的措辞，不改变流程。
#[derive(Debug, Clone)]
pub struct GradingRequest {
    pub question: String,
    pub reference_text: String,
    pub criteria: Option<String>,
    pub student_answer: AnswerSource,
}

impl GradingRequest {
    /// 文本答案请求
    pub fn from_text(
        question: impl Into<String>,
        reference_text: impl Into<String>,
        criteria: Option<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            reference_text: reference_text.into(),
            criteria,
            student_answer: AnswerSource::Text(answer.into()),
        }
    }

    /// 图片答案请求
    pub fn from_image(
        question: impl Into<String>,
        reference_text: impl Into<String>,
        criteria: Option<String>,
        image: Vec<u8>,
    ) -> Self {
        Self {
            question: question.into(),
            reference_text: reference_text.into(),
            criteria,
            student_answer: AnswerSource::Image(image),
        }
    }

    /// 评分标准；空白字符串视为未提供
    pub fn criteria(&self) -> Option<&str> {
        normalize_criteria(self.criteria.as_deref())
    }

    /// 在任何模型调用之前校验必填字段
    pub fn validate(&self) -> Result<()> {
        validate_context(&self.question, &self.reference_text)?;
        if self.student_answer.is_empty() {
            return Err(GradeError::missing(self.student_answer.field_name()));
        }
        Ok(())
    }

    /// 取出图片字节，答案不是图片时报缺少 `image`
    pub fn image(&self) -> Result<&[u8]> {
        match &self.student_answer {
            AnswerSource::Image(bytes) => Ok(bytes),
            AnswerSource::Text(_) => Err(GradeError::missing("image")),
        }
    }

    /// 取出文本答案，答案不是文本时报缺少 `student_answer`
    pub fn answer_text(&self) -> Result<&str> {
        match &self.student_answer {
            AnswerSource::Text(text) => Ok(text),
            AnswerSource::Image(_) => Err(GradeError::missing("student_answer")),
        }
    }
}

/// 校验题目和参考文本（批量模式在整张表开始之前调用一次）
pub fn validate_context(question: &str, reference_text: &str) -> Result<()> {
    if question.trim().is_empty() {
        return Err(GradeError::missing("question"));
    }
    if reference_text.trim().is_empty() {
        return Err(GradeError::missing("reference_text"));
    }
    Ok(())
}

pub(crate) fn normalize_criteria(criteria: Option<&str>) -> Option<&str> {
    criteria.map(str::trim).filter(|c| !c.is_empty())
}
