//! 提示词构建 - 业务能力层
//!
//! 纯函数，只根据输入拼接提示词，不做任何 IO。

use crate::models::invocation::StageKind;
use crate::models::request::normalize_criteria;

/// 没有评分标准时替代标准块的通用说明
pub const GENERIC_GRADING_INSTRUCTION: &str = "No specific grading criteria were provided. \
Grade the student's answer by how closely it matches the reference text in meaning, \
accuracy and completeness.";

/// 评分阶段对输出格式的要求
pub const GRADE_OUTPUT_INSTRUCTION: &str = "Respond with exactly one JSON object with the keys \
\"grade\" and \"reason\" and nothing else. Do not write any text before or after the object \
and do not wrap it in code fences.";

/// 某个阶段提示词所需的输入
#[derive(Debug, Clone, Copy)]
pub enum StagePrompt<'a> {
    /// 手写识别；`full_page` 为真时要求保留整页的题号与顺序
    Transcribe { full_page: bool },
    /// 把整页识别文本拆成题目/答案对
    Structure {
        transcript: &'a str,
        question: &'a str,
        reference_text: &'a str,
    },
    /// 单题评分
    Grade {
        reference_text: &'a str,
        question: &'a str,
        criteria: Option<&'a str>,
        answer: &'a str,
    },
}

impl StagePrompt<'_> {
    pub fn kind(&self) -> StageKind {
        match self {
            StagePrompt::Transcribe { .. } => StageKind::Transcribe,
            StagePrompt::Structure { .. } => StageKind::Structure,
            StagePrompt::Grade { .. } => StageKind::Grade,
        }
    }
}

/// 构建提示词
pub fn build(stage: &StagePrompt<'_>) -> String {
    match *stage {
        StagePrompt::Transcribe { full_page } => build_transcribe_prompt(full_page),
        StagePrompt::Structure {
            transcript,
            question,
            reference_text,
        } => build_structure_prompt(transcript, question, reference_text),
        StagePrompt::Grade {
            reference_text,
            question,
            criteria,
            answer,
        } => build_grade_prompt(reference_text, question, criteria, answer),
    }
}

fn build_transcribe_prompt(full_page: bool) -> String {
    let mut prompt = String::from(
        "Transcribe the handwritten text in the image exactly as it is written. \
Do not correct, summarize or explain anything and do not add any commentary. \
Return only the transcribed text.",
    );
    if full_page {
        prompt.push_str(
            " The image is a full exam page: keep every question number, every line \
and the reading order of the page.",
        );
    }
    prompt
}

fn build_structure_prompt(transcript: &str, question: &str, reference_text: &str) -> String {
    format!(
        r#"You are given the raw transcript of a handwritten exam page. Split it into question and answer pairs.

Exam questions:
---
{}
---

Reference text for the exam:
---
{}
---

Raw transcript:
---
{}
---

Cover every question/answer pair found in the transcript, in the order they appear.
Respond with exactly one JSON array of objects with the keys "question" and "answer" and nothing else.
If an answer is missing, use an empty string. Do not write any text before or after the array and do not wrap it in code fences."#,
        question.trim(),
        reference_text.trim(),
        transcript.trim()
    )
}

fn build_grade_prompt(
    reference_text: &str,
    question: &str,
    criteria: Option<&str>,
    answer: &str,
) -> String {
    let criteria_block = match normalize_criteria(criteria) {
        Some(criteria) => format!("Grading Criteria:\n---\n{}\n---", criteria),
        None => format!("Grading Instruction:\n---\n{}\n---", GENERIC_GRADING_INSTRUCTION),
    };

    format!(
        r#"You are an examiner grading an exam paper. Grade the student's answer using the reference text, the question and the grading guidance below.

Reference Text:
---
{}
---

Question:
---
{}
---

{}

Student's Answer:
---
{}
---

{}"#,
        reference_text.trim(),
        question.trim(),
        criteria_block,
        answer.trim(),
        GRADE_OUTPUT_INSTRUCTION
    )
}
