pub mod prompt_builder;
pub mod response_normalizer;

pub use prompt_builder::StagePrompt;
pub use response_normalizer::{normalize, normalize_grading, normalize_page, Shape};
