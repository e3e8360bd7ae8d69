pub mod grading_flow;
pub mod request_ctx;

pub use grading_flow::GradingFlow;
pub use request_ctx::RequestCtx;
