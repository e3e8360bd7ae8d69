//! 请求处理上下文
//!
//! 封装"我正在处理哪个请求 / 批量中的第几行"这一信息，只用于日志前缀

use std::fmt::Display;

/// 请求处理上下文
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestCtx {
    /// 单次请求，附带操作名称
    Single { operation: &'static str },
    /// 批量中的一行（从1开始）
    Row { index: usize, total: usize },
}

impl RequestCtx {
    pub fn single(operation: &'static str) -> Self {
        RequestCtx::Single { operation }
    }

    pub fn row(index: usize, total: usize) -> Self {
        RequestCtx::Row { index, total }
    }
}

impl Display for RequestCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestCtx::Single { operation } => write!(f, "[{}]", operation),
            RequestCtx::Row { index, total } => write!(f, "[第 {}/{} 行]", index, total),
        }
    }
}
