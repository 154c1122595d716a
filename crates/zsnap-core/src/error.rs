//! 错误定义

use thiserror::Error;

/// 几何查询错误
///
/// 捕捉生成器会吞掉这类错误：某些曲线/曲面类型本来就不支持投影。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("projection not supported for {0}")]
    ProjectionUnsupported(&'static str),

    #[error("degenerate geometry: {0}")]
    Degenerate(&'static str),
}

/// 参数存储错误
#[derive(Error, Debug)]
pub enum ParamError {
    #[error("parameter {name} has unexpected type, expected {expected}")]
    TypeMismatch { name: String, expected: &'static str },

    #[error("invalid value for parameter {name}: {value}")]
    InvalidValue { name: String, value: String },

    #[error("parameter backend error: {0}")]
    Backend(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// 视图事件回调注册错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HookError {
    #[error("view has been closed")]
    ViewClosed,

    #[error("unknown hook: {0}")]
    UnknownHook(u64),
}
