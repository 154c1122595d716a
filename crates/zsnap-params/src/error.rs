//! 参数文件错误定义

use thiserror::Error;
use zsnap_core::error::ParamError;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported version: {0}")]
    UnsupportedVersion(String),
}

impl From<FileError> for ParamError {
    fn from(e: FileError) -> Self {
        ParamError::Backend(Box::new(e))
    }
}
