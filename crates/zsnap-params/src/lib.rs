//! ZSNAP 参数存储
//!
//! 捕捉开关、捕捉半径、网格等用户偏好保存在版本化的 JSON 文件中。

pub mod error;
pub mod store;

pub use error::FileError;
pub use store::JsonParamFile;
