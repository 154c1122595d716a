//! JSON 参数文件
//!
//! 格式：`{"version": 1, "params": {"snapModes": "111111111101111", ...}}`。
//! 每次 `set` 立即写回文件。

use crate::error::FileError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use zsnap_core::error::ParamError;
use zsnap_core::host::{ParamStore, ParamValue};

/// 当前文件格式版本
const FORMAT_VERSION: u64 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct FileContent {
    version: u64,
    #[serde(default)]
    params: BTreeMap<String, ParamValue>,
}

/// 文件支持的参数存储
#[derive(Debug, Clone)]
pub struct JsonParamFile {
    path: PathBuf,
    params: BTreeMap<String, ParamValue>,
}

impl JsonParamFile {
    /// 打开参数文件；文件不存在时从空参数开始，首次 `set` 时创建
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, FileError> {
        let path = path.into();
        if !path.exists() {
            tracing::debug!("Parameter file {} not found, starting empty", path.display());
            return Ok(Self {
                path,
                params: BTreeMap::new(),
            });
        }
        Self::load(path)
    }

    /// 从已存在的文件加载
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, FileError> {
        let path = path.into();
        let text = fs::read_to_string(&path)?;
        let value: serde_json::Value = serde_json::from_str(&text)?;

        let version = value
            .get("version")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| FileError::InvalidFormat("missing version".to_string()))?;
        if version > FORMAT_VERSION {
            return Err(FileError::UnsupportedVersion(format!(
                "File version {} is newer than supported version {}",
                version, FORMAT_VERSION
            )));
        }

        let content: FileContent = serde_json::from_value(value)?;
        tracing::info!(
            "Loaded {} parameters from {}",
            content.params.len(),
            path.display()
        );
        Ok(Self {
            path,
            params: content.params,
        })
    }

    /// 写回文件
    pub fn save(&self) -> Result<(), FileError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let content = FileContent {
            version: FORMAT_VERSION,
            params: self.params.clone(),
        };
        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, &content)?;
        writer.flush()?;
        tracing::debug!("Saved {} parameters to {}", self.params.len(), self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn values(&self) -> &BTreeMap<String, ParamValue> {
        &self.params
    }
}

impl ParamStore for JsonParamFile {
    fn get(&self, name: &str) -> Option<ParamValue> {
        self.params.get(name).cloned()
    }

    fn set(&mut self, name: &str, value: ParamValue) -> Result<(), ParamError> {
        self.params.insert(name.to_string(), value);
        self.save()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zsnap_core::snap::{param, SnapKind};
    use zsnap_core::snapper::Snapper;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("zsnap_params_{}_{}.json", name, std::process::id()))
    }

    #[test]
    fn test_set_writes_through() {
        let path = temp_path("write_through");
        std::fs::remove_file(&path).ok();

        let mut store = JsonParamFile::open(&path).expect("Failed to open");
        assert!(store.values().is_empty());
        store
            .set(param::SNAP_RANGE, ParamValue::Float(12.5))
            .expect("Failed to set");

        let reloaded = JsonParamFile::load(&path).expect("Failed to load");
        assert_eq!(reloaded.get(param::SNAP_RANGE), Some(ParamValue::Float(12.5)));

        let text = std::fs::read_to_string(&path).expect("Failed to read");
        let json: serde_json::Value = serde_json::from_str(&text).expect("Invalid JSON");
        assert_eq!(json["version"], 1);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_snapper_toggle_persists() {
        let path = temp_path("toggle");
        std::fs::remove_file(&path).ok();

        let store = JsonParamFile::open(&path).expect("Failed to open");
        let mut snapper = Snapper::new(Box::new(store));
        snapper.toggle_snap(SnapKind::Endpoint, Some(false));

        let reloaded = JsonParamFile::load(&path).expect("Failed to load");
        assert_eq!(
            reloaded.get(param::SNAP_MODES),
            Some(ParamValue::Text("111110111101111".to_string()))
        );
        let snapper = Snapper::new(Box::new(reloaded));
        assert!(!snapper.is_enabled(SnapKind::Endpoint));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_newer_version_rejected() {
        let path = temp_path("newer");
        std::fs::write(&path, r#"{"version": 9, "params": {}}"#).expect("Failed to write");
        assert!(matches!(
            JsonParamFile::load(&path),
            Err(FileError::UnsupportedVersion(_))
        ));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_invalid_format() {
        let path = temp_path("invalid");
        std::fs::write(&path, "[1, 2, 3]").expect("Failed to write");
        assert!(matches!(JsonParamFile::load(&path), Err(FileError::InvalidFormat(_))));

        std::fs::write(&path, "not json").expect("Failed to write");
        assert!(matches!(JsonParamFile::load(&path), Err(FileError::Json(_))));
        std::fs::remove_file(&path).ok();
    }
}
