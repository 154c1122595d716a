//! ZSNAP 回放程序入口
//!
//! 用法：`zsnap <session.json> [params.json]`
//!
//! 读取场景与光标事件，逐个回放并把交付的点以 JSON 输出到标准输出。
//! 给出参数文件时捕捉开关等偏好从中读取，切换后写回。

mod replay;

use anyhow::{Context, Result};
use std::fs;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use zsnap_core::host::{MemoryParams, ParamStore};
use zsnap_params::JsonParamFile;

fn main() -> Result<()> {
    // 初始化日志
    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(Level::INFO)
            .with_writer(std::io::stderr)
            .finish(),
    )?;

    let mut args = std::env::args().skip(1);
    let session_path = args
        .next()
        .context("usage: zsnap <session.json> [params.json]")?;

    let params: Box<dyn ParamStore> = match args.next() {
        Some(path) => Box::new(
            JsonParamFile::open(&path).with_context(|| format!("failed to open parameters {}", path))?,
        ),
        None => Box::new(MemoryParams::default()),
    };

    let text = fs::read_to_string(&session_path)
        .with_context(|| format!("failed to read session {}", session_path))?;
    let session: replay::Session =
        serde_json::from_str(&text).with_context(|| format!("invalid session {}", session_path))?;

    info!("Starting ZSNAP replay of {}", session_path);
    let results = replay::replay(session, params);
    info!("{} point requests completed", results.len());

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
