//! # Config 模块
//!
//! 命令行宿主的配置。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数（最高）
//! 2. 配置文件 (stage.json)
//! 3. 默认值（最低）

use std::fs;
use std::path::Path;

use anyhow::Context;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use stage_runtime::StageConfig;
use tracing::Level;

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

/// 宿主配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// 日志级别
    #[serde(default)]
    pub log_level: LogLevel,

    /// 舞台运行时配置
    #[serde(default)]
    pub stage: StageConfig,
}

impl CliConfig {
    /// 加载配置文件
    ///
    /// 文件不存在时返回默认配置；读取或解析失败时返回错误，由调用方决定是否回退。
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("配置文件读取失败: {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("配置文件解析失败: {}", path.display()))?;
        Ok(config)
    }
}
