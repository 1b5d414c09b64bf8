//! # Error 模块
//!
//! 定义 stage-runtime 中使用的错误类型。
//!
//! 动作描述符在进入 Runtime 之前完成校验，校验通过后执行路径上不再产生错误。

use thiserror::Error;

/// 动作描述符校验错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    /// 缺少必需参数
    #[error("动作 '{action}' 缺少参数 '{param}'")]
    MissingParameter { action: String, param: String },

    /// 参数不是数字
    #[error("动作 '{action}' 的参数 '{param}' 不是数字: {value}")]
    NotANumber {
        action: String,
        param: String,
        value: String,
    },

    /// 参数类型无效
    #[error("动作 '{action}' 的参数 '{param}' 类型无效 - {message}")]
    InvalidParameter {
        action: String,
        param: String,
        message: String,
    },
}

/// 程序加载错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProgramError {
    /// JSON 解析失败
    #[error("程序 JSON 解析失败: {message}")]
    Decode { message: String },

    /// 某个动作校验失败
    #[error("第 {group} 组第 {item} 项：{source}")]
    InvalidAction {
        group: usize,
        item: usize,
        #[source]
        source: ActionError,
    },

    /// 单次点击动作校验失败
    #[error("单次点击动作：{0}")]
    InvalidClicked(#[source] ActionError),
}

impl From<serde_json::Error> for ProgramError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode {
            message: err.to_string(),
        }
    }
}

/// 舞台运行时错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StageError {
    /// 状态不匹配
    #[error("当前状态不允许此操作：期望 {expected}，实际 {actual}")]
    StateMismatch { expected: String, actual: String },

    /// 配置无效
    #[error("无效的配置: {message}")]
    InvalidConfig { message: String },

    /// 输入的动作无效
    #[error("无效的动作: {0}")]
    Action(#[from] ActionError),

    /// 程序无效
    #[error("无效的程序: {0}")]
    Program(#[from] ProgramError),
}

/// Result 类型别名
pub type StageResult<T> = Result<T, StageError>;
