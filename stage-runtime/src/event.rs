//! # Event 模块
//!
//! 舞台向渲染层报告的变化。
//!
//! 每次 [`crate::runtime::Stage::handle_input`] 或 [`crate::runtime::Stage::tick`]
//! 都返回这期间发生的全部事件，顺序与实际发生顺序一致。

use serde::{Deserialize, Serialize};

use crate::action::TriggerEvent;
use crate::choreography::FlipRecord;
use crate::runtime::router::IgnoreReason;
use crate::runtime::sequencer::{RunId, RunOrigin};

/// 舞台事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StageEvent {
    /// 运行开始
    RunStarted {
        run: RunId,
        origin: RunOrigin,
        len: usize,
    },

    /// 运行中的一步已执行
    StepApplied {
        run: RunId,
        index: usize,
        action: String,
    },

    /// 运行结束
    RunFinished { run: RunId },

    /// 运行被撤销或重置取消
    RunCancelled { run: RunId, at_step: Option<usize> },

    /// 单次动作已执行（不属于任何运行）
    ActionApplied { action: String },

    /// 触发被忽略
    TriggerIgnored {
        trigger: Option<TriggerEvent>,
        reason: IgnoreReason,
    },

    /// 运行前快照已压入
    HistoryPushed { depth: usize },

    /// 已撤销
    Undone { depth: usize },

    /// 已重置
    Reset,

    /// 气泡已自动清除
    SpeechCleared,

    /// 过渡提示已清除
    AnimationCleared,

    /// 过期的清除事件被丢弃
    StaleTimerDropped { timer: String },

    /// 演示对话框打开
    DemoOpened,

    /// 演示对话框关闭
    DemoClosed,

    /// 演示动画开始
    DemoStarted { session: u64 },

    /// 演示中两只角色掉头
    DemoFlipped(FlipRecord),
}

impl StageEvent {
    /// 是否为运行结束（正常结束或被取消）
    pub fn ends_run(&self) -> bool {
        matches!(self, Self::RunFinished { .. } | Self::RunCancelled { .. })
    }
}
