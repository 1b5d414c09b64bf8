//! # Input 模块
//!
//! 定义 Host 向舞台传递的输入事件，以及鼠标位置采样。
//!
//! ## 设计说明
//!
//! - `StageInput` 是 Host 采集用户操作后传递给舞台的语义化输入
//! - 舞台不直接处理窗口事件；按键只区分是否为空格
//! - 时间流逝不是输入，由 Host 调用 [`crate::runtime::Stage::tick`] 推进

use serde::{Deserialize, Serialize};

use crate::action::{ActionDescriptor, TriggerEvent};
use crate::state::Point;

/// 按键
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Space,
    /// 其他按键（按代码记录，不触发任何动作）
    Other(String),
}

impl Key {
    /// 从 DOM 风格的按键代码创建
    pub fn from_code(code: &str) -> Self {
        match code {
            "Space" => Self::Space,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Host 向舞台传递的输入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "input", rename_all = "snake_case")]
pub enum StageInput {
    /// 鼠标移动（视口坐标）
    PointerMoved { x: f64, y: f64 },

    /// 按键按下
    KeyDown { key: Key },

    /// 点击角色
    SpriteClicked,

    /// 点击绿旗
    FlagClicked,

    /// 运行全部动作
    RunAll,

    /// 撤销上一次运行
    Undo,

    /// 重置舞台
    Reset,

    /// 单次执行一个动作（不记录历史）
    Clicked { action: ActionDescriptor },

    /// 渲染层测得的角色屏幕中心
    SpriteCentre { x: f64, y: f64 },

    /// 视口宽度变化
    ViewportResized { width: f64 },

    /// 打开碰撞演示
    DemoOpen,

    /// 关闭碰撞演示
    DemoClose,

    /// 开始碰撞演示动画
    DemoStart,
}

impl StageInput {
    /// 创建按键输入
    pub fn key(code: &str) -> Self {
        Self::KeyDown {
            key: Key::from_code(code),
        }
    }

    /// 创建鼠标移动输入
    pub fn pointer(x: f64, y: f64) -> Self {
        Self::PointerMoved { x, y }
    }

    /// 创建单次动作输入
    pub fn clicked(action: ActionDescriptor) -> Self {
        Self::Clicked { action }
    }

    /// 该输入对应的触发事件（如果有）
    pub fn trigger(&self) -> Option<TriggerEvent> {
        match self {
            Self::FlagClicked => Some(TriggerEvent::FlagClicked),
            Self::SpriteClicked => Some(TriggerEvent::SpriteClicked),
            Self::KeyDown { key: Key::Space } => Some(TriggerEvent::SpaceClicked),
            _ => None,
        }
    }
}

/// 节流的鼠标位置采样
///
/// 同一节流窗口内只立即接受第一次采样；窗口内最后一次采样在窗口结束时生效。
#[derive(Debug, Clone)]
pub struct PointerSampler {
    current: Point,
    last_commit_ms: Option<u64>,
    pending: Option<Point>,
    throttle_ms: u64,
}

impl PointerSampler {
    pub fn new(throttle_ms: u64) -> Self {
        Self {
            current: Point::ZERO,
            last_commit_ms: None,
            pending: None,
            throttle_ms,
        }
    }

    /// 记录一次鼠标移动，返回是否立即生效
    pub fn record(&mut self, pos: Point, now_ms: u64) -> bool {
        self.flush(now_ms);
        let open = match self.last_commit_ms {
            None => true,
            Some(last) => now_ms >= last.saturating_add(self.throttle_ms),
        };
        if open {
            self.current = pos;
            self.last_commit_ms = Some(now_ms);
            self.pending = None;
        } else {
            self.pending = Some(pos);
        }
        open
    }

    /// 让窗口结束时待定的采样生效
    pub fn flush(&mut self, now_ms: u64) {
        if let (Some(pos), Some(last)) = (self.pending, self.last_commit_ms) {
            let due = last.saturating_add(self.throttle_ms);
            if now_ms >= due {
                self.current = pos;
                self.last_commit_ms = Some(due);
                self.pending = None;
            }
        }
    }

    /// 指定时刻可见的鼠标位置
    pub fn position_at(&mut self, now_ms: u64) -> Point {
        self.flush(now_ms);
        self.current
    }
}
