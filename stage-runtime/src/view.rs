//! # View 模块
//!
//! 渲染层读取的舞台快照。只读、可序列化。

use serde::{Deserialize, Serialize};

use crate::choreography::CollisionState;
use crate::state::{AnimationTag, SpeechState, Transform};

/// 碰撞演示视图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoView {
    pub open: bool,
    pub animating: bool,
    pub cats: CollisionState,
    /// 渲染朝向（`scaleX`）
    pub facing: (i8, i8),
}

/// 舞台快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSnapshot {
    /// 虚拟时钟（毫秒）
    pub now_ms: u64,
    pub transform: Transform,
    pub speech: SpeechState,
    pub animation: Option<AnimationTag>,
    pub playing: bool,
    /// 撤销角标显示的深度
    pub history_depth: usize,
    pub demo: DemoView,
}
