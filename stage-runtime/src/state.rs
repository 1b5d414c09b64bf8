//! # State 模块
//!
//! 定义角色的动画状态：变换、对话气泡与过渡提示。
//!
//! ## 设计原则
//!
//! - 所有状态必须**显式建模**，由 [`crate::runtime::Stage`] 独占持有
//! - 只有 [`crate::handler`]、撤销与重置会修改状态
//! - 气泡与过渡提示各带一个版本号，用于识别过期的定时清除

use serde::{Deserialize, Serialize};

/// 二维坐标
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// 角色变换
///
/// `rotation` 以度为单位累加，不做归一化；`size` 为相对增量，不做限制。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    pub size: f64,
}

impl Transform {
    /// 当前位置
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// 朝向（归一化到 `[0, 360)`）
    pub fn heading(&self) -> f64 {
        normalize_degrees(self.rotation)
    }
}

/// 将角度归一化到 `[0, 360)`
pub fn normalize_degrees(degrees: f64) -> f64 {
    let r = degrees.rem_euclid(360.0);
    // rem_euclid 对极小的负数可能得到 360.0
    if r >= 360.0 { 0.0 } else { r }
}

/// 对话气泡状态
///
/// `duration_ms == 0` 表示不可见。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpeechState {
    pub message: String,
    pub duration_ms: u64,
    pub is_thought: bool,
}

impl SpeechState {
    /// 不带定时的气泡使用的时长标记
    pub const UNTIMED_DURATION_MS: u64 = 100;

    /// 创建气泡
    pub fn new(message: impl Into<String>, duration_ms: u64, is_thought: bool) -> Self {
        Self {
            message: message.into(),
            duration_ms,
            is_thought,
        }
    }

    /// 是否可见
    pub fn is_visible(&self) -> bool {
        self.duration_ms > 0
    }
}

/// 过渡类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationKind {
    Glide,
}

/// 过渡提示
///
/// 告知渲染层当前位置变化应以多长的过渡完成。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationTag {
    pub kind: AnimationKind,
    pub duration_ms: u64,
}

impl AnimationTag {
    pub fn glide(duration_ms: u64) -> Self {
        Self {
            kind: AnimationKind::Glide,
            duration_ms,
        }
    }
}

/// 角色动画状态
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpriteState {
    /// 变换
    pub transform: Transform,
    /// 对话气泡
    speech: SpeechState,
    /// 过渡提示
    animation: Option<AnimationTag>,
    #[serde(skip)]
    speech_version: u64,
    #[serde(skip)]
    animation_version: u64,
}

impl SpriteState {
    /// 创建零状态
    pub fn new() -> Self {
        Self::default()
    }

    pub fn speech(&self) -> &SpeechState {
        &self.speech
    }

    pub fn animation(&self) -> Option<AnimationTag> {
        self.animation
    }

    /// 气泡版本号（每次写入递增）
    pub fn speech_version(&self) -> u64 {
        self.speech_version
    }

    /// 过渡提示版本号（每次写入递增）
    pub fn animation_version(&self) -> u64 {
        self.animation_version
    }

    /// 设置气泡
    pub fn set_speech(&mut self, speech: SpeechState) {
        self.speech = speech;
        self.speech_version += 1;
    }

    /// 清除气泡
    pub fn clear_speech(&mut self) {
        self.set_speech(SpeechState::default());
    }

    /// 设置过渡提示
    pub fn set_animation(&mut self, tag: Option<AnimationTag>) {
        self.animation = tag;
        self.animation_version += 1;
    }

    /// 恢复到零状态
    ///
    /// 版本号继续递增而不是归零，使重置前排队的清除全部失效。
    pub fn reset(&mut self) {
        self.transform = Transform::default();
        self.clear_speech();
        self.set_animation(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_normalization() {
        let t = Transform {
            rotation: -90.0,
            ..Default::default()
        };
        assert_eq!(t.heading(), 270.0);
        assert_eq!(normalize_degrees(720.0), 0.0);
        assert_eq!(normalize_degrees(450.0), 90.0);
        assert_eq!(normalize_degrees(-1e-20), 0.0);
    }

    #[test]
    fn test_speech_visibility() {
        assert!(!SpeechState::default().is_visible());
        assert!(SpeechState::new("hi", 1000, false).is_visible());
    }

    #[test]
    fn test_versions_bump_on_write() {
        let mut state = SpriteState::new();
        assert_eq!(state.speech_version(), 0);

        state.set_speech(SpeechState::new("a", 100, false));
        state.set_animation(Some(AnimationTag::glide(500)));
        assert_eq!(state.speech_version(), 1);
        assert_eq!(state.animation_version(), 1);

        state.reset();
        assert_eq!(state.speech_version(), 2);
        assert_eq!(state.animation_version(), 2);
        assert_eq!(state.speech(), &SpeechState::default());
        assert_eq!(state.animation(), None);
        assert_eq!(state.transform, Transform::default());
    }

    #[test]
    fn test_state_serialization_skips_versions() {
        let mut state = SpriteState::new();
        state.set_speech(SpeechState::new("hi", 1000, true));
        state.transform.x = 3.0;

        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("speech_version").is_none());
        assert_eq!(json["speech"]["message"], "hi");
        assert_eq!(json["transform"]["x"], 3.0);
    }
}
