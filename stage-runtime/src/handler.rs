//! # Handler 模块
//!
//! 将单个 [`Action`] 应用到角色状态。
//!
//! ## 职责
//!
//! - 读取动作与当前状态，计算下一个状态
//! - 对于带时长的动作，返回一个延迟的清除请求，由调用方排入定时队列
//! - 不关心动作序列：一次只执行一步

use rand::rngs::SmallRng;
use rand::{Rng as _, SeedableRng};

use crate::action::{Action, Bubble};
use crate::state::{AnimationTag, Point, SpeechState, SpriteState, normalize_degrees};

/// 延迟的状态清除请求
///
/// `version` 是写入后的版本号，清除触发时用于判断状态是否已被改写。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferred {
    /// 清除过渡提示
    ClearAnimation { after_ms: u64, version: u64 },
    /// 清除对话气泡
    ClearSpeech { after_ms: u64, version: u64 },
}

impl Deferred {
    pub fn after_ms(&self) -> u64 {
        match self {
            Self::ClearAnimation { after_ms, .. } | Self::ClearSpeech { after_ms, .. } => *after_ms,
        }
    }
}

/// 执行上下文
///
/// 由调用方在每一步之前采样，处理器只读取。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HandlerContext {
    /// 当前鼠标位置（视口坐标）
    pub pointer: Point,
    /// 角色屏幕中心（视口坐标）
    pub sprite_centre: Point,
}

/// 动作处理器
pub struct ActionHandler {
    rng: SmallRng,
    random_extent: f64,
}

impl ActionHandler {
    /// 创建处理器
    ///
    /// `seed` 为 `None` 时使用系统熵。
    pub fn new(seed: Option<u64>, random_extent: f64) -> Self {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self { rng, random_extent }
    }

    /// 执行单个动作
    ///
    /// 触发器与未知动作为空操作，返回 `None`。
    pub fn apply(
        &mut self,
        state: &mut SpriteState,
        action: &Action,
        ctx: &HandlerContext,
    ) -> Option<Deferred> {
        let t = &mut state.transform;
        match action {
            Action::Trigger { .. } | Action::Unknown { .. } => None,

            Action::Move { dx } => {
                t.x += dx;
                None
            }

            Action::GoTo { x, y } => {
                t.x = *x;
                t.y = *y;
                None
            }

            Action::Random => {
                let p = self.random_point();
                t.x = p.x;
                t.y = p.y;
                None
            }

            Action::Turn { degrees } => {
                t.rotation += degrees;
                None
            }

            Action::Glide { x, y, duration_ms } => {
                t.x = *x;
                t.y = *y;
                Some(Self::start_glide(state, *duration_ms))
            }

            Action::GlideBy {
                dx,
                dy,
                duration_ms,
            } => {
                t.x += dx;
                t.y += dy;
                Some(Self::start_glide(state, *duration_ms))
            }

            Action::GlideRandom { duration_ms } => {
                let p = self.random_point();
                state.transform.x = p.x;
                state.transform.y = p.y;
                Some(Self::start_glide(state, *duration_ms))
            }

            Action::PointInDirection { direction } => {
                t.rotation = *direction;
                None
            }

            Action::PointTowardsPointer => {
                t.rotation = pointer_heading(ctx.sprite_centre, ctx.pointer);
                state.set_animation(None);
                None
            }

            Action::ChangeXBy { dx } => {
                t.x += dx;
                None
            }

            Action::SetX { x } => {
                t.x = *x;
                None
            }

            Action::ChangeYBy { dy } => {
                t.y += dy;
                None
            }

            Action::SetY { y } => {
                t.y = *y;
                None
            }

            Action::Speak {
                message,
                bubble,
                timeout_ms,
            } => {
                let is_thought = *bubble == Bubble::Think;
                let duration_ms = timeout_ms.unwrap_or(SpeechState::UNTIMED_DURATION_MS);
                state.set_speech(SpeechState::new(message.clone(), duration_ms, is_thought));
                timeout_ms.map(|after_ms| Deferred::ClearSpeech {
                    after_ms,
                    version: state.speech_version(),
                })
            }

            Action::ChangeSize { delta } => {
                t.size += delta;
                None
            }
        }
    }

    fn random_point(&mut self) -> Point {
        Point::new(
            self.rng.gen_range(0.0..self.random_extent),
            self.rng.gen_range(0.0..self.random_extent),
        )
    }

    fn start_glide(state: &mut SpriteState, duration_ms: u64) -> Deferred {
        state.set_animation(Some(AnimationTag::glide(duration_ms)));
        Deferred::ClearAnimation {
            after_ms: duration_ms,
            version: state.animation_version(),
        }
    }
}

/// 从角色中心指向鼠标的角度（度，`[0, 360)`）
pub fn pointer_heading(centre: Point, pointer: Point) -> f64 {
    let dx = pointer.x - centre.x;
    let dy = pointer.y - centre.y;
    normalize_degrees(dy.atan2(dx).to_degrees())
}
