//! # Config 模块
//!
//! 舞台运行时配置，集中管理所有时序与几何常量。
//!
//! 所有字段都有默认值，配置文件中只需写出要覆盖的项。

use serde::{Deserialize, Serialize};

use crate::state::Point;

/// 过期定时器的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StalePolicy {
    /// 状态在排队后被改写时，丢弃对应的清除事件
    #[default]
    Drop,
    /// 清除事件总是按时触发（后写覆盖先写）
    Fire,
}

/// 舞台配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    /// 序列器相邻两步之间的间隔（毫秒）
    #[serde(default = "default_step_interval_ms")]
    pub step_interval_ms: u64,

    /// 鼠标位置采样节流间隔（毫秒）
    #[serde(default = "default_pointer_throttle_ms")]
    pub pointer_throttle_ms: u64,

    /// `random` / `glide_random` 的坐标范围 `[0, random_extent)`
    #[serde(default = "default_random_extent")]
    pub random_extent: f64,

    /// 随机数种子（不设置时使用系统熵）
    #[serde(default)]
    pub rng_seed: Option<u64>,

    /// 角色几何信息（用于计算屏幕中心）
    #[serde(default)]
    pub geometry: SpriteGeometry,

    /// 撤销历史配置
    #[serde(default)]
    pub history: HistoryConfig,

    /// 定时器配置
    #[serde(default)]
    pub timers: TimerConfig,

    /// 双角色碰撞演示配置
    #[serde(default)]
    pub choreography: ChoreographyConfig,
}

/// 角色几何信息
///
/// 屏幕中心 = `origin` + 当前位置 + `half_extent`。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpriteGeometry {
    /// 舞台左上角在视口中的坐标
    #[serde(default)]
    pub origin: Point,
    /// 角色半宽/半高
    #[serde(default = "default_half_extent")]
    pub half_extent: Point,
}

/// 撤销历史配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// 最大快照数（超出时丢弃最早的快照）
    #[serde(default = "default_history_max_depth")]
    pub max_depth: usize,
}

/// 定时器配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default)]
    pub stale_policy: StalePolicy,
}

/// 碰撞演示配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChoreographyConfig {
    /// 模拟步长（毫秒）
    #[serde(default = "default_choreography_tick_ms")]
    pub tick_ms: u64,

    /// 每步移动距离
    #[serde(default = "default_choreography_step")]
    pub step: f64,

    /// 碰撞判定距离
    #[serde(default = "default_choreography_threshold")]
    pub threshold: f64,

    /// 第二只角色的初始静止位置
    #[serde(default = "default_cat2_rest")]
    pub cat2_rest: f64,

    /// 视口宽度（位置夹取上限）
    #[serde(default = "default_viewport_width")]
    pub viewport_width: f64,
}

// 默认值函数
fn default_step_interval_ms() -> u64 {
    10
}

fn default_pointer_throttle_ms() -> u64 {
    200
}

fn default_random_extent() -> f64 {
    400.0
}

fn default_half_extent() -> Point {
    Point::new(47.5, 50.0)
}

fn default_history_max_depth() -> usize {
    1000
}

fn default_choreography_tick_ms() -> u64 {
    50
}

fn default_choreography_step() -> f64 {
    2.0
}

fn default_choreography_threshold() -> f64 {
    30.0
}

fn default_cat2_rest() -> f64 {
    200.0
}

fn default_viewport_width() -> f64 {
    1280.0
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            step_interval_ms: default_step_interval_ms(),
            pointer_throttle_ms: default_pointer_throttle_ms(),
            random_extent: default_random_extent(),
            rng_seed: None,
            geometry: SpriteGeometry::default(),
            history: HistoryConfig::default(),
            timers: TimerConfig::default(),
            choreography: ChoreographyConfig::default(),
        }
    }
}

impl Default for SpriteGeometry {
    fn default() -> Self {
        Self {
            origin: Point::ZERO,
            half_extent: default_half_extent(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_depth: default_history_max_depth(),
        }
    }
}

impl Default for ChoreographyConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_choreography_tick_ms(),
            step: default_choreography_step(),
            threshold: default_choreography_threshold(),
            cat2_rest: default_cat2_rest(),
            viewport_width: default_viewport_width(),
        }
    }
}

impl StageConfig {
    /// 设置随机数种子
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// 设置过期定时器策略
    pub fn with_stale_policy(mut self, policy: StalePolicy) -> Self {
        self.timers.stale_policy = policy;
        self
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), String> {
        if self.step_interval_ms == 0 {
            return Err("step_interval_ms 必须大于 0".to_string());
        }
        if self.choreography.tick_ms == 0 {
            return Err("choreography.tick_ms 必须大于 0".to_string());
        }
        if !self.random_extent.is_finite() || self.random_extent <= 0.0 {
            return Err(format!("random_extent 必须为正数: {}", self.random_extent));
        }
        let demo = &self.choreography;
        if !demo.viewport_width.is_finite() || demo.viewport_width < 0.0 {
            return Err(format!(
                "choreography.viewport_width 必须为非负数: {}",
                demo.viewport_width
            ));
        }
        if !demo.step.is_finite() || demo.step <= 0.0 {
            return Err(format!("choreography.step 必须为正数: {}", demo.step));
        }
        if !demo.threshold.is_finite() || demo.threshold < 0.0 {
            return Err(format!("choreography.threshold 必须为非负数: {}", demo.threshold));
        }
        if !demo.cat2_rest.is_finite() {
            return Err(format!("choreography.cat2_rest 必须为有限数: {}", demo.cat2_rest));
        }
        if self.history.max_depth == 0 {
            return Err("history.max_depth 必须大于 0".to_string());
        }
        Ok(())
    }
}
