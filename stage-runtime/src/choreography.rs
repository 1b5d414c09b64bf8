//! # Choreography 模块
//!
//! 双角色碰撞演示：两只角色在一维上相向或同向移动，靠近到阈值内时同时掉头。
//!
//! ## 规则
//!
//! - 每步两只角色各移动 `step * 方向`
//! - 第二只角色停在初始位置且方向朝外时保持不动
//! - 位置夹取到 `[0, viewport_width]`
//! - 距离小于 `threshold` 的第一步同时翻转两个方向；
//!   锁存在两者分开之前保持，保证每次接近只翻转一次
//!
//! 演示状态与主角色的变换相互独立。

use serde::{Deserialize, Serialize};

use crate::config::ChoreographyConfig;

/// 碰撞演示状态
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionState {
    pub cat1: f64,
    pub cat2: f64,
    /// 方向（+1 或 -1）
    pub dir1: i8,
    pub dir2: i8,
    /// 当前是否处于重叠中
    pub colliding: bool,
}

impl CollisionState {
    /// 初始布局：第一只在 0 向右，第二只在静止位置向左
    pub fn initial(cat2_rest: f64) -> Self {
        Self {
            cat1: 0.0,
            cat2: cat2_rest,
            dir1: 1,
            dir2: -1,
            colliding: false,
        }
    }

    /// 两只角色之间的距离
    pub fn distance(&self) -> f64 {
        (self.cat1 - self.cat2).abs()
    }
}

/// 一次掉头记录
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlipRecord {
    /// 发生在第几步（从 1 开始）
    pub tick: u64,
    pub before: (i8, i8),
    pub after: (i8, i8),
    pub distance: f64,
}

/// 碰撞演示
#[derive(Debug, Clone)]
pub struct CollisionDemo {
    config: ChoreographyConfig,
    state: CollisionState,
    open: bool,
    animating: bool,
    ticks: u64,
    session: u64,
}

impl CollisionDemo {
    pub fn new(config: ChoreographyConfig) -> Self {
        Self {
            state: CollisionState::initial(config.cat2_rest),
            config,
            open: false,
            animating: false,
            ticks: 0,
            session: 0,
        }
    }

    /// 以指定状态开始（用于测试或恢复）
    pub fn with_state(mut self, state: CollisionState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &CollisionState {
        &self.state
    }

    pub fn config(&self) -> &ChoreographyConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    /// 已执行的步数
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// 当前动画会话编号；每次开始动画时递增
    pub fn session(&self) -> u64 {
        self.session
    }

    /// 渲染朝向（`scaleX`）：方向为 +1 时为 1，否则为 -1
    pub fn facing(&self) -> (i8, i8) {
        let f = |d: i8| if d == 1 { 1 } else { -1 };
        (f(self.state.dir1), f(self.state.dir2))
    }

    /// 更新视口宽度
    pub fn set_viewport_width(&mut self, width: f64) {
        self.config.viewport_width = width.max(0.0);
    }

    /// 打开演示对话框
    pub fn open(&mut self) {
        self.open = true;
    }

    /// 关闭演示对话框并停止动画，返回动画是否曾在运行
    pub fn close(&mut self) -> bool {
        self.open = false;
        std::mem::replace(&mut self.animating, false)
    }

    /// 开始动画，返回新会话编号；已在运行时返回 `None`
    pub fn start(&mut self) -> Option<u64> {
        if self.animating {
            return None;
        }
        self.animating = true;
        self.session += 1;
        Some(self.session)
    }

    /// 执行一步模拟
    pub fn step(&mut self) -> Option<FlipRecord> {
        let ChoreographyConfig {
            step,
            threshold,
            cat2_rest,
            viewport_width,
            ..
        } = self.config;
        let s = &mut self.state;
        self.ticks += 1;

        s.cat1 += f64::from(s.dir1) * step;
        if s.cat2 != cat2_rest || s.dir2 == -1 {
            s.cat2 += f64::from(s.dir2) * step;
        }

        s.cat1 = s.cat1.clamp(0.0, viewport_width);
        s.cat2 = s.cat2.clamp(0.0, viewport_width);

        if s.distance() < threshold {
            if !s.colliding {
                s.colliding = true;
                let before = (s.dir1, s.dir2);
                s.dir1 = -s.dir1;
                s.dir2 = -s.dir2;
                return Some(FlipRecord {
                    tick: self.ticks,
                    before,
                    after: (s.dir1, s.dir2),
                    distance: s.distance(),
                });
            }
        } else {
            s.colliding = false;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo() -> CollisionDemo {
        CollisionDemo::new(ChoreographyConfig::default())
    }

    #[test]
    fn test_head_on_approach_flips_once() {
        let mut demo = demo();
        let flips: Vec<_> = (0..500).filter_map(|_| demo.step()).collect();

        assert_eq!(flips.len(), 1);
        let flip = flips[0];
        // 200 - 4k < 30 的最小 k
        assert_eq!(flip.tick, 43);
        assert_eq!(flip.before, (1, -1));
        assert_eq!(flip.after, (-flip.before.0, -flip.before.1));
        assert!(flip.distance < 30.0);
    }

    #[test]
    fn test_latch_holds_while_overlapping() {
        let config = ChoreographyConfig::default();
        // 同向移动、始终重叠：只在第一次进入时翻转
        let mut demo = CollisionDemo::new(config).with_state(CollisionState {
            cat1: 100.0,
            cat2: 110.0,
            dir1: 1,
            dir2: 1,
            colliding: false,
        });

        assert!(demo.step().is_some());
        for _ in 0..5 {
            assert!(demo.step().is_none());
        }
        assert!(demo.state().colliding);
        assert_eq!((demo.state().dir1, demo.state().dir2), (-1, -1));
    }

    #[test]
    fn test_latch_rearms_after_separation() {
        let mut demo = CollisionDemo::new(ChoreographyConfig::default()).with_state(CollisionState {
            cat1: 100.0,
            cat2: 140.0,
            dir1: 1,
            dir2: -1,
            colliding: false,
        });

        let first = (0..10).find_map(|_| demo.step()).unwrap();
        assert_eq!(first.before, (1, -1));

        // 分开后再人为调头，使其再次接近
        while demo.state().distance() < 30.0 {
            demo.step();
        }
        assert!(!demo.state().colliding);
        demo.state.dir1 = 1;
        demo.state.dir2 = -1;

        let second = (0..10).find_map(|_| demo.step()).unwrap();
        assert_eq!(second.after, (-1, 1));
    }

    #[test]
    fn test_cat2_holds_at_rest_when_heading_outward() {
        let mut demo = CollisionDemo::new(ChoreographyConfig::default()).with_state(CollisionState {
            cat1: 0.0,
            cat2: 200.0,
            dir1: -1,
            dir2: 1,
            colliding: false,
        });

        demo.step();
        assert_eq!(demo.state().cat2, 200.0);
        // 第一只被夹取在 0
        assert_eq!(demo.state().cat1, 0.0);
    }

    #[test]
    fn test_positions_clamped_to_viewport() {
        let config = ChoreographyConfig {
            viewport_width: 300.0,
            ..Default::default()
        };
        let mut demo = CollisionDemo::new(config).with_state(CollisionState {
            cat1: 299.0,
            cat2: 0.0,
            dir1: 1,
            dir2: -1,
            colliding: false,
        });

        demo.step();
        assert_eq!(demo.state().cat1, 300.0);
        assert_eq!(demo.state().cat2, 0.0);
    }

    #[test]
    fn test_open_close_start() {
        let mut demo = demo();
        assert!(!demo.is_open());

        demo.open();
        assert_eq!(demo.start(), Some(1));
        assert_eq!(demo.start(), None);
        assert!(demo.is_animating());

        assert!(demo.close());
        assert!(!demo.is_animating());
        assert!(!demo.close());

        demo.open();
        assert_eq!(demo.start(), Some(2));
    }

    #[test]
    fn test_facing() {
        let mut demo = demo();
        assert_eq!(demo.facing(), (1, -1));
        demo.state.dir1 = -1;
        demo.state.dir2 = 1;
        assert_eq!(demo.facing(), (-1, 1));
    }
}
