//! # Runtime 模块
//!
//! 舞台执行引擎核心，负责触发分发、逐步执行和定时事件。
//!
//! ## 模块结构
//!
//! - [`engine`]：舞台核心（[`Stage`]）
//! - [`router`]：触发事件到动作组的选择
//! - [`sequencer`]：动作列表的逐步执行状态
//! - [`timer`]：基于虚拟时钟的定时事件队列

pub mod engine;
pub mod router;
pub mod sequencer;
pub mod timer;

pub use engine::Stage;
