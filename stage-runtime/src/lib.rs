//! # Stage Runtime
//!
//! 积木式角色舞台的核心运行时库。
//!
//! ## 架构概述
//!
//! `stage-runtime` 是纯逻辑核心，不依赖任何 IO、渲染或真实时钟。
//! 它通过 **输入 / 事件模式** 与宿主层（Host）通信：
//!
//! ```text
//! Host                              Runtime
//!   │                                  │
//!   │──── StageInput ────────────────►│ handle_input()
//!   │──── elapsed ───────────────────►│ tick()
//!   │◄─── Vec<StageEvent> ────────────│
//!   │◄─── StageSnapshot ──────────────│ snapshot()
//!   │                                  │
//! ```
//!
//! ## 核心类型
//!
//! - [`Stage`]：舞台运行时，持有全部状态
//! - [`Program`]：校验后的动作组集合
//! - [`Action`]：强类型动作
//! - [`StageInput`]：Host 向 Runtime 传递的输入
//! - [`StageEvent`]：Runtime 报告的变化
//! - [`StageSnapshot`]：渲染层读取的只读快照
//!
//! ## 使用示例
//!
//! ```ignore
//! use stage_runtime::{Program, Stage, StageInput};
//!
//! let program = Program::from_json(text)?;
//! let mut stage = Stage::new(program);
//!
//! stage.handle_input(StageInput::FlagClicked)?;
//! loop {
//!     let events = stage.tick(Duration::from_millis(16));
//!     host.render(&stage.snapshot(), &events);
//! }
//! ```
//!
//! ## 模块结构
//!
//! - [`action`]：动作描述符与强类型动作
//! - [`program`]：动作组与程序
//! - [`state`]：角色动画状态
//! - [`handler`]：单个动作的执行
//! - [`history`]：撤销历史
//! - [`choreography`]：双角色碰撞演示
//! - [`input`]：输入与鼠标节流
//! - [`event`]：事件定义
//! - [`view`]：渲染快照
//! - [`config`]：运行时配置
//! - [`diagnostic`]：程序静态检查
//! - [`error`]：错误类型定义
//! - [`runtime`]：执行引擎

pub mod action;
pub mod choreography;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod event;
pub mod handler;
pub mod history;
pub mod input;
pub mod program;
pub mod runtime;
pub mod state;
pub mod view;

// 重导出核心类型
pub use action::{Action, ActionDescriptor, Bubble, TriggerEvent};
pub use choreography::{CollisionDemo, CollisionState, FlipRecord};
pub use config::{
    ChoreographyConfig, HistoryConfig, SpriteGeometry, StageConfig, StalePolicy, TimerConfig,
};
pub use diagnostic::{Diagnostic, DiagnosticLevel, DiagnosticResult, Location, analyze_program};
pub use error::{ActionError, ProgramError, StageError, StageResult};
pub use event::StageEvent;
pub use handler::{ActionHandler, Deferred, HandlerContext};
pub use history::{HistorySnapshot, UndoHistory};
pub use input::{Key, PointerSampler, StageInput};
pub use program::{Group, GroupData, Program, ProgramData};
pub use runtime::Stage;
pub use runtime::router::{Dispatch, DispatchPlan, IgnoreReason};
pub use runtime::sequencer::{RunId, RunOrigin};
pub use state::{AnimationKind, AnimationTag, Point, SpeechState, SpriteState, Transform};
pub use view::{DemoView, StageSnapshot};
