//! # Engine 模块
//!
//! 舞台核心：持有全部可变状态，所有修改都经过这里。
//!
//! ## 执行模型
//!
//! ```text
//! handle_input(input) -> Vec<StageEvent>     立即处理输入（触发、撤销、重置……）
//! tick(elapsed)       -> Vec<StageEvent>     推进虚拟时钟，依次触发到期的定时事件
//! ```
//!
//! 1. 触发输入经 [`router::plan`] 选出要启动的运行
//! 2. 压入一份撤销快照，每个运行的第 0 步立即执行
//! 3. 后续步骤、气泡与过渡提示的清除、演示步进都排在同一个 [`TimerQueue`] 中
//! 4. `tick` 按 `(到期时间, 入队序号)` 顺序触发，结果完全确定
//!
//! 不同运行之间没有互斥，同一字段的并发写入按触发顺序后写覆盖先写。

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::action::Action;
use crate::choreography::CollisionDemo;
use crate::config::{StageConfig, StalePolicy};
use crate::error::{StageError, StageResult};
use crate::event::StageEvent;
use crate::handler::{ActionHandler, Deferred, HandlerContext};
use crate::history::UndoHistory;
use crate::input::{PointerSampler, StageInput};
use crate::program::Program;
use crate::runtime::router::{self, Dispatch, DispatchPlan};
use crate::runtime::sequencer::{RunId, Sequencer, StepOutcome};
use crate::runtime::timer::{TimerEvent, TimerQueue};
use crate::state::{AnimationTag, Point, SpeechState, SpriteState, Transform};
use crate::view::{DemoView, StageSnapshot};

/// 舞台运行时
///
/// # 使用示例
///
/// ```ignore
/// let program = Program::from_json(text)?;
/// let mut stage = Stage::new(program);
///
/// stage.handle_input(StageInput::FlagClicked)?;
/// loop {
///     let events = stage.tick(Duration::from_millis(16));
///     // 渲染层读取 stage.snapshot() ...
/// }
/// ```
pub struct Stage {
    config: StageConfig,
    program: Program,
    state: SpriteState,
    handler: ActionHandler,
    sequencer: Sequencer,
    history: UndoHistory,
    timers: TimerQueue,
    pointer: PointerSampler,
    demo: CollisionDemo,
    /// 舞台原点（可被渲染层测得的中心校准）
    origin: Point,
    now_ms: u64,
}

impl Stage {
    /// 使用默认配置创建舞台
    pub fn new(program: Program) -> Self {
        Self::build(program, StageConfig::default())
    }

    /// 使用指定配置创建舞台
    pub fn with_config(program: Program, config: StageConfig) -> StageResult<Self> {
        config
            .validate()
            .map_err(|message| StageError::InvalidConfig { message })?;
        Ok(Self::build(program, config))
    }

    fn build(program: Program, config: StageConfig) -> Self {
        Self {
            handler: ActionHandler::new(config.rng_seed, config.random_extent),
            history: UndoHistory::new().with_max_depth(config.history.max_depth),
            pointer: PointerSampler::new(config.pointer_throttle_ms),
            demo: CollisionDemo::new(config.choreography),
            origin: config.geometry.origin,
            sequencer: Sequencer::new(),
            timers: TimerQueue::new(),
            state: SpriteState::new(),
            program,
            config,
            now_ms: 0,
        }
    }

    /// 替换程序
    ///
    /// 程序带有单次点击动作时立即执行它。已在进行的运行不受影响。
    pub fn load_program(&mut self, program: Program) -> Vec<StageEvent> {
        let mut events = Vec::new();
        let clicked = program.clicked().cloned();
        self.program = program;
        if let Some(action) = clicked {
            self.apply_once(&action, &mut events);
        }
        events
    }

    /// 处理一个输入
    pub fn handle_input(&mut self, input: StageInput) -> StageResult<Vec<StageEvent>> {
        let mut events = Vec::new();

        if let Some(trigger) = input.trigger() {
            self.dispatch(Dispatch::Trigger(trigger), &mut events);
            return Ok(events);
        }

        match input {
            StageInput::PointerMoved { x, y } => {
                self.pointer.record(Point::new(x, y), self.now_ms);
            }
            // 触发类输入已在上面分发；其余按键忽略
            StageInput::KeyDown { .. } | StageInput::SpriteClicked | StageInput::FlagClicked => {}
            StageInput::RunAll => self.dispatch(Dispatch::RunAll, &mut events),
            StageInput::Undo => self.undo(&mut events),
            StageInput::Reset => self.reset(&mut events),
            StageInput::Clicked { action } => {
                let action = Action::from_descriptor(&action)?;
                self.apply_once(&action, &mut events);
            }
            StageInput::SpriteCentre { x, y } => self.calibrate_centre(Point::new(x, y)),
            StageInput::ViewportResized { width } => self.demo.set_viewport_width(width),
            StageInput::DemoOpen => {
                self.demo.open();
                info!("碰撞演示已打开");
                events.push(StageEvent::DemoOpened);
            }
            StageInput::DemoClose => self.close_demo(&mut events),
            StageInput::DemoStart => self.start_demo(&mut events)?,
        }

        Ok(events)
    }

    /// 推进虚拟时钟
    pub fn tick(&mut self, elapsed: Duration) -> Vec<StageEvent> {
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let target = self.now_ms.saturating_add(elapsed_ms);
        self.advance_to(target)
    }

    /// 推进虚拟时钟到指定时刻，依次触发期间到期的定时事件
    pub fn advance_to(&mut self, target_ms: u64) -> Vec<StageEvent> {
        let mut events = Vec::new();
        while let Some(scheduled) = self.timers.pop_due(target_ms) {
            self.now_ms = self.now_ms.max(scheduled.due_ms);
            self.fire(scheduled.event, &mut events);
        }
        self.now_ms = self.now_ms.max(target_ms);
        self.pointer.flush(self.now_ms);
        events
    }

    /// 推进时钟直到所有运行与清除事件都已触发
    ///
    /// 演示动画的步进不计入；演示在运行时会随时钟一起推进。
    pub fn settle(&mut self) -> Vec<StageEvent> {
        let mut events = Vec::new();
        while !self.is_settled() {
            let Some(due) = self.timers.next_due() else {
                break;
            };
            events.extend(self.advance_to(due));
        }
        events
    }

    // ========== 状态访问 ==========

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn state(&self) -> &SpriteState {
        &self.state
    }

    pub fn transform(&self) -> &Transform {
        &self.state.transform
    }

    pub fn speech(&self) -> &SpeechState {
        self.state.speech()
    }

    pub fn animation(&self) -> Option<AnimationTag> {
        self.state.animation()
    }

    /// 是否有运行在进行
    pub fn is_playing(&self) -> bool {
        self.sequencer.is_playing()
    }

    /// 撤销历史深度
    pub fn history_depth(&self) -> usize {
        self.history.len()
    }

    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    pub fn demo(&self) -> &CollisionDemo {
        &self.demo
    }

    /// 虚拟时钟（毫秒）
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// 待触发的定时事件数
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// 是否已没有待执行的运行步骤与清除事件（演示步进不计入）
    pub fn is_settled(&self) -> bool {
        !self
            .timers
            .any(|e| !matches!(e, TimerEvent::ChoreographyTick { .. }))
    }

    /// 下一个定时事件的到期时刻
    pub fn next_due(&self) -> Option<u64> {
        self.timers.next_due()
    }

    /// 角色屏幕中心
    pub fn sprite_centre(&self) -> Point {
        let pos = self.state.transform.position();
        let half = self.config.geometry.half_extent;
        Point::new(
            self.origin.x + pos.x + half.x,
            self.origin.y + pos.y + half.y,
        )
    }

    /// 渲染层快照
    pub fn snapshot(&self) -> StageSnapshot {
        StageSnapshot {
            now_ms: self.now_ms,
            transform: self.state.transform,
            speech: self.state.speech().clone(),
            animation: self.state.animation(),
            playing: self.is_playing(),
            history_depth: self.history.len(),
            demo: DemoView {
                open: self.demo.is_open(),
                animating: self.demo.is_animating(),
                cats: *self.demo.state(),
                facing: self.demo.facing(),
            },
        }
    }

    // ========== 触发与运行 ==========

    fn dispatch(&mut self, dispatch: Dispatch, events: &mut Vec<StageEvent>) {
        let trigger = match dispatch {
            Dispatch::Trigger(event) => Some(event),
            Dispatch::RunAll => None,
        };

        match router::plan(&self.program, dispatch, self.sequencer.is_playing()) {
            DispatchPlan::Ignore(reason) => {
                debug!(?trigger, ?reason, "触发被忽略");
                events.push(StageEvent::TriggerIgnored { trigger, reason });
            }
            DispatchPlan::Start(runs) => {
                self.history.snapshot_before_run(&self.state);
                events.push(StageEvent::HistoryPushed {
                    depth: self.history.len(),
                });
                info!(?trigger, runs = runs.len(), "启动运行");

                let ids: Vec<RunId> = runs
                    .into_iter()
                    .map(|(origin, actions)| {
                        let len = actions.len();
                        let run = self.sequencer.start(origin, actions);
                        events.push(StageEvent::RunStarted { run, origin, len });
                        run
                    })
                    .collect();

                for run in ids {
                    self.run_step(run, 0, events);
                }
            }
        }
    }

    fn run_step(&mut self, run: RunId, index: usize, events: &mut Vec<StageEvent>) {
        let Some(action) = self.sequencer.begin_step(run, index).cloned() else {
            debug!(%run, index, "运行已结束，跳过");
            return;
        };

        self.apply_action(&action);
        debug!(%run, index, action = action.name(), now_ms = self.now_ms, "执行一步");
        events.push(StageEvent::StepApplied {
            run,
            index,
            action: action.name().to_string(),
        });

        match self.sequencer.complete_step(run, index) {
            StepOutcome::Continue { next } => {
                self.timers.schedule(
                    self.now_ms.saturating_add(self.config.step_interval_ms),
                    TimerEvent::Step { run, index: next },
                );
            }
            StepOutcome::Finished => {
                debug!(%run, "运行结束");
                events.push(StageEvent::RunFinished { run });
            }
        }
    }

    /// 执行不属于任何运行的单个动作
    fn apply_once(&mut self, action: &Action, events: &mut Vec<StageEvent>) {
        self.apply_action(action);
        debug!(action = action.name(), "执行单次动作");
        events.push(StageEvent::ActionApplied {
            action: action.name().to_string(),
        });
    }

    fn apply_action(&mut self, action: &Action) {
        if action.is_unknown() {
            warn!(action = action.name(), "未知动作类型，忽略");
        }

        let ctx = HandlerContext {
            pointer: self.pointer.position_at(self.now_ms),
            sprite_centre: self.sprite_centre(),
        };

        if let Some(deferred) = self.handler.apply(&mut self.state, action, &ctx) {
            let due = self.now_ms.saturating_add(deferred.after_ms());
            let event = match deferred {
                Deferred::ClearAnimation { version, .. } => TimerEvent::ClearAnimation { version },
                Deferred::ClearSpeech { version, .. } => TimerEvent::ClearSpeech { version },
            };
            self.timers.schedule(due, event);
        }
    }

    fn cancel_runs(&mut self, events: &mut Vec<StageEvent>) {
        for (run, at_step) in self.sequencer.cancel_all() {
            debug!(%run, ?at_step, "运行已取消");
            events.push(StageEvent::RunCancelled { run, at_step });
        }
        self.timers
            .cancel_where(|e| matches!(e, TimerEvent::Step { .. }));
    }

    // ========== 撤销与重置 ==========

    fn undo(&mut self, events: &mut Vec<StageEvent>) {
        if self.history.is_empty() {
            debug!("撤销历史为空");
            return;
        }
        if self.config.timers.stale_policy == StalePolicy::Drop {
            self.cancel_runs(events);
        }
        self.history.undo(&mut self.state);
        info!(depth = self.history.len(), "已撤销");
        events.push(StageEvent::Undone {
            depth: self.history.len(),
        });
    }

    fn reset(&mut self, events: &mut Vec<StageEvent>) {
        self.cancel_runs(events);
        if self.config.timers.stale_policy == StalePolicy::Drop {
            self.timers.cancel_where(|e| {
                matches!(
                    e,
                    TimerEvent::ClearSpeech { .. } | TimerEvent::ClearAnimation { .. }
                )
            });
        }
        self.state.reset();
        self.history.clear();
        info!("舞台已重置");
        events.push(StageEvent::Reset);
    }

    // ========== 定时事件 ==========

    fn fire(&mut self, event: TimerEvent, events: &mut Vec<StageEvent>) {
        debug!(timer = event.label(), now_ms = self.now_ms, "定时事件触发");

        match event {
            TimerEvent::Step { run, index } => self.run_step(run, index, events),

            TimerEvent::ClearSpeech { version } => {
                if self.is_live(version == self.state.speech_version()) {
                    self.state.clear_speech();
                    events.push(StageEvent::SpeechCleared);
                } else {
                    debug!(version, "气泡已被改写，丢弃清除");
                    events.push(StageEvent::StaleTimerDropped {
                        timer: event.label().to_string(),
                    });
                }
            }

            TimerEvent::ClearAnimation { version } => {
                if self.is_live(version == self.state.animation_version()) {
                    self.state.set_animation(None);
                    events.push(StageEvent::AnimationCleared);
                } else {
                    debug!(version, "过渡提示已被改写，丢弃清除");
                    events.push(StageEvent::StaleTimerDropped {
                        timer: event.label().to_string(),
                    });
                }
            }

            TimerEvent::ChoreographyTick { session } => {
                if !self.demo.is_animating() || session != self.demo.session() {
                    return;
                }
                if let Some(flip) = self.demo.step() {
                    info!(tick = flip.tick, after = ?flip.after, "演示角色掉头");
                    events.push(StageEvent::DemoFlipped(flip));
                }
                self.timers.schedule(
                    self.now_ms.saturating_add(self.demo.config().tick_ms),
                    TimerEvent::ChoreographyTick { session },
                );
            }
        }
    }

    /// 清除事件是否仍应生效
    fn is_live(&self, current: bool) -> bool {
        current || self.config.timers.stale_policy == StalePolicy::Fire
    }

    // ========== 演示 ==========

    fn start_demo(&mut self, events: &mut Vec<StageEvent>) -> StageResult<()> {
        if !self.demo.is_open() {
            return Err(StageError::StateMismatch {
                expected: "演示对话框已打开".to_string(),
                actual: "演示对话框未打开".to_string(),
            });
        }
        if let Some(session) = self.demo.start() {
            self.timers.schedule(
                self.now_ms.saturating_add(self.demo.config().tick_ms),
                TimerEvent::ChoreographyTick { session },
            );
            info!(session, "碰撞演示开始");
            events.push(StageEvent::DemoStarted { session });
        }
        Ok(())
    }

    fn close_demo(&mut self, events: &mut Vec<StageEvent>) {
        if self.demo.close() {
            let cancelled = self
                .timers
                .cancel_where(|e| matches!(e, TimerEvent::ChoreographyTick { .. }));
            debug!(cancelled, "演示定时器已取消");
        }
        info!("碰撞演示已关闭");
        events.push(StageEvent::DemoClosed);
    }

    /// 用渲染层测得的中心校准舞台原点
    fn calibrate_centre(&mut self, measured: Point) {
        let pos = self.state.transform.position();
        let half = self.config.geometry.half_extent;
        self.origin = Point::new(measured.x - pos.x - half.x, measured.y - pos.y - half.y);
    }
}
