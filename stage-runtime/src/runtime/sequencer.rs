//! # Sequencer 模块
//!
//! 按顺序逐步执行一个动作列表。
//!
//! ## 状态机
//!
//! ```text
//! Idle ──begin_step(0)──► Running { step: 0 } ──complete_step──► Running { step: 1 } ... ──► Finished
//! ```
//!
//! 序列器只负责"下一步是哪一步"，不执行动作，也不管时间；
//! 由 [`crate::runtime::Stage`] 调用处理器并把下一步排进定时队列。
//! 不同运行之间互不排斥，它们的步骤在定时队列中交错。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::action::{Action, TriggerEvent};

/// 运行标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 运行来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOrigin {
    /// 由触发事件启动的动作组
    Trigger(TriggerEvent),
    /// "运行全部"
    RunAll,
}

/// 单次运行的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running { step: usize },
    Finished,
}

/// 单次运行
#[derive(Debug, Clone)]
pub struct Run {
    id: RunId,
    origin: RunOrigin,
    actions: Vec<Action>,
    state: RunState,
}

impl Run {
    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn origin(&self) -> RunOrigin {
        self.origin
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn state(&self) -> RunState {
        self.state
    }
}

/// 一步完成后的去向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// 还有下一步
    Continue { next: usize },
    /// 运行结束
    Finished,
}

/// 序列器
#[derive(Debug, Default)]
pub struct Sequencer {
    runs: BTreeMap<RunId, Run>,
    next_id: u64,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一次新运行（处于 `Idle`）
    pub fn start(&mut self, origin: RunOrigin, actions: Vec<Action>) -> RunId {
        self.next_id += 1;
        let id = RunId(self.next_id);
        self.runs.insert(
            id,
            Run {
                id,
                origin,
                actions,
                state: RunState::Idle,
            },
        );
        id
    }

    /// 进入第 `index` 步，返回要执行的动作
    ///
    /// 运行已不存在（被取消或已结束）或索引越界时返回 `None`。
    pub fn begin_step(&mut self, id: RunId, index: usize) -> Option<&Action> {
        let run = self.runs.get_mut(&id)?;
        if index >= run.actions.len() {
            return None;
        }
        run.state = RunState::Running { step: index };
        run.actions.get(index)
    }

    /// 完成第 `index` 步
    ///
    /// 最后一步完成时运行被移除。
    pub fn complete_step(&mut self, id: RunId, index: usize) -> StepOutcome {
        let Some(run) = self.runs.get_mut(&id) else {
            return StepOutcome::Finished;
        };
        if index + 1 < run.actions.len() {
            StepOutcome::Continue { next: index + 1 }
        } else {
            run.state = RunState::Finished;
            self.runs.remove(&id);
            StepOutcome::Finished
        }
    }

    /// 取消所有运行，返回 `(运行, 当前步)` 列表
    pub fn cancel_all(&mut self) -> Vec<(RunId, Option<usize>)> {
        std::mem::take(&mut self.runs)
            .into_values()
            .map(|run| {
                let step = match run.state {
                    RunState::Running { step } => Some(step),
                    _ => None,
                };
                (run.id, step)
            })
            .collect()
    }

    /// 查询运行
    pub fn get(&self, id: RunId) -> Option<&Run> {
        self.runs.get(&id)
    }

    /// 是否有运行中的动作列表
    pub fn is_playing(&self) -> bool {
        !self.runs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moves(n: usize) -> Vec<Action> {
        (0..n).map(|i| Action::Move { dx: i as f64 }).collect()
    }

    #[test]
    fn test_run_walks_every_step_in_order() {
        let mut seq = Sequencer::new();
        let id = seq.start(RunOrigin::RunAll, moves(3));
        assert!(seq.is_playing());
        assert_eq!(seq.get(id).unwrap().state(), RunState::Idle);

        let mut visited = Vec::new();
        let mut index = 0;
        loop {
            let action = seq.begin_step(id, index).cloned().unwrap();
            visited.push(action);
            assert_eq!(seq.get(id).unwrap().state(), RunState::Running { step: index });
            match seq.complete_step(id, index) {
                StepOutcome::Continue { next } => index = next,
                StepOutcome::Finished => break,
            }
        }

        assert_eq!(visited, moves(3));
        assert!(!seq.is_playing());
        assert!(seq.get(id).is_none());
    }

    #[test]
    fn test_independent_runs() {
        let mut seq = Sequencer::new();
        let a = seq.start(RunOrigin::Trigger(TriggerEvent::FlagClicked), moves(2));
        let b = seq.start(RunOrigin::Trigger(TriggerEvent::FlagClicked), moves(1));
        assert_ne!(a, b);
        assert!(seq.get(a).is_some() && seq.get(b).is_some());

        seq.begin_step(b, 0);
        assert_eq!(seq.complete_step(b, 0), StepOutcome::Finished);
        assert!(seq.is_playing());

        seq.begin_step(a, 0);
        assert_eq!(seq.complete_step(a, 0), StepOutcome::Continue { next: 1 });
    }

    #[test]
    fn test_cancel_all_reports_progress() {
        let mut seq = Sequencer::new();
        let a = seq.start(RunOrigin::RunAll, moves(3));
        let b = seq.start(RunOrigin::RunAll, moves(3));
        seq.begin_step(a, 0);
        seq.complete_step(a, 0);
        seq.begin_step(a, 1);

        let cancelled = seq.cancel_all();
        assert_eq!(cancelled, vec![(a, Some(1)), (b, None)]);
        assert!(!seq.is_playing());
        assert!(seq.begin_step(a, 2).is_none());
        assert_eq!(seq.complete_step(a, 2), StepOutcome::Finished);
    }
}
