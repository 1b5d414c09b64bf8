//! # Router 模块
//!
//! 根据触发请求决定启动哪些运行。
//!
//! 路由只做选择，不修改任何状态：返回一个 [`DispatchPlan`]，
//! 由 [`crate::runtime::Stage`] 负责压入快照并启动运行。
//!
//! 触发事件启动的运行跳过组首的触发器标记，第一个真正的动作随触发立即执行；
//! "运行全部"保留所有条目。

use serde::{Deserialize, Serialize};

use crate::action::{Action, TriggerEvent};
use crate::program::Program;
use crate::runtime::sequencer::RunOrigin;

/// 触发请求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// 触发事件：启动所有包含该触发器的动作组
    Trigger(TriggerEvent),
    /// 运行全部：所有动作组拼接为一次运行
    RunAll,
}

/// 忽略原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// 没有匹配的动作组（或匹配的组除触发器外为空）
    NoMatchingGroup,
    /// 已有运行在进行（绿旗在运行期间不可用）
    Busy,
}

/// 路由结果
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchPlan {
    /// 压入一份快照，然后同时启动这些运行
    Start(Vec<(RunOrigin, Vec<Action>)>),
    /// 什么都不做
    Ignore(IgnoreReason),
}

/// 为一次触发请求制定计划
pub fn plan(program: &Program, dispatch: Dispatch, playing: bool) -> DispatchPlan {
    match dispatch {
        Dispatch::Trigger(TriggerEvent::FlagClicked) if playing => {
            DispatchPlan::Ignore(IgnoreReason::Busy)
        }
        Dispatch::Trigger(event) => {
            let runs: Vec<_> = program
                .groups_for(event)
                .map(|g| without_leading_trigger(g.items()))
                .filter(|actions| !actions.is_empty())
                .map(|actions| (RunOrigin::Trigger(event), actions.to_vec()))
                .collect();
            if runs.is_empty() {
                DispatchPlan::Ignore(IgnoreReason::NoMatchingGroup)
            } else {
                DispatchPlan::Start(runs)
            }
        }
        Dispatch::RunAll => {
            let actions = program.flatten();
            if actions.is_empty() {
                DispatchPlan::Ignore(IgnoreReason::NoMatchingGroup)
            } else {
                DispatchPlan::Start(vec![(RunOrigin::RunAll, actions)])
            }
        }
    }
}

/// 去掉组首的触发器标记
fn without_leading_trigger(items: &[Action]) -> &[Action] {
    match items.split_first() {
        Some((first, rest)) if first.is_trigger() => rest,
        _ => items,
    }
}
