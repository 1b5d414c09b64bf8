//! # Timer 模块
//!
//! 单一的定时队列。序列器的下一步、气泡与过渡提示的清除、碰撞演示的步进
//! 全部以事件形式排在这里，按 `(到期时间, 入队序号)` 依次触发。

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::runtime::sequencer::RunId;

/// 定时事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// 执行某次运行的第 `index` 步
    Step { run: RunId, index: usize },
    /// 清除对话气泡
    ClearSpeech { version: u64 },
    /// 清除过渡提示
    ClearAnimation { version: u64 },
    /// 碰撞演示步进
    ChoreographyTick { session: u64 },
}

impl TimerEvent {
    /// 事件类别名（用于日志）
    pub fn label(&self) -> &'static str {
        match self {
            Self::Step { .. } => "step",
            Self::ClearSpeech { .. } => "clear_speech",
            Self::ClearAnimation { .. } => "clear_animation",
            Self::ChoreographyTick { .. } => "choreography_tick",
        }
    }
}

/// 已排队的事件
#[derive(Debug, Clone, Copy)]
pub struct Scheduled {
    pub due_ms: u64,
    pub seq: u64,
    pub event: TimerEvent,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due_ms, self.seq).cmp(&(other.due_ms, other.seq))
    }
}

/// 定时队列
#[derive(Debug, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<Reverse<Scheduled>>,
    next_seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 排入一个在 `due_ms` 到期的事件
    pub fn schedule(&mut self, due_ms: u64, event: TimerEvent) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Scheduled { due_ms, seq, event }));
    }

    /// 取出最早一个不晚于 `until_ms` 的事件
    pub fn pop_due(&mut self, until_ms: u64) -> Option<Scheduled> {
        match self.heap.peek() {
            Some(Reverse(next)) if next.due_ms <= until_ms => self.heap.pop().map(|Reverse(s)| s),
            _ => None,
        }
    }

    /// 最早的到期时间
    pub fn next_due(&self) -> Option<u64> {
        self.heap.peek().map(|Reverse(s)| s.due_ms)
    }

    /// 移除满足条件的事件，返回移除数量
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&TimerEvent) -> bool) -> usize {
        let before = self.heap.len();
        self.heap.retain(|Reverse(s)| !pred(&s.event));
        before - self.heap.len()
    }

    /// 是否存在满足条件的事件
    pub fn any(&self, mut pred: impl FnMut(&TimerEvent) -> bool) -> bool {
        self.heap.iter().any(|Reverse(s)| pred(&s.event))
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
