//! # History 模块
//!
//! 撤销历史：每次运行开始前保存一份角色状态快照。
//!
//! ## 设计原则
//!
//! - 每次触发最多压入一份快照，不论启动了多少个动作组
//! - 只记录变换与气泡，不记录过渡提示
//! - 有上限，超出时丢弃最早的快照

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::state::{SpeechState, SpriteState, Transform};

/// 运行前快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub transform: Transform,
    pub speech: SpeechState,
}

impl HistorySnapshot {
    /// 从当前状态截取快照
    pub fn capture(state: &SpriteState) -> Self {
        Self {
            transform: state.transform,
            speech: state.speech().clone(),
        }
    }

    /// 将快照原样写回状态
    pub fn restore_into(&self, state: &mut SpriteState) {
        state.transform = self.transform;
        state.set_speech(self.speech.clone());
    }
}

/// 撤销历史栈
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoHistory {
    snapshots: VecDeque<HistorySnapshot>,
    max_depth: usize,
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoHistory {
    /// 创建新的撤销历史
    pub fn new() -> Self {
        Self {
            snapshots: VecDeque::new(),
            max_depth: 1000, // 默认最多保留 1000 份
        }
    }

    /// 设置最大快照数
    pub fn with_max_depth(mut self, max: usize) -> Self {
        self.max_depth = max.max(1);
        self
    }

    /// 压入快照
    pub fn push(&mut self, snapshot: HistorySnapshot) {
        self.snapshots.push_back(snapshot);

        while self.snapshots.len() > self.max_depth {
            self.snapshots.pop_front();
        }
    }

    /// 截取当前状态并压入
    pub fn snapshot_before_run(&mut self, state: &SpriteState) {
        self.push(HistorySnapshot::capture(state));
    }

    /// 弹出最近的快照并恢复到状态
    ///
    /// 栈为空时不做任何事，返回 `false`。
    pub fn undo(&mut self, state: &mut SpriteState) -> bool {
        match self.snapshots.pop_back() {
            Some(snapshot) => {
                snapshot.restore_into(state);
                true
            }
            None => false,
        }
    }

    /// 最近的快照
    pub fn peek(&self) -> Option<&HistorySnapshot> {
        self.snapshots.back()
    }

    /// 清空历史
    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    /// 当前深度（用于撤销角标）
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_at(x: f64) -> SpriteState {
        let mut state = SpriteState::new();
        state.transform.x = x;
        state
    }

    #[test]
    fn test_undo_restores_latest_snapshot() {
        let mut history = UndoHistory::new();
        let mut state = state_at(1.0);

        history.snapshot_before_run(&state);
        state.transform.x = 2.0;
        history.snapshot_before_run(&state);
        state.transform.x = 3.0;
        state.set_speech(SpeechState::new("later", 100, false));
        assert_eq!(history.len(), 2);

        assert!(history.undo(&mut state));
        assert_eq!(state.transform.x, 2.0);
        assert_eq!(state.speech(), &SpeechState::default());
        assert_eq!(history.len(), 1);

        assert!(history.undo(&mut state));
        assert_eq!(state.transform.x, 1.0);
        assert!(history.is_empty());
    }

    #[test]
    fn test_undo_on_empty_is_noop() {
        let mut history = UndoHistory::new();
        let mut state = state_at(5.0);
        let version = state.speech_version();

        assert!(!history.undo(&mut state));
        assert_eq!(state.transform.x, 5.0);
        assert_eq!(state.speech_version(), version);
    }

    #[test]
    fn test_history_max_depth() {
        let mut history = UndoHistory::new().with_max_depth(3);

        for i in 0..10 {
            history.snapshot_before_run(&state_at(i as f64));
        }

        assert_eq!(history.len(), 3);
        // 保留最后 3 份
        assert_eq!(history.peek().unwrap().transform.x, 9.0);
        let mut state = SpriteState::new();
        history.undo(&mut state);
        history.undo(&mut state);
        assert_eq!(state.transform.x, 8.0);
        history.undo(&mut state);
        assert_eq!(state.transform.x, 7.0);
    }

    #[test]
    fn test_history_serialization() {
        let mut history = UndoHistory::new();
        history.snapshot_before_run(&state_at(4.0));

        let json = serde_json::to_string(&history).unwrap();
        let loaded: UndoHistory = serde_json::from_str(&json).unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.peek(), history.peek());
    }
}
