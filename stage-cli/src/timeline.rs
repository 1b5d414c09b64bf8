//! # Timeline 模块
//!
//! 按时间回放输入序列，驱动舞台并收集带时间戳的事件。
//!
//! 文件格式：
//!
//! ```json
//! [
//!   { "at_ms": 0, "input": "flag_clicked" },
//!   { "at_ms": 500, "input": "key_down", "key": "space" }
//! ]
//! ```

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use stage_runtime::{Stage, StageEvent, StageInput, StageSnapshot};
use tracing::{debug, warn};

/// 时间线中的一条输入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// 输入发生的时刻（毫秒）
    pub at_ms: u64,
    #[serde(flatten)]
    pub input: StageInput,
}

/// 带时间戳的事件
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedEvent {
    pub at_ms: u64,
    #[serde(flatten)]
    pub event: StageEvent,
}

/// 被拒绝的输入
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedInput {
    pub at_ms: u64,
    pub error: String,
}

/// 回放结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Replay {
    pub snapshot: StageSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<TimedEvent>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedInput>,
}

/// 读取时间线文件，按时刻稳定排序
pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Vec<TimelineEntry>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("时间线读取失败: {}", path.display()))?;
    let mut entries: Vec<TimelineEntry> = serde_json::from_str(&content)
        .with_context(|| format!("时间线解析失败: {}", path.display()))?;
    entries.sort_by_key(|e| e.at_ms);
    Ok(entries)
}

/// 回放器
pub struct Player {
    stage: Stage,
    events: Vec<TimedEvent>,
    rejected: Vec<RejectedInput>,
}

impl Player {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            events: Vec::new(),
            rejected: Vec::new(),
        }
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// 记录不经过输入产生的事件（如加载程序时的单次动作）
    pub fn record(&mut self, events: Vec<StageEvent>) {
        let at_ms = self.stage.now_ms();
        self.events
            .extend(events.into_iter().map(|event| TimedEvent { at_ms, event }));
    }

    /// 推进到指定时刻，逐个记录到期事件的触发时刻
    pub fn advance_to(&mut self, target_ms: u64) {
        while let Some(due) = self.stage.next_due().filter(|due| *due <= target_ms) {
            let events = self.stage.advance_to(due);
            self.record(events);
        }
        let events = self.stage.advance_to(target_ms);
        self.record(events);
    }

    /// 推进到所有运行与清除事件都已触发
    pub fn settle(&mut self) {
        while !self.stage.is_settled() {
            let Some(due) = self.stage.next_due() else {
                break;
            };
            self.advance_to(due);
        }
    }

    /// 回放整条时间线
    ///
    /// `until_ms` 为空时在最后一条输入之后继续推进，直到舞台静止。
    pub fn play(&mut self, entries: Vec<TimelineEntry>, until_ms: Option<u64>) {
        for entry in entries {
            if until_ms.is_some_and(|until| entry.at_ms > until) {
                debug!(at_ms = entry.at_ms, "超出回放截止时刻，停止");
                break;
            }
            self.advance_to(entry.at_ms.max(self.stage.now_ms()));
            match self.stage.handle_input(entry.input) {
                Ok(events) => self.record(events),
                Err(e) => {
                    warn!(at_ms = entry.at_ms, error = %e, "输入被拒绝");
                    self.rejected.push(RejectedInput {
                        at_ms: entry.at_ms,
                        error: e.to_string(),
                    });
                }
            }
        }

        match until_ms {
            Some(until) => self.advance_to(until.max(self.stage.now_ms())),
            None => self.settle(),
        }
    }

    /// 结束回放
    pub fn finish(self, with_events: bool) -> Replay {
        Replay {
            snapshot: self.stage.snapshot(),
            events: with_events.then_some(self.events),
            rejected: self.rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stage_runtime::{Program, StageConfig};

    const PROGRAM: &str = r#"{
        "groups": [
            { "items": [
                { "type": "flag_clicked" },
                { "type": "go_to", "initialValue": { "x": 10, "y": 20 } },
                { "type": "say_for_seconds", "initialValue": { "message": "hi", "delay": 1 } }
            ] }
        ]
    }"#;

    fn player() -> Player {
        let program = Program::from_json(PROGRAM).unwrap();
        let stage = Stage::with_config(program, StageConfig::default().with_seed(1)).unwrap();
        Player::new(stage)
    }

    #[test]
    fn test_timeline_format() {
        let entries: Vec<TimelineEntry> = serde_json::from_str(
            r#"[
                { "at_ms": 0, "input": "flag_clicked" },
                { "at_ms": 20, "input": "key_down", "key": "space" },
                { "at_ms": 30, "input": "clicked", "action": { "type": "move", "initialValue": { "x": 1 } } }
            ]"#,
        )
        .unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].input, StageInput::FlagClicked);
        assert_eq!(entries[1].input, StageInput::key("Space"));
        assert_eq!(entries[2].at_ms, 30);
    }

    #[test]
    fn test_load_sorts_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timeline.json");
        fs::write(
            &path,
            r#"[ { "at_ms": 50, "input": "undo" }, { "at_ms": 0, "input": "flag_clicked" } ]"#,
        )
        .unwrap();

        let entries = load(&path).unwrap();
        assert_eq!(entries[0].input, StageInput::FlagClicked);
        assert_eq!(entries[1].input, StageInput::Undo);
    }

    #[test]
    fn test_play_until_settled() {
        let mut player = player();
        player.play(
            vec![TimelineEntry {
                at_ms: 0,
                input: StageInput::FlagClicked,
            }],
            None,
        );

        let replay = player.finish(true);
        assert_eq!(replay.snapshot.transform.x, 10.0);
        assert!(!replay.snapshot.playing);
        // go_to 随点击执行，气泡在 10ms 出现，1010ms 清除
        assert_eq!(replay.snapshot.now_ms, 1010);
        assert!(replay.snapshot.speech.message.is_empty());

        let events = replay.events.unwrap();
        let cleared = events
            .iter()
            .find(|e| e.event == StageEvent::SpeechCleared)
            .unwrap();
        assert_eq!(cleared.at_ms, 1010);
    }

    #[test]
    fn test_play_until_cutoff() {
        let mut player = player();
        player.play(
            vec![
                TimelineEntry {
                    at_ms: 0,
                    input: StageInput::FlagClicked,
                },
                TimelineEntry {
                    at_ms: 900,
                    input: StageInput::Reset,
                },
            ],
            Some(500),
        );

        let replay = player.finish(false);
        assert_eq!(replay.snapshot.now_ms, 500);
        assert_eq!(replay.snapshot.speech.message, "hi");
        assert!(replay.events.is_none());
    }

    #[test]
    fn test_rejected_input_is_recorded() {
        let mut player = player();
        player.play(
            vec![TimelineEntry {
                at_ms: 5,
                input: StageInput::DemoStart,
            }],
            None,
        );

        let replay = player.finish(false);
        assert_eq!(replay.rejected.len(), 1);
        assert_eq!(replay.rejected[0].at_ms, 5);
    }
}
