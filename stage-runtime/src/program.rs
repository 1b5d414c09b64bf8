//! # Program 模块
//!
//! 外部协作方提供的动作组集合。
//!
//! ## 数据契约
//!
//! ```text
//! {
//!   "groups": [ { "items": [ { "type": "flag_clicked" }, { "type": "move", "initialValue": { "x": 10 } } ] } ],
//!   "clicked": { "type": "say", "initialValue": { "message": "hi" } }
//! }
//! ```
//!
//! [`ProgramData`] 是原样反序列化的 JSON；[`Program`] 是校验后的版本，
//! 每个描述符都已转换为 [`Action`]。

use serde::{Deserialize, Serialize};

use crate::action::{Action, ActionDescriptor, TriggerEvent};
use crate::error::ProgramError;

/// 原始动作组
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupData {
    #[serde(default)]
    pub items: Vec<ActionDescriptor>,
}

/// 原始程序数据
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgramData {
    #[serde(default)]
    pub groups: Vec<GroupData>,
    /// 单次点击触发的动作
    #[serde(default)]
    pub clicked: Option<ActionDescriptor>,
}

impl ProgramData {
    /// 从 JSON 文本解析
    pub fn from_json(text: &str) -> Result<Self, ProgramError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// 校验后的动作组
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    items: Vec<Action>,
}

impl Group {
    pub fn new(items: Vec<Action>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[Action] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 组内是否包含指定触发器
    pub fn responds_to(&self, event: TriggerEvent) -> bool {
        self.items
            .iter()
            .any(|a| matches!(a, Action::Trigger { event: e } if *e == event))
    }

    /// 组内是否包含任何触发器
    pub fn has_trigger(&self) -> bool {
        self.items.iter().any(Action::is_trigger)
    }
}

/// 校验后的程序
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    groups: Vec<Group>,
    clicked: Option<Action>,
}

impl Program {
    /// 直接由动作组构建
    pub fn new(groups: Vec<Group>) -> Self {
        Self {
            groups,
            clicked: None,
        }
    }

    /// 设置单次点击动作
    pub fn with_clicked(mut self, action: Action) -> Self {
        self.clicked = Some(action);
        self
    }

    /// 校验原始数据
    ///
    /// 任何一个描述符校验失败都会使整个程序加载失败，错误中带有组与项的索引。
    pub fn from_data(data: &ProgramData) -> Result<Self, ProgramError> {
        let groups = data
            .groups
            .iter()
            .enumerate()
            .map(|(group, g)| {
                g.items
                    .iter()
                    .enumerate()
                    .map(|(item, desc)| {
                        Action::from_descriptor(desc)
                            .map_err(|source| ProgramError::InvalidAction { group, item, source })
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Group::new)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let clicked = data
            .clicked
            .as_ref()
            .map(Action::from_descriptor)
            .transpose()
            .map_err(ProgramError::InvalidClicked)?;

        Ok(Self { groups, clicked })
    }

    /// 从 JSON 文本解析并校验
    pub fn from_json(text: &str) -> Result<Self, ProgramError> {
        Self::from_data(&ProgramData::from_json(text)?)
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn clicked(&self) -> Option<&Action> {
        self.clicked.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// 响应指定事件的动作组
    pub fn groups_for(&self, event: TriggerEvent) -> impl Iterator<Item = &Group> {
        self.groups.iter().filter(move |g| g.responds_to(event))
    }

    /// 将所有动作组按顺序拼接为一个列表
    pub fn flatten(&self) -> Vec<Action> {
        self.groups
            .iter()
            .flat_map(|g| g.items.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActionError;

    const SAMPLE: &str = r#"{
        "groups": [
            { "items": [
                { "type": "flag_clicked" },
                { "type": "go_to", "initialValue": { "x": 10, "y": 20 } }
            ] },
            { "items": [
                { "type": "space_clicked" },
                { "type": "say", "initialValue": { "message": "hi" } }
            ] },
            { "items": [
                { "type": "move", "initialValue": { "x": 5 } }
            ] }
        ],
        "clicked": { "type": "change_size", "initialValue": { "size": 3 } }
    }"#;

    #[test]
    fn test_program_from_json() {
        let program = Program::from_json(SAMPLE).unwrap();
        assert_eq!(program.groups().len(), 3);
        assert_eq!(program.groups()[0].len(), 2);
        assert_eq!(
            program.clicked(),
            Some(&Action::ChangeSize { delta: 3.0 })
        );
    }

    #[test]
    fn test_groups_for_filters_by_trigger() {
        let program = Program::from_json(SAMPLE).unwrap();

        let flag: Vec<_> = program.groups_for(TriggerEvent::FlagClicked).collect();
        assert_eq!(flag.len(), 1);
        assert_eq!(flag[0].items()[1], Action::GoTo { x: 10.0, y: 20.0 });

        assert_eq!(program.groups_for(TriggerEvent::SpriteClicked).count(), 0);
        assert!(!program.groups()[2].has_trigger());
    }

    #[test]
    fn test_flatten_keeps_order() {
        let program = Program::from_json(SAMPLE).unwrap();
        let all = program.flatten();
        assert_eq!(all.len(), 5);
        assert!(all[0].is_trigger());
        assert_eq!(all[4], Action::Move { dx: 5.0 });
    }

    #[test]
    fn test_invalid_item_reports_location() {
        let err = Program::from_json(
            r#"{ "groups": [ { "items": [] }, { "items": [ { "type": "flag_clicked" }, { "type": "move", "initialValue": { "x": "far" } } ] } ] }"#,
        )
        .unwrap_err();

        assert_eq!(
            err,
            ProgramError::InvalidAction {
                group: 1,
                item: 1,
                source: ActionError::NotANumber {
                    action: "move".to_string(),
                    param: "x".to_string(),
                    value: "\"far\"".to_string(),
                },
            }
        );
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let program = Program::from_json("{}").unwrap();
        assert!(program.is_empty());
        assert!(program.clicked().is_none());
    }
}
