//! # Action 模块
//!
//! 定义外部协作方提供的动作描述符，以及校验后的强类型动作。
//!
//! ## 设计原则
//!
//! - **声明式**：`Action` 描述"做什么"，由 [`crate::handler`] 负责"怎么做"
//! - **入口校验**：参数包在 [`Action::from_descriptor`] 中一次性校验，
//!   执行阶段不再处理非数字参数
//! - **未知类型不报错**：无法识别的动作类型转换为 [`Action::Unknown`]，执行时为空操作

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::ActionError;

/// 外部提供的原始动作描述符
///
/// 对应 JSON 结构 `{ "type": "...", "initialValue": { ... } }`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    /// 动作类型名
    #[serde(rename = "type")]
    pub kind: String,
    /// 参数包
    #[serde(rename = "initialValue", default)]
    pub initial_value: Value,
}

impl ActionDescriptor {
    /// 创建动作描述符
    pub fn new(kind: impl Into<String>, initial_value: Value) -> Self {
        Self {
            kind: kind.into(),
            initial_value,
        }
    }

    /// 创建不带参数的描述符（如触发器）
    pub fn bare(kind: impl Into<String>) -> Self {
        Self::new(kind, Value::Null)
    }
}

/// 触发事件
///
/// 动作组通过包含同名描述符来声明自己响应哪个事件。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    /// 点击绿旗
    FlagClicked,
    /// 点击角色
    SpriteClicked,
    /// 按下空格键
    SpaceClicked,
}

impl TriggerEvent {
    /// 描述符中使用的类型名
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FlagClicked => "flag_clicked",
            Self::SpriteClicked => "sprite_clicked",
            Self::SpaceClicked => "space_clicked",
        }
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerEvent {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flag_clicked" => Ok(Self::FlagClicked),
            "sprite_clicked" => Ok(Self::SpriteClicked),
            "space_clicked" => Ok(Self::SpaceClicked),
            _ => Err(()),
        }
    }
}

/// 对话气泡样式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bubble {
    /// 说
    Say,
    /// 想
    Think,
}

/// 校验后的动作
///
/// 每个变体携带该动作需要的强类型参数。数值统一使用 `f64`，
/// 持续时间统一为毫秒。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// 触发器标记，执行时为空操作
    Trigger { event: TriggerEvent },

    /// `move`：x 方向相对移动
    Move { dx: f64 },

    /// `go_to`：移动到绝对坐标
    GoTo { x: f64, y: f64 },

    /// `random`：移动到随机位置
    Random,

    /// `clockwise` / `anticlockwise`：相对旋转（逆时针为负）
    Turn { degrees: f64 },

    /// `glide`：带过渡时长移动到绝对坐标
    Glide { x: f64, y: f64, duration_ms: u64 },

    /// `custom_action`：带过渡时长相对移动
    GlideBy { dx: f64, dy: f64, duration_ms: u64 },

    /// `glide_random`：带过渡时长移动到随机位置
    GlideRandom { duration_ms: u64 },

    /// `point_in_direction`：设置绝对朝向
    PointInDirection { direction: f64 },

    /// `mouse_pointer`：朝向鼠标指针
    PointTowardsPointer,

    /// `change_x_by`
    ChangeXBy { dx: f64 },

    /// `set_x`
    SetX { x: f64 },

    /// `change_y_by`
    ChangeYBy { dy: f64 },

    /// `set_y`（保留原始数值，不做整数截断）
    SetY { y: f64 },

    /// `say` / `say_for_seconds` / `think` / `think_for_seconds`
    ///
    /// `timeout_ms` 为 `None` 时气泡不会自动消失。
    Speak {
        message: String,
        bubble: Bubble,
        timeout_ms: Option<u64>,
    },

    /// `change_size`
    ChangeSize { delta: f64 },

    /// 无法识别的动作类型（空操作）
    Unknown { name: String },
}

impl Action {
    /// 从原始描述符构建强类型动作
    ///
    /// 整数参数按"前导整数"规则解析（`"12px"` → 12，`12.7` → 12）；
    /// 无法得到数字时返回 [`ActionError::NotANumber`]。
    pub fn from_descriptor(desc: &ActionDescriptor) -> Result<Self, ActionError> {
        let p = Params::new(&desc.kind, &desc.initial_value);

        if let Ok(event) = desc.kind.parse::<TriggerEvent>() {
            return Ok(Self::Trigger { event });
        }

        let action = match desc.kind.as_str() {
            "move" => Self::Move { dx: p.int("x")? },
            "go_to" => Self::GoTo {
                x: p.int("x")?,
                y: p.int("y")?,
            },
            "random" => Self::Random,
            "clockwise" => Self::Turn {
                degrees: p.int("rotation")?,
            },
            "anticlockwise" => Self::Turn {
                degrees: -p.int("rotation")?,
            },
            "glide" => Self::Glide {
                x: p.int("x")?,
                y: p.int("y")?,
                duration_ms: p.seconds_as_ms("delay")?,
            },
            "custom_action" => Self::GlideBy {
                dx: p.number("x")?,
                dy: p.int("y")?,
                duration_ms: p.seconds_as_ms("delay")?,
            },
            "glide_random" => Self::GlideRandom {
                duration_ms: match p.get("delay") {
                    Some(_) => p.seconds_as_ms("delay")?,
                    None => p.seconds_as_ms("seconds")?,
                },
            },
            "point_in_direction" => Self::PointInDirection {
                direction: p.int("direction")?,
            },
            "mouse_pointer" => Self::PointTowardsPointer,
            "change_x_by" => Self::ChangeXBy { dx: p.int("x")? },
            "set_x" => Self::SetX { x: p.int("x")? },
            "change_y_by" => Self::ChangeYBy { dy: p.int("y")? },
            "set_y" => Self::SetY { y: p.number("y")? },
            "say" => Self::Speak {
                message: p.text("message")?,
                bubble: Bubble::Say,
                timeout_ms: None,
            },
            "say_for_seconds" => Self::Speak {
                message: p.text("message")?,
                bubble: Bubble::Say,
                timeout_ms: Some(p.seconds_as_ms("delay")?),
            },
            "think" => Self::Speak {
                message: p.text("message")?,
                bubble: Bubble::Think,
                timeout_ms: None,
            },
            "think_for_seconds" => Self::Speak {
                message: p.text("message")?,
                bubble: Bubble::Think,
                timeout_ms: Some(p.seconds_as_ms("delay")?),
            },
            "change_size" => Self::ChangeSize {
                delta: p.number("size")?,
            },
            other => Self::Unknown {
                name: other.to_string(),
            },
        };

        Ok(action)
    }

    /// 是否为触发器标记
    pub fn is_trigger(&self) -> bool {
        matches!(self, Self::Trigger { .. })
    }

    /// 是否为无法识别的动作
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown { .. })
    }

    /// 动作名（用于日志）
    pub fn name(&self) -> &str {
        match self {
            Self::Trigger { event } => event.as_str(),
            Self::Move { .. } => "move",
            Self::GoTo { .. } => "go_to",
            Self::Random => "random",
            Self::Turn { .. } => "turn",
            Self::Glide { .. } => "glide",
            Self::GlideBy { .. } => "custom_action",
            Self::GlideRandom { .. } => "glide_random",
            Self::PointInDirection { .. } => "point_in_direction",
            Self::PointTowardsPointer => "mouse_pointer",
            Self::ChangeXBy { .. } => "change_x_by",
            Self::SetX { .. } => "set_x",
            Self::ChangeYBy { .. } => "change_y_by",
            Self::SetY { .. } => "set_y",
            Self::Speak {
                bubble: Bubble::Say,
                ..
            } => "say",
            Self::Speak {
                bubble: Bubble::Think,
                ..
            } => "think",
            Self::ChangeSize { .. } => "change_size",
            Self::Unknown { name } => name.as_str(),
        }
    }
}

impl TryFrom<&ActionDescriptor> for Action {
    type Error = ActionError;

    fn try_from(desc: &ActionDescriptor) -> Result<Self, Self::Error> {
        Self::from_descriptor(desc)
    }
}

/// 定时参数的上限（秒）
pub const MAX_DELAY_SECS: f64 = 86_400.0;

/// 参数包读取辅助
struct Params<'a> {
    action: &'a str,
    value: &'a Value,
}

impl<'a> Params<'a> {
    fn new(action: &'a str, value: &'a Value) -> Self {
        Self { action, value }
    }

    fn get(&self, name: &str) -> Option<&'a Value> {
        self.value.get(name).filter(|v| !v.is_null())
    }

    fn require(&self, name: &str) -> Result<&'a Value, ActionError> {
        self.get(name).ok_or_else(|| ActionError::MissingParameter {
            action: self.action.to_string(),
            param: name.to_string(),
        })
    }

    fn not_a_number(&self, name: &str, value: &Value) -> ActionError {
        ActionError::NotANumber {
            action: self.action.to_string(),
            param: name.to_string(),
            value: value.to_string(),
        }
    }

    /// 整数参数：数字向零截断，字符串取前导整数
    fn int(&self, name: &str) -> Result<f64, ActionError> {
        let value = self.require(name)?;
        let parsed = match value {
            Value::Number(n) => n.as_f64().map(f64::trunc),
            Value::String(s) => leading_integer(s),
            _ => None,
        };
        parsed
            .filter(|n| n.is_finite())
            .ok_or_else(|| self.not_a_number(name, value))
    }

    /// 原始数值参数：数字原样保留，字符串整体解析
    fn number(&self, name: &str) -> Result<f64, ActionError> {
        let value = self.require(name)?;
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed
            .filter(|n| n.is_finite())
            .ok_or_else(|| self.not_a_number(name, value))
    }

    /// 以秒为单位的整数参数，转换为毫秒（负值视为 0，超过 [`MAX_DELAY_SECS`] 报错）
    fn seconds_as_ms(&self, name: &str) -> Result<u64, ActionError> {
        let secs = self.int(name)?;
        if secs > MAX_DELAY_SECS {
            return Err(ActionError::InvalidParameter {
                action: self.action.to_string(),
                param: name.to_string(),
                message: format!("时长超过上限 {MAX_DELAY_SECS} 秒: {secs}"),
            });
        }
        Ok((secs.max(0.0) * 1000.0) as u64)
    }

    fn text(&self, name: &str) -> Result<String, ActionError> {
        match self.require(name)? {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            _ => Err(ActionError::InvalidParameter {
                action: self.action.to_string(),
                param: name.to_string(),
                message: "需要字符串".to_string(),
            }),
        }
    }
}

/// 解析字符串的前导整数部分
///
/// 允许前导空白与正负号，遇到第一个非数字字符停止；没有任何数字时返回 `None`。
fn leading_integer(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let n = digits[..end].parse::<f64>().ok()?;
    Some(if negative { -n } else { n })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn action(kind: &str, value: Value) -> Result<Action, ActionError> {
        Action::from_descriptor(&ActionDescriptor::new(kind, value))
    }

    #[test]
    fn test_descriptor_json_shape() {
        let desc: ActionDescriptor =
            serde_json::from_value(json!({"type": "go_to", "initialValue": {"x": 10, "y": 20}}))
                .unwrap();
        assert_eq!(desc.kind, "go_to");
        assert_eq!(desc.initial_value["x"], 10);

        let bare: ActionDescriptor = serde_json::from_value(json!({"type": "flag_clicked"})).unwrap();
        assert!(bare.initial_value.is_null());
    }

    #[test]
    fn test_trigger_parsing() {
        assert_eq!(
            action("flag_clicked", Value::Null).unwrap(),
            Action::Trigger {
                event: TriggerEvent::FlagClicked
            }
        );
        assert_eq!("space_clicked".parse(), Ok(TriggerEvent::SpaceClicked));
        assert!("when_clicked".parse::<TriggerEvent>().is_err());
    }

    #[test]
    fn test_integer_parameters_truncate() {
        assert_eq!(action("move", json!({"x": "12px"})).unwrap(), Action::Move { dx: 12.0 });
        assert_eq!(action("move", json!({"x": 12.7})).unwrap(), Action::Move { dx: 12.0 });
        assert_eq!(action("move", json!({"x": "-3.9"})).unwrap(), Action::Move { dx: -3.0 });
        assert_eq!(
            action("anticlockwise", json!({"rotation": "15"})).unwrap(),
            Action::Turn { degrees: -15.0 }
        );
    }

    #[test]
    fn test_non_numeric_parameter_is_rejected() {
        let err = action("go_to", json!({"x": "abc", "y": 1})).unwrap_err();
        assert_eq!(
            err,
            ActionError::NotANumber {
                action: "go_to".to_string(),
                param: "x".to_string(),
                value: "\"abc\"".to_string(),
            }
        );

        let err = action("go_to", json!({"x": 1})).unwrap_err();
        assert!(matches!(err, ActionError::MissingParameter { ref param, .. } if param == "y"));
    }

    #[test]
    fn test_set_y_keeps_raw_value_unlike_set_x() {
        // set_x 做整数截断，set_y 保留原始数值
        assert_eq!(action("set_x", json!({"x": "7.5"})).unwrap(), Action::SetX { x: 7.0 });
        assert_eq!(action("set_y", json!({"y": "7.5"})).unwrap(), Action::SetY { y: 7.5 });
        assert!(action("set_y", json!({"y": "7px"})).is_err());
    }

    #[test]
    fn test_timed_actions_convert_seconds() {
        assert_eq!(
            action("glide", json!({"x": 5, "y": 6, "delay": "2"})).unwrap(),
            Action::Glide {
                x: 5.0,
                y: 6.0,
                duration_ms: 2000
            }
        );
        assert_eq!(
            action("say_for_seconds", json!({"message": "hi", "delay": 1})).unwrap(),
            Action::Speak {
                message: "hi".to_string(),
                bubble: Bubble::Say,
                timeout_ms: Some(1000)
            }
        );
        assert_eq!(
            action("glide_random", json!({"seconds": 3})).unwrap(),
            Action::GlideRandom { duration_ms: 3000 }
        );
        assert_eq!(
            action("glide", json!({"x": 0, "y": 0, "delay": -4})).unwrap(),
            Action::Glide {
                x: 0.0,
                y: 0.0,
                duration_ms: 0
            }
        );
    }

    #[test]
    fn test_oversized_delay_is_rejected() {
        let err = action("say_for_seconds", json!({"message": "hi", "delay": 1e17})).unwrap_err();
        assert!(matches!(err, ActionError::InvalidParameter { ref param, .. } if param == "delay"));

        assert!(action("glide_random", json!({"seconds": "99999999"})).is_err());
        assert_eq!(
            action("glide_random", json!({"seconds": 86400})).unwrap(),
            Action::GlideRandom {
                duration_ms: 86_400_000
            }
        );
    }

    #[test]
    fn test_custom_action_keeps_fractional_x() {
        assert_eq!(
            action("custom_action", json!({"x": 1.5, "y": "2.5", "delay": 1})).unwrap(),
            Action::GlideBy {
                dx: 1.5,
                dy: 2.0,
                duration_ms: 1000
            }
        );
    }

    #[test]
    fn test_unknown_kind_is_accepted() {
        let a = action("play_sound", json!({"name": "meow"})).unwrap();
        assert!(a.is_unknown());
        assert_eq!(a.name(), "play_sound");
    }

    #[test]
    fn test_leading_integer() {
        assert_eq!(leading_integer("  42abc"), Some(42.0));
        assert_eq!(leading_integer("+8"), Some(8.0));
        assert_eq!(leading_integer("-"), None);
        assert_eq!(leading_integer(""), None);
        assert_eq!(leading_integer("x1"), None);
    }
}
