//! # 诊断模块
//!
//! 提供程序静态检查和诊断 API，不依赖 IO 或舞台状态。
//!
//! ## 设计原则
//!
//! - 纯函数 API，可在无 IO 环境下运行
//! - 诊断分级：Error（必须修复）、Warn（建议修复）、Info（信息提示）
//! - 复用 [`Action::from_descriptor`]，不重复校验逻辑
//! - 检查未校验的 [`ProgramData`]，一次报告所有问题而不是在第一个错误处停止

use crate::action::{Action, ActionDescriptor};
use crate::program::ProgramData;

/// 诊断级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticLevel {
    /// 信息提示
    Info,
    /// 警告（建议修复）
    Warn,
    /// 错误（必须修复）
    Error,
}

impl std::fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// 诊断位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// 整个动作组
    Group(usize),
    /// 动作组中的一项
    Item { group: usize, item: usize },
    /// 单次点击动作
    Clicked,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Group(group) => write!(f, "[{}]", group),
            Self::Item { group, item } => write!(f, "[{}][{}]", group, item),
            Self::Clicked => write!(f, "[clicked]"),
        }
    }
}

/// 诊断条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 诊断级别
    pub level: DiagnosticLevel,
    /// 程序 ID / 文件路径
    pub program_id: String,
    /// 位置（如果可定位）
    pub location: Option<Location>,
    /// 诊断消息
    pub message: String,
    /// 诊断详情（可选）
    pub detail: Option<String>,
}

impl Diagnostic {
    fn with_level(
        level: DiagnosticLevel,
        program_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level,
            program_id: program_id.into(),
            location: None,
            message: message.into(),
            detail: None,
        }
    }

    /// 创建错误诊断
    pub fn error(program_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Error, program_id, message)
    }

    /// 创建警告诊断
    pub fn warn(program_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Warn, program_id, message)
    }

    /// 创建信息诊断
    pub fn info(program_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Info, program_id, message)
    }

    /// 设置位置
    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// 设置详情
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.level, self.program_id)?;
        if let Some(location) = self.location {
            write!(f, "{}", location)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, "\n  | {}", detail)?;
        }
        Ok(())
    }
}

/// 诊断结果
#[derive(Debug, Clone, Default)]
pub struct DiagnosticResult {
    /// 诊断条目列表
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticResult {
    /// 创建空结果
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加诊断
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// 合并另一个结果
    pub fn merge(&mut self, other: DiagnosticResult) {
        self.diagnostics.extend(other.diagnostics);
    }

    /// 获取错误数量
    pub fn error_count(&self) -> usize {
        self.count(DiagnosticLevel::Error)
    }

    /// 获取警告数量
    pub fn warn_count(&self) -> usize {
        self.count(DiagnosticLevel::Warn)
    }

    fn count(&self, level: DiagnosticLevel) -> usize {
        self.diagnostics.iter().filter(|d| d.level == level).count()
    }

    /// 是否有错误
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// 按级别过滤
    pub fn filter_by_level(&self, min_level: DiagnosticLevel) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.level >= min_level)
            .collect()
    }
}

//=============================================================================
// 程序分析 API
//=============================================================================

/// 分析程序，返回诊断结果
///
/// 执行以下检查：
/// - 校验失败的动作描述符（Error）
/// - 未知动作类型（Warn，运行时作为空操作）
/// - 空动作组、没有触发器的动作组（Warn，只能通过全部运行执行）
/// - `set_y` 使用了非整数值（Info，与 `set_x` 不同，不取整）
pub fn analyze_program(program_id: &str, data: &ProgramData) -> DiagnosticResult {
    let mut result = DiagnosticResult::new();

    for (group, g) in data.groups.iter().enumerate() {
        if g.items.is_empty() {
            result.push(Diagnostic::warn(program_id, "空的动作组").at(Location::Group(group)));
            continue;
        }

        let mut has_trigger = false;
        for (item, desc) in g.items.iter().enumerate() {
            let location = Location::Item { group, item };
            if let Some(action) = check_descriptor(program_id, desc, location, &mut result) {
                has_trigger |= action.is_trigger();
            }
        }

        if !has_trigger {
            result.push(
                Diagnostic::warn(program_id, "动作组没有触发器")
                    .at(Location::Group(group))
                    .with_detail("只能通过全部运行执行"),
            );
        }
    }

    if let Some(desc) = &data.clicked {
        check_descriptor(program_id, desc, Location::Clicked, &mut result);
    }

    result
}

/// 检查单个描述符，校验通过时返回动作
fn check_descriptor(
    program_id: &str,
    desc: &ActionDescriptor,
    location: Location,
    result: &mut DiagnosticResult,
) -> Option<Action> {
    let action = match Action::from_descriptor(desc) {
        Ok(action) => action,
        Err(err) => {
            result.push(
                Diagnostic::error(program_id, err.to_string())
                    .at(location)
                    .with_detail(format!("initialValue = {}", desc.initial_value)),
            );
            return None;
        }
    };

    match &action {
        Action::Unknown { name } => {
            result.push(
                Diagnostic::warn(program_id, format!("未知动作类型: {}", name))
                    .at(location)
                    .with_detail("运行时将作为空操作"),
            );
        }
        Action::SetY { y } if y.fract() != 0.0 => {
            result.push(
                Diagnostic::info(program_id, format!("set_y 使用原始数值 {}，不会取整", y))
                    .at(location),
            );
        }
        _ => {}
    }

    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::GroupData;
    use serde_json::json;

    fn program(groups: Vec<Vec<ActionDescriptor>>) -> ProgramData {
        ProgramData {
            groups: groups.into_iter().map(|items| GroupData { items }).collect(),
            clicked: None,
        }
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::warn("demo.json", "空的动作组").at(Location::Group(3));
        insta::assert_snapshot!(diag.to_string(), @"[WARN] demo.json[3]: 空的动作组");

        let diag = Diagnostic::error("demo.json", "动作 'go_to' 缺少参数 'y'")
            .at(Location::Item { group: 0, item: 1 })
            .with_detail("initialValue = {\"x\":1}");
        insta::assert_snapshot!(diag.to_string(), @r#"
[ERROR] demo.json[0][1]: 动作 'go_to' 缺少参数 'y'
  | initialValue = {"x":1}
"#);
    }

    #[test]
    fn test_valid_program_is_clean() {
        let data = program(vec![vec![
            ActionDescriptor::bare("flag_clicked"),
            ActionDescriptor::new("go_to", json!({"x": 10, "y": 20})),
            ActionDescriptor::new("set_y", json!({"y": 4})),
        ]]);
        let result = analyze_program("demo", &data);
        assert!(result.is_empty(), "{:?}", result);
    }

    #[test]
    fn test_reports_every_invalid_descriptor() {
        let data = program(vec![
            vec![
                ActionDescriptor::bare("flag_clicked"),
                ActionDescriptor::new("go_to", json!({"x": 1})),
            ],
            vec![
                ActionDescriptor::bare("sprite_clicked"),
                ActionDescriptor::new("move", json!({"x": "left"})),
            ],
        ]);
        let result = analyze_program("demo", &data);

        assert_eq!(result.error_count(), 2);
        assert_eq!(
            result.diagnostics[0].location,
            Some(Location::Item { group: 0, item: 1 })
        );
        assert_eq!(
            result.diagnostics[1].location,
            Some(Location::Item { group: 1, item: 1 })
        );
    }

    #[test]
    fn test_warns_unknown_and_untriggered_groups() {
        let data = program(vec![
            vec![ActionDescriptor::bare("dance")],
            vec![],
        ]);
        let result = analyze_program("demo", &data);

        assert!(!result.has_errors());
        assert_eq!(result.warn_count(), 3);
        assert!(result.diagnostics[0].message.contains("dance"));
        assert_eq!(result.diagnostics[1].location, Some(Location::Group(0)));
        assert_eq!(result.diagnostics[2].location, Some(Location::Group(1)));
    }

    #[test]
    fn test_set_y_fraction_is_info() {
        let data = program(vec![vec![
            ActionDescriptor::bare("space_clicked"),
            ActionDescriptor::new("set_y", json!({"y": 12.5})),
        ]]);
        let result = analyze_program("demo", &data);

        let infos = result.diagnostics.iter().filter(|d| d.level == DiagnosticLevel::Info);
        assert_eq!(infos.count(), 1);
        assert!(result.filter_by_level(DiagnosticLevel::Warn).is_empty());
    }

    #[test]
    fn test_clicked_descriptor_checked() {
        let mut data = program(vec![]);
        data.clicked = Some(ActionDescriptor::new("change_size", json!({})));
        let result = analyze_program("demo", &data);

        assert_eq!(result.error_count(), 1);
        assert_eq!(result.diagnostics[0].location, Some(Location::Clicked));
    }
}
