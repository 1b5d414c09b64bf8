//! # xtask - 开发辅助工具
//!
//! 提供本地质量门禁与开发辅助命令。
//!
//! ## 命令
//!
//! - `check-all`: 运行 fmt、clippy、test，并检查 programs/ 下的示例程序
//! - `demo`: 用 stage-cli 回放示例程序与时间线
//! - `program-check`: 检查程序文件（JSON 结构、动作参数、触发器）

use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use stage_runtime::{DiagnosticResult, ProgramData, analyze_program};
use walkdir::WalkDir;

fn run(step: &str, cmd: &mut Command) -> anyhow::Result<()> {
    eprintln!("\n==> {step}");
    let status = cmd.status()?;
    if !status.success() {
        anyhow::bail!("{step} failed with {status}");
    }
    Ok(())
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        eprintln!("xtask error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let sub = args.next().unwrap_or_else(|| "help".to_string());

    match sub.as_str() {
        "check-all" => {
            let mut fmt = Command::new("cargo");
            fmt.args(["fmt", "--all", "--", "--check"]);
            run("cargo fmt --all -- --check", &mut fmt)?;

            let mut clippy = Command::new("cargo");
            clippy.args(["clippy", "--workspace", "--all-targets"]);
            run("cargo clippy --workspace --all-targets", &mut clippy)?;

            let mut test = Command::new("cargo");
            test.args(["test", "--workspace"]);
            run("cargo test --workspace", &mut test)?;

            eprintln!("\n==> program-check");
            program_check(None)?;
        }
        "demo" => {
            let program = Path::new(PROGRAMS_DIR).join(DEMO_PROGRAM);
            let timeline = Path::new(PROGRAMS_DIR).join(DEMO_TIMELINE);
            let mut replay = Command::new("cargo");
            replay
                .args(["run", "-p", "stage-cli", "--", "run"])
                .arg(&program)
                .arg("--timeline")
                .arg(&timeline)
                .arg("--events");
            run(
                &format!("stage run {} --timeline {}", program.display(), timeline.display()),
                &mut replay,
            )?;
        }
        "program-check" => {
            let path = args.next();
            program_check(path.as_deref())?;
        }
        "help" | "-h" | "--help" => {
            print_help();
        }
        other => anyhow::bail!("unknown xtask subcommand: {other}"),
    }

    Ok(())
}

fn print_help() {
    eprintln!(
        r#"xtask - 开发辅助工具

USAGE:
  cargo xtask <command>

COMMANDS:
  check-all       运行 fmt、clippy、test 门禁检查，并检查示例程序
  demo            回放 programs/demo.json 与 programs/demo.timeline.json
  program-check   检查程序文件

PROGRAM-CHECK:
  cargo xtask program-check [path]

  不带参数：检查 programs/ 下所有 .json 文件（跳过 *.timeline.json）
  带路径参数：检查指定文件或目录

  检查内容：
    - JSON 结构错误
    - 动作参数缺失或不是数字
    - 未知动作类型、空动作组、没有触发器的动作组

ALIASES (in .cargo/config.toml):
  cargo check-all     -> cargo xtask check-all
  cargo demo          -> cargo xtask demo
  cargo program-check -> cargo xtask program-check
"#
    );
}

//=============================================================================
// program-check 命令实现
//=============================================================================

/// 默认程序目录（相对于 workspace root）
const PROGRAMS_DIR: &str = "programs";

const DEMO_PROGRAM: &str = "demo.json";
const DEMO_TIMELINE: &str = "demo.timeline.json";

/// 程序检查结果
#[derive(Default)]
struct ProgramCheckResult {
    /// 检查的程序数量
    programs_checked: usize,
    /// 读取或 JSON 解析错误数量
    decode_errors: usize,
    /// 诊断结果
    diagnostics: DiagnosticResult,
}

/// 执行程序检查
fn program_check(path: Option<&str>) -> anyhow::Result<()> {
    let files = match path {
        Some(p) => {
            let path = PathBuf::from(p);
            if path.is_file() {
                vec![path]
            } else if path.is_dir() {
                collect_program_files(&path)
            } else {
                anyhow::bail!("路径不存在: {}", p);
            }
        }
        None => {
            let dir = Path::new(PROGRAMS_DIR);
            if !dir.exists() {
                anyhow::bail!(
                    "默认程序目录不存在: {}\n请在 workspace 根目录运行，或指定程序路径",
                    dir.display()
                );
            }
            collect_program_files(dir)
        }
    };

    if files.is_empty() {
        eprintln!("未找到程序文件（.json）");
        return Ok(());
    }

    eprintln!("==> 检查 {} 个程序文件...\n", files.len());

    let mut result = ProgramCheckResult::default();
    for file in &files {
        check_program_file(file, &mut result);
    }

    print_check_result(&result);

    if result.decode_errors > 0 || result.diagnostics.has_errors() {
        anyhow::bail!("程序检查发现错误");
    }

    Ok(())
}

/// 收集目录下的所有程序文件
fn collect_program_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_program_file(p))
        .collect();
    files.sort();
    files
}

/// `.json` 文件中排除输入时间线（`*.timeline.json`）
fn is_program_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".json") && !name.ends_with(".timeline.json")
}

/// 检查单个程序文件
fn check_program_file(file: &Path, result: &mut ProgramCheckResult) {
    let program_id = file.display().to_string();
    result.programs_checked += 1;

    let content = match std::fs::read_to_string(file) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[ERROR] {}: 无法读取文件 - {}", program_id, e);
            result.decode_errors += 1;
            return;
        }
    };

    let data = match ProgramData::from_json(&content) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("[ERROR] {}: {}", program_id, e);
            result.decode_errors += 1;
            return;
        }
    };

    result.diagnostics.merge(analyze_program(&program_id, &data));
}

/// 输出检查结果
fn print_check_result(result: &ProgramCheckResult) {
    eprintln!("─────────────────────────────────────────────────────");
    eprintln!("检查完成: {} 个程序", result.programs_checked);
    eprintln!();

    for diag in &result.diagnostics.diagnostics {
        eprintln!("{}", diag);
    }

    let error_count = result.decode_errors + result.diagnostics.error_count();
    let warn_count = result.diagnostics.warn_count();

    eprintln!();
    if error_count > 0 {
        eprintln!("❌ {} 个错误, {} 个警告", error_count, warn_count);
    } else if warn_count > 0 {
        eprintln!("⚠️  0 个错误, {} 个警告", warn_count);
    } else {
        eprintln!("✅ 检查通过，无错误");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeline_files_are_not_programs() {
        assert!(is_program_file(Path::new("programs/demo.json")));
        assert!(!is_program_file(Path::new("programs/demo.timeline.json")));
        assert!(!is_program_file(Path::new("programs/notes.txt")));
    }
}
