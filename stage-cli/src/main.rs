//! # Stage CLI
//!
//! 无界面宿主：加载程序，按时间线回放输入，输出最终舞台快照。
//!
//! ## 用法
//!
//! ```bash
//! # 在项目根目录使用 cargo 运行
//! cargo run -p stage-cli -- run programs/demo.json
//! cargo run -p stage-cli -- run programs/demo.json --timeline programs/demo.timeline.json --events
//! cargo run -p stage-cli -- run programs/demo.json --until-ms 1500 --seed 7
//! cargo run -p stage-cli -- check programs/demo.json
//! ```

mod config;
mod timeline;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use stage_runtime::{Program, ProgramData, Stage, StageInput, StalePolicy, analyze_program};
use tracing::{info, warn};

use config::{CliConfig, LogLevel};
use timeline::Player;

#[derive(Parser)]
#[command(name = "stage")]
#[command(about = "角色舞台无界面宿主 - 回放输入并输出舞台快照")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 配置文件（默认：stage.json）
    #[arg(short, long, default_value = "stage.json", global = true)]
    config: PathBuf,

    /// 日志级别（覆盖配置文件）
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevel>,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行程序并输出最终快照（JSON）
    Run {
        /// 程序文件
        program: PathBuf,

        /// 输入时间线文件
        #[arg(short, long)]
        timeline: Option<PathBuf>,

        /// 回放截止时刻（毫秒）；不指定时推进到舞台静止
        #[arg(short, long)]
        until_ms: Option<u64>,

        /// 随机数种子（覆盖配置文件）
        #[arg(long)]
        seed: Option<u64>,

        /// 过期的清除事件照常生效（兼容旧行为）
        #[arg(long)]
        legacy_timers: bool,

        /// 同时输出事件流
        #[arg(short, long)]
        events: bool,
    },

    /// 检查程序文件
    Check {
        /// 程序文件
        program: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (config, load_error) = match CliConfig::load(&cli.config) {
        Ok(config) => (config, None),
        Err(e) => (CliConfig::default(), Some(e)),
    };
    init_logging(cli.log_level.unwrap_or(config.log_level));
    if let Some(e) = load_error {
        warn!("{e:#}，使用默认配置");
    }

    let result = match cli.command {
        Commands::Run {
            program,
            timeline,
            until_ms,
            seed,
            legacy_timers,
            events,
        } => {
            let mut config = config;
            if let Some(seed) = seed {
                config.stage.rng_seed = Some(seed);
            }
            if legacy_timers {
                config.stage.timers.stale_policy = StalePolicy::Fire;
            }
            run(&config, &program, timeline.as_deref(), until_ms, events)
        }
        Commands::Check { program } => check(&program),
    };

    if let Err(e) = result {
        eprintln!("❌ {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

/// 安装日志订阅器（输出到 stderr，stdout 留给 JSON 结果）
fn init_logging(level: LogLevel) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::from(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn read_program(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("程序读取失败: {}", path.display()))
}

/// 运行程序
fn run(
    config: &CliConfig,
    program_path: &Path,
    timeline_path: Option<&Path>,
    until_ms: Option<u64>,
    with_events: bool,
) -> anyhow::Result<()> {
    let program = Program::from_json(&read_program(program_path)?)
        .with_context(|| format!("程序无效: {}", program_path.display()))?;
    info!(groups = program.groups().len(), "程序加载成功");

    let entries = match timeline_path {
        Some(path) => timeline::load(path)?,
        None => vec![timeline::TimelineEntry {
            at_ms: 0,
            input: StageInput::FlagClicked,
        }],
    };

    let mut stage = Stage::with_config(Program::default(), config.stage.clone())?;
    let loaded = stage.load_program(program);
    if !loaded.is_empty() {
        info!("已执行单次点击动作");
    }

    let mut player = Player::new(stage);
    player.record(loaded);
    player.play(entries, until_ms);
    info!(now_ms = player.stage().now_ms(), "回放结束");

    let replay = player.finish(with_events);
    println!("{}", serde_json::to_string_pretty(&replay)?);
    Ok(())
}

/// 检查程序文件
fn check(program_path: &Path) -> anyhow::Result<()> {
    let program_id = program_path.display().to_string();
    let data = ProgramData::from_json(&read_program(program_path)?)
        .with_context(|| format!("程序无效: {}", program_id))?;

    let result = analyze_program(&program_id, &data);
    for diag in &result.diagnostics {
        println!("{}", diag);
    }

    let (errors, warns) = (result.error_count(), result.warn_count());
    if errors > 0 {
        anyhow::bail!("{} 个错误, {} 个警告", errors, warns);
    } else if warns > 0 {
        eprintln!("⚠️  0 个错误, {} 个警告", warns);
    } else {
        eprintln!("✅ 检查通过，无错误");
    }
    Ok(())
}
