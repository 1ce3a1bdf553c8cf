//! # Blossom CLI
//!
//! 从一个控制进程协调一台或多台 Blossom 机器人。
//!
//! ```bash
//! # 主机器人 woody，外加 buzz
//! blossom-cli -n woody buzz
//!
//! # 列出已配置的机器人
//! blossom-cli --list-robots
//! ```
//!
//! 启动后进入命令行：
//!
//! ```text
//! blossom> m all 50 1.0
//! blossom> rec
//! blossom> stop greeting
//! blossom> man
//! manual> state
//! ```

use anyhow::Result;
use blossom_client::RecordingConfig;
use blossom_driver::{BringupPolicy, DEFAULT_MAX_RETRIES};
use blossom_tools::robots::DEFAULT_ROBOT;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

mod console;
mod control;
mod manual;
mod router;

use control::ControlOptions;

/// Blossom CLI - 多机器人控制台
#[derive(Parser, Debug)]
#[command(name = "blossom-cli")]
#[command(about = "Control process for a fleet of Blossom robots", long_about = None)]
#[command(version)]
struct Cli {
    /// 机器人名称（第一个为主机器人）
    #[arg(short, long, num_args = 1.., default_value = DEFAULT_ROBOT)]
    names: Vec<String>,

    /// Web 前端端口
    #[arg(short, long, default_value_t = 8000)]
    port: u16,

    /// 不自动打开浏览器
    #[arg(short, long)]
    browser_disable: bool,

    /// 列出所有已配置的机器人后退出
    #[arg(short, long)]
    list_robots: bool,

    /// 机器人配置文件（默认 <config_dir>/blossom/robots.toml）
    #[arg(long)]
    config: Option<PathBuf>,

    /// 序列存储目录
    #[arg(long, default_value = "./sequences")]
    sequence_dir: PathBuf,

    /// 手势上传地址（未指定时只记录日志）
    #[arg(long)]
    upload_url: Option<String>,

    /// 上线重试次数
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    max_retries: u32,

    /// 上线重试间隔（毫秒）
    #[arg(long, default_value_t = 0)]
    retry_backoff_ms: u64,

    /// 录制采样周期（毫秒）
    #[arg(long, default_value_t = 50)]
    sample_interval_ms: u64,
}

impl From<Cli> for ControlOptions {
    fn from(cli: Cli) -> Self {
        Self {
            names: cli.names,
            port: cli.port,
            browser_disable: cli.browser_disable,
            list_robots: cli.list_robots,
            config: cli.config,
            sequence_dir: cli.sequence_dir,
            upload_url: cli.upload_url,
            policy: BringupPolicy {
                max_retries: cli.max_retries,
                backoff: Duration::from_millis(cli.retry_backoff_ms),
            },
            recording: RecordingConfig {
                sample_interval: Duration::from_millis(cli.sample_interval_ms.max(1)),
            },
        }
    }
}

fn main() -> Result<()> {
    // 初始化日志
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("blossom_cli=info".parse()?);
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    control::run(cli.into())
}
