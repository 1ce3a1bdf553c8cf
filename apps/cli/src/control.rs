//! 主控制循环
//!
//! 启动顺序：加载配置 → 主机器人上线 → 其余机器人上线 → 主机器人复位
//! → 启动输入线程 → 主线程空闲等待关机信号 → 关机清理（只执行一次）。

use crate::console::TerminalConsole;
use crate::router::CommandRouter;
use anyhow::{Context, Result};
use blossom_client::{FleetRegistry, Recorder, RecordingConfig};
use blossom_driver::{BringupPolicy, SimConnector};
use blossom_tools::{
    FsSequenceStore, GestureSink, HttpGestureSink, LogGestureSink, RobotConfigFile, SequenceStore,
};
use crossbeam_channel::{RecvTimeoutError, bounded};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// 主线程空闲等待周期
const IDLE_INTERVAL: Duration = Duration::from_secs(1);

/// 控制循环选项（由命令行参数构造）
#[derive(Debug, Clone)]
pub struct ControlOptions {
    pub names: Vec<String>,
    pub port: u16,
    pub browser_disable: bool,
    pub list_robots: bool,
    pub config: Option<PathBuf>,
    pub sequence_dir: PathBuf,
    pub upload_url: Option<String>,
    pub policy: BringupPolicy,
    pub recording: RecordingConfig,
}

/// 默认机器人配置文件：`<config_dir>/blossom/robots.toml`
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("blossom").join("robots.toml"))
}

/// 加载机器人配置
///
/// 显式指定的文件必须存在；默认位置不存在时使用内置配置。
pub fn load_robot_config(path: Option<&Path>) -> Result<RobotConfigFile> {
    if let Some(path) = path {
        return RobotConfigFile::load(path);
    }

    match default_config_path() {
        Some(path) if path.exists() => {
            info!(path = %path.display(), "Loading robot configuration");
            RobotConfigFile::load(&path)
        },
        _ => Ok(RobotConfigFile::builtin()),
    }
}

/// 关机清理（只执行一次）
///
/// 失败只记录日志并提示操作员，返回失败条目数。
fn shutdown_fleet(fleet: &FleetRegistry, store: &dyn SequenceStore) -> usize {
    match fleet.shutdown(store) {
        Ok(()) => 0,
        Err(err) => {
            warn!(error = %err, "Shutdown finished with failures");
            eprintln!("⚠️  {}", err);
            err.failures.len()
        },
    }
}

/// 盘点每台机器人已保存的具名序列，返回可读取的序列数
fn report_sequences(fleet: &FleetRegistry, store: &FsSequenceStore) -> usize {
    let mut readable = 0;
    for robot in fleet.names() {
        let names = match store.list(&robot) {
            Ok(names) => names,
            Err(err) => {
                warn!(robot = %robot, error = %format!("{:#}", err), "Failed to list stored sequences");
                continue;
            },
        };

        for name in &names {
            match store.load(&robot, name) {
                Ok(sequence) => {
                    readable += 1;
                    debug!(robot = %robot, name = %name, frames = sequence.frame_count(), duration = ?sequence.duration(), "Stored sequence");
                },
                Err(err) => {
                    warn!(robot = %robot, name = %name, error = %format!("{:#}", err), "Unreadable stored sequence")
                },
            }
        }
        info!(robot = %robot, sequences = names.len(), "Stored sequences");
    }
    readable
}

/// 运行控制循环，直到收到关机信号
pub fn run(options: ControlOptions) -> Result<()> {
    let robots = load_robot_config(options.config.as_deref())?;

    if options.list_robots {
        for name in robots.names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let configs = robots.configs_for(options.names.as_slice())?;
    info!(
        port = options.port,
        browser = !options.browser_disable,
        "Web front-end is served separately"
    );

    // 主机器人最先上线，随后是其余机器人
    let connector = SimConnector::new();
    let fleet = Arc::new(FleetRegistry::bring_up(&connector, &options.policy, configs)?);

    let store = Arc::new(FsSequenceStore::new(&options.sequence_dir));
    if let Err(err) = fleet.primary().reset_position() {
        shutdown_fleet(&fleet, store.as_ref());
        return Err(err).context("Failed to reset primary robot");
    }
    report_sequences(&fleet, &store);

    let sink: Arc<dyn GestureSink> = match &options.upload_url {
        Some(url) => Arc::new(HttpGestureSink::new(url.as_str())),
        None => Arc::new(LogGestureSink),
    };
    let recorder =
        Arc::new(Recorder::new(store.clone(), sink).with_config(options.recording.clone()));

    // Ctrl+C（信号）和输入线程都可以请求关机
    let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
    let signal_tx = shutdown_tx.clone();
    ctrlc::set_handler(move || {
        let _ = signal_tx.try_send(());
    })
    .context("Failed to install Ctrl+C handler")?;

    let router = CommandRouter::new(Arc::clone(&fleet), recorder);
    let intake_tx = shutdown_tx;
    thread::Builder::new()
        .name("command-intake".to_string())
        .spawn(move || {
            // Editor 在输入线程内创建，生命周期与输入循环一致
            match TerminalConsole::new() {
                Ok(mut console) => router.run(&mut console, &intake_tx),
                Err(err) => {
                    error!(error = %err, "Console unavailable");
                    let _ = intake_tx.try_send(());
                },
            }
        })
        .context("Failed to spawn command intake thread")?;

    loop {
        match shutdown_rx.recv_timeout(IDLE_INTERVAL) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => continue,
        }
    }

    println!("Exiting...");
    shutdown_fleet(&fleet, store.as_ref());
    println!("Bye!");

    Ok(())
}
