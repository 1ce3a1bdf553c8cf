//! 客户端层错误类型定义

use blossom_driver::DriverError;
use thiserror::Error;

/// 客户端层错误类型
#[derive(Error, Debug)]
pub enum ClientError {
    /// 驱动层错误
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// 该机器人已有进行中的录制
    #[error("Robot '{0}' is already recording")]
    AlreadyRecording(String),

    /// 该机器人没有进行中的录制
    #[error("Robot '{0}' is not recording")]
    NotRecording(String),

    /// 序列存储失败
    #[error("Sequence store error: {0:#}")]
    Store(#[source] anyhow::Error),

    /// 录制线程异常退出
    #[error("Capture thread for '{0}' panicked")]
    CaptureThread(String),

    /// 空队列
    #[error("No robots requested")]
    EmptyFleet,
}

/// 关机清理错误（逐台汇总）
#[derive(Error, Debug)]
#[error("Shutdown cleanup failed for {} robot(s): {}", .failures.len(), describe(.failures))]
pub struct ShutdownError {
    /// (机器人名, 失败描述)
    pub failures: Vec<(String, String)>,
}

fn describe(failures: &[(String, String)]) -> String {
    failures
        .iter()
        .map(|(robot, reason)| format!("{}: {}", robot, reason))
        .collect::<Vec<_>>()
        .join("; ")
}
