//! 驱动层错误类型定义

use thiserror::Error;

/// 驱动层错误类型
///
/// 前四类（协议、未实现、运行时、串口）是上线阶段的瞬态错误，
/// 由 [`RobotBuilder`](crate::RobotBuilder) 在重试预算内自动重试。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    /// 电机总线协议错误（如舵机无应答、校验失败）
    #[error("Device protocol error: {0}")]
    Protocol(String),

    /// 功能未实现（部分固件不支持的寄存器）
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// 通用运行时故障
    #[error("Runtime fault: {0}")]
    Runtime(String),

    /// 串口链路错误
    #[error("Serial link error: {0}")]
    Serial(String),

    /// 设备已关闭
    #[error("Device closed")]
    Closed,

    /// 未知关节
    #[error("Unknown joint: {0}")]
    UnknownJoint(String),

    /// 无效配置
    #[error("Invalid motor configuration: {0}")]
    InvalidConfig(String),
}

impl DriverError {
    /// 是否为可重试的瞬态错误
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DriverError::Protocol(_)
                | DriverError::NotImplemented(_)
                | DriverError::Runtime(_)
                | DriverError::Serial(_)
        )
    }
}
