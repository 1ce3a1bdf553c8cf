//! 客户端接口模块
//!
//! 本 crate 在驱动层之上管理整支机器人队列，包括：
//! - `RobotUnit`：一台已连接的机器人及其运行时控制参数
//! - `FleetRegistry`：进程内唯一的机器人集合（含主机器人）
//! - `Recorder` / `RecordingSession`：实时轨迹录制
//!
//! # 并发模型
//!
//! 队列在启动时一次性构建，之后只读；每台机器人的设备句柄由一把互斥锁保护，
//! 命令线程（运动）和录制线程（采样）轮流持有。

mod error;
pub mod fleet;
pub mod recording;
pub mod unit;

pub use error::{ClientError, ShutdownError};
pub use fleet::FleetRegistry;
pub use recording::{DEFAULT_SAMPLE_INTERVAL, Recorder, RecordingConfig, RecordingSession};
pub use unit::{ControlFactors, RobotUnit};
