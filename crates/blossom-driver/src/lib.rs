//! 驱动层模块
//!
//! 本 crate 定义 Blossom 机器人电机总线的设备契约，包括：
//! - 电机配置（关节/塔楼名称 → 标定参数）
//! - `DeviceHandle` trait（连接、关闭、位置指令、关节状态读取）
//! - 驱动层错误分类（瞬态错误 vs. 致命错误）
//! - 带重试保护的设备上线（`RobotBuilder`）
//! - 进程内模拟电机总线（`sim`）
//!
//! # 使用场景
//!
//! 真实的电机总线驱动只需实现 [`DeviceConnector`] 与 [`DeviceHandle`]，
//! 上层（`blossom-client`）只通过这两个 trait 访问硬件。

mod builder;
pub mod config;
pub mod device;
mod error;
pub mod sim;

pub use builder::{BringupPolicy, DEFAULT_MAX_RETRIES, RobotBuilder};
pub use config::{MotorCalibration, MotorConfig, Orientation};
pub use device::{DeviceConnector, DeviceHandle, JointPositions};
pub use error::DriverError;
pub use sim::{SimConnector, SimDevice, SimState};
