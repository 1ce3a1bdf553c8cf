//! 设备契约
//!
//! `DeviceHandle` 是单个机器人电机总线连接的抽象；`DeviceConnector` 负责
//! 根据机器人名称和电机配置打开一个新的连接。

use crate::config::MotorConfig;
use crate::error::DriverError;
use std::collections::BTreeMap;
use std::time::Duration;

/// 关节位置表（关节名 → 位置，单位：度）
pub type JointPositions = BTreeMap<String, f64>;

/// 电机总线连接
///
/// 所有方法都需要 `&mut self`：同一时刻只能有一个执行者驱动设备，
/// 上层通过每台机器人一把互斥锁保证这一点。
pub trait DeviceHandle: Send {
    /// 建立总线连接
    fn connect(&mut self) -> Result<(), DriverError>;

    /// 关闭连接（之后的所有调用返回 `DriverError::Closed`）
    fn close(&mut self) -> Result<(), DriverError>;

    /// 发送位置指令
    ///
    /// # 参数
    /// - `targets`: 关节名 → 目标位置
    /// - `transition`: 过渡时间
    /// - `immediate`: 是否立即执行（不等待上一条指令完成）
    fn goto_position(
        &mut self,
        targets: &JointPositions,
        transition: Duration,
        immediate: bool,
    ) -> Result<(), DriverError>;

    /// 回到复位姿态
    fn reset_position(&mut self) -> Result<(), DriverError>;

    /// 读取当前关节状态
    fn joint_state(&mut self) -> Result<JointPositions, DriverError>;
}

/// 设备连接工厂
pub trait DeviceConnector: Send + Sync {
    /// 为指定机器人打开一个（尚未连接的）设备句柄
    fn open(&self, name: &str, config: &MotorConfig)
    -> Result<Box<dyn DeviceHandle>, DriverError>;
}
