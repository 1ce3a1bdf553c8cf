//! 模拟电机总线
//!
//! 进程内的 `DeviceHandle` 实现，没有真实硬件时用于命令行调试和测试：
//! - 按机器人注入上线阶段的瞬态错误（验证重试逻辑）
//! - 注入关闭失败（验证关机清理的容错）
//! - 可检查的设备状态（已下发的位置指令、复位次数、关闭标记）

use crate::config::MotorConfig;
use crate::device::{DeviceConnector, DeviceHandle, JointPositions};
use crate::error::DriverError;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// 模拟设备状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimState {
    pub connected: bool,
    pub closed: bool,
    /// 当前关节位置
    pub positions: JointPositions,
    /// 已下发的位置指令（按时间顺序）
    pub commands: Vec<JointPositions>,
    /// 最近一次指令的过渡时间
    pub last_transition: Option<Duration>,
    /// 复位次数
    pub resets: usize,
}

/// 模拟设备
pub struct SimDevice {
    config: MotorConfig,
    state: Arc<Mutex<SimState>>,
    close_failure: Option<DriverError>,
}

impl SimDevice {
    pub fn new(config: MotorConfig) -> Self {
        let positions = config.joint_names().map(|joint| (joint.to_string(), 0.0)).collect();
        Self {
            config,
            state: Arc::new(Mutex::new(SimState {
                positions,
                ..SimState::default()
            })),
            close_failure: None,
        }
    }

    /// 共享状态（用于外部检查）
    pub fn state(&self) -> Arc<Mutex<SimState>> {
        Arc::clone(&self.state)
    }

    fn ensure_usable(&self, state: &SimState) -> Result<(), DriverError> {
        if state.closed {
            return Err(DriverError::Closed);
        }
        if !state.connected {
            return Err(DriverError::Runtime("device not connected".to_string()));
        }
        Ok(())
    }
}

impl DeviceHandle for SimDevice {
    fn connect(&mut self) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(DriverError::Closed);
        }
        state.connected = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), DriverError> {
        if let Some(err) = self.close_failure.clone() {
            return Err(err);
        }
        let mut state = self.state.lock();
        state.connected = false;
        state.closed = true;
        Ok(())
    }

    fn goto_position(
        &mut self,
        targets: &JointPositions,
        transition: Duration,
        _immediate: bool,
    ) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        self.ensure_usable(&state)?;

        // 先整体校验，未知关节不产生部分运动
        let mut resolved = JointPositions::new();
        for (joint, &position) in targets {
            let calibration = self
                .config
                .get(joint)
                .ok_or_else(|| DriverError::UnknownJoint(joint.clone()))?;
            resolved.insert(joint.clone(), calibration.clamp(position));
        }

        for (joint, &position) in &resolved {
            state.positions.insert(joint.clone(), position);
        }
        state.commands.push(resolved);
        state.last_transition = Some(transition);
        Ok(())
    }

    fn reset_position(&mut self) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        self.ensure_usable(&state)?;

        for (joint, calibration) in &self.config.motors {
            state.positions.insert(joint.clone(), calibration.clamp(0.0));
        }
        state.resets += 1;
        Ok(())
    }

    fn joint_state(&mut self) -> Result<JointPositions, DriverError> {
        let state = self.state.lock();
        self.ensure_usable(&state)?;
        Ok(state.positions.clone())
    }
}

/// 模拟设备工厂
///
/// # Example
///
/// ```
/// use blossom_driver::{DeviceConnector, DriverError, MotorConfig, SimConnector};
///
/// let connector = SimConnector::new();
/// connector.fail_next("woody", [DriverError::Serial("port busy".into())]);
///
/// assert!(connector.open("woody", &MotorConfig::blossom()).is_err());
/// assert!(connector.open("woody", &MotorConfig::blossom()).is_ok());
/// assert_eq!(connector.attempts("woody"), 2);
/// ```
#[derive(Default)]
pub struct SimConnector {
    open_failures: Mutex<HashMap<String, VecDeque<DriverError>>>,
    close_failures: Mutex<HashMap<String, DriverError>>,
    attempts: Mutex<HashMap<String, usize>>,
    devices: Mutex<HashMap<String, Arc<Mutex<SimState>>>>,
}

impl SimConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 让接下来的若干次 `open` 依次返回给定错误
    pub fn fail_next(&self, name: &str, errors: impl IntoIterator<Item = DriverError>) {
        self.open_failures.lock().entry(name.to_string()).or_default().extend(errors);
    }

    /// 让该机器人的设备在关闭时失败
    pub fn fail_close(&self, name: &str, error: DriverError) {
        self.close_failures.lock().insert(name.to_string(), error);
    }

    /// `open` 被调用的次数
    pub fn attempts(&self, name: &str) -> usize {
        self.attempts.lock().get(name).copied().unwrap_or(0)
    }

    /// 最近一次成功打开的设备状态快照
    pub fn state(&self, name: &str) -> Option<SimState> {
        self.devices.lock().get(name).map(|state| state.lock().clone())
    }
}

impl DeviceConnector for SimConnector {
    fn open(
        &self,
        name: &str,
        config: &MotorConfig,
    ) -> Result<Box<dyn DeviceHandle>, DriverError> {
        *self.attempts.lock().entry(name.to_string()).or_insert(0) += 1;

        if let Some(err) = self.open_failures.lock().get_mut(name).and_then(VecDeque::pop_front) {
            return Err(err);
        }

        let mut device = SimDevice::new(config.clone());
        device.close_failure = self.close_failures.lock().get(name).cloned();
        self.devices.lock().insert(name.to_string(), device.state());
        Ok(Box::new(device))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected_device() -> SimDevice {
        let mut device = SimDevice::new(MotorConfig::blossom());
        device.connect().unwrap();
        device
    }

    #[test]
    fn test_goto_position_updates_state() {
        let mut device = connected_device();
        let targets = JointPositions::from([("tower_1".to_string(), 42.0)]);
        device.goto_position(&targets, Duration::from_millis(200), true).unwrap();

        let state = device.state().lock().clone();
        assert_eq!(state.positions["tower_1"], 42.0);
        assert_eq!(state.positions["tower_2"], 0.0);
        assert_eq!(state.commands.len(), 1);
        assert_eq!(state.last_transition, Some(Duration::from_millis(200)));
    }

    #[test]
    fn test_unknown_joint_moves_nothing() {
        let mut device = connected_device();
        let targets = JointPositions::from([
            ("tower_1".to_string(), 10.0),
            ("tail".to_string(), 10.0),
        ]);
        let err = device.goto_position(&targets, Duration::ZERO, true).unwrap_err();
        assert_eq!(err, DriverError::UnknownJoint("tail".to_string()));

        let state = device.state().lock().clone();
        assert_eq!(state.positions["tower_1"], 0.0);
        assert!(state.commands.is_empty());
    }

    #[test]
    fn test_requires_connect() {
        let mut device = SimDevice::new(MotorConfig::blossom());
        assert!(matches!(device.joint_state(), Err(DriverError::Runtime(_))));
        device.connect().unwrap();
        assert!(device.joint_state().is_ok());
    }

    #[test]
    fn test_closed_device_rejects_calls() {
        let mut device = connected_device();
        device.close().unwrap();
        assert_eq!(device.reset_position(), Err(DriverError::Closed));
        assert_eq!(device.joint_state(), Err(DriverError::Closed));
        assert_eq!(device.connect(), Err(DriverError::Closed));
    }

    #[test]
    fn test_reset_counts() {
        let mut device = connected_device();
        let targets = JointPositions::from([("ears".to_string(), 30.0)]);
        device.goto_position(&targets, Duration::ZERO, true).unwrap();
        device.reset_position().unwrap();

        let state = device.state().lock().clone();
        assert_eq!(state.resets, 1);
        assert_eq!(state.positions["ears"], 0.0);
    }

    #[test]
    fn test_connector_close_failure() {
        let connector = SimConnector::new();
        connector.fail_close("woody", DriverError::Serial("unplugged".to_string()));

        let mut device = connector.open("woody", &MotorConfig::blossom()).unwrap();
        device.connect().unwrap();
        assert!(matches!(device.close(), Err(DriverError::Serial(_))));
        assert!(!connector.state("woody").unwrap().closed);
    }

    #[test]
    fn test_connector_unknown_robot_has_no_state() {
        let connector = SimConnector::new();
        assert_eq!(connector.attempts("nobody"), 0);
        assert!(connector.state("nobody").is_none());
    }
}
