//! 设备上线（Bring-up）
//!
//! 舵机总线的初始化并不可靠：串口占用、舵机无应答、固件不支持的寄存器
//! 都可能让一次上线失败。`RobotBuilder` 在有限的重试预算内反复尝试，
//! 直到得到一个已连接并处于复位姿态的设备句柄。

use crate::config::MotorConfig;
use crate::device::{DeviceConnector, DeviceHandle};
use crate::error::DriverError;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// 默认重试次数（首次尝试之外）
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// 上线重试策略
#[derive(Debug, Clone, PartialEq)]
pub struct BringupPolicy {
    /// 首次尝试失败后的最大重试次数
    pub max_retries: u32,
    /// 两次尝试之间的等待时间（默认 0，立即重试）
    pub backoff: Duration,
}

impl Default for BringupPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: Duration::ZERO,
        }
    }
}

/// 设备上线 Builder
///
/// # Example
///
/// ```
/// use blossom_driver::{MotorConfig, RobotBuilder, SimConnector};
/// use std::time::Duration;
///
/// let connector = SimConnector::new();
/// let device = RobotBuilder::new(&connector)
///     .max_retries(3)
///     .backoff(Duration::from_millis(5))
///     .build("woody", &MotorConfig::blossom())
///     .unwrap();
/// # drop(device);
/// ```
pub struct RobotBuilder<'a> {
    connector: &'a dyn DeviceConnector,
    policy: BringupPolicy,
}

impl<'a> RobotBuilder<'a> {
    pub fn new(connector: &'a dyn DeviceConnector) -> Self {
        Self {
            connector,
            policy: BringupPolicy::default(),
        }
    }

    /// 整体替换重试策略
    pub fn policy(mut self, policy: BringupPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.policy.max_retries = max_retries;
        self
    }

    pub fn backoff(mut self, backoff: Duration) -> Self {
        self.policy.backoff = backoff;
        self
    }

    /// 上线设备
    ///
    /// 成功时返回已连接、已复位的设备句柄。
    ///
    /// # Errors
    /// - 瞬态错误（见 [`DriverError::is_transient`]）在重试预算耗尽后原样返回
    /// - 非瞬态错误立即返回，不消耗重试预算
    /// - 配置无效（无电机、角度限制颠倒或非有限值）时返回
    ///   [`DriverError::InvalidConfig`]，不会打开设备
    pub fn build(
        &self,
        name: &str,
        config: &MotorConfig,
    ) -> Result<Box<dyn DeviceHandle>, DriverError> {
        // 配置无效时不打开设备
        config.validate().map_err(|err| match err {
            DriverError::InvalidConfig(reason) => {
                DriverError::InvalidConfig(format!("robot '{}': {}", name, reason))
            },
            other => other,
        })?;

        let mut remaining = self.policy.max_retries;
        let mut attempt = 1u32;

        loop {
            match self.try_once(name, config) {
                Ok(device) => {
                    if attempt > 1 {
                        info!(robot = %name, attempt, "Device came up after retries");
                    } else {
                        debug!(robot = %name, "Device came up");
                    }
                    return Ok(device);
                },
                Err(err) if err.is_transient() && remaining > 0 => {
                    remaining -= 1;
                    warn!(robot = %name, attempt, remaining, error = %err, "Bring-up failed, retrying...");
                    if !self.policy.backoff.is_zero() {
                        std::thread::sleep(self.policy.backoff);
                    }
                    attempt += 1;
                },
                Err(err) => {
                    error!(robot = %name, attempt, error = %err, "Bring-up aborted");
                    return Err(err);
                },
            }
        }
    }

    /// 单次上线：open → connect → reset_position
    fn try_once(
        &self,
        name: &str,
        config: &MotorConfig,
    ) -> Result<Box<dyn DeviceHandle>, DriverError> {
        let mut device = self.connector.open(name, config)?;

        let result = device.connect().and_then(|_| device.reset_position());
        if let Err(err) = result {
            // 半初始化的句柄不对外暴露
            if let Err(close_err) = device.close() {
                debug!(robot = %name, error = %close_err, "Failed to close half-open device");
            }
            return Err(err);
        }

        Ok(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MotorCalibration;
    use crate::sim::SimConnector;

    fn serial_errors(count: usize) -> Vec<DriverError> {
        (0..count).map(|i| DriverError::Serial(format!("attempt {}", i))).collect()
    }

    #[test]
    fn test_default_policy() {
        let policy = BringupPolicy::default();
        assert_eq!(policy.max_retries, 10);
        assert_eq!(policy.backoff, Duration::ZERO);
    }

    #[test]
    fn test_builder_chain() {
        let connector = SimConnector::new();
        let builder = RobotBuilder::new(&connector)
            .max_retries(3)
            .backoff(Duration::from_millis(1));
        assert_eq!(builder.policy.max_retries, 3);
        assert_eq!(builder.policy.backoff, Duration::from_millis(1));
    }

    #[test]
    fn test_first_attempt_success_resets_device() {
        let connector = SimConnector::new();
        RobotBuilder::new(&connector).build("woody", &MotorConfig::blossom()).unwrap();

        let state = connector.state("woody").unwrap();
        assert!(state.connected);
        assert_eq!(state.resets, 1);
        assert_eq!(connector.attempts("woody"), 1);
    }

    #[test]
    fn test_succeeds_on_last_retry() {
        let connector = SimConnector::new();
        connector.fail_next("woody", serial_errors(10));

        RobotBuilder::new(&connector).build("woody", &MotorConfig::blossom()).unwrap();

        assert_eq!(connector.attempts("woody"), 11);
        let state = connector.state("woody").unwrap();
        assert!(state.connected);
        assert_eq!(state.resets, 1);
    }

    #[test]
    fn test_exhausted_retries_surface_last_error() {
        let connector = SimConnector::new();
        connector.fail_next("woody", serial_errors(11));

        let err =
            RobotBuilder::new(&connector).build("woody", &MotorConfig::blossom()).err().unwrap();

        assert_eq!(err, DriverError::Serial("attempt 10".to_string()));
        assert_eq!(connector.attempts("woody"), 11);
    }

    #[test]
    fn test_mixed_transient_classes_are_retried() {
        let connector = SimConnector::new();
        connector.fail_next(
            "woody",
            [
                DriverError::Protocol("no status packet".to_string()),
                DriverError::NotImplemented("torque limit".to_string()),
                DriverError::Runtime("bus reset".to_string()),
            ],
        );

        assert!(RobotBuilder::new(&connector).build("woody", &MotorConfig::blossom()).is_ok());
        assert_eq!(connector.attempts("woody"), 4);
    }

    #[test]
    fn test_fatal_error_not_retried() {
        let connector = SimConnector::new();
        connector.fail_next("woody", [DriverError::InvalidConfig("bad id".to_string())]);

        let err =
            RobotBuilder::new(&connector).build("woody", &MotorConfig::blossom()).err().unwrap();

        assert!(matches!(err, DriverError::InvalidConfig(_)));
        assert_eq!(connector.attempts("woody"), 1);
    }

    #[test]
    fn test_zero_retries() {
        let connector = SimConnector::new();
        connector.fail_next("woody", serial_errors(1));

        let result = RobotBuilder::new(&connector)
            .max_retries(0)
            .build("woody", &MotorConfig::blossom());

        assert!(result.is_err());
        assert_eq!(connector.attempts("woody"), 1);
    }

    #[test]
    fn test_empty_config_rejected() {
        let connector = SimConnector::new();
        let result = RobotBuilder::new(&connector).build("woody", &MotorConfig::new());
        assert!(matches!(result, Err(DriverError::InvalidConfig(_))));
        assert_eq!(connector.attempts("woody"), 0);
    }

    #[test]
    fn test_inverted_angle_limit_rejected_before_open() {
        let connector = SimConnector::new();
        let mut calibration = MotorCalibration::new(1);
        calibration.angle_limit = Some([150.0, -150.0]);
        let config = MotorConfig::new().with_motor("tower_1", calibration);

        let err = RobotBuilder::new(&connector).build("woody", &config).err().unwrap();
        match err {
            DriverError::InvalidConfig(reason) => {
                assert!(reason.contains("woody"));
                assert!(reason.contains("tower_1"));
            },
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(connector.attempts("woody"), 0);
    }
}
