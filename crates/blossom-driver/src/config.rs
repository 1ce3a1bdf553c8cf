//! 电机配置
//!
//! 每个机器人由若干命名关节（塔楼 `tower_1..3`、底座 `base`、耳朵 `ears` 等）组成，
//! 每个关节对应一个舵机及其标定参数。

use crate::error::DriverError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 舵机安装方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// 正向
    #[default]
    Direct,
    /// 反向
    Indirect,
}

/// 单个关节的标定参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotorCalibration {
    /// 总线 ID
    pub id: u8,

    /// 零位偏移（度）
    #[serde(default)]
    pub offset: f64,

    /// 角度限制 `[min, max]`（度）
    #[serde(default)]
    pub angle_limit: Option<[f64; 2]>,

    /// 安装方向
    #[serde(default)]
    pub orientation: Orientation,
}

impl MotorCalibration {
    pub fn new(id: u8) -> Self {
        Self {
            id,
            offset: 0.0,
            angle_limit: None,
            orientation: Orientation::Direct,
        }
    }

    /// 校验标定参数：偏移有限，角度限制有限且 `min <= max`
    pub fn validate(&self) -> Result<(), DriverError> {
        if !self.offset.is_finite() {
            return Err(DriverError::InvalidConfig(format!(
                "motor {} has a non-finite offset",
                self.id
            )));
        }
        if let Some([min, max]) = self.angle_limit {
            if !(min.is_finite() && max.is_finite() && min <= max) {
                return Err(DriverError::InvalidConfig(format!(
                    "motor {} has an invalid angle limit [{}, {}]",
                    self.id, min, max
                )));
            }
        }
        Ok(())
    }

    /// 将位置限制在角度范围内
    ///
    /// 不会 panic；未校验的限制（`min > max`）结果落在 `max`。
    pub fn clamp(&self, position: f64) -> f64 {
        match self.angle_limit {
            Some([min, max]) => position.max(min).min(max),
            None => position,
        }
    }
}

/// 机器人电机配置（关节名 → 标定参数）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MotorConfig {
    pub motors: BTreeMap<String, MotorCalibration>,
}

impl MotorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 链式添加关节
    pub fn with_motor(mut self, joint: impl Into<String>, calibration: MotorCalibration) -> Self {
        self.motors.insert(joint.into(), calibration);
        self
    }

    /// Blossom 标准构型：三座塔楼 + 底座 + 耳朵
    pub fn blossom() -> Self {
        Self::new()
            .with_motor("tower_1", MotorCalibration::new(1))
            .with_motor("tower_2", MotorCalibration::new(2))
            .with_motor("tower_3", MotorCalibration::new(3))
            .with_motor("base", MotorCalibration::new(4))
            .with_motor("ears", MotorCalibration::new(5))
    }

    /// 关节名称（按名称排序）
    pub fn joint_names(&self) -> impl Iterator<Item = &str> {
        self.motors.keys().map(String::as_str)
    }

    pub fn contains(&self, joint: &str) -> bool {
        self.motors.contains_key(joint)
    }

    pub fn get(&self, joint: &str) -> Option<&MotorCalibration> {
        self.motors.get(joint)
    }

    pub fn is_empty(&self) -> bool {
        self.motors.is_empty()
    }

    /// 校验整份配置（至少一个关节，每个关节的标定参数有效）
    pub fn validate(&self) -> Result<(), DriverError> {
        if self.is_empty() {
            return Err(DriverError::InvalidConfig("no motors configured".to_string()));
        }
        for (joint, calibration) in &self.motors {
            calibration.validate().map_err(|err| match err {
                DriverError::InvalidConfig(reason) => {
                    DriverError::InvalidConfig(format!("joint '{}': {}", joint, reason))
                },
                other => other,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blossom_layout() {
        let config = MotorConfig::blossom();
        let joints: Vec<&str> = config.joint_names().collect();
        assert_eq!(joints, vec!["base", "ears", "tower_1", "tower_2", "tower_3"]);
        assert_eq!(config.get("tower_2").map(|m| m.id), Some(2));
    }

    #[test]
    fn test_clamp_to_angle_limit() {
        let mut calibration = MotorCalibration::new(1);
        assert_eq!(calibration.clamp(500.0), 500.0);

        calibration.angle_limit = Some([-150.0, 150.0]);
        assert_eq!(calibration.clamp(500.0), 150.0);
        assert_eq!(calibration.clamp(-151.0), -150.0);
        assert_eq!(calibration.clamp(12.5), 12.5);
    }

    #[test]
    fn test_inverted_limit_rejected_without_panic() {
        let mut calibration = MotorCalibration::new(3);
        calibration.angle_limit = Some([150.0, -150.0]);
        assert!(matches!(calibration.validate(), Err(DriverError::InvalidConfig(_))));
        assert_eq!(calibration.clamp(0.0), -150.0);

        calibration.angle_limit = Some([f64::NAN, 150.0]);
        assert!(calibration.validate().is_err());
        assert_eq!(calibration.clamp(0.0), 0.0);

        let config = MotorConfig::new().with_motor("tower_3", calibration);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("tower_3"));
    }

    #[test]
    fn test_validate() {
        assert!(MotorConfig::blossom().validate().is_ok());
        assert!(MotorConfig::new().validate().is_err());

        let mut calibration = MotorCalibration::new(1);
        calibration.offset = f64::INFINITY;
        assert!(calibration.validate().is_err());
    }

    #[test]
    fn test_deserialize_defaults() {
        let config: MotorConfig = toml::from_str(
            r#"
            [motors.tower_1]
            id = 1

            [motors.ears]
            id = 5
            offset = 10.0
            angle_limit = [-100.0, 100.0]
            orientation = "indirect"
            "#,
        )
        .unwrap();

        let tower = config.get("tower_1").unwrap();
        assert_eq!(tower.offset, 0.0);
        assert_eq!(tower.angle_limit, None);
        assert_eq!(tower.orientation, Orientation::Direct);

        let ears = config.get("ears").unwrap();
        assert_eq!(ears.orientation, Orientation::Indirect);
        assert_eq!(ears.angle_limit, Some([-100.0, 100.0]));
    }
}
