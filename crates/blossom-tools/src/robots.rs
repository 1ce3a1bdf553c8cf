//! # 机器人配置文件
//!
//! 每个机器人一张表，表内是电机配置：
//!
//! ```toml
//! [woody.motors.tower_1]
//! id = 1
//! angle_limit = [-150.0, 150.0]
//!
//! [woody.motors.ears]
//! id = 5
//! orientation = "indirect"
//! ```

use anyhow::{Context, Result, bail};
use blossom_driver::MotorConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// 默认机器人名称
pub const DEFAULT_ROBOT: &str = "woody";

/// 机器人配置文件（机器人名 → 电机配置）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RobotConfigFile {
    robots: BTreeMap<String, MotorConfig>,
}

impl RobotConfigFile {
    /// 内置配置：一台标准构型的 `woody`
    pub fn builtin() -> Self {
        Self::default().with_robot(DEFAULT_ROBOT, MotorConfig::blossom())
    }

    pub fn with_robot(mut self, name: impl Into<String>, config: MotorConfig) -> Self {
        self.robots.insert(name.into(), config);
        self
    }

    /// 从文件加载
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取机器人配置失败: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("解析机器人配置失败: {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: Self = toml::from_str(content)?;
        for (name, config) in &file.robots {
            if config.is_empty() {
                bail!("机器人 '{}' 没有配置任何电机", name);
            }
            config
                .validate()
                .with_context(|| format!("机器人 '{}' 的电机配置无效", name))?;
        }
        Ok(file)
    }

    /// 已配置的机器人名称（排序）
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.robots.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&MotorConfig> {
        self.robots.get(name)
    }

    /// 按请求顺序取出配置
    ///
    /// 重复名称只保留第一次出现；第一个名称即主机器人。
    pub fn configs_for<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<(String, MotorConfig)>> {
        if names.is_empty() {
            bail!("至少需要指定一个机器人");
        }

        let mut configs: Vec<(String, MotorConfig)> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            if configs.iter().any(|(existing, _)| existing == name) {
                continue;
            }
            let config = self.get(name).with_context(|| {
                let known: Vec<&str> = self.names().collect();
                format!("未知机器人: {}（已配置: {}）", name, known.join(", "))
            })?;
            configs.push((name.to_string(), config.clone()));
        }
        Ok(configs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_ROBOTS: &str = r#"
        [woody.motors.tower_1]
        id = 1

        [woody.motors.tower_2]
        id = 2

        [buzz.motors.tower_1]
        id = 11

        [buzz.motors.base]
        id = 14
        angle_limit = [-180.0, 180.0]
    "#;

    #[test]
    fn test_builtin() {
        let file = RobotConfigFile::builtin();
        assert_eq!(file.names().collect::<Vec<_>>(), vec!["woody"]);
        assert_eq!(file.get("woody"), Some(&MotorConfig::blossom()));
    }

    #[test]
    fn test_parse() {
        let file = RobotConfigFile::from_toml_str(TWO_ROBOTS).unwrap();
        assert_eq!(file.names().collect::<Vec<_>>(), vec!["buzz", "woody"]);
        assert_eq!(file.get("buzz").unwrap().get("base").unwrap().angle_limit, Some([-180.0, 180.0]));
    }

    #[test]
    fn test_configs_follow_request_order() {
        let file = RobotConfigFile::from_toml_str(TWO_ROBOTS).unwrap();
        let configs = file.configs_for(&["woody", "buzz", "woody"]).unwrap();
        let names: Vec<&str> = configs.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["woody", "buzz"]);
    }

    #[test]
    fn test_unknown_robot() {
        let file = RobotConfigFile::builtin();
        let err = file.configs_for(&["rex"]).unwrap_err();
        assert!(err.to_string().contains("rex"));
    }

    #[test]
    fn test_empty_request() {
        let file = RobotConfigFile::builtin();
        let names: [&str; 0] = [];
        assert!(file.configs_for(&names).is_err());
    }

    #[test]
    fn test_robot_without_motors_rejected() {
        assert!(RobotConfigFile::from_toml_str("[woody.motors]\n").is_err());
    }

    #[test]
    fn test_inverted_angle_limit_rejected() {
        let err = RobotConfigFile::from_toml_str(
            r#"
[woody.motors.tower_1]
id = 1
angle_limit = [150.0, -150.0]
"#,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("woody"));
    }

    #[test]
    fn test_non_finite_angle_limit_rejected() {
        let content = r#"
[woody.motors.tower_1]
id = 1
angle_limit = [nan, 150.0]
"#;
        assert!(RobotConfigFile::from_toml_str(content).is_err());
    }
}
