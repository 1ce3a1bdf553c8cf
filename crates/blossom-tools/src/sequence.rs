//! # 动作序列
//!
//! 录制得到的关节轨迹。序列一经生成即不可变，只能整体存储、上传或删除。

use blossom_driver::JointPositions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 带时间戳的关节状态快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// 相对录制开始的时间（毫秒）
    pub millis: u64,

    /// 关节位置
    pub positions: JointPositions,
}

impl Frame {
    pub fn new(millis: u64, positions: JointPositions) -> Self {
        Self { millis, positions }
    }
}

/// 动作序列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    name: String,
    robots: Vec<String>,
    frames: Vec<Frame>,
    #[serde(default)]
    temporary: bool,
}

impl Sequence {
    /// 具名序列
    pub fn named(name: impl Into<String>, robots: Vec<String>, frames: Vec<Frame>) -> Self {
        Self {
            name: name.into(),
            robots,
            frames,
            temporary: false,
        }
    }

    /// 临时序列（关机时清理）
    pub fn temporary(name: impl Into<String>, robots: Vec<String>, frames: Vec<Frame>) -> Self {
        Self {
            temporary: true,
            ..Self::named(name, robots, frames)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 录制时的机器人集合
    pub fn robots(&self) -> &[String] {
        &self.robots
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// 时间跨度
    pub fn duration(&self) -> Option<Duration> {
        let first = self.frames.first()?.millis;
        let last = self.frames.last()?.millis;
        Some(Duration::from_millis(last.saturating_sub(first)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(millis: u64, tower_1: f64) -> Frame {
        Frame::new(millis, JointPositions::from([("tower_1".to_string(), tower_1)]))
    }

    #[test]
    fn test_named_sequence() {
        let seq = Sequence::named("greeting", vec!["woody".to_string()], vec![frame(0, 1.0)]);
        assert_eq!(seq.name(), "greeting");
        assert_eq!(seq.robots(), ["woody".to_string()]);
        assert!(!seq.is_temporary());
        assert_eq!(seq.frame_count(), 1);
    }

    #[test]
    fn test_temporary_sequence() {
        let seq = Sequence::temporary("abc123", vec![], vec![]);
        assert!(seq.is_temporary());
        assert_eq!(seq.frame_count(), 0);
    }

    #[test]
    fn test_duration() {
        let empty = Sequence::named("empty", vec![], vec![]);
        assert!(empty.duration().is_none());

        let seq = Sequence::named("wave", vec![], vec![frame(100, 0.0), frame(1600, 50.0)]);
        assert_eq!(seq.duration(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_json_shape() {
        let seq = Sequence::named("nod", vec!["woody".to_string()], vec![frame(20, 3.5)]);
        let value = serde_json::to_value(&seq).unwrap();

        assert_eq!(value["name"], "nod");
        assert_eq!(value["robots"][0], "woody");
        assert_eq!(value["frames"][0]["millis"], 20);
        assert_eq!(value["frames"][0]["positions"]["tower_1"], 3.5);
        assert_eq!(value["temporary"], false);
    }
}
