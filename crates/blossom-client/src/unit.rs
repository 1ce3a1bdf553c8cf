//! 机器人单元
//!
//! `RobotUnit` 只能通过上线成功得到：队列中可见的单元一定持有可用的设备句柄，
//! 不存在"半初始化"状态。

use crate::error::ClientError;
use crate::recording::RecordingSession;
use blossom_driver::{
    BringupPolicy, DeviceConnector, DeviceHandle, JointPositions, MotorConfig, RobotBuilder,
};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 设备互斥锁：命令线程与录制线程共享，同一时刻只有一个执行者驱动设备
pub(crate) type SharedDevice = Arc<Mutex<Box<dyn DeviceHandle>>>;

/// 运行时控制参数
///
/// - `speed`: 速度系数（0.5 ~ 2.0），缩放后续运动的过渡时间
/// - `amp`: 幅度系数（0.5 ~ 2.0），用于序列回放
/// - `post`: 姿态偏移（-150 ~ 150），用于序列回放
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlFactors {
    pub speed: f64,
    pub amp: f64,
    pub post: f64,
}

impl Default for ControlFactors {
    fn default() -> Self {
        Self {
            speed: 1.0,
            amp: 1.0,
            post: 0.0,
        }
    }
}

impl ControlFactors {
    /// 按速度系数缩放过渡时间
    pub fn scale_transition(&self, transition: Duration) -> Duration {
        if self.speed > 0.0 && self.speed.is_finite() {
            Duration::try_from_secs_f64(transition.as_secs_f64() / self.speed).unwrap_or(transition)
        } else {
            transition
        }
    }
}

/// 一台已连接的机器人
pub struct RobotUnit {
    name: String,
    config: MotorConfig,
    device: SharedDevice,
    factors: RwLock<ControlFactors>,
    recording: Mutex<Option<RecordingSession>>,
}

impl RobotUnit {
    /// 上线一台机器人（带重试保护）
    ///
    /// 返回的单元已连接并处于复位姿态。
    pub fn bring_up(
        connector: &dyn DeviceConnector,
        policy: &BringupPolicy,
        name: &str,
        config: MotorConfig,
    ) -> Result<Self, ClientError> {
        let device = RobotBuilder::new(connector).policy(policy.clone()).build(name, &config)?;
        info!(robot = %name, joints = config.motors.len(), "Robot online");
        Ok(Self::from_device(name, config, device))
    }

    /// 用一个已连接的设备句柄构造单元
    pub fn from_device(
        name: impl Into<String>,
        config: MotorConfig,
        device: Box<dyn DeviceHandle>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            device: Arc::new(Mutex::new(device)),
            factors: RwLock::new(ControlFactors::default()),
            recording: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &MotorConfig {
        &self.config
    }

    /// 已配置的关节名称
    pub fn joint_names(&self) -> Vec<String> {
        self.config.joint_names().map(str::to_string).collect()
    }

    pub fn has_joint(&self, joint: &str) -> bool {
        self.config.contains(joint)
    }

    // ==================== 控制参数 ====================

    pub fn factors(&self) -> ControlFactors {
        *self.factors.read()
    }

    pub fn speed(&self) -> f64 {
        self.factors.read().speed
    }

    pub fn set_speed(&self, speed: f64) {
        self.factors.write().speed = speed;
    }

    pub fn amplitude(&self) -> f64 {
        self.factors.read().amp
    }

    pub fn set_amplitude(&self, amp: f64) {
        self.factors.write().amp = amp;
    }

    pub fn posture(&self) -> f64 {
        self.factors.read().post
    }

    pub fn set_posture(&self, post: f64) {
        self.factors.write().post = post;
    }

    // ==================== 设备操作 ====================

    /// 发送位置指令（过渡时间按当前速度系数缩放）
    pub fn goto_position(
        &self,
        targets: &JointPositions,
        transition: Duration,
        immediate: bool,
    ) -> Result<(), ClientError> {
        let transition = self.factors().scale_transition(transition);
        debug!(robot = %self.name, ?targets, ?transition, "goto_position");
        self.device.lock().goto_position(targets, transition, immediate)?;
        Ok(())
    }

    /// 所有关节移动到同一位置
    pub fn goto_all(&self, position: f64, transition: Duration) -> Result<(), ClientError> {
        let targets: JointPositions =
            self.config.joint_names().map(|joint| (joint.to_string(), position)).collect();
        self.goto_position(&targets, transition, true)
    }

    pub fn reset_position(&self) -> Result<(), ClientError> {
        self.device.lock().reset_position()?;
        Ok(())
    }

    pub fn joint_state(&self) -> Result<JointPositions, ClientError> {
        Ok(self.device.lock().joint_state()?)
    }

    /// 关闭设备（会先中止进行中的录制）
    pub fn close(&self) -> Result<(), ClientError> {
        self.abort_recording();
        self.device.lock().close()?;
        info!(robot = %self.name, "Robot closed");
        Ok(())
    }

    // ==================== 录制状态 ====================

    pub fn is_recording(&self) -> bool {
        self.recording.lock().is_some()
    }

    /// 中止进行中的录制并丢弃缓冲区
    pub fn abort_recording(&self) {
        let session = self.recording.lock().take();
        if let Some(session) = session {
            match session.stop() {
                Ok(frames) => {
                    warn!(robot = %self.name, frames = frames.len(), "Recording aborted, buffer discarded")
                },
                Err(err) => warn!(robot = %self.name, error = %err, "Recording aborted abnormally"),
            }
        }
    }

    pub(crate) fn device(&self) -> SharedDevice {
        Arc::clone(&self.device)
    }

    pub(crate) fn recording_slot(&self) -> &Mutex<Option<RecordingSession>> {
        &self.recording
    }
}

impl fmt::Debug for RobotUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RobotUnit")
            .field("name", &self.name)
            .field("joints", &self.joint_names())
            .field("factors", &self.factors())
            .field("recording", &self.is_recording())
            .finish()
    }
}
