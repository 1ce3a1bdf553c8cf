//! 实时轨迹录制
//!
//! 状态机：`Idle --start--> Recording --stop--> Idle`
//!
//! - 每台机器人同一时刻最多一个录制会话，重复 `start` 返回 `AlreadyRecording`
//! - 采样在独立线程上进行，每次采样都会获取该机器人的设备锁
//! - 停止信号是一个 channel：`stop` 发送信号，采样线程在两次采样之间观察到后退出，
//!   缓冲区随线程返回值转移给 `Sequence`
//!
//! # 使用示例
//!
//! ```rust
//! use blossom_client::{FleetRegistry, Recorder};
//! use blossom_driver::{BringupPolicy, MotorConfig, SimConnector};
//! use blossom_tools::{FsSequenceStore, LogGestureSink};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = tempfile::tempdir()?;
//! let connector = SimConnector::new();
//! let fleet = FleetRegistry::bring_up(
//!     &connector,
//!     &BringupPolicy::default(),
//!     vec![("woody".to_string(), MotorConfig::blossom())],
//! )?;
//!
//! let recorder = Recorder::new(
//!     Arc::new(FsSequenceStore::new(dir.path())),
//!     Arc::new(LogGestureSink),
//! );
//!
//! recorder.start_recording(fleet.primary())?;
//! // ... 手动摆动机器人 ...
//! let name = recorder.stop_recording(&fleet, fleet.primary(), "greeting")?;
//! assert_eq!(name, "greeting");
//! # Ok(())
//! # }
//! ```

use crate::error::ClientError;
use crate::fleet::FleetRegistry;
use crate::unit::RobotUnit;
use blossom_driver::DriverError;
use blossom_tools::{Frame, GesturePayload, GestureSink, Sequence, SequenceStore};
use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 默认采样周期
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(50);

/// 录制配置
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingConfig {
    /// 采样周期
    pub sample_interval: Duration,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
        }
    }
}

/// 进行中的录制会话（由所属的 `RobotUnit` 独占持有）
pub struct RecordingSession {
    robot: String,
    stop_tx: Sender<()>,
    capture: JoinHandle<Vec<Frame>>,
    started_at: Instant,
}

impl RecordingSession {
    /// 启动采样线程
    pub(crate) fn start(unit: &RobotUnit, interval: Duration) -> Result<Self, ClientError> {
        let robot = unit.name().to_string();
        let device = unit.device();
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let thread_robot = robot.clone();
        let capture = thread::Builder::new()
            .name(format!("record-{}", robot))
            .spawn(move || {
                let start = Instant::now();
                let mut frames = Vec::new();
                let mut warned = false;

                loop {
                    // 设备锁只在单次采样期间持有
                    let sample = device.lock().joint_state();
                    match sample {
                        Ok(positions) => {
                            let millis = start.elapsed().as_millis() as u64;
                            frames.push(Frame::new(millis, positions));
                        },
                        Err(err) if !warned => {
                            warn!(robot = %thread_robot, error = %err, "Snapshot capture failed");
                            warned = true;
                        },
                        Err(err) => debug!(robot = %thread_robot, error = %err, "Snapshot capture failed"),
                    }

                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        // 收到停止信号或发送端已丢弃
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }

                frames
            })
            .map_err(|e| {
                DriverError::Runtime(format!("failed to spawn capture thread: {}", e))
            })?;

        Ok(Self {
            robot,
            stop_tx,
            capture,
            started_at: Instant::now(),
        })
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// 发送停止信号并取回缓冲区
    pub(crate) fn stop(self) -> Result<Vec<Frame>, ClientError> {
        // 采样线程可能已经退出，发送失败无妨
        let _ = self.stop_tx.send(());
        self.capture.join().map_err(|_| ClientError::CaptureThread(self.robot.clone()))
    }
}

/// 录制控制器
///
/// 负责启动/停止各机器人的录制会话，并把结果交给序列存储和手势上传端。
pub struct Recorder {
    store: Arc<dyn SequenceStore>,
    sink: Arc<dyn GestureSink>,
    config: RecordingConfig,
}

impl Recorder {
    pub fn new(store: Arc<dyn SequenceStore>, sink: Arc<dyn GestureSink>) -> Self {
        Self {
            store,
            sink,
            config: RecordingConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RecordingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RecordingConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn SequenceStore> {
        &self.store
    }

    /// 开始录制
    ///
    /// # Errors
    /// - `ClientError::AlreadyRecording`: 该机器人已有进行中的录制
    pub fn start_recording(&self, unit: &RobotUnit) -> Result<(), ClientError> {
        let mut slot = unit.recording_slot().lock();
        if slot.is_some() {
            return Err(ClientError::AlreadyRecording(unit.name().to_string()));
        }

        *slot = Some(RecordingSession::start(unit, self.config.sample_interval)?);
        info!(robot = %unit.name(), interval = ?self.config.sample_interval, "Recording started");
        Ok(())
    }

    /// 停止录制并生成序列
    ///
    /// - `name` 非空：保存为具名序列（机器人集合 = 当前整个队列），并上传手势
    /// - `name` 为空：生成随机名称，保存为临时序列，不上传
    ///
    /// 返回最终的序列名称。上传失败只记录日志，不影响返回值。
    pub fn stop_recording(
        &self,
        fleet: &FleetRegistry,
        unit: &RobotUnit,
        name: &str,
    ) -> Result<String, ClientError> {
        let session = unit
            .recording_slot()
            .lock()
            .take()
            .ok_or_else(|| ClientError::NotRecording(unit.name().to_string()))?;

        let elapsed = session.elapsed();
        let frames = session.stop()?;
        let robots = fleet.names();

        if name.is_empty() {
            let generated = generate_name();
            let sequence = Sequence::temporary(generated.clone(), robots, frames);
            self.store.save(&sequence).map_err(ClientError::Store)?;
            info!(robot = %unit.name(), name = %generated, frames = sequence.frame_count(), ?elapsed, "Temporary recording saved");
            return Ok(generated);
        }

        let sequence = Sequence::named(name, robots, frames);
        self.store.save(&sequence).map_err(ClientError::Store)?;
        info!(robot = %unit.name(), name = %name, frames = sequence.frame_count(), ?elapsed, "Recording saved");

        let upload = GesturePayload::new(name, &sequence, "").and_then(|p| self.sink.upload(&p));
        if let Err(err) = upload {
            warn!(name = %name, error = %format!("{:#}", err), "Gesture upload failed");
        }

        Ok(name.to_string())
    }
}

/// 临时序列名称（UUID v4，无连字符）
fn generate_name() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
