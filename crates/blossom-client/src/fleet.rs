//! 机器人队列
//!
//! 进程内唯一的机器人集合。启动时一次性构建（主机器人最先上线），之后只读。
//! 关机清理只执行一次：中止录制、删除临时序列、关闭设备，逐台汇总失败。

use crate::error::{ClientError, ShutdownError};
use crate::unit::RobotUnit;
use blossom_driver::{BringupPolicy, DeviceConnector, MotorConfig};
use blossom_tools::SequenceStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// 机器人队列（第一个单元是主机器人）
#[derive(Debug)]
pub struct FleetRegistry {
    units: Vec<Arc<RobotUnit>>,
    shut_down: AtomicBool,
}

impl FleetRegistry {
    /// 依次上线所有机器人
    ///
    /// `configs` 的第一项是主机器人，必须最先上线。任何一台上线失败时，
    /// 已上线的机器人会被关闭，并返回该错误。
    pub fn bring_up(
        connector: &dyn DeviceConnector,
        policy: &BringupPolicy,
        configs: Vec<(String, MotorConfig)>,
    ) -> Result<Self, ClientError> {
        if configs.is_empty() {
            return Err(ClientError::EmptyFleet);
        }

        let mut units: Vec<Arc<RobotUnit>> = Vec::with_capacity(configs.len());
        for (name, config) in configs {
            if units.iter().any(|unit| unit.name() == name) {
                warn!(robot = %name, "Duplicate robot name ignored");
                continue;
            }

            match RobotUnit::bring_up(connector, policy, &name, config) {
                Ok(unit) => units.push(Arc::new(unit)),
                Err(err) => {
                    for unit in &units {
                        if let Err(close_err) = unit.close() {
                            warn!(robot = %unit.name(), error = %close_err, "Failed to close robot after aborted bring-up");
                        }
                    }
                    return Err(err);
                },
            }
        }

        info!(robots = ?units.iter().map(|u| u.name()).collect::<Vec<_>>(), "Fleet online");
        Self::from_units(units)
    }

    /// 用已上线的单元构造队列（第一个为主机器人）
    pub fn from_units(units: Vec<Arc<RobotUnit>>) -> Result<Self, ClientError> {
        if units.is_empty() {
            return Err(ClientError::EmptyFleet);
        }
        Ok(Self {
            units,
            shut_down: AtomicBool::new(false),
        })
    }

    /// 主机器人
    pub fn primary(&self) -> &Arc<RobotUnit> {
        &self.units[0]
    }

    pub fn units(&self) -> &[Arc<RobotUnit>] {
        &self.units
    }

    /// 所有机器人名称（主机器人在前）
    pub fn names(&self) -> Vec<String> {
        self.units.iter().map(|unit| unit.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// 对每台机器人执行同一操作
    ///
    /// 单台失败不会跳过其余机器人，返回所有失败（机器人名, 错误）。
    pub fn broadcast<E, F>(&self, mut op: F) -> Vec<(String, E)>
    where
        F: FnMut(&RobotUnit) -> Result<(), E>,
    {
        self.units
            .iter()
            .filter_map(|unit| op(unit).err().map(|err| (unit.name().to_string(), err)))
            .collect()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// 关机清理（只执行一次）
    ///
    /// 每台机器人依次：中止录制 → 删除临时序列 → 关闭设备。
    /// 单台失败不影响其余机器人，所有失败汇总到 `ShutdownError`。
    pub fn shutdown(&self, store: &dyn SequenceStore) -> Result<(), ShutdownError> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let mut failures = Vec::new();
        for unit in &self.units {
            unit.abort_recording();

            if let Err(err) = store.remove_temporary(unit.name()) {
                warn!(robot = %unit.name(), error = %format!("{:#}", err), "Failed to remove temporary sequences");
                failures.push((unit.name().to_string(), format!("{:#}", err)));
            }

            if let Err(err) = unit.close() {
                warn!(robot = %unit.name(), error = %err, "Failed to close robot");
                failures.push((unit.name().to_string(), err.to_string()));
            }
        }

        if failures.is_empty() {
            info!("Fleet shut down");
            Ok(())
        } else {
            Err(ShutdownError { failures })
        }
    }
}
