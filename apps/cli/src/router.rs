//! 命令解释器
//!
//! 单线程：输入线程每次读取一行，拆分为 `token args...` 后分发到整支队列。
//! 所有数值解析和目标解析都在修改任何机器人状态之前完成，
//! 用户输入错误只报告给操作员，循环继续。

use crate::console::{Console, Line};
use crate::manual;
use blossom_client::{ClientError, FleetRegistry, Recorder, RobotUnit};
use blossom_driver::JointPositions;
use crossbeam_channel::Sender;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// 顶层提示符
pub const PROMPT: &str = "blossom> ";

/// 位置指令的过渡时间（立即执行）
pub const MOVE_TRANSITION: Duration = Duration::ZERO;

/// 顶层命令及其说明
pub const COMMANDS: &[(&str, &str)] = &[
    ("m", "m [<target> <position> <speed>]  move a joint ('1', 'tower_1', 'base' ...) or 'all' on every robot"),
    ("e", "e [factor]  set the speed factor on every robot"),
    ("a", "a [factor]  set the amplitude factor on every robot"),
    ("p", "p [factor]  set the posture offset on every robot"),
    ("h", "h [topic]  show help for a command"),
    ("man", "man  enter manual mode (Ctrl+C to leave)"),
    ("rec", "rec  start recording on the primary robot"),
    ("stop", "stop [name]  stop recording; without a name the sequence is temporary"),
];

/// 命令错误（全部是可恢复的用户错误或设备错误）
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid input: '{0}'")]
    InvalidInput(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("{what} must be a finite number, got '{input}'")]
    NotANumber { what: &'static str, input: String },

    #[error("Robot '{robot}' has no joint '{target}'")]
    UnknownTarget { robot: String, target: String },

    #[error("Input cancelled")]
    Cancelled,

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Command failed on {} robot(s): {}", .0.len(), describe(.0))]
    Fleet(Vec<(String, ClientError)>),
}

fn describe(failures: &[(String, ClientError)]) -> String {
    failures
        .iter()
        .map(|(robot, err)| format!("{}: {}", robot, err))
        .collect::<Vec<_>>()
        .join("; ")
}

/// 可调节的控制参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Factor {
    Speed,
    Amplitude,
    Posture,
}

impl Factor {
    fn label(self) -> &'static str {
        match self {
            Factor::Speed => "Speed factor",
            Factor::Amplitude => "Amplitude factor",
            Factor::Posture => "Posture factor",
        }
    }

    fn usage(self) -> &'static str {
        match self {
            Factor::Speed => "e [factor]",
            Factor::Amplitude => "a [factor]",
            Factor::Posture => "p [factor]",
        }
    }

    fn apply(self, unit: &RobotUnit, value: f64) {
        match self {
            Factor::Speed => unit.set_speed(value),
            Factor::Amplitude => unit.set_amplitude(value),
            Factor::Posture => unit.set_posture(value),
        }
    }
}

/// 解析有限浮点数
pub(crate) fn parse_number(what: &'static str, input: &str) -> Result<f64, CommandError> {
    match input.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(CommandError::NotANumber {
            what,
            input: input.to_string(),
        }),
    }
}

/// 解析一台机器人上的运动目标
///
/// - `all`: 所有已配置关节
/// - 精确的关节名
/// - 纯数字 `N`: `tower_N`
pub(crate) fn resolve_target(
    unit: &RobotUnit,
    target: &str,
    position: f64,
) -> Result<JointPositions, CommandError> {
    if target == "all" {
        return Ok(unit.joint_names().into_iter().map(|joint| (joint, position)).collect());
    }

    let joint = if unit.has_joint(target) {
        target.to_string()
    } else if !target.is_empty() && target.chars().all(|c| c.is_ascii_digit()) {
        format!("tower_{}", target)
    } else {
        String::new()
    };

    if !unit.has_joint(&joint) {
        return Err(CommandError::UnknownTarget {
            robot: unit.name().to_string(),
            target: target.to_string(),
        });
    }

    Ok(JointPositions::from([(joint, position)]))
}

/// 为每台机器人解析目标（任何一台失败则整体失败，不产生副作用）
pub(crate) fn plan_move(
    fleet: &FleetRegistry,
    target: &str,
    position: f64,
) -> Result<HashMap<String, JointPositions>, CommandError> {
    fleet
        .units()
        .iter()
        .map(|unit| -> Result<_, CommandError> {
            Ok((unit.name().to_string(), resolve_target(unit, target, position)?))
        })
        .collect()
}

/// 下发已解析的运动目标，逐台汇总失败
pub(crate) fn execute_move(
    fleet: &FleetRegistry,
    plan: &HashMap<String, JointPositions>,
) -> Result<(), CommandError> {
    let failures = fleet.broadcast(|unit| match plan.get(unit.name()) {
        Some(targets) => unit.goto_position(targets, MOVE_TRANSITION, true),
        None => Ok(()),
    });

    if failures.is_empty() { Ok(()) } else { Err(CommandError::Fleet(failures)) }
}

/// 向操作员索取一个参数
fn ask(console: &mut dyn Console, prompt: &str) -> Result<String, CommandError> {
    match console.read_line(prompt) {
        Line::Text(text) => Ok(text),
        Line::Interrupted | Line::Eof => Err(CommandError::Cancelled),
    }
}

/// 命令解释器
pub struct CommandRouter {
    fleet: Arc<FleetRegistry>,
    recorder: Arc<Recorder>,
}

impl CommandRouter {
    pub fn new(fleet: Arc<FleetRegistry>, recorder: Arc<Recorder>) -> Self {
        Self { fleet, recorder }
    }

    /// 输入循环
    ///
    /// Ctrl+C 请求关机；输入结束只退出循环。
    pub fn run(&self, console: &mut dyn Console, shutdown: &Sender<()>) {
        console.say(&format!(
            "Blossom CLI v{} - {} robot(s) online, type 'h' for help",
            env!("CARGO_PKG_VERSION"),
            self.fleet.len()
        ));

        loop {
            match console.read_line(PROMPT) {
                // 关机清理后设备已关闭，不再接受命令
                Line::Text(_) if self.fleet.is_shut_down() => {
                    info!("Fleet is shut down, command intake stopped");
                    break;
                },
                Line::Text(line) => self.handle_line(console, &line),
                Line::Interrupted => {
                    info!("Shutdown requested from console");
                    let _ = shutdown.try_send(());
                    break;
                },
                Line::Eof => {
                    info!("Console input closed");
                    break;
                },
            }
        }
    }

    /// 处理一行输入，错误报告给操作员
    pub fn handle_line(&self, console: &mut dyn Console, line: &str) {
        let mut words = line.split_whitespace();
        let Some(token) = words.next() else {
            return;
        };
        let args: Vec<&str> = words.collect();

        if let Err(err) = self.dispatch(console, token, &args) {
            console.say(&format!("❌ {}", err));
        }
    }

    pub fn dispatch(
        &self,
        console: &mut dyn Console,
        token: &str,
        args: &[&str],
    ) -> Result<(), CommandError> {
        debug!(token, ?args, "Dispatching command");

        match token {
            "m" => self.motor_move(console, args),
            "e" => self.set_factor(console, Factor::Speed, args),
            "a" => self.set_factor(console, Factor::Amplitude, args),
            "p" => self.set_factor(console, Factor::Posture, args),
            "h" => self.help(console, args),
            "man" => {
                manual::run(console, &self.fleet);
                Ok(())
            },
            "rec" => self.start_recording(console, args),
            "stop" => self.stop_recording(console, args),
            other => Err(CommandError::InvalidInput(other.to_string())),
        }
    }

    // ==================== 命令实现 ====================

    fn motor_move(&self, console: &mut dyn Console, args: &[&str]) -> Result<(), CommandError> {
        let (target, position, speed) = match args {
            [] => (
                ask(console, "Motor # (1, 2, 3) or 'all': ")?,
                ask(console, "Position: ")?,
                ask(console, "Speed: ")?,
            ),
            [target, position, speed] => {
                (target.to_string(), position.to_string(), speed.to_string())
            },
            _ => return Err(CommandError::Usage("m <target> <position> <speed>")),
        };

        let target = target.trim();
        let position = parse_number("Position", &position)?;
        let speed = parse_number("Speed", &speed)?;
        let plan = plan_move(&self.fleet, target, position)?;

        // 速度先作用于所有机器人，再下发位置
        for unit in self.fleet.units() {
            unit.set_speed(speed);
        }
        execute_move(&self.fleet, &plan)?;

        console.say(&format!("✅ {} -> {} (speed {})", target, position, speed));
        Ok(())
    }

    fn set_factor(
        &self,
        console: &mut dyn Console,
        factor: Factor,
        args: &[&str],
    ) -> Result<(), CommandError> {
        let input = match args {
            [] => ask(console, &format!("{}: ", factor.label()))?,
            [value] => value.to_string(),
            _ => return Err(CommandError::Usage(factor.usage())),
        };

        let value = parse_number(factor.label(), &input)?;
        for unit in self.fleet.units() {
            factor.apply(unit, value);
        }

        console.say(&format!("✅ {} = {}", factor.label(), value));
        Ok(())
    }

    fn help(&self, console: &mut dyn Console, args: &[&str]) -> Result<(), CommandError> {
        let topic = match args {
            [] => ask(console, "Help: ")?,
            [topic] => topic.to_string(),
            _ => return Err(CommandError::Usage("h [topic]")),
        };
        let topic = topic.trim();

        if topic.is_empty() {
            console.say("Commands:");
            for (_, text) in COMMANDS {
                console.say(&format!("  {}", text));
            }
            return Ok(());
        }

        let entry = COMMANDS
            .iter()
            .chain(manual::PRIMITIVES)
            .find(|(name, _)| *name == topic);
        match entry {
            Some((_, text)) => console.say(text),
            None => console.say(&format!("⚠️  No help for '{}'", topic)),
        }
        Ok(())
    }

    fn start_recording(&self, console: &mut dyn Console, args: &[&str]) -> Result<(), CommandError> {
        if !args.is_empty() {
            return Err(CommandError::Usage("rec"));
        }

        let primary = self.fleet.primary();
        self.recorder.start_recording(primary)?;
        console.say(&format!(
            "🔴 Recording '{}' (type 'stop [name]' to finish)",
            primary.name()
        ));
        Ok(())
    }

    fn stop_recording(&self, console: &mut dyn Console, args: &[&str]) -> Result<(), CommandError> {
        let name = match args {
            [] => "",
            [name] => *name,
            _ => return Err(CommandError::Usage("stop [name]")),
        };

        let resolved = self.recorder.stop_recording(&self.fleet, self.fleet.primary(), name)?;
        if name.is_empty() {
            console.say(&format!("✅ Temporary sequence saved: {}", resolved));
        } else {
            console.say(&format!("✅ Sequence saved: {}", resolved));
        }
        Ok(())
    }
}
