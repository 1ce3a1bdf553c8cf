//! 手动模式
//!
//! 嵌套的读-执行循环，只接受固定的底层原语，作用于整支队列。
//! Ctrl+C 或输入结束只退出本循环。

use crate::console::{Console, Line};
use crate::router::{CommandError, execute_move, parse_number, plan_move};
use blossom_client::FleetRegistry;
use blossom_driver::JointPositions;
use tracing::info;

const PROMPT: &str = "manual> ";

/// 手动模式原语及其说明
pub const PRIMITIVES: &[(&str, &str)] = &[
    ("set", "set <joint> <position>  move one joint (or 'all') on every robot"),
    ("speed", "speed <factor>  set the speed factor on every robot"),
    ("state", "state  print every robot's joint state"),
    ("reset", "reset  move every robot to its reset position"),
    ("help", "help  list manual commands"),
    ("exit", "exit  leave manual mode"),
];

/// 运行手动模式，直到中断、输入结束或 `exit`
pub fn run(console: &mut dyn Console, fleet: &FleetRegistry) {
    info!("Entering manual mode");
    console.say("🔧 Manual mode, Ctrl+C to leave");

    loop {
        let line = match console.read_line(PROMPT) {
            Line::Text(line) => line,
            Line::Interrupted | Line::Eof => break,
        };
        if line == "exit" {
            break;
        }

        if let Err(err) = execute(console, fleet, &line) {
            console.say(&format!("❌ {}", err));
        }
    }

    info!("Leaving manual mode");
    console.say("👋 Left manual mode");
}

fn execute(console: &mut dyn Console, fleet: &FleetRegistry, line: &str) -> Result<(), CommandError> {
    let words: Vec<&str> = line.split_whitespace().collect();

    match words.as_slice() {
        [] => Ok(()),
        ["set", target, position] => {
            let position = parse_number("Position", position)?;
            let plan = plan_move(fleet, target, position)?;
            execute_move(fleet, &plan)
        },
        ["set", ..] => Err(CommandError::Usage("set <joint> <position>")),
        ["speed", value] => {
            let speed = parse_number("Speed factor", value)?;
            for unit in fleet.units() {
                unit.set_speed(speed);
            }
            Ok(())
        },
        ["speed", ..] => Err(CommandError::Usage("speed <factor>")),
        ["state"] => {
            for unit in fleet.units() {
                let state = unit.joint_state()?;
                console.say(&format!("{}: {}", unit.name(), format_positions(&state)));
            }
            Ok(())
        },
        ["reset"] => {
            let failures = fleet.broadcast(|unit| unit.reset_position());
            if failures.is_empty() { Ok(()) } else { Err(CommandError::Fleet(failures)) }
        },
        ["help"] => {
            for (_, text) in PRIMITIVES {
                console.say(&format!("  {}", text));
            }
            Ok(())
        },
        [other, ..] => Err(CommandError::InvalidInput(other.to_string())),
    }
}

fn format_positions(positions: &JointPositions) -> String {
    positions
        .iter()
        .map(|(joint, position)| format!("{}={:.1}", joint, position))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::testing::ScriptedConsole;
    use blossom_driver::{BringupPolicy, MotorConfig, SimConnector};

    fn fleet(connector: &SimConnector) -> FleetRegistry {
        FleetRegistry::bring_up(
            connector,
            &BringupPolicy::default(),
            vec![
                ("woody".to_string(), MotorConfig::blossom()),
                ("buzz".to_string(), MotorConfig::blossom()),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_primitives_until_interrupt() {
        let connector = SimConnector::new();
        let fleet = fleet(&connector);
        let mut console = ScriptedConsole::new(&["set 1 20", "speed 1.5", "state"]);
        console.push(Line::Interrupted);
        console.push(Line::Text("set 1 99".to_string()));

        run(&mut console, &fleet);

        for name in ["woody", "buzz"] {
            assert_eq!(connector.state(name).unwrap().positions["tower_1"], 20.0);
        }
        assert!(fleet.units().iter().all(|u| u.speed() == 1.5));

        let transcript = console.transcript();
        assert!(transcript.contains("woody: base=0.0, ears=0.0, tower_1=20.0"));
        assert!(transcript.contains("Left manual mode"));
    }

    #[test]
    fn test_reset_every_robot() {
        let connector = SimConnector::new();
        let fleet = fleet(&connector);
        let resets_before = connector.state("buzz").unwrap().resets;

        let mut console = ScriptedConsole::new(&["set all 10", "reset", "exit"]);
        run(&mut console, &fleet);

        let state = connector.state("buzz").unwrap();
        assert_eq!(state.resets, resets_before + 1);
        assert!(state.positions.values().all(|&p| p == 0.0));
    }

    #[test]
    fn test_errors_do_not_leave_manual_mode() {
        let connector = SimConnector::new();
        let fleet = fleet(&connector);
        let mut console = ScriptedConsole::new(&["jump", "set 1", "set neck 5", "speed fast", "help"]);

        run(&mut console, &fleet);

        let transcript = console.transcript();
        assert!(transcript.contains("Invalid input: 'jump'"));
        assert!(transcript.contains("Usage: set <joint> <position>"));
        assert!(transcript.contains("has no joint 'neck'"));
        assert!(transcript.contains("Speed factor must be a finite number"));
        assert!(transcript.contains("leave manual mode"));
        // 输入结束后退出
        assert!(transcript.contains("Left manual mode"));
    }
}
