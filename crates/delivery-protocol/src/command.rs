use std::fmt;

/// Rotation sense of one wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    fn as_wire(self) -> u8 {
        match self {
            Direction::Forward => 0,
            Direction::Reverse => 1,
        }
    }
}

/// Eye LED animation the microcontroller should play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LedState {
    Idle,
    Waiting,
    Moving,
    Error,
    SuccessScan,
    FailureScan,
}

impl LedState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedState::Idle => "IDLE",
            LedState::Waiting => "WAITING",
            LedState::Moving => "MOVING",
            LedState::Error => "ERROR",
            LedState::SuccessScan => "SUCCESS_SCAN",
            LedState::FailureScan => "FAILURE_SCAN",
        }
    }
}

impl fmt::Display for LedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a command may be silently dropped under backpressure.
///
/// Mirrors the serial link's retry/queue policy: motor and
/// servo commands actuate the robot and must never be dropped; LED
/// commands are cosmetic and may be superseded or discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandPriority {
    /// May be dropped or overwritten by a newer command of the same kind.
    Droppable,
    /// Must be delivered; retried on timeout, never silently discarded.
    Reliable,
}

/// One outgoing command to the microcontroller, as an ASCII line (without
/// the trailing `\n`, which the link layer appends).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Motor {
        left_speed: u8,
        right_speed: u8,
        left_dir: Direction,
        right_dir: Direction,
    },
    Servo {
        angle: u8,
    },
    Led(LedState),
    Stop,
}

impl Command {
    pub fn stop_motors() -> Self {
        Command::Motor {
            left_speed: 0,
            right_speed: 0,
            left_dir: Direction::Forward,
            right_dir: Direction::Forward,
        }
    }

    pub fn priority(&self) -> CommandPriority {
        match self {
            Command::Motor { .. } | Command::Servo { .. } | Command::Stop => {
                CommandPriority::Reliable
            }
            Command::Led(_) => CommandPriority::Droppable,
        }
    }

    /// Renders the wire-line form, e.g. `"MOTOR:200,200,0,0"`.
    pub fn encode(&self) -> String {
        match self {
            Command::Motor { left_speed, right_speed, left_dir, right_dir } => format!(
                "MOTOR:{},{},{},{}",
                left_speed,
                right_speed,
                left_dir.as_wire(),
                right_dir.as_wire()
            ),
            Command::Servo { angle } => format!("SERVO:{angle}"),
            Command::Led(state) => format!("LED:{state}"),
            Command::Stop => "STOP".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_motor_command() {
        let cmd = Command::Motor {
            left_speed: 200,
            right_speed: 180,
            left_dir: Direction::Forward,
            right_dir: Direction::Reverse,
        };
        assert_eq!(cmd.encode(), "MOTOR:200,180,0,1");
    }

    #[test]
    fn encode_servo_and_stop_and_led() {
        assert_eq!(Command::Servo { angle: 90 }.encode(), "SERVO:90");
        assert_eq!(Command::Stop.encode(), "STOP");
        assert_eq!(Command::Led(LedState::SuccessScan).encode(), "LED:SUCCESS_SCAN");
    }

    #[test]
    fn stop_motors_is_zero_speed() {
        assert_eq!(Command::stop_motors().encode(), "MOTOR:0,0,0,0");
    }

    #[test]
    fn priority_matches_droppability_contract() {
        assert_eq!(Command::stop_motors().priority(), CommandPriority::Reliable);
        assert_eq!(Command::Servo { angle: 0 }.priority(), CommandPriority::Reliable);
        assert_eq!(Command::Stop.priority(), CommandPriority::Reliable);
        assert_eq!(Command::Led(LedState::Idle).priority(), CommandPriority::Droppable);
    }
}
