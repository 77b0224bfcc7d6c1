use serde::{Deserialize, Serialize};

use crate::channel::transport::Transport;
use crate::channel::{ControlChannel, SendOutcome};
use crate::error::Result;

/// Absolute bound on an accumulated joystick coordinate.
pub const POSITION_LIMIT: f64 = 99.99;
/// Fraction of each raw joystick deflection added to the position.
pub const DEFAULT_SENSITIVITY: f64 = 0.15;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stick {
    Robot,
    Camera,
}

/// Integrates joystick deflections into a clamped absolute position.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionAccumulator {
    position: Position,
    sensitivity: f64,
}

impl PositionAccumulator {
    pub fn new(sensitivity: f64) -> Self {
        Self {
            position: Position::default(),
            sensitivity,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Add one deflection sample and return the clamped result.
    pub fn nudge(&mut self, dx: f64, dy: f64) -> Position {
        self.position.x = clamp(self.position.x + dx * self.sensitivity);
        self.position.y = clamp(self.position.y + dy * self.sensitivity);
        self.position
    }
}

impl Default for PositionAccumulator {
    fn default() -> Self {
        Self::new(DEFAULT_SENSITIVITY)
    }
}

fn clamp(value: f64) -> f64 {
    value.clamp(-POSITION_LIMIT, POSITION_LIMIT)
}

/// The two on-screen sticks wired to a control channel.
#[derive(Debug, Clone, Default)]
pub struct Joysticks {
    robot: PositionAccumulator,
    camera: PositionAccumulator,
}

impl Joysticks {
    pub fn new(sensitivity: f64) -> Self {
        Self {
            robot: PositionAccumulator::new(sensitivity),
            camera: PositionAccumulator::new(sensitivity),
        }
    }

    pub fn position(&self, stick: Stick) -> Position {
        match stick {
            Stick::Robot => self.robot.position(),
            Stick::Camera => self.camera.position(),
        }
    }

    /// Accumulate a drag sample and send the new absolute position.
    ///
    /// The position advances even when the send is throttled or fails.
    pub fn drag<T: Transport>(
        &mut self,
        channel: &ControlChannel<T>,
        stick: Stick,
        dx: f64,
        dy: f64,
    ) -> Result<SendOutcome> {
        match stick {
            Stick::Robot => {
                let p = self.robot.nudge(dx, dy);
                channel.move_robot(p.x, p.y)
            }
            Stick::Camera => {
                let p = self.camera.nudge(dx, dy);
                channel.move_camera(p.x, p.y)
            }
        }
    }

    /// Stick let go: send a zero move. The accumulated position is kept.
    pub fn release<T: Transport>(
        &self,
        channel: &ControlChannel<T>,
        stick: Stick,
    ) -> Result<SendOutcome> {
        match stick {
            Stick::Robot => channel.stop_robot(),
            Stick::Camera => channel.stop_camera(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_deltas_saturate_at_limit() {
        let mut acc = PositionAccumulator::default();
        for _ in 0..1_000 {
            acc.nudge(100.0, 100.0);
        }
        assert_eq!(acc.position(), Position { x: 99.99, y: 99.99 });
        acc.nudge(100.0, 100.0);
        assert_eq!(acc.position().x, POSITION_LIMIT);
    }

    #[test]
    fn test_negative_deltas_saturate_at_negative_limit() {
        let mut acc = PositionAccumulator::default();
        for _ in 0..1_000 {
            acc.nudge(-100.0, -100.0);
        }
        assert_eq!(acc.position(), Position { x: -99.99, y: -99.99 });
    }

    #[test]
    fn test_sensitivity_scales_deflection() {
        let mut acc = PositionAccumulator::new(0.5);
        let p = acc.nudge(10.0, -4.0);
        assert_eq!(p, Position { x: 5.0, y: -2.0 });
    }

    #[test]
    fn test_axes_clamp_independently() {
        let mut acc = PositionAccumulator::new(1.0);
        let p = acc.nudge(500.0, 3.0);
        assert_eq!(p, Position { x: 99.99, y: 3.0 });
    }
}
