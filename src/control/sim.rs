// Scripted hardware doubles for the control-loop tests.

use std::collections::VecDeque;

use super::{DrivePair, HeadingSensor};
use crate::BoxError;

/// Replays a scripted heading sequence, repeating the final value once the
/// script runs dry, and counts how often it was read.
pub(crate) struct ScriptedHeading {
    script: VecDeque<f32>,
    last: f32,
    pub reads: usize,
}

impl ScriptedHeading {
    pub fn new(script: &[f32]) -> Self {
        Self {
            script: script.iter().copied().collect(),
            last: 0.0,
            reads: 0,
        }
    }
}

impl HeadingSensor for ScriptedHeading {
    fn heading_degrees(&mut self) -> Result<f32, BoxError> {
        self.reads += 1;
        if let Some(heading) = self.script.pop_front() {
            self.last = heading;
        }
        Ok(self.last)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DriveCall {
    Steer { steering: f32, velocity: i16 },
    Tank { left: i16, right: i16 },
    BrakeHold,
}

/// Records every drive command in order.
#[derive(Default)]
pub(crate) struct RecordingDrive {
    pub calls: Vec<DriveCall>,
}

impl RecordingDrive {
    /// The steering values of the emitted steer commands, in order.
    pub fn steerings(&self) -> Vec<f32> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DriveCall::Steer { steering, .. } => Some(*steering),
                _ => None,
            })
            .collect()
    }
}

impl DrivePair for RecordingDrive {
    fn steer(&mut self, steering: f32, velocity: i16) -> Result<(), BoxError> {
        self.calls.push(DriveCall::Steer { steering, velocity });
        Ok(())
    }

    fn tank(&mut self, left: i16, right: i16) -> Result<(), BoxError> {
        self.calls.push(DriveCall::Tank { left, right });
        Ok(())
    }

    fn brake_hold(&mut self) -> Result<(), BoxError> {
        self.calls.push(DriveCall::BrakeHold);
        Ok(())
    }
}
