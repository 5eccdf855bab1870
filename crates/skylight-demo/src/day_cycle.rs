//! A simple sun path for driving the scheduler.

use std::f32::consts::PI;

use glam::Vec3;

/// Clock that advances a fixed number of hours per simulated frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeOfDay {
    pub hours: f32,
    pub hours_per_frame: f32,
}

impl TimeOfDay {
    pub fn new(hours: f32, hours_per_frame: f32) -> Self {
        Self {
            hours: hours.rem_euclid(24.0),
            hours_per_frame,
        }
    }

    pub fn advance(&mut self) {
        self.hours = (self.hours + self.hours_per_frame).rem_euclid(24.0);
    }

    /// Sun direction: rises along +X at 06:00, peaks at noon, sets along -X
    /// at 18:00. Slightly tilted toward +Y.
    pub fn sun_direction(&self) -> Vec3 {
        let elevation = (self.hours - 6.0) / 12.0 * PI;
        Vec3::new(elevation.cos(), 0.25, elevation.sin()).normalize()
    }
}
