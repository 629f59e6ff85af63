use crate::{
    config,
    road::RoadRibbon,
    terrain::{heading_rotation, HeightField},
};

/// Normalized driver input for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ControlInput {
    /// Forward is positive.
    pub throttle: f32,
    /// Left is positive.
    pub steer: f32,
}

impl ControlInput {
    fn clamped(self) -> Self {
        Self {
            throttle: self.throttle.clamp(-1.0, 1.0),
            steer: self.steer.clamp(-1.0, 1.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VehicleState {
    pub position: nalgebra::Vector3<f32>,
    /// Zero faces +Z, increasing turns toward +X.
    pub heading: f32,
    /// Signed speed along the heading, in m/s.
    pub velocity: f32,
}

impl VehicleState {
    pub fn ground(&self) -> nalgebra::Vector2<f32> {
        nalgebra::Vector2::new(self.position.x, self.position.z)
    }

    pub fn forward(&self) -> nalgebra::Vector2<f32> {
        heading_rotation(self.heading) * nalgebra::Vector2::y()
    }

    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.heading.is_finite()
            && self.velocity.is_finite()
    }
}

/// Speed the car settles at for a given throttle.
/// Any pressure asks for at least 30% of the limit.
pub fn target_speed(throttle: f32, speed_limit: f32) -> f32 {
    if throttle == 0.0 {
        0.0
    } else {
        speed_limit * throttle.abs().clamp(0.3, 1.0)
    }
}

/// Arcade vehicle model: longitudinal speed, heading, and a soft rail
/// keeping it on the road.
pub struct Car {
    pub state: VehicleState,
    config: config::Car,
}

impl Car {
    pub fn new(config: &config::Car, field: &HeightField) -> Self {
        let mut car = Self {
            state: VehicleState {
                position: nalgebra::Vector3::zeros(),
                heading: 0.0,
                velocity: 0.0,
            },
            config: *config,
        };
        car.reset(field);
        car
    }

    /// Puts the car at rest at the origin, facing down the road.
    pub fn reset(&mut self, field: &HeightField) {
        self.state = VehicleState {
            position: nalgebra::Vector3::new(0.0, field.sample(0.0, 0.0) + self.config.clearance, 0.0),
            heading: 0.0,
            velocity: 0.0,
        };
    }

    /// Point the headlights aim at.
    pub fn headlight_target(&self) -> nalgebra::Vector3<f32> {
        let ahead = self.state.forward() * self.config.headlight_reach;
        self.state.position + nalgebra::Vector3::new(ahead.x, -self.config.clearance, ahead.y)
    }

    /// `speed_limit` is in m/s.
    #[profiling::function]
    pub fn step(
        &mut self,
        dt: f32,
        input: ControlInput,
        speed_limit: f32,
        road: &RoadRibbon,
        field: &HeightField,
    ) {
        let input = input.clamped();
        let cfg = &self.config;
        let state = &mut self.state;

        let target = target_speed(input.throttle, speed_limit);
        let accel = if input.throttle > 0.0 {
            cfg.max_accel
        } else if input.throttle < 0.0 {
            -0.7 * cfg.max_accel
        } else {
            0.0
        };
        state.velocity += accel * dt;
        // drag is tuned per 60 Hz frame
        state.velocity -= state.velocity * cfg.drag * dt * 60.0;
        if state.velocity.abs() > target {
            let magnitude = 0.5 * (state.velocity.abs() + target);
            state.velocity = magnitude.copysign(state.velocity);
        }
        if input.throttle == 0.0 && state.velocity != 0.0 {
            let magnitude = (state.velocity.abs() - cfg.braking * dt).max(0.0);
            state.velocity = magnitude.copysign(state.velocity);
        }

        let speed_fraction = if speed_limit > f32::EPSILON {
            (state.velocity.abs() / speed_limit).min(1.0)
        } else {
            0.0
        };
        state.heading += cfg.grip * input.steer * (0.5 + 0.5 * speed_fraction) * dt;

        let step = state.forward() * state.velocity * dt;
        state.position.x += step.x;
        state.position.z += step.y;

        if let Some(segment) = road.nearest_segment(state.ground()) {
            let offset = segment.lateral_offset(state.ground());
            let max = cfg.max_centering_speed;
            let correction = (-offset * cfg.centering_gain).clamp(-max, max) * dt;
            // the rail never lets the car further than a road width off center
            let limit = road.width();
            let settled = (offset + correction).clamp(-limit, limit);
            let lateral = segment.lateral() * (settled - offset);
            state.position.x += lateral.x;
            state.position.z += lateral.y;
        }

        let ground = field.sample(state.position.x, state.position.z) + cfg.clearance;
        state.position.y += (ground - state.position.y) * cfg.height_smoothing;

        debug_assert!(state.is_finite(), "Vehicle state diverged: {:?}", state);
    }
}
