use crate::{car::VehicleState, config};
use std::ops::Range;

const DISTANCE_LIMITS: Range<f32> = 2.0..200.0;
const PITCH_LIMIT: f32 = 1.5;

/// Spring-follow camera that chases the vehicle.
pub struct CameraRig {
    pub position: nalgebra::Vector3<f32>,
    pub velocity: nalgebra::Vector3<f32>,
    config: config::Camera,
}

impl CameraRig {
    pub fn new(config: &config::Camera, vehicle: &VehicleState) -> Self {
        let mut rig = Self {
            position: nalgebra::Vector3::zeros(),
            velocity: nalgebra::Vector3::zeros(),
            config: *config,
        };
        rig.snap(vehicle);
        rig
    }

    /// Where the rig wants to be: the configured offset turned by the
    /// vehicle heading only, so the camera never banks.
    pub fn desired_position(&self, vehicle: &VehicleState) -> nalgebra::Vector3<f32> {
        let (right, up, forward) = self.config.offset;
        let rotation =
            nalgebra::UnitQuaternion::from_axis_angle(&nalgebra::Vector3::y_axis(), vehicle.heading);
        // +X is on the left when facing +Z
        vehicle.position + rotation * nalgebra::Vector3::new(-right, up, forward)
    }

    pub fn look_at(&self, vehicle: &VehicleState) -> nalgebra::Vector3<f32> {
        vehicle.position + nalgebra::Vector3::new(0.0, self.config.look_height, 0.0)
    }

    pub fn snap(&mut self, vehicle: &VehicleState) {
        self.position = self.desired_position(vehicle);
        self.velocity = nalgebra::Vector3::zeros();
    }

    pub fn step(&mut self, dt: f32, vehicle: &VehicleState) {
        let desired = self.desired_position(vehicle);
        self.velocity += (desired - self.position) * self.config.stiffness * dt;
        self.velocity *= self.config.damping.powf(dt * 60.0);
        self.position += self.velocity * dt;
    }
}

/// Manually orbited camera used in free-look mode.
pub struct OrbitCamera {
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub rotate_speed: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.4,
            distance: 12.0,
            rotate_speed: 0.005,
        }
    }
}

impl OrbitCamera {
    /// Puts the camera behind a vehicle with the given heading.
    pub fn aim(&mut self, heading: f32) {
        self.yaw = heading;
    }

    pub fn rotation(&self) -> nalgebra::UnitQuaternion<f32> {
        let yaw = nalgebra::UnitQuaternion::from_axis_angle(&nalgebra::Vector3::y_axis(), self.yaw);
        let pitch =
            nalgebra::UnitQuaternion::from_axis_angle(&nalgebra::Vector3::x_axis(), self.pitch);
        yaw * pitch
    }

    pub fn position(&self, target: nalgebra::Vector3<f32>) -> nalgebra::Vector3<f32> {
        target + self.rotation() * nalgebra::Vector3::new(0.0, 0.0, -self.distance)
    }

    pub fn on_drag(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.rotate_speed;
        self.pitch = (self.pitch - dy * self.rotate_speed).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    pub fn on_wheel(&mut self, delta: winit::event::MouseScrollDelta) {
        let shift = match delta {
            winit::event::MouseScrollDelta::LineDelta(_, lines) => lines,
            winit::event::MouseScrollDelta::PixelDelta(position) => 0.01 * position.y as f32,
        };
        self.distance = (self.distance * (-0.1 * shift).exp())
            .clamp(DISTANCE_LIMITS.start, DISTANCE_LIMITS.end);
    }
}
