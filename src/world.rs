//! The simulation context: owns every piece of mutable world state and
//! advances it once per displayed frame.

use crate::{
    camera::{CameraRig, OrbitCamera},
    car::{Car, ControlInput},
    config::{Config, Settings},
    road::RoadRibbon,
    terrain::{FootprintShape, HeightField, TerrainMesh},
};

/// Position and rotation about the vertical axis of a rendered object.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: nalgebra::Vector3<f32>,
    pub yaw: f32,
}

/// Everything the renderer needs to draw one frame.
pub struct Frame<'a> {
    pub segments: Vec<Transform>,
    pub markers: Vec<Transform>,
    pub vehicle: Transform,
    pub camera_position: nalgebra::Vector3<f32>,
    pub camera_target: nalgebra::Vector3<f32>,
    pub headlight_target: nalgebra::Vector3<f32>,
    pub terrain_origin: nalgebra::Vector2<f32>,
    pub terrain_heights: &'a [f32],
    /// Normals have to be recomputed before drawing.
    pub terrain_dirty: bool,
}

/// Turns a raw frame time into a usable one.
/// Missing, negative or non-finite values become zero.
pub fn clamp_frame_time(dt: f32, max: f32) -> f32 {
    if dt.is_finite() && dt > 0.0 {
        dt.min(max)
    } else {
        0.0
    }
}

pub struct Simulation {
    config: Config,
    field: HeightField,
    terrain: TerrainMesh,
    road: RoadRibbon,
    car: Car,
    rig: CameraRig,
    orbit: OrbitCamera,
    free_look: bool,
}

impl Simulation {
    pub fn new(config: Config) -> Self {
        let settings = config.settings;
        let field = HeightField::new(config.noise, settings.terrain_roughness.clamp(0.0, 1.0));
        let mut terrain = TerrainMesh::new(&config.terrain, FootprintShape::from(&config.road));
        terrain.regenerate(&field);
        let road = RoadRibbon::new(&config.road, settings.road_curviness, &field);
        for footprint in road.footprints() {
            terrain.flatten_footprint(&footprint);
        }
        let car = Car::new(&config.car, &field);
        let rig = CameraRig::new(&config.camera, &car.state);
        log::info!(
            "World created with {} road segments over a {}x{} terrain grid",
            road.len(),
            terrain.resolution(),
            terrain.resolution(),
        );

        Self {
            config,
            field,
            terrain,
            road,
            car,
            rig,
            orbit: OrbitCamera::default(),
            free_look: settings.free_look,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn field(&self) -> &HeightField {
        &self.field
    }

    pub fn terrain(&self) -> &TerrainMesh {
        &self.terrain
    }

    pub fn road(&self) -> &RoadRibbon {
        &self.road
    }

    pub fn car(&self) -> &Car {
        &self.car
    }

    pub fn rig(&self) -> &CameraRig {
        &self.rig
    }

    pub fn orbit_mut(&mut self) -> &mut OrbitCamera {
        &mut self.orbit
    }

    #[profiling::function]
    pub fn step(&mut self, dt: f32, input: ControlInput, settings: &Settings) {
        let dt = clamp_frame_time(dt, self.config.max_frame_time);
        if dt <= 0.0 {
            return;
        }

        self.road.set_curviness(settings.road_curviness);
        self.car.step(
            dt,
            input,
            settings.speed_limit(),
            &self.road,
            &self.field,
        );
        self.maintain_road();

        if self.terrain.recenter(self.car.state.ground()) {
            self.terrain.regenerate(&self.field);
            self.flatten_road();
        }

        if settings.free_look {
            if !self.free_look {
                self.orbit.aim(self.car.state.heading);
            }
        } else {
            self.rig.step(dt, &self.car.state);
        }
        self.free_look = settings.free_look;
    }

    /// Recycles segments the car has passed. Bounded by the ribbon length,
    /// which is enough to rebuild it entirely after any clamped frame.
    fn maintain_road(&mut self) {
        let limit = self.road.len();
        let ground = self.car.state.ground();
        let mut recycled = 0;
        while recycled < limit && self.road.needs_advance(ground) {
            let footprint = self.road.advance(&self.field);
            self.terrain.flatten_footprint(&footprint);
            recycled += 1;
        }
        if recycled > 1 {
            log::debug!("Caught up {} road segments", recycled);
        }
    }

    fn flatten_road(&mut self) {
        for footprint in self.road.footprints() {
            self.terrain.flatten_footprint(&footprint);
        }
    }

    /// Glues the road back onto the terrain after the field changed.
    pub fn refresh_road(&mut self) {
        self.road.refresh(&self.field);
        self.flatten_road();
    }

    /// Applies a committed roughness value from the panel.
    pub fn commit_roughness(&mut self, roughness: f32) {
        let roughness = roughness.clamp(0.0, 1.0);
        log::info!("Regenerating terrain with roughness {}", roughness);
        self.field.roughness = roughness;
        self.terrain.regenerate(&self.field);
        self.refresh_road();
    }

    /// Puts the whole world back into its starting layout.
    pub fn reset(&mut self) {
        log::info!("Resetting the world");
        self.car.reset(&self.field);
        self.road.reset(&self.field);
        self.terrain.place(self.car.state.ground());
        self.terrain.regenerate(&self.field);
        self.flatten_road();
        self.rig.snap(&self.car.state);
    }

    pub fn camera_target(&self) -> nalgebra::Vector3<f32> {
        self.rig.look_at(&self.car.state)
    }

    pub fn camera_position(&self) -> nalgebra::Vector3<f32> {
        if self.free_look {
            self.orbit.position(self.camera_target())
        } else {
            self.rig.position
        }
    }

    pub fn frame(&mut self) -> Frame<'_> {
        let segments = self
            .road
            .segments()
            .map(|s| Transform {
                position: s.center,
                yaw: s.yaw,
            })
            .collect();
        let markers = self
            .road
            .markers()
            .map(|m| Transform {
                position: m.center,
                yaw: m.yaw,
            })
            .collect();
        let terrain_dirty = self.terrain.take_dirty();
        Frame {
            segments,
            markers,
            vehicle: Transform {
                position: self.car.state.position,
                yaw: self.car.state.heading,
            },
            camera_position: self.camera_position(),
            camera_target: self.camera_target(),
            headlight_target: self.car.headlight_target(),
            terrain_origin: self.terrain.origin(),
            terrain_heights: self.terrain.heights(),
            terrain_dirty,
        }
    }
}
