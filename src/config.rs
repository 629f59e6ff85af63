use anyhow::Context as _;
use std::{fs, path::Path};

/// Values owned by the parameter panel. Read live every frame,
/// except for `terrain_roughness` which only applies on commit.
#[derive(Clone, Copy, Debug, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct Settings {
    pub road_curviness: f32,
    pub terrain_roughness: f32,
    pub speed_limit_kph: f32,
    pub free_look: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            road_curviness: 0.5,
            terrain_roughness: 0.5,
            speed_limit_kph: 120.0,
            free_look: false,
        }
    }
}

impl Settings {
    pub fn speed_limit(&self) -> f32 {
        self.speed_limit_kph / 3.6
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct Noise {
    pub octaves: u32,
    pub base_frequency: f32,
    pub falloff: f32,
    /// Vertical scale of the terrain at full roughness.
    pub amplitude: f32,
}

impl Default for Noise {
    fn default() -> Self {
        Self {
            octaves: 4,
            base_frequency: 0.02,
            falloff: 0.5,
            amplitude: 12.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct Terrain {
    /// Side of the square grid, in meters.
    pub size: f32,
    /// Vertices along one side.
    pub resolution: u32,
    /// Fraction of the half-size the vehicle may travel from the grid
    /// center before the grid is moved under it.
    pub recenter_fraction: f32,
}

impl Default for Terrain {
    fn default() -> Self {
        Self {
            size: 400.0,
            resolution: 129,
            recenter_fraction: 0.5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct Road {
    pub segment_count: u32,
    pub segment_length: f32,
    pub width: f32,
    /// Radians of direction change per segment at full curviness.
    pub max_turn: f32,
    pub curvature_frequency: f32,
    /// Weight of the previous segment height in a new one.
    pub height_blend: f32,
    /// Footprint half-length as a fraction of the segment length.
    pub footprint_length: f32,
    /// Footprint half-width as a fraction of the road width.
    pub footprint_width: f32,
    /// How far below the road surface the terrain is pulled.
    pub footprint_sink: f32,
    /// Lateral distance of the lane marker from the centerline, to the left.
    pub marker_offset: f32,
    pub marker_lift: f32,
    /// Segments kept behind the vehicle before recycling.
    pub keep_behind: u32,
}

impl Default for Road {
    fn default() -> Self {
        Self {
            segment_count: 120,
            segment_length: 4.0,
            width: 8.0,
            max_turn: 0.06,
            curvature_frequency: 0.05,
            height_blend: 0.35,
            footprint_length: 0.75,
            footprint_width: 1.25,
            footprint_sink: 0.05,
            marker_offset: 2.0,
            marker_lift: 0.02,
            keep_behind: 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct Car {
    /// Forward acceleration, in m/s^2. Reverse uses 70% of it.
    pub max_accel: f32,
    /// Velocity fraction lost per 60 Hz frame.
    pub drag: f32,
    /// Deceleration with no throttle, in m/s^2.
    pub braking: f32,
    /// Turn rate at full steer and full speed, in rad/s.
    pub grip: f32,
    pub centering_gain: f32,
    /// Cap on the lane-centering correction, in m/s.
    pub max_centering_speed: f32,
    pub clearance: f32,
    pub height_smoothing: f32,
    pub headlight_reach: f32,
}

impl Default for Car {
    fn default() -> Self {
        Self {
            max_accel: 12.0,
            drag: 0.002,
            braking: 8.0,
            grip: 1.6,
            centering_gain: 2.0,
            max_centering_speed: 4.0,
            clearance: 0.6,
            height_smoothing: 0.15,
            headlight_reach: 20.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct Camera {
    /// Offset from the vehicle in its heading frame: (right, up, forward).
    pub offset: (f32, f32, f32),
    pub stiffness: f32,
    pub damping: f32,
    pub look_height: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            offset: (1.0, 4.0, -9.0),
            stiffness: 30.0,
            damping: 0.85,
            look_height: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub settings: Settings,
    pub noise: Noise,
    pub terrain: Terrain,
    pub road: Road,
    pub car: Car,
    pub camera: Camera,
    /// Upper bound on a simulated frame, in seconds.
    pub max_frame_time: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            noise: Noise::default(),
            terrain: Terrain::default(),
            road: Road::default(),
            car: Car::default(),
            camera: Camera::default(),
            max_frame_time: 0.05,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("Unable to open the config {}", path.display()))?;
        let config: Self = ron::de::from_bytes(&bytes)
            .with_context(|| format!("Unable to parse the config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    pub fn parse(source: &str) -> anyhow::Result<Self> {
        let config: Self = ron::de::from_str(source).context("Unable to parse the config")?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the world cannot be built from.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.terrain.size.is_finite() && self.terrain.size > 0.0,
            "Terrain size must be positive, got {}",
            self.terrain.size
        );
        anyhow::ensure!(
            self.terrain.resolution >= 2,
            "Terrain resolution must be at least 2, got {}",
            self.terrain.resolution
        );
        anyhow::ensure!(
            self.road.segment_length.is_finite() && self.road.segment_length > 0.0,
            "Road segment length must be positive, got {}",
            self.road.segment_length
        );
        anyhow::ensure!(
            self.road.width.is_finite() && self.road.width > 0.0,
            "Road width must be positive, got {}",
            self.road.width
        );
        Ok(())
    }
}
