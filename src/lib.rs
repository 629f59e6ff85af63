pub mod camera;
pub mod car;
pub mod config;
pub mod control;
pub mod noise;
pub mod road;
pub mod terrain;
pub mod world;

pub use camera::{CameraRig, OrbitCamera};
pub use car::{Car, ControlInput, VehicleState};
pub use config::{Config, Settings};
pub use control::KeyState;
pub use road::{LaneMarker, RoadRibbon, RoadSegment};
pub use terrain::{Footprint, FootprintShape, HeightField, TerrainMesh};
pub use world::{Frame, Simulation, Transform};
