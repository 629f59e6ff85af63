use crate::{config, noise};

/// Deterministic elevation of the ground plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeightField {
    pub noise: config::Noise,
    pub roughness: f32,
}

impl HeightField {
    pub fn new(noise: config::Noise, roughness: f32) -> Self {
        Self { noise, roughness }
    }

    pub fn sample(&self, x: f32, z: f32) -> f32 {
        let n = noise::fbm2(x, z, &self.noise) - 0.5;
        2.0 * n * self.noise.amplitude * self.roughness
    }

    pub fn sample_at(&self, pos: nalgebra::Vector2<f32>) -> f32 {
        self.sample(pos.x, pos.y)
    }
}

/// Ground-plane rotation of a heading: zero faces +Z, increasing turns
/// toward +X.
pub fn heading_rotation(heading: f32) -> nalgebra::Rotation2<f32> {
    nalgebra::Rotation2::new(-heading)
}

/// Cubic smoothstep of `t` clamped to `[0, 1]`.
#[inline]
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Rectangular area of influence of a road segment on the terrain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FootprintShape {
    pub half_length: f32,
    pub half_width: f32,
    /// Distance the terrain is pulled below the road surface.
    pub sink: f32,
}

impl From<&config::Road> for FootprintShape {
    fn from(road: &config::Road) -> Self {
        Self {
            half_length: road.footprint_length * road.segment_length,
            half_width: road.footprint_width * road.width,
            sink: road.footprint_sink,
        }
    }
}

impl FootprintShape {
    /// Blend weight of a point given in the footprint frame.
    /// 1 at the center, 0 at and beyond the edges, C1 everywhere.
    pub fn weight(&self, forward: f32, lateral: f32) -> f32 {
        if self.half_length <= 0.0 || self.half_width <= 0.0 {
            return 0.0;
        }
        smoothstep(1.0 - forward.abs() / self.half_length)
            * smoothstep(1.0 - lateral.abs() / self.half_width)
    }

    fn reach(&self) -> f32 {
        self.half_length.hypot(self.half_width)
    }
}

/// Where and how high a road segment sits on the ground.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Footprint {
    pub center: nalgebra::Vector2<f32>,
    pub yaw: f32,
    pub height: f32,
    /// Index of the road segment that left it.
    pub index: u32,
}

impl Footprint {
    pub fn forward(&self) -> nalgebra::Vector2<f32> {
        heading_rotation(self.yaw) * nalgebra::Vector2::y()
    }

    pub fn lateral(&self) -> nalgebra::Vector2<f32> {
        heading_rotation(self.yaw) * nalgebra::Vector2::x()
    }
}

/// Pull of one footprint on one vertex.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Contribution {
    index: u32,
    weight: f32,
    target: f32,
}

/// Blends `base` toward the weighted mean of the targets, as strongly as the
/// strongest footprint. Continuous across overlapping footprints.
fn blend(base: f32, contributions: &[Contribution]) -> f32 {
    let mut total = 0.0;
    let mut weighted = 0.0;
    let mut strongest = 0.0f32;
    for c in contributions {
        total += c.weight;
        weighted += c.weight * c.target;
        strongest = strongest.max(c.weight);
    }
    if total > 0.0 {
        base + (weighted / total - base) * strongest
    } else {
        base
    }
}

const MIN_SIZE: f32 = 1.0;

/// Elevation buffer over a fixed square grid that follows the vehicle.
///
/// Vertex `(i, j)` lives at `origin + (i, j) * spacing - size / 2` on the
/// ground plane and is stored at `j * resolution + i`.
pub struct TerrainMesh {
    origin: nalgebra::Vector2<f32>,
    size: f32,
    resolution: usize,
    spacing: f32,
    recenter_distance: f32,
    shape: FootprintShape,
    heights: Vec<f32>,
    // elevation straight from the height field, before any flattening
    pristine: Vec<f32>,
    // footprints covering each vertex, one per road segment
    contributions: Vec<Vec<Contribution>>,
    dirty: bool,
}

impl TerrainMesh {
    pub fn new(config: &config::Terrain, shape: FootprintShape) -> Self {
        let resolution = config.resolution.max(2) as usize;
        let count = resolution * resolution;
        let size = if config.size.is_finite() {
            config.size.max(MIN_SIZE)
        } else {
            MIN_SIZE
        };
        Self {
            origin: nalgebra::Vector2::zeros(),
            size,
            resolution,
            spacing: size / (resolution - 1) as f32,
            recenter_distance: 0.5 * size * config.recenter_fraction,
            shape,
            heights: vec![0.0; count],
            pristine: vec![0.0; count],
            contributions: vec![Vec::new(); count],
            dirty: true,
        }
    }

    pub fn origin(&self) -> nalgebra::Vector2<f32> {
        self.origin
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Returns whether normals need recomputing, and clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn vertex_xz(&self, i: usize, j: usize) -> nalgebra::Vector2<f32> {
        let half = 0.5 * self.size;
        nalgebra::Vector2::new(
            self.origin.x - half + i as f32 * self.spacing,
            self.origin.y - half + j as f32 * self.spacing,
        )
    }

    /// Index of the grid vertex closest to a ground point, if it is on the grid.
    pub fn vertex_index(&self, pos: nalgebra::Vector2<f32>) -> Option<usize> {
        let i = self.cell_coordinate(pos.x - self.origin.x).round();
        let j = self.cell_coordinate(pos.y - self.origin.y).round();
        let max = (self.resolution - 1) as f32;
        if (0.0..=max).contains(&i) && (0.0..=max).contains(&j) {
            Some(j as usize * self.resolution + i as usize)
        } else {
            None
        }
    }

    fn cell_coordinate(&self, offset: f32) -> f32 {
        (offset + 0.5 * self.size) / self.spacing
    }

    fn index_span(&self, offset: f32, reach: f32) -> Option<(usize, usize)> {
        let max = (self.resolution - 1) as f32;
        let lo = self.cell_coordinate(offset - reach).floor().max(0.0);
        let hi = self.cell_coordinate(offset + reach).ceil().min(max);
        if lo > hi {
            None
        } else {
            Some((lo as usize, hi as usize))
        }
    }

    /// Rewrites every vertex from the height field, dropping all flattening.
    #[profiling::function]
    pub fn regenerate(&mut self, field: &HeightField) {
        for j in 0..self.resolution {
            for i in 0..self.resolution {
                let xz = self.vertex_xz(i, j);
                let index = j * self.resolution + i;
                let h = field.sample_at(xz);
                self.pristine[index] = h;
                self.heights[index] = h;
            }
        }
        for contributions in self.contributions.iter_mut() {
            contributions.clear();
        }
        self.dirty = true;
    }

    /// Pulls the terrain under a road segment toward its surface.
    ///
    /// Every vertex remembers one pull per road segment and is rebuilt from
    /// its pristine elevation, so repeating a call changes nothing and
    /// overlapping segments meet without a seam.
    #[profiling::function]
    pub fn flatten_footprint(&mut self, footprint: &Footprint) {
        let reach = self.shape.reach();
        let offset = footprint.center - self.origin;
        let (span_i, span_j) = match (
            self.index_span(offset.x, reach),
            self.index_span(offset.y, reach),
        ) {
            (Some(si), Some(sj)) => (si, sj),
            _ => return,
        };

        let forward = footprint.forward();
        let lateral = footprint.lateral();
        let target = footprint.height - self.shape.sink;

        for j in span_j.0..=span_j.1 {
            for i in span_i.0..=span_i.1 {
                let d = self.vertex_xz(i, j) - footprint.center;
                let w = self.shape.weight(d.dot(&forward), d.dot(&lateral));
                if w <= 0.0 {
                    continue;
                }
                let index = j * self.resolution + i;
                let contribution = Contribution {
                    index: footprint.index,
                    weight: w,
                    target,
                };
                let slot = &mut self.contributions[index];
                match slot.iter_mut().find(|c| c.index == footprint.index) {
                    Some(existing) => *existing = contribution,
                    None => slot.push(contribution),
                }
                self.heights[index] = blend(self.pristine[index], slot);
            }
        }
        self.dirty = true;
    }

    /// Moves the grid so that it is centered on `pos`, snapped to whole cells.
    pub fn place(&mut self, pos: nalgebra::Vector2<f32>) {
        self.origin = (pos / self.spacing).map(f32::round) * self.spacing;
    }

    /// Moves the grid under `pos` once it strays too far from the center.
    /// Returns true if the mesh needs regenerating.
    pub fn recenter(&mut self, pos: nalgebra::Vector2<f32>) -> bool {
        let d = pos - self.origin;
        if d.x.abs().max(d.y.abs()) <= self.recenter_distance {
            return false;
        }
        self.place(pos);
        log::info!("Terrain recentered at {:?}", self.origin);
        true
    }
}
