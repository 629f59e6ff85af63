//! Endless road built from a fixed ring of segments.
//!
//! Segments are laid one `segment_length` apart along a cursor that bends
//! with 1D noise. When the vehicle leaves the oldest segment behind, that
//! segment is moved in front of the newest one. The ring never grows.

use crate::{
    config, noise,
    terrain::{heading_rotation, Footprint, HeightField},
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoadSegment {
    pub center: nalgebra::Vector3<f32>,
    pub yaw: f32,
    /// Position of the segment along the road since the last reset.
    pub index: u32,
}

impl RoadSegment {
    pub fn ground(&self) -> nalgebra::Vector2<f32> {
        nalgebra::Vector2::new(self.center.x, self.center.z)
    }

    pub fn direction(&self) -> nalgebra::Vector2<f32> {
        heading_rotation(self.yaw) * nalgebra::Vector2::y()
    }

    /// Unit vector across the road, to the left of the direction of travel.
    pub fn lateral(&self) -> nalgebra::Vector2<f32> {
        heading_rotation(self.yaw) * nalgebra::Vector2::x()
    }

    /// How far `pos` is past this segment along the road.
    pub fn forward_offset(&self, pos: nalgebra::Vector2<f32>) -> f32 {
        (pos - self.ground()).dot(&self.direction())
    }

    pub fn lateral_offset(&self, pos: nalgebra::Vector2<f32>) -> f32 {
        (pos - self.ground()).dot(&self.lateral())
    }

    pub fn footprint(&self) -> Footprint {
        Footprint {
            center: self.ground(),
            yaw: self.yaw,
            height: self.center.y,
            index: self.index,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaneMarker {
    pub center: nalgebra::Vector3<f32>,
    pub yaw: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Cursor {
    position: nalgebra::Vector2<f32>,
    direction: nalgebra::Vector2<f32>,
    counter: u32,
}

impl Cursor {
    fn start() -> Self {
        Self {
            position: nalgebra::Vector2::zeros(),
            direction: nalgebra::Vector2::y(),
            counter: 0,
        }
    }
}

pub struct RoadRibbon {
    config: config::Road,
    octaves: u32,
    falloff: f32,
    curviness: f32,
    segments: Vec<RoadSegment>,
    markers: Vec<LaneMarker>,
    // slot of the oldest segment
    head: usize,
    cursor: Cursor,
}

impl RoadRibbon {
    pub fn new(config: &config::Road, curviness: f32, field: &HeightField) -> Self {
        let count = config.segment_count as usize;
        let mut ribbon = Self {
            config: *config,
            octaves: field.noise.octaves,
            falloff: field.noise.falloff,
            curviness: curviness.clamp(0.0, 1.0),
            segments: Vec::with_capacity(count),
            markers: Vec::with_capacity(count),
            head: 0,
            cursor: Cursor::start(),
        };
        ribbon.reset(field);
        ribbon
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn set_curviness(&mut self, curviness: f32) {
        self.curviness = curviness.clamp(0.0, 1.0);
    }

    pub fn segment_length(&self) -> f32 {
        self.config.segment_length
    }

    pub fn width(&self) -> f32 {
        self.config.width
    }

    /// Number of segments laid since the last reset.
    pub fn counter(&self) -> u32 {
        self.cursor.counter
    }

    fn slot(&self, order: usize) -> usize {
        (self.head + order) % self.segments.len()
    }

    /// Segments from the oldest to the newest.
    pub fn segments(&self) -> impl Iterator<Item = &RoadSegment> + '_ {
        (0..self.segments.len()).map(move |order| &self.segments[self.slot(order)])
    }

    /// Lane markers in the same order as [`Self::segments`].
    pub fn markers(&self) -> impl Iterator<Item = &LaneMarker> + '_ {
        (0..self.markers.len()).map(move |order| &self.markers[self.slot(order)])
    }

    pub fn footprints(&self) -> impl Iterator<Item = Footprint> + '_ {
        self.segments().map(RoadSegment::footprint)
    }

    pub fn oldest(&self) -> Option<&RoadSegment> {
        self.segments.get(self.head)
    }

    pub fn newest(&self) -> Option<&RoadSegment> {
        if self.segments.is_empty() {
            None
        } else {
            Some(&self.segments[self.slot(self.segments.len() - 1)])
        }
    }

    fn marker_for(&self, segment: &RoadSegment) -> LaneMarker {
        let offset = segment.lateral() * self.config.marker_offset;
        LaneMarker {
            center: nalgebra::Vector3::new(
                segment.center.x + offset.x,
                segment.center.y + self.config.marker_lift,
                segment.center.z + offset.y,
            ),
            yaw: segment.yaw,
        }
    }

    fn blend_height(&self, sampled: f32, previous: Option<f32>) -> f32 {
        match previous {
            Some(prev) => sampled + (prev - sampled) * self.config.height_blend,
            None => sampled,
        }
    }

    /// Lays the canonical straight road starting at the origin.
    pub fn reset(&mut self, field: &HeightField) {
        let count = self.config.segment_count as usize;
        self.segments.clear();
        self.markers.clear();
        self.head = 0;
        self.cursor = Cursor::start();

        let mut previous = None;
        for k in 0..count {
            let position = self.cursor.direction * (k as f32 * self.config.segment_length);
            let height = self.blend_height(field.sample_at(position), previous);
            let segment = RoadSegment {
                center: nalgebra::Vector3::new(position.x, height, position.y),
                yaw: 0.0,
                index: k as u32,
            };
            let marker = self.marker_for(&segment);
            self.markers.push(marker);
            self.segments.push(segment);
            previous = Some(height);
            self.cursor.position = position;
            self.cursor.counter = k as u32;
        }
    }

    /// Re-derives every segment height from the field, oldest first.
    pub fn refresh(&mut self, field: &HeightField) {
        let mut previous = None;
        for order in 0..self.segments.len() {
            let slot = self.slot(order);
            let height = self.blend_height(field.sample_at(self.segments[slot].ground()), previous);
            self.segments[slot].center.y = height;
            self.markers[slot] = self.marker_for(&self.segments[slot]);
            previous = Some(height);
        }
    }

    /// Moves the oldest segment past the newest one.
    /// Returns the footprint the terrain has to be flattened with.
    pub fn advance(&mut self, field: &HeightField) -> Footprint {
        let counter = self.cursor.counter + 1;
        let t = counter as f32 * self.config.segment_length * self.config.curvature_frequency;
        let turn =
            noise::fbm1(t, self.octaves, self.falloff) * self.curviness * self.config.max_turn;
        let direction = (heading_rotation(turn) * self.cursor.direction).normalize();
        let position = self.cursor.position + direction * self.config.segment_length;
        let previous = self.newest().map(|segment| segment.center.y);
        let height = self.blend_height(field.sample_at(position), previous);
        let yaw = direction.x.atan2(direction.y);

        self.cursor = Cursor {
            position,
            direction,
            counter,
        };

        if !self.segments.is_empty() {
            let slot = self.head;
            self.head = (self.head + 1) % self.segments.len();
            self.segments[slot] = RoadSegment {
                center: nalgebra::Vector3::new(position.x, height, position.y),
                yaw,
                index: counter,
            };
            self.markers[slot] = self.marker_for(&self.segments[slot]);
        }

        Footprint {
            center: position,
            yaw,
            height,
            index: counter,
        }
    }

    /// True when the vehicle is far enough past the oldest segment
    /// for it to be recycled.
    pub fn needs_advance(&self, pos: nalgebra::Vector2<f32>) -> bool {
        let threshold = self.config.keep_behind.max(1) as f32 * self.config.segment_length;
        self.oldest()
            .is_some_and(|segment| segment.forward_offset(pos) > threshold)
    }

    /// Segment the vehicle is currently alongside.
    ///
    /// Walks the ribbon from the oldest segment to the first one not behind
    /// `pos`, and picks whichever of it and its predecessor has the smaller
    /// forward distance. Segments further along a winding road may line up
    /// with `pos` sideways, so they are never considered.
    pub fn nearest_segment(&self, pos: nalgebra::Vector2<f32>) -> Option<&RoadSegment> {
        let mut best: Option<(&RoadSegment, f32)> = None;
        for segment in self.segments() {
            let offset = segment.forward_offset(pos);
            if best.map_or(true, |(_, distance)| offset.abs() < distance) {
                best = Some((segment, offset.abs()));
            }
            if offset <= 0.0 {
                break;
            }
        }
        best.map(|(segment, _)| segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat() -> HeightField {
        HeightField::new(config::Noise::default(), 0.0)
    }

    fn small_road(count: u32) -> config::Road {
        config::Road {
            segment_count: count,
            ..Default::default()
        }
    }

    #[test]
    fn canonical_layout() {
        let config = small_road(8);
        let road = RoadRibbon::new(&config, 0.7, &flat());
        assert_eq!(road.len(), 8);
        for (k, segment) in road.segments().enumerate() {
            assert_eq!(segment.index, k as u32);
            assert_eq!(segment.yaw, 0.0);
            assert_eq!(segment.center.x, 0.0);
            assert_eq!(segment.center.z, k as f32 * config.segment_length);
        }
        assert_eq!(road.counter(), 7);
    }

    #[test]
    fn segment_frame_matches_yaw() {
        let segment = RoadSegment {
            center: nalgebra::Vector3::new(1.0, 0.0, 2.0),
            yaw: 0.4,
            index: 3,
        };
        assert!((segment.direction() - nalgebra::Vector2::new(0.4f32.sin(), 0.4f32.cos())).norm() < 1e-6);
        assert!((segment.lateral() - nalgebra::Vector2::new(0.4f32.cos(), -0.4f32.sin())).norm() < 1e-6);
        assert_eq!(segment.footprint().index, 3);
    }

    #[test]
    fn advance_recycles_oldest() {
        let mut road = RoadRibbon::new(&small_road(4), 0.0, &flat());
        let footprint = road.advance(&flat());
        let indices: Vec<_> = road.segments().map(|s| s.index).collect();
        assert_eq!(indices, [1, 2, 3, 4]);
        let newest = road.newest().unwrap();
        assert_eq!(newest.footprint(), footprint);
        assert!((newest.center.z - 16.0).abs() < 1e-5);
        assert_eq!(road.oldest().unwrap().index, 1);
    }

    #[test]
    fn markers_follow_segments() {
        let config = config::Road {
            segment_count: 3,
            marker_offset: 1.0,
            ..Default::default()
        };
        let mut road = RoadRibbon::new(&config, 1.0, &flat());
        road.advance(&flat());
        for (segment, marker) in road.segments().zip(road.markers()) {
            assert_eq!(marker.yaw, segment.yaw);
            assert!((marker.center.y - segment.center.y - config.marker_lift).abs() < 1e-6);
            let d = nalgebra::Vector2::new(marker.center.x, marker.center.z) - segment.ground();
            assert!((d.norm() - 1.0).abs() < 1e-5);
            assert!(d.dot(&segment.direction()).abs() < 1e-5);
        }
    }

    #[test]
    fn empty_ribbon() {
        let mut road = RoadRibbon::new(&small_road(0), 1.0, &flat());
        assert!(road.is_empty());
        assert!(road.nearest_segment(nalgebra::Vector2::zeros()).is_none());
        assert!(!road.needs_advance(nalgebra::Vector2::new(0.0, 100.0)));
        road.advance(&flat());
        assert!(road.is_empty());
        assert!(road.newest().is_none());
    }

    #[test]
    fn nearest_on_straight_road() {
        let road = RoadRibbon::new(&small_road(10), 0.0, &flat());
        let nearest = road.nearest_segment(nalgebra::Vector2::new(2.0, 9.0)).unwrap();
        assert_eq!(nearest.index, 2);
        let behind = road.nearest_segment(nalgebra::Vector2::new(0.0, -7.0)).unwrap();
        assert_eq!(behind.index, 0);
        let beyond = road.nearest_segment(nalgebra::Vector2::new(0.0, 500.0)).unwrap();
        assert_eq!(beyond.index, 9);
    }

    #[test]
    fn advance_threshold() {
        let road = RoadRibbon::new(&small_road(10), 0.0, &flat());
        assert!(!road.needs_advance(nalgebra::Vector2::new(0.0, 4.0)));
        assert!(road.needs_advance(nalgebra::Vector2::new(0.0, 4.1)));
    }

    #[test]
    fn refresh_blends_heights() {
        let field = HeightField::new(config::Noise::default(), 1.0);
        let mut road = RoadRibbon::new(&small_road(6), 0.5, &flat());
        road.refresh(&field);
        let mut previous = None;
        for segment in road.segments() {
            let sampled = field.sample_at(segment.ground());
            let expected = match previous {
                Some(prev) => sampled + (prev - sampled) * 0.35,
                None => sampled,
            };
            assert!((segment.center.y - expected).abs() < 1e-5);
            previous = Some(segment.center.y);
        }
    }
}
