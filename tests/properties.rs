//! Property-based tests for the world generator using proptest
//!
//! These tests verify invariants across random parameters:
//! - The height field is a pure function
//! - The ribbon keeps its size and spacing under any curvature
//! - The footprint kernel is bounded, monotone and seamless

use endless_road::{config, FootprintShape, HeightField, RoadRibbon};
use proptest::prelude::*;

const TOLERANCE: f32 = 1e-3;

fn shape() -> FootprintShape {
    FootprintShape::from(&config::Road::default())
}

proptest! {
    #[test]
    fn height_field_is_pure(
        x in -1.0e4f32..1.0e4,
        z in -1.0e4f32..1.0e4,
        roughness in 0.0f32..=1.0,
    ) {
        let a = HeightField::new(config::Noise::default(), roughness);
        let b = HeightField::new(config::Noise::default(), roughness);
        let first = a.sample(x, z);
        prop_assert!(first.is_finite());
        prop_assert_eq!(first.to_bits(), a.sample(x, z).to_bits());
        prop_assert_eq!(first.to_bits(), b.sample(x, z).to_bits());
        prop_assert!(first.abs() <= config::Noise::default().amplitude * roughness + TOLERANCE);
    }

    #[test]
    fn ribbon_keeps_cardinality(
        count in 0u32..40,
        curviness in 0.0f32..=1.0,
        advances in 0usize..300,
    ) {
        let field = HeightField::new(config::Noise::default(), 0.7);
        let road_config = config::Road {
            segment_count: count,
            ..Default::default()
        };
        let mut road = RoadRibbon::new(&road_config, curviness, &field);
        for _ in 0..advances {
            road.advance(&field);
            prop_assert_eq!(road.len(), count as usize);
        }
        prop_assert_eq!(road.len(), count as usize);
        prop_assert_eq!(road.markers().count(), count as usize);
    }

    #[test]
    fn ribbon_keeps_constant_step(
        curviness in 0.0f32..=1.0,
        max_turn in 0.0f32..0.5,
        advances in 1usize..400,
    ) {
        let field = HeightField::new(config::Noise::default(), 1.0);
        let road_config = config::Road {
            segment_count: 24,
            max_turn,
            ..Default::default()
        };
        let mut road = RoadRibbon::new(&road_config, curviness, &field);
        for _ in 0..advances {
            road.advance(&field);
        }
        let segments: Vec<_> = road.segments().copied().collect();
        for pair in segments.windows(2) {
            prop_assert_eq!(pair[1].index, pair[0].index + 1);
            let step = (pair[1].ground() - pair[0].ground()).norm();
            prop_assert!((step - road_config.segment_length).abs() < TOLERANCE, "step {}", step);
            // each segment lies straight ahead of the previous cursor direction
            let along = (pair[1].ground() - pair[0].ground()).dot(&pair[1].direction());
            prop_assert!((along - road_config.segment_length).abs() < TOLERANCE);
        }
    }

    #[test]
    fn footprint_weight_is_bounded(forward in -20.0f32..20.0, lateral in -20.0f32..20.0) {
        let shape = shape();
        let w = shape.weight(forward, lateral);
        prop_assert!((0.0..=1.0).contains(&w));
        if forward.abs() >= shape.half_length || lateral.abs() >= shape.half_width {
            prop_assert_eq!(w, 0.0);
        }
    }

    #[test]
    fn footprint_weight_decays_outward(
        fraction in 0.0f32..1.0,
        lateral in -20.0f32..20.0,
    ) {
        let shape = shape();
        let near = fraction * shape.half_length;
        let far = near + 0.05 * shape.half_length;
        prop_assert!(shape.weight(far, lateral) <= shape.weight(near, lateral));
        prop_assert!(shape.weight(-far, lateral) <= shape.weight(-near, lateral));
    }
}

#[test]
fn footprint_weight_center_is_one() {
    let shape = shape();
    assert_eq!(shape.weight(0.0, 0.0), 1.0);
    assert_eq!(shape.weight(shape.half_length, 0.0), 0.0);
    assert_eq!(shape.weight(0.0, shape.half_width), 0.0);
    assert_eq!(shape.weight(-shape.half_length, -shape.half_width), 0.0);
}

#[test]
fn footprint_weight_has_no_seams() {
    let shape = shape();
    let samples = 2000;
    let h = 2.0 * shape.half_length / samples as f32;
    // the steepest slope of a cubic smoothstep is 1.5 over the half-extent
    let bound = 1.5 / shape.half_length * 1.05;
    let mut previous = shape.weight(-1.2 * shape.half_length, 0.0);
    for k in 1..=2 * samples {
        let forward = -1.2 * shape.half_length + k as f32 * 1.2 * h;
        let w = shape.weight(forward, 0.0);
        let slope = (w - previous).abs() / (1.2 * h);
        assert!(slope <= bound, "slope {} at {}", slope, forward);
        previous = w;
    }

    // flat approach into the edge
    let edge = shape.half_length;
    for inside in [shape.weight(edge - 1e-2, 0.0), shape.weight(1e-2 - edge, 0.0)] {
        assert!(inside < 1e-3, "{}", inside);
    }
}
