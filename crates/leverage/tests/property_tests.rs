#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::suboptimal_flops)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::float_cmp)]

use std::time::Duration;

use leverage::{
    CurveConfig, CurvePreset, LeverageBounds, PhysicsIntegrator, Platform, SimulationState,
    apply_drag, evaluate_transform, leverage_at_stroke, solve_sag, tick_physics,
};
use proptest::prelude::*;

fn preset() -> impl Strategy<Value = CurvePreset> {
    prop::sample::select(CurvePreset::ALL.to_vec())
}

/// Curves with 2..12 points inside the default ±20% band.
fn points() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.8f64..1.2, 2..12)
}

// =============================================================================
// Transform structure
// =============================================================================

proptest! {
    #[test]
    fn transform_has_resolution_minus_one_chained_segments(
        points in points(),
        travel in 80.0f64..220.0,
        stroke in 35.0f64..75.0,
    ) {
        let config = CurveConfig::default()
            .with_points(points)
            .with_travel(travel)
            .with_stroke(stroke);
        let segments = evaluate_transform(&config).unwrap();

        prop_assert_eq!(segments.len(), config.resolution() - 1);
        prop_assert_eq!(segments[0].travel_q, 0.0);
        prop_assert_eq!(segments[0].stroke_q, 0.0);
        for pair in segments.windows(2) {
            prop_assert_eq!(pair[1].travel_q, pair[0].travel_p);
            prop_assert_eq!(pair[1].stroke_q, pair[0].stroke_p);
        }
        for segment in &segments {
            prop_assert!(segment.stroke_p > segment.stroke_q);
        }
    }

    #[test]
    fn lookup_round_trips_at_segment_starts(
        points in points(),
        travel in 80.0f64..220.0,
        stroke in 35.0f64..75.0,
    ) {
        let config = CurveConfig::default()
            .with_points(points)
            .with_travel(travel)
            .with_stroke(stroke);
        let segments = evaluate_transform(&config).unwrap();

        for segment in &segments {
            let looked_up = leverage_at_stroke(&segments, segment.stroke_q, config.base_leverage());
            let expected = segment.leverage_at_travel(segment.travel_q);
            prop_assert!(
                (looked_up - expected).abs() < 1e-6,
                "looked_up={} expected={}", looked_up, expected
            );
        }
    }

    #[test]
    fn flat_curve_maps_travel_by_base_leverage(
        resolution in 2usize..12,
        travel in 80.0f64..220.0,
        stroke in 35.0f64..75.0,
    ) {
        let config = CurveConfig::default()
            .with_points(vec![1.0; resolution])
            .with_travel(travel)
            .with_stroke(stroke);
        let segments = evaluate_transform(&config).unwrap();

        for segment in &segments {
            prop_assert_eq!(segment.m, 0.0);
            let scaled = segment.stroke_width() * config.base_leverage();
            prop_assert!((scaled - segment.travel_width()).abs() < 1e-9);
        }
    }
}

// =============================================================================
// Point editor
// =============================================================================

proptest! {
    #[test]
    fn zero_drag_is_identity(points in points(), idx in 0usize..12) {
        let bounds = LeverageBounds::default();
        prop_assert_eq!(apply_drag(&points, idx, 0.0, bounds), points);
    }

    #[test]
    fn drag_never_leaves_bounds(
        points in points(),
        idx in 0usize..12,
        delta in -0.6f64..0.6,
        multiplier in 0.1f64..0.5,
    ) {
        let bounds = LeverageBounds::for_multiplier(multiplier);
        let points: Vec<f64> = points.iter().map(|p| p.clamp(bounds.lower, bounds.upper)).collect();
        let edited = apply_drag(&points, idx % points.len(), delta, bounds);

        prop_assert_eq!(edited.len(), points.len());
        prop_assert!(edited.iter().all(|&p| bounds.contains(p)), "edited={:?}", edited);
    }
}

// =============================================================================
// Sag solver
// =============================================================================

proptest! {
    #[test]
    fn stiffer_spring_never_sags_more(
        preset in preset(),
        spring in 250.0f64..700.0,
        stiffer_by in 1.1f64..2.0,
        rider in 120.0f64..260.0,
        bias in 0.25f64..0.45,
    ) {
        let config = CurveConfig::default().with_preset(preset);
        let segments = evaluate_transform(&config).unwrap();

        let soft = solve_sag(spring, rider, bias, &segments);
        let stiff = solve_sag(spring * stiffer_by, rider, bias, &segments);
        prop_assert!(stiff <= soft, "stiff={} soft={}", stiff, soft);
    }

    #[test]
    fn sag_stays_within_stroke(
        preset in preset(),
        spring in 0.0f64..1500.0,
        rider in 0.0f64..300.0,
        bias in 0.01f64..0.99,
    ) {
        let config = CurveConfig::default().with_preset(preset);
        let segments = evaluate_transform(&config).unwrap();
        let total = segments.last().unwrap().stroke_p;

        let root = solve_sag(spring, rider, bias, &segments);
        prop_assert!(root >= 0.0 && root <= total, "root={} total={}", root, total);
    }
}

// =============================================================================
// Physics
// =============================================================================

proptest! {
    #[test]
    fn position_never_leaves_stroke(
        preset in preset(),
        spring in 1.0f64..1200.0,
        rider in 0.0f64..300.0,
        pos in 0.0f64..50.0,
        vel in -2000.0f64..2000.0,
        simulating in any::<bool>(),
        dt in 0.001f64..0.1,
    ) {
        let config = CurveConfig::default()
            .with_preset(preset)
            .with_spring_weight(spring)
            .with_rider_weight(rider);
        let segments = evaluate_transform(&config).unwrap();
        let mut state = SimulationState { pos, vel, acc: 0.0, simulating };

        for _ in 0..200 {
            state = tick_physics(state, &config, &segments, dt);
            prop_assert!(state.pos >= 0.0 && state.pos <= config.stroke, "pos={}", state.pos);
        }
    }

    #[test]
    fn integrator_output_stays_in_stroke(
        frame_ms in 1u64..150,
        release_at in 0usize..100,
    ) {
        let config = CurveConfig::default().with_preset(CurvePreset::MoreDegressive);
        let mut shock = PhysicsIntegrator::new();
        shock.press();

        let mut now = Duration::ZERO;
        for frame in 0..300 {
            if frame == release_at {
                shock.release();
            }
            if let Some(out) = shock.tick(now, &config) {
                prop_assert!(out.pos >= 0.0 && out.pos <= config.stroke);
            }
            now += Duration::from_millis(frame_ms);
        }
    }
}

// =============================================================================
// Linkage solver
// =============================================================================

proptest! {
    #[test]
    fn single_pivot_meets_every_reachable_shock_length(shock_length in 6.0f64..18.0) {
        let mut platform = Platform::new();
        let axle = platform.add_joint("axle", 0.0, 0.0);
        let pivot = platform.add_joint("pivot", 10.0, 0.0);
        let mount = platform.add_joint("mount", 10.0, 10.0);
        platform.fix_joint(pivot);
        platform.fix_joint(mount);
        let swing_arm = platform.add_linkage("swing arm", axle, pivot).unwrap();
        let shock = platform.add_linkage("shock", axle, mount).unwrap();
        platform.constrain_current_length(swing_arm);
        platform.constrain_length(shock, shock_length);

        platform.solve().unwrap();

        prop_assert!((platform.length(swing_arm) - 10.0).abs() < 1e-4);
        prop_assert!((platform.length(shock) - shock_length).abs() < 1e-4);
        prop_assert_eq!(platform.joint(pivot).x, 10.0);
        prop_assert_eq!(platform.joint(mount).y, 10.0);
    }
}
