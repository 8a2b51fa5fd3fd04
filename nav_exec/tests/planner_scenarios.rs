//! Path planner scenarios, driven through the public library interface.

use std::sync::Arc;

use comms_if::msg::{PlannerStatus, Point2D};
use nalgebra::Vector2;
use nav_lib::{
    geom::{generate_cubic_path, Path},
    map::{OccupancyGrid, OCCUPIED},
    planner::{
        collision::{find_opening, scan_swath},
        ObstructionPolicy, Params, PathPlanner, PlannerSnapshot, Verdict,
    },
};
use util::module::State;

// ---------------------------------------------------------------------------
// HELPERS
// ---------------------------------------------------------------------------

const TARGET_VELOCITY_MS: f64 = 5.0;

fn params() -> Params {
    Params {
        update_frequency_hz: 10.0,
        frame_id: "map".into(),
        target_velocity_ms: TARGET_VELOCITY_MS,
        vehicle_half_width_m: 1.0,
        path_step_m: 0.1,
        obstruction_policy: ObstructionPolicy::Span,
    }
}

fn planner() -> PathPlanner {
    let mut p = PathPlanner::new();
    p.init(params()).unwrap();
    p
}

/// 60 x 40 m grid covering x in [-5, 55] and y in [-20, 20].
fn grid() -> OccupancyGrid {
    OccupancyGrid::new(600, 400, 0.1, Vector2::new(-5.0, -20.0)).unwrap()
}

/// Grid with a 2 m wide band across the path at x = 20.
fn band_grid(y_min: f64, y_max: f64) -> OccupancyGrid {
    let mut g = grid();
    g.fill_rect(Vector2::new(19.0, y_min), Vector2::new(21.0, y_max), OCCUPIED);
    g
}

fn snapshot(points: &[(f64, f64)], grid: OccupancyGrid) -> PlannerSnapshot {
    PlannerSnapshot {
        waypoints: points.iter().map(|&(x, y)| Point2D { x, y }).collect(),
        grid: Arc::new(grid),
        vehicle_state: None,
    }
}

const LONG_STRAIGHT: [(f64, f64); 3] = [(0.0, 0.0), (20.0, 0.0), (40.0, 0.0)];

fn long_straight_path() -> Path {
    let xs: Vec<f64> = LONG_STRAIGHT.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = LONG_STRAIGHT.iter().map(|p| p.1).collect();
    generate_cubic_path(&xs, &ys, 0.1).unwrap()
}

/// Lateral position of the path sample closest to `x`.
fn y_at(path: &Path, x: f64) -> f64 {
    path.iter()
        .min_by(|a, b| (a.0 - x).abs().partial_cmp(&(b.0 - x).abs()).unwrap())
        .map(|p| p.1)
        .unwrap()
}

// ---------------------------------------------------------------------------
// SCENARIOS
// ---------------------------------------------------------------------------

#[test]
fn straight_path_on_empty_grid() {
    let mut p = planner();
    let (out, status) = p
        .proc(&snapshot(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)], OccupancyGrid::empty()))
        .unwrap();

    assert_eq!(status, PlannerStatus::Clear);
    assert_eq!(out.target_velocity_ms, TARGET_VELOCITY_MS);
    assert_eq!(out.path.len(), 200);

    for (x, y, yaw) in out.path.iter() {
        assert!(x >= 0.0 && x < 20.0);
        assert!(y.abs() < 1e-9);
        assert!(yaw.abs() < 1e-9);
    }
}

#[test]
fn band_with_opening_is_avoided() {
    let grid = band_grid(-3.0, 3.0);
    let mut p = planner();

    let (out, status) = p.proc(&snapshot(&LONG_STRAIGHT, grid.clone())).unwrap();

    let (width, dist) = match status {
        PlannerStatus::Avoiding {
            opening_width_m,
            opening_dist_m,
        } => (opening_width_m, opening_dist_m),
        s => panic!("Expected to avoid the band, got {:?}", s),
    };

    assert_eq!(out.target_velocity_ms, TARGET_VELOCITY_MS);
    assert!(width >= 2.0);
    assert!(dist.abs() > 3.0);

    // Goes around the band and rejoins the path on either side of it
    assert!(y_at(&out.path, 20.0).abs() > 4.0);
    assert!(y_at(&out.path, 2.0).abs() < 1e-6);
    assert!(y_at(&out.path, 38.0).abs() < 1e-6);

    // The rerouted path no longer collides
    assert!(scan_swath(&out.path, &grid, 1.0).is_empty());
}

#[test]
fn band_without_opening_stops() {
    let grid = band_grid(-20.0, 20.0);
    let mut p = planner();

    let (out, status) = p.proc(&snapshot(&LONG_STRAIGHT, grid)).unwrap();

    assert_eq!(out.target_velocity_ms, 0.0);
    assert_eq!(status, PlannerStatus::Blocked { opening_width_m: 0.0 });

    // A best effort path is still produced
    assert!(!out.path.is_empty());
}

#[test]
fn avoidance_resumes_after_obstacle_clears() {
    let mut p = planner();

    let (_, status) = p.proc(&snapshot(&LONG_STRAIGHT, band_grid(-20.0, 20.0))).unwrap();
    assert!(matches!(status, PlannerStatus::Blocked { .. }));

    let (out, status) = p.proc(&snapshot(&LONG_STRAIGHT, grid())).unwrap();
    assert_eq!(status, PlannerStatus::Clear);
    assert_eq!(out.target_velocity_ms, TARGET_VELOCITY_MS);
    assert_eq!(out.path, long_straight_path());
}

#[test]
fn short_paths_are_not_checked() {
    // 200 samples leave nothing between the end margins to check
    let mut g = grid();
    g.fill_rect(Vector2::new(9.0, -3.0), Vector2::new(11.0, 3.0), OCCUPIED);

    let mut p = planner();
    let (out, status) = p
        .proc(&snapshot(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)], g))
        .unwrap();

    assert_eq!(status, PlannerStatus::Clear);
    assert_eq!(out.target_velocity_ms, TARGET_VELOCITY_MS);
}

#[test]
fn obstacle_off_the_path_is_ignored() {
    let mut g = grid();
    g.fill_rect(Vector2::new(19.0, 5.0), Vector2::new(21.0, 8.0), OCCUPIED);

    let mut p = planner();
    let (out, status) = p.proc(&snapshot(&LONG_STRAIGHT, g)).unwrap();

    assert_eq!(status, PlannerStatus::Clear);
    assert_eq!(out.path, long_straight_path());
}

// ---------------------------------------------------------------------------
// PROPERTIES
// ---------------------------------------------------------------------------

#[test]
fn clear_paths_are_unchanged() {
    let p = planner();

    let mut g = grid();
    g.fill_rect(Vector2::new(-5.0, 15.0), Vector2::new(55.0, 20.0), OCCUPIED);

    let waypoint_sets: [&[(f64, f64)]; 3] = [
        &[(0.0, 0.0), (40.0, 0.0)],
        &[(0.0, 0.0), (15.0, 3.0), (30.0, -3.0), (45.0, 0.0)],
        &[(0.0, -5.0), (20.0, 5.0), (40.0, -5.0), (50.0, 0.0)],
    ];

    for waypoints in waypoint_sets.iter() {
        let xs: Vec<f64> = waypoints.iter().map(|w| w.0).collect();
        let ys: Vec<f64> = waypoints.iter().map(|w| w.1).collect();
        let path = generate_cubic_path(&xs, &ys, 0.1).unwrap();

        let (out, verdict) = p.determine_path(&path, &g).unwrap();
        assert_eq!(verdict, Verdict::Clear);
        assert_eq!(out, path);
    }
}

#[test]
fn splice_leaves_untouched_segments_clear() {
    let p = planner();
    let grid = band_grid(-3.0, 3.0);
    let path = long_straight_path();

    let (out, verdict) = p.determine_path(&path, &grid).unwrap();

    let obstruction = match verdict {
        Verdict::Rerouted { obstruction, .. } => obstruction,
        Verdict::Clear => panic!("Expected a reroute"),
    };

    let head = obstruction.first - 151;
    let tail = path.len() - (obstruction.last + 151);

    assert_eq!(&out.xs()[..head], &path.xs()[..head]);
    assert_eq!(&out.ys()[..head], &path.ys()[..head]);
    assert_eq!(&out.xs()[out.len() - tail..], &path.xs()[path.len() - tail..]);
    assert_eq!(&out.ys()[out.len() - tail..], &path.ys()[path.len() - tail..]);

    // Neither untouched segment collides
    let collisions = scan_swath(&out, &grid, 1.0);
    assert!(collisions.iter().all(|&c| c >= head && c < out.len() - tail));
}

#[test]
fn opening_lies_within_window() {
    // Deterministic xorshift so the windows are varied but repeatable
    let mut seed: u32 = 0x9e37_79b9;
    let mut next = || {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        seed
    };

    for len in 1..300 {
        let window: Vec<Option<i8>> = (0..len)
            .map(|_| match next() % 4 {
                0 => None,
                1 => Some(OCCUPIED),
                2 => Some(-1),
                _ => Some(0),
            })
            .collect();

        let opening = find_opening(&window);
        assert!(opening.width_samples <= len);
        assert!(opening.index < len);
    }
}
